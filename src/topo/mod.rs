//! 拓扑构建模块
//!
//! 生成常见拓扑的场景描述，供 CLI 与测试使用。

pub mod dumbbell;
pub mod ring;
