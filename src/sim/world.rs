//! 世界 trait
//!
//! 仿真世界由模型层实现（节点、统计等），事件执行时以 `&mut dyn World` 传入。

use super::event::EventId;
use std::any::Any;

/// 仿真世界：由业务层实现。
pub trait World: Any {
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// 每个事件执行前调用（被取消的事件不会触发）。
    fn pre_event(&mut self, _id: &EventId) {}
}

/// 不需要模型状态时可直接使用 `()`。
impl World for () {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
