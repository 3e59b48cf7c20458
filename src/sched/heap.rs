//! 二叉堆调度器
//!
//! 数组实现的小顶堆。插入和弹出最早事件为对数复杂度；
//! 删除任意事件需要线性查找，再做一次堆调整。

use super::{Scheduler, missing_event};
use crate::sim::{EventKey, ScheduledEvent};

#[derive(Debug, Default)]
pub struct HeapScheduler {
    heap: Vec<ScheduledEvent>,
}

impl HeapScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn parent(id: usize) -> usize {
        (id - 1) / 2
    }

    fn left_child(id: usize) -> usize {
        id * 2 + 1
    }

    fn is_less(&self, a: usize, b: usize) -> bool {
        self.heap[a].key < self.heap[b].key
    }

    fn bottom_up(&mut self, mut index: usize) {
        while index > 0 {
            let parent = Self::parent(index);
            if !self.is_less(index, parent) {
                break;
            }
            self.heap.swap(index, parent);
            index = parent;
        }
    }

    fn top_down(&mut self, mut index: usize) {
        let len = self.heap.len();
        loop {
            let left = Self::left_child(index);
            if left >= len {
                break;
            }
            let right = left + 1;
            let child = if right < len && self.is_less(right, left) {
                right
            } else {
                left
            };
            if !self.is_less(child, index) {
                break;
            }
            self.heap.swap(index, child);
            index = child;
        }
    }

    fn remove_at(&mut self, index: usize) -> ScheduledEvent {
        let ev = self.heap.swap_remove(index);
        if index < self.heap.len() {
            // 交换上来的末尾元素可能需要上浮或下沉。
            if index > 0 && self.is_less(index, Self::parent(index)) {
                self.bottom_up(index);
            } else {
                self.top_down(index);
            }
        }
        ev
    }
}

impl Scheduler for HeapScheduler {
    fn insert(&mut self, ev: ScheduledEvent) {
        self.heap.push(ev);
        let last = self.heap.len() - 1;
        self.bottom_up(last);
    }

    fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    fn len(&self) -> usize {
        self.heap.len()
    }

    fn peek_next(&self) -> &ScheduledEvent {
        self.heap.first().expect("peek_next on empty scheduler")
    }

    fn remove_next(&mut self) -> ScheduledEvent {
        assert!(!self.heap.is_empty(), "remove_next on empty scheduler");
        self.remove_at(0)
    }

    fn remove(&mut self, key: &EventKey) -> ScheduledEvent {
        match self.heap.iter().position(|ev| ev.key == *key) {
            Some(index) => self.remove_at(index),
            None => missing_event(key),
        }
    }
}
