//! 日历队列调度器（Brown, 1988）
//!
//! 每个桶覆盖一段等宽的时间；事件落入 `(ts / width) % nbuckets` 号桶，
//! 桶内按 `(ts, uid)` 升序。桶数随队列长度自动翻倍或减半，使平均占用保持在 2 左右。

use super::{Scheduler, missing_event};
use crate::sim::{EventKey, ScheduledEvent};
use std::collections::VecDeque;
use tracing::trace;

const MAX_BUCKETS: usize = 32_768;
const MAX_WIDTH_SAMPLES: usize = 25;

type Bucket = VecDeque<ScheduledEvent>;

#[derive(Debug)]
pub struct CalendarScheduler {
    buckets: Vec<Bucket>,
    width: u64,
    /// 上一次出队所在的桶
    last_bucket: usize,
    /// 上一次出队所在桶的上界（u128 避免溢出）
    bucket_top: u128,
    /// 上一次出队事件的时间
    last_prio: u64,
    qsize: usize,
}

impl Default for CalendarScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl CalendarScheduler {
    pub fn new() -> Self {
        let mut me = Self {
            buckets: Vec::new(),
            width: 1,
            last_bucket: 0,
            bucket_top: 0,
            last_prio: 0,
            qsize: 0,
        };
        me.init(2, 1, 0);
        me
    }

    /// 当前桶数
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// 当前桶宽（时间单位）
    pub fn width(&self) -> u64 {
        self.width
    }

    fn init(&mut self, nbuckets: usize, width: u64, start_prio: u64) {
        self.buckets = (0..nbuckets).map(|_| Bucket::new()).collect();
        self.width = width.max(1);
        self.last_prio = start_prio;
        self.last_bucket = self.hash(start_prio);
        self.bucket_top = Self::top_of(start_prio, self.width);
    }

    fn hash(&self, ts: u64) -> usize {
        ((ts / self.width) % self.buckets.len() as u64) as usize
    }

    fn top_of(ts: u64, width: u64) -> u128 {
        (ts as u128 / width as u128 + 1) * width as u128
    }

    fn do_insert(&mut self, ev: ScheduledEvent) {
        let b = self.hash(ev.key.ts.0);
        let bucket = &mut self.buckets[b];
        let at = bucket.partition_point(|cur| cur.key < ev.key);
        bucket.insert(at, ev);
    }

    /// 查找下一个要出队的事件所在的桶。
    ///
    /// 返回 `(桶下标, 该桶的上界)`。先按日历顺序扫一整年，
    /// 若没有落在当年的事件，再退化为对所有桶头的直接搜索。
    fn find_next(&self) -> (usize, u128) {
        let n = self.buckets.len();
        let mut i = self.last_bucket;
        let mut top = self.bucket_top;
        let mut min: Option<(EventKey, usize)> = None;
        loop {
            if let Some(head) = self.buckets[i].front() {
                if (head.key.ts.0 as u128) < top {
                    return (i, top);
                }
                if min.is_none_or(|(k, _)| head.key < k) {
                    min = Some((head.key, i));
                }
            }
            i = (i + 1) % n;
            top += self.width as u128;
            if i == self.last_bucket {
                break;
            }
        }
        let (key, bucket) = min.expect("calendar queue is empty");
        (bucket, Self::top_of(key.ts.0, self.width))
    }

    fn do_remove_next(&mut self) -> ScheduledEvent {
        let (bucket, top) = self.find_next();
        let ev = self.buckets[bucket]
            .pop_front()
            .expect("bucket selected by find_next is non-empty");
        self.last_bucket = bucket;
        self.bucket_top = top;
        self.last_prio = ev.key.ts.0;
        ev
    }

    fn resize_up(&mut self) {
        if self.qsize > self.buckets.len() * 2 && self.buckets.len() < MAX_BUCKETS {
            self.resize(self.buckets.len() * 2);
        }
    }

    fn resize_down(&mut self) {
        if self.qsize < self.buckets.len() / 2 {
            self.resize(self.buckets.len() / 2);
        }
    }

    fn resize(&mut self, new_size: usize) {
        let new_width = self.calculate_new_width();
        trace!(
            old_buckets = self.buckets.len(),
            new_buckets = new_size,
            old_width = self.width,
            new_width,
            "日历队列调整大小"
        );
        let old = std::mem::take(&mut self.buckets);
        self.init(new_size.max(1), new_width, self.last_prio);
        for ev in old.into_iter().flatten() {
            self.do_insert(ev);
        }
    }

    /// 用队首若干事件的平均间隔估计新桶宽。
    fn calculate_new_width(&mut self) -> u64 {
        if self.qsize < 2 {
            return 1;
        }
        let n_samples = if self.qsize <= 5 {
            self.qsize
        } else {
            (5 + self.qsize / 10).min(MAX_WIDTH_SAMPLES)
        };

        let saved = (self.last_bucket, self.bucket_top, self.last_prio);
        let samples: Vec<ScheduledEvent> = (0..n_samples).map(|_| self.do_remove_next()).collect();
        let stamps: Vec<u64> = samples.iter().map(|ev| ev.key.ts.0).collect();
        for ev in samples {
            self.do_insert(ev);
        }
        (self.last_bucket, self.bucket_top, self.last_prio) = saved;

        let gaps: Vec<u64> = stamps.windows(2).map(|w| w[1] - w[0]).collect();
        let total: u128 = gaps.iter().map(|&g| g as u128).sum();
        let twice_avg = total / gaps.len() as u128 * 2;

        // 忽略远大于平均值的间隔，只对剩余部分求平均。
        let (small_total, small_count) = gaps
            .iter()
            .filter(|&&g| g as u128 <= twice_avg)
            .fold((0u128, 0u128), |(sum, n), &g| (sum + g as u128, n + 1));
        if small_count == 0 {
            return 1;
        }
        let width = small_total * 3 / small_count;
        width.clamp(1, u64::MAX as u128) as u64
    }
}

impl Scheduler for CalendarScheduler {
    fn insert(&mut self, ev: ScheduledEvent) {
        if ev.key.ts.0 < self.last_prio {
            // 比上次出队还早的事件：把日历游标拉回到它所在的桶。
            self.last_prio = ev.key.ts.0;
            self.last_bucket = self.hash(ev.key.ts.0);
            self.bucket_top = Self::top_of(ev.key.ts.0, self.width);
        }
        self.do_insert(ev);
        self.qsize += 1;
        self.resize_up();
    }

    fn is_empty(&self) -> bool {
        self.qsize == 0
    }

    fn len(&self) -> usize {
        self.qsize
    }

    fn peek_next(&self) -> &ScheduledEvent {
        assert!(self.qsize > 0, "peek_next on empty scheduler");
        let (bucket, _) = self.find_next();
        self.buckets[bucket]
            .front()
            .expect("bucket selected by find_next is non-empty")
    }

    fn remove_next(&mut self) -> ScheduledEvent {
        assert!(self.qsize > 0, "remove_next on empty scheduler");
        let ev = self.do_remove_next();
        self.qsize -= 1;
        self.resize_down();
        ev
    }

    fn remove(&mut self, key: &EventKey) -> ScheduledEvent {
        let b = self.hash(key.ts.0);
        let bucket = &mut self.buckets[b];
        let ev = match bucket.binary_search_by(|cur| cur.key.cmp(key)) {
            Ok(at) => bucket.remove(at).unwrap_or_else(|| missing_event(key)),
            Err(_) => missing_event(key),
        };
        self.qsize -= 1;
        self.resize_down();
        ev
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ev(ts: u64, uid: u64) -> ScheduledEvent {
        ScheduledEvent::noop(ts, uid)
    }

    #[test]
    fn grows_and_shrinks_with_queue_size() {
        let mut q = CalendarScheduler::new();
        assert_eq!(q.bucket_count(), 2);
        for i in 0..64 {
            q.insert(ev(i * 10, i + 4));
        }
        assert!(q.bucket_count() >= 16, "buckets={}", q.bucket_count());
        assert!(q.width() >= 1);

        let mut last = 0;
        while !q.is_empty() {
            let e = q.remove_next();
            assert!(e.key.ts.0 >= last);
            last = e.key.ts.0;
        }
        assert!(q.bucket_count() <= 2, "buckets={}", q.bucket_count());
    }

    #[test]
    fn far_future_event_found_by_direct_search() {
        let mut q = CalendarScheduler::new();
        q.insert(ev(5, 4));
        q.insert(ev(1_000_000_000, 5));
        q.insert(ev(u64::MAX - 1, 6));

        assert_eq!(q.remove_next().key.uid, 4);
        assert_eq!(q.peek_next().key.uid, 5);
        assert_eq!(q.remove_next().key.uid, 5);
        assert_eq!(q.remove_next().key.uid, 6);
        assert!(q.is_empty());
    }
}
