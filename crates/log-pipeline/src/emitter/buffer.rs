//! 전송 대기 버퍼
//!
//! [`PendingBatch`]는 용량이 정해진 FIFO입니다. 가득 차면 가장 오래된 항목을 버립니다.
//! 전송에 실패한 배치는 [`PendingBatch::prepend`]로 앞쪽에 되돌려 순서를 보존합니다.
//! 모든 변경 연산이 끝나면 길이는 용량 이하입니다.
//!
//! 버퍼는 직접 로그를 남기지 않습니다. 버린 수는 [`PendingBatch::take_unreported_drops`]로
//! 모아서 호출자가 주기마다 한 번 보고합니다.

use std::collections::VecDeque;

/// 전송 대기 버퍼
#[derive(Debug)]
pub struct PendingBatch<T> {
    items: VecDeque<T>,
    capacity: usize,
    /// 용량 초과로 버린 항목 수 (통계용)
    dropped_count: u64,
    /// 마지막 보고 이후 버린 항목 수
    unreported_drops: u64,
    /// 총 유입 항목 수
    total_received: u64,
}

impl<T> PendingBatch<T> {
    /// 새 버퍼를 생성합니다.
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity.min(10_000)),
            capacity,
            dropped_count: 0,
            unreported_drops: 0,
            total_received: 0,
        }
    }

    /// 항목을 뒤에 추가하고, 용량을 넘으면 앞에서 버립니다.
    ///
    /// 이번 호출로 버린 항목 수를 반환합니다.
    pub fn push(&mut self, item: T) -> usize {
        self.total_received += 1;
        self.items.push_back(item);
        self.enforce_capacity()
    }

    /// 앞에서부터 최대 `max`개를 꺼냅니다.
    pub fn drain_prefix(&mut self, max: usize) -> Vec<T> {
        let count = max.min(self.items.len());
        self.items.drain(..count).collect()
    }

    /// 전송 실패 배치를 원래 순서 그대로 앞쪽에 되돌립니다.
    ///
    /// 용량을 넘으면 가장 오래된 항목(되돌린 배치의 앞부분)부터 버리고 버린 수를 반환합니다.
    pub fn prepend(&mut self, batch: Vec<T>) -> usize {
        for item in batch.into_iter().rev() {
            self.items.push_front(item);
        }
        self.enforce_capacity()
    }

    /// 마지막 호출 이후 버린 항목 수를 반환하고 0으로 되돌립니다.
    pub fn take_unreported_drops(&mut self) -> u64 {
        std::mem::take(&mut self.unreported_drops)
    }

    fn enforce_capacity(&mut self) -> usize {
        let excess = self.items.len().saturating_sub(self.capacity);
        if excess > 0 {
            self.items.drain(..excess);
            self.dropped_count += excess as u64;
            self.unreported_drops += excess as u64;
        }
        excess
    }

    /// 현재 항목 수
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// 비어 있는지 확인
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// 최대 용량
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 버린 항목 수
    pub fn dropped_count(&self) -> u64 {
        self.dropped_count
    }

    /// 총 유입 항목 수
    pub fn total_received(&self) -> u64 {
        self.total_received
    }

    /// 사용률 (0.0 ~ 1.0)
    pub fn utilization(&self) -> f64 {
        if self.capacity == 0 {
            return 0.0;
        }
        self.items.len() as f64 / self.capacity as f64
    }

    /// 항목 순회 (앞에서부터)
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(capacity: usize, n: usize) -> PendingBatch<usize> {
        let mut buf = PendingBatch::new(capacity);
        for i in 0..n {
            buf.push(i);
        }
        buf
    }

    #[test]
    fn overflow_keeps_newest_in_order() {
        let buf = filled(3, 5);
        assert_eq!(buf.iter().copied().collect::<Vec<_>>(), vec![2, 3, 4]);
        assert_eq!(buf.dropped_count(), 2);
        assert_eq!(buf.total_received(), 5);
    }

    #[test]
    fn drain_prefix_takes_oldest_first() {
        let mut buf = filled(10, 5);
        assert_eq!(buf.drain_prefix(2), vec![0, 1]);
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.drain_prefix(100), vec![2, 3, 4]);
        assert!(buf.is_empty());
    }

    #[test]
    fn prepend_restores_order_ahead_of_newer() {
        let mut buf = filled(10, 3);
        let batch = buf.drain_prefix(3);
        buf.push(10);
        buf.push(11);

        assert_eq!(buf.prepend(batch), 0);
        assert_eq!(buf.iter().copied().collect::<Vec<_>>(), vec![0, 1, 2, 10, 11]);
    }

    #[test]
    fn prepend_drops_oldest_of_requeued() {
        let mut buf = filled(4, 3);
        let batch = buf.drain_prefix(3);
        buf.push(10);
        buf.push(11);

        assert_eq!(buf.prepend(batch), 1);
        assert_eq!(buf.iter().copied().collect::<Vec<_>>(), vec![1, 2, 10, 11]);
    }

    #[test]
    fn prepend_onto_full_buffer_stays_within_capacity() {
        let mut buf = filled(3, 3);
        assert_eq!(buf.prepend(vec![100, 101]), 2);
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.iter().copied().collect::<Vec<_>>(), vec![0, 1, 2]);
        assert_eq!(buf.dropped_count(), 2);
    }

    #[test]
    fn unreported_drops_accumulate_until_taken() {
        let mut buf = filled(2, 2);
        for i in 0..5 {
            buf.push(i);
        }
        buf.prepend(vec![7]);
        assert_eq!(buf.take_unreported_drops(), 6);
        assert_eq!(buf.take_unreported_drops(), 0);
        assert_eq!(buf.dropped_count(), 6);
    }

    #[test]
    fn utilization_calculation() {
        let buf = filled(4, 1);
        assert!((buf.utilization() - 0.25).abs() < f64::EPSILON);
        assert_eq!(PendingBatch::<u8>::new(0).utilization(), 0.0);
    }

    #[test]
    fn push_reports_drops() {
        let mut buf = filled(1, 1);
        assert_eq!(buf.push(9), 1);
        assert_eq!(buf.capacity(), 1);
    }
}
