use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tick_core::Tick;
use tokio::sync::{mpsc, Notify};

/// Bounded drop-oldest buffer for FAST-class ticks.
///
/// On overflow the oldest buffered tick is evicted and counted; the newest
/// tick always lands. This is the inverse of the warm/cold path, where the
/// producer blocks instead: for latency-sensitive traffic freshness beats
/// completeness.
#[derive(Debug)]
pub struct FastLane {
    buf: Mutex<VecDeque<Tick>>,
    capacity: usize,
    dropped_oldest: AtomicU64,
}

impl FastLane {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "fast lane capacity must be at least 1");
        Self {
            buf: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            dropped_oldest: AtomicU64::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.buf.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.lock().is_empty()
    }

    /// Enqueue a tick, evicting the oldest one when full. Returns the
    /// evicted tick so the caller can log it.
    pub fn push(&self, tick: Tick) -> Option<Tick> {
        let mut buf = self.buf.lock();
        let evicted = if buf.len() == self.capacity {
            self.dropped_oldest.fetch_add(1, Ordering::Relaxed);
            buf.pop_front()
        } else {
            None
        };
        buf.push_back(tick);
        evicted
    }

    pub fn pop(&self) -> Option<Tick> {
        self.buf.lock().pop_front()
    }

    /// Discard everything buffered; used at shutdown where FAST ticks are
    /// stale by definition. Returns the number discarded.
    pub fn clear(&self) -> usize {
        let mut buf = self.buf.lock();
        let n = buf.len();
        buf.clear();
        n
    }

    pub fn dropped_oldest(&self) -> u64 {
        self.dropped_oldest.load(Ordering::Relaxed)
    }
}

/// Router-side handle for one shard: fast lane plus bounded warm/cold queue.
#[derive(Clone)]
pub struct ShardSender {
    pub fast: Arc<FastLane>,
    pub slow: mpsc::Sender<Tick>,
    pub notify: Arc<Notify>,
}

/// Engine-side handle for one shard.
pub struct ShardReceiver {
    pub fast: Arc<FastLane>,
    pub slow: mpsc::Receiver<Tick>,
    pub notify: Arc<Notify>,
}

/// Build the channel pair connecting the router to one engine shard.
pub fn shard_channel(fast_depth: usize, slow_depth: usize) -> (ShardSender, ShardReceiver) {
    let fast = Arc::new(FastLane::new(fast_depth));
    let notify = Arc::new(Notify::new());
    let (slow_tx, slow_rx) = mpsc::channel(slow_depth);

    (
        ShardSender { fast: fast.clone(), slow: slow_tx, notify: notify.clone() },
        ShardReceiver { fast, slow: slow_rx, notify },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tick_core::TickKind;

    fn tick(seq: u64) -> Tick {
        Tick {
            instrument_id: 1,
            symbol: "BTC-USD".to_string(),
            venue: "simex".to_string(),
            kind: TickKind::Trade,
            event_time: Utc::now(),
            ingest_time: Utc::now(),
            price: 100.0 + seq as f64,
            size: 1.0,
            side: None,
            venue_seq: Some(seq),
        }
    }

    #[test]
    fn test_fifo_below_capacity() {
        let lane = FastLane::new(4);
        lane.push(tick(1));
        lane.push(tick(2));

        assert_eq!(lane.pop().unwrap().venue_seq, Some(1));
        assert_eq!(lane.pop().unwrap().venue_seq, Some(2));
        assert!(lane.pop().is_none());
        assert_eq!(lane.dropped_oldest(), 0);
    }

    #[test]
    fn test_overflow_drops_oldest_not_newest() {
        let lane = FastLane::new(2);
        lane.push(tick(1));
        lane.push(tick(2));

        let evicted = lane.push(tick(3));
        assert_eq!(evicted.unwrap().venue_seq, Some(1));
        assert_eq!(lane.dropped_oldest(), 1);

        // Survivors are the two newest, still in order
        assert_eq!(lane.pop().unwrap().venue_seq, Some(2));
        assert_eq!(lane.pop().unwrap().venue_seq, Some(3));
    }

    #[test]
    fn test_clear_reports_discarded_count() {
        let lane = FastLane::new(8);
        for seq in 0..5 {
            lane.push(tick(seq));
        }
        assert_eq!(lane.clear(), 5);
        assert!(lane.is_empty());
    }

    #[tokio::test]
    async fn test_shard_channel_pair_shares_lane() {
        let (sender, mut receiver) = shard_channel(4, 4);

        sender.fast.push(tick(9));
        sender.notify.notify_one();
        assert_eq!(receiver.fast.pop().unwrap().venue_seq, Some(9));

        sender.slow.send(tick(10)).await.unwrap();
        assert_eq!(receiver.slow.recv().await.unwrap().venue_seq, Some(10));
    }
}
