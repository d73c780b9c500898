use sequencer_types::{effective_priority, Tx, TxId};
use std::collections::VecDeque;

/// `Tx` wrapped with the bookkeeping the Optimizer needs for aging and
/// retry counting. Distinct from the Bundle Engine's plain `Tx` membership
/// since the optimizer's unit of work is a single transaction, not a group.
#[derive(Debug, Clone)]
pub struct QueuedTransaction {
    pub tx: Tx,
    pub enqueued_at_ms: u64,
    pub base_priority: f64,
    pub attempts: u32,
}

impl QueuedTransaction {
    pub fn effective_priority(&self, now_ms: u64, waiting_priority_factor: f64) -> f64 {
        let wait_seconds = now_ms.saturating_sub(self.enqueued_at_ms) as f64 / 1000.0;
        effective_priority(self.base_priority, wait_seconds, waiting_priority_factor)
    }
}

/// A single transaction type's FIFO-by-default queue. Dequeue order is
/// determined at scan time by effective priority (descending), ties broken
/// by earliest enqueue time — the queue itself stores insertion order and
/// is re-sorted on demand rather than maintained as a heap, since aging
/// continuously changes every element's priority.
#[derive(Debug, Default)]
pub struct TypeQueue {
    items: VecDeque<QueuedTransaction>,
}

impl TypeQueue {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn push(&mut self, item: QueuedTransaction) {
        self.items.push_back(item);
    }

    /// Removes and returns the highest-effective-priority item, ties broken
    /// by earliest enqueue time.
    pub fn pop_highest_priority(&mut self, now_ms: u64, waiting_priority_factor: f64) -> Option<QueuedTransaction> {
        let best_idx = self
            .items
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| {
                let pa = a.effective_priority(now_ms, waiting_priority_factor);
                let pb = b.effective_priority(now_ms, waiting_priority_factor);
                pa.partial_cmp(&pb)
                    .unwrap()
                    .then(b.enqueued_at_ms.cmp(&a.enqueued_at_ms))
            })
            .map(|(i, _)| i)?;
        self.items.remove(best_idx)
    }

    /// Removes every item whose wait exceeds `timeout_ms`, returning
    /// `(tx_id, wait_ms)` pairs for emitting `transactionExpired` events.
    pub fn evict_expired(&mut self, now_ms: u64, timeout_ms: u64) -> Vec<(TxId, u64)> {
        let mut expired = Vec::new();
        self.items.retain(|item| {
            let wait_ms = now_ms.saturating_sub(item.enqueued_at_ms);
            if wait_ms > timeout_ms {
                expired.push((item.tx.id, wait_ms));
                false
            } else {
                true
            }
        });
        expired
    }

    pub fn oldest_age_ms(&self, now_ms: u64) -> Option<u64> {
        self.items.iter().map(|i| now_ms.saturating_sub(i.enqueued_at_ms)).max()
    }

    pub fn average_wait_ms(&self, now_ms: u64) -> f64 {
        if self.items.is_empty() {
            return 0.0;
        }
        let total: u64 = self.items.iter().map(|i| now_ms.saturating_sub(i.enqueued_at_ms)).sum();
        total as f64 / self.items.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sequencer_types::{Amount, TxType};

    fn item(priority: f64, enqueued_at_ms: u64) -> QueuedTransaction {
        QueuedTransaction {
            tx: Tx::new("a", "b", Amount::zero(), vec![], 21_000, TxType::Transfer),
            enqueued_at_ms,
            base_priority: priority,
            attempts: 0,
        }
    }

    #[test]
    fn aging_promotes_lower_priority_item() {
        let mut q = TypeQueue::default();
        q.push(item(10.0, 0)); // A
        q.push(item(1.0, 0)); // B
        // At t=5000ms with factor=2.0: A=20, B=11 -- A still wins.
        let popped = q.pop_highest_priority(5_000, 2.0).unwrap();
        assert_eq!(popped.base_priority, 10.0);
        assert_eq!(popped.effective_priority(5_000, 2.0), 20.0);
    }

    #[test]
    fn ties_break_by_earliest_enqueue() {
        let mut q = TypeQueue::default();
        q.push(item(5.0, 100));
        q.push(item(5.0, 0));
        let popped = q.pop_highest_priority(1_000, 1.0).unwrap();
        assert_eq!(popped.enqueued_at_ms, 0);
    }

    #[test]
    fn expiry_evicts_only_overdue_items() {
        let mut q = TypeQueue::default();
        q.push(item(1.0, 0));
        q.push(item(1.0, 9_000));
        let expired = q.evict_expired(10_000, 5_000);
        assert_eq!(expired.len(), 1);
        assert_eq!(q.len(), 1);
    }
}
