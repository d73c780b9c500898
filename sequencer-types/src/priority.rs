/// Effective priority of a queued/bundled item at scan time:
/// `base_priority + wait_time_seconds * waiting_priority_factor`.
///
/// Shared by the Bundle Engine (computed once, at add time, with
/// `wait_time_seconds == 0`) and the Mixed-Transaction Optimizer (recomputed
/// on every scan against the item's actual wait time).
pub fn effective_priority(base_priority: f64, wait_time_seconds: f64, waiting_priority_factor: f64) -> f64 {
    base_priority + wait_time_seconds * waiting_priority_factor
}
