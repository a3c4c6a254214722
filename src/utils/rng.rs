use super::clock::now_nanos;
use std::sync::{
    OnceLock,
    atomic::{AtomicU64, Ordering},
};

/// Returns a process-unique, monotonically increasing identifier.
///
/// Used for participant ids, room ids and per-room RNG seeds. Seeded from the clock so ids
/// from a previous process run are unlikely to be reused by clients holding stale ids.
pub fn rand_id() -> u64 {
    static COUNTER: OnceLock<AtomicU64> = OnceLock::new();
    let counter = COUNTER.get_or_init(|| AtomicU64::new(now_nanos()));
    counter.fetch_add(1, Ordering::Relaxed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn ids_never_repeat_across_threads() {
        let handles: Vec<_> = (0..4)
            .map(|_| std::thread::spawn(|| (0..1000).map(|_| rand_id()).collect::<Vec<_>>()))
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().expect("thread") {
                assert!(seen.insert(id));
            }
        }
    }
}
