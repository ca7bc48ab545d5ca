/*!
Identifier generation for image references and history entries.
*/

use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

static LAST_HISTORY_ID: AtomicU64 = AtomicU64::new(0);

/// Generate a unique id for an image reference.
pub fn new_reference_id() -> String {
    Uuid::new_v4().to_string()
}

/// Generate the next history entry id.
///
/// Ids are Unix milliseconds, bumped forward when two entries are created
/// within the same millisecond, so they are strictly increasing per process.
pub fn next_history_id() -> u64 {
    let now = Utc::now().timestamp_millis().max(0) as u64;
    let mut last = LAST_HISTORY_ID.load(Ordering::Relaxed);
    loop {
        let next = now.max(last + 1);
        match LAST_HISTORY_ID.compare_exchange_weak(last, next, Ordering::AcqRel, Ordering::Relaxed)
        {
            Ok(_) => return next,
            Err(observed) => last = observed,
        }
    }
}

/// Unique suffix for a scratch directory name: `<unix-millis>_<uuid-simple>`.
pub fn scratch_suffix() -> String {
    format!(
        "{}_{}",
        Utc::now().timestamp_millis(),
        Uuid::new_v4().simple()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_reference_ids_are_unique() {
        let ids: HashSet<String> = (0..1000).map(|_| new_reference_id()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn test_history_ids_strictly_increase() {
        let mut previous = next_history_id();
        for _ in 0..500 {
            let id = next_history_id();
            assert!(id > previous);
            previous = id;
        }
    }

    #[test]
    fn test_history_ids_unique_across_threads() {
        let handles: Vec<_> = (0..4)
            .map(|_| std::thread::spawn(|| (0..250).map(|_| next_history_id()).collect::<Vec<_>>()))
            .collect();

        let mut all = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(all.insert(id), "duplicate history id {id}");
            }
        }
        assert_eq!(all.len(), 1000);
    }

    #[test]
    fn test_scratch_suffix_shape() {
        let suffix = scratch_suffix();
        let (millis, random) = suffix.split_once('_').unwrap();
        assert!(millis.parse::<i64>().is_ok());
        assert_eq!(random.len(), 32);
        assert_ne!(scratch_suffix(), suffix);
    }
}
