//! Per-row progress for the geocoding and amenity passes.
//!
//! Both passes report one unit per listing row, whether the row was
//! answered from the cache, sent to a service, or skipped. The binary
//! renders this as a terminal bar; tests pass [`null_progress`].

use std::sync::Arc;

/// Receives row counts and status text from a pass.
pub trait ProgressCallback: Send + Sync {
    /// Number of listing rows the pass will visit.
    fn set_total(&self, total: u64);

    /// `delta` more rows are done.
    fn inc(&self, delta: u64);

    /// Short status, e.g. the pass name.
    fn set_message(&self, msg: String);

    /// The pass is over; `msg` summarises its counts.
    fn finish(&self, msg: String);
}

/// Discards all progress updates.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn inc(&self, _delta: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish(&self, _msg: String) {}
}

#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct Counting {
        done: Mutex<(u64, u64)>,
    }

    impl ProgressCallback for Counting {
        fn set_total(&self, total: u64) {
            self.done.lock().unwrap().1 = total;
        }
        fn inc(&self, delta: u64) {
            self.done.lock().unwrap().0 += delta;
        }
        fn set_message(&self, _msg: String) {}
        fn finish(&self, _msg: String) {}
    }

    #[test]
    fn callbacks_are_usable_through_shared_handles() {
        let counting = Arc::new(Counting::default());
        let shared: Arc<dyn ProgressCallback> = counting.clone();
        shared.set_total(3);
        shared.inc(1);
        shared.inc(2);
        assert_eq!(*counting.done.lock().unwrap(), (3, 3));

        let null = null_progress();
        null.set_total(10);
        null.finish("done".to_string());
    }
}
