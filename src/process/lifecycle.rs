//! Exit/Wait Protocol
//!
//! Every process owns one [`Lifecycle`], shared with its parent through an
//! `Arc`. The child publishes its exit status and then raises the
//! completion semaphore; the parent blocks on the semaphore and then reads
//! the status.
//!
//! # Invariants
//! - The exit status is written once; later exit paths cannot change it
//! - Completion is raised at most once
//! - The status is published before completion is raised

use core::sync::atomic::{AtomicBool, Ordering};

use spin::Once;

use crate::sync::Semaphore;

use super::EXIT_FAILURE;

/// Exit status and completion signal of one process.
#[derive(Debug)]
pub struct Lifecycle {
    status: Once<i32>,
    completed: Semaphore,
    signalled: AtomicBool,
}

impl Lifecycle {
    /// Create the record for a newly created process.
    pub const fn new() -> Self {
        Self {
            status: Once::new(),
            completed: Semaphore::new(0),
            signalled: AtomicBool::new(false),
        }
    }

    /// Record the exit status. The first call wins.
    ///
    /// Returns the status that is now on record.
    pub fn record_exit(&self, status: i32) -> i32 {
        *self.status.call_once(|| status)
    }

    /// The recorded status, if the process has exited.
    pub fn exit_status(&self) -> Option<i32> {
        self.status.get().copied()
    }

    /// Raise the completion signal.
    ///
    /// Returns `false` if it had already been raised.
    pub fn signal_completion(&self) -> bool {
        if self.signalled.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.completed.up();
        true
    }

    /// Check if the process has terminated.
    pub fn has_completed(&self) -> bool {
        self.signalled.load(Ordering::Acquire)
    }

    /// Block until the process terminates, then return its exit status.
    ///
    /// Consumes the completion signal: only the reaping parent may call this.
    pub fn wait(&self) -> i32 {
        self.completed.down();
        self.exit_status().unwrap_or(EXIT_FAILURE)
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_first_exit_status_wins() {
        let lc = Lifecycle::new();
        assert_eq!(lc.exit_status(), None);
        assert_eq!(lc.record_exit(3), 3);
        assert_eq!(lc.record_exit(-1), 3);
        assert_eq!(lc.exit_status(), Some(3));
    }

    #[test]
    fn test_completion_raised_once() {
        let lc = Lifecycle::new();
        assert!(!lc.has_completed());
        assert!(lc.signal_completion());
        assert!(!lc.signal_completion());
        assert!(lc.has_completed());
        assert_eq!(lc.completed.value(), 1);
    }

    #[test]
    fn test_wait_sees_status_from_other_thread() {
        let lc = Arc::new(Lifecycle::new());
        let child = {
            let lc = Arc::clone(&lc);
            std::thread::spawn(move || {
                std::thread::sleep(std::time::Duration::from_millis(5));
                lc.record_exit(7);
                lc.signal_completion();
            })
        };
        assert_eq!(lc.wait(), 7);
        child.join().unwrap();
    }
}
