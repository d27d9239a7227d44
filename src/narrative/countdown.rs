//! Cancellable one-shot timer
//!
//! A `Countdown` sleeps on the tokio clock and then invokes its callback with
//! the generation it was armed with. Cancelling (or dropping) aborts the
//! sleeping task. The callback is synchronous, so once it has started it
//! always runs to completion; callers that race a cancel against a firing
//! must compare generations inside the callback under their own lock.

use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Armed one-shot timer
#[derive(Debug)]
pub struct Countdown {
    generation: u64,
    deadline: Instant,
    task: JoinHandle<()>,
}

impl Countdown {
    /// Arm a countdown that calls `on_fire(generation)` after `duration`
    pub fn arm<F>(runtime: &Handle, generation: u64, duration: Duration, on_fire: F) -> Self
    where
        F: FnOnce(u64) + Send + 'static,
    {
        let deadline = Instant::now() + duration;
        let task = runtime.spawn(async move {
            tokio::time::sleep_until(deadline).await;
            on_fire(generation);
        });

        Self {
            generation,
            deadline,
            task,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Time left before firing; zero once the deadline passed
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    /// Abort the timer; a no-op if it already fired
    pub fn cancel(self) {
        drop(self);
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        self.task.abort();
    }
}
