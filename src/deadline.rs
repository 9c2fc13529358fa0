use std::{
    future::Future,
    time::{Duration, Instant},
};

use async_std::future::timeout;
use tracing::{debug, info};

/// A one shot countdown. While armed, futures passed to `watch` are raced against it.
///
/// The guard lives on the same task as the futures it watches, so `fired` never needs any
/// synchronization.
#[derive(Debug, Clone)]
pub struct DeadlineGuard {
    duration: Duration,
    expires_at: Option<Instant>,
    fired: bool,
}

impl DeadlineGuard {
    /// Create a new disarmed guard
    #[inline]
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            expires_at: None,
            fired: false,
        }
    }

    /// (Re)starts the countdown with the full duration
    pub fn arm(&mut self) {
        if self.fired {
            return;
        }
        self.expires_at = Some(Instant::now() + self.duration);
        debug!(duration = ?self.duration, "deadline armed");
    }

    /// Cancels the countdown. A disarmed guard never fires.
    pub fn disarm(&mut self) {
        if self.expires_at.take().is_some() {
            debug!("deadline disarmed");
        }
    }

    #[inline]
    pub fn is_armed(&self) -> bool {
        self.expires_at.is_some()
    }

    #[inline]
    pub fn has_fired(&self) -> bool {
        self.fired
    }

    #[inline]
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Time left until the guard fires, `None` if disarmed
    pub fn remaining(&self) -> Option<Duration> {
        self.expires_at
            .map(|at| at.saturating_duration_since(Instant::now()))
    }

    /// Awaits `fut` unless the guard expires first, in which case `None` is returned and the
    /// guard is marked as fired. If `fut` is ready at the moment the guard expires, its output
    /// wins.
    pub async fn watch<F: Future>(&mut self, fut: F) -> Option<F::Output> {
        let remaining = match self.remaining() {
            Some(remaining) => remaining,
            None => return Some(fut.await),
        };

        // `timeout` polls `fut` before checking its timer
        match timeout(remaining, fut).await {
            Ok(out) => Some(out),
            Err(_) => {
                self.fired = true;
                self.expires_at = None;
                info!(duration = ?self.duration, "deadline expired");
                None
            }
        }
    }
}
