//! The Epoch Manager / Change Observer's epoch side (spec §4.7): one
//! monotonic counter per domain, with blocking-wait-with-timeout waiters.
//!
//! Grounded on `knhk-autonomic::controller::AutonomicController`'s
//! `Arc<AtomicU64>` + notification pattern (teacher: `seanchatmangpt-knhk`):
//! `tokio::sync::Notify` paired with an `AtomicU64` is the async analogue —
//! spurious wakeups are fine (we just re-check the counter), missed
//! wakeups are not (the `Notify` is armed before the check, per its own
//! documented usage pattern).

pub use spalloc_model::EpochDomain;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

#[derive(Debug, Default)]
struct Counter {
    value: AtomicU64,
    notify: Notify,
}

/// Owns the three epoch counters. Cheap to clone; all engines share one
/// instance.
#[derive(Clone)]
pub struct EpochManager {
    machine: Arc<Counter>,
    job: Arc<Counter>,
    blacklist: Arc<Counter>,
}

impl Default for EpochManager {
    fn default() -> Self {
        Self::new()
    }
}

impl EpochManager {
    pub fn new() -> Self {
        Self { machine: Arc::default(), job: Arc::default(), blacklist: Arc::default() }
    }

    fn counter(&self, domain: EpochDomain) -> &Arc<Counter> {
        match domain {
            EpochDomain::Machine => &self.machine,
            EpochDomain::Job => &self.job,
            EpochDomain::Blacklist => &self.blacklist,
        }
    }

    pub fn current(&self, domain: EpochDomain) -> u64 {
        self.counter(domain).value.load(Ordering::SeqCst)
    }

    /// Bump a domain's counter exactly once and wake every waiter (spec
    /// §4.7: "after any mutation that affects a domain... increments the
    /// corresponding counter exactly once and signals all waiters").
    pub fn bump(&self, domain: EpochDomain) -> u64 {
        let counter = self.counter(domain);
        let new = counter.value.fetch_add(1, Ordering::SeqCst) + 1;
        counter.notify.notify_waiters();
        new
    }

    /// Block until `domain`'s epoch exceeds `known`, or `timeout` elapses.
    /// Returns the epoch observed either way (spec §4.8 `waitFor`).
    pub async fn wait_for(&self, domain: EpochDomain, known: u64, timeout: Duration) -> u64 {
        let counter = self.counter(domain);
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let now = counter.value.load(Ordering::SeqCst);
            if now > known {
                return now;
            }
            let notified = counter.notify.notified();
            tokio::pin!(notified);
            // Arm the waiter before the next check so a bump between our
            // load above and now is not missed.
            notified.as_mut().enable();
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                return counter.value.load(Ordering::SeqCst);
            }
            let _ = tokio::time::timeout(remaining, notified).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn zero_timeout_returns_immediately_without_a_bump() {
        let mgr = EpochManager::new();
        let got = mgr.wait_for(EpochDomain::Job, 0, Duration::from_millis(0)).await;
        assert_eq!(got, 0);
    }

    #[tokio::test]
    async fn bump_wakes_a_concurrent_waiter() {
        let mgr = EpochManager::new();
        let waiter = {
            let mgr = mgr.clone();
            tokio::spawn(async move { mgr.wait_for(EpochDomain::Machine, 0, Duration::from_secs(5)).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        let new_epoch = mgr.bump(EpochDomain::Machine);
        let observed = waiter.await.unwrap();
        assert_eq!(observed, new_epoch);
    }

    #[tokio::test]
    async fn domains_are_independent() {
        let mgr = EpochManager::new();
        mgr.bump(EpochDomain::Job);
        assert_eq!(mgr.current(EpochDomain::Job), 1);
        assert_eq!(mgr.current(EpochDomain::Machine), 0);
    }
}
