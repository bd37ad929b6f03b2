//! Order tracking by polling the order list.
//!
//! ```ignore
//! let outcome = Tracker::new(&client, &session, key)
//!     .interval(Duration::from_secs(5))
//!     .issue_code("6501")
//!     .run(&CancelToken::new(), |order| {
//!         println!("{}: {} contracted", order.key, order.contracted_quantity);
//!     })?;
//! ```

use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::api::OrderListFilter;
use crate::client::Client;
use crate::codes::{ContractStatus, OrderStatus};
use crate::error::{Error, Result};
use crate::session::Session;
use crate::types::{OrderKey, OrderSnapshot};

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_MAX_POLLS: u32 = 720;
pub const DEFAULT_MISSING_TOLERANCE: u32 = 3;

/// The parts of an order whose change triggers a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Observation {
    pub contracted_quantity: u64,
    pub order_status: OrderStatus,
    pub contract_status: ContractStatus,
}

impl Observation {
    pub fn of(order: &OrderSnapshot) -> Self {
        Self {
            contracted_quantity: order.contracted_quantity,
            order_status: order.order_status,
            contract_status: order.contract_status,
        }
    }
}

/// How tracking ended. `last_seen` is the most recent snapshot, if any poll
/// found the order at all.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TrackOutcome {
    Completed(OrderSnapshot),
    Cancelled { last_seen: Option<OrderSnapshot> },
    /// The order was missing from more consecutive polls than tolerated.
    Vanished { last_seen: Option<OrderSnapshot> },
    /// The poll limit was reached first.
    Abandoned { last_seen: Option<OrderSnapshot> },
}

/// Shared cancellation flag with an interruptible wait. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        let (lock, cvar) = &*self.inner;
        *self.flag(lock) = true;
        cvar.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *self.flag(&self.inner.0)
    }

    /// Sleep up to `timeout`. Returns `true` if cancelled.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let (lock, cvar) = &*self.inner;
        let guard = self.flag(lock);
        let (guard, _) = cvar
            .wait_timeout_while(guard, timeout, |cancelled| !*cancelled)
            .unwrap_or_else(|e| e.into_inner());
        *guard
    }

    fn flag<'a>(&self, lock: &'a Mutex<bool>) -> MutexGuard<'a, bool> {
        lock.lock().unwrap_or_else(|e| e.into_inner())
    }
}

type Predicate<'a> = Box<dyn Fn(&OrderSnapshot) -> bool + 'a>;

/// Polls one order until a predicate holds. Runs on the caller's thread.
pub struct Tracker<'a> {
    client: &'a Client,
    session: &'a Session,
    key: OrderKey,
    issue_code: Option<String>,
    interval: Duration,
    max_polls: u32,
    missing_tolerance: u32,
    until: Predicate<'a>,
    baseline: Option<Observation>,
}

impl<'a> Tracker<'a> {
    pub fn new(client: &'a Client, session: &'a Session, key: OrderKey) -> Self {
        Self {
            client,
            session,
            key,
            issue_code: None,
            interval: DEFAULT_INTERVAL,
            max_polls: DEFAULT_MAX_POLLS,
            missing_tolerance: DEFAULT_MISSING_TOLERANCE,
            until: Box::new(OrderSnapshot::is_fully_contracted),
            baseline: None,
        }
    }

    /// Minimum time between poll starts.
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// At least one poll always happens.
    pub fn max_polls(mut self, max_polls: u32) -> Self {
        self.max_polls = max_polls.max(1);
        self
    }

    /// Consecutive polls the order may be absent before it counts as gone.
    pub fn missing_tolerance(mut self, tolerance: u32) -> Self {
        self.missing_tolerance = tolerance;
        self
    }

    /// Narrow the order list to one issue.
    pub fn issue_code(mut self, issue_code: impl Into<String>) -> Self {
        self.issue_code = Some(issue_code.into());
        self
    }

    /// Stop when `predicate` holds. Defaults to contract status done.
    pub fn until(mut self, predicate: impl Fn(&OrderSnapshot) -> bool + 'a) -> Self {
        self.until = Box::new(predicate);
        self
    }

    /// Compare the first poll against a known state instead of treating it
    /// as the baseline.
    pub fn baseline(mut self, observation: Observation) -> Self {
        self.baseline = Some(observation);
        self
    }

    /// Poll until done, cancelled, vanished or out of polls. `on_change` is
    /// called with every snapshot that differs from the previous observation.
    pub fn run<F>(&self, cancel: &CancelToken, mut on_change: F) -> Result<TrackOutcome>
    where
        F: FnMut(&OrderSnapshot),
    {
        let filter = match &self.issue_code {
            Some(issue) => OrderListFilter::for_issue(issue.clone()),
            None => OrderListFilter::default(),
        };
        let mut previous = self.baseline;
        let mut last_seen: Option<OrderSnapshot> = None;
        let mut misses = 0u32;
        let mut polls = 0u32;

        info!("Tracking order {} every {:?}", self.key, self.interval);
        loop {
            if cancel.is_cancelled() {
                return Ok(TrackOutcome::Cancelled { last_seen });
            }

            let started = Instant::now();
            polls += 1;
            let list = self.client.order_list(self.session, &filter)?;
            if !list.status.is_success() {
                return Err(Error::Rejected(list.status));
            }

            match list.find(&self.key) {
                Some(order) => {
                    misses = 0;
                    let observed = Observation::of(order);
                    match previous {
                        None => debug!("Baseline for {}: {observed:?}", self.key),
                        Some(prev) if prev != observed => on_change(order),
                        Some(_) => {}
                    }
                    previous = Some(observed);
                    last_seen = Some(order.clone());

                    if (self.until)(order) {
                        info!("Order {} reached its target state", self.key);
                        return Ok(TrackOutcome::Completed(order.clone()));
                    }
                }
                None => {
                    misses += 1;
                    if misses > self.missing_tolerance {
                        warn!("Order {} missing from {misses} consecutive polls", self.key);
                        return Ok(TrackOutcome::Vanished { last_seen });
                    }
                    warn!(
                        "Order {} not in order list ({misses}/{})",
                        self.key, self.missing_tolerance
                    );
                }
            }

            if polls >= self.max_polls {
                warn!("Giving up on order {} after {polls} polls", self.key);
                return Ok(TrackOutcome::Abandoned { last_seen });
            }

            if cancel.wait_timeout(self.interval.saturating_sub(started.elapsed())) {
                return Ok(TrackOutcome::Cancelled { last_seen });
            }
        }
    }
}
