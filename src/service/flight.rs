//! Single-flight table: at most one computation per fingerprint at a time.
//!
//! The first caller for a fingerprint becomes the leader and receives a
//! [`FlightGuard`]; later callers become followers and wait for the leader's
//! outcome. If the leader is dropped before finishing (client disconnect or
//! panic), the flight is marked abandoned and followers retry, one of them
//! becoming the new leader.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::Notify;

use crate::color::ColorResult;
use crate::error::ColorError;
use crate::gateway::Fingerprint;

pub(crate) type Outcome = Result<ColorResult, ColorError>;

enum FlightState {
    Running,
    Finished(Outcome),
    Abandoned,
}

pub(crate) struct Flight {
    state: Mutex<FlightState>,
    notify: Notify,
}

impl Flight {
    fn new() -> Self {
        Self {
            state: Mutex::new(FlightState::Running),
            notify: Notify::new(),
        }
    }

    /// `None` while running, `Some(None)` once abandoned.
    fn settled(&self) -> Option<Option<Outcome>> {
        match &*lock(&self.state) {
            FlightState::Running => None,
            FlightState::Finished(outcome) => Some(Some(outcome.clone())),
            FlightState::Abandoned => Some(None),
        }
    }

    /// Wait for the leader. Returns `None` if the leader gave up.
    pub(crate) async fn wait(&self) -> Option<Outcome> {
        let notified = self.notify.notified();
        tokio::pin!(notified);
        // Register before checking state so a notification in between is not lost
        notified.as_mut().enable();

        if let Some(settled) = self.settled() {
            return settled;
        }

        notified.await;
        self.settled().flatten()
    }
}

pub(crate) enum Join<'a> {
    Leader(FlightGuard<'a>),
    Follower(Arc<Flight>),
}

#[derive(Default)]
pub(crate) struct FlightTable {
    flights: Mutex<HashMap<Fingerprint, Arc<Flight>>>,
}

impl FlightTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Join the flight for `key`, starting one if none is running.
    pub(crate) fn join(&self, key: &Fingerprint) -> Join<'_> {
        let mut flights = lock(&self.flights);

        if let Some(flight) = flights.get(key) {
            return Join::Follower(flight.clone());
        }

        let flight = Arc::new(Flight::new());
        flights.insert(key.clone(), flight.clone());

        Join::Leader(FlightGuard {
            table: self,
            key: key.clone(),
            flight,
        })
    }

    /// Number of computations currently running.
    pub(crate) fn len(&self) -> usize {
        lock(&self.flights).len()
    }
}

/// Leadership of one flight. Dropping it without [`finish`](Self::finish)
/// abandons the flight.
pub(crate) struct FlightGuard<'a> {
    table: &'a FlightTable,
    key: Fingerprint,
    flight: Arc<Flight>,
}

impl FlightGuard<'_> {
    /// Publish `outcome` to every follower and end the flight.
    pub(crate) fn finish(self, outcome: Outcome) {
        *lock(&self.flight.state) = FlightState::Finished(outcome);
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        {
            let mut state = lock(&self.flight.state);
            if matches!(*state, FlightState::Running) {
                *state = FlightState::Abandoned;
            }
        }

        {
            let mut flights = lock(&self.table.flights);
            if flights
                .get(&self.key)
                .is_some_and(|current| Arc::ptr_eq(current, &self.flight))
            {
                flights.remove(&self.key);
            }
        }

        self.flight.notify.notify_waiters();
    }
}

// Critical sections never panic, so a poisoned lock still holds valid data.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
