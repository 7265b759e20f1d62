//! Address search: one geocoding request per submission, and the expiry
//! timers that remove search markers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::sleep;

use crate::controller::ViewEvent;
use crate::geocode::{GeocodeMatch, Geocoder};
use crate::logging::{log, log_search, obj, v_str, Domain, Level, ProfileScope};

pub const NOT_FOUND_NOTICE: &str = "No location found for that address.";
pub const FAILED_NOTICE: &str = "Error searching for address. Please try again.";

#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    Found { query: String, best: GeocodeMatch },
    NotFound { query: String },
    Failed { query: String, error: String },
}

/// Geocode `address`. Returns `None` without sending a request when the
/// address is blank.
pub async fn run_search(geocoder: &dyn Geocoder, address: &str) -> Option<SearchOutcome> {
    let query = address.trim();
    if query.is_empty() {
        return None;
    }
    let _scope = ProfileScope::new("geocode_lookup");
    let outcome = match geocoder.lookup(query).await {
        Ok(matches) => {
            log_search("ok", query, matches.len());
            match matches.into_iter().next() {
                Some(best) => SearchOutcome::Found {
                    query: query.to_string(),
                    best,
                },
                None => SearchOutcome::NotFound {
                    query: query.to_string(),
                },
            }
        }
        Err(e) => {
            log(
                Level::Error,
                Domain::Search,
                "lookup_failed",
                obj(&[("address", v_str(query)), ("msg", v_str(&format!("{:#}", e)))]),
            );
            SearchOutcome::Failed {
                query: query.to_string(),
                error: e.to_string(),
            }
        }
    };
    Some(outcome)
}

/// Orders address submissions. Only the newest submission's result is
/// delivered; a slower, older lookup finishing later is dropped.
#[derive(Debug, Clone, Default)]
pub struct SearchSequence {
    latest: Arc<AtomicU64>,
}

impl SearchSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ticket for a new submission. Supersedes every earlier ticket.
    pub fn issue(&self) -> u64 {
        self.latest.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn is_current(&self, ticket: u64) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket
    }
}

/// [`run_search`] for submission `ticket`. Returns `None` when the address is
/// blank or a newer submission was issued while this one was in flight.
pub async fn run_ticketed(
    seq: &SearchSequence,
    ticket: u64,
    geocoder: &dyn Geocoder,
    address: &str,
) -> Option<SearchOutcome> {
    let outcome = run_search(geocoder, address).await?;
    if !seq.is_current(ticket) {
        log(
            Level::Debug,
            Domain::Search,
            "stale_result",
            obj(&[("address", v_str(address.trim())), ("ticket", serde_json::json!(ticket))]),
        );
        return None;
    }
    Some(outcome)
}

/// What the controller asks of the timer owner after a search event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerRequest {
    Arm { marker_id: u64, after: Duration },
    Cancel { marker_id: u64 },
}

/// One cancellable expiry task per marker. Expiry is delivered as
/// [`ViewEvent::MarkerExpired`] on the driver's event channel.
pub struct MarkerTimers {
    tx: UnboundedSender<ViewEvent>,
    pending: HashMap<u64, JoinHandle<()>>,
}

impl MarkerTimers {
    pub fn new(tx: UnboundedSender<ViewEvent>) -> Self {
        Self {
            tx,
            pending: HashMap::new(),
        }
    }

    pub fn apply(&mut self, req: TimerRequest) {
        match req {
            TimerRequest::Arm { marker_id, after } => self.arm(marker_id, after),
            TimerRequest::Cancel { marker_id } => {
                self.cancel(marker_id);
            }
        }
    }

    pub fn arm(&mut self, marker_id: u64, after: Duration) {
        self.pending.retain(|_, h| !h.is_finished());
        let tx = self.tx.clone();
        let handle = tokio::spawn(async move {
            sleep(after).await;
            let _ = tx.send(ViewEvent::MarkerExpired { marker_id });
        });
        if let Some(old) = self.pending.insert(marker_id, handle) {
            old.abort();
        }
    }

    /// Abort the timer for `marker_id`. Returns false when none was pending.
    pub fn cancel(&mut self, marker_id: u64) -> bool {
        match self.pending.remove(&marker_id) {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    pub fn pending(&self) -> usize {
        self.pending.values().filter(|h| !h.is_finished()).count()
    }
}

impl Drop for MarkerTimers {
    fn drop(&mut self) {
        for (_, handle) in self.pending.drain() {
            handle.abort();
        }
    }
}
