use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::harness::{CancellationHandle, LineResult};

/// Ticket for one run of one document: the token that must still be
/// current at commit time, plus the cancellation handle wired into the
/// harness.
#[derive(Debug, Clone)]
pub struct RunTicket {
    pub token: u64,
    pub cancel: CancellationHandle,
}

#[derive(Debug, Default)]
struct DocumentSlot {
    token: u64,
    cancel: CancellationHandle,
    last_start: Option<Instant>,
    results: Option<Vec<LineResult>>,
}

/// Per-document run bookkeeping. Starting a run supersedes any in-flight
/// run for the same document (its handle is cancelled, the token moves
/// on); only the run holding the current token may commit results, so a
/// stale run can never clobber a newer one. Documents are independent.
#[derive(Debug)]
pub struct DocumentSessionRegistry {
    slots: Mutex<HashMap<String, DocumentSlot>>,
    debounce: Duration,
}

impl DocumentSessionRegistry {
    pub fn new(debounce: Duration) -> Self {
        DocumentSessionRegistry {
            slots: Mutex::new(HashMap::new()),
            debounce,
        }
    }

    /// Begin a run for `document`. Returns None when a run was already
    /// initiated within the debounce window.
    pub fn begin_run(&self, document: &str) -> Option<RunTicket> {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        let slot = slots.entry(document.to_string()).or_default();

        let now = Instant::now();
        if let Some(last) = slot.last_start {
            if now.duration_since(last) < self.debounce {
                debug!(document, "run suppressed by debounce window");
                return None;
            }
        }

        slot.cancel.request_cancel();
        slot.token += 1;
        slot.cancel = CancellationHandle::new();
        slot.last_start = Some(now);

        debug!(document, token = slot.token, "run started");
        Some(RunTicket {
            token: slot.token,
            cancel: slot.cancel.clone(),
        })
    }

    /// Commit results for `document`. Rejected (returns false) unless
    /// `token` is still the document's current token.
    pub fn commit(&self, document: &str, token: u64, results: Vec<LineResult>) -> bool {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        match slots.get_mut(document) {
            Some(slot) if slot.token == token => {
                slot.results = Some(results);
                true
            }
            _ => {
                debug!(document, token, "stale commit rejected");
                false
            }
        }
    }

    /// Last committed results for `document`, if any.
    pub fn results(&self, document: &str) -> Option<Vec<LineResult>> {
        let slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.get(document).and_then(|s| s.results.clone())
    }
}
