//! Caller-owned view state and the orchestration around it.
//!
//! Every asynchronous operation is issued a ticket carrying a sequence
//! number. Results are applied only when their ticket is still the latest of
//! its kind, so a slow refresh or investigation can never overwrite the
//! outcome of a newer one.

use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::correlate::{correlate, AlertRow};
use crate::error::{InvestigatorError, Result};
use crate::investigate::Investigator;
use crate::provider::AlertSource;
use crate::types::{ActiveAlert, AlertRule, InvestigationResult, Snapshot};

/// Handle for an in-flight refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshTicket {
    seq: u64,
}

/// Handle for an in-flight investigation of one alert row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvestigationTicket {
    seq: u64,
    index: usize,
}

impl InvestigationTicket {
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }
}

/// Everything the alert page shows.
#[derive(Debug, Clone, Default)]
pub struct ViewState {
    alerts: Vec<ActiveAlert>,
    rules: Vec<AlertRule>,
    result: Option<InvestigationResult>,
    show_result: bool,
    loading_index: Option<usize>,
    refreshing: bool,
    last_error: Option<String>,
    next_seq: u64,
    latest_refresh: u64,
    latest_investigation: u64,
}

impl ViewState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn issue(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    /// Start a refresh. Any earlier refresh still in flight becomes stale.
    pub fn begin_refresh(&mut self) -> RefreshTicket {
        let seq = self.issue();
        self.latest_refresh = seq;
        self.refreshing = true;
        RefreshTicket { seq }
    }

    /// Apply the outcome of a refresh.
    ///
    /// Returns `false` when the ticket was superseded. On failure the
    /// previous alerts and rules stay in place.
    pub fn apply_refresh(
        &mut self,
        ticket: RefreshTicket,
        outcome: std::result::Result<Snapshot, String>,
    ) -> bool {
        if ticket.seq != self.latest_refresh {
            debug!(seq = ticket.seq, latest = self.latest_refresh, "Discarding stale refresh");
            return false;
        }

        self.refreshing = false;
        match outcome {
            Ok(snapshot) => {
                self.alerts = snapshot
                    .alerts
                    .into_iter()
                    .filter(ActiveAlert::is_active)
                    .collect();
                self.rules = snapshot.rules;
                self.last_error = None;
            }
            Err(message) => {
                self.last_error = Some(message);
            }
        }
        true
    }

    /// Start investigating the alert at `index`.
    ///
    /// Refused with [`InvestigatorError::Busy`] while another investigation
    /// is loading, and with [`InvestigatorError::InvalidIndex`] when the row
    /// does not exist.
    pub fn begin_investigation(&mut self, index: usize) -> Result<InvestigationTicket> {
        if let Some(busy) = self.loading_index {
            return Err(InvestigatorError::Busy { index: busy });
        }
        let count = self.alerts.len();
        if index >= count {
            return Err(InvestigatorError::InvalidIndex { index, count });
        }
        let seq = self.issue();
        self.latest_investigation = seq;
        self.loading_index = Some(index);
        self.result = None;
        Ok(InvestigationTicket { seq, index })
    }

    /// Record an investigation outcome.
    ///
    /// The loading marker set by this ticket is always cleared. The result is
    /// only shown if no newer investigation has started since.
    pub fn complete_investigation(
        &mut self,
        ticket: InvestigationTicket,
        result: InvestigationResult,
    ) -> bool {
        self.clear_loading(ticket);
        if ticket.seq != self.latest_investigation {
            debug!(seq = ticket.seq, latest = self.latest_investigation, "Discarding stale investigation");
            return false;
        }
        self.result = Some(result);
        self.show_result = true;
        true
    }

    /// Drop an investigation that ended without a result. Only the loading
    /// marker is touched.
    pub fn abandon_investigation(&mut self, ticket: InvestigationTicket) {
        self.clear_loading(ticket);
    }

    fn clear_loading(&mut self, ticket: InvestigationTicket) {
        if self.loading_index == Some(ticket.index) {
            self.loading_index = None;
        }
    }

    /// Hide the result panel. The result itself stays until the next
    /// investigation starts.
    pub fn dismiss_result(&mut self) {
        self.show_result = false;
    }

    /// Correlated rows for the current snapshot.
    #[must_use]
    pub fn rows(&self) -> Vec<AlertRow> {
        self.alerts
            .iter()
            .map(|a| correlate(a, &self.rules))
            .collect()
    }

    #[must_use]
    pub fn alerts(&self) -> &[ActiveAlert] {
        &self.alerts
    }

    #[must_use]
    pub fn rules(&self) -> &[AlertRule] {
        &self.rules
    }

    #[must_use]
    pub fn result(&self) -> Option<&InvestigationResult> {
        self.result.as_ref()
    }

    #[must_use]
    pub fn is_result_visible(&self) -> bool {
        self.show_result && self.result.is_some()
    }

    #[must_use]
    pub fn loading_index(&self) -> Option<usize> {
        self.loading_index
    }

    /// Whether the row's investigate action should be disabled.
    #[must_use]
    pub fn is_loading(&self, index: usize) -> bool {
        self.loading_index == Some(index)
    }

    #[must_use]
    pub fn is_refreshing(&self) -> bool {
        self.refreshing
    }

    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}

/// Owns the loading marker of one investigation.
///
/// Dropping the guard without calling [`LoadingGuard::complete`] (the caller
/// gave up on the future, or the provider panicked) still clears the marker.
struct LoadingGuard {
    state: Arc<RwLock<ViewState>>,
    ticket: Option<InvestigationTicket>,
}

impl LoadingGuard {
    fn new(state: Arc<RwLock<ViewState>>, ticket: InvestigationTicket) -> Self {
        Self {
            state,
            ticket: Some(ticket),
        }
    }

    async fn complete(mut self, result: InvestigationResult) {
        let mut state = self.state.write().await;
        if let Some(ticket) = self.ticket.take() {
            state.complete_investigation(ticket, result);
        }
    }
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        let Some(ticket) = self.ticket.take() else {
            return;
        };
        warn!(index = ticket.index, "Investigation abandoned before completing");

        if let Ok(mut state) = self.state.try_write() {
            state.abandon_investigation(ticket);
            return;
        }
        // Lock is busy; finish the cleanup once it frees up.
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let state = Arc::clone(&self.state);
            handle.spawn(async move {
                state.write().await.abandon_investigation(ticket);
            });
        }
    }
}

/// Drives refreshes and investigations against a shared [`ViewState`].
///
/// The state lock is never held across a network call.
pub struct Dashboard {
    state: Arc<RwLock<ViewState>>,
    source: Arc<dyn AlertSource>,
    investigator: Investigator,
}

impl Dashboard {
    pub fn new(source: Arc<dyn AlertSource>, investigator: Investigator) -> Self {
        Self {
            state: Arc::new(RwLock::new(ViewState::new())),
            source,
            investigator,
        }
    }

    /// Shared handle to the state, for renderers.
    #[must_use]
    pub fn state(&self) -> Arc<RwLock<ViewState>> {
        Arc::clone(&self.state)
    }

    /// Copy of the current state.
    pub async fn snapshot(&self) -> ViewState {
        self.state.read().await.clone()
    }

    pub async fn rows(&self) -> Vec<AlertRow> {
        self.state.read().await.rows()
    }

    /// Reload alerts and rules.
    ///
    /// Alerts are fetched first, then rules; both must arrive before the new
    /// snapshot replaces the old one. Failures are logged and leave the
    /// previous data displayed. Returns whether this refresh was applied.
    pub async fn refresh(&self) -> bool {
        let ticket = self.state.write().await.begin_refresh();

        let outcome = self.fetch_snapshot().await.map_err(|e| {
            error!(error = %e, "Error fetching data");
            e.to_string()
        });

        if let Ok(snapshot) = &outcome {
            info!(
                alerts = snapshot.alerts.len(),
                rules = snapshot.rules.len(),
                "Fetched alerts and rules"
            );
        }

        self.state.write().await.apply_refresh(ticket, outcome)
    }

    async fn fetch_snapshot(&self) -> Result<Snapshot> {
        let alerts = self.source.fetch_alerts().await?;
        let rules = self.source.fetch_rules().await?;
        Ok(Snapshot { alerts, rules })
    }

    /// Investigate the alert at `index`.
    ///
    /// Returns the result even if a newer investigation superseded it in the
    /// view. Fails only when the row does not exist or another investigation
    /// is still loading.
    ///
    /// The loading marker is cleared however this future ends, including when
    /// it is dropped before completion.
    pub async fn investigate(&self, index: usize) -> Result<InvestigationResult> {
        let (guard, alert, rules) = {
            let mut state = self.state.write().await;
            let ticket = state
                .begin_investigation(index)
                .inspect_err(|e| warn!(index, error = %e, "Investigation refused"))?;
            let guard = LoadingGuard::new(Arc::clone(&self.state), ticket);
            (guard, state.alerts[index].clone(), state.rules.clone())
        };

        let result = self.investigator.investigate(&alert, &rules).await;

        guard.complete(result.clone()).await;
        Ok(result)
    }
}
