//! Ingestion cycle.
//!
//! One cycle reads the cursor, fetches updates newer than it, handles them
//! in id order, delivers the replies, then persists the highest update id
//! that was fully handled. The cursor only ever moves forward.
//!
//! Phases: Idle -> Fetching -> Processing -> Advancing -> Idle. Any phase
//! may drop back to Idle when the cycle aborts.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use memobot_core::config::CycleConfig;
use memobot_core::types::{Offset, Update, UserId};
use memobot_storage::BotStore;

use crate::dispatcher::Dispatcher;
use crate::error::BotError;
use crate::fetcher::{ReplySender, UpdateFetcher};
use crate::retry::RetryPolicy;

// =============================================================================
// Phases
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CyclePhase {
    Idle,
    Fetching,
    Processing,
    Advancing,
}

/// Validate a phase transition.
///
/// Valid transitions:
/// - Idle -> Fetching
/// - Fetching -> Processing
/// - Processing -> Advancing
/// - Fetching/Processing/Advancing -> Idle
pub fn validate_transition(from: CyclePhase, to: CyclePhase) -> Result<(), BotError> {
    let valid = matches!(
        (from, to),
        (CyclePhase::Idle, CyclePhase::Fetching)
            | (CyclePhase::Fetching, CyclePhase::Processing)
            | (CyclePhase::Processing, CyclePhase::Advancing)
            | (CyclePhase::Fetching, CyclePhase::Idle)
            | (CyclePhase::Processing, CyclePhase::Idle)
            | (CyclePhase::Advancing, CyclePhase::Idle)
    );

    if valid {
        Ok(())
    } else {
        Err(BotError::InvalidTransition(from, to))
    }
}

#[derive(Debug)]
struct PhaseTracker {
    phase: CyclePhase,
}

impl PhaseTracker {
    fn new() -> Self {
        Self {
            phase: CyclePhase::Idle,
        }
    }

    fn enter(&mut self, to: CyclePhase) -> Result<(), BotError> {
        validate_transition(self.phase, to)?;
        debug!(from = ?self.phase, to = ?to, "Cycle phase");
        self.phase = to;
        Ok(())
    }

    /// Drop back to Idle after an abort.
    fn reset(&mut self) {
        if self.phase != CyclePhase::Idle {
            debug!(from = ?self.phase, "Cycle phase reset");
            self.phase = CyclePhase::Idle;
        }
    }
}

// =============================================================================
// Outcome
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleStatus {
    /// Every fetched update was handled.
    Completed,
    /// Some updates were left for the next cycle (store failure, time
    /// budget, or a cursor write that did not land).
    Partial,
    /// Nothing was handled: cursor, fetch, or config failure.
    Aborted,
    /// The cycle is switched off in config.
    Disabled,
}

impl CycleStatus {
    /// Process exit code for this status.
    pub fn exit_code(self) -> u8 {
        match self {
            CycleStatus::Completed | CycleStatus::Disabled => 0,
            CycleStatus::Partial => 1,
            CycleStatus::Aborted => 2,
        }
    }
}

/// Result of one cycle. Never an error: failures are described inside.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleOutcome {
    pub status: CycleStatus,
    pub processed: usize,
    pub previous_offset: Option<Offset>,
    pub last_offset: Option<Offset>,
    pub errors: Vec<String>,
}

impl CycleOutcome {
    pub fn disabled() -> Self {
        Self {
            status: CycleStatus::Disabled,
            processed: 0,
            previous_offset: None,
            last_offset: None,
            errors: Vec::new(),
        }
    }

    pub fn aborted(offset: Option<Offset>, error: impl Into<String>) -> Self {
        Self {
            status: CycleStatus::Aborted,
            processed: 0,
            previous_offset: offset,
            last_offset: offset,
            errors: vec![error.into()],
        }
    }
}

// =============================================================================
// Batch processing
// =============================================================================

/// A reply produced while handling a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub user_id: UserId,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    BudgetExhausted,
    StoreFailure { update_id: Offset },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchResult {
    /// Highest update id fully handled, or the input cursor.
    pub new_cursor: Option<Offset>,
    pub replies: Vec<Reply>,
    pub errors: Vec<String>,
    pub processed: usize,
    pub stopped: Option<StopReason>,
}

/// Handle `updates` in id order, starting after `cursor`.
///
/// Stops at the first update whose handling fails or once `deadline` has
/// passed; `new_cursor` never covers an update that was not completed.
pub async fn process_batch(
    cursor: Option<Offset>,
    mut updates: Vec<Update>,
    dispatcher: &Dispatcher,
    deadline: Instant,
) -> BatchResult {
    updates.sort_by_key(|u| u.id);
    updates.dedup_by_key(|u| u.id);

    let mut result = BatchResult {
        new_cursor: cursor,
        replies: Vec::new(),
        errors: Vec::new(),
        processed: 0,
        stopped: None,
    };

    for update in updates {
        if cursor.is_some_and(|c| update.id <= c) {
            debug!(update_id = update.id, "Skipping already handled update");
            continue;
        }
        if Instant::now() >= deadline {
            warn!(update_id = update.id, "Time budget exhausted, deferring rest of batch");
            result
                .errors
                .push(format!("time budget exhausted before update {}", update.id));
            result.stopped = Some(StopReason::BudgetExhausted);
            break;
        }

        if let Some(message) = &update.message {
            match dispatcher.handle(update.id, message).await {
                Ok(Some(text)) => result.replies.push(Reply {
                    user_id: message.user_id,
                    text,
                }),
                Ok(None) => {}
                Err(e) => {
                    error!(update_id = update.id, error = %e, "Update failed, stopping batch");
                    result.errors.push(format!("update {}: {}", update.id, e));
                    result.stopped = Some(StopReason::StoreFailure {
                        update_id: update.id,
                    });
                    break;
                }
            }
        }

        result.new_cursor = Some(update.id);
        result.processed += 1;
    }

    result
}

// =============================================================================
// IngestCycle
// =============================================================================

pub struct IngestCycle {
    store: Arc<dyn BotStore>,
    fetcher: Arc<dyn UpdateFetcher>,
    sender: Arc<dyn ReplySender>,
    dispatcher: Dispatcher,
    enabled: bool,
    time_budget: Duration,
    retry: RetryPolicy,
}

impl IngestCycle {
    pub fn new(
        store: Arc<dyn BotStore>,
        fetcher: Arc<dyn UpdateFetcher>,
        sender: Arc<dyn ReplySender>,
        dispatcher: Dispatcher,
        config: &CycleConfig,
    ) -> Self {
        Self {
            store,
            fetcher,
            sender,
            dispatcher,
            enabled: config.enabled,
            time_budget: Duration::from_secs(config.time_budget_secs),
            retry: RetryPolicy::from_config(config),
        }
    }

    /// Override the retry policy used for cursor reads and writes.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_time_budget(mut self, budget: Duration) -> Self {
        self.time_budget = budget;
        self
    }

    /// Run one cycle.
    pub async fn run(&self) -> CycleOutcome {
        if !self.enabled {
            info!("Ingestion cycle disabled");
            return CycleOutcome::disabled();
        }

        let deadline = Instant::now() + self.time_budget;
        let mut phase = PhaseTracker::new();
        let outcome = match self.run_phases(&mut phase, deadline).await {
            Ok(outcome) => outcome,
            Err((offset, e)) => {
                error!(error = %e, phase = ?phase.phase, "Cycle aborted");
                CycleOutcome::aborted(offset, e.to_string())
            }
        };
        phase.reset();

        info!(
            status = ?outcome.status,
            processed = outcome.processed,
            previous_offset = ?outcome.previous_offset,
            last_offset = ?outcome.last_offset,
            errors = outcome.errors.len(),
            "Cycle finished"
        );
        outcome
    }

    async fn run_phases(
        &self,
        phase: &mut PhaseTracker,
        deadline: Instant,
    ) -> Result<CycleOutcome, (Option<Offset>, BotError)> {
        phase.enter(CyclePhase::Fetching).map_err(|e| (None, e))?;

        let previous = self
            .retry
            .run_sync("read_cursor", || self.store.read_cursor())
            .await
            .map_err(|e| (None, BotError::from(e)))?;

        let updates = self
            .fetcher
            .fetch_updates(previous)
            .await
            .map_err(|e| (previous, BotError::from(e)))?;
        debug!(count = updates.len(), offset = ?previous, "Updates fetched");

        phase
            .enter(CyclePhase::Processing)
            .map_err(|e| (previous, e))?;
        let batch = process_batch(previous, updates, &self.dispatcher, deadline).await;
        self.deliver(&batch.replies).await;

        phase
            .enter(CyclePhase::Advancing)
            .map_err(|e| (previous, e))?;
        let mut errors = batch.errors;
        let mut last_offset = previous;
        if let Some(new_cursor) = batch.new_cursor.filter(|c| previous.map_or(true, |p| *c > p)) {
            match self
                .retry
                .run_sync("advance_cursor", || self.store.advance_cursor(new_cursor))
                .await
            {
                Ok(stored) => {
                    debug!(offset = stored, "Cursor advanced");
                    last_offset = Some(stored);
                }
                Err(e) => {
                    error!(offset = new_cursor, error = %e, "Failed to persist cursor");
                    errors.push(format!("cursor write failed: {}", e));
                }
            }
        }

        phase.enter(CyclePhase::Idle).map_err(|e| (last_offset, e))?;

        let status = if errors.is_empty() {
            CycleStatus::Completed
        } else {
            CycleStatus::Partial
        };
        Ok(CycleOutcome {
            status,
            processed: batch.processed,
            previous_offset: previous,
            last_offset,
            errors,
        })
    }

    /// Best-effort delivery. Failures are logged; stored data is kept.
    async fn deliver(&self, replies: &[Reply]) {
        for reply in replies {
            if let Err(e) = self.sender.send_reply(reply.user_id, &reply.text).await {
                warn!(user_id = reply.user_id, error = %e, "Reply delivery failed");
            }
        }
    }
}
