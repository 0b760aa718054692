//! Batch Scheduler
//!
//! Runs the record pipeline over a lazy sequence of records with at most
//! `concurrency` records in flight.
//!
//! # Record lifecycle
//! `Queued → Running → {Completed | Failed}`. A record is admitted only once
//! a permit is free, so the input is pulled no faster than records finish.
//!
//! # Failure isolation
//! - A panic inside one record's pipeline marks that record `Failed`
//! - Sink and dispatch failures are attached to a `Completed` outcome
//! - Duplicate ids after the first are `Failed` without running
//! - On cancellation, records not yet admitted are `Failed` with
//!   `BatchAbort`; records already running finish normally
//!
//! Every input record (after `limit`) ends up with exactly one outcome.
//!
//! # Progress events
//! Events are offered to the channel without waiting. When the receiver
//! falls behind and the channel is full, the event is dropped; a slow
//! consumer never holds up record processing.

use super::{BatchEvent, RecordOutput, RecordPipeline};
use crate::error::{BatchError, PipelineError, SinkError};
use crate::sink::{OutreachDispatcher, ProfileSink};
use crate::types::{BatchResult, RawRecord, RecordOutcome, RecordState};
use crate::utils::panic_message;
use futures::FutureExt;
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Records in flight when no concurrency is configured
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Upper bound on one sink write or dispatch
pub const DEFAULT_SINK_TIMEOUT: Duration = Duration::from_secs(10);

/// Bounded-concurrency batch executor
pub struct BatchScheduler {
    pipeline: Arc<RecordPipeline>,
    sink: Arc<dyn ProfileSink>,
    outreach: Option<Arc<dyn OutreachDispatcher>>,
    event_tx: Option<mpsc::Sender<BatchEvent>>,
    cancel_token: CancellationToken,
    sink_timeout: Duration,
}

impl BatchScheduler {
    pub fn new(pipeline: RecordPipeline, sink: Arc<dyn ProfileSink>) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            sink,
            outreach: None,
            event_tx: None,
            cancel_token: CancellationToken::new(),
            sink_timeout: DEFAULT_SINK_TIMEOUT,
        }
    }

    /// Report progress on `event_tx`. Events that do not fit in the channel
    /// are dropped.
    pub fn with_events(mut self, event_tx: mpsc::Sender<BatchEvent>) -> Self {
        self.event_tx = Some(event_tx);
        self
    }

    /// Hand every outreach draft to `dispatcher` after the profile is persisted
    pub fn with_outreach(mut self, dispatcher: Arc<dyn OutreachDispatcher>) -> Self {
        self.outreach = Some(dispatcher);
        self
    }

    pub fn with_cancellation(mut self, cancel_token: CancellationToken) -> Self {
        self.cancel_token = cancel_token;
        self
    }

    pub fn with_sink_timeout(mut self, sink_timeout: Duration) -> Self {
        self.sink_timeout = sink_timeout;
        self
    }

    /// Token that cancels this scheduler's batches
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Run one batch.
    ///
    /// `limit` truncates `source` before processing.
    ///
    /// # Errors
    /// `BatchError::InvalidConcurrency` if `concurrency` is 0. Per-record
    /// problems never fail the batch; they show up in the outcomes.
    pub async fn run_batch<I>(
        &self,
        source: I,
        concurrency: usize,
        limit: Option<usize>,
    ) -> Result<BatchResult, BatchError>
    where
        I: IntoIterator<Item = RawRecord>,
    {
        if concurrency == 0 {
            return Err(BatchError::InvalidConcurrency(concurrency));
        }

        let batch_id = Uuid::new_v4();
        let started_at = chrono::Utc::now();
        info!(%batch_id, concurrency, ?limit, "Batch started");

        let ctx = RecordContext {
            pipeline: Arc::clone(&self.pipeline),
            sink: Arc::clone(&self.sink),
            outreach: self.outreach.clone(),
            event_tx: self.event_tx.clone(),
            sink_timeout: self.sink_timeout,
            outcomes: Arc::new(Mutex::new(Vec::new())),
        };

        ctx.emit(BatchEvent::BatchStarted {
            batch_id,
            concurrency,
            timestamp: started_at.timestamp(),
        });

        let semaphore = Arc::new(Semaphore::new(concurrency));
        let mut join_set = JoinSet::new();
        let mut seen = HashSet::new();
        let mut admitted = HashSet::new();
        let mut aborted = false;
        let mut records = source.into_iter().take(limit.unwrap_or(usize::MAX));

        for record in records.by_ref() {
            if !seen.insert(record.id) {
                warn!(%batch_id, record_id = record.id, "Duplicate record id, skipping");
                let err = PipelineError::ValidationFailure("duplicate id".to_string());
                ctx.record(RecordOutcome::failed(record.id, err)).await;
                continue;
            }

            ctx.emit(BatchEvent::RecordStateChanged {
                record_id: record.id,
                state: RecordState::Queued,
            });

            let permit = tokio::select! {
                biased;
                _ = self.cancel_token.cancelled() => None,
                permit = Arc::clone(&semaphore).acquire_owned() => permit.ok(),
            };
            let Some(permit) = permit else {
                aborted = true;
                ctx.record(RecordOutcome::failed(record.id, PipelineError::BatchAbort))
                    .await;
                break;
            };

            admitted.insert(record.id);
            let task_ctx = ctx.clone();
            join_set.spawn(async move {
                let _permit = permit;
                let record_id = record.id;
                task_ctx.run(record).await;
                record_id
            });
        }

        if aborted {
            let mut skipped = 0usize;
            for record in records {
                ctx.record(RecordOutcome::failed(record.id, PipelineError::BatchAbort))
                    .await;
                skipped += 1;
            }
            info!(%batch_id, skipped, in_flight = join_set.len(), "Batch cancelled, waiting for in-flight records");
        }

        // admitted ids are unique; a task that returns its id has recorded
        // its outcome, one that died outside the pipeline has not
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(record_id) => {
                    admitted.remove(&record_id);
                }
                Err(e) => error!(%batch_id, error = %e, "Record task ended abnormally"),
            }
        }

        let mut outcomes = std::mem::take(&mut *ctx.outcomes.lock().await);
        for record_id in admitted {
            let err = PipelineError::Panicked("record task aborted".to_string());
            error!(%batch_id, record_id, error = %err, "Record failed");
            outcomes.push(RecordOutcome::failed(record_id, err));
        }

        let result = BatchResult {
            batch_id,
            started_at,
            finished_at: chrono::Utc::now(),
            cancelled: aborted || self.cancel_token.is_cancelled(),
            outcomes,
        };

        let completed = result.completed().count();
        let failed = result.failed().count();
        info!(
            %batch_id,
            completed,
            failed,
            cancelled = result.cancelled,
            elapsed_ms = (result.finished_at - result.started_at).num_milliseconds(),
            "Batch finished"
        );

        ctx.emit(BatchEvent::BatchCompleted {
            batch_id,
            completed,
            failed,
            cancelled: result.cancelled,
        });

        Ok(result)
    }
}

/// Handles shared by every record task of one batch
#[derive(Clone)]
struct RecordContext {
    pipeline: Arc<RecordPipeline>,
    sink: Arc<dyn ProfileSink>,
    outreach: Option<Arc<dyn OutreachDispatcher>>,
    event_tx: Option<mpsc::Sender<BatchEvent>>,
    sink_timeout: Duration,
    /// Completion-ordered outcomes; the only state shared across tasks
    outcomes: Arc<Mutex<Vec<RecordOutcome>>>,
}

impl RecordContext {
    fn emit(&self, event: BatchEvent) {
        let Some(tx) = &self.event_tx else {
            return;
        };
        match tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                debug!(?event, "Event channel full, dropping event");
            }
            Err(TrySendError::Closed(_)) => {}
        }
    }

    async fn run(self, record: RawRecord) {
        let record_id = record.id;
        self.emit(BatchEvent::RecordStateChanged {
            record_id,
            state: RecordState::Running,
        });

        let processed = AssertUnwindSafe(self.pipeline.process(&record))
            .catch_unwind()
            .await;

        let outcome = match processed {
            Ok(output) => self.finish(output).await,
            Err(panic) => {
                let err = PipelineError::Panicked(panic_message(panic.as_ref()));
                error!(record_id, error = %err, "Record failed");
                RecordOutcome::failed(record_id, err)
            }
        };

        self.record(outcome).await;
    }

    /// Persist, dispatch and build the completed outcome
    async fn finish(&self, output: RecordOutput) -> RecordOutcome {
        let record_id = output.record.id;
        let evidence = output.raw_evidence_json();
        let mut errors = Vec::new();

        let persisted = self
            .bounded(self.sink.persist(record_id, &output.profile, &evidence))
            .await;
        if let Err(e) = persisted {
            warn!(record_id, sink = self.sink.name(), error = %e, "Failed to persist profile");
            errors.push(PipelineError::Sink(e).to_string());
        }

        if let (Some(dispatcher), Some(draft)) = (&self.outreach, &output.outreach) {
            match self.bounded(dispatcher.dispatch(draft)).await {
                Ok(()) => debug!(record_id, dispatcher = dispatcher.name(), "Outreach dispatched"),
                Err(e) => {
                    warn!(
                        record_id,
                        dispatcher = dispatcher.name(),
                        error = %e,
                        "Failed to dispatch outreach"
                    );
                    errors.push(PipelineError::Sink(e).to_string());
                }
            }
        }

        let flags: Vec<&str> = output.profile.flags.iter().map(|f| f.as_str()).collect();
        info!(
            record_id,
            final_confidence = output.profile.final_confidence,
            flags = ?flags,
            "Record completed"
        );

        RecordOutcome {
            record_id,
            state: RecordState::Completed,
            profile: Some(output.profile),
            qa: Some(output.qa),
            scores: Some(output.validation.scores),
            outreach: output.outreach,
            error: (!errors.is_empty()).then(|| errors.join("; ")),
        }
    }

    /// Time-bound a sink or dispatcher call
    async fn bounded<F>(&self, fut: F) -> Result<(), SinkError>
    where
        F: std::future::Future<Output = Result<(), SinkError>>,
    {
        match tokio::time::timeout(self.sink_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(SinkError::Timeout(self.sink_timeout)),
        }
    }

    /// Append a terminal outcome and report it
    async fn record(&self, outcome: RecordOutcome) {
        let record_id = outcome.record_id;
        let state = outcome.state;
        let finished = outcome
            .profile
            .as_ref()
            .map(|p| (p.final_confidence, p.flags.iter().copied().collect::<Vec<_>>()));

        self.outcomes.lock().await.push(outcome);

        self.emit(BatchEvent::RecordStateChanged { record_id, state });
        if let Some((final_confidence, flags)) = finished {
            self.emit(BatchEvent::RecordFinished {
                record_id,
                final_confidence,
                flags,
            });
        }
    }
}
