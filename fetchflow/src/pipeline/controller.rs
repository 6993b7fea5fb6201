//! Two-stage dependent fetch controller.

use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::core::{
    FailureKind, PipelineEvent, PipelineFailure, PipelineState, RunGeneration, RunToken,
    StageIndex,
};
use crate::errors::{ResolveError, ValidationError};
use crate::events::{EventSink, NoOpEventSink};
use crate::observability::StageTimer;
use crate::stages::{StageResolver, Validate};

/// Message shown when a caller-imposed deadline expires.
pub const TIMEOUT_MESSAGE: &str = "The request timed out.";

/// How a call to [`PipelineController::run`] ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Input failed validation; no run was started.
    Rejected(ValidationError),
    /// The run reached `Success`.
    Succeeded(RunToken),
    /// The run reached `Error`.
    Failed(RunToken),
    /// A newer run started first; this run's results were discarded.
    Superseded(RunToken),
}

impl RunOutcome {
    /// Returns the run token, if a run was started.
    #[must_use]
    pub fn token(&self) -> Option<&RunToken> {
        match self {
            Self::Rejected(_) => None,
            Self::Succeeded(t) | Self::Failed(t) | Self::Superseded(t) => Some(t),
        }
    }

    /// Returns true if this run's result was written to the pipeline state.
    #[must_use]
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Succeeded(_) | Self::Failed(_))
    }
}

/// Values owned by the controller for the current run.
struct RunSlot<M, F> {
    intermediate: Option<M>,
    final_result: Option<F>,
}

/// Sequences two stage resolvers and owns the pipeline state.
///
/// Stage 2 consumes stage 1's output and only runs when stage 1 of the
/// *current* run succeeded. Overlapping runs on the same controller are
/// allowed; each run holds a [`RunToken`] and any result whose token is no
/// longer the latest is dropped (last run wins). Superseded requests are not
/// aborted, they are left to complete and then discarded.
///
/// State transitions are published on a `watch` channel so a presenter can
/// follow them with [`subscribe`](Self::subscribe).
pub struct PipelineController<S1, S2>
where
    S1: StageResolver,
    S2: StageResolver<Input = S1::Output>,
{
    name: String,
    first: S1,
    second: S2,
    generation: RunGeneration,
    slot: Mutex<RunSlot<S1::Output, S2::Output>>,
    state: watch::Sender<PipelineState<S2::Output>>,
    events: Arc<dyn EventSink>,
}

/// What to do after a stage result was checked against the current token.
enum Step<T> {
    Continue(T),
    Stop(RunOutcome),
}

impl<S1, S2> PipelineController<S1, S2>
where
    S1: StageResolver,
    S1::Output: Clone + Send + Sync,
    S2: StageResolver<Input = S1::Output>,
    S2::Output: Clone + Send + Sync,
{
    /// Creates an idle controller over two resolvers.
    pub fn new(name: impl Into<String>, first: S1, second: S2) -> Self {
        let (state, _) = watch::channel(PipelineState::Idle);
        Self {
            name: name.into(),
            first,
            second,
            generation: RunGeneration::new(),
            slot: Mutex::new(RunSlot {
                intermediate: None,
                final_result: None,
            }),
            state,
            events: Arc::new(NoOpEventSink),
        }
    }

    /// Sets the sink receiving lifecycle events.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.events = sink;
        self
    }

    /// Returns the pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the first-stage resolver.
    #[must_use]
    pub fn first(&self) -> &S1 {
        &self.first
    }

    /// Returns the second-stage resolver.
    #[must_use]
    pub fn second(&self) -> &S2 {
        &self.second
    }

    /// Returns a snapshot of the current state.
    #[must_use]
    pub fn current_state(&self) -> PipelineState<S2::Output> {
        self.state.borrow().clone()
    }

    /// Subscribes to state transitions.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<PipelineState<S2::Output>> {
        self.state.subscribe()
    }

    /// Returns the stage 1 output of the current run, if any.
    #[must_use]
    pub fn intermediate(&self) -> Option<S1::Output> {
        self.slot.lock().intermediate.clone()
    }

    /// Returns the final result of the current run, if it succeeded.
    #[must_use]
    pub fn final_result(&self) -> Option<S2::Output> {
        self.slot.lock().final_result.clone()
    }

    /// Supersedes any in-flight run and returns to `Idle`.
    pub fn reset(&self) {
        let mut slot = self.slot.lock();
        self.generation.invalidate();
        slot.intermediate = None;
        slot.final_result = None;
        self.state.send_replace(PipelineState::Idle);
        debug!(pipeline = %self.name, "Pipeline reset");
    }

    /// Runs both stages for `input`.
    ///
    /// Invalid input is rejected without touching the state. Resolver
    /// failures never escape: they become a terminal `Error` state.
    pub async fn run(&self, input: S1::Input) -> RunOutcome
    where
        S1::Input: Validate,
    {
        let token = match self.begin(&input) {
            Ok(token) => token,
            Err(err) => return RunOutcome::Rejected(err),
        };
        self.drive(&token, &input).await
    }

    /// Like [`run`](Self::run), but forces an `Error` state if the run has
    /// not finished within `limit`.
    ///
    /// The in-flight request is dropped when the deadline passes.
    pub async fn run_with_timeout(&self, input: S1::Input, limit: Duration) -> RunOutcome
    where
        S1::Input: Validate,
    {
        let token = match self.begin(&input) {
            Ok(token) => token,
            Err(err) => return RunOutcome::Rejected(err),
        };
        if let Ok(outcome) = tokio::time::timeout(limit, self.drive(&token, &input)).await {
            return outcome;
        }

        let stage = match self.current_state() {
            PipelineState::Loading(stage) => stage,
            _ => StageIndex::First,
        };
        warn!(pipeline = %self.name, run = %token, ?limit, "Run timed out");
        let failure = PipelineFailure::new(stage, FailureKind::Transport, TIMEOUT_MESSAGE);
        self.apply_failure(&token, failure)
    }

    /// Validates input, mints a token and enters `Loading(First)`.
    fn begin(&self, input: &S1::Input) -> Result<RunToken, ValidationError>
    where
        S1::Input: Validate,
    {
        if let Err(err) = input.validate() {
            debug!(pipeline = %self.name, field = %err.field, "Input rejected, run suppressed");
            self.events
                .emit(&PipelineEvent::run_rejected(&self.name, &err.field));
            return Err(err);
        }

        let token = {
            let mut slot = self.slot.lock();
            let token = self.generation.mint();
            slot.intermediate = None;
            slot.final_result = None;
            self.state
                .send_replace(PipelineState::Loading(StageIndex::First));
            token
        };

        info!(pipeline = %self.name, run = %token, "Run started");
        self.events.emit(&PipelineEvent::run_started(&self.name, &token));
        Ok(token)
    }

    async fn drive(&self, token: &RunToken, input: &S1::Input) -> RunOutcome {
        let first = self
            .resolve_stage(&self.first, input, token, StageIndex::First)
            .await;
        let intermediate = match self.settle_first(token, first) {
            Step::Continue(value) => value,
            Step::Stop(outcome) => return outcome,
        };

        let second = self
            .resolve_stage(&self.second, &intermediate, token, StageIndex::Second)
            .await;
        self.settle_second(token, second)
    }

    async fn resolve_stage<R: StageResolver>(
        &self,
        resolver: &R,
        input: &R::Input,
        token: &RunToken,
        stage: StageIndex,
    ) -> Result<R::Output, ResolveError> {
        self.events.emit(&PipelineEvent::stage_started(
            &self.name,
            token,
            stage,
            resolver.name(),
        ));
        let timer = StageTimer::start(stage);
        let result = resolver.resolve(input).await;
        let duration_ms = timer.finish();

        match &result {
            Ok(_) => {
                debug!(
                    pipeline = %self.name,
                    run = %token,
                    %stage,
                    resolver = resolver.name(),
                    duration_ms,
                    "Stage completed"
                );
                self.events.emit(&PipelineEvent::stage_completed(
                    &self.name,
                    token,
                    stage,
                    duration_ms,
                ));
            }
            Err(err) => {
                debug!(
                    pipeline = %self.name,
                    run = %token,
                    %stage,
                    resolver = resolver.name(),
                    duration_ms,
                    error = %err,
                    "Stage failed"
                );
            }
        }
        result
    }

    fn settle_first(
        &self,
        token: &RunToken,
        result: Result<S1::Output, ResolveError>,
    ) -> Step<S1::Output> {
        let value = match result {
            Ok(value) => value,
            Err(err) => {
                let failure = PipelineFailure::new(
                    StageIndex::First,
                    err.kind(),
                    self.first.failure_message(&err),
                );
                return Step::Stop(self.apply_failure(token, failure));
            }
        };

        {
            let mut slot = self.slot.lock();
            if !self.generation.is_current(token) {
                drop(slot);
                return Step::Stop(self.superseded(token, StageIndex::First));
            }
            slot.intermediate = Some(value.clone());
            self.state
                .send_replace(PipelineState::Loading(StageIndex::Second));
        }
        Step::Continue(value)
    }

    fn settle_second(
        &self,
        token: &RunToken,
        result: Result<S2::Output, ResolveError>,
    ) -> RunOutcome {
        let value = match result {
            Ok(value) => value,
            Err(err) => {
                let failure = PipelineFailure::new(
                    StageIndex::Second,
                    err.kind(),
                    self.second.failure_message(&err),
                );
                return self.apply_failure(token, failure);
            }
        };

        {
            let mut slot = self.slot.lock();
            if !self.generation.is_current(token) {
                drop(slot);
                return self.superseded(token, StageIndex::Second);
            }
            slot.final_result = Some(value.clone());
            self.state.send_replace(PipelineState::Success(value));
        }

        info!(pipeline = %self.name, run = %token, "Run succeeded");
        self.events
            .emit(&PipelineEvent::run_succeeded(&self.name, token));
        RunOutcome::Succeeded(token.clone())
    }

    fn apply_failure(&self, token: &RunToken, failure: PipelineFailure) -> RunOutcome {
        {
            let slot = self.slot.lock();
            if !self.generation.is_current(token) {
                drop(slot);
                return self.superseded(token, failure.stage);
            }
            self.state.send_replace(PipelineState::Error(failure.clone()));
        }

        warn!(
            pipeline = %self.name,
            run = %token,
            stage = %failure.stage,
            kind = %failure.kind,
            "Run failed: {}", failure.message
        );
        self.events
            .emit(&PipelineEvent::run_failed(&self.name, token, &failure));
        RunOutcome::Failed(token.clone())
    }

    fn superseded(&self, token: &RunToken, stage: StageIndex) -> RunOutcome {
        debug!(
            pipeline = %self.name,
            run = %token,
            %stage,
            latest = self.generation.latest(),
            "Discarding result of superseded run"
        );
        self.events
            .emit(&PipelineEvent::run_superseded(&self.name, token, stage));
        RunOutcome::Superseded(token.clone())
    }
}

impl<S1, S2> fmt::Debug for PipelineController<S1, S2>
where
    S1: StageResolver,
    S2: StageResolver<Input = S1::Output>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineController")
            .field("name", &self.name)
            .field("first", &self.first.name())
            .field("second", &self.second.name())
            .field("generation", &self.generation.latest())
            .finish_non_exhaustive()
    }
}
