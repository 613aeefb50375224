//! Live stream session
//!
//! Owns the transport connection for one validation job and drives the
//! fold loop: each decoded event passes through the lifecycle state
//! machine and the result accumulator, strictly in arrival order. On any
//! transport failure before a terminal event (connect refused, mid-stream
//! disconnect, malformed frame, idle stall) the session substitutes the
//! deterministic fallback result exactly once. A server-reported `failed`
//! event is surfaced verbatim and never substituted.
//!
//! Supersession: every session carries a generation number; a session
//! whose generation is no longer current drops its remaining events
//! without touching shared state, so a superseded session's late frames
//! can never leak into the replacement session's result.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::{broadcast, RwLock};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use hyva_common::config::ClientConfig;
use hyva_common::events::{SessionUpdate, StreamEvent, ValidationPhase};
use hyva_common::types::{StatisticalFinding, ValidationRequest, ValidationResult};
use hyva_common::{Error, Result};

use crate::accumulator::ResultAccumulator;
use crate::fallback;
use crate::sse::SseFrameDecoder;
use crate::state::ProgressStateMachine;

/// Shared session state readable through the controller snapshot
#[derive(Debug, Clone)]
pub(crate) struct SharedState {
    pub is_streaming: bool,
    pub phase: ValidationPhase,
    pub progress: u8,
    pub message: Option<String>,
    pub findings: Vec<StatisticalFinding>,
    pub result: Option<ValidationResult>,
    pub error: Option<String>,
}

impl Default for SharedState {
    fn default() -> Self {
        Self {
            is_streaming: false,
            phase: ValidationPhase::Idle,
            progress: 0,
            message: None,
            findings: Vec::new(),
            result: None,
            error: None,
        }
    }
}

/// Caller-owned handle to one session.
///
/// `close()` is idempotent and safe on an already-terminated session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    session_id: Uuid,
    cancel: CancellationToken,
    updates: broadcast::Sender<SessionUpdate>,
}

impl SessionHandle {
    pub(crate) fn new(
        session_id: Uuid,
        cancel: CancellationToken,
        updates: broadcast::Sender<SessionUpdate>,
    ) -> Self {
        Self {
            session_id,
            cancel,
            updates,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Cancel the session and discard any events it would still emit
    pub fn close(&self) {
        self.cancel.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Subscribe to session updates (progress, findings, terminal result)
    pub fn subscribe(&self) -> broadcast::Receiver<SessionUpdate> {
        self.updates.subscribe()
    }
}

/// Everything a spawned session task needs to fold events and publish
pub(crate) struct SessionContext {
    pub session_id: Uuid,
    pub generation: u64,
    pub current_generation: Arc<AtomicU64>,
    pub cancel: CancellationToken,
    pub shared: Arc<RwLock<SharedState>>,
    pub updates: broadcast::Sender<SessionUpdate>,
}

impl SessionContext {
    /// Only the current, uncancelled session may mutate visible state
    fn is_current(&self) -> bool {
        !self.cancel.is_cancelled()
            && self.current_generation.load(Ordering::SeqCst) == self.generation
    }

    fn publish(&self, update: SessionUpdate) {
        if self.is_current() {
            // Send fails only when no subscriber is listening
            let _ = self.updates.send(update);
        }
    }
}

enum StreamOutcome {
    Completed,
    Failed,
    Cancelled,
}

/// Session task entry point, spawned by the controller.
pub(crate) async fn run_session(
    ctx: SessionContext,
    http: reqwest::Client,
    config: ClientConfig,
    request: ValidationRequest,
) {
    tracing::info!(
        session_id = %ctx.session_id,
        hypothesis = %request.hypothesis,
        alpha = request.alpha,
        "Opening validation stream"
    );

    match drive_stream(&ctx, &http, &config, &request).await {
        Ok(StreamOutcome::Completed) => {
            tracing::info!(session_id = %ctx.session_id, "Validation completed from live stream");
        }
        Ok(StreamOutcome::Failed) => {
            tracing::warn!(session_id = %ctx.session_id, "Server reported validation failure");
        }
        Ok(StreamOutcome::Cancelled) => {
            tracing::debug!(session_id = %ctx.session_id, "Session cancelled");
            return;
        }
        Err(err) => {
            // Transport failure before a terminal event: contained here,
            // surfaced to the caller only as an is_simulated result
            tracing::warn!(
                session_id = %ctx.session_id,
                error = %err,
                "Transport failed before terminal event, substituting simulated result"
            );
            finish_simulated(&ctx, &request).await;
        }
    }

    {
        let mut shared = ctx.shared.write().await;
        if ctx.is_current() {
            shared.is_streaming = false;
        }
    }
}

async fn drive_stream(
    ctx: &SessionContext,
    http: &reqwest::Client,
    config: &ClientConfig,
    request: &ValidationRequest,
) -> Result<StreamOutcome> {
    let url = format!("{}/validate/stream", config.base_url.trim_end_matches('/'));
    let response = http
        .get(&url)
        .query(&[
            ("hypothesis", request.hypothesis.as_str()),
            ("alpha", &request.alpha.to_string()),
        ])
        .header(reqwest::header::ACCEPT, "text/event-stream")
        .send()
        .await
        .map_err(|e| Error::Transport(format!("connect failed: {}", e)))?;

    if !response.status().is_success() {
        return Err(Error::Transport(format!(
            "server returned HTTP {}",
            response.status()
        )));
    }

    let stall = Duration::from_secs(config.stall_timeout_secs);
    let mut stream = Box::pin(response.bytes_stream());
    let mut decoder = SseFrameDecoder::new();
    let mut machine = ProgressStateMachine::new();
    let mut accumulator = ResultAccumulator::new(&request.hypothesis);

    loop {
        let next = tokio::select! {
            _ = ctx.cancel.cancelled() => return Ok(StreamOutcome::Cancelled),
            next = tokio::time::timeout(stall, stream.next()) => next,
        };

        let chunk = match next {
            // Idle stall with no terminal event: treated as a transport
            // failure so the fallback path still produces a result
            Err(_elapsed) => {
                return Err(Error::Transport(format!(
                    "no event for {}s without a terminal event",
                    config.stall_timeout_secs
                )))
            }
            Ok(None) => {
                return Err(Error::Transport(
                    "stream ended without a terminal event".to_string(),
                ))
            }
            Ok(Some(Err(e))) => {
                return Err(Error::Transport(format!("stream read failed: {}", e)))
            }
            Ok(Some(Ok(bytes))) => bytes,
        };

        for payload in decoder.push(&chunk)? {
            let event: StreamEvent = serde_json::from_str(&payload)?;
            if let Some(outcome) = fold_event(ctx, &mut machine, &mut accumulator, event).await {
                return Ok(outcome);
            }
        }
    }
}

/// Fold one event through the state machine and accumulator, update the
/// shared snapshot, and publish updates. Returns `Some` on a terminal
/// outcome.
async fn fold_event(
    ctx: &SessionContext,
    machine: &mut ProgressStateMachine,
    accumulator: &mut ResultAccumulator,
    event: StreamEvent,
) -> Option<StreamOutcome> {
    if !ctx.is_current() {
        return Some(StreamOutcome::Cancelled);
    }
    // Events after a terminal event are accepted but fold to nothing
    if machine.is_terminal() {
        return None;
    }

    machine.apply(&event.status, event.progress, event.message.as_deref());

    let new_findings = match event.message.as_deref() {
        Some(message) => accumulator.absorb_message(message),
        None => Vec::new(),
    };

    {
        let mut shared = ctx.shared.write().await;
        // Re-checked while holding the lock: the controller bumps the
        // generation before resetting this state under the same lock, so
        // a session superseded while queued here must not write
        if !ctx.is_current() {
            return Some(StreamOutcome::Cancelled);
        }
        shared.phase = machine.phase();
        shared.progress = machine.progress();
        shared.message = machine.message().map(str::to_string);
        shared.findings.extend(new_findings.iter().cloned());
    }

    ctx.publish(SessionUpdate::Progress {
        phase: machine.phase(),
        progress: machine.progress(),
        message: machine.message().map(str::to_string),
    });
    for finding in new_findings {
        tracing::debug!(
            session_id = %ctx.session_id,
            test_name = %finding.test_name,
            p_value = finding.p_value,
            "Extracted statistical finding"
        );
        ctx.publish(SessionUpdate::Finding { finding });
    }

    match machine.phase() {
        ValidationPhase::Completed => {
            let result = accumulator.complete(event.result.as_ref()).clone();
            {
                let mut shared = ctx.shared.write().await;
                if !ctx.is_current() {
                    return Some(StreamOutcome::Cancelled);
                }
                shared.result = Some(result.clone());
                shared.is_streaming = false;
            }
            ctx.publish(SessionUpdate::Completed { result });
            Some(StreamOutcome::Completed)
        }
        ValidationPhase::Failed => {
            // Surfaced verbatim; the server explicitly rejected the
            // request, so no fallback substitution
            let error = event
                .error
                .unwrap_or_else(|| "Validation failed".to_string());
            {
                let mut shared = ctx.shared.write().await;
                if !ctx.is_current() {
                    return Some(StreamOutcome::Cancelled);
                }
                shared.error = Some(error.clone());
                shared.is_streaming = false;
            }
            ctx.publish(SessionUpdate::Failed { error });
            Some(StreamOutcome::Failed)
        }
        _ => None,
    }
}

/// Substitute the deterministic local result after a transport failure.
/// Invoked at most once per session.
async fn finish_simulated(ctx: &SessionContext, request: &ValidationRequest) {
    if !ctx.is_current() {
        return;
    }
    let result = fallback::simulate(&request.hypothesis, request.alpha);
    {
        let mut shared = ctx.shared.write().await;
        if !ctx.is_current() {
            return;
        }
        shared.phase = ValidationPhase::Completed;
        shared.progress = 100;
        shared.result = Some(result.clone());
        shared.is_streaming = false;
    }
    ctx.publish(SessionUpdate::Completed { result });
}
