//! Control surface consumed by rendering and persistence layers
//!
//! `ValidationController` holds at most one active session. `start()`
//! validates the request, supersedes any in-flight session (old transport
//! closed, its late frames dropped), and spawns a new session task.
//! Collaborators read the running state through `snapshot()` or follow it
//! live through `subscribe()`; they never construct findings or results
//! themselves.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use hyva_common::config::ClientConfig;
use hyva_common::events::{SessionUpdate, ValidationPhase};
use hyva_common::types::{StatisticalFinding, ValidationRequest, ValidationResult};
use hyva_common::{Error, Result};

use crate::session::{self, SessionContext, SessionHandle, SharedState};

const USER_AGENT: &str = concat!("HYVA/", env!("CARGO_PKG_VERSION"));
const UPDATE_CHANNEL_CAPACITY: usize = 256;

/// Read-only lifecycle snapshot of the active (or last) session
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub phase: ValidationPhase,
    pub progress: u8,
    pub message: Option<String>,
    pub findings: Vec<StatisticalFinding>,
}

/// Read-only view of the whole controller state
#[derive(Debug, Clone, Serialize)]
pub struct ControllerSnapshot {
    pub is_streaming: bool,
    pub status: StatusSnapshot,
    pub result: Option<ValidationResult>,
    pub error: Option<String>,
}

pub struct ValidationController {
    http: reqwest::Client,
    config: ClientConfig,
    shared: Arc<RwLock<SharedState>>,
    updates: broadcast::Sender<SessionUpdate>,
    current_generation: Arc<AtomicU64>,
    active: Mutex<Option<SessionHandle>>,
}

impl ValidationController {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("cannot build HTTP client: {}", e)))?;

        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);

        Ok(Self {
            http,
            config,
            shared: Arc::new(RwLock::new(SharedState::default())),
            updates,
            current_generation: Arc::new(AtomicU64::new(0)),
            active: Mutex::new(None),
        })
    }

    /// Start a validation session, superseding any active one.
    ///
    /// Input validation failures (empty hypothesis, alpha outside (0,1])
    /// surface as `Error::InvalidInput` without touching the active
    /// session.
    pub async fn start(&self, hypothesis: &str, alpha: f64) -> Result<SessionHandle> {
        let request = ValidationRequest::new(hypothesis, alpha)?;

        let mut active = self.active.lock().await;
        if let Some(prev) = active.take() {
            tracing::debug!(session_id = %prev.session_id(), "Superseding active session");
            prev.close();
        }

        // Bumping the generation first guarantees the superseded session
        // can no longer write, even before its cancellation lands
        let generation = self.current_generation.fetch_add(1, Ordering::SeqCst) + 1;

        {
            let mut shared = self.shared.write().await;
            *shared = SharedState {
                is_streaming: true,
                ..SharedState::default()
            };
        }

        let session_id = Uuid::new_v4();
        let cancel = CancellationToken::new();
        let ctx = SessionContext {
            session_id,
            generation,
            current_generation: Arc::clone(&self.current_generation),
            cancel: cancel.clone(),
            shared: Arc::clone(&self.shared),
            updates: self.updates.clone(),
        };

        tokio::spawn(session::run_session(
            ctx,
            self.http.clone(),
            self.config.clone(),
            request,
        ));

        let handle = SessionHandle::new(session_id, cancel, self.updates.clone());
        *active = Some(handle.clone());
        Ok(handle)
    }

    /// Cancel any active session and reset to the idle state
    pub async fn clear(&self) {
        let mut active = self.active.lock().await;
        self.current_generation.fetch_add(1, Ordering::SeqCst);
        if let Some(prev) = active.take() {
            tracing::debug!(session_id = %prev.session_id(), "Clearing active session");
            prev.close();
        }
        *self.shared.write().await = SharedState::default();
    }

    /// Read-only snapshot of the current state
    pub async fn snapshot(&self) -> ControllerSnapshot {
        let shared = self.shared.read().await;
        ControllerSnapshot {
            is_streaming: shared.is_streaming,
            status: StatusSnapshot {
                phase: shared.phase,
                progress: shared.progress,
                message: shared.message.clone(),
                findings: shared.findings.clone(),
            },
            result: shared.result.clone(),
            error: shared.error.clone(),
        }
    }

    /// Subscribe to session updates across session boundaries
    pub fn subscribe(&self) -> broadcast::Receiver<SessionUpdate> {
        self.updates.subscribe()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> ClientConfig {
        ClientConfig {
            // Nothing listens here; sessions started against it fall back
            base_url: "http://127.0.0.1:9".to_string(),
            connect_timeout_secs: 1,
            stall_timeout_secs: 1,
        }
    }

    #[tokio::test]
    async fn test_start_rejects_invalid_input() {
        let controller = ValidationController::new(test_config()).unwrap();
        assert!(matches!(
            controller.start("", 0.05).await,
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            controller.start("h", 0.0).await,
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            controller.start("h", 1.2).await,
            Err(Error::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_initial_snapshot_is_idle() {
        let controller = ValidationController::new(test_config()).unwrap();
        let snapshot = controller.snapshot().await;
        assert!(!snapshot.is_streaming);
        assert_eq!(snapshot.status.phase, ValidationPhase::Idle);
        assert_eq!(snapshot.status.progress, 0);
        assert!(snapshot.status.findings.is_empty());
        assert!(snapshot.result.is_none());
        assert!(snapshot.error.is_none());
    }

    #[tokio::test]
    async fn test_clear_resets_state_and_closes_session() {
        let controller = ValidationController::new(test_config()).unwrap();
        let handle = controller.start("Some hypothesis", 0.05).await.unwrap();

        controller.clear().await;
        assert!(handle.is_closed());

        let snapshot = controller.snapshot().await;
        assert!(!snapshot.is_streaming);
        assert_eq!(snapshot.status.phase, ValidationPhase::Idle);
        assert_eq!(snapshot.status.progress, 0);
        assert!(snapshot.status.findings.is_empty());
        assert!(snapshot.result.is_none());
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let controller = ValidationController::new(test_config()).unwrap();
        let handle = controller.start("Some hypothesis", 0.05).await.unwrap();
        handle.close();
        handle.close();
        assert!(handle.is_closed());
    }

    #[tokio::test]
    async fn test_subscriber_attached_before_start_sees_terminal_update() {
        let controller = ValidationController::new(test_config()).unwrap();
        // Against a refused port the session terminates almost
        // immediately with the simulated result; a subscriber attached
        // before start() must still receive that terminal update
        let mut updates = controller.subscribe();
        controller.start("Some hypothesis", 0.05).await.unwrap();

        let result = tokio::time::timeout(Duration::from_secs(10), async {
            loop {
                match updates.recv().await {
                    Ok(SessionUpdate::Completed { result }) => break result,
                    Ok(_) => continue,
                    Err(e) => panic!("update stream ended early: {}", e),
                }
            }
        })
        .await
        .unwrap();
        assert!(result.is_simulated);
    }

    #[tokio::test]
    async fn test_start_supersedes_previous_handle() {
        let controller = ValidationController::new(test_config()).unwrap();
        let first = controller.start("First hypothesis", 0.05).await.unwrap();
        let second = controller.start("Second hypothesis", 0.05).await.unwrap();
        assert!(first.is_closed());
        assert!(!second.is_closed());
        assert_ne!(first.session_id(), second.session_id());
        second.close();
    }
}
