use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::collaborators::DecisionServices;
use super::controller::{WorkflowController, WorkflowError};
use super::domain::{FinancialDraft, RiskAnswers};
use super::view::WorkflowSnapshot;

/// Identifier wrapper for in-memory workflow sessions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Session metadata plus the workflow snapshot, as returned by the API.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub session_id: SessionId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub workflow: WorkflowSnapshot,
}

struct SessionEntry {
    controller: WorkflowController,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl SessionEntry {
    fn view(&self, id: &SessionId) -> SessionView {
        SessionView {
            session_id: id.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            workflow: self.controller.snapshot(),
        }
    }
}

/// Error raised by the session service.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session {0} not found")]
    NotFound(SessionId),
    #[error("{source}")]
    Workflow {
        #[source]
        source: WorkflowError,
        session: Box<SessionView>,
    },
}

type Registry = Arc<Mutex<HashMap<SessionId, SessionEntry>>>;

/// Holds one [`WorkflowController`] per applicant session, in memory only.
///
/// The registry lock is never held while a collaborator call is awaited: submit claims
/// the controller's in-flight slot under the lock, then runs the call and applies its
/// outcome on a spawned task, which completes even if the submitting request is
/// dropped. A concurrent submit on the same session is refused with
/// [`WorkflowError::Busy`].
///
/// With an idle timeout set, sessions untouched for longer than it are dropped when
/// new sessions are opened. Sessions awaiting a collaborator are kept.
pub struct CreditWorkflowService<S> {
    services: Arc<S>,
    sessions: Registry,
    sequence: AtomicU64,
    idle_timeout: Option<chrono::Duration>,
}

impl<S> CreditWorkflowService<S>
where
    S: DecisionServices + 'static,
{
    pub fn new(services: Arc<S>) -> Self {
        Self {
            services,
            sessions: Arc::new(Mutex::new(HashMap::new())),
            sequence: AtomicU64::new(1),
            idle_timeout: None,
        }
    }

    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = chrono::Duration::from_std(timeout).ok();
        self
    }

    /// Start a fresh workflow on the risk assessment step.
    pub fn open(&self) -> SessionView {
        self.prune_idle();
        let id = self.next_session_id();
        let now = Utc::now();
        let entry = SessionEntry {
            controller: WorkflowController::new(),
            created_at: now,
            updated_at: now,
        };
        let view = entry.view(&id);

        self.lock().insert(id.clone(), entry);
        info!(session = %id, "credit workflow session opened");
        view
    }

    pub fn get(&self, id: &SessionId) -> Result<SessionView, SessionError> {
        let sessions = self.lock();
        sessions
            .get(id)
            .map(|entry| entry.view(id))
            .ok_or_else(|| SessionError::NotFound(id.clone()))
    }

    pub fn close(&self, id: &SessionId) -> Result<(), SessionError> {
        match self.lock().remove(id) {
            Some(_) => {
                info!(session = %id, "credit workflow session closed");
                Ok(())
            }
            None => Err(SessionError::NotFound(id.clone())),
        }
    }

    pub fn session_count(&self) -> usize {
        self.lock().len()
    }

    /// Drop sessions idle past the timeout. Returns how many were removed.
    pub fn prune_idle(&self) -> usize {
        let Some(timeout) = self.idle_timeout else {
            return 0;
        };
        let cutoff = Utc::now() - timeout;

        let mut sessions = self.lock();
        let before = sessions.len();
        sessions.retain(|_, entry| entry.controller.is_loading() || entry.updated_at > cutoff);
        let removed = before - sessions.len();
        if removed > 0 {
            info!(removed, "idle credit workflow sessions dropped");
        }
        removed
    }

    pub fn update_risk(
        &self,
        id: &SessionId,
        answers: RiskAnswers,
    ) -> Result<SessionView, SessionError> {
        self.apply(id, |controller| controller.set_risk_answers(answers))
            .map(|(_, view)| view)
    }

    pub fn update_financial(
        &self,
        id: &SessionId,
        draft: FinancialDraft,
    ) -> Result<SessionView, SessionError> {
        self.apply(id, |controller| controller.set_financial_draft(draft))
            .map(|(_, view)| view)
    }

    pub fn update_email(&self, id: &SessionId, email: String) -> Result<SessionView, SessionError> {
        self.apply(id, |controller| controller.set_email(email))
            .map(|(_, view)| view)
    }

    pub fn back(&self, id: &SessionId) -> Result<SessionView, SessionError> {
        self.apply(id, WorkflowController::back).map(|(_, view)| view)
    }

    pub fn restart(&self, id: &SessionId) -> Result<SessionView, SessionError> {
        self.apply(id, WorkflowController::restart)
            .map(|(_, view)| view)
    }

    /// Run the current step's forward transition.
    pub async fn submit(&self, id: &SessionId) -> Result<SessionView, SessionError> {
        let (call, _) = self.apply(id, WorkflowController::begin_submit)?;
        let collaborator = call.collaborator();
        debug!(session = %id, %collaborator, "submitting workflow step");

        let services = Arc::clone(&self.services);
        let sessions = Arc::clone(&self.sessions);
        let session_id = id.clone();
        let task = tokio::spawn(async move {
            let outcome = call.run(services.as_ref()).await;
            match apply_to(&sessions, &session_id, |controller| {
                controller.complete(outcome)
            }) {
                Err(SessionError::NotFound(id)) => {
                    warn!(session = %id, %collaborator, "session closed before the reply arrived");
                    Err(SessionError::NotFound(id))
                }
                other => other.map(|(_, view)| view),
            }
        });

        match task.await {
            Ok(result) => result,
            Err(err) => std::panic::resume_unwind(err.into_panic()),
        }
    }

    fn next_session_id(&self) -> SessionId {
        let id = self.sequence.fetch_add(1, Ordering::Relaxed);
        SessionId(format!("cs-{id:06}"))
    }

    fn apply<T>(
        &self,
        id: &SessionId,
        action: impl FnOnce(&mut WorkflowController) -> Result<T, WorkflowError>,
    ) -> Result<(T, SessionView), SessionError> {
        apply_to(&self.sessions, id, action)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<SessionId, SessionEntry>> {
        lock_registry(&self.sessions)
    }
}

fn apply_to<T>(
    sessions: &Registry,
    id: &SessionId,
    action: impl FnOnce(&mut WorkflowController) -> Result<T, WorkflowError>,
) -> Result<(T, SessionView), SessionError> {
    let mut sessions = lock_registry(sessions);
    let entry = sessions
        .get_mut(id)
        .ok_or_else(|| SessionError::NotFound(id.clone()))?;

    let result = action(&mut entry.controller);
    entry.updated_at = Utc::now();
    let view = entry.view(id);

    match result {
        Ok(value) => Ok((value, view)),
        Err(source) => Err(SessionError::Workflow {
            source,
            session: Box::new(view),
        }),
    }
}

fn lock_registry(sessions: &Registry) -> MutexGuard<'_, HashMap<SessionId, SessionEntry>> {
    sessions.lock().expect("session registry mutex poisoned")
}
