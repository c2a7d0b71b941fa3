use crate::auth::{
    decode_session, AuthApi, Credential, Portal, Registration, Role, Session, SessionState,
    TokenStore,
};
use crate::error::{AuthError, ClientError};
use crate::Result;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Owns the process-wide session and is its only writer.
///
/// Readers either take a snapshot with [`SessionController::current`] or hold a
/// [`watch::Receiver`] from [`SessionController::subscribe`] and react to changes.
/// Concurrent `login`/`logout` calls are not coalesced; the last write wins.
pub struct SessionController {
    store: Arc<dyn TokenStore>,
    auth: Arc<dyn AuthApi>,
    state: watch::Sender<SessionState>,
}

impl SessionController {
    pub fn new(store: Arc<dyn TokenStore>, auth: Arc<dyn AuthApi>) -> Self {
        let (state, _) = watch::channel(SessionState::Unresolved);
        Self { store, auth, state }
    }

    /// Resolves the stored credential, if any, into the published session.
    ///
    /// A credential that fails to decode is removed so the store and the
    /// session never disagree.
    pub fn initialize(&self) -> SessionState {
        let resolved = match self.store.get() {
            Ok(None) => {
                debug!("No stored credential");
                SessionState::Absent
            }
            Ok(Some(credential)) => match decode_session(&credential) {
                Ok(session) => {
                    info!("Restored session for {} ({})", session.email, session.role);
                    SessionState::Present(session)
                }
                Err(e) => {
                    warn!("Discarding stored credential: {}", e);
                    self.discard_credential();
                    SessionState::Absent
                }
            },
            Err(e) => {
                error!("Failed to read stored credential: {}", e);
                self.discard_credential();
                SessionState::Absent
            }
        };

        self.state.send_replace(resolved.clone());
        resolved
    }

    pub fn current(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Waits until [`SessionController::initialize`] has published a resolved state.
    pub async fn wait_until_resolved(&self) -> SessionState {
        let mut rx = self.state.subscribe();
        let resolved = rx.wait_for(SessionState::is_resolved).await.map(|s| s.clone());
        resolved.unwrap_or_else(|_| self.current())
    }

    /// Password login. Returns the role confirmed by the backend.
    pub async fn login(&self, email: &str, password: &str) -> Result<Role> {
        let credential = self.auth.password_login(email, password).await?;
        let session = self.adopt(credential)?;
        Ok(session.role)
    }

    /// Password login from a portal tab; a role the tab does not serve signs the user out again.
    pub async fn login_for_portal(&self, email: &str, password: &str, portal: Portal) -> Result<Role> {
        let role = self.login(email, password).await?;
        if portal.accepts(role) {
            return Ok(role);
        }

        warn!("{} signed in as {} through the {:?} portal", email, role, portal);
        self.logout()?;
        Err(AuthError::PortalMismatch {
            message: portal.mismatch_message().to_string(),
        }
        .into())
    }

    pub async fn federated_login(&self, federated_token: &str, requested_role: Role) -> Result<Role> {
        let credential = self.auth.federated_login(federated_token, requested_role).await?;
        let session = self.adopt(credential)?;
        Ok(session.role)
    }

    /// Creates an account. The current session is left as it is.
    pub async fn register(&self, registration: &Registration) -> Result<()> {
        self.auth.register(registration).await?;
        Ok(())
    }

    /// Clears the stored credential and the session. Safe to call when signed out.
    ///
    /// The session is cleared even if removing the stored credential fails.
    pub fn logout(&self) -> Result<()> {
        let cleared = self.store.clear();
        let previous = self.state.send_replace(SessionState::Absent);
        if let SessionState::Present(session) = previous {
            info!("Signed out {}", session.email);
        }
        cleared.map_err(ClientError::from)
    }

    fn adopt(&self, credential: Credential) -> Result<Session> {
        let session = match decode_session(&credential) {
            Ok(session) => session,
            Err(e) => {
                warn!("Backend issued an unreadable credential: {}", e);
                if let Err(clear_err) = self.logout() {
                    error!("Failed to clear credential store: {}", clear_err);
                }
                return Err(e.into());
            }
        };

        self.store.set(&credential)?;
        self.state.send_replace(SessionState::Present(session.clone()));
        info!("Signed in {} as {}", session.email, session.role);
        Ok(session)
    }

    fn discard_credential(&self) {
        if let Err(e) = self.store.clear() {
            error!("Failed to clear credential store: {}", e);
        }
    }
}
