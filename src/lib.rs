pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod session;

use std::sync::Arc;

pub use error::ClientError;
pub type Result<T> = std::result::Result<T, ClientError>;
pub use crate::config::Settings;

pub use api::PortalApi;
pub use auth::{AuthService, FileTokenStore, Portal, Registration, Role, Session, SessionState, TokenStore};
pub use session::{Route, SessionController};

/// Client state shared by every view of the portal
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    pub session: Arc<SessionController>,
    pub api: PortalApi,
}

impl AppState {
    /// Wires the file-backed token store, auth service and portal API for `config`.
    ///
    /// The token file is scoped to the origin of `api.base_url`, so pointing the client
    /// at another backend starts signed out.
    ///
    /// The session starts unresolved; call [`SessionController::initialize`] before routing.
    pub fn new(config: Settings) -> Result<Self> {
        let base_url = config.base_url()?;
        let store: Arc<dyn TokenStore> = Arc::new(FileTokenStore::for_origin(&config.storage.token_dir, &base_url));
        Ok(Self::with_store(config, base_url, store))
    }

    pub fn with_store(config: Settings, base_url: url::Url, store: Arc<dyn TokenStore>) -> Self {
        let http = reqwest::Client::new();
        let auth = Arc::new(AuthService::new(http.clone(), base_url.clone()));
        let session = Arc::new(SessionController::new(store.clone(), auth));
        let api = PortalApi::new(http, base_url, store);

        Self {
            config: Arc::new(config),
            session,
            api,
        }
    }

    /// Checks the current session against `route`, failing with [`ClientError::AccessDenied`]
    /// when the guard would redirect.
    pub fn require(&self, route: Route) -> Result<Session> {
        let state = self.session.current();
        match session::navigate(&state, route) {
            session::Navigation::Render(_) => state
                .session()
                .cloned()
                .ok_or_else(|| ClientError::AccessDenied(format!("{} requires a signed-in user", route))),
            session::Navigation::Redirect(target) => Err(ClientError::AccessDenied(format!(
                "{} is not available to this session (redirect to {})",
                route, target
            ))),
            session::Navigation::Wait => Err(ClientError::AccessDenied(format!(
                "{} requested before the session was resolved",
                route
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MemoryTokenStore;
    use crate::config::{ApiConfig, StorageConfig};
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn test_state(token: Option<&str>) -> AppState {
        let config = Settings {
            environment: "test".into(),
            api: ApiConfig {
                base_url: "http://127.0.0.1:8000/api".into(),
            },
            storage: StorageConfig {
                token_dir: "unused".into(),
            },
        };
        let base_url = config.base_url().unwrap();
        let store: Arc<dyn TokenStore> = match token {
            Some(t) => Arc::new(MemoryTokenStore::with_token(t)),
            None => Arc::new(MemoryTokenStore::new()),
        };
        AppState::with_store(config, base_url, store)
    }

    fn doctor_token() -> String {
        encode(
            &Header::default(),
            &serde_json::json!({"sub": "doc@x.com", "role": "doctor"}),
            &EncodingKey::from_secret(b"k"),
        )
        .unwrap()
    }

    #[test]
    fn test_app_state_clone_shares_session() {
        let state = test_state(None);
        let cloned = state.clone();
        assert!(Arc::ptr_eq(&state.session, &cloned.session));
        assert!(Arc::ptr_eq(&state.config, &cloned.config));
    }

    #[test]
    fn test_require_before_initialize() {
        let state = test_state(Some(&doctor_token()));
        assert!(matches!(
            state.require(Route::DoctorDashboard),
            Err(ClientError::AccessDenied(_))
        ));
    }

    #[test]
    fn test_require_by_role() {
        let state = test_state(Some(&doctor_token()));
        state.session.initialize();

        let session = state.require(Route::DoctorDashboard).unwrap();
        assert_eq!(session.email, "doc@x.com");
        assert!(state.require(Route::PatientDashboard).is_err());
    }

    #[test]
    fn test_require_when_signed_out() {
        let state = test_state(None);
        state.session.initialize();
        assert!(state.require(Route::PatientDashboard).is_err());
    }
}
