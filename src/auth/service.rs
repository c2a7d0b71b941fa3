use crate::auth::models::{Credential, Role};
use crate::error::AuthError;
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub role: Role,
    pub doctor_access_code: Option<String>,
}

impl Registration {
    pub fn patient(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            role: Role::Patient,
            doctor_access_code: None,
        }
    }

    pub fn doctor(
        email: impl Into<String>,
        password: impl Into<String>,
        access_code: impl Into<String>,
    ) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            role: Role::Doctor,
            doctor_access_code: Some(access_code.into()),
        }
    }
}

/// Credential-producing calls against the portal backend.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn password_login(&self, email: &str, password: &str) -> Result<Credential, AuthError>;

    async fn federated_login(
        &self,
        federated_token: &str,
        requested_role: Role,
    ) -> Result<Credential, AuthError>;

    async fn register(&self, registration: &Registration) -> Result<(), AuthError>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

#[derive(Debug, Serialize)]
struct FederatedLoginRequest<'a> {
    token: &'a str,
    role: Role,
}

/// HTTP implementation of [`AuthApi`]. One round trip per call, no retries.
#[derive(Debug, Clone)]
pub struct AuthService {
    client: Client,
    base_url: Url,
}

impl AuthService {
    pub fn new(client: Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    fn endpoint(&self, path: &str) -> Result<Url, AuthError> {
        crate::api::join_endpoint(&self.base_url, path)
            .map_err(|e| AuthError::UnexpectedResponse(format!("invalid endpoint {}: {}", path, e)))
    }

    async fn read_token(res: Response) -> Result<Credential, AuthError> {
        let body: TokenResponse = res.json().await?;
        body.access_token
            .filter(|t| !t.is_empty())
            .map(Credential::new)
            .ok_or_else(|| AuthError::UnexpectedResponse("Invalid token response".into()))
    }
}

#[async_trait]
impl AuthApi for AuthService {
    async fn password_login(&self, email: &str, password: &str) -> Result<Credential, AuthError> {
        debug!("Requesting password login for {}", email);
        let res = self
            .client
            .post(self.endpoint("auth/token")?)
            .form(&[("username", email), ("password", password)])
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status();
            let detail = rejection_detail(res, "Login failed. Please check your credentials.").await;
            warn!("Password login rejected for {} ({})", email, status);
            return Err(AuthError::InvalidCredentials(detail));
        }

        let credential = Self::read_token(res).await?;
        info!("Password login accepted for {}", email);
        Ok(credential)
    }

    async fn federated_login(
        &self,
        federated_token: &str,
        requested_role: Role,
    ) -> Result<Credential, AuthError> {
        debug!("Requesting federated login as {}", requested_role);
        let res = self
            .client
            .post(self.endpoint("auth/google-login")?)
            .json(&FederatedLoginRequest {
                token: federated_token,
                role: requested_role,
            })
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status();
            let detail = rejection_detail(res, "Google login failed. Please try again.").await;
            warn!("Federated login as {} rejected ({})", requested_role, status);
            return Err(AuthError::FederatedAuthRejected(detail));
        }

        let credential = Self::read_token(res).await?;
        info!("Federated login as {} accepted", requested_role);
        Ok(credential)
    }

    async fn register(&self, registration: &Registration) -> Result<(), AuthError> {
        debug!("Requesting registration for {} as {}", registration.email, registration.role);
        let res = self
            .client
            .post(self.endpoint("auth/register")?)
            .json(registration)
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status();
            let detail = rejection_detail(res, "Registration failed. Please try again.").await;
            warn!("Registration for {} rejected ({})", registration.email, status);
            return Err(AuthError::RegistrationRejected(detail));
        }

        info!("Registered {} as {}", registration.email, registration.role);
        Ok(())
    }
}

/// Extracts the human-readable `detail` from a FastAPI error body.
pub(crate) async fn rejection_detail(res: Response, fallback: &str) -> String {
    let status = res.status();
    match res.json::<serde_json::Value>().await {
        Ok(body) => detail_from_body(&body).unwrap_or_else(|| fallback_detail(status, fallback)),
        Err(_) => fallback_detail(status, fallback),
    }
}

fn fallback_detail(status: StatusCode, fallback: &str) -> String {
    format!("{} (HTTP {})", fallback, status.as_u16())
}

pub(crate) fn detail_from_body(body: &serde_json::Value) -> Option<String> {
    match body.get("detail")? {
        serde_json::Value::String(s) => Some(s.clone()),
        // Request validation failures come back as a list of {loc, msg, type}.
        serde_json::Value::Array(items) => {
            let messages: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(|m| m.as_str()))
                .collect();
            if messages.is_empty() {
                None
            } else {
                Some(messages.join("; "))
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_detail_from_string_body() {
        let body = json!({"detail": "Incorrect email or password"});
        assert_eq!(detail_from_body(&body).as_deref(), Some("Incorrect email or password"));
    }

    #[test]
    fn test_detail_from_validation_body() {
        let body = json!({"detail": [
            {"loc": ["body", "email"], "msg": "value is not a valid email address", "type": "value_error"},
            {"loc": ["body", "role"], "msg": "field required", "type": "missing"}
        ]});
        assert_eq!(
            detail_from_body(&body).as_deref(),
            Some("value is not a valid email address; field required")
        );
    }

    #[test]
    fn test_detail_missing() {
        assert_eq!(detail_from_body(&json!({"error": "nope"})), None);
        assert_eq!(detail_from_body(&json!({"detail": 42})), None);
    }

    #[test]
    fn test_registration_wire_shape() {
        let body = serde_json::to_value(Registration::doctor("d@x.com", "pw", "BAD")).unwrap();
        assert_eq!(
            body,
            json!({"email": "d@x.com", "password": "pw", "role": "doctor", "doctor_access_code": "BAD"})
        );

        let body = serde_json::to_value(Registration::patient("p@x.com", "pw")).unwrap();
        assert_eq!(body["doctor_access_code"], serde_json::Value::Null);
    }
}
