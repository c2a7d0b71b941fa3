use crate::auth::models::{Credential, Role, Session};
use crate::error::DecodeError;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

/// Claims the portal backend puts in its access tokens.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,  // Account email
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

/// Reads the claims of a credential without verifying it.
///
/// The backend verifies signatures and expiry on every request; the client only
/// needs the subject and role to decide which views to offer.
pub fn decode_claims(credential: &Credential) -> Result<Claims, DecodeError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    let data = decode::<Claims>(credential.as_str(), &DecodingKey::from_secret(&[]), &validation)?;
    Ok(data.claims)
}

pub fn decode_session(credential: &Credential) -> Result<Session, DecodeError> {
    let claims = decode_claims(credential)?;

    let role = claims.role.ok_or(DecodeError::MissingRoleClaim)?;
    let role = role
        .parse::<Role>()
        .map_err(DecodeError::MalformedCredential)?;

    if claims.sub.is_empty() {
        return Err(DecodeError::MalformedCredential("empty subject claim".into()));
    }

    Ok(Session {
        email: claims.sub,
        role,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;

    fn mint(claims: serde_json::Value) -> Credential {
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"backend_secret"),
        )
        .unwrap();
        Credential::new(token)
    }

    #[test]
    fn test_decode_valid_token() {
        let credential = mint(json!({"sub": "pat@x.com", "role": "patient", "exp": 1}));
        let session = decode_session(&credential).unwrap();
        assert_eq!(
            session,
            Session {
                email: "pat@x.com".into(),
                role: Role::Patient
            }
        );
    }

    #[test]
    fn test_decode_is_deterministic() {
        let credential = mint(json!({"sub": "doc@x.com", "role": "doctor"}));
        assert_eq!(decode_session(&credential), decode_session(&credential));
    }

    #[test]
    fn test_decode_ignores_signature_key() {
        let token = encode(
            &Header::new(Algorithm::HS512),
            &json!({"sub": "admin@intellimed.ai", "role": "admin"}),
            &EncodingKey::from_secret(b"some other secret"),
        )
        .unwrap();
        let session = decode_session(&Credential::new(token)).unwrap();
        assert_eq!(session.role, Role::Admin);
    }

    #[test]
    fn test_missing_role_claim() {
        let credential = mint(json!({"sub": "legacy@x.com", "exp": 1700000000}));
        assert_eq!(decode_session(&credential), Err(DecodeError::MissingRoleClaim));
    }

    #[test]
    fn test_unknown_role_is_malformed() {
        let credential = mint(json!({"sub": "n@x.com", "role": "nurse"}));
        assert!(matches!(
            decode_session(&credential),
            Err(DecodeError::MalformedCredential(_))
        ));
    }

    #[test]
    fn test_garbage_is_malformed() {
        for token in ["", "not-a-token", "a.b.c", "a.b"] {
            assert!(
                matches!(
                    decode_session(&Credential::new(token)),
                    Err(DecodeError::MalformedCredential(_))
                ),
                "token {:?} should be malformed",
                token
            );
        }
    }

    #[test]
    fn test_missing_subject_is_malformed() {
        let credential = mint(json!({"role": "patient"}));
        assert!(matches!(
            decode_session(&credential),
            Err(DecodeError::MalformedCredential(_))
        ));
    }
}
