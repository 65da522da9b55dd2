use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::config::Settings;

#[derive(Debug, Error)]
pub(crate) enum SecurityError {
    #[error("identity provider jwt secret is not configured")]
    MissingSecret,
    #[error("jwt decoding failed")]
    JwtDecoding,
}

/// Claims carried by access tokens the identity provider issues.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct Claims {
    pub(crate) sub: String,
    pub(crate) exp: i64,
    #[serde(default)]
    pub(crate) aud: Option<String>,
    #[serde(default)]
    pub(crate) email: Option<String>,
}

/// Verifies a bearer token locally against the provider's shared HS256 secret and returns its
/// claims. `sub` is the identity provider's user id, which is also the profile id.
pub(crate) fn verify_token(token: &str, settings: &Settings) -> Result<Claims, SecurityError> {
    let identity = settings.identity();
    if identity.jwt_secret.is_empty() {
        return Err(SecurityError::MissingSecret);
    }

    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    validation.set_audience(&[identity.jwt_audience.as_str()]);
    validation.required_spec_claims.insert("exp".to_string());
    validation.required_spec_claims.insert("sub".to_string());

    decode::<Claims>(token, &DecodingKey::from_secret(identity.jwt_secret.as_bytes()), &validation)
        .map(|data| data.claims)
        .map_err(|_| SecurityError::JwtDecoding)
}

/// Mints a token shaped like the provider's. Only tests need to issue tokens locally.
#[cfg(test)]
pub(crate) fn create_access_token(
    subject: &str,
    settings: &Settings,
    expires_in: time::Duration,
) -> String {
    use jsonwebtoken::{encode, EncodingKey, Header};

    let claims = Claims {
        sub: subject.to_string(),
        exp: (time::OffsetDateTime::now_utc() + expires_in).unix_timestamp(),
        aud: Some(settings.identity().jwt_audience.clone()),
        email: None,
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(settings.identity().jwt_secret.as_bytes()),
    )
    .expect("encode test token")
}
