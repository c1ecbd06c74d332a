// src/auth.rs
use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, decode_header, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use log::{info, warn};
use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use warp::filters::BoxedFilter;
use warp::http::StatusCode;
use warp::path::Peek;
use warp::reject::Reject;
use warp::Filter;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing bearer token")]
    MissingToken,
    #[error("Invalid token: {0}")]
    InvalidToken(String),
    #[error("Insufficient scope")]
    InsufficientScope,
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::MissingToken | AuthError::InvalidToken(_) => StatusCode::UNAUTHORIZED,
            AuthError::InsufficientScope => StatusCode::FORBIDDEN,
        }
    }
}

impl Reject for AuthError {}

/// Signing keys could not be fetched at startup.
#[derive(Debug, Error)]
#[error("Failed to load signing keys: {0}")]
pub struct KeyLoadError(String);

#[derive(Serialize)]
struct TokenClaims<'a> {
    sub: &'a str,
    aud: &'a str,
    iss: &'a str,
    scope: &'a str,
    exp: usize,
}

#[derive(Deserialize)]
struct SubjectClaims {
    sub: String,
    #[serde(default)]
    scope: String,
}

#[derive(Deserialize)]
struct JwkSet {
    keys: Vec<Jwk>,
}

#[derive(Deserialize)]
struct Jwk {
    #[serde(default)]
    kid: String,
    #[serde(default)]
    n: String,
    #[serde(default)]
    e: String,
}

enum SigningKeys {
    Secret(Vec<u8>),
    Rsa(HashMap<String, (String, String)>),
}

/// Validates bearer tokens issued by the authorization server for this
/// service's audience and scope.
pub struct Authenticator {
    audience: String,
    issuer: String,
    scope: String,
    keys: SigningKeys,
}

impl Authenticator {
    pub fn with_secret(audience: &str, issuer: &str, scope: &str, secret: &[u8]) -> Self {
        Self {
            audience: audience.to_string(),
            issuer: issuer.to_string(),
            scope: scope.to_string(),
            keys: SigningKeys::Secret(secret.to_vec()),
        }
    }

    /// Fetches the RS256 keys published by the authorization server.
    pub async fn from_jwks(
        audience: &str,
        issuer: &str,
        scope: &str,
    ) -> Result<Self, KeyLoadError> {
        let url = format!("{}/.well-known/jwks.json", issuer.trim_end_matches('/'));
        let jwks = reqwest::get(&url)
            .await
            .map_err(|e| KeyLoadError(e.to_string()))?
            .error_for_status()
            .map_err(|e| KeyLoadError(e.to_string()))?
            .json::<JwkSet>()
            .await
            .map_err(|e| KeyLoadError(e.to_string()))?;

        let keys: HashMap<_, _> = jwks
            .keys
            .into_iter()
            .filter(|k| !k.n.is_empty() && !k.e.is_empty())
            .map(|k| (k.kid, (k.n, k.e)))
            .collect();
        if keys.is_empty() {
            return Err(KeyLoadError(format!("no RSA keys at {}", url)));
        }
        info!("Loaded {} signing keys from {}", keys.len(), url);

        Ok(Self {
            audience: audience.to_string(),
            issuer: issuer.to_string(),
            scope: scope.to_string(),
            keys: SigningKeys::Rsa(keys),
        })
    }

    /// Returns the `sub` claim of a valid token.
    pub fn subject(&self, token: &str) -> Result<String, AuthError> {
        let invalid = |e: jsonwebtoken::errors::Error| AuthError::InvalidToken(e.to_string());

        let (key, mut validation) = match &self.keys {
            SigningKeys::Secret(secret) => (
                DecodingKey::from_secret(secret),
                Validation::new(Algorithm::HS256),
            ),
            SigningKeys::Rsa(keys) => {
                let kid = decode_header(token)
                    .map_err(invalid)?
                    .kid
                    .ok_or_else(|| AuthError::InvalidToken("missing kid".to_string()))?;
                let (n, e) = keys
                    .get(&kid)
                    .ok_or_else(|| AuthError::InvalidToken(format!("unknown kid {}", kid)))?;
                (
                    DecodingKey::from_rsa_components(n, e),
                    Validation::new(Algorithm::RS256),
                )
            }
        };
        validation.set_audience(&[self.audience.as_str()]);
        validation.iss = Some(self.issuer.clone());

        let claims = decode::<SubjectClaims>(token, &key, &validation)
            .map_err(invalid)?
            .claims;

        if !self.scope.is_empty() && !claims.scope.split_whitespace().any(|s| s == self.scope) {
            return Err(AuthError::InsufficientScope);
        }
        Ok(claims.sub)
    }
}

/// Issues an HS256 token valid for one hour.
pub fn create_token(
    user_id: &str,
    audience: &str,
    issuer: &str,
    scope: &str,
    secret: &[u8],
) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = TokenClaims {
        sub: user_id,
        aud: audience,
        iss: issuer,
        scope,
        exp: (Utc::now() + Duration::hours(1)).timestamp() as usize,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret))
}

/// Identity taken from the bearer token's subject.
pub fn subject_from_token(auth: Arc<Authenticator>) -> BoxedFilter<(String,)> {
    warp::header::optional::<String>("authorization")
        .and_then(move |header: Option<String>| {
            let auth = auth.clone();
            async move {
                let token = header
                    .as_deref()
                    .and_then(|h| h.strip_prefix("Bearer "))
                    .ok_or_else(|| warp::reject::custom(AuthError::MissingToken))?;
                auth.subject(token).map_err(|e| {
                    warn!("Rejected token: {}", e);
                    warp::reject::custom(e)
                })
            }
        })
        .boxed()
}

/// Percent-decodes a path segment. Segments that are not UTF-8 once decoded
/// yield `None`.
pub fn decode_segment(raw: &str) -> Option<String> {
    percent_decode_str(raw)
        .decode_utf8()
        .ok()
        .map(|s| s.into_owned())
}

/// Identity taken from the next path segment, for the internal listener.
pub fn trusted_path_id() -> BoxedFilter<(String,)> {
    warp::path::peek()
        .and_then(|rest: Peek| async move {
            decode_segment(rest.segments().next().unwrap_or_default())
                .ok_or_else(warp::reject::not_found)
        })
        .boxed()
}
