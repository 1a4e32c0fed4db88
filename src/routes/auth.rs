//! Bearer-token authentication for the match endpoints.

use actix_web::{dev::Payload, http::StatusCode, web, FromRequest, HttpRequest, HttpResponse, ResponseError};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::future::{ready, Ready};
use thiserror::Error;

use crate::models::{ErrorResponse, Role, Viewer};

/// Access token claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Client id
    pub sub: i32,
    pub email: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing bearer token")]
    MissingToken,

    #[error("Invalid token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),

    #[error("Authentication is not configured")]
    NotConfigured,
}

impl ResponseError for AuthError {
    fn status_code(&self) -> StatusCode {
        match self {
            AuthError::NotConfigured => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        HttpResponse::build(status).json(ErrorResponse {
            error: "unauthorized".to_string(),
            message: self.to_string(),
            status_code: status.as_u16(),
        })
    }
}

/// Signs and verifies HS256 access tokens
#[derive(Clone)]
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtManager {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
        }
    }

    /// Issue a token for a client, valid for `ttl_secs`
    pub fn issue(
        &self,
        client_id: i32,
        email: &str,
        role: Role,
        ttl_secs: i64,
    ) -> Result<String, AuthError> {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: client_id,
            email: email.to_string(),
            role,
            iat: now,
            exp: now + ttl_secs,
        };

        Ok(jsonwebtoken::encode(&Header::default(), &claims, &self.encoding_key)?)
    }

    pub fn validate(&self, token: &str) -> Result<Claims, AuthError> {
        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &Validation::default())?;
        Ok(data.claims)
    }
}

/// Authenticated caller, extracted from `Authorization: Bearer <token>`
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub claims: Claims,
}

impl AuthUser {
    pub fn viewer(&self) -> Viewer {
        Viewer {
            client_id: self.claims.sub,
            role: self.claims.role,
        }
    }
}

impl FromRequest for AuthUser {
    type Error = AuthError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(authenticate(req))
    }
}

fn authenticate(req: &HttpRequest) -> Result<AuthUser, AuthError> {
    let jwt = req
        .app_data::<web::Data<JwtManager>>()
        .ok_or(AuthError::NotConfigured)?;

    let token = req
        .headers()
        .get(actix_web::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::MissingToken)?;

    let claims = jwt.validate(token).map_err(|e| {
        tracing::debug!("Rejected bearer token on {}: {}", req.path(), e);
        e
    })?;

    Ok(AuthUser { claims })
}
