//! 登录、令牌签发与 Bearer 认证中间件。
//!
//! 令牌格式为 `<subject>.<expiry>.<signature>`，签名是对
//! `<subject>.<expiry>` 计算的 HMAC-SHA256（十六进制）。

use axum::body::{Body as AxumBody, Bytes};
use axum::extract::Extension;
use axum::http::Request;
use axum::middleware;
use axum::response::{Json as JsonResponse, Response};
use axum_extra::extract::TypedHeader;
use axum_extra::headers::{Authorization, authorization::Bearer};
use axum_extra::typed_header::TypedHeaderRejection;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use subtle::ConstantTimeEq;
use tracing::{debug, info, warn};

use crate::error::ApiError;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenError {
    Malformed,
    Expired { expired_at: u64 },
    InvalidSignature,
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenError::Malformed => write!(f, "malformed token"),
            TokenError::Expired { expired_at } => write!(f, "token expired at {expired_at}"),
            TokenError::InvalidSignature => write!(f, "invalid token signature"),
        }
    }
}

/// HMAC-SHA256 令牌签发与校验。
#[derive(Clone)]
pub struct TokenSigner {
    secret: Vec<u8>,
}

impl TokenSigner {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
        }
    }

    /// 为 subject 签发有效期为 `ttl` 的令牌。
    pub fn issue(&self, subject: &str, ttl: Duration) -> String {
        self.issue_with_expiry(subject, unix_now().saturating_add(ttl.as_secs()))
    }

    pub fn issue_with_expiry(&self, subject: &str, expiry: u64) -> String {
        let payload = format!("{subject}.{expiry}");
        let signature = hex::encode(self.mac(&payload));
        format!("{payload}.{signature}")
    }

    /// 校验令牌并返回其 subject。
    pub fn verify(&self, token: &str) -> Result<String, TokenError> {
        let (payload, signature) = token.rsplit_once('.').ok_or(TokenError::Malformed)?;
        let (subject, expiry) = payload.rsplit_once('.').ok_or(TokenError::Malformed)?;
        let expiry: u64 = expiry.parse().map_err(|_| TokenError::Malformed)?;
        let provided = hex::decode(signature).map_err(|_| TokenError::Malformed)?;

        let expected = self.mac(payload);
        if !bool::from(provided.ct_eq(&expected)) {
            return Err(TokenError::InvalidSignature);
        }
        if unix_now() > expiry {
            return Err(TokenError::Expired { expired_at: expiry });
        }
        Ok(subject.to_string())
    }

    fn mac(&self, payload: &str) -> Vec<u8> {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret).expect("HMAC can take key of any size");
        mac.update(payload.as_bytes());
        mac.finalize().into_bytes().to_vec()
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_secs())
        .unwrap_or(0)
}

pub struct AuthConfig {
    pub required: bool,
    pub username: String,
    pub password: String,
    pub signer: TokenSigner,
    pub token_ttl: Duration,
}

/// 认证中间件：启用时要求有效的 Bearer 令牌。
pub async fn require_token(
    Extension(auth): Extension<Arc<AuthConfig>>,
    bearer: Result<TypedHeader<Authorization<Bearer>>, TypedHeaderRejection>,
    req: Request<AxumBody>,
    next: middleware::Next,
) -> Result<Response, ApiError> {
    if !auth.required {
        return Ok(next.run(req).await);
    }

    // 缺失、非 Bearer 或格式错误的 Authorization 一律按未认证处理
    let TypedHeader(Authorization(bearer)) = bearer.map_err(|rejection| {
        debug!(path = req.uri().path(), reason = %rejection, "missing bearer token");
        unauthorized()
    })?;

    match auth.signer.verify(bearer.token()) {
        Ok(subject) => {
            debug!(subject, path = req.uri().path(), "token accepted");
            Ok(next.run(req).await)
        }
        Err(err) => {
            match err {
                TokenError::InvalidSignature => warn!(error = %err, "token rejected"),
                _ => debug!(error = %err, "token rejected"),
            }
            Err(unauthorized())
        }
    }
}

fn unauthorized() -> ApiError {
    ApiError::Unauthorized("Unauthorized".into())
}

#[derive(Deserialize)]
pub(crate) struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Serialize)]
pub(crate) struct LoginResponse {
    token: String,
}

/// 登录接口：校验凭据并签发令牌。
pub async fn login(
    Extension(auth): Extension<Arc<AuthConfig>>,
    body: Bytes,
) -> Result<JsonResponse<LoginResponse>, ApiError> {
    let payload: LoginRequest =
        serde_json::from_slice(&body).map_err(|_| ApiError::invalid_request())?;

    let email_ok: bool = payload.email.as_bytes().ct_eq(auth.username.as_bytes()).into();
    let password_ok: bool = payload
        .password
        .as_bytes()
        .ct_eq(auth.password.as_bytes())
        .into();
    if !(email_ok && password_ok) {
        warn!(email = payload.email, "login failed");
        return Err(ApiError::Unauthorized("Invalid credentials".into()));
    }

    let token = auth.signer.issue(&payload.email, auth.token_ttl);
    info!(email = payload.email, "login succeeded");
    Ok(JsonResponse(LoginResponse { token }))
}
