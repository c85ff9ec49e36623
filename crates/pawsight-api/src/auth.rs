//! Bearer-token middleware and standalone verifier.

use std::sync::Arc;

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::{
  extract::{Request, State},
  http::{HeaderMap, header},
  middleware::Next,
  response::Response,
};

use crate::{ApiSettings, error::ApiError};

/// Check `Authorization: Bearer <token>` against an argon2 PHC hash.
pub fn verify_bearer(headers: &HeaderMap, token_hash: &str) -> Result<(), ApiError> {
  let token = headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.strip_prefix("Bearer "))
    .ok_or(ApiError::Unauthorized)?;

  let parsed_hash = PasswordHash::new(token_hash).map_err(|_| ApiError::Unauthorized)?;

  Argon2::default()
    .verify_password(token.trim().as_bytes(), &parsed_hash)
    .map_err(|_| ApiError::Unauthorized)
}

/// Reject requests without a valid token when one is configured.
pub async fn require_bearer(
  State(settings): State<Arc<ApiSettings>>,
  req: Request,
  next: Next,
) -> Result<Response, ApiError> {
  if let Some(hash) = &settings.token_hash {
    verify_bearer(req.headers(), hash).inspect_err(|_| {
      tracing::debug!(path = %req.uri().path(), "rejected unauthenticated request");
    })?;
  }
  Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
  use argon2::{PasswordHasher, password_hash::SaltString};
  use axum::{
    Router,
    body::Body,
    http::{HeaderValue, Request, StatusCode},
  };
  use pawsight_store_sqlite::SqliteStore;
  use rand_core::OsRng;
  use tower::ServiceExt as _;

  use super::*;
  use crate::api_router;

  fn hash(token: &str) -> String {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
      .hash_password(token.as_bytes(), &salt)
      .unwrap()
      .to_string()
  }

  fn bearer(token: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
      header::AUTHORIZATION,
      HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
    );
    headers
  }

  #[test]
  fn correct_token() {
    assert!(verify_bearer(&bearer("s3cret"), &hash("s3cret")).is_ok());
  }

  #[test]
  fn wrong_token() {
    assert!(matches!(
      verify_bearer(&bearer("nope"), &hash("s3cret")),
      Err(ApiError::Unauthorized)
    ));
  }

  #[test]
  fn missing_or_malformed_header() {
    let h = hash("s3cret");
    assert!(verify_bearer(&HeaderMap::new(), &h).is_err());

    let mut basic = HeaderMap::new();
    basic.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwYXNz"));
    assert!(verify_bearer(&basic, &h).is_err());
  }

  async fn protected() -> Router {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let settings = ApiSettings { token_hash: Some(hash("s3cret")), ..ApiSettings::default() };
    api_router(std::sync::Arc::new(store), settings)
  }

  #[tokio::test]
  async fn router_rejects_without_token() {
    let app = protected().await;
    let req = Request::builder().uri("/subjects").body(Body::empty()).unwrap();

    let resp = app.oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(resp.headers().contains_key(header::WWW_AUTHENTICATE));
  }

  #[tokio::test]
  async fn router_accepts_valid_token() {
    let app = protected().await;
    let req = Request::builder()
      .uri("/subjects")
      .header(header::AUTHORIZATION, "Bearer s3cret")
      .body(Body::empty())
      .unwrap();

    let resp = app.oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
  }
}
