//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use folio_catalog::Error as CatalogError;
use serde_json::json;
use thiserror::Error;

/// Shown instead of backend detail, which is logged.
pub const INTERNAL_ERROR: &str = "Internal server error";

pub const ACTIVITY_UNAVAILABLE: &str =
  "The detail of this activity is not available";

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("unauthorized")]
  Unauthorized,

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error(transparent)]
  Catalog(#[from] CatalogError),
}

impl From<folio_core::validation::ValidationErrors> for ApiError {
  fn from(errors: folio_core::validation::ValidationErrors) -> Self {
    ApiError::Catalog(CatalogError::Validation(errors))
  }
}

fn message(status: StatusCode, message: impl Into<String>) -> Response {
  (status, Json(json!({ "error": message.into() }))).into_response()
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let e = match self {
      ApiError::Unauthorized => {
        let mut res = message(StatusCode::UNAUTHORIZED, "Unauthorized");
        res.headers_mut().insert(
          header::WWW_AUTHENTICATE,
          HeaderValue::from_static("Basic realm=\"folio\""),
        );
        return res;
      }
      ApiError::BadRequest(m) => return message(StatusCode::BAD_REQUEST, m),
      ApiError::Catalog(e) => e,
    };

    match e {
      CatalogError::Forbidden(m) => message(StatusCode::FORBIDDEN, m),
      CatalogError::NotFound(m) => message(StatusCode::NOT_FOUND, m),
      CatalogError::Validation(fields) => (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": "Validation error", "fields": fields })),
      )
        .into_response(),
      CatalogError::UnmigratedActivity(id) => {
        tracing::debug!(activity = %id, "activity payload has not been migrated");
        message(StatusCode::NOT_FOUND, ACTIVITY_UNAVAILABLE)
      }
      CatalogError::IndexUnavailable(detail) => {
        tracing::warn!(%detail, "search index unavailable");
        message(StatusCode::SERVICE_UNAVAILABLE, "Search index unavailable")
      }
      CatalogError::Vetoed(veto) => message(StatusCode::BAD_REQUEST, veto.reason),
      e @ (CatalogError::Index(_) | CatalogError::Store(_)) => {
        tracing::error!(error = %e, "request failed");
        message(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR)
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use uuid::Uuid;

  async fn render(e: impl Into<ApiError>) -> (StatusCode, serde_json::Value) {
    let resp = e.into().into_response();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
      .await
      .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
  }

  #[tokio::test]
  async fn backend_detail_is_not_leaked() {
    let detail = std::io::Error::other("disk /var/lib/folio is full");
    let (status, body) = render(CatalogError::Store(Box::new(detail))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], INTERNAL_ERROR);
  }

  #[tokio::test]
  async fn unreachable_index_is_503() {
    let (status, _) = render(CatalogError::IndexUnavailable("refused".into())).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
  }

  #[tokio::test]
  async fn unmigrated_activity_is_404() {
    let (status, body) = render(CatalogError::UnmigratedActivity(Uuid::new_v4())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], ACTIVITY_UNAVAILABLE);
  }

  #[tokio::test]
  async fn vetoes_are_bad_requests() {
    let veto = folio_core::plugin::Veto { plugin: "quota".into(), reason: "slow down".into() };
    let (status, body) = render(CatalogError::Vetoed(veto)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "slow down");
  }
}
