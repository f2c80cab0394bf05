// cart_service/src/errors.rs

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use cartflow::ShopError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
  #[error(transparent)]
  Shop(#[from] ShopError),

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Broker Error: {0}")]
  Broker(String),

  #[error("Database Error: {0}")]
  Sqlx(#[from] sqlx::Error),

  #[error("Migration Error: {0}")]
  Migrate(#[from] sqlx::migrate::MigrateError),

  #[error("Internal Server Error: {0}")]
  Internal(String),
}

impl From<lapin::Error> for AppError {
  fn from(err: lapin::Error) -> Self {
    AppError::Broker(err.to_string())
  }
}

impl From<anyhow::Error> for AppError {
  fn from(err: anyhow::Error) -> Self {
    AppError::Internal(err.to_string())
  }
}

impl ResponseError for AppError {
  fn status_code(&self) -> StatusCode {
    match self {
      AppError::Shop(shop_err) => match shop_err {
        ShopError::NotFound(_) | ShopError::ItemNotInCart(_) => StatusCode::NOT_FOUND,
        ShopError::Conflict(_) => StatusCode::CONFLICT,
        ShopError::Validation(_) | ShopError::EmptyCart { .. } => StatusCode::BAD_REQUEST,
        ShopError::StoreUnavailable(_) | ShopError::Workflow(_) | ShopError::Halted(_) => {
          StatusCode::INTERNAL_SERVER_ERROR
        }
      },
      _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }

  fn error_response(&self) -> HttpResponse {
    let status = self.status_code();
    if status.is_server_error() {
      tracing::error!(application_error = %self, "Responding with error");
    } else {
      tracing::warn!(application_error = %self, status = status.as_u16(), "Responding with error");
    }
    HttpResponse::build(status)
      .content_type("text/plain; charset=utf-8")
      .body(self.to_string())
  }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
  use super::*;
  use uuid::Uuid;

  #[test]
  fn shop_errors_map_to_http_statuses() {
    let cases = [
      (ShopError::NotFound("product not found: x".into()), StatusCode::NOT_FOUND),
      (ShopError::ItemNotInCart(Uuid::nil()), StatusCode::NOT_FOUND),
      (ShopError::Conflict("taken".into()), StatusCode::CONFLICT),
      (ShopError::Validation("bad".into()), StatusCode::BAD_REQUEST),
      (
        ShopError::EmptyCart {
          username: "alice".into(),
        },
        StatusCode::BAD_REQUEST,
      ),
      (ShopError::StoreUnavailable("down".into()), StatusCode::INTERNAL_SERVER_ERROR),
    ];
    for (shop_err, expected) in cases {
      assert_eq!(AppError::from(shop_err).status_code(), expected);
    }
    assert_eq!(
      AppError::Broker("gone".into()).status_code(),
      StatusCode::INTERNAL_SERVER_ERROR
    );
  }
}
