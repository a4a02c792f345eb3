// stockroom_server/src/web/extractors.rs

use actix_web::{FromRequest, HttpRequest};
use stockroom::OwnerId;
use tracing::warn;

use crate::errors::AppError;

pub const USER_ID_HEADER: &str = "X-User-ID";

/// The caller's identity. Authentication happens upstream; by the time a
/// request arrives here the gateway has put the owner id in `X-User-ID`.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser {
  pub owner_id: OwnerId,
}

impl FromRequest for AuthenticatedUser {
  type Error = AppError;
  type Future = futures_util::future::Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
    let parsed = req
      .headers()
      .get(USER_ID_HEADER)
      .and_then(|value| value.to_str().ok())
      .and_then(|raw| raw.trim().parse::<OwnerId>().ok());

    match parsed {
      Some(owner_id) => futures_util::future::ready(Ok(AuthenticatedUser { owner_id })),
      None => {
        warn!("AuthenticatedUser extractor: Missing or invalid X-User-ID header.");
        futures_util::future::ready(Err(AppError::Auth(
          "Missing or invalid X-User-ID header.".to_string(),
        )))
      }
    }
  }
}
