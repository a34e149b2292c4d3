use actix_web::{
    Error, HttpMessage, HttpResponse,
    body::MessageBody,
    dev::{ServiceRequest, ServiceResponse},
    http::header::{AUTHORIZATION, HeaderMap},
    middleware::Next,
    web,
};

use super::token::TokenKeys;
use crate::dto::ApiErrorResponse;

/// Extract the token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Middleware function that requires a valid bearer token.
/// On success the decoded `Claims` are stored in request extensions;
/// otherwise the request is answered with 401 and never reaches a handler.
pub async fn require_bearer(
    req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    let claims = match (req.app_data::<web::Data<TokenKeys>>(), bearer_token(req.headers())) {
        (Some(keys), Some(token)) => keys.validate(token).ok(),
        (None, _) => {
            log::error!("TokenKeys missing from app data; rejecting authenticated route");
            None
        }
        _ => None,
    };

    match claims {
        Some(claims) => {
            req.extensions_mut().insert(claims);
            next.call(req).await.map(|res| res.map_into_left_body())
        }
        None => {
            let response = HttpResponse::Unauthorized().json(ApiErrorResponse {
                error: "Authentication required".to_string(),
            });
            Ok(req.into_response(response).map_into_right_body())
        }
    }
}
