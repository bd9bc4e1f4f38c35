/// Bearer token authentication middleware
///
/// Reads `Authorization: Bearer <token>`, runs it through the
/// `TokenAuthority`, and on success puts an `AuthenticatedUser` into the
/// request extensions for handlers (`web::ReqData<AuthenticatedUser>`).

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{HeaderMap, AUTHORIZATION},
    Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;

use crate::auth::{Claims, TokenAuthority};
use crate::error::{AppError, AuthError};

const BEARER_PREFIX: &str = "bearer ";

/// The validated caller of a protected route
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub claims: Claims,
    /// The token exactly as presented
    pub token: String,
}

/// Extract the token from an `Authorization` header. The scheme is matched
/// case-insensitively and surrounding whitespace is dropped.
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
    if value.len() < BEARER_PREFIX.len()
        || !value[..BEARER_PREFIX.len()].eq_ignore_ascii_case(BEARER_PREFIX)
    {
        return None;
    }
    let token = value[BEARER_PREFIX.len()..].trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

pub struct BearerAuth {
    authority: TokenAuthority,
}

impl BearerAuth {
    pub fn new(authority: TokenAuthority) -> Self {
        Self { authority }
    }
}

impl<S, B> Transform<S, ServiceRequest> for BearerAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = BearerAuthService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(BearerAuthService {
            service: Rc::new(service),
            authority: self.authority.clone(),
        }))
    }
}

pub struct BearerAuthService<S> {
    service: Rc<S>,
    authority: TokenAuthority,
}

impl<S, B> Service<ServiceRequest> for BearerAuthService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let token = bearer_token(req.headers());
        let authority = self.authority.clone();
        let service = self.service.clone();

        Box::pin(async move {
            let Some(token) = token else {
                tracing::warn!(path = %req.path(), "Missing or invalid Authorization header");
                return Err(AppError::Auth(AuthError::MissingToken).into());
            };

            let claims = authority.validate(&token).await.map_err(Error::from)?;

            tracing::debug!(user_id = %claims.sub, "Bearer token accepted");
            req.extensions_mut()
                .insert(AuthenticatedUser { claims, token });

            service.call(req).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::header::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_bearer_token_extraction() {
        assert_eq!(bearer_token(&headers("Bearer abc.def.ghi")), Some("abc.def.ghi".to_string()));
        assert_eq!(bearer_token(&headers("bearer   abc.def.ghi  ")), Some("abc.def.ghi".to_string()));
        assert_eq!(bearer_token(&headers("BEARER abc")), Some("abc".to_string()));
    }

    #[test]
    fn test_rejects_other_schemes_and_empty_tokens() {
        assert_eq!(bearer_token(&headers("Basic dXNlcjpwYXNz")), None);
        assert_eq!(bearer_token(&headers("Bearer")), None);
        assert_eq!(bearer_token(&headers("Bearer    ")), None);
        assert_eq!(bearer_token(&headers("BearerToken")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }
}
