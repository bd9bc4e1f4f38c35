/// Token Routes
///
/// Login, refresh and logout on top of the `TokenAuthority`.

use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::auth::{CredentialHasher, IssuedToken, TokenAuthority};
use crate::error::{AppError, AuthError, ErrorContext, ValidationError};
use crate::middleware::bearer_token;
use crate::models::{load_owner, UserRecord};
use crate::store::{self, DocumentStore, USERS};
use crate::validators::required;

const TOKEN_TYPE: &str = "Bearer";

#[derive(Deserialize)]
pub struct LoginRequest {
    pub phone: Option<String>,
    pub password: Option<String>,
}

#[derive(Deserialize)]
pub struct ExtendRequest {
    pub token: Option<String>,
    pub extend: Option<bool>,
}

#[derive(Serialize)]
pub struct TokenResponse {
    pub token: String,
    pub token_type: String,
    pub expires_in: i64,
}

impl From<IssuedToken> for TokenResponse {
    fn from(issued: IssuedToken) -> Self {
        Self {
            expires_in: issued.expires_in(),
            token: issued.token,
            token_type: TOKEN_TYPE.to_string(),
        }
    }
}

/// POST /tokens
///
/// Unknown phone and wrong password give the same answer.
///
/// # Errors
/// - 400: Missing fields or invalid credentials
/// - 503: Storage unavailable
pub async fn create_token(
    body: web::Json<LoginRequest>,
    store: web::Data<dyn DocumentStore>,
    hasher: web::Data<CredentialHasher>,
    authority: web::Data<TokenAuthority>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("token_issue");

    let phone = required(body.phone.as_deref(), "phone")?;
    let password = body
        .password
        .as_deref()
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ValidationError::EmptyField("password".to_string()))?;

    let user = store::read_as::<UserRecord>(store.get_ref(), USERS, &phone).await?;

    let user = match user {
        Some(user) if hasher.matches(password, &user.password) => user,
        _ => {
            tracing::warn!(request_id = %context.request_id, "Failed login attempt");
            return Err(AuthError::InvalidCredentials.into());
        }
    };

    let issued = authority.issue(&user.identity()?)?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = %user.id,
        "User logged in successfully"
    );

    Ok(HttpResponse::Ok().json(TokenResponse::from(issued)))
}

/// PUT /tokens
///
/// The token is checked first, so an invalid token is a 401 whatever
/// `extend` says.
pub async fn extend_token(
    body: web::Json<ExtendRequest>,
    store: web::Data<dyn DocumentStore>,
    authority: web::Data<TokenAuthority>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let token = body
        .token
        .filter(|t| !t.trim().is_empty())
        .ok_or(AuthError::MissingToken)?;

    let claims = authority.validate(&token).await?;
    load_owner(store.get_ref(), &claims).await?;

    if body.extend != Some(true) {
        return Err(ValidationError::InvalidFormat("extend".to_string()).into());
    }

    let issued = authority.refresh(&token).await?;
    Ok(HttpResponse::Ok().json(TokenResponse::from(issued)))
}

/// DELETE /tokens
///
/// Revokes the bearer token. Expired tokens can still be revoked; only a
/// missing or undecodable token is refused.
pub async fn revoke_token(
    req: HttpRequest,
    authority: web::Data<TokenAuthority>,
) -> Result<HttpResponse, AppError> {
    let token = bearer_token(req.headers()).ok_or(AuthError::MissingToken)?;
    authority.revoke(&token).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "Token revoked" })))
}
