/// User Routes
///
/// Registration is public. Reading, editing and deleting a user requires a
/// bearer token, and always acts on the token's own user.

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::{validate_password_strength, CredentialHasher, TokenAuthority};
use crate::error::{AppError, ErrorContext, ValidationError};
use crate::middleware::AuthenticatedUser;
use crate::models::{load_owner, UserRecord, UserResponse};
use crate::store::{self, DocumentStore, CHECKS, USERS};
use crate::validators::{is_valid_name, is_valid_phone, required};

/// User registration request
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub password: Option<String>,
    pub tos_agreement: Option<bool>,
}

/// Partial user update. Phone is the record key and cannot change.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub password: Option<String>,
}

/// POST /users
///
/// # Errors
/// - 400: Missing or invalid fields, weak password, terms not accepted
/// - 409: Phone already registered
/// - 500: Password could not be hashed
pub async fn create_user(
    body: web::Json<CreateUserRequest>,
    store: web::Data<dyn DocumentStore>,
    hasher: web::Data<CredentialHasher>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("user_registration");
    let body = body.into_inner();

    let first_name = is_valid_name(&required(body.first_name.as_deref(), "firstName")?, "firstName")?;
    let last_name = is_valid_name(&required(body.last_name.as_deref(), "lastName")?, "lastName")?;
    let phone = is_valid_phone(&required(body.phone.as_deref(), "phone")?)?;
    let password = body
        .password
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ValidationError::EmptyField("password".to_string()))?;
    if body.tos_agreement != Some(true) {
        return Err(ValidationError::EmptyField("tosAgreement".to_string()).into());
    }
    validate_password_strength(&password)?;

    let digest = hasher.hash(&password).ok_or_else(|| {
        let error = AppError::Internal("password hashing failed".to_string());
        context.log_error(&error);
        error
    })?;

    let user = UserRecord {
        id: Uuid::new_v4().to_string(),
        first_name,
        last_name,
        phone,
        password: digest,
        tos_agreement: true,
        checks: Vec::new(),
    };

    // Atomic create: a concurrent registration of the same phone gets 409
    store::create_from(store.get_ref(), USERS, &user.phone, &user).await?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = %user.id,
        "User registered successfully"
    );

    Ok(HttpResponse::Created().json(UserResponse::from(user)))
}

/// GET /users
pub async fn get_user(
    auth: web::ReqData<AuthenticatedUser>,
    store: web::Data<dyn DocumentStore>,
) -> Result<HttpResponse, AppError> {
    let user = load_owner(store.get_ref(), &auth.claims).await?;
    Ok(HttpResponse::Ok().json(UserResponse::from(user)))
}

/// PATCH /users
///
/// Updates any of firstName, lastName, password. A new password is checked
/// for strength and re-hashed.
pub async fn update_user(
    auth: web::ReqData<AuthenticatedUser>,
    body: web::Json<UpdateUserRequest>,
    store: web::Data<dyn DocumentStore>,
    hasher: web::Data<CredentialHasher>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("user_update").with_user_id(auth.claims.sub.clone());
    let body = body.into_inner();

    if body.first_name.is_none() && body.last_name.is_none() && body.password.is_none() {
        return Err(ValidationError::NothingToUpdate.into());
    }

    let mut user = load_owner(store.get_ref(), &auth.claims).await?;

    if let Some(first_name) = body.first_name {
        user.first_name = is_valid_name(&first_name, "firstName")?;
    }
    if let Some(last_name) = body.last_name {
        user.last_name = is_valid_name(&last_name, "lastName")?;
    }
    if let Some(password) = body.password {
        validate_password_strength(&password)?;
        user.password = hasher.hash(&password).ok_or_else(|| {
            let error = AppError::Internal("password hashing failed".to_string());
            context.log_error(&error);
            error
        })?;
    }

    store::update_from(store.get_ref(), USERS, &user.phone, &user).await?;

    tracing::info!(request_id = %context.request_id, user_id = %user.id, "User updated");

    Ok(HttpResponse::Ok().json(UserResponse::from(user)))
}

/// DELETE /users
///
/// Removes the user's checks, then the user, then revokes the token that
/// made the request.
pub async fn delete_user(
    auth: web::ReqData<AuthenticatedUser>,
    store: web::Data<dyn DocumentStore>,
    authority: web::Data<TokenAuthority>,
) -> Result<HttpResponse, AppError> {
    let auth = auth.into_inner();
    let context = ErrorContext::new("user_deletion").with_user_id(auth.claims.sub.clone());

    let user = load_owner(store.get_ref(), &auth.claims).await?;

    for check_id in &user.checks {
        store.delete(CHECKS, check_id).await?;
    }
    store.delete(USERS, &user.phone).await?;
    authority.revoke(&auth.token).await?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = %user.id,
        checks = user.checks.len(),
        "User deleted"
    );

    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "User deleted" })))
}
