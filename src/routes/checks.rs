/// Check Routes
///
/// Uptime checks belong to the user whose token made the request. The user
/// record keeps the list of check ids; a check outside that list is treated
/// as missing.

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{AppError, ErrorContext, StorageError, ValidationError};
use crate::middleware::AuthenticatedUser;
use crate::models::{load_owner, CheckRecord, HttpMethod, Protocol, UserRecord, MAX_CHECKS_PER_USER};
use crate::store::{self, DocumentStore, CHECKS, USERS};
use crate::validators::{is_valid_success_codes, is_valid_timeout, is_valid_url, required};

/// Fields of a check. All required on create, all optional on update.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckRequest {
    pub protocol: Option<Protocol>,
    pub url: Option<String>,
    pub method: Option<HttpMethod>,
    pub success_codes: Option<Vec<u16>>,
    pub timeout_in_seconds: Option<u8>,
}

impl CheckRequest {
    fn is_empty(&self) -> bool {
        self.protocol.is_none()
            && self.url.is_none()
            && self.method.is_none()
            && self.success_codes.is_none()
            && self.timeout_in_seconds.is_none()
    }
}

#[derive(Deserialize)]
pub struct CheckQuery {
    pub id: Option<String>,
}

fn not_found() -> AppError {
    StorageError::NotFound("check".to_string()).into()
}

/// Resolve `?id=` to a check the user owns.
async fn owned_check(
    store: &dyn DocumentStore,
    user: &UserRecord,
    id: &str,
) -> Result<CheckRecord, AppError> {
    if !user.checks.iter().any(|owned| owned == id) {
        return Err(not_found());
    }
    store::read_as::<CheckRecord>(store, CHECKS, id)
        .await?
        .ok_or_else(not_found)
}

/// POST /checks
///
/// # Errors
/// - 400: Missing or invalid fields
/// - 403: The user already has the maximum number of checks
pub async fn create_check(
    auth: web::ReqData<AuthenticatedUser>,
    body: web::Json<CheckRequest>,
    store: web::Data<dyn DocumentStore>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("check_creation").with_user_id(auth.claims.sub.clone());
    let body = body.into_inner();

    let protocol = body
        .protocol
        .ok_or_else(|| ValidationError::EmptyField("protocol".to_string()))?;
    let url = is_valid_url(&required(body.url.as_deref(), "url")?)?;
    let method = body
        .method
        .ok_or_else(|| ValidationError::EmptyField("method".to_string()))?;
    let success_codes = is_valid_success_codes(
        body.success_codes
            .as_deref()
            .ok_or_else(|| ValidationError::EmptyField("successCodes".to_string()))?,
    )?;
    let timeout_in_seconds = is_valid_timeout(
        body.timeout_in_seconds
            .ok_or_else(|| ValidationError::EmptyField("timeoutInSeconds".to_string()))?,
    )?;

    let mut user = load_owner(store.get_ref(), &auth.claims).await?;
    if user.checks.len() >= MAX_CHECKS_PER_USER {
        return Err(AppError::Forbidden(format!(
            "Maximum number of checks ({} / user) reached",
            MAX_CHECKS_PER_USER
        )));
    }

    let check = CheckRecord {
        id: Uuid::new_v4().to_string(),
        user_phone: user.phone.clone(),
        protocol,
        url,
        method,
        success_codes,
        timeout_in_seconds,
    };

    store::create_from(store.get_ref(), CHECKS, &check.id, &check).await?;

    user.checks.push(check.id.clone());
    if let Err(e) = store::update_from(store.get_ref(), USERS, &user.phone, &user).await {
        // Don't leave a check no user points at
        if let Err(cleanup) = store.delete(CHECKS, &check.id).await {
            tracing::error!(check_id = %check.id, error = %cleanup, "Failed to remove orphaned check");
        }
        let error = AppError::from(e);
        context.log_error(&error);
        return Err(error);
    }

    tracing::info!(
        request_id = %context.request_id,
        check_id = %check.id,
        "Check created"
    );

    Ok(HttpResponse::Created().json(check))
}

/// GET /checks, GET /checks?id=
pub async fn get_checks(
    auth: web::ReqData<AuthenticatedUser>,
    query: web::Query<CheckQuery>,
    store: web::Data<dyn DocumentStore>,
) -> Result<HttpResponse, AppError> {
    let user = load_owner(store.get_ref(), &auth.claims).await?;

    if let Some(id) = query.id.as_deref() {
        let check = owned_check(store.get_ref(), &user, id).await?;
        return Ok(HttpResponse::Ok().json(check));
    }

    let mut checks = Vec::with_capacity(user.checks.len());
    for id in &user.checks {
        match store::read_as::<CheckRecord>(store.get_ref(), CHECKS, id).await? {
            Some(check) => checks.push(check),
            None => tracing::warn!(check_id = %id, "User lists a check that does not exist"),
        }
    }

    Ok(HttpResponse::Ok().json(checks))
}

/// PATCH /checks?id=
///
/// `id` and `userPhone` are fixed; every other field may change.
pub async fn update_check(
    auth: web::ReqData<AuthenticatedUser>,
    query: web::Query<CheckQuery>,
    body: web::Json<CheckRequest>,
    store: web::Data<dyn DocumentStore>,
) -> Result<HttpResponse, AppError> {
    let id = required(query.id.as_deref(), "id")?;
    let body = body.into_inner();

    let user = load_owner(store.get_ref(), &auth.claims).await?;
    let mut check = owned_check(store.get_ref(), &user, &id).await?;

    if body.is_empty() {
        return Err(ValidationError::NothingToUpdate.into());
    }

    if let Some(protocol) = body.protocol {
        check.protocol = protocol;
    }
    if let Some(url) = body.url {
        check.url = is_valid_url(&url)?;
    }
    if let Some(method) = body.method {
        check.method = method;
    }
    if let Some(codes) = body.success_codes {
        check.success_codes = is_valid_success_codes(&codes)?;
    }
    if let Some(timeout) = body.timeout_in_seconds {
        check.timeout_in_seconds = is_valid_timeout(timeout)?;
    }

    store::update_from(store.get_ref(), CHECKS, &check.id, &check).await?;

    tracing::info!(check_id = %check.id, user_id = %user.id, "Check updated");

    Ok(HttpResponse::Ok().json(check))
}

/// DELETE /checks?id=
pub async fn delete_check(
    auth: web::ReqData<AuthenticatedUser>,
    query: web::Query<CheckQuery>,
    store: web::Data<dyn DocumentStore>,
) -> Result<HttpResponse, AppError> {
    let id = required(query.id.as_deref(), "id")?;

    let mut user = load_owner(store.get_ref(), &auth.claims).await?;
    if !user.checks.iter().any(|owned| *owned == id) {
        return Err(not_found());
    }

    store.delete(CHECKS, &id).await?;
    user.checks.retain(|owned| *owned != id);
    store::update_from(store.get_ref(), USERS, &user.phone, &user).await?;

    tracing::info!(check_id = %id, user_id = %user.id, "Check deleted");

    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "Check deleted" })))
}
