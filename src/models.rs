/// Stored documents
///
/// Users live in the `users` collection keyed by phone, checks in `checks`
/// keyed by id. Field names are camelCase on disk and on the wire.

use serde::{Deserialize, Serialize};

use crate::auth::{Claims, Identity};
use crate::error::{AppError, StorageError};
use crate::store::{self, DocumentStore, USERS};

pub const MAX_CHECKS_PER_USER: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    /// Keyed digest, never the plain password
    pub password: String,
    pub tos_agreement: bool,
    #[serde(default)]
    pub checks: Vec<String>,
}

impl UserRecord {
    pub fn identity(&self) -> Result<Identity, AppError> {
        let user_id = uuid::Uuid::parse_str(&self.id)
            .map_err(|e| StorageError::Corrupt(format!("user id: {}", e)))?;
        Ok(Identity {
            user_id,
            contact: self.phone.clone(),
        })
    }
}

/// A user as returned to clients
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub tos_agreement: bool,
    pub checks: Vec<String>,
}

impl From<UserRecord> for UserResponse {
    fn from(user: UserRecord) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name,
            last_name: user.last_name,
            phone: user.phone,
            tos_agreement: user.tos_agreement,
            checks: user.checks,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Http,
    Https,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckRecord {
    pub id: String,
    pub user_phone: String,
    pub protocol: Protocol,
    pub url: String,
    pub method: HttpMethod,
    pub success_codes: Vec<u16>,
    pub timeout_in_seconds: u8,
}

/// Load the user a validated token speaks for.
///
/// The token names the user by phone (`contact`) and id (`sub`). A record
/// under that phone with another id belongs to someone who re-registered
/// the number, so it is reported as missing.
pub async fn load_owner(store: &dyn DocumentStore, claims: &Claims) -> Result<UserRecord, AppError> {
    match store::read_as::<UserRecord>(store, USERS, &claims.contact).await? {
        Some(user) if user.id == claims.sub => Ok(user),
        _ => Err(StorageError::NotFound("user".to_string()).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::{Duration, Utc};

    fn user(id: &str) -> UserRecord {
        UserRecord {
            id: id.to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            phone: "5551234567".to_string(),
            password: "digest".to_string(),
            tos_agreement: true,
            checks: vec![],
        }
    }

    fn claims_for(user: &UserRecord) -> Claims {
        Claims::new(&user.identity().unwrap(), Utc::now(), Duration::hours(1))
    }

    #[test]
    fn test_user_serializes_camel_case_and_response_hides_digest() {
        let record = user(&uuid::Uuid::new_v4().to_string());
        let stored = serde_json::to_value(&record).unwrap();
        assert_eq!(stored["firstName"], "Ada");
        assert_eq!(stored["tosAgreement"], true);

        let response = serde_json::to_value(UserResponse::from(record)).unwrap();
        assert!(response.get("password").is_none());
        assert_eq!(response["lastName"], "Lovelace");
    }

    #[test]
    fn test_user_without_checks_field_deserializes() {
        let record: UserRecord = serde_json::from_value(serde_json::json!({
            "id": "x", "firstName": "a", "lastName": "b", "phone": "5551234567",
            "password": "d", "tosAgreement": true
        }))
        .unwrap();
        assert!(record.checks.is_empty());
    }

    #[test]
    fn test_check_enums_are_lowercase() {
        let value = serde_json::to_value(HttpMethod::Delete).unwrap();
        assert_eq!(value, "delete");
        assert!(serde_json::from_value::<Protocol>(serde_json::json!("ftp")).is_err());
    }

    #[tokio::test]
    async fn test_load_owner_requires_matching_id() {
        let store = MemoryStore::new();
        let record = user(&uuid::Uuid::new_v4().to_string());
        store::create_from(&store, USERS, &record.phone, &record).await.unwrap();

        let owner = load_owner(&store, &claims_for(&record)).await.unwrap();
        assert_eq!(owner.id, record.id);

        let stranger = user(&uuid::Uuid::new_v4().to_string());
        let result = load_owner(&store, &claims_for(&stranger)).await;
        assert!(matches!(result, Err(AppError::Storage(StorageError::NotFound(_)))));
    }
}
