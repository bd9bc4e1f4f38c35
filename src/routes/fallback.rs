/// Fallback responses for paths and methods no route claims.

use actix_web::HttpResponse;
use serde_json::json;

pub async fn not_found() -> HttpResponse {
    HttpResponse::NotFound().json(json!({ "message": "resource not found" }))
}

pub async fn method_not_allowed() -> HttpResponse {
    HttpResponse::MethodNotAllowed().json(json!({ "message": "Method not allowed" }))
}
