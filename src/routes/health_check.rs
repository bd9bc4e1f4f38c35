use actix_web::HttpResponse;

pub async fn ping() -> HttpResponse {
    tracing::debug!("Ping endpoint called");
    HttpResponse::Ok().finish()
}
