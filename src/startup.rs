use actix_web::dev::Server;
use actix_web::{middleware::Logger, web, App, HttpServer};
use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::auth::{CredentialHasher, TokenAuthority};
use crate::error::{AppError, ValidationError};
use crate::logger::RequestLogger;
use crate::middleware::BearerAuth;
use crate::routes::{
    create_check, create_token, create_user, delete_check, delete_user, extend_token, get_checks,
    get_user, method_not_allowed, not_found, ping, revoke_token, update_check, update_user,
};
use crate::store::DocumentStore;

pub fn run(
    listener: TcpListener,
    store: Arc<dyn DocumentStore>,
    authority: TokenAuthority,
    hasher: CredentialHasher,
) -> Result<Server, std::io::Error> {
    let store: web::Data<dyn DocumentStore> = web::Data::from(store);
    let authority_data = web::Data::new(authority.clone());
    let hasher = web::Data::new(hasher);

    let server = HttpServer::new(move || {
        let bearer = || BearerAuth::new(authority.clone());

        App::new()
            // Global middleware
            .wrap(RequestLogger)
            .wrap(Logger::default())

            // Shared state
            .app_data(store.clone())
            .app_data(authority_data.clone())
            .app_data(hasher.clone())
            .app_data(web::JsonConfig::default().error_handler(|err, _req| {
                AppError::Validation(ValidationError::MalformedBody(err.to_string())).into()
            }))
            .app_data(web::QueryConfig::default().error_handler(|err, _req| {
                AppError::Validation(ValidationError::MalformedBody(err.to_string())).into()
            }))

            .route("/ping", web::get().to(ping))
            .service(
                web::resource("/users")
                    .route(web::post().to(create_user))
                    .route(web::get().to(get_user).wrap(bearer()))
                    .route(web::patch().to(update_user).wrap(bearer()))
                    .route(web::delete().to(delete_user).wrap(bearer()))
                    .default_service(web::to(method_not_allowed)),
            )
            .service(
                web::resource("/tokens")
                    .route(web::post().to(create_token))
                    .route(web::put().to(extend_token))
                    .route(web::delete().to(revoke_token))
                    .default_service(web::to(method_not_allowed)),
            )
            .service(
                web::resource("/checks")
                    .route(web::post().to(create_check).wrap(bearer()))
                    .route(web::get().to(get_checks).wrap(bearer()))
                    .route(web::patch().to(update_check).wrap(bearer()))
                    .route(web::delete().to(delete_check).wrap(bearer()))
                    .default_service(web::to(method_not_allowed)),
            )
            .default_service(web::to(not_found))
    })
    .listen(listener)?
    .run();

    Ok(server)
}

/// Periodically compact the revocation ledger. Failures are logged and the
/// next tick tries again.
pub fn spawn_revocation_purge(authority: TokenAuthority, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            match authority.purge_revocations().await {
                Ok(purged) => tracing::debug!(purged, "Revocation purge finished"),
                Err(e) => tracing::warn!(error = %e, "Revocation purge failed"),
            }
        }
    })
}
