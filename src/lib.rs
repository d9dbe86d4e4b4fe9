pub mod application;
pub mod config;
pub mod domain;
pub mod errors;
pub mod handlers;
pub mod infrastructure;
pub mod state;

use actix_web::{middleware::Logger, web, App, HttpServer};

pub use config::AppConfig;
pub use state::AppState;

/// Registers every route. Shared by `build_server` and the integration tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    use handlers::sessions;

    cfg.route("/api-docs/openapi.json", web::get().to(handlers::openapi_json))
        .service(
            web::scope("/sessions")
                .route("", web::post().to(sessions::create_session))
                .route("/{id}", web::put().to(sessions::open_session))
                .route("/{id}", web::get().to(sessions::get_session))
                .route("/{id}", web::delete().to(sessions::close_session))
                .route("/{id}/fields", web::put().to(sessions::update_fields))
                .route(
                    "/{id}/postal-code/lookup",
                    web::post().to(sessions::lookup_postal_code),
                )
                .route("/{id}/products", web::post().to(sessions::add_product))
                .route(
                    "/{id}/products/{handle}",
                    web::patch().to(sessions::update_product),
                )
                .route(
                    "/{id}/products/{handle}",
                    web::delete().to(sessions::remove_product),
                )
                .route("/{id}/attachments", web::post().to(sessions::stage_attachment))
                .route("/{id}/attachments", web::get().to(sessions::list_attachments))
                .route(
                    "/{id}/attachments/{attachment_id}",
                    web::get().to(sessions::download_attachment),
                )
                .route(
                    "/{id}/attachments/{attachment_id}",
                    web::delete().to(sessions::delete_attachment),
                )
                .route("/{id}/save", web::post().to(sessions::save_supplier)),
        );
}

/// Build and return an actix-web `Server` bound to `host:port`.
///
/// The caller is responsible for `.await`-ing (or `tokio::spawn`-ing) the
/// returned server.
pub fn build_server(
    state: web::Data<AppState>,
    host: &str,
    port: u16,
) -> std::io::Result<actix_web::dev::Server> {
    Ok(HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(Logger::default())
            .configure(configure)
    })
    .bind((host.to_string(), port))?
    .run())
}
