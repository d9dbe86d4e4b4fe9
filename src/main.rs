use actix_web::web;
use dotenvy::dotenv;
use supplier_form::{build_server, AppConfig, AppState};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = AppConfig::from_env().expect("invalid configuration");
    let state = AppState::from_config(&config).expect("failed to build application state");

    log::info!(
        "Starting supplier form service at http://{}:{} (postal lookup: {})",
        config.host,
        config.port,
        config.lookup_url
    );

    build_server(web::Data::new(state), &config.host, config.port)?.await
}
