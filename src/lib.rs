use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{App, HttpServer, http::header, web};

use crate::models::config::ServerConfig;
use crate::services::upload::UploadService;

pub mod client;
pub mod domain;
pub mod dto;
pub mod forms;
pub mod models;
pub mod routes;
pub mod services;
pub mod signing;

/// Build the CORS policy for the configured browser origins.
fn cors(allowed_origins: &[String]) -> Cors {
    allowed_origins
        .iter()
        .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
        .allowed_methods(vec!["POST"])
        .allowed_headers(vec![header::CONTENT_TYPE, header::ACCEPT])
        .max_age(3600)
}

/// Start the authorization service and run until shutdown.
pub async fn run(server_config: ServerConfig) -> std::io::Result<()> {
    let upload_service = web::Data::new(UploadService::from_config(
        &server_config,
        reqwest::Client::new(),
    ));
    let allowed_origins = server_config.allowed_origins.clone();
    let bind_address = (server_config.address.clone(), server_config.port);

    log::info!(
        "Starting upload authorization service on {}:{}",
        bind_address.0,
        bind_address.1
    );

    HttpServer::new(move || {
        App::new()
            .wrap(cors(&allowed_origins))
            .wrap(Logger::default())
            .app_data(upload_service.clone())
            .app_data(routes::json_config())
            .service(routes::api::create_upload)
    })
    .bind(bind_address)?
    .run()
    .await
}
