#![deny(missing_docs)]
//! Toolyard server executable.
//!
//! Hosts the public directory, submission and advertising flows, payment
//! webhooks and the admin back-office.

mod billing;
mod config;
mod crypto;
mod db;
mod errors;
mod models;
mod openapi;
mod routes;
mod schema;
mod store;

#[cfg(not(test))]
use actix_cors::Cors;
#[cfg(not(test))]
use actix_web::{App, HttpServer, http::header, web};
#[cfg(not(test))]
use dotenvy::dotenv;

#[cfg(not(test))]
use crate::billing::Payments;
#[cfg(not(test))]
use crate::config::{AuthConfig, ServerConfig, SiteConfig};
#[cfg(not(test))]
use crate::crypto::TokenCipher;
#[cfg(not(test))]
use crate::db::init_pool;
#[cfg(not(test))]
use crate::routes::AppState;

#[cfg(not(test))]
fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let startup_error = |message: String| {
        log::error!("{message}");
        std::io::Error::other(message)
    };
    let server = ServerConfig::from_env().map_err(startup_error)?;
    let pool = init_pool().map_err(startup_error)?;

    // Blocking HTTP clients must be built before the async runtime starts.
    let payments = Payments::from_env();
    let token_cipher = TokenCipher::from_env().map_err(startup_error)?;

    let state = web::Data::new(AppState {
        pool,
        site: SiteConfig::from_env(),
        auth: AuthConfig::from_env(),
        token_cipher,
        payments,
        pricing: toolyard_core::AdPricing::default(),
        plans: toolyard_core::default_plans(),
    });

    let ServerConfig {
        host,
        port,
        allowed_origins,
    } = server;
    log::info!("listening on {host}:{port}");

    actix_web::rt::System::new().block_on(async move {
        HttpServer::new(move || {
            let mut cors = Cors::default()
                .allowed_methods(vec!["GET", "POST", "PUT", "OPTIONS"])
                .allowed_headers(vec![header::AUTHORIZATION, header::CONTENT_TYPE])
                .max_age(3600);
            for origin in &allowed_origins {
                cors = cors.allowed_origin(origin);
            }
            App::new()
                .wrap(actix_web::middleware::Logger::default())
                .wrap(cors)
                .app_data(state.clone())
                .configure(routes::configure)
        })
        .bind((host, port))?
        .run()
        .await
    })
}

#[cfg(test)]
fn main() {}
