use hotel_dialer::config::Config;
use hotel_dialer::types::AppState;

use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::prelude::*;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let subscriber = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_file(true)
                .with_line_number(true),
        )
        .with(tracing_subscriber::filter::Targets::new().with_targets([
            ("hyper", tracing_subscriber::filter::LevelFilter::OFF),
            ("hotel_dialer", tracing_subscriber::filter::LevelFilter::DEBUG),
        ]));
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("failed to install tracing subscriber: {e}");
    }

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error=%e, "invalid configuration");
            std::process::exit(1);
        }
    };
    let addr: SocketAddr = match config.bind_addr.parse() {
        Ok(addr) => addr,
        Err(e) => {
            error!(error=%e, bind_addr=%config.bind_addr, "invalid bind address");
            std::process::exit(1);
        }
    };
    if config.telephony.is_none() {
        info!("Twilio credentials not set, outbound calls are disabled");
    }

    let http_client = reqwest::Client::new();
    let app_state = Arc::new(AppState::from_config(&config, http_client));
    let app = hotel_dialer::app(app_state);

    info!(%addr, "listening");
    if let Err(e) = axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await
    {
        error!(error=%e, "server error");
    }
}
