//! Entrypoint for the text relay front end

use actix_web::{middleware, web, App, HttpServer};
use anyhow::Context;
use gemini_extract::config::{ApiKey, Settings};
use gemini_extract::relay::RelayClient;
use gemini_extract::server::{self, RelayState};
use gemini_extract::util::{get_config_arg, init_tracing, load_dotenv};
use std::process;
use std::sync::Arc;
use tracing::{error, info};

const USAGE: &str = "usage: ./relay [config file]";

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();
    init_tracing();

    let config_file = get_config_arg(USAGE);
    let settings = Settings::load(config_file.as_deref())?;

    let api_key = match ApiKey::from_env() {
        Ok(key) => key,
        Err(e) => {
            error!("{e}");
            eprintln!("{e}");
            process::exit(1);
        }
    };

    let client = RelayClient::new(&settings.relay, api_key).context("building relay client")?;
    info!("relaying to {client:?}");

    let limit = settings.server.max_payload_bytes;
    let state = web::Data::new(RelayState {
        client: Arc::new(client),
    });

    let host = settings.server.host.clone();
    let port = settings.relay.port;
    info!("serving on http://{host}:{port}");
    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .configure(server::configure_relay(state.clone(), limit))
    })
    .bind((host, port))?
    .run()
    .await?;

    Ok(())
}
