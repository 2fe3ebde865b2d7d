use actix_web::{middleware, web, App, HttpServer};
use anyhow::Context;
use gemini_extract::config::{ApiKey, Settings};
use gemini_extract::gemini::GeminiClient;
use gemini_extract::server::{self, AppState};
use gemini_extract::util::{get_config_arg, init_tracing, load_dotenv};
use std::process;
use std::sync::Arc;
use tracing::{error, info};

const USAGE: &str = "usage: ./gemini-extract [config file]";

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();
    init_tracing();

    let config_file = get_config_arg(USAGE);
    let settings = Settings::load(config_file.as_deref())?;

    // Nothing may reach the network without a key
    let api_key = match ApiKey::from_env() {
        Ok(key) => key,
        Err(e) => {
            error!("{e}");
            eprintln!("{e}");
            process::exit(1);
        }
    };

    let client = GeminiClient::new(&settings.model, api_key).context("building model client")?;
    info!("using model endpoint {}", client.url());

    let bind = (settings.server.host.clone(), settings.server.port);
    let state = web::Data::new(AppState {
        settings,
        client: Arc::new(client),
    });

    info!("serving on http://{}:{}", bind.0, bind.1);
    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .configure(server::configure_analyze(state.clone()))
    })
    .bind(bind)?
    .run()
    .await?;

    Ok(())
}
