pub mod analysis;
pub mod config;
pub mod gemini;
pub mod images;
pub mod page;
pub mod relay;
pub mod server;

/// Process setup shared by both binaries
pub mod util {
    use tracing_subscriber::EnvFilter;

    /// Default log filter when `RUST_LOG` is unset
    pub const RUST_LOG: &str = "info,actix_web=info";

    const DOTENV_FILE: &str = ".env";

    /// Load `.env` if there is one. Variables already set win.
    pub fn load_dotenv() {
        match dotenvy::from_filename(DOTENV_FILE) {
            Ok(path) => tracing::debug!("loaded environment from {path:?}"),
            Err(e) if e.not_found() => {}
            Err(e) => eprintln!("warning: could not read {DOTENV_FILE}: {e}"),
        }
    }

    pub fn init_tracing() {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(RUST_LOG));
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    /// The optional config file argument, or `None` when usage should be
    /// printed instead
    pub fn parse_config_arg(
        args: impl IntoIterator<Item = String>,
    ) -> Option<Option<std::path::PathBuf>> {
        let mut args = args.into_iter();
        match (args.next(), args.next()) {
            (None, _) => Some(None),
            (Some(arg), None) if arg != "-h" && arg != "--help" => Some(Some(arg.into())),
            _ => None,
        }
    }

    /// Read the optional config file argument, or print usage and exit
    pub fn get_config_arg(usage: &str) -> Option<std::path::PathBuf> {
        match parse_config_arg(std::env::args().skip(1)) {
            Some(path) => path,
            None => {
                println!("{usage}");
                std::process::exit(1);
            }
        }
    }

}
