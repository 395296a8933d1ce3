use std::env;

use clinobs_server::ServerBuilder;
use clinobs_server::config::loader::{DEFAULT_CONFIG_PATH, load_config};

#[derive(Debug, Clone, Copy)]
enum ConfigSource {
    Flag,
    Env,
    Default,
}

impl ConfigSource {
    fn describe(self) -> &'static str {
        match self {
            Self::Flag => "--config flag",
            Self::Env => "CLINOBS_CONFIG",
            Self::Default => "built-in default path",
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine
    if let Err(e) = dotenvy::dotenv()
        && !matches!(e, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
    {
        eprintln!("clinobs: ignoring unreadable .env: {e}");
    }

    clinobs_server::observability::init_tracing();

    let (config_path, source) = config_path();
    let cfg = load_config(Some(&config_path)).unwrap_or_else(|err| {
        eprintln!("clinobs: invalid configuration in {config_path}: {err}");
        std::process::exit(2);
    });
    tracing::info!(path = %config_path, source = source.describe(), "configuration loaded");
    clinobs_server::observability::apply_logging_level(&cfg.logging.level);

    let server = ServerBuilder::new().with_config(cfg).build().await?;
    server.run().await
}

/// `--config <path>` beats `CLINOBS_CONFIG`, which beats `clinobs.toml`.
fn config_path() -> (String, ConfigSource) {
    let args: Vec<String> = env::args().skip(1).collect();
    if let Some(path) = args
        .windows(2)
        .find(|pair| pair[0] == "--config")
        .map(|pair| pair[1].clone())
    {
        return (path, ConfigSource::Flag);
    }

    if let Some(path) = env::var("CLINOBS_CONFIG").ok().filter(|p| !p.is_empty()) {
        return (path, ConfigSource::Env);
    }

    (DEFAULT_CONFIG_PATH.to_string(), ConfigSource::Default)
}
