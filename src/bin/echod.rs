use clap::Parser;
use tracing_subscriber::EnvFilter;

use echo_journal::config::{Config, DatabaseConfig, GeminiConfig};
use echo_journal::daemon;
use echo_journal::error::Result;

#[derive(Parser, Debug)]
#[command(name = "echod")]
#[command(about = "Echo journaling daemon")]
struct Cli {
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    #[arg(long, default_value_t = 7878)]
    port: u16,

    #[arg(long, default_value = "./data/echo-journal.db")]
    db: String,

    #[arg(long)]
    config: Option<String>,

    #[arg(long, env = "GEMINI_API_KEY")]
    gemini_api_key: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,echo_journal=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if config.database.is_none() {
        config.database = Some(DatabaseConfig {
            sqlite_path: Some(cli.db.clone()),
        });
    }
    if let Some(api_key) = cli.gemini_api_key {
        let gemini = config.gemini.get_or_insert(GeminiConfig {
            api_key: None,
            base_url: None,
            models: None,
        });
        if gemini.api_key.is_none() {
            gemini.api_key = Some(api_key);
        }
    }

    daemon::run(&cli.host, cli.port, config).await
}
