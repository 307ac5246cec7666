use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use echo_journal::error::{EchoError, Result};
use echo_journal::services::daemon_client::DaemonClient;

#[derive(Parser, Debug)]
#[command(name = "echo-journal")]
#[command(about = "Echo journaling CLI")]
struct Cli {
    #[arg(long, default_value = "http://127.0.0.1:7878")]
    daemon: String,

    #[arg(long, env = "ECHO_TOKEN", default_value = "")]
    token: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Capture a moment: a text note, link, place, or image.
    Capture {
        #[arg(long, default_value = "text")]
        kind: String,

        #[arg(long)]
        content: String,

        #[arg(long)]
        image: Option<PathBuf>,
    },
    /// Newest-first fragments, optionally for one day.
    Timeline {
        #[arg(long, default_value_t = 0)]
        skip: i64,

        #[arg(long, default_value_t = 10)]
        take: i64,

        #[arg(long)]
        date: Option<String>,
    },
    /// Page through compiled daily memories.
    Echoes {
        #[arg(long)]
        cursor: Option<i32>,
    },
    /// Generate (or refresh) today's memory now.
    Today,
    /// Look up one day's memory by date (YYYY-MM-DD).
    Memory { date: String },
    /// Show the signed-in user.
    Me,
    /// Delete the account and everything it owns.
    DeleteAccount,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let client = DaemonClient::new(cli.daemon.clone(), cli.token.clone())?;

    let value = match cli.command {
        Commands::Capture {
            kind,
            content,
            image,
        } => {
            let mut form = reqwest::multipart::Form::new()
                .text("type", kind)
                .text("content", content);
            if let Some(path) = image {
                let bytes =
                    std::fs::read(&path).map_err(|e| EchoError::Runtime(e.to_string()))?;
                let filename = path
                    .file_name()
                    .map(|name| name.to_string_lossy().to_string())
                    .unwrap_or_else(|| "capture".to_string());
                let part = reqwest::multipart::Part::bytes(bytes).file_name(filename);
                form = form.part("image", part);
            }
            client.post_multipart("/fragments", form).await?
        }
        Commands::Timeline { skip, take, date } => {
            let mut query = vec![("skip", skip.to_string()), ("take", take.to_string())];
            if let Some(date) = date {
                query.push(("date", date));
            }
            client.get_json("/fragments/timeline", &query).await?
        }
        Commands::Echoes { cursor } => {
            let query = match cursor {
                Some(cursor) => vec![("cursor", cursor.to_string())],
                None => Vec::new(),
            };
            client.get_json("/echoes", &query).await?
        }
        Commands::Today => client.post_empty("/echoes/today").await?,
        Commands::Memory { date } => client.get_json(&format!("/echoes/{date}"), &[]).await?,
        Commands::Me => client.get_json("/user/me", &[]).await?,
        Commands::DeleteAccount => client.delete("/user/me").await?,
    };

    let rendered =
        serde_json::to_string_pretty(&value).map_err(|e| EchoError::Serialization(e.to_string()))?;
    println!("{rendered}");
    Ok(())
}
