use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use syncro_session::config::ConfigError;
use syncro_session::state::{self, SessionProvider};
use syncro_session::{ApiClient, ApiError, AuthFailure, FileStore, HttpAuthApi, SessionConfig, StorageError};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("session storage failed: {0}")]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("{0}")]
    Auth(#[from] AuthFailure),
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Parser, Debug)]
#[command(name = "syncro-session", about = "Sign in to the Syncro API and inspect the local session")]
struct Cli {
    /// Overrides `SYNCRO_API_BASE_URL`.
    #[arg(long)]
    base_url: Option<String>,

    /// Overrides `SYNCRO_SESSION_FILE`.
    #[arg(long)]
    session_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Login {
        #[arg(long)]
        username: String,
        #[arg(long, env = "SYNCRO_PASSWORD", hide_env_values = true)]
        password: String,
    },
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "SYNCRO_PASSWORD", hide_env_values = true)]
        password: String,
    },
    Logout,
    Whoami,
    /// Exit 0 if the signed-in user has `role`, 1 otherwise.
    HasRole {
        role: String,
    },
    /// Authenticated GET against the API, printing the response body.
    Get {
        path: String,
    },
}

type Provider = SessionProvider<FileStore, HttpAuthApi>;

#[tokio::main]
async fn main() -> Result<ExitCode, CliError> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = SessionConfig::from_env()?;
    if let Some(url) = cli.base_url.as_deref() {
        config = config.with_base_url(url)?;
    }
    if let Some(path) = cli.session_file {
        config.session_file = path;
    }

    let store = FileStore::open(&config.session_file)?;
    let (publisher, handle) = state::channel();
    let client = ApiClient::new(&config, handle)?;
    let provider = SessionProvider::new(publisher, store, HttpAuthApi::new(client.clone()));
    provider.initialize();

    match cli.command {
        Command::Login { username, password } => {
            let user = provider.login(&username, &password).await?;
            println!("signed in as {} ({})", user.username, user.role);
            Ok(ExitCode::SUCCESS)
        }
        Command::Register { username, email, password } => {
            let user = provider.register(&username, &email, &password).await?;
            println!("registered {} ({})", user.username, user.role);
            Ok(ExitCode::SUCCESS)
        }
        Command::Logout => {
            provider.logout();
            println!("signed out");
            Ok(ExitCode::SUCCESS)
        }
        Command::Whoami => Ok(whoami(&provider)),
        Command::HasRole { role } => Ok(if provider.has_role(&role) { ExitCode::SUCCESS } else { ExitCode::FAILURE }),
        Command::Get { path } => run_get(&client, &path).await,
    }
}

fn whoami(provider: &Provider) -> ExitCode {
    match provider.user() {
        Some(user) if provider.is_authenticated() => {
            println!("{} ({})", user.username, user.role);
            ExitCode::SUCCESS
        }
        _ => {
            println!("not signed in");
            ExitCode::FAILURE
        }
    }
}

async fn run_get(client: &ApiClient, path: &str) -> Result<ExitCode, CliError> {
    if !client.session().is_authenticated() {
        tracing::warn!("no session; sending request without credentials");
    }
    let response = client.get(path).send().await?;
    let status = response.status();
    let body = response.text().await?;
    println!("{body}");
    if status.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        tracing::warn!(status = status.as_u16(), "request failed");
        Ok(ExitCode::FAILURE)
    }
}
