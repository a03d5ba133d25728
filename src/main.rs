use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::bail;
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use archilog::config::{GitHubOAuthConfig, ServerConfig};
use archilog::server::{AppState, create_router};
use archilog::store::{SqliteStore, Store};

#[derive(Parser)]
#[command(name = "archilog")]
#[command(about = "A portfolio and blog backend", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the data directory and database
    Init {
        #[command(flatten)]
        source: ConfigSource,
    },

    /// Start the server
    Serve {
        #[command(flatten)]
        source: ConfigSource,

        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to
        #[arg(long, short)]
        port: Option<u16>,

        /// Public base URL for external access (e.g., "https://blog.example.com").
        /// Used for image URLs. If not set, URLs are derived from request headers.
        #[arg(long)]
        public_base_url: Option<String>,

        /// GitHub REST API base URL
        #[arg(long)]
        github_api_url: Option<String>,

        /// GitHub OAuth app client id
        #[arg(long, env = "ARCHILOG_GITHUB_CLIENT_ID")]
        github_client_id: Option<String>,

        /// GitHub OAuth app client secret
        #[arg(long, env = "ARCHILOG_GITHUB_CLIENT_SECRET", hide_env_values = true)]
        github_client_secret: Option<String>,

        /// OAuth client id that Google ID tokens must be issued to
        #[arg(long, env = "ARCHILOG_GOOGLE_CLIENT_ID")]
        google_client_id: Option<String>,

        /// Session token lifetime in days
        #[arg(long)]
        token_ttl_days: Option<i64>,
    },
}

#[derive(Args)]
struct ConfigSource {
    /// TOML config file; flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Data directory for the database and uploaded images
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

impl ConfigSource {
    fn load(&self) -> anyhow::Result<ServerConfig> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::from_file(path)?,
            None => ServerConfig::default(),
        };
        if let Some(data_dir) = &self.data_dir {
            config.data_dir = data_dir.clone();
        }
        Ok(config)
    }
}

fn run_init(config: &ServerConfig) -> anyhow::Result<()> {
    fs::create_dir_all(&config.data_dir)?;

    let db_path = config.db_path();
    if db_path.exists() && SqliteStore::new(&db_path)?.is_initialized()? {
        bail!(
            "Already initialized. Database exists at: {}",
            db_path.display()
        );
    }

    let store = SqliteStore::new(&db_path)?;
    store.initialize()?;
    fs::create_dir_all(config.images_dir())?;

    println!("Initialized archilog in {}", config.data_dir.display());
    Ok(())
}

fn open_store(config: &ServerConfig) -> anyhow::Result<SqliteStore> {
    let db_path = config.db_path();
    if !db_path.exists() {
        bail!("Not initialized. Run 'archilog init' first to create the database.");
    }

    let store = SqliteStore::new(&db_path)?;
    if !store.is_initialized()? {
        bail!("Not initialized. Run 'archilog init' first to create the database.");
    }
    Ok(store)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("archilog=info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { source } => {
            run_init(&source.load()?)?;
        }
        Commands::Serve {
            source,
            host,
            port,
            public_base_url,
            github_api_url,
            github_client_id,
            github_client_secret,
            google_client_id,
            token_ttl_days,
        } => {
            let mut config = source.load()?;
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            if public_base_url.is_some() {
                config.public_base_url = public_base_url;
            }
            if let Some(url) = github_api_url {
                config.github_api_url = url;
            }
            if google_client_id.is_some() {
                config.google_client_id = google_client_id;
            }
            if token_ttl_days.is_some() {
                config.token_ttl_days = token_ttl_days;
            }
            config.token_ttl()?;
            match (github_client_id, github_client_secret) {
                (Some(client_id), Some(client_secret)) => {
                    config.github_oauth = Some(GitHubOAuthConfig {
                        client_id,
                        client_secret,
                    });
                }
                (None, None) => {}
                _ => bail!("--github-client-id and --github-client-secret must be set together"),
            }

            let store = open_store(&config)?;
            let state = Arc::new(AppState::new(Arc::new(store), &config)?);

            if config.github_oauth.is_none() {
                info!("GitHub OAuth not configured; /auth/github/callback is disabled");
            }
            if config.google_client_id.is_none() {
                info!("Google client id not configured; /auth/oauth/google is disabled");
            }

            let app = create_router(state);
            let addr = config.socket_addr()?;

            info!("Starting server on {}", addr);

            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}
