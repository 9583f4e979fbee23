use std::fmt;

use anyhow::{Context, Result};
use pylearn_server::{
    config::{self, Config},
    routes, seed,
    state::AppState,
};
use services::{AppServices, Clock};
use storage::repository::Storage;
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    UnknownCommand(String),
    InvalidPort { raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::UnknownCommand(cmd) => write!(f, "unknown subcommand: {cmd}"),
            ArgsError::InvalidPort { raw } => write!(f, "invalid --port value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  pylearn-server serve [--db <sqlite_url>] [--host <host>] [--port <port>]");
    eprintln!("  pylearn-server seed  [--db <sqlite_url>] [--admin-email <email>] [--admin-password <password>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite://pylearn.sqlite3");
    eprintln!("  --host 127.0.0.1 --port 5000");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  PYLEARN_DB_URL, PYLEARN_DB_MAX_CONNECTIONS, PYLEARN_HOST, PYLEARN_PORT,");
    eprintln!("  PYLEARN_SESSION_TTL_HOURS, PYLEARN_ADMIN_EMAIL, PYLEARN_ADMIN_PASSWORD, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Serve,
    Seed,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "serve" => Some(Self::Serve),
            "seed" => Some(Self::Seed),
            _ => None,
        }
    }
}

/// Command-line overrides applied on top of the environment.
struct Args {
    config: Config,
    seed: seed::SeedOptions,
}

impl Args {
    fn parse(
        cmd: Command,
        mut config: Config,
        args: &mut impl Iterator<Item = String>,
    ) -> Result<Self, ArgsError> {
        let mut seed = seed::SeedOptions::default();
        if let Ok(email) = std::env::var("PYLEARN_ADMIN_EMAIL") {
            seed.admin_email = email;
        }
        if let Ok(password) = std::env::var("PYLEARN_ADMIN_PASSWORD") {
            seed.admin_password = password;
        }

        while let Some(arg) = args.next() {
            match (cmd, arg.as_str()) {
                (_, "--db") => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    config.database.url = config::normalize_sqlite_url(&value);
                }
                (Command::Serve, "--host") => {
                    config.server.host = require_value(args, "--host")?;
                }
                (Command::Serve, "--port") => {
                    let value = require_value(args, "--port")?;
                    config.server.port = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidPort { raw: value.clone() })?;
                }
                (Command::Seed, "--admin-email") => {
                    seed.admin_email = require_value(args, "--admin-email")?;
                }
                (Command::Seed, "--admin-password") => {
                    seed.admin_password = require_value(args, "--admin-password")?;
                }
                (_, "--help" | "-h") => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self { config, seed })
    }
}

fn prepare_sqlite_dir(db_url: &str) -> Result<()> {
    if let Some(parent) = config::sqlite_file_path(db_url)
        .as_deref()
        .and_then(std::path::Path::parent)
        .filter(|p| !p.as_os_str().is_empty())
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    Ok(())
}

async fn serve(config: Config) -> Result<()> {
    let services = AppServices::new_sqlite(
        &config.database.url,
        config.database.max_connections,
        Clock::default(),
        config.session_ttl(),
    )
    .await
    .context("Failed to open the database")?;

    let app = routes::create_router(AppState::new(services)).layer(
        ServiceBuilder::new()
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                    .on_response(DefaultOnResponse::new().level(Level::INFO)),
            )
            .layer(CorsLayer::permissive()),
    );

    let addr = config.server_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    tracing::info!("Server listening on http://{}", addr);
    tracing::info!("Health check available at http://{}/health", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

async fn run_seed(config: Config, options: seed::SeedOptions) -> Result<()> {
    let storage = Storage::sqlite(&config.database.url, config.database.max_connections)
        .await
        .context("Failed to open the database")?;
    let report = seed::run(&storage, &options).await.context("Seeding failed")?;
    println!(
        "seed: admin created: {}, modules: {}, lessons: {}, questions: {}, mcqs: {}",
        report.admin_created, report.modules, report.lessons, report.questions, report.mcqs
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let mut argv = std::env::args().skip(1).peekable();
    let first = argv.peek().cloned();
    let cmd = match first.as_deref() {
        None => Command::Serve,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(flag) if flag.starts_with("--") => Command::Serve,
        Some(name) => {
            let cmd = Command::from_arg(name).ok_or_else(|| {
                print_usage();
                ArgsError::UnknownCommand(name.to_string())
            })?;
            argv.next();
            cmd
        }
    };

    let config = Config::from_env()?;
    let args = Args::parse(cmd, config, &mut argv).inspect_err(|_| print_usage())?;
    prepare_sqlite_dir(&args.config.database.url)?;

    tracing::info!(
        command = ?cmd,
        db = %args.config.database.url,
        "Starting PyLearn"
    );

    match cmd {
        Command::Serve => serve(args.config).await,
        Command::Seed => run_seed(args.config, args.seed).await,
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "pylearn_server=debug,services=debug,storage=info,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
