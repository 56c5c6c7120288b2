// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Buddy Log command-line client
//!
//! Drives the app screens from a terminal against the hosted backend, or
//! against an in-memory backend with `--offline`.

use anyhow::Context;
use buddy_log::{
    backend::{Backend, MemoryBackend, SupabaseBackend},
    config::Config,
    models::{Location, RecordId},
    screens::{map, Notices},
    services::{
        FixedLocationProvider, LocationProvider, SignUpOutcome, UnavailableLocationProvider,
    },
    session_store::SessionStore,
    time_utils::format_utc_rfc3339,
    App,
};
use clap::{Args, Parser, Subcommand};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};
use uuid::Uuid;

/// Account used for `--offline` runs, which start from an empty backend.
const OFFLINE_EMAIL: &str = "offline@buddy.local";
const OFFLINE_PASSWORD: &str = "offline-password";

#[derive(Parser, Debug)]
#[command(name = "buddy-log", about = "Share geotagged log entries with friends")]
struct Cli {
    /// Use an in-memory backend that lives for this invocation only
    #[arg(long, global = true)]
    offline: bool,

    /// Emit logs as JSON on stderr
    #[arg(long, global = true)]
    json_logs: bool,

    /// Latitude reported by the location provider
    #[arg(long, global = true, requires = "lon", allow_hyphen_values = true)]
    lat: Option<f64>,

    /// Longitude reported by the location provider
    #[arg(long, global = true, requires = "lat", allow_hyphen_values = true)]
    lon: Option<f64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create an account
    Signup(Credentials),
    /// Sign in and remember the session
    Login(Credentials),
    /// Sign out and forget the session
    Logout,
    /// Show the signed-in user
    Whoami,
    Logs(LogsCommand),
    /// Show located entries around you
    Map {
        /// Print markers as GeoJSON instead
        #[arg(long)]
        geojson: bool,
        /// Zoom to fit every marker instead of centring on you
        #[arg(long)]
        fit: bool,
    },
    Friends(FriendsCommand),
    /// Print the current position
    Locate,
}

#[derive(Args, Debug)]
struct Credentials {
    #[arg(long, env = "BUDDY_EMAIL")]
    email: String,
    #[arg(long, env = "BUDDY_PASSWORD", hide_env_values = true)]
    password: String,
}

#[derive(Args, Debug)]
struct LogsCommand {
    #[command(subcommand)]
    command: LogsSubcommand,
}

#[derive(Subcommand, Debug)]
enum LogsSubcommand {
    /// List visible entries
    List,
    /// Write a new entry
    Create {
        notes: String,
        /// Do not tag the entry with the current position
        #[arg(long)]
        no_location: bool,
    },
    /// List entries, then follow new ones until interrupted
    Watch,
}

#[derive(Args, Debug)]
struct FriendsCommand {
    #[command(subcommand)]
    command: FriendsSubcommand,
}

#[derive(Subcommand, Debug)]
enum FriendsSubcommand {
    /// Send a friendship request
    Send { user_id: String },
    /// Accept a pending request by its ID
    Accept { request_id: String },
    /// Show friends and requests
    List,
    /// Show requests waiting for you
    Pending,
    /// Show your relation with a user
    Status { user_id: Uuid },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.json_logs);

    match run_cli(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run_cli(cli: Cli) -> anyhow::Result<()> {
    if cli.offline {
        let config = Config::from_env().unwrap_or_else(|e| {
            tracing::debug!(error = %e, "No backend configuration, using defaults");
            Config::test_default()
        });
        let provider = location_provider(&cli, &config)?;
        let app = App::new(config, MemoryBackend::new(), provider, None);
        if !matches!(cli.command, Command::Signup(_) | Command::Login(_)) {
            app.auth
                .sign_up(OFFLINE_EMAIL, OFFLINE_PASSWORD)
                .await
                .context("Failed to create offline account")?;
        }
        return run(app, cli.command).await;
    }

    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::debug!(url = %config.supabase_url, "Using hosted backend");
    let provider = location_provider(&cli, &config)?;
    let store = SessionStore::new(config.session_path.clone());
    let backend = SupabaseBackend::new(config.clone());
    let app = App::new(config, backend, provider, Some(store));
    app.auth.restore().await;
    run(app, cli.command).await
}

fn location_provider(cli: &Cli, config: &Config) -> anyhow::Result<Arc<dyn LocationProvider>> {
    if let (Some(lat), Some(lon)) = (cli.lat, cli.lon) {
        let location = Location::new(lat, lon)
            .with_context(|| format!("Invalid coordinates {}, {}", lat, lon))?;
        return Ok(Arc::new(FixedLocationProvider::new(location)));
    }
    let provider: Arc<dyn LocationProvider> = match config.fixed_location {
        Some(location) => Arc::new(FixedLocationProvider::new(location)),
        None => Arc::new(UnavailableLocationProvider),
    };
    Ok(provider)
}

async fn run<B: Backend>(app: App<B>, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Signup(creds) => {
            let mut screen = app.signup_screen();
            screen.email = creds.email;
            screen.password = creds.password;
            let outcome = screen.submit().await;
            print_notices(&mut screen.notices);
            match outcome {
                Some(SignUpOutcome::SignedIn(user)) => println!("Signed up as {}", user.id),
                Some(SignUpOutcome::ConfirmationRequired { email }) => {
                    println!("Confirmation sent to {}", email)
                }
                None => anyhow::bail!("Sign-up failed"),
            }
        }
        Command::Login(creds) => {
            let mut screen = app.login_screen();
            screen.email = creds.email;
            screen.password = creds.password;
            let user = screen.submit().await;
            print_notices(&mut screen.notices);
            match user {
                Some(user) => println!("Signed in as {}", user.id),
                None => anyhow::bail!("Login failed"),
            }
        }
        Command::Logout => {
            app.auth.sign_out().await;
            println!("Signed out");
        }
        Command::Whoami => match app.auth.current_user() {
            Some(user) => {
                println!("{}", user.id);
                if let Some(email) = user.email {
                    println!("{}", email);
                }
            }
            None => println!("Not signed in"),
        },
        Command::Logs(logs) => run_logs(&app, logs.command).await?,
        Command::Map { geojson, fit } => {
            let mut screen = app.map_screen();
            screen.mount().await;
            print_notices(&mut screen.notices);
            if geojson {
                println!("{}", map::to_geojson(screen.markers()));
            } else {
                if fit {
                    screen.fit_to_markers();
                }
                print!("{}", screen);
            }
        }
        Command::Friends(friends) => run_friends(&app, friends.command).await?,
        Command::Locate => {
            let location = app
                .location
                .current_position()
                .await
                .map_err(|e| anyhow::anyhow!("{}: {}", e.title(), e.user_message()))?;
            println!("{:.6}, {:.6}", location.latitude, location.longitude);
        }
    }
    Ok(())
}

async fn run_logs<B: Backend>(app: &App<B>, command: LogsSubcommand) -> anyhow::Result<()> {
    match command {
        LogsSubcommand::List => {
            let mut screen = app.log_list_screen();
            screen.refresh().await;
            print_notices(&mut screen.notices);
            print!("{}", screen);
        }
        LogsSubcommand::Create { notes, no_location } => {
            let mut screen = app.create_log_screen();
            screen.notes = notes;
            screen.attach_location = !no_location;
            let created = screen.submit().await;
            print_notices(&mut screen.notices);
            match created {
                Some(entry) => println!("{}", entry.id),
                None => anyhow::bail!("Log entry was not created"),
            }
        }
        LogsSubcommand::Watch => {
            let mut screen = app.log_list_screen();
            screen.mount().await;
            print_notices(&mut screen.notices);
            print!("{}", screen);
            if !screen.is_live() {
                anyhow::bail!("Live updates are unavailable");
            }

            loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => break,
                    update = screen.next_update() => match update {
                        Some(true) => {
                            if let Some(entry) = screen.state().data().and_then(|f| f.entries().first()) {
                                println!(
                                    "+ {} ({}) [{}]",
                                    entry.notes,
                                    format_utc_rfc3339(entry.created_at),
                                    entry.id
                                );
                            }
                        }
                        Some(false) => {}
                        None => break,
                    }
                }
            }
            screen.unmount();
        }
    }
    Ok(())
}

async fn run_friends<B: Backend>(app: &App<B>, command: FriendsSubcommand) -> anyhow::Result<()> {
    let mut screen = app.friends_screen();
    match command {
        FriendsSubcommand::Send { user_id } => {
            screen.target_input = user_id;
            let sent = screen.send_request().await;
            print_notices(&mut screen.notices);
            if !sent {
                anyhow::bail!("Friendship request was not sent");
            }
        }
        FriendsSubcommand::Accept { request_id } => {
            let accepted = screen.accept(&RecordId::new(request_id)).await;
            print_notices(&mut screen.notices);
            if !accepted {
                anyhow::bail!("Friendship request was not accepted");
            }
        }
        FriendsSubcommand::List => {
            screen.refresh().await;
            print!("{}", screen);
        }
        FriendsSubcommand::Pending => {
            let pending = app
                .friendships
                .pending_requests()
                .await
                .map_err(|e| anyhow::anyhow!(e.user_message()))?;
            if pending.is_empty() {
                println!("No pending requests");
            }
            for request in pending {
                println!("[{}] from {}", request.id, request.user1_id);
            }
        }
        FriendsSubcommand::Status { user_id } => {
            let relation = app
                .friendships
                .relation_with(user_id)
                .await
                .map_err(|e| anyhow::anyhow!(e.user_message()))?;
            println!("{:?}", relation);
        }
    }
    Ok(())
}

fn print_notices(notices: &mut Notices) {
    for notice in notices.drain() {
        println!("{}", notice);
    }
}

/// Initialize logging to stderr, JSON or human-readable.
fn init_logging(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn,buddy_log=info"));

    let format = if json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(false)
            .with_current_span(true)
            .flatten_event(true)
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .boxed()
    };

    tracing_subscriber::registry().with(filter).with(format).init();
}
