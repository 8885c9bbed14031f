use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing_appender::non_blocking::WorkerGuard;

use location_onboarding::api::{HttpBackend, OnboardingBackend};
use location_onboarding::auth::{StaticTokenProvider, TokenProvider};
use location_onboarding::config::ClientConfig;
use location_onboarding::connections::{ConnectionRegistry, Provider};
use location_onboarding::draft::{DraftSynchronizer, FileDraftStore};
use location_onboarding::error::Error;
use location_onboarding::oauth::{
    CallbackRouteState, FlowState, Navigation, OAuthFlowController, callback_routes,
};

#[derive(Parser)]
#[command(name = "location-onboarding", version)]
#[command(about = "Link data providers to a location and inspect onboarding drafts")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show provider connection status for a location
    Status { location_id: String },
    /// Revoke a provider link (succeeds if already unlinked)
    Disconnect {
        location_id: String,
        #[arg(long, default_value = "google_business_profile")]
        provider: Provider,
    },
    /// Link Google Business Profile: consent, pick a listing, save it
    Connect { location_id: String },
    /// Resolve the signed-in user's location
    Me,
    /// Show (or clear) the locally saved wizard draft
    Draft {
        #[arg(long)]
        clear: bool,
    },
}

fn init_tracing() -> Option<WorkerGuard> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    // Interactive prompts stay readable when logs go to a file.
    match std::env::var("ONBOARDING_LOG_DIR") {
        Ok(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "location-onboarding.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Some(guard)
        }
        Err(_) => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
            None
        }
    }
}

/// Wrap a domain error so its user-facing text can be recovered at the top.
fn domain(e: impl Into<Error>) -> anyhow::Error {
    anyhow::Error::new(e.into())
}

struct App {
    config: ClientConfig,
    tokens: Arc<dyn TokenProvider>,
    backend: Arc<dyn OnboardingBackend>,
}

impl App {
    fn from_env() -> anyhow::Result<Self> {
        let config = ClientConfig::from_env().map_err(domain)?;
        let tokens: Arc<dyn TokenProvider> = Arc::new(StaticTokenProvider::from_env());
        let backend = Arc::new(HttpBackend::new(config.clone(), tokens.clone()).map_err(domain)?);
        Ok(Self {
            config,
            tokens,
            backend,
        })
    }

    fn registry(&self) -> ConnectionRegistry {
        ConnectionRegistry::new(self.backend.clone(), self.tokens.clone())
    }
}

async fn status(app: &App, location_id: &str) -> anyhow::Result<()> {
    let set = app.registry().get_status(location_id).await.map_err(domain)?;
    println!("Connections for {}", set.location_id);
    for status in &set.statuses {
        let mut line = format!(
            "  {:<24} {}",
            status.provider.display_name(),
            if status.connected { "connected" } else { "not connected" }
        );
        if let Some(email) = &status.account_email {
            line.push_str(&format!(" ({email})"));
        }
        if status.needs_reconnection {
            line.push_str(" - reconnect required");
        }
        if status.provider.is_required() && !status.connected {
            line.push_str(" [required]");
        }
        println!("{line}");
    }
    Ok(())
}

async fn disconnect(app: &App, location_id: &str, provider: Provider) -> anyhow::Result<()> {
    app.registry()
        .disconnect(location_id, provider)
        .await
        .map_err(domain)?;
    println!("{} disconnected", provider.display_name());
    Ok(())
}

async fn me(app: &App) -> anyhow::Result<()> {
    match app.registry().my_location().await.map_err(domain)? {
        Some(location) => println!("{} {}", location.id, location.business_name),
        None => println!("No location yet. Complete onboarding first."),
    }
    Ok(())
}

async fn draft(app: &App, clear: bool) -> anyhow::Result<()> {
    let store = Arc::new(FileDraftStore::new(&app.config.draft_dir));
    let path = store.path().to_path_buf();
    let sync = DraftSynchronizer::new(store, app.backend.clone());
    if clear {
        sync.clear().await;
        println!("Cleared {}", path.display());
        return Ok(());
    }
    match sync.load().await {
        Some(draft) => println!("{}", serde_json::to_string_pretty(&draft)?),
        None => println!("No saved draft at {}", path.display()),
    }
    Ok(())
}

async fn connect(app: &App, location_id: &str) -> anyhow::Result<()> {
    let controller = Arc::new(OAuthFlowController::new(
        app.backend.clone(),
        app.tokens.clone(),
        app.config.clone(),
    ));

    let nav = controller
        .begin_connect(Some(location_id), Provider::GoogleBusinessProfile)
        .await
        .map_err(domain)?;
    if let Navigation::External(url) = &nav {
        println!("Open this URL to grant access:\n  {url}");
    }

    let (tx, mut rx) = mpsc::channel(1);
    let routes = callback_routes(CallbackRouteState {
        controller: controller.clone(),
        events: Some(tx),
    });
    let addr = format!("127.0.0.1:{}", app.config.callback_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding callback listener on {addr}"))?;
    tracing::info!(addr = %addr, "Callback listener started");
    let server = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, routes).await {
            tracing::error!(error = %e, "Callback listener stopped");
        }
    });
    println!("Waiting for the provider to redirect back to http://{addr}/oauth/google/callback ...");

    let outcome = rx.recv().await.context("callback listener closed")?;
    server.abort();

    match outcome.snapshot.state {
        FlowState::Selecting => {
            if let Some(notice) = &outcome.notice {
                println!("{}", notice.message);
            }
        }
        FlowState::Failed => anyhow::bail!(
            outcome
                .snapshot
                .last_error
                .unwrap_or_else(|| "OAuth failed".to_string())
        ),
        other => anyhow::bail!("unexpected flow state after callback: {other}"),
    }

    let candidates = outcome.snapshot.candidates;
    if candidates.is_empty() {
        controller.cancel().await.map_err(domain)?;
        return Ok(());
    }

    for (i, c) in candidates.iter().enumerate() {
        let address = c.address.as_deref().unwrap_or("no address");
        let account = c.account_name.as_deref().unwrap_or("unnamed account");
        println!("  {}) {} - {} [{}]", i + 1, c.title, address, account);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        println!("Choose a location (1-{}), or q to cancel:", candidates.len());
        let Some(line) = lines.next_line().await? else {
            controller.cancel().await.map_err(domain)?;
            return Ok(());
        };
        let line = line.trim();
        if line.eq_ignore_ascii_case("q") {
            controller.cancel().await.map_err(domain)?;
            println!("Cancelled. Nothing was linked.");
            return Ok(());
        }
        let Some(choice) = line
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| candidates.get(i))
        else {
            println!("'{line}' is not one of the listed locations");
            continue;
        };

        controller.select(&choice.resource_name).await.map_err(domain)?;
        match controller
            .save_selection(Some(location_id), Some(&choice.resource_name))
            .await
        {
            Ok(saved) => {
                if let Some(notice) = saved.notice {
                    println!("{}", notice.message);
                }
                return Ok(());
            }
            Err(e) => println!("{} You can pick again.", Error::from(e).user_message()),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _log_guard = init_tracing();
    let cli = Cli::parse();

    let app = App::from_env()?;
    let result = match cli.command {
        Command::Status { location_id } => status(&app, &location_id).await,
        Command::Disconnect {
            location_id,
            provider,
        } => disconnect(&app, &location_id, provider).await,
        Command::Connect { location_id } => connect(&app, &location_id).await,
        Command::Me => me(&app).await,
        Command::Draft { clear } => draft(&app, clear).await,
    };

    if let Err(e) = result {
        tracing::error!(error = %format!("{e:#}"), "Command failed");
        match e.downcast_ref::<Error>() {
            Some(err) => eprintln!("Error: {}", err.user_message()),
            None => eprintln!("Error: {e:#}"),
        }
        std::process::exit(1);
    }
    Ok(())
}
