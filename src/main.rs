use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use mediagrid::{
    AppState, Config,
    client::{HttpPageFetcher, PagingController, PagingOptions, PagingState},
    create_app_with_state,
    media::{ListingCache, Upload},
    startup_checks,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Global options that apply to all commands
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: PathBuf,

    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the web server (default if no command specified)
    Serve {
        #[arg(short, long)]
        port: Option<u16>,

        #[arg(long)]
        host: Option<String>,

        /// Automatically quit after specified number of seconds (useful for testing)
        #[arg(long)]
        quit_after: Option<u64>,
    },

    /// Store a local image and record its metadata
    Upload {
        /// Image file to ingest
        file: PathBuf,
        /// Display title
        #[arg(short, long)]
        title: String,
    },

    /// Print one page of the configured listing source
    List {
        #[arg(long, default_value_t = 1)]
        page: usize,
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Page through a running server's listing
    Browse {
        /// Server base URL (defaults to client.base_url)
        #[arg(long)]
        url: Option<String>,
        /// Maximum number of pages to load
        #[arg(long, default_value_t = 5)]
        pages: usize,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Set up logging first
    let level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = load_config(&cli.config)?;

    match cli.command {
        Some(Commands::Serve {
            port,
            host,
            quit_after,
        }) => run_server(config, port, host, quit_after).await,
        Some(Commands::Upload { file, title }) => upload_file(config, file, title).await,
        Some(Commands::List { page, limit }) => list_page(config, page, limit).await,
        Some(Commands::Browse { url, pages }) => browse(config, url, pages).await,
        None => {
            // Default to serve command if no subcommand specified
            run_server(config, None, None, None).await
        }
    }
}

fn load_config(config_path: &PathBuf) -> Result<Config, Box<dyn std::error::Error>> {
    if config_path.exists() {
        let config_content = std::fs::read_to_string(config_path)?;
        info!("Configuration loaded from: {:?}", config_path);
        Ok(toml_edit::de::from_str::<Config>(&config_content)?)
    } else {
        info!("Config file not found at {:?}, using defaults", config_path);
        Ok(Config::default())
    }
}

async fn upload_file(
    config: Config,
    file: PathBuf,
    title: String,
) -> Result<(), Box<dyn std::error::Error>> {
    let bytes = tokio::fs::read(&file).await?;
    let state = AppState::new(config);

    let file_name = file
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();
    let content_type = mime_guess::from_path(&file).first().map(|m| m.to_string());

    let ingested = state
        .ingestor
        .ingest(Upload {
            bytes: Some(bytes.into()),
            file_name,
            content_type,
            title: Some(title),
        })
        .await?;

    println!("Stored '{}' at {}", ingested.title, ingested.path);
    Ok(())
}

async fn list_page(
    config: Config,
    page: usize,
    limit: Option<usize>,
) -> Result<(), Box<dyn std::error::Error>> {
    let limit = limit
        .unwrap_or(config.listing.default_limit)
        .clamp(1, config.listing.max_limit.max(1));
    let page = page.max(1);
    let state = AppState::new(config);

    let result = state.listing.list(page, limit).await?;
    if result.items.is_empty() {
        println!("No media on page {} ({} total)", page, result.total);
        return Ok(());
    }

    println!("Page {} ({} total):", page, result.total);
    for item in &result.items {
        println!(
            "  {}  {}  {}",
            item.created_at.to_rfc3339(),
            item.title,
            item.path
        );
    }
    if mediagrid::media::has_more(result.total, page, limit) {
        println!("More items available on page {}", page + 1);
    }
    Ok(())
}

async fn browse(
    config: Config,
    url: Option<String>,
    pages: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let base_url = url.unwrap_or(config.client.base_url.clone());
    let fetcher = HttpPageFetcher::new(&base_url)?;
    let controller = PagingController::new(
        fetcher,
        PagingOptions {
            limit: config.client.page_size,
            refresh_interval: Duration::from_secs(config.client.refresh_interval_seconds.max(1)),
        },
    );

    for _ in 0..pages {
        controller.on_sentinel_visible().await;
        match controller.state().await {
            PagingState::Idle => continue,
            PagingState::Errored(message) => {
                controller.shutdown();
                return Err(message.into());
            }
            PagingState::Exhausted | PagingState::Loading => break,
        }
    }

    let snapshot = controller.snapshot().await;
    println!(
        "Loaded {} of {} items from {}",
        snapshot.items.len(),
        snapshot.total,
        base_url
    );
    for item in &snapshot.items {
        println!("  {}  {}", item.title, item.path);
    }
    controller.shutdown();
    Ok(())
}

async fn run_server(
    config: Config,
    port: Option<u16>,
    host: Option<String>,
    quit_after: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let host = host.unwrap_or(config.server.host.clone());
    let port = port.unwrap_or(config.server.port);

    info!("Starting {} server", config.app.name);
    info!("Upload directory: {:?}", config.storage.upload_directory);
    info!("Metadata file: {:?}", config.storage.metadata_file);
    info!("Listing source: {:?}", config.listing.source);

    // Perform startup checks
    match startup_checks::perform_startup_checks(&config).await {
        Ok(()) => info!("All startup checks passed"),
        Err(errors) => {
            for error in &errors {
                tracing::error!("Startup check failed: {}", error);
            }

            if errors.iter().any(|e| e.is_critical()) {
                tracing::error!("Critical startup check failed, exiting");
                return Err("Critical startup check failed".into());
            } else {
                tracing::warn!("Non-critical startup checks failed, continuing");
            }
        }
    }

    let state = AppState::new(config.clone());

    if let Some(interval_seconds) = config.listing.cache_refresh_interval_seconds
        && interval_seconds > 0
    {
        ListingCache::start_background_refresh(state.listing.clone(), interval_seconds);
    }

    let app = create_app_with_state(state);

    let addr = SocketAddr::from((host.parse::<std::net::IpAddr>()?, port));
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Set up graceful shutdown
    let server = axum::serve(listener, app);
    let graceful = server.with_graceful_shutdown(shutdown_signal(quit_after));

    if let Err(e) = graceful.await {
        tracing::error!("Server error: {}", e);
    }

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal(quit_after: Option<u64>) {
    use tokio::signal;
    use tokio::time::sleep;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let quit_timer = async {
        if let Some(seconds) = quit_after {
            info!(
                "Server will automatically shut down after {} seconds",
                seconds
            );
            sleep(Duration::from_secs(seconds)).await;
            info!("Quit timer expired, shutting down");
        } else {
            std::future::pending::<()>().await
        }
    };

    tokio::select! {
        _ = ctrl_c => {
            info!("Shutdown signal received (Ctrl+C)");
        },
        _ = terminate => {
            info!("Shutdown signal received (SIGTERM)");
        },
        _ = quit_timer => {},
    }
}
