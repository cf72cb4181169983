use anyhow::Context;
use book_relay::{ConnectorFactory, Relay, create_router, load_config, load_default_config};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn print_help() {
    eprintln!(
        r#"Book Relay - coalescing order book relay over WebSocket

USAGE:
    book-relay [OPTIONS]

OPTIONS:
    --config <PATH>     Load configuration from JSON file
    --help              Print this help message

ENVIRONMENT VARIABLES:
    HOST                Server host (default: localhost)
    PORT                Server port (default: 8768)
    RUST_LOG            Log level filter

EXAMPLES:
    # Relay Kraken ETH-USD on ws://localhost:8768
    book-relay

    # Run with config file
    book-relay --config relay.json

    # Subscribe to (and redirect the relay to) Coinbase BTC-USD
    websocat 'ws://localhost:8768/?exchange=coinbase&pair=BTC-USD'
"#
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "book_relay=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Parse command line arguments
    let args: Vec<String> = std::env::args().collect();
    let mut config_path: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            "--config" | "-c" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("Error: --config requires a path argument");
                    std::process::exit(1);
                }
                config_path = Some(args[i].clone());
            }
            arg => {
                eprintln!("Unknown argument: {}", arg);
                print_help();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let mut config = match config_path {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path);
            load_config(&path).with_context(|| format!("loading {}", path))?
        }
        None => {
            tracing::info!("Using default configuration");
            load_default_config()?
        }
    };

    if let Ok(host) = std::env::var("HOST") {
        config.server.host = host;
    }
    if let Ok(port) = std::env::var("PORT") {
        match port.parse() {
            Ok(port) => config.server.port = port,
            Err(_) => tracing::warn!("Ignoring invalid PORT '{}'", port),
        }
    }

    let connectors = ConnectorFactory::build_registry(&config);
    tracing::info!("Exchanges: {:?}", connectors.exchanges());
    tracing::info!(
        "Default target: {} (flush interval {}ms)",
        config.default_target,
        config.batching.min_interval_ms
    );

    let (relay, relay_task) = Relay::spawn(config.relay_config(), connectors);

    let addr = config.server.bind_address();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    tracing::info!("WebSocket: ws://{}/", addr);
    tracing::info!("Status: http://{}/status", addr);

    axum::serve(listener, create_router(relay.clone()))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down");
        })
        .await?;

    relay.shutdown();
    let _ = relay_task.await;
    Ok(())
}
