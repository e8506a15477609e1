//! CLI for pubrelay
//!
//! Subcommands:
//! - `relay`: bind the frontend and backend endpoints and relay until Ctrl-C
//! - `publish`: send messages to a running broker (useful for smoke tests)
//! - `subscribe`: print messages relayed by a running broker

use std::process::ExitCode;

use clap::Parser;
use pubrelay::broker::Broker;
use pubrelay::client::{Publisher, Subscriber};
use pubrelay::config::load_config_from;
use pubrelay::utils::logging;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "pubrelay")]
enum Command {
    /// Run the relay broker
    Relay {
        /// Configuration file to read instead of config/default.toml
        #[arg(long)]
        config: Option<String>,
        /// Intake address publishers connect to (overrides configuration)
        #[arg(long)]
        frontend: Option<String>,
        /// Distribution address subscribers connect to (overrides configuration)
        #[arg(long)]
        backend: Option<String>,
    },
    /// Publish each MESSAGE as one text message
    Publish {
        /// Broker frontend to connect to
        #[arg(long, default_value = "tcp://127.0.0.1:5555")]
        url: String,
        #[arg(required = true)]
        messages: Vec<String>,
    },
    /// Print relayed messages, one per line
    Subscribe {
        /// Broker backend to connect to
        #[arg(long, default_value = "tcp://127.0.0.1:5556")]
        url: String,
        /// Exit after this many messages
        #[arg(long)]
        count: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let cmd = Command::parse();

    let result = match cmd {
        Command::Relay {
            config,
            frontend,
            backend,
        } => run_relay(config, frontend, backend).await,
        Command::Publish { url, messages } => {
            logging::init("info");
            run_publish(&url, messages).await
        }
        Command::Subscribe { url, count } => {
            logging::init("info");
            run_subscribe(&url, count).await
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run_relay(
    config: Option<String>,
    frontend: Option<String>,
    backend: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut settings = match load_config_from(config.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            logging::init("info");
            return Err(e.into());
        }
    };
    logging::init(&settings.log.level);

    if let Some(frontend) = frontend {
        settings.broker.frontend = frontend;
    }
    if let Some(backend) = backend {
        settings.broker.backend = backend;
    }

    let mut broker = Broker::new(settings.broker);
    let shutdown = broker.shutdown_handle();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received. Exiting gracefully.");
            shutdown.shutdown();
        }
    });

    broker.start().await?;
    Ok(())
}

async fn run_publish(url: &str, messages: Vec<String>) -> Result<(), Box<dyn std::error::Error>> {
    let mut publisher = Publisher::connect(url).await?;
    for message in messages {
        publisher.send_text(message).await?;
    }
    publisher.close().await?;
    Ok(())
}

async fn run_subscribe(url: &str, count: Option<usize>) -> Result<(), Box<dyn std::error::Error>> {
    let mut subscriber = Subscriber::connect(url).await?;
    let mut received = 0usize;

    while count.is_none_or(|limit| received < limit) {
        let Some(msg) = subscriber.recv().await? else {
            break;
        };
        println!("{}", String::from_utf8_lossy(msg.as_bytes()));
        received += 1;
    }

    subscriber.close().await?;
    Ok(())
}
