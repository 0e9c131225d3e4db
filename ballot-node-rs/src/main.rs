//! Ballot Node
//!
//! Interactive front end for a ballot registry. Reads commands from stdin,
//! optionally journals every committed change to disk.

mod command;
mod session;

use ballot_core::{BallotRegistry, ChannelSink, Clock, StorageConfig, SystemClock, TracingSink};
use clap::{Parser, ValueEnum};
use command::{Command, HELP};
use session::Session;
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// How registry notifications are surfaced
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum EventMode {
    /// Write events to the debug log
    Log,
    /// Print events to stdout as JSON lines
    Stream,
}

/// Ballot registry node
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory for the journal (in-memory only when omitted)
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Skip flushing the journal after every write
    #[arg(long)]
    no_fsync: bool,

    /// Initial voter identity
    #[arg(short, long, default_value = "anonymous")]
    voter: String,

    /// Event output
    #[arg(short, long, value_enum, default_value = "log")]
    events: EventMode,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Setup logging
    let level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let registry = match &args.data_dir {
        Some(dir) => {
            let config = StorageConfig {
                dir: dir.clone(),
                fsync_on_write: !args.no_fsync,
            };
            info!("Opening journal in {:?}", config.dir);
            BallotRegistry::open(config, clock)?
        }
        None => BallotRegistry::new(clock),
    };
    info!(
        "Ballot node starting with {} ballots, voting as \"{}\"",
        registry.ballot_count(),
        args.voter
    );

    let (registry, mut event_rx) = match args.events {
        EventMode::Log => (registry.with_event_sink(TracingSink), None),
        EventMode::Stream => {
            let (sink, rx) = ChannelSink::channel();
            (registry.with_event_sink(sink), Some(rx))
        }
    };
    let mut session = Session::new(registry, args.voter.clone());

    // Stdin is blocking; read it on its own thread
    let (command_tx, mut command_rx) = tokio::sync::mpsc::channel::<Command>(16);
    std::thread::spawn(move || {
        println!("\n{}", HELP);

        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if line.trim().is_empty() {
                continue;
            }
            match Command::parse(&line) {
                Ok(command) => {
                    let quit = command == Command::Quit;
                    if command_tx.blocking_send(command).is_err() || quit {
                        break;
                    }
                }
                Err(e) => println!("{}", e),
            }
        }
    });

    // Main event loop
    loop {
        tokio::select! {
            command = command_rx.recv() => {
                match command {
                    Some(Command::Quit) | None => break,
                    Some(command) => {
                        let output = session.execute(command);
                        if !output.is_empty() {
                            println!("{}", output);
                        }
                    }
                }
            }

            Some(event) = async {
                match event_rx.as_mut() {
                    Some(rx) => rx.recv().await,
                    None => std::future::pending().await,
                }
            } => {
                match event.to_bytes() {
                    Ok(bytes) => println!("{}", String::from_utf8_lossy(&bytes)),
                    Err(e) => warn!("Failed to encode event: {}", e),
                }
            }

            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        }
    }

    info!("Ballot node stopped");
    Ok(())
}
