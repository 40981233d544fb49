// demos/watch_dir.rs

//! Print the changes under a directory until Ctrl-C.
//!
//! ```text
//! cargo run --example watch_dir -- ./some/dir --timeout-ms 200 --capacity 8
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use dirwatch::config::load_and_validate;
use dirwatch::logging::{self, LogLevel};
use dirwatch::{ChannelCapacity, StreamOptions, watch_stream};
use tracing::info;

/// Stream file changes in a directory.
#[derive(Debug, Parser)]
#[command(name = "watch_dir", version, about, long_about = None)]
struct Args {
    /// Directory to watch.
    target: PathBuf,

    /// Stream settings (TOML). Flags given on the command line win.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Pause between drains, in milliseconds.
    #[arg(long, value_name = "MS")]
    timeout_ms: Option<u64>,

    /// "rendezvous" or a positive number of buffered events.
    #[arg(long, value_name = "N")]
    capacity: Option<ChannelCapacity>,

    /// Only watch the directory itself, not its subtree.
    #[arg(long)]
    shallow: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `DIRWATCH_LOG` or a default level will be used.
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<LogLevel>,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run_main().await {
        eprintln!("watch_dir error: {err:?}");
        std::process::exit(1);
    }
}

async fn run_main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init_logging(args.log_level)?;

    let mut options = match &args.config {
        Some(path) => load_and_validate(path)?,
        None => StreamOptions::default(),
    };
    if let Some(ms) = args.timeout_ms {
        options = options.with_timeout(Duration::from_millis(ms));
    }
    if let Some(capacity) = args.capacity {
        options = options.with_capacity(capacity);
    }
    if args.shallow {
        options = options.with_subtree(false);
    }

    let mut stream = watch_stream(&args.target, options)?;
    info!(root = ?stream.target(), "watching; press Ctrl-C to stop");

    loop {
        tokio::select! {
            event = stream.recv() => match event {
                Some(event) => println!("{event}"),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
        }
    }

    let summary = stream.finish().await?;
    info!(
        reason = ?summary.reason,
        received = summary.forwarded,
        sent = summary.sent,
        "stream finished"
    );
    Ok(())
}
