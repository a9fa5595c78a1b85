//! # Gesture Replay
//!
//! Replays a recorded session and prints one JSON line per record.

use std::io::Write;

use clap::Parser;
use gesture_replay::{load_config, CliArgs, Replay, Session};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing on stderr so stdout carries only records.
///
/// Set `RUST_LOG` to control log levels (default: info,gesture_core=debug,gesture_replay=debug).
/// Set `RUST_LOG_FORMAT=json` for JSON output.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,gesture_core=debug,gesture_replay=debug"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true);

    if std::env::var("RUST_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer.json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let args = CliArgs::parse();
    let config = load_config(&args)?;
    let session = match &args.session {
        Some(path) => Session::from_path(path)?,
        None => Session::default(),
    };

    let mut replay = Replay::new(config, args.start_ms);
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    if args.list {
        replay.register(&session)?;
        for rule in replay.rules() {
            writeln!(out, "{}", serde_json::to_string(&rule)?)?;
        }
        for command in replay.commands() {
            writeln!(out, "{}", serde_json::json!({ "command": command }))?;
        }
        return Ok(());
    }

    if args.session.is_none() {
        anyhow::bail!("Nothing to replay: pass --session or --list");
    }

    tracing::info!("Replaying {} steps", session.steps.len());
    for record in replay.run(&session)? {
        writeln!(out, "{}", serde_json::to_string(&record)?)?;
    }
    Ok(())
}
