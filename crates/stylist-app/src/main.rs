//! Stylist console binary - composition root.
//!
//! 1. Parse CLI arguments and load configuration from TOML
//! 2. Build the HTTP backend client and the file-backed audio devices
//! 3. Start the session orchestrator, an event printer and a health poller
//! 4. Read commands from stdin until `/quit` or end of input

mod cli;
mod console;
mod devices;

use std::sync::Arc;

use clap::Parser;
use tokio::io::AsyncBufReadExt;
use tokio::sync::broadcast;

use stylist_chat::{SessionHandle, SessionOrchestrator};
use stylist_client::HttpBackend;
use stylist_core::config::StylistConfig;
use stylist_core::events::SessionEvent;
use stylist_core::types::ImageAttachment;

use cli::CliArgs;
use console::{ConsoleCommand, ConsoleView, HELP};
use devices::{FileAudioSink, FileMicrophone};

/// Print session events as they arrive.
async fn print_events(mut events: broadcast::Receiver<SessionEvent>) {
    let mut view = ConsoleView::new();
    loop {
        match events.recv().await {
            Ok(event) => {
                for line in view.render(&event) {
                    println!("{}", line);
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Console fell behind the session");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

/// Ask for a health check on a fixed interval, skipping ticks while a chat
/// request is in flight. The session itself ignores a request while a
/// previous check is still running.
async fn health_poller(
    handle: SessionHandle,
    mut events: broadcast::Receiver<SessionEvent>,
    period: std::time::Duration,
) {
    let period = period.max(std::time::Duration::from_secs(1));
    let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    let mut processing = false;
    loop {
        interval.tick().await;
        loop {
            match events.try_recv() {
                Ok(SessionEvent::ProcessingChanged { processing: now }) => processing = now,
                Ok(_) | Err(broadcast::error::TryRecvError::Lagged(_)) => {}
                Err(_) => break,
            }
        }
        if processing {
            tracing::debug!("Health poll skipped: request in flight");
            continue;
        }
        if !handle.check_connection() {
            break;
        }
    }
}

/// Translate stdin lines into session commands.
async fn read_commands(
    handle: SessionHandle,
    mic: FileMicrophone,
    mut events: broadcast::Receiver<SessionEvent>,
) {
    let mut view = ConsoleView::new();
    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();

    loop {
        // Keep the summary view current without printing twice.
        while let Ok(event) = events.try_recv() {
            view.render(&event);
        }

        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::error!(error = %e, "Failed to read stdin");
                break;
            }
        };
        let command = match ConsoleCommand::parse(&line) {
            None => continue,
            Some(Ok(command)) => command,
            Some(Err(msg)) => {
                println!("{}", msg);
                continue;
            }
        };

        let delivered = match command {
            ConsoleCommand::Message(text) => handle.set_input(text) && handle.send_input(),
            ConsoleCommand::AttachImage(path) => match tokio::fs::read(&path).await {
                Ok(bytes) => handle.attach_image(ImageAttachment::new(bytes)),
                Err(e) => {
                    println!("Cannot read {}: {}", path.display(), e);
                    true
                }
            },
            ConsoleCommand::ClearImage => handle.clear_image(),
            ConsoleCommand::Record(path) => {
                mic.arm(path);
                handle.start_recording()
            }
            ConsoleCommand::Stop => handle.stop_recording(),
            ConsoleCommand::Cancel => handle.cancel_recording(),
            ConsoleCommand::ClearRecommendations => handle.clear_recommendations(),
            ConsoleCommand::Summary => {
                while let Ok(event) = events.try_recv() {
                    view.render(&event);
                }
                for line in view.render_summary() {
                    println!("{}", line);
                }
                true
            }
            ConsoleCommand::Health => handle.check_connection(),
            ConsoleCommand::Help => {
                println!("{}", HELP);
                true
            }
            ConsoleCommand::Quit => {
                handle.shutdown();
                break;
            }
        };
        if !delivered {
            break;
        }
    }
    handle.shutdown();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config.
    let config_file = args.resolve_config_path();
    let mut config = StylistConfig::load_or_default(&config_file);
    config.apply_env_overrides();
    if let Some(ref url) = args.base_url {
        config.backend.base_url = url.clone();
    }
    if args.no_audio {
        config.chat.return_audio = false;
    }
    config.validate()?;

    // Tracing. RUST_LOG wins over the flag and the config file.
    let level = args.resolve_log_level(&config.general.log_level);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&level)),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Starting Stylist v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        path = %config_file.display(),
        base_url = %config.backend.base_url,
        return_audio = config.chat.return_audio,
        "Configuration loaded"
    );

    // Collaborators.
    let backend = Arc::new(HttpBackend::new(config.backend.clone())?);
    let mic = FileMicrophone::new();
    let sink = Arc::new(FileAudioSink::new(args.resolve_audio_dir()));
    tracing::info!(dir = %sink.dir().display(), "Spoken replies will be saved here");

    let poll_interval = config.backend.health_poll_interval();
    let mut session = SessionOrchestrator::new(config, backend, Arc::new(mic.clone()), sink);
    let handle = session.handle();

    // === Background tasks ===

    let printer = tokio::spawn(print_events(session.subscribe()));
    session.check_connection();
    tokio::spawn(health_poller(handle.clone(), session.subscribe(), poll_interval));
    tokio::spawn(read_commands(handle, mic, session.subscribe()));

    println!("Type /help for commands.");
    // The welcome message was rendered before anyone subscribed.
    if let Some(welcome) = session.state().view().first() {
        println!("stylist: {}", welcome.text);
    }

    session.run().await;
    // Let the printer flush what the session emitted last.
    let _ = tokio::time::timeout(std::time::Duration::from_millis(200), printer).await;
    Ok(())
}
