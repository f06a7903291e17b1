//! Terminal rendering layer: parses typed lines into commands and turns
//! session events into printable lines.

use std::path::PathBuf;

use stylist_audio::format_elapsed;
use stylist_core::catalog::{NormalizedItem, OutfitSummary};
use stylist_core::events::SessionEvent;
use stylist_core::types::{ConnectionStatus, EventContext, MessageKind, NoticeLevel};

pub const HELP: &str = "\
Type a message and press enter to send it.
  /image <file>    attach an image to the next message
  /clear-image     remove the pending image
  /record <file>   record from an audio file (webm, or mp4 fallback)
  /stop            stop recording and transcribe
  /cancel          discard the current recording
  /clear           clear recommendations
  /summary         show the outfit summary
  /health          check the backend connection
  /help            show this help
  /quit            leave the session";

/// One line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Message(String),
    AttachImage(PathBuf),
    ClearImage,
    Record(PathBuf),
    Stop,
    Cancel,
    ClearRecommendations,
    Summary,
    Health,
    Help,
    Quit,
}

impl ConsoleCommand {
    /// Parse one input line. Blank lines yield `None`; unknown slash
    /// commands yield an error message.
    pub fn parse(line: &str) -> Option<Result<Self, String>> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        if !line.starts_with('/') {
            return Some(Ok(ConsoleCommand::Message(line.to_string())));
        }

        let (name, arg) = match line.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (line, ""),
        };
        let with_path = |build: fn(PathBuf) -> ConsoleCommand| {
            if arg.is_empty() {
                Err(format!("{} needs a file path", name))
            } else {
                Ok(build(PathBuf::from(arg)))
            }
        };

        Some(match name {
            "/image" => with_path(ConsoleCommand::AttachImage),
            "/record" => with_path(ConsoleCommand::Record),
            "/clear-image" => Ok(ConsoleCommand::ClearImage),
            "/stop" => Ok(ConsoleCommand::Stop),
            "/cancel" => Ok(ConsoleCommand::Cancel),
            "/clear" => Ok(ConsoleCommand::ClearRecommendations),
            "/summary" => Ok(ConsoleCommand::Summary),
            "/health" => Ok(ConsoleCommand::Health),
            "/help" => Ok(ConsoleCommand::Help),
            "/quit" | "/exit" => Ok(ConsoleCommand::Quit),
            other => Err(format!("Unknown command {}. Type /help.", other)),
        })
    }
}

// =============================================================================
// Rendering
// =============================================================================

/// What the console remembers from the event stream.
#[derive(Debug, Default)]
pub struct ConsoleView {
    items: Vec<NormalizedItem>,
}

impl ConsoleView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn summary(&self) -> OutfitSummary {
        OutfitSummary::from_items(&self.items)
    }

    /// Lines printed for `/summary`.
    pub fn render_summary(&self) -> Vec<String> {
        let summary = self.summary();
        if summary.total_items == 0 {
            return vec!["No recommendations yet.".to_string()];
        }
        vec![format!(
            "Outfit: {} items, ${:.2} total, {} in stock",
            summary.total_items, summary.total_price, summary.in_stock_count
        )]
    }

    /// Lines printed for one event. Events with nothing to show yield none.
    pub fn render(&mut self, event: &SessionEvent) -> Vec<String> {
        match event {
            SessionEvent::MessageRendered {
                kind,
                text,
                has_image,
                timestamp,
            } => {
                let time = timestamp
                    .to_datetime()
                    .with_timezone(&chrono::Local)
                    .format("%H:%M");
                let who = match kind {
                    MessageKind::Welcome | MessageKind::Assistant | MessageKind::Apology => {
                        "stylist"
                    }
                    MessageKind::User => "you",
                };
                let mut line = format!("[{}] {}: {}", time, who, text);
                if *has_image {
                    line.push_str(" [image]");
                }
                vec![line]
            }
            SessionEvent::ProcessingChanged { processing: true } => {
                vec!["Stylist is typing...".to_string()]
            }
            SessionEvent::PendingImageChanged { attached } => vec![if *attached {
                "Image attached to the next message.".to_string()
            } else {
                "Image removed.".to_string()
            }],
            SessionEvent::EventContextUpdated { context } => render_context(context),
            SessionEvent::RecommendationsUpdated { items } => {
                self.items = items.clone();
                render_items(items)
            }
            SessionEvent::RecommendationsCleared => {
                self.items.clear();
                vec!["Recommendations cleared.".to_string()]
            }
            SessionEvent::RecordingStarted { mime_type, .. } => {
                vec![format!("Recording ({}). /stop when done.", mime_type)]
            }
            SessionEvent::RecordingTick { elapsed_secs, .. } if elapsed_secs % 10 == 0 => {
                vec![format!("Recording {}", format_elapsed(*elapsed_secs))]
            }
            SessionEvent::RecordingStopped { byte_count, .. } if *byte_count > 0 => {
                vec!["Transcribing...".to_string()]
            }
            SessionEvent::TranscriptReady { text } => vec![format!("Heard: {}", text)],
            SessionEvent::ConnectionChanged {
                status,
                dataset_size,
                demo_mode,
            } => vec![render_connection(*status, *dataset_size, *demo_mode)],
            SessionEvent::Notice(notice) => {
                let tag = match notice.level {
                    NoticeLevel::Info => "info",
                    NoticeLevel::Success => "ok",
                    NoticeLevel::Warning => "warn",
                    NoticeLevel::Error => "error",
                };
                vec![format!("({}) {}", tag, notice.message)]
            }
            _ => Vec::new(),
        }
    }
}

fn render_context(context: &EventContext) -> Vec<String> {
    let fields = context.display_fields();
    if fields.is_empty() {
        return Vec::new();
    }
    let parts: Vec<String> = fields
        .iter()
        .map(|(label, value)| format!("{}: {}", label, value))
        .collect();
    vec![format!("Context: {}", parts.join(" | "))]
}

fn render_items(items: &[NormalizedItem]) -> Vec<String> {
    let mut lines = vec![format!("{} recommendations:", items.len())];
    for item in items {
        let mut line = format!(
            "  #{} {} - {} ({}, {})",
            item.id,
            item.name,
            item.price_label(),
            item.stock.label,
            item.location.display
        );
        if let Some(label) = item.match_label() {
            line.push_str(&format!(" {}", label));
        }
        lines.push(line);
    }
    lines
}

fn render_connection(status: ConnectionStatus, dataset_size: Option<u64>, demo_mode: bool) -> String {
    let mut line = format!("Backend: {}", status.label());
    if let Some(size) = dataset_size {
        line.push_str(&format!(" ({} items)", size));
    }
    if demo_mode {
        line.push_str(" [demo]");
    }
    line
}
