#![warn(missing_docs)]
//! # card-connect binary
//!
//! Command-line entry point: scans one card and optionally sends the message.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use card_connect_app::{AppConfig, WorkflowError, app_version, build_runtime};
use card_connect_core::{Channel, ImageSize, MessageKind};
use card_connect_intake::{InMemoryPreviewSurface, read_selected_file};
use card_connect_overlay::{FitMode, OverlayMapper, Placement};
use card_connect_ui::{UPLOAD_CONSTRAINTS, WorkflowStatus, WorkflowView};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "card-connect")]
#[command(about = "Scan a business card and send a follow-up message")]
#[command(version = card_connect_app::APP_VERSION)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract contact details from a card image
    Scan(ScanArgs),
    /// Print the build version
    Version,
}

#[derive(Args)]
struct ScanArgs {
    /// Path to a PNG or JPEG card image
    image: PathBuf,
    /// Your email, used as Reply-To
    #[arg(long, env = "CARD_CONNECT_SENDER")]
    sender: Option<String>,
    /// Send the message after extraction
    #[arg(long)]
    send: bool,
    /// Outbound channel
    #[arg(long, value_enum, default_value_t = ChannelArg::Email)]
    channel: ChannelArg,
    /// Message kind
    #[arg(long, value_enum, default_value_t = KindArg::Personalized)]
    kind: KindArg,
    /// Custom message body (implies --kind custom)
    #[arg(long)]
    message: Option<String>,
    /// Displayed preview size as WIDTHxHEIGHT, for overlay placement
    #[arg(long, value_parser = parse_display_size)]
    display: Option<ImageSize>,
    /// How the preview is fitted into the display box
    #[arg(long, default_value = "fill")]
    fit: FitMode,
    /// Print the full OCR text when the service returns it
    #[arg(long)]
    raw: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum ChannelArg {
    Email,
    Whatsapp,
}

impl From<ChannelArg> for Channel {
    fn from(value: ChannelArg) -> Self {
        match value {
            ChannelArg::Email => Channel::Email,
            ChannelArg::Whatsapp => Channel::WhatsApp,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Personalized,
    Custom,
}

impl From<KindArg> for MessageKind {
    fn from(value: KindArg) -> Self {
        match value {
            KindArg::Personalized => MessageKind::Personalized,
            KindArg::Custom => MessageKind::Custom,
        }
    }
}

fn parse_display_size(raw: &str) -> Result<ImageSize, String> {
    let (width, height) = raw
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{raw}'"))?;
    let width: f64 = width
        .trim()
        .parse()
        .map_err(|_| format!("invalid width '{width}'"))?;
    let height: f64 = height
        .trim()
        .parse()
        .map_err(|_| format!("invalid height '{height}'"))?;
    if width <= 0.0 || height <= 0.0 {
        return Err("display size must be positive".to_string());
    }
    Ok(ImageSize::new(width, height))
}

/// CLI entry point.
#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "card_connect=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Version => {
            println!("card-connect {}", app_version());
            Ok(())
        }
        Command::Scan(args) => scan(args).await,
    }
}

async fn scan(args: ScanArgs) -> Result<()> {
    let config = AppConfig::from_env().context("failed to load configuration")?;
    tracing::info!(version = app_version(), base = %config.api_base, "starting scan");

    let file = read_selected_file(&args.image, config.max_image_bytes)
        .with_context(|| format!("cannot use {}", args.image.display()))?;

    let surface = Arc::new(InMemoryPreviewSurface::new());
    let mut runtime = build_runtime(&config, surface, OverlayMapper::new(args.fit))?;
    if let Some(size) = args.display {
        runtime.controller_mut().set_displayed_size(size);
    }

    runtime.select_file(file)?;
    runtime.settle().await;

    let controller = runtime.controller_mut();
    if let Some(sender) = args.sender {
        controller.set_sender_email(sender);
    }
    controller.set_channel(args.channel.into())?;
    match args.message {
        Some(message) => {
            controller.set_kind(MessageKind::Custom)?;
            controller.edit_content(message)?;
        }
        None => controller.set_kind(args.kind.into())?,
    }

    print_view(&runtime.controller().view());
    if args.raw {
        if let Some(text) = runtime.controller().raw_text() {
            println!("\n--- raw text ---\n{text}");
        }
    }

    if args.send {
        match runtime.send() {
            Ok(_) => {
                runtime.settle().await;
            }
            // The refusal reason is already the status line.
            Err(WorkflowError::Precondition(_)) => {}
            Err(error) => return Err(error.into()),
        }
        if let Some(line) = runtime.controller().view().status_line {
            println!("\n{line}");
        }
    }

    if let WorkflowStatus::Failed(failure) = runtime.controller().status() {
        anyhow::bail!(failure.message());
    }
    Ok(())
}

fn print_view(view: &WorkflowView) {
    println!("card-connect {} ({UPLOAD_CONSTRAINTS})", app_version());
    if let Some(uri) = &view.preview_uri {
        println!("preview: {uri}");
    }
    if let Some(url) = &view.stored_url {
        println!("stored:  {url}");
    }
    println!("\nExtracted Details [{}]", view.stage_badge);
    for row in &view.fields {
        println!("  {:<8} {}", row.label, row.value);
    }

    if !view.annotations.is_empty() {
        println!("\nOverlays");
        for annotation in &view.annotations {
            match annotation.placement {
                Placement::Positioned(rect) => println!(
                    "  {:<8} x={:.1} y={:.1} w={:.1} h={:.1}",
                    annotation.label, rect.x, rect.y, rect.width, rect.height
                ),
                Placement::Pending => println!("  {:<8} (pending display size)", annotation.label),
            }
        }
    }

    println!(
        "\n{} message via {}{}",
        match view.kind {
            MessageKind::Personalized => "Personalized",
            MessageKind::Custom => "Custom",
        },
        view.channel.label(),
        if view.content_read_only { " (generated)" } else { "" }
    );
    if view.content.is_empty() {
        println!("  {}", view.content_placeholder);
    } else {
        println!("  {}", view.content);
    }
    println!("\n[{}]", view.send_label);
    if let Some(line) = view.status_line.as_deref().filter(|_| view.status.is_ready()) {
        println!("{line}");
    }
}
