use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use paste_uploader::auth::redact_token;
use paste_uploader::clipboard::{ClipboardFile, PasteEvent};
use paste_uploader::editor::{Position, TextBuffer};
use paste_uploader::notify::LogNotifier;
use paste_uploader::orchestrator::{PasteOrchestrator, UploadOutcome, shared_editor};
use paste_uploader::settings::{JsonFileStore, SettingsManager};
use paste_uploader::upload::HttpUploader;
use paste_uploader::upload::http_client::create_shared_client;

#[derive(Parser)]
#[command(name = "paste-uploader")]
#[command(about = "Upload images and link them into markdown notes", long_about = None)]
#[command(version)]
struct Cli {
    /// Settings file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Paste image files into a note, as if from the clipboard
    Paste {
        /// Markdown note to paste into (created if missing)
        #[arg(short, long)]
        note: PathBuf,

        /// Image files, in clipboard order
        #[arg(short, long, required = true, num_args = 1..)]
        image: Vec<PathBuf>,

        /// Paste at the start of this line instead of the end of the note
        #[arg(short, long)]
        line: Option<usize>,

        /// Look for each placeholder from its insertion line first
        #[arg(long)]
        scoped: bool,
    },
    /// Show or edit the upload settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the current settings
    Show,
    /// Set the upload server base URL
    SetUrl { url: String },
    /// Set the authorization token
    SetToken { token: String },
    /// Remove the authorization token
    ClearToken,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let result = match cli.command {
        Commands::Paste {
            note,
            image,
            line,
            scoped,
        } => run_paste(cli.config, &note, &image, line, scoped).await,
        Commands::Config { action } => run_config(cli.config, action)
            .await
            .map(|()| ExitCode::SUCCESS),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn load_settings(config: Option<PathBuf>) -> anyhow::Result<SettingsManager<JsonFileStore>> {
    let store = match config {
        Some(path) => JsonFileStore::with_path(path),
        None => JsonFileStore::new()?,
    };
    tracing::debug!("Settings file: {}", store.path().display());
    SettingsManager::load(store).await
}

async fn run_paste(
    config: Option<PathBuf>,
    note: &Path,
    images: &[PathBuf],
    line: Option<usize>,
    scoped: bool,
) -> anyhow::Result<ExitCode> {
    tracing::info!("Loading paste uploader");
    let manager = load_settings(config).await?;

    let text = match tokio::fs::read_to_string(note).await {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e).with_context(|| format!("reading {}", note.display())),
    };

    let mut buffer = TextBuffer::new(text);
    if let Some(line) = line {
        buffer.set_cursor(Position::new(line, 0));
    }

    let mut files = Vec::with_capacity(images.len());
    for path in images {
        let file = ClipboardFile::from_path(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        files.push(file);
    }

    let editor = shared_editor(buffer);
    let orchestrator = PasteOrchestrator::new(
        Arc::clone(&editor),
        Arc::new(HttpUploader::with_client(create_shared_client()?)),
        Arc::new(LogNotifier),
        manager.shared(),
    )
    .with_scoped_replace(scoped);

    let mut event = PasteEvent::new(files);
    let dispatch = orchestrator.handle_paste(&mut event);
    if let Some(reason) = dispatch.ignore_reason() {
        anyhow::bail!("paste not handled ({reason:?}); check `paste-uploader config show`");
    }

    let outcomes = dispatch.join().await;

    let text = editor.lock().text().to_string();
    tokio::fs::write(note, text)
        .await
        .with_context(|| format!("writing {}", note.display()))?;

    let mut failed = 0;
    for outcome in &outcomes {
        match outcome {
            UploadOutcome::Replaced { url, .. } => println!("{url}"),
            UploadOutcome::PlaceholderMissing { url, .. } => println!("{url} (not linked)"),
            UploadOutcome::Failed { .. } | UploadOutcome::Aborted { .. } => failed += 1,
        }
    }

    if failed > 0 {
        eprintln!("{failed} of {} upload(s) failed", outcomes.len());
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

async fn run_config(config: Option<PathBuf>, action: ConfigAction) -> anyhow::Result<()> {
    let manager = load_settings(config).await?;
    match action {
        ConfigAction::Show => {
            let settings = manager.settings();
            println!("url: {}", settings.url);
            println!(
                "authorizeSDK: {}",
                settings.token().map_or_else(|| "<none>".to_string(), redact_token)
            );
            println!("configured: {}", settings.is_complete());
        }
        ConfigAction::SetUrl { url } => manager.set_url(url).await?,
        ConfigAction::SetToken { token } => manager.set_authorize_token(Some(token)).await?,
        ConfigAction::ClearToken => manager.set_authorize_token(None).await?,
    }
    Ok(())
}
