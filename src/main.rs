use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio::task;

use dictado::audio::Microphone;
use dictado::config::{Config, SpeechModel};
use dictado::models::ModelManager;
use dictado::transcribe::{self, Transcriber, WhisperTranscriber};
use dictado::{daemon, record, session::SessionError};

#[derive(Parser)]
#[command(name = "dictado")]
#[command(about = "Microphone dictation and Whisper transcription over stdin/stdout")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Model selection shared by every subcommand.
#[derive(Args)]
struct ModelArgs {
    /// Whisper model size [default: small]
    #[arg(value_enum)]
    model: Option<SpeechModel>,

    /// Language code, or "auto" to detect [default: es]
    language: Option<String>,

    /// Directory for cached model weights [default: ~/.cache/dictado/models]
    cache_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Transcribe an existing WAV file and print the text
    Transcribe {
        /// Path to a 16 kHz mono 16-bit PCM WAV file
        file: PathBuf,

        #[command(flatten)]
        model: ModelArgs,
    },
    /// Record one utterance from the microphone and transcribe it
    Record {
        #[command(flatten)]
        model: ModelArgs,
    },
    /// Run the long-lived record/transcribe daemon
    Daemon {
        #[command(flatten)]
        model: ModelArgs,
    },
}

impl ModelArgs {
    fn apply(self, config: &mut Config) {
        if let Some(model) = self.model {
            config.model.model = model;
        }
        if let Some(language) = self.language {
            config.model.language = language;
        }
        if let Some(cache_dir) = self.cache_dir {
            config.model.cache_dir = Some(cache_dir);
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let mut config = Config::load().unwrap_or_default();

    match cli.command {
        Commands::Transcribe { file, model } => {
            model.apply(&mut config);
            init(&config)?;
            transcribe_file(config, file).await
        }
        Commands::Record { model } => {
            model.apply(&mut config);
            init(&config)?;
            record_once(config).await
        }
        Commands::Daemon { model } => {
            model.apply(&mut config);
            init(&config)?;
            run_daemon(config).await
        }
    }
}

fn init(config: &Config) -> Result<()> {
    dictado::init_logging(config)?;
    // Route whisper.cpp and GGML logs through tracing
    whisper_rs::install_logging_hooks();
    Ok(())
}

/// Build the closure that downloads (if needed) and loads the model.
///
/// Runs on a blocking thread; downloads hop back onto the runtime.
fn model_loader(
    models_dir: PathBuf,
    model: SpeechModel,
    language: Option<String>,
    handle: tokio::runtime::Handle,
) -> impl FnOnce() -> Result<Box<dyn Transcriber>> + Send + 'static {
    let manager = ModelManager::new(models_dir);

    move || {
        let model_path = handle.block_on(manager.ensure_model(model))?;
        let transcriber = WhisperTranscriber::new(&model_path, language)?;
        Ok(Box::new(transcriber) as Box<dyn Transcriber>)
    }
}

async fn transcribe_file(config: Config, file: PathBuf) -> Result<ExitCode> {
    let manager = ModelManager::new(config.model.models_dir()?);
    let model_path = manager.ensure_model(config.model.model).await?;
    let language = config.model.language_hint().map(str::to_string);

    let text = task::spawn_blocking(move || -> Result<String> {
        let mut transcriber = WhisperTranscriber::new(&model_path, language)?;
        let segments = transcriber.transcribe(&file)?;
        Ok(transcribe::collect_text(&segments))
    })
    .await
    .context("Transcription task panicked")??;

    println!("{text}");
    Ok(ExitCode::SUCCESS)
}

async fn record_once(config: Config) -> Result<ExitCode> {
    let load = model_loader(
        config.model.models_dir()?,
        config.model.model,
        config.model.language_hint().map(str::to_string),
        tokio::runtime::Handle::current(),
    );

    let result = task::spawn_blocking(move || {
        let mut microphone = Microphone;
        record::run(
            io::stdin().lock(),
            io::stdout().lock(),
            io::stderr().lock(),
            &mut microphone,
            load,
        )
    })
    .await
    .context("Recording task panicked")?;

    match result {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            // Prefixed failures were already reported on stderr.
            if e.downcast_ref::<SessionError>().is_none() {
                tracing::error!(error = ?e, "Recording failed");
            }
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn run_daemon(config: Config) -> Result<ExitCode> {
    let load = model_loader(
        config.model.models_dir()?,
        config.model.model,
        config.model.language_hint().map(str::to_string),
        tokio::runtime::Handle::current(),
    );

    let result = task::spawn_blocking(move || {
        let mut microphone = Microphone;
        daemon::run(io::stdin().lock(), io::stdout().lock(), &mut microphone, load)
    })
    .await
    .context("Daemon task panicked")?;

    match result {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            tracing::error!(error = ?e, "Daemon terminated");
            Ok(ExitCode::FAILURE)
        }
    }
}
