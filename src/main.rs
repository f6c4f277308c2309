use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::mpsc::channel;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use streamscribe::accumulator::{RunPhase, RunStatus, TranscriptAccumulator};
use streamscribe::capture::{format_elapsed, AudioFile, CaptureAction, CaptureCoordinator, CapturedAudio};
use streamscribe::config::Config;
use streamscribe::microphone::MicrophoneDevice;
use streamscribe::revealer::Revealer;
use streamscribe::transport::{ScriptedBackend, TranscriptionBackend};

/// Canned transcript used by the built-in demo backend. The real transcription
/// service is an external collaborator behind the TranscriptionBackend trait.
const SAMPLE_TRANSCRIPT: &str = "Speech recognition turns spoken audio into text. \
This demo streams the transcript back one fragment at a time while the \
typewriter reveal exposes it character by character.";

#[derive(Parser)]
#[command(name = "streamscribe")]
#[command(about = "Audio capture and streaming transcript reveal", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stream the words of a text file through the pipeline with the reveal
    Replay {
        /// Text file to stream as fragments
        path: PathBuf,
        /// Delay between fragments in milliseconds (defaults to config)
        #[arg(short, long)]
        delay_ms: Option<u64>,
    },
    /// Submit an audio file (demo backend)
    File {
        /// Audio file to transcribe
        path: PathBuf,
    },
    /// Submit a remote audio URL (demo backend)
    Url {
        /// URL of the audio to transcribe
        url: String,
    },
    /// Record from the microphone until ENTER, save a WAV, then transcribe
    Record,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load_or_create()?;

    match cli.command {
        Commands::Replay { path, delay_ms } => replay_command(&path, delay_ms, &config),
        Commands::File { path } => file_command(&path, &config),
        Commands::Url { url } => url_command(&url, &config),
        Commands::Record => record_command(&config),
    }
}

fn demo_backend(config: &Config) -> ScriptedBackend {
    ScriptedBackend::from_transcript(
        SAMPLE_TRANSCRIPT,
        Duration::from_millis(config.demo.fragment_delay_ms),
    )
}

fn replay_command(path: &Path, delay_ms: Option<u64>, config: &Config) -> Result<()> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read transcript file: {}", path.display()))?;

    let delay = Duration::from_millis(delay_ms.unwrap_or(config.demo.fragment_delay_ms));
    let backend = ScriptedBackend::from_transcript(&contents, delay);

    println!("Replaying {} as a fragment stream", path.display());
    run_pipeline(
        &backend,
        CapturedAudio::Url {
            value: path.display().to_string(),
        },
        config,
    )
}

fn file_command(path: &Path, config: &Config) -> Result<()> {
    let bytes = fs::read(path)
        .with_context(|| format!("Failed to read audio file: {}", path.display()))?;

    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("audio")
        .to_string();

    let file = AudioFile {
        mime_type: guess_mime(path),
        name,
        bytes,
    };

    let mut coordinator = CaptureCoordinator::new();
    let action = coordinator.select_file(file)?;

    println!("Note: dispatching to the built-in demo backend");
    dispatch(&demo_backend(config), action, config)
}

fn url_command(url: &str, config: &Config) -> Result<()> {
    let mut coordinator = CaptureCoordinator::new();
    let action = coordinator.submit_url(url)?;

    println!("Note: dispatching to the built-in demo backend");
    let result = dispatch(&demo_backend(config), action, config);
    coordinator.url_submission_finished();
    result
}

fn record_command(config: &Config) -> Result<()> {
    let mut coordinator = CaptureCoordinator::new();
    let mut device = MicrophoneDevice::open()?;

    coordinator.start_recording(&mut device)?;
    println!("🔴 Recording - press ENTER to stop");

    // Watch stdin on a side thread so the timer keeps ticking
    let (stop_tx, stop_rx) = channel();
    thread::spawn(move || {
        let mut line = String::new();
        let _ = std::io::stdin().read_line(&mut line);
        let _ = stop_tx.send(());
    });

    loop {
        if let Some(elapsed) = coordinator.recording_tick() {
            print!("\r   {}", format_elapsed(elapsed));
            std::io::stdout().flush()?;
        }
        if stop_rx.try_recv().is_ok() {
            break;
        }
        thread::sleep(Duration::from_millis(20));
    }

    let action = coordinator.stop_recording(&mut device)?;
    println!();

    if let CaptureAction::Dispatch(CapturedAudio::Blob { name, bytes, .. }) = &action {
        let recordings_dir = Config::recordings_dir()?;
        fs::create_dir_all(&recordings_dir).context("Failed to create recordings directory")?;
        let path = recordings_dir.join(name);
        fs::write(&path, bytes)
            .with_context(|| format!("Failed to save recording: {}", path.display()))?;
        println!("💾 Saved recording: {}", path.display());
    }

    println!("Note: dispatching to the built-in demo backend");
    dispatch(&demo_backend(config), action, config)
}

fn dispatch(backend: &dyn TranscriptionBackend, action: CaptureAction, config: &Config) -> Result<()> {
    match action {
        CaptureAction::Dispatch(payload) => run_pipeline(backend, payload, config),
        CaptureAction::NoAction => Ok(()),
    }
}

/// Drive one transcription run end to end: poll transport events into the
/// accumulator and print characters as the revealer exposes them
fn run_pipeline(
    backend: &dyn TranscriptionBackend,
    input: CapturedAudio,
    config: &Config,
) -> Result<()> {
    let mut accumulator = TranscriptAccumulator::new();
    let run_id = accumulator.begin_run();

    let subscription = match input {
        CapturedAudio::Url { ref value } => backend.submit_url(value, run_id)?,
        blob @ CapturedAudio::Blob { .. } => backend.submit(blob, run_id)?,
    };
    let mut subscription = Some(subscription);

    let mut revealer = Revealer::new(Duration::from_millis(config.reveal.tick_ms));
    let mut prev_cursor = 0;

    loop {
        // Drain transport events; a terminal event releases the subscription
        if let Some(sub) = &subscription {
            while let Some(event) = sub.try_next() {
                if accumulator.handle_event(sub.run_id(), event) == RunStatus::Closed {
                    subscription = None;
                    break;
                }
            }
        }

        if config.reveal.synchronous {
            // Degraded host: no timers, expose everything known immediately
            if !accumulator.is_loading() {
                revealer.observe(accumulator.committed_text(), false);
                let before = revealer.cursor();
                revealer.reveal_all(accumulator.committed_text());
                let tail: String = accumulator.committed_text().chars().skip(before).collect();
                if !tail.is_empty() {
                    print!("{}", tail);
                    std::io::stdout().flush()?;
                }
            }
        } else if let Some(c) = revealer.tick_if_due(accumulator.committed_text(), accumulator.is_loading()) {
            // A reveal restart means the transcript was replaced (error text)
            if revealer.cursor() <= prev_cursor {
                println!();
            }
            print!("{}", c);
            std::io::stdout().flush()?;
        }
        prev_cursor = revealer.cursor();

        if subscription.is_none() && revealer.is_caught_up(accumulator.committed_text()) {
            break;
        }

        thread::sleep(Duration::from_millis(2));
    }

    println!();
    match accumulator.phase() {
        RunPhase::Completed => println!("✓ Transcription complete"),
        RunPhase::Failed => bail!("transcription run failed"),
        _ => {}
    }

    Ok(())
}

fn guess_mime(path: &Path) -> String {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("mp3") => "audio/mpeg",
        Some("wav") => "audio/wav",
        Some("ogg") => "audio/ogg",
        Some("flac") => "audio/flac",
        Some("m4a") => "audio/mp4",
        Some("aac") => "audio/aac",
        _ => "application/octet-stream",
    }
    .to_string()
}
