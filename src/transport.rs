/// Transport abstraction over the external transcription backend
///
/// A run is a finite stream of events ending in exactly one `Completed` or
/// `Error`. The consuming side never learns whether the backend streamed
/// fragments incrementally or answered in one shot: a one-shot result is a run
/// with a single fragment followed by completion.

use std::sync::mpsc::{channel, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::Result;

use crate::capture::CapturedAudio;

#[derive(Debug, Clone, PartialEq)]
pub enum TranscriptEvent {
    /// One incremental piece of transcribed text
    Fragment(String),
    /// Informational progress, observed for logging only
    Progress(f64),
    /// Terminal: the run finished normally
    Completed,
    /// Terminal: explicit error payload from the backend
    Error(String),
}

impl TranscriptEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TranscriptEvent::Completed | TranscriptEvent::Error(_))
    }
}

/// Run-tagged, non-blocking receiver of transport events, polled from the
/// main event loop
pub struct RunSubscription {
    run_id: u64,
    events: Receiver<TranscriptEvent>,
}

impl RunSubscription {
    pub fn new(run_id: u64, events: Receiver<TranscriptEvent>) -> Self {
        RunSubscription { run_id, events }
    }

    pub fn run_id(&self) -> u64 {
        self.run_id
    }

    /// Poll for the next event without blocking. A channel that disconnects
    /// before delivering a terminal event is a transport failure and surfaces
    /// as an error event.
    pub fn try_next(&self) -> Option<TranscriptEvent> {
        match self.events.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(TranscriptEvent::Error(
                "transport closed unexpectedly".to_string(),
            )),
        }
    }
}

/// The two abstract operations the backend is reachable through
pub trait TranscriptionBackend {
    fn submit(&self, input: CapturedAudio, run_id: u64) -> Result<RunSubscription>;
    fn submit_url(&self, url: &str, run_id: u64) -> Result<RunSubscription>;
}

/// Adapts a blocking request/response transcription call into the event
/// stream: one fragment with the entire transcript, then completion
pub struct OneShotBackend<F> {
    transcribe: Arc<F>,
}

impl<F> OneShotBackend<F>
where
    F: Fn(CapturedAudio) -> Result<String, String> + Send + Sync + 'static,
{
    pub fn new(transcribe: F) -> Self {
        OneShotBackend {
            transcribe: Arc::new(transcribe),
        }
    }
}

impl<F> TranscriptionBackend for OneShotBackend<F>
where
    F: Fn(CapturedAudio) -> Result<String, String> + Send + Sync + 'static,
{
    fn submit(&self, input: CapturedAudio, run_id: u64) -> Result<RunSubscription> {
        let (tx, rx) = channel();
        let transcribe = Arc::clone(&self.transcribe);

        thread::spawn(move || match transcribe(input) {
            Ok(text) => {
                let _ = tx.send(TranscriptEvent::Fragment(text));
                let _ = tx.send(TranscriptEvent::Completed);
            }
            Err(e) => {
                let _ = tx.send(TranscriptEvent::Error(e));
            }
        });

        Ok(RunSubscription::new(run_id, rx))
    }

    fn submit_url(&self, url: &str, run_id: u64) -> Result<RunSubscription> {
        self.submit(
            CapturedAudio::Url {
                value: url.to_string(),
            },
            run_id,
        )
    }
}

/// Replays a prepared event script on a worker thread with a fixed delay
/// before each fragment. Drives the demo CLI and integration tests.
#[derive(Clone)]
pub struct ScriptedBackend {
    script: Vec<TranscriptEvent>,
    fragment_delay: Duration,
}

impl ScriptedBackend {
    pub fn new(script: Vec<TranscriptEvent>, fragment_delay: Duration) -> Self {
        ScriptedBackend {
            script,
            fragment_delay,
        }
    }

    /// Build a script that streams a transcript one word per fragment
    pub fn from_transcript(text: &str, fragment_delay: Duration) -> Self {
        let mut script: Vec<TranscriptEvent> = text
            .split_whitespace()
            .map(|word| TranscriptEvent::Fragment(word.to_string()))
            .collect();
        script.push(TranscriptEvent::Completed);
        ScriptedBackend::new(script, fragment_delay)
    }

    fn replay(&self, run_id: u64) -> RunSubscription {
        let (tx, rx) = channel();
        let script = self.script.clone();
        let delay = self.fragment_delay;

        thread::spawn(move || {
            Self::replay_loop(script, delay, tx);
        });

        RunSubscription::new(run_id, rx)
    }

    fn replay_loop(script: Vec<TranscriptEvent>, delay: Duration, tx: Sender<TranscriptEvent>) {
        for event in script {
            if let TranscriptEvent::Fragment(_) = event {
                thread::sleep(delay);
            }
            if tx.send(event).is_err() {
                // Subscriber dropped: the run was cancelled
                break;
            }
        }
    }
}

impl TranscriptionBackend for ScriptedBackend {
    fn submit(&self, _input: CapturedAudio, run_id: u64) -> Result<RunSubscription> {
        Ok(self.replay(run_id))
    }

    fn submit_url(&self, _url: &str, run_id: u64) -> Result<RunSubscription> {
        Ok(self.replay(run_id))
    }
}
