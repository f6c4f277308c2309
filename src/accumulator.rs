/// Transcript stream accumulator: one transcription run as a state machine
///
/// `Idle → Running → {Completed, Failed}`. Fragments append to the running
/// transcript in delivery order; progress events are logged only; a terminal
/// event closes the run and stale or post-terminal events are ignored.
///
/// The accumulator never learns whether the transport streamed or answered in
/// one shot — a one-shot result is a run with exactly one fragment followed by
/// completion.

use crate::transport::TranscriptEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    Running,
    Completed,
    Failed,
}

/// Whether the run still accepts events after the one just handled.
/// `Closed` tells the caller to drop the transport subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Open,
    Closed,
}

pub struct TranscriptAccumulator {
    /// Running transcript, append-only within a run
    committed_text: String,

    /// True from run start until the first fragment or a terminal event
    is_loading: bool,

    phase: RunPhase,

    /// ID of the run currently accepting events
    active_run: Option<u64>,

    /// Counter for generating unique run IDs
    next_run_id: u64,
}

impl Default for TranscriptAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl TranscriptAccumulator {
    pub fn new() -> Self {
        TranscriptAccumulator {
            committed_text: String::new(),
            is_loading: false,
            phase: RunPhase::Idle,
            active_run: None,
            next_run_id: 1,
        }
    }

    /// Start a new run: resets the transcript, invalidates any previous run's
    /// ID (its late events will be ignored), and returns the fresh run ID.
    pub fn begin_run(&mut self) -> u64 {
        let run_id = self.next_run_id;
        self.next_run_id = self.next_run_id.wrapping_add(1);

        self.active_run = Some(run_id);
        self.committed_text.clear();
        self.is_loading = true;
        self.phase = RunPhase::Running;

        run_id
    }

    /// Feed one transport event into the run identified by `run_id`.
    /// Events for a stale run or after a terminal event are ignored.
    pub fn handle_event(&mut self, run_id: u64, event: TranscriptEvent) -> RunStatus {
        if self.active_run != Some(run_id) {
            return RunStatus::Closed;
        }

        match event {
            TranscriptEvent::Fragment(text) => {
                self.is_loading = false;

                if !text.is_empty() {
                    if !self.committed_text.is_empty() {
                        self.committed_text.push(' ');
                    }
                    self.committed_text.push_str(&text);
                }

                RunStatus::Open
            }
            TranscriptEvent::Progress(progress) => {
                // Observed for logging only, never mutates the transcript
                println!("⏳ Run {}: progress {:.0}%", run_id, progress);
                RunStatus::Open
            }
            TranscriptEvent::Completed => {
                self.is_loading = false;
                self.phase = RunPhase::Completed;
                self.active_run = None;
                println!(
                    "✓ Run {} complete ({} chars)",
                    run_id,
                    self.committed_text.chars().count()
                );
                RunStatus::Closed
            }
            TranscriptEvent::Error(message) => {
                // Partial transcript is discarded in favor of the error message
                eprintln!("❌ Run {} failed: {}", run_id, message);
                self.committed_text = format!("Error: {}", message);
                self.is_loading = false;
                self.phase = RunPhase::Failed;
                self.active_run = None;
                RunStatus::Closed
            }
        }
    }

    pub fn committed_text(&self) -> &str {
        &self.committed_text
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }
}
