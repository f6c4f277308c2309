/// Audio capture coordinator for the three input modalities
///
/// File selection (picker or drag-drop), remote URL submission, and live
/// microphone recording are mutually independent entry points that all funnel
/// into a single `CapturedAudio` payload for the transcription backend.

use std::io::Cursor;
use std::sync::{Arc, Mutex};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use hound::{SampleFormat, WavSpec, WavWriter};
use thiserror::Error;

use crate::constants::recording;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("Microphone permission denied: {0}")]
    PermissionDenied(String),

    #[error("No capture device available: {0}")]
    DeviceUnavailable(String),

    #[error("No active recording session")]
    NoActiveSession,

    #[error("URL must not be empty")]
    EmptyUrl,

    #[error("A URL submission is already outstanding")]
    SubmissionPending,

    #[error("Failed to encode recording: {0}")]
    EncodingFailed(String),
}

/// Normalized payload handed to the transcription backend.
/// Constructed by the coordinator on user action, consumed exactly once.
#[derive(Debug, Clone, PartialEq)]
pub enum CapturedAudio {
    Blob {
        name: String,
        mime_type: String,
        bytes: Vec<u8>,
    },
    Url {
        value: String,
    },
}

impl CapturedAudio {
    pub fn name(&self) -> &str {
        match self {
            CapturedAudio::Blob { name, .. } => name,
            CapturedAudio::Url { value } => value,
        }
    }
}

/// A file-like object as presented by the host: declared name, declared media
/// type, and raw contents
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFile {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl AudioFile {
    fn is_audio(&self) -> bool {
        self.mime_type.starts_with("audio/")
    }
}

/// Shared buffer the capture device pushes sample chunks into
pub type ChunkSink = Arc<Mutex<Vec<Vec<f32>>>>;

/// Scoped capture device: acquired on recording start, released on every exit
/// path (normal stop, error, drop)
pub trait CaptureDevice {
    fn acquire(&mut self, sink: ChunkSink) -> Result<(), CaptureError>;
    fn release(&mut self);
    fn sample_rate(&self) -> u32;
}

/// Transient state held only while microphone capture is active
pub struct RecordingSession {
    chunks: ChunkSink,
    elapsed_secs: u64,
    last_tick: Instant,
}

impl RecordingSession {
    fn new() -> Self {
        RecordingSession {
            chunks: Arc::new(Mutex::new(Vec::new())),
            elapsed_secs: 0,
            last_tick: Instant::now(),
        }
    }

    /// Advance the elapsed-seconds counter if a full timer period has passed.
    /// Returns the new elapsed value when it changed.
    fn tick_if_due(&mut self) -> Option<u64> {
        let now = Instant::now();
        if now.duration_since(self.last_tick).as_millis() >= recording::TIMER_TICK_MS as u128 {
            self.last_tick = now;
            self.elapsed_secs += 1;
            Some(self.elapsed_secs)
        } else {
            None
        }
    }

    pub fn elapsed_secs(&self) -> u64 {
        self.elapsed_secs
    }

    /// Concatenate accumulated chunks into one WAV blob tagged with the
    /// default audio media type
    fn finalize(self, sample_rate: u32) -> Result<CapturedAudio, CaptureError> {
        let chunks = match self.chunks.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let mut samples = Vec::with_capacity(chunks.iter().map(Vec::len).sum());
        for chunk in chunks.iter() {
            samples.extend_from_slice(chunk);
        }

        let bytes = samples_to_wav(&samples, sample_rate)?;

        Ok(CapturedAudio::Blob {
            name: recording_name(),
            mime_type: recording::DEFAULT_MIME_TYPE.to_string(),
            bytes,
        })
    }
}

/// Encode f32 samples as 16-bit PCM WAV bytes in memory
pub fn samples_to_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>, CaptureError> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut buffer = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut buffer, spec)
            .map_err(|e| CaptureError::EncodingFailed(e.to_string()))?;

        for &sample in samples {
            let sample_i16 = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
            writer
                .write_sample(sample_i16)
                .map_err(|e| CaptureError::EncodingFailed(e.to_string()))?;
        }

        writer
            .finalize()
            .map_err(|e| CaptureError::EncodingFailed(e.to_string()))?;
    }

    Ok(buffer.into_inner())
}

/// Recorded blobs are named from the capture timestamp, e.g. "1724577600123.wav"
fn recording_name() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    format!("{}.wav", millis)
}

/// Render an elapsed-seconds counter as MM:SS
pub fn format_elapsed(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// Result of a coordinator operation: either a payload to hand to the
/// dispatch point, or nothing
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureAction {
    Dispatch(CapturedAudio),
    NoAction,
}

/// Owns the mutable capture-side UI state: current file selection, outstanding
/// URL submission flag, and the active recording session (at most one)
#[derive(Default)]
pub struct CaptureCoordinator {
    selected_file: Option<AudioFile>,
    url_submission_pending: bool,
    session: Option<RecordingSession>,
}

impl CaptureCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept a file selection. Non-audio declared media types are rejected
    /// with no state change and no dispatch.
    pub fn select_file(&mut self, file: AudioFile) -> Result<CaptureAction, CaptureError> {
        if !file.is_audio() {
            return Err(CaptureError::UnsupportedMediaType(file.mime_type.clone()));
        }

        let payload = CapturedAudio::Blob {
            name: file.name.clone(),
            mime_type: file.mime_type.clone(),
            bytes: file.bytes.clone(),
        };
        self.selected_file = Some(file);

        Ok(CaptureAction::Dispatch(payload))
    }

    /// Handle a drop event. Only the first entry counts; the rest are ignored
    /// silently, as is a drop with no files or a non-audio first file.
    pub fn drop_files(&mut self, files: Vec<AudioFile>) -> CaptureAction {
        let Some(first) = files.into_iter().next() else {
            return CaptureAction::NoAction;
        };

        match self.select_file(first) {
            Ok(action) => action,
            Err(_) => CaptureAction::NoAction,
        }
    }

    /// Submit a remote URL. Refused while a previous submission is still
    /// outstanding; the caller signals completion via `url_submission_finished`.
    pub fn submit_url(&mut self, url: &str) -> Result<CaptureAction, CaptureError> {
        if self.url_submission_pending {
            return Err(CaptureError::SubmissionPending);
        }

        let trimmed = url.trim();
        if trimmed.is_empty() {
            return Err(CaptureError::EmptyUrl);
        }

        self.url_submission_pending = true;
        Ok(CaptureAction::Dispatch(CapturedAudio::Url {
            value: trimmed.to_string(),
        }))
    }

    pub fn url_submission_finished(&mut self) {
        self.url_submission_pending = false;
    }

    /// Begin a recording session on the given device. If acquisition fails,
    /// no session is created and prior state is unchanged.
    pub fn start_recording(&mut self, device: &mut dyn CaptureDevice) -> Result<(), CaptureError> {
        if self.session.is_some() {
            return Ok(()); // Already recording
        }

        let session = RecordingSession::new();
        device.acquire(Arc::clone(&session.chunks))?;
        self.session = Some(session);

        Ok(())
    }

    /// Finalize the active session into one WAV blob. The device is released
    /// before encoding so an encode failure cannot leak it.
    pub fn stop_recording(
        &mut self,
        device: &mut dyn CaptureDevice,
    ) -> Result<CaptureAction, CaptureError> {
        let session = self.session.take().ok_or(CaptureError::NoActiveSession)?;
        let sample_rate = device.sample_rate();

        device.release();

        let blob = session.finalize(sample_rate)?;
        Ok(CaptureAction::Dispatch(blob))
    }

    pub fn is_recording(&self) -> bool {
        self.session.is_some()
    }

    /// Drive the 1 Hz recording timer; returns the new elapsed-seconds value
    /// when it advanced
    pub fn recording_tick(&mut self) -> Option<u64> {
        self.session.as_mut().and_then(RecordingSession::tick_if_due)
    }

    /// Discard the current file selection without side effects to the backend
    pub fn clear_selection(&mut self) {
        self.selected_file = None;
    }

    pub fn selected_file(&self) -> Option<&AudioFile> {
        self.selected_file.as_ref()
    }
}
