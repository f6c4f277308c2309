/// cpal-backed microphone capture device
///
/// Pushes mono sample chunks into the coordinator's sink as the host delivers
/// them. The stream is the scoped resource: released on stop and on drop.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Stream, StreamConfig};

use crate::capture::{CaptureDevice, CaptureError, ChunkSink};

pub struct MicrophoneDevice {
    device: Device,
    config: StreamConfig,
    stream: Option<Stream>,
}

impl MicrophoneDevice {
    pub fn open() -> Result<Self, CaptureError> {
        let host = cpal::default_host();

        let device = host
            .default_input_device()
            .ok_or_else(|| CaptureError::DeviceUnavailable("No input device available".to_string()))?;

        let name = device.name().unwrap_or_else(|_| "unknown".to_string());
        println!("Using audio input device: {}", name);

        let default_config = device
            .default_input_config()
            .map_err(|e| CaptureError::DeviceUnavailable(format!("No default input config: {}", e)))?;

        let config: StreamConfig = default_config.into();
        println!(
            "Audio config: {} channels, {} Hz",
            config.channels, config.sample_rate.0
        );

        Ok(MicrophoneDevice {
            device,
            config,
            stream: None,
        })
    }
}

impl CaptureDevice for MicrophoneDevice {
    fn acquire(&mut self, sink: ChunkSink) -> Result<(), CaptureError> {
        if self.stream.is_some() {
            return Ok(()); // Already capturing
        }

        let channels = self.config.channels as usize;

        let err_fn = |err| eprintln!("Audio stream error: {}", err);

        let stream = self
            .device
            .build_input_stream(
                &self.config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    // Handle poisoned mutex gracefully in the audio callback
                    let Ok(mut chunks) = sink.lock() else {
                        eprintln!("Chunk sink mutex poisoned, dropping audio data");
                        return;
                    };

                    // Convert to mono if needed and store as one chunk
                    let chunk: Vec<f32> = if channels == 1 {
                        data.to_vec()
                    } else {
                        data.chunks(channels)
                            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
                            .collect()
                    };

                    chunks.push(chunk);
                },
                err_fn,
                None,
            )
            .map_err(|e| match e {
                cpal::BuildStreamError::DeviceNotAvailable => {
                    CaptureError::DeviceUnavailable("Input device disappeared".to_string())
                }
                other => CaptureError::PermissionDenied(format!(
                    "Failed to open input stream: {}.\n\
                     This is likely a microphone permissions issue.\n\
                     Grant microphone access to your terminal and retry.",
                    other
                )),
            })?;

        stream
            .play()
            .map_err(|e| CaptureError::DeviceUnavailable(format!("Failed to start stream: {}", e)))?;

        self.stream = Some(stream);
        println!("Recording started");

        Ok(())
    }

    fn release(&mut self) {
        if let Some(stream) = self.stream.take() {
            drop(stream);
            println!("Recording stopped");
        }
    }

    fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }
}

impl Drop for MicrophoneDevice {
    fn drop(&mut self) {
        self.release();
    }
}
