//! Audio capture from microphone
//!
//! The driver callback cuts the input into fixed-size blocks of mono 16-bit
//! PCM and pushes them into a bounded queue without ever blocking. When the
//! consumer falls behind, whole blocks are dropped.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, Stream, StreamConfig};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::{Error, Result};

/// One block of mono 16-bit samples
pub type Block = Vec<i16>;

/// Producer half of the capture queue, owned by the driver callback
pub struct BlockSink {
    tx: mpsc::Sender<Block>,
    block_size: usize,
    pending: Vec<i16>,
    dropped: Arc<AtomicU64>,
}

impl BlockSink {
    /// Create a sink that emits blocks of `block_size` samples into `tx`
    #[must_use]
    pub fn new(tx: mpsc::Sender<Block>, block_size: usize) -> Self {
        Self {
            tx,
            block_size: block_size.max(1),
            pending: Vec::with_capacity(block_size),
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Shared counter of blocks dropped because the queue was full
    #[must_use]
    pub fn dropped_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.dropped)
    }

    /// Append samples, sending every completed block
    ///
    /// Never blocks. Returns the number of blocks dropped by this call.
    pub fn push(&mut self, samples: impl IntoIterator<Item = i16>) -> usize {
        self.pending.extend(samples);

        let mut dropped = 0;
        while self.pending.len() >= self.block_size {
            let rest = self.pending.split_off(self.block_size);
            let block = std::mem::replace(&mut self.pending, rest);

            match self.tx.try_send(block) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    dropped += 1;
                    let total = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                    tracing::warn!(total, "audio queue full, dropping block");
                }
                Err(TrySendError::Closed(_)) => {
                    tracing::trace!("audio queue closed, discarding block");
                    self.pending.clear();
                    break;
                }
            }
        }
        dropped
    }
}

/// Captures audio from the default input device
pub struct AudioCapture {
    config: StreamConfig,
    sample_format: SampleFormat,
    block_size: usize,
    queue_capacity: usize,
    receiver: Option<mpsc::Receiver<Block>>,
    stream: Option<Stream>,
}

impl AudioCapture {
    /// Create a new audio capture instance at the device's default rate
    ///
    /// # Errors
    ///
    /// Returns error if audio device cannot be opened
    pub fn new(block_size: usize, queue_capacity: usize) -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_input_device()
            .ok_or_else(|| Error::Audio("no input device available".to_string()))?;

        let supported = device
            .default_input_config()
            .map_err(|e| Error::Audio(e.to_string()))?;

        let sample_format = supported.sample_format();
        let config = supported.config();

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate = config.sample_rate.0,
            channels = config.channels,
            ?sample_format,
            block_size,
            "audio capture initialized"
        );

        Ok(Self {
            config,
            sample_format,
            block_size,
            queue_capacity,
            receiver: None,
            stream: None,
        })
    }

    /// Start capturing audio
    ///
    /// # Errors
    ///
    /// Returns error if capture fails
    pub fn start(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }

        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| Error::Audio("no input device".to_string()))?;

        let (tx, rx) = mpsc::channel(self.queue_capacity);
        let mut sink = BlockSink::new(tx, self.block_size);
        let channels = usize::from(self.config.channels.max(1));
        let config = self.config.clone();

        let stream = match self.sample_format {
            SampleFormat::I16 => device.build_input_stream(
                &config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    sink.push(data.iter().step_by(channels).copied());
                },
                capture_error,
                None,
            ),
            SampleFormat::F32 => device.build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    sink.push(data.iter().step_by(channels).map(|&s| f32_to_i16(s)));
                },
                capture_error,
                None,
            ),
            other => {
                return Err(Error::Audio(format!(
                    "unsupported input sample format: {other:?}"
                )));
            }
        }
        .map_err(|e| Error::Audio(e.to_string()))?;

        stream.play().map_err(|e| Error::Audio(e.to_string()))?;
        self.stream = Some(stream);
        self.receiver = Some(rx);

        tracing::debug!("audio capture started");
        Ok(())
    }

    /// Take the consumer half of the block queue
    ///
    /// Available once per [`AudioCapture::start`].
    pub fn take_receiver(&mut self) -> Option<mpsc::Receiver<Block>> {
        self.receiver.take()
    }

    /// Stop capturing audio
    pub fn stop(&mut self) {
        if let Some(stream) = self.stream.take() {
            drop(stream);
            tracing::debug!("audio capture stopped");
        }
    }

    /// Check if currently capturing
    #[must_use]
    pub const fn is_capturing(&self) -> bool {
        self.stream.is_some()
    }

    /// Get the capture sample rate
    #[must_use]
    pub const fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }
}

fn capture_error(err: cpal::StreamError) {
    tracing::error!(error = %err, "audio capture error");
}

/// Convert f32 [-1.0, 1.0] to i16
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn f32_to_i16(sample: f32) -> i16 {
    (sample * 32767.0).clamp(-32768.0, 32767.0) as i16
}

/// RMS level of a block, 0.0–1.0
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn rms(block: &[i16]) -> f32 {
    if block.is_empty() {
        return 0.0;
    }
    let sum_squares: f32 = block
        .iter()
        .map(|&s| {
            let s = f32::from(s) / 32768.0;
            s * s
        })
        .sum();
    (sum_squares / block.len() as f32).sqrt()
}
