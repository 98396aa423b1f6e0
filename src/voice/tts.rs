//! Spoken replies
//!
//! [`Speaker`] is the seam the assistant talks through. [`PiperSpeaker`]
//! synthesizes with a local piper voice and plays through [`AudioPlayback`];
//! [`ConsoleSpeaker`] prints instead.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use piper_rs::synth::PiperSpeechSynthesizer;
use tokio::sync::Mutex;

use super::playback::{AudioPlayback, decode_mp3};
use crate::{Error, Result};

/// Fallback rate when the voice config does not report one
const DEFAULT_SAMPLE_RATE: u32 = 22050;

/// Something that can say a reply out loud
#[async_trait]
pub trait Speaker: Send + Sync {
    /// Say `text`, returning once it has been played
    async fn say(&self, text: &str) -> Result<()>;

    /// Short acknowledgement sound after the wake word
    async fn beep(&self) -> Result<()> {
        Ok(())
    }
}

/// Local piper text-to-speech
pub struct PiperSpeaker {
    synth: Arc<PiperSpeechSynthesizer>,
    sample_rate: u32,
    playback: AudioPlayback,
    beep: Option<Arc<(Vec<f32>, u32)>>,
    // One clip at a time: the timer task and the dispatcher share the speaker
    turn: Mutex<()>,
}

impl PiperSpeaker {
    /// Load a piper voice from its `.onnx.json` config
    ///
    /// # Errors
    ///
    /// Returns error if the voice or the beep file cannot be loaded
    pub fn new(
        config_path: &Path,
        speaker: Option<i64>,
        beep_path: Option<&Path>,
        playback: AudioPlayback,
    ) -> Result<Self> {
        let model = piper_rs::from_config_path(config_path)
            .map_err(|e| Error::Tts(format!("{}: {e:?}", config_path.display())))?;

        if let Some(sid) = speaker {
            let outcome = model.set_speaker(sid);
            tracing::debug!(speaker = sid, ?outcome, "piper speaker selected");
        }

        let sample_rate = model
            .audio_output_info()
            .ok()
            .and_then(|info| u32::try_from(info.sample_rate).ok())
            .unwrap_or(DEFAULT_SAMPLE_RATE);

        let synth = PiperSpeechSynthesizer::new(model).map_err(piper_error)?;

        let beep = match beep_path {
            Some(path) => {
                let bytes = std::fs::read(path)?;
                Some(Arc::new(decode_mp3(&bytes)?))
            }
            None => None,
        };

        tracing::info!(voice = %config_path.display(), sample_rate, "tts ready");

        Ok(Self {
            synth: Arc::new(synth),
            sample_rate,
            playback,
            beep,
            turn: Mutex::new(()),
        })
    }

    async fn play(&self, samples: Vec<f32>, sample_rate: u32) -> Result<()> {
        let playback = self.playback.clone();
        tokio::task::spawn_blocking(move || playback.play_blocking(&samples, sample_rate))
            .await
            .map_err(|e| Error::Audio(e.to_string()))?
    }
}

#[async_trait]
impl Speaker for PiperSpeaker {
    async fn say(&self, text: &str) -> Result<()> {
        let text = text.trim().to_string();
        if text.is_empty() {
            return Ok(());
        }

        let _turn = self.turn.lock().await;
        tracing::debug!(text, "speaking");

        let synth = Arc::clone(&self.synth);
        let samples = tokio::task::spawn_blocking(move || -> Result<Vec<f32>> {
            let stream = synth
                .synthesize_parallel(text, None)
                .map_err(piper_error)?;
            let mut samples = Vec::new();
            for chunk in stream {
                samples.extend(chunk.map_err(piper_error)?.into_vec());
            }
            Ok(samples)
        })
        .await
        .map_err(|e| Error::Tts(e.to_string()))??;

        self.play(samples, self.sample_rate).await
    }

    async fn beep(&self) -> Result<()> {
        let Some(beep) = &self.beep else {
            return Ok(());
        };
        let _turn = self.turn.lock().await;
        let (samples, rate) = beep.as_ref();
        self.play(samples.clone(), *rate).await
    }
}

fn piper_error(e: impl std::fmt::Debug) -> Error {
    Error::Tts(format!("{e:?}"))
}

/// Prints replies to stdout
#[derive(Debug, Default, Clone)]
pub struct ConsoleSpeaker {
    name: String,
}

impl ConsoleSpeaker {
    /// Create a console speaker labelling lines with `name`
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl Speaker for ConsoleSpeaker {
    async fn say(&self, text: &str) -> Result<()> {
        println!("[{}]: {text}", self.name);
        Ok(())
    }
}

/// Raised while a [`TrackedSpeaker`] is playing something
#[derive(Debug, Clone, Default)]
pub struct SpeakingFlag(Arc<AtomicUsize>);

impl SpeakingFlag {
    #[must_use]
    pub fn is_speaking(&self) -> bool {
        self.0.load(Ordering::Acquire) > 0
    }

    fn raise(&self) -> Lowered<'_> {
        self.0.fetch_add(1, Ordering::AcqRel);
        Lowered(&self.0)
    }
}

/// Lowers the flag when the clip is done, failed or was cancelled
struct Lowered<'a>(&'a AtomicUsize);

impl Drop for Lowered<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Speaker that raises a [`SpeakingFlag`] while the inner speaker talks
///
/// Lets the capture loop ignore audio of announcements it did not start.
pub struct TrackedSpeaker {
    inner: Arc<dyn Speaker>,
    flag: SpeakingFlag,
}

impl TrackedSpeaker {
    #[must_use]
    pub fn new(inner: Arc<dyn Speaker>, flag: SpeakingFlag) -> Self {
        Self { inner, flag }
    }
}

#[async_trait]
impl Speaker for TrackedSpeaker {
    async fn say(&self, text: &str) -> Result<()> {
        let _speaking = self.flag.raise();
        self.inner.say(text).await
    }

    async fn beep(&self) -> Result<()> {
        let _speaking = self.flag.raise();
        self.inner.beep().await
    }
}
