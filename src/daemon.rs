//! Daemon - the main assistant service
//!
//! Runs the utterance loop (microphone + recognizer, or stdin lines when
//! voice is off) and the timer loop side by side until Ctrl-C or the end of
//! input. Both loops watch the same shutdown signal and the daemon waits
//! for the timer loop before returning.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use tokio::sync::watch;

use crate::assistant::{Assistant, SharedTimers, fire_due};
use crate::voice::{AudioCapture, SpeakingFlag, SpeechRecognizer, Speaker, TrackedSpeaker};
use crate::{Config, Error, Result};

/// The Sonya daemon
pub struct Daemon {
    config: Config,
    assistant: Assistant,
    shutdown: Arc<watch::Sender<bool>>,
    announcing: SpeakingFlag,
}

impl Daemon {
    /// Create a daemon around a ready assistant
    #[must_use]
    pub fn new(config: Config, assistant: Assistant) -> Self {
        let (shutdown, _) = watch::channel(false);
        let assistant = assistant.with_shutdown(shutdown.subscribe());
        Self {
            config,
            assistant,
            shutdown: Arc::new(shutdown),
            announcing: SpeakingFlag::default(),
        }
    }

    /// Sender that stops the daemon when `true` is sent
    #[must_use]
    pub fn shutdown_handle(&self) -> Arc<watch::Sender<bool>> {
        Arc::clone(&self.shutdown)
    }

    /// Run until interrupted or input ends
    ///
    /// # Errors
    ///
    /// Returns error if the microphone or the recognizer cannot be started
    #[allow(clippy::future_not_send)]
    pub async fn run(mut self) -> Result<()> {
        let ctrl_c = Arc::clone(&self.shutdown);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("shutdown requested");
                ctrl_c.send_replace(true);
            }
        });

        if self.config.assistant.greet {
            self.assistant.greet().await;
        }

        let announcer = TrackedSpeaker::new(self.assistant.speaker(), self.announcing.clone());
        let timer_task = tokio::spawn(run_timer_loop(
            self.assistant.timers(),
            Arc::new(announcer),
            self.config.timer_poll,
            self.shutdown.subscribe(),
        ));

        let mut shutdown_rx = self.shutdown.subscribe();

        // cpal streams aren't Send, so the voice loop stays on this task
        let result = if self.config.voice.enabled {
            self.run_voice_loop(&mut shutdown_rx).await
        } else {
            tracing::info!("voice disabled, type utterances on stdin");
            self.run_text_loop(&mut shutdown_rx).await
        };

        self.shutdown.send_replace(true);
        if let Err(e) = timer_task.await {
            tracing::warn!(error = %e, "timer loop did not stop cleanly");
        }

        tracing::info!("daemon stopped");
        result
    }

    /// Microphone blocks through the recognizer into the assistant
    #[allow(clippy::future_not_send)]
    async fn run_voice_loop(&mut self, shutdown_rx: &mut watch::Receiver<bool>) -> Result<()> {
        let voice = &self.config.voice;
        let mut capture = AudioCapture::new(voice.block_size, voice.queue_capacity)?;
        let mut recognizer = open_recognizer(&voice.vosk_model, capture.sample_rate())?;

        capture.start()?;
        let mut blocks = capture
            .take_receiver()
            .ok_or_else(|| Error::Audio("capture queue already taken".to_string()))?;

        tracing::info!(
            wake_words = ?self.assistant.detector().wake_words(),
            "listening for wake word"
        );

        let mut muted = false;
        loop {
            let block = tokio::select! {
                _ = shutdown_rx.changed() => break,
                block = blocks.recv() => block,
            };
            let Some(block) = block else {
                tracing::warn!("audio stream ended");
                break;
            };

            // An alarm or reminder is being announced
            if self.announcing.is_speaking() {
                muted = true;
                continue;
            }
            if muted {
                muted = false;
                recognizer.reset();
                tracing::trace!("discarded blocks captured during announcement");
            }

            let text = match tokio::task::block_in_place(|| recognizer.accept(&block)) {
                Ok(Some(text)) if !text.is_empty() => text,
                Ok(_) => continue,
                Err(e) => {
                    tracing::error!(error = %e, "recognition error");
                    continue;
                }
            };

            self.assistant.hear(&text).await;

            // Drop what was captured while replying so the assistant does not hear itself
            let mut stale = 0usize;
            while blocks.try_recv().is_ok() {
                stale += 1;
            }
            recognizer.reset();
            tracing::trace!(stale, "discarded blocks captured during reply");
        }

        capture.stop();
        Ok(())
    }

    /// One stdin line per utterance
    async fn run_text_loop(&mut self, shutdown_rx: &mut watch::Receiver<bool>) -> Result<()> {
        loop {
            let line = tokio::select! {
                _ = shutdown_rx.changed() => break,
                line = self.assistant.read_line() => line?,
            };
            let Some(line) = line else {
                tracing::info!("end of input");
                break;
            };
            self.assistant.hear(&line).await;
        }
        Ok(())
    }
}

fn open_recognizer(model: &Path, sample_rate: u32) -> Result<SpeechRecognizer> {
    tracing::info!(model = %model.display(), sample_rate, "loading speech model");
    SpeechRecognizer::new(model, sample_rate)
}

/// Announce due alarms and reminders every `poll` until shutdown
pub async fn run_timer_loop(
    timers: SharedTimers,
    speaker: Arc<dyn Speaker>,
    poll: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut interval = tokio::time::interval(poll);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => break,
            _ = interval.tick() => {
                let fired = fire_due(&timers, speaker.as_ref(), Local::now()).await;
                if fired > 0 {
                    tracing::debug!(fired, "timers announced");
                }
            }
        }
    }

    tracing::debug!("timer loop stopped");
}
