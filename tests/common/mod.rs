//! Shared test utilities

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use sonya::assistant::Turn;
use sonya::desktop::{Capability, Direction, PowerAction};
use sonya::voice::Speaker;
use sonya::{Assistant, ChatClient, Config, Desktop, Error, Result};

/// Speaker that records everything it is asked to say
#[derive(Default)]
pub struct RecordingSpeaker {
    said: Mutex<Vec<String>>,
    beeps: Mutex<usize>,
}

impl RecordingSpeaker {
    pub fn said(&self) -> Vec<String> {
        self.said.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<String> {
        self.said.lock().unwrap().last().cloned()
    }

    pub fn beeps(&self) -> usize {
        *self.beeps.lock().unwrap()
    }
}

#[async_trait]
impl Speaker for RecordingSpeaker {
    async fn say(&self, text: &str) -> Result<()> {
        self.said.lock().unwrap().push(text.to_string());
        Ok(())
    }

    async fn beep(&self) -> Result<()> {
        *self.beeps.lock().unwrap() += 1;
        Ok(())
    }
}

/// Chat client answering from a script and recording each request
#[derive(Default)]
pub struct ScriptedChat {
    replies: Mutex<VecDeque<Result<String>>>,
    calls: Mutex<Vec<(String, Vec<Turn>)>>,
}

impl ScriptedChat {
    pub fn reply(&self, text: &str) {
        self.replies.lock().unwrap().push_back(Ok(text.to_string()));
    }

    pub fn fail(&self, error: Error) {
        self.replies.lock().unwrap().push_back(Err(error));
    }

    pub fn calls(&self) -> Vec<(String, Vec<Turn>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatClient for ScriptedChat {
    async fn complete(&self, model: &str, turns: &[Turn]) -> Result<String> {
        self.calls
            .lock()
            .unwrap()
            .push((model.to_string(), turns.to_vec()));
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("хорошо".to_string()))
    }
}

/// Desktop that records actions instead of running them
pub struct FakeDesktop {
    supported: bool,
    failing: bool,
    actions: Mutex<Vec<String>>,
}

impl Default for FakeDesktop {
    fn default() -> Self {
        Self {
            supported: true,
            failing: false,
            actions: Mutex::new(Vec::new()),
        }
    }
}

impl FakeDesktop {
    pub fn unsupported() -> Self {
        Self {
            supported: false,
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn actions(&self) -> Vec<String> {
        self.actions.lock().unwrap().clone()
    }

    fn record(&self, action: String) -> Result<()> {
        self.actions.lock().unwrap().push(action);
        if self.failing {
            Err(Error::Desktop("simulated failure".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Desktop for FakeDesktop {
    fn supports(&self, _capability: Capability) -> bool {
        self.supported
    }

    async fn open_url(&self, url: &str) -> Result<()> {
        self.record(format!("open {url}"))
    }

    async fn adjust_volume(&self, direction: Direction, step: u8) -> Result<()> {
        self.record(format!("volume {direction:?} {step}"))
    }

    async fn adjust_brightness(&self, direction: Direction, step: u8) -> Result<()> {
        self.record(format!("brightness {direction:?} {step}"))
    }

    async fn launch(&self, program: &str) -> Result<()> {
        self.record(format!("launch {program}"))
    }

    async fn power(&self, action: PowerAction) -> Result<()> {
        self.record(format!("power {action:?}"))
    }
}

/// Assistant wired to fakes, with the fakes kept for inspection
pub struct Harness {
    pub assistant: Assistant,
    pub speaker: Arc<RecordingSpeaker>,
    pub chat: Arc<ScriptedChat>,
    pub desktop: Arc<FakeDesktop>,
}

/// Default configuration without voice or greeting
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.voice.enabled = false;
    config.assistant.greet = false;
    config.assistant.system_prompt = "seed".to_string();
    config
}

pub fn harness(config: &Config) -> Harness {
    harness_with(config, FakeDesktop::default())
}

pub fn harness_with(config: &Config, desktop: FakeDesktop) -> Harness {
    let speaker = Arc::new(RecordingSpeaker::default());
    let chat = Arc::new(ScriptedChat::default());
    let desktop = Arc::new(desktop);

    let assistant = Assistant::new(config, speaker.clone(), chat.clone(), desktop.clone())
        .expect("failed to build assistant")
        .with_input(tokio::io::empty())
        .with_seed(7);

    Harness {
        assistant,
        speaker,
        chat,
        desktop,
    }
}
