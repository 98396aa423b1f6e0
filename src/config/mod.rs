//! Configuration management for the assistant

pub mod file;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::{Error, Result};

use file::SonyaConfigFile;

/// Default system instruction for the conversational fallback
pub const DEFAULT_SYSTEM_PROMPT: &str = "Ты интеллектуальный голосовой помощник Соня. \
Твоя задача помогать пользователю с решением разных задач, беседовать с ним на различные темы \
и управлять его делами. Важно, все цифры прописывай буквами, например не 8, а восемь. \
Помни, у тебя женский пол.";

/// Assistant configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Wake word, dispatch and conversation settings
    pub assistant: AssistantConfig,

    /// Voice configuration
    pub voice: VoiceConfig,

    /// Chat completion endpoint
    pub llm: LlmConfig,

    /// OS actions
    pub desktop: DesktopConfig,

    /// Seconds between alarm/reminder checks
    pub timer_poll: Duration,
}

/// How a command is picked from the recognized text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DispatchMode {
    /// Ordered substring rules, first match wins
    #[default]
    Rules,
    /// Best fuzzy score across the command table, above a threshold
    Table,
}

impl FromStr for DispatchMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "rules" => Ok(Self::Rules),
            "table" => Ok(Self::Table),
            other => Err(Error::Config(format!("unknown dispatch mode: {other}"))),
        }
    }
}

/// Assistant behaviour
#[derive(Debug, Clone)]
pub struct AssistantConfig {
    /// Accepted wake-word spellings, lower-case
    pub wake_words: Vec<String>,

    /// Similarity a wake word must exceed
    pub wake_threshold: u8,

    /// System instruction seeding every conversation
    pub system_prompt: String,

    /// Command selection mode
    pub dispatch: DispatchMode,

    /// Minimum score for [`DispatchMode::Table`]
    pub table_threshold: u8,

    /// Keep the conversation after a reply instead of resetting it
    pub retain_history: bool,

    /// Allow shutdown/reboot commands
    pub allow_power: bool,

    /// Greet the user on start
    pub greet: bool,
}

/// Voice processing configuration
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    /// Enable microphone input
    pub enabled: bool,

    /// Vosk model directory
    pub vosk_model: PathBuf,

    /// Piper voice config (`.onnx.json`)
    pub tts_model: PathBuf,

    /// Piper speaker id
    pub tts_speaker: Option<i64>,

    /// Frames per captured block
    pub block_size: usize,

    /// Capture queue capacity, in blocks
    pub queue_capacity: usize,

    /// Wake beep (mp3)
    pub beep: Option<PathBuf>,

    /// Extra wait after each playback
    pub settle: Duration,
}

/// Chat completion configuration
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// OpenAI-compatible base URL
    pub base_url: String,

    /// Model identifier
    pub model: String,

    /// Bearer key, if the endpoint needs one
    pub api_key: Option<String>,

    /// Request timeout
    pub timeout: Duration,
}

/// OS action configuration
#[derive(Debug, Clone)]
pub struct DesktopConfig {
    /// Page opened by the browser command
    pub browser_url: String,

    /// Page opened by the music command
    pub music_url: String,

    /// Volume step in percent
    pub volume_step: u8,

    /// Brightness step in percent
    pub brightness_step: u8,

    /// Spoken application name -> program
    pub applications: BTreeMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self::resolve(SonyaConfigFile::default(), |_| None)
    }
}

impl Config {
    /// Load configuration from the environment and the config file
    ///
    /// # Errors
    ///
    /// Returns error if an explicit config file cannot be loaded or a value is invalid
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_options(path, false)
    }

    /// Load configuration, optionally forcing voice input off
    ///
    /// # Errors
    ///
    /// Returns error if an explicit config file cannot be loaded or a value is invalid
    pub fn load_with_options(path: Option<&Path>, disable_voice: bool) -> Result<Self> {
        // env > toml > default
        let fc = file::load_config_file(path)?;

        if let Ok(mode) = std::env::var("SONYA_DISPATCH") {
            mode.parse::<DispatchMode>()?;
        }
        if let Some(mode) = fc.assistant.dispatch.as_deref() {
            mode.parse::<DispatchMode>()?;
        }

        let mut config = Self::resolve(fc, |key| std::env::var(key).ok());
        if disable_voice {
            config.voice.enabled = false;
            tracing::info!("voice input disabled, reading utterances from stdin");
        }

        config.validate()?;
        Ok(config)
    }

    /// Merge a config file with values from `env`
    ///
    /// Invalid values fall back to the next source; [`Config::load`] rejects
    /// an unknown dispatch mode before getting here.
    pub fn resolve(fc: SonyaConfigFile, env: impl Fn(&str) -> Option<String>) -> Self {
        let flag = |key: &str| env(key).map(|v| matches!(v.as_str(), "1" | "true" | "yes"));

        let wake_words = env("SONYA_WAKE_WORDS")
            .map(|s| s.split(',').map(ToString::to_string).collect())
            .or(fc.assistant.wake_words)
            .unwrap_or_else(default_wake_words)
            .into_iter()
            .map(|w| w.trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();

        let dispatch = env("SONYA_DISPATCH")
            .or(fc.assistant.dispatch)
            .and_then(|s| s.parse().ok())
            .unwrap_or_default();

        let assistant = AssistantConfig {
            wake_words,
            wake_threshold: fc.assistant.wake_threshold.unwrap_or(80),
            system_prompt: fc
                .assistant
                .system_prompt
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            dispatch,
            table_threshold: fc.assistant.table_threshold.unwrap_or(70),
            retain_history: flag("SONYA_RETAIN_HISTORY")
                .or(fc.assistant.retain_history)
                .unwrap_or(false),
            allow_power: flag("SONYA_ALLOW_POWER")
                .or(fc.assistant.allow_power)
                .unwrap_or(false),
            greet: fc.assistant.greet.unwrap_or(true),
        };

        let voice = VoiceConfig {
            enabled: fc.voice.enabled.unwrap_or(true),
            vosk_model: env("SONYA_VOSK_MODEL")
                .or(fc.voice.vosk_model)
                .unwrap_or_else(|| "./model_small_ru".to_string())
                .into(),
            tts_model: env("SONYA_TTS_MODEL")
                .or(fc.voice.tts_model)
                .unwrap_or_else(|| "./ru_RU-irina-medium.onnx.json".to_string())
                .into(),
            tts_speaker: fc.voice.tts_speaker,
            block_size: fc.voice.block_size.unwrap_or(8000),
            queue_capacity: fc.voice.queue_capacity.unwrap_or(20),
            beep: fc.voice.beep.map(PathBuf::from),
            settle: Duration::from_millis(fc.voice.settle_ms.unwrap_or(500)),
        };

        let llm = LlmConfig {
            base_url: env("SONYA_LLM_BASE_URL")
                .or(fc.llm.base_url)
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            model: env("SONYA_LLM_MODEL")
                .or(fc.llm.model)
                .unwrap_or_else(|| "gpt-4o".to_string()),
            api_key: env("OPENAI_API_KEY").or(fc.llm.api_key),
            timeout: Duration::from_secs(fc.llm.timeout_secs.unwrap_or(60)),
        };

        let desktop = DesktopConfig {
            browser_url: fc
                .desktop
                .browser_url
                .unwrap_or_else(|| "https://www.google.com".to_string()),
            music_url: fc
                .desktop
                .music_url
                .unwrap_or_else(|| "https://www.youtube.com/watch?v=dQw4w9WgXcQ".to_string()),
            volume_step: fc.desktop.volume_step.unwrap_or(5),
            brightness_step: fc.desktop.brightness_step.unwrap_or(10),
            applications: fc
                .desktop
                .applications
                .unwrap_or_else(default_applications)
                .into_iter()
                .map(|(name, program)| (name.to_lowercase(), program))
                .collect(),
        };

        Self {
            assistant,
            voice,
            llm,
            desktop,
            timer_poll: Duration::from_secs(fc.timers.poll_secs.unwrap_or(30)),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.assistant.wake_words.is_empty() {
            return Err(Error::Config("at least one wake word is required".to_string()));
        }
        if self.assistant.wake_threshold > 100 || self.assistant.table_threshold > 100 {
            return Err(Error::Config("thresholds must be within 0..=100".to_string()));
        }
        if self.voice.block_size == 0 || self.voice.queue_capacity == 0 {
            return Err(Error::Config(
                "voice.block_size and voice.queue_capacity must be positive".to_string(),
            ));
        }
        if self.timer_poll.is_zero() {
            return Err(Error::Config("timers.poll_secs must be positive".to_string()));
        }
        Ok(())
    }
}

fn default_wake_words() -> Vec<String> {
    ["соня", "сонька", "сонечка", "sonya"]
        .into_iter()
        .map(ToString::to_string)
        .collect()
}

fn default_applications() -> BTreeMap<String, String> {
    [
        ("калькулятор", "gnome-calculator"),
        ("терминал", "gnome-terminal"),
        ("блокнот", "gedit"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn defaults_match_console_assistant() {
        let config = Config::default();
        assert_eq!(
            config.assistant.wake_words,
            vec!["соня", "сонька", "сонечка", "sonya"]
        );
        assert_eq!(config.assistant.wake_threshold, 80);
        assert_eq!(config.assistant.dispatch, DispatchMode::Rules);
        assert!(!config.assistant.retain_history);
        assert!(!config.assistant.allow_power);
        assert_eq!(config.voice.queue_capacity, 20);
        assert_eq!(config.voice.block_size, 8000);
        assert_eq!(config.timer_poll, Duration::from_secs(30));
        assert_eq!(
            config.desktop.applications.get("терминал").map(String::as_str),
            Some("gnome-terminal")
        );
    }

    #[test]
    fn env_overrides_file() {
        let fc: SonyaConfigFile = toml::from_str(
            r#"
            [llm]
            model = "from-file"
            [assistant]
            retain_history = false
            "#,
        )
        .unwrap();
        let env: HashMap<&str, &str> = [
            ("SONYA_LLM_MODEL", "from-env"),
            ("SONYA_RETAIN_HISTORY", "true"),
            ("SONYA_WAKE_WORDS", " Алиса ,алиска"),
            ("SONYA_DISPATCH", "table"),
        ]
        .into_iter()
        .collect();

        let config = Config::resolve(fc, |k| env.get(k).map(ToString::to_string));
        assert_eq!(config.llm.model, "from-env");
        assert!(config.assistant.retain_history);
        assert_eq!(config.assistant.wake_words, vec!["алиса", "алиска"]);
        assert_eq!(config.assistant.dispatch, DispatchMode::Table);
    }

    #[test]
    fn dispatch_mode_parsing() {
        assert_eq!("Rules".parse::<DispatchMode>().unwrap(), DispatchMode::Rules);
        assert_eq!(" table ".parse::<DispatchMode>().unwrap(), DispatchMode::Table);
        assert!("fuzzy".parse::<DispatchMode>().is_err());
    }

    #[test]
    fn validate_rejects_empty_wake_words() {
        let mut config = Config::default();
        config.assistant.wake_words.clear();
        assert!(config.validate().is_err());
    }
}
