//! TOML configuration file loading
//!
//! Supports `~/.config/sonya/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::{Error, Result};

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct SonyaConfigFile {
    /// Wake word, dispatch and conversation settings
    #[serde(default)]
    pub assistant: AssistantFileConfig,

    /// Microphone, recognizer and speech settings
    #[serde(default)]
    pub voice: VoiceFileConfig,

    /// Chat completion endpoint
    #[serde(default)]
    pub llm: LlmFileConfig,

    /// OS actions
    #[serde(default)]
    pub desktop: DesktopFileConfig,

    /// Alarm/reminder polling
    #[serde(default)]
    pub timers: TimersFileConfig,
}

/// Assistant behaviour
#[derive(Debug, Default, Deserialize)]
pub struct AssistantFileConfig {
    /// Accepted wake-word spellings
    pub wake_words: Option<Vec<String>>,

    /// Similarity a wake word must exceed (0–100)
    pub wake_threshold: Option<u8>,

    /// System instruction seeding every conversation
    pub system_prompt: Option<String>,

    /// "rules" (ordered substring chain) or "table" (best fuzzy match)
    pub dispatch: Option<String>,

    /// Minimum score for the table dispatch mode
    pub table_threshold: Option<u8>,

    /// Keep the conversation after each reply instead of resetting it
    pub retain_history: Option<bool>,

    /// Allow shutdown/reboot commands
    pub allow_power: Option<bool>,

    /// Greet the user on start
    pub greet: Option<bool>,
}

/// Voice processing configuration
#[derive(Debug, Default, Deserialize)]
pub struct VoiceFileConfig {
    /// Enable microphone input
    pub enabled: Option<bool>,

    /// Path to the vosk model directory
    pub vosk_model: Option<String>,

    /// Path to the piper `.onnx.json` voice config
    pub tts_model: Option<String>,

    /// Piper speaker id for multi-speaker voices
    pub tts_speaker: Option<i64>,

    /// Frames per captured block
    pub block_size: Option<usize>,

    /// Capacity of the capture queue, in blocks
    pub queue_capacity: Option<usize>,

    /// Sound played when the wake word is heard (mp3)
    pub beep: Option<String>,

    /// Extra wait after playback, in milliseconds
    pub settle_ms: Option<u64>,
}

/// LLM-related configuration
#[derive(Debug, Default, Deserialize)]
pub struct LlmFileConfig {
    /// OpenAI-compatible base URL
    pub base_url: Option<String>,

    /// Model identifier (e.g. "gpt-4o")
    pub model: Option<String>,

    /// API key
    pub api_key: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: Option<u64>,
}

/// OS action configuration
#[derive(Debug, Default, Deserialize)]
pub struct DesktopFileConfig {
    /// Page opened by "открой браузер"
    pub browser_url: Option<String>,

    /// Page opened by "включи музыку"
    pub music_url: Option<String>,

    /// Volume step in percent
    pub volume_step: Option<u8>,

    /// Brightness step in percent
    pub brightness_step: Option<u8>,

    /// Spoken application name -> program to launch
    pub applications: Option<BTreeMap<String, String>>,
}

/// Timer service configuration
#[derive(Debug, Default, Deserialize)]
pub struct TimersFileConfig {
    /// Seconds between alarm checks
    pub poll_secs: Option<u64>,
}

/// Load the TOML config file
///
/// An explicit `path` must exist and parse. Without one the standard path is
/// tried and `SonyaConfigFile::default()` is returned if it is missing or broken.
///
/// # Errors
///
/// Returns error if an explicitly given file cannot be read or parsed
pub fn load_config_file(path: Option<&Path>) -> Result<SonyaConfigFile> {
    if let Some(path) = path {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        let config = toml::from_str(&content)?;
        tracing::info!(path = %path.display(), "loaded config file");
        return Ok(config);
    }

    let Some(path) = config_file_path() else {
        return Ok(SonyaConfigFile::default());
    };

    if !path.exists() {
        return Ok(SonyaConfigFile::default());
    }

    let config = match std::fs::read_to_string(&path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                SonyaConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            SonyaConfigFile::default()
        }
    };

    Ok(config)
}

/// Return the config file path: `~/.config/sonya/config.toml`
#[must_use]
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("sonya").join("config.toml"))
}
