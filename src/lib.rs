//! Sonya - a Russian-speaking voice assistant
//!
//! This library provides the core functionality for the assistant:
//! - Microphone capture and offline speech recognition (vosk)
//! - Fuzzy wake-word gate
//! - Ordered command rules (or a fuzzy command table) with local handlers
//! - Chat-model fallback for everything else
//! - Speech synthesis (piper) and a timer service for alarms and reminders
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │   Microphone ──► block queue ──► recognizer (vosk)    │
//! │                       or stdin lines                  │
//! └────────────────────────┬─────────────────────────────┘
//!                          │ utterance
//! ┌────────────────────────▼─────────────────────────────┐
//! │                      Assistant                        │
//! │  wake gate ─► rules / table ─► handlers ─► Desktop    │
//! │                     └──────► chat model               │
//! └───────┬────────────────────────────────┬─────────────┘
//!         │ replies                        │ alarms, reminders
//! ┌───────▼───────┐                ┌───────▼─────────────┐
//! │ Speaker (tts) │ ◄───────────── │     timer loop      │
//! └───────────────┘                └─────────────────────┘
//! ```

pub mod assistant;
pub mod chat;
pub mod config;
pub mod daemon;
pub mod desktop;
pub mod error;
pub mod fuzzy;
pub mod voice;

pub use assistant::{Assistant, Command, Outcome};
pub use chat::{ChatClient, OpenAiChat};
pub use config::Config;
pub use daemon::Daemon;
pub use desktop::{Desktop, SystemDesktop};
pub use error::{Error, Result};
