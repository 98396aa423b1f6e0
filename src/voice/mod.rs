//! Voice processing module
//!
//! Handles audio capture, speech recognition, wake word detection,
//! speech synthesis and playback.

mod capture;
mod playback;
mod stt;
mod tts;
mod wake_word;

pub use capture::{AudioCapture, Block, BlockSink, f32_to_i16, rms};
pub use playback::{AudioPlayback, decode_mp3};
pub use stt::SpeechRecognizer;
pub use tts::{ConsoleSpeaker, PiperSpeaker, Speaker, SpeakingFlag, TrackedSpeaker};
pub use wake_word::WakeWordDetector;
