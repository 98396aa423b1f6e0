use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use sonya::voice::{AudioCapture, AudioPlayback, ConsoleSpeaker, PiperSpeaker, Speaker, rms};
use sonya::{Assistant, Config, Daemon, OpenAiChat, SystemDesktop};

/// Sonya - Russian-speaking voice assistant
#[derive(Parser)]
#[command(name = "sonya", version, about)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Config file (defaults to the platform config dir)
    #[arg(short, long, env = "SONYA_CONFIG")]
    config: Option<PathBuf>,

    /// Read utterances from stdin instead of the microphone
    #[arg(long, env = "SONYA_DISABLE_VOICE")]
    disable_voice: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
#[allow(clippy::enum_variant_names)]
enum Command {
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Test speaker output
    TestSpeaker,
    /// Test TTS output
    TestTts {
        /// Text to speak
        #[arg(default_value = "Привет! Это проверка синтеза речи.")]
        text: String,
    },
    /// Handle one utterance as if it had been heard, then exit
    Say {
        /// Utterance, including the wake word
        utterance: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,sonya=info",
        1 => "info,sonya=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

#[allow(clippy::future_not_send)]
async fn run(cli: Cli) -> anyhow::Result<()> {
    let config_path = cli.config.as_deref();

    // Handle subcommands
    if let Some(cmd) = cli.command {
        return match cmd {
            Command::TestMic { duration } => test_mic(config_path, duration).await,
            Command::TestSpeaker => test_speaker().await,
            Command::TestTts { text } => test_tts(config_path, &text).await,
            Command::Say { utterance } => say(config_path, &utterance).await,
        };
    }

    tracing::info!(disable_voice = cli.disable_voice, "starting sonya");

    let config = Config::load_with_options(config_path, cli.disable_voice)?;
    tracing::debug!(?config, "loaded configuration");

    let assistant = build_assistant(&config)?;
    tracing::info!(
        wake_words = ?config.assistant.wake_words,
        dispatch = ?config.assistant.dispatch,
        "sonya ready"
    );

    // Run until interrupted
    Daemon::new(config, assistant).run().await?;

    Ok(())
}

fn build_assistant(config: &Config) -> anyhow::Result<Assistant> {
    let speaker = build_speaker(config);
    let chat = OpenAiChat::new(
        config.llm.base_url.clone(),
        config.llm.api_key.clone(),
        config.llm.timeout,
    )?;

    Ok(Assistant::new(
        config,
        speaker,
        Arc::new(chat),
        Arc::new(SystemDesktop::new()),
    )?)
}

/// Piper voice, or the console when it cannot be loaded
fn build_speaker(config: &Config) -> Arc<dyn Speaker> {
    let voice = &config.voice;
    match PiperSpeaker::new(
        &voice.tts_model,
        voice.tts_speaker,
        voice.beep.as_deref(),
        AudioPlayback::new(voice.settle),
    ) {
        Ok(speaker) => Arc::new(speaker),
        Err(e) => {
            tracing::warn!(error = %e, "tts unavailable, printing replies instead");
            Arc::new(ConsoleSpeaker::new("Соня"))
        }
    }
}

/// Handle a single utterance without starting the daemon
async fn say(config_path: Option<&std::path::Path>, utterance: &str) -> anyhow::Result<()> {
    let config = Config::load_with_options(config_path, true)?;
    let mut assistant = build_assistant(&config)?;
    let outcome = assistant.hear(utterance).await;
    println!("{outcome:?}");
    Ok(())
}

/// Test microphone input
#[allow(clippy::future_not_send)]
async fn test_mic(config_path: Option<&std::path::Path>, duration: u64) -> anyhow::Result<()> {
    println!("Testing microphone for {duration} seconds...");
    println!("Speak into your microphone!\n");

    let config = Config::load(config_path)?;
    let mut capture = AudioCapture::new(config.voice.block_size, config.voice.queue_capacity)?;
    capture.start()?;
    let mut blocks = capture
        .take_receiver()
        .ok_or_else(|| anyhow::anyhow!("capture queue unavailable"))?;

    let sample_rate = capture.sample_rate();
    println!("Sample rate: {sample_rate} Hz");
    println!("---");

    let deadline = Instant::now() + Duration::from_secs(duration);
    let mut index = 0u32;
    while let Ok(Some(block)) = tokio::time::timeout_at(deadline.into(), blocks.recv()).await {
        index += 1;
        let energy = rms(&block);
        let peak = block.iter().map(|s| s.unsigned_abs()).max().unwrap_or(0);

        // Visual meter
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let meter_len = (energy * 100.0).min(50.0) as usize;
        let meter: String = "█".repeat(meter_len) + &" ".repeat(50 - meter_len);

        println!("[{index:3}] RMS: {energy:.4} | Peak: {peak:5} | [{meter}]");
    }

    capture.stop();

    println!("\n---");
    println!("If you saw movement in the meter, your mic is working!");
    println!("If RMS stayed near 0, check:");
    println!("  1. Is your mic plugged in?");
    println!("  2. Run: pactl info | grep 'Default Source'");
    println!("  3. Run: arecord -l (to list devices)");
    println!("  4. Try: pavucontrol (to check levels)");

    Ok(())
}

/// Test speaker output with a sine wave
async fn test_speaker() -> anyhow::Result<()> {
    println!("Testing speaker output...");
    println!("You should hear a 440Hz tone for 2 seconds\n");

    // Generate 2 seconds of 440Hz sine wave at 24kHz sample rate
    let sample_rate = 24000_u32;
    let frequency = 440.0_f32;
    let duration_secs = 2.0_f32;
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let num_samples = (sample_rate as f32 * duration_secs) as usize;

    #[allow(clippy::cast_precision_loss)]
    let samples: Vec<f32> = (0..num_samples)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            (2.0 * std::f32::consts::PI * frequency * t).sin() * 0.3 // 30% volume
        })
        .collect();

    println!("Playing {} samples at {} Hz...", samples.len(), sample_rate);

    let playback = AudioPlayback::new(Duration::ZERO);
    tokio::task::spawn_blocking(move || playback.play_blocking(&samples, sample_rate)).await??;

    println!("\n---");
    println!("If you heard the tone, your speakers are working!");
    println!("If you didn't hear anything, check:");
    println!("  1. Run: pactl info | grep 'Default Sink'");
    println!("  2. Run: pactl list sinks short");
    println!("  3. Try: pavucontrol (to check output levels)");

    Ok(())
}

/// Test TTS output with the configured piper voice
async fn test_tts(config_path: Option<&std::path::Path>, text: &str) -> anyhow::Result<()> {
    println!("Testing TTS with text: \"{text}\"\n");

    let config = Config::load(config_path)?;
    println!("Loading voice {}...", config.voice.tts_model.display());

    let speaker = PiperSpeaker::new(
        &config.voice.tts_model,
        config.voice.tts_speaker,
        config.voice.beep.as_deref(),
        AudioPlayback::new(config.voice.settle),
    )?;

    println!("Playing beep...");
    speaker.beep().await?;
    println!("Speaking...");
    speaker.say(text).await?;

    println!("\n---");
    println!("If you heard the speech, TTS is working!");

    Ok(())
}
