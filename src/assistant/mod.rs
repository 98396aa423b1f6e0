//! The assistant: wake-word gate, command dispatch and chat fallback
//!
//! [`Assistant::hear`] takes one recognized utterance. Without a wake word
//! nothing happens. With one, the wake word is stripped and the rest is
//! matched against the command table; unmatched text goes to the chat model.
//! Every reply is logged and spoken through the [`Speaker`].

pub mod commands;
pub mod game;
pub mod parse;
pub mod timers;
pub mod transcript;

use std::io::Write;
use std::sync::Arc;

use chrono::{Datelike, Local, Timelike};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio::sync::watch;

pub use commands::{Command, RULES, match_rules, match_table};
pub use game::{Guess, GuessGame};
pub use timers::{Alarm, Fired, Reminder, SharedTimers, Timers, fire_due};
pub use transcript::{HistoryPolicy, Role, Transcript, Turn};

use crate::chat::ChatClient;
use crate::config::{Config, DesktopConfig, DispatchMode};
use crate::desktop::{Capability, Desktop, Direction, PowerAction};
use crate::voice::{Speaker, WakeWordDetector};
use crate::{Error, Result};

/// Weekday names, Monday first
pub const WEEKDAYS: [&str; 7] = [
    "понедельник",
    "вторник",
    "среда",
    "четверг",
    "пятница",
    "суббота",
    "воскресенье",
];

pub const JOKES: &[&str] = &[
    "Почему программисты путают Хэллоуин и Рождество? Потому что тридцать первое октября \
     это двадцать пятое декабря в шестнадцатеричной системе.",
    "Было бы смешно, если бы не было так грустно.",
];

pub const WEATHER_REPORT: &str = "Сегодня ясная погода с температурой двадцать градусов.";

const LISTENING: &str = "Я вас слушаю.";
const CHAT_FAILED: &str = "Произошла ошибка при получении ответа.";
const CHAT_UNEXPECTED: &str = "Ошибка: непредвиденный формат ответа.";

/// Line source for interactive prompts (the guessing game, text mode)
pub type LineSource = Lines<Box<dyn AsyncBufRead + Unpin + Send>>;

/// What an utterance led to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// No wake word, nothing was done
    Ignored,
    /// Wake word alone, the assistant said it is listening
    Listening,
    /// A local command ran
    Handled(Command),
    /// A local command could not run; an apology was spoken
    Failed(Command),
    /// The chat model was asked
    Chat,
}

/// Resolves once `shutdown` is `true`; never if the sender is gone
async fn stopped(shutdown: &mut watch::Receiver<bool>) {
    while !*shutdown.borrow_and_update() {
        if shutdown.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Greeting for the hour of day (0-23)
#[must_use]
pub const fn greeting(hour: u32) -> &'static str {
    match hour {
        5..=11 => "Доброе утро! Как я могу помочь тебе сегодня?",
        12..=17 => "Добрый день! Чем могу помочь?",
        _ => "Добрый вечер! Какие у тебя планы на вечер?",
    }
}

/// Voice assistant state and collaborators
pub struct Assistant {
    wake: WakeWordDetector,
    dispatch: DispatchMode,
    table_threshold: u8,
    history: HistoryPolicy,
    allow_power: bool,
    model: String,
    desktop_config: DesktopConfig,
    transcript: Transcript,
    timers: SharedTimers,
    rng: StdRng,
    input: LineSource,
    shutdown: Option<watch::Receiver<bool>>,
    speaker: Arc<dyn Speaker>,
    chat: Arc<dyn ChatClient>,
    desktop: Arc<dyn Desktop>,
}

impl Assistant {
    /// Create an assistant reading interactive input from stdin
    ///
    /// # Errors
    ///
    /// Returns error if no wake word is configured
    pub fn new(
        config: &Config,
        speaker: Arc<dyn Speaker>,
        chat: Arc<dyn ChatClient>,
        desktop: Arc<dyn Desktop>,
    ) -> Result<Self> {
        let wake = WakeWordDetector::new(
            config.assistant.wake_words.clone(),
            config.assistant.wake_threshold,
        )?;

        let history = if config.assistant.retain_history {
            HistoryPolicy::Retain
        } else {
            HistoryPolicy::Reset
        };

        let stdin: Box<dyn AsyncBufRead + Unpin + Send> =
            Box::new(BufReader::new(tokio::io::stdin()));

        Ok(Self {
            wake,
            dispatch: config.assistant.dispatch,
            table_threshold: config.assistant.table_threshold,
            history,
            allow_power: config.assistant.allow_power,
            model: config.llm.model.clone(),
            desktop_config: config.desktop.clone(),
            transcript: Transcript::new(config.assistant.system_prompt.clone()),
            timers: SharedTimers::new(),
            rng: StdRng::from_entropy(),
            input: stdin.lines(),
            shutdown: None,
            speaker,
            chat,
            desktop,
        })
    }

    /// Read interactive input from `reader` instead of stdin
    #[must_use]
    pub fn with_input(mut self, reader: impl AsyncBufRead + Unpin + Send + 'static) -> Self {
        let reader: Box<dyn AsyncBufRead + Unpin + Send> = Box::new(reader);
        self.input = reader.lines();
        self
    }

    /// Seed the random source (jokes, the guessing game)
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Stop interactive prompts once `shutdown` turns `true`
    #[must_use]
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Handle to the alarm/reminder schedule
    #[must_use]
    pub fn timers(&self) -> SharedTimers {
        self.timers.clone()
    }

    #[must_use]
    pub fn speaker(&self) -> Arc<dyn Speaker> {
        Arc::clone(&self.speaker)
    }

    #[must_use]
    pub const fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    #[must_use]
    pub const fn detector(&self) -> &WakeWordDetector {
        &self.wake
    }

    /// Next line of interactive input, `None` at end of input
    ///
    /// # Errors
    ///
    /// Returns error if reading fails
    pub async fn read_line(&mut self) -> Result<Option<String>> {
        Ok(self.input.next_line().await?)
    }

    /// Say the greeting for the current hour
    pub async fn greet(&self) {
        self.reply(greeting(Local::now().hour())).await;
    }

    /// Handle one recognized utterance
    pub async fn hear(&mut self, utterance: &str) -> Outcome {
        let utterance = utterance.trim().to_lowercase();
        if utterance.is_empty() {
            return Outcome::Ignored;
        }
        tracing::info!(utterance = %utterance, "user said");

        if !self.wake.check_wake_word(&utterance) {
            tracing::debug!("wake word not detected");
            return Outcome::Ignored;
        }

        if let Err(e) = self.speaker.beep().await {
            tracing::warn!(error = %e, "wake beep failed");
        }

        let text = self.wake.strip(&utterance);
        if text.is_empty() {
            self.reply(LISTENING).await;
            return Outcome::Listening;
        }

        self.dispatch(&text).await
    }

    /// Route wake-word-free text to a command or the chat model
    pub async fn dispatch(&mut self, text: &str) -> Outcome {
        tracing::info!(command = %text, "processing command");

        let command = match self.dispatch {
            DispatchMode::Rules => match_rules(text),
            DispatchMode::Table => match_table(text, self.table_threshold).map(|(c, _)| c),
        };

        let Some(command) = command else {
            self.converse(text).await;
            return Outcome::Chat;
        };

        tracing::debug!(?command, "matched command");
        match self.run(command, text).await {
            Ok(()) => Outcome::Handled(command),
            Err(e) => {
                tracing::error!(?command, error = %e, "command failed");
                self.reply(failure_reply(command)).await;
                Outcome::Failed(command)
            }
        }
    }

    async fn run(&mut self, command: Command, text: &str) -> Result<()> {
        let argument = command.argument(text);
        match command {
            Command::OpenBrowser => {
                let url = self.desktop_config.browser_url.clone();
                self.open_page("Открываю браузер", &url, "Не удалось открыть браузер.")
                    .await;
            }
            Command::Weekday => {
                let day = WEEKDAYS[Local::now().weekday().num_days_from_monday() as usize];
                self.reply(&format!("Сегодня {day}")).await;
            }
            Command::Joke => {
                let joke = JOKES.choose(&mut self.rng).copied().unwrap_or_default();
                self.reply(joke).await;
            }
            Command::PlayMusic => {
                let url = self.desktop_config.music_url.clone();
                self.open_page("Включаю музыку", &url, "Не удалось включить музыку.")
                    .await;
            }
            Command::Weather => {
                tracing::info!("weather requested");
                self.reply(WEATHER_REPORT).await;
            }
            Command::SetAlarm => self.set_alarm(argument).await?,
            Command::Reminder => self.set_reminder(argument).await?,
            Command::GuessNumber => self.play_guess_number().await?,
            Command::VolumeUp => self.adjust_volume(Direction::Up).await,
            Command::VolumeDown => self.adjust_volume(Direction::Down).await,
            Command::BrightnessUp => self.adjust_brightness(Direction::Up).await,
            Command::BrightnessDown => self.adjust_brightness(Direction::Down).await,
            Command::PowerOff => self.power(PowerAction::Shutdown).await,
            Command::Reboot => self.power(PowerAction::Reboot).await,
            Command::OpenApp => self.open_application(argument).await,
        }
        Ok(())
    }

    async fn open_page(&self, announcement: &str, url: &str, failure: &str) {
        self.reply(announcement).await;
        if let Err(e) = self.desktop.open_url(url).await {
            tracing::error!(url, error = %e, "failed to open page");
            self.reply(failure).await;
        }
    }

    async fn set_alarm(&self, argument: &str) -> Result<()> {
        let duration = argument.split_once("через").map_or(argument, |(_, rest)| rest);
        let minutes = parse::minutes(duration)?;
        let due = self.timers.add_alarm(Local::now(), minutes);
        self.reply(&format!("Будильник установлен на {minutes} минут."))
            .await;
        tracing::info!(%due, "alarm set");
        Ok(())
    }

    async fn set_reminder(&self, argument: &str) -> Result<()> {
        let (minutes, phrase) = parse::reminder(argument)?;
        let due = self.timers.add_reminder(Local::now(), minutes, phrase);
        self.reply(&format!("Напоминание установлено на {minutes} минут."))
            .await;
        tracing::info!(%due, "reminder set");
        Ok(())
    }

    async fn play_guess_number(&mut self) -> Result<()> {
        let mut game = GuessGame::new(&mut self.rng);
        tracing::debug!(target = game.target(), "guessing game started");
        self.reply("Я загадала число от одного до ста. Попробуй угадать!")
            .await;

        loop {
            print!("Ваше предположение: ");
            std::io::stdout().flush()?;

            let line = match self.shutdown.as_mut() {
                Some(shutdown) => tokio::select! {
                    () = stopped(shutdown) => None,
                    line = self.input.next_line() => line?,
                },
                None => self.input.next_line().await?,
            };
            let Some(line) = line else {
                self.reply("Игра окончена.").await;
                return Ok(());
            };

            let Ok(n) = line.trim().parse::<i64>() else {
                self.reply("Это не число.").await;
                continue;
            };

            let verdict = game.guess(n);
            self.reply(verdict.reply()).await;
            if verdict == Guess::Correct {
                tracing::info!(attempts = game.attempts(), "number guessed");
                return Ok(());
            }
        }
    }

    async fn adjust_volume(&self, direction: Direction) {
        if !self.desktop.supports(Capability::Volume) {
            self.reply("Изменение громкости не поддерживается на этой системе.")
                .await;
            return;
        }
        match self
            .desktop
            .adjust_volume(direction, self.desktop_config.volume_step)
            .await
        {
            Ok(()) => self.reply("Громкость изменена.").await,
            Err(e) => {
                tracing::error!(?direction, error = %e, "volume change failed");
                self.reply("Не удалось изменить громкость. Пожалуйста, проверьте настройки.")
                    .await;
            }
        }
    }

    async fn adjust_brightness(&self, direction: Direction) {
        if !self.desktop.supports(Capability::Brightness) {
            self.reply("Изменение яркости не поддерживается на этой системе.")
                .await;
            return;
        }
        match self
            .desktop
            .adjust_brightness(direction, self.desktop_config.brightness_step)
            .await
        {
            Ok(()) => self.reply("Яркость изменена.").await,
            Err(e) => {
                tracing::error!(?direction, error = %e, "brightness change failed");
                self.reply("Не удалось изменить яркость. Пожалуйста, проверьте настройки.")
                    .await;
            }
        }
    }

    async fn power(&self, action: PowerAction) {
        if !self.allow_power {
            tracing::warn!(?action, "power command refused, allow_power is off");
            self.reply("Управление питанием отключено в настройках.")
                .await;
            return;
        }
        if !self.desktop.supports(Capability::Power) {
            self.reply("Управление питанием не поддерживается на этой системе.")
                .await;
            return;
        }

        let (announcement, failure) = match action {
            PowerAction::Shutdown => ("Выключаю компьютер.", "Не удалось выключить компьютер."),
            PowerAction::Reboot => (
                "Перезагружаю компьютер.",
                "Не удалось перезагрузить компьютер.",
            ),
        };
        self.reply(announcement).await;
        if let Err(e) = self.desktop.power(action).await {
            tracing::error!(?action, error = %e, "power command failed");
            self.reply(failure).await;
        }
    }

    async fn open_application(&self, name: &str) {
        if name.is_empty() {
            self.reply("Пожалуйста, укажите название приложения.")
                .await;
            return;
        }

        let Some(program) = self.desktop_config.applications.get(name) else {
            self.reply(&format!("Приложение {name} не найдено.")).await;
            return;
        };

        match self.desktop.launch(program).await {
            Ok(()) => self.reply(&format!("Открываю {name}.")).await,
            Err(e) => {
                tracing::error!(app = name, program, error = %e, "failed to open application");
                self.reply(&format!("Не удалось открыть {name}.")).await;
            }
        }
    }

    async fn converse(&mut self, text: &str) {
        self.transcript.push_user(text);
        tracing::debug!(model = %self.model, turns = self.transcript.len(), "asking chat model");

        match self.chat.complete(&self.model, self.transcript.turns()).await {
            Ok(reply) if !reply.trim().is_empty() => {
                self.reply(&reply.to_lowercase()).await;
                match self.history {
                    HistoryPolicy::Reset => self.transcript.reset(),
                    HistoryPolicy::Retain => self.transcript.push_assistant(reply),
                }
            }
            Ok(_) | Err(Error::UnexpectedReply(_)) => {
                tracing::warn!("chat reply was empty or not text");
                self.reply(CHAT_UNEXPECTED).await;
                self.transcript.reset();
            }
            Err(e) => {
                tracing::error!(error = %e, "chat completion failed");
                self.reply(CHAT_FAILED).await;
                self.transcript.reset();
            }
        }
    }

    /// Log and speak a reply; speech failures are logged, not propagated
    async fn reply(&self, text: &str) {
        tracing::info!(reply = text, "assistant replied");
        if let Err(e) = self.speaker.say(text).await {
            tracing::warn!(error = %e, "failed to speak reply");
        }
    }
}

/// Apology for a command that failed before doing anything
const fn failure_reply(command: Command) -> &'static str {
    match command {
        Command::SetAlarm => "Не удалось установить будильник. Пожалуйста, повторите попытку.",
        Command::Reminder => "Не удалось установить напоминание. Пожалуйста, повторите попытку.",
        _ => "Не удалось выполнить команду. Пожалуйста, повторите попытку.",
    }
}
