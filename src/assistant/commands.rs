//! Command table
//!
//! Rules are tried top to bottom and the first trigger contained in the
//! text wins, so specific phrases sit above generic ones ("открой браузер"
//! before "открой", volume before brightness).

use crate::fuzzy;

/// Something the assistant can do locally
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    OpenBrowser,
    Weekday,
    Joke,
    PlayMusic,
    Weather,
    SetAlarm,
    Reminder,
    GuessNumber,
    VolumeUp,
    VolumeDown,
    BrightnessUp,
    BrightnessDown,
    PowerOff,
    Reboot,
    OpenApp,
}

/// Ordered rules: command and its trigger phrases
pub const RULES: &[(Command, &[&str])] = &[
    (Command::OpenBrowser, &["открой браузер"]),
    (Command::Weekday, &["какой сегодня день"]),
    (Command::Joke, &["анекдот"]),
    (Command::PlayMusic, &["включи музыку"]),
    (Command::Weather, &["погода"]),
    (Command::SetAlarm, &["установи будильник"]),
    (Command::Reminder, &["напомни через", "напомни"]),
    (Command::GuessNumber, &["игра угадай число", "угадай число"]),
    (
        Command::VolumeUp,
        &["увеличь громкость", "прибавь громкость"],
    ),
    (
        Command::VolumeDown,
        &["уменьши громкость", "убавь громкость"],
    ),
    (
        Command::BrightnessUp,
        &["увеличь яркость", "прибавь яркость"],
    ),
    (
        Command::BrightnessDown,
        &["уменьши яркость", "убавь яркость"],
    ),
    (Command::PowerOff, &["выключи компьютер"]),
    (Command::Reboot, &["перезагрузи компьютер"]),
    (
        Command::OpenApp,
        &[
            "открой приложение",
            "запусти приложение",
            "запусти",
            "открой",
        ],
    ),
];

impl Command {
    /// Trigger phrases, most specific first
    #[must_use]
    pub fn triggers(self) -> &'static [&'static str] {
        RULES
            .iter()
            .find(|(command, _)| *command == self)
            .map_or(&[], |(_, triggers)| *triggers)
    }

    /// Text following the first trigger found in `text`
    ///
    /// Falls back to the whole text when no trigger occurs literally, which
    /// happens for fuzzy table matches.
    #[must_use]
    pub fn argument(self, text: &str) -> &str {
        self.triggers()
            .iter()
            .find_map(|trigger| text.find(trigger).map(|pos| &text[pos + trigger.len()..]))
            .unwrap_or(text)
            .trim()
    }
}

/// First rule with a trigger contained in `text`
#[must_use]
pub fn match_rules(text: &str) -> Option<Command> {
    RULES
        .iter()
        .find(|(_, triggers)| triggers.iter().any(|t| text.contains(t)))
        .map(|(command, _)| *command)
}

/// Trigger most similar to the whole of `text`, if its score reaches `threshold`
///
/// Ties go to the earlier rule.
#[must_use]
pub fn match_table(text: &str, threshold: u8) -> Option<(Command, u8)> {
    let entries: Vec<(Command, &str)> = RULES
        .iter()
        .flat_map(|(command, triggers)| triggers.iter().map(move |t| (*command, *t)))
        .collect();

    let (index, score) = fuzzy::best_match(text, entries.iter().map(|(_, t)| *t))?;
    tracing::debug!(trigger = entries[index].1, score, "best table match");

    (score >= threshold).then_some((entries[index].0, score))
}
