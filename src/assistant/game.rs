//! "Угадай число": the assistant picks a number, the user guesses

use rand::Rng;

/// Smallest number the game picks
pub const LOW: u8 = 1;
/// Largest number the game picks
pub const HIGH: u8 = 100;

/// Verdict on one guess
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guess {
    /// The hidden number is larger than the guess
    Higher,
    /// The hidden number is smaller than the guess
    Lower,
    Correct,
}

impl Guess {
    /// What the assistant says back
    #[must_use]
    pub const fn reply(self) -> &'static str {
        match self {
            Self::Higher => "Моё число больше.",
            Self::Lower => "Моё число меньше.",
            Self::Correct => "Поздравляю! Ты угадал число.",
        }
    }
}

/// One round of the guessing game
#[derive(Debug, Clone)]
pub struct GuessGame {
    target: u8,
    attempts: u32,
}

impl GuessGame {
    /// Pick a number in `LOW..=HIGH`
    pub fn new(rng: &mut impl Rng) -> Self {
        Self::with_target(rng.gen_range(LOW..=HIGH))
    }

    #[must_use]
    pub const fn with_target(target: u8) -> Self {
        Self {
            target,
            attempts: 0,
        }
    }

    pub fn guess(&mut self, n: i64) -> Guess {
        self.attempts += 1;
        match n.cmp(&i64::from(self.target)) {
            std::cmp::Ordering::Less => Guess::Higher,
            std::cmp::Ordering::Greater => Guess::Lower,
            std::cmp::Ordering::Equal => Guess::Correct,
        }
    }

    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    #[must_use]
    pub const fn target(&self) -> u8 {
        self.target
    }
}
