//! Durations and reminder phrases out of recognized text
//!
//! Digits win when present: every ASCII digit in the text is concatenated
//! and read as minutes ("через 1 0" is ten, "через 1 час 30 минут" is 130).
//! The recognizer usually spells numbers out, so Russian numerals
//! ("через один час тридцать минут") are understood too.

use crate::{Error, Result};

/// Number of minutes named in `text`
///
/// Without digits, a numeral directly followed by "час"/"часа"/"часов"
/// counts hours, and hour and minute parts add up. With no numeral at
/// all, "полчаса", "час" and "минуту" stand for 30, 60 and 1.
///
/// # Errors
///
/// Returns `Error::Command` if no duration can be found or the digits overflow
pub fn minutes(text: &str) -> Result<u32> {
    let digits: String = text.chars().filter(char::is_ascii_digit).collect();
    if !digits.is_empty() {
        return digits
            .parse::<u32>()
            .map_err(|_| Error::Command(format!("duration out of range: {digits}")));
    }

    spoken_minutes(&words(text))
        .ok_or_else(|| Error::Command(format!("no duration in \"{}\"", text.trim())))
}

/// Split a reminder request into minutes and the phrase to say
///
/// Accepts both orders: "10 минут позвонить маме" and
/// "позвонить маме через 10 минут". The phrase may be empty.
///
/// # Errors
///
/// Returns `Error::Command` if no duration can be found
pub fn reminder(text: &str) -> Result<(u32, String)> {
    let text = text.trim();
    let text = text.strip_prefix("через").map_or(text, str::trim_start);

    if let Some((phrase, duration)) = text.split_once("через") {
        return Ok((minutes(duration)?, clean_phrase(phrase)));
    }

    // The duration is the leading run of numbers and units
    let words: Vec<&str> = text.split_whitespace().collect();
    let split = words
        .iter()
        .take_while(|w| is_number(w) || is_unit(w))
        .count();

    let duration = words[..split].join(" ");
    let phrase = words[split..].join(" ");
    Ok((minutes(&duration)?, clean_phrase(&phrase)))
}

fn clean_phrase(phrase: &str) -> String {
    phrase
        .trim_matches(|c: char| c.is_whitespace() || matches!(c, ',' | '.' | '!' | '?'))
        .to_string()
}

fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn is_unit(word: &str) -> bool {
    let word = word.to_lowercase();
    let word = word.trim_matches(|c: char| !c.is_alphanumeric());
    unit_scale(word).is_some() || bare_unit(word).is_some()
}

fn is_number(word: &str) -> bool {
    let word = word.to_lowercase();
    let word = word.trim_matches(|c: char| !c.is_alphanumeric());
    !word.is_empty() && (word.chars().all(|c| c.is_ascii_digit()) || numeral(word).is_some())
}

/// Minutes per unit word following a number
fn unit_scale(word: &str) -> Option<u32> {
    match word {
        "минута" | "минуту" | "минуты" | "минут" | "мин" => Some(1),
        "час" | "часа" | "часов" => Some(60),
        _ => None,
    }
}

/// Unit words that name a duration on their own
fn bare_unit(word: &str) -> Option<u32> {
    match word {
        "полчаса" => Some(30),
        "час" => Some(60),
        "минуту" => Some(1),
        _ => None,
    }
}

/// Minutes in the first spoken duration ("один час тридцать минут" -> 90)
fn spoken_minutes(words: &[String]) -> Option<u32> {
    let mut total: Option<u32> = None;
    let mut count: Option<u32> = None;

    for word in words {
        if let Some(value) = numeral(word) {
            count = Some(count.unwrap_or(0).saturating_add(value));
            continue;
        }
        if let Some(n) = count.take() {
            let scale = unit_scale(word);
            total = Some(add(total, n.saturating_mul(scale.unwrap_or(1))));
            if scale.is_none() {
                break;
            }
        } else if let Some(value) = bare_unit(word) {
            total = Some(add(total, value));
        } else if unit_scale(word).is_none() && total.is_some() {
            break;
        }
    }
    if let Some(n) = count {
        total = Some(add(total, n));
    }
    total
}

fn add(total: Option<u32>, minutes: u32) -> u32 {
    total.unwrap_or(0).saturating_add(minutes)
}

fn numeral(word: &str) -> Option<u32> {
    let value = match word {
        "ноль" => 0,
        "один" | "одна" | "одну" => 1,
        "два" | "две" => 2,
        "три" => 3,
        "четыре" => 4,
        "пять" => 5,
        "шесть" => 6,
        "семь" => 7,
        "восемь" => 8,
        "девять" => 9,
        "десять" => 10,
        "одиннадцать" => 11,
        "двенадцать" => 12,
        "тринадцать" => 13,
        "четырнадцать" => 14,
        "пятнадцать" => 15,
        "шестнадцать" => 16,
        "семнадцать" => 17,
        "восемнадцать" => 18,
        "девятнадцать" => 19,
        "двадцать" => 20,
        "тридцать" => 30,
        "сорок" => 40,
        "пятьдесят" => 50,
        "шестьдесят" => 60,
        "семьдесят" => 70,
        "восемьдесят" => 80,
        "девяносто" => 90,
        "сто" => 100,
        "двести" => 200,
        _ => return None,
    };
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digits_are_concatenated() {
        assert_eq!(minutes("10").unwrap(), 10);
        assert_eq!(minutes("через 1 0 минут").unwrap(), 10);
    }

    #[test]
    fn spoken_numbers() {
        assert_eq!(minutes("пять минут").unwrap(), 5);
        assert_eq!(minutes("двадцать пять минут").unwrap(), 25);
        assert_eq!(minutes("одну минуту").unwrap(), 1);
    }

    #[test]
    fn digits_ignore_units() {
        assert_eq!(minutes("через 1 час 30 минут").unwrap(), 130);
        assert_eq!(minutes("2 часа").unwrap(), 2);
    }

    #[test]
    fn spoken_hours_scale_the_count() {
        assert_eq!(minutes("два часа").unwrap(), 120);
        assert_eq!(minutes("полчаса").unwrap(), 30);
        assert_eq!(minutes("час").unwrap(), 60);
    }

    #[test]
    fn spoken_hours_and_minutes_add_up() {
        assert_eq!(minutes("через один час тридцать минут").unwrap(), 90);
        assert_eq!(minutes("два часа пять минут").unwrap(), 125);
        assert_eq!(minutes("час двадцать").unwrap(), 80);
    }

    #[test]
    fn hour_unit_is_matched_whole() {
        assert_eq!(minutes("пять часики").unwrap(), 5);
        assert!(matches!(minutes("часы"), Err(Error::Command(_))));
    }

    #[test]
    fn missing_duration_is_a_command_error() {
        assert!(matches!(minutes("скоро"), Err(Error::Command(_))));
        assert!(matches!(minutes(""), Err(Error::Command(_))));
        assert!(matches!(
            minutes("99999999999999999999"),
            Err(Error::Command(_))
        ));
    }

    #[test]
    fn reminder_duration_first() {
        let (m, phrase) = reminder("10 минут позвонить маме").unwrap();
        assert_eq!(m, 10);
        assert_eq!(phrase, "позвонить маме");
    }

    #[test]
    fn reminder_phrase_first() {
        let (m, phrase) = reminder("выключить плиту через пятнадцать минут").unwrap();
        assert_eq!(m, 15);
        assert_eq!(phrase, "выключить плиту");
    }

    #[test]
    fn reminder_phrase_digits_are_not_duration() {
        let (m, phrase) = reminder("через 5 минут купить 2 хлеба").unwrap();
        assert_eq!(m, 5);
        assert_eq!(phrase, "купить 2 хлеба");
    }

    #[test]
    fn reminder_phrase_may_mention_a_watch() {
        let (m, phrase) = reminder("10 проверить часы").unwrap();
        assert_eq!(m, 10);
        assert_eq!(phrase, "проверить часы");

        let (m, phrase) = reminder("10 забрать часы из ремонта").unwrap();
        assert_eq!(m, 10);
        assert_eq!(phrase, "забрать часы из ремонта");
    }

    #[test]
    fn reminder_with_hours_and_minutes() {
        let (m, phrase) = reminder("через один час тридцать минут выпить чай").unwrap();
        assert_eq!(m, 90);
        assert_eq!(phrase, "выпить чай");
    }

    #[test]
    fn reminder_without_phrase() {
        let (m, phrase) = reminder("20").unwrap();
        assert_eq!(m, 20);
        assert!(phrase.is_empty());
    }
}
