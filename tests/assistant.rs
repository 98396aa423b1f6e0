//! Assistant behaviour tests
//!
//! Drive the assistant with recognized text against recording fakes.

use std::io::Cursor;
use std::time::Duration;

use chrono::{Local, TimeDelta};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::io::{AsyncWriteExt, BufReader};

use sonya::assistant::timers::ALARM_ANNOUNCEMENT;
use sonya::assistant::{Command, GuessGame, Outcome, Turn, WEEKDAYS, fire_due};
use sonya::config::DispatchMode;
use sonya::{Daemon, Error};

mod common;

use common::{FakeDesktop, harness, harness_with, test_config};

#[tokio::test]
async fn test_no_wake_word_does_nothing() {
    let mut h = harness(&test_config());

    let outcome = h.assistant.hear("открой браузер").await;

    assert_eq!(outcome, Outcome::Ignored);
    assert!(h.speaker.said().is_empty());
    assert_eq!(h.speaker.beeps(), 0);
    assert!(h.chat.calls().is_empty());
    assert!(h.desktop.actions().is_empty());
}

#[tokio::test]
async fn test_wake_word_alone_is_acknowledged() {
    let mut h = harness(&test_config());

    let outcome = h.assistant.hear("Соня").await;

    assert_eq!(outcome, Outcome::Listening);
    assert_eq!(h.speaker.beeps(), 1);
    assert_eq!(h.speaker.said(), vec!["Я вас слушаю."]);
}

#[tokio::test]
async fn test_open_browser() {
    let mut h = harness(&test_config());

    let outcome = h.assistant.hear("соня открой браузер").await;

    assert_eq!(outcome, Outcome::Handled(Command::OpenBrowser));
    assert_eq!(h.speaker.said(), vec!["Открываю браузер"]);
    assert_eq!(h.desktop.actions(), vec!["open https://www.google.com"]);
    assert!(h.chat.calls().is_empty());
}

#[tokio::test]
async fn test_weekday() {
    let mut h = harness(&test_config());

    h.assistant.hear("соня какой сегодня день").await;

    let reply = h.speaker.last().unwrap();
    let day = reply.strip_prefix("Сегодня ").unwrap();
    assert!(WEEKDAYS.contains(&day), "{reply}");
}

#[tokio::test]
async fn test_alarm_is_recorded_once() {
    let mut h = harness(&test_config());
    let timers = h.assistant.timers();

    let before = Local::now();
    let outcome = h
        .assistant
        .hear("соня установи будильник через 10 минут")
        .await;
    let after = Local::now();

    assert_eq!(outcome, Outcome::Handled(Command::SetAlarm));
    assert_eq!(
        h.speaker.last().as_deref(),
        Some("Будильник установлен на 10 минут.")
    );

    let alarms = timers.lock().alarms().to_vec();
    assert_eq!(alarms.len(), 1);
    assert!(alarms[0].due >= before + TimeDelta::minutes(10));
    assert!(alarms[0].due <= after + TimeDelta::minutes(10));
}

#[tokio::test]
async fn test_alarm_without_unit_counts_minutes() {
    let mut h = harness(&test_config());
    let timers = h.assistant.timers();

    let before = Local::now();
    let outcome = h.assistant.hear("соня установи будильник через 10").await;
    let after = Local::now();

    assert_eq!(outcome, Outcome::Handled(Command::SetAlarm));
    assert_eq!(
        h.speaker.last().as_deref(),
        Some("Будильник установлен на 10 минут.")
    );

    let alarms = timers.lock().alarms().to_vec();
    assert_eq!(alarms.len(), 1);
    assert!(alarms[0].due >= before + TimeDelta::minutes(10));
    assert!(alarms[0].due <= after + TimeDelta::minutes(10));
}

#[tokio::test]
async fn test_alarm_fires_exactly_once() {
    let mut h = harness(&test_config());
    let timers = h.assistant.timers();
    h.assistant
        .hear("соня установи будильник через 1 минуту")
        .await;

    let later = Local::now() + TimeDelta::minutes(2);
    assert_eq!(fire_due(&timers, h.speaker.as_ref(), later).await, 1);
    assert_eq!(fire_due(&timers, h.speaker.as_ref(), later).await, 0);

    let announcements = h
        .speaker
        .said()
        .into_iter()
        .filter(|s| s == ALARM_ANNOUNCEMENT)
        .count();
    assert_eq!(announcements, 1);
}

#[tokio::test]
async fn test_malformed_alarm_apologizes() {
    let mut h = harness(&test_config());

    let outcome = h.assistant.hear("соня установи будильник").await;

    assert_eq!(outcome, Outcome::Failed(Command::SetAlarm));
    assert_eq!(
        h.speaker.last().as_deref(),
        Some("Не удалось установить будильник. Пожалуйста, повторите попытку.")
    );
    assert!(h.assistant.timers().lock().is_empty());
}

#[tokio::test]
async fn test_reminder_speaks_its_phrase() {
    let mut h = harness(&test_config());
    let timers = h.assistant.timers();

    let outcome = h
        .assistant
        .hear("соня напомни через 5 минут позвонить маме")
        .await;
    assert_eq!(outcome, Outcome::Handled(Command::Reminder));
    assert_eq!(
        h.speaker.last().as_deref(),
        Some("Напоминание установлено на 5 минут.")
    );

    let later = Local::now() + TimeDelta::minutes(6);
    fire_due(&timers, h.speaker.as_ref(), later).await;
    assert_eq!(h.speaker.last().as_deref(), Some("позвонить маме"));
}

#[tokio::test]
async fn test_volume_matches_before_brightness() {
    let mut h = harness(&test_config());

    let outcome = h
        .assistant
        .hear("соня увеличь громкость и увеличь яркость")
        .await;

    assert_eq!(outcome, Outcome::Handled(Command::VolumeUp));
    assert_eq!(h.desktop.actions(), vec!["volume Up 5"]);
    assert_eq!(h.speaker.last().as_deref(), Some("Громкость изменена."));
}

#[tokio::test]
async fn test_unsupported_platform_is_reported() {
    let mut h = harness_with(&test_config(), FakeDesktop::unsupported());

    h.assistant.hear("соня убавь яркость").await;

    assert!(h.desktop.actions().is_empty());
    assert_eq!(
        h.speaker.last().as_deref(),
        Some("Изменение яркости не поддерживается на этой системе.")
    );
}

#[tokio::test]
async fn test_os_failure_is_spoken() {
    let mut h = harness_with(&test_config(), FakeDesktop::failing());

    let outcome = h.assistant.hear("соня уменьши яркость").await;

    assert_eq!(outcome, Outcome::Handled(Command::BrightnessDown));
    assert_eq!(
        h.speaker.last().as_deref(),
        Some("Не удалось изменить яркость. Пожалуйста, проверьте настройки.")
    );
}

#[tokio::test]
async fn test_open_application() {
    let mut h = harness(&test_config());

    h.assistant.hear("соня открой терминал").await;
    assert_eq!(h.desktop.actions(), vec!["launch gnome-terminal"]);

    h.assistant.hear("соня запусти приложение пасьянс").await;
    assert_eq!(
        h.speaker.last().as_deref(),
        Some("Приложение пасьянс не найдено.")
    );

    h.assistant.hear("соня открой").await;
    assert_eq!(
        h.speaker.last().as_deref(),
        Some("Пожалуйста, укажите название приложения.")
    );
    assert_eq!(h.desktop.actions().len(), 1);
}

#[tokio::test]
async fn test_power_is_refused_by_default() {
    let mut h = harness(&test_config());

    h.assistant.hear("соня выключи компьютер").await;
    assert!(h.desktop.actions().is_empty());

    let mut config = test_config();
    config.assistant.allow_power = true;
    let mut h = harness(&config);

    h.assistant.hear("соня перезагрузи компьютер").await;
    assert_eq!(h.desktop.actions(), vec!["power Reboot"]);
}

#[tokio::test]
async fn test_chat_fallback_sends_seed_and_user_turn() {
    let mut h = harness(&test_config());
    h.chat.reply("Космос Огромен");

    let outcome = h.assistant.hear("соня расскажи про космос").await;

    assert_eq!(outcome, Outcome::Chat);
    let calls = h.chat.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "gpt-4o");
    assert_eq!(
        calls[0].1,
        vec![Turn::system("seed"), Turn::user("расскажи про космос")]
    );
    assert_eq!(h.speaker.last().as_deref(), Some("космос огромен"));
    assert_eq!(h.assistant.transcript().turns(), &[Turn::system("seed")]);
}

#[tokio::test]
async fn test_retained_history_grows() {
    let mut config = test_config();
    config.assistant.retain_history = true;
    let mut h = harness(&config);
    h.chat.reply("первый");
    h.chat.reply("второй");

    h.assistant.hear("соня привет").await;
    h.assistant.hear("соня как дела").await;

    let calls = h.chat.calls();
    assert_eq!(calls[1].1.len(), 4);
    assert_eq!(calls[1].1[2], Turn::assistant("первый"));
}

#[tokio::test]
async fn test_chat_error_apologizes_and_resets() {
    let mut config = test_config();
    config.assistant.retain_history = true;
    let mut h = harness(&config);
    h.chat.fail(Error::Chat("503".to_string()));

    h.assistant.hear("соня расскажи сказку").await;

    assert_eq!(
        h.speaker.last().as_deref(),
        Some("Произошла ошибка при получении ответа.")
    );
    assert_eq!(h.assistant.transcript().len(), 1);
}

#[tokio::test]
async fn test_non_text_reply_is_reported() {
    let mut h = harness(&test_config());
    h.chat
        .fail(Error::UnexpectedReply("content is null".to_string()));

    h.assistant.hear("соня что нового").await;

    assert_eq!(
        h.speaker.last().as_deref(),
        Some("Ошибка: непредвиденный формат ответа.")
    );
}

#[tokio::test]
async fn test_table_mode_uses_threshold() {
    let mut config = test_config();
    config.assistant.dispatch = DispatchMode::Table;
    let mut h = harness(&config);

    let outcome = h.assistant.hear("соня погода").await;
    assert_eq!(outcome, Outcome::Handled(Command::Weather));

    let outcome = h.assistant.hear("соня расскажи про звёзды").await;
    assert_eq!(outcome, Outcome::Chat);
}

#[tokio::test]
async fn test_guess_game_reads_guesses() {
    let config = test_config();
    let mut h = harness(&config);
    // Same seed as the harness, so the same hidden number
    let target = GuessGame::new(&mut StdRng::seed_from_u64(7)).target();

    let input = format!("сто один\n0\n{target}\n");
    h.assistant = h.assistant.with_input(Cursor::new(input.into_bytes()));

    let outcome = h.assistant.hear("соня игра угадай число").await;

    assert_eq!(outcome, Outcome::Handled(Command::GuessNumber));
    let said = h.speaker.said();
    assert!(said.contains(&"Это не число.".to_string()));
    assert!(said.contains(&"Моё число больше.".to_string()));
    assert_eq!(
        said.last().map(String::as_str),
        Some("Поздравляю! Ты угадал число.")
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_text_mode_daemon_runs_to_end_of_input() {
    let config = test_config();
    let mut h = harness(&config);
    h.assistant = h
        .assistant
        .with_input(Cursor::new("соня погода\nпривет\n".as_bytes().to_vec()));
    let speaker = h.speaker.clone();

    Daemon::new(config, h.assistant).run().await.unwrap();

    assert_eq!(
        speaker.said(),
        vec!["Сегодня ясная погода с температурой двадцать градусов."]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_shutdown_interrupts_guess_game() {
    let config = test_config();
    let mut h = harness(&config);

    // Input stays open after the game starts
    let (mut keyboard, input) = tokio::io::duplex(256);
    keyboard
        .write_all("соня игра угадай число\n".as_bytes())
        .await
        .unwrap();
    h.assistant = h.assistant.with_input(BufReader::new(input));
    let speaker = h.speaker.clone();

    let daemon = Daemon::new(config, h.assistant);
    let shutdown = daemon.shutdown_handle();
    let stop = async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        shutdown.send_replace(true);
    };

    let (result, ()) = tokio::time::timeout(Duration::from_secs(5), async {
        tokio::join!(daemon.run(), stop)
    })
    .await
    .expect("daemon kept waiting for a guess after shutdown");

    result.unwrap();
    assert_eq!(
        speaker.said().last().map(String::as_str),
        Some("Игра окончена.")
    );
    drop(keyboard);
}
