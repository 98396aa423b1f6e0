//! OS actions: mixer, backlight, launching programs, opening pages, power
//!
//! Volume goes through `amixer`, brightness through `brightnessctl`, power
//! through `systemctl`. All three are Linux-only and also require the
//! utility to be on `PATH`.

use async_trait::async_trait;
use tokio::process::Command;

use crate::{Error, Result};

/// Which way to move a level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Louder / brighter
    Up,
    /// Quieter / dimmer
    Down,
}

/// Host power action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerAction {
    /// Power off
    Shutdown,
    /// Restart
    Reboot,
}

/// Platform-gated action group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Output volume
    Volume,
    /// Screen brightness
    Brightness,
    /// Shutdown / reboot
    Power,
}

/// The OS surface the assistant acts on
#[async_trait]
pub trait Desktop: Send + Sync {
    /// Whether this platform can perform `capability`
    fn supports(&self, capability: Capability) -> bool;

    /// Open `url` in the default browser
    async fn open_url(&self, url: &str) -> Result<()>;

    /// Change output volume by `step` percent
    async fn adjust_volume(&self, direction: Direction, step: u8) -> Result<()>;

    /// Change screen brightness by `step` percent
    async fn adjust_brightness(&self, direction: Direction, step: u8) -> Result<()>;

    /// Start `program` (a command line) without waiting for it
    async fn launch(&self, program: &str) -> Result<()>;

    /// Shut down or reboot the host
    async fn power(&self, action: PowerAction) -> Result<()>;
}

/// Desktop backed by real subprocesses
#[derive(Debug, Default, Clone)]
pub struct SystemDesktop;

impl SystemDesktop {
    /// Create a system desktop
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Desktop for SystemDesktop {
    fn supports(&self, capability: Capability) -> bool {
        if !cfg!(target_os = "linux") {
            return false;
        }
        let tool = match capability {
            Capability::Volume => "amixer",
            Capability::Brightness => "brightnessctl",
            Capability::Power => "systemctl",
        };
        which::which(tool).is_ok()
    }

    async fn open_url(&self, url: &str) -> Result<()> {
        let (program, mut args): (&str, Vec<&str>) = if cfg!(target_os = "macos") {
            ("open", vec![])
        } else if cfg!(target_os = "windows") {
            ("cmd", vec!["/C", "start", ""])
        } else {
            ("xdg-open", vec![])
        };
        args.push(url);
        run(program, &args).await
    }

    async fn adjust_volume(&self, direction: Direction, step: u8) -> Result<()> {
        let args = volume_args(direction, step);
        run("amixer", &args.iter().map(String::as_str).collect::<Vec<_>>()).await
    }

    async fn adjust_brightness(&self, direction: Direction, step: u8) -> Result<()> {
        let args = brightness_args(direction, step);
        run("brightnessctl", &args.iter().map(String::as_str).collect::<Vec<_>>()).await
    }

    async fn launch(&self, program: &str) -> Result<()> {
        let mut parts = program.split_whitespace();
        let Some(bin) = parts.next() else {
            return Err(Error::Desktop("empty program".to_string()));
        };

        let child = Command::new(bin)
            .args(parts)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .spawn()
            .map_err(|e| Error::Desktop(format!("{bin}: {e}")))?;

        tracing::info!(program, pid = ?child.id(), "launched");
        Ok(())
    }

    async fn power(&self, action: PowerAction) -> Result<()> {
        let verb = match action {
            PowerAction::Shutdown => "poweroff",
            PowerAction::Reboot => "reboot",
        };
        run("systemctl", &[verb]).await
    }
}

/// `amixer` arguments for one volume step
#[must_use]
pub fn volume_args(direction: Direction, step: u8) -> Vec<String> {
    let sign = match direction {
        Direction::Up => '+',
        Direction::Down => '-',
    };
    ["-D", "pulse", "sset", "Master"]
        .into_iter()
        .map(ToString::to_string)
        .chain(std::iter::once(format!("{step}%{sign}")))
        .collect()
}

/// `brightnessctl` arguments for one brightness step
#[must_use]
pub fn brightness_args(direction: Direction, step: u8) -> Vec<String> {
    let value = match direction {
        Direction::Up => format!("+{step}%"),
        Direction::Down => format!("{step}%-"),
    };
    vec!["set".to_string(), value]
}

/// Run a utility to completion, failing on a non-zero exit
async fn run(program: &str, args: &[&str]) -> Result<()> {
    tracing::debug!(program, ?args, "running");

    let output = Command::new(program)
        .args(args)
        .output()
        .await
        .map_err(|e| Error::Desktop(format!("{program}: {e}")))?;

    if output.status.success() {
        Ok(())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        Err(Error::Desktop(format!(
            "{program} exited with {}: {stderr}",
            output.status
        )))
    }
}
