//! Speech synthesis through an external TTS command.

use anyhow::{bail, Context, Result};
use std::process::Command;

/// Blocking wrapper around the system TTS command (`say` on macOS).
///
/// Every call waits for playback to finish before returning, so speech never
/// overlaps and the loop stays strictly sequential.
pub struct Speaker {
    command: String,
    rate: u32,
}

impl Speaker {
    pub fn new(command: &str, rate: u32) -> Self {
        Self {
            command: command.to_string(),
            rate,
        }
    }

    /// Speak `text`, blocking until the command exits.
    ///
    /// # Errors
    ///
    /// Spawn failure or a non-zero exit status is fatal; there is no retry.
    pub fn speak(&self, text: &str) -> Result<()> {
        let status = Command::new(&self.command)
            .arg("-r")
            .arg(self.rate.to_string())
            .arg(text)
            .status()
            .with_context(|| format!("failed to run TTS command '{}'", self.command))?;
        if !status.success() {
            bail!("TTS command '{}' exited with {status}", self.command);
        }
        Ok(())
    }
}

impl crate::session::Synthesizer for Speaker {
    fn speak(&self, text: &str) -> Result<()> {
        Speaker::speak(self, text)
    }
}
