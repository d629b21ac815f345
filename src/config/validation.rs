use super::AppConfig;
use anyhow::{bail, Result};
use clap::Parser;

const MIN_RECORD_SECONDS: u64 = 1;
const MAX_RECORD_SECONDS: u64 = 60;
const MAX_COOLDOWN_MS: u64 = 30_000;
const MAX_BEAM_SIZE: u32 = 16;
const MIN_TTS_RATE: u32 = 50;
const MAX_TTS_RATE: u32 = 600;

impl AppConfig {
    /// Parse CLI arguments and validate them right away.
    pub fn parse_args() -> Result<Self> {
        let mut config = Self::parse();
        config.validate()?;
        Ok(config)
    }

    /// Check CLI values before any device or model is touched.
    pub fn validate(&mut self) -> Result<()> {
        if !(MIN_RECORD_SECONDS..=MAX_RECORD_SECONDS).contains(&self.seconds) {
            bail!(
                "--seconds must be between {MIN_RECORD_SECONDS} and {MAX_RECORD_SECONDS}, got {}",
                self.seconds
            );
        }
        if self.cooldown_ms > MAX_COOLDOWN_MS {
            bail!(
                "--cooldown-ms must be at most {MAX_COOLDOWN_MS}, got {}",
                self.cooldown_ms
            );
        }
        if !(1..=MAX_BEAM_SIZE).contains(&self.whisper_beam_size) {
            bail!(
                "--whisper-beam-size must be between 1 and {MAX_BEAM_SIZE}, got {}",
                self.whisper_beam_size
            );
        }
        if !(MIN_TTS_RATE..=MAX_TTS_RATE).contains(&self.tts_rate) {
            bail!(
                "--tts-rate must be between {MIN_TTS_RATE} and {MAX_TTS_RATE} words per minute, got {}",
                self.tts_rate
            );
        }
        if self.whisper_model_path.trim().is_empty() {
            bail!("--whisper-model must not be empty");
        }
        if self.tts_cmd.trim().is_empty() {
            bail!("--tts-cmd must not be empty");
        }
        if self.llm_model.trim().is_empty() {
            bail!("--llm-model must not be empty");
        }
        if !(self.ollama_url.starts_with("http://") || self.ollama_url.starts_with("https://")) {
            bail!(
                "--ollama-url must start with http:// or https://, got '{}'",
                self.ollama_url
            );
        }
        let lang_ok = self.lang.eq_ignore_ascii_case("auto")
            || (self.lang.len() == 2 && self.lang.bytes().all(|b| b.is_ascii_lowercase()));
        if !lang_ok {
            bail!(
                "--lang must be a two-letter lowercase code or 'auto', got '{}'",
                self.lang
            );
        }
        Ok(())
    }
}
