//! Command-line parsing and validation helpers.

mod validation;

use clap::Parser;

/// Default capture window per turn, in seconds.
pub const DEFAULT_WINDOW_SECS: u64 = 5;

/// Default pause between turns, in milliseconds.
pub const DEFAULT_COOLDOWN_MS: u64 = 500;

/// Default Whisper beam-search width.
pub const DEFAULT_BEAM_SIZE: u32 = 5;

/// Default speech rate passed to the TTS command, in words per minute.
pub const DEFAULT_TTS_RATE: u32 = 190;

const DEFAULT_WHISPER_MODEL: &str = "models/ggml-tiny.en.bin";
const DEFAULT_LLM_MODEL: &str = "phi3";
const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
const DEFAULT_TTS_CMD: &str = "say";

/// CLI options for the voice loop. Every flag defaults to the stock pipeline,
/// so running the binary bare gives the standard 5-second/500-ms session.
#[derive(Debug, Parser, Clone)]
#[command(about = "VoxChat: a local voice assistant over Whisper and Ollama", author, version)]
pub struct AppConfig {
    /// Path to the Whisper GGML model file
    #[arg(
        long = "whisper-model",
        env = "VOXCHAT_WHISPER_MODEL",
        default_value = DEFAULT_WHISPER_MODEL
    )]
    pub whisper_model_path: String,

    /// Whisper beam-search width (1 means greedy decoding)
    #[arg(long = "whisper-beam-size", default_value_t = DEFAULT_BEAM_SIZE)]
    pub whisper_beam_size: u32,

    /// Language passed to Whisper ("auto" enables detection)
    #[arg(long, default_value = "en")]
    pub lang: String,

    /// Chat model served by Ollama
    #[arg(long = "llm-model", env = "VOXCHAT_LLM_MODEL", default_value = DEFAULT_LLM_MODEL)]
    pub llm_model: String,

    /// Base URL of the Ollama server
    #[arg(long = "ollama-url", env = "VOXCHAT_OLLAMA_URL", default_value = DEFAULT_OLLAMA_URL)]
    pub ollama_url: String,

    /// Recording window per turn (seconds)
    #[arg(long, default_value_t = DEFAULT_WINDOW_SECS)]
    pub seconds: u64,

    /// Pause after a spoken reply before listening again (milliseconds)
    #[arg(long = "cooldown-ms", default_value_t = DEFAULT_COOLDOWN_MS)]
    pub cooldown_ms: u64,

    /// Text-to-speech command
    #[arg(long = "tts-cmd", env = "VOXCHAT_TTS_CMD", default_value = DEFAULT_TTS_CMD)]
    pub tts_cmd: String,

    /// Speech rate (words per minute)
    #[arg(long = "tts-rate", default_value_t = DEFAULT_TTS_RATE)]
    pub tts_rate: u32,

    /// Preferred audio input device name
    #[arg(long)]
    pub input_device: Option<String>,

    /// Print detected audio input devices and exit
    #[arg(long = "list-input-devices", default_value_t = false)]
    pub list_input_devices: bool,

    /// Enable file logging (debug)
    #[arg(long = "logs", env = "VOXCHAT_LOGS", default_value_t = false)]
    pub logs: bool,

    /// Disable all file logging (overrides --logs and log env vars)
    #[arg(long = "no-logs", env = "VOXCHAT_NO_LOGS", default_value_t = false)]
    pub no_logs: bool,

    /// Allow logging transcript/reply snippets (debug log only)
    #[arg(long = "log-content", env = "VOXCHAT_LOG_CONTENT", default_value_t = false)]
    pub log_content: bool,

    /// Enable verbose timing logs
    #[arg(long)]
    pub log_timings: bool,
}
