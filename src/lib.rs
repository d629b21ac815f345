pub mod audio;
pub mod chat;
pub mod config;
pub mod exit_phrase;
mod logging;
pub mod session;
pub mod speech;
pub mod stt;
mod telemetry;
pub mod tts;

pub use logging::{crash_log_path, init_logging, log_debug, log_debug_content, log_file_path, log_panic};
pub use telemetry::init_tracing;
