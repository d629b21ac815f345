//! VoxChat entrypoint: a local, turn-based voice assistant.
//!
//! Startup loads the Whisper model once and wires the engines together; the
//! conversation loop then runs until an exit phrase is heard or Ctrl-C is
//! pressed. A second Ctrl-C force-exits without the farewell.

use anyhow::Result;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;
use voxchat::audio::Recorder;
use voxchat::chat::ChatClient;
use voxchat::config::AppConfig;
use voxchat::session::{Conversation, SessionOptions};
use voxchat::stt::Transcriber;
use voxchat::tts::Speaker;
use voxchat::{init_logging, init_tracing, log_panic};

fn main() -> Result<()> {
    let config = AppConfig::parse_args()?;
    init_logging(&config);
    init_tracing(&config);
    install_panic_hook();

    if config.list_input_devices {
        list_input_devices();
        return Ok(());
    }

    println!("Loading Whisper model from {}...", config.whisper_model_path);
    let transcriber = Transcriber::new(
        &config.whisper_model_path,
        config.whisper_beam_size,
        &config.lang,
    )?;
    let recorder = Recorder::new(config.input_device.as_deref())?;
    let chat = ChatClient::new(&config.ollama_url, &config.llm_model)?;
    let speaker = Speaker::new(&config.tts_cmd, config.tts_rate);

    tracing::info!(
        model = %config.llm_model,
        device = %recorder.device_name(),
        "voxchat ready"
    );
    println!("Ready! Speak clearly. Say 'exit' to stop.");

    let interrupt = Arc::new(AtomicBool::new(false));
    install_interrupt_flag(&interrupt)?;

    let options = SessionOptions {
        window: Duration::from_secs(config.seconds),
        cooldown: Duration::from_millis(config.cooldown_ms),
        log_timings: config.log_timings,
    };
    let mut conversation = Conversation::new(
        &recorder,
        &transcriber,
        &chat,
        &speaker,
        options,
        interrupt,
    );
    conversation.run()
}

fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        log_panic(info);
        default_hook(info);
    }));
}

fn list_input_devices() {
    match Recorder::list_devices() {
        Ok(devices) if devices.is_empty() => {
            println!("No audio input devices detected.");
        }
        Ok(devices) => {
            println!("Detected audio input devices:");
            for name in devices {
                println!("  {name}");
            }
        }
        Err(err) => {
            println!("Failed to list audio input devices: {err:#}");
        }
    }
}

/// First Ctrl-C requests a polite farewell; the second one force-exits.
#[cfg(unix)]
fn install_interrupt_flag(flag: &Arc<AtomicBool>) -> Result<()> {
    use anyhow::Context;
    use signal_hook::consts::SIGINT;

    signal_hook::flag::register_conditional_shutdown(SIGINT, 130, Arc::clone(flag))
        .context("failed to install SIGINT shutdown hook")?;
    signal_hook::flag::register(SIGINT, Arc::clone(flag))
        .context("failed to install SIGINT handler")?;
    Ok(())
}

#[cfg(not(unix))]
fn install_interrupt_flag(_flag: &Arc<AtomicBool>) -> Result<()> {
    Ok(())
}
