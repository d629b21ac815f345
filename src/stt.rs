//! Whisper speech-to-text integration.
//!
//! Wraps `whisper_rs` behind a load-once [`Transcriber`]. The model is read
//! from disk a single time at startup and reused read-only for every turn.

use anyhow::Result;
use regex::Regex;
use std::sync::OnceLock;

#[cfg(unix)]
mod platform {
    use crate::log_debug;
    use anyhow::{anyhow, Context, Result};
    use std::io;
    use std::os::raw::{c_char, c_uint, c_void};
    use std::os::unix::io::AsRawFd;
    use std::sync::Once;
    use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

    /// Whisper model context plus the decoding options fixed at startup.
    pub struct Transcriber {
        ctx: WhisperContext,
        beam_size: u32,
        lang: String,
    }

    impl Transcriber {
        /// Load the Whisper model from disk.
        ///
        /// whisper.cpp prints verbose banners while loading, so stderr is
        /// pointed at /dev/null for the duration.
        ///
        /// # Errors
        ///
        /// Returns an error if the model file cannot be loaded or the stderr
        /// redirection fails.
        pub fn new(model_path: &str, beam_size: u32, lang: &str) -> Result<Self> {
            install_log_silencer();

            let ctx = silence_stderr(|| {
                WhisperContext::new_with_params(model_path, WhisperContextParameters::default())
            })?
            .context("failed to load whisper model")?;

            Ok(Self {
                ctx,
                beam_size,
                lang: lang.to_string(),
            })
        }

        /// Transcribe a 16 kHz mono window and return the stitched transcript.
        ///
        /// Silence is not an error: a window with no speech-bearing segments
        /// yields an empty string.
        pub fn transcribe(&self, samples: &[i16]) -> Result<String> {
            let audio = super::normalize_samples(samples);
            let mut state = self
                .ctx
                .create_state()
                .context("failed to create whisper state")?;

            let mut params = if self.beam_size > 1 {
                FullParams::new(SamplingStrategy::BeamSearch {
                    beam_size: self.beam_size as i32,
                    patience: -1.0,
                })
            } else {
                FullParams::new(SamplingStrategy::Greedy { best_of: 1 })
            };
            if self.lang.eq_ignore_ascii_case("auto") {
                params.set_language(None);
                params.set_detect_language(true);
            } else {
                params.set_language(Some(&self.lang));
                params.set_detect_language(false);
            }
            // Temperature 0 keeps repeated runs over the same window identical.
            params.set_temperature(0.0);
            // Limit CPU usage so laptops don't max out all cores.
            params.set_n_threads(num_cpus::get().min(8) as i32);
            params.set_print_progress(false);
            params.set_print_timestamps(false);
            params.set_print_special(false);
            params.set_print_realtime(false);
            params.set_translate(false);
            params.set_token_timestamps(false);

            state.full(params, &audio)?;

            let segments = match state.full_n_segments() {
                Ok(count) if count >= 0 => count,
                Ok(_) => {
                    log_debug("whisper returned a negative segment count");
                    return Ok(String::new());
                }
                Err(err) => {
                    log_debug(&format!("whisper failed to read segment count: {err}"));
                    return Ok(String::new());
                }
            };

            let mut parts = Vec::with_capacity(segments as usize);
            for i in 0..segments {
                match state.full_get_segment_text_lossy(i) {
                    Ok(text) => parts.push(text),
                    Err(err) => log_debug(&format!("failed to read whisper segment {i}: {err}")),
                }
            }
            Ok(super::clean_transcript(&parts.join(" ")))
        }
    }

    /// Run `f` with stderr pointed at /dev/null, restoring it afterwards.
    fn silence_stderr<T>(f: impl FnOnce() -> T) -> Result<T> {
        let null = std::fs::OpenOptions::new()
            .write(true)
            .open("/dev/null")
            .context("failed to open /dev/null")?;

        // SAFETY: dup(2) duplicates the stderr file descriptor and dup2(2)
        // swaps it. We hold the only copy of the original and restore it
        // before returning.
        let orig_stderr = unsafe { libc::dup(2) };
        if orig_stderr < 0 {
            return Err(anyhow!(
                "failed to dup stderr: {}",
                io::Error::last_os_error()
            ));
        }
        if unsafe { libc::dup2(null.as_raw_fd(), 2) } < 0 {
            unsafe { libc::close(orig_stderr) };
            return Err(anyhow!(
                "failed to redirect stderr: {}",
                io::Error::last_os_error()
            ));
        }

        let value = f();

        let restored = unsafe { libc::dup2(orig_stderr, 2) };
        unsafe { libc::close(orig_stderr) };
        if restored < 0 {
            return Err(anyhow!(
                "failed to restore stderr: {}",
                io::Error::last_os_error()
            ));
        }
        Ok(value)
    }

    fn install_log_silencer() {
        static INSTALL_LOG_CALLBACK: Once = Once::new();
        INSTALL_LOG_CALLBACK.call_once(|| unsafe {
            whisper_rs::set_log_callback(Some(whisper_log_silencer), std::ptr::null_mut());
        });
    }

    #[allow(unused_variables)]
    unsafe extern "C" fn whisper_log_silencer(
        _level: c_uint,
        _text: *const c_char,
        _user_data: *mut c_void,
    ) {
        // Drop whisper.cpp log lines so they don't mix with console echoes.
    }
}

#[cfg(not(unix))]
mod platform {
    use anyhow::{anyhow, Result};

    /// Stub implementation for unsupported targets such as Windows.
    pub struct Transcriber;

    impl Transcriber {
        pub fn new(_: &str, _: u32, _: &str) -> Result<Self> {
            Err(anyhow!(
                "Whisper transcription is currently supported only on Unix-like platforms"
            ))
        }

        pub fn transcribe(&self, _: &[i16]) -> Result<String> {
            Err(anyhow!(
                "Whisper transcription is currently supported only on Unix-like platforms"
            ))
        }
    }
}

pub use platform::Transcriber;

impl crate::session::SpeechToText for Transcriber {
    fn transcribe(&self, audio: &[i16]) -> Result<String> {
        Transcriber::transcribe(self, audio)
    }
}

/// Map 16-bit PCM into the [-1.0, 1.0] float range Whisper expects.
pub(crate) fn normalize_samples(samples: &[i16]) -> Vec<f32> {
    samples.iter().map(|&s| f32::from(s) / 32_768.0).collect()
}

/// Stitch Whisper segments into one transcript: strip non-speech markers,
/// collapse whitespace runs, trim the ends.
fn clean_transcript(text: &str) -> String {
    static NON_SPEECH_RE: OnceLock<Regex> = OnceLock::new();
    let re = NON_SPEECH_RE.get_or_init(|| {
        Regex::new(
            r"(?i)[\[(]\s*(?:blank[_ ]audio|silence|noise|inaudible|music|laughter|applause)\s*[\])]",
        )
        .expect("non-speech regex should compile")
    });
    let cleared = re.replace_all(text, " ");
    cleared.split_whitespace().collect::<Vec<_>>().join(" ")
}
