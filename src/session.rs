//! Turn loop that sequences capture, transcription, generation, and speech.
//!
//! Everything here is strictly sequential: one capture, one transcription,
//! one reply stream, and one synthesis call at a time. Synthesis of a segment
//! blocks consumption of further tokens, so generation and speech interleave
//! but never overlap.

use crate::chat::{ChatMessage, ReplyStream};
use crate::exit_phrase::is_exit_phrase;
use crate::speech::SegmentBuffer;
use crate::{log_debug, log_debug_content};
use anyhow::Result;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Instruction sent with every request so replies stay short enough to speak.
pub const SYSTEM_PROMPT: &str =
    "You are a helpful voice assistant. Answer in 1 short sentence.";

/// Spoken when the user asks to leave or interrupts the process.
pub const FAREWELL: &str = "Goodbye!";

/// Transcripts shorter than this are treated as silence and skipped.
const MIN_TRANSCRIPT_CHARS: usize = 2;

/// Capture source yielding one fixed window of 16 kHz mono audio per call.
pub trait AudioSource {
    /// Block until exactly `window` of audio has been captured.
    fn record_window(&self, window: Duration) -> Result<Vec<i16>>;
}

/// Speech recognition over a captured window.
pub trait SpeechToText {
    fn transcribe(&self, audio: &[i16]) -> Result<String>;
}

/// Streaming completion source for the conversational model.
pub trait ReplyGenerator {
    fn stream_reply(&self, messages: &[ChatMessage]) -> Result<ReplyStream>;
}

/// Text-to-speech sink; each call blocks until playback completes.
pub trait Synthesizer {
    fn speak(&self, text: &str) -> Result<()>;
}

/// Where the loop currently is in a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Listening,
    Transcribing,
    Generating,
    Exiting,
}

/// Per-session knobs the orchestrator needs.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Length of each capture window.
    pub window: Duration,
    /// Pause after a spoken reply before the next window opens.
    pub cooldown: Duration,
    /// Emit per-turn timing lines to the debug log.
    pub log_timings: bool,
}

/// Drives the session state machine over pluggable engines.
pub struct Conversation<'a> {
    source: &'a dyn AudioSource,
    stt: &'a dyn SpeechToText,
    generator: &'a dyn ReplyGenerator,
    synth: &'a dyn Synthesizer,
    options: SessionOptions,
    interrupt: Arc<AtomicBool>,
    state: SessionState,
    captured: Option<Vec<i16>>,
    pending_prompt: Option<String>,
    record_s: f64,
    stt_s: f64,
}

impl<'a> Conversation<'a> {
    pub fn new(
        source: &'a dyn AudioSource,
        stt: &'a dyn SpeechToText,
        generator: &'a dyn ReplyGenerator,
        synth: &'a dyn Synthesizer,
        options: SessionOptions,
        interrupt: Arc<AtomicBool>,
    ) -> Self {
        Self {
            source,
            stt,
            generator,
            synth,
            options,
            interrupt,
            state: SessionState::Listening,
            captured: None,
            pending_prompt: None,
            record_s: 0.0,
            stt_s: 0.0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Drive the state machine until the session ends.
    pub fn run(&mut self) -> Result<()> {
        while self.state != SessionState::Exiting {
            if self.interrupted() {
                self.finish_interrupted();
                break;
            }
            self.step()?;
        }
        Ok(())
    }

    /// Execute the action of the current state and move to the next one.
    fn step(&mut self) -> Result<()> {
        match self.state {
            SessionState::Listening => self.listen(),
            SessionState::Transcribing => self.transcribe_turn(),
            SessionState::Generating => self.generate_turn(),
            SessionState::Exiting => Ok(()),
        }
    }

    fn listen(&mut self) -> Result<()> {
        println!("\nListening...");
        let start = Instant::now();
        let audio = self.source.record_window(self.options.window)?;
        self.record_s = start.elapsed().as_secs_f64();
        self.captured = Some(audio);
        println!("Thinking...");
        self.set_state(SessionState::Transcribing);
        Ok(())
    }

    fn transcribe_turn(&mut self) -> Result<()> {
        let audio = self.captured.take().unwrap_or_default();
        let start = Instant::now();
        let transcript = self.stt.transcribe(&audio)?;
        self.stt_s = start.elapsed().as_secs_f64();

        // Whisper on a silent window yields "" or a stray character; skip the
        // turn without any user-visible feedback.
        if transcript.chars().count() < MIN_TRANSCRIPT_CHARS {
            log_debug("transcript below minimum length; skipping turn");
            self.set_state(SessionState::Listening);
            return Ok(());
        }

        println!("You: {transcript}");
        log_debug_content(&format!("transcript: {transcript}"));

        if is_exit_phrase(&transcript) {
            self.synth.speak(FAREWELL)?;
            self.set_state(SessionState::Exiting);
            return Ok(());
        }

        self.pending_prompt = Some(transcript);
        self.set_state(SessionState::Generating);
        Ok(())
    }

    fn generate_turn(&mut self) -> Result<()> {
        let prompt = self.pending_prompt.take().unwrap_or_default();
        let messages = [ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(&prompt)];
        let gen_start = Instant::now();
        let mut stream = self.generator.stream_reply(&messages)?;
        let mut segments = SegmentBuffer::new();
        let mut reply = String::new();

        print!("Agent: ");
        let _ = io::stdout().flush();
        loop {
            // Poll between tokens so Ctrl-C lands while the model is still
            // generating; the in-flight stream is cancelled explicitly.
            if self.interrupted() {
                stream.cancel();
                println!();
                self.finish_interrupted();
                return Ok(());
            }
            let Some(token) = stream.next() else { break };
            let token = token?;
            print!("{token}");
            let _ = io::stdout().flush();
            reply.push_str(&token);
            if let Some(segment) = segments.push(&token) {
                self.synth.speak(&segment)?;
            }
        }
        if let Some(rest) = segments.finish() {
            self.synth.speak(&rest)?;
        }
        println!();
        log_debug_content(&format!("reply: {reply}"));
        if self.options.log_timings {
            log_debug(&format!(
                "timing|phase=turn|record_s={:.3}|stt_s={:.3}|gen_s={:.3}",
                self.record_s,
                self.stt_s,
                gen_start.elapsed().as_secs_f64()
            ));
        }

        thread::sleep(self.options.cooldown);
        self.set_state(SessionState::Listening);
        Ok(())
    }

    fn interrupted(&self) -> bool {
        self.interrupt.load(Ordering::Relaxed)
    }

    /// Best-effort farewell on interrupt; synthesis failure is ignored since
    /// the process is on its way out either way.
    fn finish_interrupted(&mut self) {
        println!("\nStopped.");
        let _ = self.synth.speak(FAREWELL);
        self.set_state(SessionState::Exiting);
    }

    fn set_state(&mut self, next: SessionState) {
        log_debug(&format!("state|{:?}->{next:?}", self.state));
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::cell::RefCell;
    use std::io::Cursor;

    struct FixedAudio;

    impl AudioSource for FixedAudio {
        fn record_window(&self, _: Duration) -> Result<Vec<i16>> {
            Ok(vec![0; 16])
        }
    }

    struct FixedTranscript(&'static str);

    impl SpeechToText for FixedTranscript {
        fn transcribe(&self, _: &[i16]) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    /// Replays a scripted NDJSON body through the real stream parser and
    /// counts how often it was asked for a stream.
    struct ScriptedGenerator {
        body: String,
        calls: RefCell<usize>,
        seen_messages: RefCell<Vec<Vec<String>>>,
    }

    impl ScriptedGenerator {
        fn with_tokens(tokens: &[&str]) -> Self {
            let mut body = String::new();
            for token in tokens {
                body.push_str(&format!(
                    "{{\"message\":{{\"content\":{}}},\"done\":false}}\n",
                    serde_json::to_string(token).unwrap()
                ));
            }
            body.push_str("{\"message\":{\"content\":\"\"},\"done\":true}\n");
            Self {
                body,
                calls: RefCell::new(0),
                seen_messages: RefCell::new(Vec::new()),
            }
        }

        fn call_count(&self) -> usize {
            *self.calls.borrow()
        }
    }

    impl ReplyGenerator for ScriptedGenerator {
        fn stream_reply(&self, messages: &[ChatMessage]) -> Result<ReplyStream> {
            *self.calls.borrow_mut() += 1;
            self.seen_messages
                .borrow_mut()
                .push(messages.iter().map(|m| m.content.clone()).collect());
            Ok(ReplyStream::from_reader(Cursor::new(self.body.clone())))
        }
    }

    #[derive(Default)]
    struct RecordingSpeaker {
        spoken: RefCell<Vec<String>>,
        fail: bool,
    }

    impl Synthesizer for RecordingSpeaker {
        fn speak(&self, text: &str) -> Result<()> {
            self.spoken.borrow_mut().push(text.to_string());
            if self.fail {
                return Err(anyhow!("synth broke"));
            }
            Ok(())
        }
    }

    fn options() -> SessionOptions {
        SessionOptions {
            window: Duration::from_millis(0),
            cooldown: Duration::from_millis(0),
            log_timings: false,
        }
    }

    fn no_interrupt() -> Arc<AtomicBool> {
        Arc::new(AtomicBool::new(false))
    }

    #[test]
    fn short_transcript_skips_without_model_call_or_speech() {
        let source = FixedAudio;
        let stt = FixedTranscript("a");
        let generator = ScriptedGenerator::with_tokens(&["never"]);
        let speaker = RecordingSpeaker::default();
        let mut conv = Conversation::new(
            &source,
            &stt,
            &generator,
            &speaker,
            options(),
            no_interrupt(),
        );

        conv.step().unwrap(); // Listening -> Transcribing
        conv.step().unwrap(); // Transcribing -> back to Listening (skip)

        assert_eq!(conv.state(), SessionState::Listening);
        assert_eq!(generator.call_count(), 0);
        assert!(speaker.spoken.borrow().is_empty());
    }

    #[test]
    fn empty_transcript_skips_too() {
        let source = FixedAudio;
        let stt = FixedTranscript("");
        let generator = ScriptedGenerator::with_tokens(&["never"]);
        let speaker = RecordingSpeaker::default();
        let mut conv = Conversation::new(
            &source,
            &stt,
            &generator,
            &speaker,
            options(),
            no_interrupt(),
        );

        conv.step().unwrap();
        conv.step().unwrap();

        assert_eq!(conv.state(), SessionState::Listening);
        assert_eq!(generator.call_count(), 0);
        assert!(speaker.spoken.borrow().is_empty());
    }

    #[test]
    fn exit_transcript_speaks_one_farewell_and_terminates() {
        let source = FixedAudio;
        let stt = FixedTranscript("Okay bye now");
        let generator = ScriptedGenerator::with_tokens(&["never"]);
        let speaker = RecordingSpeaker::default();
        let mut conv = Conversation::new(
            &source,
            &stt,
            &generator,
            &speaker,
            options(),
            no_interrupt(),
        );

        conv.run().unwrap();

        assert_eq!(conv.state(), SessionState::Exiting);
        assert_eq!(*speaker.spoken.borrow(), vec![FAREWELL.to_string()]);
        assert_eq!(generator.call_count(), 0);
    }

    #[test]
    fn terminator_token_flushes_one_spoken_segment() {
        let source = FixedAudio;
        let stt = FixedTranscript("Hello");
        let generator = ScriptedGenerator::with_tokens(&["Hi", " there", "!"]);
        let speaker = RecordingSpeaker::default();
        let mut conv = Conversation::new(
            &source,
            &stt,
            &generator,
            &speaker,
            options(),
            no_interrupt(),
        );

        conv.step().unwrap(); // listen
        conv.step().unwrap(); // transcribe
        assert_eq!(conv.state(), SessionState::Generating);
        conv.step().unwrap(); // generate

        assert_eq!(conv.state(), SessionState::Listening);
        assert_eq!(*speaker.spoken.borrow(), vec!["Hi there!".to_string()]);
        assert_eq!(generator.call_count(), 1);
    }

    #[test]
    fn trailing_text_is_flushed_at_stream_end() {
        let source = FixedAudio;
        let stt = FixedTranscript("Hello");
        let generator = ScriptedGenerator::with_tokens(&["Sure", ".", " more text"]);
        let speaker = RecordingSpeaker::default();
        let mut conv = Conversation::new(
            &source,
            &stt,
            &generator,
            &speaker,
            options(),
            no_interrupt(),
        );

        conv.step().unwrap();
        conv.step().unwrap();
        conv.step().unwrap();

        assert_eq!(
            *speaker.spoken.borrow(),
            vec!["Sure.".to_string(), " more text".to_string()]
        );
    }

    #[test]
    fn generation_request_carries_system_prompt_and_transcript() {
        let source = FixedAudio;
        let stt = FixedTranscript("Hello");
        let generator = ScriptedGenerator::with_tokens(&["Hi", "."]);
        let speaker = RecordingSpeaker::default();
        let mut conv = Conversation::new(
            &source,
            &stt,
            &generator,
            &speaker,
            options(),
            no_interrupt(),
        );

        conv.step().unwrap();
        conv.step().unwrap();
        conv.step().unwrap();

        let seen = generator.seen_messages.borrow();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0], vec![SYSTEM_PROMPT.to_string(), "Hello".to_string()]);
    }

    #[test]
    fn interrupt_before_turn_attempts_farewell_and_exits() {
        let source = FixedAudio;
        let stt = FixedTranscript("Hello");
        let generator = ScriptedGenerator::with_tokens(&["never"]);
        let speaker = RecordingSpeaker::default();
        let interrupt = Arc::new(AtomicBool::new(true));
        let mut conv = Conversation::new(
            &source,
            &stt,
            &generator,
            &speaker,
            options(),
            interrupt,
        );

        conv.run().unwrap();

        assert_eq!(conv.state(), SessionState::Exiting);
        assert_eq!(*speaker.spoken.borrow(), vec![FAREWELL.to_string()]);
        assert_eq!(generator.call_count(), 0);
    }

    #[test]
    fn interrupt_during_generation_cancels_stream_and_exits() {
        let source = FixedAudio;
        let stt = FixedTranscript("Hello");
        let generator = ScriptedGenerator::with_tokens(&["Hi", " there", "!"]);
        let speaker = RecordingSpeaker::default();
        let interrupt = Arc::new(AtomicBool::new(false));
        let mut conv = Conversation::new(
            &source,
            &stt,
            &generator,
            &speaker,
            options(),
            interrupt.clone(),
        );

        conv.step().unwrap();
        conv.step().unwrap();
        assert_eq!(conv.state(), SessionState::Generating);

        interrupt.store(true, Ordering::Relaxed);
        conv.step().unwrap();

        assert_eq!(conv.state(), SessionState::Exiting);
        // Only the farewell: no segment was flushed before cancellation.
        assert_eq!(*speaker.spoken.borrow(), vec![FAREWELL.to_string()]);
    }

    #[test]
    fn farewell_failure_on_interrupt_is_swallowed() {
        let source = FixedAudio;
        let stt = FixedTranscript("Hello");
        let generator = ScriptedGenerator::with_tokens(&["never"]);
        let speaker = RecordingSpeaker {
            spoken: RefCell::new(Vec::new()),
            fail: true,
        };
        let interrupt = Arc::new(AtomicBool::new(true));
        let mut conv = Conversation::new(
            &source,
            &stt,
            &generator,
            &speaker,
            options(),
            interrupt,
        );

        conv.run().unwrap();
        assert_eq!(conv.state(), SessionState::Exiting);
    }
}
