//! Spoken replies.
//!
//! [`Narrator`] decides what gets read aloud; a [`TextToSpeech`] engine does
//! the talking. [`CommandSpeech`] shells out to a local synthesizer such as
//! `espeak` or `say`.

use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex};

use tokio::process::{Child, Command};
use tokio::runtime::Handle;
use tracing::{debug, warn};

use crate::chat::{Message, MessageRole};

pub const DEFAULT_SPEECH_COMMAND: &str = "espeak";

/// A speech engine. Speaking never blocks and a new utterance replaces the
/// current one.
pub trait TextToSpeech: Send + Sync {
    fn speak(&self, text: &str);
    fn cancel(&self);
}

/// Engine that stays silent.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSpeech;

impl TextToSpeech for NoSpeech {
    fn speak(&self, _text: &str) {}
    fn cancel(&self) {}
}

/// Runs `program [args..] <text>` for every utterance.
#[derive(Debug)]
pub struct CommandSpeech {
    program: String,
    args: Vec<String>,
    current: Mutex<Option<Child>>,
}

impl CommandSpeech {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current: Mutex::new(None),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Whether an utterance is still playing.
    pub fn is_speaking(&self) -> bool {
        let Ok(mut current) = self.current.lock() else {
            return false;
        };
        match current.as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }

    /// Process id of the current utterance, if one was started.
    pub fn pid(&self) -> Option<u32> {
        self.current.lock().ok()?.as_ref().and_then(Child::id)
    }

    /// Kill the current utterance and wait for it to exit.
    pub async fn stop(&self) -> Option<ExitStatus> {
        let mut child = self.current.lock().ok()?.take()?;
        if let Err(err) = child.kill().await {
            debug!("speech process already gone: {err}");
        }
        child.wait().await.ok()
    }

    /// Kill the current utterance without waiting. The exit is reaped in
    /// the background when a runtime is available.
    fn stop_current(current: &mut Option<Child>) {
        let Some(mut child) = current.take() else {
            return;
        };
        if let Err(err) = child.start_kill() {
            debug!("speech process already gone: {err}");
        }
        if let Ok(handle) = Handle::try_current() {
            handle.spawn(async move {
                let _ = child.wait().await;
            });
        }
    }
}

impl TextToSpeech for CommandSpeech {
    fn speak(&self, text: &str) {
        let Ok(mut current) = self.current.lock() else {
            return;
        };
        Self::stop_current(&mut current);

        let spawned = Command::new(&self.program)
            .args(&self.args)
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn();

        match spawned {
            Ok(child) => *current = Some(child),
            Err(err) => warn!("failed to start speech command '{}': {err}", self.program),
        }
    }

    fn cancel(&self) {
        if let Ok(mut current) = self.current.lock() {
            Self::stop_current(&mut current);
        }
    }
}

/// Reads assistant replies aloud while enabled.
pub struct Narrator {
    engine: Arc<dyn TextToSpeech>,
    enabled: bool,
}

impl Narrator {
    pub fn new(engine: Arc<dyn TextToSpeech>, enabled: bool) -> Self {
        Self { engine, enabled }
    }

    pub fn silent() -> Self {
        Self::new(Arc::new(NoSpeech), false)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Turning narration off also cuts off the current utterance.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.engine.cancel();
        }
    }

    pub fn toggle(&mut self) -> bool {
        self.set_enabled(!self.enabled);
        self.enabled
    }

    /// Speak `message` if it is an assistant reply. Returns whether it was
    /// spoken.
    pub fn announce(&self, message: &Message) -> bool {
        if !self.enabled || message.role != MessageRole::Assistant {
            return false;
        }
        self.engine.speak(&message.content);
        true
    }

    pub fn cancel(&self) {
        self.engine.cancel();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[derive(Default)]
    struct RecordingSpeech {
        spoken: Mutex<Vec<String>>,
        cancels: Mutex<usize>,
    }

    impl TextToSpeech for RecordingSpeech {
        fn speak(&self, text: &str) {
            self.spoken.lock().unwrap().push(text.to_string());
        }

        fn cancel(&self) {
            *self.cancels.lock().unwrap() += 1;
        }
    }

    #[test]
    fn test_narrator_speaks_only_assistant_replies() {
        let engine = Arc::new(RecordingSpeech::default());
        let narrator = Narrator::new(engine.clone(), true);

        assert!(narrator.announce(&Message::assistant("Hello there")));
        assert!(!narrator.announce(&Message::user("hi")));
        assert!(!narrator.announce(&Message::error("⚠️ Request failed: offline")));

        assert_eq!(*engine.spoken.lock().unwrap(), vec!["Hello there"]);
    }

    #[test]
    fn test_disabled_narrator_stays_quiet() {
        let engine = Arc::new(RecordingSpeech::default());
        let mut narrator = Narrator::new(engine.clone(), true);

        narrator.set_enabled(false);
        assert!(!narrator.announce(&Message::assistant("Hello")));
        assert!(engine.spoken.lock().unwrap().is_empty());
        assert_eq!(*engine.cancels.lock().unwrap(), 1);

        assert!(narrator.toggle());
        assert!(narrator.announce(&Message::assistant("Back")));
    }

    #[test]
    fn test_silent_narrator() {
        let narrator = Narrator::silent();
        assert!(!narrator.is_enabled());
        assert!(!narrator.announce(&Message::assistant("quiet")));
    }

    #[cfg(unix)]
    fn process_alive(pid: u32) -> bool {
        std::process::Command::new("kill")
            .args(["-0", &pid.to_string()])
            .stderr(Stdio::null())
            .status()
            .is_ok_and(|status| status.success())
    }

    #[cfg(unix)]
    fn sleeping_speech() -> CommandSpeech {
        CommandSpeech::new("sh").with_args(["-c", "sleep 30", "speech"])
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_speech_stop_kills_and_reaps() {
        let speech = sleeping_speech();
        speech.speak("hello");
        assert!(speech.is_speaking());
        let pid = speech.pid().unwrap();

        let status = speech.stop().await.expect("utterance was running");
        assert!(!status.success());
        assert!(!process_alive(pid));
        assert!(!speech.is_speaking());
        assert!(speech.stop().await.is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_speech_cancel_kills_process() {
        let speech = sleeping_speech();
        speech.speak("hello");
        let pid = speech.pid().unwrap();
        assert!(process_alive(pid));

        speech.cancel();

        let mut alive = true;
        for _ in 0..100 {
            if !process_alive(pid) {
                alive = false;
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(!alive, "speech process {pid} survived cancel");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_new_utterance_replaces_current() {
        let speech = sleeping_speech();
        speech.speak("first");
        let first = speech.pid().unwrap();

        speech.speak("second");
        let second = speech.pid().unwrap();
        assert_ne!(first, second);

        let mut alive = true;
        for _ in 0..100 {
            if !process_alive(first) {
                alive = false;
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(!alive);
        speech.stop().await;
    }

    #[tokio::test]
    async fn test_command_speech_missing_program_is_not_fatal() {
        let speech = CommandSpeech::new("jarves-no-such-speech-binary");
        speech.speak("hello");
        assert!(!speech.is_speaking());
        speech.cancel();
    }
}
