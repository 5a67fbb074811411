use std::io;
use std::process::{Child, Command, Stdio};

use tracing::{debug, warn};

use crate::settings::Settings;

/// Words per minute the platform voices use at rate 1.0.
const BASE_WORDS_PER_MINUTE: f32 = 175.0;
/// Slightly slow, for learners.
const SPEECH_RATE: f32 = 0.8;
/// Hong Kong Cantonese voices.
const MACOS_VOICE: &str = "Sinji";
const ESPEAK_VOICE: &str = "yue";

#[derive(Debug, thiserror::Error)]
pub enum SpeechError {
    #[error("Your system does not support text-to-speech.")]
    Unsupported,
    #[error("failed to start speech command: {0}")]
    Spawn(#[source] io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    MacOs,
    Linux,
    Other,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            Platform::MacOs
        } else if cfg!(target_os = "linux") {
            Platform::Linux
        } else {
            Platform::Other
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpeechInvocation {
    pub program: String,
    pub args: Vec<String>,
}

/// Builds the command that pronounces `text`, or `None` when the platform
/// has no known speech command.
pub fn speech_invocation(
    platform: Platform,
    custom_command: Option<&str>,
    text: &str,
) -> Option<SpeechInvocation> {
    if let Some(command) = custom_command {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        let mut args = parts.collect::<Vec<_>>();
        args.push(text.to_string());
        return Some(SpeechInvocation { program, args });
    }

    let words_per_minute = (BASE_WORDS_PER_MINUTE * SPEECH_RATE).round().max(1.0) as u32;
    match platform {
        Platform::MacOs => Some(SpeechInvocation {
            program: "say".to_string(),
            args: vec![
                "-v".to_string(),
                MACOS_VOICE.to_string(),
                "-r".to_string(),
                words_per_minute.to_string(),
                text.to_string(),
            ],
        }),
        Platform::Linux => Some(SpeechInvocation {
            program: "espeak-ng".to_string(),
            args: vec![
                "-v".to_string(),
                ESPEAK_VOICE.to_string(),
                "-s".to_string(),
                words_per_minute.to_string(),
                text.to_string(),
            ],
        }),
        Platform::Other => None,
    }
}

/// Plays pronunciations through the platform speech command, one at a time.
#[derive(Debug)]
pub struct Speaker {
    platform: Platform,
    custom_command: Option<String>,
    current: Option<Child>,
}

impl Speaker {
    pub fn new(settings: &Settings) -> Self {
        Self {
            platform: Platform::current(),
            custom_command: settings.speech_command.clone(),
            current: None,
        }
    }

    /// Starts speaking `text` without waiting for it to finish. Any utterance
    /// still playing is cancelled first.
    pub fn speak(&mut self, text: &str) -> Result<(), SpeechError> {
        let invocation = speech_invocation(
            self.platform,
            self.custom_command.as_deref(),
            text,
        )
        .ok_or(SpeechError::Unsupported)?;

        self.cancel();
        debug!("speaking with {}", invocation.program);
        let child = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|err| {
                if err.kind() == io::ErrorKind::NotFound {
                    SpeechError::Unsupported
                } else {
                    SpeechError::Spawn(err)
                }
            })?;
        self.current = Some(child);
        Ok(())
    }

    pub fn cancel(&mut self) {
        let Some(mut child) = self.current.take() else {
            return;
        };
        if let Ok(None) = child.try_wait() {
            if let Err(err) = child.kill() {
                warn!("failed to stop speech: {}", err);
            }
            let _ = child.wait();
        }
    }
}
