use super::{SpeechEngine, Utterance, VoiceSettings};
use std::process::Stdio;
use tokio::process::Command;
use tokio::sync::oneshot;

/// espeak-ng's default speaking rate in words per minute.
const BASE_WORDS_PER_MINUTE: f32 = 175.0;
/// espeak-ng's neutral pitch on its 0-99 scale.
const BASE_PITCH: f32 = 50.0;

/// Narrates by running an external synthesiser process per utterance.
///
/// Arguments may contain `{voice}`, `{rate}`, `{pitch}` and `{text}`
/// placeholders, filled from the utterance.
pub struct CommandSpeechEngine {
    program: String,
    args: Vec<String>,
    current: Option<oneshot::Sender<()>>,
}

impl CommandSpeechEngine {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            current: None,
        }
    }

    fn render_args(&self, utterance: &Utterance) -> Vec<String> {
        let voice = voice_name(&utterance.voice);
        let rate = (BASE_WORDS_PER_MINUTE * utterance.voice.rate).round() as u32;
        let pitch = (BASE_PITCH * utterance.voice.pitch).round().clamp(0.0, 99.0) as u32;

        self.args
            .iter()
            .map(|arg| {
                arg.replace("{voice}", &voice)
                    .replace("{rate}", &rate.to_string())
                    .replace("{pitch}", &pitch.to_string())
                    .replace("{text}", &utterance.text)
            })
            .collect()
    }
}

/// `ar-SA` -> `ar`; synthesisers generally key voices on the language.
fn voice_name(voice: &VoiceSettings) -> String {
    voice
        .locale
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .to_lowercase()
}

impl SpeechEngine for CommandSpeechEngine {
    fn speak(&mut self, utterance: Utterance) {
        // A replaced sender is dropped, which also ends the previous child.
        self.stop();

        let args = self.render_args(&utterance);
        let spawned = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn();

        let mut child = match spawned {
            Ok(child) => child,
            Err(e) => {
                tracing::warn!(program = %self.program, error = %e, "Failed to start speech synthesiser");
                utterance.stopped();
                return;
            }
        };

        let (stop_tx, stop_rx) = oneshot::channel();
        self.current = Some(stop_tx);

        tokio::spawn(async move {
            tokio::select! {
                status = child.wait() => {
                    match status {
                        Ok(status) if status.success() => utterance.done(),
                        Ok(status) => {
                            tracing::warn!(%status, "Speech synthesiser exited abnormally");
                            utterance.stopped();
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "Lost track of speech synthesiser");
                            utterance.stopped();
                        }
                    }
                }
                _ = stop_rx => {
                    if let Err(e) = child.kill().await {
                        tracing::debug!(error = %e, "Speech synthesiser already gone");
                    }
                    utterance.stopped();
                }
            }
        });
    }

    fn stop(&mut self) {
        if let Some(stop) = self.current.take() {
            let _ = stop.send(());
        }
    }
}

/// Used when narration is disabled: every utterance completes immediately.
#[derive(Debug, Default)]
pub struct SilentSpeechEngine;

impl SpeechEngine for SilentSpeechEngine {
    fn speak(&mut self, utterance: Utterance) {
        utterance.done();
    }

    fn stop(&mut self) {}
}
