//! Assistant reply playback
//!
//! Speaks chat replies and reports when an utterance starts and when it is
//! over. The completion callback fires exactly once per utterance whether it
//! finished, was interrupted, or failed to play.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use super::adapters::{PlaybackEvent, SpeechParams, SpeechSynthesizer};
use super::text::clean_for_speech;
use crate::Result;
use crate::config::VoiceConfig;

/// Callback for speech lifecycle notifications
pub type SpeechCallback = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct PlaybackState {
    next_id: u64,
    current: Option<u64>,
    /// Utterances whose completion has not been reported yet
    pending: HashSet<u64>,
    on_start: Option<SpeechCallback>,
    on_complete: Option<SpeechCallback>,
}

/// Speaks assistant replies through the shared synthesizer
pub struct ChatSpeechCoordinator {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    params: SpeechParams,
    state: Arc<Mutex<PlaybackState>>,
}

impl std::fmt::Debug for ChatSpeechCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSpeechCoordinator")
            .field("params", &self.params)
            .field("speaking", &self.is_speaking())
            .finish_non_exhaustive()
    }
}

impl ChatSpeechCoordinator {
    /// Create a coordinator using the reply voice settings
    #[must_use]
    pub fn new(synthesizer: Arc<dyn SpeechSynthesizer>, voice: &VoiceConfig) -> Self {
        Self {
            synthesizer,
            params: SpeechParams {
                language: voice.reply_language.clone(),
                pitch: voice.pitch,
                rate: voice.rate,
            },
            state: Arc::new(Mutex::new(PlaybackState::default())),
        }
    }

    /// Speak a reply, interrupting any reply already playing
    ///
    /// Text is cleaned of pictographs and markdown first. A reply with
    /// nothing left to say completes immediately.
    ///
    /// # Errors
    ///
    /// Returns error if the synthesizer refuses the utterance; completion
    /// has already been reported in that case
    pub fn speak(&self, text: &str) -> Result<()> {
        self.stop();

        let cleaned = clean_for_speech(text);
        let id = {
            let mut state = lock(&self.state);
            state.next_id += 1;
            let id = state.next_id;
            state.pending.insert(id);
            state.current = Some(id);
            id
        };

        if cleaned.is_empty() {
            tracing::debug!("reply has nothing speakable");
            finish(&self.state, id);
            return Ok(());
        }

        let shared = Arc::clone(&self.state);
        let listener = Box::new(move |event: PlaybackEvent| match event {
            PlaybackEvent::Started => started(&shared, id),
            PlaybackEvent::Failed(reason) => {
                tracing::warn!(error = %reason, "reply playback failed");
                finish(&shared, id);
            }
            PlaybackEvent::Done | PlaybackEvent::Stopped => finish(&shared, id),
        });

        tracing::debug!(chars = cleaned.len(), "speaking reply");
        if let Err(e) = self.synthesizer.speak(&cleaned, &self.params, listener) {
            tracing::warn!(error = %e, "failed to start reply playback");
            finish(&self.state, id);
            return Err(e);
        }

        Ok(())
    }

    /// Interrupt the current reply; safe to call with nothing playing
    pub fn stop(&self) {
        let Some(id) = lock(&self.state).current.take() else {
            return;
        };

        tracing::debug!("interrupting reply playback");
        if let Err(e) = self.synthesizer.stop() {
            tracing::warn!(error = %e, "failed to stop reply playback");
        }
        finish(&self.state, id);
    }

    /// Whether a reply is in flight
    #[must_use]
    pub fn is_speaking(&self) -> bool {
        lock(&self.state).current.is_some()
    }

    /// Register (or clear) the callback run when a reply starts playing
    pub fn set_speech_start_callback(&self, callback: Option<SpeechCallback>) {
        lock(&self.state).on_start = callback;
    }

    /// Register (or clear) the callback run once a reply is over
    pub fn set_speech_complete_callback(&self, callback: Option<SpeechCallback>) {
        lock(&self.state).on_complete = callback;
    }
}

fn lock(state: &Mutex<PlaybackState>) -> MutexGuard<'_, PlaybackState> {
    state.lock().unwrap_or_else(|e| e.into_inner())
}

fn started(state: &Mutex<PlaybackState>, id: u64) {
    let callback = {
        let state = lock(state);
        if !state.pending.contains(&id) {
            return;
        }
        state.on_start.clone()
    };

    if let Some(callback) = callback {
        callback();
    }
}

fn finish(state: &Mutex<PlaybackState>, id: u64) {
    let callback = {
        let mut state = lock(state);
        if !state.pending.remove(&id) {
            return;
        }
        if state.current == Some(id) {
            state.current = None;
        }
        state.on_complete.clone()
    };

    if let Some(callback) = callback {
        callback();
    }
}
