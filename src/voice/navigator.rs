//! Voice navigator
//!
//! Owns a [`NavigationSession`] and performs its effects: driving the
//! recognizer, speaking prompts, and invoking the bound screen's callbacks.
//! A background task sleeps until the session's next deadline and ticks it.
//!
//! Effects run after the session lock is released, so callbacks may call
//! straight back into the navigator (a navigate callback mounting the next
//! screen, for instance).

use std::sync::{Arc, Mutex, MutexGuard, Weak};

use tokio::sync::Notify;
use tokio::time::Instant;

use super::adapters::{
    PermissionProvider, PlaybackEvent, RecognitionEvent, RecordingHandle, SpeechParams,
    SpeechRecognizer, SpeechSynthesizer,
};
use super::command::{Route, Screen};
use super::machine::{Capabilities, Effect, NavigationSession, Status};
use super::playback::ChatSpeechCoordinator;
use super::preference::PreferenceStore;
use crate::Result;
use crate::config::{Config, TimingConfig};

/// Called with the destination of a navigation command
pub type NavigateFn = Arc<dyn Fn(Route) + Send + Sync>;

/// Called when the user asks to log out
pub type LogoutFn = Arc<dyn Fn() + Send + Sync>;

/// Called with a dictated chat message
pub type SendMessageFn = Arc<dyn Fn(String) + Send + Sync>;

/// What the current screen exposes to voice commands
#[derive(Clone)]
pub struct ScreenBinding {
    screen: Screen,
    navigate: NavigateFn,
    logout: Option<LogoutFn>,
    send_message: Option<SendMessageFn>,
    recording: Option<RecordingHandle>,
}

impl std::fmt::Debug for ScreenBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScreenBinding")
            .field("screen", &self.screen)
            .field("capabilities", &self.capabilities())
            .finish_non_exhaustive()
    }
}

impl ScreenBinding {
    /// Bind a screen with its navigate callback
    pub fn new(screen: Screen, navigate: impl Fn(Route) + Send + Sync + 'static) -> Self {
        Self {
            screen,
            navigate: Arc::new(navigate),
            logout: None,
            send_message: None,
            recording: None,
        }
    }

    /// Handle "logout" on this screen
    #[must_use]
    pub fn with_logout(mut self, logout: impl Fn() + Send + Sync + 'static) -> Self {
        self.logout = Some(Arc::new(logout));
        self
    }

    /// Accept dictated messages on this screen
    #[must_use]
    pub fn with_send_message(mut self, send: impl Fn(String) + Send + Sync + 'static) -> Self {
        self.send_message = Some(Arc::new(send));
        self
    }

    /// Delegate dictation to an external recorder
    #[must_use]
    pub fn with_recording(mut self, recording: RecordingHandle) -> Self {
        self.recording = Some(recording);
        self
    }

    /// Screen this binding belongs to
    #[must_use]
    pub const fn screen(&self) -> Screen {
        self.screen
    }

    /// Which optional callbacks are present
    #[must_use]
    pub const fn capabilities(&self) -> Capabilities {
        Capabilities {
            logout: self.logout.is_some(),
            send_message: self.send_message.is_some(),
            recorder: self.recording.is_some(),
        }
    }
}

/// Platform services the navigator drives
#[derive(Clone)]
pub struct Platform {
    pub recognizer: Arc<dyn SpeechRecognizer>,
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
    pub permissions: Arc<dyn PermissionProvider>,
    pub preferences: Arc<dyn PreferenceStore>,
}

struct Shared {
    session: Mutex<NavigationSession>,
    binding: Mutex<Option<ScreenBinding>>,
    coordinator: Mutex<Option<Arc<ChatSpeechCoordinator>>>,
    platform: Platform,
    speech: SpeechParams,
    timing: TimingConfig,
    timer: Arc<Notify>,
}

impl Drop for Shared {
    fn drop(&mut self) {
        self.timer.notify_one();
    }
}

/// Voice navigation for a host application
///
/// Cheap to clone; clones share one session.
#[derive(Clone)]
pub struct VoiceNavigator {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for VoiceNavigator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoiceNavigator")
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

impl VoiceNavigator {
    /// Create a navigator and spawn its timer task
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns error if the voice configuration is invalid
    pub fn new(config: &Config, platform: Platform) -> Result<Self> {
        let session = NavigationSession::new(config)?;
        let timer = Arc::new(Notify::new());

        let shared = Arc::new(Shared {
            session: Mutex::new(session),
            binding: Mutex::new(None),
            coordinator: Mutex::new(None),
            platform,
            speech: SpeechParams {
                language: config.voice.language.clone(),
                pitch: config.voice.pitch,
                rate: config.voice.rate,
            },
            timing: config.timing.clone(),
            timer: Arc::clone(&timer),
        });

        tokio::spawn(run_timer(Arc::downgrade(&shared), timer));
        tracing::debug!(wake_word = %config.voice.wake_word, "voice navigator created");

        Ok(Self { shared })
    }

    /// Bind the current screen's callbacks; the latest binding wins
    pub fn initialize(&self, binding: ScreenBinding) {
        let screen = binding.screen();
        let capabilities = binding.capabilities();
        *lock(&self.shared.binding) = Some(binding);
        self.apply(|session, _| session.bind(screen, capabilities));
    }

    /// Screen lifecycle entry: bind, restore preference, schedule listening
    ///
    /// Returns whether voice navigation is enabled.
    pub fn mount(&self, binding: ScreenBinding) -> bool {
        let screen = binding.screen();
        self.initialize(binding);

        let enabled = self.shared.platform.preferences.load_or_default();
        let delay = if screen.is_chat() {
            self.shared.timing.chat_mount_start_delay
        } else {
            self.shared.timing.mount_start_delay
        };

        self.apply(|session, now| {
            session.set_silent_enabled(enabled);
            if enabled {
                session.schedule_start(delay, now);
                session.announce_page(screen, now);
            }
        });

        tracing::info!(%screen, enabled, "voice navigation mounted");
        enabled
    }

    /// Screen lifecycle exit: stop listening and detach reply callbacks
    pub fn unmount(&self) {
        self.stop_listening();
        if let Some(coordinator) = self.coordinator() {
            coordinator.set_speech_start_callback(None);
            coordinator.set_speech_complete_callback(None);
        }
    }

    /// Request microphone permission and enable on success
    ///
    /// Does not start listening.
    pub async fn enable(&self) -> bool {
        let granted = match self.shared.platform.permissions.request_permission().await {
            Ok(status) => status.granted,
            Err(e) => {
                tracing::warn!(error = %e, "microphone permission request failed");
                return false;
            }
        };

        self.apply(|session, _| session.permission_result(granted))
    }

    /// Turn voice commands off
    pub fn disable(&self) {
        self.apply(|session, _| session.disable());
    }

    /// Set the enabled flag with a spoken confirmation
    pub fn set_enabled(&self, enabled: bool) {
        self.apply(|session, _| session.set_enabled(enabled));
    }

    /// Set the enabled flag silently
    pub fn set_silent_enabled(&self, enabled: bool) {
        self.apply(|session, _| session.set_silent_enabled(enabled));
    }

    /// Flip voice navigation, persisting the new value
    ///
    /// Enabling asks for permission and starts listening shortly after.
    pub async fn toggle(&self) -> bool {
        let enabled = if self.is_enabled() {
            self.disable();
            false
        } else {
            let granted = self.enable().await;
            if granted {
                let delay = self.shared.timing.toggle_start_delay;
                self.apply(|session, now| session.schedule_start(delay, now));
            }
            granted
        };

        if let Err(e) = self.shared.platform.preferences.save(enabled) {
            tracing::warn!(error = %e, "failed to save voice navigation preference");
        }
        enabled
    }

    /// Start command listening if enabled and idle
    pub fn start_listening(&self) {
        self.apply(NavigationSession::start_listening);
    }

    /// Stop listening and cancel pending timers
    pub fn stop_listening(&self) {
        self.apply(|session, _| session.stop_listening());
    }

    /// Feed an event from the platform recognizer
    pub fn on_recognition_event(&self, event: &RecognitionEvent) {
        match event {
            RecognitionEvent::Start => tracing::debug!("voice recognition started"),
            RecognitionEvent::End => self.apply(NavigationSession::on_end),
            RecognitionEvent::Error { kind, message } => {
                tracing::debug!(error = %kind, message = message.as_deref().unwrap_or(""), "recognizer error");
                self.apply(|session, now| session.on_error(kind, now));
            }
            RecognitionEvent::Result { .. } => {
                let Some(best) = event.best() else {
                    return;
                };

                // User speech interrupts the assistant before anything else
                if let Some(coordinator) = self.coordinator() {
                    coordinator.stop();
                }

                self.apply(|session, now| session.on_result(&best.transcript, best.is_final, now));
            }
        }
    }

    /// Announce the screen after its settle delay
    pub fn announce_page(&self, screen: Screen) {
        self.apply(|session, now| session.announce_page(screen, now));
    }

    /// Speak the commands available on the current screen
    pub fn announce_commands(&self) {
        self.apply(|session, _| session.announce_commands());
    }

    /// Resume listening after replies and interrupt them on user speech
    ///
    /// On the voice chat screen a bound recorder starts capturing as the
    /// reply begins, so the user can talk over it.
    pub fn bind_chat_speech(&self, coordinator: &Arc<ChatSpeechCoordinator>) {
        let weak = Arc::downgrade(&self.shared);
        coordinator.set_speech_start_callback(Some(Arc::new(move || {
            let Some(shared) = weak.upgrade() else {
                return;
            };
            let recording = lock(&shared.binding)
                .as_ref()
                .filter(|b| b.screen == Screen::VoiceChat)
                .and_then(|b| b.recording.clone());
            if let Some(recording) = recording {
                tracing::debug!("reply started, recording user speech");
                recording.start_recording();
            }
        })));

        let weak = Arc::downgrade(&self.shared);
        coordinator.set_speech_complete_callback(Some(Arc::new(move || {
            if let Some(shared) = weak.upgrade() {
                Self { shared }.apply(NavigationSession::on_reply_finished);
            }
        })));

        *lock(&self.shared.coordinator) = Some(Arc::clone(coordinator));
    }

    /// Status snapshot
    #[must_use]
    pub fn status(&self) -> Status {
        self.session().status()
    }

    /// Enabled and capturing
    #[must_use]
    pub fn is_actively_listening(&self) -> bool {
        self.session().is_actively_listening()
    }

    /// Whether voice commands are on
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.session().is_enabled()
    }

    /// Whether speech is being captured as a chat message
    #[must_use]
    pub fn voice_input_mode(&self) -> bool {
        self.session().voice_input_mode()
    }

    /// Whether a wake word window is open
    #[must_use]
    pub fn wake_word_armed(&self) -> bool {
        self.session().wake_word_armed()
    }

    fn session(&self) -> MutexGuard<'_, NavigationSession> {
        lock(&self.shared.session)
    }

    fn coordinator(&self) -> Option<Arc<ChatSpeechCoordinator>> {
        lock(&self.shared.coordinator).clone()
    }

    fn binding(&self) -> Option<ScreenBinding> {
        lock(&self.shared.binding).clone()
    }

    /// Run `f` against the session, then perform its effects unlocked
    fn apply<R>(&self, f: impl FnOnce(&mut NavigationSession, Instant) -> R) -> R {
        let (result, effects) = {
            let mut session = self.session();
            let result = f(&mut *session, Instant::now());
            (result, session.take_effects())
        };

        for effect in effects {
            self.perform(effect);
        }
        self.shared.timer.notify_one();
        result
    }

    fn tick(&self) {
        self.apply(NavigationSession::tick);
    }

    fn perform(&self, effect: Effect) {
        match effect {
            Effect::StartRecognizer(options) => {
                if let Err(e) = self.shared.platform.recognizer.start(&options) {
                    tracing::warn!(error = %e, "failed to start voice recognition");
                    self.apply(NavigationSession::recognizer_start_failed);
                }
            }
            Effect::StopRecognizer => {
                if let Err(e) = self.shared.platform.recognizer.stop() {
                    tracing::warn!(error = %e, "failed to stop voice recognition");
                }
            }
            Effect::Speak(text) => self.speak(&text),
            Effect::Navigate(route) => {
                if let Some(binding) = self.binding() {
                    (binding.navigate)(route);
                }
            }
            Effect::Logout => {
                if let Some(logout) = self.binding().and_then(|b| b.logout) {
                    logout();
                }
            }
            Effect::SendMessage(text) => {
                if let Some(send) = self.binding().and_then(|b| b.send_message) {
                    send(text);
                }
            }
            Effect::StartRecording => {
                if let Some(recording) = self.binding().and_then(|b| b.recording) {
                    recording.start_recording();
                }
            }
            Effect::StopAndSendRecording => {
                if let Some(recording) = self.binding().and_then(|b| b.recording) {
                    recording.stop_and_send();
                }
            }
        }
    }

    /// Interrupt all playback, then speak a navigation prompt
    fn speak(&self, text: &str) {
        if let Some(coordinator) = self.coordinator() {
            coordinator.stop();
        }

        let synthesizer = &self.shared.platform.synthesizer;
        if let Err(e) = synthesizer.stop() {
            tracing::debug!(error = %e, "failed to stop playback before prompt");
        }

        tracing::debug!(text, "speaking");
        let listener = Box::new(|event: PlaybackEvent| {
            if let PlaybackEvent::Failed(reason) = event {
                tracing::warn!(error = %reason, "prompt playback failed");
            }
        });
        if let Err(e) = synthesizer.speak(text, &self.shared.speech, listener) {
            tracing::warn!(error = %e, "failed to speak prompt");
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Sleep until the session's next deadline, tick, repeat
///
/// Exits once every navigator handle is dropped.
async fn run_timer(shared: Weak<Shared>, timer: Arc<Notify>) {
    loop {
        let Some(deadline) = shared.upgrade().map(|s| lock(&s.session).next_deadline()) else {
            break;
        };

        match deadline {
            Some(at) => {
                tokio::select! {
                    () = tokio::time::sleep_until(at) => {}
                    () = timer.notified() => continue,
                }
            }
            None => {
                timer.notified().await;
                continue;
            }
        }

        let Some(shared) = shared.upgrade() else {
            break;
        };
        VoiceNavigator { shared }.tick();
    }

    tracing::debug!("voice navigator timer stopped");
}
