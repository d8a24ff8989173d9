//! Voice navigation state machine
//!
//! Pure state: every input carries the current time and every output is an
//! [`Effect`] for the driver to perform. Each [`State`] owns at most one
//! deadline, replaced on every transition, so a timer can never outlive the
//! state that armed it. Recognizer supervision (watchdog and retries) and
//! deferred page announcements each have one slot of their own.

use std::time::Duration;

use tokio::time::Instant;

use super::adapters::{RecognitionOptions, RecognizerErrorKind};
use super::command::{
    Command, CommandInterpreter, Interpretation, Route, Screen, help_text, normalize,
    not_understood,
};
use super::wake_word::WakeWordDetector;
use crate::config::{Config, TimingConfig};
use crate::Result;

/// Upper bound on timer firings handled by one `tick`
const MAX_FIRINGS_PER_TICK: usize = 32;

const DICTATION_PROMPT: &str = "Speak";
const NETWORK_ADVISORY: &str = "Network connection issue. Voice commands will resume shortly.";
const PERMISSION_DENIED: &str = "Microphone permission is required for voice navigation";

/// Something the driver must do on the machine's behalf
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    StartRecognizer(RecognitionOptions),
    StopRecognizer,
    /// Interrupt any playback and say this
    Speak(String),
    Navigate(Route),
    Logout,
    SendMessage(String),
    StartRecording,
    StopAndSendRecording,
}

/// Phase of a dispatched command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStep {
    /// Recognizer stopped; waiting for residual audio to pass
    Settling,
    /// Command ran; waiting before listening resumes
    CoolingDown,
}

/// Phase of dictation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DictationStep {
    /// "Speak" prompt playing; capture not started yet
    Prompting,
    /// Capturing the message, waiting for silence
    Capturing,
}

/// Where dictated text goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DictationSink {
    /// Send the transcript through the screen's send-message callback
    Message,
    /// Drive the screen's external recorder
    Recorder,
}

/// Navigation state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum State {
    /// Listening (or about to) with nothing pending
    Idle,
    /// Wake word heard; the next utterance is a command
    WakeArmed { expires: Instant },
    /// Partial command buffered until speech settles
    Debouncing {
        transcript: String,
        wake_heard: bool,
        fires: Instant,
    },
    /// A command holds the execution lock
    Executing {
        command: String,
        step: ExecutionStep,
        next: Instant,
    },
    /// Recognized speech is chat content, not commands
    Dictating {
        sink: DictationSink,
        step: DictationStep,
        text: String,
        next: Option<Instant>,
    },
}

impl State {
    /// Deadline of this state's timer slot
    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> {
        match self {
            Self::Idle => None,
            Self::WakeArmed { expires } => Some(*expires),
            Self::Debouncing { fires, .. } => Some(*fires),
            Self::Executing { next, .. } => Some(*next),
            Self::Dictating { next, .. } => *next,
        }
    }

    /// Short name for logs and status
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::WakeArmed { .. } => "wake-armed",
            Self::Debouncing { .. } => "debouncing",
            Self::Executing { .. } => "executing",
            Self::Dictating { .. } => "dictating",
        }
    }
}

/// Snapshot for hosts and debugging
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub enabled: bool,
    pub listening: bool,
    pub screen: Screen,
    pub state: &'static str,
    pub voice_input_mode: bool,
}

/// What the bound screen can receive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub logout: bool,
    pub send_message: bool,
    pub recorder: bool,
}

/// The voice navigation session
#[derive(Debug)]
pub struct NavigationSession {
    interpreter: CommandInterpreter,
    timing: TimingConfig,
    language: String,
    context_hints: Vec<String>,

    enabled: bool,
    listening: bool,
    screen: Screen,
    capabilities: Capabilities,

    state: State,
    supervisor: Option<Instant>,
    announcement: Option<(Instant, String)>,

    last_command: Option<(String, Instant)>,
    last_notice: Option<Instant>,

    effects: Vec<Effect>,
}

impl NavigationSession {
    /// Create a disabled, idle session on the welcome screen
    ///
    /// # Errors
    ///
    /// Returns error if the configured wake word is invalid
    pub fn new(config: &Config) -> Result<Self> {
        let detector = WakeWordDetector::new(vec![config.voice.wake_word.clone()])?;

        Ok(Self {
            interpreter: CommandInterpreter::with_detector(detector)?,
            timing: config.timing.clone(),
            language: config.voice.language.clone(),
            context_hints: config.voice.context_hints.clone(),
            enabled: false,
            listening: false,
            screen: Screen::Welcome,
            capabilities: Capabilities {
                logout: false,
                send_message: false,
                recorder: false,
            },
            state: State::Idle,
            supervisor: None,
            announcement: None,
            last_command: None,
            last_notice: None,
            effects: Vec::new(),
        })
    }

    /// Drain effects produced since the last call
    pub fn take_effects(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.effects)
    }

    /// Rebind to a screen; leaves `enabled` and `listening` untouched
    pub fn bind(&mut self, screen: Screen, capabilities: Capabilities) {
        tracing::debug!(%screen, ?capabilities, "voice navigation bound to screen");
        self.screen = screen;
        self.capabilities = capabilities;
    }

    /// Set the flag and announce the change
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        self.speak_forced(if enabled { "Voice enabled" } else { "Voice disabled" });
    }

    /// Set the flag without speaking, for restoring persisted state
    pub fn set_silent_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Apply the outcome of a microphone permission request
    ///
    /// Does not start listening; the host decides when.
    pub fn permission_result(&mut self, granted: bool) -> bool {
        if granted {
            self.enabled = true;
            self.speak_forced("Voice enabled");
        } else {
            tracing::warn!("microphone permission denied");
            self.speak_forced(PERMISSION_DENIED);
        }
        granted
    }

    /// Turn voice commands off, audibly
    pub fn disable(&mut self) {
        self.enabled = false;
        self.stop_listening();
        self.speak_forced("Voice disabled");
    }

    /// Start command listening
    ///
    /// No-op when disabled, already listening, or while a command or
    /// dictation owns the recognizer.
    pub fn start_listening(&mut self, now: Instant) {
        if !self.enabled || self.listening {
            return;
        }
        if matches!(self.state, State::Executing { .. } | State::Dictating { .. }) {
            tracing::debug!(state = self.state.name(), "recognizer busy, not starting");
            return;
        }

        tracing::debug!("starting voice recognition");
        self.listening = true;
        self.effects.push(Effect::StartRecognizer(RecognitionOptions::commands(
            &self.language,
            &self.context_hints,
        )));
        self.supervisor = Some(now + self.timing.watchdog_interval);
    }

    /// Stop listening and cancel every pending timer
    pub fn stop_listening(&mut self) {
        self.halt_recognizer();
        if self.state != State::Idle {
            tracing::debug!(state = self.state.name(), "pending voice state cancelled");
        }
        self.state = State::Idle;
        self.announcement = None;
    }

    /// The recognizer refused to start
    pub fn recognizer_start_failed(&mut self, now: Instant) {
        self.listening = false;

        if matches!(self.state, State::Dictating { .. }) {
            self.state = State::Idle;
            self.schedule_supervisor(now, self.timing.command_cooldown);
        } else {
            self.schedule_supervisor(now, self.timing.retry_delay);
        }
    }

    /// Recognizer emitted `end`
    pub fn on_end(&mut self, now: Instant) {
        if let State::Dictating { step, text, .. } = &self.state {
            self.listening = false;
            if *step == DictationStep::Capturing && text.is_empty() {
                tracing::debug!("dictation ended without speech");
                self.state = State::Idle;
                self.schedule_supervisor(now, self.timing.empty_dictation_restart);
            }
            return;
        }

        tracing::debug!("voice recognition ended");
        self.listening = false;
    }

    /// Recognizer emitted `error`
    pub fn on_error(&mut self, kind: &RecognizerErrorKind, now: Instant) {
        self.listening = false;

        if matches!(self.state, State::Dictating { .. }) {
            tracing::debug!(error = %kind, "dictation interrupted by recognizer error");
            self.state = State::Idle;
        } else if !matches!(self.state, State::Executing { .. }) {
            self.state = State::Idle;
        }

        match kind {
            RecognizerErrorKind::NoSpeech => {
                tracing::debug!("no speech detected");
                if self.supervisor.is_none() {
                    self.schedule_supervisor(now, self.timing.watchdog_interval);
                }
            }
            RecognizerErrorKind::Aborted => {
                tracing::debug!("speech recognition aborted");
                self.schedule_supervisor(now, self.timing.aborted_retry_delay);
            }
            RecognizerErrorKind::Network => {
                tracing::warn!("network error during speech recognition");
                self.notice_with_cooldown(NETWORK_ADVISORY, now);
                self.schedule_supervisor(now, self.timing.network_retry_delay);
            }
            RecognizerErrorKind::Other(code) => {
                tracing::warn!(error = %code, "speech recognition error");
                self.schedule_supervisor(now, self.timing.retry_delay);
            }
        }
    }

    /// Route a non-empty recognition result
    pub fn on_result(&mut self, transcript: &str, is_final: bool, now: Instant) {
        if transcript.trim().is_empty() {
            return;
        }

        if matches!(self.state, State::Dictating { .. }) {
            self.dictation_input(transcript, now);
            return;
        }

        if !self.enabled {
            tracing::debug!(transcript, "voice disabled, ignoring command");
            return;
        }

        let command = normalize(transcript);
        if is_final {
            self.process_voice_command(&command, now);
        } else {
            self.process_interim_command(&command, now);
        }
    }

    /// Handle a partial transcript: wake word, fast path, or debounce
    pub fn process_interim_command(&mut self, command: &str, now: Instant) {
        if let State::Executing { .. } = self.state {
            tracing::debug!(command, "command already executing, ignoring");
            return;
        }

        if !self.is_wake_armed() && self.interpreter.contains_wake_word(command) {
            tracing::info!("wake word detected, listening for command");
            self.state = State::WakeArmed {
                expires: now + self.timing.wake_window,
            };
            return;
        }

        if self.is_duplicate(command, now) {
            tracing::debug!(command, "duplicate command within cooldown, ignoring");
            return;
        }

        if self.interpreter.is_immediate(command) {
            tracing::debug!(command, "keyword detected, executing immediately");
            self.dispatch(command, now);
            return;
        }

        let wake_heard = self.is_wake_armed();
        self.state = State::Debouncing {
            transcript: command.to_string(),
            wake_heard,
            fires: now + self.timing.interim_debounce,
        };
    }

    /// Handle a final transcript: dispatch without debounce
    pub fn process_voice_command(&mut self, command: &str, now: Instant) {
        if let State::Executing { .. } = self.state {
            tracing::debug!(command, "command already executing, ignoring");
            return;
        }

        if self.is_duplicate(command, now) {
            tracing::debug!(command, "duplicate command within cooldown, ignoring");
            return;
        }

        self.dispatch(command, now);
    }

    /// Announce the page after a short delay, if enabled
    pub fn announce_page(&mut self, screen: Screen, now: Instant) {
        if !self.enabled {
            tracing::debug!(%screen, "voice disabled, not announcing page");
            return;
        }

        let delay = if screen.is_chat() {
            self.timing.chat_announce_delay
        } else {
            self.timing.announce_delay
        };
        self.announcement = Some((now + delay, screen.announcement().to_string()));
    }

    /// Speak the commands valid on the current screen
    pub fn announce_commands(&mut self) {
        let text = help_text(self.screen);
        self.speak(&text);
    }

    /// Start listening after `delay` if still enabled then
    pub fn schedule_start(&mut self, delay: Duration, now: Instant) {
        if self.enabled {
            self.supervisor = Some(now + delay);
        }
    }

    /// The assistant finished (or abandoned) a spoken reply
    pub fn on_reply_finished(&mut self, now: Instant) {
        if !self.enabled || self.listening || self.state != State::Idle {
            return;
        }
        tracing::debug!("assistant reply finished, resuming voice navigation");
        let resume = now + self.timing.reply_resume_delay;
        self.supervisor = Some(self.supervisor.map_or(resume, |at| at.max(resume)));
    }

    /// Earliest pending deadline across all slots
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        [
            self.state.deadline(),
            self.supervisor,
            self.announcement.as_ref().map(|(at, _)| *at),
        ]
        .into_iter()
        .flatten()
        .min()
    }

    /// Fire every slot whose deadline has passed
    pub fn tick(&mut self, now: Instant) {
        for _ in 0..MAX_FIRINGS_PER_TICK {
            match self.next_deadline() {
                Some(deadline) if deadline <= now => self.fire_earliest(now),
                _ => return,
            }
        }
        tracing::warn!("timer firing limit reached in one tick");
    }

    fn fire_earliest(&mut self, now: Instant) {
        let state_due = self.state.deadline();
        let supervisor_due = self.supervisor;
        let announce_due = self.announcement.as_ref().map(|(at, _)| *at);

        let earliest = [state_due, supervisor_due, announce_due].into_iter().flatten().min();

        if earliest.is_some() && earliest == state_due {
            self.fire_state(now);
        } else if earliest.is_some() && earliest == supervisor_due {
            self.fire_supervisor(now);
        } else if let Some((_, text)) = self.announcement.take() {
            self.speak(&text);
        }
    }

    fn fire_state(&mut self, now: Instant) {
        match std::mem::replace(&mut self.state, State::Idle) {
            State::Idle => {}
            State::WakeArmed { .. } => {
                tracing::debug!("no command after wake word, resetting");
            }
            State::Debouncing { transcript, .. } => {
                if self.enabled {
                    tracing::debug!(command = %transcript, "processing interim command after debounce");
                    self.dispatch(&transcript, now);
                }
            }
            State::Executing {
                command,
                step: ExecutionStep::Settling,
                ..
            } => self.execute(command, now),
            State::Executing {
                step: ExecutionStep::CoolingDown,
                ..
            } => {
                if self.enabled {
                    self.start_listening(now);
                }
            }
            State::Dictating {
                sink,
                step: DictationStep::Prompting,
                ..
            } => self.begin_capture(sink),
            State::Dictating {
                sink,
                step: DictationStep::Capturing,
                text,
                ..
            } => self.finish_dictation(sink, &text, now),
        }
    }

    fn fire_supervisor(&mut self, now: Instant) {
        self.supervisor = None;
        if !self.enabled {
            return;
        }

        if self.listening {
            self.supervisor = Some(now + self.timing.watchdog_interval);
        } else {
            tracing::debug!("auto-restarting voice recognition");
            self.start_listening(now);
        }
    }

    /// Take the execution lock and stop the recognizer before running
    fn dispatch(&mut self, command: &str, now: Instant) {
        tracing::info!(command, "voice command received");
        self.last_command = Some((command.to_string(), now));
        self.halt_recognizer();
        self.state = State::Executing {
            command: command.to_string(),
            step: ExecutionStep::Settling,
            next: now + self.timing.command_settle,
        };
    }

    fn execute(&mut self, command: String, now: Instant) {
        match self.interpreter.interpret(&command, self.screen) {
            Interpretation::Command(Command::Navigate(route)) => {
                tracing::info!(route = route.path(), "voice navigation");
                self.effects.push(Effect::Navigate(route));
            }
            Interpretation::Command(Command::Logout) => {
                if self.capabilities.logout {
                    self.effects.push(Effect::Logout);
                } else {
                    tracing::debug!(screen = %self.screen, "logout not available on this screen");
                }
            }
            Interpretation::Command(Command::ShowHelp) => self.announce_commands(),
            Interpretation::Command(Command::StartInput) => {
                if self.enter_dictation(now) {
                    return;
                }
                tracing::warn!(screen = %self.screen, "no dictation target bound");
                self.notice_with_cooldown(not_understood(), now);
            }
            Interpretation::WakeWordOnly | Interpretation::Unrecognized => {
                tracing::debug!(command = %command, "voice command not understood");
                self.notice_with_cooldown(not_understood(), now);
            }
        }

        self.state = State::Executing {
            command,
            step: ExecutionStep::CoolingDown,
            next: now + self.timing.command_cooldown,
        };
    }

    fn enter_dictation(&mut self, now: Instant) -> bool {
        let sink = if self.capabilities.send_message {
            DictationSink::Message
        } else if self.capabilities.recorder {
            DictationSink::Recorder
        } else {
            return false;
        };

        tracing::info!(?sink, "starting voice input mode");
        self.halt_recognizer();
        self.speak(DICTATION_PROMPT);
        self.state = State::Dictating {
            sink,
            step: DictationStep::Prompting,
            text: String::new(),
            next: Some(now + self.timing.dictation_prompt_delay),
        };
        true
    }

    fn begin_capture(&mut self, sink: DictationSink) {
        match sink {
            DictationSink::Message => {
                self.listening = true;
                self.effects
                    .push(Effect::StartRecognizer(RecognitionOptions::dictation(&self.language)));
            }
            DictationSink::Recorder => self.effects.push(Effect::StartRecording),
        }

        self.state = State::Dictating {
            sink,
            step: DictationStep::Capturing,
            text: String::new(),
            next: None,
        };
    }

    fn dictation_input(&mut self, transcript: &str, now: Instant) {
        if let State::Dictating {
            step: DictationStep::Capturing,
            text,
            next,
            ..
        } = &mut self.state
        {
            tracing::debug!(transcript, "voice input received");
            *text = transcript.trim().to_string();
            *next = Some(now + self.timing.dictation_silence);
        }
    }

    fn finish_dictation(&mut self, sink: DictationSink, text: &str, now: Instant) {
        let text = text.trim();
        self.state = State::Idle;

        if text.is_empty() {
            tracing::debug!("no voice input to send, restarting command listening");
            self.halt_recognizer();
            self.schedule_supervisor(now, self.timing.empty_dictation_restart);
            return;
        }

        // Listening resumes once the assistant's reply has been spoken
        tracing::info!(chars = text.len(), "sending voice input");
        match sink {
            DictationSink::Message => {
                self.halt_recognizer();
                self.effects.push(Effect::SendMessage(text.to_string()));
            }
            DictationSink::Recorder => self.effects.push(Effect::StopAndSendRecording),
        }
    }

    fn halt_recognizer(&mut self) {
        if self.listening {
            tracing::debug!("stopping voice recognition");
            self.effects.push(Effect::StopRecognizer);
            self.listening = false;
        }
        self.supervisor = None;
    }

    fn schedule_supervisor(&mut self, now: Instant, delay: Duration) {
        if self.enabled {
            self.supervisor = Some(now + delay);
        }
    }

    fn is_wake_armed(&self) -> bool {
        match &self.state {
            State::WakeArmed { .. } => true,
            State::Debouncing { wake_heard, .. } => *wake_heard,
            _ => false,
        }
    }

    fn is_duplicate(&self, command: &str, now: Instant) -> bool {
        self.last_command.as_ref().is_some_and(|(last, at)| {
            last == command && now.saturating_duration_since(*at) < self.timing.duplicate_cooldown
        })
    }

    fn notice_with_cooldown(&mut self, message: &str, now: Instant) {
        let allowed = self
            .last_notice
            .is_none_or(|at| now.saturating_duration_since(at) > self.timing.error_cooldown);

        if allowed {
            self.speak(message);
            self.last_notice = Some(now);
        } else {
            tracing::debug!(message, "notice suppressed due to cooldown");
        }
    }

    fn speak(&mut self, text: &str) {
        if self.enabled {
            self.speak_forced(text);
        } else {
            tracing::debug!(text, "voice disabled, not speaking");
        }
    }

    fn speak_forced(&mut self, text: &str) {
        self.effects.push(Effect::Speak(text.to_string()));
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> &State {
        &self.state
    }

    /// Whether voice commands are on
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Whether the recognizer is capturing
    #[must_use]
    pub const fn is_listening(&self) -> bool {
        self.listening
    }

    /// Enabled and listening
    #[must_use]
    pub const fn is_actively_listening(&self) -> bool {
        self.enabled && self.listening
    }

    /// Whether a wake word window is open
    #[must_use]
    pub fn wake_word_armed(&self) -> bool {
        self.is_wake_armed()
    }

    /// Whether speech is being treated as chat content
    #[must_use]
    pub const fn voice_input_mode(&self) -> bool {
        matches!(self.state, State::Dictating { .. })
    }

    /// Screen currently bound
    #[must_use]
    pub const fn screen(&self) -> Screen {
        self.screen
    }

    /// Status snapshot
    #[must_use]
    pub fn status(&self) -> Status {
        Status {
            enabled: self.enabled,
            listening: self.listening,
            screen: self.screen,
            state: self.state.name(),
            voice_input_mode: self.voice_input_mode(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: Capabilities = Capabilities {
        logout: true,
        send_message: true,
        recorder: false,
    };

    fn session(screen: Screen) -> (NavigationSession, Instant) {
        let mut session = NavigationSession::new(&Config::default()).unwrap();
        session.bind(screen, ALL);
        session.set_silent_enabled(true);
        let t0 = Instant::now();
        session.start_listening(t0);
        session.take_effects();
        (session, t0)
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn navigations(effects: &[Effect]) -> Vec<Route> {
        effects
            .iter()
            .filter_map(|e| match e {
                Effect::Navigate(r) => Some(*r),
                _ => None,
            })
            .collect()
    }

    fn spoken(effects: &[Effect]) -> Vec<String> {
        effects
            .iter()
            .filter_map(|e| match e {
                Effect::Speak(t) => Some(t.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_final_command_navigates_after_settle() {
        let (mut s, t0) = session(Screen::Welcome);

        s.on_result("Ability open home", true, t0);
        assert_eq!(s.take_effects(), vec![Effect::StopRecognizer]);
        assert!(!s.is_listening());

        s.tick(t0 + ms(499));
        assert!(s.take_effects().is_empty());

        s.tick(t0 + ms(500));
        assert_eq!(navigations(&s.take_effects()), vec![Route::Home]);

        // Cooldown then listening resumes
        s.tick(t0 + ms(2499));
        assert!(s.take_effects().is_empty());
        s.tick(t0 + ms(2500));
        assert!(matches!(s.take_effects().as_slice(), [Effect::StartRecognizer(_)]));
        assert_eq!(s.state(), &State::Idle);
    }

    #[test]
    fn test_interim_wake_word_arms_then_expires() {
        let (mut s, t0) = session(Screen::Welcome);

        s.on_result("ability", false, t0);
        assert!(s.wake_word_armed());
        assert!(s.take_effects().is_empty());

        s.tick(t0 + ms(5000));
        assert!(!s.wake_word_armed());
        assert_eq!(s.state(), &State::Idle);

        // A fresh bare wake word arms a new window
        s.on_result("ability", false, t0 + ms(6000));
        assert_eq!(
            s.state(),
            &State::WakeArmed {
                expires: t0 + ms(11_000)
            }
        );
    }

    #[test]
    fn test_debounce_executes_last_buffered() {
        let (mut s, t0) = session(Screen::Welcome);

        s.on_result("ability", false, t0);
        s.on_result("ability show", false, t0 + ms(300));
        s.on_result("ability show me stuff", false, t0 + ms(600));
        assert_eq!(s.state().name(), "debouncing");

        s.tick(t0 + ms(1599));
        assert_eq!(s.state().name(), "debouncing");

        s.tick(t0 + ms(1600));
        assert_eq!(s.take_effects(), vec![Effect::StopRecognizer]);
        s.tick(t0 + ms(2100));
        assert_eq!(spoken(&s.take_effects()), vec![not_understood().to_string()]);
    }

    #[test]
    fn test_wake_word_during_unarmed_debounce_rearms() {
        let (mut s, t0) = session(Screen::Welcome);

        s.on_result("hmm", false, t0);
        assert_eq!(s.state().name(), "debouncing");

        s.on_result("hmm ability", false, t0 + ms(200));
        assert!(s.wake_word_armed());
        assert_eq!(s.state().name(), "wake-armed");
    }

    #[test]
    fn test_executing_drops_new_transcripts() {
        let (mut s, t0) = session(Screen::Welcome);

        s.on_result("open settings", false, t0);
        s.take_effects();

        s.on_result("open voice", false, t0 + ms(100));
        s.on_result("open text", true, t0 + ms(200));
        s.tick(t0 + ms(500));

        assert_eq!(navigations(&s.take_effects()), vec![Route::Settings]);
    }

    #[test]
    fn test_duplicate_final_within_cooldown() {
        let mut config = Config::default();
        config.timing.command_cooldown = ms(100);
        let mut s = NavigationSession::new(&config).unwrap();
        s.bind(Screen::Welcome, ALL);
        s.set_silent_enabled(true);
        let t0 = Instant::now();

        s.on_result("open settings", true, t0);
        s.tick(t0 + ms(600));
        assert_eq!(navigations(&s.take_effects()), vec![Route::Settings]);
        assert_eq!(s.state(), &State::Idle);

        s.on_result("open settings", true, t0 + ms(1500));
        assert_eq!(s.state(), &State::Idle);

        s.on_result("open settings", true, t0 + ms(2000));
        s.tick(t0 + ms(2500));
        assert_eq!(navigations(&s.take_effects()), vec![Route::Settings]);
    }

    #[test]
    fn test_error_notice_cooldown() {
        let (mut s, t0) = session(Screen::Welcome);
        let mut notices = 0;

        for i in 0..3u64 {
            let at = t0 + ms(i * 300);
            s.notice_with_cooldown(not_understood(), at);
            notices += spoken(&s.take_effects()).len();
        }

        assert_eq!(notices, 1);

        s.notice_with_cooldown(not_understood(), t0 + ms(3100));
        assert_eq!(spoken(&s.take_effects()).len(), 1);
    }

    #[test]
    fn test_start_listening_is_idempotent() {
        let (mut s, t0) = session(Screen::Welcome);

        s.start_listening(t0 + ms(10));
        assert!(s.take_effects().is_empty());

        s.stop_listening();
        assert_eq!(s.take_effects(), vec![Effect::StopRecognizer]);

        s.stop_listening();
        assert!(s.take_effects().is_empty());
    }

    #[test]
    fn test_stop_listening_cancels_pending_command() {
        let (mut s, t0) = session(Screen::Welcome);

        s.on_result("open text", true, t0);
        s.stop_listening();
        s.tick(t0 + ms(10_000));

        assert!(navigations(&s.take_effects()).is_empty());
        assert_eq!(s.next_deadline(), None);
    }

    #[test]
    fn test_watchdog_restarts_silently_stopped_recognizer() {
        let (mut s, t0) = session(Screen::Welcome);

        s.on_end(t0 + ms(100));
        assert!(!s.is_listening());

        s.tick(t0 + ms(5000));
        assert!(matches!(s.take_effects().as_slice(), [Effect::StartRecognizer(_)]));
        assert!(s.is_listening());
        assert_eq!(s.next_deadline(), Some(t0 + ms(10_000)));
    }

    #[test]
    fn test_dictation_flow() {
        let (mut s, t0) = session(Screen::VoiceChat);

        s.on_result("ability start input", true, t0);
        s.tick(t0 + ms(500));
        assert_eq!(spoken(&s.take_effects()), vec!["Speak".to_string()]);
        assert!(s.voice_input_mode());

        s.tick(t0 + ms(2000));
        let effects = s.take_effects();
        assert!(matches!(
            effects.as_slice(),
            [Effect::StartRecognizer(opts)] if opts.punctuation
        ));

        s.on_result("remind me", false, t0 + ms(2500));
        s.on_result("remind me to call Sam", false, t0 + ms(3000));
        s.tick(t0 + ms(4999));
        assert!(s.take_effects().is_empty());

        s.tick(t0 + ms(5000));
        assert_eq!(
            s.take_effects(),
            vec![
                Effect::StopRecognizer,
                Effect::SendMessage("remind me to call Sam".to_string())
            ]
        );
        assert!(!s.voice_input_mode());
        assert!(!s.is_listening());
        assert_eq!(s.next_deadline(), None);

        s.on_reply_finished(t0 + ms(9000));
        s.tick(t0 + ms(9500));
        assert!(matches!(s.take_effects().as_slice(), [Effect::StartRecognizer(_)]));
    }

    #[test]
    fn test_dictation_with_recorder() {
        let (mut s, t0) = session(Screen::VoiceChat);
        s.bind(
            Screen::VoiceChat,
            Capabilities {
                logout: false,
                send_message: false,
                recorder: true,
            },
        );

        s.on_result("start input", true, t0);
        s.tick(t0 + ms(500));
        s.tick(t0 + ms(2000));
        assert!(s.take_effects().contains(&Effect::StartRecording));

        s.on_result("hello there", false, t0 + ms(2100));
        s.tick(t0 + ms(4100));
        assert_eq!(s.take_effects(), vec![Effect::StopAndSendRecording]);
    }

    #[test]
    fn test_start_input_outside_voice_chat() {
        let (mut s, t0) = session(Screen::TextChat);

        s.on_result("start input", true, t0);
        s.tick(t0 + ms(500));

        assert!(!s.voice_input_mode());
        assert_eq!(spoken(&s.take_effects()), vec![not_understood().to_string()]);
    }

    #[test]
    fn test_bare_wake_word_final_is_not_understood() {
        let (mut s, t0) = session(Screen::Welcome);

        s.on_result("ability", true, t0);
        assert_eq!(s.take_effects(), vec![Effect::StopRecognizer]);
        assert!(!s.is_listening());

        s.tick(t0 + ms(500));
        assert_eq!(spoken(&s.take_effects()), vec![not_understood().to_string()]);
        assert!(!s.wake_word_armed());
    }

    #[test]
    fn test_repeated_bare_wake_word_interim_is_not_understood() {
        let (mut s, t0) = session(Screen::Welcome);

        s.on_result("ability", false, t0);
        s.on_result("ability", false, t0 + ms(200));
        s.tick(t0 + ms(1200));
        assert_eq!(s.take_effects(), vec![Effect::StopRecognizer]);
        assert!(!s.wake_word_armed());

        s.tick(t0 + ms(1700));
        assert_eq!(spoken(&s.take_effects()), vec![not_understood().to_string()]);
    }

    #[test]
    fn test_bare_wake_word_notices_are_rate_limited() {
        let (mut s, t0) = session(Screen::Welcome);

        s.on_result("ability", true, t0);
        s.tick(t0 + ms(500));
        assert_eq!(spoken(&s.take_effects()), vec![not_understood().to_string()]);

        // Second notice would land inside the 3 s window
        s.tick(t0 + ms(2500));
        s.take_effects();
        s.on_result("ability", true, t0 + ms(2600));
        s.tick(t0 + ms(3100));
        assert!(spoken(&s.take_effects()).is_empty());
    }

    #[test]
    fn test_disabled_ignores_commands() {
        let (mut s, t0) = session(Screen::Welcome);
        s.set_silent_enabled(false);

        s.on_result("open home", true, t0);
        assert!(s.take_effects().is_empty());
        assert_eq!(s.state(), &State::Idle);
    }

    #[test]
    fn test_disable_speaks_even_when_off() {
        let (mut s, _) = session(Screen::Welcome);

        s.disable();
        assert_eq!(
            s.take_effects(),
            vec![Effect::StopRecognizer, Effect::Speak("Voice disabled".to_string())]
        );
        assert!(!s.is_enabled());
    }

    #[test]
    fn test_permission_denied_keeps_disabled() {
        let mut s = NavigationSession::new(&Config::default()).unwrap();

        assert!(!s.permission_result(false));
        assert!(!s.is_enabled());
        assert_eq!(spoken(&s.take_effects()), vec![PERMISSION_DENIED.to_string()]);

        assert!(s.permission_result(true));
        assert!(s.is_enabled());
        assert!(!s.is_listening());
    }

    #[test]
    fn test_network_error_retries_later() {
        let (mut s, t0) = session(Screen::Welcome);

        s.on_error(&RecognizerErrorKind::Network, t0);
        assert_eq!(spoken(&s.take_effects()), vec![NETWORK_ADVISORY.to_string()]);

        s.tick(t0 + ms(4999));
        assert!(s.take_effects().is_empty());
        s.tick(t0 + ms(5000));
        assert!(matches!(s.take_effects().as_slice(), [Effect::StartRecognizer(_)]));
    }

    #[test]
    fn test_reply_end_keeps_network_backoff() {
        let (mut s, t0) = session(Screen::VoiceChat);

        s.on_error(&RecognizerErrorKind::Network, t0);
        s.take_effects();
        s.on_reply_finished(t0 + ms(1000));

        s.tick(t0 + ms(1500));
        assert!(s.take_effects().is_empty());
        assert!(!s.is_listening());

        s.tick(t0 + ms(5000));
        assert!(matches!(s.take_effects().as_slice(), [Effect::StartRecognizer(_)]));
    }

    #[test]
    fn test_other_error_retries_after_three_seconds() {
        let (mut s, t0) = session(Screen::Welcome);

        s.on_error(&RecognizerErrorKind::Other("audio-capture".to_string()), t0);
        assert!(s.take_effects().is_empty());
        s.tick(t0 + ms(3000));
        assert!(s.is_listening());
    }

    #[test]
    fn test_announce_page_delays() {
        let (mut s, t0) = session(Screen::VoiceChat);

        s.announce_page(Screen::VoiceChat, t0);
        s.tick(t0 + ms(1999));
        assert!(spoken(&s.take_effects()).is_empty());
        s.tick(t0 + ms(2000));
        assert_eq!(spoken(&s.take_effects()), vec!["Voice chat opened".to_string()]);

        s.set_silent_enabled(false);
        s.announce_page(Screen::Welcome, t0);
        assert_eq!(s.next_deadline(), Some(t0 + ms(5000)));
    }

    #[test]
    fn test_logout_requires_binding() {
        let (mut s, t0) = session(Screen::Profile);
        s.on_result("logout", true, t0);
        s.tick(t0 + ms(500));
        assert!(s.take_effects().contains(&Effect::Logout));

        let (mut s, t0) = session(Screen::Profile);
        s.bind(
            Screen::Profile,
            Capabilities {
                logout: false,
                send_message: false,
                recorder: false,
            },
        );
        s.on_result("logout", true, t0);
        s.tick(t0 + ms(500));
        assert!(!s.take_effects().contains(&Effect::Logout));
    }
}
