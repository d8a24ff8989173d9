//! Shared test utilities

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use ability_voice::voice::{
    MemoryPreferenceStore, PermissionProvider, PermissionStatus, PlaybackEvent, PlaybackListener,
    RecognitionOptions, RecordingControl, Route, SpeechParams, SpeechRecognizer,
    SpeechSynthesizer,
};
use ability_voice::{Config, Platform, Result, Screen, ScreenBinding, VoiceNavigator};

/// Recognizer call recorded by [`MockRecognizer`]
#[derive(Debug, Clone, PartialEq)]
pub enum RecognizerCall {
    Start(RecognitionOptions),
    Stop,
}

/// Recognizer that records calls
#[derive(Default)]
pub struct MockRecognizer {
    pub calls: Mutex<Vec<RecognizerCall>>,
    pub fail_start: AtomicBool,
}

impl MockRecognizer {
    pub fn starts(&self) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| matches!(c, RecognizerCall::Start(_)))
            .count()
    }

    pub fn stops(&self) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| matches!(c, RecognizerCall::Stop))
            .count()
    }

    pub fn last_start(&self) -> Option<RecognitionOptions> {
        self.calls.lock().unwrap().iter().rev().find_map(|c| match c {
            RecognizerCall::Start(options) => Some(options.clone()),
            RecognizerCall::Stop => None,
        })
    }
}

impl SpeechRecognizer for MockRecognizer {
    fn start(&self, options: &RecognitionOptions) -> Result<()> {
        self.calls.lock().unwrap().push(RecognizerCall::Start(options.clone()));
        if self.fail_start.load(Ordering::SeqCst) {
            return Err(ability_voice::Error::Recognizer("busy".to_string()));
        }
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        self.calls.lock().unwrap().push(RecognizerCall::Stop);
        Ok(())
    }
}

/// Synthesizer that records utterances and keeps their listeners
#[derive(Default)]
pub struct MockSynthesizer {
    pub spoken: Mutex<Vec<(String, SpeechParams)>>,
    pub listeners: Mutex<Vec<PlaybackListener>>,
    pub stops: AtomicUsize,
}

impl MockSynthesizer {
    pub fn texts(&self) -> Vec<String> {
        self.spoken.lock().unwrap().iter().map(|(t, _)| t.clone()).collect()
    }

    /// Deliver a playback event to the most recent utterance
    pub fn emit_last(&self, event: PlaybackEvent) {
        let listeners = self.listeners.lock().unwrap();
        if let Some(listener) = listeners.last() {
            listener(event);
        }
    }
}

impl SpeechSynthesizer for MockSynthesizer {
    fn speak(&self, text: &str, params: &SpeechParams, listener: PlaybackListener) -> Result<()> {
        self.spoken.lock().unwrap().push((text.to_string(), params.clone()));
        self.listeners.lock().unwrap().push(listener);
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Permission provider with a fixed answer
pub struct MockPermission {
    pub granted: bool,
    pub requests: AtomicUsize,
}

#[async_trait]
impl PermissionProvider for MockPermission {
    async fn request_permission(&self) -> Result<PermissionStatus> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        Ok(PermissionStatus {
            granted: self.granted,
        })
    }
}

/// External recorder that counts calls
#[derive(Default)]
pub struct MockRecorder {
    pub started: AtomicUsize,
    pub sent: AtomicUsize,
}

impl RecordingControl for MockRecorder {
    fn start_recording(&self) {
        self.started.fetch_add(1, Ordering::SeqCst);
    }

    fn stop_and_send(&self) {
        self.sent.fetch_add(1, Ordering::SeqCst);
    }
}

/// Callbacks invoked by the navigator
#[derive(Default)]
pub struct Host {
    pub routes: Mutex<Vec<Route>>,
    pub messages: Mutex<Vec<String>>,
    pub logouts: AtomicUsize,
}

impl Host {
    pub fn routes(&self) -> Vec<Route> {
        self.routes.lock().unwrap().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }

    /// Binding with navigate, logout, and send-message wired to this host
    pub fn binding(self: &Arc<Self>, screen: Screen) -> ScreenBinding {
        let routes = Arc::clone(self);
        let logouts = Arc::clone(self);
        let messages = Arc::clone(self);

        ScreenBinding::new(screen, move |route| routes.routes.lock().unwrap().push(route))
            .with_logout(move || {
                logouts.logouts.fetch_add(1, Ordering::SeqCst);
            })
            .with_send_message(move |text| messages.messages.lock().unwrap().push(text))
    }
}

/// A navigator wired to mocks
pub struct Harness {
    pub navigator: VoiceNavigator,
    pub recognizer: Arc<MockRecognizer>,
    pub synthesizer: Arc<MockSynthesizer>,
    pub permission: Arc<MockPermission>,
    pub preferences: Arc<MemoryPreferenceStore>,
    pub host: Arc<Host>,
}

impl Harness {
    /// Build a navigator; must run inside a Tokio runtime
    pub fn new(granted: bool) -> Self {
        let recognizer = Arc::new(MockRecognizer::default());
        let synthesizer = Arc::new(MockSynthesizer::default());
        let permission = Arc::new(MockPermission {
            granted,
            requests: AtomicUsize::new(0),
        });
        let preferences = Arc::new(MemoryPreferenceStore::default());

        let navigator = VoiceNavigator::new(
            &Config::default(),
            Platform {
                recognizer: recognizer.clone(),
                synthesizer: synthesizer.clone(),
                permissions: permission.clone(),
                preferences: preferences.clone(),
            },
        )
        .expect("failed to create navigator");

        Self {
            navigator,
            recognizer,
            synthesizer,
            permission,
            preferences,
            host: Arc::new(Host::default()),
        }
    }

    /// Bind `screen`, enable, and start listening
    pub async fn listening_on(screen: Screen) -> Self {
        let harness = Self::new(true);
        harness.navigator.initialize(harness.host.binding(screen));
        assert!(harness.navigator.enable().await);
        harness.navigator.start_listening();
        assert!(harness.navigator.is_actively_listening());
        harness
    }
}
