use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use ability_voice::console::{ConsoleRecognizer, ConsoleSynthesizer, FixedPermission, parse_line};
use ability_voice::voice::{
    CommandInterpreter, Interpretation, MemoryPreferenceStore, PreferenceStore, Route, Screen,
    SpeechSynthesizer, clean_for_speech,
};
use ability_voice::{
    ChatSpeechCoordinator, Config, FilePreferenceStore, Platform, ScreenBinding, VoiceNavigator,
};

/// How long `simulate` keeps running after input ends so pending timers fire
const DRAIN_AFTER_EOF: Duration = Duration::from_secs(6);

/// Ability - Voice navigation for the chat assistant
#[derive(Parser)]
#[command(name = "ability", version, about)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show how a transcript would be interpreted
    Classify {
        /// Transcript to classify
        text: String,
        /// Screen the user is on
        #[arg(short, long, default_value = "welcome")]
        screen: Screen,
    },
    /// Drive the navigator from stdin (~interim, final, !error, . for end)
    Simulate {
        /// Screen to start on
        #[arg(short, long, default_value = "welcome")]
        screen: Screen,
        /// Deny microphone permission
        #[arg(long)]
        deny_permission: bool,
    },
    /// Read or change the persisted voice navigation preference
    Preference {
        #[command(subcommand)]
        action: PreferenceAction,
    },
    /// Print the effective configuration
    Config,
    /// Show text as it would be spoken
    Clean {
        /// Text to clean
        text: String,
    },
}

#[derive(Subcommand)]
enum PreferenceAction {
    /// Print the stored value
    Get,
    /// Store a value
    Set {
        #[arg(action = clap::ArgAction::Set)]
        enabled: bool,
    },
    /// Remove the stored value
    Clear,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "warn,ability_voice=info",
        1 => "info,ability_voice=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load()?;
    tracing::debug!(?config, "loaded configuration");

    match cli.command {
        Command::Classify { text, screen } => classify(&config, &text, screen),
        Command::Simulate {
            screen,
            deny_permission,
        } => simulate(&config, screen, !deny_permission).await,
        Command::Preference { action } => preference(&config, &action),
        Command::Config => {
            println!("{config:#?}");
            Ok(())
        }
        Command::Clean { text } => {
            println!("{}", clean_for_speech(&text));
            Ok(())
        }
    }
}

/// Print the interpretation of one transcript
fn classify(config: &Config, text: &str, screen: Screen) -> anyhow::Result<()> {
    let interpreter = CommandInterpreter::new(&config.voice.wake_word)?;
    let command = ability_voice::voice::normalize(text);

    println!("transcript:  {command}");
    println!("wake word:   {}", interpreter.contains_wake_word(&command));
    println!("valid:       {}", interpreter.is_valid_command(&command));
    println!("immediate:   {}", interpreter.is_immediate(&command));

    let outcome = match interpreter.interpret(&command, screen) {
        Interpretation::Command(cmd) => format!("{cmd:?}"),
        Interpretation::WakeWordOnly => "wake word only".to_string(),
        Interpretation::Unrecognized => "not understood".to_string(),
    };
    println!("on {screen}: {outcome}");

    Ok(())
}

/// Read or write the stored preference
fn preference(config: &Config, action: &PreferenceAction) -> anyhow::Result<()> {
    let store = FilePreferenceStore::new(&config.data_dir);

    match action {
        PreferenceAction::Get => match store.load()? {
            Some(enabled) => println!("{enabled}"),
            None => println!("unset (disabled)"),
        },
        PreferenceAction::Set { enabled } => {
            store.save(*enabled)?;
            println!("saved {enabled} to {}", store.path().display());
        }
        PreferenceAction::Clear => {
            store.clear()?;
            println!("cleared");
        }
    }

    Ok(())
}

/// Run the navigator against stdin until input ends
async fn simulate(config: &Config, screen: Screen, granted: bool) -> anyhow::Result<()> {
    let synthesizer: Arc<dyn SpeechSynthesizer> = Arc::new(ConsoleSynthesizer);
    let navigator = VoiceNavigator::new(
        config,
        Platform {
            recognizer: Arc::new(ConsoleRecognizer::default()),
            synthesizer: Arc::clone(&synthesizer),
            permissions: Arc::new(FixedPermission { granted }),
            preferences: Arc::new(MemoryPreferenceStore::default()),
        },
    )?;

    let coordinator = Arc::new(ChatSpeechCoordinator::new(synthesizer, &config.voice));
    let (route_tx, mut route_rx) = mpsc::unbounded_channel::<Route>();
    let (message_tx, mut message_rx) = mpsc::unbounded_channel::<String>();

    let bind = |screen: Screen| {
        let route_tx = route_tx.clone();
        let message_tx = message_tx.clone();
        ScreenBinding::new(screen, move |route| {
            let _ = route_tx.send(route);
        })
        .with_logout(|| println!("[logout]"))
        .with_send_message(move |text| {
            let _ = message_tx.send(text);
        })
    };

    navigator.mount(bind(screen));
    if screen.is_chat() {
        navigator.bind_chat_speech(&coordinator);
    }
    if !navigator.toggle().await {
        anyhow::bail!("microphone permission denied");
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut input_open = true;
    let drain = tokio::time::sleep(DRAIN_AFTER_EOF);
    tokio::pin!(drain);

    loop {
        tokio::select! {
            line = lines.next_line(), if input_open => {
                match line? {
                    Some(line) => {
                        if let Some(event) = parse_line(&line) {
                            navigator.on_recognition_event(&event);
                        }
                    }
                    None => {
                        input_open = false;
                        drain.as_mut().reset(tokio::time::Instant::now() + DRAIN_AFTER_EOF);
                    }
                }
            }
            Some(route) = route_rx.recv() => {
                println!("[navigate] {}", route.path());
                navigator.unmount();
                let next = route.screen();
                navigator.mount(bind(next));
                if next.is_chat() {
                    navigator.bind_chat_speech(&coordinator);
                }
            }
            Some(text) = message_rx.recv() => {
                println!("[send] {text}");
                if let Err(e) = coordinator.speak(&format!("You said: {text}")) {
                    tracing::warn!(error = %e, "reply playback failed");
                }
            }
            () = &mut drain, if !input_open => break,
        }
    }

    let status = navigator.status();
    println!(
        "[status] screen={} enabled={} listening={} state={}",
        status.screen, status.enabled, status.listening, status.state
    );

    Ok(())
}
