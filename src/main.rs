use std::process::ExitCode;
use std::sync::Arc;

use async_trait::async_trait;
use clap::{Parser, Subcommand};
use secrecy::{ExposeSecret, SecretString};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;

use jarvis::voice::{SpeechOutput, SpeechRequest};
use jarvis::{Config, Error, Language, Message, NotificationLevel, Session, SessionEvent};

/// JARVIS - voice and chat assistant
#[derive(Parser)]
#[command(name = "jarvis", version, about)]
struct Cli {
    /// Conversation language ("ro", "en", "ro-RO", "en-US")
    #[arg(short, long, env = "JARVIS_LANGUAGE")]
    language: Option<Language>,

    /// Start in offline mode
    #[arg(long)]
    offline: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Interactive chat session (default)
    Chat,
    /// Answer a single command and exit
    Ask {
        /// Command text
        #[arg(required = true)]
        text: Vec<String>,
        /// Speak the reply
        #[arg(long)]
        speak: bool,
    },
    /// Test speech output
    TestTts {
        /// Text to speak
        #[arg(default_value = "Hello! This is a test of the speech system.")]
        text: String,
    },
    /// Test microphone input
    #[cfg(feature = "audio")]
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Interactive setup
    Setup,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn,jarvis=info",
        1 => "info,jarvis=debug",
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
    if matches!(cli.command, Some(Command::Setup)) {
        return jarvis::setup::run_setup();
    }

    let mut config = Config::load()?;
    if let Some(language) = cli.language {
        config.language = language;
    }
    if cli.offline {
        config.online = false;
    }
    tracing::debug!(?config, "loaded configuration");

    match cli.command.unwrap_or(Command::Chat) {
        Command::Chat => chat(&config).await,
        Command::Ask { text, speak } => ask(&config, &text.join(" "), speak).await,
        Command::TestTts { text } => test_tts(&config, &text).await,
        #[cfg(feature = "audio")]
        Command::TestMic { duration } => test_mic(duration).await,
        Command::Setup => jarvis::setup::run_setup(),
    }
}

/// Interactive terminal session
async fn chat(config: &Config) -> anyhow::Result<()> {
    let session = config.build_session()?;

    for message in session.messages() {
        print_message(&message);
    }
    print_help();

    let renderer = tokio::spawn(render_events(session.subscribe()));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(command) = line.strip_prefix('/') {
            if !handle_command(&session, command) {
                break;
            }
            continue;
        }

        match session.submit(line).await {
            Ok(_) => {}
            Err(Error::Busy) => eprintln!("! Still working on the previous command."),
            Err(e) => eprintln!("! {e}"),
        }
    }

    session.stop_listening();
    session.cancel_speech();
    renderer.abort();
    Ok(())
}

/// Handle a slash command; returns false to quit
fn handle_command(session: &Session, command: &str) -> bool {
    let (name, arg) = command
        .split_once(char::is_whitespace)
        .map_or((command, ""), |(n, a)| (n, a.trim()));

    match name {
        "quit" | "exit" => return false,
        "online" => session.set_online(true),
        "offline" => session.set_online(false),
        "power" => {
            session.toggle_power();
        }
        "lang" => match arg.parse::<Language>() {
            Ok(language) => session.set_language(language),
            Err(e) => eprintln!("! {e}"),
        },
        "listen" => match session.toggle_listening() {
            Ok(true) => println!("(listening...)"),
            Ok(false) => println!("(stopped listening)"),
            Err(e) => eprintln!("! {e}"),
        },
        "stop" => session.cancel_speech(),
        "key" if !arg.is_empty() => {
            session.set_voice_api_key(Some(SecretString::from(arg.to_string())));
        }
        "clear-key" => session.set_voice_api_key(None),
        "history" => {
            for message in session.messages() {
                print_message(&message);
            }
        }
        "status" => println!("{:?}", session.snapshot()),
        _ => print_help(),
    }
    true
}

fn print_help() {
    println!(
        "Commands: /online /offline /power /lang ro|en /listen /stop /key <key> /clear-key /history /status /quit"
    );
}

async fn render_events(mut events: tokio::sync::broadcast::Receiver<SessionEvent>) {
    loop {
        match events.recv().await {
            Ok(SessionEvent::MessageAppended(message)) if !message.is_user() => {
                print_message(&message);
            }
            Ok(SessionEvent::Transcript { text, is_final }) => {
                if is_final {
                    println!("You (voice): {text}");
                } else {
                    println!("  ... {text}");
                }
            }
            Ok(SessionEvent::Notification(notification)) => match notification.level {
                NotificationLevel::Info => {
                    println!("[{}] {}", notification.title, notification.description);
                }
                NotificationLevel::Error => {
                    eprintln!("! {}: {}", notification.title, notification.description);
                }
            },
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "renderer lagged behind session events");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

fn print_message(message: &Message) {
    let who = if message.is_user() { "You" } else { "JARVIS" };
    println!("{who}: {}", message.content);

    for (i, result) in message.search_results.iter().flatten().enumerate() {
        println!("  {}. {} <{}>", i + 1, result.title, result.url);
        if !result.snippet.is_empty() {
            println!("     {}", result.snippet);
        }
    }
}

/// Speech output that stays quiet
struct Silent;

#[async_trait]
impl SpeechOutput for Silent {
    async fn speak(&self, _request: &SpeechRequest) -> jarvis::Result<()> {
        Ok(())
    }
}

/// One-shot command
async fn ask(config: &Config, text: &str, speak: bool) -> anyhow::Result<()> {
    let session = Session::builder()
        .assistant(config.build_assistant()?)
        .speech_output(Arc::new(Silent))
        .language(config.language)
        .online(config.online)
        .build();

    let mut events = session.subscribe();
    let reply = session.submit(text).await?;

    let Some(reply) = reply else {
        while let Ok(event) = events.try_recv() {
            if let SessionEvent::Notification(n) = event {
                anyhow::bail!("{}: {}", n.title, n.description);
            }
        }
        anyhow::bail!("no reply");
    };

    print_message(&reply);

    if speak {
        let language = reply.language.unwrap_or(config.language);
        let request = SpeechRequest::new(reply.content, language).with_api_key(voice_key(config));
        config.build_speech_output().speak(&request).await?;
    }

    Ok(())
}

/// Test speech output
async fn test_tts(config: &Config, text: &str) -> anyhow::Result<()> {
    let key = voice_key(config);
    println!(
        "Speaking with {} voice: \"{text}\"",
        if key.is_some() { "cloud" } else { "local" }
    );

    let request = SpeechRequest::new(text, config.language).with_api_key(key);
    config.build_speech_output().speak(&request).await?;

    println!("\n---");
    println!("If you heard the speech, output is working!");
    Ok(())
}

fn voice_key(config: &Config) -> Option<SecretString> {
    config
        .voice
        .elevenlabs_key
        .as_ref()
        .map(|k| SecretString::from(k.expose_secret().to_owned()))
}

/// Test microphone input
#[cfg(feature = "audio")]
async fn test_mic(duration: u64) -> anyhow::Result<()> {
    use std::time::Duration;

    use jarvis::voice::{AudioCapture, SAMPLE_RATE, calculate_energy};

    println!("Testing microphone for {duration} seconds...");
    println!("Speak into your microphone!\n");

    let mut capture = AudioCapture::new()?;
    capture.start()?;

    println!("Sample rate: {SAMPLE_RATE} Hz");
    println!("---");

    for i in 0..duration {
        tokio::time::sleep(Duration::from_secs(1)).await;

        let samples = capture.take_buffer();
        let energy = calculate_energy(&samples);
        let peak = samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let meter_len = (energy * 100.0).min(50.0) as usize;
        let meter: String = "#".repeat(meter_len) + &" ".repeat(50 - meter_len);

        println!(
            "[{:2}s] RMS: {:.4} | Peak: {:.4} | [{}]",
            i + 1,
            energy,
            peak,
            meter
        );
    }

    capture.stop();

    println!("\n---");
    println!("If you saw movement in the meter, your mic is working!");
    println!("If RMS stayed near 0, check:");
    println!("  1. Is your mic plugged in?");
    println!("  2. Run: arecord -l (to list devices)");

    Ok(())
}
