//! Voxwin - voice-controlled window actuation
//!
//! Run with `voxwin` to start the interactive listener.
//! Use `voxwin devices` to list audio input devices.
//! Use `voxwin send <command>` to drive the actuator by hand.

use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing_subscriber::EnvFilter;
use voxwin::actuator::ActuatorTransport;
use voxwin::audio;
use voxwin::config::{self, Config};
use voxwin::dispatch::{
    console::ConsoleSink,
    file::{FileFormat, FileSink},
    remote::RemoteInferenceHandler,
    RecognitionEvent, ResultDispatcher, SinkTarget,
};
use voxwin::engine::{EngineStatus, EventHandler, RecognitionEngine};

#[derive(Parser)]
#[command(name = "voxwin")]
#[command(author, version, about = "Voice-controlled window actuation")]
#[command(long_about = "
Voxwin listens on the microphone, recognizes speech with a local Vosk
model, and fans the results out to the console, a log file, and an
OpenAI-compatible chat endpoint that turns utterances into window
commands sent over a USB serial link.

SETUP:
  1. Download a Vosk model: https://alphacephei.com/vosk/models
  2. Point [engine].model_path at it (or pass --model)
  3. Plug in the actuator (auto-detected on USB serial)
  4. Run: voxwin
")]
struct Cli {
    /// Path to config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase verbosity (-v = debug, -vv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode (errors only)
    #[arg(short, long)]
    quiet: bool,

    /// Override the Vosk model directory
    #[arg(long, value_name = "DIR")]
    model: Option<String>,

    /// Override the audio input device
    #[arg(long, value_name = "NAME")]
    device: Option<String>,

    /// Override the actuator serial port (or "auto")
    #[arg(long, value_name = "PORT")]
    port: Option<String>,

    /// Override the auto-stop timeout in seconds (0 disables)
    #[arg(long, value_name = "SECS")]
    auto_stop: Option<u64>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the interactive listener (default if no command specified)
    Run,

    /// List audio input devices
    Devices,

    /// Show current configuration
    Config,

    /// Send a raw command to the actuator (e.g. "open50")
    Send {
        /// Command text to transmit
        command: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("voxwin={},warn", log_level))),
        )
        .with_target(false)
        .init();

    let mut config = config::load_config(cli.config.as_deref())?;

    // Apply CLI overrides
    if let Some(model) = cli.model {
        config.engine.model_path = model;
    }
    if let Some(device) = cli.device {
        config.engine.device = device;
    }
    if let Some(port) = cli.port {
        config.actuator.port = port;
    }
    if let Some(secs) = cli.auto_stop {
        config.engine.auto_stop_secs = Some(secs);
    }

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run(config)?,
        Commands::Devices => show_devices()?,
        Commands::Config => println!("{}", config.to_toml()?),
        Commands::Send { command } => send_command(&config, &command)?,
    }

    Ok(())
}

/// Event handler that routes engine output through the dispatcher
struct PipelineHandler {
    dispatcher: ResultDispatcher,
}

impl EventHandler for PipelineHandler {
    fn on_event(&self, event: &RecognitionEvent) {
        self.dispatcher.dispatch(event);
    }

    fn on_status(&self, status: EngineStatus) {
        match status {
            EngineStatus::ListeningStarted => println!("Listening... (Enter to stop)"),
            EngineStatus::ListeningStopped => println!("Stopped listening."),
            EngineStatus::CleanedUp => {}
        }
    }

    fn on_error(&self, message: &str) {
        tracing::error!("Engine error: {}", message);
    }
}

/// Open the actuator link, or degrade to a dry run when no device answers
fn open_actuator(config: &Config) -> Option<Arc<Mutex<ActuatorTransport>>> {
    if !config.actuator.enabled {
        return None;
    }
    let port = match config.actuator.port.as_str() {
        "auto" => None,
        explicit => Some(explicit),
    };
    match ActuatorTransport::connect(port, config.actuator.baudrate) {
        Ok(transport) => Some(Arc::new(Mutex::new(transport))),
        Err(e) => {
            tracing::warn!("Actuator unavailable, running without it: {}", e);
            None
        }
    }
}

/// Wire up the sinks the config enables
fn build_dispatcher(
    config: &Config,
    actuator: Option<Arc<Mutex<ActuatorTransport>>>,
) -> ResultDispatcher {
    let mut dispatcher = ResultDispatcher::new();

    if config.console_output.enabled {
        dispatcher.register(
            SinkTarget::All,
            Box::new(ConsoleSink::new(
                config.console_output.show_partial,
                config.console_output.show_final,
            )),
        );
    }

    if config.file_output.enabled {
        let target = SinkTarget::from_config(&config.file_output.target).unwrap_or_else(|| {
            tracing::warn!(
                "Unknown file_output.target '{}', using 'complete'",
                config.file_output.target
            );
            SinkTarget::Complete
        });
        let format = FileFormat::from_config(&config.file_output.format).unwrap_or_else(|| {
            tracing::warn!(
                "Unknown file_output.format '{}', using 'json'",
                config.file_output.format
            );
            FileFormat::Json
        });
        dispatcher.register(
            target,
            Box::new(FileSink::new(&config.file_output.path, format)),
        );
    }

    if config.remote_inference.enabled {
        let target =
            SinkTarget::from_config(&config.remote_inference.target).unwrap_or(SinkTarget::Final);
        match RemoteInferenceHandler::new(&config.remote_inference, actuator) {
            Ok(handler) => dispatcher.register(target, Box::new(handler)),
            Err(e) => tracing::warn!("Remote inference disabled: {}", e),
        }
    }

    dispatcher
}

/// Interactive listener loop
fn run(config: Config) -> anyhow::Result<()> {
    let actuator = open_actuator(&config);
    let dispatcher = build_dispatcher(&config, actuator);

    if dispatcher.sink_count() == 0 {
        tracing::warn!("No sinks enabled; recognition results will go nowhere");
    }

    let handler = Arc::new(PipelineHandler { dispatcher });
    let mut engine = RecognitionEngine::new(&config.engine, handler)?;

    print_help();

    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("> ");
        io::stdout().flush()?;

        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            break; // EOF
        }

        match line.trim() {
            "" => {
                let result = if engine.is_listening() {
                    engine.stop_listening()
                } else {
                    engine.start_listening()
                };
                if let Err(e) = result {
                    tracing::error!("{}", e);
                }
            }
            "d" | "devices" => show_devices()?,
            "c" | "config" => println!("{}", config.to_toml()?),
            "h" | "help" => print_help(),
            "q" | "quit" | "exit" => break,
            other => println!("Unknown command: {} (h for help)", other),
        }
    }

    engine.cleanup();
    Ok(())
}

fn print_help() {
    println!("Commands:");
    println!("  <Enter>  start/stop listening");
    println!("  d        list audio input devices");
    println!("  c        show configuration");
    println!("  h        this help");
    println!("  q        quit");
}

fn show_devices() -> anyhow::Result<()> {
    let devices = audio::list_input_devices()?;
    if devices.is_empty() {
        println!("No audio input devices found.");
        return Ok(());
    }
    println!("Audio input devices:");
    for device in devices {
        let marker = if device.is_default { " (default)" } else { "" };
        println!(
            "  [{}] {}: {} ch @ {} Hz{}",
            device.index, device.name, device.channels, device.sample_rate, marker
        );
    }
    Ok(())
}

/// Manual actuator test: `voxwin send open50`
fn send_command(config: &Config, command: &str) -> anyhow::Result<()> {
    let port = match config.actuator.port.as_str() {
        "auto" => None,
        explicit => Some(explicit),
    };
    let mut transport = ActuatorTransport::connect(port, config.actuator.baudrate)?;
    println!(
        "Connected to {} @ {} baud",
        transport.port_name().unwrap_or("?"),
        transport.baudrate()
    );

    if transport.send(command) {
        println!("Sent: {}", command);
    } else {
        println!("Failed to send: {}", command);
    }
    transport.cleanup();
    Ok(())
}
