// Voxdesk Interactive Console
// Type text to hear it; colon commands adjust voice, speed and volume

use anyhow::Result;
use std::io::{self, BufRead, Write};
use std::time::Duration;
use tokio::sync::mpsc;
use voxdesk_spk::catalog;
use voxdesk_spk::request::speed_from_percent;
use voxdesk_spk::{
    FailureKind, Notification, OutputDevice, SpeechConfig, SpeechController, SynthesisRequest,
};

const PLAYBACK_POLL: Duration = Duration::from_millis(100);

pub struct InteractiveConsole<D: OutputDevice> {
    controller: SpeechController<D>,
    config: SpeechConfig,
    volume: u8,
    history: Vec<String>,
}

/// A parsed console line
#[derive(Debug, PartialEq)]
pub enum ConsoleCommand {
    Speak(String),
    Stop,
    Volume(u8),
    Speed(u32),
    Language(String),
    Voice(String),
    Voices,
    Languages,
    Status,
    History,
    Clear,
    Help,
    Quit,
    Empty,
    Invalid(String),
}

enum CommandResult {
    Continue,
    Exit,
    Success(String),
    Error(String),
    Output(String),
}

impl<D: OutputDevice> InteractiveConsole<D> {
    pub fn new(controller: SpeechController<D>, config: SpeechConfig) -> Self {
        let volume = (config.volume * 100.0).round() as u8;
        Self {
            controller,
            config,
            volume,
            history: Vec::new(),
        }
    }

    /// Start the interactive console
    pub async fn run(&mut self) -> Result<()> {
        self.print_banner();

        // Blocking stdin reads stay off the runtime
        let (line_tx, mut lines) = mpsc::unbounded_channel::<String>();
        std::thread::spawn(move || {
            let stdin = io::stdin();
            for line in stdin.lock().lines() {
                match line {
                    Ok(line) => {
                        if line_tx.send(line).is_err() {
                            break;
                        }
                    }
                    Err(_) => break,
                }
            }
        });

        let mut tick = tokio::time::interval(PLAYBACK_POLL);
        self.prompt()?;

        loop {
            tokio::select! {
                line = lines.recv() => {
                    let Some(line) = line else { break };
                    let line = line.trim().to_string();
                    if !line.is_empty() && !self.history.contains(&line) {
                        self.history.push(line.clone());
                    }

                    match self.handle_command(parse_command(&line)).await {
                        CommandResult::Continue => {}
                        CommandResult::Exit => break,
                        CommandResult::Success(msg) => println!("✅ {}", msg),
                        CommandResult::Error(msg) => println!("❌ Error: {}", msg),
                        CommandResult::Output(output) => println!("{}", output),
                    }
                    self.prompt()?;
                }
                notification = self.controller.next_notification() => {
                    if let Some(notification) = notification {
                        self.show(notification);
                    }
                }
                _ = tick.tick() => {
                    if let Some(notification) = self.controller.poll_playback() {
                        self.show(notification);
                        self.prompt()?;
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    let notification = self.controller.stop().await;
                    println!();
                    self.show(notification);
                    self.prompt()?;
                }
            }
        }

        self.controller.stop().await;
        println!("\n👋 Goodbye!");
        Ok(())
    }

    fn print_banner(&self) {
        println!("\n╔═══════════════════════════════════════════════════════════════╗");
        println!("║                    Voxdesk Speech Console                     ║");
        println!("╚═══════════════════════════════════════════════════════════════╝");
        println!();
        println!("Language: {}  Voice: {}", self.language_label(), self.config.voice.voice);
        println!("Type text and press Enter to speak. ':help' lists commands.");
        println!();
    }

    fn print_help(&self) {
        println!("📚 Available Commands:");
        println!("  <text>            - Speak the text");
        println!("  :stop             - Stop synthesis and playback");
        println!("  :volume <0-100>   - Set playback volume");
        println!("  :speed <50-200>   - Set speaking speed in percent");
        println!("  :lang <code>      - Switch language");
        println!("  :voice <name>     - Switch voice");
        println!("  :voices           - List voices for the current language");
        println!("  :languages        - List languages");
        println!("  :status           - Show current settings");
        println!("  :history          - Show input history");
        println!("  :clear            - Clear the screen");
        println!("  :help             - Show this help message");
        println!("  :quit             - Exit the console");
        println!();
    }

    fn prompt(&self) -> io::Result<()> {
        print!("voxdesk[{}]> ", self.config.voice.voice);
        io::stdout().flush()
    }

    fn language_label(&self) -> String {
        match catalog::find(&self.config.voice.language) {
            Some(language) => format!("{} ({})", language.name, language.code),
            None => self.config.voice.language.clone(),
        }
    }

    fn show(&self, notification: Notification) {
        match notification {
            Notification::Status(status) => println!("\r🔊 {}", status),
            Notification::Playing { duration } => {
                println!("\r▶️  {} ({:.2}s)", self.controller.status(), duration.as_secs_f32())
            }
            Notification::Ready => {}
            Notification::Failed { kind, message } => match kind {
                FailureKind::EngineInitialization => {
                    println!("\r❌ Error: {}\n   Check that the TTS engine is installed.", message)
                }
                _ => println!("\r❌ Error: {}", message),
            },
        }
    }

    async fn handle_command(&mut self, command: ConsoleCommand) -> CommandResult {
        match command {
            ConsoleCommand::Empty => CommandResult::Continue,
            ConsoleCommand::Quit => CommandResult::Exit,
            ConsoleCommand::Help => {
                self.print_help();
                CommandResult::Continue
            }
            ConsoleCommand::Clear => {
                print!("\x1B[2J\x1B[1;1H");
                CommandResult::Continue
            }
            ConsoleCommand::Speak(text) => self.speak(&text),
            ConsoleCommand::Stop => match self.controller.stop().await {
                Notification::Status(status) => CommandResult::Success(status),
                _ => CommandResult::Continue,
            },
            ConsoleCommand::Volume(percent) => {
                self.volume = percent;
                self.controller.set_volume(percent);
                CommandResult::Success(format!("Volume: {}%", percent))
            }
            ConsoleCommand::Speed(percent) => match speed_from_percent(percent) {
                Ok(speed) => {
                    self.config.speed = speed;
                    CommandResult::Success(format!("Speed: {}%", percent))
                }
                Err(e) => CommandResult::Error(e.to_string()),
            },
            ConsoleCommand::Language(code) => self.set_language(&code),
            ConsoleCommand::Voice(voice) => self.set_voice(&voice),
            ConsoleCommand::Voices => {
                let voices = catalog::voices(&self.config.voice.language);
                let mut out = format!("🎙️  Voices for {}:", self.language_label());
                for voice in voices {
                    let marker = if *voice == self.config.voice.voice { "*" } else { " " };
                    out.push_str(&format!("\n  {} {}", marker, voice));
                }
                CommandResult::Output(out)
            }
            ConsoleCommand::Languages => {
                let mut out = "🌐 Languages:".to_string();
                for language in catalog::LANGUAGES {
                    out.push_str(&format!("\n  {}  {}", language.code, language.name));
                }
                CommandResult::Output(out)
            }
            ConsoleCommand::Status => CommandResult::Output(format!(
                "Status:   {}\nLanguage: {}\nVoice:    {}\nSpeed:    {:.0}%\nVolume:   {}%",
                self.controller.status(),
                self.language_label(),
                self.config.voice.voice,
                self.config.speed * 100.0,
                self.volume
            )),
            ConsoleCommand::History => {
                let mut out = "📜 History:".to_string();
                for (i, line) in self.history.iter().enumerate() {
                    out.push_str(&format!("\n  {}: {}", i + 1, line));
                }
                CommandResult::Output(out)
            }
            ConsoleCommand::Invalid(msg) => CommandResult::Error(msg),
        }
    }

    fn speak(&mut self, text: &str) -> CommandResult {
        let request = match SynthesisRequest::new(
            text,
            &self.config.voice.voice,
            &self.config.voice.language,
            self.config.speed,
        ) {
            Ok(request) => request,
            Err(e) => return CommandResult::Error(e.to_string()),
        };

        match self.controller.speak(request) {
            Ok(_) => CommandResult::Output(format!("🔊 {}", self.controller.status())),
            Err(e) => CommandResult::Error(e.to_string()),
        }
    }

    fn set_language(&mut self, code: &str) -> CommandResult {
        let Some(language) = catalog::find(code) else {
            return CommandResult::Error(format!(
                "Unknown language '{}'. Try :languages",
                code
            ));
        };

        self.config.voice.language = language.code.to_string();
        if !language.voices.contains(&self.config.voice.voice.as_str()) {
            if let Some(voice) = language.voices.first() {
                self.config.voice.voice = voice.to_string();
            }
        }
        CommandResult::Success(format!(
            "Language: {} (voice {})",
            language.name, self.config.voice.voice
        ))
    }

    fn set_voice(&mut self, voice: &str) -> CommandResult {
        let voices = catalog::voices(&self.config.voice.language);
        if !voices.contains(&voice) {
            return CommandResult::Error(format!(
                "Voice '{}' is not available for {}. Try :voices",
                voice,
                self.language_label()
            ));
        }
        self.config.voice.voice = voice.to_string();
        CommandResult::Success(format!("Voice: {}", voice))
    }
}

/// Parse one console line; anything not starting with ':' is spoken
pub fn parse_command(line: &str) -> ConsoleCommand {
    let line = line.trim();
    if line.is_empty() {
        return ConsoleCommand::Empty;
    }
    let Some(command) = line.strip_prefix(':') else {
        return ConsoleCommand::Speak(line.to_string());
    };

    let mut parts = command.split_whitespace();
    let name = parts.next().unwrap_or("").to_lowercase();
    let arg = parts.next();

    match (name.as_str(), arg) {
        ("quit" | "exit" | "q", _) => ConsoleCommand::Quit,
        ("help" | "?", _) => ConsoleCommand::Help,
        ("clear" | "cls", _) => ConsoleCommand::Clear,
        ("stop", _) => ConsoleCommand::Stop,
        ("voices", _) => ConsoleCommand::Voices,
        ("languages" | "langs", _) => ConsoleCommand::Languages,
        ("status", _) => ConsoleCommand::Status,
        ("history", _) => ConsoleCommand::History,
        ("volume" | "vol", Some(value)) => match value.trim_end_matches('%').parse::<u8>() {
            Ok(percent) if percent <= 100 => ConsoleCommand::Volume(percent),
            _ => ConsoleCommand::Invalid("Volume must be between 0 and 100".to_string()),
        },
        ("speed", Some(value)) => match value.trim_end_matches('%').parse::<u32>() {
            Ok(percent) => ConsoleCommand::Speed(percent),
            Err(_) => ConsoleCommand::Invalid("Speed must be a percentage (50-200)".to_string()),
        },
        ("lang" | "language", Some(code)) => ConsoleCommand::Language(code.to_string()),
        ("voice", Some(voice)) => ConsoleCommand::Voice(voice.to_string()),
        ("volume" | "vol" | "speed" | "lang" | "language" | "voice", None) => {
            ConsoleCommand::Invalid(format!("Usage: :{} <value>", name))
        }
        _ => ConsoleCommand::Invalid(format!("Unknown command ':{}'. Try :help", name)),
    }
}
