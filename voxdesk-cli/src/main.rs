// Voxdesk Command Line Interface
// Interactive speech console plus one-shot synthesis tools

mod console;

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;
use voxdesk_spk::audio::{AssembledAudio, AudioSegment};
use voxdesk_spk::config::validate_sample_rate;
use voxdesk_spk::engines::remote::RemoteEngineFactory;
use voxdesk_spk::request::speed_from_percent;
use voxdesk_spk::{
    catalog, engine_factory, wav, EngineFactory, Notification, OutputDevice,
    PlaybackConsumer, PlaybackState, SegmentAssembler, SpeechConfig, SpeechController, SynthesisProducer,
    SynthesisRequest,
};

/// Sample set rendered by `voxdesk voices`
const SAMPLE_VOICES: &[(&str, &str)] = &[
    ("a", "af_heart"),
    ("a", "am_adam"),
    ("b", "bf_emma"),
    ("b", "bm_george"),
];

const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Parser)]
#[command(name = "voxdesk")]
#[command(about = "Voxdesk - Text to speech from the terminal", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file (TOML)
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive console (default)
    Console,

    /// Speak a piece of text once
    Say {
        /// Text to speak
        text: String,

        /// Voice identifier (defaults to the configured voice)
        #[arg(long)]
        voice: Option<String>,

        /// Language code
        #[arg(long)]
        lang: Option<String>,

        /// Speed as a percentage (50-200)
        #[arg(long)]
        speed: Option<u32>,

        /// Volume as a percentage (0-100)
        #[arg(long)]
        volume: Option<u8>,

        /// Write the WAV file here instead of playing it
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Render a sample sentence with several voices
    Voices {
        /// Sentence to render
        #[arg(long, default_value = "Hello! This is a test of the text to speech system.")]
        text: String,

        /// Directory for the WAV files
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },

    /// Play a sine test tone
    Tone {
        #[arg(long, default_value = "440")]
        frequency: f32,

        /// Seconds
        #[arg(long, default_value = "1.0")]
        duration: f32,

        #[arg(long, default_value = "16000")]
        sample_rate: u32,
    },

    /// Check the remote synthesis backend
    RemoteCheck {
        /// Service base URL
        #[arg(long)]
        endpoint: Option<String>,

        /// Service voice name
        #[arg(long)]
        voice: Option<String>,

        #[arg(long, default_value = "Hello, this is a test of the speech service.")]
        text: String,

        /// Also write the received audio to this WAV file
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// List languages and voices
    Languages,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = load_config(cli.config.as_deref())?;

    match cli.command.unwrap_or(Commands::Console) {
        Commands::Console => {
            let controller = SpeechController::new(
                engine_factory(&config),
                output_device(&config),
                &config,
            );
            let mut console = console::InteractiveConsole::new(controller, config);
            console.run().await?;
        }
        Commands::Say { text, voice, lang, speed, volume, output } => {
            let request = build_request(&config, &text, voice, lang, speed)?;
            match output {
                Some(path) => render_to_file(engine_factory(&config), &request, &path).await?,
                None => say(&config, request, volume).await?,
            }
        }
        Commands::Voices { text, out_dir } => render_voices(&config, &text, &out_dir).await?,
        Commands::Tone { frequency, duration, sample_rate } => {
            play_tone(&config, frequency, duration, sample_rate).await?
        }
        Commands::RemoteCheck { endpoint, voice, text, output } => {
            remote_check(&config, endpoint, voice, &text, output.as_deref()).await?
        }
        Commands::Languages => show_languages(),
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> anyhow::Result<SpeechConfig> {
    let mut config = match path {
        Some(path) => SpeechConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => SpeechConfig::default(),
    };
    config.apply_env_overrides();
    config
        .validate()
        .map_err(|e| anyhow!("Invalid configuration: {}", e))?;
    Ok(config)
}

#[cfg(feature = "device")]
fn output_device(config: &SpeechConfig) -> Box<dyn OutputDevice> {
    Box::new(voxdesk_spk::CpalOutputDevice::new(config.output_device.clone()))
}

#[cfg(not(feature = "device"))]
fn output_device(config: &SpeechConfig) -> Box<dyn OutputDevice> {
    if let Some(ref name) = config.output_device {
        tracing::warn!("Output device '{}' ignored: built without the `device` feature", name);
    }
    Box::new(voxdesk_spk::NullOutputDevice::new())
}

fn build_request(
    config: &SpeechConfig,
    text: &str,
    voice: Option<String>,
    lang: Option<String>,
    speed: Option<u32>,
) -> anyhow::Result<SynthesisRequest> {
    let language = lang.unwrap_or_else(|| config.voice.language.clone());
    let voice = match voice {
        Some(voice) => voice,
        // A different language needs one of its own voices
        None if language != config.voice.language => catalog::default_voice(&language)
            .map(str::to_string)
            .ok_or_else(|| anyhow!("Unsupported language code '{}'", language))?,
        None => config.voice.voice.clone(),
    };
    let speed = match speed {
        Some(percent) => speed_from_percent(percent)?,
        None => config.speed,
    };
    Ok(SynthesisRequest::new(text, &voice, &language, speed)?)
}

async fn synthesize_to_buffer(
    producer: &mut SynthesisProducer,
    request: &SynthesisRequest,
) -> anyhow::Result<AssembledAudio> {
    let synthesis = producer.synthesize(request).await?;
    let mut assembler = SegmentAssembler::new(synthesis.sample_rate, 1);
    let mut segments = synthesis.segments;
    while let Some(segment) = segments.next().await {
        assembler.push(segment?)?;
    }
    Ok(assembler.finish()?)
}

async fn render_to_file(
    factory: Arc<dyn EngineFactory>,
    request: &SynthesisRequest,
    path: &Path,
) -> anyhow::Result<()> {
    let mut producer = SynthesisProducer::new(factory);
    let audio = tokio::select! {
        audio = synthesize_to_buffer(&mut producer, request) => audio?,
        _ = tokio::signal::ctrl_c() => {
            println!("Speech stopped");
            return Ok(());
        }
    };
    wav::write_file(path, &audio)?;
    println!(
        "✅ Wrote {:.2}s of audio to {}",
        audio.duration().as_secs_f32(),
        path.display()
    );
    Ok(())
}

async fn say(
    config: &SpeechConfig,
    request: SynthesisRequest,
    volume: Option<u8>,
) -> anyhow::Result<()> {
    let mut controller =
        SpeechController::new(engine_factory(config), output_device(config), config);
    if let Some(volume) = volume {
        controller.set_volume(volume);
    }
    controller.speak(request)?;
    println!("{}", controller.status());

    let mut tick = tokio::time::interval(POLL_INTERVAL);
    loop {
        tokio::select! {
            notification = controller.next_notification() => match notification {
                Some(Notification::Status(status)) => println!("{}", status),
                Some(Notification::Playing { duration }) => {
                    println!("Playing audio... ({:.2}s)", duration.as_secs_f32())
                }
                Some(Notification::Ready) => {}
                Some(Notification::Failed { message, .. }) => return Err(anyhow!(message)),
                None => break,
            },
            _ = tick.tick() => {
                if controller.poll_playback().is_some() {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                controller.stop().await;
                println!("{}", controller.status());
                break;
            }
        }
    }
    Ok(())
}

async fn render_voices(config: &SpeechConfig, text: &str, out_dir: &Path) -> anyhow::Result<()> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;
    let mut producer = SynthesisProducer::new(engine_factory(config));

    let mut failures = 0;
    for &(language, voice) in SAMPLE_VOICES {
        println!("Testing voice: {}", voice);
        let path = out_dir.join(format!("kokoro_test_{}.wav", voice));

        let result = async {
            let request = SynthesisRequest::new(text, voice, language, config.speed)?;
            let audio = synthesize_to_buffer(&mut producer, &request).await?;
            wav::write_file(&path, &audio)?;
            anyhow::Ok(audio)
        }
        .await;

        match result {
            Ok(audio) => println!(
                "✅ Generated {} ({:.2}s)",
                path.display(),
                audio.duration().as_secs_f32()
            ),
            Err(e) => {
                failures += 1;
                println!("❌ Error with voice {}: {}", voice, e);
            }
        }
    }

    if failures == SAMPLE_VOICES.len() {
        return Err(anyhow!("No voice could be rendered"));
    }
    Ok(())
}

async fn play_tone(
    config: &SpeechConfig,
    frequency: f32,
    seconds: f32,
    sample_rate: u32,
) -> anyhow::Result<()> {
    if !(frequency.is_finite() && frequency > 0.0) {
        return Err(anyhow!("Frequency must be positive"));
    }
    if !(seconds.is_finite() && seconds > 0.0 && seconds <= 60.0) {
        return Err(anyhow!("Duration must be between 0 and 60 seconds"));
    }
    validate_sample_rate(sample_rate).map_err(|e| anyhow!(e))?;

    let tone = AudioSegment::sine(frequency, seconds, sample_rate);
    let audio = AssembledAudio::encode(tone.samples(), sample_rate, 1)?;
    info!(frequency, seconds, sample_rate, "Playing test tone");

    let mut consumer = PlaybackConsumer::new(output_device(config));
    consumer.set_gain(config.volume);
    let mut session = consumer.load(audio)?;
    consumer.play(&mut session)?;
    println!("Playing {} Hz for {:.2}s", frequency, seconds);

    let mut tick = tokio::time::interval(POLL_INTERVAL);
    loop {
        tokio::select! {
            _ = tick.tick() => {
                if consumer.refresh(&mut session) == PlaybackState::Stopped {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                consumer.stop(&mut session);
                break;
            }
        }
    }
    println!("✅ Done");
    Ok(())
}

async fn remote_check(
    config: &SpeechConfig,
    endpoint: Option<String>,
    voice: Option<String>,
    text: &str,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let mut remote = config.remote.clone();
    if let Some(endpoint) = endpoint {
        remote.endpoint = endpoint;
    }
    if let Some(voice) = voice {
        remote.voice_name = voice;
    }
    println!("Connecting to {} (voice {})", remote.endpoint, remote.voice_name);

    let mut producer = SynthesisProducer::new(Arc::new(RemoteEngineFactory::new(remote)));
    let request = SynthesisRequest::new(text, &config.voice.voice, &config.voice.language, 1.0)?;
    let audio = synthesize_to_buffer(&mut producer, &request).await?;

    println!(
        "✅ Received {} samples at {} Hz ({:.2}s)",
        audio.sample_count(),
        audio.sample_rate(),
        audio.duration().as_secs_f32()
    );
    if let Some(path) = output {
        wav::write_file(path, &audio)?;
        println!("Saved to {}", path.display());
    }
    Ok(())
}

fn show_languages() {
    println!("🌐 Languages:");
    for language in catalog::LANGUAGES {
        println!("  {}  {}", language.code, language.name);
        println!("     {}", language.voices.join(", "));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_tone_rejects_out_of_range_sample_rate() {
        let config = SpeechConfig::default();
        for rate in [0, 7_999, 192_001, u32::MAX] {
            let err = play_tone(&config, 440.0, 1.0, rate).await.unwrap_err();
            assert!(err.to_string().contains("out of range"), "rate {}", rate);
        }
    }
}
