//! Basic speech pipeline example
//!
//! Uses an in-process engine that renders one tone per line, so it runs
//! without any TTS program installed.

use std::sync::Arc;
use voxdesk_spk::audio::{AudioSegment, PRIMARY_SAMPLE_RATE};
use voxdesk_spk::engines::custom::CustomEngineFactory;
use voxdesk_spk::engines::{split_text, EngineChunk};
use voxdesk_spk::{
    NullOutputDevice, Notification, SpeechConfig, SpeechController, SynthesisRequest,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let factory = CustomEngineFactory::from_fn(
        "tones",
        PRIMARY_SAMPLE_RATE,
        |_language| Ok(()),
        |text, _voice, speed| {
            split_text(text)
                .into_iter()
                .enumerate()
                .map(|(i, chunk)| {
                    let frequency = 330.0 + 110.0 * i as f32;
                    Ok(EngineChunk {
                        segment: AudioSegment::sine(frequency, 0.3 / speed, PRIMARY_SAMPLE_RATE),
                        text: chunk,
                        phonemes: None,
                    })
                })
                .collect()
        },
    );

    let config = SpeechConfig::default();
    let mut controller = SpeechController::new(Arc::new(factory), NullOutputDevice::new(), &config);

    let request = SynthesisRequest::from_config("Hello there.\nThis is voxdesk.", &config)?;
    println!("Synthesizing speech...");
    controller.speak(request)?;

    while let Some(notification) = controller.next_notification().await {
        match notification {
            Notification::Status(status) => println!("{}", status),
            Notification::Playing { duration } => {
                println!("Playing {:.2}s of audio", duration.as_secs_f32())
            }
            Notification::Ready => break,
            Notification::Failed { message, .. } => {
                eprintln!("Failed to synthesize speech: {}", message);
                break;
            }
        }
    }

    Ok(())
}
