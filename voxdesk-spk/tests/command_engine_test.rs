//! Tests for the external command engine
//! Uses standard unix tools in place of a TTS program

#![cfg(unix)]

use futures::StreamExt;
use hound::{SampleFormat, WavSpec, WavWriter};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, Instant};
use voxdesk_spk::config::CommandEngineConfig;
use voxdesk_spk::engines::command::CommandEngineFactory;
use voxdesk_spk::engines::EngineFactory;
use voxdesk_spk::error::{FailureKind, SpeechError};
use voxdesk_spk::orchestrator::SpeechOrchestrator;
use voxdesk_spk::request::SynthesisRequest;

const WAIT: Duration = Duration::from_secs(5);

fn write_fixture(dir: &Path, samples: usize) -> PathBuf {
    let path = dir.join("fixture.wav");
    let spec = WavSpec {
        channels: 1,
        sample_rate: 24_000,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(&path, spec).unwrap();
    for i in 0..samples {
        writer.write_sample((i % 100) as i16).unwrap();
    }
    writer.finalize().unwrap();
    path
}

fn config(program: &str, args: &[&str]) -> CommandEngineConfig {
    CommandEngineConfig {
        program: PathBuf::from(program),
        args: args.iter().map(|a| a.to_string()).collect(),
        timeout_secs: 10,
        sample_rate: 24_000,
    }
}

#[tokio::test]
async fn test_one_invocation_per_line() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = write_fixture(dir.path(), 1_200);
    let fixture = fixture.to_str().unwrap();
    let factory = CommandEngineFactory::new(config("cp", &[fixture, "{output}"]));

    let engine = factory.initialize("a").await.unwrap();
    assert_eq!(engine.language(), "a");
    assert_eq!(engine.sample_rate(), 24_000);

    let chunks: Vec<_> = engine
        .run("Hello there.\n\nSecond line.", "af_heart", 1.0)
        .unwrap()
        .collect()
        .await;
    assert_eq!(chunks.len(), 2);

    let first = chunks[0].as_ref().unwrap();
    assert_eq!(first.text, "Hello there.");
    assert_eq!(first.segment.len(), 1_200);
    assert_eq!(first.segment.sample_rate(), 24_000);
    assert_eq!(chunks[1].as_ref().unwrap().text, "Second line.");
}

#[tokio::test]
async fn test_placeholders_are_substituted() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = write_fixture(dir.path(), 10);
    let fixture = fixture.to_str().unwrap();
    let script = r#"test "$1" = bf_emma && test "$2" = b && test "$3" = 1.50 && cp "$4" "$5""#;
    let factory = CommandEngineFactory::new(config(
        "sh",
        &["-c", script, "sh", "{voice}", "{lang}", "{speed}", fixture, "{output}"],
    ));
    let engine = factory.initialize("b").await.unwrap();

    let ok: Vec<_> = engine.run("Hi", "bf_emma", 1.5).unwrap().collect().await;
    assert!(ok[0].is_ok());

    let wrong_voice: Vec<_> = engine.run("Hi", "bm_george", 1.5).unwrap().collect().await;
    assert!(wrong_voice[0].is_err());
}

#[tokio::test]
async fn test_text_with_braces_is_passed_verbatim() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = write_fixture(dir.path(), 10);
    let fixture = fixture.to_str().unwrap();
    let script = r#"test "$1" = "say {voice} now" && cp "$2" "$3""#;
    let factory = CommandEngineFactory::new(config(
        "sh",
        &["-c", script, "sh", "{text}", fixture, "{output}"],
    ));
    let engine = factory.initialize("a").await.unwrap();

    let chunks: Vec<_> = engine
        .run("say {voice} now", "af_heart", 1.0)
        .unwrap()
        .collect()
        .await;
    assert!(chunks[0].is_ok());
}

#[tokio::test]
async fn test_nonzero_exit_is_synthesis_error() {
    let factory = CommandEngineFactory::new(config(
        "sh",
        &["-c", "echo 'voice not found' >&2; exit 3", "sh", "{output}"],
    ));
    let engine = factory.initialize("a").await.unwrap();

    let chunks: Vec<_> = engine.run("Hello", "af_heart", 1.0).unwrap().collect().await;
    let err = chunks[0].as_ref().unwrap_err();
    assert_eq!(err.kind(), FailureKind::Synthesis);
    assert!(err.to_string().contains("voice not found"));
}

#[tokio::test]
async fn test_unreadable_output_is_error() {
    let factory = CommandEngineFactory::new(config("true", &["{output}"]));
    let engine = factory.initialize("a").await.unwrap();

    let chunks: Vec<_> = engine.run("Hello", "af_heart", 1.0).unwrap().collect().await;
    assert!(chunks[0].is_err());
}

#[tokio::test]
async fn test_slow_program_times_out() {
    let mut cfg = config("sh", &["-c", "sleep 5", "sh", "{output}"]);
    cfg.timeout_secs = 1;
    let engine = CommandEngineFactory::new(cfg).initialize("a").await.unwrap();

    let chunks: Vec<_> = engine.run("Hello", "af_heart", 1.0).unwrap().collect().await;
    let err = chunks[0].as_ref().unwrap_err();
    assert!(err.to_string().contains("timed out"));
}

#[tokio::test]
async fn test_missing_program_fails_initialization() {
    let factory = CommandEngineFactory::new(config("voxdesk-no-such-tts-program", &["{output}"]));
    let err = factory.initialize("a").await.err().unwrap();
    assert!(matches!(err, SpeechError::EngineInitialization { .. }));
    assert!(err.to_string().contains("not found"));
}

#[tokio::test]
async fn test_unsupported_language_fails_initialization() {
    let factory = CommandEngineFactory::new(config("cp", &["{output}"]));
    let err = factory.initialize("q").await.err().unwrap();
    assert_eq!(err.kind(), FailureKind::EngineInitialization);
}

#[tokio::test]
async fn test_voices_come_from_catalog() {
    let factory = CommandEngineFactory::new(config("cp", &["{output}"]));
    let engine = factory.initialize("b").await.unwrap();
    let voices = engine.list_voices().await.unwrap();
    assert_eq!(voices, vec!["bf_emma", "bf_isabella", "bm_george", "bm_lewis"]);
}

/// Exited and reaped, or at least a zombie
fn process_gone(pid: u32) -> bool {
    let output = Command::new("ps")
        .args(["-o", "stat=", "-p", &pid.to_string()])
        .output()
        .unwrap();
    let stat = String::from_utf8_lossy(&output.stdout);
    stat.trim().is_empty() || stat.trim_start().starts_with('Z')
}

async fn read_pid(path: &Path) -> u32 {
    let deadline = Instant::now() + WAIT;
    loop {
        if let Ok(contents) = std::fs::read_to_string(path) {
            if let Ok(pid) = contents.trim().parse() {
                return pid;
            }
        }
        assert!(Instant::now() < deadline, "program never started");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

#[tokio::test]
async fn test_stop_kills_running_program() {
    let dir = tempfile::tempdir().unwrap();
    let pid_file = dir.path().join("tts.pid");
    let mut cfg = config(
        "sh",
        &["-c", r#"echo $$ > "$1"; exec sleep 30"#, "sh", pid_file.to_str().unwrap(), "{output}"],
    );
    cfg.timeout_secs = 60;

    let (orchestrator, _events) = SpeechOrchestrator::new(
        std::sync::Arc::new(CommandEngineFactory::new(cfg)),
        Duration::from_secs(2),
    );
    let request = SynthesisRequest::new("Hello", "af_heart", "a", 1.0).unwrap();
    orchestrator.submit(request).unwrap();

    let pid = read_pid(&pid_file).await;
    assert!(!process_gone(pid));

    assert!(orchestrator.stop().await);
    assert!(!orchestrator.is_busy());

    let deadline = Instant::now() + WAIT;
    while !process_gone(pid) {
        assert!(Instant::now() < deadline, "program {} still running after stop", pid);
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
