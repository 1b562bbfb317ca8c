//! Tests for request validation and the voice catalog

use tokio_test::{assert_err, assert_ok};
use voxdesk_spk::catalog;
use voxdesk_spk::config::SpeechConfig;
use voxdesk_spk::engines::split_text;
use voxdesk_spk::error::{FailureKind, SpeechError};
use voxdesk_spk::request::{speed_from_percent, SynthesisRequest};

#[test]
fn test_request_trims_text() {
    let request = SynthesisRequest::new("  Hello world \n", "af_heart", "a", 1.0).unwrap();
    assert_eq!(request.text(), "Hello world");
    assert_eq!(request.voice(), "af_heart");
    assert_eq!(request.language(), "a");
    assert_eq!(request.speed(), 1.0);
}

#[test]
fn test_blank_text_is_rejected() {
    for text in ["", "   ", "\n\t"] {
        let err = SynthesisRequest::new(text, "af_heart", "a", 1.0).unwrap_err();
        assert_eq!(err.kind(), FailureKind::Rejected);
        assert!(err.to_string().contains("Please enter some text to speak"));
    }
}

#[test]
fn test_null_bytes_are_rejected() {
    let result = SynthesisRequest::new("Hello\0world", "af_heart", "a", 1.0);
    assert!(matches!(result, Err(SpeechError::InvalidRequest(_))));
}

#[test]
fn test_oversized_text_is_rejected() {
    let text = "a".repeat(100_001);
    assert!(SynthesisRequest::new(&text, "af_heart", "a", 1.0).is_err());

    let text = "a".repeat(100_000);
    assert!(SynthesisRequest::new(&text, "af_heart", "a", 1.0).is_ok());
}

#[test]
fn test_voice_and_language_are_checked() {
    assert!(SynthesisRequest::new("Hi", "", "a", 1.0).is_err());
    assert!(SynthesisRequest::new("Hi", "af\nheart", "a", 1.0).is_err());
    assert!(SynthesisRequest::new("Hi", "af_heart", "", 1.0).is_err());
    assert!(SynthesisRequest::new("Hi", "af_heart", "a b", 1.0).is_err());
    assert!(SynthesisRequest::new("Hi", "af_heart", "en-US", 1.0).is_ok());
}

#[test]
fn test_speed_range() {
    assert_err!(SynthesisRequest::new("Hi", "af_heart", "a", 0.49));
    assert_err!(SynthesisRequest::new("Hi", "af_heart", "a", 2.01));
    assert_err!(SynthesisRequest::new("Hi", "af_heart", "a", f32::NAN));
    assert_ok!(SynthesisRequest::new("Hi", "af_heart", "a", 0.5));
    assert_ok!(SynthesisRequest::new("Hi", "af_heart", "a", 2.0));
}

#[test]
fn test_speed_from_percent() {
    assert_eq!(speed_from_percent(100).unwrap(), 1.0);
    assert_eq!(speed_from_percent(50).unwrap(), 0.5);
    assert_eq!(speed_from_percent(200).unwrap(), 2.0);
    assert!(speed_from_percent(49).is_err());
    assert!(speed_from_percent(201).is_err());
}

#[test]
fn test_request_from_config() {
    let mut config = SpeechConfig::default();
    config.voice.language = "b".to_string();
    config.voice.voice = "bm_george".to_string();
    config.speed = 1.5;

    let request = SynthesisRequest::from_config("Good morning", &config).unwrap();
    assert_eq!(request.language(), "b");
    assert_eq!(request.voice(), "bm_george");
    assert_eq!(request.speed(), 1.5);
}

#[test]
fn test_split_text_on_newlines() {
    assert_eq!(
        split_text("First line.\n\n  Second line.  \r\nThird"),
        vec!["First line.", "Second line.", "Third"]
    );
    assert!(split_text("\n \n").is_empty());
    assert_eq!(split_text("single"), vec!["single"]);
}

#[test]
fn test_catalog_languages() {
    assert_eq!(catalog::LANGUAGES.len(), 9);
    assert!(catalog::is_supported("a"));
    assert!(catalog::is_supported("z"));
    assert!(!catalog::is_supported("q"));

    let british = catalog::find("b").unwrap();
    assert_eq!(british.name, "British English");
    assert!(british.voices.contains(&"bf_emma"));
    assert_eq!(catalog::default_voice("a"), Some("af_bella"));
    assert!(catalog::voices("q").is_empty());
}

#[test]
fn test_catalog_voice_prefixes_match_language() {
    for language in catalog::LANGUAGES {
        for voice in language.voices {
            assert!(
                voice.starts_with(language.code),
                "voice {} listed under {}",
                voice,
                language.code
            );
        }
    }
}

#[test]
fn test_custom_engine_voices() {
    use voxdesk_spk::engines::custom::CustomEngine;
    use voxdesk_spk::engines::SynthesisEngine;

    let engine = CustomEngine::new("custom", "a", 24_000, |_, _, _| Vec::new())
        .with_voices(vec!["af_heart".to_string()]);
    let voices = assert_ok!(tokio_test::block_on(engine.list_voices()));
    assert_eq!(voices, vec!["af_heart"]);
    assert_eq!(engine.name(), "custom");
    assert!(engine.run("", "af_heart", 1.0).is_err());
}
