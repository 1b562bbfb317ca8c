//! Language and voice catalog for the Kokoro voice set

/// A language the engine can be initialized for, with its voices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Language {
    /// Single-letter engine language code
    pub code: &'static str,
    pub name: &'static str,
    pub voices: &'static [&'static str],
}

pub const LANGUAGES: &[Language] = &[
    Language {
        code: "a",
        name: "American English",
        voices: &[
            "af_bella", "af_nicole", "af_sarah", "af_heart", "af_fable", "af_sky", "am_adam",
            "am_michael",
        ],
    },
    Language {
        code: "b",
        name: "British English",
        voices: &["bf_emma", "bf_isabella", "bm_george", "bm_lewis"],
    },
    Language { code: "e", name: "Spanish", voices: &["ef_sofia", "em_carlos"] },
    Language { code: "f", name: "French", voices: &["ff_camille", "fm_pierre"] },
    Language { code: "h", name: "Hindi", voices: &["hf_anjali", "hm_raj"] },
    Language { code: "i", name: "Italian", voices: &["if_giulia", "im_marco"] },
    Language { code: "j", name: "Japanese", voices: &["jf_yuki", "jm_hiroshi"] },
    Language { code: "p", name: "Brazilian Portuguese", voices: &["pf_maria", "pm_pedro"] },
    Language { code: "z", name: "Mandarin Chinese", voices: &["zf_xiaomei", "zm_xiaolong"] },
];

/// Look up a language by its code
pub fn find(code: &str) -> Option<&'static Language> {
    LANGUAGES.iter().find(|l| l.code == code)
}

pub fn is_supported(code: &str) -> bool {
    find(code).is_some()
}

/// Voices for a language, empty if the code is unknown
pub fn voices(code: &str) -> &'static [&'static str] {
    find(code).map(|l| l.voices).unwrap_or(&[])
}

/// First voice listed for a language
pub fn default_voice(code: &str) -> Option<&'static str> {
    voices(code).first().copied()
}
