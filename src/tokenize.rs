//! Phoneme tokeniser: maps phoneme tokens to integer IDs.
//!
//! A [`Vocabulary`] is a fixed `token → id` table.  Tokens missing from it map
//! to the fallback ID: the `<unk>` entry when the table has one, `0` otherwise.
//! The result is always a `[1, N]` tensor ready for the encoder.
//!
//! Two sources are supported:
//! - a JSON object `{ "a": 5, "k": 12, ... }` exported next to the model, and
//! - the built-in table ([`Vocabulary::builtin`]) covering the OpenJTalk
//!   Japanese phoneme set and ARPAbet English phonemes.

use std::{collections::HashMap, path::Path};

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use tracing::debug;

use crate::{
    error::{Stage, TtsError},
    tensor::Tensor,
};

// ─────────────────────────────────────────────────────────────────────────────
// Built-in vocabulary; ordering defines the IDs
// ─────────────────────────────────────────────────────────────────────────────

pub const PAD: &str = "<pad>";
pub const UNK: &str = "<unk>";

/// Pause / boundary markers emitted by both front ends.
const MARKERS: &[&str] = &["pau", "sil", ",", ".", "?", "!"];

/// OpenJTalk phonemes.  Upper-case vowels are devoiced; `cl` is the geminate
/// stop, `N` the moraic nasal.
const JAPANESE: &[&str] = &[
    "a", "i", "u", "e", "o", "A", "I", "U", "E", "O", "N", "cl", "k", "ky", "kw", "g", "gy", "gw",
    "s", "sh", "z", "j", "t", "ts", "ty", "ch", "d", "dy", "n", "ny", "h", "hy", "f", "b", "by",
    "p", "py", "m", "my", "y", "r", "ry", "w", "v",
];

/// ARPAbet vowels; each appears with stress digits 0, 1 and 2.
const ARPABET_VOWELS: &[&str] = &[
    "AA", "AE", "AH", "AO", "AW", "AY", "EH", "ER", "EY", "IH", "IY", "OW", "OY", "UH", "UW",
];

const ARPABET_CONSONANTS: &[&str] = &[
    "B", "CH", "D", "DH", "F", "G", "HH", "JH", "K", "L", "M", "N", "NG", "P", "R", "S", "SH",
    "T", "TH", "V", "W", "Y", "Z", "ZH",
];

static BUILTIN: Lazy<Vocabulary> = Lazy::new(|| {
    let stressed = ARPABET_VOWELS
        .iter()
        .flat_map(|v| (0..3).map(move |s| format!("{v}{s}")));

    let symbols = [PAD, UNK]
        .into_iter()
        .chain(MARKERS.iter().copied())
        .chain(JAPANESE.iter().copied())
        .map(str::to_string)
        .chain(stressed)
        .chain(ARPABET_CONSONANTS.iter().map(|c| c.to_string()));

    // `N` is shared by both sets; the first occurrence keeps its ID.
    let mut map = HashMap::new();
    for symbol in symbols {
        let next = map.len() as i64;
        map.entry(symbol).or_insert(next);
    }
    Vocabulary::new(map)
});

// ─────────────────────────────────────────────────────────────────────────────
// Vocabulary
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Vocabulary {
    map: HashMap<String, i64>,
    unk_id: i64,
}

impl Vocabulary {
    /// Wrap a token table.  The fallback ID is the `<unk>` entry if present, else 0.
    pub fn new(map: HashMap<String, i64>) -> Self {
        let unk_id = map.get(UNK).copied().unwrap_or(0);
        Self { map, unk_id }
    }

    /// The built-in Japanese + English phoneme table.
    pub fn builtin() -> &'static Vocabulary {
        &BUILTIN
    }

    /// Load a vocabulary from a JSON file mapping tokens to IDs.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Cannot read vocabulary: {}", path.display()))?;
        Self::from_json_slice(&bytes)
            .with_context(|| format!("Failed to parse vocabulary: {}", path.display()))
    }

    pub fn from_json_slice(bytes: &[u8]) -> Result<Self> {
        let map: HashMap<String, i64> =
            serde_json::from_slice(bytes).context("vocabulary must be a JSON object of token → id")?;
        Ok(Self::new(map))
    }

    /// ID for `token`, or `None` when it is not in the table.
    pub fn id(&self, token: &str) -> Option<i64> {
        self.map.get(token).copied()
    }

    pub fn unk_id(&self) -> i64 {
        self.unk_id
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Map phoneme tokens to a `[1, N]` ID tensor.
    ///
    /// Fails with [`TtsError::EmptyInput`] when `phonemes` is empty.
    pub fn encode_ids<S: AsRef<str>>(&self, phonemes: &[S]) -> Result<Tensor<i64>, TtsError> {
        if phonemes.is_empty() {
            return Err(TtsError::EmptyInput { stage: Stage::Tokenize });
        }

        let mut unknown = 0usize;
        let ids: Vec<i64> = phonemes
            .iter()
            .map(|p| {
                self.id(p.as_ref()).unwrap_or_else(|| {
                    unknown += 1;
                    self.unk_id
                })
            })
            .collect();

        if unknown > 0 {
            debug!(unknown, total = ids.len(), "phonemes outside vocabulary mapped to fallback id");
        }
        Ok(Tensor::row(ids))
    }
}

/// Free-function form of [`Vocabulary::encode_ids`].
pub fn encode_ids<S: AsRef<str>>(
    phonemes: &[S],
    vocabulary: &Vocabulary,
) -> Result<Tensor<i64>, TtsError> {
    vocabulary.encode_ids(phonemes)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> Vocabulary {
        let map = [("a", 3), ("k", 4), ("N", 5)]
            .into_iter()
            .map(|(t, i)| (t.to_string(), i))
            .collect();
        Vocabulary::new(map)
    }

    #[test]
    fn test_encode_known_tokens() {
        let ids = small().encode_ids(&["k", "a", "N"]).unwrap();
        assert_eq!(ids.shape(), &[1, 3]);
        assert_eq!(ids.data(), &[4, 3, 5]);
    }

    #[test]
    fn test_unknown_defaults_to_zero() {
        let ids = small().encode_ids(&["k", "zz"]).unwrap();
        assert_eq!(ids.data(), &[4, 0]);
    }

    #[test]
    fn test_unknown_uses_unk_entry() {
        let mut map: HashMap<String, i64> = HashMap::new();
        map.insert("a".into(), 2);
        map.insert(UNK.into(), 9);
        let vocab = Vocabulary::new(map);
        assert_eq!(vocab.encode_ids(&["a", "?", "a"]).unwrap().data(), &[2, 9, 2]);
    }

    #[test]
    fn test_empty_input_fails() {
        let empty: [&str; 0] = [];
        let err = small().encode_ids(&empty).unwrap_err();
        assert!(matches!(err, TtsError::EmptyInput { stage: Stage::Tokenize }));
    }

    #[test]
    fn test_builtin_layout() {
        let v = Vocabulary::builtin();
        assert_eq!(v.id(PAD), Some(0));
        assert_eq!(v.id(UNK), Some(1));
        assert_eq!(v.unk_id(), 1);
        for t in ["pau", "cl", "ky", "AA1", "ER0", "ZH", "N"] {
            assert!(v.id(t).is_some(), "token {t} missing from builtin vocabulary");
        }
    }

    #[test]
    fn test_builtin_ids_unique_and_dense() {
        let v = Vocabulary::builtin();
        let mut ids: Vec<i64> = v.map.values().copied().collect();
        ids.sort_unstable();
        let expected: Vec<i64> = (0..v.len() as i64).collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn test_from_json() {
        let v = Vocabulary::from_json_slice(br#"{"<unk>": 1, "a": 2}"#).unwrap();
        assert_eq!(v.len(), 2);
        assert_eq!(v.unk_id(), 1);
        assert!(Vocabulary::from_json_slice(b"[1, 2]").is_err());
    }

    #[test]
    fn test_deterministic() {
        let v = Vocabulary::builtin();
        let a = v.encode_ids(&["k", "o", "N", "n", "i", "ch", "i", "w", "a"]).unwrap();
        let b = v.encode_ids(&["k", "o", "N", "n", "i", "ch", "i", "w", "a"]).unwrap();
        assert_eq!(a, b);
    }
}
