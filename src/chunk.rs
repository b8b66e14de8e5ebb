//! Sentence chunking for long text.
//!
//! Text is cut at sentence-ending punctuation into trimmed, non-empty chunks.
//! A chunk longer than `max_chars` is further split at whitespace; if it has
//! none (Japanese text is not space separated) it is cut at the character
//! limit instead.

/// Splits text into ordered, non-empty chunks.
pub trait ChunkSplitter {
    fn split(&self, text: &str) -> Vec<String>;
}

impl<F> ChunkSplitter for F
where
    F: Fn(&str) -> Vec<String>,
{
    fn split(&self, text: &str) -> Vec<String> {
        self(text)
    }
}

/// Japanese full-width and ASCII sentence terminators.
pub const DEFAULT_DELIMITERS: &str = "。！？!?.";

/// Maximum characters per chunk before splitting further.
pub const DEFAULT_MAX_CHARS: usize = 400;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentenceSplitter {
    delimiters: Vec<char>,
    max_chars: usize,
}

impl Default for SentenceSplitter {
    fn default() -> Self {
        Self::new(DEFAULT_DELIMITERS)
    }
}

impl SentenceSplitter {
    /// Split on any character in `delimiters`; delimiters are dropped.
    pub fn new(delimiters: &str) -> Self {
        Self { delimiters: delimiters.chars().collect(), max_chars: DEFAULT_MAX_CHARS }
    }

    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars.max(1);
        self
    }

    fn push_limited(&self, sentence: &str, chunks: &mut Vec<String>) {
        if sentence.chars().count() <= self.max_chars {
            chunks.push(sentence.to_string());
            return;
        }

        let mut current = String::new();
        for word in sentence.split_whitespace() {
            if !current.is_empty() && current.chars().count() + 1 + word.chars().count() > self.max_chars {
                chunks.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);

            // A single word past the limit is cut at character boundaries.
            while current.chars().count() > self.max_chars {
                let cut = current
                    .char_indices()
                    .nth(self.max_chars)
                    .map_or(current.len(), |(i, _)| i);
                let rest = current.split_off(cut);
                chunks.push(current);
                current = rest;
            }
        }
        if !current.is_empty() {
            chunks.push(current);
        }
    }
}

impl ChunkSplitter for SentenceSplitter {
    fn split(&self, text: &str) -> Vec<String> {
        let mut chunks = Vec::new();
        for sentence in text.split(|c: char| self.delimiters.contains(&c)) {
            let sentence = sentence.trim();
            if !sentence.is_empty() {
                self.push_limited(sentence, &mut chunks);
            }
        }
        chunks
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_japanese_delimiters() {
        let chunks = SentenceSplitter::new("。！").split("A。B！C");
        assert_eq!(chunks, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_split_trims_and_drops_empty() {
        let chunks = SentenceSplitter::default().split("  Hello.  World!! ?  。");
        assert_eq!(chunks, vec!["Hello", "World"]);
    }

    #[test]
    fn test_split_empty_text() {
        assert!(SentenceSplitter::default().split("").is_empty());
        assert!(SentenceSplitter::default().split(" 。。 ").is_empty());
    }

    #[test]
    fn test_no_delimiter_single_chunk() {
        assert_eq!(SentenceSplitter::default().split("こんにちは"), vec!["こんにちは"]);
    }

    #[test]
    fn test_long_sentence_split_at_words() {
        let long = "word ".repeat(200);
        let chunks = SentenceSplitter::default().split(long.trim());
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= DEFAULT_MAX_CHARS);
        }
        let words: usize = chunks.iter().map(|c| c.split_whitespace().count()).sum();
        assert_eq!(words, 200);
    }

    #[test]
    fn test_long_unspaced_sentence_cut_at_limit() {
        let text = "あ".repeat(25);
        let chunks = SentenceSplitter::new("。").with_max_chars(10).split(&text);
        let lens: Vec<usize> = chunks.iter().map(|c| c.chars().count()).collect();
        assert_eq!(lens, vec![10, 10, 5]);
    }

    #[test]
    fn test_closure_splitter() {
        let by_line = |t: &str| t.lines().map(str::to_string).collect::<Vec<_>>();
        assert_eq!(by_line.split("a\nb"), vec!["a", "b"]);
    }
}
