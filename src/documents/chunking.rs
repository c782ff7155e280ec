//! Recursive character splitting.
//!
//! Text is split on the highest-priority separator that occurs in it (`"\n\n"`, then `"\n"`,
//! then `"."`, then `" "`). Pieces shorter than the chunk size are merged greedily into chunks;
//! pieces that are still too large are split again with the remaining separators. Adjacent
//! chunks share up to `chunk_overlap` characters of trailing pieces.
//!
//! Separators stay attached to the start of the piece that follows them, so every chunk is a
//! contiguous substring of its input (after trimming surrounding whitespace). Lengths are
//! counted in `char`s.

use std::collections::VecDeque;

use super::types::ChunkingError;

/// Separators tried in order, from paragraph breaks down to single spaces.
pub const DEFAULT_SEPARATORS: [&str; 4] = ["\n\n", "\n", ".", " "];

/// Splits text into bounded, overlapping chunks.
#[derive(Debug, Clone)]
pub struct RecursiveSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl RecursiveSplitter {
    /// Build a splitter using [`DEFAULT_SEPARATORS`].
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, ChunkingError> {
        Self::with_separators(chunk_size, chunk_overlap, &DEFAULT_SEPARATORS)
    }

    /// Build a splitter with a custom separator priority list.
    pub fn with_separators(
        chunk_size: usize,
        chunk_overlap: usize,
        separators: &[&str],
    ) -> Result<Self, ChunkingError> {
        if chunk_size == 0 {
            return Err(ChunkingError::InvalidChunkSize);
        }
        if chunk_overlap >= chunk_size {
            return Err(ChunkingError::OverlapTooLarge {
                chunk_size,
                chunk_overlap,
            });
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
            separators: separators.iter().map(|value| value.to_string()).collect(),
        })
    }

    /// Maximum characters per chunk.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Characters shared between adjacent chunks.
    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split `text` into trimmed, non-empty chunks in document order.
    ///
    /// Returns an empty vector when the input is all whitespace.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        self.split_recursive(text, &self.separators)
    }

    fn split_recursive(&self, text: &str, separators: &[String]) -> Vec<String> {
        let mut separator = separators.last().map(String::as_str).unwrap_or("");
        let mut remaining: &[String] = &[];
        for (index, candidate) in separators.iter().enumerate() {
            if candidate.is_empty() {
                separator = "";
                break;
            }
            if text.contains(candidate.as_str()) {
                separator = candidate;
                remaining = &separators[index + 1..];
                break;
            }
        }

        let mut chunks = Vec::new();
        let mut small: Vec<&str> = Vec::new();
        for piece in split_keeping_separator(text, separator) {
            if char_len(piece) < self.chunk_size {
                small.push(piece);
                continue;
            }
            if !small.is_empty() {
                chunks.extend(self.merge_pieces(&small));
                small.clear();
            }
            if remaining.is_empty() {
                let trimmed = piece.trim();
                if !trimmed.is_empty() {
                    tracing::debug!(
                        length = char_len(trimmed),
                        chunk_size = self.chunk_size,
                        "Emitting oversized chunk with no separator left to split on"
                    );
                    chunks.push(trimmed.to_string());
                }
            } else {
                chunks.extend(self.split_recursive(piece, remaining));
            }
        }
        if !small.is_empty() {
            chunks.extend(self.merge_pieces(&small));
        }
        chunks
    }

    /// Greedily pack pieces into chunks, carrying trailing pieces forward as overlap.
    fn merge_pieces(&self, pieces: &[&str]) -> Vec<String> {
        let mut merged = Vec::new();
        let mut window: VecDeque<&str> = VecDeque::new();
        let mut total = 0;

        for &piece in pieces {
            let length = char_len(piece);
            if total + length > self.chunk_size && !window.is_empty() {
                if let Some(chunk) = join_pieces(&window) {
                    merged.push(chunk);
                }
                while total > self.chunk_overlap
                    || (total + length > self.chunk_size && total > 0)
                {
                    match window.pop_front() {
                        Some(first) => total -= char_len(first),
                        None => break,
                    }
                }
            }
            window.push_back(piece);
            total += length;
        }

        if let Some(chunk) = join_pieces(&window) {
            merged.push(chunk);
        }
        merged
    }
}

/// Split on `separator`, keeping each separator at the start of the following piece.
///
/// An empty separator splits into individual characters. Empty pieces are dropped.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(index, ch)| &text[index..index + ch.len_utf8()])
            .collect();
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    for (index, _) in text.match_indices(separator) {
        if index > start {
            pieces.push(&text[start..index]);
        }
        start = index;
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }
    pieces
}

fn join_pieces(pieces: &VecDeque<&str>) -> Option<String> {
    let joined: String = pieces.iter().copied().collect();
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strip_whitespace(text: &str) -> String {
        text.chars().filter(|ch| !ch.is_whitespace()).collect()
    }

    fn sample_document() -> String {
        let sentence = "Retrieval works best when passages stay focused on one idea. ";
        let paragraph = sentence.repeat(9);
        let mut text = String::new();
        for index in 0..6 {
            text.push_str(&format!("Section {index}.\n{paragraph}\n\n"));
        }
        text.push_str("Trailing line without a final period");
        text
    }

    #[test]
    fn splits_words_without_overlap() {
        let splitter = RecursiveSplitter::new(10, 0).expect("splitter");
        let chunks = splitter.split_text("one two three four five");
        assert_eq!(chunks, vec!["one two", "three", "four five"]);
    }

    #[test]
    fn carries_trailing_pieces_as_overlap() {
        let splitter = RecursiveSplitter::new(10, 4).expect("splitter");
        let chunks = splitter.split_text("one two three four five");
        assert_eq!(chunks, vec!["one two", "two three", "four five"]);
    }

    #[test]
    fn prefers_paragraph_breaks() {
        let splitter = RecursiveSplitter::new(20, 0).expect("splitter");
        let chunks = splitter.split_text("First paragraph.\n\nSecond paragraph.");
        assert_eq!(chunks, vec!["First paragraph.", "Second paragraph."]);
    }

    #[test]
    fn keeps_sentence_separator_with_following_piece() {
        let splitter = RecursiveSplitter::new(12, 0).expect("splitter");
        let chunks = splitter.split_text("Alpha beta. Gamma delta.");
        assert_eq!(chunks, vec!["Alpha beta", ". Gamma", "delta", "."]);
    }

    #[test]
    fn whitespace_only_input_yields_nothing() {
        let splitter = RecursiveSplitter::new(800, 100).expect("splitter");
        assert!(splitter.split_text("").is_empty());
        assert!(splitter.split_text(" \n\n \n").is_empty());
    }

    #[test]
    fn short_text_is_a_single_trimmed_chunk() {
        let splitter = RecursiveSplitter::new(800, 100).expect("splitter");
        assert_eq!(
            splitter.split_text("  A short note.\n"),
            vec!["A short note.".to_string()]
        );
    }

    #[test]
    fn chunks_are_bounded_substrings() {
        let text = sample_document();
        let splitter = RecursiveSplitter::new(200, 40).expect("splitter");
        let chunks = splitter.split_text(&text);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(char_len(chunk) <= 200, "chunk too long: {chunk:?}");
            assert!(text.contains(chunk.as_str()), "not a substring: {chunk:?}");
            assert_eq!(chunk.trim(), chunk);
        }
    }

    #[test]
    fn zero_overlap_is_lossless_modulo_whitespace() {
        let text = sample_document();
        let splitter = RecursiveSplitter::new(150, 0).expect("splitter");
        let chunks = splitter.split_text(&text);
        assert_eq!(strip_whitespace(&chunks.concat()), strip_whitespace(&text));
    }

    #[test]
    fn overlapping_chunks_share_text_with_neighbours() {
        let text = sample_document();
        let splitter = RecursiveSplitter::new(150, 80).expect("splitter");
        let chunks = splitter.split_text(&text);
        let shared = chunks
            .windows(2)
            .filter(|pair| {
                let skip = char_len(&pair[0]).saturating_sub(10);
                let tail: String = pair[0].chars().skip(skip).collect();
                pair[1].contains(tail.trim())
            })
            .count();
        assert!(shared > 0);
    }

    #[test]
    fn unbreakable_run_is_emitted_whole() {
        let splitter = RecursiveSplitter::new(5, 0).expect("splitter");
        let chunks = splitter.split_text("abcdefghij kl");
        assert_eq!(chunks, vec!["abcdefghij", "kl"]);
    }

    #[test]
    fn counts_characters_not_bytes() {
        let splitter = RecursiveSplitter::new(8, 0).expect("splitter");
        let chunks = splitter.split_text("مرحبا بكم في الموقع");
        for chunk in &chunks {
            assert!(char_len(chunk) <= 8, "chunk too long: {chunk:?}");
        }
        assert_eq!(
            strip_whitespace(&chunks.concat()),
            strip_whitespace("مرحبا بكم في الموقع")
        );
    }

    #[test]
    fn rejects_invalid_configuration() {
        assert!(matches!(
            RecursiveSplitter::new(0, 0),
            Err(ChunkingError::InvalidChunkSize)
        ));
        assert!(matches!(
            RecursiveSplitter::new(100, 100),
            Err(ChunkingError::OverlapTooLarge { .. })
        ));
    }

    #[test]
    fn split_keeping_separator_attaches_to_following_piece() {
        assert_eq!(
            split_keeping_separator("a\n\nb\n\n\n\nc", "\n\n"),
            vec!["a", "\n\nb", "\n\n", "\n\nc"]
        );
        assert_eq!(split_keeping_separator("ab", ""), vec!["a", "b"]);
    }
}
