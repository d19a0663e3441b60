//! Sentence-aware text chunking with whole-sentence overlap.

use crate::models::ChunkingConfig;
use crate::utils::normalize_whitespace;

/// Leading characters of a fragment used to locate it in the normalized text.
const LOCATE_PREFIX_CHARS: usize = 50;

/// One chunk of text in reading order.
#[derive(Debug, Clone, PartialEq)]
pub struct TextFragment {
    /// Sequential position, starting at 0.
    pub index: usize,
    pub content: String,
    /// Byte offset of the fragment in the normalized text; `None` when
    /// overlap merging leaves the fragment unlocatable.
    pub start_offset: Option<usize>,
    /// Character count of the fragment.
    pub length: usize,
}

/// Splits normalized text into overlapping fragments.
///
/// Sentences are never split mid-unit: fragments close on sentence
/// boundaries, and the overlap carried into the next fragment is made of
/// whole trailing sentences of the closed one.
#[derive(Debug, Clone)]
pub struct Chunker {
    chunk_size: usize,
    overlap: usize,
    min_chunk_size: usize,
}

impl Chunker {
    pub fn new(config: &ChunkingConfig) -> Self {
        Self {
            chunk_size: config.chunk_size,
            overlap: config.overlap,
            min_chunk_size: config.min_chunk_size,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(&ChunkingConfig::default())
    }

    /// Chunk raw text into ordered fragments.
    pub fn chunk(&self, text: &str) -> Vec<TextFragment> {
        let normalized = normalize_whitespace(text);
        if normalized.is_empty() {
            return Vec::new();
        }

        let total_chars = normalized.chars().count();
        if total_chars <= self.chunk_size {
            return vec![TextFragment {
                index: 0,
                content: normalized,
                start_offset: Some(0),
                length: total_chars,
            }];
        }

        let pieces = self.pack_sentences(split_sentences(&normalized));
        self.locate(pieces, &normalized)
    }

    /// Greedily pack sentences into chunk-sized pieces.
    fn pack_sentences(&self, sentences: Vec<String>) -> Vec<String> {
        let mut pieces: Vec<String> = Vec::new();
        let mut current: Vec<String> = Vec::new();
        let mut current_len = 0usize;

        for sentence in sentences {
            let sentence_len = sentence.chars().count();

            // A sentence that alone exceeds the chunk size becomes its own
            // oversized piece; it also cannot seed any overlap.
            if sentence_len > self.chunk_size {
                if !current.is_empty() {
                    push_piece(&mut pieces, current.join(" "), self.min_chunk_size);
                    current.clear();
                    current_len = 0;
                }
                push_piece(&mut pieces, sentence, self.min_chunk_size);
                continue;
            }

            let joined_len = if current.is_empty() {
                sentence_len
            } else {
                current_len + 1 + sentence_len
            };

            if joined_len > self.chunk_size
                && !current.is_empty()
                && current_len >= self.min_chunk_size
            {
                pieces.push(current.join(" "));
                // The carried overlap must leave room for the incoming
                // sentence, or the new chunk would overflow immediately.
                let budget = self
                    .overlap
                    .min(self.chunk_size.saturating_sub(sentence_len + 1));
                let (carried, carried_len) = self.carry_overlap(&current, budget);
                current = carried;
                current_len = if current.is_empty() {
                    sentence_len
                } else {
                    carried_len + 1 + sentence_len
                };
                current.push(sentence);
            } else {
                current_len = joined_len;
                current.push(sentence);
            }
        }

        if !current.is_empty() {
            push_piece(&mut pieces, current.join(" "), self.min_chunk_size);
        }

        pieces
    }

    /// Whole trailing sentences of a closed chunk that fit within the
    /// given budget, in reading order.
    fn carry_overlap(&self, closed: &[String], budget: usize) -> (Vec<String>, usize) {
        let mut carried: Vec<String> = Vec::new();
        let mut carried_len = 0usize;

        for sentence in closed.iter().rev() {
            let sentence_len = sentence.chars().count();
            let joined_len = if carried.is_empty() {
                sentence_len
            } else {
                carried_len + 1 + sentence_len
            };
            if joined_len > budget {
                break;
            }
            carried.push(sentence.clone());
            carried_len = joined_len;
        }

        carried.reverse();
        (carried, carried_len)
    }

    /// Best-effort start offsets via a forward-moving prefix search.
    fn locate(&self, pieces: Vec<String>, normalized: &str) -> Vec<TextFragment> {
        let mut fragments = Vec::with_capacity(pieces.len());
        let mut search_from = 0usize;

        for (index, content) in pieces.into_iter().enumerate() {
            let prefix: String = content.chars().take(LOCATE_PREFIX_CHARS).collect();
            let start_offset = normalized
                .get(search_from..)
                .and_then(|rest| rest.find(&prefix))
                .map(|pos| pos + search_from);
            if let Some(found) = start_offset {
                let step = normalized[found..].chars().next().map_or(1, char::len_utf8);
                search_from = found + step;
            }
            let length = content.chars().count();
            fragments.push(TextFragment {
                index,
                content,
                start_offset,
                length,
            });
        }

        fragments
    }
}

/// Emit a finished piece, folding an undersized trailing piece into the
/// previous one instead of emitting it on its own.
fn push_piece(pieces: &mut Vec<String>, piece: String, min_chunk_size: usize) {
    if piece.chars().count() < min_chunk_size
        && let Some(last) = pieces.last_mut()
    {
        last.push(' ');
        last.push_str(&piece);
        return;
    }
    pieces.push(piece);
}

/// Split on terminal punctuation followed by whitespace. The trailing
/// run without terminal punctuation counts as a sentence too.
fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);
        if matches!(c, '.' | '!' | '?') && chars.peek().is_none_or(|n| n.is_whitespace()) {
            while chars.peek().is_some_and(|n| n.is_whitespace()) {
                chars.next();
            }
            let sentence = current.trim();
            if !sentence.is_empty() {
                sentences.push(sentence.to_string());
            }
            current.clear();
        }
    }

    let tail = current.trim();
    if !tail.is_empty() {
        sentences.push(tail.to_string());
    }

    sentences
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunker(chunk_size: usize, overlap: usize, min_chunk_size: usize) -> Chunker {
        Chunker::new(&ChunkingConfig {
            chunk_size,
            overlap,
            min_chunk_size,
        })
    }

    fn sentence_text(count: usize) -> String {
        (0..count)
            .map(|i| format!("Sentence number {} talks about topic {}.", i, i % 7))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn test_empty_input() {
        assert!(Chunker::with_defaults().chunk("").is_empty());
        assert!(Chunker::with_defaults().chunk("  \n\t ").is_empty());
    }

    #[test]
    fn test_short_text_single_fragment() {
        let fragments = Chunker::with_defaults().chunk("One short sentence.");
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].content, "One short sentence.");
        assert_eq!(fragments[0].index, 0);
        assert_eq!(fragments[0].start_offset, Some(0));
        assert_eq!(fragments[0].length, "One short sentence.".chars().count());
    }

    #[test]
    fn test_split_sentences_on_terminal_punctuation() {
        let sentences = split_sentences("First one. Second one! Third? Tail without end");
        assert_eq!(
            sentences,
            vec!["First one.", "Second one!", "Third?", "Tail without end"]
        );
    }

    #[test]
    fn test_fragments_respect_chunk_size() {
        let text = sentence_text(80);
        let fragments = Chunker::with_defaults().chunk(&text);
        assert!(fragments.len() > 1);
        for fragment in &fragments {
            assert!(fragment.length <= 800, "fragment exceeded chunk size");
        }
    }

    #[test]
    fn test_indexes_are_sequential() {
        let text = sentence_text(80);
        let fragments = Chunker::with_defaults().chunk(&text);
        for (i, fragment) in fragments.iter().enumerate() {
            assert_eq!(fragment.index, i);
        }
    }

    #[test]
    fn test_consecutive_fragments_share_whole_sentence_overlap() {
        let text = sentence_text(80);
        let chunker = Chunker::with_defaults();
        let fragments = chunker.chunk(&text);

        for pair in fragments.windows(2) {
            let previous = &pair[0].content;
            let next = &pair[1].content;
            // The next fragment starts with whole trailing sentences of the
            // previous one, bounded by the overlap budget.
            let shared = split_sentences(next)
                .into_iter()
                .take_while(|s| previous.contains(s.as_str()))
                .collect::<Vec<_>>();
            assert!(
                !shared.is_empty(),
                "no sentence overlap between consecutive fragments"
            );
            let shared_len: usize =
                shared.iter().map(|s| s.chars().count()).sum::<usize>() + shared.len() - 1;
            assert!(shared_len <= 200, "overlap exceeded the configured budget");
        }
    }

    #[test]
    fn test_concatenation_reconstructs_input() {
        let text = sentence_text(60);
        let fragments = Chunker::with_defaults().chunk(&text);

        // Dropping each fragment's overlapped prefix and concatenating the
        // rest reconstructs the normalized input.
        let mut rebuilt = fragments[0].content.clone();
        for pair in fragments.windows(2) {
            let previous = &pair[0].content;
            let next = &pair[1].content;
            let carried: Vec<String> = split_sentences(next)
                .into_iter()
                .take_while(|s| previous.contains(s.as_str()))
                .collect();
            let prefix_len: usize =
                carried.iter().map(String::len).sum::<usize>() + carried.len();
            rebuilt.push(' ');
            rebuilt.push_str(next[prefix_len.min(next.len())..].trim_start());
        }
        assert_eq!(rebuilt, normalize_whitespace(&text));
    }

    #[test]
    fn test_oversized_sentence_becomes_own_fragment() {
        let giant = format!("{}.", "word ".repeat(60).trim());
        let text = format!("Small lead-in sentence here. {} Small follow-up.", giant);
        let fragments = chunker(100, 30, 10).chunk(&text);

        assert!(fragments.iter().any(|f| f.content == giant));
        let oversized = fragments.iter().find(|f| f.content == giant).unwrap();
        assert!(oversized.length > 100);
    }

    #[test]
    fn test_short_tail_merges_into_previous_fragment() {
        // Last sentence alone is below min_chunk_size; it must be folded
        // into the preceding fragment rather than emitted on its own.
        let text = format!("{} Tiny tail.", sentence_text(40));
        let fragments = Chunker::with_defaults().chunk(&text);
        let last = fragments.last().unwrap();
        assert!(last.length >= 100);
        assert!(last.content.ends_with("Tiny tail."));
    }

    #[test]
    fn test_start_offsets_locate_fragments() {
        let text = sentence_text(60);
        let normalized = normalize_whitespace(&text);
        let fragments = Chunker::with_defaults().chunk(&text);

        for fragment in &fragments {
            let offset = fragment
                .start_offset
                .expect("fragments of distinct sentences should locate");
            assert!(normalized[offset..].starts_with(
                &fragment.content.chars().take(50).collect::<String>()
            ));
        }
    }

    #[test]
    fn test_three_thousand_chars_yield_at_least_four_fragments() {
        let mut text = String::new();
        let mut i = 0;
        while text.chars().count() < 3000 {
            text.push_str(&format!("Fact {} covers a distinct idea in detail. ", i));
            i += 1;
        }
        let fragments = Chunker::with_defaults().chunk(&text);
        assert!(fragments.len() >= 4, "expected >= 4 fragments, got {}", fragments.len());
        for (i, fragment) in fragments.iter().enumerate() {
            assert_eq!(fragment.index, i);
        }
    }
}
