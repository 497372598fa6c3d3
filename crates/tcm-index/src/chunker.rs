//! Sentence-boundary chunker for the offline corpus builder
//!
//! Splits source text into sentences on CJK and ASCII terminators plus
//! newlines, then packs whole sentences into chunks of at most
//! `max_chars` characters. A single sentence longer than the budget is
//! hard-split rather than dropped.

/// A chunk of source text with its character offset in the document
#[derive(Debug, Clone, PartialEq)]
pub struct TextChunk {
    pub offset: usize,
    pub text: String,
}

const SENTENCE_TERMINATORS: [char; 7] = ['。', '！', '？', '；', '.', '!', '?'];

fn split_sentences(text: &str) -> Vec<(usize, &str)> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = 0;

    for (i, c) in text.char_indices() {
        let end = i + c.len_utf8();
        if SENTENCE_TERMINATORS.contains(&c) || c == '\n' {
            let raw = &text[start..end];
            if !raw.trim().is_empty() {
                sentences.push((chars - raw[..raw.len() - c.len_utf8()].chars().count(), raw));
            }
            start = end;
            chars += 1;
            continue;
        }
        chars += 1;
    }

    let tail = &text[start..];
    if !tail.trim().is_empty() {
        sentences.push((chars - tail.chars().count(), tail));
    }
    sentences
}

/// Pack `text` into chunks of at most `max_chars` characters on sentence
/// boundaries. Offsets count characters from the document start.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<TextChunk> {
    assert!(max_chars > 0, "chunk size must be positive");

    let mut chunks: Vec<TextChunk> = Vec::new();
    let mut current = String::new();
    let mut current_offset = 0;
    let mut current_chars = 0;

    let mut flush = |buf: &mut String, offset: usize| {
        let trimmed = buf.trim();
        if !trimmed.is_empty() {
            chunks.push(TextChunk {
                offset,
                text: trimmed.to_string(),
            });
        }
        buf.clear();
    };

    for (offset, sentence) in split_sentences(text) {
        let sentence_chars = sentence.chars().count();

        if sentence_chars > max_chars {
            // Oversized sentence: flush what we have, then hard-split it.
            flush(&mut current, current_offset);
            current_chars = 0;
            let mut piece = String::new();
            let mut piece_offset = offset;
            for (n, c) in sentence.chars().enumerate() {
                piece.push(c);
                if piece.chars().count() == max_chars {
                    flush(&mut piece, piece_offset);
                    piece_offset = offset + n + 1;
                }
            }
            flush(&mut piece, piece_offset);
            continue;
        }

        if current_chars + sentence_chars > max_chars && current_chars > 0 {
            flush(&mut current, current_offset);
            current_chars = 0;
        }
        if current_chars == 0 {
            current_offset = offset;
        }
        current.push_str(sentence);
        current_chars += sentence_chars;
    }

    flush(&mut current, current_offset);
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packs_whole_sentences_up_to_budget() {
        let text = "气虚的定义是元气不足。血瘀指血行不畅。津液亏虚。";
        let chunks = chunk_text(text, 12);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].text, "气虚的定义是元气不足。");
        assert_eq!(chunks[1].text, "血瘀指血行不畅。");
        assert_eq!(chunks[2].text, "津液亏虚。");
    }

    #[test]
    fn merges_short_sentences_into_one_chunk() {
        let text = "气虚。血瘀。";
        let chunks = chunk_text(text, 64);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "气虚。血瘀。");
        assert_eq!(chunks[0].offset, 0);
    }

    #[test]
    fn hard_splits_oversized_sentence() {
        let text = "一".repeat(25);
        let chunks = chunk_text(&text, 10);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].text.chars().count(), 10);
        assert_eq!(chunks[2].text.chars().count(), 5);
    }

    #[test]
    fn empty_input_yields_no_chunks() {
        assert!(chunk_text("", 256).is_empty());
        assert!(chunk_text("  \n\n ", 256).is_empty());
    }
}
