
use fancy_regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::debug;

/// Default upper bound on tokens per chunk
pub const DEFAULT_MAX_TOKENS: usize = 512;

/// GPT-2 style pre-tokenization pattern. Each match counts as one token.
static PRETOKENIZER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"'s|'t|'re|'ve|'m|'ll|'d| ?\p{L}+| ?\p{N}+| ?[^\s\p{L}\p{N}]+|\s+(?!\S)|\s+")
        .expect("tokenizer pattern is valid")
});

/// Words that end in a period without ending the sentence
const ABBREVIATIONS: &[&str] = &[
    "approx", "dr", "e.g", "etc", "fig", "i.e", "inc", "jr", "mr", "mrs", "ms", "no", "sr", "st",
    "vs",
];

/// A sentence-aligned slice of a document's text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextChunk {
    /// The chunk text, sentences joined by single spaces
    pub text: String,
    /// 1-based position of this chunk within the document
    pub chunk_index: usize,
    /// Tokens consumed before this chunk began
    pub start_token: usize,
    /// `start_token` plus this chunk's token count
    pub end_token: usize,
}

impl TextChunk {
    #[inline]
    pub fn token_count(&self) -> usize {
        self.end_token - self.start_token
    }
}

/// Count tokens in a piece of text
#[inline]
pub fn count_tokens(text: &str) -> usize {
    PRETOKENIZER.find_iter(text).flatten().count()
}

/// Total token count of a text as the chunker measures it (sum over its sentences)
#[inline]
pub fn count_content_tokens(text: &str) -> usize {
    split_sentences(text).into_iter().map(count_tokens).sum()
}

/// Split text into sentences. Line breaks always end a sentence.
#[inline]
#[expect(
    clippy::string_slice,
    reason = "slice bounds come from char_indices on the same line"
)]
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();

    for line in text.lines() {
        let mut start = 0;
        let mut chars = line.char_indices().peekable();

        while let Some((idx, ch)) = chars.next() {
            if !is_terminator(ch) {
                continue;
            }

            // Swallow trailing terminators and closing quotes/brackets
            let mut end = idx + ch.len_utf8();
            while let Some(&(next_idx, next)) = chars.peek() {
                if is_terminator(next) || is_closing(next) {
                    end = next_idx + next.len_utf8();
                    chars.next();
                } else {
                    break;
                }
            }

            let at_boundary = chars.peek().is_none_or(|&(_, next)| next.is_whitespace());
            if !at_boundary {
                continue;
            }

            if ch == '.' && ends_with_abbreviation(&line[start..idx]) {
                continue;
            }

            push_trimmed(&mut sentences, &line[start..end]);
            start = end;
        }

        push_trimmed(&mut sentences, &line[start..]);
    }

    sentences
}

/// Split text into sentence-aligned chunks of at most `max_tokens` tokens.
///
/// A sentence is never split: one that alone exceeds `max_tokens` becomes its own chunk.
/// Token offsets are cumulative, so the chunks tile `[0, count_content_tokens(text))`.
#[inline]
pub fn chunk_text(text: &str, max_tokens: usize) -> Vec<TextChunk> {
    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_tokens = 0;
    let mut start_token = 0;

    for sentence in split_sentences(text) {
        let sentence_tokens = count_tokens(sentence);

        if !current.is_empty() && current_tokens + sentence_tokens > max_tokens {
            chunks.push(build_chunk(
                &current,
                chunks.len() + 1,
                start_token,
                current_tokens,
            ));
            start_token += current_tokens;
            current.clear();
            current_tokens = 0;
        }

        current.push(sentence);
        current_tokens += sentence_tokens;
    }

    if !current.is_empty() {
        chunks.push(build_chunk(
            &current,
            chunks.len() + 1,
            start_token,
            current_tokens,
        ));
    }

    debug!(
        "Chunked {} tokens into {} chunks (max {} tokens)",
        start_token + current_tokens,
        chunks.len(),
        max_tokens
    );

    chunks
}

fn build_chunk(
    sentences: &[&str],
    chunk_index: usize,
    start_token: usize,
    token_count: usize,
) -> TextChunk {
    TextChunk {
        text: sentences.join(" "),
        chunk_index,
        start_token,
        end_token: start_token + token_count,
    }
}

const fn is_terminator(ch: char) -> bool {
    matches!(ch, '.' | '!' | '?')
}

const fn is_closing(ch: char) -> bool {
    matches!(ch, '"' | '\'' | ')' | ']' | '\u{201d}' | '\u{2019}')
}

fn ends_with_abbreviation(prefix: &str) -> bool {
    let Some(last_word) = prefix.split_whitespace().next_back() else {
        return false;
    };
    let word = last_word
        .trim_start_matches(|c: char| !c.is_alphanumeric())
        .to_lowercase();

    // Single-letter initials ("J. Smith")
    if word.chars().count() == 1 && word.chars().all(char::is_alphabetic) {
        return true;
    }

    ABBREVIATIONS.contains(&word.as_str())
}

fn push_trimmed<'a>(sentences: &mut Vec<&'a str>, candidate: &'a str) {
    let trimmed = candidate.trim();
    if !trimmed.is_empty() {
        sentences.push(trimmed);
    }
}
