//! Shaping raw generated text into publishable posts.
//!
//! Model output arrives as free text, sometimes already numbered as a thread,
//! sometimes one long paragraph. [`shape_post`] normalizes punctuation, splits
//! it into segments that fit the platform's character limit at paragraph and
//! sentence boundaries, drops fragments too short to be worth posting, and
//! numbers the result when it is a thread.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::catalog::ContentUnit;
use crate::hashing::content_fingerprint;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Platform limit for a single post, in characters.
pub const MAX_POST_CHARS: usize = 280;

/// Segments shorter than this are dropped as low-value fragments.
pub const MIN_SEGMENT_CHARS: usize = 50;

/// Longest thread the bot will publish.
pub const MAX_THREAD_SEGMENTS: usize = 6;

const ELLIPSIS: &str = "...";

/// Appended to the first segment of a thread.
const THREAD_MARKER: &str = " \u{1F9F5}";

/// The platform weighs emoji as two characters.
const THREAD_MARKER_WEIGHT: usize = 3;

/// Existing `1/3`-style numbering the model may have added itself.
static THREAD_NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\(?\d{1,2}\s*/\s*\d{1,2}\)?[:.)]?\s*").expect("valid regex")
});

static BLANK_LINES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n[ \t]*(\n[ \t]*)+").expect("valid regex"));

static HASHTAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"#\w+").expect("valid regex"));

static MENTION_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"@\w+").expect("valid regex"));

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why generated text could not be turned into a post.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContentError {
    #[error("generated text is empty")]
    Empty,

    #[error("no segment reached the minimum length of {min} characters")]
    TooShort { min: usize },
}

// ---------------------------------------------------------------------------
// ShapedPost
// ---------------------------------------------------------------------------

/// A post ready for the publisher: one segment, or a numbered thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShapedPost {
    segments: Vec<String>,
}

impl ShapedPost {
    /// A single-segment post, truncated to the platform limit if needed.
    pub fn single(text: &str) -> Self {
        Self {
            segments: vec![truncate_to(text.trim(), MAX_POST_CHARS)],
        }
    }

    /// Number `segments` as a thread. A single segment is left untouched.
    pub fn thread(segments: Vec<String>) -> Self {
        let total = segments.len();
        if total <= 1 {
            return Self { segments };
        }

        let segments = segments
            .into_iter()
            .enumerate()
            .map(|(i, segment)| {
                if i == 0 {
                    let fitted = truncate_to(&segment, MAX_POST_CHARS - THREAD_MARKER_WEIGHT);
                    format!("{fitted}{THREAD_MARKER}")
                } else {
                    let prefix = format!("{}/{} ", i + 1, total);
                    let fitted = truncate_to(&segment, MAX_POST_CHARS - char_len(&prefix));
                    format!("{prefix}{fitted}")
                }
            })
            .collect();
        Self { segments }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_thread(&self) -> bool {
        self.segments.len() > 1
    }

    /// Full text as stored in post history (segments separated by a blank line).
    pub fn text(&self) -> String {
        self.segments.join("\n\n")
    }

    pub fn fingerprint(&self) -> String {
        content_fingerprint(&self.text())
    }
}

// ---------------------------------------------------------------------------
// Shaping
// ---------------------------------------------------------------------------

/// Turn raw model output into a publishable post.
pub fn shape_post(raw: &str) -> Result<ShapedPost, ContentError> {
    let text = normalize_text(raw);
    if text.is_empty() {
        return Err(ContentError::Empty);
    }

    let mut segments: Vec<String> = split_into_segments(&text, MAX_POST_CHARS)
        .into_iter()
        .filter(|s| char_len(s) >= MIN_SEGMENT_CHARS)
        .collect();

    if segments.is_empty() {
        return Err(ContentError::TooShort {
            min: MIN_SEGMENT_CHARS,
        });
    }

    segments.truncate(MAX_THREAD_SEGMENTS);
    Ok(ShapedPost::thread(segments))
}

/// Deterministic post used when generation fails and fallback is enabled.
pub fn fallback_post(unit: &ContentUnit) -> ShapedPost {
    let tag: String = unit
        .name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect();
    let text = format!(
        "Project spotlight: {} {} - {}. Follow along at {} #{} #crypto",
        unit.name,
        unit.handle,
        unit.description.trim_end_matches('.'),
        unit.website,
        tag
    );
    ShapedPost::single(&text)
}

/// Normalize typographic punctuation and collapse runs of blank lines.
pub fn normalize_text(text: &str) -> String {
    let replaced: String = text
        .replace("\r\n", "\n")
        .chars()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' => '\'',
            '\u{201C}' | '\u{201D}' => '"',
            '\u{2013}' | '\u{2014}' => '-',
            other => other,
        })
        .collect();
    BLANK_LINES_RE
        .replace_all(replaced.trim(), "\n\n")
        .into_owned()
}

/// Split on blank lines, then pack sentences of over-long paragraphs into
/// segments of at most `max` characters.
pub fn split_into_segments(text: &str, max: usize) -> Vec<String> {
    let mut segments = Vec::new();

    for paragraph in text.split("\n\n") {
        let paragraph = strip_thread_markup(paragraph.trim());
        if paragraph.is_empty() {
            continue;
        }

        if char_len(paragraph) <= max {
            segments.push(paragraph.to_string());
            continue;
        }

        let mut current = String::new();
        for sentence in split_sentences(paragraph) {
            if char_len(sentence) > max {
                if !current.is_empty() {
                    segments.push(std::mem::take(&mut current));
                }
                segments.push(truncate_to(sentence, max));
                continue;
            }

            if current.is_empty() {
                current.push_str(sentence);
            } else if char_len(&current) + 1 + char_len(sentence) <= max {
                current.push(' ');
                current.push_str(sentence);
            } else {
                segments.push(std::mem::replace(&mut current, sentence.to_string()));
            }
        }
        if !current.is_empty() {
            segments.push(current);
        }
    }

    segments
}

/// Split after `.`, `!` or `?` when followed by whitespace.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if matches!(c, '.' | '!' | '?') {
            if let Some((_, next)) = chars.peek() {
                if next.is_whitespace() {
                    let end = i + c.len_utf8();
                    let sentence = text[start..end].trim();
                    if !sentence.is_empty() {
                        sentences.push(sentence);
                    }
                    start = end;
                }
            }
        }
    }

    let rest = text[start..].trim();
    if !rest.is_empty() {
        sentences.push(rest);
    }
    sentences
}

/// Shorten `text` to at most `max` characters.
///
/// Prefers whole sentences, then whole words (with an ellipsis), and only
/// then cuts mid-word.
pub fn truncate_to(text: &str, max: usize) -> String {
    if char_len(text) <= max {
        return text.to_string();
    }

    let by_sentence = pack(split_sentences(text), max);
    if !by_sentence.is_empty() {
        return by_sentence;
    }

    let budget = max.saturating_sub(ELLIPSIS.len());
    let by_word = pack(text.split_whitespace().collect(), budget);
    if !by_word.is_empty() {
        return format!("{by_word}{ELLIPSIS}");
    }

    let cut: String = text.chars().take(budget).collect();
    format!("{cut}{ELLIPSIS}")
}

/// Join leading pieces with single spaces while they fit in `max`.
fn pack(pieces: Vec<&str>, max: usize) -> String {
    let mut out = String::new();
    for piece in pieces {
        let needed = if out.is_empty() {
            char_len(piece)
        } else {
            char_len(&out) + 1 + char_len(piece)
        };
        if needed > max {
            break;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(piece);
    }
    out
}

fn strip_thread_markup(paragraph: &str) -> &str {
    let without_number = match THREAD_NUMBER_RE.find(paragraph) {
        Some(m) => &paragraph[m.end()..],
        None => paragraph,
    };
    without_number.trim_end_matches(THREAD_MARKER.trim()).trim()
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

pub fn extract_hashtags(text: &str) -> Vec<String> {
    HASHTAG_RE
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

pub fn extract_mentions(text: &str) -> Vec<String> {
    MENTION_RE
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sentence(word: &str, n: usize) -> String {
        let mut s = vec![word; n].join(" ");
        s.push('.');
        s
    }

    #[test]
    fn normalize_replaces_smart_punctuation_and_blank_runs() {
        let out = normalize_text("  \u{201C}Sei\u{201D} isn\u{2019}t slow \u{2014} at all\n\n\n\nNext  ");
        assert_eq!(out, "\"Sei\" isn't slow - at all\n\nNext");
    }

    #[test]
    fn split_sentences_keeps_decimals_together() {
        let s = split_sentences("TVL hit 1.5B today. Wow! Is it real? yes");
        assert_eq!(s, vec!["TVL hit 1.5B today.", "Wow!", "Is it real?", "yes"]);
    }

    #[test]
    fn short_paragraphs_become_segments() {
        let a = sentence("alpha", 12);
        let b = sentence("beta", 12);
        let segs = split_into_segments(&format!("{a}\n\n{b}"), 280);
        assert_eq!(segs, vec![a, b]);
    }

    #[test]
    fn long_paragraph_is_packed_by_sentence() {
        let s1 = sentence("one", 40);
        let s2 = sentence("two", 40);
        let paragraph = format!("{s1} {s2}");
        let segs = split_into_segments(&paragraph, 280);
        assert_eq!(segs, vec![s1, s2]);
        assert!(segs.iter().all(|s| s.chars().count() <= 280));
    }

    #[test]
    fn over_long_sentence_is_truncated_on_word_boundary() {
        let s = sentence("word", 100);
        let out = truncate_to(&s, 280);
        assert!(out.chars().count() <= 280);
        assert!(out.ends_with("word..."));
    }

    #[test]
    fn truncate_prefers_whole_sentences() {
        let s1 = sentence("a", 60);
        let text = format!("{s1} {}", sentence("b", 200));
        assert_eq!(truncate_to(&text, 280), s1);
    }

    #[test]
    fn truncate_hard_cuts_unbroken_text() {
        let blob = "x".repeat(400);
        let out = truncate_to(&blob, 280);
        assert_eq!(out.chars().count(), 280);
        assert!(out.ends_with("..."));
    }

    #[test]
    fn shape_single_segment_is_not_numbered() {
        let raw = "Arbitrum keeps fees low by batching transactions off-chain and settling on Ethereum. #L2";
        let post = shape_post(raw).unwrap();
        assert!(!post.is_thread());
        assert_eq!(post.segments()[0], raw);
    }

    #[test]
    fn shape_thread_is_numbered_and_strips_model_numbering() {
        let raw = format!(
            "1/3 {}\n\n2/3 {}\n\n3/3 {}",
            sentence("first", 12),
            sentence("second", 10),
            sentence("third", 11)
        );
        let post = shape_post(&raw).unwrap();
        let segs = post.segments();
        assert_eq!(segs.len(), 3);
        assert!(segs[0].starts_with("first"));
        assert!(segs[0].ends_with('\u{1F9F5}'));
        assert!(segs[1].starts_with("2/3 second"));
        assert!(segs[2].starts_with("3/3 third"));
    }

    #[test]
    fn shape_drops_short_fragments() {
        let raw = format!("ok\n\n{}", sentence("content", 10));
        let post = shape_post(&raw).unwrap();
        assert_eq!(post.segments().len(), 1);
    }

    #[test]
    fn shape_rejects_empty_and_too_short() {
        assert_eq!(shape_post("   \n\n "), Err(ContentError::Empty));
        assert_eq!(
            shape_post("too short"),
            Err(ContentError::TooShort { min: 50 })
        );
    }

    #[test]
    fn shape_caps_thread_length() {
        let raw = (0..10)
            .map(|_| sentence("segment", 10))
            .collect::<Vec<_>>()
            .join("\n\n");
        let post = shape_post(&raw).unwrap();
        assert_eq!(post.segments().len(), MAX_THREAD_SEGMENTS);
    }

    #[test]
    fn fallback_mentions_handle_and_fits() {
        let unit = ContentUnit::new("Huma Finance", "humafinance.com", "@humafinance", "RWA platform.", "RWA");
        let post = fallback_post(&unit);
        let text = post.text();
        assert!(text.contains("@humafinance"));
        assert!(text.contains("#HumaFinance"));
        assert!(text.chars().count() <= MAX_POST_CHARS);
    }

    #[test]
    fn extracts_hashtags_and_mentions() {
        let text = "Watching @SeiNetwork and @arbitrum #DeFi #L2 today";
        assert_eq!(extract_hashtags(text), vec!["#DeFi", "#L2"]);
        assert_eq!(extract_mentions(text), vec!["@SeiNetwork", "@arbitrum"]);
    }
}
