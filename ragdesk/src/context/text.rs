//! Text cleaning and boundary-aware trimming
//!
//! All lengths are counted in chars and every cut lands on a char boundary.

use std::collections::HashSet;

/// Metadata marker prefixes stripped from document text
const MARKER_PREFIXES: [&str; 4] = ["URL:", "TAGS:", "SOURCE:", "ID:"];

/// Lines this short or shorter carry no useful evidence
const MIN_LINE_CHARS: usize = 10;

/// A sentence cut must keep at least this share of the limit
const SENTENCE_KEEP_RATIO: f64 = 0.8;

pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// First `max_chars` chars of `s`
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Drop marker lines and very short lines, keeping the rest in order
pub fn clean_doc_text(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !MARKER_PREFIXES.iter().any(|p| line.starts_with(p)))
        .filter(|line| char_len(line) > MIN_LINE_CHARS)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Cut `content` to at most `limit` chars at a natural boundary.
///
/// Prefers the longest prefix ending at a sentence end. When that keeps less
/// than 80% of `limit`, falls back to the longest prefix ending at a word
/// end, and to a hard cut when a single word exceeds `limit`. Content that
/// already fits is returned unchanged.
pub fn trim_to_boundary(content: &str, limit: usize) -> String {
    if char_len(content) <= limit {
        return content.to_string();
    }
    if limit == 0 {
        return String::new();
    }

    // Byte offset just past the `limit`-th char
    let hard_end = content
        .char_indices()
        .nth(limit)
        .map(|(idx, _)| idx)
        .unwrap_or(content.len());

    let sentence_end = last_boundary(content, hard_end, is_sentence_end);
    let sentence_cut = content[..sentence_end].trim_end();
    if !sentence_cut.is_empty() && char_len(sentence_cut) as f64 >= limit as f64 * SENTENCE_KEEP_RATIO {
        return sentence_cut.to_string();
    }

    let word_end = last_boundary(content, hard_end, is_word_end);
    let word_cut = content[..word_end].trim_end();
    if !word_cut.is_empty() {
        return word_cut.to_string();
    }

    content[..hard_end].trim_end().to_string()
}

/// Largest byte offset `<= end` at which `is_boundary` holds, or 0
fn last_boundary(content: &str, end: usize, is_boundary: fn(&str, usize) -> bool) -> usize {
    content[..end]
        .char_indices()
        .map(|(idx, c)| idx + c.len_utf8())
        .filter(|&offset| is_boundary(content, offset))
        .last()
        .unwrap_or(0)
}

/// `offset` follows a `.`, `!` or `?` that ends the text or precedes whitespace
fn is_sentence_end(content: &str, offset: usize) -> bool {
    let ends_with_mark = content[..offset]
        .chars()
        .next_back()
        .is_some_and(|c| matches!(c, '.' | '!' | '?'));
    ends_with_mark && followed_by_space_or_end(content, offset)
}

/// `offset` follows a non-space char that ends the text or precedes whitespace
fn is_word_end(content: &str, offset: usize) -> bool {
    let ends_with_word = content[..offset]
        .chars()
        .next_back()
        .is_some_and(|c| !c.is_whitespace());
    ends_with_word && followed_by_space_or_end(content, offset)
}

fn followed_by_space_or_end(content: &str, offset: usize) -> bool {
    content[offset..]
        .chars()
        .next()
        .map_or(true, char::is_whitespace)
}

/// Remove empty and repeated URLs, keeping first occurrences in order
pub fn dedup_preserving_order<I, S>(urls: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    urls.into_iter()
        .filter_map(|url| {
            let url = url.as_ref().trim();
            (!url.is_empty() && seen.insert(url.to_string())).then(|| url.to_string())
        })
        .collect()
}
