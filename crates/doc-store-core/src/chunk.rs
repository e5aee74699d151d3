//! Paragraph-boundary content splitter.
//!
//! Long content can be ingested as several chunks that share a `doc_id`.
//! [`split_content`] produces the chunk texts; the caller assigns indices
//! `0..n` in order.
//!
//! # Algorithm
//!
//! 1. Convert `max_tokens` to `max_chars` at 4 chars/token.
//! 2. Accumulate `\n\n`-separated paragraphs until the next one would
//!    overflow `max_chars`, then flush.
//! 3. Paragraphs larger than `max_chars` are hard-split at the last
//!    newline or space before the limit, on a UTF-8 boundary.
//! 4. At least one piece is always returned.
//!
//! ```rust
//! use doc_store_core::chunk::split_content;
//!
//! let pieces = split_content("Hello world.\n\nSecond paragraph.", 700);
//! assert_eq!(pieces.len(), 1);
//! ```

const CHARS_PER_TOKEN: usize = 4;

pub fn split_content(text: &str, max_tokens: usize) -> Vec<String> {
    let max_chars = max_tokens.max(1).saturating_mul(CHARS_PER_TOKEN);
    let mut pieces = Vec::new();
    let mut buf = String::new();

    for para in text.split("\n\n").map(str::trim).filter(|p| !p.is_empty()) {
        let would_be = if buf.is_empty() {
            para.len()
        } else {
            buf.len() + 2 + para.len()
        };
        if would_be > max_chars && !buf.is_empty() {
            pieces.push(std::mem::take(&mut buf));
        }

        if para.len() > max_chars {
            hard_split(para, max_chars, &mut pieces);
            continue;
        }

        if !buf.is_empty() {
            buf.push_str("\n\n");
        }
        buf.push_str(para);
    }

    if !buf.is_empty() {
        pieces.push(buf);
    }
    if pieces.is_empty() {
        pieces.push(text.trim().to_string());
    }
    pieces
}

fn hard_split(mut remaining: &str, max_chars: usize, pieces: &mut Vec<String>) {
    while !remaining.is_empty() {
        let limit = snap_to_char_boundary(remaining, max_chars);
        let cut = if limit < remaining.len() {
            remaining[..limit]
                .rfind(['\n', ' '])
                .map(|pos| pos + 1)
                .unwrap_or(limit)
        } else {
            limit
        };
        // Always make progress, even when one char exceeds the budget.
        let cut = if cut == 0 {
            remaining
                .char_indices()
                .nth(1)
                .map(|(i, _)| i)
                .unwrap_or(remaining.len())
        } else {
            cut
        };
        let piece = remaining[..cut].trim();
        if !piece.is_empty() {
            pieces.push(piece.to_string());
        }
        remaining = &remaining[cut..];
    }
}

fn snap_to_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    let mut i = index;
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}
