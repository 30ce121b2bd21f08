//! Minimal SQL text scanner
//!
//! Just enough lexing to take a single INSERT or UPDATE apart: every helper
//! here skips string literals, quoted identifiers and comments, and tracks
//! parenthesis nesting so commas inside `f(a, b)` or `'a, b'` are never
//! mistaken for separators.

/// Marker character that starts a named placeholder (`:name`)
pub const PLACEHOLDER_MARKER: char = ':';

/// Walk the characters of `text` that are outside quotes and comments,
/// calling `visit(byte_offset, char, depth)` for each. `depth` is the
/// parenthesis depth before the character is applied. Returning `false`
/// from `visit` stops the walk.
fn scan(text: &str, visit: impl FnMut(usize, char, usize) -> bool) {
    scan_with_comments(text, |_| {}, visit);
}

/// Like [`scan`], also reporting the byte offset of every `--` comment.
fn scan_with_comments(
    text: &str,
    mut line_comment: impl FnMut(usize),
    mut visit: impl FnMut(usize, char, usize) -> bool,
) {
    let mut depth: usize = 0;
    let mut quote: Option<char> = None;
    let mut in_line_comment = false;
    let mut in_block_comment = false;
    let mut chars = text.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        let next = chars.peek().map(|(_, n)| *n);

        if in_line_comment {
            if c == '\n' {
                in_line_comment = false;
            }
            continue;
        }
        if in_block_comment {
            if c == '*' && next == Some('/') {
                chars.next();
                in_block_comment = false;
            }
            continue;
        }
        if let Some(q) = quote {
            if c == q {
                if next == Some(q) {
                    chars.next();
                } else {
                    quote = None;
                }
            }
            continue;
        }

        match c {
            '\'' | '"' => quote = Some(c),
            '-' if next == Some('-') => {
                line_comment(idx);
                in_line_comment = true;
            }
            '/' if next == Some('*') => in_block_comment = true,
            _ => {
                if !visit(idx, c, depth) {
                    return;
                }
                match c {
                    '(' => depth += 1,
                    ')' => depth = depth.saturating_sub(1),
                    _ => {}
                }
            }
        }
    }
}

/// Split `text` on `delimiter` where it appears at parenthesis depth zero
/// and outside quotes. The pieces are not trimmed.
pub fn split_top_level(text: &str, delimiter: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    scan(text, |idx, c, depth| {
        if c == delimiter && depth == 0 {
            parts.push(&text[start..idx]);
            start = idx + c.len_utf8();
        }
        true
    });
    parts.push(&text[start..]);
    parts
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

fn keyword_at(text: &str, idx: usize, keyword: &str) -> bool {
    let Some(candidate) = text.get(idx..idx + keyword.len()) else {
        return false;
    };
    if !candidate.eq_ignore_ascii_case(keyword) {
        return false;
    }
    let before_ok = text[..idx].chars().next_back().is_none_or(|c| !is_word_char(c));
    let after_ok = text[idx + keyword.len()..]
        .chars()
        .next()
        .is_none_or(|c| !is_word_char(c));
    before_ok && after_ok
}

/// Byte offset of the first whole-word, case-insensitive occurrence of
/// `keyword` at parenthesis depth zero.
pub fn find_keyword(text: &str, keyword: &str) -> Option<usize> {
    let mut found = None;
    scan(text, |idx, _, depth| {
        if depth == 0 && keyword_at(text, idx, keyword) {
            found = Some(idx);
            return false;
        }
        true
    });
    found
}

/// Whether `keyword` appears as a whole word anywhere outside quotes and
/// comments, at any nesting depth.
pub fn contains_keyword(text: &str, keyword: &str) -> bool {
    let mut found = false;
    scan(text, |idx, _, _| {
        if keyword_at(text, idx, keyword) {
            found = true;
            return false;
        }
        true
    });
    found
}

/// Whether `text` holds a `--` comment outside quotes and block comments.
///
/// A line comment ends at a newline, so it cannot survive text being
/// trimmed and joined onto one line.
pub fn contains_line_comment(text: &str) -> bool {
    let mut found = false;
    scan_with_comments(text, |_| found = true, |_, _, _| true);
    found
}

/// Byte offset of the `)` closing the `(` at `open`.
pub fn matching_paren(text: &str, open: usize) -> Option<usize> {
    if !text[open..].starts_with('(') {
        return None;
    }
    let mut found = None;
    scan(&text[open..], |idx, c, depth| {
        if c == ')' && depth == 1 {
            found = Some(open + idx);
            return false;
        }
        true
    });
    found
}

/// A `:name` placeholder found in statement text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder<'a> {
    /// Byte range of the whole placeholder, marker included
    pub start: usize,
    pub end: usize,
    /// Name without the marker
    pub name: &'a str,
}

/// All named placeholders outside quotes and comments, in text order.
///
/// PostgreSQL casts (`::int`) are not placeholders.
pub fn placeholders(text: &str) -> Vec<Placeholder<'_>> {
    let mut found = Vec::new();
    let mut prev: Option<char> = None;
    scan(text, |idx, c, _| {
        if c == PLACEHOLDER_MARKER && prev != Some(PLACEHOLDER_MARKER) {
            let rest = &text[idx + c.len_utf8()..];
            let starts_ident = rest
                .chars()
                .next()
                .is_some_and(|n| n.is_ascii_alphabetic() || n == '_');
            if starts_ident {
                let len = rest
                    .char_indices()
                    .find(|(_, n)| !(n.is_ascii_alphanumeric() || *n == '_'))
                    .map_or(rest.len(), |(i, _)| i);
                let start = idx;
                let end = idx + c.len_utf8() + len;
                found.push(Placeholder {
                    start,
                    end,
                    name: &text[start + c.len_utf8()..end],
                });
            }
        }
        prev = Some(c);
        true
    });
    found
}

/// Whether the whole (trimmed) token is exactly one placeholder
pub fn is_placeholder(token: &str) -> bool {
    let token = token.trim();
    match placeholders(token).as_slice() {
        [only] => only.start == 0 && only.end == token.len(),
        _ => false,
    }
}

/// Strip one trailing statement terminator and surrounding whitespace
pub fn strip_terminator(text: &str) -> &str {
    let trimmed = text.trim_end();
    trimmed.strip_suffix(';').unwrap_or(trimmed).trim_end()
}
