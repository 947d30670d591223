//! CSS tokenization into an ordered rule list.
//!
//! The parser splits source text into rule blocks with a string- and
//! paren-aware scanner. Values keep their full token sequence with collapsed
//! whitespace, so `Arial, sans-serif` survives as one string. `@`-rule blocks
//! are skipped whole. The only hard failure is an unbalanced top-level block.

use ink_core::ConvertError;
use ink_core::ConvertResult;

/// One source rule: a whitespace-normalized selector prelude and its
/// declarations in source order. A rule with an empty body is kept so the
/// compiler can diagnose it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRule {
    pub selector: String,
    pub declarations: Vec<(String, String)>,
}

/// Parses CSS source text into rules.
#[derive(Debug, Default)]
pub struct CssParser;

impl CssParser {
    pub fn parse(&self, input: &str) -> ConvertResult<Vec<RawRule>> {
        let source = strip_comments(input);
        let mut rules = Vec::new();
        let mut cursor = 0_usize;

        loop {
            cursor = skip_separators(&source, cursor);
            if cursor >= source.len() {
                break;
            }

            if source.as_bytes()[cursor] == b'@' {
                cursor = skip_at_rule(&source, cursor);
                continue;
            }

            let Some(open) = find_open_brace(&source, cursor) else {
                // Trailing selector text with no block; nothing left to parse.
                break;
            };
            let Some(close) = find_closing_brace(&source, open) else {
                return Err(ConvertError::new(
                    "css.unbalanced_block",
                    format!("missing `}}` for block opened at byte {open}"),
                ));
            };

            let selector = normalize_ws(&source[cursor..open]);
            let body = &source[open + 1..close];
            cursor = close + 1;

            if selector.is_empty() {
                continue;
            }

            rules.push(RawRule {
                selector,
                declarations: parse_declarations(body),
            });
        }

        Ok(rules)
    }
}

fn parse_declarations(body: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();

    for chunk in split_top_level(body, b';') {
        let chunk = chunk.trim();
        if chunk.is_empty() {
            continue;
        }

        let Some(colon) = find_top_level_colon(chunk) else {
            continue;
        };

        let name = normalize_ws(&chunk[..colon]).to_ascii_lowercase();
        let value = strip_important(&normalize_value(&chunk[colon + 1..]));
        if name.is_empty() || value.is_empty() {
            continue;
        }

        out.push((name, value));
    }

    out
}

/// Quote tracking shared by the scanning passes. `consume` feeds one byte and
/// reports whether it belongs to a quoted run.
#[derive(Debug, Default)]
struct QuoteState {
    active: Option<u8>,
    escaped: bool,
}

impl QuoteState {
    fn consume(&mut self, byte: u8) -> bool {
        if let Some(quote) = self.active {
            if self.escaped {
                self.escaped = false;
            } else if byte == b'\\' {
                self.escaped = true;
            } else if byte == quote {
                self.active = None;
            }
            return true;
        }

        if byte == b'\'' || byte == b'"' {
            self.active = Some(byte);
            return true;
        }

        false
    }
}

fn strip_comments(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut quotes = QuoteState::default();
    let mut idx = 0_usize;

    while idx < bytes.len() {
        let byte = bytes[idx];

        if quotes.consume(byte) {
            out.push(byte);
            idx += 1;
            continue;
        }

        if byte == b'/' && bytes.get(idx + 1).copied() == Some(b'*') {
            idx += 2;
            while idx < bytes.len() {
                if bytes[idx] == b'*' && bytes.get(idx + 1).copied() == Some(b'/') {
                    idx += 2;
                    break;
                }
                idx += 1;
            }
            continue;
        }

        out.push(byte);
        idx += 1;
    }

    String::from_utf8_lossy(&out).into_owned()
}

/// Skips one `@`-rule: through its `;` for statement forms (`@import …;`),
/// past the matching `}` for block forms (`@media … { … }`).
fn skip_at_rule(input: &str, from: usize) -> usize {
    let bytes = input.as_bytes();
    let mut quotes = QuoteState::default();

    for idx in from..bytes.len() {
        let byte = bytes[idx];
        if quotes.consume(byte) {
            continue;
        }

        if byte == b';' {
            return idx + 1;
        }
        if byte == b'{' {
            return find_closing_brace(input, idx)
                .map(|close| close + 1)
                .unwrap_or(bytes.len());
        }
    }

    bytes.len()
}

fn skip_separators(input: &str, mut idx: usize) -> usize {
    let bytes = input.as_bytes();
    while idx < bytes.len() {
        let byte = bytes[idx];
        if byte.is_ascii_whitespace() || byte == b';' || byte == b'}' {
            idx += 1;
            continue;
        }
        break;
    }
    idx
}

fn find_open_brace(input: &str, from: usize) -> Option<usize> {
    let bytes = input.as_bytes();
    let mut quotes = QuoteState::default();
    let mut paren_depth = 0_u32;
    let mut bracket_depth = 0_u32;

    for idx in from..bytes.len() {
        let byte = bytes[idx];
        if quotes.consume(byte) {
            continue;
        }

        match byte {
            b'(' => paren_depth += 1,
            b')' => paren_depth = paren_depth.saturating_sub(1),
            b'[' => bracket_depth += 1,
            b']' => bracket_depth = bracket_depth.saturating_sub(1),
            b'{' if paren_depth == 0 && bracket_depth == 0 => return Some(idx),
            _ => {}
        }
    }

    None
}

fn find_closing_brace(input: &str, open: usize) -> Option<usize> {
    let bytes = input.as_bytes();
    let mut quotes = QuoteState::default();
    let mut depth = 0_u32;

    for idx in open..bytes.len() {
        let byte = bytes[idx];
        if quotes.consume(byte) {
            continue;
        }

        match byte {
            b'{' => depth += 1,
            b'}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(idx);
                }
            }
            _ => {}
        }
    }

    None
}

fn split_top_level(input: &str, delimiter: u8) -> Vec<&str> {
    let bytes = input.as_bytes();
    let mut parts = Vec::new();
    let mut quotes = QuoteState::default();
    let mut paren_depth = 0_u32;
    let mut bracket_depth = 0_u32;
    let mut start = 0_usize;

    for idx in 0..bytes.len() {
        let byte = bytes[idx];
        if quotes.consume(byte) {
            continue;
        }

        match byte {
            b'(' => paren_depth += 1,
            b')' => paren_depth = paren_depth.saturating_sub(1),
            b'[' => bracket_depth += 1,
            b']' => bracket_depth = bracket_depth.saturating_sub(1),
            _ => {
                if byte == delimiter && paren_depth == 0 && bracket_depth == 0 {
                    parts.push(&input[start..idx]);
                    start = idx + 1;
                }
            }
        }
    }

    parts.push(&input[start..]);
    parts
}

fn find_top_level_colon(input: &str) -> Option<usize> {
    let bytes = input.as_bytes();
    let mut quotes = QuoteState::default();
    let mut paren_depth = 0_u32;
    let mut bracket_depth = 0_u32;

    for idx in 0..bytes.len() {
        let byte = bytes[idx];
        if quotes.consume(byte) {
            continue;
        }

        match byte {
            b'(' => paren_depth += 1,
            b')' => paren_depth = paren_depth.saturating_sub(1),
            b'[' => bracket_depth += 1,
            b']' => bracket_depth = bracket_depth.saturating_sub(1),
            b':' if paren_depth == 0 && bracket_depth == 0 => return Some(idx),
            _ => {}
        }
    }

    None
}

fn normalize_ws(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn normalize_value(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut active_quote: Option<char> = None;
    let mut escaped = false;
    let mut pending_space = false;

    for ch in input.chars() {
        if let Some(quote) = active_quote {
            out.push(ch);
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == quote {
                active_quote = None;
            }
            continue;
        }

        if ch.is_whitespace() {
            pending_space = true;
            continue;
        }

        if pending_space && !out.is_empty() {
            out.push(' ');
        }
        pending_space = false;

        if ch == '\'' || ch == '"' {
            active_quote = Some(ch);
        }
        out.push(ch);
    }

    out
}

fn strip_important(value: &str) -> String {
    let lower = value.to_ascii_lowercase();
    if let Some(prefix_len) = lower.strip_suffix("!important").map(str::len) {
        return value[..prefix_len].trim_end().to_owned();
    }
    value.to_owned()
}
