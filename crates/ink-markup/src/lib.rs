//! Markup tokenization and tree building.
//!
//! The parser is recovery-based: unbalanced or malformed input degrades to
//! text or gets dropped, it never fails the caller. Tag and attribute names
//! are case-normalized to ASCII lowercase. Raw text inside `script`/`style`
//! elements is consumed but produces no text nodes.

use ink_dom::ElementNode;
use ink_dom::MarkupNode;

/// Parses raw markup text into an ordered node forest.
#[derive(Debug, Default)]
pub struct MarkupParser;

impl MarkupParser {
    pub fn parse(&self, input: &str) -> Vec<MarkupNode> {
        build_forest(tokenize(input))
    }
}

#[derive(Debug)]
enum Token {
    Open {
        name: String,
        attributes: Vec<(String, String)>,
        self_closing: bool,
    },
    Close {
        name: String,
    },
    Text(String),
}

fn tokenize(input: &str) -> Vec<Token> {
    let bytes = input.as_bytes();
    let mut out = Vec::new();
    let mut idx = 0_usize;

    while idx < bytes.len() {
        if leads_with(bytes, idx, b"<!--") {
            idx = skip_comment(bytes, idx);
            continue;
        }

        if bytes[idx] == b'<' {
            if leads_with(bytes, idx, b"</") {
                if let Some((token, next)) = scan_close_tag(bytes, idx) {
                    out.push(token);
                    idx = next;
                    continue;
                }
            } else if leads_with(bytes, idx, b"<!") || leads_with(bytes, idx, b"<?") {
                idx = skip_declaration(bytes, idx);
                continue;
            } else if let Some((token, next)) = scan_open_tag(bytes, idx) {
                let raw_text_name = match &token {
                    Token::Open {
                        name, self_closing, ..
                    } if !*self_closing && is_raw_text_tag(name) => Some(name.clone()),
                    _ => None,
                };

                out.push(token);
                idx = next;

                if let Some(name) = raw_text_name {
                    // script/style bodies never become text nodes.
                    let (closed, after) = consume_raw_text(bytes, idx, &name);
                    if closed {
                        out.push(Token::Close { name });
                    }
                    idx = after;
                }

                continue;
            }
        }

        let (text, next) = scan_text(bytes, idx);
        if !text.is_empty() {
            out.push(Token::Text(text));
        }
        if next == idx {
            // A lone `<` that scans as neither tag nor text; keep it literal.
            out.push(Token::Text("<".to_owned()));
            idx += 1;
        } else {
            idx = next;
        }
    }

    out
}

fn build_forest(tokens: Vec<Token>) -> Vec<MarkupNode> {
    let mut stack = vec![ElementNode::new("")];

    for token in tokens {
        match token {
            Token::Text(text) => {
                if let Some(current) = stack.last_mut() {
                    current.children.push(MarkupNode::Text(decode_entities(&text)));
                }
            }
            Token::Open {
                name,
                attributes,
                self_closing,
            } => {
                let element = ElementNode {
                    tag: name.clone(),
                    attributes,
                    children: Vec::new(),
                };

                if self_closing || is_void_tag(&name) {
                    if let Some(current) = stack.last_mut() {
                        current.children.push(MarkupNode::Element(element));
                    }
                } else {
                    stack.push(element);
                }
            }
            Token::Close { name } => {
                if !stack.iter().skip(1).any(|open| open.tag == name) {
                    continue;
                }

                while stack.len() > 1 {
                    let Some(element) = stack.pop() else {
                        break;
                    };
                    let matched = element.tag == name;
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(MarkupNode::Element(element));
                    }
                    if matched {
                        break;
                    }
                }
            }
        }
    }

    while stack.len() > 1 {
        let Some(element) = stack.pop() else {
            break;
        };
        if let Some(parent) = stack.last_mut() {
            parent.children.push(MarkupNode::Element(element));
        }
    }

    stack.pop().map(|root| root.children).unwrap_or_default()
}

fn scan_text(bytes: &[u8], start: usize) -> (String, usize) {
    let mut idx = start;
    while idx < bytes.len() && bytes[idx] != b'<' {
        idx += 1;
    }
    (
        String::from_utf8_lossy(&bytes[start..idx]).into_owned(),
        idx,
    )
}

fn scan_open_tag(bytes: &[u8], start: usize) -> Option<(Token, usize)> {
    let mut idx = start + 1;
    skip_spaces(bytes, &mut idx);
    let name_start = idx;
    while idx < bytes.len() && is_name_byte(bytes[idx]) {
        idx += 1;
    }
    if idx == name_start {
        return None;
    }

    let name = String::from_utf8_lossy(&bytes[name_start..idx]).to_ascii_lowercase();
    let mut attributes = Vec::new();
    let mut self_closing = false;

    loop {
        skip_spaces(bytes, &mut idx);
        if idx >= bytes.len() {
            return None;
        }

        if bytes[idx] == b'>' {
            idx += 1;
            break;
        }

        if bytes[idx] == b'/' {
            self_closing = true;
            idx += 1;
            skip_spaces(bytes, &mut idx);
            if idx < bytes.len() && bytes[idx] == b'>' {
                idx += 1;
                break;
            }
            continue;
        }

        let attr_start = idx;
        while idx < bytes.len() && is_name_byte(bytes[idx]) {
            idx += 1;
        }
        if idx == attr_start {
            // Garbage inside the tag: drop the rest of it.
            while idx < bytes.len() && bytes[idx] != b'>' {
                idx += 1;
            }
            if idx < bytes.len() {
                idx += 1;
            }
            break;
        }

        let attr_name = String::from_utf8_lossy(&bytes[attr_start..idx]).to_ascii_lowercase();
        skip_spaces(bytes, &mut idx);

        let mut value = String::new();
        if idx < bytes.len() && bytes[idx] == b'=' {
            idx += 1;
            skip_spaces(bytes, &mut idx);
            if idx < bytes.len() && (bytes[idx] == b'"' || bytes[idx] == b'\'') {
                let quote = bytes[idx];
                idx += 1;
                let value_start = idx;
                while idx < bytes.len() && bytes[idx] != quote {
                    idx += 1;
                }
                value = String::from_utf8_lossy(&bytes[value_start..idx]).into_owned();
                if idx < bytes.len() {
                    idx += 1;
                }
            } else {
                let value_start = idx;
                while idx < bytes.len()
                    && !bytes[idx].is_ascii_whitespace()
                    && bytes[idx] != b'>'
                    && bytes[idx] != b'/'
                {
                    idx += 1;
                }
                value = String::from_utf8_lossy(&bytes[value_start..idx]).into_owned();
            }
        }

        attributes.push((attr_name, decode_entities(&value)));
    }

    Some((
        Token::Open {
            name,
            attributes,
            self_closing,
        },
        idx,
    ))
}

fn scan_close_tag(bytes: &[u8], start: usize) -> Option<(Token, usize)> {
    let mut idx = start + 2;
    skip_spaces(bytes, &mut idx);
    let name_start = idx;
    while idx < bytes.len() && is_name_byte(bytes[idx]) {
        idx += 1;
    }
    if idx == name_start {
        return None;
    }

    let name = String::from_utf8_lossy(&bytes[name_start..idx]).to_ascii_lowercase();
    while idx < bytes.len() && bytes[idx] != b'>' {
        idx += 1;
    }
    if idx >= bytes.len() {
        return None;
    }

    Some((Token::Close { name }, idx + 1))
}

/// Scans past raw text until the matching end tag. Returns whether the end
/// tag was found and the index just past it (or end of input).
fn consume_raw_text(bytes: &[u8], start: usize, tag_name: &str) -> (bool, usize) {
    let tag_bytes = tag_name.as_bytes();
    let mut idx = start;

    while idx < bytes.len() {
        if bytes[idx] != b'<'
            || idx + 2 + tag_bytes.len() > bytes.len()
            || bytes[idx + 1] != b'/'
        {
            idx += 1;
            continue;
        }

        let name_start = idx + 2;
        let name_end = name_start + tag_bytes.len();
        if !bytes[name_start..name_end]
            .iter()
            .zip(tag_bytes.iter())
            .all(|(lhs, rhs)| lhs.eq_ignore_ascii_case(rhs))
        {
            idx += 1;
            continue;
        }

        let mut close = name_end;
        while close < bytes.len() && bytes[close].is_ascii_whitespace() {
            close += 1;
        }
        if close < bytes.len() && bytes[close] == b'>' {
            return (true, close + 1);
        }

        idx += 1;
    }

    (false, bytes.len())
}

fn skip_comment(bytes: &[u8], start: usize) -> usize {
    let mut idx = start.saturating_add(4);
    while idx + 2 < bytes.len() {
        if bytes[idx] == b'-' && bytes[idx + 1] == b'-' && bytes[idx + 2] == b'>' {
            return idx + 3;
        }
        idx += 1;
    }
    bytes.len()
}

fn skip_declaration(bytes: &[u8], start: usize) -> usize {
    let mut idx = start + 2;
    while idx < bytes.len() {
        if bytes[idx] == b'>' {
            return idx + 1;
        }
        idx += 1;
    }
    bytes.len()
}

fn skip_spaces(bytes: &[u8], idx: &mut usize) {
    while *idx < bytes.len() && bytes[*idx].is_ascii_whitespace() {
        *idx += 1;
    }
}

fn leads_with(bytes: &[u8], idx: usize, pattern: &[u8]) -> bool {
    let end = idx.saturating_add(pattern.len());
    end <= bytes.len() && &bytes[idx..end] == pattern
}

fn is_name_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b':')
}

fn is_raw_text_tag(tag: &str) -> bool {
    matches!(tag, "script" | "style")
}

fn is_void_tag(tag: &str) -> bool {
    matches!(
        tag,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}

fn decode_entities(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut cursor = 0_usize;

    while let Some(offset) = input[cursor..].find('&') {
        let amp = cursor + offset;
        out.push_str(&input[cursor..amp]);

        let rest = &input[(amp + 1)..];
        let Some(rel_semi) = rest.find(';') else {
            out.push('&');
            cursor = amp + 1;
            continue;
        };

        let semi = amp + 1 + rel_semi;
        if let Some(decoded) = decode_entity(&input[(amp + 1)..semi]) {
            out.push(decoded);
            cursor = semi + 1;
        } else {
            out.push('&');
            cursor = amp + 1;
        }
    }

    out.push_str(&input[cursor..]);
    out
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "nbsp" => Some(' '),
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            if let Some(hex) = entity
                .strip_prefix("#x")
                .or_else(|| entity.strip_prefix("#X"))
            {
                char::from_u32(u32::from_str_radix(hex, 16).ok()?)
            } else if let Some(dec) = entity.strip_prefix('#') {
                char::from_u32(dec.parse::<u32>().ok()?)
            } else {
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::MarkupParser;
    use ink_dom::ElementNode;
    use ink_dom::MarkupNode;

    fn first_element(nodes: &[MarkupNode]) -> Option<&ElementNode> {
        nodes.iter().find_map(|node| match node {
            MarkupNode::Element(element) => Some(element),
            MarkupNode::Text(_) => None,
        })
    }

    #[test]
    fn parses_nested_elements_in_document_order() {
        let nodes = MarkupParser.parse("<div><h1>Title</h1><p>Body</p></div>");
        assert_eq!(nodes.len(), 1);

        let Some(div) = first_element(&nodes) else {
            unreachable!();
        };
        assert_eq!(div.tag, "div");
        assert_eq!(div.children.len(), 2);

        let Some(MarkupNode::Element(h1)) = div.children.first() else {
            unreachable!();
        };
        assert_eq!(h1.tag, "h1");
        assert_eq!(h1.children, vec![MarkupNode::Text("Title".to_owned())]);
    }

    #[test]
    fn normalizes_tag_and_attribute_case() {
        let nodes = MarkupParser.parse(r#"<DIV Class="card" ID=hero></DIV>"#);
        let Some(div) = first_element(&nodes) else {
            unreachable!();
        };
        assert_eq!(div.tag, "div");
        assert_eq!(div.attribute("class"), Some("card"));
        assert_eq!(div.attribute("id"), Some("hero"));
    }

    #[test]
    fn supports_single_quoted_and_unquoted_attributes() {
        let nodes = MarkupParser.parse("<a href='/docs' target=_blank>go</a>");
        let Some(anchor) = first_element(&nodes) else {
            unreachable!();
        };
        assert_eq!(anchor.attribute("href"), Some("/docs"));
        assert_eq!(anchor.attribute("target"), Some("_blank"));
    }

    #[test]
    fn decodes_entities_in_text() {
        let nodes = MarkupParser.parse("<p>Fish &amp; Chips &#x2713;</p>");
        let Some(paragraph) = first_element(&nodes) else {
            unreachable!();
        };
        assert_eq!(
            paragraph.children,
            vec![MarkupNode::Text("Fish & Chips \u{2713}".to_owned())]
        );
    }

    #[test]
    fn skips_comments_and_doctype() {
        let nodes = MarkupParser.parse("<!DOCTYPE html><!-- note --><p>ok</p>");
        assert_eq!(nodes.len(), 1);
    }

    #[test]
    fn void_and_self_closing_tags_do_not_nest() {
        let nodes = MarkupParser.parse("<div><img src=x><br/><span>after</span></div>");
        let Some(div) = first_element(&nodes) else {
            unreachable!();
        };
        assert_eq!(div.children.len(), 3);
    }

    #[test]
    fn script_and_style_bodies_produce_no_text_nodes() {
        let nodes =
            MarkupParser.parse("<div><style>p { color: red; }</style><script>1 < 2</script>Hi</div>");
        let Some(div) = first_element(&nodes) else {
            unreachable!();
        };

        let texts = div
            .children
            .iter()
            .filter_map(|node| match node {
                MarkupNode::Text(text) => Some(text.as_str()),
                MarkupNode::Element(_) => None,
            })
            .collect::<Vec<_>>();
        assert_eq!(texts, vec!["Hi"]);
    }

    #[test]
    fn recovers_from_unclosed_elements() {
        let nodes = MarkupParser.parse("<div><p>dangling");
        let Some(div) = first_element(&nodes) else {
            unreachable!();
        };
        assert_eq!(div.tag, "div");
        assert_eq!(div.children.len(), 1);
    }

    #[test]
    fn stray_close_tags_do_not_pop_open_elements() {
        let nodes = MarkupParser.parse("<div></span><p>kept</p></div>");
        let Some(div) = first_element(&nodes) else {
            unreachable!();
        };
        assert_eq!(div.tag, "div");
        assert_eq!(div.children.len(), 1);
    }
}
