use std::collections::HashMap;

use crate::dom::{Dom, NodeId};
use crate::{Error, Result};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta",
    "source", "track", "wbr",
];

/// Elements whose content is consumed as opaque text up to the matching
/// close tag. Behaviors here are native Rust, so script bodies are inert.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Lenient parser for the server-rendered markup the parking pages use.
/// Unmatched close tags are ignored; unclosed elements are closed at end
/// of input.
pub(crate) fn parse_html(html: &str) -> Result<Dom> {
    let chars = html.chars().collect::<Vec<_>>();
    let mut dom = Dom::new();
    let mut open_stack: Vec<(NodeId, String)> = Vec::new();
    let mut i = 0usize;
    let mut text = String::new();

    let current_parent =
        |dom: &Dom, stack: &[(NodeId, String)]| stack.last().map(|(id, _)| *id).unwrap_or(dom.root);

    while i < chars.len() {
        if chars[i] != '<' {
            text.push(chars[i]);
            i += 1;
            continue;
        }

        if !text.trim().is_empty() {
            let parent = current_parent(&dom, &open_stack);
            dom.append_text(parent, decode_entities(&text));
        }
        text.clear();

        if lookahead(&chars, i, "<!--") {
            i = skip_until(&chars, i + 4, "-->")
                .ok_or_else(|| Error::HtmlParse("unterminated comment".into()))?;
            continue;
        }
        if lookahead(&chars, i, "<!") {
            // Doctype and other declarations carry no tree content.
            i = skip_until(&chars, i + 2, ">")
                .ok_or_else(|| Error::HtmlParse("unterminated declaration".into()))?;
            continue;
        }
        if lookahead(&chars, i, "</") {
            let close = skip_until(&chars, i + 2, ">")
                .ok_or_else(|| Error::HtmlParse("unterminated close tag".into()))?;
            let name = chars[i + 2..close - 1]
                .iter()
                .collect::<String>()
                .trim()
                .to_ascii_lowercase();
            if let Some(pos) = open_stack
                .iter()
                .rposition(|(_, open_name)| *open_name == name)
            {
                open_stack.truncate(pos);
            }
            i = close;
            continue;
        }

        let (name, attrs, self_closing, after_tag) = parse_open_tag(&chars, i)?;
        let parent = current_parent(&dom, &open_stack);
        let node = dom.create_element(parent, name.clone(), attrs);
        i = after_tag;

        if RAW_TEXT_ELEMENTS.contains(&name.as_str()) {
            let close_marker = format!("</{name}");
            let body_end = find_marker(&chars, i, &close_marker)
                .ok_or_else(|| Error::HtmlParse(format!("unterminated <{name}> element")))?;
            let body = chars[i..body_end].iter().collect::<String>();
            if !body.trim().is_empty() {
                dom.append_text(node, body);
            }
            i = skip_until(&chars, body_end, ">")
                .ok_or_else(|| Error::HtmlParse(format!("unterminated </{name}> tag")))?;
            continue;
        }

        if !self_closing && !VOID_ELEMENTS.contains(&name.as_str()) {
            open_stack.push((node, name));
        }
    }

    if !text.trim().is_empty() {
        let parent = current_parent(&dom, &open_stack);
        dom.append_text(parent, decode_entities(&text));
    }

    Ok(dom)
}

fn lookahead(chars: &[char], at: usize, marker: &str) -> bool {
    marker
        .chars()
        .enumerate()
        .all(|(offset, expected)| chars.get(at + offset) == Some(&expected))
}

/// Index just past the first occurrence of `marker` at or after `from`.
fn skip_until(chars: &[char], from: usize, marker: &str) -> Option<usize> {
    find_marker(chars, from, marker).map(|at| at + marker.chars().count())
}

fn find_marker(chars: &[char], from: usize, marker: &str) -> Option<usize> {
    let marker = marker.chars().collect::<Vec<_>>();
    (from..chars.len().checked_sub(marker.len() - 1)?).find(|&at| {
        marker
            .iter()
            .enumerate()
            .all(|(offset, expected)| chars[at + offset].eq_ignore_ascii_case(expected))
    })
}

type OpenTag = (String, HashMap<String, String>, bool, usize);

fn parse_open_tag(chars: &[char], at: usize) -> Result<OpenTag> {
    let mut i = at + 1;
    let mut name = String::new();
    while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '-') {
        name.push(chars[i].to_ascii_lowercase());
        i += 1;
    }
    if name.is_empty() {
        return Err(Error::HtmlParse(format!("malformed tag at offset {at}")));
    }

    let mut attrs = HashMap::new();
    let mut self_closing = false;
    loop {
        while i < chars.len() && chars[i].is_whitespace() {
            i += 1;
        }
        match chars.get(i) {
            None => return Err(Error::HtmlParse(format!("unterminated <{name}> tag"))),
            Some('>') => return Ok((name, attrs, self_closing, i + 1)),
            Some('/') => {
                self_closing = true;
                i += 1;
            }
            Some(_) => {
                let (key, value, next) = parse_attribute(chars, i, &name)?;
                attrs.entry(key).or_insert(value);
                i = next;
            }
        }
    }
}

fn parse_attribute(chars: &[char], at: usize, tag: &str) -> Result<(String, String, usize)> {
    let mut i = at;
    let mut key = String::new();
    while i < chars.len() && !chars[i].is_whitespace() && !matches!(chars[i], '=' | '>' | '/') {
        key.push(chars[i].to_ascii_lowercase());
        i += 1;
    }
    while i < chars.len() && chars[i].is_whitespace() {
        i += 1;
    }
    if chars.get(i) != Some(&'=') {
        // Bare attribute such as `disabled` or `required`.
        return Ok((key, String::new(), i));
    }
    i += 1;
    while i < chars.len() && chars[i].is_whitespace() {
        i += 1;
    }

    let mut value = String::new();
    match chars.get(i) {
        Some(&quote @ ('"' | '\'')) => {
            i += 1;
            while i < chars.len() && chars[i] != quote {
                value.push(chars[i]);
                i += 1;
            }
            if i >= chars.len() {
                return Err(Error::HtmlParse(format!(
                    "unterminated attribute value in <{tag}>"
                )));
            }
            i += 1;
        }
        _ => {
            while i < chars.len() && !chars[i].is_whitespace() && chars[i] != '>' {
                value.push(chars[i]);
                i += 1;
            }
        }
    }
    Ok((key, decode_entities(&value), i))
}

fn decode_entities(src: &str) -> String {
    if !src.contains('&') {
        return src.to_string();
    }
    let mut out = String::with_capacity(src.len());
    let mut rest = src;
    while let Some(at) = rest.find('&') {
        out.push_str(&rest[..at]);
        rest = &rest[at..];
        // Entity names are short; look for the terminator within the next
        // few characters, walking char boundaries so multi-byte text after
        // the ampersand cannot split a slice.
        let end = rest
            .char_indices()
            .skip(1)
            .take_while(|(idx, _)| *idx <= 10)
            .find(|(_, ch)| *ch == ';')
            .map(|(idx, _)| idx);
        let Some(end) = end else {
            out.push('&');
            rest = &rest[1..];
            continue;
        };
        let entity = &rest[1..end];
        let decoded = match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            "nbsp" => Some('\u{00A0}'),
            _ => entity
                .strip_prefix('#')
                .and_then(|digits| {
                    if let Some(hex) = digits.strip_prefix(['x', 'X']) {
                        u32::from_str_radix(hex, 16).ok()
                    } else {
                        digits.parse::<u32>().ok()
                    }
                })
                .and_then(char::from_u32),
        };
        match decoded {
            Some(ch) => {
                out.push(ch);
                rest = &rest[end + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
