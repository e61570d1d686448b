//! DOCX text extraction.
//!
//! A .docx file is a ZIP archive; the body lives in `word/document.xml`.
//! Each `<w:p>` element is a paragraph whose visible text is spread over
//! `<w:t>` runs.

use std::io::{Cursor, Read};
use zip::ZipArchive;

/// Extract the paragraphs of a DOCX file, in document order.
///
/// Paragraphs are trimmed; empty ones are dropped.
pub fn extract_paragraphs(data: &[u8]) -> Result<Vec<String>, String> {
    let mut archive = ZipArchive::new(Cursor::new(data))
        .map_err(|e| format!("invalid DOCX (not a ZIP archive): {e}"))?;

    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|_| "invalid DOCX: missing word/document.xml".to_string())?
        .read_to_string(&mut xml)
        .map_err(|e| format!("failed to read word/document.xml: {e}"))?;

    Ok(paragraphs_from_xml(&xml))
}

/// Elements that embed their own paragraphs inside a run.
const EMBEDDED_CONTAINERS: [&str; 4] = ["w:txbxContent", "w:drawing", "w:pict", "mc:Fallback"];

/// Split WordprocessingML into paragraph strings.
fn paragraphs_from_xml(xml: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut current: Option<String> = None;
    let mut in_text = false;
    // Depth inside text boxes and drawings, whose paragraphs are not body text.
    let mut skip_depth = 0usize;
    let mut rest = xml;

    while let Some(open) = rest.find('<') {
        if in_text
            && skip_depth == 0
            && let Some(p) = current.as_mut()
        {
            p.push_str(&decode_entities(&rest[..open]));
        }

        let Some(close) = rest[open..].find('>') else {
            break;
        };
        let tag = Tag::parse(&rest[open + 1..open + close]);
        rest = &rest[open + close + 1..];

        if EMBEDDED_CONTAINERS.contains(&tag.name) {
            match tag.kind {
                TagKind::Open => skip_depth += 1,
                TagKind::Close => skip_depth = skip_depth.saturating_sub(1),
                TagKind::SelfClosing => {}
            }
            in_text = false;
            continue;
        }
        if skip_depth > 0 {
            continue;
        }

        match (tag.name, tag.kind) {
            ("w:p", TagKind::Open) => current = Some(String::new()),
            ("w:p", TagKind::Close) | ("w:p", TagKind::SelfClosing) => {
                if let Some(p) = current.take() {
                    let trimmed = p.trim();
                    if !trimmed.is_empty() {
                        paragraphs.push(trimmed.to_string());
                    }
                }
                in_text = false;
            }
            ("w:t", TagKind::Open) => in_text = true,
            ("w:t", _) => in_text = false,
            ("w:tab", _) => {
                if let Some(p) = current.as_mut() {
                    p.push('\t');
                }
            }
            ("w:br", _) | ("w:cr", _) => {
                if let Some(p) = current.as_mut() {
                    p.push('\n');
                }
            }
            _ => {}
        }
    }

    if let Some(p) = current {
        let trimmed = p.trim();
        if !trimmed.is_empty() {
            paragraphs.push(trimmed.to_string());
        }
    }

    paragraphs
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TagKind {
    Open,
    Close,
    SelfClosing,
}

struct Tag<'a> {
    name: &'a str,
    kind: TagKind,
}

impl<'a> Tag<'a> {
    /// Parse the inside of `<...>`.
    fn parse(inner: &'a str) -> Self {
        let (body, closing) = match inner.strip_prefix('/') {
            Some(b) => (b, true),
            None => (inner, false),
        };
        let self_closing = !closing && body.ends_with('/');
        let name = body
            .split(|c: char| c.is_whitespace() || c == '/')
            .next()
            .unwrap_or("");

        let kind = if closing {
            TagKind::Close
        } else if self_closing {
            TagKind::SelfClosing
        } else {
            TagKind::Open
        };
        Tag { name, kind }
    }
}

/// Decode the predefined XML entities and numeric character references.
fn decode_entities(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        let Some(semi) = after.find(';') else {
            out.push_str(&rest[amp..]);
            return out;
        };
        let entity = &after[..semi];
        match decode_entity(entity) {
            Some(c) => out.push(c),
            None => {
                out.push('&');
                out.push_str(entity);
                out.push(';');
            }
        }
        rest = &after[semi + 1..];
    }

    out.push_str(rest);
    out
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "lt" => Some('<'),
        "gt" => Some('>'),
        "amp" => Some('&'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let code = if let Some(hex) = entity.strip_prefix("#x").or_else(|| entity.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                entity.strip_prefix('#')?.parse().ok()?
            };
            char::from_u32(code)
        }
    }
}
