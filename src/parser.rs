//! Splits a raw path pattern into canonical segments.
//!
//! The one rule that governs everything here (spec.md §4.2): the
//! delimiter separates segments *except* inside a parameter body
//! `<...>`. Literal segments are percent-encoded on the way in;
//! parameter declarations are kept verbatim and validated against the
//! grammar in spec.md §6.

use std::sync::LazyLock;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use regex::Regex;

use crate::error::RouterError;

/// Characters left unescaped in an otherwise percent-encoded literal
/// segment — the conventional "path segment safe" punctuation.
const PATH_SEGMENT_SAFE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

static NAME_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

/// One segment of a parsed path pattern.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// A literal, percent-encoded path segment.
    Literal(String),
    /// A `<...>` parameter declaration.
    Param(ParamDecl),
}

/// A parsed parameter declaration, prior to resolving its type label
/// against a [`crate::patterns::PatternRegistry`].
#[derive(Debug, Clone, PartialEq)]
pub struct ParamDecl {
    pub name: String,
    /// The spec text after the first `:` — a known label, or a raw
    /// regex body for an unrecognized one. Defaults to `"str"` for a
    /// bare `<name>` declaration.
    pub label: String,
    /// Present for the ext-parameter form: `<name(=type)?:ext(=a|b)?>`.
    pub ext: Option<ExtDecl>,
    /// The declaration exactly as written, including angle brackets —
    /// this is the tree's node-identity key (spec.md §4.5).
    pub raw: String,
}

/// The extension-specific part of an ext-parameter declaration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExtDecl {
    /// Allowed extensions, lowercase tokens. Empty means unrestricted.
    pub allowed: Vec<String>,
}

/// Splits `path` into raw segment strings, honoring the `<...>`
/// exception to delimiter-splitting. Consecutive delimiters collapse
/// (no empty segments are produced) except for a single trailing
/// empty segment when `path` ends in the delimiter, which is how
/// strict routes distinguish a trailing slash.
fn scan_raw_parts(path: &str, delimiter: char) -> Result<Vec<String>, RouterError> {
    let chars: Vec<char> = path.chars().collect();
    let mut parts = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == delimiter {
            i += 1;
            continue;
        }
        if chars[i] == '<' {
            let start = i;
            while i < chars.len() && chars[i] != '>' {
                i += 1;
            }
            if i >= chars.len() {
                return Err(RouterError::InvalidUsage(format!(
                    "unterminated parameter declaration in '{path}'"
                )));
            }
            i += 1; // include '>'
            parts.push(chars[start..i].iter().collect());
        } else {
            let start = i;
            while i < chars.len() && chars[i] != delimiter && chars[i] != '<' {
                i += 1;
            }
            parts.push(chars[start..i].iter().collect());
        }
    }
    if parts.is_empty() {
        parts.push(String::new());
    } else if path.ends_with(delimiter) {
        parts.push(String::new());
    }
    Ok(parts)
}

/// Parses a single raw segment (literal or parameter declaration).
pub fn parse_segment(raw: &str) -> Result<Segment, RouterError> {
    if raw.starts_with('<') {
        if !raw.ends_with('>') || raw.len() < 2 {
            return Err(RouterError::InvalidUsage(format!(
                "malformed parameter declaration '{raw}'"
            )));
        }
        let inner = &raw[1..raw.len() - 1];
        Ok(Segment::Param(parse_param_inner(inner, raw)?))
    } else {
        let encoded = utf8_percent_encode(raw, PATH_SEGMENT_SAFE).to_string();
        Ok(Segment::Literal(encoded))
    }
}

fn validate_name(name: &str, context: &str) -> Result<(), RouterError> {
    if name.is_empty() {
        return Err(RouterError::InvalidUsage(format!(
            "parameter '{context}' must have a name"
        )));
    }
    if !NAME_RE.is_match(name) {
        return Err(RouterError::InvalidUsage(format!(
            "invalid parameter name '{name}' in '{context}'"
        )));
    }
    Ok(())
}

fn parse_param_inner(inner: &str, raw: &str) -> Result<ParamDecl, RouterError> {
    let (name_part, spec_part) = match inner.split_once(':') {
        Some((n, s)) => (n, Some(s)),
        None => (inner, None),
    };

    let is_ext_form = matches!(spec_part, Some(s) if s == "ext" || s.starts_with("ext="));

    if is_ext_form {
        let spec = spec_part.unwrap();
        let (name, type_label) = match name_part.split_once('=') {
            Some((n, t)) => (n, Some(t.to_string())),
            None => (name_part, None),
        };
        validate_name(name, raw)?;

        let allowed = if spec == "ext" {
            Vec::new()
        } else {
            let list = &spec["ext=".len()..];
            if list.is_empty() {
                return Err(RouterError::InvalidUsage(format!(
                    "empty extension allow-list in '{raw}'"
                )));
            }
            let exts: Vec<String> = list.split('|').map(str::to_string).collect();
            if exts.iter().any(String::is_empty) {
                return Err(RouterError::InvalidUsage(format!(
                    "empty extension token in '{raw}'"
                )));
            }
            let dots: Vec<usize> = exts.iter().map(|e| e.matches('.').count()).collect();
            if dots.windows(2).any(|w| w[0] != w[1]) {
                return Err(RouterError::InvalidUsage(format!(
                    "extensions in '{raw}' must all have the same number of sub-parts"
                )));
            }
            exts
        };

        return Ok(ParamDecl {
            name: name.to_string(),
            label: type_label.unwrap_or_else(|| "str".to_string()),
            ext: Some(ExtDecl { allowed }),
            raw: raw.to_string(),
        });
    }

    if name_part.contains('=') {
        return Err(RouterError::InvalidUsage(format!(
            "unexpected '=' in parameter declaration '{raw}'"
        )));
    }
    validate_name(name_part, raw)?;
    let label = spec_part.unwrap_or("str").to_string();
    Ok(ParamDecl { name: name_part.to_string(), label, ext: None, raw: raw.to_string() })
}

/// Splits and parses `path` into canonical segments, applying the
/// strictness rule for a trailing delimiter (spec.md §4.9): non-strict
/// routes drop a lone trailing empty segment so `/foo` and `/foo/`
/// share one canonical form; strict routes keep it so the two forms
/// stay distinct all the way through resolution.
pub fn parse_path(path: &str, delimiter: char, strict: bool) -> Result<Vec<Segment>, RouterError> {
    let decoded = percent_decode_str(path).decode_utf8_lossy().into_owned();
    let mut raw_parts = scan_raw_parts(&decoded, delimiter)?;

    if !strict && raw_parts.len() > 1 && raw_parts.last().map(String::as_str) == Some("") {
        raw_parts.pop();
    }

    raw_parts.iter().map(|p| parse_segment(p)).collect()
}

/// Rejoins canonical segments into a display/storage path string.
pub fn segments_to_path(segments: &[Segment], delimiter: char) -> String {
    segments
        .iter()
        .map(|s| match s {
            Segment::Literal(t) => t.clone(),
            Segment::Param(p) => p.raw.clone(),
        })
        .collect::<Vec<_>>()
        .join(&delimiter.to_string())
}
