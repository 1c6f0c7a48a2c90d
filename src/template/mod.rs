//! Substitutes note field values and merged configuration values into
//! user-authored templates.
//!
//! Templates use the brace syntax of Python's `str.format`: `{0}` binds the
//! first note field, `{Front}` a field by name, `{language}` a configuration
//! value, `{}` the next positional slot, and `{{`/`}}` are literal braces.
//! Format specs after `:` or `!` are accepted and ignored.

use std::collections::BTreeMap;

use crate::{
    core::{
        StripHtml,
        SuggestError,
    },
    resolve::ParameterBag,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placeholder {
    Positional(usize),
    Named(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment<'a> {
    Literal(&'a str),
    Brace(char),
    Slot(Placeholder),
}

fn syntax_error(position: usize, message: &str) -> SuggestError {
    SuggestError::TemplateSyntax { position, message: message.to_string() }
}

/// Byte position of the `}` closing the field opened at `open`. Braces may
/// nest inside a format spec but not inside the field name.
fn field_end(template: &str, open: usize) -> Result<usize, SuggestError> {
    let mut depth = 0;
    let mut in_spec = false;
    for (offset, c) in template[open + 1..].char_indices() {
        let pos = open + 1 + offset;
        match c {
            ':' | '!' if depth == 0 => in_spec = true,
            '{' if in_spec => depth += 1,
            '{' => return Err(syntax_error(pos, "unexpected '{' in field name")),
            '}' if depth > 0 => depth -= 1,
            '}' => return Ok(pos),
            _ => {}
        }
    }
    Err(syntax_error(open, "expected '}' before end of string"))
}

fn parse(template: &str) -> Result<Vec<Segment<'_>>, SuggestError> {
    let mut segments = Vec::new();
    let mut next_auto = 0;
    let mut literal_start = 0;
    let mut chars = template.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        match c {
            '{' | '}' if chars.peek().map(|(_, next)| *next) == Some(c) => {
                chars.next();
                if literal_start < i {
                    segments.push(Segment::Literal(&template[literal_start..i]));
                }
                segments.push(Segment::Brace(c));
                literal_start = i + 2;
            }
            '}' => return Err(syntax_error(i, "single '}' encountered")),
            '{' => {
                if literal_start < i {
                    segments.push(Segment::Literal(&template[literal_start..i]));
                }
                let close = field_end(template, i)?;
                let inner = &template[i + 1..close];
                let key = inner.split([':', '!']).next().unwrap_or_default();
                let slot = if key.is_empty() {
                    next_auto += 1;
                    Placeholder::Positional(next_auto - 1)
                } else if key.bytes().all(|b| b.is_ascii_digit()) {
                    let index = key.parse().map_err(|_| syntax_error(i + 1, "field index too large"))?;
                    Placeholder::Positional(index)
                } else {
                    Placeholder::Named(key.to_string())
                };
                segments.push(Segment::Slot(slot));

                while chars.peek().is_some_and(|(j, _)| *j <= close) {
                    chars.next();
                }
                literal_start = close + 1;
            }
            _ => {}
        }
    }

    if literal_start < template.len() {
        segments.push(Segment::Literal(&template[literal_start..]));
    }
    Ok(segments)
}

/// Lists the slots a template references, in order of appearance.
pub fn placeholders(template: &str) -> Result<Vec<Placeholder>, SuggestError> {
    Ok(parse(template)?
        .into_iter()
        .filter_map(|segment| match segment {
            Segment::Slot(slot) => Some(slot),
            _ => None,
        })
        .collect())
}

/// Renders `template`. Unknown names and out-of-range positions are `TemplateKey` errors.
pub fn render(
    template: &str,
    positional: &[String],
    named: &BTreeMap<String, String>,
) -> Result<String, SuggestError> {
    let mut out = String::with_capacity(template.len());
    for segment in parse(template)? {
        match segment {
            Segment::Literal(text) => out.push_str(text),
            Segment::Brace(c) => out.push(c),
            Segment::Slot(Placeholder::Positional(index)) => {
                let value = positional
                    .get(index)
                    .ok_or_else(|| SuggestError::TemplateKey(index.to_string()))?;
                out.push_str(value);
            }
            Segment::Slot(Placeholder::Named(key)) => {
                let value = named.get(&key).ok_or(SuggestError::TemplateKey(key))?;
                out.push_str(value);
            }
        }
    }
    Ok(out)
}

/// Everything a template may reference for one note: its fields by position
/// and by name, plus the merged parameters.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    positional: Vec<String>,
    named: BTreeMap<String, String>,
}

impl Scope {
    /// Field values are reduced to plain text. Fields win over parameters on a name clash.
    pub fn new(field_names: &[String], field_values: &[String], bag: &ParameterBag) -> Self {
        let positional: Vec<String> = field_values.iter().map(|v| v.strip_html()).collect();

        let mut named = bag.to_strings();
        for (name, value) in field_names.iter().zip(&positional) {
            named.insert(name.clone(), value.clone());
        }

        Self { positional, named }
    }

    pub fn render(&self, template: &str) -> Result<String, SuggestError> {
        render(template, &self.positional, &self.named)
    }
}
