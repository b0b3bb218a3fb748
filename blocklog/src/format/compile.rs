use std::rc::Rc;

use crate::value::Value;

use super::{
    BasicKind, CompiledFormat, CompoundKind, ExpandBounds, Expando, FormatEntry, FormatEntryTag,
    LiteralChar, UNBOUNDED,
};

/// Errors raised while registering a format. Each one rejects only the
/// format being compiled.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
    #[error("format `{name}` contains a line break")]
    MultilineTemplate { name: String },
    #[error("format `{name}` has an unknown expando at offset {offset}")]
    BadExpando { name: String, offset: usize },
    #[error("format `{name}` has a bad argument formatter at offset {offset}: {reason}")]
    BadFormatSpecifier {
        name: String,
        offset: usize,
        reason: &'static str,
    },
    #[error("format `{name}` layout is invalid: {reason}")]
    BadLayout { name: String, reason: &'static str },
}

/// Either a template string or a record/sequence layout.
#[derive(Clone, Copy, Debug)]
pub enum FormatSource<'a> {
    Text(&'a str),
    Layout(&'a Value),
}

impl<'a> From<&'a str> for FormatSource<'a> {
    fn from(text: &'a str) -> Self {
        FormatSource::Text(text)
    }
}

impl<'a> From<&'a String> for FormatSource<'a> {
    fn from(text: &'a String) -> Self {
        FormatSource::Text(text)
    }
}

impl<'a> From<&'a Value> for FormatSource<'a> {
    fn from(layout: &'a Value) -> Self {
        FormatSource::Layout(layout)
    }
}

pub(super) fn compile_text(name: &str, template: String) -> Result<CompiledFormat, CompileError> {
    if template.contains(|c: char| c == '\n' || c == '\r') {
        return Err(CompileError::MultilineTemplate {
            name: name.to_string(),
        });
    }

    let entries = parse_entries(name, &template)?;
    let max_arg_index = entries.iter().filter_map(FormatEntry::arg_position).max();
    let all_single_slot = entries.iter().all(FormatEntry::is_single_slot);

    Ok(CompiledFormat {
        name: Rc::from(name),
        template,
        entries,
        max_arg_index,
        all_single_slot,
    })
}

pub(super) fn compile_layout(name: &str, layout: &Value) -> Result<CompiledFormat, CompileError> {
    if !matches!(layout, Value::Record(_) | Value::Sequence(_)) {
        return Err(CompileError::BadLayout {
            name: name.to_string(),
            reason: "expected a record or sequence",
        });
    }

    let mut text = String::new();
    let mut visiting = Vec::new();
    render_layout(layout, &mut text, &mut visiting).map_err(|reason| CompileError::BadLayout {
        name: name.to_string(),
        reason,
    })?;

    compile_text(name, text)
}

fn parse_entries(name: &str, template: &str) -> Result<Vec<FormatEntry>, CompileError> {
    let bytes = template.as_bytes();
    let mut entries = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let entry = match bytes[pos] {
            b'#' => expando_at(template, pos).ok_or_else(|| CompileError::BadExpando {
                name: name.to_string(),
                offset: pos,
            })?,
            b'$' => formatter_at(template, pos).map_err(|reason| {
                CompileError::BadFormatSpecifier {
                    name: name.to_string(),
                    offset: pos,
                    reason,
                }
            })?,
            _ => {
                pos += 1;
                continue;
            }
        };
        pos = entry.span.end;
        entries.push(entry);
    }

    Ok(entries)
}

fn expando_at(template: &str, start: usize) -> Option<FormatEntry> {
    let rest = &template[start..];
    if rest.starts_with("##") {
        return Some(FormatEntry {
            tag: FormatEntryTag::Literal(LiteralChar::Hash),
            span: start..start + 2,
        });
    }

    Expando::ALL
        .iter()
        .find(|e| rest.starts_with(e.label()))
        .map(|&e| FormatEntry {
            tag: FormatEntryTag::Expando(e),
            span: start..start + e.label().len(),
        })
}

fn formatter_at(template: &str, start: usize) -> Result<FormatEntry, &'static str> {
    let rest = &template[start..];
    if rest.starts_with("$$") {
        return Ok(FormatEntry {
            tag: FormatEntryTag::Literal(LiteralChar::Dollar),
            span: start..start + 2,
        });
    }

    let body = rest.strip_prefix("${").ok_or("stray `$`")?;
    let digits = body.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return Err("missing argument position");
    }
    let arg: usize = body[..digits]
        .parse()
        .map_err(|_| "argument position out of range")?;

    let spec = body[digits..]
        .strip_prefix(':')
        .ok_or("expected `:` after argument position")?;
    // Offset of the kind character within `rest`.
    let kind_pos = 2 + digits + 1;

    let (tag, len) = match spec.as_bytes().first() {
        Some(&c @ (b'b' | b'n' | b's' | b'g')) => {
            if spec.as_bytes().get(1) != Some(&b'}') {
                return Err("expected `}` after formatter kind");
            }
            let kind = match c {
                b'b' => BasicKind::Bool,
                b'n' => BasicKind::Number,
                b's' => BasicKind::Text,
                _ => BasicKind::General,
            };
            (FormatEntryTag::Basic { kind, arg }, kind_pos + 2)
        }
        Some(&c @ (b'o' | b'a')) => {
            let kind = if c == b'o' {
                CompoundKind::Record
            } else {
                CompoundKind::Sequence
            };
            let (bounds, clause_len) = expand_bounds(&spec[1..])?;
            (
                FormatEntryTag::Compound { kind, arg, bounds },
                kind_pos + 1 + clause_len,
            )
        }
        _ => return Err("unknown formatter kind"),
    };

    Ok(FormatEntry {
        tag,
        span: start..start + len,
    })
}

/// Parses what follows an `o`/`a` kind: either `}` or `<d,l>}`. Returns the
/// bounds and the number of bytes consumed.
fn expand_bounds(rest: &str) -> Result<(ExpandBounds, usize), &'static str> {
    if rest.starts_with('}') {
        return Ok((ExpandBounds::DEFAULT, 1));
    }

    let clause = rest.strip_prefix('<').ok_or("expected `}` or `<depth,length>`")?;
    let close = clause.find('>').ok_or("unterminated `<depth,length>` clause")?;
    let (depth, length) = clause[..close]
        .split_once(',')
        .ok_or("expected `,` in `<depth,length>` clause")?;
    if !clause[close + 1..].starts_with('}') {
        return Err("expected `}` after `<depth,length>` clause");
    }

    let mut bounds = ExpandBounds::DEFAULT;
    if let Some(depth) = bound(depth)? {
        bounds.depth = depth;
    }
    if let Some(length) = bound(length)? {
        bounds.record_length = length;
        bounds.sequence_length = length;
    }

    // `<` + clause + `>` + `}`
    Ok((bounds, 1 + close + 2))
}

fn bound(side: &str) -> Result<Option<usize>, &'static str> {
    match side {
        "" => Ok(None),
        "*" => Ok(Some(UNBOUNDED)),
        digits if digits.bytes().all(|b| b.is_ascii_digit()) => digits
            .parse()
            .map(Some)
            .map_err(|_| "expansion bound out of range"),
        _ => Err("expansion bound must be digits or `*`"),
    }
}

/// Whether a layout string is exactly one expando or argument formatter, in
/// which case it is spliced into the template unquoted. Anything with text
/// around the directive stays a quoted string.
fn is_live_specifier(s: &str) -> bool {
    let entry = match s.as_bytes().first() {
        Some(b'#') => expando_at(s, 0),
        Some(b'$') => formatter_at(s, 0).ok(),
        _ => None,
    };
    entry.map_or(false, |e| {
        !matches!(e.tag, FormatEntryTag::Literal(_)) && e.span.end == s.len()
    })
}

fn render_layout(
    value: &Value,
    out: &mut String,
    visiting: &mut Vec<*const ()>,
) -> Result<(), &'static str> {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::Text(s) if is_live_specifier(s) => out.push_str(s),
        Value::Text(s) | Value::Callable(s) => push_quoted(out, s),
        Value::Instant(t) => {
            push_quoted(out, &t.to_rfc3339_opts(chrono::SecondsFormat::Millis, true))
        }
        Value::Opaque => out.push_str("\"<Value>\""),
        Value::Record(record) => {
            let id = Rc::as_ptr(record) as *const ();
            if visiting.contains(&id) {
                return Err("layout refers to itself");
            }
            visiting.push(id);
            out.push_str("{ ");
            for (i, (key, field)) in record.fields().iter().enumerate() {
                if i != 0 {
                    out.push_str(", ");
                }
                push_quoted(out, key);
                out.push_str(": ");
                render_layout(field, out, visiting)?;
            }
            out.push_str(" }");
            visiting.pop();
        }
        Value::Sequence(sequence) => {
            let id = Rc::as_ptr(sequence) as *const ();
            if visiting.contains(&id) {
                return Err("layout refers to itself");
            }
            visiting.push(id);
            out.push_str("[ ");
            for (i, item) in sequence.items().iter().enumerate() {
                if i != 0 {
                    out.push_str(", ");
                }
                render_layout(item, out, visiting)?;
            }
            out.push_str(" ]");
            visiting.pop();
        }
    }

    Ok(())
}

fn push_quoted(out: &mut String, s: &str) {
    out.push('"');
    out.push_str(s);
    out.push('"');
}
