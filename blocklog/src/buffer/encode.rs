//! Encoding of logged messages into a [`TaggedBuffer`].
//!
//! Nothing in here fails: a missing or mistyped argument becomes a
//! [`Entry::BadFormatArg`] slot, self-references become
//! [`Entry::CycleDetected`], and values past the depth or length bounds
//! become opaque or bound markers. The emitter renders all of these as
//! visible placeholders.

use std::rc::Rc;

use crate::{
    context::MacroContext,
    format::{
        BasicKind, CompiledFormat, CompoundKind, ExpandBounds, Expando, FormatEntry,
        FormatEntryTag,
    },
    level::Level,
    utils::likely,
    value::{Number, Record, Sequence, Value},
};

use super::{Entry, Scalar, TaggedBuffer};

impl TaggedBuffer {
    /// Appends one message: format handle, level, one group of entries per
    /// non-literal format entry, and the end sentinel.
    pub fn log_message(
        &mut self,
        ctx: &MacroContext<'_>,
        level: Level,
        format: &Rc<CompiledFormat>,
        args: &[Value],
    ) {
        let entries = format.entries();

        if entries.is_empty() && self.ensure_capacity(3) {
            self.append_unchecked(Entry::MsgFormat(Rc::clone(format)));
            self.append_unchecked(Entry::MsgLevel(level));
            self.append_unchecked(Entry::MsgEnd);
            return;
        }

        if likely(format.all_single_slot()) {
            let slots = 3 + entries.iter().filter(|e| !is_literal(e)).count();
            if self.ensure_capacity(slots) {
                self.append_unchecked(Entry::MsgFormat(Rc::clone(format)));
                self.append_unchecked(Entry::MsgLevel(level));
                for entry in entries {
                    if let Some(slot) = single_slot(ctx, format, entry, args) {
                        self.append_unchecked(slot);
                    }
                }
                self.append_unchecked(Entry::MsgEnd);
                return;
            }
        }

        self.append(Entry::MsgFormat(Rc::clone(format)));
        self.append(Entry::MsgLevel(level));
        for entry in entries {
            match entry.tag {
                FormatEntryTag::Basic {
                    kind: BasicKind::General,
                    arg,
                } => match args.get(arg) {
                    Some(value) => {
                        self.cycle_guard.clear();
                        self.expand(value, ExpandBounds::DEFAULT);
                    }
                    None => self.append(Entry::BadFormatArg),
                },
                FormatEntryTag::Compound { kind, arg, bounds } => match (kind, args.get(arg)) {
                    (CompoundKind::Record, Some(value @ Value::Record(_)))
                    | (CompoundKind::Sequence, Some(value @ Value::Sequence(_))) => {
                        self.cycle_guard.clear();
                        self.expand(value, bounds);
                    }
                    _ => self.append(Entry::BadFormatArg),
                },
                _ => {
                    if let Some(slot) = single_slot(ctx, format, entry, args) {
                        self.append(slot);
                    }
                }
            }
        }
        self.append(Entry::MsgEnd);
    }

    /// Recursively encodes `value`, records and sequences bounded by
    /// `bounds`.
    pub fn expand(&mut self, value: &Value, bounds: ExpandBounds) {
        self.expand_value(value, bounds.depth, &bounds);
    }

    fn expand_value(&mut self, value: &Value, depth: usize, bounds: &ExpandBounds) {
        let entry = match value {
            Value::Null => Entry::Plain(Scalar::Null),
            Value::Bool(b) => Entry::Plain(Scalar::Bool(*b)),
            Value::Number(n) => Entry::Plain(Scalar::Number(*n)),
            Value::Text(s) => Entry::Plain(Scalar::Text(Rc::clone(s))),
            Value::Instant(t) => Entry::Plain(Scalar::Time(*t)),
            Value::Callable(name) => Entry::Plain(Scalar::Callable(Rc::clone(name))),
            Value::Opaque => Entry::OpaqueValue,
            Value::Record(record) => return self.expand_record(record, depth, bounds),
            Value::Sequence(sequence) => return self.expand_sequence(sequence, depth, bounds),
        };
        self.append(entry);
    }

    fn expand_record(&mut self, record: &Rc<Record>, depth: usize, bounds: &ExpandBounds) {
        let id = identity(record);
        if self.cycle_guard.contains(&id) {
            self.append(Entry::CycleDetected);
            return;
        }
        if depth == 0 {
            self.append(Entry::OpaqueRecord);
            return;
        }

        self.cycle_guard.push(id);
        self.append(Entry::ObjectOpen);
        for (i, (name, field)) in record.fields().iter().enumerate() {
            if i == bounds.record_length {
                self.append(Entry::LengthBoundHit);
                break;
            }
            self.append(Entry::PropertyName(Rc::clone(name)));
            self.expand_value(field, depth - 1, bounds);
        }
        self.cycle_guard.pop();
        self.append(Entry::ObjectClose);
    }

    fn expand_sequence(&mut self, sequence: &Rc<Sequence>, depth: usize, bounds: &ExpandBounds) {
        let id = identity(sequence);
        if self.cycle_guard.contains(&id) {
            self.append(Entry::CycleDetected);
            return;
        }
        if depth == 0 {
            self.append(Entry::OpaqueSequence);
            return;
        }

        self.cycle_guard.push(id);
        self.append(Entry::ArrayOpen);
        for (i, item) in sequence.items().iter().enumerate() {
            if i == bounds.sequence_length {
                self.append(Entry::LengthBoundHit);
                break;
            }
            self.expand_value(item, depth - 1, bounds);
        }
        self.cycle_guard.pop();
        self.append(Entry::ArrayClose);
    }
}

#[inline(always)]
fn identity<T>(rc: &Rc<T>) -> usize {
    Rc::as_ptr(rc) as usize
}

#[inline(always)]
fn is_literal(entry: &FormatEntry) -> bool {
    matches!(entry.tag, FormatEntryTag::Literal(_))
}

/// Slot for an entry that encodes to at most one slot, `None` for literals.
#[inline]
fn single_slot(
    ctx: &MacroContext<'_>,
    format: &CompiledFormat,
    entry: &FormatEntry,
    args: &[Value],
) -> Option<Entry> {
    let slot = match entry.tag {
        FormatEntryTag::Literal(_) => return None,
        FormatEntryTag::Expando(expando) => Entry::Plain(expando_value(ctx, format, expando)),
        FormatEntryTag::Basic { kind, arg } => match (kind, args.get(arg)) {
            (BasicKind::Bool, Some(Value::Bool(b))) => Entry::Plain(Scalar::Bool(*b)),
            (BasicKind::Number, Some(Value::Number(n))) => Entry::Plain(Scalar::Number(*n)),
            (BasicKind::Text, Some(Value::Text(s))) => Entry::Plain(Scalar::Text(Rc::clone(s))),
            _ => Entry::BadFormatArg,
        },
        FormatEntryTag::Compound { .. } => Entry::BadFormatArg,
    };
    Some(slot)
}

fn expando_value(ctx: &MacroContext<'_>, format: &CompiledFormat, expando: Expando) -> Scalar {
    match expando {
        Expando::IpAddr => Scalar::Text(Rc::clone(ctx.ip_addr())),
        Expando::AppName => Scalar::Text(Rc::clone(ctx.app_name())),
        Expando::ModuleName => Scalar::Text(Rc::clone(ctx.module_name())),
        Expando::MsgName => Scalar::Text(Rc::clone(format.shared_name())),
        Expando::WallTime => Scalar::Time(ctx.now()),
        Expando::LogicalTime => {
            let ticks = i64::try_from(ctx.logical_time()).unwrap_or(i64::MAX);
            Scalar::Number(Number::Int(ticks))
        }
        Expando::CallbackId => Scalar::Number(Number::Int(ctx.callback_id())),
        Expando::RequestId => Scalar::Number(Number::Int(ctx.request_id())),
    }
}
