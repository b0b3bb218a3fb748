//! Compiled message formats.
//!
//! A format is registered once under a name and compiled into a
//! [`CompiledFormat`]: the template text plus a position-indexed list of
//! [`FormatEntry`]s. Every logged message refers back to its format, so the
//! literal parts of the template never have to be copied at logging time.
//!
//! ## Template syntax
//!
//! Expandos, filled in from the logger's context:
//!
//! * `#ip_addr`, `#app_name`, `#module_name`, `#msg_name`
//! * `#wall_time`, `#logical_time`, `#callback_id`, `#request_id`
//! * `##` for a literal `#`
//!
//! Argument formatters, `i` being the zero-based argument position:
//!
//! * `${i:b}` boolean, `${i:n}` number, `${i:s}` string
//! * `${i:g}` any value, records and sequences expanded with the defaults
//! * `${i:o}` / `${i:o<d,l>}` record expanded `d` levels deep with at most
//!   `l` items per level (`*` for unbounded)
//! * `${i:a}` / `${i:a<d,l>}` the same for sequences
//! * `$$` for a literal `$`
//!
//! ```rust
//! use blocklog::format::CompiledFormat;
//!
//! let fmt = CompiledFormat::compile("startup", "listening on #ip_addr port ${0:n}").unwrap();
//! assert_eq!(fmt.entries().len(), 2);
//! assert_eq!(fmt.max_arg_index(), Some(0));
//! assert!(fmt.all_single_slot());
//! ```

mod compile;

use std::{ops::Range, rc::Rc};

pub use compile::{CompileError, FormatSource};

use crate::value::Value;

/// Default depth records and sequences are expanded to.
pub const DEFAULT_EXPAND_DEPTH: usize = 2;
/// Default number of properties expanded per record level.
pub const DEFAULT_RECORD_LENGTH: usize = 1024;
/// Default number of items expanded per sequence level.
pub const DEFAULT_SEQUENCE_LENGTH: usize = 128;
/// Value stored for a `*` bound.
pub const UNBOUNDED: usize = usize::MAX;

/// A literal character escaped in the template.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LiteralChar {
    /// `##`
    Hash,
    /// `$$`
    Dollar,
}

impl LiteralChar {
    pub fn as_char(self) -> char {
        match self {
            LiteralChar::Hash => '#',
            LiteralChar::Dollar => '$',
        }
    }
}

/// Values pulled from the logger's context rather than the argument list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Expando {
    IpAddr,
    AppName,
    ModuleName,
    MsgName,
    WallTime,
    LogicalTime,
    CallbackId,
    RequestId,
}

impl Expando {
    /// Matched in order, so no label may be a prefix of a later one.
    pub const ALL: [Expando; 8] = [
        Expando::IpAddr,
        Expando::AppName,
        Expando::ModuleName,
        Expando::MsgName,
        Expando::WallTime,
        Expando::LogicalTime,
        Expando::CallbackId,
        Expando::RequestId,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Expando::IpAddr => "#ip_addr",
            Expando::AppName => "#app_name",
            Expando::ModuleName => "#module_name",
            Expando::MsgName => "#msg_name",
            Expando::WallTime => "#wall_time",
            Expando::LogicalTime => "#logical_time",
            Expando::CallbackId => "#callback_id",
            Expando::RequestId => "#request_id",
        }
    }
}

/// Single-value argument formatters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BasicKind {
    /// `b`
    Bool,
    /// `n`
    Number,
    /// `s`
    Text,
    /// `g`
    General,
}

/// Recursively expanded argument formatters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompoundKind {
    /// `o`
    Record,
    /// `a`
    Sequence,
}

/// Limits applied while expanding a record or sequence argument.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExpandBounds {
    pub depth: usize,
    /// Properties allowed per record level.
    pub record_length: usize,
    /// Items allowed per sequence level.
    pub sequence_length: usize,
}

impl ExpandBounds {
    /// Bounds used by `${i:g}`, and by `o`/`a` without an explicit clause.
    pub const DEFAULT: ExpandBounds = ExpandBounds {
        depth: DEFAULT_EXPAND_DEPTH,
        record_length: DEFAULT_RECORD_LENGTH,
        sequence_length: DEFAULT_SEQUENCE_LENGTH,
    };

    /// Length bound that applies to a value of `kind`.
    pub fn length_for(&self, kind: CompoundKind) -> usize {
        match kind {
            CompoundKind::Record => self.record_length,
            CompoundKind::Sequence => self.sequence_length,
        }
    }
}

impl Default for ExpandBounds {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// What a [`FormatEntry`] stands for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormatEntryTag {
    Literal(LiteralChar),
    Expando(Expando),
    Basic {
        kind: BasicKind,
        arg: usize,
    },
    Compound {
        kind: CompoundKind,
        arg: usize,
        bounds: ExpandBounds,
    },
}

/// One specifier found in a template.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FormatEntry {
    pub tag: FormatEntryTag,
    /// Byte range of the specifier in the template text.
    pub span: Range<usize>,
}

impl FormatEntry {
    pub fn arg_position(&self) -> Option<usize> {
        match self.tag {
            FormatEntryTag::Basic { arg, .. } | FormatEntryTag::Compound { arg, .. } => Some(arg),
            _ => None,
        }
    }

    pub fn expand_depth(&self) -> Option<usize> {
        match self.tag {
            FormatEntryTag::Compound { bounds, .. } => Some(bounds.depth),
            _ => None,
        }
    }

    pub fn expand_length(&self) -> Option<usize> {
        match self.tag {
            FormatEntryTag::Compound { kind, bounds, .. } => Some(bounds.length_for(kind)),
            _ => None,
        }
    }

    /// Whether this entry always encodes to at most one buffer slot.
    pub fn is_single_slot(&self) -> bool {
        match self.tag {
            FormatEntryTag::Literal(_) | FormatEntryTag::Expando(_) => true,
            FormatEntryTag::Basic { kind, .. } => kind != BasicKind::General,
            FormatEntryTag::Compound { .. } => false,
        }
    }
}

/// A validated, position-indexed template.
///
/// Immutable once compiled; messages share it through an [`Rc`].
#[derive(Debug, PartialEq)]
pub struct CompiledFormat {
    name: Rc<str>,
    template: String,
    entries: Vec<FormatEntry>,
    max_arg_index: Option<usize>,
    all_single_slot: bool,
}

impl CompiledFormat {
    /// Compiles a template string.
    pub fn compile(name: &str, template: &str) -> Result<CompiledFormat, CompileError> {
        compile::compile_text(name, template.to_string())
    }

    /// Compiles a record or sequence layout, rendering it to text first.
    pub fn compile_layout(name: &str, layout: &Value) -> Result<CompiledFormat, CompileError> {
        compile::compile_layout(name, layout)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn shared_name(&self) -> &Rc<str> {
        &self.name
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn entries(&self) -> &[FormatEntry] {
        &self.entries
    }

    /// Largest argument position referenced, `None` if no argument is used.
    pub fn max_arg_index(&self) -> Option<usize> {
        self.max_arg_index
    }

    pub fn all_single_slot(&self) -> bool {
        self.all_single_slot
    }

    /// Template text before the first entry.
    pub fn prefix(&self) -> &str {
        let end = self
            .entries
            .first()
            .map_or(self.template.len(), |e| e.span.start);
        &self.template[..end]
    }

    /// Byte range of the literal text between entry `idx` and the next one.
    pub fn trailing_span(&self, idx: usize) -> Range<usize> {
        let start = self.entries[idx].span.end;
        let end = self
            .entries
            .get(idx + 1)
            .map_or(self.template.len(), |e| e.span.start);
        start..end
    }
}

/// Compiles a template given either as text or as a layout value.
pub fn compile<'a>(
    name: &str,
    source: impl Into<FormatSource<'a>>,
) -> Result<CompiledFormat, CompileError> {
    match source.into() {
        FormatSource::Text(template) => CompiledFormat::compile(name, template),
        FormatSource::Layout(layout) => CompiledFormat::compile_layout(name, layout),
    }
}
