//! Block-chunked storage for encoded messages.
//!
//! A [`TaggedBuffer`] is an ordered list of fixed-capacity blocks of
//! [`Entry`] slots. Logging a message appends a contiguous run
//!
//! ```text
//! MsgFormat, MsgLevel, <body...>, MsgEnd
//! ```
//!
//! which may straddle a block boundary. Appends never fail: a full tail
//! block is followed by a new one, taken from a small pool of blocks
//! reclaimed by earlier [`clear`](TaggedBuffer::clear) calls when possible.
//!
//! Encoding lives in [`encode`], level filtering in [`filter`].

pub mod encode;
pub mod filter;

use std::rc::Rc;

use chrono::{DateTime, Utc};

use crate::{format::CompiledFormat, level::Level, value::Number};

/// Slots per block.
pub const BLOCK_CAPACITY: usize = 1024;

/// Reclaimed blocks kept around for reuse after a clear.
const SPARE_BLOCKS: usize = 4;

/// A scalar captured at encode time.
#[derive(Clone, Debug, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Number(Number),
    Text(Rc<str>),
    Time(DateTime<Utc>),
    Callable(Rc<str>),
}

/// One buffer slot.
#[derive(Clone, Debug, PartialEq)]
pub enum Entry {
    MsgFormat(Rc<CompiledFormat>),
    MsgLevel(Level),
    MsgEnd,
    ObjectOpen,
    ObjectClose,
    ArrayOpen,
    ArrayClose,
    PropertyName(Rc<str>),
    BadFormatArg,
    Plain(Scalar),
    LengthBoundHit,
    CycleDetected,
    OpaqueValue,
    OpaqueRecord,
    OpaqueSequence,
}

/// Kind of a slot, without its payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntryTag {
    /// Not populated.
    Clear,
    MsgFormat,
    MsgLevel,
    MsgEnd,
    ObjectOpen,
    ObjectClose,
    ArrayOpen,
    ArrayClose,
    PropertyName,
    BadFormatArg,
    PlainValue,
    LengthBoundHit,
    CycleDetected,
    OpaqueValue,
    OpaqueRecord,
    OpaqueSequence,
}

impl Entry {
    pub fn tag(&self) -> EntryTag {
        match self {
            Entry::MsgFormat(_) => EntryTag::MsgFormat,
            Entry::MsgLevel(_) => EntryTag::MsgLevel,
            Entry::MsgEnd => EntryTag::MsgEnd,
            Entry::ObjectOpen => EntryTag::ObjectOpen,
            Entry::ObjectClose => EntryTag::ObjectClose,
            Entry::ArrayOpen => EntryTag::ArrayOpen,
            Entry::ArrayClose => EntryTag::ArrayClose,
            Entry::PropertyName(_) => EntryTag::PropertyName,
            Entry::BadFormatArg => EntryTag::BadFormatArg,
            Entry::Plain(_) => EntryTag::PlainValue,
            Entry::LengthBoundHit => EntryTag::LengthBoundHit,
            Entry::CycleDetected => EntryTag::CycleDetected,
            Entry::OpaqueValue => EntryTag::OpaqueValue,
            Entry::OpaqueRecord => EntryTag::OpaqueRecord,
            Entry::OpaqueSequence => EntryTag::OpaqueSequence,
        }
    }

    /// The slot for a tag that carries no payload.
    pub fn tag_only(tag: EntryTag) -> Option<Entry> {
        let entry = match tag {
            EntryTag::MsgEnd => Entry::MsgEnd,
            EntryTag::ObjectOpen => Entry::ObjectOpen,
            EntryTag::ObjectClose => Entry::ObjectClose,
            EntryTag::ArrayOpen => Entry::ArrayOpen,
            EntryTag::ArrayClose => Entry::ArrayClose,
            EntryTag::BadFormatArg => Entry::BadFormatArg,
            EntryTag::LengthBoundHit => Entry::LengthBoundHit,
            EntryTag::CycleDetected => Entry::CycleDetected,
            EntryTag::OpaqueValue => Entry::OpaqueValue,
            EntryTag::OpaqueRecord => Entry::OpaqueRecord,
            EntryTag::OpaqueSequence => Entry::OpaqueSequence,
            EntryTag::Clear
            | EntryTag::MsgFormat
            | EntryTag::MsgLevel
            | EntryTag::PropertyName
            | EntryTag::PlainValue => return None,
        };
        Some(entry)
    }
}

struct Block {
    entries: Vec<Entry>,
}

impl Block {
    fn new() -> Block {
        Block {
            entries: Vec::with_capacity(BLOCK_CAPACITY),
        }
    }

    #[inline(always)]
    fn remaining(&self) -> usize {
        BLOCK_CAPACITY.saturating_sub(self.entries.len())
    }
}

/// Position of a slot: block index and offset inside the block.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Cursor {
    block: usize,
    slot: usize,
}

impl Cursor {
    pub(crate) fn advanced(self) -> Cursor {
        Cursor {
            block: self.block,
            slot: self.slot + 1,
        }
    }
}

/// Growable list of fixed-capacity blocks holding tagged entries.
pub struct TaggedBuffer {
    blocks: Vec<Block>,
    spare: Vec<Block>,
    /// Identities of the records and sequences currently being expanded.
    cycle_guard: Vec<usize>,
}

impl TaggedBuffer {
    pub fn new() -> TaggedBuffer {
        TaggedBuffer {
            blocks: vec![Block::new()],
            spare: Vec::new(),
            cycle_guard: Vec::new(),
        }
    }

    /// Appends one entry, starting a new block when the tail is full.
    #[inline]
    pub fn append(&mut self, entry: Entry) {
        self.tail_with_room(1).entries.push(entry);
    }

    /// Appends an entry that carries no payload.
    pub fn append_tag_only(&mut self, tag: EntryTag) {
        match Entry::tag_only(tag) {
            Some(entry) => self.append(entry),
            None => tracing::error!(?tag, "tag needs a payload, nothing appended"),
        }
    }

    /// Makes sure the tail block can take `n` more entries without a block
    /// change, so that [`append_unchecked`](Self::append_unchecked) can be
    /// used for them. Returns `false` if `n` exceeds a block.
    pub fn ensure_capacity(&mut self, n: usize) -> bool {
        if n > BLOCK_CAPACITY {
            return false;
        }
        self.tail_with_room(n);
        true
    }

    /// Appends to the tail block without checking for room. Only valid for
    /// slots reserved with [`ensure_capacity`](Self::ensure_capacity).
    #[inline(always)]
    pub fn append_unchecked(&mut self, entry: Entry) {
        let tail = self.blocks.len() - 1;
        debug_assert!(self.blocks[tail].remaining() > 0);
        self.blocks[tail].entries.push(entry);
    }

    /// Drops all content, keeping one empty block as head and tail.
    pub fn clear(&mut self) {
        while self.blocks.len() > 1 {
            let Some(mut block) = self.blocks.pop() else {
                break;
            };
            if self.spare.len() < SPARE_BLOCKS {
                block.entries.clear();
                self.spare.push(block);
            }
        }
        match self.blocks.first_mut() {
            Some(head) => head.entries.clear(),
            None => self.blocks.push(Block::new()),
        }
        self.cycle_guard.clear();
    }

    /// Number of populated slots.
    pub fn len(&self) -> usize {
        self.blocks.iter().map(|b| b.entries.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.iter().all(|b| b.entries.is_empty())
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entry> + '_ {
        self.blocks.iter().flat_map(|b| b.entries.iter())
    }

    /// Tag of the `index`-th populated slot, [`EntryTag::Clear`] past the end.
    pub fn tag_at(&self, index: usize) -> EntryTag {
        self.iter().nth(index).map_or(EntryTag::Clear, Entry::tag)
    }

    /// First populated slot at or after `cursor`, with its normalized position.
    pub(crate) fn entry_from(&self, cursor: Cursor) -> Option<(Cursor, &Entry)> {
        let mut at = cursor;
        while let Some(block) = self.blocks.get(at.block) {
            if let Some(entry) = block.entries.get(at.slot) {
                return Some((at, entry));
            }
            at = Cursor {
                block: at.block + 1,
                slot: 0,
            };
        }
        None
    }

    fn tail_with_room(&mut self, n: usize) -> &mut Block {
        let full = self.blocks.last().map_or(true, |b| b.remaining() < n);
        if full {
            let block = self.spare.pop().unwrap_or_else(Block::new);
            self.blocks.push(block);
        }
        let tail = self.blocks.len() - 1;
        &mut self.blocks[tail]
    }
}

impl Default for TaggedBuffer {
    fn default() -> Self {
        Self::new()
    }
}
