//! Level filtering of the hot buffer into the pending-write buffer.

use crate::level::Level;

use super::{Entry, TaggedBuffer};

impl TaggedBuffer {
    /// Copies every message whose level passes `retain` into `pending`, then
    /// clears `self`.
    pub fn process_for_write(&mut self, retain: Level, pending: &mut TaggedBuffer) {
        self.copy_retained(retain, pending);
        self.clear();
    }

    /// Copies every message whose level passes `retain` into `pending`,
    /// leaving `self` untouched.
    ///
    /// Messages are copied whole, header and sentinel included, in the order
    /// they were encoded. A header not followed by its level is dropped along
    /// with the rest of its message.
    pub fn copy_retained(&self, retain: Level, pending: &mut TaggedBuffer) {
        let mut entries = self.iter().peekable();
        let mut scanning_for_end = false;

        while let Some(entry) = entries.next() {
            if scanning_for_end {
                if let Entry::MsgEnd = entry {
                    scanning_for_end = false;
                }
                continue;
            }

            if let Entry::MsgFormat(_) = entry {
                let retained = match entries.peek() {
                    Some(Entry::MsgLevel(level)) => level.is_enabled_under(retain),
                    _ => false,
                };
                if !retained {
                    scanning_for_end = true;
                    continue;
                }
            }

            pending.append(entry.clone());
        }
    }
}
