use std::{cell::RefCell, io, rc::Rc};

use crate::Flush;

/// Captures flushed text into a string shared with a [`StringHandle`].
///
/// Useful to inspect rendered output in tests, or to keep the most recent
/// output around for diagnostics.
#[derive(Default)]
pub struct StringFlusher {
    out: Rc<RefCell<String>>,
}

impl StringFlusher {
    pub fn new() -> StringFlusher {
        StringFlusher::default()
    }

    /// Returns a handle reading the same underlying string.
    pub fn handle(&self) -> StringHandle {
        StringHandle {
            out: Rc::clone(&self.out),
        }
    }
}

impl Flush for StringFlusher {
    fn flush_one(&mut self, display: String) -> io::Result<()> {
        self.out.borrow_mut().push_str(&display);
        Ok(())
    }
}

/// Read side of a [`StringFlusher`].
#[derive(Clone)]
pub struct StringHandle {
    out: Rc<RefCell<String>>,
}

impl StringHandle {
    /// Copy of everything flushed so far.
    pub fn contents(&self) -> String {
        self.out.borrow().clone()
    }

    /// Everything flushed so far, leaving the capture empty.
    pub fn take(&self) -> String {
        std::mem::take(&mut *self.out.borrow_mut())
    }

    /// Flushed text split into lines, without the terminators.
    pub fn lines(&self) -> Vec<String> {
        self.out.borrow().lines().map(str::to_string).collect()
    }
}
