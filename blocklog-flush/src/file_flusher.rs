use std::{
    fs::{File, OpenOptions},
    io::{self, LineWriter, Write},
    path::Path,
};

use crate::Flush;

/// Flushes into a file, appending to whatever it already contains.
pub struct FileFlusher(LineWriter<File>);

impl FileFlusher {
    /// Opens (or creates) the file at `path` for appending.
    pub fn new(path: impl AsRef<Path>) -> io::Result<FileFlusher> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(FileFlusher(LineWriter::new(file)))
    }
}

impl Flush for FileFlusher {
    fn flush_one(&mut self, display: String) -> io::Result<()> {
        self.0.write_all(display.as_bytes())?;
        self.0.flush()
    }
}
