//! Holding area for decoded bytes awaiting checksum verification
//!
//! Bytes stay in memory up to a threshold and move to an anonymous temporary
//! file beyond it. The file is unlinked on creation, so nothing is left behind
//! when a failed decode drops the staging area.

use std::fs::File;
use std::io::{self, Seek, SeekFrom, Write};

use log::debug;

pub(crate) struct Staging {
    memory: Vec<u8>,
    spool: Option<File>,
    threshold: usize,
    len: u64,
}

impl Staging {
    pub(crate) fn new(threshold: usize) -> Self {
        Self {
            memory: Vec::new(),
            spool: None,
            threshold,
            len: 0,
        }
    }

    pub(crate) fn len(&self) -> u64 {
        self.len
    }

    pub(crate) fn is_spooled(&self) -> bool {
        self.spool.is_some()
    }

    fn spill(&mut self) -> io::Result<()> {
        debug!(
            "decoded body exceeds {} bytes, spooling to a temporary file",
            self.threshold
        );
        let mut file = tempfile::tempfile()?;
        file.write_all(&self.memory)?;
        self.memory = Vec::new();
        self.spool = Some(file);
        Ok(())
    }

    /// Copies everything staged so far to `out`.
    pub(crate) fn copy_to<W: Write + ?Sized>(self, out: &mut W) -> io::Result<u64> {
        match self.spool {
            Some(mut file) => {
                file.flush()?;
                file.seek(SeekFrom::Start(0))?;
                io::copy(&mut file, out)
            }
            None => {
                out.write_all(&self.memory)?;
                Ok(self.memory.len() as u64)
            }
        }
    }
}

impl Write for Staging {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.spool.is_none() && self.memory.len() + buf.len() > self.threshold {
            self.spill()?;
        }
        match self.spool {
            Some(ref mut file) => file.write_all(buf)?,
            None => self.memory.extend_from_slice(buf),
        }
        self.len += buf.len() as u64;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.spool {
            Some(ref mut file) => file.flush(),
            None => Ok(()),
        }
    }
}
