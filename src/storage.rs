use std::fs::File;
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};

/// Byte store backing a package.
pub trait Storage: Read + Write + Seek + Send {
    /// Push buffered writes down to durable storage.
    fn persist(&mut self) -> io::Result<()>;

    /// Total length in bytes. Leaves the cursor at the end.
    fn byte_len(&mut self) -> io::Result<u64> {
        self.seek(SeekFrom::End(0))
    }
}

impl Storage for File {
    fn persist(&mut self) -> io::Result<()> {
        self.flush()?;
        self.sync_data()
    }
}

impl Storage for Cursor<Vec<u8>> {
    fn persist(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<S: Storage + ?Sized> Storage for Box<S> {
    fn persist(&mut self) -> io::Result<()> {
        (**self).persist()
    }
}
