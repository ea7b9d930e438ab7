//! Byte streams driven by the traversal. Each one sees the exact same sequence of fields - whether it writes
//! them out, reads them in, or folds them into a fingerprint is up to the stream.

#[derive(thiserror::Error, Debug)]
pub enum StreamError {
    #[error("file ended while reading {field} at byte {offset}")]
    Truncated { field: &'static str, offset: usize },
    #[error("failed to write {field}: {source}")]
    Write {
        field: &'static str,
        #[source]
        source: std::io::Error,
    },
}

pub trait ByteStream {
    /// Exchange `bytes` with the stream. Writers read from it, readers overwrite it.
    /// `field` names what is being exchanged, for diagnostics only.
    fn consume(&mut self, bytes: &mut [u8], field: &'static str) -> Result<(), StreamError>;
    /// Step back over the last `len` consumed bytes, if the stream supports it.
    fn revert(&mut self, len: usize) {
        let _ = len;
    }
    /// Total number of bytes consumed so far.
    fn consumed(&self) -> usize;
}

/// Writes every field, in order, to an [`std::io::Write`].
pub struct StreamWriter<W> {
    writer: W,
    consumed: usize,
}
impl<W: std::io::Write> StreamWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            consumed: 0,
        }
    }
    pub fn into_inner(self) -> W {
        self.writer
    }
}
impl<W: std::io::Write> ByteStream for StreamWriter<W> {
    fn consume(&mut self, bytes: &mut [u8], field: &'static str) -> Result<(), StreamError> {
        self.writer
            .write_all(bytes)
            .map_err(|source| StreamError::Write { field, source })?;
        self.consumed += bytes.len();
        Ok(())
    }
    fn consumed(&self) -> usize {
        self.consumed
    }
}

/// Reads every field, in order, from a byte slice.
pub struct Reader<'a> {
    bytes: &'a [u8],
    cursor: usize,
}
impl<'a> Reader<'a> {
    #[must_use]
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, cursor: 0 }
    }
    /// Number of bytes left unread.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.cursor
    }
}
impl ByteStream for Reader<'_> {
    fn consume(&mut self, bytes: &mut [u8], field: &'static str) -> Result<(), StreamError> {
        let source = self
            .cursor
            .checked_add(bytes.len())
            .and_then(|end| self.bytes.get(self.cursor..end))
            .ok_or(StreamError::Truncated {
                field,
                offset: self.cursor,
            })?;
        bytes.copy_from_slice(source);
        self.cursor += bytes.len();
        Ok(())
    }
    fn revert(&mut self, len: usize) {
        self.cursor = self.cursor.saturating_sub(len);
    }
    fn consumed(&self) -> usize {
        self.cursor
    }
}
