//! I/O helpers for the tab-separated tables
//!
//! Opens plain, gzip or bzip2 inputs behind one `BufRead`, creates buffered
//! (optionally gzip) outputs, and splits records on tabs.

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use memchr::memchr_iter;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Default buffer size for BufReader/BufWriter (128KB)
pub const DEFAULT_BUFFER_SIZE: usize = 128 * 1024;

/// Compression format of an input table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionFormat {
    /// Plain text (uncompressed)
    Plain,
    /// Gzip compressed (.gz)
    Gzip,
    /// Bzip2 compressed (.bz2)
    Bzip2,
}

/// Detect compression format from file extension, then magic bytes
pub fn detect_compression(path: &Path) -> io::Result<CompressionFormat> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    if extension == "gz" {
        return Ok(CompressionFormat::Gzip);
    }
    if extension == "bz2" {
        return Ok(CompressionFormat::Bzip2);
    }

    let mut file = File::open(path)?;
    let mut magic = [0u8; 3];
    let bytes_read = file.read(&mut magic)?;

    if bytes_read >= 2 && magic[0] == 0x1f && magic[1] == 0x8b {
        return Ok(CompressionFormat::Gzip);
    }
    // BZ2 magic: "BZh"
    if bytes_read >= 3 && magic[0] == 0x42 && magic[1] == 0x5a && magic[2] == 0x68 {
        return Ok(CompressionFormat::Bzip2);
    }

    Ok(CompressionFormat::Plain)
}

/// Open an input table, decompressing transparently
pub fn open_input<P: AsRef<Path>>(path: P) -> io::Result<Box<dyn BufRead>> {
    let path = path.as_ref();
    let format = detect_compression(path)?;
    let file = File::open(path)?;

    let reader: Box<dyn BufRead> = match format {
        CompressionFormat::Gzip => Box::new(BufReader::with_capacity(DEFAULT_BUFFER_SIZE, GzDecoder::new(file))),
        CompressionFormat::Bzip2 => Box::new(BufReader::with_capacity(
            DEFAULT_BUFFER_SIZE,
            bzip2::read::BzDecoder::new(file),
        )),
        CompressionFormat::Plain => Box::new(BufReader::with_capacity(DEFAULT_BUFFER_SIZE, file)),
    };
    Ok(reader)
}

/// Create an output file; a `.gz` extension selects gzip compression
pub fn create_output<P: AsRef<Path>>(path: P) -> io::Result<Box<dyn Write>> {
    let path = path.as_ref();
    let file = File::create(path)?;
    let writer = BufWriter::with_capacity(DEFAULT_BUFFER_SIZE, file);

    if path.extension().and_then(|e| e.to_str()) == Some("gz") {
        Ok(Box::new(GzEncoder::new(writer, flate2::Compression::default())))
    } else {
        Ok(Box::new(writer))
    }
}

/// Split a record on tab characters
pub fn split_tabs(line: &str) -> Vec<&str> {
    let bytes = line.as_bytes();
    let mut fields = Vec::with_capacity(4);
    let mut start = 0;
    for pos in memchr_iter(b'\t', bytes) {
        fields.push(&line[start..pos]);
        start = pos + 1;
    }
    fields.push(&line[start..]);
    fields
}

/// Text of one line, or its lossy decoding when the line is not valid UTF-8
pub type LineText<'a> = std::result::Result<&'a str, String>;

/// Line iterator that reuses a buffer and tracks 1-based line numbers
pub struct LineIterator<R: BufRead> {
    reader: R,
    buffer: Vec<u8>,
    line_number: usize,
}

impl<R: BufRead> LineIterator<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: Vec::with_capacity(1024),
            line_number: 0,
        }
    }

    /// Read the next line into the internal buffer
    /// Returns None at EOF, Some(Ok((line_number, text))) for each line, Some(Err) on I/O error
    ///
    /// A line that is not valid UTF-8 still advances the line count and comes
    /// back as `Err(lossy)`, so the caller can report it and carry on.
    pub fn next_line(&mut self) -> Option<io::Result<(usize, LineText<'_>)>> {
        self.buffer.clear();
        match self.reader.read_until(b'\n', &mut self.buffer) {
            Ok(0) => None, // EOF
            Ok(_) => {
                self.line_number += 1;
                if self.buffer.last() == Some(&b'\n') {
                    self.buffer.pop();
                    if self.buffer.last() == Some(&b'\r') {
                        self.buffer.pop();
                    }
                }
                let text = std::str::from_utf8(&self.buffer)
                    .map_err(|_| String::from_utf8_lossy(&self.buffer).into_owned());
                Some(Ok((self.line_number, text)))
            }
            Err(e) => Some(Err(e)),
        }
    }
}
