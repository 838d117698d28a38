//! Input opening and tab-separated record iteration
//!
//! Inputs may be plain text, BGZF-compressed (as written by `bgzip`/`pairtools`) or
//! regular gzip. A missing path or `-` reads from stdin.

use log::debug;
use noodles::bgzf;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom};

const BGZF_HEADER_SIZE: usize = 18;

/// Check whether a file starts with a valid BGZF header.
/// Returns `Ok(false)` for regular gzip, too-small files, or plain text.
fn is_bgzf<R: Read + Seek>(reader: &mut R) -> io::Result<bool> {
    let mut header = [0u8; BGZF_HEADER_SIZE];
    let result = match reader.read_exact(&mut header) {
        Ok(()) => Ok(header[0..2] == [0x1f, 0x8b]
            && header[2] == 0x08
            && header[3] & 0x04 != 0
            && header[12..14] == [b'B', b'C']),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e),
    };
    reader.seek(SeekFrom::Start(0))?;
    result
}

/// Open `path` for buffered reading, decompressing `.gz`/`.bgz` files
pub fn open_input(path: Option<&str>) -> io::Result<Box<dyn BufRead + Send>> {
    let path = match path {
        None | Some("-") => {
            debug!("Reading records from stdin");
            return Ok(Box::new(BufReader::new(io::stdin())));
        }
        Some(path) => path,
    };

    let mut file = File::open(path).map_err(|e| {
        io::Error::new(e.kind(), format!("Failed to open input '{}': {}", path, e))
    })?;

    if [".gz", ".bgz"].iter().any(|ext| path.ends_with(ext)) {
        if is_bgzf(&mut file)? {
            debug!("Opening '{}' as BGZF", path);
            Ok(Box::new(BufReader::new(bgzf::io::Reader::new(file))))
        } else {
            debug!("Opening '{}' as gzip", path);
            Ok(Box::new(BufReader::new(flate2::read::MultiGzDecoder::new(
                file,
            ))))
        }
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Splits lines into tab-separated fields, skipping blank lines and `#` comment lines
pub struct TsvReader<R> {
    inner: R,
    line: String,
    line_num: usize,
}

impl<R: BufRead> TsvReader<R> {
    pub fn new(inner: R) -> Self {
        TsvReader {
            inner,
            line: String::new(),
            line_num: 0,
        }
    }

    /// 1-based number of the last line read, comments included
    pub fn line_num(&self) -> usize {
        self.line_num
    }

    /// Next data record, or `None` at end of input
    pub fn read_record(&mut self) -> io::Result<Option<Vec<&str>>> {
        loop {
            self.line.clear();
            if self.inner.read_line(&mut self.line)? == 0 {
                return Ok(None);
            }
            self.line_num += 1;

            let content = self.line.trim_end_matches(['\n', '\r']);
            if !content.is_empty() && !content.starts_with('#') {
                break;
            }
        }

        Ok(Some(
            self.line.trim_end_matches(['\n', '\r']).split('\t').collect(),
        ))
    }
}
