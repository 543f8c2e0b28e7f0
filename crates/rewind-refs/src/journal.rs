//! Crash-tolerant on-disk journal of pointer mutations.
//!
//! On-disk format, one frame per record:
//! ```text
//! [4 bytes: payload length (little-endian u32)]
//! [4 bytes: CRC32 of payload (little-endian u32)]
//! [N bytes: payload (bincode-serialized JournalEntry)]
//! ```
//!
//! Reading stops at a torn tail (short header, bad length, truncated
//! payload). Frames whose CRC does not match are skipped.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, warn};

use crate::error::{RefError, Result};
use crate::traits::RefJournal;
use crate::types::JournalEntry;

/// Header size: 4 bytes length + 4 bytes CRC.
const HEADER_SIZE: usize = 8;

/// Append-only journal stored in a single file.
pub struct FileJournal {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl FileJournal {
    /// Open (or create) the journal file at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    /// Path to the journal file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every intact record, oldest first.
    pub fn recover(&self) -> Result<Vec<JournalEntry>> {
        let mut reader = BufReader::new(File::open(&self.path)?);
        let mut entries = Vec::new();
        let mut offset: u64 = 0;

        loop {
            let mut header = [0u8; HEADER_SIZE];
            match reader.read_exact(&mut header) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e.into()),
            }

            let length = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
            let expected_crc = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
            if length == 0 {
                warn!(offset, "zero-length journal frame; stopping recovery");
                break;
            }

            let mut payload = vec![0u8; length as usize];
            match reader.read_exact(&mut payload) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    warn!(offset, length, "truncated journal frame; stopping recovery");
                    break;
                }
                Err(e) => return Err(e.into()),
            }
            let frame_len = HEADER_SIZE as u64 + u64::from(length);

            let actual_crc = crc32fast::hash(&payload);
            if actual_crc != expected_crc {
                warn!(
                    offset,
                    expected = expected_crc,
                    actual = actual_crc,
                    "journal CRC mismatch; skipping frame"
                );
                offset += frame_len;
                continue;
            }

            match bincode::deserialize::<JournalEntry>(&payload) {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!(offset, error = %e, "undecodable journal frame; skipping"),
            }
            offset += frame_len;
        }

        debug!(path = %self.path.display(), recovered = entries.len(), "journal read");
        Ok(entries)
    }
}

impl std::fmt::Debug for FileJournal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileJournal")
            .field("path", &self.path)
            .finish()
    }
}

impl RefJournal for FileJournal {
    fn append(&self, entry: &JournalEntry) -> Result<()> {
        let payload =
            bincode::serialize(entry).map_err(|e| RefError::Serialization(e.to_string()))?;
        let length = u32::try_from(payload.len())
            .map_err(|_| RefError::CorruptJournal("record exceeds 4 GiB".into()))?;
        let crc = crc32fast::hash(&payload);

        let mut writer = self
            .writer
            .lock()
            .map_err(|e| RefError::Serialization(format!("lock poisoned: {e}")))?;
        writer.write_all(&length.to_le_bytes())?;
        writer.write_all(&crc.to_le_bytes())?;
        writer.write_all(&payload)?;
        writer.flush()?;

        debug!(name = %entry.name, len = payload.len(), "journal append");
        Ok(())
    }

    fn entries(&self, name: &str) -> Result<Vec<JournalEntry>> {
        Ok(self
            .recover()?
            .into_iter()
            .filter(|e| e.name == name)
            .collect())
    }
}
