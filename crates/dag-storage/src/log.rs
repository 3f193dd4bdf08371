//! Framed append-only log files with CRC-32 sidecars.
//!
//! Both persistent stores (block metadata and latest messages) share this
//! codec. A log is a sequence of length-prefixed records:
//!
//! ```text
//! ┌─────────────────────────────┬──────────────────────────┐
//! │ payload length (u32 le)     │ payload (variable)       │
//! └─────────────────────────────┴──────────────────────────┘
//! ```
//!
//! A sidecar file (its path supplied by the owning store, e.g.
//! `block-metadata-crc`) holds a single little-endian u32: the
//! CRC-32/IEEE of all payload bytes concatenated in append order. The
//! in-memory CRC is updated incrementally on each append and the sidecar is
//! rewritten atomically (temp file + rename) so a crash can never leave a
//! half-written checksum.
//!
//! ## Recovery
//!
//! On open, records are read one by one. A length prefix that cannot be
//! fully read, or a declared payload that overruns the file, ends the scan:
//! the file is truncated to the last known-good offset and the sidecar is
//! recomputed from the surviving records. Trailing garbage of any shape is
//! tolerated; a log with no recoverable records opens empty. A freshly
//! crashed node therefore always boots.

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Length prefix size.
const LEN_PREFIX: usize = 4;

/// A record recovered during replay, with the file offset it starts at.
#[derive(Debug, Clone)]
pub struct FramedRecord {
    /// Byte offset of the record's length prefix.
    pub offset: u64,
    /// The record payload.
    pub payload: Vec<u8>,
}

/// Outcome of a log replay, for logging and stats.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReplayReport {
    /// Records recovered.
    pub records: u64,
    /// Garbage bytes dropped from the tail, if any.
    pub truncated_bytes: u64,
    /// Whether the sidecar had to be recomputed.
    pub crc_rewritten: bool,
}

/// An append-only framed log with a CRC-32 sidecar.
pub struct FramedLog {
    path: PathBuf,
    crc_path: PathBuf,
    writer: Option<BufWriter<File>>,
    crc: Crc32,
    len_bytes: u64,
    record_count: u64,
    sync_on_write: bool,
}

impl FramedLog {
    /// Open (or create) the log at `path` with its sidecar at `crc_path`,
    /// applying the recovery policy.
    ///
    /// Returns the log handle, the surviving records in append order, and a
    /// report of what recovery had to do.
    pub fn open(
        path: impl Into<PathBuf>,
        crc_path: impl Into<PathBuf>,
        sync_on_write: bool,
    ) -> io::Result<(Self, Vec<FramedRecord>, ReplayReport)> {
        let path = path.into();
        let crc_path = crc_path.into();

        let (records, valid_len, file_len) = scan(&path)?;
        let mut report = ReplayReport {
            records: records.len() as u64,
            ..ReplayReport::default()
        };

        if valid_len < file_len {
            report.truncated_bytes = file_len - valid_len;
            warn!(
                path = %path.display(),
                dropped = report.truncated_bytes,
                "corrupt tail in log, truncating to last good offset"
            );
            truncate_file(&path, valid_len)?;
        }

        let mut crc = Crc32::new();
        for record in &records {
            crc.update(&record.payload);
        }

        let stored = read_sidecar(&crc_path)?;
        if stored != Some(crc.value()) {
            if stored.is_some() || !records.is_empty() {
                warn!(
                    path = %crc_path.display(),
                    "CRC sidecar missing or stale, recomputing from surviving records"
                );
            }
            write_sidecar(&crc_path, crc.value())?;
            report.crc_rewritten = true;
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let log = Self {
            path,
            crc_path,
            writer: Some(BufWriter::new(file)),
            crc,
            len_bytes: valid_len,
            record_count: records.len() as u64,
            sync_on_write,
        };

        Ok((log, records, report))
    }

    /// Append one framed record and commit the sidecar.
    pub fn append(&mut self, payload: &[u8]) -> io::Result<()> {
        let writer = self.writer.as_mut().ok_or_else(closed_error)?;

        writer.write_all(&(payload.len() as u32).to_le_bytes())?;
        writer.write_all(payload)?;
        writer.flush()?;
        if self.sync_on_write {
            writer.get_ref().sync_all()?;
        }

        self.crc.update(payload);
        write_sidecar(&self.crc_path, self.crc.value())?;

        self.len_bytes += (LEN_PREFIX + payload.len()) as u64;
        self.record_count += 1;
        debug!(path = %self.path.display(), bytes = payload.len(), "record appended");
        Ok(())
    }

    /// Replace the log contents with `payloads`, atomically.
    ///
    /// Used by the latest-messages squash: the new log is written to a temp
    /// file, synced, and renamed over the old one before the sidecar is
    /// refreshed.
    pub fn rewrite(&mut self, payloads: &[Vec<u8>]) -> io::Result<()> {
        if self.writer.is_none() {
            return Err(closed_error());
        }

        let tmp_path = self.path.with_extension("tmp");
        let mut tmp = BufWriter::new(File::create(&tmp_path)?);
        let mut crc = Crc32::new();
        let mut len_bytes = 0u64;
        for payload in payloads {
            tmp.write_all(&(payload.len() as u32).to_le_bytes())?;
            tmp.write_all(payload)?;
            crc.update(payload);
            len_bytes += (LEN_PREFIX + payload.len()) as u64;
        }
        tmp.flush()?;
        tmp.get_ref().sync_all()?;
        drop(tmp);

        // Close the old handle before the rename so the writer cannot keep
        // appending to an unlinked file.
        self.writer = None;
        std::fs::rename(&tmp_path, &self.path)?;
        write_sidecar(&self.crc_path, crc.value())?;

        let file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        self.writer = Some(BufWriter::new(file));
        self.crc = crc;
        self.len_bytes = len_bytes;
        self.record_count = payloads.len() as u64;
        Ok(())
    }

    /// Truncate the log at `offset`, discarding that record and everything
    /// after it. Used when a well-framed record fails to decode.
    pub fn truncate_to(&mut self, offset: u64) -> io::Result<()> {
        if self.writer.is_none() {
            return Err(closed_error());
        }

        self.writer = None;
        truncate_file(&self.path, offset)?;

        let (records, valid_len, _) = scan(&self.path)?;
        let mut crc = Crc32::new();
        for record in &records {
            crc.update(&record.payload);
        }
        write_sidecar(&self.crc_path, crc.value())?;

        let file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        self.writer = Some(BufWriter::new(file));
        self.crc = crc;
        self.len_bytes = valid_len;
        self.record_count = records.len() as u64;
        Ok(())
    }

    /// Truncate the log to zero length and reset the CRC.
    pub fn clear(&mut self) -> io::Result<()> {
        if self.writer.is_none() {
            return Err(closed_error());
        }
        self.writer = None;
        truncate_file(&self.path, 0)?;
        write_sidecar(&self.crc_path, Crc32::new().value())?;

        let file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        self.writer = Some(BufWriter::new(file));
        self.crc = Crc32::new();
        self.len_bytes = 0;
        self.record_count = 0;
        Ok(())
    }

    /// Detach the current log file into `target` and start a fresh log.
    ///
    /// Used by the checkpoint rollover: the rename is atomic, the CRC resets
    /// and subsequent appends go to a new empty file at the original path.
    pub fn roll_into(&mut self, target: &Path) -> io::Result<()> {
        if self.writer.is_none() {
            return Err(closed_error());
        }
        self.writer = None;
        std::fs::rename(&self.path, target)?;
        write_sidecar(&self.crc_path, Crc32::new().value())?;

        let file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        self.writer = Some(BufWriter::new(file));
        self.crc = Crc32::new();
        self.len_bytes = 0;
        self.record_count = 0;
        Ok(())
    }

    /// Flush buffered writes to disk.
    pub fn flush(&mut self) -> io::Result<()> {
        if let Some(writer) = self.writer.as_mut() {
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }
        Ok(())
    }

    /// Flush and release the file handle. Further operations fail.
    pub fn close(&mut self) -> io::Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }
        Ok(())
    }

    /// Current log size in bytes.
    pub fn len_bytes(&self) -> u64 {
        self.len_bytes
    }

    /// Number of records in the log.
    pub fn record_count(&self) -> u64 {
        self.record_count
    }

    /// The log file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Read the records of a framed log without opening it for writing.
///
/// Lenient: scanning stops at the first framing error, nothing is modified.
/// Used to replay immutable checkpoint files.
pub fn read_records(path: &Path) -> io::Result<Vec<FramedRecord>> {
    let (records, valid_len, file_len) = scan(path)?;
    if valid_len < file_len {
        warn!(
            path = %path.display(),
            dropped = file_len - valid_len,
            "ignoring corrupt tail in read-only log"
        );
    }
    Ok(records)
}

/// Scan a framed log, returning the records, the length of the valid prefix
/// and the total file length. Missing files scan as empty.
fn scan(path: &Path) -> io::Result<(Vec<FramedRecord>, u64, u64)> {
    let mut data = Vec::new();
    match File::open(path) {
        Ok(mut file) => {
            file.read_to_end(&mut data)?;
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }

    let file_len = data.len() as u64;
    let mut records = Vec::new();
    let mut offset = 0usize;

    while offset + LEN_PREFIX <= data.len() {
        let declared =
            u32::from_le_bytes(data[offset..offset + LEN_PREFIX].try_into().expect("4 bytes"))
                as usize;
        let end = match offset.checked_add(LEN_PREFIX + declared) {
            Some(end) if end <= data.len() => end,
            _ => break,
        };
        records.push(FramedRecord {
            offset: offset as u64,
            payload: data[offset + LEN_PREFIX..end].to_vec(),
        });
        offset = end;
    }

    Ok((records, offset as u64, file_len))
}

fn truncate_file(path: &Path, len: u64) -> io::Result<()> {
    match OpenOptions::new().write(true).open(path) {
        Ok(file) => file.set_len(len),
        Err(e) if e.kind() == io::ErrorKind::NotFound && len == 0 => Ok(()),
        Err(e) => Err(e),
    }
}

fn read_sidecar(path: &Path) -> io::Result<Option<u32>> {
    match std::fs::read(path) {
        Ok(bytes) if bytes.len() == 4 => {
            Ok(Some(u32::from_le_bytes(bytes.try_into().expect("4 bytes"))))
        }
        Ok(_) => Ok(None),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Write the sidecar atomically: temp file, sync, rename.
fn write_sidecar(path: &Path, value: u32) -> io::Result<()> {
    let tmp_path = path.with_extension("tmp");
    {
        let mut tmp = File::create(&tmp_path)?;
        tmp.write_all(&value.to_le_bytes())?;
        tmp.sync_all()?;
    }
    std::fs::rename(&tmp_path, path)
}

fn closed_error() -> io::Error {
    io::Error::new(io::ErrorKind::Other, "log is closed")
}

// ============================================================================
// CRC-32/IEEE
// ============================================================================

/// Incremental CRC-32 (IEEE polynomial 0xEDB88320).
#[derive(Debug, Clone, Copy)]
pub struct Crc32 {
    state: u32,
}

impl Crc32 {
    /// A CRC over no input.
    pub fn new() -> Self {
        Self { state: 0xFFFF_FFFF }
    }

    /// Feed more payload bytes.
    pub fn update(&mut self, data: &[u8]) {
        for byte in data {
            let index = ((self.state ^ (*byte as u32)) & 0xFF) as usize;
            self.state = CRC_TABLE[index] ^ (self.state >> 8);
        }
    }

    /// The checksum over everything fed so far.
    pub fn value(&self) -> u32 {
        !self.state
    }
}

impl Default for Crc32 {
    fn default() -> Self {
        Self::new()
    }
}

/// One-shot CRC-32 of `data`.
pub fn crc32(data: &[u8]) -> u32 {
    let mut crc = Crc32::new();
    crc.update(data);
    crc.value()
}

const CRC_TABLE: [u32; 256] = generate_crc_table();

const fn generate_crc_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u32;
        let mut j = 0;
        while j < 8 {
            if crc & 1 != 0 {
                crc = 0xEDB8_8320 ^ (crc >> 1);
            } else {
                crc >>= 1;
            }
            j += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}
