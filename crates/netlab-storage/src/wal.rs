// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only event log backing [`crate::state::MaterializedState`].
//!
//! Every event is one JSON line, `{"seq": <u64>, "event": <Event>}`. A crash
//! mid-write can leave a trailing partial line; `open` treats anything after
//! the first unparseable line as corruption, rotates the whole pre-repair
//! file to a numbered `.bak`, and rewrites the log with only the entries it
//! could recover.

use crate::event::Event;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

const FLUSH_ENTRY_THRESHOLD: usize = 100;
const FLUSH_INTERVAL: Duration = Duration::from_secs(5);
const MAX_BACKUPS: u32 = 3;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalEntry {
    pub seq: u64,
    pub event: Event,
}

pub struct Wal {
    path: PathBuf,
    file: File,
    write_seq: u64,
    processed_seq: u64,
    read_offset: u64,
    unflushed: usize,
    last_flush: Instant,
}

impl Wal {
    /// Opens (creating if absent) the log at `path`. `processed_seq` is the
    /// sequence number up to which entries were already applied to a
    /// snapshot taken before restart — `next_unprocessed` starts after it.
    pub fn open(path: impl AsRef<Path>, processed_seq: u64) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();

        if !path.exists() {
            File::create(&path)?;
        }

        let raw = fs::read(&path)?;
        let (valid_entries, valid_len, corrupted) = parse_prefix(&raw);

        if corrupted {
            rotate_backups(&path)?;
            fs::write(path.with_extension("bak"), &raw)?;
            rewrite_clean(&path, &valid_entries)?;
        }

        let write_seq = valid_entries.last().map(|e| e.seq).unwrap_or(0);
        let read_offset = offset_after_processed(&valid_entries, processed_seq);
        let _ = valid_len;

        let file = OpenOptions::new().append(true).read(true).open(&path)?;

        Ok(Self {
            path,
            file,
            write_seq,
            processed_seq,
            read_offset,
            unflushed: 0,
            last_flush: Instant::now(),
        })
    }

    pub fn write_seq(&self) -> u64 {
        self.write_seq
    }

    pub fn processed_seq(&self) -> u64 {
        self.processed_seq
    }

    /// Appends `event`, returning its assigned sequence number. Not
    /// durable until [`Self::flush`].
    pub fn append(&mut self, event: &Event) -> io::Result<u64> {
        self.write_seq += 1;
        let entry = WalEntry { seq: self.write_seq, event: event.clone() };
        let mut line = serde_json::to_vec(&entry)?;
        line.push(b'\n');
        self.file.write_all(&line)?;
        self.unflushed += 1;
        Ok(entry.seq)
    }

    /// Forces appended entries to disk.
    pub fn flush(&mut self) -> io::Result<()> {
        self.file.sync_all()?;
        self.unflushed = 0;
        self.last_flush = Instant::now();
        Ok(())
    }

    pub fn needs_flush(&self) -> bool {
        self.unflushed > 0
            && (self.unflushed >= FLUSH_ENTRY_THRESHOLD || self.last_flush.elapsed() >= FLUSH_INTERVAL)
    }

    /// Marks `seq` as applied to the materialized state. Does not move the
    /// streaming read cursor used by [`Self::next_unprocessed`] — that
    /// cursor already advanced when the entry was yielded.
    pub fn mark_processed(&mut self, seq: u64) {
        if seq > self.processed_seq {
            self.processed_seq = seq;
        }
    }

    /// Returns the next not-yet-yielded entry, advancing an internal byte
    /// cursor. A corrupt line is consumed (so later appends aren't stuck
    /// behind it) but yields `None` for that call rather than erroring.
    pub fn next_unprocessed(&mut self) -> io::Result<Option<WalEntry>> {
        let mut reader = File::open(&self.path)?;
        reader.seek(SeekFrom::Start(self.read_offset))?;
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;

        let Some(newline_pos) = buf.iter().position(|&b| b == b'\n') else {
            return Ok(None);
        };
        let (line, _) = buf.split_at(newline_pos);
        let consumed = newline_pos as u64 + 1;

        match parse_line(line) {
            Some(entry) => {
                self.read_offset += consumed;
                Ok(Some(entry))
            }
            None => {
                self.read_offset += consumed;
                Ok(None)
            }
        }
    }

    /// Reads the whole log fresh from disk and returns every entry with
    /// `seq > after_seq`, stopping at the first unparseable line.
    pub fn entries_after(&self, after_seq: u64) -> io::Result<Vec<WalEntry>> {
        let raw = fs::read(&self.path)?;
        let (entries, _, _) = parse_prefix(&raw);
        Ok(entries.into_iter().filter(|e| e.seq > after_seq).collect())
    }

    /// Rewrites the log keeping only entries with `seq >= seq`, for
    /// compaction after a snapshot is durable.
    pub fn truncate_before(&mut self, seq: u64) -> io::Result<()> {
        let raw = fs::read(&self.path)?;
        let (entries, _, _) = parse_prefix(&raw);
        let kept: Vec<WalEntry> = entries.into_iter().filter(|e| e.seq >= seq).collect();
        rewrite_clean(&self.path, &kept)?;
        self.file = OpenOptions::new().append(true).read(true).open(&self.path)?;
        self.read_offset = 0;
        Ok(())
    }
}

fn parse_line(line: &[u8]) -> Option<WalEntry> {
    let text = std::str::from_utf8(line).ok()?;
    serde_json::from_str(text).ok()
}

/// Parses the longest valid prefix of `raw` as newline-delimited
/// [`WalEntry`] JSON. Returns the recovered entries, the byte length of
/// that valid prefix, and whether anything after it was unparseable.
fn parse_prefix(raw: &[u8]) -> (Vec<WalEntry>, usize, bool) {
    let mut entries = Vec::new();
    let mut offset = 0usize;
    let mut corrupted = false;

    for line in raw.split_inclusive(|&b| b == b'\n') {
        let trimmed = line.strip_suffix(b"\n").unwrap_or(line);
        if trimmed.is_empty() {
            offset += line.len();
            continue;
        }
        if !line.ends_with(b"\n") {
            // trailing partial line with no terminator: treat as corruption
            corrupted = true;
            break;
        }
        match parse_line(trimmed) {
            Some(entry) => {
                entries.push(entry);
                offset += line.len();
            }
            None => {
                corrupted = true;
                break;
            }
        }
    }

    (entries, offset, corrupted)
}

fn offset_after_processed(entries: &[WalEntry], processed_seq: u64) -> u64 {
    let mut offset = 0u64;
    for entry in entries {
        let mut line = serde_json::to_vec(entry).unwrap_or_default();
        line.push(b'\n');
        if entry.seq > processed_seq {
            return offset;
        }
        offset += line.len() as u64;
    }
    offset
}

fn rewrite_clean(path: &Path, entries: &[WalEntry]) -> io::Result<()> {
    let mut buf = Vec::new();
    for entry in entries {
        let mut line = serde_json::to_vec(entry)?;
        line.push(b'\n');
        buf.extend_from_slice(&line);
    }
    fs::write(path, buf)
}

fn rotate_backups(path: &Path) -> io::Result<()> {
    let bak = |suffix: u32| {
        if suffix == 1 {
            path.with_extension("bak")
        } else {
            path.with_extension(format!("bak.{suffix}"))
        }
    };

    let oldest = bak(MAX_BACKUPS);
    let _ = fs::remove_file(&oldest);

    let mut suffix = MAX_BACKUPS;
    while suffix > 1 {
        let from = bak(suffix - 1);
        let to = bak(suffix);
        if from.exists() {
            fs::rename(&from, &to)?;
        }
        suffix -= 1;
    }
    Ok(())
}

#[cfg(test)]
#[path = "wal_tests.rs"]
mod tests;
