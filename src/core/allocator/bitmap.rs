//! Bitmap storage backends
//!
//! Both backends use the on-disk bit order: cluster `n` lives in byte `n / 8`
//! at bit `n % 8`, least significant bit first.

use crate::allocator::ClusterBitmap;
use crate::error::{AllocError, Result};
use crate::geometry::padded_bitmap_bytes;
use std::io::{Read, Seek, SeekFrom, Write};
use tracing::debug;

fn check_span(start: u64, length: u64, len: u64) -> Result<()> {
    match start.checked_add(length) {
        Some(end) if end <= len => Ok(()),
        _ => Err(AllocError::InvalidRange {
            start,
            length,
            total: len,
        }),
    }
}

fn byte_len(bits: u64) -> usize {
    ((bits + 7) / 8) as usize
}

/// In-memory bitmap
///
/// Represents cluster state with bits:
/// - 0 = free cluster
/// - 1 = used cluster
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryBitmap {
    /// Bitmap words (each word = 64 clusters)
    words: Vec<u64>,

    /// Number of clusters tracked
    len: u64,
}

impl MemoryBitmap {
    /// Create a bitmap with every cluster free
    pub fn new(len: u64) -> Self {
        let num_words = ((len + 63) / 64) as usize;
        MemoryBitmap {
            words: vec![0u64; num_words],
            len,
        }
    }

    /// Load a bitmap from its on-disk byte representation
    ///
    /// Bytes beyond `len` clusters are ignored; missing bytes read as free.
    pub fn from_bytes(bytes: &[u8], len: u64) -> Self {
        let mut bitmap = MemoryBitmap::new(len);
        let wanted = byte_len(len).min(bytes.len());

        for (word_idx, chunk) in bytes[..wanted].chunks(8).enumerate() {
            let mut raw = [0u8; 8];
            raw[..chunk.len()].copy_from_slice(chunk);
            bitmap.words[word_idx] = u64::from_le_bytes(raw);
        }

        // Clear padding bits past the last tracked cluster
        let tail = len % 64;
        if tail != 0 {
            if let Some(last) = bitmap.words.last_mut() {
                *last &= (1u64 << tail) - 1;
            }
        }

        bitmap
    }

    /// Serialize to the on-disk byte representation
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes: Vec<u8> = self.words.iter().flat_map(|w| w.to_le_bytes()).collect();
        bytes.truncate(byte_len(self.len));
        bytes
    }

    /// Apply `used` to every bit of `[start, start + length)`, one word at a time
    fn apply(&mut self, start: u64, length: u64, used: bool) {
        let end = start + length;
        let mut cluster = start;

        while cluster < end {
            let word_idx = (cluster / 64) as usize;
            let bit_idx = cluster % 64;
            let span = (64 - bit_idx).min(end - cluster);
            let mask = word_mask(bit_idx, span);

            if used {
                self.words[word_idx] |= mask;
            } else {
                self.words[word_idx] &= !mask;
            }

            cluster += span;
        }
    }
}

fn word_mask(bit_idx: u64, span: u64) -> u64 {
    if span == 64 {
        u64::MAX
    } else {
        ((1u64 << span) - 1) << bit_idx
    }
}

impl ClusterBitmap for MemoryBitmap {
    fn len(&self) -> u64 {
        self.len
    }

    fn is_used(&self, cluster: u64) -> bool {
        debug_assert!(cluster < self.len, "cluster {} out of range", cluster);
        let word_idx = (cluster / 64) as usize;
        let bit_idx = cluster % 64;
        (self.words[word_idx] & (1u64 << bit_idx)) != 0
    }

    fn mark_used(&mut self, start: u64, length: u64) -> Result<()> {
        check_span(start, length, self.len)?;
        self.apply(start, length, true);
        Ok(())
    }

    fn mark_free(&mut self, start: u64, length: u64) -> Result<()> {
        check_span(start, length, self.len)?;
        self.apply(start, length, false);
        Ok(())
    }

    fn count_used(&self, start: u64, end: u64) -> u64 {
        let end = end.min(self.len);
        let mut cluster = start;
        let mut used = 0u64;

        while cluster < end {
            let word_idx = (cluster / 64) as usize;
            let bit_idx = cluster % 64;
            let span = (64 - bit_idx).min(end - cluster);
            used += (self.words[word_idx] & word_mask(bit_idx, span)).count_ones() as u64;
            cluster += span;
        }

        used
    }
}

/// Bitmap persisted in a seekable stream
///
/// The whole bitmap is cached in memory; every mutation writes the touched
/// bytes back and flushes before returning. The cache only changes once the
/// write has succeeded, so a failed mutation leaves it as it was. Streams made
/// by [`StreamBitmap::create`] are zero padded to a multiple of 8 bytes.
#[derive(Debug)]
pub struct StreamBitmap<S> {
    stream: S,
    bytes: Vec<u8>,
    len: u64,
}

impl<S: Read + Write + Seek> StreamBitmap<S> {
    /// Write a fresh all-free bitmap for `len` clusters at the start of `stream`
    pub fn create(mut stream: S, len: u64) -> Result<Self> {
        let padded = vec![0u8; padded_bitmap_bytes(len) as usize];
        stream.seek(SeekFrom::Start(0))?;
        stream.write_all(&padded)?;
        stream.flush()?;

        debug!(
            "Created stream bitmap for {} clusters ({} bytes)",
            len,
            padded.len()
        );
        Ok(StreamBitmap {
            stream,
            bytes: vec![0u8; byte_len(len)],
            len,
        })
    }

    /// Read an existing bitmap describing `len` clusters from `stream`
    pub fn open(mut stream: S, len: u64) -> Result<Self> {
        let mut bytes = vec![0u8; byte_len(len)];
        stream.seek(SeekFrom::Start(0))?;
        stream.read_exact(&mut bytes)?;

        debug!("Opened stream bitmap for {} clusters", len);
        Ok(StreamBitmap { stream, bytes, len })
    }

    /// Give back the underlying stream
    pub fn into_inner(self) -> S {
        self.stream
    }

    /// Cached on-disk bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn apply(&mut self, start: u64, length: u64, used: bool) -> Result<()> {
        let first = start / 8;
        let last = (start + length - 1) / 8;
        let mut span = self.bytes[first as usize..=last as usize].to_vec();

        for cluster in start..start + length {
            let byte = &mut span[(cluster / 8 - first) as usize];
            let bit = 1u8 << (cluster % 8);
            if used {
                *byte |= bit;
            } else {
                *byte &= !bit;
            }
        }

        self.stream.seek(SeekFrom::Start(first))?;
        self.stream.write_all(&span)?;
        self.stream.flush()?;

        self.bytes[first as usize..=last as usize].copy_from_slice(&span);
        Ok(())
    }
}

impl<S: Read + Write + Seek> ClusterBitmap for StreamBitmap<S> {
    fn len(&self) -> u64 {
        self.len
    }

    fn is_used(&self, cluster: u64) -> bool {
        debug_assert!(cluster < self.len, "cluster {} out of range", cluster);
        (self.bytes[(cluster / 8) as usize] >> (cluster % 8)) & 1 != 0
    }

    fn mark_used(&mut self, start: u64, length: u64) -> Result<()> {
        check_span(start, length, self.len)?;
        if length == 0 {
            return Ok(());
        }
        self.apply(start, length, true)
    }

    fn mark_free(&mut self, start: u64, length: u64) -> Result<()> {
        check_span(start, length, self.len)?;
        if length == 0 {
            return Ok(());
        }
        self.apply(start, length, false)
    }
}
