// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Durable per-stream audio sinks: an append-only raw PCM file (the canonical
//! bytes) mirrored into a companion WAV container, plus the snapshot
//! read-consistency barrier used by the live processor and pipeline driver.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, WriteBytesExt};

use crate::error::{CoreError, Result};

const WAV_HEADER_LEN: u64 = 44;

/// Writes a 44-byte canonical PCM WAV header for `channels`/`sample_rate`,
/// with `data_len` bytes of payload following (0 if not yet known; rewritten
/// in place at close time).
fn write_wav_header<W: Write>(w: &mut W, sample_rate: u32, channels: u16, data_len: u32) -> io::Result<()> {
    let bits_per_sample: u16 = 16;
    let block_align = channels * (bits_per_sample / 8);
    let byte_rate = sample_rate * u32::from(block_align);

    w.write_all(b"RIFF")?;
    w.write_u32::<LittleEndian>(36 + data_len)?;
    w.write_all(b"WAVE")?;
    w.write_all(b"fmt ")?;
    w.write_u32::<LittleEndian>(16)?;
    w.write_u16::<LittleEndian>(1)?; // PCM
    w.write_u16::<LittleEndian>(channels)?;
    w.write_u32::<LittleEndian>(sample_rate)?;
    w.write_u32::<LittleEndian>(byte_rate)?;
    w.write_u16::<LittleEndian>(block_align)?;
    w.write_u16::<LittleEndian>(bits_per_sample)?;
    w.write_all(b"data")?;
    w.write_u32::<LittleEndian>(data_len)?;
    Ok(())
}

/// Bytes per sample frame (all channels), for 16-bit PCM.
#[must_use]
pub fn bytes_per_frame(channels: u32) -> u64 {
    2 * u64::from(channels)
}

/// An immutable, read-consistent view of a stream's durable bytes, taken
/// under the writer's lock. Readers must never read past `size_bytes`.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub raw_path: PathBuf,
    pub sample_rate: u32,
    pub channels: u32,
    pub size_bytes: u64,
}

impl Snapshot {
    /// Duration, in seconds, of the bytes covered by this snapshot.
    #[must_use]
    pub fn duration_seconds(&self) -> f64 {
        let bpf = bytes_per_frame(self.channels) as f64;
        let sr = f64::from(self.sample_rate);
        if bpf == 0.0 || sr == 0.0 {
            return 0.0;
        }
        (self.size_bytes as f64 / bpf) / sr
    }

    /// Size truncated down to a whole-frame multiple.
    #[must_use]
    pub fn frame_aligned_size(&self) -> u64 {
        let bpf = bytes_per_frame(self.channels);
        self.size_bytes - (self.size_bytes % bpf)
    }
}

/// A durable raw+container sink pair for one stream.
pub struct StreamWriter {
    raw_path: PathBuf,
    container_path: PathBuf,
    raw_file: File,
    container_file: File,
    sample_rate: u32,
    channels: u32,
    last_sample_index: u64,
    bytes_written: u64,
}

impl StreamWriter {
    /// Creates the raw file and a WAV container (zero-length `data` chunk) at
    /// `stem.pcm` / `stem.wav`.
    pub fn open(stem: &Path, sample_rate: u32, channels: u32) -> Result<Self> {
        let raw_path = stem.with_extension("pcm");
        let container_path = stem.with_extension("wav");

        let raw_file = OpenOptions::new().create(true).write(true).truncate(true).open(&raw_path)?;
        let mut container_file =
            OpenOptions::new().create(true).write(true).truncate(true).open(&container_path)?;
        write_wav_header(
            &mut container_file,
            sample_rate,
            u16::try_from(channels).unwrap_or(u16::MAX),
            0,
        )?;

        Ok(Self {
            raw_path,
            container_path,
            raw_file,
            container_file,
            sample_rate,
            channels,
            last_sample_index: 0,
            bytes_written: 0,
        })
    }

    #[must_use]
    pub fn raw_path(&self) -> &Path {
        &self.raw_path
    }

    #[must_use]
    pub fn container_path(&self) -> &Path {
        &self.container_path
    }

    #[must_use]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    #[must_use]
    pub fn channels(&self) -> u32 {
        self.channels
    }

    #[must_use]
    pub fn last_sample_index(&self) -> u64 {
        self.last_sample_index
    }

    #[must_use]
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Appends identical bytes to both sinks, flushing the raw sink so the
    /// bytes are immediately visible to a concurrent [`Self::snapshot`].
    ///
    /// `frames` must already be a whole-frame multiple; the PCM aligner
    /// enforces this before calling.
    pub fn append_frames(&mut self, bytes: &[u8]) -> Result<()> {
        if bytes.is_empty() {
            return Ok(());
        }
        self.raw_file.write_all(bytes)?;
        self.raw_file.flush()?;
        self.container_file.write_all(bytes)?;

        let bpf = bytes_per_frame(self.channels);
        self.last_sample_index += bytes.len() as u64 / bpf;
        self.bytes_written += bytes.len() as u64;
        Ok(())
    }

    /// Current read-consistency snapshot.
    pub fn snapshot(&mut self) -> Result<Snapshot> {
        self.raw_file.flush()?;
        let size_bytes = self.raw_file.metadata()?.len();
        Ok(Snapshot {
            raw_path: self.raw_path.clone(),
            sample_rate: self.sample_rate,
            channels: self.channels,
            size_bytes,
        })
    }

    /// Finalises the WAV header (RIFF size + data chunk size) and closes both sinks.
    pub fn close(mut self) -> Result<()> {
        self.raw_file.flush()?;
        let data_len = self.bytes_written;
        self.container_file.flush()?;
        self.container_file.seek(SeekFrom::Start(0))?;
        write_wav_header(
            &mut self.container_file,
            self.sample_rate,
            u16::try_from(self.channels).unwrap_or(u16::MAX),
            u32::try_from(data_len).unwrap_or(u32::MAX),
        )?;
        self.container_file.flush()?;
        Ok(())
    }
}

/// Materialises a standalone WAV file wrapping exactly the frame-aligned
/// bytes `[0, snapshot.frame_aligned_size())` of the snapshot's raw file,
/// written under `dest_dir`. Used by the pipeline driver to hand the
/// external normaliser/ASR/diariser a well-formed container file without
/// disturbing the still-growing raw file.
pub fn materialize_wav(snapshot: &Snapshot, dest_dir: &Path) -> Result<PathBuf> {
    let data_len = snapshot.frame_aligned_size();
    let dest_path = dest_dir.join(format!(
        "{}-{:x}.wav",
        snapshot
            .raw_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("stream"),
        data_len
    ));

    let mut dest = OpenOptions::new().create(true).write(true).truncate(true).open(&dest_path)?;
    write_wav_header(
        &mut dest,
        snapshot.sample_rate,
        u16::try_from(snapshot.channels).unwrap_or(u16::MAX),
        u32::try_from(data_len).unwrap_or(u32::MAX),
    )
    .map_err(CoreError::Io)?;

    let mut src = File::open(&snapshot.raw_path)?;
    let mut remaining = data_len;
    let mut buf = vec![0u8; 1024 * 1024];
    while remaining > 0 {
        let want = buf.len().min(remaining as usize);
        let read = io::Read::read(&mut src, &mut buf[..want])?;
        if read == 0 {
            break;
        }
        dest.write_all(&buf[..read])?;
        remaining -= read as u64;
    }
    dest.flush()?;
    Ok(dest_path)
}

/// Deletes a stream's raw and/or container files, per retention flags.
pub fn delete_stream_files(raw_path: &Path, container_path: &Path, keep_raw: bool, keep_container: bool) {
    if !keep_raw {
        let _ = fs::remove_file(raw_path);
    }
    if !keep_container {
        let _ = fs::remove_file(container_path);
    }
}
