//! Capture files: recorded message streams.
//!
//! A capture is a concatenation of frames, each a little-endian `u32`
//! payload length followed by that many payload bytes:
//!
//! ```text
//! +---------+-----------------+---------+-----------------+--
//! | len: u32| payload (len B) | len: u32| payload (len B) | ..
//! +---------+-----------------+---------+-----------------+--
//! ```

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use gridmon_monitor::{MessageSource, Poll};
use log::{debug, warn};
use memmap2::Mmap;

use crate::{Error, Result};

/// Size of the frame length prefix in bytes.
const FRAME_HEADER_SIZE: usize = 4;

/// Location of one frame's payload within a capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    /// Byte offset of the payload (after the length prefix).
    pub offset: usize,
    /// Payload length in bytes.
    pub len: usize,
}

impl Frame {
    /// Returns the payload bytes of this frame.
    #[must_use]
    pub fn payload<'a>(&self, data: &'a [u8]) -> &'a [u8] {
        &data[self.offset..self.offset + self.len]
    }
}

/// Result of scanning a capture for frames.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameScan {
    /// Complete frames in file order.
    pub frames: Vec<Frame>,
    /// Bytes after the last complete frame.
    pub trailing_bytes: usize,
}

impl FrameScan {
    /// Returns true if the capture ends in a partial frame.
    #[must_use]
    pub fn is_truncated(&self) -> bool {
        self.trailing_bytes > 0
    }
}

/// Finds the complete frames in `data`.
///
/// Stops at the first frame whose header or payload runs past the end of
/// the data; the remaining bytes are reported as `trailing_bytes`.
#[must_use]
pub fn scan_frames(data: &[u8]) -> FrameScan {
    let mut frames = Vec::new();
    let mut pos = 0;

    while let Some(&[b0, b1, b2, b3]) = data.get(pos..pos + FRAME_HEADER_SIZE) {
        let len = u32::from_le_bytes([b0, b1, b2, b3]) as usize;
        let offset = pos + FRAME_HEADER_SIZE;

        if data.len() - offset < len {
            break;
        }
        frames.push(Frame { offset, len });
        pos = offset + len;
    }

    FrameScan {
        frames,
        trailing_bytes: data.len() - pos,
    }
}

/// A memory-mapped capture file.
pub struct CaptureFile {
    mmap: Arc<Mmap>,
    path: PathBuf,
}

impl CaptureFile {
    /// Opens a capture for memory-mapped reading.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or memory-mapped.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(&path)?;
        // SAFETY: The file is opened read-only and we assume it is not modified concurrently.
        // This is the standard safety contract for memory mapping.
        #[allow(unsafe_code)]
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(Self {
            mmap: Arc::new(mmap),
            path: path.as_ref().to_path_buf(),
        })
    }

    /// Returns the file contents as a byte slice.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.mmap[..]
    }

    /// Returns the file size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.mmap.len()
    }

    /// Returns true if the file is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mmap.is_empty()
    }

    /// Path the capture was opened from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Scans the capture for frames.
    #[must_use]
    pub fn scan(&self) -> FrameScan {
        scan_frames(self.as_bytes())
    }

    /// Scans the capture and rejects a partial trailing frame.
    ///
    /// # Errors
    /// Returns [`Error::InvalidFormat`] if the file ends mid-frame.
    pub fn scan_strict(&self) -> Result<FrameScan> {
        let scan = self.scan();
        if scan.is_truncated() {
            return Err(Error::InvalidFormat(format!(
                "{} trailing bytes after {} frames (file: {})",
                scan.trailing_bytes,
                scan.frames.len(),
                self.path.display()
            )));
        }
        Ok(scan)
    }

    /// Creates a replay source over the capture's frames.
    ///
    /// A partial trailing frame is logged and skipped.
    #[must_use]
    pub fn replay(&self) -> ReplaySource {
        let scan = self.scan();
        if scan.is_truncated() {
            warn!(
                "{}: ignoring {} trailing bytes after {} frames",
                self.path.display(),
                scan.trailing_bytes,
                scan.frames.len()
            );
        }
        ReplaySource {
            mmap: Arc::clone(&self.mmap),
            frames: scan.frames,
            cursor: 0,
            max_message_bytes: usize::MAX,
            interval: None,
            next_due: None,
            skipped_oversized: 0,
        }
    }
}

/// Replays the frames of a [`CaptureFile`] as messages.
///
/// Owns a handle to the mapping, so it outlives the `CaptureFile` it came
/// from. Returns [`Poll::Closed`] after the last frame.
pub struct ReplaySource {
    mmap: Arc<Mmap>,
    frames: Vec<Frame>,
    cursor: usize,
    max_message_bytes: usize,
    interval: Option<Duration>,
    next_due: Option<Instant>,
    skipped_oversized: u64,
}

impl ReplaySource {
    /// Skips frames larger than `bytes`.
    #[must_use]
    pub fn with_max_message_bytes(mut self, bytes: usize) -> Self {
        self.max_message_bytes = bytes;
        self
    }

    /// Paces delivery to at most one message per `interval`.
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval).filter(|d| !d.is_zero());
        self
    }

    /// Frames not yet delivered or skipped.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.frames.len() - self.cursor
    }

    /// Frames skipped for exceeding the size limit.
    #[must_use]
    pub fn skipped_oversized(&self) -> u64 {
        self.skipped_oversized
    }

    /// Sleeps until the next message is due, for at most `timeout`.
    ///
    /// Returns true if the message may be delivered now.
    fn wait_until_due(&mut self, timeout: Duration) -> bool {
        let Some(due) = self.next_due else {
            return true;
        };
        let now = Instant::now();
        if now >= due {
            return true;
        }
        let wait = due - now;
        thread::sleep(wait.min(timeout));
        wait <= timeout
    }

    fn next_frame(&mut self) -> Option<Frame> {
        while let Some(&frame) = self.frames.get(self.cursor) {
            self.cursor += 1;
            if frame.len > self.max_message_bytes {
                warn!(
                    "skipping frame {} ({} bytes exceeds limit of {})",
                    self.cursor - 1,
                    frame.len,
                    self.max_message_bytes
                );
                self.skipped_oversized += 1;
                continue;
            }
            return Some(frame);
        }
        None
    }
}

impl MessageSource for ReplaySource {
    fn poll(&mut self, timeout: Duration) -> Poll {
        if self.remaining() == 0 {
            return Poll::Closed;
        }
        if !self.wait_until_due(timeout) {
            return Poll::Empty;
        }
        let Some(frame) = self.next_frame() else {
            return Poll::Closed;
        };

        self.next_due = self.interval.map(|interval| Instant::now() + interval);
        debug!("replaying frame {} ({} bytes)", self.cursor - 1, frame.len);
        Poll::Message(frame.payload(&self.mmap).to_vec())
    }
}

/// Writes messages to a capture file.
pub struct CaptureWriter {
    writer: BufWriter<File>,
    messages: u64,
}

impl CaptureWriter {
    /// Creates a new capture file, truncating any existing one.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
            messages: 0,
        })
    }

    /// Appends one message as a frame.
    ///
    /// # Errors
    /// Returns [`Error::InvalidFormat`] if the payload is larger than a
    /// frame can describe, or an I/O error.
    pub fn write_message(&mut self, payload: &[u8]) -> Result<()> {
        let len = u32::try_from(payload.len()).map_err(|_| {
            Error::InvalidFormat(format!(
                "message of {} bytes exceeds the frame size limit",
                payload.len()
            ))
        })?;
        self.writer.write_all(&len.to_le_bytes())?;
        self.writer.write_all(payload)?;
        self.messages += 1;
        Ok(())
    }

    /// Messages written so far.
    #[must_use]
    pub fn messages_written(&self) -> u64 {
        self.messages
    }

    /// Flushes the writer.
    ///
    /// # Errors
    /// Returns an error if the underlying file cannot be flushed.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn frame_bytes(payloads: &[&[u8]]) -> Vec<u8> {
        let mut data = Vec::new();
        for payload in payloads {
            let len = u32::try_from(payload.len()).unwrap();
            data.extend_from_slice(&len.to_le_bytes());
            data.extend_from_slice(payload);
        }
        data
    }

    #[test]
    fn test_scan_frames() {
        let data = frame_bytes(&[&[1, 2, 3], &[], &[4]]);
        let scan = scan_frames(&data);

        assert_eq!(scan.frames.len(), 3);
        assert!(!scan.is_truncated());
        assert_eq!(scan.frames[0], Frame { offset: 4, len: 3 });
        assert_eq!(scan.frames[1], Frame { offset: 11, len: 0 });
        assert_eq!(scan.frames[2].payload(&data), &[4]);
    }

    #[test]
    fn test_scan_partial_payload() {
        let mut data = frame_bytes(&[&[1, 2]]);
        data.extend_from_slice(&10u32.to_le_bytes());
        data.extend_from_slice(&[0; 5]);

        let scan = scan_frames(&data);
        assert_eq!(scan.frames.len(), 1);
        assert_eq!(scan.trailing_bytes, 9);
    }

    #[test]
    fn test_scan_partial_header() {
        let mut data = frame_bytes(&[&[7]]);
        data.extend_from_slice(&[1, 0]);
        let scan = scan_frames(&data);
        assert_eq!(scan.frames.len(), 1);
        assert_eq!(scan.trailing_bytes, 2);
    }

    #[test]
    fn test_scan_empty() {
        let scan = scan_frames(&[]);
        assert!(scan.frames.is_empty());
        assert!(!scan.is_truncated());
    }

    #[test]
    fn test_writer_then_replay() {
        let file = NamedTempFile::new().unwrap();
        let mut writer = CaptureWriter::create(file.path()).unwrap();
        writer.write_message(&[1, 2, 3]).unwrap();
        writer.write_message(&[4, 5]).unwrap();
        writer.flush().unwrap();
        assert_eq!(writer.messages_written(), 2);

        let capture = CaptureFile::open(file.path()).unwrap();
        assert_eq!(capture.len(), 4 + 3 + 4 + 2);
        let mut source = capture.replay();
        drop(capture);

        let timeout = Duration::from_millis(1);
        assert_eq!(source.remaining(), 2);
        assert_eq!(source.poll(timeout), Poll::Message(vec![1, 2, 3]));
        assert_eq!(source.poll(timeout), Poll::Message(vec![4, 5]));
        assert_eq!(source.poll(timeout), Poll::Closed);
    }

    #[test]
    fn test_replay_skips_oversized() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&frame_bytes(&[&[0; 16], &[1; 4], &[2; 32]]))
            .unwrap();
        file.flush().unwrap();

        let capture = CaptureFile::open(file.path()).unwrap();
        let mut source = capture.replay().with_max_message_bytes(16);
        let timeout = Duration::from_millis(1);

        assert_eq!(source.poll(timeout), Poll::Message(vec![0; 16]));
        assert_eq!(source.poll(timeout), Poll::Message(vec![1; 4]));
        assert_eq!(source.poll(timeout), Poll::Closed);
        assert_eq!(source.skipped_oversized(), 1);
    }

    #[test]
    fn test_replay_pacing_reports_empty() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&frame_bytes(&[&[1], &[2]])).unwrap();
        file.flush().unwrap();

        let capture = CaptureFile::open(file.path()).unwrap();
        let mut source = capture.replay().with_interval(Duration::from_secs(60));

        assert_eq!(source.poll(Duration::from_millis(1)), Poll::Message(vec![1]));
        assert_eq!(source.poll(Duration::from_millis(1)), Poll::Empty);
        assert_eq!(source.remaining(), 1);
    }

    #[test]
    fn test_strict_scan_rejects_trailing_bytes() {
        let mut file = NamedTempFile::new().unwrap();
        let mut data = frame_bytes(&[&[1]]);
        data.push(0);
        file.write_all(&data).unwrap();
        file.flush().unwrap();

        let capture = CaptureFile::open(file.path()).unwrap();
        assert!(capture.scan_strict().is_err());
        assert_eq!(capture.replay().remaining(), 1);
    }

    #[test]
    fn test_empty_capture() {
        let file = NamedTempFile::new().unwrap();
        let capture = CaptureFile::open(file.path()).unwrap();
        assert!(capture.is_empty());
        assert_eq!(capture.replay().poll(Duration::from_millis(1)), Poll::Closed);
    }
}
