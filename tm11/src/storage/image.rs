//! Tape images in the SIMH `.tap` format.
//!
//! Each record is stored as a 32-bit little-endian length `L`, then `L`
//! bytes of data padded to an even length, then `L` again.  A length
//! word of zero is a tape mark.  The value `0xFFFF_FFFF` marks the end
//! of the recorded medium.
//!
//! Positions on the tape are counted in 16-bit words from the load
//! point, so a record of `L` bytes occupies `2 + (L + 1) / 2 + 2` words.
use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{event, Level};

use unibus::Address;

use crate::io::{IoStatus, HEADER_BYTES, HEADER_WORDS};
use crate::memory::HostMemory;

/// The header value which marks the end of the recorded medium.
pub const END_OF_MEDIUM: u32 = 0xFFFF_FFFF;

/// The header value of a tape mark.
pub const TAPE_MARK: u32 = 0;

/// Headers at or above this value are not record lengths.  The
/// controller treats them as tape marks.
pub const MARKER_THRESHOLD: u32 = 0x8000_0000;

/// Number of tape words occupied by `len` bytes of record data.
pub fn payload_words(len: u32) -> u64 {
    (u64::from(len) + 1) / 2
}

#[derive(Debug)]
pub enum TapeImageError {
    Io {
        path: PathBuf,
        error: io::Error,
    },
    /// The image ends part of the way through a record.
    TruncatedRecord { position: u64, length: u32 },
    /// A record's trailing length word does not match its header.
    TrailerMismatch {
        position: u64,
        header: u32,
        trailer: u32,
    },
    /// A record is too long to describe in a 32-bit header.
    RecordTooLong { length: usize },
    /// Records must contain at least one byte; a zero length is a tape
    /// mark.
    EmptyRecord,
}

impl Display for TapeImageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            TapeImageError::Io { path, error } => {
                write!(f, "I/O error on tape image {}: {error}", path.display())
            }
            TapeImageError::TruncatedRecord { position, length } => write!(
                f,
                "tape image ends inside the {length}-byte record at word {position}"
            ),
            TapeImageError::TrailerMismatch {
                position,
                header,
                trailer,
            } => write!(
                f,
                "record at word {position} has header {header} but trailer {trailer}"
            ),
            TapeImageError::RecordTooLong { length } => {
                write!(f, "a record of {length} bytes is too long for a tape image")
            }
            TapeImageError::EmptyRecord => f.write_str("tape records cannot be empty"),
        }
    }
}

impl Error for TapeImageError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            TapeImageError::Io { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// One item found when walking a tape image from the load point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TapeEntry {
    Record { position: u64, length: u32 },
    TapeMark { position: u64 },
    EndOfMedium { position: u64 },
}

impl TapeEntry {
    /// The word position of the entry's header.
    pub fn position(&self) -> u64 {
        match self {
            TapeEntry::Record { position, .. }
            | TapeEntry::TapeMark { position }
            | TapeEntry::EndOfMedium { position } => *position,
        }
    }
}

/// The result of copying record data from tape into host memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transfer {
    pub status: IoStatus,
    /// Tape word position following the last byte read.
    pub position: u64,
    /// Host address following the last byte stored.
    pub address: Address,
    /// Bytes requested but not transferred.
    pub residual: u32,
}

#[derive(Clone, PartialEq, Eq, Default)]
pub struct TapeImage {
    bytes: Vec<u8>,
}

impl fmt::Debug for TapeImage {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        f.debug_struct("TapeImage")
            .field("len", &self.bytes.len())
            .finish_non_exhaustive()
    }
}

fn byte_offset(position: u64) -> Option<usize> {
    position
        .checked_mul(2)
        .and_then(|offset| usize::try_from(offset).ok())
}

impl TapeImage {
    pub fn from_bytes(bytes: Vec<u8>) -> TapeImage {
        TapeImage { bytes }
    }

    pub fn load(path: &Path) -> Result<TapeImage, TapeImageError> {
        match fs::read(path) {
            Ok(bytes) => {
                event!(
                    Level::DEBUG,
                    "loaded {} bytes of tape image from {}",
                    bytes.len(),
                    path.display()
                );
                Ok(TapeImage::from_bytes(bytes))
            }
            Err(error) => Err(TapeImageError::Io {
                path: path.to_owned(),
                error,
            }),
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), TapeImageError> {
        fs::write(path, &self.bytes).map_err(|error| TapeImageError::Io {
            path: path.to_owned(),
            error,
        })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    fn word32_at(&self, offset: usize) -> Option<u32> {
        let end = offset.checked_add(HEADER_BYTES as usize)?;
        let b = self.bytes.get(offset..end)?;
        Some(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// The 32-bit header at word `position`.  Beyond the end of the
    /// image, this is the end-of-medium marker.
    pub fn header_at(&self, position: u64) -> u32 {
        byte_offset(position)
            .and_then(|offset| self.word32_at(offset))
            .unwrap_or(END_OF_MEDIUM)
    }

    /// Copy up to `length` bytes of tape, starting at word `position`,
    /// into `memory` starting at `address`.  The copy stops early at
    /// the end of the image (a data error) or at non-existent memory.
    pub fn transfer(
        &self,
        position: u64,
        address: Address,
        length: u32,
        memory: &mut dyn HostMemory,
    ) -> Transfer {
        let start = byte_offset(position);
        let mut status = IoStatus::Ok;
        let mut done: u32 = 0;
        let mut target = address;
        while done < length {
            let byte = start
                .and_then(|s| s.checked_add(done as usize))
                .and_then(|offset| self.bytes.get(offset));
            let Some(byte) = byte else {
                event!(
                    Level::WARN,
                    "tape image ends after {done} of {length} bytes starting at word {position}"
                );
                status = IoStatus::DataError;
                break;
            };
            if let Err(e) = memory.write_byte(target, *byte) {
                event!(Level::WARN, "DMA failed: {e}");
                status = IoStatus::NonExistentMemory;
                break;
            }
            done += 1;
            target = target.wrapping_add(1);
        }
        Transfer {
            status,
            position: position + payload_words(done),
            address: target,
            residual: length - done,
        }
    }

    /// Walk the image from the load point, listing what is on it.  The
    /// walk stops at the end-of-medium marker or at the end of the
    /// image, whichever comes first.
    pub fn entries(&self) -> Result<Vec<TapeEntry>, TapeImageError> {
        let mut result = Vec::new();
        let mut position: u64 = 0;
        loop {
            let Some(offset) = byte_offset(position) else {
                break;
            };
            if offset >= self.bytes.len() {
                break;
            }
            match self.word32_at(offset) {
                None | Some(END_OF_MEDIUM) => {
                    result.push(TapeEntry::EndOfMedium { position });
                    break;
                }
                Some(header) if header == TAPE_MARK || header >= MARKER_THRESHOLD => {
                    result.push(TapeEntry::TapeMark { position });
                    position += HEADER_WORDS;
                }
                Some(length) => {
                    let trailer_position = position + HEADER_WORDS + payload_words(length);
                    let trailer = byte_offset(trailer_position)
                        .and_then(|offset| self.word32_at(offset));
                    match trailer {
                        None => {
                            return Err(TapeImageError::TruncatedRecord { position, length });
                        }
                        Some(trailer) if trailer != length => {
                            return Err(TapeImageError::TrailerMismatch {
                                position,
                                header: length,
                                trailer,
                            });
                        }
                        Some(_) => {
                            result.push(TapeEntry::Record { position, length });
                            position = trailer_position + HEADER_WORDS;
                        }
                    }
                }
            }
        }
        Ok(result)
    }

    /// The data of the record whose header is at word `position`.
    pub fn record_data(&self, position: u64) -> Option<&[u8]> {
        let length = self.header_at(position);
        if length == TAPE_MARK || length >= MARKER_THRESHOLD {
            return None;
        }
        let start = byte_offset(position + HEADER_WORDS)?;
        self.bytes.get(start..start.checked_add(length as usize)?)
    }
}

/// Assembles a tape image in memory.
///
/// # Examples
///
/// ```
/// use tm11::TapeImageBuilder;
///
/// let image = TapeImageBuilder::new()
///     .record(b"HELLO")
///     .expect("short record")
///     .tape_mark()
///     .build();
/// assert_eq!(image.len(), 4 + 6 + 4 + 4);
/// ```
#[derive(Debug, Default)]
pub struct TapeImageBuilder {
    bytes: Vec<u8>,
}

impl TapeImageBuilder {
    pub fn new() -> TapeImageBuilder {
        TapeImageBuilder::default()
    }

    pub fn record(mut self, data: &[u8]) -> Result<TapeImageBuilder, TapeImageError> {
        if data.is_empty() {
            return Err(TapeImageError::EmptyRecord);
        }
        let length = match u32::try_from(data.len()) {
            Ok(n) if n < MARKER_THRESHOLD => n,
            _ => {
                return Err(TapeImageError::RecordTooLong { length: data.len() });
            }
        };
        self.bytes.extend_from_slice(&length.to_le_bytes());
        self.bytes.extend_from_slice(data);
        if data.len() % 2 != 0 {
            self.bytes.push(0);
        }
        self.bytes.extend_from_slice(&length.to_le_bytes());
        Ok(self)
    }

    /// Append the contents of a file, split into records of at most
    /// `block_size` bytes, followed by a tape mark.
    pub fn file(
        mut self,
        data: &[u8],
        block_size: usize,
    ) -> Result<TapeImageBuilder, TapeImageError> {
        for block in data.chunks(block_size.max(1)) {
            self = self.record(block)?;
        }
        Ok(self.tape_mark())
    }

    pub fn tape_mark(mut self) -> TapeImageBuilder {
        self.bytes.extend_from_slice(&TAPE_MARK.to_le_bytes());
        self
    }

    pub fn end_of_medium(mut self) -> TapeImageBuilder {
        self.bytes.extend_from_slice(&END_OF_MEDIUM.to_le_bytes());
        self
    }

    pub fn build(self) -> TapeImage {
        TapeImage::from_bytes(self.bytes)
    }
}
