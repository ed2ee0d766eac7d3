//! Binary replay reader
//!
//! Cursor over an in-memory replay buffer. Every read that runs past the end
//! of the buffer fails with a format error naming the offset, so decoders can
//! propagate with `?` and still report where the file was cut.

use super::MAX_PLAUSIBLE_STRING_LEN;
use crate::error::{ReplayError, Result};
use crate::model::Transform;
use byteorder::{LittleEndian, ReadBytesExt};
use glam::{Quat, Vec3};
use std::io::{self, Cursor, Read};

/// Reader for little-endian replay data
pub struct ReplayReader<'a> {
    cursor: Cursor<&'a [u8]>,
}

impl<'a> ReplayReader<'a> {
    /// Create a reader positioned at the start of `bytes`
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            cursor: Cursor::new(bytes),
        }
    }

    fn buffer(&self) -> &'a [u8] {
        *self.cursor.get_ref()
    }

    /// Current byte offset
    pub fn position(&self) -> usize {
        self.cursor.position() as usize
    }

    /// Total buffer length
    pub fn len(&self) -> usize {
        self.buffer().len()
    }

    /// Whether the buffer is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes left after the cursor
    pub fn remaining(&self) -> usize {
        self.len().saturating_sub(self.position())
    }

    /// Whether the cursor sits at the end of the buffer
    pub fn is_eof(&self) -> bool {
        self.remaining() == 0
    }

    /// Move to an absolute offset
    ///
    /// Offsets past the end of the buffer are rejected rather than clamped.
    pub fn seek(&mut self, offset: usize) -> Result<()> {
        if offset > self.len() {
            return Err(ReplayError::format(format!(
                "seek to offset {} outside buffer of {} bytes",
                offset,
                self.len()
            )));
        }
        self.cursor.set_position(offset as u64);
        Ok(())
    }

    /// Skip `count` bytes
    pub fn skip(&mut self, count: usize) -> Result<()> {
        let target = self.position() + count;
        if target > self.len() {
            return Err(self.eof_error());
        }
        self.cursor.set_position(target as u64);
        Ok(())
    }

    /// Look at the next bytes without consuming them
    pub fn peek(&self, count: usize) -> Option<&'a [u8]> {
        let start = self.position();
        self.buffer().get(start..start + count)
    }

    /// Look at the next `i32` without consuming it
    pub fn peek_i32(&self) -> Option<i32> {
        self.peek(4)
            .map(|b| i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        let start = self.position();
        let value = self.cursor.read_u8();
        self.map_eof(start, value)
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        let start = self.position();
        let value = self.cursor.read_i32::<LittleEndian>();
        self.map_eof(start, value)
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        let start = self.position();
        let value = self.cursor.read_i64::<LittleEndian>();
        self.map_eof(start, value)
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        let start = self.position();
        let value = self.cursor.read_f32::<LittleEndian>();
        self.map_eof(start, value)
    }

    /// Read an `i32` element count, rejecting negative values
    pub fn read_count(&mut self, what: &str) -> Result<usize> {
        let count = self.read_i32()?;
        if count < 0 {
            return Err(ReplayError::format(format!(
                "negative {} count {} at offset {}",
                what,
                count,
                self.position() - 4
            )));
        }
        Ok(count as usize)
    }

    /// Read exactly `count` raw bytes
    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8]> {
        let start = self.position();
        let slice = self
            .buffer()
            .get(start..start + count)
            .ok_or_else(|| self.eof_error())?;
        self.cursor.set_position((start + count) as u64);
        Ok(slice)
    }

    /// Read the rest of the buffer
    pub fn read_to_end(&mut self) -> Vec<u8> {
        let mut rest = Vec::with_capacity(self.remaining());
        // Reading from an in-memory cursor cannot fail
        let _ = self.cursor.read_to_end(&mut rest);
        rest
    }

    /// Read a length-prefixed string
    pub fn read_string(&mut self) -> Result<String> {
        let offset = self.position();
        let len = self.read_i32()?;
        if len < 0 || len as usize > self.remaining() {
            return Err(ReplayError::format(format!(
                "corrupt length-prefixed string at offset {} (length {})",
                offset, len
            )));
        }
        let bytes = self.read_bytes(len as usize)?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    /// Read a length-prefixed string written by an encoder that counted
    /// UTF-16 code units instead of bytes
    ///
    /// The declared length can be shorter than the real byte count. After
    /// reading the declared bytes, the reader keeps consuming one byte at a
    /// time until the next four bytes look like a plausible length prefix of
    /// the following string field (a length of at most
    /// [`MAX_PLAUSIBLE_STRING_LEN`] followed by printable bytes).
    pub fn read_string_tolerant(&mut self) -> Result<String> {
        let offset = self.position();
        let len = self.read_i32()?;
        if len < 0 || len as usize > self.remaining() {
            return Err(ReplayError::format(format!(
                "corrupt length-prefixed string at offset {} (length {})",
                offset, len
            )));
        }
        let start = self.position();
        self.skip(len as usize)?;
        while self.remaining() >= 4 && !self.at_plausible_string() {
            self.skip(1)?;
        }
        let end = self.position();
        let bytes = &self.buffer()[start..end];
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    /// Read an `i32` count followed by that many strings
    pub fn read_string_list(&mut self) -> Result<Vec<String>> {
        let count = self.read_count("string")?;
        let mut strings = Vec::with_capacity(count.min(64));
        for _ in 0..count {
            strings.push(self.read_string()?);
        }
        Ok(strings)
    }

    pub fn read_vec3(&mut self) -> Result<Vec3> {
        let x = self.read_f32()?;
        let y = self.read_f32()?;
        let z = self.read_f32()?;
        Ok(Vec3::new(x, y, z))
    }

    /// Read a quaternion stored as x, y, z, w
    pub fn read_quat(&mut self) -> Result<Quat> {
        let x = self.read_f32()?;
        let y = self.read_f32()?;
        let z = self.read_f32()?;
        let w = self.read_f32()?;
        Ok(Quat::from_xyzw(x, y, z, w))
    }

    /// Read a position followed by a quaternion rotation
    pub fn read_transform(&mut self) -> Result<Transform> {
        let position = self.read_vec3()?;
        let rotation = self.read_quat()?;
        Ok(Transform { position, rotation })
    }

    /// A small non-negative length followed by that many printable bytes
    fn at_plausible_string(&self) -> bool {
        let Some(len) = self.peek_i32() else {
            return false;
        };
        if !(0..=MAX_PLAUSIBLE_STRING_LEN).contains(&len) {
            return false;
        }
        let start = self.position() + 4;
        self.buffer()
            .get(start..start + len as usize)
            .is_some_and(|text| text.iter().all(|&b| b >= 0x20 && b != 0x7f))
    }

    fn eof_error(&self) -> ReplayError {
        Self::eof_at(self.position())
    }

    fn eof_at(offset: usize) -> ReplayError {
        ReplayError::format(format!("unexpected end of file at offset {}", offset))
    }

    /// A short read leaves the cursor at the end of the buffer; rewind it to
    /// the start of the field so the error names where the field began
    fn map_eof<T>(&mut self, start: usize, value: io::Result<T>) -> Result<T> {
        value.map_err(|e| {
            self.cursor.set_position(start as u64);
            match e.kind() {
                io::ErrorKind::UnexpectedEof => Self::eof_at(start),
                _ => ReplayError::Io(e),
            }
        })
    }
}
