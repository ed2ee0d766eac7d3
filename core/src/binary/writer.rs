//! Binary replay writer
//!
//! Mirror of [`ReplayReader`](super::ReplayReader), used by the encoders.

use crate::model::Transform;
use byteorder::{LittleEndian, WriteBytesExt};
use glam::{Quat, Vec3};
use std::io::{self, Write};

/// Writer for little-endian replay data
pub struct ReplayWriter<W: Write> {
    writer: W,
}

impl<W: Write> ReplayWriter<W> {
    /// Create a new writer
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn write_u8(&mut self, value: u8) -> io::Result<()> {
        self.writer.write_u8(value)
    }

    pub fn write_bool(&mut self, value: bool) -> io::Result<()> {
        self.writer.write_u8(value as u8)
    }

    pub fn write_i32(&mut self, value: i32) -> io::Result<()> {
        self.writer.write_i32::<LittleEndian>(value)
    }

    pub fn write_i64(&mut self, value: i64) -> io::Result<()> {
        self.writer.write_i64::<LittleEndian>(value)
    }

    pub fn write_f32(&mut self, value: f32) -> io::Result<()> {
        self.writer.write_f32::<LittleEndian>(value)
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.writer.write_all(bytes)
    }

    /// Write an `i32` byte length followed by the UTF-8 bytes
    pub fn write_string(&mut self, value: &str) -> io::Result<()> {
        self.write_i32(value.len() as i32)?;
        self.writer.write_all(value.as_bytes())
    }

    pub fn write_string_list(&mut self, values: &[String]) -> io::Result<()> {
        self.write_i32(values.len() as i32)?;
        for value in values {
            self.write_string(value)?;
        }
        Ok(())
    }

    pub fn write_vec3(&mut self, value: Vec3) -> io::Result<()> {
        self.write_f32(value.x)?;
        self.write_f32(value.y)?;
        self.write_f32(value.z)
    }

    pub fn write_quat(&mut self, value: Quat) -> io::Result<()> {
        self.write_f32(value.x)?;
        self.write_f32(value.y)?;
        self.write_f32(value.z)?;
        self.write_f32(value.w)
    }

    pub fn write_transform(&mut self, transform: &Transform) -> io::Result<()> {
        self.write_vec3(transform.position)?;
        self.write_quat(transform.rotation)
    }

    /// Consume the writer and return the inner sink
    pub fn into_inner(self) -> W {
        self.writer
    }
}
