//! LZMA codec
//!
//! Thin wrapper over `lzma-rs` for the ScoreSaber payload. The codec is
//! treated as non-reentrant: only one compress or decompress call may run in
//! the process at a time, so every call takes [`CODEC_LOCK`] first. Callers
//! never need their own serialization.

use crate::error::{ReplayError, Result};
use std::io::Cursor;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Process-wide exclusion for both directions of the codec
static CODEC_LOCK: Mutex<()> = Mutex::new(());

/// Calls currently inside the locked region (never above 1)
static IN_FLIGHT: AtomicUsize = AtomicUsize::new(0);

/// Highest value `IN_FLIGHT` has reached since process start
static PEAK_IN_FLIGHT: AtomicUsize = AtomicUsize::new(0);

/// Decompress an LZMA-alone stream (5 property bytes, 8 size bytes, data)
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    with_codec(|| {
        let mut output = Vec::with_capacity(data.len() * 4);
        lzma_rs::lzma_decompress(&mut Cursor::new(data), &mut output)
            .map_err(|e| ReplayError::Decompress(e.to_string()))?;
        Ok(output)
    })
}

/// Compress `data` into an LZMA-alone stream
pub fn compress(data: &[u8]) -> Result<Vec<u8>> {
    with_codec(|| {
        let mut output = Vec::with_capacity(data.len() / 2 + 16);
        lzma_rs::lzma_compress(&mut Cursor::new(data), &mut output)?;
        Ok(output)
    })
}

/// Highest number of codec calls ever observed running at once
pub fn peak_concurrency() -> usize {
    PEAK_IN_FLIGHT.load(Ordering::SeqCst)
}

fn with_codec<T>(f: impl FnOnce() -> Result<T>) -> Result<T> {
    // The lock guards no data, so poisoning is harmless
    let _guard = CODEC_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

    let running = IN_FLIGHT.fetch_add(1, Ordering::SeqCst) + 1;
    PEAK_IN_FLIGHT.fetch_max(running, Ordering::SeqCst);
    let result = f();
    IN_FLIGHT.fetch_sub(1, Ordering::SeqCst);
    result
}
