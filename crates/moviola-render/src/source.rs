//! Source reader and cache interfaces.
//!
//! File-format decoding lives behind [`SourceReader`]; the render pipeline
//! only ever seeks and reads forward. Reverse playback is achieved by the
//! importer seeking to `position - len` and reversing the result.

use crate::error::{RenderError, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Forward-only sample source for one asset.
pub trait SourceReader: Send {
    /// Native sample rate of the asset.
    fn sample_rate(&self) -> u32;

    /// Seek to an absolute sample position.
    fn set_position(&mut self, position: i64);

    /// Select the channel subsequent reads return.
    fn set_channel(&mut self, channel: usize);

    /// Read `buffer.len()` samples at the current position, advancing it.
    /// Reads past the end of the asset zero-fill the remainder.
    fn read_samples(&mut self, buffer: &mut [f64]) -> Result<()>;
}

/// Checkout-based reader cache.
///
/// At most one concurrent checkout per asset id; exactly one `check_out`
/// must be matched by one `check_in` per import. `age` is an LRU bookkeeping
/// hook called once per import.
pub trait SourceCache: Send + Sync {
    fn check_out(&self, id: &str) -> Option<Box<dyn SourceReader>>;
    fn check_in(&self, id: &str, reader: Box<dyn SourceReader>);
    fn age(&self);
}

/// Shared handle to a cache, cloned into nested engines.
pub type SharedCache = Arc<dyn SourceCache>;

/// In-memory reader over a fixed set of channel buffers.
///
/// Test double for decoded audio files; also usable for small generated
/// assets.
pub struct MemoryReader {
    sample_rate: u32,
    channels: Vec<Vec<f64>>,
    position: i64,
    channel: usize,
}

impl MemoryReader {
    pub fn new(sample_rate: u32, channels: Vec<Vec<f64>>) -> Self {
        Self {
            sample_rate,
            channels,
            position: 0,
            channel: 0,
        }
    }

    /// Single-channel reader over generated samples.
    pub fn mono(sample_rate: u32, samples: Vec<f64>) -> Self {
        Self::new(sample_rate, vec![samples])
    }
}

impl SourceReader for MemoryReader {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn set_position(&mut self, position: i64) {
        self.position = position;
    }

    fn set_channel(&mut self, channel: usize) {
        self.channel = channel;
    }

    fn read_samples(&mut self, buffer: &mut [f64]) -> Result<()> {
        let data = self
            .channels
            .get(self.channel)
            .ok_or_else(|| RenderError::SourceRead(format!("channel {}", self.channel)))?;
        for (i, out) in buffer.iter_mut().enumerate() {
            let pos = self.position + i as i64;
            *out = if pos >= 0 && (pos as usize) < data.len() {
                data[pos as usize]
            } else {
                0.0
            };
        }
        self.position += buffer.len() as i64;
        Ok(())
    }
}

/// Cache over a fixed set of in-memory readers.
///
/// Checkout removes the reader from the table, so a second concurrent
/// checkout of the same id fails, matching the exclusivity contract.
#[derive(Default)]
pub struct MemoryCache {
    readers: Mutex<HashMap<String, Box<dyn SourceReader>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, id: impl Into<String>, reader: Box<dyn SourceReader>) {
        self.readers.lock().insert(id.into(), reader);
    }
}

impl SourceCache for MemoryCache {
    fn check_out(&self, id: &str) -> Option<Box<dyn SourceReader>> {
        self.readers.lock().remove(id)
    }

    fn check_in(&self, id: &str, reader: Box<dyn SourceReader>) {
        self.readers.lock().insert(id.to_string(), reader);
    }

    fn age(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_reader_bounds() {
        let mut reader = MemoryReader::mono(48000, vec![1.0, 2.0, 3.0]);
        let mut buf = [0.0; 5];
        reader.set_position(1);
        reader.read_samples(&mut buf).unwrap();
        assert_eq!(buf, [2.0, 3.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_memory_reader_negative_position_zero_fills() {
        let mut reader = MemoryReader::mono(48000, vec![1.0, 2.0]);
        let mut buf = [9.0; 4];
        reader.set_position(-2);
        reader.read_samples(&mut buf).unwrap();
        assert_eq!(buf, [0.0, 0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_cache_exclusive_checkout() {
        let cache = MemoryCache::new();
        cache.insert("a", Box::new(MemoryReader::mono(48000, vec![0.0])));
        let reader = cache.check_out("a").unwrap();
        assert!(cache.check_out("a").is_none());
        cache.check_in("a", reader);
        assert!(cache.check_out("a").is_some());
    }
}
