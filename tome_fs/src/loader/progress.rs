/// Progress callback: `(bytes_read, total_bytes)`.
pub type ProgressCallback = Box<dyn FnMut(u64, u64) + Send>;

/// Bytes read so far against the expected total.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressState {
    bytes_read: u64,
    total: u64,
}

impl ProgressState {
    /// `total` is 0 when the size is unknown.
    pub fn new(total: u64) -> Self {
        Self { bytes_read: 0, total }
    }

    /// Account for `len` more bytes. The total never drops below the bytes
    /// read, so a source that grows while being read raises it.
    pub fn record(&mut self, len: usize) {
        self.bytes_read += len as u64;
        if self.total > 0 && self.bytes_read > self.total {
            self.total = self.bytes_read;
        }
    }

    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// Progress is only meaningful against a known total.
    pub fn is_reportable(&self) -> bool {
        self.total > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_accumulates() {
        let mut progress = ProgressState::new(10);
        progress.record(4);
        progress.record(4);
        assert_eq!((progress.bytes_read(), progress.total()), (8, 10));
    }

    #[test]
    fn test_total_raised_when_source_grows() {
        let mut progress = ProgressState::new(5);
        progress.record(4);
        progress.record(4);
        assert_eq!((progress.bytes_read(), progress.total()), (8, 8));
    }

    #[test]
    fn test_unknown_total_not_reportable() {
        let mut progress = ProgressState::default();
        progress.record(100);
        assert!(!progress.is_reportable());
        assert_eq!(progress.total(), 0);
    }
}
