use std::collections::VecDeque;

use bytes::Bytes;
use tracing::debug;

use crate::encoding::{CharsetSniffer, DetectionConfig, Encoding};

/// Blocks read from the source, in stream order.
pub type ChunkBuffer = VecDeque<Bytes>;

/// Runs the charset sniffer over a complete [`ChunkBuffer`].
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct CharsetDetector {
    config: DetectionConfig,
}

impl CharsetDetector {
    pub(crate) fn new(config: DetectionConfig) -> Self {
        Self { config }
    }

    pub(crate) fn detect(&self, chunks: &ChunkBuffer) -> Option<Encoding> {
        let mut sniffer = CharsetSniffer::new(self.config);
        for chunk in chunks {
            sniffer.handle_data(chunk);
        }
        sniffer.data_end();

        let result = sniffer.result();
        debug!(blocks = chunks.len(), charset = ?sniffer.charset(), "charset detection finished");
        result
    }
}
