//! Size ceiling enforced before any byte is read.

use crate::error::{LoadError, LoadResult};
use crate::location::FileInfo;

/// Default ceiling, in bytes.
pub const DEFAULT_MAX_SIZE: u64 = 50 * 1000 * 1000;

#[derive(Debug, Clone, Copy)]
pub(crate) struct SizeGuard {
    max_size: Option<u64>,
}

impl SizeGuard {
    pub(crate) fn new(max_size: Option<u64>) -> Self {
        Self { max_size }
    }

    /// Check the queried metadata against the ceiling and return the
    /// expected total, 0 when unknown.
    pub(crate) fn check(&self, info: &FileInfo) -> LoadResult<u64> {
        let Some(size) = info.size else {
            return Ok(0);
        };

        match self.max_size {
            Some(max) if size > max => Err(LoadError::TooBig {
                size,
                max: format_size(max),
            }),
            _ => Ok(size),
        }
    }
}

/// Format a byte count for humans, with SI units and one decimal.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 6] = ["kB", "MB", "GB", "TB", "PB", "EB"];

    match bytes {
        1 => return "1 byte".to_string(),
        0..1000 => return format!("{bytes} bytes"),
        _ => {}
    }

    let size = bytes as f64;
    let mut factor = 1000.0_f64;
    let mut unit = UNITS[0];
    for next in &UNITS[1..] {
        if size < factor * 1000.0 {
            break;
        }
        factor *= 1000.0;
        unit = next;
    }
    format!("{:.1} {unit}", size / factor)
}
