//! Statistical charset sniffing.
//!
//! [`CharsetSniffer`] is fed a byte stream chunk by chunk and, once told the
//! stream has ended, produces its best guess for the stream's encoding. BOMs,
//! UTF-16 null patterns, binary rejection and UTF-8 validation are decided
//! here. Legacy encodings are guessed by `chardetng`, with the Western guess
//! refined into a member of the Latin family.

use std::fmt;

pub mod latin;
pub mod utf16;
pub mod utf8;

pub use latin::LatinStats;
pub use utf8::{Utf8Validator, is_valid_utf8};
pub use utf16::detect_utf16_pattern;

use chardetng::EncodingDetector;

use crate::bom::detect_bom;

/// A text encoding the sniffer can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Encoding {
    Utf8,
    Utf16Le,
    Utf16Be,
    Utf32Le,
    Utf32Be,
    Latin1,
    Windows1252,
    Latin9,
    /// Any other encoding `encoding_rs` can decode, e.g. `windows-1251`.
    Legacy(&'static encoding_rs::Encoding),
}

impl Encoding {
    /// Canonical charset name, as understood by the transcoder.
    pub fn charset(self) -> &'static str {
        match self {
            Encoding::Utf8 => "UTF-8",
            Encoding::Utf16Le => "UTF-16LE",
            Encoding::Utf16Be => "UTF-16BE",
            Encoding::Utf32Le => "UTF-32LE",
            Encoding::Utf32Be => "UTF-32BE",
            Encoding::Latin1 => "ISO-8859-1",
            Encoding::Windows1252 => "windows-1252",
            Encoding::Latin9 => "ISO-8859-15",
            Encoding::Legacy(encoding) => encoding.name(),
        }
    }

    /// Map an `encoding_rs` encoding onto the named variants where one exists.
    pub fn from_encoding_rs(encoding: &'static encoding_rs::Encoding) -> Self {
        if encoding == encoding_rs::UTF_8 {
            Encoding::Utf8
        } else if encoding == encoding_rs::UTF_16LE {
            Encoding::Utf16Le
        } else if encoding == encoding_rs::UTF_16BE {
            Encoding::Utf16Be
        } else if encoding == encoding_rs::WINDOWS_1252 {
            Encoding::Windows1252
        } else if encoding == encoding_rs::ISO_8859_15 {
            Encoding::Latin9
        } else {
            Encoding::Legacy(encoding)
        }
    }

    /// Look up an encoding by charset name or `encoding_rs` label, ignoring
    /// ASCII case.
    pub fn from_charset(name: &str) -> Option<Self> {
        const ALL: [Encoding; 8] = [
            Encoding::Utf8,
            Encoding::Utf16Le,
            Encoding::Utf16Be,
            Encoding::Utf32Le,
            Encoding::Utf32Be,
            Encoding::Latin1,
            Encoding::Windows1252,
            Encoding::Latin9,
        ];
        let name = name.trim();
        ALL.into_iter()
            .find(|enc| enc.charset().eq_ignore_ascii_case(name))
            .or_else(|| {
                encoding_rs::Encoding::for_label(name.as_bytes()).map(Self::from_encoding_rs)
            })
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.charset())
    }
}

/// Thresholds for the sniffer heuristics.
#[derive(Debug, Clone, Copy)]
pub struct DetectionConfig {
    /// Above this share of NUL bytes the stream is treated as binary.
    pub max_null_ratio: f64,
    /// Above this share of control bytes the stream is treated as binary.
    pub max_control_ratio: f64,
    /// Leading bytes kept for BOM and UTF-16 pattern checks.
    pub sample_size: usize,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        DetectionConfig {
            max_null_ratio: 0.1,
            max_control_ratio: 0.3,
            sample_size: 1024,
        }
    }
}

/// Incremental charset detection engine.
pub struct CharsetSniffer {
    config: DetectionConfig,
    head: Vec<u8>,
    total: u64,
    nulls: u64,
    controls: u64,
    utf8: Utf8Validator,
    latin: LatinStats,
    legacy: EncodingDetector,
    ended: bool,
    result: Option<Encoding>,
}

impl fmt::Debug for CharsetSniffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CharsetSniffer")
            .field("config", &self.config)
            .field("total", &self.total)
            .field("ended", &self.ended)
            .field("result", &self.result)
            .finish_non_exhaustive()
    }
}

impl Default for CharsetSniffer {
    fn default() -> Self {
        Self::new(DetectionConfig::default())
    }
}

impl CharsetSniffer {
    pub fn new(config: DetectionConfig) -> Self {
        Self {
            config,
            head: Vec::with_capacity(config.sample_size.max(4)),
            total: 0,
            nulls: 0,
            controls: 0,
            utf8: Utf8Validator::new(),
            latin: LatinStats::default(),
            legacy: EncodingDetector::new(),
            ended: false,
            result: None,
        }
    }

    /// Feed the next block of the stream. Ignored once [`data_end`] ran.
    ///
    /// [`data_end`]: CharsetSniffer::data_end
    pub fn handle_data(&mut self, data: &[u8]) {
        if self.ended {
            return;
        }

        let room = self.config.sample_size.max(4).saturating_sub(self.head.len());
        self.head.extend_from_slice(&data[..room.min(data.len())]);

        self.total += data.len() as u64;
        for &b in data {
            if b == 0 {
                self.nulls += 1;
            } else if b < 32 && !matches!(b, b'\t' | b'\n' | b'\r' | 0x0C) {
                self.controls += 1;
            }
        }

        self.utf8.feed(data);
        self.latin.feed(data);
        self.legacy.feed(data, false);
    }

    /// Signal end of stream and settle on a result.
    pub fn data_end(&mut self) {
        if self.ended {
            return;
        }
        self.ended = true;
        self.legacy.feed(&[], true);
        self.result = self.decide();
    }

    fn decide(&self) -> Option<Encoding> {
        if self.total == 0 {
            return Some(Encoding::Utf8);
        }

        if let Some(encoding) = detect_bom(&self.head).encoding {
            return Some(encoding);
        }

        if let Some(encoding) = detect_utf16_pattern(&self.head) {
            return Some(encoding);
        }

        let total = self.total as f64;
        if self.nulls as f64 / total > self.config.max_null_ratio
            || self.controls as f64 / total > self.config.max_control_ratio
        {
            return None;
        }

        if self.utf8.is_complete() {
            return Some(Encoding::Utf8);
        }

        let guess = self.legacy.guess(None, false);
        if guess == encoding_rs::WINDOWS_1252 {
            return Some(self.latin.classify());
        }
        Some(Encoding::from_encoding_rs(guess))
    }

    /// The detected encoding; `None` before [`data_end`] or when detection
    /// failed.
    ///
    /// [`data_end`]: CharsetSniffer::data_end
    pub fn result(&self) -> Option<Encoding> {
        self.result
    }

    /// Charset name of the detected encoding, see [`result`].
    ///
    /// [`result`]: CharsetSniffer::result
    pub fn charset(&self) -> Option<&'static str> {
        self.result.map(Encoding::charset)
    }
}

/// Sniff a complete in-memory buffer.
pub fn sniff(bytes: &[u8]) -> Option<Encoding> {
    let mut sniffer = CharsetSniffer::default();
    sniffer.handle_data(bytes);
    sniffer.data_end();
    sniffer.result()
}
