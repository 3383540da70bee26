use crate::encoding::Encoding;

/// Result of BOM detection containing the detected encoding and BOM length
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BomDetectionResult {
    pub encoding: Option<Encoding>,
    pub bom_length: usize,
}

impl BomDetectionResult {
    const NONE: Self = Self { encoding: None, bom_length: 0 };

    fn found(encoding: Encoding, bom_length: usize) -> Self {
        Self { encoding: Some(encoding), bom_length }
    }
}

/// Detect Byte Order Mark (BOM) at the start of the given byte slice.
///
/// UTF-32 marks are checked first: the UTF-32LE mark begins with the
/// UTF-16LE one.
pub fn detect_bom(bytes: &[u8]) -> BomDetectionResult {
    match bytes {
        [0xFF, 0xFE, 0x00, 0x00, ..] => BomDetectionResult::found(Encoding::Utf32Le, 4),
        [0x00, 0x00, 0xFE, 0xFF, ..] => BomDetectionResult::found(Encoding::Utf32Be, 4),
        [0xEF, 0xBB, 0xBF, ..] => BomDetectionResult::found(Encoding::Utf8, 3),
        [0xFF, 0xFE, ..] => BomDetectionResult::found(Encoding::Utf16Le, 2),
        [0xFE, 0xFF, ..] => BomDetectionResult::found(Encoding::Utf16Be, 2),
        _ => BomDetectionResult::NONE,
    }
}
