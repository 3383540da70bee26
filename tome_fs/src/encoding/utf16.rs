use super::Encoding;

/// Minimum sample length before the null-byte pattern is trusted.
pub const MIN_PATTERN_SAMPLE: usize = 32;

/// Detect BOM-less UTF-16 from the characteristic positions of null bytes.
///
/// Mostly-ASCII UTF-16LE text has a null at every odd index, UTF-16BE at
/// every even index.
pub fn detect_utf16_pattern(bytes: &[u8]) -> Option<Encoding> {
    if bytes.len() < MIN_PATTERN_SAMPLE {
        return None;
    }

    let mut even_null = 0usize;
    let mut odd_null = 0usize;
    let mut even_ascii = 0usize;
    let mut odd_ascii = 0usize;

    for (i, &b) in bytes.iter().enumerate() {
        let printable = (32..=126).contains(&b) || matches!(b, b'\t' | b'\n' | b'\r');
        if i % 2 == 0 {
            if b == 0 {
                even_null += 1;
            } else if printable {
                even_ascii += 1;
            }
        } else if b == 0 {
            odd_null += 1;
        } else if printable {
            odd_ascii += 1;
        }
    }

    let half = (bytes.len() / 2) as f64;
    let even_null_ratio = even_null as f64 / half;
    let odd_null_ratio = odd_null as f64 / half;
    let even_ascii_ratio = even_ascii as f64 / half;
    let odd_ascii_ratio = odd_ascii as f64 / half;

    if odd_null_ratio > 0.85 && even_ascii_ratio > 0.4 {
        return Some(Encoding::Utf16Le);
    }
    if even_null_ratio > 0.85 && odd_ascii_ratio > 0.4 {
        return Some(Encoding::Utf16Be);
    }
    None
}
