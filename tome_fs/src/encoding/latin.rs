use super::Encoding;

/// Byte statistics used to pick a member of the Latin family once a stream
/// has been guessed to be Western text.
#[derive(Debug, Clone, Default)]
pub struct LatinStats {
    extended: u64,
    // 0x80..=0x9F: printable only in Windows-1252
    win1252_specific: u64,
    // code points Latin-9 reassigned relative to Latin-1
    latin9_specific: u64,
}

impl LatinStats {
    pub fn feed(&mut self, bytes: &[u8]) {
        for &b in bytes {
            if b >= 0x80 {
                self.extended += 1;
            }
            if (0x80..=0x9F).contains(&b) {
                self.win1252_specific += 1;
            }
            if matches!(b, 0xA4 | 0xA6 | 0xA8 | 0xB4 | 0xB8 | 0xBC | 0xBD | 0xBE) {
                self.latin9_specific += 1;
            }
        }
    }

    /// Pick the most plausible Latin encoding for the bytes seen so far.
    pub fn classify(&self) -> Encoding {
        if self.win1252_specific > 2 {
            return Encoding::Windows1252;
        }
        if self.extended > 0 && self.latin9_specific > self.extended / 10 {
            return Encoding::Latin9;
        }
        Encoding::Latin1
    }
}
