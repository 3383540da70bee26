/// Check if a byte slice contains only valid UTF-8 sequences.
pub fn is_valid_utf8(bytes: &[u8]) -> bool {
    std::str::from_utf8(bytes).is_ok()
}

/// Incremental UTF-8 validation over a chunked stream.
///
/// A multi-byte sequence may be split across two chunks; the incomplete
/// prefix is carried over until the next chunk arrives.
#[derive(Debug, Clone)]
pub struct Utf8Validator {
    carry: Vec<u8>,
    valid: bool,
}

impl Default for Utf8Validator {
    fn default() -> Self {
        Self::new()
    }
}

impl Utf8Validator {
    pub fn new() -> Self {
        Self { carry: Vec::with_capacity(4), valid: true }
    }

    /// Feed the next chunk of the stream.
    pub fn feed(&mut self, data: &[u8]) {
        if !self.valid || data.is_empty() {
            return;
        }

        let mut rest = data;
        if !self.carry.is_empty() {
            let take = rest.len().min(3);
            let mut joined = self.carry.clone();
            joined.extend_from_slice(&rest[..take]);

            match std::str::from_utf8(&joined) {
                Ok(_) => {
                    self.carry.clear();
                    rest = &rest[take..];
                }
                Err(e) if e.valid_up_to() > 0 => {
                    // The carried character completed; resume right after it.
                    let consumed = e.valid_up_to() - self.carry.len();
                    self.carry.clear();
                    rest = &rest[consumed..];
                }
                Err(e) if e.error_len().is_none() => {
                    // Still incomplete, the chunk was shorter than the sequence.
                    self.carry = joined;
                    return;
                }
                Err(_) => {
                    self.valid = false;
                    return;
                }
            }
        }

        if let Err(e) = std::str::from_utf8(rest) {
            match e.error_len() {
                None => self.carry.extend_from_slice(&rest[e.valid_up_to()..]),
                Some(_) => self.valid = false,
            }
        }
    }

    /// Whether everything fed so far forms complete, valid UTF-8.
    pub fn is_complete(&self) -> bool {
        self.valid && self.carry.is_empty()
    }

    /// Whether no invalid sequence has been seen (a trailing incomplete
    /// sequence is still allowed).
    pub fn is_valid_so_far(&self) -> bool {
        self.valid
    }
}
