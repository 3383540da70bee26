//! Streaming conversion of the detected charset to UTF-8.

use encoding_rs::{Decoder, DecoderResult};
use tracing::debug;

use crate::encoding::Encoding;
use crate::error::ConversionError;

/// One conversion session from a source charset to UTF-8.
///
/// Input may be fed in arbitrary pieces: multi-byte sequences straddling two
/// pieces are completed on the next feed. A leading byte order mark is
/// dropped.
pub struct ConversionSession {
    backend: Backend,
    consumed: u64,
}

enum Backend {
    Rs(Decoder),
    Utf32(Utf32Decoder),
}

impl ConversionSession {
    pub fn open(charset: &str) -> Result<Self, ConversionError> {
        let backend = match Encoding::from_charset(charset) {
            Some(Encoding::Utf32Le) => Backend::Utf32(Utf32Decoder::new(false)),
            Some(Encoding::Utf32Be) => Backend::Utf32(Utf32Decoder::new(true)),
            _ => encoding_rs::Encoding::for_label(charset.trim().as_bytes())
                .map(|enc| Backend::Rs(enc.new_decoder_with_bom_removal()))
                .ok_or_else(|| ConversionError::UnsupportedCharset(charset.to_string()))?,
        };
        Ok(Self { backend, consumed: 0 })
    }

    /// Convert the next piece of input.
    pub fn feed(&mut self, input: &[u8]) -> Result<String, ConversionError> {
        self.convert(input, false)
    }

    /// Flush the session. Fails when the input ended inside a sequence.
    pub fn close(mut self) -> Result<String, ConversionError> {
        self.convert(&[], true)
    }

    fn convert(&mut self, input: &[u8], last: bool) -> Result<String, ConversionError> {
        match &mut self.backend {
            Backend::Rs(decoder) => decode_rs(decoder, input, last, &mut self.consumed),
            Backend::Utf32(decoder) => decoder.decode(input, last, &mut self.consumed),
        }
    }
}

fn decode_rs(
    decoder: &mut Decoder,
    input: &[u8],
    last: bool,
    consumed: &mut u64,
) -> Result<String, ConversionError> {
    let mut out = String::with_capacity(
        decoder
            .max_utf8_buffer_length_without_replacement(input.len())
            .unwrap_or(input.len()),
    );
    let mut src = input;

    loop {
        let (result, read) = decoder.decode_to_string_without_replacement(src, &mut out, last);
        src = &src[read..];
        *consumed += read as u64;

        match result {
            DecoderResult::InputEmpty => return Ok(out),
            DecoderResult::OutputFull => {
                let more = decoder
                    .max_utf8_buffer_length_without_replacement(src.len())
                    .unwrap_or(src.len())
                    .max(4);
                out.reserve(more);
            }
            DecoderResult::Malformed(_, _) if last && src.is_empty() => {
                return Err(ConversionError::PartialInput);
            }
            DecoderResult::Malformed(bad, after) => {
                let offset = consumed.saturating_sub(u64::from(bad) + u64::from(after));
                return Err(ConversionError::InvalidSequence { offset });
            }
        }
    }
}

struct Utf32Decoder {
    big_endian: bool,
    pending: Vec<u8>,
    at_start: bool,
}

impl Utf32Decoder {
    fn new(big_endian: bool) -> Self {
        Self { big_endian, pending: Vec::with_capacity(4), at_start: true }
    }

    fn decode(
        &mut self,
        input: &[u8],
        last: bool,
        consumed: &mut u64,
    ) -> Result<String, ConversionError> {
        let mut out = String::with_capacity(input.len());
        let mut bytes = std::mem::take(&mut self.pending);
        bytes.extend_from_slice(input);

        let mut units = bytes.chunks_exact(4);
        for unit in &mut units {
            let raw = [unit[0], unit[1], unit[2], unit[3]];
            let value = if self.big_endian { u32::from_be_bytes(raw) } else { u32::from_le_bytes(raw) };
            let ch = char::from_u32(value)
                .ok_or(ConversionError::InvalidSequence { offset: *consumed })?;
            *consumed += 4;
            if std::mem::take(&mut self.at_start) && ch == '\u{FEFF}' {
                continue;
            }
            out.push(ch);
        }
        self.pending.extend_from_slice(units.remainder());

        if last && !self.pending.is_empty() {
            return Err(ConversionError::PartialInput);
        }
        Ok(out)
    }
}

/// Length in bytes of the line terminator ending `text`, 0 if none.
pub fn trailing_line_terminator_len(text: &str) -> usize {
    if text.ends_with("\r\n") {
        2
    } else if text.ends_with(['\n', '\r']) {
        1
    } else if text.ends_with('\u{2029}') {
        '\u{2029}'.len_utf8()
    } else {
        0
    }
}

/// A [`ConversionSession`] that also remembers how the decoded text ends.
pub(crate) struct StreamTranscoder {
    session: ConversionSession,
    // last two characters emitted so far
    tail: String,
    emitted: u64,
}

impl StreamTranscoder {
    pub(crate) fn open(charset: &str) -> Result<Self, ConversionError> {
        debug!(charset, "opening conversion session");
        Ok(Self { session: ConversionSession::open(charset)?, tail: String::new(), emitted: 0 })
    }

    pub(crate) fn feed(&mut self, block: &[u8]) -> Result<String, ConversionError> {
        let fragment = self.session.feed(block)?;
        self.emitted += fragment.len() as u64;
        keep_tail(&mut self.tail, &fragment);
        Ok(fragment)
    }

    /// Flush the session, returning the last fragment and the length of the
    /// line terminator the decoded text ends with.
    pub(crate) fn close(self) -> Result<(String, usize), ConversionError> {
        let Self { session, mut tail, emitted } = self;
        let fragment = session.close()?;
        keep_tail(&mut tail, &fragment);
        debug!(bytes = emitted + fragment.len() as u64, "conversion session closed");
        Ok((fragment, trailing_line_terminator_len(&tail)))
    }
}

fn keep_tail(tail: &mut String, fragment: &str) {
    if fragment.is_empty() {
        return;
    }
    tail.push_str(fragment);
    let keep_from = tail.char_indices().rev().nth(1).map_or(0, |(i, _)| i);
    tail.drain(..keep_from);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn convert_in_pieces(charset: &str, bytes: &[u8], size: usize) -> Result<String, ConversionError> {
        let mut session = ConversionSession::open(charset)?;
        let mut text = String::new();
        for piece in bytes.chunks(size.max(1)) {
            text.push_str(&session.feed(piece)?);
        }
        text.push_str(&session.close()?);
        Ok(text)
    }

    #[test]
    fn test_unknown_charset() {
        assert!(matches!(
            ConversionSession::open("X-NOT-A-CHARSET"),
            Err(ConversionError::UnsupportedCharset(name)) if name == "X-NOT-A-CHARSET"
        ));
    }

    #[test]
    fn test_utf8_split_sequences() {
        let text = "ünïcödé ✓ 😀\n";
        for size in [1, 2, 3, 5] {
            assert_eq!(convert_in_pieces("UTF-8", text.as_bytes(), size).unwrap(), text);
        }
    }

    #[test]
    fn test_utf8_bom_is_removed() {
        assert_eq!(convert_in_pieces("UTF-8", b"\xEF\xBB\xBFabc", 1).unwrap(), "abc");
    }

    #[test]
    fn test_latin_charsets() {
        assert_eq!(convert_in_pieces("ISO-8859-1", b"caf\xe9", 2).unwrap(), "café");
        assert_eq!(convert_in_pieces("ISO-8859-15", b"20 \xa4", 2).unwrap(), "20 €");
        assert_eq!(convert_in_pieces("WINDOWS-1252", b"\x93hi\x94", 1).unwrap(), "“hi”");
    }

    #[test]
    fn test_utf16_with_bom() {
        let mut bytes = vec![0xFE, 0xFF];
        bytes.extend("hé".encode_utf16().flat_map(u16::to_be_bytes));
        assert_eq!(convert_in_pieces("UTF-16BE", &bytes, 3).unwrap(), "hé");
    }

    #[test]
    fn test_utf32() {
        let mut bytes = vec![0xFF, 0xFE, 0x00, 0x00];
        bytes.extend("a😀".chars().flat_map(|c| (c as u32).to_le_bytes()));
        assert_eq!(convert_in_pieces("UTF-32LE", &bytes, 3).unwrap(), "a😀");

        let be: Vec<u8> = "z".chars().flat_map(|c| (c as u32).to_be_bytes()).collect();
        assert_eq!(convert_in_pieces("UTF-32BE", &be, 1).unwrap(), "z");
    }

    #[test]
    fn test_utf32_invalid_code_point() {
        let bytes = [0x41, 0, 0, 0, 0x00, 0xD8, 0, 0];
        assert_eq!(
            convert_in_pieces("UTF-32LE", &bytes, 8),
            Err(ConversionError::InvalidSequence { offset: 4 })
        );
    }

    #[test]
    fn test_invalid_sequence_reports_offset() {
        let mut session = ConversionSession::open("UTF-8").unwrap();
        assert_eq!(session.feed(b"ok ").unwrap(), "ok ");
        assert_eq!(
            session.feed(b"x\xFFy"),
            Err(ConversionError::InvalidSequence { offset: 4 })
        );
    }

    #[test]
    fn test_truncated_input_is_partial() {
        let mut session = ConversionSession::open("UTF-8").unwrap();
        assert_eq!(session.feed(b"a\xE2\x9C").unwrap(), "a");
        assert_eq!(session.close(), Err(ConversionError::PartialInput));

        let mut session = ConversionSession::open("UTF-32BE").unwrap();
        session.feed(&[0, 0]).unwrap();
        assert_eq!(session.close(), Err(ConversionError::PartialInput));
    }

    #[test]
    fn test_trailing_line_terminator_len() {
        assert_eq!(trailing_line_terminator_len("a\n"), 1);
        assert_eq!(trailing_line_terminator_len("a\r\n"), 2);
        assert_eq!(trailing_line_terminator_len("a\r"), 1);
        assert_eq!(trailing_line_terminator_len("a\u{2029}"), 3);
        assert_eq!(trailing_line_terminator_len("a"), 0);
        assert_eq!(trailing_line_terminator_len(""), 0);
    }

    #[test]
    fn test_transcoder_tracks_terminator_across_fragments() {
        let mut transcoder = StreamTranscoder::open("UTF-8").unwrap();
        assert_eq!(transcoder.feed(b"line\r").unwrap(), "line\r");
        assert_eq!(transcoder.feed(b"\n").unwrap(), "\n");
        let (rest, terminator) = transcoder.close().unwrap();
        assert_eq!(rest, "");
        assert_eq!(terminator, 2);
    }
}
