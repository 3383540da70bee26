//! Destination side of a load.

/// A text buffer that decoded text is streamed into.
///
/// The loader only holds a weak reference to its sink and skips every call
/// once the sink has been dropped.
pub trait TextSink: Send {
    /// Remove all content.
    fn clear(&mut self);

    /// Append a decoded fragment at the end, without moving the cursor.
    fn append_text(&mut self, text: &str);

    /// Remove the last `len` bytes of content. `len` always falls on a
    /// character boundary.
    fn remove_suffix(&mut self, len: usize);

    fn place_cursor_at_start(&mut self);

    fn mark_unmodified(&mut self);

    /// Whether the buffer treats a final line terminator as implied, in
    /// which case the loader drops the last one from the file content.
    fn implicit_trailing_newline(&self) -> bool;
}
