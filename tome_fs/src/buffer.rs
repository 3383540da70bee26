use std::path::{Path, PathBuf};

use crate::sink::TextSink;

/// Plain in-memory text buffer, the default [`TextSink`].
#[derive(Debug, Clone)]
pub struct TextBuffer {
    content: String,
    file_path: Option<PathBuf>,
    /// Whether the buffer has unsaved changes
    modified: bool,
    /// Current cursor position
    cursor_line: usize,
    cursor_col: usize,
    implicit_trailing_newline: bool,
}

impl Default for TextBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl TextBuffer {
    pub fn new() -> Self {
        Self {
            content: String::new(),
            file_path: None,
            modified: false,
            cursor_line: 0,
            cursor_col: 0,
            implicit_trailing_newline: true,
        }
    }

    pub fn new_with_path(path: PathBuf) -> Self {
        Self {
            file_path: Some(path),
            ..Self::new()
        }
    }

    /// Path of the file this buffer was opened for, if any.
    pub fn file_path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }

    /// Replace the content, as an edit would.
    pub fn set_text(&mut self, text: &str) {
        self.content.clear();
        self.content.push_str(text);
        self.modified = true;
    }

    pub fn set_implicit_trailing_newline(&mut self, implicit: bool) {
        self.implicit_trailing_newline = implicit;
    }

    pub fn text(&self) -> &str {
        &self.content
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn cursor(&self) -> (usize, usize) {
        (self.cursor_line, self.cursor_col)
    }

    /// Number of lines, counting the empty buffer as one line.
    pub fn line_count(&self) -> usize {
        self.content.split('\n').count()
    }

    /// Move the cursor, clamped to the existing lines.
    pub fn move_cursor(&mut self, line: usize, col: usize) {
        let last_line = self.line_count().saturating_sub(1);
        self.cursor_line = line.min(last_line);
        let line_len = self
            .content
            .split('\n')
            .nth(self.cursor_line)
            .map_or(0, |l| l.chars().count());
        self.cursor_col = col.min(line_len);
    }
}

impl TextSink for TextBuffer {
    fn clear(&mut self) {
        self.content.clear();
        self.cursor_line = 0;
        self.cursor_col = 0;
        self.modified = true;
    }

    fn append_text(&mut self, text: &str) {
        self.content.push_str(text);
        self.modified = true;
    }

    fn remove_suffix(&mut self, len: usize) {
        let new_len = self.content.len().saturating_sub(len);
        if self.content.is_char_boundary(new_len) {
            self.content.truncate(new_len);
            self.modified = true;
        }
    }

    fn place_cursor_at_start(&mut self) {
        self.cursor_line = 0;
        self.cursor_col = 0;
    }

    fn mark_unmodified(&mut self) {
        self.modified = false;
    }

    fn implicit_trailing_newline(&self) -> bool {
        self.implicit_trailing_newline
    }
}
