//! Text buffer behind each worksheet tab
//!
//! Plain lines plus a cursor; no terminal types. Columns are counted in
//! chars, so multi-byte text edits cleanly.

/// Multi-line text with a cursor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextBuffer {
    lines: Vec<String>,
    /// (line, column in chars)
    cursor: (usize, usize),
}

impl Default for TextBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl TextBuffer {
    pub fn new() -> Self {
        Self {
            lines: vec![String::new()],
            cursor: (0, 0),
        }
    }

    pub fn from_text(text: &str) -> Self {
        let mut buffer = Self::new();
        buffer.set_text(text);
        buffer
    }

    /// Full text, lines joined with `\n`
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    /// Replace everything; the cursor goes to the end
    pub fn set_text(&mut self, text: &str) {
        self.lines = text.replace("\r\n", "\n").split('\n').map(String::from).collect();
        let last = self.lines.len() - 1;
        self.cursor = (last, self.line_len(last));
    }

    pub fn clear(&mut self) {
        *self = Self::new();
    }

    /// True when the buffer holds only whitespace
    pub fn is_blank(&self) -> bool {
        self.lines.iter().all(|l| l.trim().is_empty())
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn cursor(&self) -> (usize, usize) {
        self.cursor
    }

    fn line_len(&self, row: usize) -> usize {
        self.lines.get(row).map_or(0, |l| l.chars().count())
    }

    fn byte_offset(&self, row: usize, col: usize) -> usize {
        let line = &self.lines[row];
        line.char_indices().nth(col).map_or(line.len(), |(i, _)| i)
    }

    // ── Editing ─────────────────────────────────────────────

    pub fn insert_char(&mut self, c: char) {
        if c == '\n' {
            self.newline();
            return;
        }
        let (row, col) = self.cursor;
        let at = self.byte_offset(row, col);
        self.lines[row].insert(at, c);
        self.cursor.1 += 1;
    }

    /// Insert a pasted block, honouring embedded newlines
    pub fn insert_text(&mut self, text: &str) {
        for c in text.replace("\r\n", "\n").chars() {
            match c {
                '\r' => {}
                '\t' => (0..4).for_each(|_| self.insert_char(' ')),
                c => self.insert_char(c),
            }
        }
    }

    pub fn newline(&mut self) {
        let (row, col) = self.cursor;
        let at = self.byte_offset(row, col);
        let rest = self.lines[row].split_off(at);
        self.lines.insert(row + 1, rest);
        self.cursor = (row + 1, 0);
    }

    /// Delete the char before the cursor, joining lines at column 0
    pub fn backspace(&mut self) {
        let (row, col) = self.cursor;
        if col > 0 {
            let at = self.byte_offset(row, col - 1);
            self.lines[row].remove(at);
            self.cursor.1 -= 1;
        } else if row > 0 {
            let line = self.lines.remove(row);
            let prev_len = self.line_len(row - 1);
            self.lines[row - 1].push_str(&line);
            self.cursor = (row - 1, prev_len);
        }
    }

    /// Delete the char under the cursor, joining with the next line at EOL
    pub fn delete(&mut self) {
        let (row, col) = self.cursor;
        if col < self.line_len(row) {
            let at = self.byte_offset(row, col);
            self.lines[row].remove(at);
        } else if row + 1 < self.lines.len() {
            let next = self.lines.remove(row + 1);
            self.lines[row].push_str(&next);
        }
    }

    // ── Movement ────────────────────────────────────────────

    pub fn move_left(&mut self) {
        let (row, col) = self.cursor;
        if col > 0 {
            self.cursor.1 -= 1;
        } else if row > 0 {
            self.cursor = (row - 1, self.line_len(row - 1));
        }
    }

    pub fn move_right(&mut self) {
        let (row, col) = self.cursor;
        if col < self.line_len(row) {
            self.cursor.1 += 1;
        } else if row + 1 < self.lines.len() {
            self.cursor = (row + 1, 0);
        }
    }

    pub fn move_up(&mut self) {
        if self.cursor.0 > 0 {
            self.cursor.0 -= 1;
            self.cursor.1 = self.cursor.1.min(self.line_len(self.cursor.0));
        }
    }

    pub fn move_down(&mut self) {
        if self.cursor.0 + 1 < self.lines.len() {
            self.cursor.0 += 1;
            self.cursor.1 = self.cursor.1.min(self.line_len(self.cursor.0));
        }
    }

    pub fn home(&mut self) {
        self.cursor.1 = 0;
    }

    pub fn end(&mut self) {
        self.cursor.1 = self.line_len(self.cursor.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_text() {
        let mut buf = TextBuffer::new();
        for c in "SELECT 1".chars() {
            buf.insert_char(c);
        }
        assert_eq!(buf.text(), "SELECT 1");
        assert_eq!(buf.cursor(), (0, 8));
    }

    #[test]
    fn test_newline_splits_line() {
        let mut buf = TextBuffer::from_text("SELECT *FROM t");
        buf.home();
        (0..8).for_each(|_| buf.move_right());
        buf.newline();
        assert_eq!(buf.lines(), &["SELECT *".to_string(), "FROM t".to_string()]);
        assert_eq!(buf.cursor(), (1, 0));
    }

    #[test]
    fn test_backspace_joins_lines() {
        let mut buf = TextBuffer::from_text("a\nb");
        buf.home();
        buf.backspace();
        assert_eq!(buf.text(), "ab");
        assert_eq!(buf.cursor(), (0, 1));
    }

    #[test]
    fn test_delete_at_end_joins_next() {
        let mut buf = TextBuffer::from_text("a\nb");
        buf.move_up();
        buf.end();
        buf.delete();
        assert_eq!(buf.text(), "ab");
    }

    #[test]
    fn test_multibyte_editing() {
        let mut buf = TextBuffer::from_text("héllo");
        buf.move_left();
        buf.backspace();
        assert_eq!(buf.text(), "hélo");
        buf.home();
        buf.move_right();
        buf.delete();
        assert_eq!(buf.text(), "hlo");
    }

    #[test]
    fn test_vertical_move_clamps_column() {
        let mut buf = TextBuffer::from_text("long line\nab");
        buf.move_up();
        buf.end();
        buf.move_down();
        assert_eq!(buf.cursor(), (1, 2));
    }

    #[test]
    fn test_paste_with_crlf() {
        let mut buf = TextBuffer::new();
        buf.insert_text("SELECT 1;\r\nSELECT 2;");
        assert_eq!(buf.lines().len(), 2);
        assert!(!buf.is_blank());
    }

    #[test]
    fn test_blank_detection() {
        assert!(TextBuffer::from_text("  \n\t").is_blank());
    }
}
