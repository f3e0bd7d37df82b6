use crate::scoring::ScoredEntry;
use std::io::{self, Write};
use unicode_width::UnicodeWidthChar;

/// How the selection UI takes over the screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Clear the whole screen and redraw each frame.
    Fullscreen,
    /// Redraw in place below an existing prompt line (shell completion).
    Inline,
}

impl Mode {
    /// Rows of the widget that are not candidate rows: the input line and
    /// the separator, plus the trailing status line in inline mode.
    pub fn reserved_rows(self) -> usize {
        match self {
            Mode::Fullscreen => 2,
            Mode::Inline => 3,
        }
    }
}

pub struct Renderer {
    mode: Mode,
    cols: usize,
    // Lines drawn by the previous inline frame, so the cursor can be moved
    // back up before redrawing.
    rendered_lines: usize,
}

impl Renderer {
    pub fn new(mode: Mode, cols: usize) -> Self {
        Self {
            mode,
            cols: cols.max(20),
            rendered_lines: 0,
        }
    }

    /// Renders one frame. The whole frame is buffered and written to stderr
    /// in a single call; stdout stays reserved for the selected path.
    pub fn draw(
        &mut self,
        input: &str,
        entries: &[ScoredEntry],
        selected: usize,
        scroll: usize,
        max_visible: usize,
    ) -> io::Result<()> {
        let mut frame = String::new();
        match self.mode {
            Mode::Fullscreen => frame.push_str("\x1b[2J\x1b[H"),
            Mode::Inline => {
                if self.rendered_lines > 0 {
                    frame.push_str(&format!("\x1b[{}A", self.rendered_lines));
                }
                frame.push_str("\r\x1b[J");
            }
        }

        let mut lines = 0usize;
        let mut push_line = |frame: &mut String, text: &str| {
            frame.push_str(text);
            frame.push_str("\x1b[K\r\n");
            lines += 1;
        };

        let prompt = format!("> {}_", input);
        push_line(&mut frame, &truncate_to_width(&prompt, self.cols));
        push_line(&mut frame, &"─".repeat(self.cols.min(120)));

        let end = (scroll + max_visible).min(entries.len());
        for (i, entry) in entries.iter().enumerate().take(end).skip(scroll) {
            let path = truncate_to_width(&sanitize(entry.path), self.cols.saturating_sub(2));
            if i == selected {
                push_line(&mut frame, &format!("\x1b[7m\x1b[1m> {}\x1b[0m", path));
            } else {
                push_line(&mut frame, &format!("  {}", path));
            }
        }

        let mut status = format!("{} match(es)", entries.len());
        if entries.len() > max_visible {
            status.push_str(&format!(" [{}-{}/{}]", scroll + 1, end, entries.len()));
        }
        push_line(&mut frame, &format!("\x1b[90m{}\x1b[0m", status));

        self.rendered_lines = lines;
        write_frame(frame.as_bytes())
    }

    /// Removes the widget from the screen on session teardown.
    pub fn clear(&mut self) -> io::Result<()> {
        let frame = match self.mode {
            Mode::Fullscreen => "\x1b[2J\x1b[H".to_string(),
            Mode::Inline => {
                if self.rendered_lines > 0 {
                    format!("\x1b[{}A\r\x1b[J", self.rendered_lines)
                } else {
                    "\r\x1b[J".to_string()
                }
            }
        };
        self.rendered_lines = 0;
        write_frame(frame.as_bytes())
    }
}

fn write_frame(bytes: &[u8]) -> io::Result<()> {
    let mut err = io::stderr().lock();
    err.write_all(bytes)?;
    err.flush()
}

/// Makes an untrusted path safe to embed in a frame. ESC starts sequences
/// the terminal would interpret, so it is replaced with a literal `\e` and
/// any CSI parameter bytes plus the final byte are stripped with it. Tabs
/// become four spaces, CR/LF are dropped, and every other control byte is
/// shown as a `\xHH` escape.
pub fn sanitize(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut chars = path.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\x1b' => {
                out.push_str("\\e");
                if chars.peek() == Some(&'[') {
                    chars.next();
                }
                while matches!(chars.peek(), Some(&p) if ('\x20'..='\x3f').contains(&p)) {
                    chars.next();
                }
                if matches!(chars.peek(), Some(&p) if ('\x40'..='\x7e').contains(&p)) {
                    chars.next();
                }
            }
            '\t' => out.push_str("    "),
            '\n' | '\r' => {}
            c if (c as u32) < 0x20 || c == '\x7f' => {
                out.push_str(&format!("\\x{:02x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out
}

fn truncate_to_width(text: &str, max: usize) -> String {
    let mut width = 0usize;
    let mut out = String::new();
    for c in text.chars() {
        let w = c.width().unwrap_or(0);
        if width + w > max {
            break;
        }
        width += w;
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_csi_sequences() {
        assert_eq!(sanitize("\x1b[31mhello\x1b[0m"), "\\ehello\\e");
    }

    #[test]
    fn sanitize_handles_lone_escape() {
        assert_eq!(sanitize("a\x1b"), "a\\e");
    }

    #[test]
    fn sanitize_expands_tab_and_drops_newlines() {
        assert_eq!(sanitize("a\tb"), "a    b");
        assert_eq!(sanitize("a\nb\rc"), "abc");
    }

    #[test]
    fn sanitize_hex_escapes_other_control_bytes() {
        assert_eq!(sanitize("a\x00b"), "a\\x00b");
        assert_eq!(sanitize("\x7f"), "\\x7f");
    }

    #[test]
    fn sanitize_keeps_plain_utf8() {
        assert_eq!(sanitize("/home/üser/работа"), "/home/üser/работа");
    }

    #[test]
    fn truncate_respects_display_width() {
        assert_eq!(truncate_to_width("abcdef", 4), "abcd");
        // Wide characters count as two columns.
        assert_eq!(truncate_to_width("日本語", 4), "日本");
        assert_eq!(truncate_to_width("日本語", 5), "日本");
    }

    #[test]
    fn reserved_rows_per_mode() {
        assert_eq!(Mode::Fullscreen.reserved_rows(), 2);
        assert_eq!(Mode::Inline.reserved_rows(), 3);
    }
}
