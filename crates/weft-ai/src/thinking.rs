/// Removal of vendor-marked private reasoning segments from assistant
/// text. The filter is stateful so a delimiter split across two stream
/// chunks is still recognized, and nothing between the delimiters is
/// ever emitted while suppression is active.

pub const DEFAULT_THINKING_OPEN: &str = "<think>";
pub const DEFAULT_THINKING_CLOSE: &str = "</think>";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FilterState {
    Visible,
    Hidden,
}

#[derive(Debug, Clone)]
pub struct ThinkingFilter {
    open: String,
    close: String,
    state: FilterState,
    carry: String,
}

impl ThinkingFilter {
    pub fn new() -> Self {
        Self::with_delimiters(DEFAULT_THINKING_OPEN, DEFAULT_THINKING_CLOSE)
    }

    pub fn with_delimiters(open: impl Into<String>, close: impl Into<String>) -> Self {
        Self {
            open: open.into(),
            close: close.into(),
            state: FilterState::Visible,
            carry: String::new(),
        }
    }

    /// Feeds one chunk and returns the visible part. Text that might be
    /// the start of a delimiter is held back until the next chunk (or
    /// `finish`) decides.
    pub fn push(&mut self, chunk: &str) -> String {
        let mut buffer = std::mem::take(&mut self.carry);
        buffer.push_str(chunk);

        let mut visible = String::new();
        loop {
            match self.state {
                FilterState::Visible => {
                    if let Some(position) = buffer.find(&self.open) {
                        visible.push_str(&buffer[..position]);
                        buffer.drain(..position + self.open.len());
                        self.state = FilterState::Hidden;
                    } else {
                        let held = partial_delimiter_suffix(&buffer, &self.open);
                        visible.push_str(&buffer[..buffer.len() - held]);
                        self.carry = buffer[buffer.len() - held..].to_string();
                        return visible;
                    }
                }
                FilterState::Hidden => {
                    if let Some(position) = buffer.find(&self.close) {
                        buffer.drain(..position + self.close.len());
                        self.state = FilterState::Visible;
                    } else {
                        let held = partial_delimiter_suffix(&buffer, &self.close);
                        self.carry = buffer[buffer.len() - held..].to_string();
                        return visible;
                    }
                }
            }
        }
    }

    /// Ends the stream. Held-back text that never became a delimiter is
    /// returned; an unterminated hidden segment is dropped rather than
    /// leaked.
    pub fn finish(&mut self) -> String {
        let carry = std::mem::take(&mut self.carry);
        match self.state {
            FilterState::Visible => carry,
            FilterState::Hidden => String::new(),
        }
    }
}

impl Default for ThinkingFilter {
    fn default() -> Self {
        Self::new()
    }
}

/// One-shot form for fully assembled text. Idempotent: text without
/// delimiters passes through unchanged.
pub fn strip_thinking(text: &str) -> String {
    strip_thinking_with(text, DEFAULT_THINKING_OPEN, DEFAULT_THINKING_CLOSE)
}

pub fn strip_thinking_with(text: &str, open: &str, close: &str) -> String {
    let mut filter = ThinkingFilter::with_delimiters(open, close);
    let mut stripped = filter.push(text);
    stripped.push_str(&filter.finish());
    stripped
}

/// Longest strict prefix of `delimiter` that `buffer` ends with.
/// Delimiters are ASCII, so the returned length always lands on a char
/// boundary of `buffer`.
fn partial_delimiter_suffix(buffer: &str, delimiter: &str) -> usize {
    let max = delimiter.len().saturating_sub(1).min(buffer.len());
    for length in (1..=max).rev() {
        if !buffer.is_char_boundary(buffer.len() - length) {
            continue;
        }
        if buffer.ends_with(&delimiter[..length]) {
            return length;
        }
    }
    0
}
