//! Fenced code block tracking.
//!
//! Wiki markup inside fenced code blocks is documentation, not markup, so the
//! extractor copies those lines verbatim.

/// Line-by-line tracker of `CommonMark` fenced code blocks.
///
/// Fences use three or more backticks or tildes. A closing fence uses the same
/// character, is at least as long as the opening one, and carries nothing but
/// trailing whitespace.
#[derive(Debug, Default)]
pub(crate) struct FenceTracker {
    open: Option<(char, usize)>,
}

impl FenceTracker {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Feed the next line. Returns `true` if the line belongs to a fenced
    /// block: an opening fence, a body line, or the closing fence.
    pub(crate) fn observe(&mut self, line: &str) -> bool {
        let trimmed = line.trim_start();

        match self.open {
            Some((ch, len)) => {
                if closes(trimmed, ch, len) {
                    self.open = None;
                }
                true
            }
            None => match opening(trimmed) {
                Some(fence) => {
                    self.open = Some(fence);
                    true
                }
                None => false,
            },
        }
    }
}

fn opening(trimmed: &str) -> Option<(char, usize)> {
    let first = trimmed.chars().next().filter(|&c| c == '`' || c == '~')?;
    let len = trimmed.chars().take_while(|&c| c == first).count();
    if len < 3 {
        return None;
    }
    // Backtick fences cannot carry backticks in their info string.
    if first == '`' && trimmed[len..].contains('`') {
        return None;
    }
    Some((first, len))
}

fn closes(trimmed: &str, ch: char, min_len: usize) -> bool {
    let len = trimmed.chars().take_while(|&c| c == ch).count();
    len >= min_len && trimmed[len..].chars().all(char::is_whitespace)
}
