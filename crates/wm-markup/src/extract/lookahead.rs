//! Forward-only search helpers that keep extraction linear.

/// Memoized search for the next occurrence of one byte.
///
/// Queries are expected with non-decreasing start offsets, which a forward
/// scan guarantees. Each byte is then inspected at most once no matter how
/// often the same far-away byte is asked for. An out-of-order query is still
/// answered correctly by searching again.
#[derive(Debug)]
pub(super) struct Lookahead {
    needle: u8,
    /// Start of the last search and its result.
    cache: Option<(usize, Option<usize>)>,
}

impl Lookahead {
    pub(super) fn new(needle: u8) -> Self {
        Self {
            needle,
            cache: None,
        }
    }

    /// Offset of the first `needle` at or after `from`.
    pub(super) fn next(&mut self, haystack: &[u8], from: usize) -> Option<usize> {
        if let Some((start, found)) = self.cache
            && start <= from
            && found.is_none_or(|at| at >= from)
        {
            return found;
        }

        let found = haystack
            .get(from..)?
            .iter()
            .position(|&b| b == self.needle)
            .map(|i| from + i);
        self.cache = Some((from, found));
        found
    }
}

/// One-based line numbers for diagnostics, counted incrementally.
#[derive(Debug)]
pub(super) struct LineCounter {
    offset: usize,
    line: usize,
}

impl LineCounter {
    pub(super) fn new() -> Self {
        Self { offset: 0, line: 1 }
    }

    /// Line containing `offset`.
    pub(super) fn line_at(&mut self, source: &str, offset: usize) -> usize {
        if offset < self.offset {
            *self = Self::new();
        }
        self.line += source.as_bytes()[self.offset..offset]
            .iter()
            .filter(|&&b| b == b'\n')
            .count();
        self.offset = offset;
        self.line
    }
}
