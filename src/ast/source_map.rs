/// Maps byte offsets in a listing to 1-based line/column positions.
pub struct SourceMap {
    line_starts: Vec<usize>,
}

/// The line an offset falls on, ready for rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snippet<'a> {
    pub line: usize,
    pub col: usize,
    pub text: &'a str,
}

impl SourceMap {
    pub fn new(source: &str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        SourceMap { line_starts }
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Returns (line, col), both 1-based. A newline belongs to the line it ends.
    pub fn lookup(&self, offset: usize) -> (usize, usize) {
        let line = self.line_starts.partition_point(|&start| start <= offset).saturating_sub(1);
        (line + 1, offset - self.line_starts[line] + 1)
    }

    /// Text of the 1-based `line`, without its line terminator.
    pub fn line_text<'a>(&self, source: &'a str, line: usize) -> &'a str {
        let Some(&start) = line.checked_sub(1).and_then(|i| self.line_starts.get(i)) else {
            return "";
        };
        let end = self.line_starts.get(line).copied().unwrap_or(source.len());
        source.get(start..end).unwrap_or("").trim_end_matches(['\n', '\r'])
    }

    pub fn snippet<'a>(&self, source: &'a str, offset: usize) -> Snippet<'a> {
        let (line, col) = self.lookup(offset);
        Snippet { line, col, text: self.line_text(source, line) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = "fn main\n  pi 10\n  call end\n";

    #[test]
    fn lookup_header() {
        let sm = SourceMap::new(LISTING);
        assert_eq!(sm.lookup(0), (1, 1));
        assert_eq!(sm.lookup(3), (1, 4));
    }

    #[test]
    fn lookup_instruction_lines() {
        let sm = SourceMap::new(LISTING);
        assert_eq!(sm.lookup(10), (2, 3)); // 'p' of "pi 10"
        assert_eq!(sm.lookup(18), (3, 3)); // 'c' of "call end"
    }

    #[test]
    fn newline_belongs_to_its_line() {
        let sm = SourceMap::new("ab\ncd\nef");
        assert_eq!(sm.lookup(2), (1, 3));
        assert_eq!(sm.lookup(3), (2, 1));
        assert_eq!(sm.lookup(5), (2, 3));
        assert_eq!(sm.lookup(6), (3, 1));
    }

    #[test]
    fn line_text_strips_terminators() {
        let src = "fn main\r\n  exit\n";
        let sm = SourceMap::new(src);
        assert_eq!(sm.line_text(src, 1), "fn main");
        assert_eq!(sm.line_text(src, 2), "  exit");
        assert_eq!(sm.line_text(src, 3), "");
    }

    #[test]
    fn line_text_out_of_bounds() {
        let sm = SourceMap::new(LISTING);
        assert_eq!(sm.line_text(LISTING, 0), "");
        assert_eq!(sm.line_text(LISTING, 99), "");
    }

    #[test]
    fn line_count_includes_trailing_empty_line() {
        assert_eq!(SourceMap::new(LISTING).line_count(), 4);
        assert_eq!(SourceMap::new("").line_count(), 1);
    }

    #[test]
    fn empty_source() {
        let sm = SourceMap::new("");
        assert_eq!(sm.lookup(0), (1, 1));
        assert_eq!(sm.line_text("", 1), "");
    }

    #[test]
    fn snippet_of_instruction() {
        let sm = SourceMap::new(LISTING);
        assert_eq!(sm.snippet(LISTING, 18), Snippet { line: 3, col: 3, text: "  call end" });
    }
}
