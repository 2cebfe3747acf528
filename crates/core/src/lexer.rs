//! 按行切分
//!
//! SPICE text is line oriented, so the lexer only classifies physical lines
//! and splits them into whitespace tokens. Continuation lines are *not*
//! merged here: `.MODEL` and `.SUBCKT` treat them differently.

/// Line classification, decided by the first non-blank character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// Empty or whitespace only.
    Blank,
    /// Starts with `*` (or `;`).
    Comment,
    /// Starts with `+`.
    Continuation,
    /// Starts with `.`.
    Directive,
    /// Anything else, usually a component line.
    Content,
}

/// One physical line of the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine<'a> {
    /// 1-based line number.
    pub number: usize,
    /// Byte range of `text` inside the whole source.
    pub span: (usize, usize),
    /// The line with surrounding whitespace trimmed.
    pub text: &'a str,
    pub kind: LineKind,
}

impl<'a> SourceLine<'a> {
    /// Whether this is the directive `name`, e.g. `.MODEL` (case-insensitive).
    ///
    /// Only the first token is compared, so `.END` does not match `.ENDS`.
    pub fn is_directive(&self, name: &str) -> bool {
        self.kind == LineKind::Directive
            && tokens(self.text)
                .first()
                .is_some_and(|first| first.eq_ignore_ascii_case(name))
    }

    /// The line without its leading `+` marker, if it is a continuation.
    pub fn continued(&self) -> Option<&'a str> {
        self.text.strip_prefix('+').map(str::trim)
    }
}

/// Spice 词法解析器
///
/// ```
/// use spice_lib_core::lexer::{LineKind, SpiceLexer};
///
/// let lines: Vec<_> = SpiceLexer::lines("* title\nR1 1 0 1k\n+ more").collect();
/// assert_eq!(lines[0].kind, LineKind::Comment);
/// assert_eq!(lines[1].text, "R1 1 0 1k");
/// assert_eq!(lines[2].continued(), Some("more"));
/// ```
pub struct SpiceLexer;

impl SpiceLexer {
    /// 切分成行
    pub fn lines(code: &str) -> impl Iterator<Item = SourceLine<'_>> {
        code.lines().enumerate().map(move |(loc, line)| {
            let text = line.trim();
            let start = text.as_ptr() as usize - code.as_ptr() as usize;

            let kind = match text.chars().next() {
                None => LineKind::Blank,
                Some('*') | Some(';') => LineKind::Comment,
                Some('+') => LineKind::Continuation,
                Some('.') => LineKind::Directive,
                Some(_) => LineKind::Content,
            };

            SourceLine {
                number: loc + 1,
                span: (start, start + text.len()),
                text,
                kind,
            }
        })
    }
}

/// Split a line into tokens. Commas count as whitespace.
pub fn tokens(line: &str) -> Vec<&str> {
    line.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|x| !x.is_empty())
        .collect()
}

/// Cut a trailing `;` comment.
pub fn strip_inline_comment(line: &str) -> &str {
    match line.find(';') {
        Some(index) => line[..index].trim_end(),
        None => line,
    }
}

/// Comment text without its leading `*`/`;` run.
pub fn comment_text(line: &str) -> &str {
    line.trim_start_matches(['*', ';']).trim()
}
