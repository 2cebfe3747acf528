use serde::Serialize;
use thiserror::Error;

use crate::{
    ast::{component, model::ModelScanner, ParsedNetlist},
    lexer::{LineKind, SourceLine, SpiceLexer},
};

/// A token that could not be decoded as a number.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("cannot decode `{token}' as a number")]
pub struct ValueParseError {
    pub token: String,
}

impl ValueParseError {
    pub fn new(token: &str) -> Self {
        Self {
            token: token.to_string(),
        }
    }
}

/// Netlist parse failure.
///
/// `line` is 1-based, `span` is the byte range of the trimmed line inside the
/// parsed text.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "type")]
pub enum ParseError {
    #[error("line {line}: cannot decode `{token}' as a number")]
    Value {
        line: usize,
        span: (usize, usize),
        token: String,
    },
    #[error("line {line}: unrecognized line `{text}'")]
    UnparsableLine {
        line: usize,
        span: (usize, usize),
        text: String,
    },
}

impl ParseError {
    pub fn value(line: &SourceLine<'_>, source: ValueParseError) -> Self {
        Self::Value {
            line: line.number,
            span: line.span,
            token: source.token,
        }
    }

    pub fn unparsable(line: &SourceLine<'_>) -> Self {
        Self::UnparsableLine {
            line: line.number,
            span: line.span,
            text: line.text.to_string(),
        }
    }

    pub fn line(&self) -> usize {
        match self {
            Self::Value { line, .. } | Self::UnparsableLine { line, .. } => *line,
        }
    }

    pub fn span(&self) -> (usize, usize) {
        match self {
            Self::Value { span, .. } | Self::UnparsableLine { span, .. } => *span,
        }
    }
}

pub type ParseResult<T> = Result<T, ParseError>;

/// 网表解析器
///
/// Walks the physical lines once. `.MODEL` statements are handed to a
/// [`ModelScanner`], which owns the `Normal`/`InModel` state; everything it
/// rejects is handled here.
pub struct NetlistParser<'a> {
    models: ModelScanner<'a>,
    netlist: ParsedNetlist,
    /// Cleared by the first content-bearing line. Blank and comment lines do
    /// not count.
    first_line: bool,
}

impl<'a> NetlistParser<'a> {
    pub fn new() -> Self {
        Self {
            models: ModelScanner::new(),
            netlist: ParsedNetlist::default(),
            first_line: true,
        }
    }

    pub fn parse(mut self, code: &'a str) -> ParseResult<ParsedNetlist> {
        for line in SpiceLexer::lines(code) {
            self.feed(line)?;
        }

        let mut netlist = self.netlist;
        netlist.models = self.models.finish();
        log::debug!(
            "parsed netlist: title={:?}, {} components, {} models",
            netlist.title,
            netlist.components.len(),
            netlist.models.len()
        );
        Ok(netlist)
    }

    fn feed(&mut self, line: SourceLine<'a>) -> ParseResult<()> {
        if self.models.feed(&line) {
            if line.kind != LineKind::Comment && line.kind != LineKind::Blank {
                self.first_line = false;
            }
            return Ok(());
        }

        match line.kind {
            LineKind::Blank | LineKind::Comment => Ok(()),
            LineKind::Directive => {
                log::trace!("line {}: ignoring directive `{}'", line.number, line.text);
                self.first_line = false;
                Ok(())
            }
            LineKind::Continuation | LineKind::Content => self.component(&line),
        }
    }

    fn component(&mut self, line: &SourceLine<'a>) -> ParseResult<()> {
        let first_line = std::mem::replace(&mut self.first_line, false);

        match component::recognize(line.text) {
            Ok(Some(record)) => {
                self.netlist.components.push(record);
                Ok(())
            }
            Ok(None) if first_line && !component::has_known_prefix(line.text) => {
                log::debug!("line {}: using `{}' as title", line.number, line.text);
                self.netlist.title = Some(line.text.to_string());
                Ok(())
            }
            Ok(None) => Err(ParseError::unparsable(line)),
            Err(e) => Err(ParseError::value(line, e)),
        }
    }
}

impl Default for NetlistParser<'_> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::{component::ComponentKind, model::ModelType};

    use super::*;

    fn parse(code: &str) -> ParseResult<ParsedNetlist> {
        NetlistParser::new().parse(code)
    }

    #[test]
    fn test_parse_title_fallback() {
        let netlist = parse("Simple divider\nR1 in out 1k\nR2 out 0 1k\n").unwrap();
        assert_eq!(netlist.title.as_deref(), Some("Simple divider"));
        assert_eq!(netlist.components.len(), 2);
    }

    #[test]
    fn test_parse_title_after_comments_and_blanks() {
        let netlist = parse("* header comment\n\n   \nBass driver test\nR1 1 0 8\n").unwrap();
        assert_eq!(netlist.title.as_deref(), Some("Bass driver test"));
        assert_eq!(netlist.components.len(), 1);
    }

    #[test]
    fn test_parse_title_line_later_is_error() {
        let err = parse("R1 1 0 8\nBass driver test\n").unwrap_err();
        assert_eq!(
            err,
            ParseError::UnparsableLine {
                line: 2,
                span: (9, 25),
                text: "Bass driver test".to_string(),
            }
        );
        assert_eq!(err.line(), 2);
    }

    #[test]
    fn test_parse_title_with_known_prefix_is_error() {
        // `C` is a component prefix, so the line is not eligible as a title.
        let err = parse("Crossover network\nR1 1 0 8\n").unwrap_err();
        assert!(matches!(err, ParseError::UnparsableLine { line: 1, .. }));
    }

    #[test]
    fn test_parse_directive_clears_title_gate() {
        let err = parse(".OPTIONS NOPAGE\nBass driver test\n").unwrap_err();
        assert!(matches!(err, ParseError::UnparsableLine { line: 2, .. }));
    }

    #[test]
    fn test_parse_value_error_carries_line() {
        let err = parse("R1 1 0 8\nC1 1 0 abc\n").unwrap_err();
        assert_eq!(
            err,
            ParseError::Value {
                line: 2,
                span: (9, 19),
                token: "abc".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_directives_ignored() {
        let netlist = parse(".TITLE not a title\nR1 1 0 8\n.AC DEC 10 20 20k\n.END\n").unwrap();
        assert_eq!(netlist.title, None);
        assert_eq!(netlist.components.len(), 1);
        assert!(netlist.models.is_empty());
    }

    #[test]
    fn test_parse_model_blocks_interleaved() {
        let code = "\
test
.MODEL DMOD D (IS=1e-14
+ N=1.05)
D1 1 2 DMOD
.model QMOD NPN(BF=100)
Q1 3 2 0 QMOD
";
        let netlist = parse(code).unwrap();
        assert_eq!(netlist.title.as_deref(), Some("test"));
        assert_eq!(netlist.components.len(), 2);
        assert_eq!(netlist.components[0].kind, ComponentKind::Diode);
        assert_eq!(netlist.components[1].kind, ComponentKind::BjtNpn);

        assert_eq!(netlist.models.len(), 2);
        assert_eq!(netlist.models[0].model_name, "DMOD");
        assert_eq!(netlist.models[0].model_type, ModelType::Diode);
        assert_eq!(netlist.models[0].parameters["IS"], 1e-14);
        assert_eq!(netlist.models[0].parameters["N"], 1.05);
        assert_eq!(netlist.models[1].model_name, "QMOD");
        assert_eq!(netlist.models[1].parameters["BF"], 100.0);
    }

    #[test]
    fn test_parse_model_closed_by_component_line() {
        let code = "\
.MODEL DMOD D (IS=1e-14
+ N=1.05
R1 1 0 8
";
        let netlist = parse(code).unwrap();
        assert_eq!(netlist.models.len(), 1);
        assert_eq!(netlist.models[0].parameters.len(), 2);
        assert_eq!(netlist.components.len(), 1);
        assert_eq!(netlist.components[0].name, "R1");
    }

    #[test]
    fn test_parse_model_closed_by_bare_paren() {
        let code = "\
.MODEL DMOD D (IS=1e-14
+ N=1.05
)
R1 1 0 8
";
        let netlist = parse(code).unwrap();
        assert_eq!(netlist.models.len(), 1);
        assert_eq!(netlist.models[0].parameters["N"], 1.05);
        assert_eq!(netlist.components.len(), 1);
    }

    #[test]
    fn test_parse_model_closed_by_blank_line() {
        let err = parse(".MODEL DMOD D (IS=1e-14\n\n+ N=2\n").unwrap_err();
        // the `+` line is no longer inside the model and is not a component
        assert!(matches!(err, ParseError::UnparsableLine { line: 3, .. }));
    }

    #[test]
    fn test_parse_model_comment_inside_block() {
        let code = "\
.MODEL DMOD D (IS=1e-14
* saturation current from datasheet
+ N=1.05)
";
        let netlist = parse(code).unwrap();
        assert_eq!(netlist.models.len(), 1);
        assert_eq!(netlist.models[0].parameters["N"], 1.05);
    }

    #[test]
    fn test_parse_model_unterminated_at_eof() {
        let netlist = parse("R1 1 0 8\n.MODEL DMOD D (IS=1e-14\n+ N=1.05").unwrap();
        assert_eq!(netlist.models.len(), 1);
        assert_eq!(netlist.models[0].parameters["N"], 1.05);
    }

    #[test]
    fn test_parse_model_line_sets_title_gate() {
        let err = parse(".MODEL DMOD D (IS=1e-14)\nBass driver test\n").unwrap_err();
        assert!(matches!(err, ParseError::UnparsableLine { line: 2, .. }));
    }

    #[test]
    fn test_parse_empty_input() {
        assert_eq!(parse("").unwrap(), ParsedNetlist::default());
        assert_eq!(parse("\n* only comments\n\n").unwrap(), ParsedNetlist::default());
    }

    #[test]
    fn test_parse_crlf() {
        let netlist = parse("title\r\nR1 1 0 8\r\nC1 1 0 10u\r\n").unwrap();
        assert_eq!(netlist.title.as_deref(), Some("title"));
        assert_eq!(netlist.components.len(), 2);
    }

    #[test]
    fn test_parse_deterministic() {
        let code = include_str!("../../../models/crossover/two_way.cir");
        assert_eq!(parse(code), parse(code));
    }
}
