//! Spice 解析器核心库
//!
//! Two dialects are understood:
//!
//! - netlists, see [`parse_netlist`]: a title line, component lines and
//!   `.MODEL` statements. Other directives are skipped.
//! - libraries, see [`parse_library`]: `.MODEL` statements and `.SUBCKT`
//!   blocks with their comment metadata.
//!
//! Every call is a pure function of its input. Nothing here touches the file
//! system.

use ast::{
    model::{ModelRecord, ModelScanner},
    subckt::{SubcircuitRecord, SubcircuitScanner},
    ParsedLibrary, ParsedNetlist,
};
use lexer::SpiceLexer;
use parse::{NetlistParser, ParseResult};

/// 解析结果
pub mod ast;
/// 词法解析器
pub mod lexer;
/// 网表解析
pub mod parse;
/// 值解析
pub mod value;

pub use ast::model::parse_model;
pub use parse::{ParseError, ValueParseError};
pub use value::parse_value;

/// 解析网表
///
/// The first content line becomes the title when it is not a component line
/// and does not start with a component letter. Fails on the first line that
/// cannot be recognized.
pub fn parse_netlist(content: &str) -> ParseResult<ParsedNetlist> {
    NetlistParser::new().parse(content)
}

/// 解析库文件
///
/// Never fails: malformed statements are skipped.
pub fn parse_library(content: &str) -> ParsedLibrary {
    let mut models = ModelScanner::new();
    let mut subcircuits = SubcircuitScanner::new();

    for line in SpiceLexer::lines(content) {
        models.feed(&line);
        subcircuits.feed(&line);
    }

    let library = ParsedLibrary {
        models: models.finish(),
        subcircuits: subcircuits.finish(),
    };
    log::debug!(
        "parsed library: {} models, {} subcircuits",
        library.models.len(),
        library.subcircuits.len()
    );
    library
}

/// Only the `.MODEL` statements of a library.
pub fn parse_models(content: &str) -> Vec<ModelRecord> {
    let mut models = ModelScanner::new();
    for line in SpiceLexer::lines(content) {
        models.feed(&line);
    }
    models.finish()
}

/// Only the `.SUBCKT` blocks of a library.
pub fn parse_subcircuits(content: &str) -> Vec<SubcircuitRecord> {
    let mut subcircuits = SubcircuitScanner::new();
    for line in SpiceLexer::lines(content) {
        subcircuits.feed(&line);
    }
    subcircuits.finish()
}

#[cfg(test)]
#[macro_export]
macro_rules! component_test_ok {
    ($line:expr, $expected:expr) => {{
        let result = $crate::ast::component::recognize($line);
        assert_eq!(result, Ok(Some($expected)), "line: {}", $line);
    }};
}

#[cfg(test)]
#[macro_export]
macro_rules! component_test_none {
    ($line:expr) => {{
        let result = $crate::ast::component::recognize($line);
        assert_eq!(result, Ok(None), "line: {}", $line);
    }};
}
