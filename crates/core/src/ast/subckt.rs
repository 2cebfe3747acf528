use std::collections::BTreeMap;

use serde::Serialize;

use crate::{
    ast::component::{is_params_keyword, key_value},
    lexer::{comment_text, strip_inline_comment, tokens, LineKind, SourceLine},
    value::{float, parse_value},
};

/// Comment keys whose value is read as a number, e.g. `* FS: 28 Hz`.
pub const TS_KEYS: [&str; 13] = [
    "FS",
    "QTS",
    "QES",
    "QMS",
    "VAS",
    "RE",
    "LE",
    "BL",
    "XMAX",
    "MMS",
    "CMS",
    "SD",
    "SENSITIVITY",
];

/// 子电路定义
///
/// - `.SUBCKT <name> [node]* [PARAMS: <<name> = <value>>*]`
/// - `.ENDS [name]`
///
/// e.g.
///
/// ```text
/// * MANUFACTURER: Acme Corp
/// * FS: 28 Hz
/// .SUBCKT WOOFER8 1 2
/// RE 1 3 6.2
/// LE 3 2 0.9mH
/// .ENDS
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SubcircuitRecord {
    pub name: String,
    pub pins: Vec<String>,
    /// Defaults from the header `PARAMS:` clause, lower-cased keys.
    pub params: BTreeMap<String, f64>,
    /// Body lines joined with `\n`. Comment lines, blank lines and `+`
    /// markers are not kept.
    pub body: String,
    pub metadata: BTreeMap<String, String>,
    pub ts_parameters: BTreeMap<String, f64>,
}

/// Header tokens of a `.SUBCKT` line or its `+` continuation. Both `;` and
/// `*` start an inline comment here.
fn header_tokens(text: &str) -> Vec<&str> {
    let text = strip_inline_comment(text);
    match text.find('*') {
        Some(index) => tokens(&text[..index]),
        None => tokens(text),
    }
}

/// The number at the start of a metadata value: `88.5 dB` → `88.5`.
fn leading_number(value: &str) -> Option<f64> {
    let first = value.split_whitespace().next()?;
    float(first).ok().map(|(_, x)| x)
}

/// 提取注释中的元数据
///
/// Every `KEY: VALUE` comment becomes an entry with an upper-cased key. Keys in
/// [`TS_KEYS`] go to the numeric map when their value starts with a number,
/// everything else is kept verbatim. Later duplicates win.
pub fn extract_metadata<S: AsRef<str>>(
    comments: &[S],
) -> (BTreeMap<String, String>, BTreeMap<String, f64>) {
    let mut metadata = BTreeMap::new();
    let mut ts_parameters = BTreeMap::new();

    for comment in comments {
        let Some((key, value)) = comment.as_ref().split_once(':') else {
            continue;
        };
        let (key, value) = (key.trim(), value.trim());
        if key.is_empty() || value.is_empty() {
            continue;
        }

        let key = key.to_ascii_uppercase();
        if TS_KEYS.contains(&key.as_str()) {
            if let Some(number) = leading_number(value) {
                ts_parameters.insert(key, number);
                continue;
            }
            log::debug!("metadata `{}' is not numeric: `{}'", key, value);
        }
        metadata.insert(key, value.to_string());
    }

    (metadata, ts_parameters)
}

#[derive(Debug, Default)]
struct OpenBlock<'a> {
    name: &'a str,
    pins: Vec<&'a str>,
    params: BTreeMap<String, f64>,
    /// Set once the header reaches `PARAMS:`.
    in_params: bool,
    body: Vec<&'a str>,
    metadata: BTreeMap<String, String>,
    ts_parameters: BTreeMap<String, f64>,
}

impl<'a> OpenBlock<'a> {
    fn header(&mut self, tokens: &[&'a str]) {
        for &token in tokens {
            if is_params_keyword(token) {
                self.in_params = true;
                continue;
            }

            if !self.in_params && !token.contains('=') {
                self.pins.push(token);
                continue;
            }

            let Some((key, value)) = key_value(token) else {
                log::debug!("{}: skipping header token `{}'", self.name, token);
                continue;
            };
            match parse_value(value) {
                Ok(value) => {
                    self.params.insert(key.to_ascii_lowercase(), value);
                }
                Err(e) => log::debug!("{}: skipping parameter `{}': {}", self.name, key, e),
            }
        }
    }

    fn body_line(&mut self, text: &'a str) {
        let text = strip_inline_comment(text).trim();
        if !text.is_empty() {
            self.body.push(text);
        }
    }

    fn finish(self) -> Option<SubcircuitRecord> {
        if self.name.is_empty() || self.pins.is_empty() {
            log::warn!("dropping subcircuit `{}' without name or pins", self.name);
            return None;
        }

        Some(SubcircuitRecord {
            name: self.name.to_string(),
            pins: self.pins.iter().map(|x| x.to_string()).collect(),
            params: self.params,
            body: self.body.join("\n"),
            metadata: self.metadata,
            ts_parameters: self.ts_parameters,
        })
    }
}

/// Collects `.SUBCKT` blocks line by line.
///
/// Comment lines seen outside a block are buffered and mined for metadata by
/// the next `.SUBCKT`. Comment lines inside a block are dropped.
#[derive(Debug, Default)]
pub struct SubcircuitScanner<'a> {
    comments: Vec<&'a str>,
    block: Option<OpenBlock<'a>>,
    subcircuits: Vec<SubcircuitRecord>,
}

impl<'a> SubcircuitScanner<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, line: &SourceLine<'a>) {
        if line.is_directive(".SUBCKT") {
            self.close();
            self.open(line.text);
            return;
        }

        if line.is_directive(".ENDS") {
            self.close();
            self.comments.clear();
            return;
        }

        let Some(block) = &mut self.block else {
            if line.kind == LineKind::Comment {
                let text = comment_text(line.text);
                if !text.is_empty() {
                    self.comments.push(text);
                }
            }
            return;
        };

        match line.kind {
            LineKind::Blank | LineKind::Comment => {}
            LineKind::Continuation => {
                let text = line.continued().unwrap_or_default();
                if block.body.is_empty() {
                    block.header(&header_tokens(text));
                } else {
                    block.body_line(text);
                }
            }
            LineKind::Directive | LineKind::Content => block.body_line(line.text),
        }
    }

    pub fn finish(mut self) -> Vec<SubcircuitRecord> {
        if self.block.is_some() {
            log::debug!("closing subcircuit at end of input without `.ENDS'");
        }
        self.close();
        self.subcircuits
    }

    fn open(&mut self, text: &'a str) {
        let (metadata, ts_parameters) = extract_metadata(&self.comments);
        self.comments.clear();

        let header = header_tokens(text);
        let mut block = OpenBlock {
            name: header.get(1).copied().unwrap_or_default(),
            metadata,
            ts_parameters,
            ..Default::default()
        };
        block.header(header.get(2..).unwrap_or_default());
        self.block = Some(block);
    }

    fn close(&mut self) {
        let Some(block) = self.block.take() else {
            return;
        };
        if let Some(record) = block.finish() {
            log::trace!("collected subcircuit `{}'", record.name);
            self.subcircuits.push(record);
        }
    }
}
