use std::collections::BTreeMap;

use nom::{
    bytes::complete::{tag_no_case, take_till1, take_while1},
    character::complete::{char, multispace0, multispace1},
    sequence::tuple,
    IResult,
};
use serde::Serialize;

use crate::{
    lexer::{LineKind, SourceLine},
    value::model_value,
};

/// 模型类型
///
/// Raw type tokens outside the table are kept lower-cased in
/// [`ModelType::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ModelType {
    Diode,
    BjtNpn,
    BjtPnp,
    MosfetN,
    MosfetP,
    JfetN,
    JfetP,
    Other(String),
}

impl ModelType {
    pub fn from_token(token: &str) -> Self {
        match &token.to_ascii_uppercase()[..] {
            "D" => ModelType::Diode,
            "NPN" => ModelType::BjtNpn,
            "PNP" => ModelType::BjtPnp,
            "NMOS" => ModelType::MosfetN,
            "PMOS" => ModelType::MosfetP,
            "NJF" | "JFETN" => ModelType::JfetN,
            "PJF" | "JFETP" => ModelType::JfetP,
            _ => ModelType::Other(token.to_ascii_lowercase()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ModelType::Diode => "diode",
            ModelType::BjtNpn => "bjt_npn",
            ModelType::BjtPnp => "bjt_pnp",
            ModelType::MosfetN => "mosfet_n",
            ModelType::MosfetP => "mosfet_p",
            ModelType::JfetN => "jfet_n",
            ModelType::JfetP => "jfet_p",
            ModelType::Other(raw) => raw,
        }
    }
}

impl std::fmt::Display for ModelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

impl Serialize for ModelType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

/// 模型定义
///
/// - `.MODEL <model name> <model type> ( [<parameter name> = <value>]* )`
///
/// e.g.
///
/// - `.MODEL DNOM D (IS=1E-9)`
/// - `.MODEL QDRIV NPN (IS=1E-7 BF=30)`
/// - `.MODEL MLOAD NMOS(LEVEL=1 VTO=.7 CJ=.02pF)`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelRecord {
    pub model_name: String,
    pub model_type: ModelType,
    /// Upper-cased keys.
    pub parameters: BTreeMap<String, f64>,
}

/// Strip the `+` marker and the `*` comment of one model line.
fn clean(line: &str) -> &str {
    let line = line.trim();
    let line = line.strip_prefix('+').unwrap_or(line);
    match line.find('*') {
        Some(index) => line[..index].trim(),
        None => line.trim(),
    }
}

/// `.MODEL <name> <type> (`. The closing `)` is handled by the caller.
fn header(input: &str) -> IResult<&str, (&str, &str)> {
    let (input, (_, _, name, _, ty, _, _)) = tuple((
        tag_no_case(".MODEL"),
        multispace1,
        take_till1(|c: char| c.is_whitespace() || c == '('),
        multispace1,
        take_while1(|c: char| c.is_alphanumeric() || c == '_'),
        multispace0,
        char('('),
    ))(input)?;
    Ok((input, (name, ty)))
}

fn param(input: &str) -> IResult<&str, (&str, f64)> {
    let (input, (key, _, _, _, value)) = tuple((
        take_while1(|c: char| c.is_alphanumeric() || c == '_'),
        multispace0,
        char('='),
        multispace0,
        model_value,
    ))(input)?;
    Ok((input, (key, value)))
}

fn is_separator(c: char) -> bool {
    c.is_whitespace() || c == ','
}

/// Skip to the next separator, always making progress.
fn skip_token(input: &str) -> &str {
    let end = match input.find(is_separator) {
        Some(0) => input.chars().next().map_or(0, char::len_utf8),
        Some(end) => end,
        None => input.len(),
    };
    &input[end..]
}

/// Scan `<key>=<value>` pairs. Anything that does not look like one is
/// skipped.
fn params(body: &str) -> BTreeMap<String, f64> {
    let mut params = BTreeMap::new();
    let mut input = body;

    loop {
        input = input.trim_start_matches(is_separator);
        if input.is_empty() {
            break;
        }

        match param(input) {
            Ok((rest, (key, value))) => {
                params.insert(key.to_ascii_uppercase(), value);
                input = rest;
            }
            Err(_) => input = skip_token(input),
        }
    }

    params
}

/// 解析 `.MODEL` 语句
///
/// `lines` is the opening line plus its continuation lines. Returns `None`
/// when the statement does not have the `.MODEL <name> <type> (...)` shape.
pub fn parse_model<S: AsRef<str>>(lines: &[S]) -> Option<ModelRecord> {
    let statement = lines
        .iter()
        .map(|x| clean(x.as_ref()))
        .filter(|x| !x.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    let (body, (name, ty)) = header(&statement).ok()?;
    let body = body.trim_end();
    let body = body.strip_suffix(')').unwrap_or(body);

    Some(ModelRecord {
        model_name: name.to_string(),
        model_type: ModelType::from_token(ty),
        parameters: params(body),
    })
}

#[derive(Debug)]
enum State<'a> {
    Normal,
    /// Lines of the `.MODEL` statement collected so far.
    InModel(Vec<&'a str>),
}

/// Collects `.MODEL` statements line by line.
///
/// [`ModelScanner::feed`] returns whether the line was consumed. A line that
/// closes an unterminated statement is not consumed, the caller handles it in
/// the `Normal` state.
#[derive(Debug)]
pub struct ModelScanner<'a> {
    state: State<'a>,
    models: Vec<ModelRecord>,
}

impl<'a> ModelScanner<'a> {
    pub fn new() -> Self {
        Self {
            state: State::Normal,
            models: Vec::new(),
        }
    }

    pub fn feed(&mut self, line: &SourceLine<'a>) -> bool {
        if line.is_directive(".MODEL") {
            self.flush();
            self.state = State::InModel(vec![line.text]);
            return true;
        }

        let State::InModel(buffer) = &mut self.state else {
            return false;
        };

        match line.kind {
            LineKind::Comment => true,
            LineKind::Blank => {
                self.flush();
                true
            }
            LineKind::Continuation => {
                buffer.push(line.text);
                true
            }
            _ if line.text.ends_with(')') => {
                if line.text != ")" {
                    buffer.push(line.text);
                } else if !buffer.last().is_some_and(|x| clean(x).ends_with(')')) {
                    buffer.push("+ )");
                }
                self.flush();
                true
            }
            _ => {
                self.flush();
                false
            }
        }
    }

    pub fn finish(mut self) -> Vec<ModelRecord> {
        self.flush();
        self.models
    }

    fn flush(&mut self) {
        let State::InModel(lines) = std::mem::replace(&mut self.state, State::Normal) else {
            return;
        };

        match parse_model(&lines) {
            Some(model) => {
                log::trace!("collected model `{}' ({})", model.model_name, model.model_type);
                self.models.push(model);
            }
            None => log::warn!("skipping malformed model statement `{}'", lines[0]),
        }
    }
}

impl Default for ModelScanner<'_> {
    fn default() -> Self {
        Self::new()
    }
}
