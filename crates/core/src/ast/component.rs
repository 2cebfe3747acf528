use std::collections::BTreeMap;

use serde::Serialize;

use crate::{
    lexer::{strip_inline_comment, tokens},
    parse::ValueParseError,
    value::parse_value,
};

/// 元件类型
///
/// Polarity (`npn`, `n`-channel) is only a default, the referenced model
/// decides the real one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    Resistor,
    Capacitor,
    Inductor,
    VoltageSource,
    CurrentSource,
    Diode,
    BjtNpn,
    MosfetN,
    JfetN,
    Subcircuit,
}

impl ComponentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentKind::Resistor => "resistor",
            ComponentKind::Capacitor => "capacitor",
            ComponentKind::Inductor => "inductor",
            ComponentKind::VoltageSource => "voltage_source",
            ComponentKind::CurrentSource => "current_source",
            ComponentKind::Diode => "diode",
            ComponentKind::BjtNpn => "bjt_npn",
            ComponentKind::MosfetN => "mosfet_n",
            ComponentKind::JfetN => "jfet_n",
            ComponentKind::Subcircuit => "subcircuit",
        }
    }
}

impl std::fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// 元件声明
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentRecord {
    /// Full name including the prefix letter, e.g. `R12`.
    pub name: String,
    pub kind: ComponentKind,
    pub nodes: Vec<String>,
    /// Passive and source components.
    pub value: Option<f64>,
    /// Semiconductors and subcircuit instances.
    pub model_ref: Option<String>,
    /// Lower-cased keys, e.g. `ac`, `ic`, `area`.
    pub parameters: BTreeMap<String, f64>,
}

impl ComponentRecord {
    fn new(kind: ComponentKind, name: &str, nodes: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            kind,
            nodes: nodes.iter().map(|x| x.to_string()).collect(),
            value: None,
            model_ref: None,
            parameters: BTreeMap::new(),
        }
    }
}

/// Leading letter of a component line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prefix {
    R,
    C,
    L,
    V,
    I,
    D,
    Q,
    M,
    J,
    X,
}

impl Prefix {
    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'R' => Some(Prefix::R),
            'C' => Some(Prefix::C),
            'L' => Some(Prefix::L),
            'V' => Some(Prefix::V),
            'I' => Some(Prefix::I),
            'D' => Some(Prefix::D),
            'Q' => Some(Prefix::Q),
            'M' => Some(Prefix::M),
            'J' => Some(Prefix::J),
            'X' => Some(Prefix::X),
            _ => None,
        }
    }

    pub fn kind(&self) -> ComponentKind {
        match self {
            Prefix::R => ComponentKind::Resistor,
            Prefix::C => ComponentKind::Capacitor,
            Prefix::L => ComponentKind::Inductor,
            Prefix::V => ComponentKind::VoltageSource,
            Prefix::I => ComponentKind::CurrentSource,
            Prefix::D => ComponentKind::Diode,
            Prefix::Q => ComponentKind::BjtNpn,
            Prefix::M => ComponentKind::MosfetN,
            Prefix::J => ComponentKind::JfetN,
            Prefix::X => ComponentKind::Subcircuit,
        }
    }

    /// Number of nodes; the minimum for `X`.
    pub fn arity(&self) -> usize {
        match self {
            Prefix::R | Prefix::C | Prefix::L | Prefix::V | Prefix::I | Prefix::D => 2,
            Prefix::Q | Prefix::J => 3,
            Prefix::M => 4,
            Prefix::X => 1,
        }
    }

    fn recognize(&self, tokens: &[&str]) -> Result<Option<ComponentRecord>, ValueParseError> {
        match self {
            Prefix::R | Prefix::C | Prefix::L => passive(self.kind(), tokens),
            Prefix::V | Prefix::I => source(self.kind(), tokens),
            Prefix::D | Prefix::Q | Prefix::M | Prefix::J => {
                semiconductor(self.kind(), self.arity(), tokens)
            }
            Prefix::X => subcircuit(tokens),
        }
    }
}

/// Whether the line starts with one of the component letters.
pub fn has_known_prefix(line: &str) -> bool {
    line.trim_start()
        .chars()
        .next()
        .and_then(Prefix::from_char)
        .is_some()
}

/// 识别一行元件声明
///
/// `Ok(None)` means the line has no component shape. A shape whose value
/// token cannot be decoded is an error.
pub fn recognize(line: &str) -> Result<Option<ComponentRecord>, ValueParseError> {
    let tokens = tokens(strip_inline_comment(line));
    let Some(prefix) = tokens
        .first()
        .and_then(|name| name.chars().next())
        .and_then(Prefix::from_char)
    else {
        return Ok(None);
    };

    prefix.recognize(&tokens)
}

/// - `R<name> <(+) node> <(-) node> <value> [<key>=<value>]*`
/// - `C<name> <(+) node> <(-) node> <value> [IC=<initial value>]`
/// - `L<name> <(+) node> <(-) node> <value> [IC=<initial value>]`
///
/// e.g.
///
/// - `RLOAD 15 0 8`
/// - `C2 1 2 .2E-12 IC=1.5V`
/// - `L1 in out 0.05mH`
fn passive(
    kind: ComponentKind,
    tokens: &[&str],
) -> Result<Option<ComponentRecord>, ValueParseError> {
    let [name, node1, node2, value, rest @ ..] = tokens else {
        return Ok(None);
    };

    let mut record = ComponentRecord::new(kind, name, &[*node1, *node2]);
    record.value = Some(parse_value(value)?);
    trailing_params(&mut record, rest);
    Ok(Some(record))
}

/// Independent source 独立源
///
/// - `V<name> <(+) node> <(-) node> [DC] [<value>] [AC <magnitude> [<phase>]]`
/// - `I<name> <(+) node> <(-) node> [DC] [<value>] [AC <magnitude> [<phase>]]`
///
/// A missing value is `0`, a missing AC magnitude too.
///
/// e.g.
///
/// - `VIN 1 0 DC 5 AC 1`
/// - `V1 in 0 AC 2.83`
/// - `I1 0 2 1m`
fn source(
    kind: ComponentKind,
    tokens: &[&str],
) -> Result<Option<ComponentRecord>, ValueParseError> {
    let [name, node1, node2, rest @ ..] = tokens else {
        return Ok(None);
    };

    let mut record = ComponentRecord::new(kind, name, &[*node1, *node2]);

    let rest = match rest {
        [dc, tail @ ..] if dc.eq_ignore_ascii_case("DC") => tail,
        _ => rest,
    };
    let (value, rest) = match rest {
        [value, tail @ ..] if !value.eq_ignore_ascii_case("AC") && !value.contains('=') => {
            (parse_value(value)?, tail)
        }
        _ => (parse_value("")?, rest),
    };
    record.value = Some(value);

    if let Some(index) = rest.iter().position(|x| x.eq_ignore_ascii_case("AC")) {
        let clause = &rest[index + 1..];
        let magnitude = clause.first().copied().unwrap_or_default();
        record.parameters.insert("ac".to_string(), parse_value(magnitude)?);

        if let Some(Ok(phase)) = clause.get(1).map(|x| parse_value(x)) {
            record.parameters.insert("ac_phase".to_string(), phase);
        }
    }

    trailing_params(&mut record, rest);
    Ok(Some(record))
}

/// Semiconductor device 半导体器件
///
/// - `D<name> <(+) node> <(-) node> <model name> [area value]`
/// - `Q<name> <collector node> <base node> <emitter node> <model name> [area value]`
/// - `M<name> <drain node> <gate node> <source node> <bulk node> <model name> [L=<value>] [W=<value>] ...`
/// - `J<name> <drain node> <gate node> <source node> <model name> [area value]`
///
/// e.g.
///
/// - `DCLAMP 14 0 DMOD`
/// - `Q1 c b e 2N3904`
/// - `M1 14 2 13 0 PNOM L=25u W=12u`
/// - `J13 22 14 23 JNOM 2.0`
fn semiconductor(
    kind: ComponentKind,
    arity: usize,
    tokens: &[&str],
) -> Result<Option<ComponentRecord>, ValueParseError> {
    if tokens.len() < arity + 2 {
        return Ok(None);
    }

    let mut record = ComponentRecord::new(kind, tokens[0], &tokens[1..=arity]);
    record.model_ref = Some(tokens[arity + 1].to_string());

    let rest = &tokens[arity + 2..];
    if let Some(area) = rest.first().and_then(|x| parse_value(x).ok()) {
        record.parameters.insert("area".to_string(), area);
    }
    trailing_params(&mut record, rest);
    Ok(Some(record))
}

/// 调用子电路
///
/// - `X<name> [node]* <subcircuit name> [PARAMS: <<name> = <value>>*]`
///
/// e.g.
///
/// - `X1 in out 0 OPAMP`
/// - `XSPK 3 0 WOOFER8 PARAMS: RE=6.2`
fn subcircuit(tokens: &[&str]) -> Result<Option<ComponentRecord>, ValueParseError> {
    let params_at = tokens
        .iter()
        .position(|x| is_params_keyword(x))
        .unwrap_or(tokens.len());
    let (head, params) = tokens.split_at(params_at);

    let [name, nodes @ .., sname] = head else {
        return Ok(None);
    };
    if nodes.is_empty() {
        return Ok(None);
    }

    let mut record = ComponentRecord::new(ComponentKind::Subcircuit, name, nodes);
    record.model_ref = Some(sname.to_string());
    trailing_params(&mut record, params);
    Ok(Some(record))
}

/// `PARAMS:` (or `PARAM:`), case-insensitive.
pub(crate) fn is_params_keyword(token: &str) -> bool {
    token.eq_ignore_ascii_case("PARAMS:") || token.eq_ignore_ascii_case("PARAM:")
}

/// Split `<key>=<value>`.
pub(crate) fn key_value(token: &str) -> Option<(&str, &str)> {
    let (key, value) = token.split_once('=')?;
    if key.is_empty() || value.is_empty() {
        return None;
    }
    Some((key, value))
}

/// Collect `<key>=<value>` tokens. Other tokens are ignored, and so are values
/// that do not decode.
fn trailing_params(record: &mut ComponentRecord, tokens: &[&str]) {
    for token in tokens {
        let Some((key, value)) = key_value(token) else {
            continue;
        };
        match parse_value(value) {
            Ok(value) => {
                record.parameters.insert(key.to_ascii_lowercase(), value);
            }
            Err(e) => log::debug!("{}: skipping parameter `{}': {}", record.name, key, e),
        }
    }
}
