//! 解析结果
//!
//! Plain value records. Everything here is created by a single parse call and
//! then owned by the caller.

use serde::Serialize;

use component::ComponentRecord;
use model::ModelRecord;
use subckt::SubcircuitRecord;

pub mod component;
pub mod model;
pub mod subckt;

/// Result of parsing a netlist.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParsedNetlist {
    /// Free text from an unparsable first line, see [`crate::parse_netlist`].
    pub title: Option<String>,
    pub components: Vec<ComponentRecord>,
    pub models: Vec<ModelRecord>,
}

/// Result of parsing a library file.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParsedLibrary {
    pub models: Vec<ModelRecord>,
    pub subcircuits: Vec<SubcircuitRecord>,
}

impl ParsedLibrary {
    /// 按名称查找模型（忽略大小写）
    pub fn model(&self, name: &str) -> Option<&ModelRecord> {
        self.models
            .iter()
            .find(|x| x.model_name.eq_ignore_ascii_case(name))
    }

    /// 按名称查找子电路（忽略大小写）
    pub fn subcircuit(&self, name: &str) -> Option<&SubcircuitRecord> {
        self.subcircuits
            .iter()
            .find(|x| x.name.eq_ignore_ascii_case(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_records_are_send_sync() {
        is_send_sync::<ParsedNetlist>();
        is_send_sync::<ParsedLibrary>();
    }

    #[test]
    fn test_library_lookup_ignores_case() {
        let library = crate::parse_library(".MODEL D1N4148 D(IS=2.52n)\n.SUBCKT woofer 1 2\nR1 1 2 6\n.ENDS\n");
        assert!(library.model("d1n4148").is_some());
        assert!(library.subcircuit("WOOFER").is_some());
        assert!(library.model("missing").is_none());
    }
}
