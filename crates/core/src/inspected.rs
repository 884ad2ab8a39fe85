// SPDX-License-Identifier: MIT

use crate::element_kind::ElementKind;
use crate::node::NodeId;
use crate::value::Value;

/// One entry in an inspected element's hooks list.
#[derive(Debug, Clone, PartialEq)]
pub struct Hook {
    pub name: String,
    pub value: Value,
    pub sub_hooks: Option<Vec<Hook>>,
}

/// The cleaned result of an `inspectElement` round-trip (see
/// `rdt-bridge`'s inspect correlation and dehydration cleaning).
#[derive(Debug, Clone, PartialEq)]
pub struct InspectedElement {
    pub id: NodeId,
    pub display_name: String,
    pub kind: ElementKind,
    pub key: Option<String>,
    pub props: Vec<(String, Value)>,
    pub state: Option<Vec<(String, Value)>>,
    pub hooks: Vec<Hook>,
    pub rendered_at: Option<i64>,
}
