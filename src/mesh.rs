use serde::{Deserialize, Serialize};

use crate::util::u64_from_number_or_string;

/// One entry of the `/api/meshes` catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mesh {
    pub name: String,
    #[serde(deserialize_with = "u64_from_number_or_string")]
    pub nodes: u64,
    #[serde(deserialize_with = "u64_from_number_or_string")]
    pub elements: u64,
}

pub fn find<'a>(meshes: &'a [Mesh], name: &str) -> Option<&'a Mesh> {
    meshes.iter().find(|m| m.name == name)
}

/// Fixed-width table of name, node count and element count.
pub fn render_table(meshes: &[Mesh]) -> String {
    let width = meshes
        .iter()
        .map(|m| m.name.len())
        .chain(std::iter::once("NAME".len()))
        .max()
        .unwrap_or(4);

    let mut out = format!("{:<width$}  {:>12}  {:>12}\n", "NAME", "NODES", "ELEMENTS");
    for m in meshes {
        out.push_str(&format!(
            "{:<width$}  {:>12}  {:>12}\n",
            m.name, m.nodes, m.elements
        ));
    }
    out
}
