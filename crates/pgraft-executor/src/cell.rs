use serde::{Deserialize, Serialize};

/// A single scalar row value. Only two shapes are ever accepted by INSERT:
/// string literals and 32-bit integer literals; no type coercion beyond
/// these two recognized types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cell {
    Text(String),
    Int32(i32),
}

impl Cell {
    /// The textual form written into a wire-protocol `DataRow`.
    pub fn to_text(&self) -> String {
        match self {
            Cell::Text(s) => s.clone(),
            Cell::Int32(i) => i.to_string(),
        }
    }
}
