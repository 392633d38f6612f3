use serde::{Deserialize, Serialize};
use stagegrid_core::StageId;

/// A stage or area column of the schedule grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    pub id: StageId,
    pub name: String,
    /// Free-form kind, e.g. `stage` or `area`.
    pub kind: String,
    pub sort_order: i32,
}

impl Stage {
    pub fn new(id: StageId, name: String, kind: String, sort_order: i32) -> Self {
        Self {
            id,
            name,
            kind,
            sort_order,
        }
    }
}
