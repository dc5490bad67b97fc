//! Persistence-aware domain entities.
//!
//! Every function takes the pool it should use; the models never hold or
//! reach for a shared handle. Row structs serialize with their snake_case
//! column names and are converted to camelCase JSON payloads (timestamps
//! normalized to ISO 8601) right before they leave the process.

mod subtodo;
mod todo;

use serde::Serialize;
use serde_json::Value;

use crate::support::{case, datetime};

pub use subtodo::{SubTodo, SubTodoProps};
pub use todo::{Todo, TodoProps, TodoUpdate};

/// Status value for open entities.
pub const STATUS_INCOMPLETE: &str = "incomplete";

/// Status value for finished entities.
pub const STATUS_COMPLETE: &str = "complete";

/// Columns valid in ORDER BY clauses, shared by both entities.
const SORT_COLUMNS: &[&str] = &[
    "id",
    "title",
    "status",
    "created_at",
    "edited_at",
    "completed_at",
];

/// Map a camelCase `sortBy` parameter to a whitelisted column name.
///
/// Identifiers are spliced into SQL, so anything outside the whitelist is
/// rejected here rather than bound.
pub fn sort_column(name: &str) -> Option<String> {
    let column = case::camel_to_snake(name);
    SORT_COLUMNS.contains(&column.as_str()).then_some(column)
}

/// List query options shared by both entities.
#[derive(Debug, Default, Clone)]
pub struct ListFilter {
    /// Restrict to a status value.
    pub status: Option<String>,
    /// Validated snake_case sort column (see [`sort_column`]).
    pub sort_by: Option<String>,
    /// Sort descending instead of ascending.
    pub descending: bool,
}

impl ListFilter {
    /// The ORDER BY fragment for this filter.
    fn order_clause(&self) -> String {
        let column = self.sort_by.as_deref().unwrap_or("id");
        let direction = if self.descending { "DESC" } else { "ASC" };
        format!(" ORDER BY {} {}", column, direction)
    }
}

/// Convert a row to its JSON payload form: camelCase keys, ISO 8601
/// timestamps.
pub(crate) fn row_payload<T: Serialize>(row: &T) -> Value {
    let mut value = serde_json::to_value(row).unwrap_or(Value::Null);

    if let Value::Object(map) = &mut value {
        for key in ["created_at", "edited_at", "completed_at"] {
            if let Some(Value::String(ts)) = map.get_mut(key) {
                *ts = datetime::to_iso8601(ts);
            }
        }
    }

    case::camelize_value(value)
}
