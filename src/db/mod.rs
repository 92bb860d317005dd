//! Database context and domain operations.

mod context;
mod courts;
mod devices;
mod history;
mod notifications;
mod statistics;
mod watchlists;

pub use context::DbContext;
pub use courts::CourtSnapshotRow;

/// Renders a unit-variant enum to the same string its `Serialize` impl
/// (and `#[serde(rename_all = ...)]` casing) produces, for storing it as a
/// plain TEXT column instead of the accidental `Debug` spelling.
pub(crate) fn wire_str<T: serde::Serialize>(value: &T) -> String {
    match serde_json::to_value(value).expect("unit-variant enum serialization is infallible") {
        serde_json::Value::String(s) => s,
        other => unreachable!("expected a string-serialized enum, got {other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::model::{AlertType, CaseStatus};

    #[test]
    fn wire_str_uses_serde_casing_not_debug() {
        assert_eq!(wire_str(&CaseStatus::InSession), "IN_SESSION");
        assert_eq!(wire_str(&AlertType::EarlyWarning), "early_warning");
    }
}
