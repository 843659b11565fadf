//! Property-based test generators using proptest.
//!
//! Provides strategies for generating master data that passes the
//! fixture schemas' rules, plus field names and scenario tags.

use crate::fixtures::MAX_TEXT_LEN;
use proptest::prelude::*;

/// A valid master row: `(name, foo, baz)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterRow {
    /// Master `name`.
    pub name: String,
    /// Master `foo`.
    pub foo: String,
    /// Master `baz`.
    pub baz: i64,
}

fn text_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex(&format!("[a-zA-Z0-9 ]{{1,{MAX_TEXT_LEN}}}"))
        .expect("Invalid regex")
        .prop_filter("Text must not be blank", |s| !s.trim().is_empty())
}

/// Strategy for generating master rows that pass validation.
pub fn master_row_strategy() -> impl Strategy<Value = MasterRow> {
    (text_strategy(), text_strategy(), 0i64..100_000)
        .prop_map(|(name, foo, baz)| MasterRow { name, foo, baz })
}

/// Strategy for generating up to `max` master rows.
pub fn master_rows_strategy(max: usize) -> impl Strategy<Value = Vec<MasterRow>> {
    prop::collection::vec(master_row_strategy(), 0..=max)
}

/// Strategy for generating valid field names.
pub fn field_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9_]{0,15}").expect("Invalid regex")
}

/// Strategy for generating scenario tags, the default one included.
pub fn scenario_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("default".to_string()),
        Just("sync".to_string()),
        Just("import".to_string()),
        prop::string::string_regex("[a-z]{1,8}").expect("Invalid regex"),
    ]
}
