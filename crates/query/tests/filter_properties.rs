//! Property-based tests for the filter compiler and the item codec.
//!
//! Run with: `cargo test -p query --test filter_properties`

use std::collections::HashSet;

use proptest::prelude::*;
use serde_json::{json, Value};

use query::{
    codec, compile_clauses, compile_filter, FilterMap, FilterValue, LogicalExpression, LogicalOp,
    QueryError,
};

// =============================================================================
// Strategies
// =============================================================================

#[derive(Debug, Clone)]
enum Leaf {
    Int(i64),
    Text(String),
    Ints(Vec<i64>),
    Logical(LogicalOp, i64),
}

impl Leaf {
    fn expected(&self) -> String {
        match self {
            Leaf::Int(n) => n.to_string(),
            Leaf::Text(s) => s.clone(),
            Leaf::Ints(ns) => ns.iter().map(i64::to_string).collect::<Vec<_>>().join("|"),
            Leaf::Logical(op, n) => {
                let prefix = match op {
                    LogicalOp::Or => "",
                    LogicalOp::Not => "!",
                    LogicalOp::Gt => ">",
                    LogicalOp::Lt => "<",
                };
                format!("{prefix}{n}")
            }
        }
    }

    fn value(&self) -> FilterValue {
        match self {
            Leaf::Int(n) => FilterValue::from(*n),
            Leaf::Text(s) => FilterValue::from(s.as_str()),
            Leaf::Ints(ns) => FilterValue::from(ns.clone()),
            Leaf::Logical(op, n) => LogicalExpression::new(*op, *n).into(),
        }
    }
}

fn op_strategy() -> impl Strategy<Value = LogicalOp> {
    prop_oneof![
        Just(LogicalOp::Or),
        Just(LogicalOp::Not),
        Just(LogicalOp::Gt),
        Just(LogicalOp::Lt),
    ]
}

fn leaf_strategy() -> impl Strategy<Value = Leaf> {
    prop_oneof![
        any::<i64>().prop_map(Leaf::Int),
        "[a-z0-9]{1,8}".prop_map(Leaf::Text),
        prop::collection::vec(any::<i64>(), 1..5).prop_map(Leaf::Ints),
        (op_strategy(), any::<i64>()).prop_map(|(op, n)| Leaf::Logical(op, n)),
    ]
}

/// Distinct keys in generation order, so unsorted orders are exercised too.
fn filter_strategy() -> impl Strategy<Value = Vec<(String, Leaf)>> {
    prop::collection::vec(("[a-z_]{1,10}", leaf_strategy()), 1..8).prop_map(|entries| {
        let mut seen = HashSet::new();
        entries
            .into_iter()
            .filter(|(key, _)| seen.insert(key.clone()))
            .collect()
    })
}

/// Arbitrary JSON without floats (float text round-trips are best-effort).
fn item_strategy() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| Value::Number(n.into())),
        ".*".prop_map(Value::String),
    ];
    leaf.prop_recursive(4, 64, 8, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..8).prop_map(Value::Array),
            prop::collection::hash_map("[a-z_]{1,8}", inner, 0..8)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

// =============================================================================
// Compiler properties
// =============================================================================

proptest! {
    /// One clause per key, in key order, with the right-hand side of the
    /// value's renderer.
    #[test]
    fn one_clause_per_key_in_order(entries in filter_strategy()) {
        let filter: FilterMap = entries
            .iter()
            .map(|(key, leaf)| (key.clone(), leaf.value()))
            .collect();

        let clauses = compile_clauses(&filter).unwrap();
        prop_assert_eq!(clauses.len(), entries.len());
        for (clause, (key, leaf)) in clauses.iter().zip(&entries) {
            prop_assert_eq!(clause, &format!("{}:{}", key, leaf.expected()));
        }
        prop_assert_eq!(compile_filter(&filter).unwrap(), Some(clauses.join(",")));
    }

    /// Objects decoded from JSON keep the caller's key order.
    #[test]
    fn json_objects_keep_key_order(entries in filter_strategy()) {
        let object: serde_json::Map<String, Value> = entries
            .iter()
            .enumerate()
            .map(|(position, (key, _))| (key.clone(), json!(position)))
            .collect();
        let filter = FilterMap::try_from(Value::Object(object)).unwrap();

        let keys: Vec<&str> = filter.iter().map(|(key, _)| key).collect();
        let expected: Vec<&str> = entries.iter().map(|(key, _)| key.as_str()).collect();
        prop_assert_eq!(keys, expected);
    }

    /// Wrapping never touches an existing expression.
    #[test]
    fn wrapping_passes_expressions_through(op in op_strategy(), wrap in op_strategy(), n in any::<i64>()) {
        let original = LogicalExpression::new(op, n);
        let wrapped = FilterMap::new().with("k", original.clone()).wrap_leaves(wrap);
        prop_assert_eq!(wrapped.get("k"), Some(&FilterValue::Logical(original)));
    }

    /// Two levels of nesting is always rejected, whatever the leaf.
    #[test]
    fn deep_nesting_is_rejected(outer in "[a-z]{1,6}", inner in "[a-z]{1,6}", n in any::<i64>()) {
        let filter = FilterMap::try_from(json!({ outer.clone(): { inner.clone(): { "c": n } } })).unwrap();
        prop_assert_eq!(
            compile_filter(&filter),
            Err(QueryError::FilterShape { path: format!("{outer}.{inner}") })
        );
    }
}

// =============================================================================
// Codec properties
// =============================================================================

proptest! {
    #[test]
    fn item_round_trips(item in item_strategy()) {
        let text = codec::serialize(&item).unwrap();
        prop_assert_eq!(codec::deserialize::<Value>(&text).unwrap(), item);
    }

    #[test]
    fn item_array_round_trips(items in prop::collection::vec(item_strategy(), 0..6)) {
        let text = codec::serialize(&items).unwrap();
        prop_assert_eq!(codec::deserialize::<Vec<Value>>(&text).unwrap(), items);
    }
}

#[test]
fn documented_renderings() {
    assert_eq!(LogicalExpression::or(vec![100, 200]).to_string(), "100|200");
    assert_eq!(LogicalExpression::not(100).to_string(), "!100");
    assert_eq!(LogicalExpression::gt(100).to_string(), ">100");
    assert_eq!(LogicalExpression::lt(100).to_string(), "<100");
}
