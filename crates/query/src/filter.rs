//! Filter model and the filter-expression compiler.
//!
//! A filter is an insertion-ordered [`FilterMap`] from field name to
//! [`FilterValue`]. The compiler renders it into the wire grammar:
//!
//! | Value | Wire form |
//! |-------|-----------|
//! | scalar | `field:value` |
//! | array | `field:a\|b` |
//! | OR | `field:a\|b` |
//! | NOT | `field:!value` |
//! | GT | `field:>value` |
//! | LT | `field:<value` |
//! | nested map | `field.sub:value,field.other:value` |
//!
//! Clauses for distinct keys are joined with `,` (logical AND). A nested
//! value more than one level deep is rejected with
//! [`QueryError::FilterShape`].

use serde_json::Value;

use crate::errors::QueryError;

// ---------------------------------------------------------------------------
// Scalars and operands
// ---------------------------------------------------------------------------

/// A single filter value. Renders by plain string coercion.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl std::fmt::Display for Scalar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Str(s) => f.write_str(s),
        }
    }
}

/// What a [`LogicalExpression`] wraps: one scalar or a list of scalars.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    One(Scalar),
    Many(Vec<Scalar>),
}

impl std::fmt::Display for Operand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::One(scalar) => write!(f, "{scalar}"),
            Self::Many(values) => f.write_str(&join_alternatives(values)),
        }
    }
}

fn join_alternatives(values: &[Scalar]) -> String {
    values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("|")
}

// ---------------------------------------------------------------------------
// Logical expressions
// ---------------------------------------------------------------------------

/// How a wrapped value combines when rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalOp {
    /// Alternatives joined by `|`, no prefix.
    Or,
    /// Negation, prefixed `!`.
    Not,
    /// Greater-than, prefixed `>`.
    Gt,
    /// Less-than, prefixed `<`.
    Lt,
}

impl LogicalOp {
    fn prefix(self) -> &'static str {
        match self {
            Self::Or => "",
            Self::Not => "!",
            Self::Gt => ">",
            Self::Lt => "<",
        }
    }
}

/// A typed wrapper marking how a filter value is rendered.
///
/// Constructors only accept an [`Operand`], so an expression can never wrap
/// another expression.
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalExpression {
    op: LogicalOp,
    operand: Operand,
}

impl LogicalExpression {
    pub fn new(op: LogicalOp, operand: impl Into<Operand>) -> Self {
        Self {
            op,
            operand: operand.into(),
        }
    }

    /// `or([100, 200])` renders as `100|200`.
    pub fn or(operand: impl Into<Operand>) -> Self {
        Self::new(LogicalOp::Or, operand)
    }

    /// `not(100)` renders as `!100`.
    pub fn not(operand: impl Into<Operand>) -> Self {
        Self::new(LogicalOp::Not, operand)
    }

    /// `gt(100)` renders as `>100`.
    pub fn gt(operand: impl Into<Operand>) -> Self {
        Self::new(LogicalOp::Gt, operand)
    }

    /// `lt(100)` renders as `<100`.
    pub fn lt(operand: impl Into<Operand>) -> Self {
        Self::new(LogicalOp::Lt, operand)
    }

    pub fn op(&self) -> LogicalOp {
        self.op
    }

    pub fn operand(&self) -> &Operand {
        &self.operand
    }
}

impl std::fmt::Display for LogicalExpression {
    // A prefix applies once to the whole `|`-joined list.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.op.prefix(), self.operand)
    }
}

// ---------------------------------------------------------------------------
// Filter values and maps
// ---------------------------------------------------------------------------

/// The value stored under one filter key.
///
/// `Nested` is recursive so that dynamically built filters can be
/// represented faithfully; only one level of nesting compiles.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Scalar(Scalar),
    Array(Vec<Scalar>),
    Logical(LogicalExpression),
    Nested(FilterMap),
}

impl From<LogicalExpression> for FilterValue {
    fn from(expr: LogicalExpression) -> Self {
        Self::Logical(expr)
    }
}

impl From<FilterMap> for FilterValue {
    fn from(map: FilterMap) -> Self {
        Self::Nested(map)
    }
}

impl From<Scalar> for FilterValue {
    fn from(scalar: Scalar) -> Self {
        Self::Scalar(scalar)
    }
}

impl From<Vec<Scalar>> for FilterValue {
    fn from(values: Vec<Scalar>) -> Self {
        Self::Array(values)
    }
}

impl From<Scalar> for Operand {
    fn from(scalar: Scalar) -> Self {
        Self::One(scalar)
    }
}

impl From<Vec<Scalar>> for Operand {
    fn from(values: Vec<Scalar>) -> Self {
        Self::Many(values)
    }
}

// Generates From<$ty> and From<Vec<$ty>> for Scalar, Operand and FilterValue.
macro_rules! scalar_conversions {
    ($($ty:ty => |$v:ident| $body:expr;)*) => {
        $(
            impl From<$ty> for Scalar {
                fn from($v: $ty) -> Self {
                    $body
                }
            }

            impl From<$ty> for Operand {
                fn from(value: $ty) -> Self {
                    Self::One(Scalar::from(value))
                }
            }

            impl From<Vec<$ty>> for Operand {
                fn from(values: Vec<$ty>) -> Self {
                    Self::Many(values.into_iter().map(Scalar::from).collect())
                }
            }

            impl From<$ty> for FilterValue {
                fn from(value: $ty) -> Self {
                    Self::Scalar(Scalar::from(value))
                }
            }

            impl From<Vec<$ty>> for FilterValue {
                fn from(values: Vec<$ty>) -> Self {
                    Self::Array(values.into_iter().map(Scalar::from).collect())
                }
            }
        )*
    };
}

scalar_conversions! {
    bool => |v| Scalar::Bool(v);
    i32 => |v| Scalar::Int(i64::from(v));
    i64 => |v| Scalar::Int(v);
    u32 => |v| Scalar::Int(i64::from(v));
    f64 => |v| Scalar::Float(v);
    &str => |v| Scalar::Str(v.to_owned());
    String => |v| Scalar::Str(v);
}

/// An insertion-ordered map of filter entries.
///
/// Inserting an existing key replaces its value in place, so the key keeps
/// its original position in the compiled output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterMap {
    entries: Vec<(String, FilterValue)>,
}

impl FilterMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Inserts or overwrites `key`.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<FilterValue>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Inserts every entry of `other`; later entries win.
    pub fn merge(&mut self, other: FilterMap) {
        for (key, value) in other.entries {
            self.insert(key, value);
        }
    }

    pub fn get(&self, key: &str) -> Option<&FilterValue> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FilterValue)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Wraps every leaf that is not already a [`LogicalExpression`] in `op`.
    ///
    /// Leaves of a one-level nested map are wrapped too. A map nested deeper
    /// is left as is so the compiler still rejects it.
    #[must_use]
    pub fn wrap_leaves(self, op: LogicalOp) -> Self {
        let entries = self
            .entries
            .into_iter()
            .map(|(key, value)| {
                let value = match value {
                    FilterValue::Nested(inner) => FilterValue::Nested(FilterMap {
                        entries: inner
                            .entries
                            .into_iter()
                            .map(|(sub_key, sub_value)| (sub_key, wrap_leaf(sub_value, op)))
                            .collect(),
                    }),
                    other => wrap_leaf(other, op),
                };
                (key, value)
            })
            .collect();
        Self { entries }
    }
}

fn wrap_leaf(value: FilterValue, op: LogicalOp) -> FilterValue {
    match value {
        FilterValue::Scalar(scalar) => LogicalExpression::new(op, scalar).into(),
        FilterValue::Array(values) => LogicalExpression::new(op, values).into(),
        already @ (FilterValue::Logical(_) | FilterValue::Nested(_)) => already,
    }
}

impl<K, V> FromIterator<(K, V)> for FilterMap
where
    K: Into<String>,
    V: Into<FilterValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = FilterMap::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

impl TryFrom<Value> for FilterMap {
    type Error = QueryError;

    /// Interprets a JSON object as a filter. Objects at any depth become
    /// [`FilterValue::Nested`]; arrays must contain only scalars.
    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(object) => object
                .into_iter()
                .map(|(key, value)| {
                    let converted = filter_value_from_json(&key, value)?;
                    Ok::<_, QueryError>((key, converted))
                })
                .collect(),
            other => Err(QueryError::InvalidFilter {
                message: format!("expected a JSON object, found {other}"),
            }),
        }
    }
}

fn filter_value_from_json(key: &str, value: Value) -> Result<FilterValue, QueryError> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .map(|item| {
                scalar_from_json(item).ok_or_else(|| QueryError::InvalidFilter {
                    message: format!("array under '{key}' may only contain scalars"),
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(FilterValue::Array),
        Value::Object(_) => FilterMap::try_from(value).map(FilterValue::Nested),
        scalar => scalar_from_json(scalar)
            .map(FilterValue::Scalar)
            .ok_or_else(|| QueryError::InvalidFilter {
                message: format!("unsupported value under '{key}'"),
            }),
    }
}

fn scalar_from_json(value: Value) -> Option<Scalar> {
    match value {
        Value::Null => Some(Scalar::Null),
        Value::Bool(b) => Some(Scalar::Bool(b)),
        Value::Number(n) => n
            .as_i64()
            .map(Scalar::Int)
            .or_else(|| n.as_f64().map(Scalar::Float)),
        Value::String(s) => Some(Scalar::Str(s)),
        Value::Array(_) | Value::Object(_) => None,
    }
}

// ---------------------------------------------------------------------------
// Compiler
// ---------------------------------------------------------------------------

/// Renders a filter map into its `field:value` clauses, in key order.
///
/// A one-level nested map contributes one `key.sub:value` clause per
/// sub-key; an empty nested map contributes nothing.
pub fn compile_clauses(filter: &FilterMap) -> Result<Vec<String>, QueryError> {
    let mut clauses = Vec::with_capacity(filter.len());
    for (key, value) in filter.iter() {
        match value {
            FilterValue::Nested(inner) => {
                for (sub_key, sub_value) in inner.iter() {
                    let path = format!("{key}.{sub_key}");
                    match render_leaf(sub_value) {
                        Some(rendered) => clauses.push(format!("{path}:{rendered}")),
                        None => return Err(QueryError::FilterShape { path }),
                    }
                }
            }
            leaf => {
                if let Some(rendered) = render_leaf(leaf) {
                    clauses.push(format!("{key}:{rendered}"));
                }
            }
        }
    }
    Ok(clauses)
}

/// Compiles a filter map into the wire `filter` parameter.
///
/// Returns `Ok(None)` when the map yields no clauses.
pub fn compile_filter(filter: &FilterMap) -> Result<Option<String>, QueryError> {
    let clauses = compile_clauses(filter)?;
    if clauses.is_empty() {
        return Ok(None);
    }
    let compiled = clauses.join(",");
    tracing::debug!(filter = %compiled, "Constructed filter");
    Ok(Some(compiled))
}

fn render_leaf(value: &FilterValue) -> Option<String> {
    match value {
        FilterValue::Scalar(scalar) => Some(scalar.to_string()),
        FilterValue::Array(values) => Some(join_alternatives(values)),
        FilterValue::Logical(expr) => Some(expr.to_string()),
        FilterValue::Nested(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn logical_renderers() {
        assert_eq!(LogicalExpression::or(vec![100, 200]).to_string(), "100|200");
        assert_eq!(LogicalExpression::not(100).to_string(), "!100");
        assert_eq!(LogicalExpression::gt(100).to_string(), ">100");
        assert_eq!(LogicalExpression::lt(100).to_string(), "<100");
        assert_eq!(LogicalExpression::or("us").to_string(), "us");
    }

    #[test]
    fn prefix_applies_once_to_a_list() {
        assert_eq!(LogicalExpression::not(vec!["us", "ca"]).to_string(), "!us|ca");
    }

    #[test]
    fn scalars_render_by_string_coercion() {
        let filter = FilterMap::new()
            .with("publication_year", 2020)
            .with("is_oa", true)
            .with("score", 0.5)
            .with("type", "article");
        assert_eq!(
            compile_filter(&filter).unwrap().as_deref(),
            Some("publication_year:2020,is_oa:true,score:0.5,type:article")
        );
    }

    #[test]
    fn arrays_join_with_pipe() {
        let filter = FilterMap::new().with("type", vec!["article", "book"]);
        assert_eq!(compile_filter(&filter).unwrap().as_deref(), Some("type:article|book"));
    }

    #[test]
    fn one_level_nesting_renders_dotted_clauses() {
        let filter = FilterMap::new().with(
            "authorships",
            FilterMap::new()
                .with("institutions", LogicalExpression::not("I1"))
                .with("countries", vec!["us", "gb"]),
        );
        assert_eq!(
            compile_filter(&filter).unwrap().as_deref(),
            Some("authorships.institutions:!I1,authorships.countries:us|gb")
        );
    }

    #[test]
    fn two_levels_of_nesting_is_rejected_with_path() {
        let filter = FilterMap::try_from(json!({ "a": { "b": { "c": 1 } } })).unwrap();
        assert_eq!(
            compile_filter(&filter),
            Err(QueryError::FilterShape { path: "a.b".into() })
        );
    }

    #[test]
    fn overwrite_keeps_original_position() {
        let mut filter = FilterMap::new().with("a", 1).with("b", 2);
        filter.insert("a", 3);
        assert_eq!(compile_filter(&filter).unwrap().as_deref(), Some("a:3,b:2"));
    }

    #[test]
    fn empty_filter_compiles_to_nothing() {
        assert_eq!(compile_filter(&FilterMap::new()).unwrap(), None);
        let only_empty_nested = FilterMap::new().with("a", FilterMap::new());
        assert_eq!(compile_filter(&only_empty_nested).unwrap(), None);
    }

    #[test]
    fn wrap_leaves_passes_existing_expressions_through() {
        let filter = FilterMap::new()
            .with("cited_by_count", 10)
            .with("publication_year", LogicalExpression::lt(2000))
            .with("authorships", FilterMap::new().with("countries", vec!["us", "gb"]))
            .wrap_leaves(LogicalOp::Gt);
        assert_eq!(
            compile_filter(&filter).unwrap().as_deref(),
            Some("cited_by_count:>10,publication_year:<2000,authorships.countries:>us|gb")
        );
    }

    #[test]
    fn wrap_leaves_leaves_deep_nesting_for_the_compiler() {
        let filter = FilterMap::try_from(json!({ "a": { "b": { "c": 1 } } }))
            .unwrap()
            .wrap_leaves(LogicalOp::Or);
        assert!(matches!(
            compile_filter(&filter),
            Err(QueryError::FilterShape { .. })
        ));
    }

    #[test]
    fn json_filters_keep_caller_key_order() {
        let filter = FilterMap::try_from(json!({
            "publication_year": 2020,
            "is_oa": true,
            "authorships": { "institutions": "I1", "countries": "us" },
        }))
        .unwrap();
        assert_eq!(
            compile_filter(&filter).unwrap().as_deref(),
            Some("publication_year:2020,is_oa:true,authorships.institutions:I1,authorships.countries:us")
        );
    }

    #[test]
    fn json_arrays_of_objects_are_invalid() {
        let result = FilterMap::try_from(json!({ "a": [{ "b": 1 }] }));
        assert!(matches!(result, Err(QueryError::InvalidFilter { .. })));
        assert!(matches!(
            FilterMap::try_from(json!([1, 2])),
            Err(QueryError::InvalidFilter { .. })
        ));
    }
}
