//! Remote filter expression trees.
//!
//! The remote query protocol takes filters as nested JSON arrays: a leaf is
//! `["field", "op", value]`, and combinators are `["and", ...]` /
//! `["or", ...]`. Leaf order inside a combinator is significant for some
//! leaf types (tag vs. free-text precedence), so [`build_filters`] applies
//! its clauses in a fixed, tested order.

use serde_json::{json, Value as JsonValue};

use crate::defaults;
use crate::ids::EntityId;
use crate::query::{QueryDescriptor, QueryKind};

/// Comparison operator of a leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ge,
}

impl CompareOp {
    fn wire(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ge => ">=",
        }
    }
}

/// A filter expression: a comparison leaf or a logical combinator.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterExpr {
    Leaf {
        field: String,
        op: CompareOp,
        value: JsonValue,
    },
    And(Vec<FilterExpr>),
    Or(Vec<FilterExpr>),
}

impl FilterExpr {
    /// Equality leaf.
    pub fn eq(field: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        FilterExpr::Leaf {
            field: field.into(),
            op: CompareOp::Eq,
            value: value.into(),
        }
    }

    /// Greater-or-equal leaf.
    pub fn ge(field: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        FilterExpr::Leaf {
            field: field.into(),
            op: CompareOp::Ge,
            value: value.into(),
        }
    }

    /// Relation leaf: the value is itself a filter expression evaluated
    /// against the related entity (`["developer", "=", ["id", "=", "p8"]]`).
    pub fn relation(field: impl Into<String>, inner: FilterExpr) -> Self {
        FilterExpr::Leaf {
            field: field.into(),
            op: CompareOp::Eq,
            value: inner.to_value(),
        }
    }

    /// Wrap in AND unless there is exactly one expression.
    pub fn all_of(mut exprs: Vec<FilterExpr>) -> Self {
        if exprs.len() == 1 {
            exprs.remove(0)
        } else {
            FilterExpr::And(exprs)
        }
    }

    /// Wrap in OR unless there is exactly one expression.
    pub fn any_of(mut exprs: Vec<FilterExpr>) -> Self {
        if exprs.len() == 1 {
            exprs.remove(0)
        } else {
            FilterExpr::Or(exprs)
        }
    }

    /// Serialize into the wire shape.
    pub fn to_value(&self) -> JsonValue {
        match self {
            FilterExpr::Leaf { field, op, value } => {
                json!([field, op.wire(), value])
            }
            FilterExpr::And(children) => combinator("and", children),
            FilterExpr::Or(children) => combinator("or", children),
        }
    }
}

fn combinator(name: &str, children: &[FilterExpr]) -> JsonValue {
    let mut items = Vec::with_capacity(children.len() + 1);
    items.push(JsonValue::from(name));
    items.extend(children.iter().map(FilterExpr::to_value));
    JsonValue::Array(items)
}

/// OR-of-equality filter over an identifier set, for batch lookups.
pub fn id_batch(ids: &[EntityId]) -> FilterExpr {
    FilterExpr::any_of(
        ids.iter()
            .map(|id| FilterExpr::eq("id", id.as_str()))
            .collect(),
    )
}

/// Build the filter expression for a query descriptor.
///
/// Clause order is a protocol contract:
/// 1. primary clause by kind (tag / developer / free text / default slice)
/// 2. available-language constraint (OR of equalities when multiple)
/// 3. original-language constraint
/// 4. screenshot / description flags, only when set
///
/// A single resulting leaf is returned unwrapped; multiple leaves are
/// wrapped in one AND.
pub fn build_filters(descriptor: &QueryDescriptor) -> FilterExpr {
    let mut clauses = Vec::new();

    match descriptor.kind {
        QueryKind::Tag => {
            if let Some(tag) = &descriptor.tag_id {
                clauses.push(FilterExpr::eq("tag", tag.as_str()));
            }
        }
        QueryKind::Developer => {
            if let Some(dev) = &descriptor.developer_id {
                clauses.push(FilterExpr::relation(
                    "developer",
                    FilterExpr::eq("id", dev.as_str()),
                ));
            }
        }
        QueryKind::Text => {
            let term = descriptor.term.trim();
            if !term.is_empty() {
                clauses.push(FilterExpr::eq("search", term));
            }
        }
    }

    // No primary clause resolved: ask for a cheap ordered slice instead of
    // an unconstrained full scan.
    if clauses.is_empty() {
        clauses.push(FilterExpr::ge("id", defaults::MIN_TITLE_ID));
    }

    let languages: Vec<FilterExpr> = descriptor
        .filters
        .languages
        .iter()
        .map(|code| FilterExpr::eq("lang", code.as_str()))
        .collect();
    if !languages.is_empty() {
        clauses.push(FilterExpr::any_of(languages));
    }

    if let Some(olang) = &descriptor.filters.original_language {
        clauses.push(FilterExpr::eq("olang", olang.as_str()));
    }

    if descriptor.filters.only_with_screenshots {
        clauses.push(FilterExpr::eq("has_screenshot", 1));
    }

    if descriptor.filters.only_with_description {
        clauses.push(FilterExpr::eq("has_description", 1));
    }

    FilterExpr::all_of(clauses)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::EntityKind;
    use crate::query::FilterState;
    use serde_json::json;

    #[test]
    fn test_bare_text_query_is_single_leaf() {
        let d = QueryDescriptor::text("Steins;Gate");
        assert_eq!(
            build_filters(&d).to_value(),
            json!(["search", "=", "Steins;Gate"])
        );
    }

    #[test]
    fn test_text_with_two_languages() {
        let d = QueryDescriptor::text("Steins;Gate").with_filters(
            FilterState::new().with_language("en").with_language("ja"),
        );
        assert_eq!(
            build_filters(&d).to_value(),
            json!([
                "and",
                ["search", "=", "Steins;Gate"],
                ["or", ["lang", "=", "en"], ["lang", "=", "ja"]]
            ])
        );
    }

    #[test]
    fn test_single_language_is_not_wrapped_in_or() {
        let d = QueryDescriptor::text("x")
            .with_filters(FilterState::new().with_language("en"));
        assert_eq!(
            build_filters(&d).to_value(),
            json!(["and", ["search", "=", "x"], ["lang", "=", "en"]])
        );
    }

    #[test]
    fn test_tag_query_precedes_other_clauses() {
        let d = QueryDescriptor::tag(EntityId::normalize(EntityKind::Tag, "g32"))
            .with_filters(FilterState::new().with_language("en"));
        assert_eq!(
            build_filters(&d).to_value(),
            json!(["and", ["tag", "=", "g32"], ["lang", "=", "en"]])
        );
    }

    #[test]
    fn test_developer_query_uses_nested_relation() {
        let d = QueryDescriptor::developer(EntityId::normalize(EntityKind::Producer, "p8"));
        assert_eq!(
            build_filters(&d).to_value(),
            json!(["developer", "=", ["id", "=", "p8"]])
        );
    }

    #[test]
    fn test_empty_term_falls_back_to_default_slice() {
        let d = QueryDescriptor::text("");
        assert_eq!(
            build_filters(&d).to_value(),
            json!(["id", ">=", defaults::MIN_TITLE_ID])
        );
    }

    #[test]
    fn test_whitespace_term_falls_back_to_default_slice() {
        let d = QueryDescriptor::text("   ");
        assert_eq!(
            build_filters(&d).to_value(),
            json!(["id", ">=", defaults::MIN_TITLE_ID])
        );
    }

    #[test]
    fn test_boolean_flags_appended_last() {
        let d = QueryDescriptor::text("x").with_filters(
            FilterState::new()
                .with_original_language("ja")
                .with_screenshots_only(true)
                .with_description_only(true),
        );
        assert_eq!(
            build_filters(&d).to_value(),
            json!([
                "and",
                ["search", "=", "x"],
                ["olang", "=", "ja"],
                ["has_screenshot", "=", 1],
                ["has_description", "=", 1]
            ])
        );
    }

    #[test]
    fn test_flags_absent_when_false() {
        let d = QueryDescriptor::text("x")
            .with_filters(FilterState::new().with_screenshots_only(false));
        assert_eq!(build_filters(&d).to_value(), json!(["search", "=", "x"]));
    }

    #[test]
    fn test_id_batch_single() {
        let ids = vec![EntityId::normalize(EntityKind::Title, "v1")];
        assert_eq!(id_batch(&ids).to_value(), json!(["id", "=", "v1"]));
    }

    #[test]
    fn test_id_batch_multiple() {
        let ids = vec![
            EntityId::normalize(EntityKind::Title, "v1"),
            EntityId::normalize(EntityKind::Title, "v2"),
        ];
        assert_eq!(
            id_batch(&ids).to_value(),
            json!(["or", ["id", "=", "v1"], ["id", "=", "v2"]])
        );
    }
}
