//! Filter DTOs - espressioni di filtro ricorsive e ordinamenti
//!
//! Un filtro è un albero: le foglie sono [`Operation`] (campo, operatore, valore),
//! i nodi interni sono [`BooleanExpression`] che combinano i figli in AND/OR.
//! La traduzione in SQL vive in `repositories::filter`.

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    #[serde(rename = "eq")]
    Equals,
    #[serde(rename = "ne")]
    NotEquals,
    #[serde(rename = "lt")]
    LessThan,
    #[serde(rename = "gt")]
    GreaterThan,
    #[serde(rename = "lte")]
    LessThanOrEqual,
    #[serde(rename = "gte")]
    GreaterThanOrEqual,
    #[serde(rename = "in")]
    In,
    #[serde(rename = "nin")]
    NotIn,
    #[serde(rename = "ina")]
    EveryElementInArray,
    #[serde(rename = "nina")]
    NotEveryElementInArray,
    #[serde(rename = "contains")]
    Contains,
    #[serde(rename = "ncontains")]
    NotContains,
    #[serde(rename = "containss")]
    ContainsCaseSensitive,
    #[serde(rename = "ncontainss")]
    NotContainsCaseSensitive,
    #[serde(rename = "between")]
    Between,
    #[serde(rename = "nbetween")]
    NotBetween,
    #[serde(rename = "null")]
    Null,
    #[serde(rename = "nnull")]
    NotNull,
    #[serde(rename = "startswith")]
    StartsWith,
    #[serde(rename = "nstartswith")]
    NotStartsWith,
    #[serde(rename = "startswiths")]
    StartsWithCaseSensitive,
    #[serde(rename = "nstartswiths")]
    NotStartsWithCaseSensitive,
    #[serde(rename = "endswith")]
    EndsWith,
    #[serde(rename = "nendswith")]
    NotEndsWith,
    #[serde(rename = "endswiths")]
    EndsWithCaseSensitive,
    #[serde(rename = "nendswiths")]
    NotEndsWithCaseSensitive,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BooleanOperator {
    Or,
    And,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// Valore scalare confrontabile con una colonna
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

/// Valore di una foglia: niente (per null/nnull), uno scalare, o una lista (in/nin/between)
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(untagged)]
pub enum FilterValue {
    List(Vec<Scalar>),
    One(Scalar),
    #[default]
    Null,
}

impl FilterValue {
    pub fn list<T: Into<Scalar>>(values: impl IntoIterator<Item = T>) -> Self {
        FilterValue::List(values.into_iter().map(Into::into).collect())
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Int(value)
    }
}

impl From<i32> for Scalar {
    fn from(value: i32) -> Self {
        Scalar::Int(value as i64)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Float(value)
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Text(value)
    }
}

impl From<Scalar> for FilterValue {
    fn from(value: Scalar) -> Self {
        FilterValue::One(value)
    }
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        FilterValue::One(value.into())
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        FilterValue::One(value.into())
    }
}

impl From<i32> for FilterValue {
    fn from(value: i32) -> Self {
        FilterValue::One(value.into())
    }
}

impl From<f64> for FilterValue {
    fn from(value: f64) -> Self {
        FilterValue::One(value.into())
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::One(value.into())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        FilterValue::One(value.into())
    }
}

impl From<Vec<Scalar>> for FilterValue {
    fn from(value: Vec<Scalar>) -> Self {
        FilterValue::List(value)
    }
}

/// Foglia dell'albero: confronto tra un campo e un valore
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Operation {
    pub field: String,
    pub operator: Operator,
    #[serde(default)]
    pub value: FilterValue,
}

impl Operation {
    pub fn new(field: impl Into<String>, operator: Operator, value: impl Into<FilterValue>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }
}

/// Nodo interno: combina i figli con AND o OR
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BooleanExpression {
    pub operator: BooleanOperator,
    pub value: Vec<FilterExpression>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum FilterExpression {
    Operation(Operation),
    BooleanExpression(BooleanExpression),
}

impl FilterExpression {
    pub fn and(children: Vec<FilterExpression>) -> Self {
        FilterExpression::BooleanExpression(BooleanExpression {
            operator: BooleanOperator::And,
            value: children,
        })
    }

    pub fn or(children: Vec<FilterExpression>) -> Self {
        FilterExpression::BooleanExpression(BooleanExpression {
            operator: BooleanOperator::Or,
            value: children,
        })
    }
}

impl From<Operation> for FilterExpression {
    fn from(value: Operation) -> Self {
        FilterExpression::Operation(value)
    }
}

impl From<BooleanExpression> for FilterExpression {
    fn from(value: BooleanExpression) -> Self {
        FilterExpression::BooleanExpression(value)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    pub field: String,
    pub direction: SortDirection,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Sorts {
    pub sorts: Vec<Sort>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_nested_expression() {
        let filter: FilterExpression = serde_json::from_value(json!({
            "operator": "or",
            "value": [
                { "field": "name", "operator": "startswith", "value": "Item" },
                {
                    "operator": "and",
                    "value": [
                        { "field": "order", "operator": "between", "value": [2, 4] },
                        { "field": "deleted_at", "operator": "null" }
                    ]
                }
            ]
        }))
        .unwrap();

        let FilterExpression::BooleanExpression(root) = filter else {
            panic!("root should be a boolean expression");
        };
        assert_eq!(root.operator, BooleanOperator::Or);
        assert_eq!(
            root.value[0],
            FilterExpression::Operation(Operation::new("name", Operator::StartsWith, "Item"))
        );

        let FilterExpression::BooleanExpression(inner) = &root.value[1] else {
            panic!("second child should be a boolean expression");
        };
        assert_eq!(
            inner.value[0],
            FilterExpression::Operation(Operation::new(
                "order",
                Operator::Between,
                FilterValue::list([2, 4])
            ))
        );
        assert_eq!(
            inner.value[1],
            FilterExpression::Operation(Operation::new("deleted_at", Operator::Null, FilterValue::Null))
        );
    }

    #[test]
    fn test_unknown_operator_is_rejected() {
        let result: Result<FilterExpression, _> = serde_json::from_value(json!({
            "field": "name", "operator": "like", "value": "x"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_operator_wire_names() {
        assert_eq!(serde_json::to_value(Operator::NotContainsCaseSensitive).unwrap(), json!("ncontainss"));
        assert_eq!(serde_json::to_value(Operator::GreaterThanOrEqual).unwrap(), json!("gte"));
        assert_eq!(serde_json::to_value(SortDirection::Desc).unwrap(), json!("desc"));
    }
}
