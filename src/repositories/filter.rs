//! Filter lowering - traduce un [`FilterExpression`] in un predicato SQL parametrizzato
//!
//! Ogni foglia diventa un predicato su una colonna validata e quotata, con i valori
//! sempre passati come parametri. I nodi AND/OR vengono tradotti ricorsivamente.

use super::errors::RepositoryError;
use super::sql::{column, push_scalar};
use super::traits::{Db, Entity};
use crate::dtos::{BooleanExpression, BooleanOperator, FilterExpression, FilterValue, Operation, Operator, Scalar};
use sqlx::QueryBuilder;

/// Aggiunge a `query` il predicato corrispondente a `filter`
pub fn push_filter<E: Entity>(
    query: &mut QueryBuilder<'_, Db>,
    filter: &FilterExpression,
) -> Result<(), RepositoryError> {
    match filter {
        FilterExpression::Operation(operation) => push_operation::<E>(query, operation),
        FilterExpression::BooleanExpression(expression) => push_boolean::<E>(query, expression),
    }
}

fn push_boolean<E: Entity>(
    query: &mut QueryBuilder<'_, Db>,
    expression: &BooleanExpression,
) -> Result<(), RepositoryError> {
    let (separator, empty) = match expression.operator {
        BooleanOperator::And => (" AND ", "1 = 1"),
        BooleanOperator::Or => (" OR ", "1 = 0"),
    };

    if expression.value.is_empty() {
        query.push(empty);
        return Ok(());
    }

    query.push("(");
    for (i, child) in expression.value.iter().enumerate() {
        if i > 0 {
            query.push(separator);
        }
        push_filter::<E>(query, child)?;
    }
    query.push(")");
    Ok(())
}

fn push_operation<E: Entity>(
    query: &mut QueryBuilder<'_, Db>,
    operation: &Operation,
) -> Result<(), RepositoryError> {
    let col = column::<E>(&operation.field)?;
    let value = &operation.value;

    match operation.operator {
        Operator::Equals if matches!(value, FilterValue::Null) => {
            query.push(format!("{col} IS NULL"));
        }
        Operator::NotEquals if matches!(value, FilterValue::Null) => {
            query.push(format!("{col} IS NOT NULL"));
        }
        Operator::Equals => push_comparison(query, &col, "=", operation)?,
        Operator::NotEquals => push_comparison(query, &col, "<>", operation)?,
        Operator::LessThan => push_comparison(query, &col, "<", operation)?,
        Operator::GreaterThan => push_comparison(query, &col, ">", operation)?,
        Operator::LessThanOrEqual => push_comparison(query, &col, "<=", operation)?,
        Operator::GreaterThanOrEqual => push_comparison(query, &col, ">=", operation)?,

        Operator::In => push_membership(query, &col, false, operation)?,
        Operator::NotIn => push_membership(query, &col, true, operation)?,

        Operator::Between => push_between(query, &col, false, operation)?,
        Operator::NotBetween => push_between(query, &col, true, operation)?,

        Operator::Null => {
            query.push(format!("{col} IS NULL"));
        }
        Operator::NotNull => {
            query.push(format!("{col} IS NOT NULL"));
        }

        Operator::Contains => push_like(query, &col, false, operation, Position::Anywhere)?,
        Operator::NotContains => push_like(query, &col, true, operation, Position::Anywhere)?,
        Operator::StartsWith => push_like(query, &col, false, operation, Position::Start)?,
        Operator::NotStartsWith => push_like(query, &col, true, operation, Position::Start)?,
        Operator::EndsWith => push_like(query, &col, false, operation, Position::End)?,
        Operator::NotEndsWith => push_like(query, &col, true, operation, Position::End)?,

        Operator::ContainsCaseSensitive => push_exact(query, &col, false, operation, Position::Anywhere)?,
        Operator::NotContainsCaseSensitive => {
            push_exact(query, &col, true, operation, Position::Anywhere)?
        }
        Operator::StartsWithCaseSensitive => push_exact(query, &col, false, operation, Position::Start)?,
        Operator::NotStartsWithCaseSensitive => {
            push_exact(query, &col, true, operation, Position::Start)?
        }
        Operator::EndsWithCaseSensitive => push_exact(query, &col, false, operation, Position::End)?,
        Operator::NotEndsWithCaseSensitive => push_exact(query, &col, true, operation, Position::End)?,

        Operator::EveryElementInArray | Operator::NotEveryElementInArray => {
            return Err(unsupported(operation, "array columns are not supported by this backend"));
        }
    }

    Ok(())
}

#[derive(Clone, Copy)]
enum Position {
    Anywhere,
    Start,
    End,
}

fn unsupported(operation: &Operation, reason: &str) -> RepositoryError {
    RepositoryError::UnsupportedFilter(format!(
        "{:?} on '{}': {reason}",
        operation.operator, operation.field
    ))
}

fn scalar<'v>(operation: &'v Operation) -> Result<&'v Scalar, RepositoryError> {
    match &operation.value {
        FilterValue::One(value) => Ok(value),
        _ => Err(unsupported(operation, "expected a single value")),
    }
}

fn text<'v>(operation: &'v Operation) -> Result<&'v str, RepositoryError> {
    match scalar(operation)? {
        Scalar::Text(value) => Ok(value),
        _ => Err(unsupported(operation, "expected a string value")),
    }
}

fn push_comparison(
    query: &mut QueryBuilder<'_, Db>,
    col: &str,
    op: &str,
    operation: &Operation,
) -> Result<(), RepositoryError> {
    let value = scalar(operation)?;
    query.push(format!("{col} {op} "));
    push_scalar(query, value);
    Ok(())
}

fn push_membership(
    query: &mut QueryBuilder<'_, Db>,
    col: &str,
    negated: bool,
    operation: &Operation,
) -> Result<(), RepositoryError> {
    let FilterValue::List(values) = &operation.value else {
        return Err(unsupported(operation, "expected a list of values"));
    };

    // IN () non è SQL valido: lista vuota = nessuna riga (in) / tutte le righe (nin)
    if values.is_empty() {
        query.push(if negated { "1 = 1" } else { "1 = 0" });
        return Ok(());
    }

    query.push(format!("{col} {} (", if negated { "NOT IN" } else { "IN" }));
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            query.push(", ");
        }
        push_scalar(query, value);
    }
    query.push(")");
    Ok(())
}

fn push_between(
    query: &mut QueryBuilder<'_, Db>,
    col: &str,
    negated: bool,
    operation: &Operation,
) -> Result<(), RepositoryError> {
    let FilterValue::List(values) = &operation.value else {
        return Err(unsupported(operation, "expected exactly two values"));
    };
    let [low, high] = values.as_slice() else {
        return Err(unsupported(operation, "expected exactly two values"));
    };

    query.push(format!("{col} {} ", if negated { "NOT BETWEEN" } else { "BETWEEN" }));
    push_scalar(query, low);
    query.push(" AND ");
    push_scalar(query, high);
    Ok(())
}

/// Escape di `%`, `_` e `\` per un pattern LIKE con `ESCAPE '\'`
pub fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

// LIKE in SQLite ignora maiuscole/minuscole (ASCII)
fn push_like(
    query: &mut QueryBuilder<'_, Db>,
    col: &str,
    negated: bool,
    operation: &Operation,
    position: Position,
) -> Result<(), RepositoryError> {
    let escaped = escape_like(text(operation)?);
    let pattern = match position {
        Position::Anywhere => format!("%{escaped}%"),
        Position::Start => format!("{escaped}%"),
        Position::End => format!("%{escaped}"),
    };

    if negated {
        query.push("NOT (");
    }
    query.push(format!("{col} LIKE "));
    query.push_bind(pattern);
    query.push(" ESCAPE '\\'");
    if negated {
        query.push(")");
    }
    Ok(())
}

fn push_exact(
    query: &mut QueryBuilder<'_, Db>,
    col: &str,
    negated: bool,
    operation: &Operation,
    position: Position,
) -> Result<(), RepositoryError> {
    let value = text(operation)?.to_string();

    if negated {
        query.push("NOT (");
    }
    match position {
        Position::Anywhere => {
            query.push(format!("instr({col}, "));
            query.push_bind(value);
            query.push(") > 0");
        }
        Position::Start => {
            query.push(format!("instr({col}, "));
            query.push_bind(value);
            query.push(") = 1");
        }
        // substr(x, -0) restituisce l'intera stringa: il suffisso vuoto va gestito a parte
        Position::End if value.is_empty() => {
            query.push(format!("{col} IS NOT NULL"));
        }
        Position::End => {
            query.push(format!("substr({col}, -length("));
            query.push_bind(value.clone());
            query.push(")) = ");
            query.push_bind(value);
        }
    }
    if negated {
        query.push(")");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dtos::{BaseRecord, Convertible};
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize, Debug, sqlx::FromRow)]
    struct Thing {
        #[serde(flatten)]
        #[sqlx(flatten)]
        base: BaseRecord,
        name: String,
        order: i64,
    }

    impl Convertible for Thing {
        const FIELDS: &'static [&'static str] =
            &["id", "created_at", "updated_at", "deleted_at", "name", "order"];
    }

    impl Entity for Thing {
        const TABLE: &'static str = "things";
        type Record = Thing;

        fn meta(&self) -> &BaseRecord {
            &self.base
        }
    }

    fn lower(filter: FilterExpression) -> Result<String, RepositoryError> {
        let mut query: QueryBuilder<'_, Db> = QueryBuilder::new("");
        push_filter::<Thing>(&mut query, &filter)?;
        Ok(query.sql().to_string())
    }

    fn op(field: &str, operator: Operator, value: impl Into<FilterValue>) -> FilterExpression {
        Operation::new(field, operator, value).into()
    }

    #[test]
    fn test_simple_comparisons() {
        assert_eq!(lower(op("order", Operator::GreaterThanOrEqual, 3)).unwrap(), "\"order\" >= ?");
        assert_eq!(lower(op("name", Operator::NotEquals, "x")).unwrap(), "\"name\" <> ?");
        assert_eq!(lower(op("deleted_at", Operator::Equals, FilterValue::Null)).unwrap(), "\"deleted_at\" IS NULL");
        assert_eq!(lower(op("deleted_at", Operator::NotNull, FilterValue::Null)).unwrap(), "\"deleted_at\" IS NOT NULL");
    }

    #[test]
    fn test_nested_boolean_expression() {
        let filter = FilterExpression::or(vec![
            op("name", Operator::StartsWith, "Item"),
            FilterExpression::and(vec![
                op("order", Operator::Between, FilterValue::list([2, 4])),
                op("order", Operator::NotIn, FilterValue::list([3])),
            ]),
        ]);

        assert_eq!(
            lower(filter).unwrap(),
            "(\"name\" LIKE ? ESCAPE '\\' OR (\"order\" BETWEEN ? AND ? AND \"order\" NOT IN (?)))"
        );
    }

    #[test]
    fn test_empty_collections() {
        assert_eq!(lower(FilterExpression::and(vec![])).unwrap(), "1 = 1");
        assert_eq!(lower(FilterExpression::or(vec![])).unwrap(), "1 = 0");
        assert_eq!(lower(op("order", Operator::In, FilterValue::List(vec![]))).unwrap(), "1 = 0");
        assert_eq!(lower(op("order", Operator::NotIn, FilterValue::List(vec![]))).unwrap(), "1 = 1");
    }

    #[test]
    fn test_case_sensitive_variants() {
        assert_eq!(lower(op("name", Operator::ContainsCaseSensitive, "It")).unwrap(), "instr(\"name\", ?) > 0");
        assert_eq!(
            lower(op("name", Operator::NotEndsWithCaseSensitive, "9")).unwrap(),
            "NOT (substr(\"name\", -length(?)) = ?)"
        );
    }

    #[test]
    fn test_rejections() {
        assert!(matches!(
            lower(op("missing", Operator::Equals, 1)),
            Err(RepositoryError::UnknownField { .. })
        ));
        assert!(matches!(
            lower(op("order", Operator::Between, FilterValue::list([1]))),
            Err(RepositoryError::UnsupportedFilter(_))
        ));
        assert!(matches!(
            lower(op("order", Operator::In, 1)),
            Err(RepositoryError::UnsupportedFilter(_))
        ));
        assert!(matches!(
            lower(op("name", Operator::EveryElementInArray, FilterValue::list(["a"]))),
            Err(RepositoryError::UnsupportedFilter(_))
        ));
        assert!(matches!(
            lower(op("name", Operator::Contains, 3)),
            Err(RepositoryError::UnsupportedFilter(_))
        ));
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_a\\b"), "50\\%\\_a\\\\b");
    }
}
