//! Sort Stage: natural or category-priority row ordering
//!
//! Both orderings are stable: ties keep their prior relative row order.
//! With a custom category order, categories absent from the list (and
//! nulls) are placed after all listed categories, preserving their
//! original relative order.

use std::cmp::Ordering;
use std::collections::HashMap;

use arrow::datatypes::DataType;

use crate::data::{DataError, DataFrame, DataResult, Value};

/// Sort the table by `column`.
///
/// With `custom_order`, rows are ranked by their category's position in
/// the list; without it, natural ascending order of the column's type is
/// used. Nulls sort last in both modes.
///
/// # Errors
/// Returns error if the column is missing, or if a custom order is applied
/// to a non-text column
pub fn sort_table(
    df: &DataFrame,
    column: &str,
    custom_order: Option<&[String]>,
) -> DataResult<DataFrame> {
    if df.is_empty() {
        return Ok(df.clone());
    }

    match custom_order {
        Some(order) => sort_by_custom_order(df, column, order),
        None => sort_natural(df, column),
    }
}

fn sort_by_custom_order(df: &DataFrame, column: &str, order: &[String]) -> DataResult<DataFrame> {
    let series = df.column(column)?;
    if series.data_type() != &DataType::Utf8 {
        return Err(DataError::TypeMismatch {
            expected: "String".to_string(),
            found: format!("{:?}", series.data_type()),
        });
    }

    let rank_of: HashMap<&str, usize> = order
        .iter()
        .enumerate()
        .map(|(rank, category)| (category.as_str(), rank))
        .collect();

    // Unlisted categories and nulls share the after-everything rank; the
    // stable sort keeps their original relative order.
    let mut ranks = Vec::with_capacity(df.num_rows());
    for idx in 0..df.num_rows() {
        let rank = match series.get(idx)? {
            Value::Str(s) => rank_of.get(s.as_str()).copied().unwrap_or(order.len()),
            Value::Null => order.len(),
            other => {
                return Err(DataError::TypeMismatch {
                    expected: "String".to_string(),
                    found: other.type_name().to_string(),
                });
            }
        };
        ranks.push(rank);
    }

    let mut indices: Vec<usize> = (0..df.num_rows()).collect();
    indices.sort_by_key(|&idx| ranks[idx]);

    df.filter_by_indices(&indices)
}

fn sort_natural(df: &DataFrame, column: &str) -> DataResult<DataFrame> {
    let series = df.column(column)?;
    let values = series.to_values()?;

    let mut indices: Vec<usize> = (0..df.num_rows()).collect();
    indices.sort_by(|&a, &b| value_cmp(&values[a], &values[b]));

    df.filter_by_indices(&indices)
}

/// Ascending comparison within one homogeneous column; nulls last.
fn value_cmp(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Greater,
        (_, Value::Null) => Ordering::Less,
        (Value::Int(a), Value::Int(b)) => a.cmp(b),
        (Value::Float(a), Value::Float(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
        (Value::Int(a), Value::Float(b)) => {
            (*a as f64).partial_cmp(b).unwrap_or(Ordering::Equal)
        }
        (Value::Float(a), Value::Int(b)) => {
            a.partial_cmp(&(*b as f64)).unwrap_or(Ordering::Equal)
        }
        (Value::Str(a), Value::Str(b)) => a.cmp(b),
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        _ => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Series;

    fn column_strings(df: &DataFrame, name: &str) -> Vec<String> {
        let col = df.column(name).unwrap();
        (0..col.len()).map(|i| col.get(i).unwrap().to_string()).collect()
    }

    #[test]
    fn test_custom_order() {
        let df = DataFrame::from_series(vec![
            Series::from_strings("type", vec!["Office", "Retail", "Office", "Retail"]),
            Series::from_ints("id", vec![1, 2, 3, 4]),
        ])
        .unwrap();

        let order = vec!["Retail".to_string(), "Office".to_string()];
        let sorted = sort_table(&df, "type", Some(&order)).unwrap();

        assert_eq!(
            column_strings(&sorted, "type"),
            vec!["Retail", "Retail", "Office", "Office"]
        );
        // Stability: ties keep original relative order
        let ids = sorted.column("id").unwrap();
        assert_eq!(ids.get(0).unwrap(), Value::Int(2));
        assert_eq!(ids.get(1).unwrap(), Value::Int(4));
        assert_eq!(ids.get(2).unwrap(), Value::Int(1));
        assert_eq!(ids.get(3).unwrap(), Value::Int(3));
    }

    #[test]
    fn test_unlisted_categories_go_last_in_original_order() {
        let df = DataFrame::from_series(vec![Series::from_strings(
            "type",
            vec!["Warehouse", "Office", "Garage", "Retail"],
        )])
        .unwrap();

        let order = vec!["Retail".to_string(), "Office".to_string()];
        let sorted = sort_table(&df, "type", Some(&order)).unwrap();

        assert_eq!(
            column_strings(&sorted, "type"),
            vec!["Retail", "Office", "Warehouse", "Garage"]
        );
    }

    #[test]
    fn test_nulls_sort_last_with_custom_order() {
        let df = DataFrame::from_series(vec![Series::from_optional_strings(
            "type",
            vec![None, Some("Office"), Some("Retail")],
        )])
        .unwrap();

        let order = vec!["Retail".to_string(), "Office".to_string()];
        let sorted = sort_table(&df, "type", Some(&order)).unwrap();

        let col = sorted.column("type").unwrap();
        assert_eq!(col.get(0).unwrap(), Value::Str("Retail".to_string()));
        assert_eq!(col.get(1).unwrap(), Value::Str("Office".to_string()));
        assert_eq!(col.get(2).unwrap(), Value::Null);
    }

    #[test]
    fn test_custom_order_idempotent() {
        let df = DataFrame::from_series(vec![Series::from_strings(
            "type",
            vec!["Garage", "Office", "Retail", "Office"],
        )])
        .unwrap();

        let order = vec!["Retail".to_string(), "Office".to_string()];
        let once = sort_table(&df, "type", Some(&order)).unwrap();
        let twice = sort_table(&once, "type", Some(&order)).unwrap();

        assert_eq!(column_strings(&once, "type"), column_strings(&twice, "type"));
    }

    #[test]
    fn test_natural_sort() {
        let df = DataFrame::from_series(vec![
            Series::from_ints("price", vec![300, 100, 200]),
            Series::from_strings("city", vec!["a", "b", "c"]),
        ])
        .unwrap();

        let sorted = sort_table(&df, "price", None).unwrap();
        let prices = sorted.column("price").unwrap();
        assert_eq!(prices.get(0).unwrap(), Value::Int(100));
        assert_eq!(prices.get(1).unwrap(), Value::Int(200));
        assert_eq!(prices.get(2).unwrap(), Value::Int(300));
    }

    #[test]
    fn test_natural_sort_stable() {
        let df = DataFrame::from_series(vec![
            Series::from_strings("type", vec!["b", "a", "b", "a"]),
            Series::from_ints("id", vec![1, 2, 3, 4]),
        ])
        .unwrap();

        let sorted = sort_table(&df, "type", None).unwrap();
        let ids = sorted.column("id").unwrap();
        assert_eq!(ids.get(0).unwrap(), Value::Int(2));
        assert_eq!(ids.get(1).unwrap(), Value::Int(4));
        assert_eq!(ids.get(2).unwrap(), Value::Int(1));
        assert_eq!(ids.get(3).unwrap(), Value::Int(3));
    }

    #[test]
    fn test_natural_sort_nulls_last() {
        let df = DataFrame::from_series(vec![Series::from_optional_ints(
            "price",
            vec![None, Some(200), Some(100)],
        )])
        .unwrap();

        let sorted = sort_table(&df, "price", None).unwrap();
        let prices = sorted.column("price").unwrap();
        assert_eq!(prices.get(0).unwrap(), Value::Int(100));
        assert_eq!(prices.get(1).unwrap(), Value::Int(200));
        assert_eq!(prices.get(2).unwrap(), Value::Null);
    }

    #[test]
    fn test_custom_order_on_numeric_column_is_type_mismatch() {
        let df =
            DataFrame::from_series(vec![Series::from_ints("price", vec![1, 2, 3])]).unwrap();
        let order = vec!["1".to_string()];
        let result = sort_table(&df, "price", Some(&order));
        assert!(matches!(result, Err(DataError::TypeMismatch { .. })));
    }

    #[test]
    fn test_empty_table_passes_through() {
        let df = DataFrame::from_series(vec![Series::from_strings("type", vec![])]).unwrap();
        let order = vec!["Retail".to_string()];
        let sorted = sort_table(&df, "type", Some(&order)).unwrap();
        assert!(sorted.is_empty());
    }
}
