//! Row Filter Stage: membership-based row selection
//!
//! Two independent predicates, both applied when configured:
//! keep-only (value must be in the set) and filter-out (value must not be
//! in the set). Neither short-circuits the other; an empty intermediate
//! table still flows through the remaining predicate.

use std::collections::HashSet;

use crate::config::ColumnValues;
use crate::data::{DataFrame, DataResult, Series, Value};

/// Apply the configured keep and filter predicates, in that order.
///
/// Returns the table unchanged (cheap clone, shared Arrow buffers) when
/// neither predicate is configured.
///
/// # Errors
/// Returns error if a referenced column is missing
pub fn apply_filters(
    df: &DataFrame,
    keep: Option<&ColumnValues>,
    filter: Option<&ColumnValues>,
) -> DataResult<DataFrame> {
    let mut result = df.clone();

    if let Some(keep) = keep {
        result = keep_only_values(&result, &keep.column, &keep.values)?;
    }

    if let Some(filter) = filter {
        result = filter_by_column(&result, &filter.column, &filter.values)?;
    }

    Ok(result)
}

/// Keep only rows where the column's value is a member of `values`.
///
/// # Errors
/// Returns error if the column is missing
pub fn keep_only_values(df: &DataFrame, column: &str, values: &[String]) -> DataResult<DataFrame> {
    select_rows(df, column, values, true)
}

/// Drop rows where the column's value is a member of `values`.
///
/// # Errors
/// Returns error if the column is missing
pub fn filter_by_column(df: &DataFrame, column: &str, values: &[String]) -> DataResult<DataFrame> {
    select_rows(df, column, values, false)
}

fn select_rows(
    df: &DataFrame,
    column: &str,
    values: &[String],
    keep_members: bool,
) -> DataResult<DataFrame> {
    let series = df.column(column)?;
    let set: HashSet<&str> = values.iter().map(String::as_str).collect();

    let mut indices = Vec::new();
    for idx in 0..df.num_rows() {
        if is_member(&series, idx, &set)? == keep_members {
            indices.push(idx);
        }
    }

    df.filter_by_indices(&indices)
}

/// Exact membership against the value's canonical rendering.
/// Nulls are never members of any set.
fn is_member(series: &Series, idx: usize, set: &HashSet<&str>) -> DataResult<bool> {
    let value = series.get(idx)?;
    if value.is_null() {
        return Ok(false);
    }
    let rendered = match &value {
        Value::Str(s) => s.clone(),
        other => other.to_string(),
    };
    Ok(set.contains(rendered.as_str()))
}
