//! Grouping & Statistics Stage
//!
//! Partitions rows by the primary column in order of first appearance,
//! optionally sub-partitioned by combinations of sub-column values, and
//! computes per-group count and mean statistics. The partition is a fixed
//! two-level tree; configuration never nests deeper.

use std::collections::HashMap;

use crate::data::{DataError, DataFrame, DataResult, Series, Value};

/// A value usable as a group key.
///
/// Float columns cannot key a group (no total order, no hash); grouping
/// by one is an error, as in the filter and sort stages text columns are
/// the expected case.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GroupKey {
    Null,
    Bool(bool),
    Int(i64),
    Str(String),
}

impl GroupKey {
    fn from_value(value: &Value) -> DataResult<Self> {
        match value {
            Value::Null => Ok(GroupKey::Null),
            Value::Bool(b) => Ok(GroupKey::Bool(*b)),
            Value::Int(i) => Ok(GroupKey::Int(*i)),
            Value::Str(s) => Ok(GroupKey::Str(s.clone())),
            Value::Float(_) => Err(DataError::InvalidOperation(
                "cannot use Float as a group key".to_string(),
            )),
        }
    }

    /// Convert back to a cell value
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            GroupKey::Null => Value::Null,
            GroupKey::Bool(b) => Value::Bool(*b),
            GroupKey::Int(i) => Value::Int(*i),
            GroupKey::Str(s) => Value::Str(s.clone()),
        }
    }
}

/// One second-level partition inside a primary group
#[derive(Debug, Clone)]
pub struct SubGroup {
    /// Sub-column values identifying this partition, one per sub-column
    pub key: Vec<GroupKey>,
    /// Row indices into the source table, in source order
    pub indices: Vec<usize>,
}

/// One first-level partition of the table
#[derive(Debug, Clone)]
pub struct PrimaryGroup {
    /// The primary column value identifying this group
    pub key: GroupKey,
    /// Row indices into the source table, in source order
    pub indices: Vec<usize>,
    /// Nested partitions; empty when no sub-columns are configured
    pub sub_groups: Vec<SubGroup>,
}

/// Statistics for one leaf group
#[derive(Debug, Clone, PartialEq)]
pub struct GroupSummary {
    /// Grouping column name/value pairs identifying the group
    pub keys: Vec<(String, Value)>,
    /// Number of rows in the group
    pub count: usize,
    /// Mean per numeric non-grouping column; `Value::Null` when the
    /// column has no data within the group
    pub means: Vec<(String, Value)>,
}

/// A table partitioned by a primary column and optional sub-columns.
///
/// Groups appear in order of first appearance in the source table, as do
/// sub-groups within each primary group.
#[derive(Debug, Clone)]
pub struct GroupedTable {
    source: DataFrame,
    primary_column: String,
    sub_columns: Vec<String>,
    groups: Vec<PrimaryGroup>,
}

impl GroupedTable {
    /// Partition the table.
    ///
    /// # Errors
    /// Returns error if a grouping column is missing or cannot key a group
    pub fn new(df: &DataFrame, primary_column: &str, sub_columns: &[String]) -> DataResult<Self> {
        let primary = df.column(primary_column)?;
        let sub_series: Vec<Series> = sub_columns
            .iter()
            .map(|name| df.column(name))
            .collect::<DataResult<Vec<_>>>()?;

        // First level: distinct primary values in first-appearance order
        let mut groups: Vec<PrimaryGroup> = Vec::new();
        let mut position: HashMap<GroupKey, usize> = HashMap::new();

        for row_idx in 0..df.num_rows() {
            let key = GroupKey::from_value(&primary.get(row_idx)?)?;
            match position.get(&key) {
                Some(&pos) => groups[pos].indices.push(row_idx),
                None => {
                    position.insert(key.clone(), groups.len());
                    groups.push(PrimaryGroup {
                        key,
                        indices: vec![row_idx],
                        sub_groups: Vec::new(),
                    });
                }
            }
        }

        // Second level: distinct sub-key combinations within each group,
        // again in first-appearance order
        if !sub_series.is_empty() {
            for group in &mut groups {
                let mut sub_position: HashMap<Vec<GroupKey>, usize> = HashMap::new();
                for &row_idx in &group.indices {
                    let key = sub_series
                        .iter()
                        .map(|s| GroupKey::from_value(&s.get(row_idx)?))
                        .collect::<DataResult<Vec<_>>>()?;
                    match sub_position.get(&key) {
                        Some(&pos) => group.sub_groups[pos].indices.push(row_idx),
                        None => {
                            sub_position.insert(key.clone(), group.sub_groups.len());
                            group.sub_groups.push(SubGroup {
                                key,
                                indices: vec![row_idx],
                            });
                        }
                    }
                }
            }
        }

        Ok(Self {
            source: df.clone(),
            primary_column: primary_column.to_string(),
            sub_columns: sub_columns.to_vec(),
            groups,
        })
    }

    /// The primary grouping column name
    #[must_use]
    pub fn primary_column(&self) -> &str {
        &self.primary_column
    }

    /// The first-level partitions, in first-appearance order
    #[must_use]
    pub fn groups(&self) -> &[PrimaryGroup] {
        &self.groups
    }

    /// Number of primary groups
    #[must_use]
    pub fn num_groups(&self) -> usize {
        self.groups.len()
    }

    /// Number of leaf groups (sub-groups when configured, else primary)
    #[must_use]
    pub fn num_leaf_groups(&self) -> usize {
        if self.sub_columns.is_empty() {
            self.groups.len()
        } else {
            self.groups.iter().map(|g| g.sub_groups.len()).sum()
        }
    }

    /// Leaf groups as (grouping key values, row indices), in emission order
    fn leaf_groups(&self) -> Vec<(Vec<GroupKey>, &[usize])> {
        let mut leaves = Vec::new();
        for group in &self.groups {
            if self.sub_columns.is_empty() {
                leaves.push((vec![group.key.clone()], group.indices.as_slice()));
            } else {
                for sub in &group.sub_groups {
                    let mut key = Vec::with_capacity(1 + sub.key.len());
                    key.push(group.key.clone());
                    key.extend(sub.key.iter().cloned());
                    leaves.push((key, sub.indices.as_slice()));
                }
            }
        }
        leaves
    }

    /// Re-emit the source table with group rows contiguous: primary-group
    /// order first, sub-group order within.
    ///
    /// # Errors
    /// Returns error if row projection fails
    pub fn reordered(&self) -> DataResult<DataFrame> {
        let mut indices = Vec::with_capacity(self.source.num_rows());
        for (_, leaf_indices) in self.leaf_groups() {
            indices.extend_from_slice(leaf_indices);
        }
        self.source.filter_by_indices(&indices)
    }

    /// Columns eligible for aggregation: numeric and not a grouping column
    fn numeric_columns(&self) -> DataResult<Vec<Series>> {
        let mut numeric = Vec::new();
        for idx in 0..self.source.num_columns() {
            let series = self.source.column_by_index(idx)?;
            let is_grouping = series.name() == self.primary_column
                || self.sub_columns.iter().any(|c| c == series.name());
            if series.is_numeric() && !is_grouping {
                numeric.push(series);
            }
        }
        Ok(numeric)
    }

    /// Compute count and per-numeric-column mean for every leaf group.
    ///
    /// # Errors
    /// Returns error if a value cannot be read
    pub fn summaries(&self) -> DataResult<Vec<GroupSummary>> {
        let key_columns: Vec<&str> = std::iter::once(self.primary_column.as_str())
            .chain(self.sub_columns.iter().map(String::as_str))
            .collect();
        let numeric = self.numeric_columns()?;

        let mut summaries = Vec::with_capacity(self.num_leaf_groups());
        for (keys, indices) in self.leaf_groups() {
            let named_keys = key_columns
                .iter()
                .zip(&keys)
                .map(|(name, key)| ((*name).to_string(), key.to_value()))
                .collect();

            let means = numeric
                .iter()
                .map(|series| Ok((series.name().to_string(), mean_of(series, indices)?)))
                .collect::<DataResult<Vec<_>>>()?;

            summaries.push(GroupSummary {
                keys: named_keys,
                count: indices.len(),
                means,
            });
        }
        Ok(summaries)
    }

    /// Render the summaries as a table: one row per leaf group, grouping
    /// key columns first, then `count`, then `<column>_mean` columns.
    ///
    /// # Errors
    /// Returns error if summary computation fails
    pub fn summary_table(&self) -> DataResult<DataFrame> {
        let summaries = self.summaries()?;
        let key_count = 1 + self.sub_columns.len();
        let numeric = self.numeric_columns()?;

        let mut columns: Vec<Series> = Vec::new();

        for key_idx in 0..key_count {
            let name = if key_idx == 0 {
                self.primary_column.clone()
            } else {
                self.sub_columns[key_idx - 1].clone()
            };
            let values: Vec<Value> = summaries
                .iter()
                .map(|s| s.keys[key_idx].1.clone())
                .collect();
            columns.push(Series::from_values(name, &values)?);
        }

        let counts: Vec<Value> = summaries
            .iter()
            .map(|s| Value::Int(s.count as i64))
            .collect();
        columns.push(Series::from_values("count", &counts)?);

        for (col_idx, series) in numeric.iter().enumerate() {
            let values: Vec<Value> = summaries
                .iter()
                .map(|s| s.means[col_idx].1.clone())
                .collect();
            columns.push(Series::from_values(
                format!("{}_mean", series.name()),
                &values,
            )?);
        }

        DataFrame::from_series(columns)
    }
}

/// Arithmetic mean of the non-null values at `indices`.
///
/// Returns `Value::Null` when the column has no data there, never zero.
///
/// # Errors
/// Returns error for non-numeric values
pub fn mean_of(series: &Series, indices: &[usize]) -> DataResult<Value> {
    let mut sum = 0.0;
    let mut count: usize = 0;

    for &idx in indices {
        match series.get(idx)? {
            Value::Int(i) => {
                sum += i as f64;
                count += 1;
            }
            Value::Float(f) => {
                sum += f;
                count += 1;
            }
            Value::Null => {}
            other => {
                return Err(DataError::InvalidOperation(format!(
                    "cannot compute mean of non-numeric value: {}",
                    other.type_name()
                )));
            }
        }
    }

    if count == 0 {
        Ok(Value::Null)
    } else {
        Ok(Value::Float(sum / count as f64))
    }
}

/// Sum of the non-null values at `indices`; integer unless floats appear.
///
/// # Errors
/// Returns error for non-numeric values
pub fn sum_of(series: &Series, indices: &[usize]) -> DataResult<Value> {
    let mut sum_int: i64 = 0;
    let mut sum_float: f64 = 0.0;
    let mut is_float = false;
    let mut has_value = false;

    for &idx in indices {
        match series.get(idx)? {
            Value::Int(i) => {
                if is_float {
                    sum_float += i as f64;
                } else {
                    sum_int += i;
                }
                has_value = true;
            }
            Value::Float(f) => {
                if !is_float {
                    sum_float = sum_int as f64;
                    is_float = true;
                }
                sum_float += f;
                has_value = true;
            }
            Value::Null => {}
            other => {
                return Err(DataError::InvalidOperation(format!(
                    "cannot sum non-numeric value: {}",
                    other.type_name()
                )));
            }
        }
    }

    if !has_value {
        Ok(Value::Null)
    } else if is_float {
        Ok(Value::Float(sum_float))
    } else {
        Ok(Value::Int(sum_int))
    }
}

/// Minimum of the non-null values at `indices`
///
/// # Errors
/// Returns error for non-numeric values
pub fn min_of(series: &Series, indices: &[usize]) -> DataResult<Value> {
    extreme_of(series, indices, |candidate, current| candidate < current)
}

/// Maximum of the non-null values at `indices`
///
/// # Errors
/// Returns error for non-numeric values
pub fn max_of(series: &Series, indices: &[usize]) -> DataResult<Value> {
    extreme_of(series, indices, |candidate, current| candidate > current)
}

fn extreme_of(
    series: &Series,
    indices: &[usize],
    replaces: fn(f64, f64) -> bool,
) -> DataResult<Value> {
    let mut best: Option<Value> = None;

    for &idx in indices {
        let value = series.get(idx)?;
        if value.is_null() {
            continue;
        }
        let candidate = value.as_f64().ok_or_else(|| {
            DataError::InvalidOperation(format!(
                "cannot compare non-numeric value: {}",
                value.type_name()
            ))
        })?;

        best = Some(match best {
            None => value,
            Some(current) => {
                let current_f = current.as_f64().unwrap_or(f64::NAN);
                if replaces(candidate, current_f) {
                    value
                } else {
                    current
                }
            }
        });
    }

    Ok(best.unwrap_or(Value::Null))
}
