//! Series: A single column of data backed by an Arrow array

use std::fmt;
use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, BooleanArray, Float64Array, Int32Array, Int64Array, StringArray,
};
use arrow::datatypes::DataType;

use super::error::{DataError, DataResult};
use super::value::Value;

/// A single column of homogeneous data backed by an Arrow array
#[derive(Clone)]
pub struct Series {
    /// Column name
    name: String,
    /// The underlying Arrow array (reference-counted for zero-copy)
    array: ArrayRef,
}

impl Series {
    /// Create a new Series from an Arrow array
    #[must_use]
    pub fn new(name: impl Into<String>, array: ArrayRef) -> Self {
        Self {
            name: name.into(),
            array,
        }
    }

    /// Create a Series from a vector of integers
    #[must_use]
    pub fn from_ints(name: impl Into<String>, values: Vec<i64>) -> Self {
        let array = Arc::new(Int64Array::from(values)) as ArrayRef;
        Self::new(name, array)
    }

    /// Create a Series from a vector of floats
    #[must_use]
    pub fn from_floats(name: impl Into<String>, values: Vec<f64>) -> Self {
        let array = Arc::new(Float64Array::from(values)) as ArrayRef;
        Self::new(name, array)
    }

    /// Create a Series from a vector of strings
    #[must_use]
    pub fn from_strings(name: impl Into<String>, values: Vec<&str>) -> Self {
        let array = Arc::new(StringArray::from(values)) as ArrayRef;
        Self::new(name, array)
    }

    /// Create a Series from a vector of optional integers
    #[must_use]
    pub fn from_optional_ints(name: impl Into<String>, values: Vec<Option<i64>>) -> Self {
        let array = Arc::new(Int64Array::from(values)) as ArrayRef;
        Self::new(name, array)
    }

    /// Create a Series from a vector of optional floats
    #[must_use]
    pub fn from_optional_floats(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        let array = Arc::new(Float64Array::from(values)) as ArrayRef;
        Self::new(name, array)
    }

    /// Create a Series from a vector of optional strings
    #[must_use]
    pub fn from_optional_strings(name: impl Into<String>, values: Vec<Option<&str>>) -> Self {
        let array = Arc::new(StringArray::from(values)) as ArrayRef;
        Self::new(name, array)
    }

    /// Create a Series from a slice of cell values
    ///
    /// The type is inferred from the first non-null value. Int values are
    /// coerced to Float when the inferred type is Float.
    ///
    /// # Errors
    /// Returns error if values have mixed types or unsupported types
    pub fn from_values(name: impl Into<String>, values: &[Value]) -> DataResult<Self> {
        if values.is_empty() {
            // Default to Int64 for empty series
            return Ok(Self::from_ints(name, vec![]));
        }

        // Find the first non-null value to determine type
        let first_type = values.iter().find(|v| !v.is_null());

        match first_type {
            Some(Value::Int(_)) => {
                let ints: Vec<Option<i64>> = values
                    .iter()
                    .map(|v| match v {
                        Value::Int(i) => Ok(Some(*i)),
                        Value::Null => Ok(None),
                        _ => Err(DataError::TypeMismatch {
                            expected: "Int".to_string(),
                            found: v.type_name().to_string(),
                        }),
                    })
                    .collect::<DataResult<Vec<_>>>()?;
                Ok(Self::from_optional_ints(name, ints))
            }
            Some(Value::Float(_)) => {
                let floats: Vec<Option<f64>> = values
                    .iter()
                    .map(|v| match v {
                        Value::Float(f) => Ok(Some(*f)),
                        Value::Int(i) => Ok(Some(*i as f64)), // Allow int -> float coercion
                        Value::Null => Ok(None),
                        _ => Err(DataError::TypeMismatch {
                            expected: "Float".to_string(),
                            found: v.type_name().to_string(),
                        }),
                    })
                    .collect::<DataResult<Vec<_>>>()?;
                Ok(Self::from_optional_floats(name, floats))
            }
            Some(Value::Bool(_)) => {
                let bools: Vec<Option<bool>> = values
                    .iter()
                    .map(|v| match v {
                        Value::Bool(b) => Ok(Some(*b)),
                        Value::Null => Ok(None),
                        _ => Err(DataError::TypeMismatch {
                            expected: "Bool".to_string(),
                            found: v.type_name().to_string(),
                        }),
                    })
                    .collect::<DataResult<Vec<_>>>()?;
                let array = Arc::new(BooleanArray::from(bools)) as ArrayRef;
                Ok(Self::new(name, array))
            }
            Some(Value::Str(_)) => {
                let strings: Vec<Option<&str>> = values
                    .iter()
                    .map(|v| match v {
                        Value::Str(s) => Ok(Some(s.as_str())),
                        Value::Null => Ok(None),
                        _ => Err(DataError::TypeMismatch {
                            expected: "String".to_string(),
                            found: v.type_name().to_string(),
                        }),
                    })
                    .collect::<DataResult<Vec<_>>>()?;
                Ok(Self::from_optional_strings(name, strings))
            }
            _ => {
                // All null values - default to Int64
                let nulls: Vec<Option<i64>> = vec![None; values.len()];
                Ok(Self::from_optional_ints(name, nulls))
            }
        }
    }

    /// Get the column name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the number of elements
    #[must_use]
    pub fn len(&self) -> usize {
        self.array.len()
    }

    /// Check if the series is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.array.is_empty()
    }

    /// Get the Arrow data type
    #[must_use]
    pub fn data_type(&self) -> &DataType {
        self.array.data_type()
    }

    /// Get the underlying Arrow array
    #[must_use]
    pub fn array(&self) -> &ArrayRef {
        &self.array
    }

    /// Get the number of null values
    #[must_use]
    pub fn null_count(&self) -> usize {
        self.array.null_count()
    }

    /// Check if a value at index is null
    #[must_use]
    pub fn is_null(&self, index: usize) -> bool {
        self.array.is_null(index)
    }

    /// Whether this column holds numeric values (aggregation candidates)
    #[must_use]
    pub fn is_numeric(&self) -> bool {
        matches!(
            self.array.data_type(),
            DataType::Int32 | DataType::Int64 | DataType::Float64
        )
    }

    /// Get a value at the given index
    ///
    /// # Errors
    /// Returns error if index is out of bounds or the type is unsupported
    pub fn get(&self, index: usize) -> DataResult<Value> {
        if index >= self.len() {
            return Err(DataError::OutOfBounds {
                index,
                length: self.len(),
            });
        }

        if self.is_null(index) {
            return Ok(Value::Null);
        }

        match self.array.data_type() {
            DataType::Int64 => {
                let arr = self.array.as_any().downcast_ref::<Int64Array>().unwrap();
                Ok(Value::Int(arr.value(index)))
            }
            DataType::Int32 => {
                let arr = self.array.as_any().downcast_ref::<Int32Array>().unwrap();
                Ok(Value::Int(i64::from(arr.value(index))))
            }
            DataType::Float64 => {
                let arr = self.array.as_any().downcast_ref::<Float64Array>().unwrap();
                Ok(Value::Float(arr.value(index)))
            }
            DataType::Boolean => {
                let arr = self.array.as_any().downcast_ref::<BooleanArray>().unwrap();
                Ok(Value::Bool(arr.value(index)))
            }
            DataType::Utf8 => {
                let arr = self.array.as_any().downcast_ref::<StringArray>().unwrap();
                Ok(Value::Str(arr.value(index).to_string()))
            }
            other => Err(DataError::InvalidOperation(format!(
                "cannot get value of type {other:?}"
            ))),
        }
    }

    /// Collect all values into a vector
    ///
    /// # Errors
    /// Returns error if any value cannot be extracted
    pub fn to_values(&self) -> DataResult<Vec<Value>> {
        (0..self.len()).map(|i| self.get(i)).collect()
    }
}

impl fmt::Debug for Series {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Series")
            .field("name", &self.name)
            .field("len", &self.len())
            .field("data_type", self.data_type())
            .finish()
    }
}
