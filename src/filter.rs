// Query filtering for generic records

use crate::record::IndexValue;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Filter for querying records
#[derive(Debug, Clone)]
pub struct Filter {
    /// Field name to filter on
    pub field: String,
    /// Comparison operator
    pub op: FilterOp,
    /// Value to compare against
    pub value: IndexValue,
}

impl Filter {
    /// Equality filter, the shape used for back-reference lookups
    pub fn eq(field: &str, value: IndexValue) -> Self {
        Self {
            field: field.to_string(),
            op: FilterOp::Eq,
            value,
        }
    }

    /// Evaluate against a record's indexed fields.
    /// A record without the field never matches.
    pub fn matches(&self, fields: &HashMap<String, IndexValue>) -> bool {
        let Some(actual) = fields.get(&self.field) else {
            return false;
        };

        if self.op == FilterOp::Contains {
            return match (actual, &self.value) {
                (IndexValue::String(a), IndexValue::String(needle)) => a.contains(needle.as_str()),
                _ => false,
            };
        }

        let ordering = match (actual, &self.value) {
            (IndexValue::String(a), IndexValue::String(b)) => a.cmp(b),
            (IndexValue::Int(a), IndexValue::Int(b)) => a.cmp(b),
            (IndexValue::Bool(a), IndexValue::Bool(b)) => a.cmp(b),
            _ => return false,
        };

        match self.op {
            FilterOp::Eq => ordering == Ordering::Equal,
            FilterOp::Ne => ordering != Ordering::Equal,
            FilterOp::Gt => ordering == Ordering::Greater,
            FilterOp::Lt => ordering == Ordering::Less,
            FilterOp::Gte => ordering != Ordering::Less,
            FilterOp::Lte => ordering != Ordering::Greater,
            FilterOp::Contains => unreachable!("handled above"),
        }
    }
}

/// Comparison operators for filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,       // ==
    Ne,       // !=
    Gt,       // >
    Lt,       // <
    Gte,      // >=
    Lte,      // <=
    Contains, // LIKE %value%
}

impl FilterOp {
    pub(crate) fn to_sql(self) -> &'static str {
        match self {
            FilterOp::Eq => "=",
            FilterOp::Ne => "!=",
            FilterOp::Gt => ">",
            FilterOp::Lt => "<",
            FilterOp::Gte => ">=",
            FilterOp::Lte => "<=",
            FilterOp::Contains => "LIKE",
        }
    }
}

impl std::fmt::Display for FilterOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.to_sql())
    }
}
