//! Helpers for the platform's wire conventions.

/// The remote side returned more values than the declared shape allows.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("expected at most one {what}, got {count}")]
pub struct ShapeError {
    pub what: &'static str,
    pub count: usize,
}

/// Decodes an optional value carried as a zero-or-one element array.
///
/// The platform's interface encodes "present or absent" that way. Anything
/// longer is a contract violation, not a value to pick from.
pub fn optional_from_wire<T>(what: &'static str, values: Vec<T>) -> Result<Option<T>, ShapeError> {
    let count = values.len();
    let mut iter = values.into_iter();
    match (iter.next(), count) {
        (None, _) => Ok(None),
        (Some(value), 1) => Ok(Some(value)),
        (Some(_), _) => Err(ShapeError { what, count }),
    }
}
