//! Validation of operator-provided names.

use crate::error::{CoreError, Result};
use crate::types::MAX_NAME_LEN;

/// Validates the label used in a generated migration file name.
///
/// The label becomes part of `<timestamp>-<label>.sql`, so it must not be
/// empty, must not contain a path separator, and must stay shorter than
/// [`MAX_NAME_LEN`] bytes.
///
/// # Examples
///
/// ```
/// use exodus_core::validate_label;
///
/// assert!(validate_label("add_users").is_ok());
/// assert!(validate_label("../escape").is_err());
/// ```
pub fn validate_label(label: &str) -> Result<()> {
    if label.trim().is_empty()
        || label.len() >= MAX_NAME_LEN
        || label.contains('/')
        || label.contains('\\')
        || label.contains('\0')
    {
        return Err(CoreError::InvalidLabel(label.to_string()));
    }
    Ok(())
}

/// Validates a table name passed to recreation mode.
pub fn validate_table_name(table: &str) -> Result<()> {
    if table.trim().is_empty() || table.len() >= MAX_NAME_LEN {
        return Err(CoreError::InvalidTableName(table.to_string()));
    }
    Ok(())
}
