use validator::{Validate, ValidationErrors};

use crate::error::AppError;

/// The single human-readable message returned to the client.
///
/// Field names are visited in sorted order so the choice is stable across
/// runs (`ValidationErrors` is backed by a `HashMap`).
pub fn first_message(errors: &ValidationErrors) -> String {
    let fields = errors.field_errors();
    let mut names: Vec<_> = fields.keys().collect();
    names.sort();

    names
        .into_iter()
        .filter_map(|name| {
            fields.get(name).and_then(|errs| errs.first()).map(|err| {
                err.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("{name} is invalid"))
            })
        })
        .next()
        .unwrap_or_else(|| "Invalid request".to_string())
}

pub fn validate<T: Validate>(value: &T) -> Result<(), AppError> {
    value.validate().map_err(AppError::from)
}
