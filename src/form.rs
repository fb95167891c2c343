//! Request Body Decoding
//!
//! Bodies are read as JSON objects and each field is decoded on its own, so a
//! missing or mistyped field is reported under its own name.

use crate::error::{AuthError, FieldErrors};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

pub const REQUIRED: &str = "This field is required.";
pub const NOT_NULL: &str = "This field may not be null.";
pub const NOT_A_STRING: &str = "Not a valid string.";

/// A JSON object being decoded into a request, collecting per-field errors
pub struct FormFields {
    fields: Map<String, Value>,
    errors: FieldErrors,
}

impl FormFields {
    pub fn new(body: Value) -> Result<Self, AuthError> {
        match body {
            Value::Object(fields) => Ok(Self {
                fields,
                errors: FieldErrors::new(),
            }),
            _ => Err(AuthError::field(
                "non_field_errors",
                "Invalid data. Expected a dictionary.",
            )),
        }
    }

    /// Decode a required field, recording `invalid` if it has the wrong shape
    pub fn required<T: DeserializeOwned>(&mut self, name: &str, invalid: &str) -> Option<T> {
        let message = match self.fields.remove(name) {
            None => REQUIRED,
            Some(Value::Null) => NOT_NULL,
            Some(value) => match serde_json::from_value(value) {
                Ok(decoded) => return Some(decoded),
                Err(_) => invalid,
            },
        };

        self.errors
            .entry(name.to_string())
            .or_default()
            .push(message.to_string());
        None
    }

    /// The collected errors; non-empty whenever a `required` call returned `None`
    pub fn into_error(self) -> AuthError {
        AuthError::Validation(self.errors)
    }
}
