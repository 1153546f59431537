//! The module contains the errors the engine can return.
//!
//! The errors are:
//!
//! - [`InvalidArgument`] returned when the installment calculator gets a bad
//!   count or amount.
//! - [`Validation`] returned when a record fails structural validation. It
//!   carries one message per offending field.
//! - [`Reference`] returned when an account, category or tag does not exist or
//!   belongs to another tenant.
//! - [`KeyNotFound`] returned when the addressed record itself is missing.
//!
//!  [`InvalidArgument`]: EngineError::InvalidArgument
//!  [`Validation`]: EngineError::Validation
//!  [`Reference`]: EngineError::Reference
//!  [`KeyNotFound`]: EngineError::KeyNotFound
use std::{collections::BTreeMap, fmt};

use sea_orm::DbErr;
use thiserror::Error;

use crate::ResultEngine;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),
    #[error("Invalid reference: {0}")]
    Reference(String),
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::InvalidArgument(a), Self::InvalidArgument(b)) => a == b,
            (Self::Validation(a), Self::Validation(b)) => a == b,
            (Self::Reference(a), Self::Reference(b)) => a == b,
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::Forbidden(a), Self::Forbidden(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}

/// Field-keyed validation failures.
///
/// Keys are the record's field names (`amount`, `to_account_id`, ...) so a
/// caller can attach each message to the matching input. Adding a second
/// message for the same field replaces the first one.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationErrors(BTreeMap<&'static str, String>);

impl ValidationErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.insert(field, message.into());
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Message recorded for `field`, if any.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.0.iter().map(|(field, message)| (*field, message.as_str()))
    }

    /// `Ok(())` when nothing was recorded, otherwise [`EngineError::Validation`].
    pub fn into_result(self) -> ResultEngine<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(EngineError::Validation(self))
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in &self.0 {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
            first = false;
        }
        Ok(())
    }
}
