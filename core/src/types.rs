//! Placeholder schema types for APIs that declare no params, no body or no
//! response content.

use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};

use crate::schema::Schema;

/// Marker params type of APIs without query parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoParams {}

impl Schema for NoParams {}

/// Marker body type of APIs without a request body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoBody {}

impl Schema for NoBody {}

/// Response type that accepts and discards any payload, including an empty
/// body (`204 No Content`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NoContent {}

impl<'de> Deserialize<'de> for NoContent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        IgnoredAny::deserialize(deserializer)?;
        Ok(NoContent {})
    }
}

impl Schema for NoContent {}
