//! NGSI v2 response types and decoding.
//!
//! Decoding works on a completed response (status, a couple of headers and
//! the body bytes). Success bodies are deserialized into the expected type;
//! failure bodies are classified into an [`NgsiError`].

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::errors::NgsiError;

/// Error body as sent by the broker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    /// Error code (numeric string or broker-specific name).
    pub error: String,

    /// Human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Identifiers of the items the error applies to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affected_items: Option<Vec<String>>,
}

impl ErrorBody {
    /// Create a new error body with only a code.
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            description: None,
            affected_items: None,
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the affected items.
    pub fn with_affected_items(mut self, items: Vec<String>) -> Self {
        self.affected_items = Some(items);
        self
    }
}

/// A window of results plus the total count reported by the broker.
#[derive(Debug, Clone, PartialEq)]
pub struct Paginated<T> {
    /// Items in this window, in response order.
    pub items: Vec<T>,

    /// Requested offset.
    pub offset: usize,

    /// Requested limit.
    pub limit: usize,

    /// Total matching items, 0 when the broker did not report it.
    pub total: u64,
}

impl<T> Paginated<T> {
    /// Create a new page.
    pub fn new(items: Vec<T>, offset: usize, limit: usize, total: u64) -> Self {
        Self {
            items,
            offset,
            limit,
            total,
        }
    }

    /// Number of items in this window.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if this window is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Check whether the reported total extends past this window.
    pub fn has_more(&self) -> bool {
        (self.offset as u64).saturating_add(self.items.len() as u64) < self.total
    }

    /// Transform every item, keeping the pagination data.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated {
            items: self.items.into_iter().map(f).collect(),
            offset: self.offset,
            limit: self.limit,
            total: self.total,
        }
    }
}

impl<T> IntoIterator for Paginated<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

/// Entry point resource listing the main collections.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntryPoint {
    pub entities_url: String,
    pub types_url: String,
    pub subscriptions_url: String,
    pub registrations_url: String,
}

impl EntryPoint {
    /// Build the entry point for an API root such as `/v2`.
    pub fn new(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            entities_url: format!("{}/entities", base),
            types_url: format!("{}/types", base),
            subscriptions_url: format!("{}/subscriptions", base),
            registrations_url: format!("{}/registrations", base),
        }
    }
}

/// Errors produced while decoding a completed response.
#[derive(Debug, Error)]
pub enum ResponseError {
    /// The broker answered with an error.
    #[error(transparent)]
    Ngsi(#[from] NgsiError),

    /// A success body did not match the expected shape.
    #[error("Invalid response body: {0}")]
    Body(#[from] serde_json::Error),
}

/// A completed response, independent of the HTTP library that produced it.
#[derive(Debug, Clone, Default)]
pub struct RawResponse {
    /// HTTP status code.
    pub status: u16,

    /// HTTP reason phrase.
    pub status_text: String,

    /// Raw value of the total-count header, if present.
    pub total_count: Option<String>,

    /// Raw value of the `Location` header, if present.
    pub location: Option<String>,

    /// Response body.
    pub body: Bytes,
}

impl RawResponse {
    /// Create a response with a status and body.
    pub fn new(status: u16, status_text: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            status_text: status_text.into(),
            total_count: None,
            location: None,
            body: body.into(),
        }
    }

    /// Set the total-count header value.
    pub fn with_total_count(mut self, value: impl Into<String>) -> Self {
        self.total_count = Some(value.into());
        self
    }

    /// Set the `Location` header value.
    pub fn with_location(mut self, value: impl Into<String>) -> Self {
        self.location = Some(value.into());
        self
    }

    /// Check for a 4xx or 5xx status.
    pub fn is_failure(&self) -> bool {
        (400..600).contains(&self.status)
    }

    /// Fail with the decoded error when the status is 4xx or 5xx.
    pub fn error_for_status(&self) -> Result<(), NgsiError> {
        if self.is_failure() {
            Err(decode_error(self.status, &self.status_text, &self.body))
        } else {
            Ok(())
        }
    }

    /// Decode the body into `T`, or the error the broker reported.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, ResponseError> {
        self.error_for_status()?;
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Decode a list body into a page, reading the total from the header.
    pub fn decode_paginated<T: DeserializeOwned>(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<Paginated<T>, ResponseError> {
        let items: Vec<T> = self.decode()?;
        let total = parse_total_count(self.total_count.as_deref());
        Ok(Paginated::new(items, offset, limit, total))
    }
}

/// Parse the total-count header value.
///
/// Absent or non-numeric values count as 0; this never fails.
pub fn parse_total_count(value: Option<&str>) -> u64 {
    value
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(0)
}

/// Decode a failure response into a typed error.
///
/// Falls back to the raw status code and text when the body is not an
/// error body.
pub fn decode_error(status: u16, status_text: &str, body: &[u8]) -> NgsiError {
    match serde_json::from_slice::<ErrorBody>(body) {
        Ok(error_body) => NgsiError::from_error_body(status, error_body),
        Err(_) => NgsiError::Http {
            status,
            status_text: status_text.to_string(),
        },
    }
}
