//! Serving-side validation of incoming filter parameters.

use serde::Deserialize;

use crate::errors::NgsiError;
use crate::geo::GeoQuery;
use crate::query::EntityQuery;

/// Maximum length of a single filter value.
pub const MAX_FIELD_LENGTH: usize = 256;

/// Options recognised by the protocol but not implemented here.
const UNSUPPORTED_OPTIONS: &[&str] = &["keyValues", "values", "unique", "append"];

/// Check a single value against the field syntax rule.
///
/// Values are at most 256 characters of ASCII letters, digits, `_` and `-`.
pub fn is_valid_field(value: &str) -> bool {
    value.len() <= MAX_FIELD_LENGTH
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Check a comma-joined list, collecting every offending item.
pub fn invalid_list_items(list: &str) -> Vec<String> {
    list.split(',')
        .filter(|item| !is_valid_field(item))
        .map(str::to_string)
        .collect()
}

/// Fail with one syntax error naming every offending item of the given lists.
pub fn check_syntax<'a>(lists: impl IntoIterator<Item = &'a str>) -> Result<(), NgsiError> {
    let invalid: Vec<String> = lists.into_iter().flat_map(invalid_list_items).collect();
    if invalid.is_empty() {
        Ok(())
    } else {
        Err(NgsiError::InvalidSyntax(invalid))
    }
}

/// Fail with one syntax error naming every offending single value.
///
/// Unlike [`check_syntax`], values are not split on commas.
pub fn check_fields<'a>(values: impl IntoIterator<Item = &'a str>) -> Result<(), NgsiError> {
    let invalid: Vec<String> = values
        .into_iter()
        .filter(|value| !is_valid_field(value))
        .map(str::to_string)
        .collect();
    if invalid.is_empty() {
        Ok(())
    } else {
        Err(NgsiError::InvalidSyntax(invalid))
    }
}

/// Fail if two mutually exclusive parameters are both present.
pub fn check_exclusive(
    first_name: &str,
    first: Option<&str>,
    second_name: &str,
    second: Option<&str>,
) -> Result<(), NgsiError> {
    if first.is_some() && second.is_some() {
        return Err(NgsiError::incompatible(first_name, second_name));
    }
    Ok(())
}

/// Raw filter parameters as received on the entities endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EntityParams {
    /// Comma-separated entity ids.
    pub id: Option<String>,

    /// Entity id pattern, kept whole.
    #[serde(rename = "idPattern")]
    pub id_pattern: Option<String>,

    /// Comma-separated entity types.
    #[serde(rename = "type")]
    pub type_: Option<String>,

    /// Comma-separated attributes to project.
    pub attrs: Option<String>,

    /// Free-form filter expression.
    pub query: Option<String>,

    /// Comma-separated ordering attributes, `!` marking descending.
    #[serde(rename = "orderBy")]
    pub order_by: Option<String>,

    /// Geo relation, with `;modifier:distance` for `near`.
    pub georel: Option<String>,

    /// Geo-query geometry.
    pub geometry: Option<String>,

    /// Geo-query coordinates.
    pub coords: Option<String>,

    /// Number of items to skip.
    pub offset: Option<String>,

    /// Maximum number of items to return.
    pub limit: Option<String>,

    /// Comma-separated options such as `count`.
    pub options: Option<String>,
}

impl EntityParams {
    /// Validate the parameters and build the equivalent query.
    ///
    /// Checks run in order: id/idPattern exclusivity, value syntax (all
    /// offenders reported together), pagination numbers, geo parameters,
    /// options.
    pub fn into_query(self) -> Result<EntityQuery, NgsiError> {
        let id = non_empty(self.id);
        let id_pattern = non_empty(self.id_pattern);
        let type_ = non_empty(self.type_);
        let attrs = non_empty(self.attrs);
        let order_by = non_empty(self.order_by);

        check_exclusive("id", id.as_deref(), "idPattern", id_pattern.as_deref())?;

        check_syntax(
            [&id, &type_, &attrs]
                .into_iter()
                .flatten()
                .map(String::as_str),
        )?;
        if let Some(order_by) = &order_by {
            // Descending order is marked with a leading '!'
            check_syntax(
                order_by
                    .split(',')
                    .map(|item| item.strip_prefix('!').unwrap_or(item)),
            )?;
        }

        let offset = parse_count(non_empty(self.offset))?;
        let limit = parse_count(non_empty(self.limit))?;

        let geo = match (
            non_empty(self.georel),
            non_empty(self.geometry),
            non_empty(self.coords),
        ) {
            (None, None, None) => None,
            (Some(georel), Some(geometry), Some(coords)) => {
                Some(GeoQuery::parse(&georel, &geometry, &coords)?)
            }
            _ => {
                return Err(NgsiError::BadRequest(
                    "georel, geometry and coords must be used together".to_string(),
                ))
            }
        };

        let count = parse_options(non_empty(self.options).as_deref())?;

        Ok(EntityQuery {
            ids: split_list(id),
            // A pattern may itself contain commas, so it is kept whole.
            id_patterns: id_pattern.into_iter().collect(),
            types: split_list(type_),
            attrs: split_list(attrs),
            query: non_empty(self.query),
            order_by: split_list(order_by),
            geo,
            offset,
            limit,
            count,
        })
    }
}

/// Raw pagination parameters as received on list endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageParams {
    /// Number of items to skip.
    pub offset: Option<String>,

    /// Maximum number of items to return.
    pub limit: Option<String>,

    /// Comma-separated options such as `count`.
    pub options: Option<String>,
}

impl PageParams {
    /// Validate and return `(offset, limit, count)`; a missing limit is 0.
    pub fn into_page(self) -> Result<(usize, usize, bool), NgsiError> {
        let offset = parse_count(non_empty(self.offset))?;
        let limit = parse_count(non_empty(self.limit))?;
        let count = parse_options(non_empty(self.options).as_deref())?;
        Ok((offset, limit, count))
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn split_list(value: Option<String>) -> Vec<String> {
    value
        .map(|v| v.split(',').map(str::to_string).collect())
        .unwrap_or_default()
}

fn parse_count(value: Option<String>) -> Result<usize, NgsiError> {
    match value {
        None => Ok(0),
        Some(v) => v
            .trim()
            .parse::<usize>()
            .map_err(|_| NgsiError::InvalidSyntax(vec![v])),
    }
}

/// Parse the `options` parameter, returning whether `count` was requested.
pub fn parse_options(options: Option<&str>) -> Result<bool, NgsiError> {
    let mut count = false;
    for option in options.into_iter().flat_map(|o| o.split(',')) {
        match option.trim() {
            "count" => count = true,
            other if UNSUPPORTED_OPTIONS.contains(&other) => {
                return Err(NgsiError::UnsupportedOption(other.to_string()))
            }
            other => {
                return Err(NgsiError::BadRequest(format!(
                    "Invalid value for URI param /options/: {}",
                    other
                )))
            }
        }
    }
    Ok(count)
}
