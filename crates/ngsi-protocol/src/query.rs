//! Entity filter and pagination parameters.
//!
//! [`EntityQuery`] is a pure encoder: it never fails and never checks that
//! its inputs are mutually compatible. Incoming requests are validated on the
//! serving side instead (see [`crate::validation`]).

use crate::geo::GeoQuery;

/// Filter, projection and pagination criteria for listing entities.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityQuery {
    /// Entity ids to match.
    pub ids: Vec<String>,

    /// Entity id patterns to match.
    pub id_patterns: Vec<String>,

    /// Entity types to match.
    pub types: Vec<String>,

    /// Attributes to include in the result.
    pub attrs: Vec<String>,

    /// Free-form filter expression.
    pub query: Option<String>,

    /// Attributes to order the result by.
    pub order_by: Vec<String>,

    /// Spatial filter.
    pub geo: Option<GeoQuery>,

    /// Number of items to skip.
    pub offset: usize,

    /// Maximum number of items to return.
    pub limit: usize,

    /// Ask the broker to report the total count.
    pub count: bool,
}

impl EntityQuery {
    /// Create an empty query (matches everything).
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the entity ids.
    pub fn with_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ids = ids.into_iter().map(Into::into).collect();
        self
    }

    /// Set the entity id patterns.
    pub fn with_id_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.id_patterns = patterns.into_iter().map(Into::into).collect();
        self
    }

    /// Set the entity types.
    pub fn with_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.types = types.into_iter().map(Into::into).collect();
        self
    }

    /// Set the attributes to return.
    pub fn with_attrs<I, S>(mut self, attrs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attrs = attrs.into_iter().map(Into::into).collect();
        self
    }

    /// Set the ordering attributes.
    pub fn with_order_by<I, S>(mut self, order_by: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.order_by = order_by.into_iter().map(Into::into).collect();
        self
    }

    /// Set the filter expression.
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    /// Set the spatial filter.
    pub fn with_geo(mut self, geo: GeoQuery) -> Self {
        self.geo = Some(geo);
        self
    }

    /// Set the pagination window.
    pub fn with_page(mut self, offset: usize, limit: usize) -> Self {
        self.offset = offset;
        self.limit = limit;
        self
    }

    /// Request the total count.
    pub fn with_count(mut self, count: bool) -> Self {
        self.count = count;
        self
    }

    /// Encode as ordered query parameters.
    ///
    /// Empty lists and absent values are omitted, lists are joined with `,`,
    /// and `offset`/`limit` only appear when greater than zero.
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();

        push_list(&mut params, "id", &self.ids);
        push_list(&mut params, "idPattern", &self.id_patterns);
        push_list(&mut params, "type", &self.types);
        push_list(&mut params, "attrs", &self.attrs);

        if let Some(query) = &self.query {
            params.push(("query", query.clone()));
        }

        push_list(&mut params, "orderBy", &self.order_by);

        if let Some(geo) = &self.geo {
            params.push(("georel", geo.georel()));
            params.push(("geometry", geo.geometry_param().to_string()));
            params.push(("coords", geo.coords_param()));
        }

        if self.offset > 0 {
            params.push(("offset", self.offset.to_string()));
        }
        if self.limit > 0 {
            params.push(("limit", self.limit.to_string()));
        }
        if self.count {
            params.push(("options", "count".to_string()));
        }

        params
    }

    /// Encode as a percent-encoded query string (without the leading `?`).
    pub fn to_query_string(&self) -> String {
        encode_params(&self.to_params())
    }
}

fn push_list(params: &mut Vec<(&'static str, String)>, name: &'static str, values: &[String]) {
    if !values.is_empty() {
        params.push((name, values.join(",")));
    }
}

/// Percent-encode parameter pairs into a query string.
pub fn encode_params(params: &[(&str, String)]) -> String {
    params
        .iter()
        .map(|(name, value)| format!("{}={}", name, urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Encode only pagination parameters (used by list endpoints other than entities).
pub fn page_params(offset: usize, limit: usize, count: bool) -> Vec<(&'static str, String)> {
    EntityQuery::new()
        .with_page(offset, limit)
        .with_count(count)
        .to_params()
}
