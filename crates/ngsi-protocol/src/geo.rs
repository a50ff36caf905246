//! Geo-query parsing.
//!
//! A geo-query arrives as three request parameters:
//!
//! - `georel`: a relation, optionally followed by `;modifier:distance` for `near`
//! - `geometry`: one of `point`, `line`, `polygon`, `box`
//! - `coords`: a flat list of numbers, `lat,lon;lat,lon;...`
//!
//! Parsing either yields a fully validated [`GeoQuery`] or a single
//! [`NgsiError::InvalidSyntax`] naming the first offending input.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::NgsiError;

/// A latitude/longitude pair.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Coordinate {
    /// Latitude in degrees.
    pub latitude: f64,

    /// Longitude in degrees.
    pub longitude: f64,
}

impl Coordinate {
    /// Create a coordinate from latitude and longitude.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

macro_rules! wire_enum {
    ($(#[$meta:meta])* $name:ident { $($(#[$vmeta:meta])* $variant:ident => $wire:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                $(#[$vmeta])*
                #[serde(rename = $wire)]
                $variant,
            )+
        }

        impl $name {
            /// Wire name of this value.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire,)+
                }
            }
        }

        impl FromStr for $name {
            type Err = ();

            /// Case-sensitive match against the wire names.
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($wire => Ok($name::$variant),)+
                    _ => Err(()),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

wire_enum! {
    /// Spatial relation between the query geometry and entity locations.
    Relation {
        Near => "near",
        CoveredBy => "coveredBy",
        Intersects => "intersects",
        Equals => "equals",
        Disjoint => "disjoint",
    }
}

wire_enum! {
    /// Distance modifier for the `near` relation.
    Modifier {
        MaxDistance => "maxDistance",
        MinDistance => "minDistance",
    }
}

wire_enum! {
    /// Geometry of the query shape.
    Geometry {
        Point => "point",
        Line => "line",
        Polygon => "polygon",
        /// Two corners of a box.
        Box => "box",
    }
}

/// A validated geo-query.
///
/// `modifier` and `distance` are present exactly when `relation` is `near`.
/// Build one with [`GeoQuery::parse`], [`GeoQuery::new`] or [`GeoQuery::near`].
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GeoQuery {
    /// Spatial relation.
    pub relation: Relation,

    /// Distance modifier (only for `near`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modifier: Option<Modifier>,

    /// Distance in meters (only for `near`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,

    /// Query geometry.
    pub geometry: Geometry,

    /// Geometry coordinates, in input order.
    pub coordinates: Vec<Coordinate>,
}

impl GeoQuery {
    /// Create a non-`near` geo-query.
    pub fn new(
        relation: Relation,
        geometry: Geometry,
        coordinates: Vec<Coordinate>,
    ) -> Result<Self, NgsiError> {
        if relation == Relation::Near {
            return Err(NgsiError::BadRequest(
                "near requires a modifier and a distance".to_string(),
            ));
        }
        Self::check_coordinates(&coordinates)?;
        Ok(Self {
            relation,
            modifier: None,
            distance: None,
            geometry,
            coordinates,
        })
    }

    /// Create a `near` geo-query.
    pub fn near(
        modifier: Modifier,
        distance: f64,
        geometry: Geometry,
        coordinates: Vec<Coordinate>,
    ) -> Result<Self, NgsiError> {
        if !Self::is_valid_distance(distance) {
            return Err(NgsiError::InvalidSyntax(vec![format!(
                "{}:{}",
                modifier, distance
            )]));
        }
        Self::check_coordinates(&coordinates)?;
        Ok(Self {
            relation: Relation::Near,
            modifier: Some(modifier),
            distance: Some(distance),
            geometry,
            coordinates,
        })
    }

    fn check_coordinates(coordinates: &[Coordinate]) -> Result<(), NgsiError> {
        if coordinates.is_empty() {
            return Err(NgsiError::InvalidSyntax(vec!["coords".to_string()]));
        }
        Ok(())
    }

    fn is_valid_distance(distance: f64) -> bool {
        distance.is_finite() && distance >= 0.0
    }

    /// Parse the three geo-query request parameters.
    ///
    /// Inputs are checked in order: relation, `near` modifier and distance,
    /// geometry, coordinates. The first failure is reported.
    ///
    /// Segments of `georel` after the first are ignored for relations other
    /// than `near`.
    pub fn parse(georel: &str, geometry: &str, coords: &str) -> Result<Self, NgsiError> {
        let mut segments = georel.split(';');
        let relation_segment = segments.next().unwrap_or_default();

        let relation = Relation::from_str(relation_segment)
            .map_err(|_| NgsiError::InvalidSyntax(vec![relation_segment.to_string()]))?;

        let near = if relation == Relation::Near {
            let segment = segments.next().unwrap_or_default();
            Some(Self::parse_distance(segment)?)
        } else {
            None
        };

        let geometry = Geometry::from_str(geometry)
            .map_err(|_| NgsiError::InvalidSyntax(vec![geometry.to_string()]))?;

        let coordinates = parse_coordinates(coords)?;

        Ok(Self {
            relation,
            modifier: near.map(|(modifier, _)| modifier),
            distance: near.map(|(_, distance)| distance),
            geometry,
            coordinates,
        })
    }

    /// Parse the `modifier:distance` segment of a `near` relation.
    fn parse_distance(segment: &str) -> Result<(Modifier, f64), NgsiError> {
        let syntax_error = || NgsiError::InvalidSyntax(vec![segment.to_string()]);

        let parts: Vec<&str> = segment.split(':').collect();
        if parts.len() != 2 {
            return Err(syntax_error());
        }

        let modifier = Modifier::from_str(parts[0]).map_err(|_| syntax_error())?;
        let distance: f64 = parts[1].trim().parse().map_err(|_| syntax_error())?;

        if !Self::is_valid_distance(distance) {
            return Err(syntax_error());
        }

        Ok((modifier, distance))
    }

    /// Encode the `georel` request parameter.
    pub fn georel(&self) -> String {
        match (self.modifier, self.distance) {
            (Some(modifier), Some(distance)) => {
                format!("{};{}:{}", self.relation, modifier, distance)
            }
            _ => self.relation.to_string(),
        }
    }

    /// Encode the `geometry` request parameter.
    pub fn geometry_param(&self) -> &'static str {
        self.geometry.as_str()
    }

    /// Encode the `coords` request parameter.
    pub fn coords_param(&self) -> String {
        self.coordinates
            .iter()
            .map(|c| format!("{},{}", c.latitude, c.longitude))
            .collect::<Vec<_>>()
            .join(";")
    }
}

/// Parse a `coords` parameter into coordinate pairs.
///
/// The input is split on `;` or `,` (surrounding whitespace ignored) into a
/// flat list of numbers, dropping trailing empty tokens. The list must be
/// non-empty and of even length; each consecutive pair is read as latitude
/// then longitude. Every number must be finite.
pub fn parse_coordinates(coords: &str) -> Result<Vec<Coordinate>, NgsiError> {
    let syntax_error = || NgsiError::InvalidSyntax(vec!["coords".to_string()]);

    let mut tokens: Vec<&str> = coords.split([';', ',']).map(str::trim).collect();
    while tokens.last().is_some_and(|t| t.is_empty()) {
        tokens.pop();
    }
    if tokens.is_empty() || tokens.len() % 2 != 0 {
        return Err(syntax_error());
    }

    let number = |token: &str| {
        token
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .ok_or_else(syntax_error)
    };

    tokens
        .chunks_exact(2)
        .map(|pair| Ok(Coordinate::new(number(pair[0])?, number(pair[1])?)))
        .collect()
}
