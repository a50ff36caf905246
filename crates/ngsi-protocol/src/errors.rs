//! NGSI v2 error taxonomy.

use thiserror::Error;

use crate::responses::ErrorBody;

/// Result type alias using NgsiError.
pub type NgsiResult<T> = Result<T, NgsiError>;

const INVALID_REQUEST: &str = "The incoming request is invalid in this context.";
const NOT_COMPATIBLE: &str = " is not compatible with ";
const BAD_SYNTAX: &str = " has a bad syntax.";
const UNSUPPORTED_OPTION: &str = "Unsupported option value: ";
const UNSUPPORTED_OPERATION_PREFIX: &str = "this operation '";
const UNSUPPORTED_OPERATION_SUFFIX: &str = "' is not implemented";
const NOT_ACCEPTABLE: &str = "Not Acceptable: Accepted MIME types: application/json.";

/// Errors raised or decoded at the NGSI v2 protocol level.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum NgsiError {
    /// Malformed request body or parameters.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Two mutually exclusive parameters were both supplied.
    #[error("Incompatible parameters: {first} is not compatible with {second}")]
    IncompatibleParameter { first: String, second: String },

    /// One or more parameter values fail the syntax rules.
    #[error("Invalid syntax: {}", .0.join(", "))]
    InvalidSyntax(Vec<String>),

    /// The requested representation cannot be produced.
    #[error("Not acceptable")]
    NotAcceptable,

    /// A singular lookup matched more than one entity.
    #[error("Conflicting entities: {description}")]
    ConflictingEntities {
        description: String,
        /// Request that would disambiguate the lookup, when known.
        alternative: Option<String>,
    },

    /// Unclassified server-side failure.
    #[error("Internal error: {0}")]
    InternalError(String),

    /// The operation is recognized but not implemented by this server.
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// A requested option is recognized but not implemented.
    #[error("Unsupported option: {0}")]
    UnsupportedOption(String),

    /// Any other error carrying an explicit code from the broker.
    #[error("{} ({})", .body.error, .body.description.as_deref().unwrap_or("no description"))]
    Generic { status: u16, body: ErrorBody },

    /// A failure response whose body could not be read as an error.
    #[error("HTTP {status} {status_text}")]
    Http { status: u16, status_text: String },
}

impl NgsiError {
    /// Create a conflict error suggesting a disambiguating request.
    pub fn conflicting_entities(entity_id: &str, alternative: impl Into<String>) -> Self {
        let alternative = alternative.into();
        NgsiError::ConflictingEntities {
            description: format!(
                "Too many results. There are several results that match with the entityId ({}) used in the request. Instead of, you can use {}",
                entity_id, alternative
            ),
            alternative: Some(alternative),
        }
    }

    /// Create an incompatible-parameter error.
    pub fn incompatible(first: impl Into<String>, second: impl Into<String>) -> Self {
        NgsiError::IncompatibleParameter {
            first: first.into(),
            second: second.into(),
        }
    }

    /// Create a 404 error in the broker's own vocabulary.
    pub fn not_found(description: impl Into<String>) -> Self {
        NgsiError::Generic {
            status: 404,
            body: ErrorBody::new("NotFound").with_description(description),
        }
    }

    /// Create a 422 error in the broker's own vocabulary.
    pub fn unprocessable(description: impl Into<String>) -> Self {
        NgsiError::Generic {
            status: 422,
            body: ErrorBody::new("Unprocessable").with_description(description),
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            NgsiError::BadRequest(_)
            | NgsiError::IncompatibleParameter { .. }
            | NgsiError::InvalidSyntax(_) => 400,
            NgsiError::NotAcceptable => 406,
            NgsiError::ConflictingEntities { .. } => 409,
            NgsiError::InternalError(_) => 500,
            NgsiError::UnsupportedOperation(_) | NgsiError::UnsupportedOption(_) => 501,
            NgsiError::Generic { status, .. } | NgsiError::Http { status, .. } => *status,
        }
    }

    /// Get the error code as carried in the `error` field of the wire body.
    pub fn code(&self) -> String {
        match self {
            NgsiError::Generic { body, .. } => body.error.clone(),
            other => other.status_code().to_string(),
        }
    }

    /// Get the human-readable description.
    pub fn description(&self) -> Option<String> {
        match self {
            NgsiError::BadRequest(msg) | NgsiError::InternalError(msg) => Some(msg.clone()),
            NgsiError::IncompatibleParameter { first, second } => Some(format!(
                "{} {}{}{}",
                INVALID_REQUEST, first, NOT_COMPATIBLE, second
            )),
            NgsiError::InvalidSyntax(values) => Some(format!(
                "{} {}{}",
                INVALID_REQUEST,
                values.join(", "),
                BAD_SYNTAX
            )),
            NgsiError::NotAcceptable => Some(NOT_ACCEPTABLE.to_string()),
            NgsiError::ConflictingEntities { description, .. } => Some(description.clone()),
            NgsiError::UnsupportedOperation(op) => Some(format!(
                "{}{}{}",
                UNSUPPORTED_OPERATION_PREFIX, op, UNSUPPORTED_OPERATION_SUFFIX
            )),
            NgsiError::UnsupportedOption(option) => {
                Some(format!("{}{}", UNSUPPORTED_OPTION, option))
            }
            NgsiError::Generic { body, .. } => body.description.clone(),
            NgsiError::Http { .. } => None,
        }
    }

    /// Get the affected item identifiers, if any.
    pub fn affected_items(&self) -> Option<Vec<String>> {
        match self {
            NgsiError::InvalidSyntax(values) => Some(values.clone()),
            NgsiError::Generic { body, .. } => body.affected_items.clone(),
            _ => None,
        }
    }

    /// Convert to the wire error body.
    pub fn to_error_body(&self) -> ErrorBody {
        ErrorBody {
            error: self.code(),
            description: self.description(),
            affected_items: self.affected_items(),
        }
    }

    /// Classify a decoded error body into a typed error.
    ///
    /// The body's `error` code drives the classification; bodies that do not
    /// carry a recognised code stay `Generic` with the response status.
    pub fn from_error_body(status: u16, body: ErrorBody) -> Self {
        let description = body.description.clone().unwrap_or_default();

        match body.error.as_str() {
            "409" | "TooManyResults" => NgsiError::ConflictingEntities {
                description,
                alternative: None,
            },
            "406" | "NotAcceptable" => NgsiError::NotAcceptable,
            "500" | "InternalServerError" => NgsiError::InternalError(description),
            "501" => {
                if let Some(option) = description.strip_prefix(UNSUPPORTED_OPTION) {
                    return NgsiError::UnsupportedOption(option.to_string());
                }
                if let Some(op) = description
                    .strip_prefix(UNSUPPORTED_OPERATION_PREFIX)
                    .and_then(|rest| rest.strip_suffix(UNSUPPORTED_OPERATION_SUFFIX))
                {
                    return NgsiError::UnsupportedOperation(op.to_string());
                }
                NgsiError::Generic { status, body }
            }
            "400" | "BadRequest" => Self::classify_bad_request(description, body.affected_items),
            _ => NgsiError::Generic { status, body },
        }
    }

    fn classify_bad_request(description: String, affected_items: Option<Vec<String>>) -> Self {
        let detail = description
            .strip_prefix(INVALID_REQUEST)
            .map(str::trim_start);

        if let Some(detail) = detail {
            // An empty offender leaves no space before the suffix.
            let bad_syntax = detail.ends_with(BAD_SYNTAX.trim_start());
            if let (Some(items), true) = (affected_items, bad_syntax) {
                return NgsiError::InvalidSyntax(items);
            }
            if let Some((first, second)) = detail.split_once(NOT_COMPATIBLE) {
                return NgsiError::incompatible(first, second);
            }
        }

        NgsiError::BadRequest(description)
    }
}

impl From<serde_json::Error> for NgsiError {
    fn from(err: serde_json::Error) -> Self {
        NgsiError::BadRequest(format!("Parse error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(NgsiError::BadRequest("x".to_string()).status_code(), 400);
        assert_eq!(NgsiError::incompatible("id", "idPattern").status_code(), 400);
        assert_eq!(NgsiError::InvalidSyntax(vec!["a$".to_string()]).status_code(), 400);
        assert_eq!(NgsiError::NotAcceptable.status_code(), 406);
        assert_eq!(NgsiError::conflicting_entities("Room1", "x").status_code(), 409);
        assert_eq!(NgsiError::InternalError("x".to_string()).status_code(), 500);
        assert_eq!(NgsiError::UnsupportedOperation("x".to_string()).status_code(), 501);
        assert_eq!(NgsiError::UnsupportedOption("x".to_string()).status_code(), 501);
        assert_eq!(NgsiError::not_found("x").status_code(), 404);
    }

    #[test]
    fn test_invalid_syntax_body_carries_values() {
        let err = NgsiError::InvalidSyntax(vec!["bad$id".to_string(), "other#".to_string()]);
        let body = err.to_error_body();

        assert_eq!(body.error, "400");
        assert!(body.description.unwrap().contains("bad$id, other# has a bad syntax"));
        assert_eq!(
            body.affected_items,
            Some(vec!["bad$id".to_string(), "other#".to_string()])
        );
    }

    #[test]
    fn test_conflicting_entities_description() {
        let err = NgsiError::conflicting_entities("Room1", "GET /v2/entities/Room1?type=Room");
        let description = err.description().unwrap();

        assert!(description.contains("Room1"));
        assert!(description.ends_with("GET /v2/entities/Room1?type=Room"));
    }

    #[test]
    fn test_not_acceptable_has_fixed_message() {
        let body = NgsiError::NotAcceptable.to_error_body();
        assert_eq!(body.error, "406");
        assert_eq!(body.description.as_deref(), Some(NOT_ACCEPTABLE));
        assert!(body.affected_items.is_none());
    }

    #[test]
    fn test_every_server_kind_survives_its_wire_body() {
        let errors = vec![
            NgsiError::BadRequest("Missing entity id".to_string()),
            NgsiError::incompatible("id", "idPattern"),
            NgsiError::InvalidSyntax(vec!["a$".to_string(), "b#".to_string()]),
            NgsiError::InvalidSyntax(vec![String::new()]),
            NgsiError::NotAcceptable,
            NgsiError::InternalError("boom".to_string()),
            NgsiError::UnsupportedOperation("retrieveSubscription".to_string()),
            NgsiError::UnsupportedOption("keyValues".to_string()),
            NgsiError::not_found("The requested entity has not been found"),
        ];

        for err in errors {
            let decoded = NgsiError::from_error_body(err.status_code(), err.to_error_body());
            assert_eq!(decoded, err);
        }
    }

    #[test]
    fn test_conflict_decodes_without_alternative() {
        let err = NgsiError::conflicting_entities("Room1", "GET /v2/entities/Room1?type=Room");
        let decoded = NgsiError::from_error_body(409, err.to_error_body());

        match decoded {
            NgsiError::ConflictingEntities {
                description,
                alternative,
            } => {
                assert_eq!(Some(description), err.description());
                assert!(alternative.is_none());
            }
            other => panic!("expected conflict, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_501_stays_generic() {
        let body = ErrorBody::new("501").with_description("something else");
        let err = NgsiError::from_error_body(501, body.clone());
        assert_eq!(err, NgsiError::Generic { status: 501, body });
    }

    #[test]
    fn test_generic_code_is_body_code() {
        let err = NgsiError::unprocessable("Already Exists");
        assert_eq!(err.code(), "Unprocessable");
        assert_eq!(err.status_code(), 422);
        assert_eq!(err.description().as_deref(), Some("Already Exists"));
    }

    #[test]
    fn test_error_display() {
        let err = NgsiError::InvalidSyntax(vec!["a$".to_string(), "b#".to_string()]);
        assert_eq!(format!("{}", err), "Invalid syntax: a$, b#");

        let err = NgsiError::Http {
            status: 500,
            status_text: "Internal Server Error".to_string(),
        };
        assert_eq!(format!("{}", err), "HTTP 500 Internal Server Error");
    }
}
