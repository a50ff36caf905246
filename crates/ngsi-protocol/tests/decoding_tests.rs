//! Tests for entity encoding and response decoding.

use ngsi_protocol::responses::decode_error;
use ngsi_protocol::{Attribute, Entity, NgsiError, RawResponse, ResponseError};
use serde_json::json;

// ============================================================================
// Entity round trips
// ============================================================================

#[test]
fn test_entity_round_trip_keeps_value_and_empty_metadata() {
    let entity = Entity::new("Room1", "Room")
        .with_attribute("temperature", Attribute::new(21.7))
        .unwrap();

    let json = serde_json::to_string(&entity).unwrap();
    let decoded: Entity = serde_json::from_str(&json).unwrap();

    assert_eq!(decoded.id, "Room1");
    assert_eq!(decoded.type_, "Room");
    let attribute = decoded.attribute("temperature").unwrap();
    assert_eq!(attribute.value, json!(21.7));
    assert!(attribute.type_.is_none());
    assert!(attribute.metadata.is_empty());
    assert_eq!(decoded, entity);
}

#[test]
fn test_attribute_without_metadata_key_decodes_empty() {
    let entity: Entity = serde_json::from_str(
        r#"{"id":"Room1","type":"Room","temperature":{"value":21.7}}"#,
    )
    .unwrap();

    let json = serde_json::to_value(&entity).unwrap();
    assert_eq!(json["temperature"]["metadata"], json!({}));
}

// ============================================================================
// Success decoding
// ============================================================================

#[test]
fn test_paginated_total_from_header() {
    let body = json!([{"id": "Room1", "type": "Room"}, {"id": "Room2", "type": "Room"}]);
    let response = RawResponse::new(200, "OK", body.to_string()).with_total_count("7");

    let page = response.decode_paginated::<Entity>(0, 2).unwrap();
    assert_eq!(page.len(), 2);
    assert_eq!(page.total, 7);
    assert_eq!((page.offset, page.limit), (0, 2));
    assert!(page.has_more());
}

#[test]
fn test_missing_total_header_is_zero() {
    let response = RawResponse::new(200, "OK", "[]");
    let page = response.decode_paginated::<Entity>(0, 0).unwrap();
    assert_eq!(page.total, 0);
}

#[test]
fn test_non_numeric_total_header_is_zero() {
    let response = RawResponse::new(200, "OK", "[]").with_total_count("lots");
    let page = response.decode_paginated::<Entity>(10, 5).unwrap();
    assert_eq!(page.total, 0);
    assert!(page.is_empty());
}

#[test]
fn test_malformed_success_body_is_codec_error() {
    let response = RawResponse::new(200, "OK", r#"[{"id":"Room1","type":"Room","t":{"type":"x"}}]"#);
    let result = response.decode::<Vec<Entity>>();
    assert!(matches!(result, Err(ResponseError::Body(_))));
}

// ============================================================================
// Failure decoding
// ============================================================================

#[test]
fn test_conflict_body_decodes_to_conflict() {
    let response = RawResponse::new(
        409,
        "Conflict",
        r#"{"error":"409","description":"Too many results"}"#,
    );

    match response.decode::<Entity>() {
        Err(ResponseError::Ngsi(NgsiError::ConflictingEntities { description, .. })) => {
            assert_eq!(description, "Too many results");
        }
        other => panic!("expected conflict, got {:?}", other),
    }
}

#[test]
fn test_unparseable_error_body_falls_back_to_status() {
    let response = RawResponse::new(500, "Internal Server Error", "<html>oops</html>");

    match response.decode::<Entity>() {
        Err(ResponseError::Ngsi(err)) => {
            assert_eq!(
                err,
                NgsiError::Http {
                    status: 500,
                    status_text: "Internal Server Error".to_string()
                }
            );
            assert_eq!(err.status_code(), 500);
            assert!(err.description().is_none());
        }
        other => panic!("expected error, got {:?}", other),
    }
}

#[test]
fn test_broker_not_found_is_generic() {
    let err = decode_error(
        404,
        "Not Found",
        br#"{"error":"NotFound","description":"The requested entity has not been found. Check type and id"}"#,
    );

    match err {
        NgsiError::Generic { status, body } => {
            assert_eq!(status, 404);
            assert_eq!(body.error, "NotFound");
            assert!(body.description.unwrap().contains("Check type and id"));
        }
        other => panic!("expected generic, got {:?}", other),
    }
}

#[test]
fn test_generic_keeps_affected_items() {
    let err = decode_error(
        404,
        "Not Found",
        br#"{"error":"PartialUpdate","description":"Some entities failed","affectedItems":["Room1","Room3"]}"#,
    );
    assert_eq!(
        err.affected_items(),
        Some(vec!["Room1".to_string(), "Room3".to_string()])
    );
}

#[test]
fn test_not_acceptable_decoded() {
    let err = decode_error(406, "Not Acceptable", br#"{"error":"NotAcceptable"}"#);
    assert_eq!(err, NgsiError::NotAcceptable);
}

#[test]
fn test_empty_success_body_for_unit() {
    // 204 responses carry no body; callers that expect nothing check status only.
    let response = RawResponse::new(204, "No Content", "");
    assert!(response.error_for_status().is_ok());
}
