//! Router tests driven through `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use ngsi_api::{build_router, AppState, Handlers, ServerConfig};
use ngsi_protocol::{Attribute, Entity, ErrorBody, TOTAL_COUNT_HEADER};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tower::ServiceExt;

fn config() -> ServerConfig {
    let mut config = ServerConfig::default();
    config.seed_entities = vec![
        Entity::new("Room1", "Room")
            .with_attribute("temperature", Attribute::new(21.7).with_type("Number"))
            .unwrap(),
        Entity::new("Room2", "Room")
            .with_attribute("temperature", Attribute::new(19.0))
            .unwrap(),
        Entity::new("Car1", "Car"),
    ];
    config
}

fn app() -> Router {
    build_router(Arc::new(AppState::in_memory(config())))
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::ACCEPT, "application/json")
        .body(Body::empty())
        .unwrap()
}

fn send_json(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::ACCEPT, "application/json")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn error_body(response: axum::response::Response) -> ErrorBody {
    serde_json::from_value(body_json(response).await).unwrap()
}

// ============================================================================
// Entry point and negotiation
// ============================================================================

#[tokio::test]
async fn test_entry_point() {
    let response = app().oneshot(get("/v2")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({
            "entities_url": "/v2/entities",
            "types_url": "/v2/types",
            "subscriptions_url": "/v2/subscriptions",
            "registrations_url": "/v2/registrations"
        })
    );
}

#[tokio::test]
async fn test_accept_without_json_is_not_acceptable() {
    let request = Request::builder()
        .uri("/v2/entities")
        .header(header::ACCEPT, "text/html")
        .body(Body::empty())
        .unwrap();

    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_ACCEPTABLE);

    let body = error_body(response).await;
    assert_eq!(body.error, "406");
    assert_eq!(
        body.description.as_deref(),
        Some("Not Acceptable: Accepted MIME types: application/json.")
    );
}

#[tokio::test]
async fn test_health() {
    let response = app().oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"status": "ok"}));
}

// ============================================================================
// Entities
// ============================================================================

#[tokio::test]
async fn test_list_entities_with_count() {
    let response = app()
        .oneshot(get("/v2/entities?type=Room&limit=1&options=count"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[TOTAL_COUNT_HEADER], "2");

    let body = body_json(response).await;
    assert_eq!(
        body,
        json!([{
            "id": "Room1",
            "type": "Room",
            "temperature": {"value": 21.7, "type": "Number", "metadata": {}}
        }])
    );
}

#[tokio::test]
async fn test_list_entities_without_count_has_no_header() {
    let response = app().oneshot(get("/v2/entities")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(TOTAL_COUNT_HEADER).is_none());
    assert_eq!(body_json(response).await.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_list_entities_id_and_pattern_incompatible() {
    let response = app()
        .oneshot(get("/v2/entities?id=Room1&idPattern=Room.*"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = error_body(response).await;
    assert_eq!(body.error, "400");
    assert!(body
        .description
        .unwrap()
        .ends_with("id is not compatible with idPattern"));
}

#[tokio::test]
async fn test_list_entities_bad_syntax_lists_offenders() {
    let response = app()
        .oneshot(get("/v2/entities?type=Room%24&attrs=temp,pres%23sure"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = error_body(response).await;
    assert_eq!(
        body.affected_items,
        Some(vec!["Room$".to_string(), "pres#sure".to_string()])
    );
}

#[tokio::test]
async fn test_list_entities_unsupported_option() {
    let response = app()
        .oneshot(get("/v2/entities?options=keyValues"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
    let body = error_body(response).await;
    assert_eq!(
        body.description.as_deref(),
        Some("Unsupported option value: keyValues")
    );
}

#[tokio::test]
async fn test_list_entities_geo_not_evaluated() {
    let response = app()
        .oneshot(get(
            "/v2/entities?georel=near%3BmaxDistance%3A1000&geometry=point&coords=40.41,-3.7",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);

    let response = app()
        .oneshot(get("/v2/entities?georel=near&geometry=point&coords=40.41,-3.7"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        error_body(response).await.affected_items,
        Some(vec![String::new()])
    );
}

#[tokio::test]
async fn test_list_entities_limit_above_max() {
    let response = app()
        .oneshot(get("/v2/entities?limit=5000"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_and_retrieve_entity() {
    let app = app();

    let response = app
        .clone()
        .oneshot(send_json(
            Method::POST,
            "/v2/entities",
            json!({"id": "Room3", "type": "Room", "pressure": {"value": 720}}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(
        response.headers()[header::LOCATION],
        "/v2/entities/Room3?type=Room"
    );

    let response = app
        .clone()
        .oneshot(get("/v2/entities/Room3?attrs=pressure"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({"id": "Room3", "type": "Room", "pressure": {"value": 720, "metadata": {}}})
    );

    let response = app
        .oneshot(send_json(
            Method::POST,
            "/v2/entities",
            json!({"id": "Room3", "type": "Room"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error_body(response).await.error, "Unprocessable");
}

#[tokio::test]
async fn test_create_entity_rejects_bad_id() {
    let response = app()
        .oneshot(send_json(
            Method::POST,
            "/v2/entities",
            json!({"id": "Room 3", "type": "Room"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        error_body(response).await.affected_items,
        Some(vec!["Room 3".to_string()])
    );
}

#[tokio::test]
async fn test_retrieve_ambiguous_entity_conflicts() {
    let app = app();
    let response = app
        .clone()
        .oneshot(send_json(
            Method::POST,
            "/v2/entities",
            json!({"id": "Room1", "type": "Office"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app.oneshot(get("/v2/entities/Room1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let body = error_body(response).await;
    assert_eq!(body.error, "409");
    assert!(body
        .description
        .unwrap()
        .ends_with("GET /v2/entities/Room1?type=Office"));
}

#[tokio::test]
async fn test_missing_entity_not_found() {
    let response = app().oneshot(get("/v2/entities/Nope")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(error_body(response).await.error, "NotFound");
}

#[tokio::test]
async fn test_path_id_bad_syntax() {
    for uri in [
        "/v2/entities/Bad%24Id",
        "/v2/entities/Bad%24Id/attrs/temperature",
        "/v2/subscriptions/Bad%24Id",
    ] {
        let response = app().oneshot(get(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(
            error_body(response).await.affected_items,
            Some(vec!["Bad$Id".to_string()])
        );
    }

    let response = app()
        .oneshot(
            Request::builder()
                .method(Method::DELETE)
                .uri("/v2/entities/Bad%24Id")
                .header(header::ACCEPT, "application/json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update_and_retrieve_attribute() {
    let app = app();

    let response = app
        .clone()
        .oneshot(send_json(
            Method::POST,
            "/v2/entities/Room2/attrs?type=Room",
            json!({"temperature": {"value": 23.5, "type": "Number"}}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .oneshot(get("/v2/entities/Room2/attrs/temperature"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({"value": 23.5, "type": "Number", "metadata": {}})
    );
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/v2/entities")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_body(response).await.error, "400");
}

#[tokio::test]
async fn test_delete_entity() {
    let app = app();

    let request = Request::builder()
        .method(Method::DELETE)
        .uri("/v2/entities/Car1")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app.oneshot(get("/v2/entities/Car1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ============================================================================
// Subscriptions and unsupported operations
// ============================================================================

#[tokio::test]
async fn test_subscription_lifecycle() {
    let app = app();

    let response = app
        .clone()
        .oneshot(send_json(
            Method::POST,
            "/v2/subscriptions",
            json!({
                "subject": {"entities": [{"idPattern": ".*", "type": "Room"}]},
                "notification": {"http": {"url": "http://localhost:1028/accumulate"}},
                "throttling": 5
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let location = response.headers()[header::LOCATION]
        .to_str()
        .unwrap()
        .to_string();
    assert!(location.starts_with("/v2/subscriptions/"));

    let response = app.clone().oneshot(get(&location)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], json!("active"));
    assert_eq!(body["throttling"], json!(5));

    let response = app
        .clone()
        .oneshot(get("/v2/subscriptions?options=count"))
        .await
        .unwrap();
    assert_eq!(response.headers()[TOTAL_COUNT_HEADER], "1");

    let request = Request::builder()
        .method(Method::DELETE)
        .uri(&location)
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_invalid_subscription_rejected() {
    let response = app()
        .oneshot(send_json(
            Method::POST,
            "/v2/subscriptions",
            json!({
                "subject": {"entities": [{"id": "Room1", "idPattern": ".*"}]},
                "notification": {"http": {"url": "http://localhost:1028/accumulate"}}
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_disabled_subscriptions_are_unsupported() {
    let mut config = config();
    config.subscriptions.enabled = false;
    let app = build_router(Arc::new(AppState::in_memory(config)));

    let response = app.oneshot(get("/v2/subscriptions")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
    assert_eq!(
        error_body(response).await.description.as_deref(),
        Some("this operation 'listSubscriptions' is not implemented")
    );
}

#[tokio::test]
async fn test_empty_registry_answers_unsupported() {
    let state = AppState::new(ServerConfig::default(), Handlers::unsupported());
    let app = build_router(Arc::new(state));

    let response = app.oneshot(get("/v2/entities/Room1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
    assert_eq!(
        error_body(response).await.description.as_deref(),
        Some("this operation 'retrieveEntity' is not implemented")
    );
}
