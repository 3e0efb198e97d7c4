// Boundary validation through the HTTP surface.
//
// Requests here are rejected before the store runs a query, so the
// offline app answers deterministically: a 503 would mean validation
// leaked a payload through to the pool. The page-ceiling test is the one
// exception; there the 503 proves the handler got past the clamp.

mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::{json, Value};
use uuid::Uuid;

fn detail_fields(body: &Value) -> Vec<&str> {
    body["error"]["details"]
        .as_array()
        .map(|details| {
            details
                .iter()
                .filter_map(|d| d["field"].as_str())
                .collect()
        })
        .unwrap_or_default()
}

#[tokio::test]
async fn create_profile_reports_missing_fields() -> Result<()> {
    let app = common::offline_app();
    // registration is public
    let (status, body) =
        common::send(&app, "POST", "/profiles", None, Some(json!({ "nome": "Ana" }))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["error"]["message"], "Validation failed");
    let fields = detail_fields(&body);
    for expected in ["email", "profile_password", "cpf", "telefone", "data_nascimento"] {
        assert!(fields.contains(&expected), "missing {expected} in {body}");
    }
    Ok(())
}

#[tokio::test]
async fn unknown_fields_are_rejected() -> Result<()> {
    let app = common::offline_app();
    let token = common::bearer_token();
    let (status, body) = common::send(
        &app,
        "POST",
        "/tags",
        Some(&token),
        Some(json!({ "name": "rust", "color": "orange" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(detail_fields(&body), vec!["color"]);
    Ok(())
}

#[tokio::test]
async fn conversation_requires_a_title() -> Result<()> {
    let app = common::offline_app();
    let token = common::bearer_token();
    let (status, body) = common::send(
        &app,
        "POST",
        "/conversations",
        Some(&token),
        Some(json!({ "profile_id": Uuid::new_v4() })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(detail_fields(&body).contains(&"title"));
    Ok(())
}

#[tokio::test]
async fn message_sender_role_must_be_in_the_enum() -> Result<()> {
    let app = common::offline_app();
    let token = common::bearer_token();
    let (status, body) = common::send(
        &app,
        "POST",
        "/messages",
        Some(&token),
        Some(json!({
            "conversation_id": Uuid::new_v4(),
            "sender_role": "robot",
            "content": "beep"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(detail_fields(&body), vec!["sender_role"]);
    Ok(())
}

#[tokio::test]
async fn birth_date_must_be_iso_formatted() -> Result<()> {
    let app = common::offline_app();
    let (status, body) = common::send(
        &app,
        "POST",
        "/profiles",
        None,
        Some(json!({
            "nome": "Ana",
            "email": common::unique_email("ana"),
            "profile_password": "secret1",
            "cpf": "12345678901",
            "telefone": "11999990000",
            "data_nascimento": "31/12/1999"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(detail_fields(&body), vec!["data_nascimento"]);
    Ok(())
}

#[tokio::test]
async fn cpf_length_is_enforced() -> Result<()> {
    let app = common::offline_app();
    let (status, body) = common::send(
        &app,
        "POST",
        "/profiles",
        None,
        Some(json!({
            "nome": "Ana",
            "email": common::unique_email("ana"),
            "profile_password": "secret1",
            "cpf": "123",
            "telefone": "11999990000",
            "data_nascimento": "2000-01-01"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(detail_fields(&body), vec!["cpf"]);
    Ok(())
}

#[tokio::test]
async fn email_shape_is_checked() -> Result<()> {
    let app = common::offline_app();
    let (status, body) = common::send(
        &app,
        "POST",
        "/profiles",
        None,
        Some(json!({
            "nome": "Ana",
            "email": "not-an-email",
            "profile_password": "secret1",
            "cpf": "12345678901",
            "telefone": "11999990000",
            "data_nascimento": "2000-01-01"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(detail_fields(&body), vec!["email"]);
    Ok(())
}

#[tokio::test]
async fn null_is_rejected_for_required_fields() -> Result<()> {
    let app = common::offline_app();
    let token = common::bearer_token();
    let (status, body) = common::send(
        &app,
        "POST",
        "/tags",
        Some(&token),
        Some(json!({ "name": null })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(detail_fields(&body), vec!["name"]);
    Ok(())
}

#[tokio::test]
async fn invalid_uuid_path_params_are_a_400_not_a_404() -> Result<()> {
    let app = common::offline_app();
    let token = common::bearer_token();
    for uri in ["/documents/not-a-uuid", "/messages/42", "/profiles/xyz"] {
        let (status, body) = common::send(&app, "GET", uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body["error"]["message"], "Invalid path parameter");
        assert_eq!(detail_fields(&body), vec!["id"]);
    }
    Ok(())
}

#[tokio::test]
async fn update_rejects_empty_payloads() -> Result<()> {
    let app = common::offline_app();
    let token = common::bearer_token();
    let uri = format!("/documents/{}", Uuid::new_v4());
    let (status, body) = common::send(&app, "PATCH", &uri, Some(&token), Some(json!({}))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(detail_fields(&body), vec!["body"]);
    Ok(())
}

#[tokio::test]
async fn update_rejects_create_only_fields() -> Result<()> {
    let app = common::offline_app();
    let token = common::bearer_token();
    let uri = format!("/messages/{}", Uuid::new_v4());
    let (status, body) = common::send(
        &app,
        "PATCH",
        &uri,
        Some(&token),
        Some(json!({ "conversation_id": Uuid::new_v4() })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(detail_fields(&body), vec!["conversation_id"]);
    Ok(())
}

#[tokio::test]
async fn non_object_bodies_are_rejected() -> Result<()> {
    let app = common::offline_app();
    let token = common::bearer_token();
    let (status, body) =
        common::send(&app, "POST", "/tags", Some(&token), Some(json!(["rust"]))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(detail_fields(&body), vec!["body"]);
    Ok(())
}

#[tokio::test]
async fn attach_tag_body_must_carry_a_tag_id_uuid() -> Result<()> {
    let app = common::offline_app();
    let token = common::bearer_token();
    let uri = format!("/documents/{}/tags", Uuid::new_v4());
    let (status, _) = common::send(
        &app,
        "POST",
        &uri,
        Some(&token),
        Some(json!({ "tag_id": "not-a-uuid" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn malformed_list_queries_use_the_envelope() -> Result<()> {
    let app = common::offline_app();
    let token = common::bearer_token();
    let (status, body) = common::send(&app, "GET", "/tags?limit=abc", Some(&token), None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false), "body: {body}");
    let message = body["error"]["message"].as_str().unwrap_or_default();
    assert!(message.starts_with("Invalid query string"), "body: {body}");
    Ok(())
}

#[tokio::test]
async fn listing_survives_a_degenerate_page_ceiling() -> Result<()> {
    // config loading refuses a zero ceiling; a state built by hand still
    // must not panic on the clamp
    let app = common::offline_app_with(|config| config.api.max_page_size = 0);
    let token = common::bearer_token();
    let (status, body) = common::send(&app, "GET", "/tags", Some(&token), None).await;

    // reached the store and failed on the unreachable pool
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE, "body: {body}");
    Ok(())
}
