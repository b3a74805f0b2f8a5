use axum::http::StatusCode;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::Duration;
use serde_json::json;
use uuid::Uuid;

use marketplace::token::{Payload, TokenMaker};

mod utils;

use utils::*;

#[tokio::test]
async fn test_listing_lifecycle() {
    let setup = TestSetupBuilder::new().build();
    let login = setup.register_and_login("seller@example.com", "seller").await;
    let token = login["access_token"].as_str().unwrap();

    let created = setup.create_goods(token).await;
    assert_eq!(created.status, StatusCode::OK, "{}", created.body);
    assert_eq!(created.body["category_title_list"], json!(["digital", "furniture"]));
    assert_eq!(created.body["goods_image_list"].as_array().unwrap().len(), 2);

    let goods_uri = format!("/api/goods/{}", created.body["goods_id"]);

    // Promoting an attached image to default detaches it from the image list
    let updated = setup
        .send(
            "PATCH",
            &goods_uri,
            Some(token),
            Some(json!({
                "price": 120000,
                "default_image_url": "desk-side.png",
                "add_category_id_list": [3],
                "delete_category_id_list": [1]
            })),
        )
        .await;
    assert_eq!(updated.status, StatusCode::OK, "{}", updated.body);
    assert_eq!(updated.body["price"], 120000);
    assert_eq!(updated.body["title"], "standing desk");
    assert_eq!(updated.body["default_image_url"], "desk-side.png");
    assert_eq!(updated.body["category_title_list"], json!(["furniture", "clothing"]));
    let images = updated.body["goods_image_list"].as_array().unwrap();
    assert_eq!(images.len(), 1);
    assert_eq!(images[0]["image_url"], "desk-front.png");

    let list = setup
        .send("GET", "/api/goods?page_id=1&page_size=10", Some(token), None)
        .await;
    assert_eq!(list.status, StatusCode::OK);
    assert_eq!(list.body["goods_list"].as_array().unwrap().len(), 1);

    let deleted = setup.send("DELETE", &goods_uri, Some(token), None).await;
    assert_eq!(deleted.status, StatusCode::OK);

    let fetched = setup.send("GET", &goods_uri, Some(token), None).await;
    assert_eq!(fetched.status, StatusCode::NOT_FOUND);
    assert_eq!(fetched.code(), "NOT_FOUND_GOODS");
}

#[tokio::test]
async fn test_missing_category_leaves_no_listing() {
    let setup = TestSetupBuilder::new().build();
    let login = setup.register_and_login("seller@example.com", "seller").await;
    let token = login["access_token"].as_str().unwrap();

    let created = setup
        .send(
            "POST",
            "/api/goods",
            Some(token),
            Some(json!({
                "title": "lamp",
                "price": 0,
                "description": "free",
                "category_id_list": [1, 99],
                "default_image_url": "lamp.png",
                "image_url_list": ["lamp.png"]
            })),
        )
        .await;
    assert_eq!(created.status, StatusCode::NOT_FOUND);
    assert_eq!(created.code(), "NOT_FOUND_CATEGORY");
    assert_eq!(setup.goods.goods_count().await, 0);
}

#[tokio::test]
async fn test_only_owner_may_modify() {
    let setup = TestSetupBuilder::new().build();
    let seller = setup.register_and_login("seller@example.com", "seller").await;
    let buyer = setup.register_and_login("buyer@example.com", "buyer").await;

    let created = setup
        .create_goods(seller["access_token"].as_str().unwrap())
        .await;
    let goods_uri = format!("/api/goods/{}", created.body["goods_id"]);
    let buyer_token = buyer["access_token"].as_str().unwrap();

    // Anyone authenticated may read
    let fetched = setup.send("GET", &goods_uri, Some(buyer_token), None).await;
    assert_eq!(fetched.status, StatusCode::OK);

    let updated = setup
        .send("PATCH", &goods_uri, Some(buyer_token), Some(json!({"title": "mine"})))
        .await;
    assert_eq!(updated.status, StatusCode::FORBIDDEN);

    let deleted = setup.send("DELETE", &goods_uri, Some(buyer_token), None).await;
    assert_eq!(deleted.status, StatusCode::FORBIDDEN);
    assert_eq!(deleted.code(), "FORBIDDEN_USER");
}

#[tokio::test]
async fn test_refresh_token_rotation_and_blocking() {
    let setup = TestSetupBuilder::new().build();
    let login = setup.register_and_login("seller@example.com", "seller").await;
    let refresh_token = login["refresh_token"].as_str().unwrap();

    let renewed = setup
        .send(
            "POST",
            "/api/auth/renew-access-token",
            None,
            Some(json!({"refresh_token": refresh_token})),
        )
        .await;
    assert_eq!(renewed.status, StatusCode::OK, "{}", renewed.body);

    // The renewed access token works on protected routes
    let renewed_token = renewed.body["access_token"].as_str().unwrap();
    let list = setup
        .send("GET", "/api/goods?page_id=1&page_size=10", Some(renewed_token), None)
        .await;
    assert_eq!(list.status, StatusCode::OK);

    let payload = setup.token_maker.verify_token(refresh_token).unwrap();
    assert!(setup.sessions.block_session(payload.id).await);

    let blocked = setup
        .send(
            "POST",
            "/api/auth/renew-access-token",
            None,
            Some(json!({"refresh_token": refresh_token})),
        )
        .await;
    assert_eq!(blocked.status, StatusCode::UNAUTHORIZED);
    assert_eq!(blocked.code(), "BLOCKED_SESSION");
}

#[tokio::test]
async fn test_expired_refresh_token() {
    let setup = TestSetupBuilder::new()
        .with_refresh_token_duration(Duration::seconds(-1))
        .build();
    let login = setup.register_and_login("seller@example.com", "seller").await;

    let renewed = setup
        .send(
            "POST",
            "/api/auth/renew-access-token",
            None,
            Some(json!({"refresh_token": login["refresh_token"]})),
        )
        .await;
    assert_eq!(renewed.status, StatusCode::UNAUTHORIZED);
    assert_eq!(renewed.code(), "EXPIRED_TOKEN");
}

#[tokio::test]
async fn test_unsigned_token_is_rejected() {
    let setup = TestSetupBuilder::new().build();
    setup.register_and_login("seller@example.com", "seller").await;

    let payload = Payload::new(Uuid::new_v4(), 1, Duration::minutes(5));
    let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"none","typ":"JWT"}"#);
    let claims = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&payload).unwrap());
    let forged = format!("{header}.{claims}.");

    let response = setup
        .send("GET", "/api/goods?page_id=1&page_size=10", Some(&forged), None)
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.code(), "INVALID_TOKEN");
}

#[tokio::test]
async fn test_nickname_change() {
    let setup = TestSetupBuilder::new().build();
    let seller = setup.register_and_login("seller@example.com", "seller").await;
    setup.register_and_login("buyer@example.com", "buyer").await;
    let token = seller["access_token"].as_str().unwrap();

    let taken = setup
        .send("PATCH", "/api/users/me", Some(token), Some(json!({"nickname": "buyer"})))
        .await;
    assert_eq!(taken.status, StatusCode::CONFLICT);
    assert_eq!(taken.code(), "DUPLICATE_NICKNAME");

    let renamed = setup
        .send("PATCH", "/api/users/me", Some(token), Some(json!({"nickname": "merchant"})))
        .await;
    assert_eq!(renamed.status, StatusCode::OK);
    assert_eq!(renamed.body["nickname"], "merchant");
}
