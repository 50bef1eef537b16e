mod common;

use common::{spawn_app, token_of};
use serde_json::Value;

#[tokio::test]
async fn create_chirp_records_caller_as_author() {
    let app = spawn_app().await;
    let login = app.signed_in_user("u@x.com", "pw123").await;

    let response = app.post_chirp(&token_of(&login), "hello world").await;
    assert_eq!(201, response.status().as_u16());

    let chirp: Value = response.json().await.unwrap();
    assert_eq!(chirp["body"], "hello world");
    assert_eq!(chirp["author_id"], login["user"]["id"]);
}

#[tokio::test]
async fn chirp_longer_than_140_characters_returns_400() {
    let app = spawn_app().await;
    let login = app.signed_in_user("u@x.com", "pw123").await;
    let token = token_of(&login);

    let response = app.post_chirp(&token, &"a".repeat(141)).await;
    assert_eq!(400, response.status().as_u16());

    let response = app.post_chirp(&token, &"a".repeat(140)).await;
    assert_eq!(201, response.status().as_u16());
}

#[tokio::test]
async fn profanity_is_replaced() {
    let app = spawn_app().await;
    let login = app.signed_in_user("u@x.com", "pw123").await;

    let response = app
        .post_chirp(&token_of(&login), "I had something interesting for breakfast Kerfuffle Sharbert")
        .await;
    assert_eq!(201, response.status().as_u16());

    let chirp: Value = response.json().await.unwrap();
    assert_eq!(chirp["body"], "I had something interesting for breakfast **** ****");
}

#[tokio::test]
async fn chirps_are_listed_in_id_order_and_fetchable() {
    let app = spawn_app().await;
    let login = app.signed_in_user("u@x.com", "pw123").await;
    let token = token_of(&login);

    for body in ["first", "second", "third"] {
        assert_eq!(201, app.post_chirp(&token, body).await.status().as_u16());
    }

    let response = app
        .client
        .get(app.url("/api/chirps"))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(200, response.status().as_u16());

    let chirps: Vec<Value> = response.json().await.unwrap();
    let bodies: Vec<&str> = chirps.iter().map(|c| c["body"].as_str().unwrap()).collect();
    assert_eq!(bodies, vec!["first", "second", "third"]);

    let second_id = chirps[1]["id"].as_i64().unwrap();
    let response = app
        .client
        .get(app.url(&format!("/api/chirps/{}", second_id)))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(200, response.status().as_u16());
    let chirp: Value = response.json().await.unwrap();
    assert_eq!(chirp["body"], "second");
}

#[tokio::test]
async fn fetching_missing_or_non_numeric_chirp_returns_404() {
    let app = spawn_app().await;

    for path in ["/api/chirps/999", "/api/chirps/abc"] {
        let response = app
            .client
            .get(app.url(path))
            .send()
            .await
            .expect("Failed to execute request.");
        assert_eq!(404, response.status().as_u16(), "Expected 404 for {}", path);
    }
}

#[tokio::test]
async fn only_the_author_can_delete_a_chirp() {
    let app = spawn_app().await;
    let author = app.signed_in_user("author@x.com", "pw123").await;
    let other = app.signed_in_user("other@x.com", "pw123").await;

    let response = app.post_chirp(&token_of(&author), "mine").await;
    let chirp: Value = response.json().await.unwrap();
    let path = app.url(&format!("/api/chirps/{}", chirp["id"]));

    let response = app
        .client
        .delete(&path)
        .bearer_auth(token_of(&other))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(403, response.status().as_u16());

    let response = app
        .client
        .delete(&path)
        .bearer_auth(token_of(&author))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(204, response.status().as_u16());

    let response = app
        .client
        .delete(&path)
        .bearer_auth(token_of(&author))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(404, response.status().as_u16());
}

#[tokio::test]
async fn deleting_requires_authentication() {
    let app = spawn_app().await;

    let response = app
        .client
        .delete(app.url("/api/chirps/1"))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(401, response.status().as_u16());
}
