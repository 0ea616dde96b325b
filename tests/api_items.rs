//! Integration tests per gli endpoints HTTP
//!
//! Test per:
//! - GET / e GET /health/db
//! - header X-API-Request-ID
//! - autenticazione sulle route degli item
//! - CRUD e paginazione di /items

mod common;

#[cfg(test)]
mod item_tests {
    use crate::common::{create_test_jwt, create_test_pool, create_test_server, create_test_state};
    use axum_test::TestServer;
    use axum_test::http::HeaderName;
    use serde_json::{Value, json};

    async fn server() -> TestServer {
        create_test_server(create_test_state(create_test_pool().await))
    }

    fn bearer(token: &str) -> String {
        format!("Bearer {}", token)
    }

    fn writer() -> String {
        bearer(&create_test_jwt("user-1", &["items:write"]))
    }

    fn reader() -> String {
        bearer(&create_test_jwt("user-2", &[]))
    }

    async fn create(server: &TestServer, name: &str, order: i64) -> Value {
        let response = server
            .post("/items")
            .add_header(HeaderName::from_static("authorization"), writer())
            .json(&json!({ "name": name, "order": order }))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);
        let body: Value = response.json();
        body["data"].clone()
    }

    #[tokio::test]
    async fn test_root_and_database_health() {
        let server = server().await;

        let response = server.get("/").await;
        response.assert_status_ok();
        assert_eq!(response.text(), "Server is running!");

        let response = server.get("/health/db").await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["status"], "success");
        assert_eq!(body["data"]["database"], true);
    }

    #[tokio::test]
    async fn test_every_response_carries_a_request_id() {
        let server = server().await;

        let first = server.get("/").await;
        let second = server.get("/items").await;

        let first_id = first.headers().get("x-api-request-id").expect("missing request id");
        let second_id = second.headers().get("x-api-request-id").expect("missing request id");
        assert!(!first_id.is_empty());
        assert_ne!(first_id, second_id);
    }

    #[tokio::test]
    async fn test_missing_token_is_forbidden() {
        let server = server().await;

        let response = server.get("/items").await;
        response.assert_status_forbidden();
        let body: Value = response.json();
        assert_eq!(body["status"], "input_error");
        assert_eq!(body["error"]["code"], 403);
    }

    #[tokio::test]
    async fn test_invalid_token_is_unauthorized() {
        let server = server().await;

        let response = server
            .get("/items")
            .add_header(HeaderName::from_static("authorization"), "Bearer invalid_token_here")
            .await;
        response.assert_status_unauthorized();

        let response = server
            .get("/items")
            .add_header(HeaderName::from_static("authorization"), "Basic dXNlcjpwYXNz")
            .await;
        response.assert_status_unauthorized();
    }

    #[tokio::test]
    async fn test_create_requires_write_scope() {
        let server = server().await;

        let response = server
            .post("/items")
            .add_header(HeaderName::from_static("authorization"), reader())
            .json(&json!({ "name": "Nope", "order": 1 }))
            .await;
        response.assert_status_forbidden();
    }

    #[tokio::test]
    async fn test_create_and_get_item() {
        let server = server().await;
        let created = create(&server, "Alpha", 3).await;
        let id = created["id"].as_str().unwrap();

        let response = server
            .get(&format!("/items/{}", id))
            .add_header(HeaderName::from_static("authorization"), reader())
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["status"], "success");
        assert_eq!(body["data"]["name"], "Alpha");
        assert_eq!(body["data"]["order"], 3);
        assert!(body["data"]["deleted_at"].is_null());
    }

    #[tokio::test]
    async fn test_duplicate_item_is_a_conflict() {
        let server = server().await;
        create(&server, "Alpha", 1).await;

        let response = server
            .post("/items")
            .add_header(HeaderName::from_static("authorization"), writer())
            .json(&json!({ "name": "Alpha", "order": 2 }))
            .await;
        response.assert_status_conflict();
    }

    #[tokio::test]
    async fn test_invalid_item_is_rejected() {
        let server = server().await;

        let response = server
            .post("/items")
            .add_header(HeaderName::from_static("authorization"), writer())
            .json(&json!({ "name": "", "order": 2 }))
            .await;
        response.assert_status_bad_request();
    }

    #[tokio::test]
    async fn test_list_items_paginates_with_cursor() {
        let server = server().await;
        for i in 0..5 {
            create(&server, &format!("Item {}", i), i).await;
        }

        let response = server
            .get("/items")
            .add_header(HeaderName::from_static("authorization"), reader())
            .add_query_param("sort_field", "order")
            .add_query_param("page_size", 3)
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        let orders: Vec<i64> = body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|item| item["order"].as_i64().unwrap())
            .collect();
        assert_eq!(orders, vec![0, 1, 2]);
        assert_eq!(body["pagination"]["has_next"], true);
        let cursor = body["pagination"]["cursor"].as_str().unwrap().to_string();

        let response = server
            .get("/items")
            .add_header(HeaderName::from_static("authorization"), reader())
            .add_query_param("sort_field", "order")
            .add_query_param("page_size", 3)
            .add_query_param("cursor", &cursor)
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        let orders: Vec<i64> = body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|item| item["order"].as_i64().unwrap())
            .collect();
        assert_eq!(orders, vec![3, 4]);
        assert_eq!(body["pagination"]["has_next"], false);
    }

    #[tokio::test]
    async fn test_list_items_with_filter() {
        let server = server().await;
        for i in 0..5 {
            create(&server, &format!("Item {}", i), i).await;
        }

        let filter = json!({ "field": "order", "operator": "in", "value": [1, 4] }).to_string();
        let response = server
            .get("/items")
            .add_header(HeaderName::from_static("authorization"), reader())
            .add_query_param("sort_field", "order")
            .add_query_param("filter", &filter)
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["data"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_list_items_rejects_bad_parameters() {
        let server = server().await;

        let response = server
            .get("/items")
            .add_header(HeaderName::from_static("authorization"), reader())
            .add_query_param("filter", "{not json")
            .await;
        response.assert_status_bad_request();

        let response = server
            .get("/items")
            .add_header(HeaderName::from_static("authorization"), reader())
            .add_query_param("page_size", 5000)
            .await;
        response.assert_status_bad_request();

        // nessun indice composito su (name, id)
        let response = server
            .get("/items")
            .add_header(HeaderName::from_static("authorization"), reader())
            .add_query_param("sort_field", "name")
            .await;
        response.assert_status_internal_server_error();
    }

    #[tokio::test]
    async fn test_patch_item() {
        let server = server().await;
        let created = create(&server, "Alpha", 1).await;
        let id = created["id"].as_str().unwrap();

        let response = server
            .patch(&format!("/items/{}", id))
            .add_header(HeaderName::from_static("authorization"), writer())
            .json(&json!({ "order": 9 }))
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["data"]["order"], 9);
        assert_eq!(body["data"]["name"], "Alpha");
        assert_eq!(body["data"]["created_at"], created["created_at"]);

        let response = server
            .patch(&format!("/items/{}", id))
            .add_header(HeaderName::from_static("authorization"), writer())
            .json(&json!({ "name": "" }))
            .await;
        response.assert_status_bad_request();

        let response = server
            .patch("/items/missing")
            .add_header(HeaderName::from_static("authorization"), writer())
            .json(&json!({ "order": 9 }))
            .await;
        response.assert_status_not_found();
    }

    #[tokio::test]
    async fn test_soft_delete_hides_item() {
        let server = server().await;
        let created = create(&server, "Alpha", 1).await;
        let id = created["id"].as_str().unwrap();

        let response = server
            .delete(&format!("/items/{}", id))
            .add_header(HeaderName::from_static("authorization"), writer())
            .await;
        response.assert_status_ok();

        let response = server
            .get(&format!("/items/{}", id))
            .add_header(HeaderName::from_static("authorization"), reader())
            .await;
        response.assert_status_not_found();
        let body: Value = response.json();
        assert_eq!(body["status"], "not_found");

        // già cancellato
        let response = server
            .delete(&format!("/items/{}", id))
            .add_header(HeaderName::from_static("authorization"), writer())
            .await;
        response.assert_status_not_found();

        // l'hard delete rimuove anche le righe soft-deleted
        let response = server
            .delete(&format!("/items/{}", id))
            .add_header(HeaderName::from_static("authorization"), writer())
            .add_query_param("soft", false)
            .await;
        response.assert_status_ok();
    }
}
