use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use providers::chat::{ChatClient, ChatConfig};
use providers::http::{HttpDocumentService, HttpServiceConfig};
use providers::{DocumentService, ServiceError};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

type Captured = Arc<Mutex<Vec<Value>>>;

async fn spawn(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

fn service(base_url: String, token: Option<&str>) -> HttpDocumentService {
    HttpDocumentService::new(HttpServiceConfig {
        base_url,
        token: token.map(str::to_string),
        timeout: Duration::from_secs(5),
    })
    .unwrap()
}

#[tokio::test]
async fn folder_listing_falls_back_to_list_endpoint() {
    let router = Router::new().route(
        "/api/documents/folders/list",
        get(|| async { Json(json!({ "folders": ["/", "/Contracts"] })) }),
    );
    let svc = service(spawn(router).await, None);
    let folders = svc.list_folders().await.unwrap();
    assert_eq!(folders, vec!["/", "/Contracts"]);
}

#[tokio::test]
async fn documents_are_listed_with_bearer_token() {
    let router = Router::new().route(
        "/api/documents",
        get(|headers: HeaderMap| async move {
            let auth = headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string();
            if auth != "Bearer secret" {
                return Err(StatusCode::UNAUTHORIZED);
            }
            Ok(Json(json!([
                { "id": 1, "original_filename": "lease.pdf", "file_size": 10, "folder_path": null },
                { "id": 2, "original_filename": "nda.docx", "folder_path": "/Contracts" }
            ])))
        }),
    );
    let base = spawn(router).await;

    let docs = service(base.clone(), Some("secret"))
        .list_documents()
        .await
        .unwrap();
    assert_eq!(docs.len(), 2);
    assert_eq!(docs[1].folder_path.as_deref(), Some("/Contracts"));

    let err = service(base, None).list_documents().await.unwrap_err();
    assert!(matches!(err, ServiceError::Status { status: 401, .. }));
}

#[tokio::test]
async fn move_posts_destination_folder() {
    let captured: Captured = Arc::default();
    let router = Router::new()
        .route(
            "/api/documents/{id}/move",
            post(
                |State(seen): State<Captured>, Path(id): Path<i64>, Json(body): Json<Value>| async move {
                    seen.lock().unwrap().push(json!({ "id": id, "body": body }));
                    StatusCode::OK
                },
            ),
        )
        .with_state(captured.clone());
    let svc = service(spawn(router).await, None);

    svc.move_document(5, "/").await.unwrap();

    let seen = captured.lock().unwrap();
    assert_eq!(
        seen[0],
        json!({ "id": 5, "body": { "destination_folder": "/" } })
    );
}

#[tokio::test]
async fn server_message_is_extracted_from_error_body() {
    let router = Router::new().route(
        "/api/documents/{id}/copy",
        post(|| async {
            (
                StatusCode::BAD_REQUEST,
                Json(json!({ "detail": "Destination folder is read-only" })),
            )
        }),
    );
    let svc = service(spawn(router).await, None);
    let err = svc.copy_document(3, "/Archive").await.unwrap_err();
    assert_eq!(err.server_message(), Some("Destination folder is read-only"));
}

#[tokio::test]
async fn delete_folder_addresses_nested_path() {
    let captured: Captured = Arc::default();
    let router = Router::new()
        .route(
            "/api/documents/folders/{*path}",
            delete(|State(seen): State<Captured>, Path(path): Path<String>| async move {
                seen.lock().unwrap().push(Value::String(path));
                StatusCode::NO_CONTENT
            }),
        )
        .with_state(captured.clone());
    let svc = service(spawn(router).await, None);

    svc.delete_folder("/Contracts/Q1 2024").await.unwrap();

    assert_eq!(
        captured.lock().unwrap()[0],
        Value::String("Contracts/Q1 2024".into())
    );
}

#[tokio::test]
async fn create_folder_and_remote_bulk_bodies() {
    let captured: Captured = Arc::default();
    let record = |State(seen): State<Captured>, Json(body): Json<Value>| async move {
        seen.lock().unwrap().push(body);
        StatusCode::OK
    };
    let router = Router::new()
        .route("/api/documents/folders", post(record))
        .route("/api/documents/bulk/move", post(record))
        .route("/api/documents/bulk/delete", post(record))
        .with_state(captured.clone());
    let svc = service(spawn(router).await, None);

    svc.create_folder("2025", "/Contracts").await.unwrap();
    svc.bulk_move_remote(&[1, 2], "/Archive").await.unwrap();
    svc.bulk_delete_remote(&[3]).await.unwrap();

    let seen = captured.lock().unwrap();
    assert_eq!(seen[0], json!({ "folder_name": "2025", "parent_folder": "/Contracts" }));
    assert_eq!(
        seen[1],
        json!({ "document_ids": [1, 2], "destination_folder": "/Archive" })
    );
    assert_eq!(seen[2], json!({ "document_ids": [3] }));
}

fn chat(base_url: String) -> ChatClient {
    ChatClient::new(ChatConfig {
        base_url,
        token: None,
        timeout: Duration::from_secs(30),
    })
    .unwrap()
}

#[tokio::test]
async fn chat_reply_is_returned() {
    let router = Router::new().route(
        "/api/chat/sessions/{id}/messages",
        post(|Path(id): Path<String>| async move {
            Json(json!({ "response": "Filed.", "session_id": id }))
        }),
    );
    let client = chat(spawn(router).await);
    let reply = client
        .send_message("s1", "file the motion", &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(reply.message, "Filed.");
    assert_eq!(reply.session_id.as_deref(), Some("s1"));
}

#[tokio::test]
async fn chat_request_can_be_cancelled() {
    let router = Router::new().route(
        "/api/chat/sessions/{id}/messages",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(20)).await;
            Json(json!({ "message": "too late" }))
        }),
    );
    let client = chat(spawn(router).await);
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let err = client.send_message("s1", "hello", &cancel).await.unwrap_err();
    assert!(matches!(err, ServiceError::Cancelled));
    assert!(started.elapsed() < Duration::from_secs(10));
}
