use crate::{
    config::Config,
    docs::ApiDoc,
    handlers::{
        deactivate_session_doc, diagnostics, get_doc, get_or_create_session_doc, get_session_doc,
        health_check, ready_check, update_doc,
    },
    routes::auth_middleware::auth_middleware,
    state::AppState,
    websocket::handler::websocket_handler,
};
use axum::{
    extract::DefaultBodyLimit,
    http::{header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE}, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::{Any, CorsLayer}, trace::TraceLayer};
use tracing::warn;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

// Room for the JSON envelope around the largest accepted content
const BODY_OVERHEAD_BYTES: usize = 64 * 1024;

fn cors_layer(config: &Config) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    let origins: Vec<HeaderValue> = config
        .cors_origin_list()
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    if origins.is_empty() && config.is_development() {
        base.allow_origin(Any)
    } else {
        base.allow_origin(origins).allow_credentials(true)
    }
}

/// Build the full HTTP/WebSocket application
pub fn create_app(state: Arc<AppState>) -> Router {
    let protected_routes = Router::new()
        .route(
            "/v1/sessions/:session_id/document",
            post(get_or_create_session_doc).get(get_session_doc),
        )
        .route("/v1/sessions/:session_id/document/deactivate", post(deactivate_session_doc))
        .route("/v1/documents/:document_id", get(get_doc).put(update_doc))
        .route("/v1/documents/:document_id/ws", get(websocket_handler))
        .route("/v1/diagnostics", get(diagnostics))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware)); // Applies to all routes added above

    let public_routes = Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(ready_check));

    let body_limit = state.docs.limits().max_content_bytes + BODY_OVERHEAD_BYTES;
    let cors = cors_layer(&state.config);

    Router::new()
        .nest("/api", public_routes.merge(protected_routes))
        .merge(SwaggerUi::new("/swagger").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryDocumentStore;
    use crate::services::session_service::StaticSessionDirectory;
    use axum::{body::Body, http::{Request, StatusCode}};
    use futures_util::{SinkExt, StreamExt};
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::{json, Value};
    use std::time::Duration;
    use tokio_tungstenite::tungstenite::{client::IntoClientRequest, Message as WsMessage};
    use tower::ServiceExt;

    const SECRET: &str = "test-secret";

    fn state() -> Arc<AppState> {
        let config = Config {
            cloud_auth_jwt_secret: Some(SECRET.to_string()),
            doc_max_content_bytes: 16,
            ..Config::default()
        };
        let sessions = StaticSessionDirectory::new()
            .with_session(42, ["ada", "bob"])
            .with_session(43, ["bob"]);
        Arc::new(AppState::new(config, Arc::new(MemoryDocumentStore::new()), Arc::new(sessions)))
    }

    fn token(claims: Value) -> String {
        let mut claims = claims;
        claims["exp"] = json!(chrono::Utc::now().timestamp() + 300);
        encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET.as_bytes())).unwrap()
    }

    fn user(id: &str) -> String {
        token(json!({"sub": id, "type": "user", "name": id}))
    }

    fn service() -> String {
        token(json!({"sub": "session-service", "type": "service"}))
    }

    async fn call(app: &Router, method: &str, uri: &str, bearer: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(bearer) = bearer {
            req = req.header(AUTHORIZATION, format!("Bearer {}", bearer));
        }
        let req = match body {
            Some(body) => req
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => req.body(Body::empty()).unwrap(),
        };
        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
        (status, json)
    }

    #[tokio::test]
    async fn health_is_public_and_api_requires_a_token() {
        let app = create_app(state());
        let (status, body) = call(&app, "GET", "/api/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");

        let (status, _) = call(&app, "GET", "/api/ready", None, None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = call(&app, "POST", "/api/v1/sessions/42/document", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn participants_share_one_document_per_session() {
        let app = create_app(state());
        let (status, first) = call(&app, "POST", "/api/v1/sessions/42/document", Some(&user("ada")), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first["sessionId"], 42);
        assert_eq!(first["version"], 0);
        assert_eq!(first["isActive"], true);

        let (_, second) = call(&app, "POST", "/api/v1/sessions/42/document", Some(&user("bob")), None).await;
        assert_eq!(first["documentId"], second["documentId"]);

        let uri = format!("/api/v1/documents/{}", first["documentId"].as_str().unwrap());
        let (status, fetched) = call(&app, "GET", &uri, Some(&user("bob")), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["id"], first["id"]);
    }

    #[tokio::test]
    async fn session_errors_map_to_status_codes() {
        let app = create_app(state());
        let (status, body) = call(&app, "POST", "/api/v1/sessions/7/document", Some(&user("ada")), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["kind"], "SESSION_NOT_FOUND");

        let (status, body) = call(&app, "POST", "/api/v1/sessions/43/document", Some(&user("ada")), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["kind"], "FORBIDDEN");

        let (status, body) = call(&app, "GET", "/api/v1/sessions/43/document", Some(&user("bob")), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["kind"], "DOCUMENT_NOT_FOUND");

        let (status, _) = call(&app, "GET", "/api/v1/documents/missing", Some(&user("ada")), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn put_replaces_content_and_enforces_size_limit() {
        let app = create_app(state());
        let (_, doc) = call(&app, "POST", "/api/v1/sessions/42/document", Some(&user("ada")), None).await;
        let uri = format!("/api/v1/documents/{}", doc["documentId"].as_str().unwrap());

        let (status, saved) = call(&app, "PUT", &uri, Some(&user("ada")), Some(json!({"content": "hello", "version": 0}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(saved["version"], 1);
        assert_eq!(saved["sizeInBytes"], 5);

        let too_big = "x".repeat(17);
        let (status, body) = call(&app, "PUT", &uri, Some(&user("ada")), Some(json!({"content": too_big}))).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body["kind"], "CONTENT_TOO_LARGE");

        let (_, stored) = call(&app, "GET", &uri, Some(&user("ada")), None).await;
        assert_eq!(stored["content"], "hello");
    }

    #[tokio::test]
    async fn only_services_deactivate_and_inactive_documents_refuse_updates() {
        let app = create_app(state());
        let (_, doc) = call(&app, "POST", "/api/v1/sessions/42/document", Some(&user("ada")), None).await;
        let uri = format!("/api/v1/documents/{}", doc["documentId"].as_str().unwrap());

        let (status, _) = call(&app, "POST", "/api/v1/sessions/42/document/deactivate", Some(&user("ada")), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = call(&app, "POST", "/api/v1/sessions/42/document/deactivate", Some(&service()), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, body) = call(&app, "PUT", &uri, Some(&user("ada")), Some(json!({"content": "late"}))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["kind"], "DOCUMENT_INACTIVE");
    }

    #[tokio::test]
    async fn diagnostics_are_for_services() {
        let app = create_app(state());
        let (status, _) = call(&app, "GET", "/api/v1/diagnostics", Some(&user("ada")), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        call(&app, "POST", "/api/v1/sessions/42/document", Some(&service()), None).await;
        let (status, body) = call(&app, "GET", "/api/v1/diagnostics", Some(&service()), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["n_documents"], 1);
        assert_eq!(body["n_conn"], 0);
    }

    async fn connect(
        addr: std::net::SocketAddr,
        document_id: &str,
        bearer: &str,
    ) -> tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>> {
        let mut req = format!("ws://{}/api/v1/documents/{}/ws", addr, document_id)
            .into_client_request()
            .unwrap();
        req.headers_mut()
            .insert(AUTHORIZATION, format!("Bearer {}", bearer).parse().unwrap());
        let (stream, _) = tokio_tungstenite::connect_async(req).await.unwrap();
        stream
    }

    async fn next_event<S>(stream: &mut S) -> Value
    where
        S: futures_util::Stream<Item = Result<WsMessage, tokio_tungstenite::tungstenite::Error>> + Unpin,
    {
        loop {
            let msg = tokio::time::timeout(Duration::from_secs(5), stream.next())
                .await
                .unwrap()
                .unwrap()
                .unwrap();
            if msg.is_text() {
                return serde_json::from_str(msg.to_text().unwrap()).unwrap();
            }
        }
    }

    #[tokio::test]
    async fn websocket_updates_reach_every_participant() {
        let state = state();
        let doc = state.docs.get_or_create(42).await.unwrap();
        let app = create_app(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let mut ada = connect(addr, &doc.document_id, &user("ada")).await;
        let mut bob = connect(addr, &doc.document_id, &user("bob")).await;

        // Subscriptions happen after the upgrade completes
        for _ in 0..50 {
            if state.hub().stats().await.1 == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(state.hub().stats().await, (1, 2));

        // Claims to be bob; the connection is ada's
        let update = json!({
            "action": "UPDATE",
            "content": "hello",
            "version": 0,
            "userId": "bob",
            "userName": "Bob"
        });
        ada.send(WsMessage::text(update.to_string())).await.unwrap();

        let to_bob = next_event(&mut bob).await;
        assert_eq!(to_bob["action"], "UPDATE");
        assert_eq!(to_bob["content"], "hello");
        assert_eq!(to_bob["version"], 1);
        assert_eq!(to_bob["documentId"], doc.document_id.as_str());
        assert_eq!(to_bob["userId"], "ada");
        assert_eq!(to_bob["userName"], "ada");

        let echo = next_event(&mut ada).await;
        assert_eq!(echo["version"], 1);

        // Malformed frames are skipped, the connection stays up
        ada.send(WsMessage::text("not json")).await.unwrap();
        let cursor = json!({"action": "CURSOR_MOVE", "userId": "ada", "userName": "Ada", "position": 3});
        ada.send(WsMessage::text(cursor.to_string())).await.unwrap();
        let moved = next_event(&mut bob).await;
        assert_eq!(moved["action"], "CURSOR_MOVE");

        assert_eq!(state.docs.read_by_document_id(&doc.document_id).await.unwrap().content, "hello");
    }

    #[tokio::test]
    async fn websocket_refuses_outsiders_before_upgrade() {
        let state = state();
        let doc = state.docs.get_or_create(42).await.unwrap();
        let app = create_app(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let mut req = format!("ws://{}/api/v1/documents/{}/ws", addr, doc.document_id)
            .into_client_request()
            .unwrap();
        req.headers_mut()
            .insert(AUTHORIZATION, format!("Bearer {}", user("carol")).parse().unwrap());
        match tokio_tungstenite::connect_async(req).await {
            Err(tokio_tungstenite::tungstenite::Error::Http(res)) => {
                assert_eq!(res.status(), StatusCode::FORBIDDEN)
            }
            other => panic!("expected a refused handshake, got {:?}", other.map(|_| ())),
        }
    }
}
