use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::error::ApiError;
use crate::state::AppState;
use crate::telemetry;
use crate::users;

pub fn build_app(state: AppState) -> Router {
    let timeout = state.config.request_timeout();
    let router = Router::new()
        .merge(users::router())
        .route("/health", get(|| async { "ok" }))
        .with_state(state);

    with_timeout(router, timeout)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(telemetry::request_span)
                .on_response(telemetry::record_response),
        )
}

/// Aborts requests that run past `timeout` and answers them with the usual
/// JSON error body.
fn with_timeout(router: Router, timeout: Duration) -> Router {
    router
        .layer(TimeoutLayer::new(timeout))
        .layer(middleware::map_response(timeout_body))
}

// tower-http answers an elapsed request with a bare 408
async fn timeout_body(res: Response) -> Response {
    if res.status() == StatusCode::REQUEST_TIMEOUT {
        ApiError::Timeout.into_response()
    } else {
        res
    }
}

pub async fn serve(app: Router, addr: SocketAddr) -> anyhow::Result<()> {
    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tower::ServiceExt;

    use super::*;
    use crate::db::test_support::{config_in, seeded_db};

    async fn test_app() -> (Router, TempDir) {
        let (db, dir) = seeded_db().await;
        let state = AppState::from_parts(db, Arc::new(config_in(&dir)));
        (build_app(state), dir)
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(v) => {
                req = req.header(header::CONTENT_TYPE, "application/json");
                Body::from(v.to_string())
            }
            None => Body::empty(),
        };
        let res = app.clone().oneshot(req.body(body).unwrap()).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, value)
    }

    async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
        send(app, Method::GET, uri, None).await
    }

    fn result_ids(body: &Value) -> Vec<i64> {
        body["results"]
            .as_array()
            .unwrap()
            .iter()
            .map(|u| u["id"].as_i64().unwrap())
            .collect()
    }

    #[tokio::test]
    async fn health_is_ok() {
        let (app, _dir) = test_app().await;
        let (status, body) = get(&app, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, Value::String("ok".into()));
    }

    #[tokio::test]
    async fn list_without_pagination_returns_array() {
        let (app, _dir) = test_app().await;
        let (status, body) = get(&app, "/users").await;
        assert_eq!(status, StatusCode::OK);
        let users = body.as_array().unwrap();
        assert_eq!(users.len(), 10);
        assert_eq!(users[2]["first_name"], "alice");

        // page alone does not switch to paginated mode
        let (_, body) = get(&app, "/users?page=1").await;
        assert!(body.is_array());
    }

    #[tokio::test]
    async fn seeded_pages_of_five() {
        let (app, _dir) = test_app().await;

        let (status, body) = get(&app, "/users?page=0&per=5").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(result_ids(&body), vec![1, 2, 3, 4, 5]);
        assert_eq!(body["base"], "http://localhost:8080");
        assert_eq!(body["next"], "http://localhost:8080/users?page=1&per=5");

        let (_, body) = get(&app, "/users?page=1&per=5").await;
        assert_eq!(result_ids(&body), vec![6, 7, 8, 9, 10]);
        assert_eq!(body["next"], "http://localhost:8080/users?page=2&per=5");

        let (status, body) = get(&app, "/users?page=2&per=5").await;
        assert_eq!(status, StatusCode::OK);
        assert!(result_ids(&body).is_empty());
        assert_eq!(body["next"], "http://localhost:8080/users?page=3&per=5");
    }

    #[tokio::test]
    async fn unsorted_pages_of_three() {
        let (app, _dir) = test_app().await;
        let (status, body) = get(&app, "/users?page=0&per=3").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(result_ids(&body), vec![1, 2, 3]);

        let (_, body) = get(&app, "/users?page=1&per=3").await;
        assert_eq!(result_ids(&body), vec![4, 5, 6]);

        // sort without order is ignored rather than rejected
        let (status, body) = get(&app, "/users?page=1&per=3&sort=email").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(result_ids(&body), vec![4, 5, 6]);
        assert_eq!(body["next"], "http://localhost:8080/users?page=2&per=3");
    }

    #[tokio::test]
    async fn repeated_query_keys_use_the_first_value() {
        let (app, _dir) = test_app().await;
        let (status, body) = get(&app, "/users?page=0&page=5&per=3&per=9").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(result_ids(&body), vec![1, 2, 3]);
        assert_eq!(body["next"], "http://localhost:8080/users?page=1&per=3");
    }

    #[tokio::test]
    async fn undecodable_row_fails_the_whole_listing() {
        let (db, dir) = seeded_db().await;
        sqlx::query("UPDATE users SET updated = 'garbage' WHERE id = 4")
            .execute(&db)
            .await
            .unwrap();
        let app = build_app(AppState::from_parts(db, Arc::new(config_in(&dir))));

        for uri in ["/users", "/users?page=0&per=5", "/users?page=1&per=3"] {
            let (status, body) = get(&app, uri).await;
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "{uri}");
            assert_eq!(body["code"], "internal_error", "{uri}");
            assert_eq!(body["message"], "internal server error", "{uri}");
        }

        // a page that skips the bad row still works
        let (status, body) = get(&app, "/users?page=2&per=3").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(result_ids(&body), vec![7, 8, 9]);
    }

    #[tokio::test]
    async fn slow_request_times_out_with_json_body() {
        let slow = Router::new().route(
            "/slow",
            axum::routing::get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "late"
            }),
        );
        let app = with_timeout(slow, Duration::from_millis(20));

        let (status, body) = get(&app, "/slow").await;
        assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
        assert_eq!(body["code"], "timeout");
        assert_eq!(body["message"], "request timed out");
    }

    #[tokio::test]
    async fn sorted_page_keeps_sort_in_next_link() {
        let (app, _dir) = test_app().await;
        let (status, body) = get(&app, "/users?page=0&per=3&sort=first_name&order=desc").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(result_ids(&body), vec![1, 2, 3]);
        assert_eq!(
            body["next"],
            "http://localhost:8080/users?page=1&per=3&sort=first_name&order=desc"
        );

        let (_, body) = get(&app, "/users?page=0&per=3&sort=first_name&order=upward").await;
        assert_eq!(result_ids(&body), vec![3, 2, 1]);
        assert_eq!(
            body["next"],
            "http://localhost:8080/users?page=1&per=3&sort=first_name&order=asc"
        );
    }

    #[tokio::test]
    async fn malformed_pagination_is_a_bad_request() {
        let (app, _dir) = test_app().await;
        for uri in [
            "/users?page=abc&per=5",
            "/users?page=0&per=xyz",
            "/users?page=-1&per=5",
            "/users?page=0&per=0",
            "/users?page=0&per=3&sort=password&order=asc",
        ] {
            let (status, body) = get(&app, uri).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(body["code"], "invalid_pagination", "{uri}");
        }
    }

    #[tokio::test]
    async fn get_by_id_and_not_found() {
        let (app, _dir) = test_app().await;
        let (status, body) = get(&app, "/users/4").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["email"], "bob@gmail.com");

        let (status, body) = get(&app, "/users/404").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "not_found");
        assert_eq!(body["message"], "user not found");

        let (status, body) = get(&app, "/users/four").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "bad_request");
    }

    #[tokio::test]
    async fn create_and_reject_duplicate() {
        let (app, _dir) = test_app().await;
        let new_user = json!({
            "id": 11,
            "email": "new@example.com",
            "first_name": "new",
            "last_name": "user"
        });
        let (status, body) = send(&app, Method::POST, "/users", Some(new_user.clone())).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["id"], 11);
        assert!(body["updated"].is_string());

        let (status, body) = send(&app, Method::POST, "/users", Some(new_user)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "constraint_violation");

        let (_, body) = get(&app, "/users").await;
        assert_eq!(body.as_array().unwrap().len(), 11);
    }

    #[tokio::test]
    async fn create_with_bad_body_is_a_bad_request() {
        let (app, _dir) = test_app().await;
        let (status, body) =
            send(&app, Method::POST, "/users", Some(json!({ "email": "x@y.z" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "bad_request");
    }

    #[tokio::test]
    async fn update_uses_path_id() {
        let (app, _dir) = test_app().await;
        let (status, body) = send(
            &app,
            Method::POST,
            "/users/2",
            Some(json!({ "id": 7, "email": "new-baz@example.com", "first_name": "baz", "last_name": "q" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], 2);
        assert_eq!(body["email"], "new-baz@example.com");

        let (_, smith) = get(&app, "/users/7").await;
        assert_eq!(smith["email"], "smith@gmail.com");

        let (status, _) = send(&app, Method::POST, "/users/99", Some(json!({ "email": "a" }))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn delete_is_ok_even_when_missing() {
        let (app, _dir) = test_app().await;
        let (status, body) = send(&app, Method::DELETE, "/users/3", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "OK");

        let (status, _) = get(&app, "/users/3").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(&app, Method::DELETE, "/users/3", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "OK");
    }
}
