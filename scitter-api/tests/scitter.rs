mod common;

use scitter_api::{
    Credentials, Endpoints, QueryParam, Scitter, ScitterError, Status, TransportErrorKind, User,
};
use scitter_http::HttpError;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{header, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BOB_SECRET: &str = "Basic Ym9iOnNlY3JldA==";

fn scitter_for(server: &MockServer, username: &str, password: &str) -> Scitter {
    Scitter::builder(Credentials::basic(username, password))
        .base_url(server.uri())
        .build()
        .expect("mock server uri is a valid base")
}

async fn mount_verify(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/account/verify_credentials.json"))
        .and(header("authorization", BOB_SECRET))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"id": 1, "screen_name": "bob", "name": "Bob"})),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/account/verify_credentials.json"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"error": "Could not authenticate you."})),
        )
        .with_priority(10)
        .mount(server)
        .await;
}

#[tokio::test]
async fn valid_credentials_verify_true() {
    common::init_test_tracing();
    let server = MockServer::start().await;
    mount_verify(&server).await;

    let scitter = scitter_for(&server, "bob", "secret");
    assert!(scitter.verify_credentials().await.unwrap());
}

#[tokio::test]
async fn rejected_credentials_verify_false() {
    common::init_test_tracing();
    let server = MockServer::start().await;
    mount_verify(&server).await;

    let scitter = scitter_for(&server, "bob", "wrongpass");
    assert!(!scitter.verify_credentials().await.unwrap());
}

#[tokio::test]
async fn forbidden_also_verifies_false() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/account/verify_credentials.json"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let scitter = scitter_for(&server, "bob", "secret");
    assert!(!scitter.verify_credentials().await.unwrap());
}

#[tokio::test]
async fn verify_with_unrecognised_body_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/account/verify_credentials.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>welcome</html>"))
        .mount(&server)
        .await;

    let err = scitter_for(&server, "bob", "secret")
        .verify_credentials()
        .await
        .unwrap_err();
    assert!(err.is_decode(), "got {err:?}");
}

#[tokio::test]
async fn verify_server_error_is_not_false() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/account/verify_credentials.json"))
        .respond_with(ResponseTemplate::new(502))
        .expect(1)
        .mount(&server)
        .await;

    let err = scitter_for(&server, "bob", "secret")
        .verify_credentials()
        .await
        .unwrap_err();
    match err {
        ScitterError::Transport(HttpError::Api { status, .. }) => assert_eq!(status.as_u16(), 502),
        other => panic!("expected transport error, got {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_service_is_a_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let scitter = Scitter::builder(Credentials::basic("bob", "secret"))
        .base_url(format!("http://{addr}"))
        .build()
        .unwrap();

    let err = scitter.verify_credentials().await.unwrap_err();
    assert!(err.is_transport(), "got {err:?}");
    assert!(err.transport_kind().is_some());
}

#[tokio::test]
async fn slow_service_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(common::timeline_json(1))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let scitter = Scitter::builder(Credentials::basic("bob", "secret"))
        .base_url(server.uri())
        .timeout(Duration::from_millis(50))
        .build()
        .unwrap();

    let err = scitter.friends_timeline(&[]).await.unwrap_err();
    assert_eq!(err.transport_kind(), Some(TransportErrorKind::Timeout));
}

#[tokio::test]
async fn friends_timeline_honours_count() {
    common::init_test_tracing();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/statuses/friends_timeline.json"))
        .and(header("authorization", BOB_SECRET))
        .and(query_param("count", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(common::timeline_json(5)))
        .expect(1)
        .mount(&server)
        .await;

    let scitter = scitter_for(&server, "bob", "secret");
    let statuses = scitter
        .friends_timeline(&[QueryParam::count(5).unwrap()])
        .await
        .unwrap();

    assert_eq!(statuses.len(), 5);
    let names: Vec<&str> = statuses.iter().map(|s| s.user.screen_name.as_str()).collect();
    assert_eq!(names, ["friend0", "friend1", "friend2", "friend3", "friend4"]);
    for stat in &statuses {
        tracing::debug!("{stat}");
    }
}

#[tokio::test]
async fn friends_timeline_without_params_uses_server_default() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/statuses/friends_timeline.json"))
        .and(query_param_is_missing("count"))
        .respond_with(ResponseTemplate::new(200).set_body_json(common::timeline_json(20)))
        .expect(1)
        .mount(&server)
        .await;

    let statuses = scitter_for(&server, "bob", "secret")
        .friends_timeline(&[])
        .await
        .unwrap();
    assert_eq!(statuses.len(), 20);
}

#[tokio::test]
async fn fewer_statuses_than_requested_are_returned_as_is() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/statuses/friends_timeline.json"))
        .and(query_param("count", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(common::timeline_json(3)))
        .mount(&server)
        .await;

    let statuses = scitter_for(&server, "bob", "secret")
        .friends_timeline(&[QueryParam::count(5).unwrap()])
        .await
        .unwrap();
    assert_eq!(statuses.len(), 3);
}

#[tokio::test]
async fn empty_timeline_only_from_an_empty_array() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/statuses/friends_timeline.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let statuses = scitter_for(&server, "bob", "secret")
        .friends_timeline(&[])
        .await
        .unwrap();
    assert!(statuses.is_empty());
}

#[tokio::test]
async fn wrong_password_then_timeline_is_an_auth_error() {
    common::init_test_tracing();
    let server = MockServer::start().await;
    mount_verify(&server).await;
    Mock::given(method("GET"))
        .and(path("/statuses/friends_timeline.json"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"error": "Could not authenticate you."})),
        )
        .mount(&server)
        .await;

    let scitter = scitter_for(&server, "bob", "wrongpass");
    assert!(!scitter.verify_credentials().await.unwrap());

    match scitter.friends_timeline(&[]).await {
        Err(ScitterError::Auth { status, message }) => {
            assert_eq!(status, 401);
            assert_eq!(message, "Could not authenticate you.");
        }
        other => panic!("expected auth error, got {other:?}"),
    }
}

#[tokio::test]
async fn forbidden_timeline_is_an_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/statuses/friends_timeline.json"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({"error": "suspended"})))
        .mount(&server)
        .await;

    match scitter_for(&server, "bob", "secret").friends_timeline(&[]).await {
        Err(ScitterError::Auth { status, message }) => {
            assert_eq!(status, 403);
            assert_eq!(message, "suspended");
        }
        other => panic!("expected auth error, got {other:?}"),
    }
}

#[tokio::test]
async fn server_errors_on_data_calls_are_transport_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/statuses/friends_timeline.json"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/statuses/show/7.json"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let scitter = scitter_for(&server, "bob", "secret");
    match scitter.friends_timeline(&[]).await {
        Err(ScitterError::Transport(HttpError::Api { status, .. })) => {
            assert_eq!(status.as_u16(), 503)
        }
        other => panic!("expected transport error, got {other:?}"),
    }
    match scitter.show_status(7).await {
        Err(ScitterError::Transport(HttpError::Api { status, .. })) => {
            assert_eq!(status.as_u16(), 500)
        }
        other => panic!("expected transport error, got {other:?}"),
    }
}

#[tokio::test]
async fn public_timeline_rejection_is_an_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/statuses/public_timeline.json"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let err = scitter_for(&server, "bob", "secret")
        .public_timeline()
        .await
        .unwrap_err();
    assert!(err.is_auth(), "got {err:?}");

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn username_with_colon_verifies_false_without_a_request() {
    let server = MockServer::start().await;
    mount_verify(&server).await;

    let scitter = scitter_for(&server, "bob:x", "pw");
    assert!(!scitter.verify_credentials().await.unwrap());
    assert!(server.received_requests().await.unwrap().is_empty());

    match scitter.friends_timeline(&[]).await {
        Err(ScitterError::Auth { status, .. }) => assert_eq!(status, 401),
        other => panic!("expected auth error, got {other:?}"),
    }
}

#[tokio::test]
async fn blank_token_verifies_false_without_a_request() {
    let server = MockServer::start().await;
    mount_verify(&server).await;

    let scitter = Scitter::builder(Credentials::bearer("   "))
        .base_url(server.uri())
        .build()
        .unwrap();
    assert!(!scitter.verify_credentials().await.unwrap());
    assert!(server.received_requests().await.unwrap().is_empty());

    let err = scitter.show_status(1).await.unwrap_err();
    assert!(err.is_auth(), "got {err:?}");
}

#[tokio::test]
async fn malformed_timeline_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/statuses/friends_timeline.json"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{"text": "where is my user?"}])),
        )
        .mount(&server)
        .await;

    let err = scitter_for(&server, "bob", "secret")
        .friends_timeline(&[])
        .await
        .unwrap_err();
    match err {
        ScitterError::Decode(e) => assert!(e.reason.contains("user")),
        other => panic!("expected decode error, got {other:?}"),
    }
}

#[tokio::test]
async fn user_timeline_passes_selectors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/statuses/user_timeline.json"))
        .and(query_param("screen_name", "alice"))
        .and(query_param("count", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            common::status_json(2, "alice", "second"),
            common::status_json(1, "alice", "first"),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let statuses = scitter_for(&server, "bob", "secret")
        .user_timeline(&[
            QueryParam::ScreenName("alice".into()),
            QueryParam::count(2).unwrap(),
        ])
        .await
        .unwrap();
    let texts: Vec<&str> = statuses.iter().map(|s| s.text.as_str()).collect();
    assert_eq!(texts, ["second", "first"]);
}

#[tokio::test]
async fn public_timeline_works_without_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/statuses/public_timeline.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(common::timeline_json(2)))
        .expect(1)
        .mount(&server)
        .await;

    let statuses = scitter_for(&server, "nobody", "nothing")
        .public_timeline()
        .await
        .unwrap();
    assert_eq!(statuses.len(), 2);

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn show_status_fetches_one_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/statuses/show/42.json"))
        .and(header("authorization", BOB_SECRET))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "text": "hello",
            "user": {"screen_name": "alice"}
        })))
        .mount(&server)
        .await;

    let status = scitter_for(&server, "bob", "secret")
        .show_status(42)
        .await
        .unwrap();
    assert_eq!(status, Status::new("hello", User::new("alice")));
}

#[tokio::test]
async fn custom_endpoints_are_used() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/timeline/friends"))
        .and(query_param("count", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(common::timeline_json(1)))
        .expect(1)
        .mount(&server)
        .await;

    let scitter = Scitter::builder(Credentials::basic("bob", "secret"))
        .base_url(server.uri())
        .endpoints(Endpoints {
            friends_timeline: "/timeline/friends".into(),
            ..Endpoints::default()
        })
        .build()
        .unwrap();

    let statuses = scitter
        .friends_timeline(&[QueryParam::count(1).unwrap()])
        .await
        .unwrap();
    assert_eq!(statuses.len(), 1);
}

#[tokio::test]
async fn bearer_tokens_are_sent_as_bearer() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/account/verify_credentials.json"))
        .and(header("authorization", "Bearer tok-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"screen_name": "bob"})))
        .expect(1)
        .mount(&server)
        .await;

    let scitter = Scitter::builder(Credentials::bearer("tok-123"))
        .base_url(server.uri())
        .build()
        .unwrap();
    assert!(scitter.verify_credentials().await.unwrap());
}

#[tokio::test]
async fn clients_are_shareable_across_tasks() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/statuses/friends_timeline.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(common::timeline_json(2)))
        .expect(4)
        .mount(&server)
        .await;

    let scitter = scitter_for(&server, "bob", "secret");
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let scitter = scitter.clone();
            tokio::spawn(async move { scitter.friends_timeline(&[]).await })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap().len(), 2);
    }
}
