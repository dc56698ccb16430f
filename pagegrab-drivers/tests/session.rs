use pagegrab_drivers::pagegrab_browser::driver::BrowserDriver;
use pagegrab_drivers::pagegrab_browser::launch::BrowserOptions;
use serde_json::json;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SESSION_ID: &str = "3f1c2a";

async fn webdriver_rejecting_timeouts() -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/session"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": { "sessionId": SESSION_ID, "capabilities": { "browserName": "chrome" } }
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path_regex(r"^/session/[^/]+/timeouts$"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "value": { "error": "unknown error", "message": "cannot set timeouts", "stacktrace": "" }
        })))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(format!("/session/{SESSION_ID}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": null })))
        .mount(&server)
        .await;

    server
}

#[tokio::test]
async fn failed_setup_closes_the_new_session() {
    let server = webdriver_rejecting_timeouts().await;
    let options = BrowserOptions {
        webdriver_url: server.uri(),
        ..BrowserOptions::default()
    };

    let result = BrowserDriver::connect(options).await;
    assert!(result.is_err(), "timeouts endpoint fails, so connect must fail");

    let requests = server.received_requests().await.unwrap_or_default();
    let deleted = requests
        .iter()
        .filter(|r| r.method.as_str() == "DELETE")
        .filter(|r| r.url.path() == format!("/session/{SESSION_ID}"))
        .count();
    assert_eq!(deleted, 1, "session must be deleted before connect returns");
}

#[tokio::test]
async fn unreachable_endpoint_is_unavailable() {
    let options = BrowserOptions {
        webdriver_url: "http://127.0.0.1:1".into(),
        ..BrowserOptions::default()
    };
    let err = BrowserDriver::connect(options).await.err().map(|e| e.to_string());
    assert!(
        err.as_deref().is_some_and(|m| m.starts_with("webdriver unavailable")),
        "got {err:?}"
    );
}
