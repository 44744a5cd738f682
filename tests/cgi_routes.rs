//! End-to-end tests for CGI routes, authentication and reload.

#![cfg(unix)]

use reqwest::StatusCode;

mod common;

use common::{client, TestGateway};

const RUN_CONFIG: &str = r#"
static_key: [alice]
entry:
  - path: /run
    cmd: [/bin/echo, hi]
    allow_parallel: false
"#;

#[tokio::test]
async fn basic_auth_guards_cgi_route() {
    let gw = TestGateway::start(RUN_CONFIG).await;
    let client = client();

    let response = client.get(gw.url("/run")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let challenge = response.headers()["www-authenticate"].to_str().unwrap();
    assert!(challenge.starts_with("Basic"));

    let response = client
        .get(gw.url("/run"))
        .basic_auth("alice", Some("anything"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "hi\n");

    let response = client
        .get(gw.url("/run"))
        .basic_auth("bob", Some("x"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn post_body_reaches_script() {
    let gw = TestGateway::start(
        r#"
entry:
  - path: /upper
    cmd: [/bin/sh, -c, 'printf "Content-Type: text/plain\n\n"; tr a-z A-Z']
    allow_parallel: true
"#,
    )
    .await;

    let response = client()
        .post(gw.url("/upper"))
        .body("shout")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "text/plain");
    assert_eq!(response.text().await.unwrap(), "SHOUT");
}

#[tokio::test]
async fn sub_path_is_passed_as_path_info() {
    let gw = TestGateway::start(
        r#"
entry:
  - path: /files/
    cmd: [/bin/sh, -c, 'printf "%s|%s" "$SCRIPT_NAME" "$PATH_INFO"']
    allow_sub_path: true
  - path: /strict
    cmd: [/bin/true]
"#,
    )
    .await;
    let client = client();

    let response = client.get(gw.url("/files/a/b.txt")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "/files|/a/b.txt");

    let response = client.get(gw.url("/strict/below")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn reload_endpoint_swaps_table() {
    let gw = TestGateway::start(RUN_CONFIG).await;
    let client = client();

    gw.rewrite_config(
        r#"
static_key: [carol]
entry:
  - path: /other
    cmd: [/bin/echo, other]
"#,
    );

    let response = client
        .get(gw.url("/reload"))
        .basic_auth("alice", Some(""))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "DONE\n");

    // Old credential and old route are both gone.
    let response = client
        .get(gw.url("/other"))
        .basic_auth("alice", Some(""))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = client
        .get(gw.url("/run"))
        .basic_auth("carol", Some(""))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = client
        .get(gw.url("/other"))
        .basic_auth("carol", Some(""))
        .send()
        .await
        .unwrap();
    assert_eq!(response.text().await.unwrap(), "other\n");
}

#[tokio::test]
async fn failed_reload_keeps_serving_previous_table() {
    let gw = TestGateway::start(RUN_CONFIG).await;
    let client = client();

    gw.rewrite_config(
        r#"
static_key: []
entry:
  - path: /run
    cmd: []
"#,
    );

    let response = client
        .get(gw.url("/reload"))
        .basic_auth("alice", Some(""))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    // Auth is still enforced and the route still runs the old command.
    let response = client.get(gw.url("/run")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = client
        .get(gw.url("/run"))
        .basic_auth("alice", Some(""))
        .send()
        .await
        .unwrap();
    assert_eq!(response.text().await.unwrap(), "hi\n");
}

#[tokio::test]
async fn in_flight_request_finishes_on_its_snapshot() {
    let gw = TestGateway::start(
        r#"
entry:
  - path: /slow
    cmd: [/bin/sh, -c, 'sleep 0.5; echo old']
"#,
    )
    .await;

    let url = gw.url("/slow");
    let in_flight =
        tokio::spawn(async move { client().get(url).send().await.unwrap().text().await.unwrap() });
    tokio::time::sleep(std::time::Duration::from_millis(150)).await;

    gw.rewrite_config(
        r#"
static_key: [alice]
entry: []
"#,
    );
    gw.gateway.reload().unwrap();

    assert_eq!(in_flight.await.unwrap(), "old\n");

    let response = client().get(gw.url("/slow")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unknown_method_and_path() {
    let gw = TestGateway::start(RUN_CONFIG).await;
    let client = client();

    let response = client
        .put(gw.url("/run"))
        .basic_auth("alice", Some(""))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);

    let response = client
        .get(gw.url("/nowhere"))
        .basic_auth("alice", Some(""))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
