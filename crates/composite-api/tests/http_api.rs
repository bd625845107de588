//! HTTP tests for the gateway API against scripted backends

mod common;

use pretty_assertions::assert_eq;
use reqwest::StatusCode;
use serde_json::{json, Value};

use composite_core::{
    BackendDescriptor, CallToolOutput, ContentPart, PromptInfo, PromptMessage, PromptOutput,
};
use composite_gateway::mock::{MockBackend, MockConnector};

use common::TestServer;

const DOCS: &str = "http://localhost:8001/sse";
const CALC: &str = "http://localhost:8002/sse";

fn connector() -> MockConnector {
    MockConnector::new()
        .with_backend(
            DOCS,
            MockBackend::new()
                .with_tool("search", "Search documents")
                .with_tool_response(
                    "read",
                    CallToolOutput {
                        content: vec![ContentPart::text("line one"), ContentPart::text("line two")],
                        is_error: false,
                    },
                )
                .with_tool_error("fail", "document store unavailable")
                .with_prompt(
                    PromptInfo::new("summarise", "Summarise a document"),
                    PromptOutput {
                        description: Some("Summary prompt".into()),
                        messages: vec![PromptMessage {
                            role: "user".into(),
                            content: ContentPart::text("Summarise README.md"),
                        }],
                    },
                ),
        )
        .with_backend(CALC, MockBackend::new().refusing())
}

fn backends() -> Vec<BackendDescriptor> {
    vec![
        BackendDescriptor::new("docs", DOCS).with_prefix("doc"),
        BackendDescriptor::new("calc", CALC),
    ]
}

#[tokio::test]
async fn lists_backends_with_state() {
    let server = TestServer::start(&connector(), backends()).await;

    let response = server.client.get(server.url("/v1/backends")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();

    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["name"], "docs");
    assert_eq!(items[0]["prefix"], "doc");
    assert_eq!(items[0]["connected"], true);
    assert_eq!(items[0]["state"], "connected");
    assert_eq!(items[1]["name"], "calc");
    assert_eq!(items[1]["connected"], false);
    assert_eq!(items[1]["state"], "failed");
}

#[tokio::test]
async fn lists_qualified_tools() {
    let server = TestServer::start(&connector(), backends()).await;

    let body: Value = server
        .client
        .get(server.url("/v1/tools"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let names: Vec<&str> = body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["doc_search", "doc_read", "doc_fail"]);
    assert_eq!(body["errors"], json!([]));
}

#[tokio::test]
async fn calls_tool_with_arguments() {
    let server = TestServer::start(&connector(), backends()).await;

    let response = server
        .client
        .post(server.url("/v1/tools/doc_search"))
        .json(&json!({"query": "install"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["tool"], "doc_search");
    assert_eq!(body["output"], r#"{"query":"install"}"#);
}

#[tokio::test]
async fn call_without_body_joins_content() {
    let server = TestServer::start(&connector(), backends()).await;

    let body: Value = server
        .client
        .post(server.url("/v1/tools/doc_read"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["output"], "line one\nline two");
    assert_eq!(body["is_error"], false);
}

#[tokio::test]
async fn maps_errors_to_status_codes() {
    let server = TestServer::start(&connector(), backends()).await;

    let not_found = server
        .client
        .post(server.url("/v1/tools/xyz_tool"))
        .send()
        .await
        .unwrap();
    assert_eq!(not_found.status(), StatusCode::NOT_FOUND);
    let body: Value = not_found.json().await.unwrap();
    assert_eq!(body["error"], "not_found");
    assert_eq!(body["message"], "Tool not found: xyz_tool");

    let not_connected = server
        .client
        .post(server.url("/v1/tools/calc_add"))
        .send()
        .await
        .unwrap();
    assert_eq!(not_connected.status(), StatusCode::SERVICE_UNAVAILABLE);

    let remote = server
        .client
        .post(server.url("/v1/tools/doc_fail"))
        .send()
        .await
        .unwrap();
    assert_eq!(remote.status(), StatusCode::BAD_GATEWAY);
    let body: Value = remote.json().await.unwrap();
    assert_eq!(body["message"], "document store unavailable");
}

#[tokio::test]
async fn prompts_are_aggregated() {
    let server = TestServer::start(&connector(), backends()).await;

    let list: Value = server
        .client
        .get(server.url("/v1/prompts"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(list["items"][0]["name"], "doc_summarise");

    let prompt: Value = server
        .client
        .post(server.url("/v1/prompts/doc_summarise"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(prompt["output"], "user: Summarise README.md");
    assert_eq!(prompt["description"], "Summary prompt");
}

#[tokio::test]
async fn first_request_bootstraps_once() {
    let connector = connector();
    let server = TestServer::start(&connector, backends()).await;
    assert!(!server.registry.is_initialized());

    let requests = (0..5).map(|_| server.client.get(server.url("/v1/tools")).send());
    for response in futures::future::join_all(requests).await {
        assert_eq!(response.unwrap().status(), StatusCode::OK);
    }

    assert!(server.registry.is_initialized());
    assert_eq!(
        connector.connect_attempts().iter().filter(|u| *u == DOCS).count(),
        1
    );
}
