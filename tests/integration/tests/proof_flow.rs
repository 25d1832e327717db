//! End-to-end tests for the present-proof commands, including the
//! no-manual-delay property: a presentation sent immediately after the
//! request still observes the intervening state transition.

use backchannel_core::ProofState;
use backchannel_integration_tests::{spawn_backchannel, spawn_backchannel_with};
use backchannel_server::BackchannelConfig;
use serde_json::{json, Value};

fn send_request_body() -> Value {
    json!({
        "data": {
            "connection_id": "conn-1",
            "presentation_request": {
                "comment": "prove it",
                "proof_request": {
                    "data": {
                        "name": "over-18",
                        "version": "1.0",
                        "requested_attributes": {
                            "attr_1": { "name": "age" }
                        }
                    }
                }
            }
        }
    })
}

async fn post_json(client: &reqwest::Client, url: String, body: &Value) -> reqwest::Response {
    client.post(url).json(body).send().await.expect("request")
}

#[tokio::test]
async fn test_send_request_creates_exchange() {
    let base = spawn_backchannel().await;
    let client = reqwest::Client::new();

    let response = post_json(
        &client,
        format!("{}/agent/command/proof/send-request", base),
        &send_request_body(),
    )
    .await;
    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("json body");
    assert_eq!(body["state"], ProofState::RequestSent.as_str());
    let thread_id = body["thread_id"].as_str().expect("thread_id");
    assert!(!thread_id.is_empty());

    let fetched: Value = client
        .get(format!("{}/agent/command/proof/{}", base, thread_id))
        .send()
        .await
        .expect("request")
        .json()
        .await
        .expect("json body");
    assert_eq!(fetched["thread_id"], thread_id);
}

#[tokio::test]
async fn test_full_proof_flow_without_manual_delay() {
    let base = spawn_backchannel().await;
    let client = reqwest::Client::new();

    let requested: Value = post_json(
        &client,
        format!("{}/agent/command/proof/send-request", base),
        &send_request_body(),
    )
    .await
    .json()
    .await
    .expect("json body");
    let thread_id = requested["thread_id"].as_str().expect("thread_id");

    // Immediately present; the backchannel must catch the request-received
    // transition on its own.
    let presented: Value = post_json(
        &client,
        format!("{}/agent/command/proof/send-presentation", base),
        &json!({
            "id": thread_id,
            "data": {
                "requested_attributes": {
                    "attr_1": { "cred_id": "cred-1", "revealed": true }
                },
                "comment": "here you go"
            }
        }),
    )
    .await
    .json()
    .await
    .expect("json body");
    assert_eq!(presented["state"], ProofState::PresentationSent.as_str());
    assert_eq!(presented["thread_id"], thread_id);

    let verified: Value = post_json(
        &client,
        format!("{}/agent/command/proof/verify-presentation", base),
        &json!({ "id": thread_id, "data": {} }),
    )
    .await
    .json()
    .await
    .expect("json body");
    assert_eq!(verified["state"], ProofState::Done.as_str());

    let fetched: Value = client
        .get(format!("{}/agent/command/proof/{}", base, thread_id))
        .send()
        .await
        .expect("request")
        .json()
        .await
        .expect("json body");
    assert_eq!(fetched["state"], ProofState::Done.as_str());
}

#[tokio::test]
async fn test_send_proposal() {
    let base = spawn_backchannel().await;
    let client = reqwest::Client::new();

    let body: Value = post_json(
        &client,
        format!("{}/agent/command/proof/send-proposal", base),
        &json!({
            "data": {
                "connection_id": "conn-1",
                "presentation_proposal": {
                    "comment": "may I",
                    "attributes": [],
                    "predicates": []
                }
            }
        }),
    )
    .await
    .json()
    .await
    .expect("json body");
    assert_eq!(body["state"], ProofState::ProposalSent.as_str());
}

#[tokio::test]
async fn test_get_all_proofs() {
    let base = spawn_backchannel().await;
    let client = reqwest::Client::new();

    for _ in 0..2 {
        post_json(
            &client,
            format!("{}/agent/command/proof/send-request", base),
            &send_request_body(),
        )
        .await;
    }

    let list: Value = client
        .get(format!("{}/agent/command/proof", base))
        .send()
        .await
        .expect("request")
        .json()
        .await
        .expect("json body");
    assert_eq!(list.as_array().expect("array").len(), 2);
}

#[tokio::test]
async fn test_get_proof_unknown_is_404() {
    let base = spawn_backchannel().await;
    let response = reqwest::get(format!("{}/agent/command/proof/no-such-thread", base))
        .await
        .expect("request");
    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_send_presentation_times_out_without_request() {
    let mut config = BackchannelConfig::default();
    config.harness.wait_timeout_ms = 100;
    let base = spawn_backchannel_with(config).await;
    let client = reqwest::Client::new();

    let response = post_json(
        &client,
        format!("{}/agent/command/proof/send-presentation", base),
        &json!({ "id": "never-requested", "data": {} }),
    )
    .await;
    assert_eq!(
        response.status(),
        reqwest::StatusCode::INTERNAL_SERVER_ERROR
    );

    let body: Value = response.json().await.expect("json body");
    assert!(body["error"].as_str().expect("error").contains("timed out"));
}

#[tokio::test]
async fn test_send_presentation_requires_thread_id() {
    let base = spawn_backchannel().await;
    let client = reqwest::Client::new();

    let response = post_json(
        &client,
        format!("{}/agent/command/proof/send-presentation", base),
        &json!({ "data": {} }),
    )
    .await;
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
}
