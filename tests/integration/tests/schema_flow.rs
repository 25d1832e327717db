//! End-to-end tests for the schema and credential-definition commands:
//! registration, idempotence, legacy-id translation, and 404 behavior.

use backchannel_integration_tests::spawn_backchannel;
use serde_json::{json, Value};

async fn create_schema(client: &reqwest::Client, base: &str) -> Value {
    let response = client
        .post(format!("{}/agent/command/schema", base))
        .json(&json!({
            "data": {
                "schema_name": "test",
                "schema_version": "1.0",
                "attributes": ["a"]
            }
        }))
        .send()
        .await
        .expect("request");
    assert!(response.status().is_success());
    response.json().await.expect("json body")
}

#[tokio::test]
async fn test_status_is_active() {
    let base = spawn_backchannel().await;
    let body: Value = reqwest::get(format!("{}/agent/command/status", base))
        .await
        .expect("request")
        .json()
        .await
        .expect("json body");
    assert_eq!(body["status"], "active");
    assert!(body["uptime_secs"].is_u64());
}

#[tokio::test]
async fn test_create_then_get_schema() {
    let base = spawn_backchannel().await;
    let client = reqwest::Client::new();

    let created = create_schema(&client, &base).await;
    let schema_id = created["schema_id"].as_str().expect("schema_id");

    // Legacy form: <did>:2:<name>:<version>
    assert!(schema_id.contains(":2:test:1.0"), "got {}", schema_id);
    assert_eq!(created["schema"]["id"], schema_id);

    let fetched: Value = client
        .get(format!("{}/agent/command/schema/{}", base, schema_id))
        .send()
        .await
        .expect("request")
        .json()
        .await
        .expect("json body");
    assert_eq!(fetched["id"], schema_id);
    assert_eq!(fetched["attrNames"], json!(["a"]));
    assert_eq!(fetched["name"], "test");
    assert_eq!(fetched["version"], "1.0");
}

#[tokio::test]
async fn test_create_schema_idempotent() {
    let base = spawn_backchannel().await;
    let client = reqwest::Client::new();

    let first = create_schema(&client, &base).await;
    let second = create_schema(&client, &base).await;
    assert_eq!(first["schema_id"], second["schema_id"]);
}

#[tokio::test]
async fn test_get_schema_unknown_is_404() {
    let base = spawn_backchannel().await;
    let response = reqwest::get(format!(
        "{}/agent/command/schema/V4SGRU86Z58d6TV7PBUe6f:2:missing:9.9",
        base
    ))
    .await
    .expect("request");
    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_then_get_credential_definition() {
    let base = spawn_backchannel().await;
    let client = reqwest::Client::new();

    let schema = create_schema(&client, &base).await;
    let schema_id = schema["schema_id"].as_str().expect("schema_id");

    let created: Value = client
        .post(format!("{}/agent/command/credential-definition", base))
        .json(&json!({
            "data": {
                "tag": "default",
                "support_revocation": false,
                "schema_id": schema_id
            }
        }))
        .send()
        .await
        .expect("request")
        .json()
        .await
        .expect("json body");

    let cred_def_id = created["credential_definition_id"]
        .as_str()
        .expect("credential_definition_id");
    assert!(cred_def_id.contains(":3:CL:"), "got {}", cred_def_id);
    assert_eq!(created["credential_definition"]["id"], cred_def_id);
    // Inner schema id is translated back to the legacy form.
    assert_eq!(created["credential_definition"]["schemaId"], schema_id);
    assert_eq!(created["credential_definition"]["type"], "CL");

    let fetched: Value = client
        .get(format!(
            "{}/agent/command/credential-definition/{}",
            base, cred_def_id
        ))
        .send()
        .await
        .expect("request")
        .json()
        .await
        .expect("json body");
    assert_eq!(fetched["id"], cred_def_id);
    assert_eq!(fetched["schemaId"], schema_id);
    assert_eq!(fetched["tag"], "default");
}

#[tokio::test]
async fn test_create_credential_definition_idempotent() {
    let base = spawn_backchannel().await;
    let client = reqwest::Client::new();

    let schema = create_schema(&client, &base).await;
    let schema_id = schema["schema_id"].as_str().expect("schema_id");
    let body = json!({
        "data": {
            "tag": "default",
            "support_revocation": false,
            "schema_id": schema_id
        }
    });

    let first: Value = client
        .post(format!("{}/agent/command/credential-definition", base))
        .json(&body)
        .send()
        .await
        .expect("request")
        .json()
        .await
        .expect("json body");
    let second: Value = client
        .post(format!("{}/agent/command/credential-definition", base))
        .json(&body)
        .send()
        .await
        .expect("request")
        .json()
        .await
        .expect("json body");
    assert_eq!(
        first["credential_definition_id"],
        second["credential_definition_id"]
    );
}

#[tokio::test]
async fn test_create_credential_definition_unknown_schema_is_404() {
    let base = spawn_backchannel().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/agent/command/credential-definition", base))
        .json(&json!({
            "data": {
                "tag": "default",
                "schema_id": "V4SGRU86Z58d6TV7PBUe6f:2:missing:9.9"
            }
        }))
        .send()
        .await
        .expect("request");
    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_get_credential_definition_unknown_is_404() {
    let base = spawn_backchannel().await;
    let response = reqwest::get(format!(
        "{}/agent/command/credential-definition/V4SGRU86Z58d6TV7PBUe6f:3:CL:99:none",
        base
    ))
    .await
    .expect("request");
    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
}
