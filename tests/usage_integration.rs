mod common;

use common::{connect_to, test_config, USAGE_PATH};
use hopsworks_sdk::usage::environment::hash_hostname;
use mockito::{Matcher, Server};
use serde_json::json;

#[tokio::test]
async fn test_instrumented_sdk_calls_report_usage() {
    let certs = tempfile::tempdir().unwrap();
    let home = tempfile::tempdir().unwrap();
    let config = test_config(certs.path(), home.path());
    let mut server = Server::new_async().await;

    let project = server
        .mock("GET", "/project/getProjectInfo/demo")
        .match_header("authorization", "ApiKey integration-key")
        .with_status(200)
        .with_body(r#"{"projectId": 119, "projectName": "demo"}"#)
        .create_async()
        .await;
    let versions = server
        .mock("GET", "/variables/versions")
        .with_status(200)
        .with_body(r#"[{"software": "hopsworks", "version": "3.4.1"}]"#)
        .expect(1)
        .create_async()
        .await;
    let project_usage = server
        .mock("POST", USAGE_PATH)
        .match_body(Matcher::PartialJson(json!({
            "Data": {
                "method_name": "get_project",
                "module_name": "hopsworks_sdk::connection",
                "arguments": "args: (\"demo\"); kwargs: {}",
                "backend_version": "3.4.1",
                "backend_hostname": hash_hostname(Some("hopsworks.local")),
                "num_call": 1,
                "last_error": null
            }
        })))
        .with_status(200)
        .expect(1)
        .create_async()
        .await;

    let connection = connect_to(&server, &config);
    let project_handle = connection.get_project(None).await.unwrap();
    assert_eq!(project_handle.id, 119);

    project.assert_async().await;
    project_usage.assert_async().await;

    server
        .mock("GET", "/elastic/jwt/119")
        .with_status(200)
        .with_body(r#"{"token": "jwt-token"}"#)
        .create_async()
        .await;
    server
        .mock("GET", "/project/119/credentials")
        .with_status(200)
        .with_body(r#"{"caChain": "pem"}"#)
        .create_async()
        .await;
    let config_usage = server
        .mock("POST", USAGE_PATH)
        .match_body(Matcher::PartialJson(json!({
            "Data": {
                "method_name": "get_default_config",
                "module_name": "hopsworks_sdk::opensearch::opensearch_api",
                "backend_version": "3.4.1"
            }
        })))
        .with_status(200)
        .expect(1)
        .create_async()
        .await;

    let opensearch = project_handle
        .get_opensearch_api()
        .with_endpoint("https://opensearch.local:9200")
        .get_default_config()
        .await
        .unwrap();
    assert_eq!(opensearch.headers["Authorization"], "jwt-token");

    config_usage.assert_async().await;
    // the version was looked up once and cached
    versions.assert_async().await;
}

#[tokio::test]
async fn test_backend_version_retried_while_unavailable() {
    let certs = tempfile::tempdir().unwrap();
    let home = tempfile::tempdir().unwrap();
    let config = test_config(certs.path(), home.path());
    let mut server = Server::new_async().await;

    server
        .mock("GET", "/project/getProjectInfo/demo")
        .with_status(200)
        .with_body(r#"{"projectId": 119, "projectName": "demo"}"#)
        .create_async()
        .await;
    let versions = server
        .mock("GET", "/variables/versions")
        .with_status(500)
        .expect(2)
        .create_async()
        .await;
    let variable = server
        .mock("GET", "/variables/hopsworks_version")
        .with_status(503)
        .expect(2)
        .create_async()
        .await;
    let usage = server
        .mock("POST", USAGE_PATH)
        .match_body(Matcher::PartialJson(json!({
            "Data": { "backend_version": null }
        })))
        .with_status(200)
        .expect(2)
        .create_async()
        .await;

    let connection = connect_to(&server, &config);
    connection.get_project(None).await.unwrap();
    connection.get_project(None).await.unwrap();

    versions.assert_async().await;
    variable.assert_async().await;
    usage.assert_async().await;
}

#[tokio::test]
async fn test_failed_call_reported_and_error_returned() {
    let certs = tempfile::tempdir().unwrap();
    let home = tempfile::tempdir().unwrap();
    let config = test_config(certs.path(), home.path());
    let mut server = Server::new_async().await;

    server
        .mock("GET", "/project/getProjectInfo/ghost")
        .with_status(404)
        .with_body(r#"{"errorCode": 150004, "errorMsg": "Project not found"}"#)
        .create_async()
        .await;
    let usage = server
        .mock("POST", USAGE_PATH)
        .match_body(Matcher::Regex(
            r#""last_error":"[^"]*Project not found"#.to_string(),
        ))
        .with_status(200)
        .expect(1)
        .create_async()
        .await;

    let connection = connect_to(&server, &config);
    let err = connection.get_project(Some("ghost")).await.unwrap_err();
    assert!(err.to_string().contains("Project not found"));

    usage.assert_async().await;
}

#[tokio::test]
async fn test_user_id_survives_new_connections() {
    let certs = tempfile::tempdir().unwrap();
    let home = tempfile::tempdir().unwrap();
    let config = test_config(certs.path(), home.path());
    let mut server = Server::new_async().await;

    server
        .mock("GET", "/project/getProjectInfo/demo")
        .with_status(200)
        .with_body(r#"{"projectId": 119, "projectName": "demo"}"#)
        .create_async()
        .await;
    let any_usage = server
        .mock("POST", USAGE_PATH)
        .with_status(200)
        .create_async()
        .await;

    connect_to(&server, &config).get_project(None).await.unwrap();
    any_usage.remove_async().await;
    let user_id = std::fs::read_to_string(home.path().join("user_id")).unwrap();
    assert_eq!(user_id.len(), 16);

    let same_user = server
        .mock("POST", USAGE_PATH)
        .match_body(Matcher::PartialJson(json!({
            "Data": { "user_id": user_id.clone(), "num_call": 1 }
        })))
        .with_status(200)
        .expect(1)
        .create_async()
        .await;

    connect_to(&server, &config).get_project(None).await.unwrap();
    same_user.assert_async().await;
    assert_eq!(
        std::fs::read_to_string(home.path().join("user_id")).unwrap(),
        user_id
    );
}

#[tokio::test]
async fn test_disabled_usage_sends_nothing() {
    let certs = tempfile::tempdir().unwrap();
    let home = tempfile::tempdir().unwrap();
    let mut config = test_config(certs.path(), home.path());
    config.usage.enabled = false;
    let mut server = Server::new_async().await;

    server
        .mock("GET", "/project/getProjectInfo/demo")
        .with_status(200)
        .with_body(r#"{"projectId": 119, "projectName": "demo"}"#)
        .create_async()
        .await;
    let usage = server
        .mock("POST", USAGE_PATH)
        .expect(0)
        .create_async()
        .await;

    let connection = connect_to(&server, &config);
    connection.get_project(None).await.unwrap();

    usage.assert_async().await;
    assert!(!home.path().join("user_id").exists());
}
