use std::time::Duration;

use context_migrator::{
    api::client::LaunchDarklyClient,
    config::{MigrationSettings, RepositoryAllowList},
    migration::{guardrails::GuardrailFailurePolicy, maintainer::BackupMaintainer},
    schema::AttributeMapping,
};
use httpmock::prelude::*;
use reqwest::Url;
use serde_json::{json, Value};

pub const API_KEY: &str = "api-test-key";

pub fn settings_for(server: &MockServer) -> MigrationSettings {
    MigrationSettings {
        api_key: API_KEY.to_string(),
        project_key: "default".to_string(),
        env_key: "production".to_string(),
        host: Url::parse(&format!("{}/", server.base_url())).unwrap(),
        repositories: RepositoryAllowList::default(),
        schema: None,
        migrate: false,
        backup_maintainer: BackupMaintainer::default(),
        guardrail_failure_policy: GuardrailFailurePolicy::Open,
        request_timeout: Duration::from_secs(5),
    }
}

pub fn client_for(settings: &MigrationSettings) -> LaunchDarklyClient {
    LaunchDarklyClient::from_settings(settings).expect("client builds")
}

pub fn load_schema(contents: &str) -> AttributeMapping {
    let path = std::env::temp_dir().join(format!(
        "context_migrator_it_schema_{}.yaml",
        uuid::Uuid::now_v7()
    ));
    std::fs::write(&path, contents).expect("failed to write schema");
    let schema = AttributeMapping::load(&path).expect("schema loads");
    std::fs::remove_file(&path).expect("failed to remove schema");
    schema
}

pub fn flags_page(items: Vec<Value>) -> Value {
    json!({
        "items": items,
        "totalCount": items.len(),
        "_links": {"self": {"href": "/api/v2/flags/default"}}
    })
}

pub fn mock_flags(server: &MockServer, items: Vec<Value>) -> httpmock::Mock<'_> {
    server.mock(|when, then| {
        when.method(GET)
            .path("/api/v2/flags/default")
            .query_param("env", "production")
            .query_param("summary", "false")
            .header("Authorization", API_KEY);
        then.status(200).json_body(flags_page(items));
    })
}

pub fn mock_no_experiments<'a>(server: &'a MockServer, flag_key: &str) -> httpmock::Mock<'a> {
    let filter = format!("flagKey:{flag_key},status:running");
    server.mock(|when, then| {
        when.method(GET)
            .path("/api/v2/projects/default/environments/production/experiments")
            .query_param("filter", filter.as_str());
        then.status(200)
            .json_body(json!({"items": [], "total_count": 0}));
    })
}

pub fn user_target_flag(key: &str) -> Value {
    json!({
        "key": key,
        "variations": [
            {"_id": "var-on", "value": true},
            {"_id": "var-off", "value": false}
        ],
        "environments": {
            "production": {
                "targets": [{"values": ["u1", "u2"], "variation": 0, "contextKind": "user"}],
                "rules": [],
                "fallthrough": {"variation": 1}
            }
        }
    })
}
