//! Unit tests for settings loading

use service_gateway::config::{Settings, StoreBackend};
use std::io::Write;

#[test]
fn test_load_from_toml_file() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(
        file,
        r#"
[server]
service_name = "edge"
display_name = "Edge"

[database]
backend = "memory"

[downstream]
name = "accounts"
display_name = "Accounts service"
base_url = "http://accounts.internal:4000"
proxy_prefix = "/accounts"
timeout_ms = 1500
"#
    )
    .unwrap();

    let settings = Settings::load_from_path(file.path()).unwrap();
    assert_eq!(settings.server.service_name, "edge");
    assert_eq!(settings.database.backend, StoreBackend::Memory);
    assert_eq!(settings.downstream.name, "accounts");
    assert_eq!(settings.downstream.proxy_prefix, "/accounts");
    assert_eq!(settings.downstream.timeout_ms, 1500);
    assert_eq!(settings.downstream.health_path, "/health");
    assert_eq!(
        settings.downstream.unavailable_message(),
        "Accounts service unavailable"
    );
    assert!(settings.validate().is_ok());
}

#[test]
fn test_missing_file_falls_back_to_defaults() {
    let settings = Settings::load_from_path("does/not/exist.toml").unwrap();
    assert_eq!(settings.server.service_name, "api-gateway");
    assert_eq!(settings.downstream.proxy_prefix, "/users");
    assert_eq!(settings.logging.level, "info");
}
