use super::*;
use std::collections::HashMap;

fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key: &str| map.get(key).cloned()
}

#[test]
fn defaults_select_local_backend() {
    let config = RawConfig::default().into_config();
    assert_eq!(config, ListConfig::default());
    assert_eq!(config.namespace, DEFAULT_NAMESPACE);
    assert_eq!(config.backend, BackendConfig::Local);
    assert_eq!(config.mode(), BackendMode::Local);
    assert!(config.seed_mock_data);
}

#[test]
fn sentinel_server_urls_mean_local() {
    for sentinel in ["", "  ", "none", "NONE", "local"] {
        assert_eq!(
            BackendConfig::from_server_url(Some(sentinel), Some("token".into())),
            BackendConfig::Local,
            "sentinel {sentinel:?}"
        );
    }
    assert_eq!(BackendConfig::from_server_url(None, None), BackendConfig::Local);
}

#[test]
fn real_server_url_selects_remote() {
    let backend = BackendConfig::from_server_url(Some(" http://127.0.0.1:8443 "), Some(" ".into()));
    assert_eq!(
        backend,
        BackendConfig::Remote {
            server_url: "http://127.0.0.1:8443".to_string(),
            auth_token: None,
        }
    );
}

#[test]
fn file_values_apply() {
    let mut raw = RawConfig::default();
    apply_file(
        &mut raw,
        r#"
namespace = "family-list"
server_url = "https://lists.example.com"
auth_token = "secret"
seed_mock_data = false
"#,
    );
    let config = raw.into_config();
    assert_eq!(config.namespace, "family-list");
    assert_eq!(config.mode(), BackendMode::Remote);
    assert_eq!(
        config.backend,
        BackendConfig::Remote {
            server_url: "https://lists.example.com".to_string(),
            auth_token: Some("secret".to_string()),
        }
    );
    assert!(!config.seed_mock_data);
}

#[test]
fn malformed_file_is_ignored() {
    let mut raw = RawConfig::default();
    apply_file(&mut raw, "namespace = [unterminated");
    assert_eq!(raw.into_config(), ListConfig::default());
}

#[test]
fn environment_overrides_file() {
    let mut raw = RawConfig::default();
    apply_file(&mut raw, "namespace = \"from-file\"\nserver_url = \"http://file:1\"");
    apply_env(
        &mut raw,
        env(&[
            ("SHOPPING_NAMESPACE", "from-env"),
            ("SHOPPING_SERVER_URL", "none"),
            ("APP__SEED_MOCK_DATA", "off"),
        ]),
    );
    let config = raw.into_config();
    assert_eq!(config.namespace, "from-env");
    assert_eq!(config.backend, BackendConfig::Local);
    assert!(!config.seed_mock_data);
}

#[test]
fn app_prefixed_keys_win_over_short_keys() {
    let mut raw = RawConfig::default();
    apply_env(
        &mut raw,
        env(&[
            ("SHOPPING_SERVER_URL", "http://short:1"),
            ("APP__SERVER_URL", "http://prefixed:2"),
            ("APP__AUTH_TOKEN", "tok"),
        ]),
    );
    assert_eq!(
        raw.into_config().backend,
        BackendConfig::Remote {
            server_url: "http://prefixed:2".to_string(),
            auth_token: Some("tok".to_string()),
        }
    );
}

#[test]
fn blank_namespace_falls_back_to_default() {
    let mut raw = RawConfig::default();
    apply_env(&mut raw, env(&[("APP__NAMESPACE", "   ")]));
    assert_eq!(raw.into_config().namespace, DEFAULT_NAMESPACE);
}

#[test]
fn load_config_reads_given_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("shopping.toml");
    std::fs::write(&path, "namespace = \"pantry\"\nseed_mock_data = \"no\"\n").expect("write");

    let config = load_config(Some(&path));
    // Environment may override the namespace on developer machines.
    if std::env::var("SHOPPING_NAMESPACE").is_err() && std::env::var("APP__NAMESPACE").is_err() {
        assert_eq!(config.namespace, "pantry");
    }
    if std::env::var("APP__SEED_MOCK_DATA").is_err() {
        assert!(!config.seed_mock_data);
    }
}
