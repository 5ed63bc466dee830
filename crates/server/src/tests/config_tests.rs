use super::{apply_file_settings, prepare_database_url, Settings};

#[test]
fn normalizes_plain_file_path_to_sqlite_url() {
    assert_eq!(
        prepare_database_url("./data/test.db"),
        "sqlite://./data/test.db"
    );
}

#[test]
fn empty_database_url_falls_back_to_default() {
    assert_eq!(prepare_database_url("  "), Settings::default().database_url);
}

#[test]
fn memory_url_is_left_untouched() {
    assert_eq!(prepare_database_url("sqlite::memory:"), "sqlite::memory:");
}

#[test]
fn file_settings_override_defaults() {
    let mut settings = Settings::default();
    apply_file_settings(
        &mut settings,
        "bind_addr = \"0.0.0.0:9000\"\nauth_secret = \"from-file\"\n",
    );
    assert_eq!(settings.server_bind, "0.0.0.0:9000");
    assert_eq!(settings.auth_secret, "from-file");
    assert_eq!(settings.database_url, Settings::default().database_url);
}

#[test]
fn malformed_file_settings_are_ignored() {
    let mut settings = Settings::default();
    apply_file_settings(&mut settings, "this is not toml = = =");
    assert_eq!(settings.server_bind, Settings::default().server_bind);
}
