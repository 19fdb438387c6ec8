//! Test plan for the `murmur-config` crate.
//!
//! These tests exercise the configuration loader across default handling,
//! file discovery, environment overrides, and merge behaviour.

use std::fs;
use std::path::{Path, PathBuf};

use serial_test::serial;
use tempfile::TempDir;

use murmur_config::{load, AppConfig};

const ENV_VARS_TO_RESET: &[&str] = &[
    "MURMUR_CONFIG",
    "MURMUR__HTTP__ADDRESS",
    "MURMUR__HTTP__PORT",
    "MURMUR__DATABASE__URL",
    "MURMUR__DATABASE__MAX_CONNECTIONS",
    "MURMUR__CHAT__MAX_MESSAGE_LENGTH",
    "MURMUR__CHAT__HISTORY_PAGE_SIZE",
    "MURMUR__CHAT__MAX_HISTORY_PAGE_SIZE",
    "MURMUR__CHAT__FANOUT_BUFFER",
    "MURMUR__CHAT__STORAGE_TIMEOUT_MS",
    "MURMUR__CHAT__HISTORY_RETRY_ATTEMPTS",
];

struct TestContext {
    vars: Vec<(String, Option<String>)>,
    original_dir: Option<PathBuf>,
}

impl TestContext {
    fn new() -> Self {
        Self {
            vars: Vec::new(),
            original_dir: None,
        }
    }

    fn reset_environment(&mut self) {
        for key in ENV_VARS_TO_RESET {
            self.remove_var(key);
        }
    }

    fn set_var(&mut self, key: &str, value: impl AsRef<str>) {
        let previous = std::env::var(key).ok();
        std::env::set_var(key, value.as_ref());
        self.vars.push((key.to_string(), previous));
    }

    fn remove_var(&mut self, key: &str) {
        let previous = std::env::var(key).ok();
        std::env::remove_var(key);
        self.vars.push((key.to_string(), previous));
    }

    fn set_current_dir(&mut self, dir: &Path) {
        if self.original_dir.is_none() {
            self.original_dir =
                Some(std::env::current_dir().expect("failed to capture current directory"));
        }
        std::env::set_current_dir(dir).expect("failed to set current directory");
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        if let Some(original) = self.original_dir.take() {
            let _ = std::env::set_current_dir(original);
        }

        while let Some((key, value)) = self.vars.pop() {
            match value {
                Some(val) => std::env::set_var(&key, val),
                None => std::env::remove_var(&key),
            }
        }
    }
}

fn write_config_file(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("failed to create config directories");
    }
    fs::write(path, contents).expect("failed to write config file");
}

#[test]
#[serial]
fn load_uses_default_values_when_no_files_found() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    let config = load().expect("configuration load should succeed without files");
    let defaults = AppConfig::default();

    assert_eq!(config.http.address, defaults.http.address);
    assert_eq!(config.http.port, defaults.http.port);
    assert_eq!(config.database.url, defaults.database.url);
    assert_eq!(
        config.database.max_connections,
        defaults.database.max_connections
    );
    assert_eq!(
        config.chat.max_message_length,
        defaults.chat.max_message_length
    );
    assert_eq!(
        config.chat.storage_timeout_ms,
        defaults.chat.storage_timeout_ms
    );
}

#[test]
#[serial]
fn load_picks_first_available_file_in_search_order() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    write_config_file(
        temp_dir.path(),
        "murmur.toml",
        r#"
        [http]
        port = 4242
        "#,
    );
    write_config_file(
        temp_dir.path(),
        "config/murmur.toml",
        r#"
        [http]
        port = 5151
        "#,
    );

    let config = load().expect("configuration load should pick the first file");
    assert_eq!(config.http.port, 4242);
}

#[test]
#[serial]
fn load_merges_partial_file_with_defaults() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    write_config_file(
        temp_dir.path(),
        "murmur.toml",
        r#"
        [http]
        port = 8181

        [chat]
        max_message_length = 280
        "#,
    );

    let config = load().expect("configuration load should succeed");
    let defaults = AppConfig::default();

    assert_eq!(config.http.port, 8181);
    assert_eq!(config.http.address, defaults.http.address);
    assert_eq!(config.chat.max_message_length, 280);
    assert_eq!(config.chat.history_page_size, defaults.chat.history_page_size);
    assert_eq!(config.database.url, defaults.database.url);
}

#[test]
#[serial]
fn load_applies_environment_overrides() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    ctx.set_var("MURMUR__HTTP__PORT", "6123");
    ctx.set_var("MURMUR__DATABASE__MAX_CONNECTIONS", "3");
    ctx.set_var("MURMUR__CHAT__HISTORY_RETRY_ATTEMPTS", "5");

    let config = load().expect("configuration load should apply env overrides");

    assert_eq!(config.http.port, 6123);
    assert_eq!(config.database.max_connections, 3);
    assert_eq!(config.chat.history_retry_attempts, 5);
}

#[test]
#[serial]
fn environment_overrides_win_over_files() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    write_config_file(
        temp_dir.path(),
        "murmur.toml",
        r#"
        [http]
        port = 1111
        "#,
    );
    ctx.set_var("MURMUR__HTTP__PORT", "2222");

    let config = load().expect("configuration load should succeed");
    assert_eq!(config.http.port, 2222);
}

#[test]
#[serial]
fn explicit_config_path_takes_precedence_over_discovery() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    write_config_file(
        temp_dir.path(),
        "murmur.toml",
        r#"
        [http]
        port = 1111
        "#,
    );
    write_config_file(
        temp_dir.path(),
        "elsewhere/custom.toml",
        r#"
        [http]
        port = 3333
        "#,
    );

    ctx.set_var(
        "MURMUR_CONFIG",
        temp_dir.path().join("elsewhere/custom.toml").to_string_lossy(),
    );

    let config = load().expect("configuration load should use the explicit path");
    assert_eq!(config.http.port, 3333);
}
