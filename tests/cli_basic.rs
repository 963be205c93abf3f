//! Integration tests for basic CLI behavior.
//!
//! Tests that the binary exists, accepts standard flags, each subcommand
//! responds to `--help`, and commands that need no network fail or succeed
//! with the right messages.

#![allow(deprecated)] // cargo_bin is deprecated; its replacement is not stable yet

use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;

/// Helper: get a Command for the `mirrorscout` binary with a clean environment.
fn scout() -> Command {
    let mut cmd = Command::cargo_bin("mirrorscout").expect("binary 'mirrorscout' should be built");
    cmd.env_remove("PROXY_CREDENTIALS")
        .env_remove("FORWARD_PROXY")
        .env_remove("TMDB_API_KEY")
        .env_remove("RUST_LOG");
    cmd
}

/// Write a settings file and sites document into a per-test temp directory.
fn fixture(name: &str, settings: &str, sites: Option<&str>) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("mirrorscout-cli-{}-{name}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();

    let sites_path = dir.join("sites.json");
    match sites {
        Some(json) => std::fs::write(&sites_path, json).unwrap(),
        None => {
            let _ = std::fs::remove_file(&sites_path);
        }
    }

    let config_path = dir.join("config.toml");
    std::fs::write(
        &config_path,
        format!("sites_file = {:?}\n{settings}", sites_path.display().to_string()),
    )
    .unwrap();
    config_path
}

// ─── Top-level flags ─────────────────────────────────────────────────────────

#[test]
fn help_flag_shows_usage() {
    scout()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage: mirrorscout"))
        .stdout(predicate::str::contains("resolve"))
        .stdout(predicate::str::contains("lookup"))
        .stdout(predicate::str::contains("captcha"))
        .stdout(predicate::str::contains("sites"))
        .stdout(predicate::str::contains("domains"))
        .stdout(predicate::str::contains("fingerprint"));
}

#[test]
fn version_flag_shows_semver() {
    scout()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"^mirrorscout \d+\.\d+\.\d+\n$").unwrap());
}

#[test]
fn no_args_shows_error_and_usage() {
    scout()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage: mirrorscout"));
}

#[test]
fn invalid_subcommand_fails() {
    scout()
        .arg("this-is-not-a-real-command")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}

// ─── Subcommand help ─────────────────────────────────────────────────────────

#[test]
fn resolve_help() {
    scout()
        .args(["resolve", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Resolve an IMDb or TMDB id"))
        .stdout(predicate::str::contains("<ID>"))
        .stdout(predicate::str::contains("--site"))
        .stdout(predicate::str::contains("--all"));
}

#[test]
fn lookup_help() {
    scout()
        .args(["lookup", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--title"))
        .stdout(predicate::str::contains("--season"))
        .stdout(predicate::str::contains("--episode"));
}

#[test]
fn domains_refresh_help() {
    scout()
        .args(["domains", "refresh", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--dry-run"));
}

// ─── Offline behavior ────────────────────────────────────────────────────────

#[test]
fn fingerprint_prints_requested_profiles() {
    scout()
        .args(["fingerprint", "--count", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Profile 1:"))
        .stdout(predicate::str::contains("Profile 2:"))
        .stdout(predicate::str::contains("Profile 3:").not())
        .stdout(predicate::str::contains("UA: Mozilla/5.0"));
}

#[test]
fn lookup_season_requires_episode() {
    scout()
        .args(["lookup", "--title", "Example Show", "--season", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--episode"));
}

#[test]
fn resolve_rejects_malformed_id() {
    let config = fixture("bad-id", "", None);
    scout()
        .arg("--config")
        .arg(&config)
        .args(["resolve", "not-an-id"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid content id: not-an-id"));
}

#[test]
fn resolve_requires_tmdb_key() {
    let config = fixture("no-key", "", None);
    scout()
        .arg("--config")
        .arg(&config)
        .args(["resolve", "tt0133093"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("TMDB_API_KEY is not set"));
}

#[test]
fn lookup_without_sites_document_fails() {
    let config = fixture("no-sites", "", None);
    scout()
        .arg("--config")
        .arg(&config)
        .args(["lookup", "--title", "Example Movie"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no usable sites document"));
}

#[test]
fn lookup_unknown_site_fails() {
    let config = fixture(
        "unknown-site",
        "",
        Some(r#"{"sites": {"Clicka": {"url": "https://clicka.test"}}}"#),
    );
    scout()
        .arg("--config")
        .arg(&config)
        .args(["lookup", "--title", "Example Movie", "--site", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown site: nope"));
}

#[test]
fn sites_lists_configuration() {
    let config = fixture(
        "sites",
        "[sites.Eurostreaming]\nenabled = false\n\n[sites.Clicka]\nproxy = true\n",
        Some(
            r#"{"Siti": {"Clicka": {"url": "https://clicka.test", "cookies": {"a": "1", "b": null}}}}"#,
        ),
    );
    scout()
        .arg("--config")
        .arg(&config)
        .arg("sites")
        .assert()
        .success()
        .stdout(predicate::str::contains("clicka [enabled]"))
        .stdout(predicate::str::contains("URL: https://clicka.test"))
        .stdout(predicate::str::contains("Cookies: 1/2 set"))
        .stdout(predicate::str::contains("Proxy: yes"))
        .stdout(predicate::str::contains("eurostreaming [disabled]"));
}

#[test]
fn domains_refresh_needs_sources() {
    let config = fixture("no-sources", "", Some(r#"{"sites": {}}"#));
    scout()
        .arg("--config")
        .arg(&config)
        .args(["domains", "refresh", "--dry-run"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no [[domains.sources]] configured"));
}

#[test]
fn malformed_settings_fail() {
    let dir = std::env::temp_dir().join(format!("mirrorscout-cli-{}-bad-toml", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let config = dir.join("config.toml");
    std::fs::write(&config, "timeout_secs = \"soon\"\n").unwrap();

    scout()
        .arg("--config")
        .arg(&config)
        .arg("sites")
        .assert()
        .failure()
        .stderr(predicate::str::contains("loading settings"));
}
