use anyhow::Result;
use predicates::prelude::*;
use serde_json::{Value, json};

use crate::common::TestEnv;

const ZLIB: &str = "zlib/1.2.11@conan/stable";
const ZLIB_PKG: &str = "zlib/1.2.11@conan/stable:abc";

/// Graph with a root consumer requiring zlib.
async fn zlib_graph(env: &TestEnv) -> Result<String> {
    let graph = json!({
        "nodes": [
            { "id": "app" },
            { "id": "zlib", "reference": ZLIB, "package_id": "abc" }
        ],
        "edges": [ { "from": "app", "to": "zlib" } ]
    });
    let path = env.write_project_file("graph.json", &graph.to_string()).await?;
    Ok(path.display().to_string())
}

async fn add_remote(env: &TestEnv, name: &str) -> Result<()> {
    let url = env.create_remote(name).await?;
    env.run_binpm(&["remote", "add", name, &url])?.assert_success();
    Ok(())
}

#[tokio::test]
async fn test_downloads_from_file_remote() -> Result<()> {
    let env = TestEnv::new().await?;
    add_remote(&env, "local").await?;
    env.publish("local", ZLIB_PKG, 10, "h").await?;
    let graph = zlib_graph(&env).await?;

    env.run_binpm(&["analyze", &graph])?
        .assert_success()
        .assert_stdout_contains("zlib/1.2.11@conan/stable:abc  DOWNLOAD  local");
    Ok(())
}

#[tokio::test]
async fn test_json_report() -> Result<()> {
    let env = TestEnv::new().await?;
    add_remote(&env, "local").await?;
    env.publish("local", ZLIB_PKG, 10, "h").await?;
    let graph = zlib_graph(&env).await?;

    let output = env.run_binpm(&["analyze", &graph, "--format", "json"])?;
    output.assert_success();
    let report: Value = serde_json::from_str(&output.stdout)?;
    let packages = report["packages"].as_array().unwrap();
    assert_eq!(packages.len(), 1, "root consumer is not reported");
    assert_eq!(packages[0]["id"], "zlib");
    assert_eq!(packages[0]["binary"], "DOWNLOAD");
    assert_eq!(packages[0]["remote"], "local");
    Ok(())
}

#[tokio::test]
async fn test_missing_binary_fails_with_build_hint() -> Result<()> {
    let env = TestEnv::new().await?;
    add_remote(&env, "local").await?;
    let graph = zlib_graph(&env).await?;

    env.binpm()
        .args(["analyze", &graph])
        .assert()
        .failure()
        .stdout(predicate::str::contains("MISSING"))
        .stderr(predicate::str::contains("Missing prebuilt package for 'zlib/1.2.11@conan/stable'"))
        .stderr(predicate::str::contains("--build=zlib"));
    Ok(())
}

#[tokio::test]
async fn test_build_missing() -> Result<()> {
    let env = TestEnv::new().await?;
    let graph = zlib_graph(&env).await?;

    env.run_binpm(&["analyze", &graph, "--build=missing"])?
        .assert_success()
        .assert_stdout_contains("zlib/1.2.11@conan/stable:abc  BUILD");
    Ok(())
}

#[tokio::test]
async fn test_unmatched_build_pattern_fails() -> Result<()> {
    let env = TestEnv::new().await?;
    add_remote(&env, "local").await?;
    env.publish("local", ZLIB_PKG, 10, "h").await?;
    let graph = zlib_graph(&env).await?;

    env.binpm()
        .args(["analyze", &graph, "--build=boost"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No package matching 'boost' pattern"));
    Ok(())
}

#[tokio::test]
async fn test_conflicting_build_modes_are_rejected() -> Result<()> {
    let env = TestEnv::new().await?;
    let graph = zlib_graph(&env).await?;

    env.binpm()
        .args(["analyze", &graph, "--build=never", "--build=missing"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--build=never"));
    Ok(())
}

#[tokio::test]
async fn test_unknown_remote_suggests_closest() -> Result<()> {
    let env = TestEnv::new().await?;
    add_remote(&env, "local").await?;
    let graph = zlib_graph(&env).await?;

    env.binpm()
        .args(["analyze", &graph, "-r", "locl"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No remote 'locl' defined in remotes"))
        .stderr(predicate::str::contains("Did you mean 'local'?"));
    Ok(())
}

#[tokio::test]
async fn test_cached_package_is_reused_without_remote() -> Result<()> {
    let env = TestEnv::new().await?;
    env.cache_package(ZLIB_PKG, 10, "h").await?;
    let graph = zlib_graph(&env).await?;

    env.run_binpm(&["analyze", &graph])?
        .assert_success()
        .assert_stdout_contains("zlib/1.2.11@conan/stable:abc  CACHE");
    Ok(())
}

#[tokio::test]
async fn test_dirty_package_is_purged_and_downloaded() -> Result<()> {
    let env = TestEnv::new().await?;
    add_remote(&env, "local").await?;
    env.publish("local", ZLIB_PKG, 10, "h").await?;
    let folder = env.cache_package(ZLIB_PKG, 10, "h").await?;
    let flag = folder.with_file_name("abc.dirty");
    tokio::fs::write(&flag, b"").await?;
    let graph = zlib_graph(&env).await?;

    env.run_binpm(&["analyze", &graph])?
        .assert_success()
        .assert_stdout_contains("DOWNLOAD  local");
    assert!(!folder.exists(), "corrupted package folder should be removed");
    assert!(!flag.exists(), "dirty flag should be cleared");
    Ok(())
}

#[tokio::test]
async fn test_update_reports_newer_remote_binary() -> Result<()> {
    let env = TestEnv::new().await?;
    add_remote(&env, "local").await?;
    env.cache_package(ZLIB_PKG, 10, "h").await?;
    env.publish("local", ZLIB_PKG, 20, "h").await?;
    let graph = zlib_graph(&env).await?;

    env.run_binpm(&["analyze", &graph, "--update", "--remote", "local"])?
        .assert_success()
        .assert_stdout_contains("UPDATE  local");
    Ok(())
}

#[tokio::test]
async fn test_outdated_package_is_rebuilt() -> Result<()> {
    let env = TestEnv::new().await?;
    let recipe_hash = env.cache_recipe(ZLIB, "5d41").await?;
    env.cache_package(ZLIB_PKG, 10, "stale").await?;
    let graph = zlib_graph(&env).await?;

    env.run_binpm(&["analyze", &graph, "--build=outdated"])?
        .assert_success()
        .assert_stdout_contains("zlib/1.2.11@conan/stable:abc  BUILD");

    env.cache_package(ZLIB_PKG, 10, &recipe_hash).await?;
    env.run_binpm(&["analyze", &graph, "--build=outdated"])?
        .assert_success()
        .assert_stdout_contains("zlib/1.2.11@conan/stable:abc  CACHE");
    Ok(())
}

#[tokio::test]
async fn test_workspace_package() -> Result<()> {
    let env = TestEnv::new().await?;
    let graph = zlib_graph(&env).await?;
    let workspace_yaml = "editables:\n  zlib/1.2.11@conan/stable:\n    path: zlib\n";
    let workspace = env.write_project_file("binpm_ws.yml", workspace_yaml).await?;

    env.run_binpm(&["analyze", &graph, "--workspace", &workspace.display().to_string()])?
        .assert_success()
        .assert_stdout_contains("zlib/1.2.11@conan/stable:abc  WORKSPACE");
    Ok(())
}

#[tokio::test]
async fn test_revisions_probe_other_remotes() -> Result<()> {
    let env = TestEnv::new().await?;
    add_remote(&env, "first").await?;
    add_remote(&env, "second").await?;
    env.publish("second", ZLIB_PKG, 10, "h").await?;
    env.run_binpm(&["remote", "add-ref", ZLIB, "first"])?.assert_success();
    let graph = zlib_graph(&env).await?;

    // The associated remote lacks the binary and there is no fallback.
    env.run_binpm(&["analyze", &graph])?.assert_failure().assert_stdout_contains("MISSING");

    env.binpm()
        .args(["analyze", &graph])
        .env("BINPM_REVISIONS_ENABLED", "1")
        .assert()
        .success()
        .stdout(predicate::str::contains("DOWNLOAD  second"));
    Ok(())
}

#[tokio::test]
async fn test_invalid_graph_file() -> Result<()> {
    let env = TestEnv::new().await?;
    let graph = env.write_project_file("graph.json", "{ not json").await?;

    env.run_binpm(&["analyze", &graph.display().to_string()])?
        .assert_failure()
        .assert_stderr_contains("Check the syntax of");
    Ok(())
}
