use anyhow::Result;
use predicates::prelude::*;

use crate::common::TestEnv;

#[tokio::test]
async fn test_remote_lifecycle() -> Result<()> {
    let env = TestEnv::new().await?;
    let url = env.create_remote("local").await?;

    env.binpm()
        .args(["remote", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No remotes defined"));

    env.binpm().args(["remote", "add", "local", &url]).assert().success();
    env.binpm()
        .args(["remote", "add", "center", "https://center.example.com", "--insecure"])
        .assert()
        .success();

    let output = env.run_binpm(&["remote", "list"])?;
    output
        .assert_success()
        .assert_stdout_contains(&format!("local: {url}"))
        .assert_stdout_contains("center: https://center.example.com [Verify SSL: False]");
    let local = output.stdout.find("local:").unwrap();
    let center = output.stdout.find("center:").unwrap();
    assert!(local < center, "remotes are listed in probing order");

    env.binpm().args(["remote", "remove", "center"]).assert().success();
    env.binpm()
        .args(["remote", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("center").not());
    Ok(())
}

#[tokio::test]
async fn test_duplicate_remote() -> Result<()> {
    let env = TestEnv::new().await?;
    env.run_binpm(&["remote", "add", "local", "file:///srv/a"])?.assert_success();

    env.binpm()
        .args(["remote", "add", "local", "file:///srv/b"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Remote 'local' already exists"));
    Ok(())
}

#[tokio::test]
async fn test_remove_unknown_remote() -> Result<()> {
    let env = TestEnv::new().await?;
    env.run_binpm(&["remote", "add", "conan-center", "file:///srv/a"])?.assert_success();

    env.binpm()
        .args(["remote", "remove", "conan-centre"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No remote 'conan-centre' defined in remotes"))
        .stderr(predicate::str::contains("Did you mean 'conan-center'?"));
    Ok(())
}

#[tokio::test]
async fn test_associations_are_persisted() -> Result<()> {
    let env = TestEnv::new().await?;
    env.run_binpm(&["remote", "add", "local", "file:///srv/a"])?.assert_success();
    env.run_binpm(&["remote", "add-ref", "zlib/1.2.11@conan/stable#rev1", "local"])?
        .assert_success();
    env.run_binpm(&["remote", "add-pref", "zlib/1.2.11@conan/stable:abc", "local"])?
        .assert_success();

    let registry = std::fs::read_to_string(env.registry_path())?;
    assert!(registry.contains("zlib/1.2.11@conan/stable:abc"));
    assert!(!registry.contains("rev1"), "associations are stored without revisions");

    // Removing the remote drops its associations
    env.run_binpm(&["remote", "remove", "local"])?.assert_success();
    let registry = std::fs::read_to_string(env.registry_path())?;
    assert!(!registry.contains("zlib"));
    Ok(())
}

#[tokio::test]
async fn test_invalid_reference_is_rejected() -> Result<()> {
    let env = TestEnv::new().await?;
    env.run_binpm(&["remote", "add", "local", "file:///srv/a"])?.assert_success();

    env.binpm()
        .args(["remote", "add-ref", "z/1.0@conan/stable", "local"])
        .assert()
        .failure();
    Ok(())
}
