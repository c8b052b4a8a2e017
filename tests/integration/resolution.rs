use anyhow::Result;
use serde_json::json;

use binpm::binaries::{BinaryAnalyzer, BinaryReport};
use binpm::build_mode::BuildMode;
use binpm::cache::PackageCache;
use binpm::graph::{BinaryStatus, DepsGraph, GraphDescription};
use binpm::remote::{FileRemoteManager, Registry, Remote, RemoteRegistry};

use crate::common::TestEnv;

fn graph(description: serde_json::Value) -> DepsGraph {
    let description: GraphDescription = serde_json::from_value(description).unwrap();
    DepsGraph::from_description(description).unwrap()
}

fn status(graph: &DepsGraph, label: &str) -> Option<BinaryStatus> {
    graph.node(graph.find(label).unwrap()).binary
}

async fn registry(env: &TestEnv, names: &[&str]) -> Result<Registry> {
    let mut remotes = Vec::new();
    for name in names {
        remotes.push(Remote::new(*name, env.create_remote(name).await?));
    }
    Ok(Registry::with_remotes(remotes))
}

#[tokio::test]
async fn test_private_dependencies_of_downloaded_binary_are_skipped() -> Result<()> {
    let env = TestEnv::new().await?;
    let registry = registry(&env, &["local"]).await?;
    env.publish("local", "mylib/1.0@user/stable:lib1", 5, "h").await?;

    let mut graph = graph(json!({
        "nodes": [
            { "id": "app" },
            { "id": "mylib", "reference": "mylib/1.0@user/stable", "package_id": "lib1" },
            { "id": "zlib", "reference": "zlib/1.2.11@conan/stable", "package_id": "z1" },
            { "id": "bzip2", "reference": "bzip2/1.0.8@conan/stable", "package_id": "b1" }
        ],
        "edges": [
            { "from": "app", "to": "mylib" },
            { "from": "mylib", "to": "zlib", "private": true },
            { "from": "zlib", "to": "bzip2", "private": true }
        ]
    }));

    let cache = PackageCache::new(env.storage_path());
    let remotes = FileRemoteManager::new();
    BinaryAnalyzer::new(&cache, &remotes, &registry)
        .evaluate_graph(&mut graph, &BuildMode::new(None)?, false, None)
        .await?;

    assert_eq!(status(&graph, "mylib"), Some(BinaryStatus::Download));
    assert_eq!(status(&graph, "zlib"), Some(BinaryStatus::Skip));
    assert_eq!(status(&graph, "bzip2"), Some(BinaryStatus::Skip));
    assert_eq!(status(&graph, "app"), None);

    let report = BinaryReport::from_graph(&graph);
    assert_eq!(report.count(BinaryStatus::Skip), 2);
    assert_eq!(report.missing().count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_identical_packages_share_decision() -> Result<()> {
    let env = TestEnv::new().await?;
    let registry = registry(&env, &["first", "second"]).await?;
    env.publish("second", "zlib/1.2.11@conan/stable:z1", 5, "h").await?;

    let mut graph = graph(json!({
        "nodes": [
            { "id": "app" },
            { "id": "left", "reference": "left/1.0@user/stable", "package_id": "l1" },
            { "id": "right", "reference": "right/1.0@user/stable", "package_id": "r1" },
            { "id": "zlib-a", "reference": "zlib/1.2.11@conan/stable", "package_id": "z1" },
            { "id": "zlib-b", "reference": "zlib/1.2.11@conan/stable", "package_id": "z1" }
        ],
        "edges": [
            { "from": "app", "to": "left" },
            { "from": "app", "to": "right" },
            { "from": "left", "to": "zlib-a" },
            { "from": "right", "to": "zlib-b" }
        ]
    }));

    let cache = PackageCache::new(env.storage_path());
    let remotes = FileRemoteManager::new();
    BinaryAnalyzer::new(&cache, &remotes, &registry)
        .evaluate_graph(&mut graph, &BuildMode::new(Some(&["missing".to_string()]))?, false, None)
        .await?;

    for label in ["zlib-a", "zlib-b"] {
        let node = graph.node(graph.find(label).unwrap());
        assert_eq!(node.binary, Some(BinaryStatus::Download));
        assert_eq!(node.binary_remote.as_ref().map(|r| r.name.as_str()), Some("second"));
    }
    assert_eq!(status(&graph, "left"), Some(BinaryStatus::Build));
    assert_eq!(status(&graph, "right"), Some(BinaryStatus::Build));
    Ok(())
}

#[tokio::test]
async fn test_package_association_wins_over_recipe_association() -> Result<()> {
    let env = TestEnv::new().await?;
    let mut registry = registry(&env, &["recipes", "binaries"]).await?;
    env.publish("recipes", "zlib/1.2.11@conan/stable:z1", 5, "h").await?;
    env.publish("binaries", "zlib/1.2.11@conan/stable:z1", 5, "h").await?;
    registry.set_reference_remote(&"zlib/1.2.11@conan/stable".parse()?, "recipes")?;
    registry.set_package_remote(&"zlib/1.2.11@conan/stable:z1".parse()?, "binaries")?;

    let mut graph = graph(json!({
        "nodes": [
            { "id": "app" },
            { "id": "zlib", "reference": "zlib/1.2.11@conan/stable", "package_id": "z1" }
        ],
        "edges": [ { "from": "app", "to": "zlib" } ]
    }));

    let cache = PackageCache::new(env.storage_path());
    let remotes = FileRemoteManager::new();
    BinaryAnalyzer::new(&cache, &remotes, &registry)
        .evaluate_graph(&mut graph, &BuildMode::new(None)?, false, None)
        .await?;

    let node = graph.node(graph.find("zlib").unwrap());
    assert_eq!(node.binary, Some(BinaryStatus::Download));
    assert_eq!(node.binary_remote.as_ref().map(|r| r.name.as_str()), Some("binaries"));
    Ok(())
}

#[tokio::test]
async fn test_unreachable_remote_is_skipped() -> Result<()> {
    let env = TestEnv::new().await?;
    // The http remote is probed first and cannot be served.
    let registry = Registry::with_remotes(vec![
        Remote::new("http", "https://center.example.com"),
        Remote::new("good", env.create_remote("good").await?),
    ]);
    env.publish("good", "zlib/1.2.11@conan/stable:z1", 5, "h").await?;
    assert!(registry.remote("http").is_some());

    let mut graph = graph(json!({
        "nodes": [ { "id": "zlib", "reference": "zlib/1.2.11@conan/stable", "package_id": "z1" } ]
    }));

    let cache = PackageCache::new(env.storage_path());
    let remotes = FileRemoteManager::new();
    BinaryAnalyzer::new(&cache, &remotes, &registry)
        .evaluate_graph(&mut graph, &BuildMode::new(None)?, false, None)
        .await?;

    let node = graph.node(graph.find("zlib").unwrap());
    assert_eq!(node.binary, Some(BinaryStatus::Download));
    assert_eq!(node.binary_remote.as_ref().map(|r| r.name.as_str()), Some("good"));
    Ok(())
}
