//! Integration tests for Tuist
//!
//! These tests load a workspace from disk, hash it, round-trip its binaries
//! through a local cloud server and map the graph against the cache.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use tuist_cache::test_utils::StubCloud;
use tuist_cache::{
    CacheGraphMutator, CacheLocalStorage, CacheMapper, CacheRemoteStorage, CacheResources,
    CacheStorage, CacheStoring, CloudClient,
};
use tuist_graph::test_utils::create_app_b_c_repo;
use tuist_graph::{
    BinaryArchitecture, BinaryLinking, CacheDirectories, Context, FileHandler, FileHandling,
    GraphDependency, ValueGraph,
};
use tuist_hasher::{CacheOutputType, CacheProfile, ContentHasher, GraphContentHasher};
use tuist_loader::{
    BinaryInspecting, FrameworkLoader, GraphLoader, LoaderError, ManifestLoader, ModelLoader,
    XCFrameworkLoader, lint_globs,
};

/// Reads any existing file as a dynamic arm64 binary.
struct StubInspector;

impl BinaryInspecting for StubInspector {
    fn architectures(&self, binary: &Path) -> Result<Vec<BinaryArchitecture>, LoaderError> {
        self.linking(binary)?;
        Ok(vec![BinaryArchitecture::Arm64])
    }

    fn linking(&self, binary: &Path) -> Result<BinaryLinking, LoaderError> {
        if binary.is_file() {
            Ok(BinaryLinking::Dynamic)
        } else {
            Err(LoaderError::MetadataNotFound(binary.to_path_buf()))
        }
    }

    fn uuids(&self, binary: &Path) -> Result<BTreeSet<Uuid>, LoaderError> {
        self.linking(binary)?;
        Ok(BTreeSet::new())
    }
}

fn load_graph(root: &Path) -> ValueGraph {
    let file_handler: Arc<dyn FileHandling> = Arc::new(FileHandler);
    let models = ModelLoader::new(Arc::new(ManifestLoader::new(file_handler.clone())));
    let (workspace, projects) = models.load_workspace(root).unwrap();
    lint_globs(&projects, file_handler.as_ref()).unwrap();
    GraphLoader::from_context(&Context::system())
        .load_workspace(&workspace, &projects)
        .unwrap()
}

fn hasher() -> GraphContentHasher {
    GraphContentHasher::new(ContentHasher::new(Arc::new(FileHandler)))
}

fn hashes(graph: &ValueGraph) -> BTreeMap<String, String> {
    hasher()
        .content_hashes(
            graph,
            GraphContentHasher::cacheable,
            &CacheProfile::default(),
            CacheOutputType::XCFramework,
        )
        .unwrap()
        .into_iter()
        .map(|(target, hash)| (target.target.name, hash))
        .collect()
}

/// `<dir>/<name>.xcframework` with one iOS arm64 slice.
fn xcframework(dir: &Path, name: &str) -> PathBuf {
    let bundle = dir.join(format!("{name}.xcframework"));
    let slice = bundle.join(format!("ios-arm64/{name}.framework"));
    std::fs::create_dir_all(&slice).unwrap();
    std::fs::write(slice.join(name), format!("{name} binary")).unwrap();
    let plist = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<plist version="1.0">
<dict>
    <key>AvailableLibraries</key>
    <array>
        <dict>
            <key>LibraryIdentifier</key>
            <string>ios-arm64</string>
            <key>LibraryPath</key>
            <string>{name}.framework</string>
            <key>SupportedArchitectures</key>
            <array><string>arm64</string></array>
            <key>SupportedPlatform</key>
            <string>ios</string>
        </dict>
    </array>
</dict>
</plist>
"#
    );
    std::fs::write(bundle.join("Info.plist"), plist).unwrap();
    bundle
}

fn remote(cloud: &StubCloud, cache: &Path) -> Arc<dyn CacheStoring> {
    let client = CloudClient::new(&cloud.url, Some("token".into()), Duration::from_secs(5)).unwrap();
    Arc::new(CacheRemoteStorage::new(
        client,
        CacheResources::new("tuist/app"),
        CacheDirectories::new(cache),
        Arc::new(FileHandler),
    ))
}

fn mapper(storage: Arc<dyn CacheStoring>) -> CacheMapper {
    let file_handler: Arc<dyn FileHandling> = Arc::new(FileHandler);
    let inspector: Arc<dyn BinaryInspecting> = Arc::new(StubInspector);
    let mutator = CacheGraphMutator::new(
        FrameworkLoader::new(file_handler.clone(), inspector.clone()),
        XCFrameworkLoader::new(file_handler, inspector),
    );
    CacheMapper::new(
        hasher(),
        storage,
        mutator,
        CacheProfile::default(),
        CacheOutputType::XCFramework,
    )
}

#[test]
fn test_workspace_loads_from_manifests() {
    let repo = create_app_b_c_repo();
    let graph = load_graph(repo.path());

    assert_eq!(graph.target_count(), 4);
    let app = GraphDependency::target("App", repo.path().join("App"));
    let b = GraphDependency::target("B", repo.path().join("Frameworks"));
    assert!(graph.direct_dependencies(&app).contains(&b));
    assert_eq!(
        graph.linked_binaries(&repo.path().join("App"), "App"),
        BTreeSet::from([
            "B".to_string(),
            "C".to_string(),
            "UIKit.framework".to_string()
        ])
    );
}

#[test]
fn test_loading_and_hashing_are_repeatable() {
    let repo = create_app_b_c_repo();
    let first = load_graph(repo.path());
    let second = load_graph(repo.path());
    assert_eq!(first, second);

    let hashes = hashes(&first);
    assert_eq!(hashes.keys().collect::<Vec<_>>(), vec!["B", "C"]);
    assert_eq!(hashes, self::hashes(&second));
}

#[test]
fn test_editing_a_leaf_rehashes_its_dependents() {
    let repo = create_app_b_c_repo();
    let before = hashes(&load_graph(repo.path()));
    std::fs::write(
        repo.path().join("Frameworks/C/C.swift"),
        "public struct C { let value = 1 }\n",
    )
    .unwrap();
    let after = hashes(&load_graph(repo.path()));

    assert_ne!(before["C"], after["C"]);
    assert_ne!(before["B"], after["B"]);
}

#[tokio::test]
async fn test_binaries_stored_by_one_machine_replace_targets_on_another() {
    let repo = create_app_b_c_repo();
    let graph = load_graph(repo.path());
    let hashes = hashes(&graph);
    let cloud = StubCloud::start().await;

    // Producer: builds B and C and uploads them.
    let producer_cache = tempfile::tempdir().unwrap();
    let bundles = tempfile::tempdir().unwrap();
    let producer = remote(&cloud, producer_cache.path());
    for (name, hash) in &hashes {
        let bundle = xcframework(&bundles.path().join(name), name);
        producer.store(hash, &bundle).await.unwrap();
    }
    assert_eq!(cloud.state().artifacts.len(), 2);

    // Consumer: empty local cache backed by the same cloud.
    let consumer_cache = tempfile::tempdir().unwrap();
    let directories = CacheDirectories::new(consumer_cache.path());
    let local = CacheLocalStorage::new(directories.clone(), Arc::new(FileHandler));
    let storage = Arc::new(CacheStorage::new(
        local.clone(),
        vec![remote(&cloud, consumer_cache.path())],
    ));
    cloud.state().requests.clear();

    let mapped = mapper(storage).map(&graph).await.unwrap();

    let app_path = repo.path().join("App");
    let frameworks = repo.path().join("Frameworks");
    let app = GraphDependency::target("App", &app_path);
    let app_deps: Vec<String> = mapped
        .direct_dependencies(&app)
        .into_iter()
        .map(|dep| dep.to_string())
        .collect();
    assert_eq!(app_deps, vec!["xcframework 'B.xcframework'"]);

    for name in ["B", "C"] {
        assert!(mapped.target(&frameworks, name).unwrap().target.prune);
        assert!(local.exists(&hashes[name]).await.unwrap());
    }
    assert!(!mapped.target(&app_path, "App").unwrap().target.prune);
    for name in ["App", "AppTests"] {
        assert_eq!(
            graph.linked_binaries(&app_path, name),
            mapped.linked_binaries(&app_path, name)
        );
    }

    let downloads = cloud
        .state()
        .requests
        .iter()
        .filter(|r| r.starts_with("GET /download/"))
        .count();
    assert_eq!(downloads, 2);
}

#[tokio::test]
async fn test_focused_targets_stay_as_sources() {
    let repo = create_app_b_c_repo();
    let graph = load_graph(repo.path());
    let hashes = hashes(&graph);

    let cache = tempfile::tempdir().unwrap();
    let bundles = tempfile::tempdir().unwrap();
    let local = CacheLocalStorage::new(CacheDirectories::new(cache.path()), Arc::new(FileHandler));
    for (name, hash) in &hashes {
        local
            .store(hash, &xcframework(&bundles.path().join(name), name))
            .await
            .unwrap();
    }
    let storage = Arc::new(CacheStorage::new(local, Vec::new()));

    let mapped = mapper(storage)
        .with_sources(BTreeSet::from(["B".to_string()]))
        .map(&graph)
        .await
        .unwrap();

    let frameworks = repo.path().join("Frameworks");
    assert!(!mapped.target(&frameworks, "B").unwrap().target.prune);
    assert!(mapped.target(&frameworks, "C").unwrap().target.prune);
    let b_deps: Vec<String> = mapped
        .direct_dependencies(&GraphDependency::target("B", &frameworks))
        .into_iter()
        .map(|dep| dep.to_string())
        .collect();
    assert_eq!(b_deps, vec!["xcframework 'C.xcframework'"]);
}
