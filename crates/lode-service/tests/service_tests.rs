//! End-to-end tests for the graph service: initial scan, cached orderings,
//! manual mutations, and watcher-driven updates.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use lode_service::{
    GraphError, GraphService, OnReloadError, Role, ServiceConfig, ServiceError, ServiceEvent,
};
use tempfile::TempDir;

const BASE: &str = "var goog = goog || {};\n";

fn write(dir: &TempDir, rel: &str, content: &str) {
    let path = dir.path().join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}

/// Write through a rename so the watcher sees one event with full content.
fn write_atomic(dir: &TempDir, rel: &str, content: &str) {
    let target = dir.path().join(rel);
    let staging = target.with_extension("tmp");
    std::fs::write(&staging, content).unwrap();
    std::fs::rename(&staging, &target).unwrap();
}

fn fixture_library(dir: &TempDir) {
    write(dir, "lib/base.js", BASE);
    write(
        dir,
        "lib/food.js",
        "goog.provide('food');\ngoog.require('goog');\n",
    );
    write(
        dir,
        "lib/fruit.js",
        "goog.provide('fruit');\ngoog.require('food');\n",
    );
    write(
        dir,
        "lib/banana.js",
        "goog.provide('banana');\ngoog.require('fruit');\n",
    );
}

fn logging() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn lib_config(dir: &TempDir) -> ServiceConfig {
    logging();
    let mut config = ServiceConfig::new(dir.path(), vec!["lib/**/*.js".to_string()]);
    config.debounce_ms = 10;
    config
}

fn file_names(paths: &[PathBuf]) -> Vec<String> {
    paths
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect()
}

async fn wait_for(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(10), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
    })
    .await
    .expect("condition not met within timeout");
}

#[tokio::test]
async fn sorts_library_modules_with_base_first() {
    let dir = TempDir::new().unwrap();
    fixture_library(&dir);

    let service = GraphService::start(lib_config(&dir)).await.unwrap();
    let names = file_names(&service.ordered_paths(None).unwrap());
    assert_eq!(names, ["base.js", "food.js", "fruit.js", "banana.js"]);
}

#[tokio::test]
async fn entry_closures_exclude_unrelated_modules() {
    let dir = TempDir::new().unwrap();
    write(&dir, "goog/base.js", BASE);
    write(
        &dir,
        "lib/fuel.js",
        "goog.provide('fuel');\ngoog.require('goog');\n",
    );
    write(
        &dir,
        "lib/vehicle.js",
        "goog.provide('vehicle');\ngoog.require('fuel');\n",
    );
    write(
        &dir,
        "lib/car.js",
        "goog.provide('car');\ngoog.require('vehicle');\n",
    );
    write(
        &dir,
        "lib/boat.js",
        "goog.provide('boat');\ngoog.require('vehicle');\n",
    );
    write(&dir, "main-car.js", "goog.require('car');\n");
    write(&dir, "main-boat.js", "goog.require('boat');\n");

    logging();
    let mut config = ServiceConfig::new(
        dir.path(),
        vec!["lib/**/*.js".to_string(), "goog/**/*.js".to_string()],
    );
    config.main = vec!["main-*.js".to_string()];
    let service = GraphService::start(config).await.unwrap();

    let car = file_names(&service.ordered_paths(Some(Path::new("main-car.js"))).unwrap());
    assert_eq!(
        car,
        ["base.js", "fuel.js", "vehicle.js", "car.js", "main-car.js"]
    );
    assert!(!car.contains(&"boat.js".to_string()));

    let blanket = file_names(&service.ordered_paths(None).unwrap());
    assert!(blanket.contains(&"car.js".to_string()));
    assert!(blanket.contains(&"boat.js".to_string()));
    assert!(!blanket.contains(&"main-car.js".to_string()));
    assert!(!blanket.contains(&"main-boat.js".to_string()));
}

#[tokio::test]
async fn repeated_queries_are_served_from_cache() {
    let dir = TempDir::new().unwrap();
    fixture_library(&dir);

    let service = GraphService::start(lib_config(&dir)).await.unwrap();
    let first = service.ordering(None).unwrap();
    let second = service.ordering(None).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
}

#[tokio::test]
async fn mutations_invalidate_cached_orderings() {
    let dir = TempDir::new().unwrap();
    fixture_library(&dir);

    let service = GraphService::start(lib_config(&dir)).await.unwrap();
    let before = service.ordered_paths(None).unwrap();
    assert_eq!(before.len(), 4);

    write(
        &dir,
        "lib/cherry.js",
        "goog.provide('cherry');\ngoog.require('fruit');\n",
    );
    service
        .add_module(&dir.path().join("lib/cherry.js"), Role::Lib)
        .await
        .unwrap();

    let after = file_names(&service.ordered_paths(None).unwrap());
    assert!(after.contains(&"cherry.js".to_string()));

    assert!(service.remove_module(Path::new("lib/banana.js")));
    let trimmed = file_names(&service.ordered_paths(None).unwrap());
    assert!(!trimmed.contains(&"banana.js".to_string()));
}

#[tokio::test]
async fn module_lookup_resolves_relative_identities() {
    let dir = TempDir::new().unwrap();
    fixture_library(&dir);

    let service = GraphService::start(lib_config(&dir)).await.unwrap();
    let module = service.module(Path::new("lib/fruit.js")).unwrap();
    assert_eq!(module.provides(), ["fruit"]);
    assert!(module.source().contains("goog.provide('fruit')"));
    assert!(service.module(Path::new("lib/nope.js")).is_none());
}

#[tokio::test]
async fn duplicate_provides_surface_from_ordering() {
    let dir = TempDir::new().unwrap();
    write(&dir, "lib/base.js", BASE);
    write(&dir, "lib/a.js", "goog.provide('app.util');\n");
    write(&dir, "lib/b.js", "goog.provide('app.util');\n");

    let service = GraphService::start(lib_config(&dir)).await.unwrap();
    match service.ordering(None) {
        Err(ServiceError::Graph(GraphError::DuplicateProvide {
            namespace,
            first,
            second,
        })) => {
            assert_eq!(namespace, "app.util");
            assert!(first.ends_with("lib/a.js"));
            assert!(second.ends_with("lib/b.js"));
        }
        other => panic!("expected DuplicateProvide, got {other:?}"),
    }
}

#[tokio::test]
async fn missing_base_surfaces_from_ordering() {
    let dir = TempDir::new().unwrap();
    write(&dir, "lib/a.js", "goog.provide('a');\n");

    let service = GraphService::start(lib_config(&dir)).await.unwrap();
    assert!(matches!(
        service.ordering(None),
        Err(ServiceError::Graph(GraphError::MissingBase))
    ));
}

#[tokio::test]
async fn unknown_entry_point_is_rejected() {
    let dir = TempDir::new().unwrap();
    fixture_library(&dir);

    let service = GraphService::start(lib_config(&dir)).await.unwrap();
    assert!(matches!(
        service.ordering(Some(Path::new("lib/missing.js"))),
        Err(ServiceError::Graph(GraphError::UnknownEntryPoint(_)))
    ));
}

#[tokio::test]
async fn scan_skips_unparseable_files_without_failing() {
    let dir = TempDir::new().unwrap();
    fixture_library(&dir);
    write(&dir, "lib/broken.js", "var = ;\n");

    let service = GraphService::start(lib_config(&dir)).await.unwrap();
    assert_eq!(service.module_count(), 4);
    assert!(service.module(Path::new("lib/broken.js")).is_none());
    let names = file_names(&service.ordered_paths(None).unwrap());
    assert_eq!(names, ["base.js", "food.js", "fruit.js", "banana.js"]);

    // The skipped file is reported on the returned service.
    assert_eq!(service.scan_errors().len(), 1);
    assert!(service.scan_errors()[0].contains("broken.js"));
}

#[tokio::test]
async fn clean_scan_reports_no_errors() {
    let dir = TempDir::new().unwrap();
    fixture_library(&dir);

    let service = GraphService::start(lib_config(&dir)).await.unwrap();
    assert!(service.scan_errors().is_empty());
}

#[tokio::test]
async fn watcher_picks_up_created_files() {
    let dir = TempDir::new().unwrap();
    fixture_library(&dir);

    let service = GraphService::start(lib_config(&dir)).await.unwrap();
    assert_eq!(service.module_count(), 4);

    write_atomic(
        &dir,
        "lib/cherry.js",
        "goog.provide('cherry');\ngoog.require('fruit');\n",
    );
    wait_for(|| service.module(Path::new("lib/cherry.js")).is_some()).await;

    let names = file_names(&service.ordered_paths(None).unwrap());
    assert!(names.contains(&"cherry.js".to_string()));
}

#[tokio::test]
async fn watcher_replaces_edited_records() {
    let dir = TempDir::new().unwrap();
    fixture_library(&dir);

    let service = GraphService::start(lib_config(&dir)).await.unwrap();
    let before = service.module(Path::new("lib/banana.js")).unwrap();
    assert_eq!(before.provides(), ["banana"]);

    write_atomic(
        &dir,
        "lib/banana.js",
        "goog.provide('banana.split');\ngoog.require('fruit');\n",
    );
    wait_for(|| {
        service
            .module(Path::new("lib/banana.js"))
            .is_some_and(|m| m.provides() == ["banana.split"])
    })
    .await;

    // The old record is untouched; the set holds a fresh one.
    assert_eq!(before.provides(), ["banana"]);
}

#[tokio::test]
async fn watcher_drops_deleted_records() {
    let dir = TempDir::new().unwrap();
    fixture_library(&dir);

    let service = GraphService::start(lib_config(&dir)).await.unwrap();
    std::fs::remove_file(dir.path().join("lib/banana.js")).unwrap();
    wait_for(|| service.module(Path::new("lib/banana.js")).is_none()).await;

    let names = file_names(&service.ordered_paths(None).unwrap());
    assert_eq!(names, ["base.js", "food.js", "fruit.js"]);
}

#[tokio::test]
async fn delete_right_after_an_edit_still_removes_the_record() {
    let dir = TempDir::new().unwrap();
    fixture_library(&dir);

    let service = GraphService::start(lib_config(&dir)).await.unwrap();
    assert!(service.module(Path::new("lib/banana.js")).is_some());

    // Edit and delete back to back, inside the debounce window.
    write_atomic(
        &dir,
        "lib/banana.js",
        "goog.provide('banana');\ngoog.require('food');\n",
    );
    std::fs::remove_file(dir.path().join("lib/banana.js")).unwrap();

    wait_for(|| service.module(Path::new("lib/banana.js")).is_none()).await;
    let names = file_names(&service.ordered_paths(None).unwrap());
    assert_eq!(names, ["base.js", "food.js", "fruit.js"]);
}

#[tokio::test]
async fn rename_away_drops_the_record() {
    let dir = TempDir::new().unwrap();
    fixture_library(&dir);

    let service = GraphService::start(lib_config(&dir)).await.unwrap();
    std::fs::rename(
        dir.path().join("lib/banana.js"),
        dir.path().join("lib/banana.js.bak"),
    )
    .unwrap();

    wait_for(|| service.module(Path::new("lib/banana.js")).is_none()).await;
    let names = file_names(&service.ordered_paths(None).unwrap());
    assert_eq!(names, ["base.js", "food.js", "fruit.js"]);
}

#[tokio::test]
async fn failed_reload_keeps_previous_record() {
    let dir = TempDir::new().unwrap();
    fixture_library(&dir);

    let service = GraphService::start(lib_config(&dir)).await.unwrap();
    let mut events = service.subscribe();

    write_atomic(&dir, "lib/fruit.js", "var = ;\n");
    let event = tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            match events.recv().await {
                Ok(ServiceEvent::Error { message }) => break message,
                Ok(_) => continue,
                Err(err) => panic!("event stream closed: {err}"),
            }
        }
    })
    .await
    .expect("no error event within timeout");
    assert!(event.contains("fruit.js"));

    let module = service.module(Path::new("lib/fruit.js")).unwrap();
    assert_eq!(module.provides(), ["fruit"]);
}

#[tokio::test]
async fn drop_policy_evicts_stale_records() {
    let dir = TempDir::new().unwrap();
    fixture_library(&dir);

    let mut config = lib_config(&dir);
    config.on_reload_error = OnReloadError::Drop;
    let service = GraphService::start(config).await.unwrap();

    write_atomic(&dir, "lib/banana.js", "var = ;\n");
    wait_for(|| service.module(Path::new("lib/banana.js")).is_none()).await;
}

#[tokio::test]
async fn stop_freezes_the_module_set() {
    let dir = TempDir::new().unwrap();
    fixture_library(&dir);

    let service = GraphService::start(lib_config(&dir)).await.unwrap();
    service.stop();

    write(
        &dir,
        "lib/cherry.js",
        "goog.provide('cherry');\ngoog.require('fruit');\n",
    );
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(service.module(Path::new("lib/cherry.js")).is_none());

    // Queries still work against the frozen set.
    assert_eq!(service.module_count(), 4);
    assert!(service.ordering(None).is_ok());
}
