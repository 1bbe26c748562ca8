//! End-to-end coverage over the Catalog Store, Ingest Service, and Dedup
//! Engine against an in-memory SQLite database (§8 properties 4, 5, 6, 10, 11).

use archivum_core::model::{
    CodeProject, CodeProjectDuplicateType, ExifRecord, FileStatus, PhysicalId, ProjectType,
    ScannedFile, Source, SourceStatus, SourceType, Zone,
};
use archivum_server::ingest::SourceLocks;
use archivum_server::{dedup, ingest, store, tree_service, zone_service};
use chrono::Utc;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use uuid::Uuid;

async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("open in-memory sqlite");
    store::run_migrations(&pool).await.expect("run migrations");
    pool
}

fn new_source(root_path: &str) -> Source {
    let now = Utc::now();
    Source {
        id: Uuid::new_v4(),
        name: "test-source".to_string(),
        source_type: SourceType::Disk,
        root_path: root_path.to_string(),
        parent_source_id: None,
        status: SourceStatus::Scanning,
        total_files: 0,
        total_size: 0,
        processed_files: 0,
        processed_size: 0,
        created_at: now,
        updated_at: now,
        physical_id: PhysicalId::default(),
    }
}

fn file(source_id: Uuid, path: &str, sha256: &str, size: u64) -> ScannedFile {
    let now = Utc::now();
    let name = path.rsplit('/').next().unwrap_or(path).to_string();
    ScannedFile {
        id: Uuid::new_v4(),
        source_id,
        path: path.to_string(),
        name: name.clone(),
        extension: String::new(),
        size,
        sha256: sha256.to_string(),
        mime_type: "application/octet-stream".to_string(),
        created_at: now,
        modified_at: now,
        accessed_at: now,
        scanned_at: now,
        exif: None::<ExifRecord>,
        status: FileStatus::Hashed,
        is_duplicate: false,
    }
}

#[tokio::test]
async fn small_tree_has_no_duplicates() {
    let pool = test_pool().await;
    let locks = SourceLocks::new();
    let source = new_source("/tmp/src");
    let source_id = source.id;
    ingest::create_source(&pool, source).await.unwrap();

    let files = vec![
        file(source_id, "/tmp/src/a.txt", "aaaa", 100),
        file(source_id, "/tmp/src/b/c.txt", "bbbb", 200),
    ];
    ingest::ingest_batch(&pool, &locks, source_id, files).await.unwrap();
    ingest::complete_scan(&pool, &locks, source_id, 2, 300, true).await.unwrap();

    let stored = store::list_files_for_source(&pool, source_id).await.unwrap();
    assert_eq!(stored.len(), 2);
    assert!(stored.iter().all(|f| !f.is_duplicate));

    let groups = store::list_duplicate_groups(&pool).await.unwrap();
    assert_eq!(groups.len(), 0);

    let source_after = store::find_source(&pool, source_id).await.unwrap().unwrap();
    assert!(matches!(source_after.status, SourceStatus::Completed));
}

#[tokio::test]
async fn intra_source_duplicate_marks_one_pending_group() {
    let pool = test_pool().await;
    let locks = SourceLocks::new();
    let source = new_source("/src");
    let source_id = source.id;
    ingest::create_source(&pool, source).await.unwrap();

    let files = vec![
        file(source_id, "/src/copy1/x", "same-hash", 50),
        file(source_id, "/src/copy2/x", "same-hash", 50),
    ];
    ingest::ingest_batch(&pool, &locks, source_id, files).await.unwrap();
    ingest::complete_scan(&pool, &locks, source_id, 2, 100, true).await.unwrap();

    let groups = store::list_duplicate_groups(&pool).await.unwrap();
    assert_eq!(groups.len(), 1);
    assert!(matches!(
        groups[0].status,
        archivum_core::model::DuplicateGroupStatus::Pending
    ));

    let stored = store::list_files_for_source(&pool, source_id).await.unwrap();
    let duplicates = stored.iter().filter(|f| f.is_duplicate).count();
    assert_eq!(duplicates, 1);
}

#[tokio::test]
async fn software_zone_protects_duplicates_even_after_rerun() {
    let pool = test_pool().await;
    let locks = SourceLocks::new();
    let source = new_source("/src");
    let source_id = source.id;
    ingest::create_source(&pool, source).await.unwrap();

    let files = vec![
        file(source_id, "/src/copy1/x", "same-hash", 50),
        file(source_id, "/src/copy2/x", "same-hash", 50),
    ];
    ingest::ingest_batch(&pool, &locks, source_id, files).await.unwrap();

    zone_service::set_folder_zone(&pool, source_id, "/src", Zone::Software)
        .await
        .unwrap();

    ingest::complete_scan(&pool, &locks, source_id, 2, 100, true).await.unwrap();

    let stored = store::list_files_for_source(&pool, source_id).await.unwrap();
    assert!(stored.iter().all(|f| !f.is_duplicate));

    let groups = store::list_duplicate_groups(&pool).await.unwrap();
    assert_eq!(groups.len(), 0);

    // Rerunning reconciliation must not retroactively flag the gated files.
    dedup::reconcile_source(&pool, source_id).await.unwrap();
    let stored_again = store::list_files_for_source(&pool, source_id).await.unwrap();
    assert!(stored_again.iter().all(|f| !f.is_duplicate));
}

#[tokio::test]
async fn create_source_is_idempotent_by_id() {
    let pool = test_pool().await;
    let source = new_source("/disk1");
    let id = source.id;

    let first = ingest::create_source(&pool, source.clone()).await.unwrap();
    let second = ingest::create_source(&pool, source).await.unwrap();
    assert_eq!(first.id, second.id);
    assert_eq!(id, second.id);

    let all = store::list_sources(&pool).await.unwrap();
    assert_eq!(all.len(), 1);
}

#[tokio::test]
async fn create_source_conflicts_on_divergent_attributes() {
    let pool = test_pool().await;
    let mut source = new_source("/disk1");
    let id = source.id;
    ingest::create_source(&pool, source.clone()).await.unwrap();

    source.root_path = "/disk2".to_string();
    let result = ingest::create_source(&pool, source).await;
    assert!(result.is_err());

    let stored = store::find_source(&pool, id).await.unwrap().unwrap();
    assert_eq!(stored.root_path, "/disk1");
}

#[tokio::test]
async fn ingest_batch_requires_scanning_status() {
    let pool = test_pool().await;
    let locks = SourceLocks::new();
    let source = new_source("/disk1");
    let source_id = source.id;
    ingest::create_source(&pool, source).await.unwrap();
    ingest::complete_scan(&pool, &locks, source_id, 0, 0, true).await.unwrap();

    let files = vec![file(source_id, "/disk1/late.txt", "late-hash", 10)];
    let result = ingest::ingest_batch(&pool, &locks, source_id, files).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn tree_aggregates_file_count_and_total_size() {
    let pool = test_pool().await;
    let locks = SourceLocks::new();
    let source = new_source("/tmp/src");
    let source_id = source.id;
    ingest::create_source(&pool, source).await.unwrap();

    let files = vec![
        file(source_id, "/tmp/src/a.txt", "h1", 100),
        file(source_id, "/tmp/src/b/c.txt", "h2", 200),
        file(source_id, "/tmp/src/b/d.txt", "h3", 50),
    ];
    ingest::ingest_batch(&pool, &locks, source_id, files).await.unwrap();
    ingest::complete_scan(&pool, &locks, source_id, 3, 350, true).await.unwrap();

    let tree = tree_service::build_tree(&pool, source_id).await.unwrap();
    assert_eq!(tree.file_count, 3);
    assert_eq!(tree.total_size, 350);

    let tmp = tree.children.iter().find(|n| n.name == "tmp").expect("tmp folder present");
    let src = tmp.children.iter().find(|n| n.name == "src").expect("src folder present");
    let b_node = src.children.iter().find(|n| n.name == "b").expect("b folder present");
    assert_eq!(b_node.file_count, 2);
    assert_eq!(b_node.total_size, 250);
}

fn code_project(source_id: Uuid, root_path: &str, identifier: &str, hashes: &[&str]) -> CodeProject {
    let source_hashes: Vec<String> = hashes.iter().map(|h| h.to_string()).collect();
    CodeProject {
        id: Uuid::new_v4(),
        source_id,
        root_path: root_path.to_string(),
        project_type: ProjectType::Npm,
        name: "widget".to_string(),
        version: Some("1.0.0".to_string()),
        group_id: None,
        git_remote: None,
        git_branch: None,
        git_commit: None,
        identifier: identifier.to_string(),
        content_hash: hashes.join(""),
        source_file_count: source_hashes.len() as u64,
        total_file_count: source_hashes.len() as u64,
        total_size_bytes: 0,
        scanned_at: Utc::now(),
        source_hashes,
    }
}

#[tokio::test]
async fn diverging_projects_classify_by_jaccard_similarity() {
    let pool = test_pool().await;
    let locks = SourceLocks::new();
    let source_a = new_source("/disk1");
    let source_a_id = source_a.id;
    let source_b = new_source("/disk2");
    let source_b_id = source_b.id;
    ingest::create_source(&pool, source_a).await.unwrap();
    ingest::create_source(&pool, source_b).await.unwrap();

    let identifier = "npm:widget";
    let a = code_project(source_a_id, "/disk1/widget", identifier, &["h1", "h2", "h3", "h4"]);
    let b = code_project(source_b_id, "/disk2/widget", identifier, &["h1", "h2", "h3", "h5"]);

    ingest::ingest_code_projects(&pool, &locks, source_a_id, vec![a]).await.unwrap();
    ingest::complete_scan(&pool, &locks, source_a_id, 4, 0, true).await.unwrap();
    ingest::ingest_code_projects(&pool, &locks, source_b_id, vec![b]).await.unwrap();
    ingest::complete_scan(&pool, &locks, source_b_id, 4, 0, true).await.unwrap();

    let groups = store::list_code_project_duplicate_groups(&pool).await.unwrap();
    let (_, members) = groups
        .iter()
        .find(|(g, _)| g.identifier == identifier)
        .expect("duplicate group for shared identifier");

    assert_eq!(members.len(), 2);
    for member in members {
        if !member.is_primary {
            assert!(matches!(
                member.duplicate_type,
                CodeProjectDuplicateType::SameProjectDiffContent
            ));
            // intersection {h1,h2,h3} / union {h1,h2,h3,h4,h5} = 3/5
            let similarity = member.similarity_percent.expect("similarity recorded");
            assert!((similarity - 60.0).abs() < 0.01, "similarity was {similarity}");
        }
    }
}

#[tokio::test]
async fn three_way_duplicate_group_has_exactly_one_primary() {
    let pool = test_pool().await;
    let locks = SourceLocks::new();
    let source_a = new_source("/disk1");
    let source_a_id = source_a.id;
    let source_b = new_source("/disk2");
    let source_b_id = source_b.id;
    let source_c = new_source("/disk3");
    let source_c_id = source_c.id;
    ingest::create_source(&pool, source_a).await.unwrap();
    ingest::create_source(&pool, source_b).await.unwrap();
    ingest::create_source(&pool, source_c).await.unwrap();

    let identifier = "npm:widget";
    let a = code_project(source_a_id, "/disk1/widget", identifier, &["h1", "h2"]);
    let b = code_project(source_b_id, "/disk2/widget", identifier, &["h1", "h2"]);
    let c = code_project(source_c_id, "/disk3/widget", identifier, &["h1", "h2"]);

    ingest::ingest_code_projects(&pool, &locks, source_a_id, vec![a]).await.unwrap();
    ingest::complete_scan(&pool, &locks, source_a_id, 2, 0, true).await.unwrap();
    ingest::ingest_code_projects(&pool, &locks, source_b_id, vec![b]).await.unwrap();
    ingest::complete_scan(&pool, &locks, source_b_id, 2, 0, true).await.unwrap();
    ingest::ingest_code_projects(&pool, &locks, source_c_id, vec![c]).await.unwrap();
    ingest::complete_scan(&pool, &locks, source_c_id, 2, 0, true).await.unwrap();

    let groups = store::list_code_project_duplicate_groups(&pool).await.unwrap();
    let (_, members) = groups
        .iter()
        .find(|(g, _)| g.identifier == identifier)
        .expect("duplicate group for shared identifier");

    assert_eq!(members.len(), 3);
    assert_eq!(members.iter().filter(|m| m.is_primary).count(), 1);
}

#[tokio::test]
async fn zone_inheritance_matches_nearest_ancestor() {
    let pool = test_pool().await;
    let source_id = Uuid::new_v4();
    zone_service::set_folder_zone(&pool, source_id, "/a", Zone::Media).await.unwrap();
    zone_service::set_folder_zone(&pool, source_id, "/a/b", Zone::Documents).await.unwrap();

    let map = zone_service::load_folder_zones(&pool, source_id).await.unwrap();

    let deep = zone_service::get_zone_for_folder(&map, "/a/b/c/d");
    assert_eq!(deep.zone, Zone::Documents);
    assert!(deep.is_inherited);

    let sibling = zone_service::get_zone_for_folder(&map, "/a/x");
    assert_eq!(sibling.zone, Zone::Media);
    assert!(sibling.is_inherited);

    let unknown = zone_service::get_zone_for_folder(&map, "/z");
    assert_eq!(unknown.zone, Zone::Unknown);
}
