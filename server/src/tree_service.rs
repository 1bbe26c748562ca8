//! Folder Tree Service (C12) — builds the virtual folder tree for a
//! source in one paginated pass over `scanned_files`, aggregating
//! `fileCount`/`totalSize` upward and resolving the effective zone per
//! node from a single zone-map load (§4.12).

use std::collections::BTreeMap;

use archivum_core::dto::FolderNodeDto;
use archivum_core::model::Zone;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::Result;
use crate::store;
use crate::zone_service;

const PAGE_SIZE: u32 = 1000;

struct Node {
    file_count: u64,
    total_size: u64,
    file_id: Option<Uuid>,
    extension: Option<String>,
    is_duplicate: Option<bool>,
    children: BTreeMap<String, Node>,
}

impl Node {
    fn folder() -> Self {
        Node {
            file_count: 0,
            total_size: 0,
            file_id: None,
            extension: None,
            is_duplicate: None,
            children: BTreeMap::new(),
        }
    }
}

pub async fn build_tree(pool: &SqlitePool, source_id: Uuid) -> Result<FolderNodeDto> {
    let zone_map = zone_service::load_folder_zones(pool, source_id).await?;

    let mut root = Node::folder();
    let mut page = 0u32;
    loop {
        let files = store::page_files_for_source(pool, source_id, page, PAGE_SIZE).await?;
        if files.is_empty() {
            break;
        }
        for file in &files {
            insert_file(&mut root, &file.path, file);
        }
        if (files.len() as u32) < PAGE_SIZE {
            break;
        }
        page += 1;
    }

    Ok(materialize(&root, "", "/", &zone_map))
}

fn insert_file(root: &mut Node, path: &str, file: &archivum_core::model::ScannedFile) {
    let segments: Vec<&str> = path.trim_start_matches('/').split('/').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        return;
    }

    let mut current = root;
    for (i, segment) in segments.iter().enumerate() {
        let is_last = i == segments.len() - 1;
        current.total_size += file.size;
        current.file_count += 1;
        let child = current
            .children
            .entry(segment.to_string())
            .or_insert_with(Node::folder);
        current = child;
        if is_last {
            current.file_count = 1;
            current.total_size = file.size;
            current.file_id = Some(file.id);
            current.extension = Some(file.extension.clone());
            current.is_duplicate = Some(file.is_duplicate);
        }
    }
}

fn materialize(
    node: &Node,
    name: &str,
    path: &str,
    zone_map: &std::collections::HashMap<String, Zone>,
) -> FolderNodeDto {
    let is_folder = node.file_id.is_none();
    let lookup = zone_service::get_zone_for_folder(zone_map, path);

    let mut folder_children: Vec<(&String, &Node)> = Vec::new();
    let mut file_children: Vec<(&String, &Node)> = Vec::new();
    for (child_name, child) in &node.children {
        if child.file_id.is_none() {
            folder_children.push((child_name, child));
        } else {
            file_children.push((child_name, child));
        }
    }
    folder_children.sort_by(|a, b| a.0.cmp(b.0));
    file_children.sort_by(|a, b| a.0.cmp(b.0));

    let mut children = Vec::new();
    for (child_name, child) in folder_children.into_iter().chain(file_children) {
        let child_path = if path == "/" {
            format!("/{child_name}")
        } else {
            format!("{path}/{child_name}")
        };
        children.push(materialize(child, child_name, &child_path, zone_map));
    }

    FolderNodeDto {
        name: name.to_string(),
        path: path.to_string(),
        is_folder,
        file_count: node.file_count,
        total_size: node.total_size,
        zone: if is_folder { Some(lookup.zone) } else { None },
        is_zone_inherited: lookup.is_inherited,
        file_id: node.file_id,
        extension: node.extension.clone(),
        is_duplicate: node.is_duplicate,
        children,
    }
}
