//! Zone Service (C11) — thin wrapper over the store for folder-zone
//! assignments, plus the read-time inheritance lookup used by the Dedup
//! Engine and the Folder Tree Service.

use std::collections::HashMap;

use archivum_core::model::Zone;
use archivum_core::zone;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::Result;
use crate::store;

pub async fn load_folder_zones(pool: &SqlitePool, source_id: Uuid) -> Result<HashMap<String, Zone>> {
    store::load_folder_zones(pool, source_id).await
}

pub struct ZoneLookup {
    pub zone: Zone,
    pub is_inherited: bool,
}

/// `getZoneForFolder` — resolves the effective zone for `path` against an
/// already-loaded assignment map, flagging whether the match was an exact
/// assignment or inherited from an ancestor.
pub fn get_zone_for_folder(map: &HashMap<String, Zone>, path: &str) -> ZoneLookup {
    let normalized = path.trim_end_matches('/');
    let zone = zone::resolve(map, normalized);
    let is_inherited = !map.contains_key(normalized);
    ZoneLookup { zone, is_inherited }
}

pub async fn set_folder_zone(
    pool: &SqlitePool,
    source_id: Uuid,
    folder_path: &str,
    zone: Zone,
) -> Result<()> {
    store::set_folder_zone(pool, source_id, folder_path, zone).await
}
