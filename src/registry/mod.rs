use crate::prayer::{CoordinateError, Coordinates};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

/// Persisted/registered state of one chat group.
///
/// The entity id is the map key, both in the registry and in the
/// persisted document.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GroupRecord {
    pub coordinates: Coordinates,
    pub enabled: bool,
}

/// Registry of known chat groups.
///
/// Entities are created lazily on first observed activity and never
/// deleted; disabling stops scheduling but preserves fire records.
/// Backed by a concurrent map so the external message-ingestion hook can
/// register groups while a tick is in flight.
pub struct GroupRegistry {
    groups: DashMap<String, GroupRecord>,
    default_coordinates: Coordinates,
}

impl GroupRegistry {
    /// Create an empty registry. Newly registered groups start at the
    /// default coordinates, enabled.
    pub fn new(default_coordinates: Coordinates) -> Self {
        Self {
            groups: DashMap::new(),
            default_coordinates,
        }
    }

    /// Register an entity if absent. Idempotent; existing configuration
    /// is never overwritten.
    pub fn ensure_registered(&self, entity_id: &str) {
        let mut inserted = false;
        self.groups
            .entry(entity_id.to_string())
            .or_insert_with(|| {
                inserted = true;
                GroupRecord {
                    coordinates: self.default_coordinates,
                    enabled: true,
                }
            });
        if inserted {
            info!(entity_id = %entity_id, "Registered new group");
        }
    }

    /// Set an entity's coordinates, registering it if needed.
    ///
    /// Out-of-range values are rejected here and never reach the
    /// calculator.
    pub fn set_coordinates(&self, entity_id: &str, lat: f64, lon: f64) -> Result<(), CoordinateError> {
        let coordinates = Coordinates::new(lat, lon)?;
        self.ensure_registered(entity_id);
        if let Some(mut record) = self.groups.get_mut(entity_id) {
            record.coordinates = coordinates;
        }
        Ok(())
    }

    /// Enable or disable scheduling for an entity, registering it if needed.
    pub fn set_enabled(&self, entity_id: &str, enabled: bool) {
        self.ensure_registered(entity_id);
        if let Some(mut record) = self.groups.get_mut(entity_id) {
            record.enabled = enabled;
        }
        info!(entity_id = %entity_id, enabled = enabled, "Group scheduling toggled");
    }

    /// Look up one entity.
    pub fn get(&self, entity_id: &str) -> Option<GroupRecord> {
        self.groups.get(entity_id).map(|r| *r.value())
    }

    /// Sorted snapshot of all entities. The tick loop iterates this, so
    /// per-tick processing order is fixed.
    pub fn snapshot(&self) -> BTreeMap<String, GroupRecord> {
        self.groups
            .iter()
            .map(|r| (r.key().clone(), *r.value()))
            .collect()
    }

    /// Populate from a persisted document. Existing entries are replaced.
    pub fn load_from(&self, entities: BTreeMap<String, GroupRecord>) {
        for (id, record) in entities {
            self.groups.insert(id, record);
        }
        info!(groups = self.groups.len(), "Loaded group registry");
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
