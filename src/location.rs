use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// A named geographic coordinate as produced by the geocoding side.
///
/// The `id` is synthesized once as `"<lat>,<lon>"` when the candidate is
/// created and is treated as an opaque, stable identity key from then on.
/// Equality and hashing go through `id` alone, so a stale `name` for the
/// same coordinate still refers to the same entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    pub id: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    /// Build a location from raw coordinates, deriving the identity key.
    pub fn from_coordinates(name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            id: format!("{latitude},{longitude}"),
            name: name.into(),
            latitude,
            longitude,
        }
    }
}

impl PartialEq for Location {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Location {}

impl Hash for Location {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
