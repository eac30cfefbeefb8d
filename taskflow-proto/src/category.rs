//! Category record types for `TaskFlow`.
//!
//! Categories label tasks but carry no ordering or locking semantics of their
//! own. Their lifecycle is independent from tasks: deleting a category leaves
//! referencing tasks untouched (the reference dangles and is rendered as
//! uncategorized).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum allowed category name length in characters.
pub const MAX_CATEGORY_NAME_LENGTH: usize = 64;

/// The fixed color swatch offered by the category picker.
///
/// Free-form hex colors are also accepted; this list is only the default
/// palette.
pub const COLOR_SWATCH: [&str; 10] = [
    "#20c997", // teal
    "#0d6efd", // blue
    "#6f42c1", // purple
    "#d63384", // pink
    "#dc3545", // red
    "#fd7e14", // orange
    "#ffc107", // yellow
    "#198754", // green
    "#0dcaf0", // cyan
    "#6c757d", // gray
];

/// Unique identifier for a category, based on UUID v7 for time-ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CategoryId(Uuid);

impl CategoryId {
    /// Creates a new time-ordered category identifier (UUID v7).
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Creates a `CategoryId` from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner UUID value.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for CategoryId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CategoryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A persisted task category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRecord {
    /// Unique category identifier (UUID v7, time-ordered).
    pub id: CategoryId,
    /// Owner of this category.
    pub user_id: String,
    /// Display name, non-empty.
    pub name: String,
    /// Display color as a hex string, usually from [`COLOR_SWATCH`].
    pub color: String,
    /// Creation time, milliseconds since epoch.
    pub created_at: u64,
    /// Last mutation time, milliseconds since epoch.
    pub updated_at: u64,
}

/// A partial update to a category record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryPatch {
    /// New display name.
    pub name: Option<String>,
    /// New display color.
    pub color: Option<String>,
}

impl CategoryPatch {
    /// Returns `true` if this patch changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none() && self.color.is_none()
    }

    /// Applies this patch to a record in place, bumping `updated_at`.
    pub fn apply_to(&self, record: &mut CategoryRecord, now_ms: u64) {
        if let Some(ref name) = self.name {
            record.name = name.clone();
        }
        if let Some(ref color) = self.color {
            record.color = color.clone();
        }
        record.updated_at = now_ms;
    }
}
