//! Category collection for one user.
//!
//! Categories are flat labels with a display color. Unlike tasks they carry
//! no ordering or lock state, so mutations here skip the pending-command
//! bookkeeping: each call applies immediately and returns the [`WritePlan`]
//! to submit. A failed category write is recovered by the next pushed
//! snapshot rather than replayed.

use taskflow_proto::category::{
    COLOR_SWATCH, CategoryId, CategoryPatch, CategoryRecord, MAX_CATEGORY_NAME_LENGTH,
};

use super::CategoryError;
use super::manager::WritePlan;

/// In-memory category list for one user.
pub struct CategorySet {
    user_id: String,
    categories: Vec<CategoryRecord>,
}

impl CategorySet {
    /// Creates an empty set for the given user.
    #[must_use]
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            categories: Vec::new(),
        }
    }

    /// Current categories in creation order.
    #[must_use]
    pub fn categories(&self) -> &[CategoryRecord] {
        &self.categories
    }

    /// Looks up a category by id.
    #[must_use]
    pub fn category(&self, id: CategoryId) -> Option<&CategoryRecord> {
        self.categories.iter().find(|c| c.id == id)
    }

    /// Display color for a task's category reference, if it resolves.
    ///
    /// Dangling references (category deleted) resolve to `None` and render
    /// as uncategorized.
    #[must_use]
    pub fn color_of(&self, id: Option<CategoryId>) -> Option<&str> {
        id.and_then(|id| self.category(id)).map(|c| c.color.as_str())
    }

    /// Creates a category. Without an explicit color the next swatch entry
    /// is picked by rotation.
    ///
    /// # Errors
    ///
    /// Fails when the trimmed name is empty or too long.
    pub fn create(
        &mut self,
        name: &str,
        color: Option<&str>,
    ) -> Result<(CategoryId, WritePlan), CategoryError> {
        let name = validate_name(name)?;
        let color = color.map_or_else(
            || COLOR_SWATCH[self.categories.len() % COLOR_SWATCH.len()].to_string(),
            ToString::to_string,
        );
        let now = now_ms();
        let record = CategoryRecord {
            id: CategoryId::new(),
            user_id: self.user_id.clone(),
            name,
            color,
            created_at: now,
            updated_at: now,
        };
        let id = record.id;
        self.categories.push(record.clone());
        Ok((id, WritePlan::CreateCategory(record)))
    }

    /// Renames a category.
    ///
    /// # Errors
    ///
    /// Fails when the category does not exist or the name is invalid.
    pub fn rename(&mut self, id: CategoryId, name: &str) -> Result<WritePlan, CategoryError> {
        let name = validate_name(name)?;
        let record = self.record_mut(id)?;
        record.name.clone_from(&name);
        record.updated_at = now_ms();
        Ok(WritePlan::UpdateCategory(
            id,
            CategoryPatch {
                name: Some(name),
                ..CategoryPatch::default()
            },
        ))
    }

    /// Changes a category's display color.
    ///
    /// # Errors
    ///
    /// Fails when the category does not exist.
    pub fn recolor(&mut self, id: CategoryId, color: &str) -> Result<WritePlan, CategoryError> {
        let record = self.record_mut(id)?;
        record.color = color.to_string();
        record.updated_at = now_ms();
        Ok(WritePlan::UpdateCategory(
            id,
            CategoryPatch {
                color: Some(color.to_string()),
                ..CategoryPatch::default()
            },
        ))
    }

    /// Deletes a category. Tasks referencing it are left alone; their
    /// references dangle.
    ///
    /// # Errors
    ///
    /// Fails when the category does not exist.
    pub fn delete(&mut self, id: CategoryId) -> Result<WritePlan, CategoryError> {
        let pos = self
            .categories
            .iter()
            .position(|c| c.id == id)
            .ok_or(CategoryError::CategoryNotFound(id))?;
        self.categories.remove(pos);
        Ok(WritePlan::DeleteCategory(id))
    }

    /// Replaces local state with a full snapshot pushed by the store.
    pub fn apply_snapshot(&mut self, mut records: Vec<CategoryRecord>) {
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        self.categories = records;
    }

    fn record_mut(&mut self, id: CategoryId) -> Result<&mut CategoryRecord, CategoryError> {
        self.categories
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(CategoryError::CategoryNotFound(id))
    }
}

fn validate_name(name: &str) -> Result<String, CategoryError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(CategoryError::EmptyName);
    }
    if trimmed.chars().count() > MAX_CATEGORY_NAME_LENGTH {
        return Err(CategoryError::NameTooLong(MAX_CATEGORY_NAME_LENGTH));
    }
    Ok(trimmed.to_string())
}

fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}
