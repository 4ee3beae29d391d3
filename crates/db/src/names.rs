//! Display names for dimension references.

use std::collections::HashMap;

use mediaplan_core::hierarchy::HierarchyLevel;
use mediaplan_core::types::DbId;
use sqlx::PgPool;

use crate::repositories::DimensionRepo;

/// Snapshot of the three dimension libraries, used as the Tree Builder's
/// name resolver.
#[derive(Debug, Clone, Default)]
pub struct NameDirectory {
    subdivisions: HashMap<DbId, String>,
    moments: HashMap<DbId, String>,
    funnel_stages: HashMap<DbId, String>,
}

impl NameDirectory {
    /// Load the libraries needed by `levels`. Levels not listed resolve to
    /// the fallback name.
    pub async fn load(pool: &PgPool, levels: &[HierarchyLevel]) -> Result<Self, sqlx::Error> {
        let mut directory = Self::default();
        for &level in levels {
            let names = DimensionRepo::names_for(pool, level).await?;
            *directory.slot_mut(level) = names;
        }
        Ok(directory)
    }

    pub fn insert(&mut self, level: HierarchyLevel, id: DbId, name: impl Into<String>) {
        self.slot_mut(level).insert(id, name.into());
    }

    /// Name of a reference, or `"<level> #<id>"` when the entry is gone.
    pub fn resolve(&self, level: HierarchyLevel, id: DbId) -> String {
        let names = match level {
            HierarchyLevel::Subdivision => &self.subdivisions,
            HierarchyLevel::Moment => &self.moments,
            HierarchyLevel::FunnelStage => &self.funnel_stages,
        };
        names
            .get(&id)
            .cloned()
            .unwrap_or_else(|| format!("{} #{id}", level.label()))
    }

    fn slot_mut(&mut self, level: HierarchyLevel) -> &mut HashMap<DbId, String> {
        match level {
            HierarchyLevel::Subdivision => &mut self.subdivisions,
            HierarchyLevel::Moment => &mut self.moments,
            HierarchyLevel::FunnelStage => &mut self.funnel_stages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_known_and_missing_names() {
        let mut names = NameDirectory::default();
        names.insert(HierarchyLevel::Moment, 3, "Lançamento");
        assert_eq!(names.resolve(HierarchyLevel::Moment, 3), "Lançamento");
        assert_eq!(names.resolve(HierarchyLevel::Moment, 4), "momento #4");
        assert_eq!(names.resolve(HierarchyLevel::Subdivision, 3), "subdivisão #3");
    }
}
