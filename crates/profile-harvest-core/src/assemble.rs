//! Composite document assembly for one batch of users.
//!
//! For every registered entity type the assembler runs
//! extract → denormalize → group, then emits one [`UserDocument`] per
//! input identifier carrying every entity type, empty lists included.
//! If any entity type fails, the batch fails as a whole and nothing is
//! returned for it.

use tracing::debug;

use crate::denormalize::denormalize;
use crate::entity::EntitySpec;
use crate::error::PipelineResult;
use crate::extract::extract;
use crate::group::{group, Grouping};
use crate::lookup::LookupResolver;
use crate::models::{UserDocument, UserId, USER_ID_COLUMN};
use crate::source::{LookupSource, PrimarySource};

/// Drives every entity type in a registry against a pair of sources.
pub struct Assembler<'a, P: PrimarySource + ?Sized, L: LookupSource + ?Sized> {
    primary: &'a P,
    resolver: LookupResolver<'a, L>,
    registry: &'a [EntitySpec],
}

impl<'a, P: PrimarySource + ?Sized, L: LookupSource + ?Sized> Assembler<'a, P, L> {
    pub fn new(primary: &'a P, resolver: LookupResolver<'a, L>, registry: &'a [EntitySpec]) -> Self {
        Self {
            primary,
            resolver,
            registry,
        }
    }

    /// Build one document per identifier, in input order.
    ///
    /// The output always has exactly `user_ids.len()` documents. An empty
    /// batch returns an empty list without issuing any query.
    pub async fn assemble(&mut self, user_ids: &[UserId]) -> PipelineResult<Vec<UserDocument>> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut groupings: Vec<(&'static str, Grouping)> = Vec::with_capacity(self.registry.len());
        for entity in self.registry {
            let rows = extract(self.primary, entity, user_ids).await?;
            let records = denormalize(&mut self.resolver, entity, rows).await?;
            let grouping = group(entity.name, records, USER_ID_COLUMN)?;
            debug!(entity = entity.name, users = grouping.len(), "grouped records");
            groupings.push((entity.name, grouping));
        }

        let documents = user_ids
            .iter()
            .map(|user_id| UserDocument {
                user_id: *user_id,
                entities: groupings
                    .iter()
                    .map(|(name, grouping)| (*name, grouping.get(user_id).cloned().unwrap_or_default()))
                    .collect(),
            })
            .collect();
        Ok(documents)
    }
}
