//! Tag resolution and orphan reaping for the product command path.

use common::TagId;
use store::TagRepository;

use crate::error::DomainError;

/// Maps tag names to ids, creating tags that do not exist yet.
///
/// The returned ids follow the order of `names`.
pub(crate) async fn resolve_tag_ids<T: TagRepository>(
    tx: &mut T,
    names: &[String],
) -> Result<Vec<TagId>, DomainError> {
    let existing = tx.find_tags_by_names(names).await?;

    let mut ids = Vec::with_capacity(names.len());
    for name in names {
        match existing.iter().find(|tag| &tag.name == name) {
            Some(tag) => ids.push(tag.id),
            None => {
                let tag = tx.create_tag(name).await?;
                tracing::debug!(tag_id = %tag.id, name = %tag.name, "created tag");
                ids.push(tag.id);
            }
        }
    }
    Ok(ids)
}

/// Deletes tags no product refers to any more.
pub(crate) async fn reap_orphan_tags<T: TagRepository>(
    tx: &mut T,
) -> Result<Vec<TagId>, DomainError> {
    let reaped = tx.delete_orphan_tags().await?;
    if !reaped.is_empty() {
        metrics::counter!("product_tags_reaped_total").increment(reaped.len() as u64);
        tracing::info!(count = reaped.len(), "reaped orphan tags");
    }
    Ok(reaped)
}
