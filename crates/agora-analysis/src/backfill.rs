//! Enthymeme backfill: surface reconstructed missing premises as replies
//! in the thread they were extracted from.
//!
//! Replies are authored by the designated system account. A premise
//! extracted from a post becomes a root-level reply (fresh path, depth
//! 0); one extracted from a reply nests under that reply, inheriting its
//! path and bumping its reply count through the usual insert trigger.

use agora_db::{ContentStore, GraphStore, PostgresPool, RunRow};
use agora_types::{TargetKind, UserId};

use crate::error::AnalysisError;

/// Insert reconstructed replies for every unbackfilled enthymeme of one
/// run and link them back. Returns the number of replies inserted.
///
/// # Errors
///
/// Returns [`AnalysisError`] if the source content cannot be resolved or
/// an insert fails.
pub async fn backfill_enthymemes(
    pool: &PostgresPool,
    system_user: &UserId,
    run: &RunRow,
) -> Result<usize, AnalysisError> {
    let graphs = GraphStore::new(pool.pool());
    let content = ContentStore::new(pool.pool());

    let enthymemes = graphs.unbackfilled_enthymemes(run.id).await?;
    if enthymemes.is_empty() {
        return Ok(0);
    }

    let (post_id, parent_reply_id) = match TargetKind::parse(&run.source_type) {
        Some(TargetKind::Post) => (run.source_id, None),
        Some(TargetKind::Reply) => {
            let reply = content.get_reply(run.source_id).await?;
            (reply.post_id, Some(run.source_id))
        }
        None => return Ok(0),
    };

    let mut inserted = 0_usize;
    for enthymeme in &enthymemes {
        let reply = content
            .create_reply(
                system_user,
                post_id,
                parent_reply_id,
                &enthymeme.content,
                None,
            )
            .await?;
        graphs
            .link_reconstructed_reply(enthymeme.id, reply.id)
            .await?;
        inserted = inserted.saturating_add(1);
    }
    Ok(inserted)
}
