//! Adjacency index: link -> targets and target -> referencing links

use hyperload_core::{KvCollection, Result};
use hyperload_storage::RecordWriter;

use super::{BuildContext, IndexBuilder};

/// Writes `outgoing_set` (`link,target`) and `incoming_set` (`target,link`).
///
/// Both files receive exactly one record per (link, target) pair, so their
/// record counts are equal to each other and to the sum of all arities.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConnectivityBuilder;

const OUTPUTS: &[KvCollection] = &[KvCollection::OutgoingSet, KvCollection::IncomingSet];

impl IndexBuilder for ConnectivityBuilder {
    fn name(&self) -> &'static str {
        "connectivity"
    }

    fn outputs(&self) -> &'static [KvCollection] {
        OUTPUTS
    }

    fn write(&self, ctx: &BuildContext<'_>) -> Result<Vec<(KvCollection, RecordWriter)>> {
        let mut outgoing = ctx.writer(KvCollection::OutgoingSet)?;
        let mut incoming = ctx.writer(KvCollection::IncomingSet)?;
        for link in ctx.links {
            for target in &link.elements {
                outgoing.write_record(&[link.hash_code.as_str()], &[target.as_str()])?;
                incoming.write_record(&[target.as_str()], &[link.hash_code.as_str()])?;
            }
        }
        Ok(vec![
            (KvCollection::OutgoingSet, outgoing),
            (KvCollection::IncomingSet, incoming),
        ])
    }
}
