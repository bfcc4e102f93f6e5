//! Type-template index: links by exact type signature and by named type

use hyperload_core::{KvCollection, Result};
use hyperload_storage::RecordWriter;

use super::{BuildContext, IndexBuilder};

/// Writes the `templates` file.
///
/// Every link is recorded under its `composite_type_hash` (exact signature,
/// target types included) and under its `named_type_hash` (any targets).
/// When both hashes coincide the link is recorded once.
#[derive(Debug, Clone, Copy, Default)]
pub struct TypeTemplateBuilder;

const OUTPUTS: &[KvCollection] = &[KvCollection::Templates];

impl IndexBuilder for TypeTemplateBuilder {
    fn name(&self) -> &'static str {
        "type_template"
    }

    fn outputs(&self) -> &'static [KvCollection] {
        OUTPUTS
    }

    fn write(&self, ctx: &BuildContext<'_>) -> Result<Vec<(KvCollection, RecordWriter)>> {
        let mut templates = ctx.writer(KvCollection::Templates)?;
        for link in ctx.links {
            let value = link.handle_with_targets();
            templates.write_record(&[link.composite_type_hash.as_str()], &value)?;
            if link.named_type_hash != link.composite_type_hash {
                templates.write_record(&[link.named_type_hash.as_str()], &value)?;
            }
        }
        Ok(vec![(KvCollection::Templates, templates)])
    }
}
