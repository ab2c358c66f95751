//! Ordered sets of metadata blocks for one debug scope.
//!
//! A [`MetadataSnapshot`] is what a compile attempt sees: every readable module of the scope in
//! load order, followed by the synthetic intrinsics block. Snapshots are rebuilt for every
//! compile request; rebuilding is cheap because unchanged ranges reuse the previous snapshot's
//! blocks instead of reparsing their headers.

use std::collections::HashSet;

use tracing::debug;

use crate::{
    metadata::{block::MetadataBlock, identity::AssemblyIdentity},
    Error, Result,
};

/// Blocks of a debug scope, with the intrinsics block always last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataSnapshot<'a> {
    blocks: Vec<MetadataBlock<'a>>,
}

impl<'a> MetadataSnapshot<'a> {
    /// Build the snapshot for the current module list.
    ///
    /// `modules` yields the metadata range of each loaded module, or the error the debuggee
    /// reported while reading it. A module that fails to read or parse is skipped. When
    /// `previous` holds a block for the same range at the same position, that block is reused
    /// as-is; the position only counts blocks actually added.
    ///
    /// # Arguments
    /// * `modules`     - Module ranges in load order
    /// * `intrinsics`  - The synthetic intrinsics module
    /// * `previous`    - The snapshot of the last request for this scope, if any
    ///
    /// # Errors
    /// Returns [`Error::Unreachable`] if the intrinsics block cannot be read.
    pub fn build<I>(
        modules: I,
        intrinsics: &'a [u8],
        previous: Option<&MetadataSnapshot<'a>>,
    ) -> Result<MetadataSnapshot<'a>>
    where
        I: IntoIterator<Item = Result<&'a [u8]>>,
    {
        let mut blocks = Vec::new();
        let mut reused = 0usize;

        for module in modules {
            let bytes = match module {
                Ok(bytes) => bytes,
                Err(error) => {
                    debug!(%error, "skipping module without readable metadata");
                    continue;
                }
            };

            if let Some(block) = Self::reusable(previous, blocks.len(), bytes) {
                reused += 1;
                blocks.push(block);
                continue;
            }

            match MetadataBlock::read(bytes) {
                Ok(block) => blocks.push(block),
                Err(error) => debug!(%error, size = bytes.len(), "skipping unparseable module"),
            }
        }

        let intrinsics = match Self::reusable(previous, blocks.len(), intrinsics) {
            Some(block) => block,
            None => MetadataBlock::read(intrinsics).map_err(|error| {
                Error::Unreachable(format!("intrinsic metadata is unreadable - {error}"))
            })?,
        };
        blocks.push(intrinsics);

        debug!(blocks = blocks.len(), reused, "built metadata snapshot");
        Ok(MetadataSnapshot { blocks })
    }

    fn reusable(
        previous: Option<&MetadataSnapshot<'a>>,
        index: usize,
        bytes: &'a [u8],
    ) -> Option<MetadataBlock<'a>> {
        previous?
            .blocks
            .get(index)
            .filter(|block| block.same_region(bytes))
            .cloned()
    }

    /// All blocks, intrinsics last
    #[must_use]
    pub fn blocks(&self) -> &[MetadataBlock<'a>] {
        &self.blocks
    }

    /// Module blocks, without the intrinsics block
    #[must_use]
    pub fn module_blocks(&self) -> &[MetadataBlock<'a>] {
        &self.blocks[..self.blocks.len().saturating_sub(1)]
    }

    /// The intrinsics block
    #[must_use]
    pub fn intrinsics(&self) -> Option<&MetadataBlock<'a>> {
        self.blocks.last()
    }

    /// Number of blocks, intrinsics included
    #[must_use]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// True if the snapshot holds no blocks at all
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Exact, order-sensitive, elementwise equality with `other`
    #[must_use]
    pub fn matches(&self, other: &MetadataSnapshot<'a>) -> bool {
        self == other
    }

    /// The module block with the given module version id
    #[must_use]
    pub fn find_module(&self, mvid: uguid::Guid) -> Option<&MetadataBlock<'a>> {
        self.module_blocks()
            .iter()
            .find(|block| block.module_version_id() == mvid)
    }

    /// A new snapshot with `additional` merged in before the intrinsics block.
    ///
    /// Blocks for a module generation that is already present are dropped.
    #[must_use]
    pub fn with_additional<I>(&self, additional: I) -> MetadataSnapshot<'a>
    where
        I: IntoIterator<Item = MetadataBlock<'a>>,
    {
        let module_key = |block: &MetadataBlock<'a>| (block.module_id().clone(), block.generation_id());

        let mut seen: HashSet<_> = self.blocks.iter().map(module_key).collect();
        let mut blocks = self.module_blocks().to_vec();
        for block in additional {
            if seen.insert(module_key(&block)) {
                blocks.push(block);
            } else {
                debug!(module = block.name(), "dropping duplicate metadata block");
            }
        }
        blocks.extend(self.intrinsics().cloned());

        MetadataSnapshot { blocks }
    }
}

/// Fetch and read metadata for assemblies the compiler reported missing.
///
/// Identities whose fetch fails, or that yield an empty or unparseable range, are skipped.
pub fn blocks_for_missing<'a, F>(
    identities: &[AssemblyIdentity],
    mut fetch: F,
) -> Vec<MetadataBlock<'a>>
where
    F: FnMut(&AssemblyIdentity) -> Result<&'a [u8]>,
{
    let mut blocks = Vec::new();
    for identity in identities {
        let bytes = match fetch(identity) {
            Ok(bytes) if !bytes.is_empty() => bytes,
            Ok(_) => {
                debug!(assembly = %identity, "debuggee returned empty metadata");
                continue;
            }
            Err(error) => {
                debug!(assembly = %identity, %error, "metadata unavailable");
                continue;
            }
        };

        match MetadataBlock::read(bytes) {
            Ok(block) => blocks.push(block),
            Err(error) => debug!(assembly = %identity, %error, "fetched metadata is corrupt"),
        }
    }

    blocks
}
