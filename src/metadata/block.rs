//! Identity-tagged views onto module metadata living in the debuggee.
//!
//! A [`MetadataBlock`] pairs a borrowed metadata range with the identity read from its header.
//! Blocks compare by *where* the bytes are, not by what they contain: two blocks are the same
//! only if they view the same range of the same module generation. That is what lets the
//! snapshot builder and the context cache reuse work across evaluations without rereading
//! memory.

use std::{fmt, ptr, sync::Arc};

use crate::{
    metadata::view::{AssemblyInfo, MetadataView},
    Result,
};

/// Identity of a loaded module
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModuleId {
    /// Module version id
    pub mvid: uguid::Guid,
    /// Module file name
    pub name: Arc<str>,
}

/// A non-owning handle onto one module's metadata.
///
/// # Examples
///
/// ```rust,ignore
/// use evalscope::metadata::block::MetadataBlock;
///
/// let block = MetadataBlock::read(bytes)?;
/// println!("{} {}", block.name(), block.module_version_id());
/// ```
#[derive(Clone)]
pub struct MetadataBlock<'a> {
    module_id: ModuleId,
    generation_id: uguid::Guid,
    bytes: &'a [u8],
}

impl<'a> MetadataBlock<'a> {
    /// Read the module header of `bytes` and wrap them in a block.
    ///
    /// # Errors
    /// Returns an error if the bytes are empty or not a parseable metadata image.
    pub fn read(bytes: &'a [u8]) -> Result<MetadataBlock<'a>> {
        let header = MetadataView::read(bytes)?.module_header()?;

        Ok(MetadataBlock {
            module_id: ModuleId {
                mvid: header.mvid,
                name: Arc::from(header.name),
            },
            generation_id: header.generation_id,
            bytes,
        })
    }

    /// Start address of the viewed range
    #[must_use]
    pub fn pointer(&self) -> *const u8 {
        self.bytes.as_ptr()
    }

    /// Length of the viewed range
    #[must_use]
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// The viewed bytes
    #[must_use]
    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Module identity
    #[must_use]
    pub fn module_id(&self) -> &ModuleId {
        &self.module_id
    }

    /// Module version id
    #[must_use]
    pub fn module_version_id(&self) -> uguid::Guid {
        self.module_id.mvid
    }

    /// Edit-and-continue generation id
    #[must_use]
    pub fn generation_id(&self) -> uguid::Guid {
        self.generation_id
    }

    /// Module file name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.module_id.name
    }

    /// True if `bytes` is exactly the range this block views
    #[must_use]
    pub fn same_region(&self, bytes: &[u8]) -> bool {
        ptr::eq(self.bytes.as_ptr(), bytes.as_ptr()) && self.bytes.len() == bytes.len()
    }

    /// Assembly identity and references of this module.
    ///
    /// # Errors
    /// Returns an error if the assembly tables are corrupt.
    pub fn assembly_info(&self) -> Result<AssemblyInfo> {
        MetadataView::read(self.bytes)?.assembly_info()
    }
}

impl PartialEq for MetadataBlock<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.same_region(other.bytes)
            && self.module_id == other.module_id
            && self.generation_id == other.generation_id
    }
}

impl Eq for MetadataBlock<'_> {}

impl fmt::Debug for MetadataBlock<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetadataBlock")
            .field("name", &self.module_id.name)
            .field("mvid", &self.module_id.mvid)
            .field("generation_id", &self.generation_id)
            .field("pointer", &self.bytes.as_ptr())
            .field("size", &self.bytes.len())
            .finish()
    }
}
