//! Read-only view over one module's metadata.
//!
//! [`MetadataView`] locates the streams of a metadata range handed over by the debuggee and
//! exposes the rows the evaluator needs. The range is borrowed, so the view is cheap to build
//! and never copies the debuggee's bytes.

use crate::{
    metadata::{
        identity::AssemblyIdentity,
        root::Root,
        streams::{
            AssemblyRefRow, AssemblyRow, Blob, Guid, Heaps, ModuleRow, Strings, TablesHeader,
        },
    },
    Error, Result,
};

/// Module identity fields of the `Module` row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleHeader {
    /// Module version id
    pub mvid: uguid::Guid,
    /// Edit-and-continue generation id, nil for the initial generation
    pub generation_id: uguid::Guid,
    /// Module file name
    pub name: String,
}

/// The assembly a module defines and the assemblies it references.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssemblyInfo {
    /// Identity from the `Assembly` row, `None` for netmodules
    pub identity: Option<AssemblyIdentity>,
    /// Identities from the `AssemblyRef` rows, in table order
    pub references: Vec<AssemblyIdentity>,
}

/// Parsed streams of a metadata range.
pub struct MetadataView<'a> {
    data: &'a [u8],
    root: Root,
    tables: TablesHeader<'a>,
    heaps: Heaps<'a>,
}

impl<'a> MetadataView<'a> {
    /// Parse the metadata root and the streams of `data`.
    ///
    /// # Errors
    /// Returns an error if the root is malformed or the tables, `#Strings` or `#GUID` streams
    /// are missing or malformed.
    pub fn read(data: &'a [u8]) -> Result<MetadataView<'a>> {
        if data.is_empty() {
            return Err(Error::Empty);
        }

        let root = Root::read(data)?;

        let mut tables = None;
        let mut strings = None;
        let mut guids = None;
        let mut blobs = None;
        for stream in &root.stream_headers {
            let start = stream.offset as usize;
            let stream_data = data
                .get(start..start + stream.size as usize)
                .ok_or(Error::OutOfBounds)?;

            match stream.name.as_str() {
                "#~" | "#-" => tables = Some(TablesHeader::from(stream_data)?),
                "#Strings" => strings = Some(Strings::from(stream_data)?),
                "#GUID" => guids = Some(Guid::from(stream_data)?),
                "#Blob" => blobs = Some(Blob::from(stream_data)?),
                _ => {}
            }
        }

        let (Some(tables), Some(strings), Some(guids)) = (tables, strings, guids) else {
            return Err(malformed_error!("Metadata lacks tables, #Strings or #GUID"));
        };

        Ok(MetadataView {
            data,
            root,
            tables,
            heaps: Heaps {
                strings,
                guids,
                blobs,
            },
        })
    }

    /// The complete metadata range
    #[must_use]
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// The metadata root
    #[must_use]
    pub fn root(&self) -> &Root {
        &self.root
    }

    /// The tables stream
    #[must_use]
    pub fn tables(&self) -> &TablesHeader<'a> {
        &self.tables
    }

    /// Identity fields of the module.
    ///
    /// # Errors
    /// Returns an error if the `Module` row is missing or does not resolve.
    pub fn module_header(&self) -> Result<ModuleHeader> {
        let module = ModuleRow::read(&self.tables, &self.heaps)?;
        Ok(ModuleHeader {
            mvid: module.mvid,
            generation_id: module.enc_id,
            name: module.name.to_string(),
        })
    }

    /// The defined assembly and its references.
    ///
    /// # Errors
    /// Returns an error if the assembly tables do not resolve.
    pub fn assembly_info(&self) -> Result<AssemblyInfo> {
        let identity = AssemblyRow::read(&self.tables, &self.heaps)?
            .as_ref()
            .map(AssemblyIdentity::from_assembly_row);
        let references = AssemblyRefRow::read_all(&self.tables, &self.heaps)?
            .iter()
            .map(AssemblyIdentity::from_assembly_ref_row)
            .collect();

        Ok(AssemblyInfo {
            identity,
            references,
        })
    }
}
