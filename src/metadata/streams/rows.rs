//! Typed rows of the tables the evaluator needs: `Module`, `Assembly` and `AssemblyRef`.
//!
//! Each row borrows its strings and blobs from the heaps of the block it was read from.

use bitflags::bitflags;

use crate::{
    metadata::streams::{Blob, Guid, Strings, TableId, TablesHeader},
    Result,
};

bitflags! {
    /// `AssemblyFlags`, §II.23.1.2
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct AssemblyFlags: u32 {
        /// The blob holds the full public key, not its token
        const PUBLIC_KEY = 0x0001;
        /// The implementation may bind to a different assembly at runtime
        const RETARGETABLE = 0x0100;
        /// Windows Runtime content type
        const WINDOWS_RUNTIME = 0x0200;
        /// JIT optimizer is disabled
        const DISABLE_JIT_COMPILE_OPTIMIZER = 0x4000;
        /// JIT tracking is enabled
        const ENABLE_JIT_COMPILE_TRACKING = 0x8000;
    }
}

/// Heaps needed to resolve the indexes of a row
pub struct Heaps<'a> {
    /// `#Strings`
    pub strings: Strings<'a>,
    /// `#GUID`
    pub guids: Guid<'a>,
    /// `#Blob`, absent in metadata without any blobs
    pub blobs: Option<Blob<'a>>,
}

impl<'a> Heaps<'a> {
    fn blob(&self, index: u32) -> Result<&'a [u8]> {
        match (&self.blobs, index) {
            (_, 0) | (None, _) => Ok(&[]),
            (Some(blobs), index) => blobs.get(index as usize),
        }
    }

    fn optional_str(&self, index: u32) -> Result<Option<&'a str>> {
        let value = self.strings.get(index as usize)?;
        Ok((!value.is_empty()).then_some(value))
    }
}

/// The single row of the `Module` table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleRow<'a> {
    /// Reserved, shall be zero
    pub generation: u16,
    /// Module file name
    pub name: &'a str,
    /// Module version id, unique per build
    pub mvid: uguid::Guid,
    /// Edit-and-continue generation id, nil for the initial generation
    pub enc_id: uguid::Guid,
    /// Edit-and-continue base generation id
    pub enc_base_id: uguid::Guid,
}

impl<'a> ModuleRow<'a> {
    /// Read the first `Module` row.
    ///
    /// # Errors
    /// Returns an error if the table is missing or its indexes do not resolve.
    pub fn read(tables: &TablesHeader<'a>, heaps: &Heaps<'a>) -> Result<ModuleRow<'a>> {
        let row = tables.read_row(TableId::Module, 1)?;

        Ok(ModuleRow {
            generation: row[0] as u16,
            name: heaps.strings.get(row[1] as usize)?,
            mvid: heaps.guids.get(row[2] as usize)?,
            enc_id: heaps.guids.get(row[3] as usize)?,
            enc_base_id: heaps.guids.get(row[4] as usize)?,
        })
    }
}

/// The single row of the `Assembly` table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblyRow<'a> {
    /// `AssemblyHashAlgorithm`
    pub hash_alg_id: u32,
    /// Major, minor, build, revision
    pub version: [u16; 4],
    /// Assembly flags
    pub flags: AssemblyFlags,
    /// Full public key, empty for weakly named assemblies
    pub public_key: &'a [u8],
    /// Simple name
    pub name: &'a str,
    /// Culture, `None` for neutral
    pub culture: Option<&'a str>,
}

impl<'a> AssemblyRow<'a> {
    /// Read the `Assembly` row, if the metadata defines an assembly.
    ///
    /// Netmodules carry no `Assembly` row and yield `Ok(None)`.
    ///
    /// # Errors
    /// Returns an error if the row's indexes do not resolve.
    pub fn read(tables: &TablesHeader<'a>, heaps: &Heaps<'a>) -> Result<Option<AssemblyRow<'a>>> {
        if !tables.has_table(TableId::Assembly) {
            return Ok(None);
        }

        let row = tables.read_row(TableId::Assembly, 1)?;
        Ok(Some(AssemblyRow {
            hash_alg_id: row[0],
            version: [row[1] as u16, row[2] as u16, row[3] as u16, row[4] as u16],
            flags: AssemblyFlags::from_bits_retain(row[5]),
            public_key: heaps.blob(row[6])?,
            name: heaps.strings.get(row[7] as usize)?,
            culture: heaps.optional_str(row[8])?,
        }))
    }
}

/// A row of the `AssemblyRef` table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblyRefRow<'a> {
    /// Major, minor, build, revision
    pub version: [u16; 4],
    /// Assembly flags; `PUBLIC_KEY` tells whether the blob is a key or a token
    pub flags: AssemblyFlags,
    /// Public key or public key token
    pub public_key_or_token: &'a [u8],
    /// Simple name
    pub name: &'a str,
    /// Culture, `None` for neutral
    pub culture: Option<&'a str>,
    /// Hash of the referenced file, rarely present
    pub hash_value: &'a [u8],
}

impl<'a> AssemblyRefRow<'a> {
    /// Read all `AssemblyRef` rows in table order.
    ///
    /// # Errors
    /// Returns an error if any row's indexes do not resolve.
    pub fn read_all(tables: &TablesHeader<'a>, heaps: &Heaps<'a>) -> Result<Vec<AssemblyRefRow<'a>>> {
        (1..=tables.row_count(TableId::AssemblyRef))
            .map(|rid| {
                let row = tables.read_row(TableId::AssemblyRef, rid)?;
                Ok(AssemblyRefRow {
                    version: [row[0] as u16, row[1] as u16, row[2] as u16, row[3] as u16],
                    flags: AssemblyFlags::from_bits_retain(row[4]),
                    public_key_or_token: heaps.blob(row[5])?,
                    name: heaps.strings.get(row[6] as usize)?,
                    culture: heaps.optional_str(row[7])?,
                    hash_value: heaps.blob(row[8])?,
                })
            })
            .collect()
    }
}
