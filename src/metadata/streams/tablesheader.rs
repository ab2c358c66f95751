//! Header and row layout of the metadata tables stream (`#~` or `#-`).
//!
//! The tables stream is a dense array of fixed-size rows, one table after the other. Row sizes
//! are not stored anywhere: they follow from each table's column schema, the heap-size flags and
//! the row counts of every table a column may point into. [`TablesHeader`] computes that layout
//! once and then reads individual rows by table and 1-based row id.
//!
//! Only the module and assembly tables are ever decoded into typed rows (see
//! [`crate::metadata::streams::ModuleRow`] and friends), but every table up to `GenericParamConstraint` has to be
//! sized to find where they start.
//!
//! # Reference
//! - [ECMA-335 II.24.2.6](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf)
//! - [ECMA-335 II.22](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf)

use bitflags::bitflags;
use strum::{EnumCount, EnumIter, IntoEnumIterator};

use crate::{
    utils::{read_le_at, read_le_at_dyn},
    Error::OutOfBounds,
    Result,
};

bitflags! {
    /// `HeapSizes` byte of the tables header
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct HeapSizes: u8 {
        /// Indexes into `#Strings` are 4 bytes wide
        const LARGE_STRINGS = 0x01;
        /// Indexes into `#GUID` are 4 bytes wide
        const LARGE_GUID = 0x02;
        /// Indexes into `#Blob` are 4 bytes wide
        const LARGE_BLOB = 0x04;
        /// Emitted by EnC deltas; marks padding in the uncompressed stream
        const PADDING_BIT = 0x08;
        /// Delta stream, only meaningful in combination with EnC
        const DELTA_ONLY = 0x20;
        /// Four extra bytes follow the row counts
        const EXTRA_DATA = 0x40;
        /// May contain `_Deleted` tokens
        const HAS_DELETE = 0x80;
    }
}

/// Identifiers of the metadata tables, in stream order.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, EnumIter, EnumCount)]
#[repr(u8)]
#[allow(missing_docs)]
pub enum TableId {
    Module = 0x00,
    TypeRef = 0x01,
    TypeDef = 0x02,
    FieldPtr = 0x03,
    Field = 0x04,
    MethodPtr = 0x05,
    MethodDef = 0x06,
    ParamPtr = 0x07,
    Param = 0x08,
    InterfaceImpl = 0x09,
    MemberRef = 0x0A,
    Constant = 0x0B,
    CustomAttribute = 0x0C,
    FieldMarshal = 0x0D,
    DeclSecurity = 0x0E,
    ClassLayout = 0x0F,
    FieldLayout = 0x10,
    StandAloneSig = 0x11,
    EventMap = 0x12,
    EventPtr = 0x13,
    Event = 0x14,
    PropertyMap = 0x15,
    PropertyPtr = 0x16,
    Property = 0x17,
    MethodSemantics = 0x18,
    MethodImpl = 0x19,
    ModuleRef = 0x1A,
    TypeSpec = 0x1B,
    ImplMap = 0x1C,
    FieldRva = 0x1D,
    EncLog = 0x1E,
    EncMap = 0x1F,
    Assembly = 0x20,
    AssemblyProcessor = 0x21,
    AssemblyOs = 0x22,
    AssemblyRef = 0x23,
    AssemblyRefProcessor = 0x24,
    AssemblyRefOs = 0x25,
    File = 0x26,
    ExportedType = 0x27,
    ManifestResource = 0x28,
    NestedClass = 0x29,
    GenericParam = 0x2A,
    MethodSpec = 0x2B,
    GenericParamConstraint = 0x2C,
}

/// Coded indexes: a table tag in the low bits, a row id in the rest.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[allow(missing_docs)]
pub enum CodedIndexKind {
    TypeDefOrRef,
    HasConstant,
    HasCustomAttribute,
    HasFieldMarshal,
    HasDeclSecurity,
    MemberRefParent,
    HasSemantics,
    MethodDefOrRef,
    MemberForwarded,
    Implementation,
    CustomAttributeType,
    ResolutionScope,
    TypeOrMethodDef,
}

impl CodedIndexKind {
    /// Tables this coded index may point into
    #[must_use]
    pub fn tables(self) -> &'static [TableId] {
        use TableId::*;

        match self {
            CodedIndexKind::TypeDefOrRef => &[TypeDef, TypeRef, TypeSpec],
            CodedIndexKind::HasConstant => &[Field, Param, Property],
            CodedIndexKind::HasCustomAttribute => &[
                MethodDef,
                Field,
                TypeRef,
                TypeDef,
                Param,
                InterfaceImpl,
                MemberRef,
                Module,
                DeclSecurity,
                Property,
                Event,
                StandAloneSig,
                ModuleRef,
                TypeSpec,
                Assembly,
                AssemblyRef,
                File,
                ExportedType,
                ManifestResource,
                GenericParam,
                GenericParamConstraint,
                MethodSpec,
            ],
            CodedIndexKind::HasFieldMarshal => &[Field, Param],
            CodedIndexKind::HasDeclSecurity => &[TypeDef, MethodDef, Assembly],
            CodedIndexKind::MemberRefParent => &[TypeDef, TypeRef, ModuleRef, MethodDef, TypeSpec],
            CodedIndexKind::HasSemantics => &[Event, Property],
            CodedIndexKind::MethodDefOrRef => &[MethodDef, MemberRef],
            CodedIndexKind::MemberForwarded => &[Field, MethodDef],
            CodedIndexKind::Implementation => &[File, AssemblyRef, ExportedType],
            CodedIndexKind::CustomAttributeType => &[MethodDef, MemberRef],
            CodedIndexKind::ResolutionScope => &[Module, ModuleRef, AssemblyRef, TypeRef],
            CodedIndexKind::TypeOrMethodDef => &[TypeDef, MethodDef],
        }
    }

    /// Number of low bits holding the table tag
    #[must_use]
    pub fn tag_bits(self) -> u32 {
        match self {
            // Tags 0, 1 and 4 are reserved, so five slots need three bits
            CodedIndexKind::CustomAttributeType => 3,
            _ => {
                let tables = self.tables().len() as u32;
                u32::BITS - (tables - 1).leading_zeros()
            }
        }
    }
}

/// Column types of a metadata table row.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Column {
    /// 1-byte constant
    U8,
    /// 2-byte constant
    U16,
    /// 4-byte constant
    U32,
    /// Index into `#Strings`
    Str,
    /// Index into `#GUID`
    Guid,
    /// Index into `#Blob`
    Blob,
    /// Row id into a single table
    Index(TableId),
    /// Coded index over several tables
    Coded(CodedIndexKind),
}

impl TableId {
    /// The column layout of this table
    #[must_use]
    pub fn columns(self) -> &'static [Column] {
        use CodedIndexKind as C;
        use Column::{Blob, Coded, Guid, Index, Str, U16, U32};

        match self {
            TableId::Module => &[U16, Str, Guid, Guid, Guid],
            TableId::TypeRef => &[Coded(C::ResolutionScope), Str, Str],
            TableId::TypeDef => &[
                U32,
                Str,
                Str,
                Coded(C::TypeDefOrRef),
                Index(TableId::Field),
                Index(TableId::MethodDef),
            ],
            TableId::FieldPtr => &[Index(TableId::Field)],
            TableId::Field => &[U16, Str, Blob],
            TableId::MethodPtr => &[Index(TableId::MethodDef)],
            TableId::MethodDef => &[U32, U16, U16, Str, Blob, Index(TableId::Param)],
            TableId::ParamPtr => &[Index(TableId::Param)],
            TableId::Param => &[U16, U16, Str],
            TableId::InterfaceImpl => &[Index(TableId::TypeDef), Coded(C::TypeDefOrRef)],
            TableId::MemberRef => &[Coded(C::MemberRefParent), Str, Blob],
            // Type byte plus its padding byte
            TableId::Constant => &[U16, Coded(C::HasConstant), Blob],
            TableId::CustomAttribute => &[
                Coded(C::HasCustomAttribute),
                Coded(C::CustomAttributeType),
                Blob,
            ],
            TableId::FieldMarshal => &[Coded(C::HasFieldMarshal), Blob],
            TableId::DeclSecurity => &[U16, Coded(C::HasDeclSecurity), Blob],
            TableId::ClassLayout => &[U16, U32, Index(TableId::TypeDef)],
            TableId::FieldLayout => &[U32, Index(TableId::Field)],
            TableId::StandAloneSig => &[Blob],
            TableId::EventMap => &[Index(TableId::TypeDef), Index(TableId::Event)],
            TableId::EventPtr => &[Index(TableId::Event)],
            TableId::Event => &[U16, Str, Coded(C::TypeDefOrRef)],
            TableId::PropertyMap => &[Index(TableId::TypeDef), Index(TableId::Property)],
            TableId::PropertyPtr => &[Index(TableId::Property)],
            TableId::Property => &[U16, Str, Blob],
            TableId::MethodSemantics => &[
                U16,
                Index(TableId::MethodDef),
                Coded(C::HasSemantics),
            ],
            TableId::MethodImpl => &[
                Index(TableId::TypeDef),
                Coded(C::MethodDefOrRef),
                Coded(C::MethodDefOrRef),
            ],
            TableId::ModuleRef => &[Str],
            TableId::TypeSpec => &[Blob],
            TableId::ImplMap => &[
                U16,
                Coded(C::MemberForwarded),
                Str,
                Index(TableId::ModuleRef),
            ],
            TableId::FieldRva => &[U32, Index(TableId::Field)],
            TableId::EncLog => &[U32, U32],
            TableId::EncMap => &[U32],
            TableId::Assembly => &[U32, U16, U16, U16, U16, U32, Blob, Str, Str],
            TableId::AssemblyProcessor => &[U32],
            TableId::AssemblyOs => &[U32, U32, U32],
            TableId::AssemblyRef => &[U16, U16, U16, U16, U32, Blob, Str, Str, Blob],
            TableId::AssemblyRefProcessor => &[U32, Index(TableId::AssemblyRef)],
            TableId::AssemblyRefOs => &[U32, U32, U32, Index(TableId::AssemblyRef)],
            TableId::File => &[U32, Str, Blob],
            TableId::ExportedType => &[U32, U32, Str, Str, Coded(C::Implementation)],
            TableId::ManifestResource => &[U32, U32, Str, Coded(C::Implementation)],
            TableId::NestedClass => &[Index(TableId::TypeDef), Index(TableId::TypeDef)],
            TableId::GenericParam => &[U16, U16, Coded(C::TypeOrMethodDef), Str],
            TableId::MethodSpec => &[Coded(C::MethodDefOrRef), Blob],
            TableId::GenericParamConstraint => &[
                Index(TableId::GenericParam),
                Coded(C::TypeDefOrRef),
            ],
        }
    }
}

/// The header of the tables stream, with the row layout derived from it.
///
/// # Examples
///
/// ```rust
/// use evalscope::metadata::streams::{TableId, TablesHeader};
/// #[rustfmt::skip]
/// let data = [
///     0x00, 0x00, 0x00, 0x00, // Reserved
///     0x02, 0x00,             // Major, Minor
///     0x00, 0x01,             // HeapSizes, Reserved
///     0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // Valid: Module
///     0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // Sorted
///     0x01, 0x00, 0x00, 0x00, // Rows[Module]
///     0x00, 0x00, 0x0A, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00,
/// ];
/// let tables = TablesHeader::from(&data)?;
/// assert_eq!(tables.row_count(TableId::Module), 1);
/// assert_eq!(tables.row_size(TableId::Module), 10);
/// assert_eq!(tables.read_row(TableId::Module, 1)?, vec![0, 0x0A, 1, 0, 0]);
/// # Ok::<(), evalscope::Error>(())
/// ```
pub struct TablesHeader<'a> {
    data: &'a [u8],
    /// Major version of the table schema, shall be 2
    pub major_version: u8,
    /// Minor version of the table schema, shall be 0
    pub minor_version: u8,
    /// Widths of the heap indexes
    pub heap_sizes: HeapSizes,
    /// Bit vector of present tables
    pub valid: u64,
    /// Bit vector of sorted tables
    pub sorted: u64,
    rows: [u32; TableId::COUNT],
    offsets: [usize; TableId::COUNT],
}

impl<'a> TablesHeader<'a> {
    /// Parse the header of a tables stream and lay out its rows.
    ///
    /// # Errors
    /// Returns an error if the header is truncated, declares tables this crate does not know, or
    /// the declared rows do not fit into `data`.
    pub fn from(data: &'a [u8]) -> Result<TablesHeader<'a>> {
        if data.len() < 24 {
            return Err(OutOfBounds);
        }

        let mut offset = 4;
        let major_version = read_le_at::<u8>(data, &mut offset)?;
        let minor_version = read_le_at::<u8>(data, &mut offset)?;
        let heap_sizes = HeapSizes::from_bits_retain(read_le_at::<u8>(data, &mut offset)?);
        offset += 1;
        let valid = read_le_at::<u64>(data, &mut offset)?;
        let sorted = read_le_at::<u64>(data, &mut offset)?;

        if valid >> TableId::COUNT != 0 {
            return Err(malformed_error!(
                "Tables stream declares unknown tables - {:#x}",
                valid
            ));
        }

        let mut rows = [0u32; TableId::COUNT];
        for table in TableId::iter() {
            if valid & (1 << table as u8) != 0 {
                rows[table as usize] = read_le_at::<u32>(data, &mut offset)?;
            }
        }

        if heap_sizes.contains(HeapSizes::EXTRA_DATA) {
            offset += 4;
        }

        let mut header = TablesHeader {
            data,
            major_version,
            minor_version,
            heap_sizes,
            valid,
            sorted,
            rows,
            offsets: [0; TableId::COUNT],
        };

        for table in TableId::iter() {
            header.offsets[table as usize] = offset;
            let size = header.row_size(table) * header.rows[table as usize] as usize;
            offset = offset.checked_add(size).ok_or(OutOfBounds)?;
        }

        if offset > data.len() {
            return Err(OutOfBounds);
        }

        Ok(header)
    }

    /// True if `table` is present in the stream
    #[must_use]
    pub fn has_table(&self, table: TableId) -> bool {
        self.rows[table as usize] != 0
    }

    /// Number of rows in `table`
    #[must_use]
    pub fn row_count(&self, table: TableId) -> u32 {
        self.rows[table as usize]
    }

    /// Width in bytes of a single column
    #[must_use]
    pub fn column_size(&self, column: Column) -> usize {
        let wide = |large: bool| if large { 4 } else { 2 };

        match column {
            Column::U8 => 1,
            Column::U16 => 2,
            Column::U32 => 4,
            Column::Str => wide(self.heap_sizes.contains(HeapSizes::LARGE_STRINGS)),
            Column::Guid => wide(self.heap_sizes.contains(HeapSizes::LARGE_GUID)),
            Column::Blob => wide(self.heap_sizes.contains(HeapSizes::LARGE_BLOB)),
            Column::Index(table) => wide(self.row_count(table) > u32::from(u16::MAX)),
            Column::Coded(kind) => {
                let max_rows = kind
                    .tables()
                    .iter()
                    .map(|table| self.row_count(*table))
                    .max()
                    .unwrap_or(0);
                wide(u64::from(max_rows) >= 1u64 << (16 - kind.tag_bits()))
            }
        }
    }

    /// Width in bytes of one row of `table`
    #[must_use]
    pub fn row_size(&self, table: TableId) -> usize {
        table
            .columns()
            .iter()
            .map(|column| self.column_size(*column))
            .sum()
    }

    /// Read the raw column values of row `rid` (1-based) of `table`.
    ///
    /// Heap and table indexes are returned as-is; resolving them is up to the caller.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the row does not exist.
    pub fn read_row(&self, table: TableId, rid: u32) -> Result<Vec<u32>> {
        if rid == 0 || rid > self.row_count(table) {
            return Err(OutOfBounds);
        }

        let mut offset = self.offsets[table as usize] + (rid as usize - 1) * self.row_size(table);
        let mut values = Vec::with_capacity(table.columns().len());
        for column in table.columns() {
            let value = match self.column_size(*column) {
                1 => u32::from(read_le_at::<u8>(self.data, &mut offset)?),
                size => read_le_at_dyn(self.data, &mut offset, size == 4)?,
            };
            values.push(value);
        }

        Ok(values)
    }
}
