//! Builder for minimal in-memory metadata images.
//!
//! The images carry a metadata root with `#~`, `#Strings`, `#GUID` and `#Blob` streams, small
//! heap indexes, and only the `Module`, `Assembly` and `AssemblyRef` tables.

use crate::metadata::{
    identity::{AssemblyIdentity, Identity},
    streams::{AssemblyFlags, TableId},
};

/// The ECMA standard public key; its token is `b77a5c561934e089`
pub const ECMA_KEY: [u8; 16] = [0, 0, 0, 0, 0, 0, 0, 0, 4, 0, 0, 0, 0, 0, 0, 0];

const VERSION: &[u8; 12] = b"v4.0.30319\0\0";
const SHA1: u32 = 0x8004;

/// A distinct, non-nil module version id per `n`
pub fn mvid(n: u8) -> uguid::Guid {
    let mut bytes = [0u8; 16];
    bytes[0] = n;
    bytes[15] = 0xEE;
    uguid::Guid::from_bytes(bytes)
}

/// Builds a metadata image for one module.
pub struct MetadataBuilder {
    name: String,
    mvid: uguid::Guid,
    generation: uguid::Guid,
    assembly: Option<AssemblyIdentity>,
    references: Vec<AssemblyIdentity>,
}

impl MetadataBuilder {
    pub fn new(name: &str, mvid: uguid::Guid) -> Self {
        MetadataBuilder {
            name: name.to_string(),
            mvid,
            generation: uguid::Guid::ZERO,
            assembly: None,
            references: Vec::new(),
        }
    }

    /// The synthetic intrinsics module
    pub fn intrinsics() -> Vec<u8> {
        MetadataBuilder::new("<intrinsics>", mvid(0xFF)).build()
    }

    /// Define an assembly; a `PublicKeyToken` of the ECMA key is stored as the full key
    pub fn assembly(mut self, display_name: &str) -> Self {
        self.assembly = Some(AssemblyIdentity::parse(display_name).unwrap());
        self
    }

    /// Add an `AssemblyRef` row; tokens are stored in token form
    pub fn reference(mut self, display_name: &str) -> Self {
        self.references
            .push(AssemblyIdentity::parse(display_name).unwrap());
        self
    }

    /// Set the edit-and-continue generation id
    pub fn generation(mut self, generation: uguid::Guid) -> Self {
        self.generation = generation;
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut heaps = HeapWriter::new();

        let mvid_index = heaps.guid(self.mvid);
        let generation_index = if self.generation.is_zero() {
            0
        } else {
            heaps.guid(self.generation)
        };

        let mut valid = 1u64 << TableId::Module as u8;
        let mut rows = vec![1u32];
        let mut table_rows = Vec::new();

        push_u16(&mut table_rows, 0);
        push_u16(&mut table_rows, heaps.string(&self.name));
        push_u16(&mut table_rows, mvid_index);
        push_u16(&mut table_rows, generation_index);
        push_u16(&mut table_rows, 0);

        if let Some(assembly) = &self.assembly {
            valid |= 1u64 << TableId::Assembly as u8;
            rows.push(1);

            let key = match &assembly.strong_name {
                None => None,
                Some(Identity::PubKey(key)) => Some(key.clone()),
                Some(Identity::Token(_)) => {
                    assert_eq!(
                        assembly.public_key_token(),
                        Some([0xB7, 0x7A, 0x5C, 0x56, 0x19, 0x34, 0xE0, 0x89]),
                        "only the ECMA key can be derived from a token"
                    );
                    Some(ECMA_KEY.to_vec())
                }
            };

            table_rows.extend_from_slice(&SHA1.to_le_bytes());
            push_version(&mut table_rows, assembly);
            let flags = if key.is_some() {
                AssemblyFlags::PUBLIC_KEY
            } else {
                AssemblyFlags::empty()
            };
            table_rows.extend_from_slice(&flags.bits().to_le_bytes());
            push_u16(&mut table_rows, key.map_or(0, |key| heaps.blob(&key)));
            push_u16(&mut table_rows, heaps.string(&assembly.name));
            push_u16(
                &mut table_rows,
                assembly.culture.as_deref().map_or(0, |c| heaps.string(c)),
            );
        }

        if !self.references.is_empty() {
            valid |= 1u64 << TableId::AssemblyRef as u8;
            rows.push(self.references.len() as u32);

            for reference in &self.references {
                push_version(&mut table_rows, reference);
                table_rows.extend_from_slice(&0u32.to_le_bytes());
                push_u16(
                    &mut table_rows,
                    reference
                        .public_key_token()
                        .map_or(0, |token| heaps.blob(&token)),
                );
                push_u16(&mut table_rows, heaps.string(&reference.name));
                push_u16(
                    &mut table_rows,
                    reference.culture.as_deref().map_or(0, |c| heaps.string(c)),
                );
                push_u16(&mut table_rows, 0);
            }
        }

        let mut tables = Vec::new();
        tables.extend_from_slice(&0u32.to_le_bytes());
        tables.extend_from_slice(&[2, 0, 0, 1]);
        tables.extend_from_slice(&valid.to_le_bytes());
        tables.extend_from_slice(&0u64.to_le_bytes());
        for count in rows {
            tables.extend_from_slice(&count.to_le_bytes());
        }
        tables.extend_from_slice(&table_rows);

        assemble(&[
            ("#~", tables),
            ("#Strings", heaps.strings),
            ("#GUID", heaps.guids),
            ("#Blob", heaps.blobs),
        ])
    }
}

struct HeapWriter {
    strings: Vec<u8>,
    guids: Vec<u8>,
    blobs: Vec<u8>,
}

impl HeapWriter {
    fn new() -> Self {
        HeapWriter {
            strings: vec![0],
            guids: Vec::new(),
            blobs: vec![0],
        }
    }

    fn string(&mut self, value: &str) -> u16 {
        let index = self.strings.len() as u16;
        self.strings.extend_from_slice(value.as_bytes());
        self.strings.push(0);
        index
    }

    fn guid(&mut self, value: uguid::Guid) -> u16 {
        self.guids.extend_from_slice(&value.to_bytes());
        (self.guids.len() / 16) as u16
    }

    fn blob(&mut self, value: &[u8]) -> u16 {
        assert!(value.len() < 0x80);
        let index = self.blobs.len() as u16;
        self.blobs.push(value.len() as u8);
        self.blobs.extend_from_slice(value);
        index
    }
}

fn push_u16(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn push_version(out: &mut Vec<u8>, identity: &AssemblyIdentity) {
    let version = identity.version;
    for part in [version.major, version.minor, version.build, version.revision] {
        push_u16(out, part);
    }
}

fn pad(data: &mut Vec<u8>) {
    while data.len() % 4 != 0 {
        data.push(0);
    }
}

/// Lay out the metadata root, the stream directory and the padded streams
fn assemble(streams: &[(&str, Vec<u8>)]) -> Vec<u8> {
    let directory_len: usize = streams
        .iter()
        .map(|(name, _)| 8 + ((name.len() + 1 + 3) & !3))
        .sum();
    let mut offset = 16 + VERSION.len() + 4 + directory_len;

    let mut image = Vec::new();
    image.extend_from_slice(&0x424A_5342u32.to_le_bytes());
    push_u16(&mut image, 1);
    push_u16(&mut image, 1);
    image.extend_from_slice(&0u32.to_le_bytes());
    image.extend_from_slice(&(VERSION.len() as u32).to_le_bytes());
    image.extend_from_slice(VERSION);
    push_u16(&mut image, 0);
    push_u16(&mut image, streams.len() as u16);

    let mut bodies = Vec::new();
    for (name, data) in streams {
        let mut data = data.clone();
        pad(&mut data);

        image.extend_from_slice(&(offset as u32).to_le_bytes());
        image.extend_from_slice(&(data.len() as u32).to_le_bytes());
        let mut name = name.as_bytes().to_vec();
        name.push(0);
        pad(&mut name);
        image.extend_from_slice(&name);

        offset += data.len();
        bodies.extend_from_slice(&data);
    }

    image.extend_from_slice(&bodies);
    image
}

#[test]
fn builder_layout() {
    use crate::metadata::view::MetadataView;

    let image = MetadataBuilder::new("Test.dll", mvid(1))
        .assembly("Test, Version=1.0.0.0, Culture=fr")
        .reference("mscorlib, Version=4.0.0.0, PublicKeyToken=b77a5c561934e089")
        .reference("Helper")
        .build();

    let view = MetadataView::read(&image).unwrap();
    assert_eq!(view.root().stream_headers.len(), 4);
    assert_eq!(view.tables().row_count(TableId::AssemblyRef), 2);

    let info = view.assembly_info().unwrap();
    let assembly = info.identity.unwrap();
    assert_eq!(assembly.culture.as_deref(), Some("fr"));
    assert!(!assembly.is_strong_named());
    assert_eq!(info.references[1].name, "Helper");
}

#[test]
fn ecma_key_round_trips_to_token() {
    use crate::metadata::view::MetadataView;

    let image = MetadataBuilder::new("mscorlib.dll", mvid(1))
        .assembly("mscorlib, Version=4.0.0.0, PublicKeyToken=b77a5c561934e089")
        .build();

    let info = MetadataView::read(&image).unwrap().assembly_info().unwrap();
    assert_eq!(
        info.identity.unwrap(),
        AssemblyIdentity::parse("mscorlib, Version=4.0.0.0, PublicKeyToken=b77a5c561934e089")
            .unwrap()
    );
}
