//! Minimal metadata images for the integration tests.
//!
//! Images hold a `Module` row and, optionally, an `Assembly` row without a public key.

#![allow(dead_code)]

pub fn mvid(n: u8) -> uguid::Guid {
    let mut bytes = [0u8; 16];
    bytes[0] = n;
    bytes[15] = 0x11;
    uguid::Guid::from_bytes(bytes)
}

fn u16le(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn padded(mut data: Vec<u8>) -> Vec<u8> {
    while data.len() % 4 != 0 {
        data.push(0);
    }
    data
}

/// A module image; `assembly` is `(simple name, major version)`
pub fn image(module: &str, id: uguid::Guid, assembly: Option<(&str, u16)>) -> Vec<u8> {
    let mut strings = vec![0u8];
    let mut add = |value: &str| {
        let index = strings.len() as u16;
        strings.extend_from_slice(value.as_bytes());
        strings.push(0);
        index
    };
    let module_name = add(module);
    let assembly_name = assembly.map(|(name, _)| add(name));

    let mut valid = 1u64;
    let mut rows = vec![1u32];
    let mut body = Vec::new();
    u16le(&mut body, 0);
    u16le(&mut body, module_name);
    u16le(&mut body, 1);
    u16le(&mut body, 0);
    u16le(&mut body, 0);

    if let (Some((_, major)), Some(name)) = (assembly, assembly_name) {
        valid |= 1 << 0x20;
        rows.push(1);
        body.extend_from_slice(&0x8004u32.to_le_bytes());
        for part in [major, 0, 0, 0] {
            u16le(&mut body, part);
        }
        body.extend_from_slice(&0u32.to_le_bytes());
        u16le(&mut body, 0);
        u16le(&mut body, name);
        u16le(&mut body, 0);
    }

    let mut tables = vec![0, 0, 0, 0, 2, 0, 0, 1];
    tables.extend_from_slice(&valid.to_le_bytes());
    tables.extend_from_slice(&0u64.to_le_bytes());
    for count in rows {
        tables.extend_from_slice(&count.to_le_bytes());
    }
    tables.extend_from_slice(&body);

    let streams = [
        ("#~", padded(tables)),
        ("#Strings", padded(strings)),
        ("#GUID", id.to_bytes().to_vec()),
    ];

    let version = b"v4.0.30319\0\0";
    let directory: usize = streams
        .iter()
        .map(|(name, _)| 8 + ((name.len() + 4) & !3))
        .sum();
    let mut offset = 16 + version.len() + 4 + directory;

    let mut out = Vec::new();
    out.extend_from_slice(&0x424A_5342u32.to_le_bytes());
    u16le(&mut out, 1);
    u16le(&mut out, 1);
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&(version.len() as u32).to_le_bytes());
    out.extend_from_slice(version);
    u16le(&mut out, 0);
    u16le(&mut out, streams.len() as u16);
    for (name, data) in &streams {
        out.extend_from_slice(&(offset as u32).to_le_bytes());
        out.extend_from_slice(&(data.len() as u32).to_le_bytes());
        let mut name = name.as_bytes().to_vec();
        name.push(0);
        out.extend_from_slice(&padded(name));
        offset += data.len();
    }
    for (_, data) in &streams {
        out.extend_from_slice(data);
    }
    out
}

pub fn intrinsics() -> Vec<u8> {
    image("<intrinsics>", mvid(0xFF), None)
}
