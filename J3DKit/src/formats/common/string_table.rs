//! J3D name tables
//!
//! Layout: `u16 count`, `u16 0xFFFF`, then `count` pairs of
//! `(u16 hash, u16 offset)` with offsets relative to the table start,
//! followed by the NUL-terminated Shift-JIS strings in entry order.

use encoding_rs::SHIFT_JIS;

use super::hash::hash_name;
use crate::binary::{BinaryReader, BinaryWriter, to_u16};
use crate::error::{Error, Result};

/// Offset placeholder written before the strings are placed.
const OFFSET_PLACEHOLDER: u16 = 0xABCD;

/// Decode Shift-JIS bytes, replacing invalid sequences.
#[must_use]
pub fn decode_sjis(bytes: &[u8]) -> String {
    let (text, _) = SHIFT_JIS.decode_without_bom_handling(bytes);
    text.into_owned()
}

/// Encode a name as Shift-JIS.
///
/// # Errors
///
/// Returns [`Error::UnencodableName`] if a character has no Shift-JIS form.
pub fn encode_sjis(name: &str) -> Result<Vec<u8>> {
    let (bytes, _, had_errors) = SHIFT_JIS.encode(name);
    if had_errors {
        return Err(Error::UnencodableName(name.to_string()));
    }
    Ok(bytes.into_owned())
}

/// Read the name table starting at absolute offset `table_start`.
///
/// Stored hashes are not checked; names resolve by offset only.
pub fn read_string_table(reader: &mut BinaryReader<'_>, table_start: u64) -> Result<Vec<String>> {
    reader.seek(table_start)?;
    let count = reader.read_u16()?;
    reader.skip(2)?;

    let mut names = Vec::with_capacity(usize::from(count));
    for _ in 0..count {
        let _hash = reader.read_u16()?;
        let offset = reader.read_u16()?;
        let bytes = reader.cstring_at(table_start + u64::from(offset))?;
        names.push(decode_sjis(bytes));
    }
    Ok(names)
}

/// Write a name table at the writer's current position.
pub fn write_string_table<S: AsRef<str>>(writer: &mut BinaryWriter, names: &[S]) -> Result<()> {
    let encoded = names
        .iter()
        .map(|name| encode_sjis(name.as_ref()))
        .collect::<Result<Vec<_>>>()?;

    let table_start = writer.position();
    writer.write_u16(to_u16(names.len(), "string table entries")?)?;
    writer.write_u16(0xFFFF)?;

    let mut slots = Vec::with_capacity(names.len());
    for name in names {
        writer.write_u16(hash_name(name.as_ref()))?;
        slots.push(writer.position());
        writer.write_u16(OFFSET_PLACEHOLDER)?;
    }

    for (slot, bytes) in slots.into_iter().zip(&encoded) {
        let offset = to_u16((writer.position() - table_start) as usize, "string table size")?;
        writer.patch_u16(slot, offset)?;
        writer.write_bytes(bytes)?;
        writer.write_u8(0)?;
    }
    Ok(())
}
