//! Archive encoding

use indexmap::IndexMap;
use tracing::debug;

use super::{Archive, DIRECTORY_FLAGS, Directory, FILE_FLAGS, MAGIC};
use crate::binary::{ARCHIVE_PAD_FILL, BinaryWriter, Padding, to_u16, to_u32};
use crate::error::Result;
use crate::formats::common::{encode_sjis, hash_archive_name};

const PAD: Padding = Padding::Byte(ARCHIVE_PAD_FILL);
const NO_PARENT: u32 = 0xFFFF_FFFF;
const DIRECTORY_SIZE: u32 = 0x10;

/// Deduplicated NUL-terminated name blob.
#[derive(Default)]
struct Names {
    blob: Vec<u8>,
    offsets: IndexMap<String, u32>,
}

impl Names {
    fn add(&mut self, name: &str) -> Result<()> {
        if !self.offsets.contains_key(name) {
            let offset = to_u32(self.blob.len() as u64, "archive string table")?;
            self.blob.extend(encode_sjis(name)?);
            self.blob.push(0);
            self.offsets.insert(name.to_string(), offset);
        }
        Ok(())
    }

    fn offset(&self, name: &str) -> u32 {
        self.offsets.get(name).copied().unwrap_or_default()
    }

    fn short_offset(&self, name: &str) -> Result<u16> {
        to_u16(self.offset(name) as usize, "archive string table")
    }
}

struct Node<'a> {
    dir: &'a Directory,
    parent: Option<u32>,
    children: Vec<u32>,
}

/// Pre-order walk assigning node indices.
fn number_nodes(root: &Directory) -> Result<Vec<Node<'_>>> {
    let mut nodes: Vec<Node<'_>> = Vec::new();
    let mut stack = vec![(root, None)];
    while let Some((dir, parent)) = stack.pop() {
        let index = to_u32(nodes.len() as u64, "archive nodes")?;
        if let Some(parent) = parent {
            nodes[parent as usize].children.push(index);
        }
        nodes.push(Node {
            dir,
            parent,
            children: Vec::new(),
        });
        for child in dir.subdirs.values().rev() {
            stack.push((child, Some(index)));
        }
    }
    Ok(nodes)
}

fn node_type(index: usize, name: &str) -> Result<[u8; 4]> {
    if index == 0 {
        return Ok(*b"ROOT");
    }
    let mut kind = [0u8; 4];
    let upper = encode_sjis(&name.to_uppercase())?;
    let len = upper.len().min(4);
    kind[..len].copy_from_slice(&upper[..len]);
    Ok(kind)
}

fn write_directory_entry(
    writer: &mut BinaryWriter,
    names: &Names,
    name: &str,
    node: u32,
) -> Result<()> {
    writer.write_u16(0xFFFF)?;
    writer.write_u16(hash_archive_name(name))?;
    writer.write_u8(DIRECTORY_FLAGS)?;
    writer.write_u8(0)?;
    writer.write_u16(names.short_offset(name)?)?;
    writer.write_u32(node)?;
    writer.write_u32(DIRECTORY_SIZE)?;
    writer.write_u32(0)
}

pub(super) fn write_archive(archive: &Archive) -> Result<Vec<u8>> {
    let nodes = number_nodes(&archive.root)?;

    let mut names = Names::default();
    names.add(".")?;
    names.add("..")?;
    names.add(&archive.root.name)?;
    for node in &nodes {
        for name in node.dir.subdirs.keys() {
            names.add(name)?;
        }
        for name in node.dir.files.keys() {
            names.add(name)?;
        }
    }

    let mut writer = BinaryWriter::new();
    writer.write_bytes(&MAGIC)?;
    let size_slot = writer.position();
    writer.write_u32(0)?;
    writer.write_u32(0x20)?;
    let data_slot = writer.position();
    writer.write_fill(0, 0x14)?;
    writer.write_u32(to_u32(nodes.len() as u64, "archive nodes")?)?;
    writer.write_u32(0x20)?;
    let info_slot = writer.position();
    writer.write_fill(0, 0x18)?;

    let mut first_entry = 0u32;
    for (index, node) in nodes.iter().enumerate() {
        let dir = node.dir;
        let count = dir.files.len() + dir.subdirs.len() + 2;
        writer.write_bytes(&node_type(index, &dir.name)?)?;
        writer.write_u32(names.offset(&dir.name))?;
        writer.write_u16(hash_archive_name(&dir.name))?;
        writer.write_u16(to_u16(count, "directory entries")?)?;
        writer.write_u32(first_entry)?;
        first_entry += to_u32(count as u64, "archive entries")?;
    }
    writer.pad(32, PAD)?;

    let entries_start = writer.position();
    let mut data = BinaryWriter::new();
    let mut file_id = 0usize;
    for (index, node) in nodes.iter().enumerate() {
        for file in node.dir.files.values() {
            writer.write_u16(to_u16(file_id, "archive files")?)?;
            writer.write_u16(hash_archive_name(&file.name))?;
            writer.write_u8(FILE_FLAGS)?;
            writer.write_u8(0)?;
            writer.write_u16(names.short_offset(&file.name)?)?;
            writer.write_u32(to_u32(data.position(), "archive data")?)?;
            writer.write_u32(to_u32(file.data.len() as u64, "file size")?)?;
            writer.write_u32(0)?;
            data.write_bytes(&file.data)?;
            data.pad(32, PAD)?;
            file_id += 1;
        }

        write_directory_entry(&mut writer, &names, ".", index as u32)?;
        write_directory_entry(&mut writer, &names, "..", node.parent.unwrap_or(NO_PARENT))?;
        for (name, &child) in node.dir.subdirs.keys().zip(&node.children) {
            write_directory_entry(&mut writer, &names, name, child)?;
        }
    }
    writer.pad(32, PAD)?;

    let strings_start = writer.position();
    writer.write_bytes(&names.blob)?;
    writer.pad(32, PAD)?;
    let strings_size = writer.position() - strings_start;

    let data_start = writer.position();
    let data = data.into_inner();
    writer.write_bytes(&data)?;
    let total = writer.position();

    let data_len = to_u32(data.len() as u64, "archive data")?;
    writer.patch_u32(size_slot, to_u32(total, "archive size")?)?;
    writer.patch_u32(data_slot, to_u32(data_start - 0x20, "archive data offset")?)?;
    writer.patch_u32(data_slot + 4, data_len)?;
    writer.patch_u32(data_slot + 8, data_len)?;
    writer.patch_u32(info_slot, first_entry)?;
    writer.patch_u32(info_slot + 4, to_u32(entries_start - 0x20, "archive entry offset")?)?;
    writer.patch_u32(info_slot + 8, to_u32(strings_size, "archive string table")?)?;
    writer.patch_u32(info_slot + 12, to_u32(strings_start - 0x20, "archive string offset")?)?;

    debug!(
        nodes = nodes.len(),
        entries = first_entry,
        files = file_id,
        size = total,
        "encoded archive"
    );
    Ok(writer.into_inner())
}
