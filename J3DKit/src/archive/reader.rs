//! Archive decoding

use tracing::{debug, warn};

use super::{
    Archive, ArchiveFile, ArchiveReadOptions, Directory, EntryOrigin, MAGIC, ParsedArchive, SkipReason,
    SkippedEntry,
};
use crate::binary::BinaryReader;
use crate::error::{Error, Result};
use crate::formats::common::{decode_sjis, hash_archive_name};

/// Offset every header offset is relative to.
const BASE: u64 = 0x20;
const NODE_SIZE: u64 = 0x10;
const ENTRY_SIZE: u64 = 0x14;

struct Node {
    name_offset: u32,
    entry_count: u16,
    first_entry: u32,
}

struct Entry {
    id: u16,
    hash: u16,
    flags: u8,
    name_offset: u16,
    offset: u32,
    size: u32,
}

impl Entry {
    fn is_directory(&self) -> bool {
        self.flags & 0b10 != 0 && self.flags & 0b1 == 0
    }
}

/// A directory under construction and where it hangs in the tree.
struct Slot {
    dir: Directory,
    node_index: u32,
    parent: Option<usize>,
}

struct Layout {
    entry_count: u32,
    entries_start: u64,
    strings_start: u64,
    data_start: u64,
}

fn read_name(reader: &BinaryReader<'_>, layout: &Layout, offset: u32) -> Result<String> {
    let bytes = reader.cstring_at(layout.strings_start + u64::from(offset))?;
    Ok(decode_sjis(bytes))
}

fn read_entry(reader: &mut BinaryReader<'_>) -> Result<Entry> {
    let id = reader.read_u16()?;
    let hash = reader.read_u16()?;
    let flags = reader.read_u8()?;
    reader.skip(1)?;
    let name_offset = reader.read_u16()?;
    let offset = reader.read_u32()?;
    let size = reader.read_u32()?;
    reader.skip(4)?;
    Ok(Entry {
        id,
        hash,
        flags,
        name_offset,
        offset,
        size,
    })
}

fn slot_path(slots: &[Slot], mut index: usize) -> String {
    let mut parts = vec![slots[index].dir.name.as_str()];
    while let Some(parent) = slots[index].parent {
        parts.push(slots[parent].dir.name.as_str());
        index = parent;
    }
    parts.reverse();
    parts.join("/")
}

fn on_ancestor_chain(slots: &[Slot], mut index: usize, node_index: u32) -> bool {
    loop {
        if slots[index].node_index == node_index {
            return true;
        }
        match slots[index].parent {
            Some(parent) => index = parent,
            None => return false,
        }
    }
}

pub(super) fn read_archive(data: &[u8], options: &ArchiveReadOptions) -> Result<ParsedArchive> {
    if !data.starts_with(&MAGIC) {
        return Err(Error::unrecognized_magic(data));
    }
    let mut reader = BinaryReader::new(data).with_section("RARC header");
    reader.seek(0x0C)?;
    let data_start = u64::from(reader.read_u32()?) + BASE;
    reader.seek(0x20)?;
    let node_count = reader.read_u32()?;
    let nodes_start = u64::from(reader.read_u32()?) + BASE;
    let entry_count = reader.read_u32()?;
    let entries_start = u64::from(reader.read_u32()?) + BASE;
    reader.skip(4)?;
    let strings_start = u64::from(reader.read_u32()?) + BASE;
    let layout = Layout {
        entry_count,
        entries_start,
        strings_start,
        data_start,
    };

    reader.set_section("RARC nodes");
    reader.seek(nodes_start)?;
    let mut nodes = Vec::with_capacity(node_count.min(0x1_0000) as usize);
    for _ in 0..node_count {
        reader.skip(4)?;
        let name_offset = reader.read_u32()?;
        reader.skip(2)?;
        let entry_count = reader.read_u16()?;
        let first_entry = reader.read_u32()?;
        nodes.push(Node {
            name_offset,
            entry_count,
            first_entry,
        });
    }
    let Some(root) = nodes.first() else {
        return Err(reader.integrity(nodes_start, "archive has no root node"));
    };
    let root_name = read_name(&reader, &layout, root.name_offset)?;
    debug!(nodes = node_count, entries = entry_count, root = %root_name, "decoding archive");

    reader.set_section("RARC entries");
    let mut slots = vec![Slot {
        dir: Directory::new(root_name),
        node_index: 0,
        parent: None,
    }];
    let mut skipped = Vec::new();
    let mut placed = vec![false; nodes.len()];
    placed[0] = true;
    let mut pending = vec![0usize];

    while let Some(current) = pending.pop() {
        let node = &nodes[slots[current].node_index as usize];
        let first = u64::from(node.first_entry);
        let end = first + u64::from(node.entry_count);
        if end > u64::from(layout.entry_count) {
            return Err(reader.integrity(
                nodes_start + NODE_SIZE * u64::from(slots[current].node_index),
                format!("entries {first}..{end} exceed entry table of {}", layout.entry_count),
            ));
        }

        let mut children = Vec::new();
        for index in first..end {
            let position = layout.entries_start + ENTRY_SIZE * index;
            reader.seek(position)?;
            let entry = read_entry(&mut reader)?;
            let name = read_name(&reader, &layout, u32::from(entry.name_offset))?;
            if name.is_empty() || name == "." || name == ".." {
                continue;
            }
            if options.verify_hashes && entry.hash != hash_archive_name(&name) {
                return Err(reader.integrity(
                    position + 2,
                    format!("hash {:#06x} of {name} should be {:#06x}", entry.hash, hash_archive_name(&name)),
                ));
            }

            let dir = &slots[current].dir;
            if dir.files.contains_key(&name) || dir.subdirs.contains_key(&name) {
                let path = format!("{}/{name}", slot_path(&slots, current));
                warn!(path = %path, "skipping duplicate entry name");
                skipped.push(SkippedEntry {
                    path,
                    reason: SkipReason::DuplicateName,
                });
                continue;
            }

            if entry.is_directory() {
                if entry.offset >= node_count {
                    return Err(reader.integrity(
                        position + 8,
                        format!("directory {name} points at node {} of {node_count}", entry.offset),
                    ));
                }
                let node_index = entry.offset;
                if placed[node_index as usize] {
                    let path = format!("{}/{name}", slot_path(&slots, current));
                    let reason = if on_ancestor_chain(&slots, current, node_index) {
                        SkipReason::Recursive { node_index }
                    } else {
                        SkipReason::SharedNode { node_index }
                    };
                    warn!(path = %path, node = node_index, "skipping directory: {reason}");
                    skipped.push(SkippedEntry { path, reason });
                    continue;
                }
                placed[node_index as usize] = true;
                slots[current].dir.subdirs.insert(name.clone(), Directory::new(&name));
                slots.push(Slot {
                    dir: Directory::new(name),
                    node_index,
                    parent: Some(current),
                });
                children.push(slots.len() - 1);
            } else {
                let start = layout.data_start + u64::from(entry.offset);
                reader.seek(start)?;
                let payload = reader.read_bytes(entry.size as usize)?.to_vec();
                slots[current].dir.insert_file(ArchiveFile {
                    name,
                    data: payload,
                    origin: Some(EntryOrigin {
                        id: entry.id,
                        hash: entry.hash,
                        flags: entry.flags,
                    }),
                });
            }
        }
        pending.extend(children.into_iter().rev());
    }

    // Children always sit after their parent, so folding from the back
    // moves every directory into place after its own subtree is complete.
    while slots.len() > 1 {
        let Some(slot) = slots.pop() else { break };
        if let Some(parent) = slot.parent {
            slots[parent].dir.subdirs.insert(slot.dir.name.clone(), slot.dir);
        }
    }
    let root = slots.pop().map(|slot| slot.dir).unwrap_or_default();

    Ok(ParsedArchive {
        archive: Archive { root },
        skipped,
    })
}
