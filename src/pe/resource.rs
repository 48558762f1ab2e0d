use std::io::{self, Read, Seek};

use zerocopy::{FromBytes, Immutable, KnownLayout, LittleEndian, U16, U32};

/// The neutral language id, used when a resource is not localised.
pub const DEFAULT_LANGUAGE: u32 = 0;

/// Predefined resource types indexing the first level of the resource tree.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u32)]
pub enum ResourceType {
    Cursor = 1,
    Bitmap = 2,
    Icon = 3,
    Menu = 4,
    Dialog = 5,
    String = 6,
    FontDir = 7,
    Font = 8,
    Accelerator = 9,
    RcData = 10,
    MessageTable = 11,
    GroupCursor = 12,
    GroupIcon = 14,
    Version = 16,
}

/// File location of a resource's data, as translated through the section
/// table.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ResourceLocation {
    pub offset: u64,
    pub size: u32,
}

/// The 16-byte header of a resource directory node.
#[expect(dead_code)]
#[derive(Clone, Copy, Debug, Eq, PartialEq, FromBytes, KnownLayout, Immutable)]
#[repr(C)]
struct ResourceDirectoryHeader {
    characteristics: U32<LittleEndian>,
    time_date_stamp: U32<LittleEndian>,
    major_version: U16<LittleEndian>,
    minor_version: U16<LittleEndian>,
    number_of_name_entries: U16<LittleEndian>,
    number_of_id_entries: U16<LittleEndian>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, FromBytes, KnownLayout, Immutable)]
#[repr(C)]
struct ResourceDirectoryEntry {
    name_or_id: U32<LittleEndian>,
    offset_to_data_or_directory: U32<LittleEndian>,
}

impl ResourceDirectoryEntry {
    const SUBDIRECTORY_MASK: u32 = 1 << 31;

    const fn id(self) -> u32 {
        self.name_or_id.get()
    }

    const fn target(self) -> ResourceEntry {
        let raw = self.offset_to_data_or_directory.get();
        if raw & Self::SUBDIRECTORY_MASK == 0 {
            ResourceEntry::Leaf(raw)
        } else {
            ResourceEntry::Directory(raw & !Self::SUBDIRECTORY_MASK)
        }
    }
}

/// A directory entry's target: the wire format packs this into one `u32`
/// whose high bit marks a sub-directory. The carried offset is relative to
/// the resource root.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ResourceEntry {
    Directory(u32),
    Leaf(u32),
}

/// Scans one directory node, positioned by the caller, for an id entry.
///
/// Named entries are skipped: Inno Setup only ever stores numeric ids.
pub fn find_directory_entry<R>(reader: &mut R, id: u32) -> io::Result<Option<ResourceEntry>>
where
    R: Read + Seek,
{
    let header = ResourceDirectoryHeader::read_from_io(&mut *reader)?;

    reader.seek_relative(i64::from(header.number_of_name_entries.get()) * 8)?;

    for _ in 0..header.number_of_id_entries.get() {
        let entry = ResourceDirectoryEntry::read_from_io(&mut *reader)?;
        if entry.id() == id {
            return Ok(Some(entry.target()));
        }
    }

    Ok(None)
}
