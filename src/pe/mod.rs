//! Minimal Portable Executable walker: just enough of the COFF header,
//! section table and resource directory tree to locate an embedded resource
//! by (type, name, language).

mod coff;
mod resource;
mod section;

use std::io::{self, Read, Seek, SeekFrom};

use byteorder::{LE, ReadBytesExt};
use zerocopy::FromBytes;

pub use coff::CoffHeader;
pub use resource::{DEFAULT_LANGUAGE, ResourceEntry, ResourceLocation, ResourceType};
pub use section::{SectionHeader, SectionTable};

use resource::find_directory_entry;

const PE_POINTER_OFFSET: u64 = 0x3C;
const PE_MAGIC: [u8; 4] = *b"PE\0\0";
const OPTIONAL_HEADER_MAGIC_PE32_PLUS: u16 = 0x20B;
/// Index of the resource table in the data directory.
const RESOURCE_TABLE_INDEX: u32 = 2;

/// The headers needed to resolve resources in a PE image: the section table
/// and the RVA of the resource directory root.
pub struct Pe {
    section_table: SectionTable,
    resource_table_address: u32,
}

impl Pe {
    /// Parses the image headers from a byte source positioned anywhere.
    ///
    /// Returns `Ok(None)` if the source is not a PE image or carries no
    /// resource directory. Callers probe non-installer files with this, so
    /// nothing is logged.
    pub fn read_from<R>(reader: &mut R) -> io::Result<Option<Self>>
    where
        R: Read + Seek,
    {
        // Skip the DOS stub.
        reader.seek(SeekFrom::Start(PE_POINTER_OFFSET))?;
        let pe_pointer = reader.read_u16::<LE>()?;

        reader.seek(SeekFrom::Start(pe_pointer.into()))?;
        let mut magic = [0; PE_MAGIC.len()];
        reader.read_exact(&mut magic)?;
        if magic != PE_MAGIC {
            return Ok(None);
        }

        let coff_header = CoffHeader::read_from_io(&mut *reader)?;

        let section_table_offset =
            reader.stream_position()? + u64::from(coff_header.size_of_optional_header());

        // Skip the rest of the optional header up to the data directory
        // count. PE32+ widens six fields to 64 bits.
        let optional_header_magic = reader.read_u16::<LE>()?;
        if optional_header_magic == OPTIONAL_HEADER_MAGIC_PE32_PLUS {
            reader.seek_relative(106)?;
        } else {
            reader.seek_relative(90)?;
        }

        let directory_count = reader.read_u32::<LE>()?;
        if directory_count <= RESOURCE_TABLE_INDEX {
            return Ok(None);
        }
        reader.seek_relative(i64::from(RESOURCE_TABLE_INDEX) * 8)?;

        let resource_table_address = reader.read_u32::<LE>()?;
        let resource_table_size = reader.read_u32::<LE>()?;
        if resource_table_address == 0 || resource_table_size == 0 {
            return Ok(None);
        }

        reader.seek(SeekFrom::Start(section_table_offset))?;
        let section_table = SectionTable::read_from(reader, coff_header.number_of_sections())?;

        Ok(Some(Self {
            section_table,
            resource_table_address,
        }))
    }

    #[inline]
    pub fn section_table(&self) -> &SectionTable {
        &self.section_table
    }

    /// Walks the three-level resource tree (type, then name, then language)
    /// and returns the file location of the matching leaf's data.
    ///
    /// Returns `Ok(None)` when any level has no matching id, when the
    /// language entry unexpectedly points at another directory, or when an
    /// RVA falls outside every section.
    pub fn find_resource<R>(
        &self,
        reader: &mut R,
        name: u32,
        resource_type: ResourceType,
        language: u32,
    ) -> io::Result<Option<ResourceLocation>>
    where
        R: Read + Seek,
    {
        let Some(root_offset) = self
            .section_table
            .to_file_offset(self.resource_table_address)
        else {
            return Ok(None);
        };

        reader.seek(SeekFrom::Start(root_offset.into()))?;
        let Some(ResourceEntry::Directory(type_offset)) =
            find_directory_entry(reader, resource_type as u32)?
        else {
            return Ok(None);
        };

        reader.seek(SeekFrom::Start((root_offset + type_offset).into()))?;
        let Some(ResourceEntry::Directory(name_offset)) = find_directory_entry(reader, name)?
        else {
            return Ok(None);
        };

        reader.seek(SeekFrom::Start((root_offset + name_offset).into()))?;
        let Some(ResourceEntry::Leaf(leaf_offset)) = find_directory_entry(reader, language)?
        else {
            return Ok(None);
        };

        // The leaf holds the data's virtual address and size; codepage and
        // the reserved word are ignored.
        reader.seek(SeekFrom::Start((root_offset + leaf_offset).into()))?;
        let data_address = reader.read_u32::<LE>()?;
        let data_size = reader.read_u32::<LE>()?;

        let Some(data_offset) = self.section_table.to_file_offset(data_address) else {
            return Ok(None);
        };

        Ok(Some(ResourceLocation {
            offset: data_offset.into(),
            size: data_size,
        }))
    }
}
