use std::{io, slice};

use zerocopy::{FromBytes, FromZeros, Immutable, IntoBytes, KnownLayout, LittleEndian, U16, U32};

#[derive(Clone, Copy, Debug, Eq, PartialEq, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C)]
pub struct SectionHeader {
    name: [u8; 8],
    virtual_size: U32<LittleEndian>,
    virtual_address: U32<LittleEndian>,
    size_of_raw_data: U32<LittleEndian>,
    pointer_to_raw_data: U32<LittleEndian>,
    pointer_to_relocations: U32<LittleEndian>,
    pointer_to_line_numbers: U32<LittleEndian>,
    number_of_relocations: U16<LittleEndian>,
    number_of_line_numbers: U16<LittleEndian>,
    characteristics: U32<LittleEndian>,
}

impl SectionHeader {
    #[inline]
    pub const fn virtual_size(&self) -> u32 {
        self.virtual_size.get()
    }

    #[inline]
    pub const fn virtual_address(&self) -> u32 {
        self.virtual_address.get()
    }

    #[inline]
    pub const fn pointer_to_raw_data(&self) -> u32 {
        self.pointer_to_raw_data.get()
    }
}

/// The image's ordered section list. Sections cover the RVA space sparsely
/// and never overlap.
#[derive(Clone, Debug, Eq, PartialEq)]
#[repr(transparent)]
pub struct SectionTable(Vec<SectionHeader>);

impl SectionTable {
    pub fn read_from<R: io::Read>(mut src: R, section_count: u16) -> io::Result<Self> {
        let mut sections = vec![SectionHeader::new_zeroed(); usize::from(section_count)];

        for section in &mut sections {
            src.read_exact(section.as_mut_bytes())?;
        }

        Ok(Self(sections))
    }

    #[inline]
    pub fn sections(&self) -> &[SectionHeader] {
        &self.0
    }

    /// Converts a virtual address (RVA) to a file offset, or `None` if no
    /// section covers the address.
    pub fn to_file_offset(&self, address: u32) -> Option<u32> {
        self.into_iter()
            .find(|section| {
                let start = section.virtual_address();
                let end = start.saturating_add(section.virtual_size());
                (start..end).contains(&address)
            })
            .map(|section| address - section.virtual_address() + section.pointer_to_raw_data())
    }
}

impl<'table> IntoIterator for &'table SectionTable {
    type Item = &'table SectionHeader;

    type IntoIter = slice::Iter<'table, SectionHeader>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
