use zerocopy::{FromBytes, Immutable, KnownLayout, LittleEndian, U16, U32};

/// `IMAGE_FILE_HEADER`, the 20 bytes following the PE signature.
#[derive(Clone, Copy, Debug, Eq, PartialEq, FromBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct CoffHeader {
    machine: U16<LittleEndian>,
    number_of_sections: U16<LittleEndian>,
    time_date_stamp: U32<LittleEndian>,
    pointer_to_symbol_table: U32<LittleEndian>,
    number_of_symbols: U32<LittleEndian>,
    size_of_optional_header: U16<LittleEndian>,
    characteristics: U16<LittleEndian>,
}

impl CoffHeader {
    #[inline]
    pub const fn machine(&self) -> u16 {
        self.machine.get()
    }

    #[inline]
    pub const fn number_of_sections(&self) -> u16 {
        self.number_of_sections.get()
    }

    /// Length of the optional header; the section table starts this many
    /// bytes after the COFF header ends.
    #[inline]
    pub const fn size_of_optional_header(&self) -> u16 {
        self.size_of_optional_header.get()
    }
}
