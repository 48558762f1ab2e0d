use std::io::{Read, Result};

use bitflags::bitflags;
use byteorder::{LE, ReadBytesExt};

use crate::encoding::encoded_string;
use crate::flag_reader::read_flags::read_flags;
use crate::version::KnownVersion;
use crate::windows_version::WindowsVersionRange;

/// A `[Components]` section entry.
#[derive(Debug, Default)]
pub struct ComponentEntry {
    pub name: Option<String>,
    pub description: Option<String>,
    pub types: Option<String>,
    pub languages: Option<String>,
    pub check: Option<String>,
    pub extra_disk_space_required: u64,
    pub level: u32,
    pub used: bool,
    pub winver: WindowsVersionRange,
    pub options: ComponentFlags,
    pub size: u64,
}

impl ComponentEntry {
    pub fn load<R: Read>(reader: &mut R, version: &KnownVersion) -> Result<Self> {
        let codepage = version.codepage();

        let mut component = Self {
            name: encoded_string(reader, codepage)?,
            description: encoded_string(reader, codepage)?,
            types: encoded_string(reader, codepage)?,
            ..Self::default()
        };

        if *version >= (4, 0, 1) {
            component.languages = encoded_string(reader, codepage)?;
        }

        if *version >= (4, 0, 0) || (version.is_isx() && *version >= (1, 3, 24)) {
            component.check = encoded_string(reader, codepage)?;
        }

        if *version >= (4, 0, 0) {
            component.extra_disk_space_required = reader.read_u64::<LE>()?;
        } else {
            component.extra_disk_space_required = u64::from(reader.read_u32::<LE>()?);
        }

        if *version >= (4, 0, 0) || (version.is_isx() && *version >= (3, 0, 3)) {
            component.level = reader.read_u32::<LE>()?;
        }

        if *version >= (4, 0, 0) || (version.is_isx() && *version >= (3, 0, 4)) {
            component.used = reader.read_u8()? != 0;
        } else {
            component.used = true;
        }

        component.winver = WindowsVersionRange::load(reader, version)?;

        component.options = read_flags!(reader, version.bits,
            [
                ComponentFlags::FIXED,
                ComponentFlags::RESTART,
                ComponentFlags::DISABLE_NO_UNINSTALL_WARNING,
            ],
            if *version >= (3, 0, 8) => ComponentFlags::EXCLUSIVE,
            if *version >= (4, 2, 3) => ComponentFlags::DONT_INHERIT_CHECK
        )?;

        if *version >= (4, 0, 0) {
            component.size = reader.read_u64::<LE>()?;
        } else if *version >= (2, 0, 0) || (version.is_isx() && *version >= (1, 3, 24)) {
            component.size = u64::from(reader.read_u32::<LE>()?);
        }

        Ok(component)
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    pub struct ComponentFlags: u8 {
        const FIXED = 1 << 0;
        const RESTART = 1 << 1;
        const DISABLE_NO_UNINSTALL_WARNING = 1 << 2;
        const EXCLUSIVE = 1 << 3;
        const DONT_INHERIT_CHECK = 1 << 4;
    }
}
