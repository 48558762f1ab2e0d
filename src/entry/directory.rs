use std::io::{Read, Result};

use bitflags::bitflags;
use byteorder::{LE, ReadBytesExt};

use crate::encoding::encoded_string;
use crate::entry::condition::Condition;
use crate::flag_reader::read_flags::read_flags;
use crate::version::KnownVersion;
use crate::windows_version::WindowsVersionRange;

/// A `[Dirs]` section entry: a directory created at install time.
#[derive(Debug, Default)]
pub struct DirectoryEntry {
    pub name: Option<String>,
    pub condition: Condition,
    pub winver: WindowsVersionRange,
    /// Textual ACL, only stored by the short-lived 4.0.11 to 4.1.0 format.
    pub permissions: Option<String>,
    pub attributes: u32,
    /// Index into the permission entry list
    pub permission: i16,
    pub options: DirectoryFlags,
}

impl DirectoryEntry {
    pub fn load<R: Read>(reader: &mut R, version: &KnownVersion) -> Result<Self> {
        if *version < (1, 3, 0) {
            let _uncompressed_size = reader.read_u32::<LE>()?;
        }

        let mut directory = Self {
            name: encoded_string(reader, version.codepage())?,
            permission: -1,
            ..Self::default()
        };

        directory.condition = Condition::load(reader, version)?;

        if *version >= (4, 0, 11) && *version < (4, 1, 0) {
            directory.permissions = encoded_string(reader, version.codepage())?;
        }

        if *version >= (2, 0, 11) {
            directory.attributes = reader.read_u32::<LE>()?;
        }

        directory.winver = WindowsVersionRange::load(reader, version)?;

        if *version >= (4, 1, 0) {
            directory.permission = reader.read_i16::<LE>()?;
        }

        directory.options = read_flags!(reader, version.bits,
            [
                DirectoryFlags::NEVER_UNINSTALL,
                DirectoryFlags::DELETE_AFTER_INSTALL,
                DirectoryFlags::ALWAYS_UNINSTALL,
            ],
            if *version >= (5, 2, 0) => [
                DirectoryFlags::SET_NTFS_COMPRESSION,
                DirectoryFlags::UNSET_NTFS_COMPRESSION,
            ]
        )?;

        Ok(directory)
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    pub struct DirectoryFlags: u8 {
        const NEVER_UNINSTALL = 1 << 0;
        const DELETE_AFTER_INSTALL = 1 << 1;
        const ALWAYS_UNINSTALL = 1 << 2;
        const SET_NTFS_COMPRESSION = 1 << 3;
        const UNSET_NTFS_COMPRESSION = 1 << 4;
    }
}
