use std::io::{Read, Result};

use byteorder::{LE, ReadBytesExt};

use crate::version::KnownVersion;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Version {
    pub major: u8,
    pub minor: u8,
    pub build: u16,
}

impl Version {
    fn load<R: Read>(reader: &mut R, version: &KnownVersion) -> Result<Self> {
        let mut windows_version = Self::default();
        if *version >= (1, 3, 19) {
            windows_version.build = reader.read_u16::<LE>()?;
        }
        windows_version.minor = reader.read_u8()?;
        windows_version.major = reader.read_u8()?;
        Ok(windows_version)
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ServicePack {
    pub major: u8,
    pub minor: u8,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct WindowsVersion {
    pub win_version: Version,
    pub nt_version: Version,
    pub nt_service_pack: ServicePack,
}

impl WindowsVersion {
    fn load<R: Read>(reader: &mut R, version: &KnownVersion) -> Result<Self> {
        let mut windows_version = Self {
            win_version: Version::load(reader, version)?,
            nt_version: Version::load(reader, version)?,
            ..Self::default()
        };

        if *version >= (1, 3, 19) {
            windows_version.nt_service_pack.minor = reader.read_u8()?;
            windows_version.nt_service_pack.major = reader.read_u8()?;
        }

        Ok(windows_version)
    }
}

/// Windows version requirements attached to most entry kinds: the oldest
/// version the entry applies to and the first version it no longer does.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct WindowsVersionRange {
    pub begin: WindowsVersion,
    pub end: WindowsVersion,
}

impl WindowsVersionRange {
    pub fn load<R: Read>(reader: &mut R, version: &KnownVersion) -> Result<Self> {
        Ok(Self {
            begin: WindowsVersion::load(reader, version)?,
            end: WindowsVersion::load(reader, version)?,
        })
    }
}
