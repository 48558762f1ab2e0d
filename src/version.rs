use std::cmp::Ordering;
use std::io::{self, Read};

use bitflags::bitflags;
use byteorder::{LE, ReadBytesExt};
use derive_more::{Deref, Display};
use encoding_rs::{Encoding, UTF_16LE, WINDOWS_1252};
use memchr::{memchr, memmem};

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct VersionFlags: u8 {
        const UNICODE = 1 << 0;
        const ISX = 1 << 1;
    }
}

/// On-disk width of index and size fields, selected by the installer
/// generation. 16-bit installers are the Inno Setup 1.x line.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Bits {
    Bits16,
    #[default]
    Bits32,
}

impl Bits {
    /// Reads a field stored as `u16` (zero-extended) in 16-bit installers and
    /// as `u32` in 32-bit installers.
    pub fn read_u32<R: Read>(self, reader: &mut R) -> io::Result<u32> {
        match self {
            Self::Bits16 => reader.read_u16::<LE>().map(u32::from),
            Self::Bits32 => reader.read_u32::<LE>(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Display, PartialEq, Eq, PartialOrd, Ord)]
#[display("{_0}.{_1}.{_2}")]
pub struct InnoVersion(pub u8, pub u8, pub u16);

impl PartialEq<(u8, u8, u16)> for InnoVersion {
    fn eq(&self, &(n1, n2, n3): &(u8, u8, u16)) -> bool {
        self.eq(&Self(n1, n2, n3))
    }
}

impl PartialOrd<(u8, u8, u16)> for InnoVersion {
    fn partial_cmp(&self, &(n1, n2, n3): &(u8, u8, u16)) -> Option<Ordering> {
        self.partial_cmp(&Self(n1, n2, n3))
    }
}

/// A format revision recognised from the version banner at the start of the
/// setup header, together with the string variant and field width it implies.
#[derive(Debug, Default, Deref, Display, PartialEq, Eq)]
#[display("{version}")]
pub struct KnownVersion {
    #[deref]
    pub version: InnoVersion,
    pub variant: VersionFlags,
    pub bits: Bits,
}

impl PartialEq<(u8, u8, u16)> for KnownVersion {
    fn eq(&self, other: &(u8, u8, u16)) -> bool {
        self.version.eq(other)
    }
}

impl PartialOrd<(u8, u8, u16)> for KnownVersion {
    fn partial_cmp(&self, other: &(u8, u8, u16)) -> Option<Ordering> {
        self.version.partial_cmp(other)
    }
}

impl KnownVersion {
    pub fn from_version_bytes(data: &[u8]) -> Option<Self> {
        const ISX: &[u8; 3] = b"ISX";
        const INNO_SETUP_EXTENSIONS: &[u8; 21] = b"Inno Setup Extensions";

        // Inno Setup 1.2 and earlier use a terse banner like "i1.2.10--16",
        // where the trailing number is the field width.
        if data.first() == Some(&b'i') {
            return Self::from_legacy_version_bytes(data);
        }

        // Find the first '(' and ')'
        let start_index = memchr(b'(', data)?;
        let end_index = memchr(b')', &data[start_index..])? + start_index;

        // Extract the version bytes within the parentheses
        let version_bytes = &data[start_index + 1..end_index];

        let mut parts = version_bytes
            .split(|&b| b == b'.')
            .filter_map(|s| std::str::from_utf8(s).ok()?.parse::<u16>().ok());

        let inno_version = InnoVersion(
            u8::try_from(parts.next()?).ok()?,
            u8::try_from(parts.next()?).ok()?,
            parts.next()?,
        );

        // Inno Setup 6.3.0 and above is always only Unicode
        if inno_version >= (6, 3, 0) {
            return Some(Self {
                version: inno_version,
                variant: VersionFlags::UNICODE,
                bits: Bits::Bits32,
            });
        }

        let mut flags = VersionFlags::empty();

        let remaining_data = &data[end_index..];

        // Check for a Unicode flag within parentheses
        if let Some(u_start_index) = memchr(b'(', remaining_data) {
            if let Some(u_end_index) = memchr(b')', &remaining_data[u_start_index..]) {
                let unicode_flag = &remaining_data[u_start_index + 1..u_start_index + u_end_index];
                if unicode_flag.eq_ignore_ascii_case(b"u") {
                    flags |= VersionFlags::UNICODE;
                }
            }
        }

        if memmem::find(remaining_data, ISX).is_some()
            || memmem::find(remaining_data, INNO_SETUP_EXTENSIONS).is_some()
        {
            flags |= VersionFlags::ISX;
        }

        Some(Self {
            version: inno_version,
            variant: flags,
            bits: Bits::Bits32,
        })
    }

    fn from_legacy_version_bytes(data: &[u8]) -> Option<Self> {
        let separator = memmem::find(data, b"--")?;

        let mut parts = data[1..separator]
            .split(|&b| b == b'.')
            .filter_map(|s| std::str::from_utf8(s).ok()?.parse::<u16>().ok());

        let inno_version = InnoVersion(
            u8::try_from(parts.next()?).ok()?,
            u8::try_from(parts.next()?).ok()?,
            parts.next()?,
        );

        let bits = if data[separator + 2..].starts_with(b"16") {
            Bits::Bits16
        } else {
            Bits::Bits32
        };

        Some(Self {
            version: inno_version,
            variant: VersionFlags::empty(),
            bits,
        })
    }

    pub const fn is_unicode(&self) -> bool {
        self.variant.contains(VersionFlags::UNICODE)
    }

    pub const fn is_isx(&self) -> bool {
        self.variant.contains(VersionFlags::ISX)
    }

    /// Codepage used for strings stored by this revision.
    pub fn codepage(&self) -> &'static Encoding {
        if self.is_unicode() { UTF_16LE } else { WINDOWS_1252 }
    }
}
