use std::cmp::Ordering;
use std::io::{self, Cursor, Read};

use byteorder::{LE, ReadBytesExt};
use crc32fast::Hasher;
use thiserror::Error;
use zerocopy::little_endian::U32;
use zerocopy::{Immutable, KnownLayout, TryFromBytes};

use crate::crypto::Checksum;
use crate::version::InnoVersion;

/// File offset of the [`SetupLoaderOffset`] record in installers that embed
/// it directly instead of in a resource.
pub const SETUP_LOADER_OFFSET: usize = 0x30;
/// Resource name of the setup loader table in modern installers.
pub const SETUP_LOADER_RESOURCE: u32 = 11111;

#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("unknown setup loader signature: {0:?}")]
    UnknownLoaderSignature([u8; SIGNATURE_LEN]),
    #[error("CRC32 checksum mismatch. Expected: {expected}. Actual: {actual}")]
    CrcChecksumMismatch { actual: u32, expected: u32 },
    #[error(transparent)]
    Io(#[from] io::Error),
}

#[expect(dead_code)]
#[derive(Debug, Eq, PartialEq, TryFromBytes, KnownLayout, Immutable)]
#[repr(u32)]
enum Magic {
    Inno = u32::from_le_bytes(*b"Inno"),
}

/// The pointer pair stored at [`SETUP_LOADER_OFFSET`] by legacy installers:
/// one offset holds the setup loader table and the other its complement, as
/// a consistency check.
#[derive(Debug, TryFromBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct SetupLoaderOffset {
    magic: Magic,
    pub table_offset: U32,
    pub not_table_offset: U32,
}

impl SetupLoaderOffset {
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        let (offset, _) = Self::try_read_from_prefix(data).ok()?;
        (offset.table_offset.get() == !offset.not_table_offset.get()).then_some(offset)
    }
}

const SIGNATURE_LEN: usize = 12;

struct SetupLoaderVersion {
    signature: [u8; SIGNATURE_LEN],
    version: InnoVersion,
}

impl PartialEq<(u8, u8, u16)> for SetupLoaderVersion {
    fn eq(&self, other: &(u8, u8, u16)) -> bool {
        self.version.eq(other)
    }
}

impl PartialOrd<(u8, u8, u16)> for SetupLoaderVersion {
    fn partial_cmp(&self, other: &(u8, u8, u16)) -> Option<Ordering> {
        self.version.partial_cmp(other)
    }
}

const KNOWN_SETUP_LOADER_VERSIONS: [SetupLoaderVersion; 7] = [
    SetupLoaderVersion {
        signature: *b"rDlPtS02\x87eVx",
        version: InnoVersion(1, 2, 10),
    },
    SetupLoaderVersion {
        signature: *b"rDlPtS04\x87eVx",
        version: InnoVersion(4, 0, 0),
    },
    SetupLoaderVersion {
        signature: *b"rDlPtS05\x87eVx",
        version: InnoVersion(4, 0, 3),
    },
    SetupLoaderVersion {
        signature: *b"rDlPtS06\x87eVx",
        version: InnoVersion(4, 0, 10),
    },
    SetupLoaderVersion {
        signature: *b"rDlPtS07\x87eVx",
        version: InnoVersion(4, 1, 6),
    },
    SetupLoaderVersion {
        signature: *b"rDlPtS\xCD\xE6\xD7{\x0B*",
        version: InnoVersion(5, 1, 5),
    },
    SetupLoaderVersion {
        signature: *b"nS5W7dT\x83\xAA\x1B\x0Fj",
        version: InnoVersion(5, 1, 5),
    },
];

/// Wraps a reader and feeds everything read through a CRC-32 hasher, so the
/// loader table can be verified against its trailing checksum.
struct Crc32Reader<R: Read> {
    inner: R,
    hasher: Hasher,
}

impl<R: Read> Crc32Reader<R> {
    fn new(inner: R) -> Self {
        Self {
            inner,
            hasher: Hasher::new(),
        }
    }

    /// Access to the inner reader for fields outside the checksummed region.
    const fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    fn finalize(self) -> u32 {
        self.hasher.finalize()
    }
}

impl<R: Read> Read for Crc32Reader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let bytes_read = self.inner.read(buf)?;
        self.hasher.update(&buf[..bytes_read]);
        Ok(bytes_read)
    }
}

/// The setup loader table: where the embedded setup executable, the setup
/// header and the compressed data live inside the installer file.
pub struct SetupLoader {
    pub loader_version: InnoVersion,
    pub revision: u32,
    pub exe_offset: u32,
    pub exe_compressed_size: u32,
    pub exe_uncompressed_size: u32,
    pub exe_checksum: Checksum,
    pub message_offset: u32,
    /// File offset of the setup header, where the version banner sits.
    pub header_offset: u32,
    pub data_offset: u32,
}

impl SetupLoader {
    pub fn new(setup_loader_data: &[u8]) -> Result<Self, LoaderError> {
        let mut checksum = Crc32Reader::new(Cursor::new(setup_loader_data));
        let mut signature = [0; SIGNATURE_LEN];
        checksum.read_exact(&mut signature)?;

        let loader_version = KNOWN_SETUP_LOADER_VERSIONS
            .into_iter()
            .find(|loader_version| loader_version.signature == signature)
            .ok_or(LoaderError::UnknownLoaderSignature(signature))?;

        let revision = if loader_version >= (5, 1, 5) {
            checksum.read_u32::<LE>()?
        } else {
            0
        };

        // Minimum setup loader version required to run this installer.
        checksum.read_u32::<LE>()?;
        let exe_offset = checksum.read_u32::<LE>()?;

        let exe_compressed_size = if loader_version >= (4, 1, 6) {
            0
        } else {
            checksum.read_u32::<LE>()?
        };

        let exe_uncompressed_size = checksum.read_u32::<LE>()?;

        let exe_checksum = if loader_version >= (4, 0, 3) {
            Checksum::Crc32(checksum.read_u32::<LE>()?)
        } else {
            Checksum::Adler32(checksum.read_u32::<LE>()?)
        };

        let message_offset = if loader_version >= (4, 0, 0) {
            0
        } else {
            checksum.get_mut().read_u32::<LE>()?
        };

        let header_offset = checksum.read_u32::<LE>()?;
        let data_offset = checksum.read_u32::<LE>()?;

        if loader_version >= (4, 0, 10) {
            let expected_checksum = checksum.get_mut().read_u32::<LE>()?;
            let actual_checksum = checksum.finalize();
            if actual_checksum != expected_checksum {
                return Err(LoaderError::CrcChecksumMismatch {
                    actual: actual_checksum,
                    expected: expected_checksum,
                });
            }
        }

        Ok(Self {
            loader_version: loader_version.version,
            revision,
            exe_offset,
            exe_compressed_size,
            exe_uncompressed_size,
            exe_checksum,
            message_offset,
            header_offset,
            data_offset,
        })
    }
}
