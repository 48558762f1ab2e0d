use std::io::{Read, Result};

use bitflags::bitflags;
use byteorder::{LE, ReadBytesExt};
use tracing::warn;

use crate::crypto::Checksum;
use crate::flag_reader::read_flags::read_flags;
use crate::time::{fat_datetime_to_unix, filetime_to_unix};
use crate::version::{Bits, KnownVersion};

/// Where a file's bytes live inside the compressed setup data and how to
/// restore them.
#[derive(Debug)]
pub struct DataEntry {
    pub chunk: ChunkLocation,
    pub file: FileLocation,
    /// Last-write time of the stored file, as Unix seconds.
    pub timestamp: i64,
    pub timestamp_nsec: u32,
    /// Packed `VS_FIXEDFILEINFO` version: `(ms << 32) | ls`.
    pub file_version: u64,
    pub options: DataEntryFlags,
}

#[derive(Debug)]
pub struct ChunkLocation {
    /// First and last disk slice holding the chunk, 0-based.
    pub first_slice: u32,
    pub last_slice: u32,
    /// Byte offset of the chunk inside the slice data.
    pub offset: u32,
    pub size: u64,
    pub compression: ChunkCompression,
    pub encrypted: bool,
}

#[derive(Debug)]
pub struct FileLocation {
    /// Byte offset of the file inside the decompressed chunk.
    pub offset: u64,
    pub size: u64,
    pub checksum: Checksum,
    pub filter: InstructionFilter,
}

/// Compression applied to a chunk. Whenever the flag stream only says
/// "compressed", the actual method comes from the setup header and is
/// unknown at this point.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ChunkCompression {
    Stored,
    BZip2,
    Unknown,
}

/// x86 call-instruction transform applied to the stored bytes before
/// compression. Decoding only selects the variant; undoing it is the
/// extraction pipeline's job.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum InstructionFilter {
    NoFilter,
    Filter4108,
    Filter5200,
    Filter5309,
}

impl DataEntry {
    pub fn load<R: Read>(reader: &mut R, version: &KnownVersion) -> Result<Self> {
        let mut first_slice = version.bits.read_u32(reader)?;
        let mut last_slice = version.bits.read_u32(reader)?;
        if *version < (4, 0, 0) {
            if first_slice < 1 || last_slice < 1 {
                warn!(first_slice, last_slice, "unexpected slice number");
            } else {
                // Stored 1-based before 4.0.0.
                first_slice -= 1;
                last_slice -= 1;
            }
        }

        let chunk_offset = reader.read_u32::<LE>()?;

        let file_offset = if *version >= (4, 0, 1) {
            reader.read_u64::<LE>()?
        } else {
            0
        };

        let (file_size, chunk_size) = if *version >= (4, 0, 0) {
            (reader.read_u64::<LE>()?, reader.read_u64::<LE>()?)
        } else {
            (
                u64::from(reader.read_u32::<LE>()?),
                u64::from(reader.read_u32::<LE>()?),
            )
        };

        let checksum = if *version >= (5, 3, 9) {
            let mut sha1 = [0; 20];
            reader.read_exact(&mut sha1)?;
            Checksum::Sha1(sha1)
        } else if *version >= (4, 2, 0) {
            let mut md5 = [0; 16];
            reader.read_exact(&mut md5)?;
            Checksum::Md5(md5)
        } else if *version >= (4, 0, 1) {
            Checksum::Crc32(reader.read_u32::<LE>()?)
        } else {
            Checksum::Adler32(reader.read_u32::<LE>()?)
        };

        let (timestamp, timestamp_nsec) = if version.bits == Bits::Bits16 {
            // 16-bit installers use the FAT filetime format
            let time = reader.read_u16::<LE>()?;
            let date = reader.read_u16::<LE>()?;
            (fat_datetime_to_unix(date, time), 0)
        } else {
            // 32-bit installers use the Win32 FILETIME format
            filetime_to_unix(reader.read_i64::<LE>()?)
        };

        let file_version_ms = reader.read_u32::<LE>()?;
        let file_version_ls = reader.read_u32::<LE>()?;
        let file_version = u64::from(file_version_ms) << 32 | u64::from(file_version_ls);

        let mut options = read_flags!(reader, version.bits,
            [
                DataEntryFlags::VERSION_INFO_VALID,
                DataEntryFlags::VERSION_INFO_NOT_VALID
            ],
            if *version >= (2, 0, 17) && *version < (4, 0, 1) => DataEntryFlags::BZIPPED,
            if *version >= (4, 0, 10) => DataEntryFlags::TIMESTAMP_IN_UTC,
            if *version >= (4, 1, 0) => DataEntryFlags::IS_UNINSTALLER_EXE,
            if *version >= (4, 1, 8) => DataEntryFlags::CALL_INSTRUCTION_OPTIMIZED,
            if *version >= (4, 2, 0) => DataEntryFlags::TOUCH,
            if *version >= (4, 2, 2) => DataEntryFlags::CHUNK_ENCRYPTED,
            if *version >= (4, 2, 5) => DataEntryFlags::CHUNK_COMPRESSED,
            if *version >= (5, 1, 13) => DataEntryFlags::SOLID_BREAK
        )?;

        // Chunks are unconditionally compressed before the flag existed.
        if *version < (4, 2, 5) {
            options |= DataEntryFlags::CHUNK_COMPRESSED;
        }

        let mut compression = if options.contains(DataEntryFlags::CHUNK_COMPRESSED) {
            ChunkCompression::Unknown
        } else {
            ChunkCompression::Stored
        };
        if options.contains(DataEntryFlags::BZIPPED) {
            options |= DataEntryFlags::CHUNK_COMPRESSED;
            compression = ChunkCompression::BZip2;
        }

        let filter = if options.contains(DataEntryFlags::CALL_INSTRUCTION_OPTIMIZED) {
            if *version < (5, 2, 0) {
                InstructionFilter::Filter4108
            } else if *version < (5, 3, 9) {
                InstructionFilter::Filter5200
            } else {
                InstructionFilter::Filter5309
            }
        } else {
            InstructionFilter::NoFilter
        };

        Ok(Self {
            chunk: ChunkLocation {
                first_slice,
                last_slice,
                offset: chunk_offset,
                size: chunk_size,
                compression,
                encrypted: options.contains(DataEntryFlags::CHUNK_ENCRYPTED),
            },
            file: FileLocation {
                offset: file_offset,
                size: file_size,
                checksum,
                filter,
            },
            timestamp,
            timestamp_nsec,
            file_version,
            options,
        })
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    pub struct DataEntryFlags: u16 {
        const VERSION_INFO_VALID = 1 << 0;
        const VERSION_INFO_NOT_VALID = 1 << 1;
        const TIMESTAMP_IN_UTC = 1 << 2;
        const IS_UNINSTALLER_EXE = 1 << 3;
        const CALL_INSTRUCTION_OPTIMIZED = 1 << 4;
        const TOUCH = 1 << 5;
        const CHUNK_ENCRYPTED = 1 << 6;
        const CHUNK_COMPRESSED = 1 << 7;
        const SOLID_BREAK = 1 << 8;
        const BZIPPED = 1 << 9;
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use rstest::rstest;

    use crate::crypto::Checksum;
    use crate::entry::data::{ChunkCompression, DataEntry, DataEntryFlags, InstructionFilter};
    use crate::version::{Bits, InnoVersion, KnownVersion, VersionFlags};

    /// 2000-01-01T00:00:00Z as a Win32 FILETIME.
    const MILLENNIUM_FILETIME: i64 = 0x01BF_53EB_256D_4000;

    fn version(major: u8, minor: u8, patch: u16) -> KnownVersion {
        KnownVersion {
            version: InnoVersion(major, minor, patch),
            variant: VersionFlags::empty(),
            bits: Bits::Bits32,
        }
    }

    /// Serialises a data entry the way the given version stores it, with a
    /// checksum of the right width and a single flag byte at the end.
    fn build_stream(version: &KnownVersion, flags: u8) -> Vec<u8> {
        let mut stream = Vec::new();
        if *version < (4, 0, 0) {
            stream.extend_from_slice(&2_u32.to_le_bytes()); // first slice, 1-based
            stream.extend_from_slice(&3_u32.to_le_bytes()); // last slice, 1-based
        } else {
            stream.extend_from_slice(&1_u32.to_le_bytes());
            stream.extend_from_slice(&2_u32.to_le_bytes());
        }
        stream.extend_from_slice(&0x80_u32.to_le_bytes()); // chunk offset

        if *version >= (4, 0, 1) {
            stream.extend_from_slice(&0x1000_u64.to_le_bytes()); // file offset
        }

        if *version >= (4, 0, 0) {
            stream.extend_from_slice(&0xAAAA_u64.to_le_bytes()); // file size
            stream.extend_from_slice(&0xBBBB_u64.to_le_bytes()); // chunk size
        } else {
            stream.extend_from_slice(&0xAAAA_u32.to_le_bytes());
            stream.extend_from_slice(&0xBBBB_u32.to_le_bytes());
        }

        if *version >= (5, 3, 9) {
            stream.extend_from_slice(&[0x51; 20]);
        } else if *version >= (4, 2, 0) {
            stream.extend_from_slice(&[0x5D; 16]);
        } else {
            stream.extend_from_slice(&0xDEAD_BEEF_u32.to_le_bytes());
        }

        stream.extend_from_slice(&MILLENNIUM_FILETIME.to_le_bytes());

        stream.extend_from_slice(&1_u32.to_le_bytes()); // file version ms
        stream.extend_from_slice(&2_u32.to_le_bytes()); // file version ls

        stream.push(flags);
        if *version >= (5, 1, 13) {
            // Nine registered flags need a second bitfield byte.
            stream.push(0);
        }
        stream
    }

    #[test]
    fn modern_entry_has_wide_fields() {
        let version = version(4, 0, 1);
        let mut reader = Cursor::new(build_stream(&version, 0b0000_0001));

        let entry = DataEntry::load(&mut reader, &version).unwrap();
        assert_eq!(entry.chunk.first_slice, 1);
        assert_eq!(entry.chunk.last_slice, 2);
        assert_eq!(entry.chunk.offset, 0x80);
        assert_eq!(entry.file.offset, 0x1000);
        assert_eq!(entry.file.size, 0xAAAA);
        assert_eq!(entry.chunk.size, 0xBBBB);
        assert_eq!(entry.timestamp, 946_684_800);
        assert_eq!(entry.timestamp_nsec, 0);
        assert_eq!(entry.file_version, 1_u64 << 32 | 2);
        assert!(entry.options.contains(DataEntryFlags::VERSION_INFO_VALID));
    }

    #[test]
    fn legacy_entry_has_narrow_fields_and_decremented_slices() {
        let version = version(3, 0, 1);
        let mut reader = Cursor::new(build_stream(&version, 0));

        let entry = DataEntry::load(&mut reader, &version).unwrap();
        // 1-based on disk
        assert_eq!(entry.chunk.first_slice, 1);
        assert_eq!(entry.chunk.last_slice, 2);
        assert_eq!(entry.file.offset, 0);
        assert_eq!(entry.file.size, 0xAAAA);
        assert_eq!(entry.chunk.size, 0xBBBB);
    }

    #[test]
    fn legacy_zero_slice_is_kept_verbatim() {
        let version = version(3, 0, 1);
        let mut stream = build_stream(&version, 0);
        stream[..4].copy_from_slice(&0_u32.to_le_bytes());
        let mut reader = Cursor::new(stream);

        let entry = DataEntry::load(&mut reader, &version).unwrap();
        assert_eq!(entry.chunk.first_slice, 0);
        assert_eq!(entry.chunk.last_slice, 3);
    }

    #[rstest]
    #[case(version(3, 0, 0), Checksum::Adler32(0xDEAD_BEEF))]
    #[case(version(4, 0, 1), Checksum::Crc32(0xDEAD_BEEF))]
    #[case(version(4, 2, 0), Checksum::Md5([0x5D; 16]))]
    #[case(version(5, 3, 9), Checksum::Sha1([0x51; 20]))]
    fn checksum_algorithm_follows_version(
        #[case] version: KnownVersion,
        #[case] expected: Checksum,
    ) {
        let mut reader = Cursor::new(build_stream(&version, 0));

        let entry = DataEntry::load(&mut reader, &version).unwrap();
        assert_eq!(entry.file.checksum, expected);
    }

    #[rstest]
    #[case(version(5, 1, 0), InstructionFilter::Filter4108)]
    #[case(version(5, 2, 0), InstructionFilter::Filter5200)]
    #[case(version(5, 3, 9), InstructionFilter::Filter5309)]
    fn filter_follows_version(#[case] version: KnownVersion, #[case] expected: InstructionFilter) {
        // CALL_INSTRUCTION_OPTIMIZED is the fifth registered flag for
        // every version at or above 4.2.5.
        let mut reader = Cursor::new(build_stream(&version, 1 << 4));

        let entry = DataEntry::load(&mut reader, &version).unwrap();
        assert!(
            entry
                .options
                .contains(DataEntryFlags::CALL_INSTRUCTION_OPTIMIZED)
        );
        assert_eq!(entry.file.filter, expected);
    }

    #[test]
    fn unoptimized_entry_has_no_filter() {
        let version = version(5, 3, 9);
        let mut reader = Cursor::new(build_stream(&version, 0));

        let entry = DataEntry::load(&mut reader, &version).unwrap();
        assert_eq!(entry.file.filter, InstructionFilter::NoFilter);
    }

    #[test]
    fn compression_is_forced_on_before_the_flag_existed() {
        let version = version(4, 2, 2);
        let mut reader = Cursor::new(build_stream(&version, 0));

        let entry = DataEntry::load(&mut reader, &version).unwrap();
        assert!(entry.options.contains(DataEntryFlags::CHUNK_COMPRESSED));
        assert_eq!(entry.chunk.compression, ChunkCompression::Unknown);
        assert!(!entry.chunk.encrypted);
    }

    #[test]
    fn stored_chunk_when_flag_is_clear() {
        let version = version(4, 2, 5);
        let mut reader = Cursor::new(build_stream(&version, 0));

        let entry = DataEntry::load(&mut reader, &version).unwrap();
        assert!(!entry.options.contains(DataEntryFlags::CHUNK_COMPRESSED));
        assert_eq!(entry.chunk.compression, ChunkCompression::Stored);
    }

    #[test]
    fn bzipped_entry_reports_bzip2() {
        // At 3.0.1 the registered flags are the two version-info flags and
        // BZIPPED.
        let version = version(3, 0, 1);
        let mut reader = Cursor::new(build_stream(&version, 0b0000_0100));

        let entry = DataEntry::load(&mut reader, &version).unwrap();
        assert_eq!(entry.chunk.compression, ChunkCompression::BZip2);
        assert!(entry.options.contains(DataEntryFlags::CHUNK_COMPRESSED));
    }

    #[test]
    fn encrypted_chunk_is_flagged() {
        let version = version(4, 2, 2);
        // CHUNK_ENCRYPTED is the seventh registered flag at 4.2.2.
        let mut reader = Cursor::new(build_stream(&version, 1 << 6));

        let entry = DataEntry::load(&mut reader, &version).unwrap();
        assert!(entry.chunk.encrypted);
    }

    #[test]
    fn truncated_stream_is_an_error() {
        let version = version(4, 0, 1);
        let stream = build_stream(&version, 0);
        let mut reader = Cursor::new(&stream[..stream.len() - 10]);

        assert!(DataEntry::load(&mut reader, &version).is_err());
    }
}
