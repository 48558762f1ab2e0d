use std::io::{Read, Result};

use byteorder::{LE, ReadBytesExt};
use zerocopy::{Immutable, KnownLayout, TryFromBytes};

use crate::encoding::encoded_string;
use crate::entry::condition::Condition;
use crate::enum_value::enum_value::enum_value;
use crate::version::KnownVersion;
use crate::windows_version::WindowsVersionRange;

/// An `[InstallDelete]` or `[UninstallDelete]` section entry: a path removed
/// before installation or at uninstall time.
#[derive(Debug, Default)]
pub struct DeleteEntry {
    pub name: Option<String>,
    pub condition: Condition,
    pub winver: WindowsVersionRange,
    pub target: DeleteTarget,
}

impl DeleteEntry {
    pub fn load<R: Read>(reader: &mut R, version: &KnownVersion) -> Result<Self> {
        if *version < (1, 3, 0) {
            let _uncompressed_size = reader.read_u32::<LE>()?;
        }

        let mut entry = Self {
            name: encoded_string(reader, version.codepage())?,
            ..Self::default()
        };

        entry.condition = Condition::load(reader, version)?;
        entry.winver = WindowsVersionRange::load(reader, version)?;

        entry.target = enum_value!(reader, DeleteTarget)?;

        Ok(entry)
    }
}

#[derive(Debug, Default, Eq, PartialEq, TryFromBytes, KnownLayout, Immutable)]
#[repr(u8)]
pub enum DeleteTarget {
    #[default]
    Files,
    FilesAndSubdirs,
    DirIfEmpty,
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use rstest::rstest;

    use crate::entry::delete::{DeleteEntry, DeleteTarget};
    use crate::version::{Bits, InnoVersion, KnownVersion, VersionFlags};

    #[rstest]
    #[case(0, DeleteTarget::Files)]
    #[case(1, DeleteTarget::FilesAndSubdirs)]
    #[case(2, DeleteTarget::DirIfEmpty)]
    fn entry_for_5_5_7(#[case] ordinal: u8, #[case] expected: DeleteTarget) {
        let version = KnownVersion {
            version: InnoVersion(5, 5, 7),
            variant: VersionFlags::empty(),
            bits: Bits::Bits32,
        };

        let mut stream = Vec::new();
        stream.extend_from_slice(&9_u32.to_le_bytes());
        stream.extend_from_slice(b"{tmp}\\*.*");
        for _ in 0..6 {
            stream.extend_from_slice(&0_u32.to_le_bytes()); // condition strings
        }
        stream.extend_from_slice(&[0; 20]); // windows version range
        stream.push(ordinal);

        let mut reader = Cursor::new(stream);
        let entry = DeleteEntry::load(&mut reader, &version).unwrap();

        assert_eq!(entry.name.as_deref(), Some("{tmp}\\*.*"));
        assert_eq!(entry.target, expected);
    }

    #[test]
    fn out_of_range_target_is_an_error() {
        let version = KnownVersion {
            version: InnoVersion(5, 5, 7),
            variant: VersionFlags::empty(),
            bits: Bits::Bits32,
        };

        let mut stream = Vec::new();
        stream.extend_from_slice(&0_u32.to_le_bytes());
        for _ in 0..6 {
            stream.extend_from_slice(&0_u32.to_le_bytes());
        }
        stream.extend_from_slice(&[0; 20]);
        stream.push(7);

        let mut reader = Cursor::new(stream);
        assert!(DeleteEntry::load(&mut reader, &version).is_err());
    }
}
