use std::io::{Read, Result};
use std::ops::BitOrAssign;

use byteorder::ReadBytesExt;

use crate::version::Bits;

/// Reader for a flag set whose member list is only known at decode time.
///
/// Flags are stored as packed bitfields, 1 byte for every 8 registered flags.
/// Bit positions are assigned by registration order, which varies with the
/// format revision, not by the declaration order of the flag type. 16-bit
/// installers pad the bitfield to a 16-bit boundary.
pub struct FlagReader<'reader, E, R> {
    reader: &'reader mut R,
    bits: Bits,
    flags: E,
    pos: usize,
    value: u8,
    bytes: usize,
}

impl<'reader, E, R> FlagReader<'reader, E, R>
where
    E: BitOrAssign + Default,
    R: Read,
{
    pub fn new(reader: &'reader mut R, bits: Bits) -> Self {
        FlagReader {
            reader,
            bits,
            flags: E::default(),
            pos: 0,
            value: 0,
            bytes: 0,
        }
    }

    pub fn add<I: IntoIterator<Item = E>>(&mut self, flags: I) -> Result<()> {
        for flag in flags {
            if self.pos == 0 {
                self.bytes += 1;
                self.value = self.reader.read_u8()?;
            }

            if self.value & (1 << self.pos) != 0 {
                self.flags |= flag;
            }

            self.pos = (self.pos + 1) % u8::BITS as usize;
        }

        Ok(())
    }

    /// Consumes any padding byte and returns the accumulated set. Unregistered
    /// bits in the final byte are ignored but their byte is still consumed.
    pub fn finalize(self) -> Result<E> {
        if self.bits == Bits::Bits16 && self.bytes % 2 != 0 {
            self.reader.read_u8()?;
        }
        Ok(self.flags)
    }
}

pub mod read_flags {
    macro_rules! read_flags {
        ($reader:expr, $bits:expr $(,)?) => {{
            let flag_reader = crate::flag_reader::FlagReader::new($reader, $bits);
            flag_reader.finalize()
        }};

        ($reader:expr, $bits:expr, [$($flags:expr),+ $(,)?]) => {{
            let mut flag_reader = crate::flag_reader::FlagReader::new($reader, $bits);
            flag_reader.add([$($flags),+])?;
            flag_reader.finalize()
        }};

        ($reader:expr, $bits:expr, [$($flags:expr),+ $(,)?], $($rest:tt)*) => {{
            let mut flag_reader = crate::flag_reader::FlagReader::new($reader, $bits);
            flag_reader.add([$($flags),+])?;
            crate::flag_reader::read_flags::read_flags_internal!(flag_reader, $($rest)*)
        }};

        ($reader:expr, $bits:expr, if $cond:expr => $flag:expr) => {{
            let mut flag_reader = crate::flag_reader::FlagReader::new($reader, $bits);
            if $cond {
                flag_reader.add($flag)?;
            }
            flag_reader.finalize()
        }};

        ($reader:expr, $bits:expr, if $cond:expr => $flag:expr, $($rest:tt)*) => {{
            let mut flag_reader = crate::flag_reader::FlagReader::new($reader, $bits);
            if $cond {
                flag_reader.add($flag)?;
            }
            crate::flag_reader::read_flags::read_flags_internal!(flag_reader, $($rest)*)
        }};

        ($reader:expr, $bits:expr, $flag:expr) => {{
            let mut flag_reader = crate::flag_reader::FlagReader::new($reader, $bits);
            flag_reader.add($flag)?;
            flag_reader.finalize()
        }};

        ($reader:expr, $bits:expr, $flag:expr, $($rest:tt)*) => {{
            let mut flag_reader = crate::flag_reader::FlagReader::new($reader, $bits);
            flag_reader.add($flag)?;
            crate::flag_reader::read_flags::read_flags_internal!(flag_reader, $($rest)*)
        }};
    }

    macro_rules! read_flags_internal {
        ($reader:expr) => {
            $reader.finalize()
        };

        ($reader:expr, [$($flags:expr),+ $(,)?]) => {{
            $reader.add([$($flags),+])?;
            $reader.finalize()
        }};

        ($reader:expr, [$($flags:expr),+ $(,)?], $($rest:tt)*) => {{
            $reader.add([$($flags),+])?;
            crate::flag_reader::read_flags::read_flags_internal!($reader, $($rest)*)
        }};

        ($reader:expr, if $cond:expr => $flag:expr) => {{
            if $cond {
                $reader.add($flag)?;
            }
            $reader.finalize()
        }};

        ($reader:expr, if $cond:expr => $flag:expr, $($rest:tt)*) => {{
            if $cond {
                $reader.add($flag)?;
            }
            crate::flag_reader::read_flags::read_flags_internal!($reader, $($rest)*)
        }};

        ($reader:expr, $flag:expr) => {{
            $reader.add($flag)?;
            $reader.finalize()
        }};

        ($reader:expr, $flag:expr, $($rest:tt)*) => {{
            $reader.add($flag)?;
            crate::flag_reader::read_flags::read_flags_internal!($reader, $($rest)*)
        }};
    }

    pub(crate) use read_flags;
    pub(crate) use read_flags_internal;
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use bitflags::bitflags;
    use rstest::rstest;

    use crate::flag_reader::FlagReader;
    use crate::version::Bits;

    bitflags! {
        #[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
        struct TestFlags: u16 {
            const A = 1 << 0;
            const B = 1 << 1;
            const C = 1 << 2;
            const D = 1 << 3;
            const E = 1 << 4;
            const F = 1 << 5;
            const G = 1 << 6;
            const H = 1 << 7;
            const I = 1 << 8;
            const J = 1 << 9;
        }
    }

    const CATALOG: [TestFlags; 10] = [
        TestFlags::A,
        TestFlags::B,
        TestFlags::C,
        TestFlags::D,
        TestFlags::E,
        TestFlags::F,
        TestFlags::G,
        TestFlags::H,
        TestFlags::I,
        TestFlags::J,
    ];

    fn encode(set: TestFlags, catalog: &[TestFlags]) -> Vec<u8> {
        let mut bytes = vec![0_u8; catalog.len().div_ceil(8)];
        for (position, flag) in catalog.iter().enumerate() {
            if set.contains(*flag) {
                bytes[position / 8] |= 1 << (position % 8);
            }
        }
        bytes
    }

    #[rstest]
    #[case(TestFlags::empty())]
    #[case(TestFlags::A)]
    #[case(TestFlags::A | TestFlags::H)]
    #[case(TestFlags::B | TestFlags::I | TestFlags::J)]
    #[case(TestFlags::all())]
    fn round_trip(#[case] set: TestFlags) {
        let encoded = encode(set, &CATALOG);
        let mut reader = Cursor::new(encoded);

        let mut flag_reader = FlagReader::new(&mut reader, Bits::Bits32);
        flag_reader.add(CATALOG).unwrap();
        assert_eq!(flag_reader.finalize().unwrap(), set);
    }

    #[test]
    fn registration_order_defines_positions() {
        // Byte 0b01 sets the first *registered* flag, whichever it is.
        let mut reader = Cursor::new([0b0000_0001_u8]);
        let mut flag_reader = FlagReader::new(&mut reader, Bits::Bits32);
        flag_reader.add([TestFlags::J, TestFlags::A]).unwrap();
        assert_eq!(flag_reader.finalize().unwrap(), TestFlags::J);
    }

    #[test]
    fn unregistered_bits_are_ignored() {
        let mut reader = Cursor::new([0b1111_1111_u8]);
        let mut flag_reader = FlagReader::new(&mut reader, Bits::Bits32);
        flag_reader.add([TestFlags::A, TestFlags::B]).unwrap();
        assert_eq!(
            flag_reader.finalize().unwrap(),
            TestFlags::A | TestFlags::B
        );
    }

    #[test]
    fn bits16_pads_to_word_boundary() {
        let mut reader = Cursor::new([0b0000_0001_u8, 0xFF, 0xAB]);
        let mut flag_reader = FlagReader::new(&mut reader, Bits::Bits16);
        flag_reader.add([TestFlags::A, TestFlags::B]).unwrap();
        assert_eq!(flag_reader.finalize().unwrap(), TestFlags::A);
        // One flag byte plus one padding byte were consumed.
        assert_eq!(reader.position(), 2);
    }

    #[test]
    fn bits32_consumes_exact_bytes() {
        let mut reader = Cursor::new([0b0000_0001_u8, 0x00, 0xAB]);
        let mut flag_reader = FlagReader::new(&mut reader, Bits::Bits32);
        flag_reader.add(CATALOG).unwrap();
        assert_eq!(flag_reader.finalize().unwrap(), TestFlags::A);
        assert_eq!(reader.position(), 2);
    }
}
