/// A stored file or stream checksum. The algorithm is selected by the format
/// revision that wrote the installer, not by the data itself.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Checksum {
    Adler32(u32),
    Crc32(u32),
    Md5([u8; 16]),
    Sha1([u8; 20]),
}
