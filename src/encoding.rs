use std::io::{self, Read};

use byteorder::{LE, ReadBytesExt};
use encoding_rs::Encoding;

/// Reads a length-prefixed string and decodes it with the installer's
/// codepage. A zero length is stored for absent strings.
pub fn encoded_string<R: Read>(
    reader: &mut R,
    encoding: &'static Encoding,
) -> io::Result<Option<String>> {
    let length = reader.read_u32::<LE>()?;
    if length == 0 {
        return Ok(None);
    }
    let mut buf = vec![0; length as usize];
    reader.read_exact(&mut buf)?;
    Ok(Some(encoding.decode(&buf).0.into_owned()))
}
