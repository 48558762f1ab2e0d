mod adler32;
mod checksum;

pub use adler32::Adler32;
pub use checksum::Checksum;
