//! Decoder for the setup payload embedded in Inno Setup installer
//! executables.
//!
//! An installer is a Windows PE image carrying a setup loader table in an
//! `RT_RCDATA` resource, a version banner, and a sequence of entry records
//! whose on-disk layout varies with the format revision. [`pe::Pe`] locates
//! the resource, [`SetupLoader`] decodes the loader table, and the [`entry`]
//! decoders read the records themselves, driven by a [`KnownVersion`].
//!
//! Decompressing the setup data and writing files out is left to callers.

mod crypto;
mod encoding;
pub mod entry;
mod enum_value;
mod flag_reader;
mod loader;
pub mod pe;
pub mod time;
mod version;
mod windows_version;

pub use crypto::{Adler32, Checksum};
pub use loader::{
    LoaderError, SETUP_LOADER_OFFSET, SETUP_LOADER_RESOURCE, SetupLoader, SetupLoaderOffset,
};
pub use version::{Bits, InnoVersion, KnownVersion, VersionFlags};
pub use windows_version::WindowsVersionRange;
