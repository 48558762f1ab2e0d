use std::io::{Read, Result};

use crate::encoding::encoded_string;
use crate::version::KnownVersion;

/// Install-time conditions shared by most entry kinds: which components,
/// tasks and languages an entry belongs to and the Pascal-script checks run
/// around it.
#[derive(Debug, Default)]
pub struct Condition {
    pub components: Option<String>,
    pub tasks: Option<String>,
    pub languages: Option<String>,
    pub check: Option<String>,
    pub after_install: Option<String>,
    pub before_install: Option<String>,
}

impl Condition {
    pub fn load<R: Read>(reader: &mut R, version: &KnownVersion) -> Result<Self> {
        let codepage = version.codepage();
        let mut condition = Self::default();

        if *version >= (2, 0, 0) || (version.is_isx() && *version >= (1, 3, 8)) {
            condition.components = encoded_string(reader, codepage)?;
        }

        if *version >= (2, 0, 0) || (version.is_isx() && *version >= (1, 3, 17)) {
            condition.tasks = encoded_string(reader, codepage)?;
        }

        if *version >= (4, 0, 1) {
            condition.languages = encoded_string(reader, codepage)?;
        }

        if *version >= (4, 0, 0) || (version.is_isx() && *version >= (1, 3, 24)) {
            condition.check = encoded_string(reader, codepage)?;
        }

        if *version >= (4, 1, 0) {
            condition.after_install = encoded_string(reader, codepage)?;
            condition.before_install = encoded_string(reader, codepage)?;
        }

        Ok(condition)
    }
}
