// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use iamf_core::errors::{Error, Result};
use iamf_core::io::ReadBytes;

/// The IAMF profile declared by the stream's `IAMFVersion` descriptor.
/// Exactly one `IAMFVersion` must arrive before any other descriptor.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Profile {
    Simple,
    Base,
    BaseEnhanced,
}

impl Profile {
    fn from_u8(v: u8) -> Result<Self> {
        match v {
            0 => Ok(Profile::Simple),
            1 => Ok(Profile::Base),
            2 => Ok(Profile::BaseEnhanced),
            _ => Err(Error::UnsupportedProfile(v)),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct IamfVersion {
    pub profile_primary: Profile,
    pub profile_additional: Profile,
}

const MAGIC: [u8; 4] = *b"iamf";

impl IamfVersion {
    /// Parses the `IAMFVersion` descriptor payload: a 4-byte "iamf" magic
    /// followed by two profile bytes.
    pub fn parse<R: ReadBytes>(r: &mut R) -> Result<IamfVersion> {
        let mut magic = [0u8; 4];
        r.read_buf_exact(&mut magic)?;
        if magic != MAGIC {
            return Err(Error::Malformed("IAMFVersion magic mismatch"));
        }
        let profile_primary = Profile::from_u8(r.read_u8()?)?;
        let profile_additional = Profile::from_u8(r.read_u8()?)?;
        Ok(IamfVersion { profile_primary, profile_additional })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iamf_core::io::BufReader;

    #[test]
    fn parses_valid_version_descriptor() {
        let bytes = [b'i', b'a', b'm', b'f', 1, 0];
        let mut r = BufReader::new(&bytes);
        let v = IamfVersion::parse(&mut r).unwrap();
        assert_eq!(v.profile_primary, Profile::Base);
        assert_eq!(v.profile_additional, Profile::Simple);
    }

    #[test]
    fn rejects_bad_magic() {
        let bytes = [b'x', b'x', b'x', b'x', 0, 0];
        let mut r = BufReader::new(&bytes);
        assert!(matches!(IamfVersion::parse(&mut r), Err(Error::Malformed(_))));
    }

    #[test]
    fn rejects_out_of_range_profile() {
        let bytes = [b'i', b'a', b'm', b'f', 9, 0];
        let mut r = BufReader::new(&bytes);
        assert!(matches!(IamfVersion::parse(&mut r), Err(Error::UnsupportedProfile(9))));
    }
}
