// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `errors` module defines the common error type returned by every
//! fallible operation in the IAMF decoder runtime.

use std::fmt;

/// `Error` enumerates every way a decode, parse, or render operation can
/// fail. The variants double as the "error codes" of the external interface
/// and the "error taxonomy" of the error handling design: callers match on
/// the variant to decide whether to retry, drop a frame, or abort the
/// stream.
#[derive(Debug)]
pub enum Error {
    /// The byte span ended before a fully-framed OBU could be read. The
    /// caller should feed more bytes and retry.
    Truncated,
    /// A leb128 chain exceeded 8 bytes, overflowed, or a field was otherwise
    /// not well-formed at the bit level.
    Malformed(&'static str),
    /// An enumerated or range-checked field held a value outside its
    /// declared domain.
    InvalidValue(&'static str),
    /// The stream is not decodable in any profile this runtime supports
    /// (includes the redundant-OBU-payload-mismatch case).
    InvalidState(&'static str),
    /// The stream declares a profile this runtime does not claim to
    /// support.
    UnsupportedProfile(u8),
    /// A native codec adapter failed to decode a frame. The affected
    /// substream's output is zero-filled and it is flagged for
    /// reinitialization; this error is informational for the caller.
    CodecError(&'static str),
    /// A pull arrived before enough bytes had been fed to complete a frame.
    /// Not a failure: transient back-pressure.
    NeedMoreData,
    /// A frame's declared size exceeded `samples_per_frame` for its codec
    /// config.
    FrameTooLarge,
    /// `value_at` was called for a parameter id with no segment covering
    /// (or following) the requested sample and no prior segment either.
    NoParameter,
    /// Allocation failed; fatal to the decoder instance.
    AllocationFailure,
    /// Catch-all for conditions that do not fit another variant.
    Other(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Error::Truncated => write!(f, "truncated OBU stream"),
            Error::Malformed(msg) => write!(f, "malformed bitstream: {}", msg),
            Error::InvalidValue(field) => write!(f, "invalid value for field: {}", field),
            Error::InvalidState(msg) => write!(f, "stream is not decodable: {}", msg),
            Error::UnsupportedProfile(p) => write!(f, "unsupported profile: {}", p),
            Error::CodecError(msg) => write!(f, "codec adapter error: {}", msg),
            Error::NeedMoreData => write!(f, "need more data"),
            Error::FrameTooLarge => write!(f, "frame exceeds declared frame size"),
            Error::NoParameter => write!(f, "no parameter segment available"),
            Error::AllocationFailure => write!(f, "allocation failure"),
            Error::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;

/// Convenience constructor for a malformed-bitstream error.
pub fn malformed_error<T>(desc: &'static str) -> Result<T> {
    Err(Error::Malformed(desc))
}

/// Convenience constructor for an invalid-value error.
pub fn invalid_value_error<T>(field: &'static str) -> Result<T> {
    Err(Error::InvalidValue(field))
}

/// Convenience constructor for an invalid-state error.
pub fn invalid_state_error<T>(desc: &'static str) -> Result<T> {
    Err(Error::InvalidState(desc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_non_empty_for_every_variant() {
        let variants = [
            Error::Truncated,
            Error::Malformed("x"),
            Error::InvalidValue("field"),
            Error::InvalidState("x"),
            Error::UnsupportedProfile(3),
            Error::CodecError("x"),
            Error::NeedMoreData,
            Error::FrameTooLarge,
            Error::NoParameter,
            Error::AllocationFailure,
            Error::Other("x"),
        ];
        for e in variants {
            assert!(!e.to_string().is_empty());
        }
    }
}
