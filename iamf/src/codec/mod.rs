// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The codec adapter port (§4.5/§6a): the uniform interface every
//! per-substream decoder is wrapped behind, so the rest of the pipeline
//! never branches on [`crate::descriptors::codec_config::CodecId`] past the
//! point a substream is routed to its adapter.
//!
//! Only [`pcm::PcmAdapter`] ships a full decode loop; AAC/Opus/FLAC are
//! reachable through the same port but this runtime does not bundle a
//! decoder for them (see `DESIGN.md`) — a caller links one in by
//! implementing [`CodecPort`] and registering it with the [`crate::decoder::Decoder`].

pub mod pcm;

use iamf_core::audio::PlanarAudio;
use iamf_core::errors::Result;

/// One statistic reported back to the caller after each substream decode
/// (§7 [ADD] — the ambient instrumentation a production decode loop needs
/// to log or expose as metrics, distinct from the `log` crate's
/// unstructured trace output).
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct FrameReport {
    pub samples_decoded: usize,
    /// Number of samples this call fell short of the frame's declared
    /// `samples_per_frame`; non-zero only on a partial/final frame or a
    /// recovered codec error (zero-filled up to the frame size).
    pub shortfall: usize,
}

/// A per-substream decoder, wrapped behind a uniform interface regardless
/// of which [`crate::descriptors::codec_config::CodecId`] it implements.
///
/// Implementations own their own per-substream state (e.g. a bitstream
/// decoder's internal history); the pipeline creates one instance per
/// substream id and keeps it alive for the stream's duration.
pub trait CodecPort: Send {
    /// Decodes one frame's worth of substream payload bytes into planar
    /// float audio at the channel count this substream was configured
    /// with. `num_samples` is the frame's expected sample count
    /// (`samples_per_frame`, or fewer for a final/trimmed frame); a short
    /// decode is zero-filled by the caller, not by the adapter.
    fn decode(&mut self, payload: &[u8], num_samples: usize) -> Result<(PlanarAudio, FrameReport)>;

    /// Resets any decoder-internal history (e.g. after a discontinuity or
    /// a redundant-OBU-triggered reinitialization).
    fn reset(&mut self);
}
