// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `iamf` is a decoder runtime for the Immersive Audio Model and Formats
//! (IAMF) bitstream: given a byte stream of Open Bitstream Units it parses
//! descriptors, synchronises them with audio frames and parameter blocks,
//! decodes sub-streams through a pluggable per-codec adapter, demixes and
//! renders the result to a user-selected output layout, and quantises the
//! rendered PCM for interleaved output.
//!
//! The pipeline, leaves first:
//!
//! - [`obu`] splits a byte span into framed Open Bitstream Units.
//! - [`descriptors`] parses and accumulates the typed stream-level entities
//!   (`IAMFVersion`, `CodecConfig`, `AudioElement`, `MixPresentation`).
//! - [`parameter`] holds one time-line per parameter id and answers
//!   `value_at(sample)` queries by interpolation.
//! - [`resolver`] turns a `(mix presentation, output layout)` selection
//!   into a concrete per-element decode/demix/render plan.
//! - [`codec`] is the uniform adapter every native codec decoder is wrapped
//!   behind; only the PCM adapter ships a full decode loop.
//! - [`render`] holds the demixer, the M2M/H2M matrix kernels, and the LFE
//!   filter.
//! - [`binaural`] is the thin port a binaural renderer is plugged in
//!   behind.
//! - [`mixer`] sums rendered elements with their mix-gain automation.
//! - [`output`] quantises and interleaves the final PCM, and hosts the
//!   optional true-peak meter.
//! - [`decoder`] wires all of the above into the top-level `Decoder` type.

pub mod binaural;
pub mod codec;
pub mod decoder;
pub mod descriptors;
pub mod layout;
pub mod mixer;
pub mod obu;
pub mod output;
pub mod parameter;
pub mod render;
pub mod resolver;

pub use decoder::Decoder;
