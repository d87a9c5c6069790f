// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Descriptor OBU payloads: the stream-level entities (`IAMFVersion`,
//! `CodecConfig`, `AudioElement`, `MixPresentation`) that must all arrive
//! before audio frames can be decoded, plus the [`database::DescriptorDatabase`]
//! that accumulates and deduplicates them.

pub mod audio_element;
pub mod codec_config;
pub mod database;
pub mod mix_presentation;
pub mod version;

pub use audio_element::{AmbisonicsConf, AmbisonicsMode, AudioElement, AudioElementConf, ChannelConf, Layer};
pub use codec_config::{CodecConfig, CodecId, PcmCodecSpecific};
pub use database::DescriptorDatabase;
pub use mix_presentation::{Layout, LayoutTarget, Loudness, MixPresentation, SubMix, SubMixElement};
pub use version::{IamfVersion, Profile};
