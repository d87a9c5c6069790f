// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Accumulates the descriptors seen so far in a stream. A descriptor is
//! created at first occurrence; any later OBU with the same id must be
//! byte-identical to the one already stored, or the stream is not
//! decodable ([`Error::InvalidState`]) — this applies whether or not the
//! OBU's own `is_redundant` header bit is set, since the wire bit is
//! advisory and the payload is the source of truth.

use std::collections::HashMap;

use iamf_core::errors::{Error, Result};

use super::audio_element::AudioElement;
use super::codec_config::CodecConfig;
use super::mix_presentation::MixPresentation;
use super::version::IamfVersion;

struct Entry<T> {
    value: T,
    raw: Vec<u8>,
}

fn upsert<T>(
    map: &mut HashMap<u64, Entry<T>>,
    generation: &mut u64,
    id: u64,
    value: T,
    raw: &[u8],
) -> Result<()> {
    match map.get(&id) {
        Some(existing) if existing.raw != raw => {
            Err(Error::InvalidState("descriptor id redefined with a different payload"))
        }
        Some(_) => Ok(()), // byte-identical redundant OBU: no-op
        None => {
            map.insert(id, Entry { value, raw: raw.to_vec() });
            *generation += 1;
            Ok(())
        }
    }
}

#[derive(Default)]
pub struct DescriptorDatabase {
    version: Option<IamfVersion>,
    version_raw: Option<Vec<u8>>,
    codec_configs: HashMap<u64, Entry<CodecConfig>>,
    audio_elements: HashMap<u64, Entry<AudioElement>>,
    mix_presentations: HashMap<u64, Entry<MixPresentation>>,
    /// Bumped every time a new descriptor id is inserted (byte-identical
    /// redefinitions do not bump it). The resolver's pipeline-plan cache is
    /// keyed on this value so it only recomputes when the database actually
    /// gained new information.
    generation: u64,
}

impl DescriptorDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// `IAMFVersion` has no id of its own; exactly one may be stored, and a
    /// later arrival must be byte-identical to the first.
    pub fn set_version(&mut self, version: IamfVersion, raw: &[u8]) -> Result<()> {
        match &self.version_raw {
            Some(existing) if existing.as_slice() != raw => {
                Err(Error::InvalidState("IAMFVersion redefined with a different payload"))
            }
            Some(_) => Ok(()),
            None => {
                self.version_raw = Some(raw.to_vec());
                self.version = Some(version);
                self.generation += 1;
                Ok(())
            }
        }
    }

    pub fn version(&self) -> Option<&IamfVersion> {
        self.version.as_ref()
    }

    pub fn insert_codec_config(&mut self, config: CodecConfig, raw: &[u8]) -> Result<()> {
        upsert(&mut self.codec_configs, &mut self.generation, config.id, config, raw)
    }

    pub fn codec_config(&self, id: u64) -> Option<&CodecConfig> {
        self.codec_configs.get(&id).map(|e| &e.value)
    }

    pub fn insert_audio_element(&mut self, element: AudioElement, raw: &[u8]) -> Result<()> {
        upsert(&mut self.audio_elements, &mut self.generation, element.id, element, raw)
    }

    pub fn audio_element(&self, id: u64) -> Option<&AudioElement> {
        self.audio_elements.get(&id).map(|e| &e.value)
    }

    pub fn insert_mix_presentation(&mut self, mp: MixPresentation, raw: &[u8]) -> Result<()> {
        upsert(&mut self.mix_presentations, &mut self.generation, mp.id, mp, raw)
    }

    pub fn mix_presentation(&self, id: u64) -> Option<&MixPresentation> {
        self.mix_presentations.get(&id).map(|e| &e.value)
    }
}
