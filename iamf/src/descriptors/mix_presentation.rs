// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use iamf_core::audio::channels::{Position, SoundSystem};
use iamf_core::errors::{Error, Result};
use iamf_core::io::ReadBytes;

use crate::parameter::{ParameterBase, ParameterType};

/// The output layout a [`MixPresentation`]'s loudness metadata was measured
/// against, or that a renderer may target directly.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LayoutTarget {
    /// An explicit loudspeaker-position bitmask ("SP label"), independent
    /// of any named sound system.
    SpLabel(Position),
    SoundSystem(SoundSystem),
    Binaural,
}

impl LayoutTarget {
    fn parse<R: ReadBytes>(r: &mut R) -> Result<LayoutTarget> {
        let tag = r.read_u8()?;
        match tag {
            0 => Ok(LayoutTarget::SpLabel(Position::from_bits_truncate(r.read_be_u32()?))),
            1 => Ok(LayoutTarget::SoundSystem(sound_system_from_tag(r.read_u8()?)?)),
            2 => Ok(LayoutTarget::Binaural),
            _ => Err(Error::InvalidValue("layout_target.tag")),
        }
    }
}

fn sound_system_from_tag(tag: u8) -> Result<SoundSystem> {
    match tag {
        0 => Ok(SoundSystem::A),
        1 => Ok(SoundSystem::B),
        2 => Ok(SoundSystem::C),
        3 => Ok(SoundSystem::D),
        4 => Ok(SoundSystem::E),
        5 => Ok(SoundSystem::F),
        6 => Ok(SoundSystem::G),
        7 => Ok(SoundSystem::H),
        8 => Ok(SoundSystem::I),
        9 => Ok(SoundSystem::J),
        10 => Ok(SoundSystem::Ext712),
        11 => Ok(SoundSystem::Ext312),
        12 => Ok(SoundSystem::Ext916),
        13 => Ok(SoundSystem::Mono),
        _ => Err(Error::InvalidValue("layout_target.sound_system")),
    }
}

/// Loudness metadata measured for a [`Layout`]'s target. `true_peak` is
/// only present when `info_type` flags it (it is the one optional field per
/// the data model).
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Loudness {
    pub info_type: u8,
    pub integrated: i16,
    pub digital_peak: i16,
    pub true_peak: Option<i16>,
}

const LOUDNESS_HAS_TRUE_PEAK: u8 = 0b0000_0001;

impl Loudness {
    fn parse<R: ReadBytes>(r: &mut R) -> Result<Loudness> {
        let info_type = r.read_u8()?;
        let integrated = r.read_be_i16()?;
        let digital_peak = r.read_be_i16()?;
        let true_peak = if info_type & LOUDNESS_HAS_TRUE_PEAK != 0 {
            Some(r.read_be_i16()?)
        } else {
            None
        };
        Ok(Loudness { info_type, integrated, digital_peak, true_peak })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Layout {
    pub target: LayoutTarget,
    pub loudness: Loudness,
}

/// A mix of an `element_mix` gain applied to `audio_element_id`'s rendered
/// output before summation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubMixElement {
    pub audio_element_id: u64,
    pub label: String,
    pub element_mix_base: ParameterBase,
    pub element_mix_default_gain: i16,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SubMix {
    pub elements: Vec<SubMixElement>,
    pub output_mix_base: ParameterBase,
    pub output_mix_default_gain: i16,
    pub layouts: Vec<Layout>,
}

impl SubMix {
    fn parse<R: ReadBytes>(r: &mut R) -> Result<SubMix> {
        let n_elements = r.read_leb128()?;
        let mut elements = Vec::with_capacity(n_elements as usize);
        for _ in 0..n_elements {
            let audio_element_id = r.read_leb128()?;
            let label = r.read_null_terminated_str()?;
            let element_mix_base = ParameterBase::parse(r, ParameterType::MixGain)?;
            let element_mix_default_gain = r.read_be_i16()?;
            elements.push(SubMixElement {
                audio_element_id,
                label,
                element_mix_base,
                element_mix_default_gain,
            });
        }

        let output_mix_base = ParameterBase::parse(r, ParameterType::MixGain)?;
        let output_mix_default_gain = r.read_be_i16()?;

        let n_layouts = r.read_leb128()?;
        let mut layouts = Vec::with_capacity(n_layouts as usize);
        for _ in 0..n_layouts {
            let target = LayoutTarget::parse(r)?;
            let loudness = Loudness::parse(r)?;
            layouts.push(Layout { target, loudness });
        }

        Ok(SubMix { elements, output_mix_base, output_mix_default_gain, layouts })
    }
}

/// A `MixPresentation` descriptor. The data model allows exactly one
/// `sub_mix` per presentation (IAMF's `num_sub_mixes` field is retained on
/// the wire for forward compatibility but every value other than 1 is
/// rejected here, matching this runtime's supported profile set).
#[derive(Clone, Debug, PartialEq)]
pub struct MixPresentation {
    pub id: u64,
    pub label: String,
    pub sub_mix: SubMix,
}

impl MixPresentation {
    pub fn parse<R: ReadBytes>(r: &mut R) -> Result<MixPresentation> {
        let id = r.read_leb128()?;
        let label = r.read_null_terminated_str()?;
        let n_sub_mixes = r.read_leb128()?;
        if n_sub_mixes != 1 {
            return Err(Error::InvalidState("mix_presentation.num_sub_mixes must be 1"));
        }
        let sub_mix = SubMix::parse(r)?;
        Ok(MixPresentation { id, label, sub_mix })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iamf_core::io::BufReader;

    fn stream_defined_base_bytes() -> Vec<u8> {
        vec![0, 48, 0] // id=0, rate=48, obu_defined=false
    }

    #[test]
    fn parses_single_element_single_layout_presentation() {
        let mut bytes = vec![100u8]; // id = 100
        bytes.push(0); // label = "" (null terminator only)
        bytes.push(1); // n_sub_mixes = 1

        bytes.push(1); // n_elements = 1
        bytes.push(1); // audio_element_id = 1
        bytes.push(0); // element label = ""
        bytes.extend(stream_defined_base_bytes()); // element_mix param base
        bytes.extend(0i16.to_be_bytes()); // element_mix_default_gain = 0

        bytes.extend(stream_defined_base_bytes()); // output_mix param base
        bytes.extend(0i16.to_be_bytes()); // output_mix_default_gain = 0

        bytes.push(1); // n_layouts = 1
        bytes.push(1); // target tag = SoundSystem
        bytes.push(1); // SoundSystem::B
        bytes.push(0); // loudness.info_type = 0 (no true peak)
        bytes.extend(0i16.to_be_bytes()); // integrated
        bytes.extend(0i16.to_be_bytes()); // digital_peak

        let mut r = BufReader::new(&bytes);
        let mp = MixPresentation::parse(&mut r).unwrap();
        assert_eq!(mp.id, 100);
        assert_eq!(mp.sub_mix.elements.len(), 1);
        assert_eq!(mp.sub_mix.elements[0].audio_element_id, 1);
        assert_eq!(mp.sub_mix.layouts.len(), 1);
        assert_eq!(mp.sub_mix.layouts[0].target, LayoutTarget::SoundSystem(SoundSystem::B));
        assert!(mp.sub_mix.layouts[0].loudness.true_peak.is_none());
    }

    #[test]
    fn rejects_more_than_one_sub_mix() {
        let bytes = [100u8, 0, 2];
        let mut r = BufReader::new(&bytes);
        assert!(matches!(MixPresentation::parse(&mut r), Err(Error::InvalidState(_))));
    }

    #[test]
    fn loudness_with_true_peak_flag_reads_extra_field() {
        let mut bytes = vec![LOUDNESS_HAS_TRUE_PEAK];
        bytes.extend(0i16.to_be_bytes());
        bytes.extend(0i16.to_be_bytes());
        bytes.extend(100i16.to_be_bytes());
        let mut r = BufReader::new(&bytes);
        let l = Loudness::parse(&mut r).unwrap();
        assert_eq!(l.true_peak, Some(100));
    }
}
