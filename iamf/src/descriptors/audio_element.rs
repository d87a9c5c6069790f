// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use iamf_core::audio::channels::ScalableLayout;
use iamf_core::errors::{Error, Result};
use iamf_core::io::ReadBytes;

use crate::parameter::{ParameterBase, ParameterType};

/// One rung of a channel-based audio element's scalable layer stack.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Layer {
    pub loudspeaker_layout: ScalableLayout,
    pub output_gain: Option<i16>,
    pub recon_gain_flag: bool,
    pub n_substreams: u8,
    pub n_coupled_substreams: u8,
}

impl Layer {
    fn parse<R: ReadBytes>(r: &mut R) -> Result<Layer> {
        let b = r.read_u8()?;
        let layout_tag = b >> 4;
        let output_gain_flag = b & 0b0000_1000 != 0;
        let recon_gain_flag = b & 0b0000_0100 != 0;
        let loudspeaker_layout = ScalableLayout::from_channel_count(match layout_tag {
            0 => 1,
            1 => 2,
            2 => 6,
            3 => 8,
            4 => 10,
            5 => 12,
            _ => return Err(Error::InvalidValue("layer.loudspeaker_layout")),
        })
        .expect("layout_tag mapped to a valid channel count");

        let n_substreams = r.read_u8()?;
        let n_coupled_substreams = r.read_u8()?;

        let output_gain = if output_gain_flag {
            let _flags = r.read_u8()?;
            Some(r.read_be_i16()?)
        } else {
            None
        };

        Ok(Layer {
            loudspeaker_layout,
            output_gain,
            recon_gain_flag,
            n_substreams,
            n_coupled_substreams,
        })
    }
}

/// A channel-based audio element's layer stack.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelConf {
    pub layers: Vec<Layer>,
}

impl ChannelConf {
    fn parse<R: ReadBytes>(r: &mut R) -> Result<ChannelConf> {
        let n_layers = r.read_u8()?;
        let mut layers = Vec::with_capacity(n_layers as usize);
        for _ in 0..n_layers {
            layers.push(Layer::parse(r)?);
        }
        Ok(ChannelConf { layers })
    }

    /// Validates the layer-stack invariants: recon gain is only permitted
    /// on a layer whose layout strictly dominates its immediate
    /// predecessor (monotonically increasing in the scalable ladder), and
    /// the total substream count across layers must equal the element's
    /// declared substream count.
    fn validate(&self, declared_substream_count: usize) -> Result<()> {
        let mut total_substreams: usize = 0;
        for (i, layer) in self.layers.iter().enumerate() {
            total_substreams += layer.n_substreams as usize;
            if layer.recon_gain_flag {
                if i == 0 {
                    return Err(Error::InvalidState(
                        "first layer cannot carry recon_gain_flag (no predecessor to dominate)",
                    ));
                }
                if layer.loudspeaker_layout <= self.layers[i - 1].loudspeaker_layout {
                    return Err(Error::InvalidState(
                        "recon_gain_flag set on a layer that does not strictly dominate its predecessor",
                    ));
                }
            }
        }
        if total_substreams != declared_substream_count {
            return Err(Error::InvalidState(
                "sum of layer substream counts does not match the element's substream_ids",
            ));
        }
        Ok(())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AmbisonicsMode {
    Mono,
    Projection,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AmbisonicsConf {
    pub mode: AmbisonicsMode,
    pub out_channels: u8,
    pub n_substreams: u8,
    pub n_coupled_substreams: u8,
    pub mapping_bytes: Vec<u8>,
}

impl AmbisonicsConf {
    fn parse<R: ReadBytes>(r: &mut R) -> Result<AmbisonicsConf> {
        let mode_tag = r.read_leb128()?;
        let mode = match mode_tag {
            0 => AmbisonicsMode::Mono,
            1 => AmbisonicsMode::Projection,
            _ => return Err(Error::InvalidValue("ambisonics_conf.mode")),
        };

        let out_channels = r.read_u8()?;
        let n_substreams = r.read_u8()?;

        let (n_coupled_substreams, mapping_size) = match mode {
            AmbisonicsMode::Mono => (0, out_channels as usize),
            AmbisonicsMode::Projection => {
                let n_coupled = r.read_u8()?;
                let size = 2 * out_channels as usize * (n_substreams as usize + n_coupled as usize);
                (n_coupled, size)
            }
        };

        let mut mapping_bytes = vec![0u8; mapping_size];
        r.read_buf_exact(&mut mapping_bytes)?;

        Ok(AmbisonicsConf {
            mode,
            out_channels,
            n_substreams,
            n_coupled_substreams,
            mapping_bytes,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AudioElementConf {
    Channel(ChannelConf),
    Ambisonics(AmbisonicsConf),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AudioElement {
    pub id: u64,
    pub codec_config_id: u64,
    pub substream_ids: Vec<u64>,
    pub parameter_defs: Vec<ParameterBase>,
    pub conf: AudioElementConf,
}

impl AudioElement {
    pub fn parse<R: ReadBytes>(r: &mut R) -> Result<AudioElement> {
        let id = r.read_leb128()?;
        let kind_tag = r.read_u8()?;
        let codec_config_id = r.read_leb128()?;

        let n_substreams = r.read_leb128()?;
        let mut substream_ids = Vec::with_capacity(n_substreams as usize);
        for _ in 0..n_substreams {
            substream_ids.push(r.read_leb128()?);
        }

        let n_params = r.read_leb128()?;
        let mut parameter_defs = Vec::with_capacity(n_params as usize);
        for _ in 0..n_params {
            let ptype_tag = r.read_u8()?;
            let ptype = parameter_type_from_tag(ptype_tag)?;
            parameter_defs.push(ParameterBase::parse(r, ptype)?);
        }

        let conf = match kind_tag {
            0 => {
                let channel_conf = ChannelConf::parse(r)?;
                channel_conf.validate(substream_ids.len())?;
                AudioElementConf::Channel(channel_conf)
            }
            1 => AudioElementConf::Ambisonics(AmbisonicsConf::parse(r)?),
            _ => return Err(Error::InvalidValue("audio_element.kind")),
        };

        Ok(AudioElement { id, codec_config_id, substream_ids, parameter_defs, conf })
    }
}

fn parameter_type_from_tag(tag: u8) -> Result<ParameterType> {
    match tag {
        0 => Ok(ParameterType::MixGain),
        1 => Ok(ParameterType::DemixingMode),
        2 => Ok(ParameterType::ReconGain),
        _ => Err(Error::InvalidValue("parameter_def.type")),
    }
}
