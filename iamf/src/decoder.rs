// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The top-level `Decoder`: wires the OBU reader, descriptor database,
//! parameter engine, resolver, codec adapters, demixer, renderers, and mix
//! engine into one incremental `feed`/`select_presentation`/`pull_frame`
//! state machine.
//!
//! `feed` accumulates bytes and dispatches every fully-framed OBU it can
//! read; `select_presentation` picks a `(mix_presentation_id, OutputLayout)`
//! pair; `pull_frame` decodes, demixes, renders and mixes exactly one coded
//! frame's worth of audio per call, returning [`Error::NeedMoreData`] when a
//! substream this frame needs has not arrived yet.

use std::collections::{HashMap, VecDeque};

use iamf_core::audio::channels::{OutputLayout, Position};
use iamf_core::audio::PlanarAudio;
use iamf_core::errors::{Error, Result};
use iamf_core::io::{BufReader, ReadBytes};

use crate::binaural::BinauralPort;
use crate::codec::pcm::PcmAdapter;
use crate::codec::CodecPort;
use crate::descriptors::audio_element::{AmbisonicsConf, AmbisonicsMode, AudioElement, AudioElementConf, ChannelConf};
use crate::descriptors::codec_config::{CodecConfig, CodecId, PcmCodecSpecific};
use crate::descriptors::version::IamfVersion;
use crate::descriptors::DescriptorDatabase;
use crate::layout::scalable_layout_positions;
use crate::obu::{ObuReader, ObuType};
use crate::parameter::{ParameterBase, ParameterBlock, ParameterEngine, ParameterType};
use crate::render::demixer::Demixer;
use crate::render::lfe::{BiquadFilter, LFE_CUTOFF_HZ};
use crate::render::matrix;
use crate::render::ChannelSet;
use crate::resolver::{ElementPlan, RendererKind, Resolver};
use crate::{layout, mixer};
use iamf_core::audio::channels::ScalableLayout;

/// A factory an embedder registers to decode a `CodecId` this runtime does
/// not bundle an adapter for (AAC, Opus, FLAC — see `DESIGN.md`).
pub type CodecFactory = Box<dyn Fn(&CodecConfig, usize) -> Result<Box<dyn CodecPort>> + Send>;

/// One substream's queued, not-yet-decoded `AudioFrame` payload.
struct PendingFrame {
    payload: Vec<u8>,
    trim_start: u64,
    trim_end: u64,
}

/// One frame of fully-mixed output audio, alongside the trim boundary the
/// caller should apply (via [`crate::output::apply_trim`]) before
/// quantising it.
pub struct RenderedFrame {
    pub audio: PlanarAudio,
    pub trim_start: u64,
    pub trim_end: u64,
}

/// The top-level IAMF decoder. Owns every piece of per-stream state: the
/// unparsed byte tail, the accumulated descriptors, the parameter
/// timelines, the resolved-plan cache, the per-substream codec adapters,
/// the per-element demixer and LFE filter state, and the optional
/// binaural renderer.
pub struct Decoder {
    buffer: Vec<u8>,
    db: DescriptorDatabase,
    params: ParameterEngine,
    parameter_bases: HashMap<u64, ParameterBase>,
    resolver: Resolver,
    codec_factories: HashMap<CodecId, CodecFactory>,
    codec_ports: HashMap<u64, Box<dyn CodecPort>>,
    pending_frames: HashMap<u64, VecDeque<PendingFrame>>,
    demixers: HashMap<u64, Demixer>,
    lfe_filters: HashMap<u64, BiquadFilter>,
    binaural: Option<Box<dyn BinauralPort>>,
    emitted_sample: u64,
    current: Option<(u64, OutputLayout)>,
    sample_rate: u32,
}

impl Decoder {
    /// `sample_rate` drives only the LFE low-pass's cutoff-to-Nyquist
    /// ratio and the `BinauralPort::init` call; every other rate-dependent
    /// quantity (`samples_per_frame`, `parameter_rate`) is read from the
    /// stream's own descriptors.
    pub fn new(sample_rate: u32) -> Self {
        Decoder {
            buffer: Vec::new(),
            db: DescriptorDatabase::new(),
            params: ParameterEngine::new(),
            parameter_bases: HashMap::new(),
            resolver: Resolver::new(),
            codec_factories: HashMap::new(),
            codec_ports: HashMap::new(),
            pending_frames: HashMap::new(),
            demixers: HashMap::new(),
            lfe_filters: HashMap::new(),
            binaural: None,
            emitted_sample: 0,
            current: None,
            sample_rate,
        }
    }

    /// Registers a decoder for a `CodecId` not natively bundled (§4.5/§6a).
    pub fn register_codec(&mut self, codec_id: CodecId, factory: CodecFactory) {
        self.codec_factories.insert(codec_id, factory);
    }

    /// Registers the binaural renderer an M2B/H2B plan is delegated to.
    pub fn register_binaural(&mut self, port: Box<dyn BinauralPort>) {
        self.binaural = Some(port);
    }

    /// Feeds more stream bytes, parsing and dispatching every OBU that is
    /// now fully framed. An OBU split across two `feed` calls is retried
    /// from scratch once enough bytes have arrived — this is why
    /// [`ObuReader`] is re-created every iteration rather than resumed.
    pub fn feed(&mut self, bytes: &[u8]) -> Result<()> {
        self.buffer.extend_from_slice(bytes);
        loop {
            let mut reader = ObuReader::new(&self.buffer);
            match reader.next_obu() {
                Ok(Some(obu)) => {
                    let consumed = reader.pos();
                    let obu_type = obu.obu_type;
                    let trim_start = obu.trim_start;
                    let trim_end = obu.trim_end;
                    let payload = obu.payload;
                    self.dispatch_obu(obu_type, trim_start, trim_end, payload)?;
                    self.buffer.drain(..consumed);
                }
                Ok(None) => break,
                Err(Error::Truncated) => break,
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    fn dispatch_obu(&mut self, obu_type: ObuType, trim_start: u64, trim_end: u64, mut payload: BufReader<'_>) -> Result<()> {
        match obu_type {
            ObuType::IaSequenceHeader => {
                let raw = payload.remaining_slice().to_vec();
                let version = IamfVersion::parse(&mut payload)?;
                self.db.set_version(version, &raw)
            }
            ObuType::CodecConfig => {
                let raw = payload.remaining_slice().to_vec();
                let config = CodecConfig::parse(&mut payload)?;
                self.db.insert_codec_config(config, &raw)
            }
            ObuType::AudioElement => {
                let raw = payload.remaining_slice().to_vec();
                let element = AudioElement::parse(&mut payload)?;
                for def in &element.parameter_defs {
                    self.parameter_bases.insert(def.parameter_id, def.clone());
                }
                self.db.insert_audio_element(element, &raw)
            }
            ObuType::MixPresentation => {
                let raw = payload.remaining_slice().to_vec();
                let mp = crate::descriptors::mix_presentation::MixPresentation::parse(&mut payload)?;
                for element in &mp.sub_mix.elements {
                    self.parameter_bases.insert(element.element_mix_base.parameter_id, element.element_mix_base.clone());
                }
                self.parameter_bases
                    .insert(mp.sub_mix.output_mix_base.parameter_id, mp.sub_mix.output_mix_base.clone());
                self.db.insert_mix_presentation(mp, &raw)
            }
            ObuType::ParameterBlock => {
                let raw = payload.remaining_slice();
                let mut peek = BufReader::new(raw);
                let parameter_id = peek.read_leb128()?;
                let base = self
                    .parameter_bases
                    .get(&parameter_id)
                    .cloned()
                    .ok_or(Error::InvalidState("parameter_block references an unknown parameter_id"))?;
                let block = ParameterBlock::parse(&mut payload, &base)?;
                self.params.append_block(block, base.ty);
                Ok(())
            }
            ObuType::AudioFrame { substream_id } => {
                let sid = match substream_id {
                    Some(id) => u64::from(id),
                    None => payload.read_leb128()?,
                };
                let frame = PendingFrame { payload: payload.remaining_slice().to_vec(), trim_start, trim_end };
                self.pending_frames.entry(sid).or_default().push_back(frame);
                Ok(())
            }
            ObuType::TemporalDelimiter | ObuType::Reserved(_) => Ok(()),
        }
    }

    /// Selects the `(mix_presentation_id, layout)` pair every subsequent
    /// `pull_frame` renders against. Fails immediately (rather than on the
    /// next `pull_frame`) if the combination does not resolve, e.g. an
    /// unknown presentation id or a layout none of its sub-mix layouts
    /// declare.
    pub fn select_presentation(&mut self, mix_presentation_id: u64, layout: OutputLayout) -> Result<()> {
        self.resolver.resolve(&self.db, mix_presentation_id, &layout)?;
        self.current = Some((mix_presentation_id, layout));
        Ok(())
    }

    /// Decodes, demixes, renders and mixes exactly one coded frame. Returns
    /// [`Error::NeedMoreData`] if any substream the current plan depends on
    /// has no queued `AudioFrame` payload yet.
    pub fn pull_frame(&mut self) -> Result<RenderedFrame> {
        let (mix_presentation_id, layout) =
            self.current.clone().ok_or(Error::InvalidState("no mix presentation/output layout selected"))?;
        let plan = self.resolver.resolve(&self.db, mix_presentation_id, &layout)?.clone();

        let num_samples = plan
            .elements
            .first()
            .and_then(|e| self.db.codec_config(e.codec_config_id))
            .map(|c| c.samples_per_frame as usize)
            .ok_or(Error::InvalidState("mix presentation has no elements to size a frame from"))?;

        let mut rendered_elements: Vec<(Vec<Vec<f32>>, f64)> = Vec::with_capacity(plan.elements.len());
        let mut trims: Option<(u64, u64)> = None;

        for element_plan in &plan.elements {
            let (channels, t_start, t_end) = self.render_element(element_plan, &plan.out_positions, num_samples)?;
            if trims.is_none() {
                trims = Some((t_start, t_end));
            }
            let gain = self
                .params
                .mix_gain_at(element_plan.element_mix_base.parameter_id, self.emitted_sample)
                .unwrap_or_else(|_| iamf_core::units::q7_8_to_linear(element_plan.element_mix_default_gain));
            rendered_elements.push((channels, gain));
        }

        let output_gain = self
            .params
            .mix_gain_at(plan.output_mix_base.parameter_id, self.emitted_sample)
            .unwrap_or_else(|_| iamf_core::units::q7_8_to_linear(plan.output_mix_default_gain));

        let mix_inputs: Vec<mixer::RenderedElement<'_>> = rendered_elements
            .iter()
            .map(|(channels, gain)| mixer::RenderedElement { channels, element_mix_gain: *gain })
            .collect();
        let mixed = mixer::mix(&mix_inputs, output_gain, plan.out_positions.len(), num_samples);

        self.params.gc(self.emitted_sample);
        self.emitted_sample += num_samples as u64;

        let (trim_start, trim_end) = trims.unwrap_or((0, 0));
        Ok(RenderedFrame { audio: PlanarAudio { channels: mixed }, trim_start, trim_end })
    }

    fn render_element(
        &mut self,
        element_plan: &ElementPlan,
        out_positions: &[Position],
        num_samples: usize,
    ) -> Result<(Vec<Vec<f32>>, u64, u64)> {
        let audio_element = self
            .db
            .audio_element(element_plan.audio_element_id)
            .ok_or(Error::InvalidState("mix presentation references an unknown audio element"))?
            .clone();

        match &element_plan.renderer {
            RendererKind::ChannelToMatrix { chosen_layer_positions, chosen_layer_index, matrix } => {
                let conf = match &audio_element.conf {
                    AudioElementConf::Channel(c) => c,
                    _ => return Err(Error::InvalidState("plan selected a channel renderer for a non-channel element")),
                };
                let (channel_set, _, t_start, t_end) =
                    self.decode_channel_element(&audio_element, conf, *chosen_layer_index, element_plan.codec_config_id, num_samples)?;
                let rendered = matrix::render(&channel_set, chosen_layer_positions, out_positions, matrix);
                let planar = rendered.into_planar(out_positions, num_samples);
                Ok((planar.channels, t_start, t_end))
            }
            RendererKind::HoaToMatrix { matrix, .. } => {
                let conf = match &audio_element.conf {
                    AudioElementConf::Ambisonics(c) => c,
                    _ => return Err(Error::InvalidState("plan selected an HOA renderer for a non-ambisonics element")),
                };
                let (acn_channels, t_start, t_end) =
                    self.decode_ambisonics_element(&audio_element, conf, element_plan.codec_config_id, num_samples)?;
                let mut rendered = matrix.apply(&acn_channels, num_samples);
                // §4.7: the LFE output row carries no direct spherical-harmonics
                // row of its own (`layout::position_angle` has no angle for it);
                // it is synthesised from a low-pass of the W (ACN 0) channel.
                for (idx, &pos) in out_positions.iter().enumerate() {
                    if pos == Position::LFE || pos == Position::LFE2 {
                        let sample_rate = f64::from(self.sample_rate);
                        let filter = self
                            .lfe_filters
                            .entry(element_plan.audio_element_id)
                            .or_insert_with(|| BiquadFilter::low_pass(LFE_CUTOFF_HZ, sample_rate));
                        rendered[idx] = filter.process_buffer(&acn_channels[0]);
                    }
                }
                Ok((rendered, t_start, t_end))
            }
            RendererKind::ToBinaural { source_is_ambisonics, chosen_layer_index } => {
                let (in_channels, t_start, t_end) = if *source_is_ambisonics {
                    let conf = match &audio_element.conf {
                        AudioElementConf::Ambisonics(c) => c,
                        _ => return Err(Error::InvalidState("binaural plan is ambisonics but element is not")),
                    };
                    self.decode_ambisonics_element(&audio_element, conf, element_plan.codec_config_id, num_samples)?
                } else {
                    let conf = match &audio_element.conf {
                        AudioElementConf::Channel(c) => c,
                        _ => return Err(Error::InvalidState("binaural plan is channel-based but element is not")),
                    };
                    let (channel_set, positions, t_start, t_end) =
                        self.decode_channel_element(&audio_element, conf, *chosen_layer_index, element_plan.codec_config_id, num_samples)?;
                    let channels = positions
                        .iter()
                        .map(|p| channel_set.get(*p).map(|s| s.to_vec()).unwrap_or_else(|| vec![0.0; num_samples]))
                        .collect();
                    (channels, t_start, t_end)
                };

                let in_channel_count = in_channels.len();
                let sample_rate = self.sample_rate;
                let binaural = self
                    .binaural
                    .as_mut()
                    .ok_or(Error::InvalidState("binaural output selected but no BinauralPort is registered"))?;
                binaural.init(element_plan.audio_element_id, in_channel_count, num_samples, sample_rate)?;
                let [l, r] = binaural.render(element_plan.audio_element_id, &in_channels, num_samples)?;
                Ok((vec![l, r], t_start, t_end))
            }
        }
    }

    /// Walks a channel-based element's scalable layer stack from the base
    /// layer up to `chosen_layer_index`, decoding each layer's substreams
    /// and, above the base layer, feeding the running [`Demixer`]. Returns
    /// the final rung's channels, its position order, and the trim fields
    /// read off the first substream payload this call consumed (every
    /// substream in a coded frame shares one trim boundary).
    fn decode_channel_element(
        &mut self,
        audio_element: &AudioElement,
        conf: &ChannelConf,
        chosen_layer_index: usize,
        codec_config_id: u64,
        num_samples: usize,
    ) -> Result<(ChannelSet, &'static [Position], u64, u64)> {
        let demixing_param =
            audio_element.parameter_defs.iter().find(|p| p.ty == ParameterType::DemixingMode);
        let recon_gain_id =
            audio_element.parameter_defs.iter().find(|p| p.ty == ParameterType::ReconGain).map(|p| p.parameter_id);
        let mode = match demixing_param {
            Some(p) => self.params.demixing_mode_at(p.parameter_id, self.emitted_sample).unwrap_or(0),
            None => 0,
        };

        // An audio element with no `DemixingMode` parameter never demixes, so
        // its `Demixer`'s starting `w`-index is never observed; elements that
        // do demix always declare one, whose `default_w` seeds the first
        // frame per `DMRenderer_open`/`DMRenderer_set_mode_weight`.
        let mut demixer = self.demixers.remove(&audio_element.id).unwrap_or_else(|| {
            let default_w_idx = demixing_param.and_then(|p| p.default_w).map_or(0, i32::from);
            Demixer::new(default_w_idx)
        });

        let mut cursor = 0usize;
        let mut cur: Option<ChannelSet> = None;
        let mut cur_positions: &'static [Position] = &[];
        let mut hidden_height: Option<(Vec<f32>, Vec<f32>)> = None;
        let mut trims: Option<(u64, u64)> = None;

        for (i, layer) in conf.layers.iter().enumerate().take(chosen_layer_index + 1) {
                let n_sub = layer.n_substreams as usize;
                let n_coupled = layer.n_coupled_substreams as usize;
                if cursor + n_sub > audio_element.substream_ids.len() {
                    return Err(Error::InvalidState("audio element layer stack exceeds its declared substream_ids"));
                }
                let ids = &audio_element.substream_ids[cursor..cursor + n_sub];
                cursor += n_sub;

                let positions: &'static [Position] =
                    if i == 0 { scalable_layout_positions(layer.loudspeaker_layout) } else { new_positions_for_layer(layer.loudspeaker_layout) };
                let mono_count = n_sub - n_coupled;

                let mut new_set = ChannelSet::new();
                for (k, &sid) in ids.iter().enumerate() {
                    if k < mono_count {
                        let (channels, t_start, t_end) = self.decode_substream(sid, codec_config_id, 1, num_samples)?;
                        trims.get_or_insert((t_start, t_end));
                        new_set.insert(positions[k], channels.into_iter().next().expect("1-channel decode"));
                    } else {
                        let pair_idx = k - mono_count;
                        let (channels, t_start, t_end) = self.decode_substream(sid, codec_config_id, 2, num_samples)?;
                        trims.get_or_insert((t_start, t_end));
                        let mut it = channels.into_iter();
                        let l = it.next().expect("2-channel decode");
                        let r = it.next().expect("2-channel decode");
                        new_set.insert(positions[mono_count + 2 * pair_idx], l);
                        new_set.insert(positions[mono_count + 2 * pair_idx + 1], r);
                    }
                }

                if i == 0 {
                    cur = Some(new_set);
                    cur_positions = positions;
                    continue;
                }

                let recon_gain = match recon_gain_id {
                    Some(id) if layer.recon_gain_flag => self.params.recon_gain_segment_at(id, self.emitted_sample).ok(),
                    _ => None,
                };
                let prev = cur.take().expect("base layer decoded before any transition runs");
                let next = match layer.loudspeaker_layout {
                    ScalableLayout::Surround5_1 => demixer.stereo_to_5_1(&prev, &new_set, mode, recon_gain)?,
                    ScalableLayout::Surround5_1_2 => {
                        let (set, hl, hr) = demixer.five_one_to_five_one_two(&prev, &new_set, mode, recon_gain)?;
                        hidden_height = Some((hl, hr));
                        set
                    }
                    ScalableLayout::Surround5_1_4 => {
                        let (hl, hr) = hidden_height
                            .as_ref()
                            .ok_or(Error::InvalidState("5.1.2 -> 5.1.4 transition missing its hidden height state"))?;
                        demixer.five_one_two_to_five_one_four(&prev, hl, hr, &new_set, mode, recon_gain)?
                    }
                    ScalableLayout::Surround7_1_4 => demixer.five_one_four_to_seven_one_four(&prev, &new_set, mode, recon_gain)?,
                    _ => return Err(Error::Other("mono-to-stereo demixing transition is not part of the scalable ladder")),
                };
                cur = Some(next);
                cur_positions = scalable_layout_positions(layer.loudspeaker_layout);
        }

        self.demixers.insert(audio_element.id, demixer);

        let mut channels = cur.ok_or(Error::InvalidState("channel-based audio element has no layers"))?;
        if let Some(gain_q7_8) = conf.layers[chosen_layer_index].output_gain {
            let gain = iamf_core::units::q7_8_to_linear(gain_q7_8) as f32;
            for &p in cur_positions {
                if let Some(samples) = channels.get(p) {
                    let scaled: Vec<f32> = samples.iter().map(|s| s * gain).collect();
                    channels.insert(p, scaled);
                }
            }
        }

        let (t_start, t_end) = trims.unwrap_or((0, 0));
        Ok((channels, cur_positions, t_start, t_end))
    }

    /// Decodes a scene-based element's raw substreams into `(order+1)^2`
    /// ACN-indexed channels, ready to feed directly into an
    /// [`crate::render::sh`] decode matrix (which is built column-major over
    /// the same ACN index order).
    fn decode_ambisonics_element(
        &mut self,
        audio_element: &AudioElement,
        conf: &AmbisonicsConf,
        codec_config_id: u64,
        num_samples: usize,
    ) -> Result<(Vec<Vec<f32>>, u64, u64)> {
        let mono_count = conf.n_substreams as usize - conf.n_coupled_substreams as usize;
        let mut raw_channels: Vec<Vec<f32>> = Vec::new();
        let mut trims: Option<(u64, u64)> = None;

        for (k, &sid) in audio_element.substream_ids.iter().enumerate() {
            let num_ch = if k < mono_count { 1 } else { 2 };
            let (channels, t_start, t_end) = self.decode_substream(sid, codec_config_id, num_ch, num_samples)?;
            trims.get_or_insert((t_start, t_end));
            raw_channels.extend(channels);
        }

        let out_channels = conf.out_channels as usize;
        let acn_channels = match conf.mode {
            // Mono mode: `mapping_bytes[acn]` is the raw decoded channel
            // that ACN index `acn` already carries (a permutation, the raw
            // channels need no mixing).
            AmbisonicsMode::Mono => (0..out_channels)
                .map(|acn| {
                    let raw_index = *conf.mapping_bytes.get(acn).unwrap_or(&(acn as u8)) as usize;
                    raw_channels.get(raw_index).cloned().unwrap_or_else(|| vec![0.0; num_samples])
                })
                .collect(),
            // Projection mode: `mapping_bytes` holds an `out_channels x
            // raw_channel_count` matrix of big-endian Q7.8 coefficients,
            // row-major over ACN index, applied as a linear combination of
            // the raw decoded channels.
            AmbisonicsMode::Projection => {
                let raw_count = raw_channels.len();
                (0..out_channels)
                    .map(|acn| {
                        let mut acc = vec![0.0f32; num_samples];
                        for (i, raw) in raw_channels.iter().enumerate().take(raw_count) {
                            let offset = 2 * (acn * raw_count + i);
                            if offset + 1 >= conf.mapping_bytes.len() {
                                continue;
                            }
                            let coeff_raw = i16::from_be_bytes([conf.mapping_bytes[offset], conf.mapping_bytes[offset + 1]]);
                            let coeff = iamf_core::units::q7_8_to_db(coeff_raw) as f32;
                            if coeff == 0.0 {
                                continue;
                            }
                            for t in 0..num_samples {
                                acc[t] += coeff * raw[t];
                            }
                        }
                        acc
                    })
                    .collect()
            }
        };

        let (t_start, t_end) = trims.unwrap_or((0, 0));
        Ok((acn_channels, t_start, t_end))
    }

    fn codec_port(&mut self, substream_id: u64, codec_config_id: u64, num_channels: usize) -> Result<()> {
        if self.codec_ports.contains_key(&substream_id) {
            return Ok(());
        }
        let cfg = self
            .db
            .codec_config(codec_config_id)
            .ok_or(Error::InvalidState("audio frame references an unknown codec_config_id"))?;
        let port: Box<dyn CodecPort> = match cfg.codec_id {
            CodecId::Pcm => {
                let spec = PcmCodecSpecific::parse(&cfg.decoder_specific_bytes)?;
                Box::new(PcmAdapter::new(spec, num_channels))
            }
            other => {
                let factory = self
                    .codec_factories
                    .get(&other)
                    .ok_or(Error::CodecError("no codec adapter registered for this codec_id"))?;
                factory(cfg, num_channels)?
            }
        };
        self.codec_ports.insert(substream_id, port);
        Ok(())
    }

    fn decode_substream(
        &mut self,
        substream_id: u64,
        codec_config_id: u64,
        num_channels: usize,
        num_samples: usize,
    ) -> Result<(Vec<Vec<f32>>, u64, u64)> {
        self.codec_port(substream_id, codec_config_id, num_channels)?;
        let frame = self
            .pending_frames
            .get_mut(&substream_id)
            .and_then(VecDeque::pop_front)
            .ok_or(Error::NeedMoreData)?;
        let port = self.codec_ports.get_mut(&substream_id).expect("just created or already present");
        let (planar, report) = port.decode(&frame.payload, num_samples)?;
        if report.shortfall > 0 {
            log::warn!("substream {substream_id}: decoded {} of {num_samples} samples", report.samples_decoded);
        }
        Ok((planar.channels, frame.trim_start, frame.trim_end))
    }
}

/// The positions a non-base scalable layer newly contributes, in the
/// decode order this runtime assumes for that layer's substreams: every
/// directly-coded mono channel before any coupled pair (§8 — an otherwise
/// wire-implicit convention resolved here, see `DESIGN.md`).
fn new_positions_for_layer(layout: ScalableLayout) -> &'static [Position] {
    use Position as P;
    match layout {
        ScalableLayout::Mono => &[P::FRONT_CENTER],
        ScalableLayout::Stereo => &[P::FRONT_LEFT, P::FRONT_RIGHT],
        ScalableLayout::Surround5_1 => &[P::FRONT_CENTER, P::LFE, P::SIDE_LEFT, P::SIDE_RIGHT],
        ScalableLayout::Surround5_1_2 => &[P::TOP_SIDE_LEFT, P::TOP_SIDE_RIGHT],
        ScalableLayout::Surround5_1_4 => &[P::TOP_REAR_LEFT, P::TOP_REAR_RIGHT],
        ScalableLayout::Surround7_1_4 => &[P::REAR_LEFT, P::REAR_RIGHT],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iamf_core::audio::channels::SoundSystem;

    fn leb128(mut value: u64) -> Vec<u8> {
        let mut out = Vec::new();
        loop {
            let mut byte = (value & 0x7f) as u8;
            value >>= 7;
            if value != 0 {
                byte |= 0x80;
            }
            out.push(byte);
            if value == 0 {
                break;
            }
        }
        out
    }

    fn obu(type_tag: u8, payload: Vec<u8>) -> Vec<u8> {
        let mut bytes = vec![type_tag << 3];
        bytes.extend(leb128(payload.len() as u64));
        bytes.extend(payload);
        bytes
    }

    fn ia_sequence_header() -> Vec<u8> {
        let mut payload = b"iamf".to_vec();
        payload.push(1); // profile_primary = Base
        payload.push(0); // profile_additional = Simple
        obu(0, payload)
    }

    fn codec_config_pcm(samples_per_frame: u64) -> Vec<u8> {
        let mut payload = vec![0u8]; // id = 0
        payload.extend(b"ipcm");
        payload.extend(leb128(samples_per_frame));
        payload.extend(0i16.to_be_bytes()); // roll_distance
        payload.extend([1, 16, 0, 0, 0xBB, 0x80]); // little-endian, 16-bit, 48000 Hz
        obu(3, payload)
    }

    fn stream_defined_base_bytes(id: u64) -> Vec<u8> {
        let mut v = leb128(id);
        v.extend(leb128(48_000));
        v.push(0); // obu_defined = false
        v
    }

    fn stereo_audio_element() -> Vec<u8> {
        let mut payload = vec![1u8]; // id = 1
        payload.push(0); // kind = channel-based
        payload.push(0); // codec_config_id = 0
        payload.push(1); // n_substreams = 1
        payload.push(0); // substream id = 0
        payload.push(0); // n_params = 0
        payload.push(1); // n_layers = 1
        payload.push(0b0001_0000); // layout_tag=1 (Stereo), no output/recon gain
        payload.push(1); // n_substreams for layer
        payload.push(1); // n_coupled_substreams for layer
        obu(4, payload)
    }

    fn mix_presentation() -> Vec<u8> {
        let mut payload = vec![10u8]; // id = 10
        payload.push(0); // label = ""
        payload.push(1); // n_sub_mixes = 1
        payload.push(1); // n_elements = 1
        payload.push(1); // audio_element_id = 1
        payload.push(0); // element label = ""
        payload.extend(stream_defined_base_bytes(100)); // element_mix base
        payload.extend(0i16.to_be_bytes()); // element_mix_default_gain
        payload.extend(stream_defined_base_bytes(101)); // output_mix base
        payload.extend(0i16.to_be_bytes()); // output_mix_default_gain
        payload.push(1); // n_layouts = 1
        payload.push(1); // target tag = SoundSystem
        payload.push(0); // SoundSystem::A
        payload.push(0); // loudness.info_type = 0
        payload.extend(0i16.to_be_bytes()); // integrated
        payload.extend(0i16.to_be_bytes()); // digital_peak
        obu(5, payload)
    }

    fn audio_frame_stereo_pcm(samples: &[(i16, i16)]) -> Vec<u8> {
        let mut payload = Vec::new();
        for &(l, r) in samples {
            payload.extend(l.to_le_bytes());
            payload.extend(r.to_le_bytes());
        }
        obu(7, payload) // audio_frame_id0 shorthand: substream 0
    }

    fn descriptors() -> Vec<u8> {
        let mut bytes = ia_sequence_header();
        bytes.extend(codec_config_pcm(4));
        bytes.extend(stereo_audio_element());
        bytes.extend(mix_presentation());
        bytes
    }

    #[test]
    fn single_frame_stereo_pcm_round_trips_at_unity_gain() {
        let mut decoder = Decoder::new(48_000);
        decoder.feed(&descriptors()).unwrap();
        decoder.select_presentation(10, OutputLayout::full(SoundSystem::A)).unwrap();

        let samples = [(16_384, -16_384), (8_192, -8_192), (0, 0), (4_096, -4_096)];
        decoder.feed(&audio_frame_stereo_pcm(&samples)).unwrap();

        let frame = decoder.pull_frame().unwrap();
        assert_eq!(frame.trim_start, 0);
        assert_eq!(frame.trim_end, 0);
        assert_eq!(frame.audio.channels.len(), 2);
        assert_eq!(frame.audio.channels[0].len(), 4);
        assert!((frame.audio.channels[0][0] - 0.5).abs() < 1e-3);
        assert!((frame.audio.channels[1][0] - (-0.5)).abs() < 1e-3);
    }

    #[test]
    fn pull_frame_before_selecting_a_presentation_is_an_error() {
        let mut decoder = Decoder::new(48_000);
        decoder.feed(&descriptors()).unwrap();
        assert!(matches!(decoder.pull_frame(), Err(Error::InvalidState(_))));
    }

    #[test]
    fn pull_frame_without_a_queued_audio_frame_needs_more_data() {
        let mut decoder = Decoder::new(48_000);
        decoder.feed(&descriptors()).unwrap();
        decoder.select_presentation(10, OutputLayout::full(SoundSystem::A)).unwrap();
        assert!(matches!(decoder.pull_frame(), Err(Error::NeedMoreData)));
    }

    #[test]
    fn feed_can_split_an_obu_across_two_calls() {
        let mut decoder = Decoder::new(48_000);
        let bytes = descriptors();
        let (head, tail) = bytes.split_at(bytes.len() - 3);
        decoder.feed(head).unwrap();
        decoder.feed(tail).unwrap();
        decoder.select_presentation(10, OutputLayout::full(SoundSystem::A)).unwrap();
        decoder.feed(&audio_frame_stereo_pcm(&[(0, 0), (0, 0), (0, 0), (0, 0)])).unwrap();
        let frame = decoder.pull_frame().unwrap();
        assert!(frame.audio.channels[0].iter().all(|&s| s == 0.0));
    }

    /// Spec scenario S5: a trimmed audio frame carries its trim forward to
    /// the caller unapplied, for them to run through
    /// [`crate::output::apply_trim`].
    #[test]
    fn trim_fields_surface_on_the_rendered_frame() {
        let mut decoder = Decoder::new(48_000);
        decoder.feed(&descriptors()).unwrap();
        decoder.select_presentation(10, OutputLayout::full(SoundSystem::A)).unwrap();

        let mut bytes = vec![(7u8 << 3) | 0b0000_0010]; // audio_frame_id0, trimming flag
        let mut inner = Vec::new();
        inner.extend(leb128(0)); // trim_end
        inner.extend(leb128(2)); // trim_start
        for &(l, r) in &[(0i16, 0i16), (0, 0), (1000, -1000), (2000, -2000)] {
            inner.extend(l.to_le_bytes());
            inner.extend(r.to_le_bytes());
        }
        bytes.extend(leb128(inner.len() as u64));
        bytes.extend(inner);
        decoder.feed(&bytes).unwrap();

        let frame = decoder.pull_frame().unwrap();
        assert_eq!(frame.trim_start, 2);
        assert_eq!(frame.trim_end, 0);
        assert_eq!(frame.audio.channels[0].len(), 4); // trim not yet applied
    }

    #[test]
    fn byte_differing_redefinition_of_a_descriptor_is_rejected() {
        let mut decoder = Decoder::new(48_000);
        decoder.feed(&descriptors()).unwrap();
        let mut conflicting = codec_config_pcm(8); // same id, different samples_per_frame
        assert!(matches!(decoder.feed(&mut conflicting.clone()), Err(Error::InvalidState(_))));
    }
}
