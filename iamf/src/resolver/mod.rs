// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The stream presentation resolver (§4.4/§4.4a): turns a
//! `(mix_presentation_id, output layout)` selection into a concrete,
//! precomputed per-element decode/demix/render plan, and caches that plan
//! keyed on the descriptor database's generation so re-resolving the same
//! selection after an unrelated descriptor arrives is free.

use std::collections::HashMap;

use iamf_core::audio::channels::{OutputLayout, Position, SoundSystem};
use iamf_core::errors::{Error, Result};

use crate::descriptors::audio_element::{AmbisonicsMode, AudioElementConf};
use crate::descriptors::database::DescriptorDatabase;
use crate::descriptors::mix_presentation::{Layout, LayoutTarget, MixPresentation};
use crate::layout::{scalable_layout_positions, sound_system_positions};
use crate::parameter::ParameterBase;
use crate::render::matrix::{synthesize_m2m, Matrix};
use crate::render::sh::decode_matrix;

/// How one audio element's rendered output is produced, fixed for the
/// lifetime of a resolved plan.
#[derive(Clone, Debug)]
pub enum RendererKind {
    /// Matrix-to-matrix: the element's highest scalable channel layer,
    /// demixed up through the full ladder, then folded to the output
    /// layout by `matrix`.
    ChannelToMatrix { chosen_layer_positions: &'static [Position], chosen_layer_index: usize, matrix: Matrix },
    /// HOA-to-matrix: a static spherical-harmonics decode matrix from the
    /// element's ambisonics order to the output layout's named directions.
    HoaToMatrix { order: u32, matrix: Matrix },
    /// Matrix-to-binaural / HOA-to-binaural: rendering is delegated to the
    /// [`crate::binaural::BinauralPort`] entirely; the resolver does not
    /// build a matrix for this path.
    ToBinaural { source_is_ambisonics: bool, chosen_layer_index: usize },
}

#[derive(Clone, Debug)]
pub struct ElementPlan {
    pub audio_element_id: u64,
    pub codec_config_id: u64,
    pub substream_ids: Vec<u64>,
    pub renderer: RendererKind,
    pub element_mix_base: ParameterBase,
    pub element_mix_default_gain: i16,
}

#[derive(Clone, Debug)]
pub struct PipelinePlan {
    pub elements: Vec<ElementPlan>,
    pub output_mix_base: ParameterBase,
    pub output_mix_default_gain: i16,
    pub out_positions: Vec<Position>,
}

fn layout_matches(target: &LayoutTarget, requested: &OutputLayout) -> bool {
    match (target, &requested.subset) {
        (LayoutTarget::SoundSystem(s), None) => *s == requested.base,
        (LayoutTarget::SpLabel(mask), Some(subset)) => mask == subset,
        (LayoutTarget::Binaural, _) => requested.is_binaural(),
        _ => false,
    }
}

/// Picks the layout within a submix that matches the requested output, per
/// the descriptor's own layout order (the tie-break this resolver applies
/// when more than one layout entry would match: the first one in wire
/// order wins).
fn select_layout<'a>(layouts: &'a [Layout], requested: &OutputLayout) -> Option<&'a Layout> {
    layouts.iter().find(|l| layout_matches(&l.target, requested))
}

fn out_positions_for(requested: &OutputLayout) -> Vec<Position> {
    match &requested.subset {
        Some(mask) => sound_system_positions(requested.base).iter().copied().filter(|p| mask.contains(*p)).collect(),
        None => sound_system_positions(requested.base).to_vec(),
    }
}

fn build_element_plan(
    db: &DescriptorDatabase,
    audio_element_id: u64,
    element_mix_base: ParameterBase,
    element_mix_default_gain: i16,
    out_positions: &[Position],
    is_binaural_target: bool,
) -> Result<ElementPlan> {
    let element = db
        .audio_element(audio_element_id)
        .ok_or(Error::InvalidState("mix presentation references an unknown audio element"))?;

    let renderer = match &element.conf {
        AudioElementConf::Channel(conf) => {
            if conf.layers.is_empty() {
                return Err(Error::InvalidState("channel-based audio element has no layers"));
            }
            // §4.4 step 2: decode up to the highest scalable layer whose
            // loudspeaker layout is <= the requested output layout's channel
            // count, not unconditionally the topmost layer — a stereo
            // output never needs a 7.1.4 element fully demixed.
            let out_channel_count = out_positions.len();
            let mut chosen_layer_index = 0;
            for (i, layer) in conf.layers.iter().enumerate() {
                if layer.loudspeaker_layout.channel_count() <= out_channel_count {
                    chosen_layer_index = i;
                }
            }
            let chosen = &conf.layers[chosen_layer_index];
            let chosen_layer_positions = scalable_layout_positions(chosen.loudspeaker_layout);
            if is_binaural_target {
                // Binaural rendering has no output channel-count ceiling to
                // cap the decode at, so it always demixes to the element's
                // highest available layer for the best spatial resolution.
                RendererKind::ToBinaural { source_is_ambisonics: false, chosen_layer_index: conf.layers.len() - 1 }
            } else {
                let matrix = synthesize_m2m(chosen_layer_positions, out_positions);
                RendererKind::ChannelToMatrix { chosen_layer_positions, chosen_layer_index, matrix }
            }
        }
        AudioElementConf::Ambisonics(conf) => {
            let order = match conf.mode {
                AmbisonicsMode::Mono | AmbisonicsMode::Projection => {
                    let n = conf.out_channels as f64;
                    let order = n.sqrt() - 1.0;
                    if (order.round() - order).abs() > 1e-9 || order < 0.0 {
                        return Err(Error::InvalidState("ambisonics out_channels is not (order+1)^2"));
                    }
                    order.round() as u32
                }
            };
            if is_binaural_target {
                RendererKind::ToBinaural { source_is_ambisonics: true, chosen_layer_index: 0 }
            } else {
                let directions: Vec<(f64, f64)> = out_positions
                    .iter()
                    .map(|&p| crate::layout::position_angle(p).unwrap_or((0.0, 0.0)))
                    .collect();
                let matrix = decode_matrix(order, &directions);
                RendererKind::HoaToMatrix { order, matrix }
            }
        }
    };

    Ok(ElementPlan {
        audio_element_id,
        codec_config_id: element.codec_config_id,
        substream_ids: element.substream_ids.clone(),
        renderer,
        element_mix_base,
        element_mix_default_gain,
    })
}

fn resolve_uncached(
    db: &DescriptorDatabase,
    mix_presentation: &MixPresentation,
    requested: &OutputLayout,
) -> Result<PipelinePlan> {
    let layout = select_layout(&mix_presentation.sub_mix.layouts, requested)
        .ok_or(Error::InvalidState("mix presentation has no layout matching the requested output"))?;
    let _ = layout;

    let out_positions = out_positions_for(requested);
    let is_binaural_target = requested.is_binaural();

    let mut elements = Vec::with_capacity(mix_presentation.sub_mix.elements.len());
    for element in &mix_presentation.sub_mix.elements {
        elements.push(build_element_plan(
            db,
            element.audio_element_id,
            element.element_mix_base.clone(),
            element.element_mix_default_gain,
            &out_positions,
            is_binaural_target,
        )?);
    }

    Ok(PipelinePlan {
        elements,
        output_mix_base: mix_presentation.sub_mix.output_mix_base.clone(),
        output_mix_default_gain: mix_presentation.sub_mix.output_mix_default_gain,
        out_positions,
    })
}

/// Caches [`PipelinePlan`]s keyed on `(mix_presentation_id, OutputLayout)`,
/// invalidated whenever the descriptor database's
/// [`DescriptorDatabase::generation`] moves past the generation the cached
/// entry was built against (§4.4a).
#[derive(Default)]
pub struct Resolver {
    cache: HashMap<(u64, OutputLayout), (u64, PipelinePlan)>,
}

impl Resolver {
    pub fn new() -> Self {
        Resolver::default()
    }

    pub fn resolve(
        &mut self,
        db: &DescriptorDatabase,
        mix_presentation_id: u64,
        requested: &OutputLayout,
    ) -> Result<&PipelinePlan> {
        let key = (mix_presentation_id, requested.clone());
        let generation = db.generation();

        let needs_rebuild = match self.cache.get(&key) {
            Some((cached_generation, _)) => *cached_generation != generation,
            None => true,
        };

        if needs_rebuild {
            let mix_presentation = db
                .mix_presentation(mix_presentation_id)
                .ok_or(Error::InvalidState("unknown mix_presentation_id"))?;
            let plan = resolve_uncached(db, mix_presentation, requested)?;
            self.cache.insert(key.clone(), (generation, plan));
        }

        Ok(&self.cache.get(&key).expect("just inserted or already present").1)
    }

    /// Drops every cached plan. Exposed for callers that want to bound
    /// memory after selecting many one-off output layouts (the cache
    /// itself never evicts on its own).
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }
}
