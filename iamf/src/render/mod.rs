// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The rendering algebra: the demixer (§4.6), the M2M/H2M matrix kernels
//! and channel-layout → matrix synthesis (§4.7), the LFE low-pass filter,
//! and the real-spherical-harmonics HOA decode basis.

pub mod demixer;
pub mod lfe;
pub mod matrix;
pub mod mix_factors;
pub mod sh;

use iamf_core::audio::channels::Position;

/// A set of named, planar audio channels: the unit the demixer and element
/// renderer pass between each other. Unlike [`iamf_core::audio::PlanarAudio`]
/// (positionally ordered, anonymous) a `ChannelSet` tracks which named
/// loudspeaker or HOA position each buffer holds, so a transition can look
/// channels up by name rather than by a layout-specific index.
#[derive(Clone, Debug, Default)]
pub struct ChannelSet {
    entries: Vec<(Position, Vec<f32>)>,
}

impl ChannelSet {
    pub fn new() -> Self {
        ChannelSet { entries: Vec::new() }
    }

    pub fn insert(&mut self, position: Position, samples: Vec<f32>) {
        if let Some(entry) = self.entries.iter_mut().find(|(p, _)| *p == position) {
            entry.1 = samples;
        } else {
            self.entries.push((position, samples));
        }
    }

    pub fn get(&self, position: Position) -> Option<&[f32]> {
        self.entries.iter().find(|(p, _)| *p == position).map(|(_, s)| s.as_slice())
    }

    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        self.entries.iter().map(|(p, _)| *p)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn num_samples(&self) -> usize {
        self.entries.first().map_or(0, |(_, s)| s.len())
    }

    /// Converts to an [`iamf_core::audio::PlanarAudio`] in the exact
    /// channel order `order`. Positions in `order` absent from this set
    /// produce a silent channel.
    pub fn into_planar(self, order: &[Position], num_samples: usize) -> iamf_core::audio::PlanarAudio {
        let mut channels = Vec::with_capacity(order.len());
        for &p in order {
            match self.entries.iter().find(|(ep, _)| *ep == p) {
                Some((_, samples)) => channels.push(samples.clone()),
                None => channels.push(vec![0.0; num_samples]),
            }
        }
        iamf_core::audio::PlanarAudio { channels }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_set_roundtrips_named_lookup() {
        let mut cs = ChannelSet::new();
        cs.insert(Position::FRONT_LEFT, vec![1.0, 2.0]);
        cs.insert(Position::FRONT_RIGHT, vec![3.0, 4.0]);
        assert_eq!(cs.get(Position::FRONT_LEFT), Some([1.0, 2.0].as_slice()));
        assert_eq!(cs.get(Position::LFE), None);
    }

    #[test]
    fn into_planar_fills_missing_positions_with_silence() {
        let mut cs = ChannelSet::new();
        cs.insert(Position::FRONT_LEFT, vec![1.0, 1.0]);
        let planar = cs.into_planar(&[Position::FRONT_LEFT, Position::FRONT_RIGHT], 2);
        assert_eq!(planar.channels[0], vec![1.0, 1.0]);
        assert_eq!(planar.channels[1], vec![0.0, 0.0]);
    }
}
