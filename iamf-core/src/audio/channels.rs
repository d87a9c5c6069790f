// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use bitflags::bitflags;

bitflags! {
    /// A bitmask of output-channel positions, used to describe which
    /// channels a recon-gain segment's per-layer bitmap applies to and to
    /// express an SP-label custom-layout subset.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Position: u32 {
        const FRONT_LEFT    = 1 << 0;
        const FRONT_RIGHT   = 1 << 1;
        const FRONT_CENTER  = 1 << 2;
        const LFE           = 1 << 3;
        const SIDE_LEFT     = 1 << 4;
        const SIDE_RIGHT    = 1 << 5;
        const REAR_LEFT     = 1 << 6;
        const REAR_RIGHT    = 1 << 7;
        const TOP_FRONT_LEFT  = 1 << 8;
        const TOP_FRONT_RIGHT = 1 << 9;
        const TOP_SIDE_LEFT   = 1 << 10;
        const TOP_SIDE_RIGHT  = 1 << 11;
        const TOP_REAR_LEFT   = 1 << 12;
        const TOP_REAR_RIGHT  = 1 << 13;
        const TOP_FRONT_CENTER = 1 << 14;
        const WIDE_LEFT       = 1 << 15;
        const WIDE_RIGHT      = 1 << 16;
        const REAR_CENTER     = 1 << 17;
        const LFE2            = 1 << 18;
        const TOP_REAR_CENTER = 1 << 19;
    }
}

/// A scalable channel-based loudspeaker layout: a rung on the ladder
/// `Mono ⊂ Stereo ⊂ 5.1 ⊂ 5.1.2 ⊂ 5.1.4 ⊂ 7.1.4`. Ordering (`PartialOrd`) is
/// channel-count dominance, used by the resolver to pick the highest layer
/// that is `<=` the output layout.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ScalableLayout {
    Mono,
    Stereo,
    Surround5_1,
    Surround5_1_2,
    Surround5_1_4,
    Surround7_1_4,
}

impl ScalableLayout {
    /// Number of channels carried by this rung, in the fixed channel order
    /// the demixer's dependency tables assume.
    pub fn channel_count(self) -> usize {
        match self {
            ScalableLayout::Mono => 1,
            ScalableLayout::Stereo => 2,
            ScalableLayout::Surround5_1 => 6,
            ScalableLayout::Surround5_1_2 => 8,
            ScalableLayout::Surround5_1_4 => 10,
            ScalableLayout::Surround7_1_4 => 12,
        }
    }

    pub fn from_channel_count(n: usize) -> Option<Self> {
        match n {
            1 => Some(ScalableLayout::Mono),
            2 => Some(ScalableLayout::Stereo),
            6 => Some(ScalableLayout::Surround5_1),
            8 => Some(ScalableLayout::Surround5_1_2),
            10 => Some(ScalableLayout::Surround5_1_4),
            12 => Some(ScalableLayout::Surround7_1_4),
            _ => None,
        }
    }
}

/// A BS.2051 sound system, or an AOM-extended system, selectable as an
/// output target (never as a scalable decoding layer).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SoundSystem {
    /// BS.2051 system A (0+2+0, i.e. stereo).
    A,
    /// BS.2051 system B (0+5+0, 5.1).
    B,
    /// BS.2051 system C (2+5+0, 5.1.2).
    C,
    /// BS.2051 system D (4+5+0, 5.1.4).
    D,
    /// BS.2051 system E (4+5+1, 6.1.4).
    E,
    /// BS.2051 system F (3+7+0, 7.1.3-ish reference layout).
    F,
    /// BS.2051 system G (4+9+0, 9.1.4).
    G,
    /// BS.2051 system H (9+10+3, 22.2).
    H,
    /// BS.2051 system I (0+7+0, 7.1).
    I,
    /// BS.2051 system J (4+7+0, 7.1.4).
    J,
    /// AOM-extended 7.1.2.
    Ext712,
    /// AOM-extended 3.1.2.
    Ext312,
    /// AOM-extended 9.1.6.
    Ext916,
    /// Single channel.
    Mono,
    /// Binaural stereo — routed to the binaural filter port, never to a
    /// matrix kernel.
    Binaural,
}

impl SoundSystem {
    /// Number of discrete output channels, excluding the binaural case
    /// (binaural output is always 2 channels but produced by the filter
    /// port, not a channel count derived from loudspeaker positions).
    pub fn channel_count(self) -> usize {
        match self {
            SoundSystem::A => 2,
            SoundSystem::B => 6,
            SoundSystem::C => 8,
            SoundSystem::D => 10,
            SoundSystem::E => 11,
            SoundSystem::F => 10,
            SoundSystem::G => 14,
            SoundSystem::H => 24,
            SoundSystem::I => 8,
            SoundSystem::J => 12,
            SoundSystem::Ext712 => 10,
            SoundSystem::Ext312 => 6,
            SoundSystem::Ext916 => 16,
            SoundSystem::Mono => 1,
            SoundSystem::Binaural => 2,
        }
    }

    pub fn is_binaural(self) -> bool {
        matches!(self, SoundSystem::Binaural)
    }
}

/// An output layout selection: either a predefined sound system used in
/// full, or a predefined sound system narrowed to an arbitrary subset by an
/// SP-label bitmask (a "custom layout").
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct OutputLayout {
    pub base: SoundSystem,
    /// `None` selects every speaker in `base`; `Some(mask)` selects only
    /// the positions set in `mask` (a custom subset of `base`).
    pub subset: Option<Position>,
}

impl OutputLayout {
    pub fn full(base: SoundSystem) -> Self {
        OutputLayout { base, subset: None }
    }

    pub fn custom(base: SoundSystem, subset: Position) -> Self {
        OutputLayout { base, subset: Some(subset) }
    }

    pub fn is_binaural(&self) -> bool {
        self.base.is_binaural()
    }

    /// Effective output channel count after applying any custom subset.
    pub fn channel_count(&self) -> usize {
        match &self.subset {
            Some(mask) => mask.bits().count_ones() as usize,
            None => self.base.channel_count(),
        }
    }
}
