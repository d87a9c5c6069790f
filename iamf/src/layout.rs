// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Named channel order for every [`ScalableLayout`] rung and every
//! [`SoundSystem`] output target, plus the azimuth/elevation each named
//! position is rendered at for HOA decoding (§4.7 H2M).
//!
//! The decoder never needs physical loudspeaker angles to do its job —
//! only a per-position *name* to route a decoded or demixed channel onto an
//! output channel. Angles are carried here purely as the input to the
//! first-order-and-above ambisonics decode matrix; the BS.2051 azimuths
//! below use the standard reference angles for each letter system's
//! canonical speakers and are not claimed to be reproduction-accurate for
//! every physical rig (see DESIGN.md).

use iamf_core::audio::channels::{Position, ScalableLayout, SoundSystem};

/// The channel order the demixer and the PCM codec adapter agree on for a
/// scalable layer, in ascending wire order.
pub fn scalable_layout_positions(layout: ScalableLayout) -> &'static [Position] {
    use Position as P;
    match layout {
        ScalableLayout::Mono => &[P::FRONT_CENTER],
        ScalableLayout::Stereo => &[P::FRONT_LEFT, P::FRONT_RIGHT],
        ScalableLayout::Surround5_1 => {
            &[P::FRONT_LEFT, P::FRONT_RIGHT, P::FRONT_CENTER, P::LFE, P::SIDE_LEFT, P::SIDE_RIGHT]
        }
        ScalableLayout::Surround5_1_2 => &[
            P::FRONT_LEFT,
            P::FRONT_RIGHT,
            P::FRONT_CENTER,
            P::LFE,
            P::SIDE_LEFT,
            P::SIDE_RIGHT,
            P::TOP_SIDE_LEFT,
            P::TOP_SIDE_RIGHT,
        ],
        ScalableLayout::Surround5_1_4 => &[
            P::FRONT_LEFT,
            P::FRONT_RIGHT,
            P::FRONT_CENTER,
            P::LFE,
            P::SIDE_LEFT,
            P::SIDE_RIGHT,
            P::TOP_FRONT_LEFT,
            P::TOP_FRONT_RIGHT,
            P::TOP_REAR_LEFT,
            P::TOP_REAR_RIGHT,
        ],
        ScalableLayout::Surround7_1_4 => &[
            P::FRONT_LEFT,
            P::FRONT_RIGHT,
            P::FRONT_CENTER,
            P::LFE,
            P::SIDE_LEFT,
            P::SIDE_RIGHT,
            P::REAR_LEFT,
            P::REAR_RIGHT,
            P::TOP_FRONT_LEFT,
            P::TOP_FRONT_RIGHT,
            P::TOP_REAR_LEFT,
            P::TOP_REAR_RIGHT,
        ],
    }
}

/// The channel order of a [`SoundSystem`] used in full (no custom subset).
pub fn sound_system_positions(system: SoundSystem) -> &'static [Position] {
    use Position as P;
    match system {
        SoundSystem::Mono => &[P::FRONT_CENTER],
        SoundSystem::A => &[P::FRONT_LEFT, P::FRONT_RIGHT],
        SoundSystem::B => {
            &[P::FRONT_LEFT, P::FRONT_RIGHT, P::FRONT_CENTER, P::LFE, P::SIDE_LEFT, P::SIDE_RIGHT]
        }
        SoundSystem::C => &[
            P::FRONT_LEFT,
            P::FRONT_RIGHT,
            P::FRONT_CENTER,
            P::LFE,
            P::SIDE_LEFT,
            P::SIDE_RIGHT,
            P::TOP_SIDE_LEFT,
            P::TOP_SIDE_RIGHT,
        ],
        SoundSystem::D => &[
            P::FRONT_LEFT,
            P::FRONT_RIGHT,
            P::FRONT_CENTER,
            P::LFE,
            P::SIDE_LEFT,
            P::SIDE_RIGHT,
            P::TOP_FRONT_LEFT,
            P::TOP_FRONT_RIGHT,
            P::TOP_REAR_LEFT,
            P::TOP_REAR_RIGHT,
        ],
        // System E (4+5+1): 5.1 plus a rear-center and four height speakers.
        SoundSystem::E => &[
            P::FRONT_LEFT,
            P::FRONT_RIGHT,
            P::FRONT_CENTER,
            P::LFE,
            P::SIDE_LEFT,
            P::SIDE_RIGHT,
            P::REAR_CENTER,
            P::TOP_FRONT_LEFT,
            P::TOP_FRONT_RIGHT,
            P::TOP_REAR_LEFT,
            P::TOP_REAR_RIGHT,
        ],
        // System F (3+7+0): a wide front pair plus a 7-channel bed.
        SoundSystem::F => &[
            P::FRONT_LEFT,
            P::FRONT_RIGHT,
            P::FRONT_CENTER,
            P::LFE,
            P::SIDE_LEFT,
            P::SIDE_RIGHT,
            P::REAR_LEFT,
            P::REAR_RIGHT,
            P::WIDE_LEFT,
            P::WIDE_RIGHT,
        ],
        // System G (4+9+0): a 9-channel bed plus four height speakers.
        SoundSystem::G => &[
            P::FRONT_LEFT,
            P::FRONT_RIGHT,
            P::FRONT_CENTER,
            P::LFE,
            P::SIDE_LEFT,
            P::SIDE_RIGHT,
            P::REAR_LEFT,
            P::REAR_RIGHT,
            P::WIDE_LEFT,
            P::WIDE_RIGHT,
            P::TOP_FRONT_LEFT,
            P::TOP_FRONT_RIGHT,
            P::TOP_REAR_LEFT,
            P::TOP_REAR_RIGHT,
        ],
        // System H (9+10+3), 22.2: a best-effort 24-position assignment;
        // see DESIGN.md — this runtime routes by name, not by the exact
        // ITU-R BS.2051 angle grid this system specifies.
        SoundSystem::H => &[
            P::FRONT_LEFT,
            P::FRONT_RIGHT,
            P::FRONT_CENTER,
            P::LFE,
            P::LFE2,
            P::SIDE_LEFT,
            P::SIDE_RIGHT,
            P::REAR_LEFT,
            P::REAR_RIGHT,
            P::REAR_CENTER,
            P::WIDE_LEFT,
            P::WIDE_RIGHT,
            P::TOP_FRONT_LEFT,
            P::TOP_FRONT_RIGHT,
            P::TOP_FRONT_CENTER,
            P::TOP_SIDE_LEFT,
            P::TOP_SIDE_RIGHT,
            P::TOP_REAR_LEFT,
            P::TOP_REAR_RIGHT,
            P::TOP_REAR_CENTER,
        ],
        SoundSystem::I => &[
            P::FRONT_LEFT,
            P::FRONT_RIGHT,
            P::FRONT_CENTER,
            P::LFE,
            P::SIDE_LEFT,
            P::SIDE_RIGHT,
            P::REAR_LEFT,
            P::REAR_RIGHT,
        ],
        SoundSystem::J => &[
            P::FRONT_LEFT,
            P::FRONT_RIGHT,
            P::FRONT_CENTER,
            P::LFE,
            P::SIDE_LEFT,
            P::SIDE_RIGHT,
            P::REAR_LEFT,
            P::REAR_RIGHT,
            P::TOP_FRONT_LEFT,
            P::TOP_FRONT_RIGHT,
            P::TOP_REAR_LEFT,
            P::TOP_REAR_RIGHT,
        ],
        SoundSystem::Ext712 => &[
            P::FRONT_LEFT,
            P::FRONT_RIGHT,
            P::FRONT_CENTER,
            P::LFE,
            P::SIDE_LEFT,
            P::SIDE_RIGHT,
            P::REAR_LEFT,
            P::REAR_RIGHT,
            P::TOP_SIDE_LEFT,
            P::TOP_SIDE_RIGHT,
        ],
        SoundSystem::Ext312 => &[
            P::FRONT_LEFT,
            P::FRONT_RIGHT,
            P::FRONT_CENTER,
            P::LFE,
            P::TOP_SIDE_LEFT,
            P::TOP_SIDE_RIGHT,
        ],
        SoundSystem::Ext916 => &[
            P::FRONT_LEFT,
            P::FRONT_RIGHT,
            P::FRONT_CENTER,
            P::LFE,
            P::SIDE_LEFT,
            P::SIDE_RIGHT,
            P::REAR_LEFT,
            P::REAR_RIGHT,
            P::WIDE_LEFT,
            P::WIDE_RIGHT,
            P::TOP_FRONT_LEFT,
            P::TOP_FRONT_RIGHT,
            P::TOP_SIDE_LEFT,
            P::TOP_SIDE_RIGHT,
            P::TOP_REAR_LEFT,
            P::TOP_REAR_RIGHT,
        ],
        SoundSystem::Binaural => &[P::FRONT_LEFT, P::FRONT_RIGHT],
    }
}

/// Azimuth (radians, 0 = front, positive = left) and elevation (radians,
/// positive = up) of a named position, used only by the HOA decode matrix
/// (§4.7 H2M). `None` for the LFE positions, which carry no directional
/// information and are excluded from the ambisonics decode (the LFE output
/// row is instead synthesised by the §4.7 Butterworth low-pass of W).
pub fn position_angle(p: Position) -> Option<(f64, f64)> {
    use std::f64::consts::PI;
    let deg = |d: f64| d * PI / 180.0;
    match p {
        Position::FRONT_LEFT => Some((deg(30.0), 0.0)),
        Position::FRONT_RIGHT => Some((deg(-30.0), 0.0)),
        Position::FRONT_CENTER => Some((0.0, 0.0)),
        Position::SIDE_LEFT => Some((deg(90.0), 0.0)),
        Position::SIDE_RIGHT => Some((deg(-90.0), 0.0)),
        Position::REAR_LEFT => Some((deg(135.0), 0.0)),
        Position::REAR_RIGHT => Some((deg(-135.0), 0.0)),
        Position::REAR_CENTER => Some((deg(180.0), 0.0)),
        Position::WIDE_LEFT => Some((deg(60.0), 0.0)),
        Position::WIDE_RIGHT => Some((deg(-60.0), 0.0)),
        Position::TOP_FRONT_LEFT => Some((deg(45.0), deg(45.0))),
        Position::TOP_FRONT_RIGHT => Some((deg(-45.0), deg(45.0))),
        Position::TOP_FRONT_CENTER => Some((0.0, deg(45.0))),
        Position::TOP_SIDE_LEFT => Some((deg(90.0), deg(45.0))),
        Position::TOP_SIDE_RIGHT => Some((deg(-90.0), deg(45.0))),
        Position::TOP_REAR_LEFT => Some((deg(135.0), deg(45.0))),
        Position::TOP_REAR_RIGHT => Some((deg(-135.0), deg(45.0))),
        Position::TOP_REAR_CENTER => Some((deg(180.0), deg(45.0))),
        Position::LFE | Position::LFE2 => None,
        _ => None,
    }
}
