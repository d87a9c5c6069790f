// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The binaural filter port (§6): a thin trait a BEAR- or Resonance-style
//! binaural renderer is plugged in behind. The core crate never implements
//! head-related transfer function convolution itself (Non-goal) — M2B and
//! H2B element plans are resolved (§4.4) but rendered entirely by whatever
//! `BinauralPort` the embedder registers with the [`crate::decoder::Decoder`].

use iamf_core::errors::Result;

/// A per-element binaural renderer, addressed by `audio_element_id` so one
/// port implementation can serve every scene- or channel-based element in
/// a mix concurrently (each keeps its own HRTF convolution state keyed on
/// the id).
pub trait BinauralPort: Send {
    /// Initializes (or re-initializes) per-element binaural state. Called
    /// once per element when the resolver first selects an M2B/H2B plan
    /// for it, and again if the element's input layout changes (e.g. a
    /// different mix presentation is selected).
    fn init(&mut self, element_id: u64, in_channels: usize, frame_size: usize, sample_rate: u32) -> Result<()>;

    /// Renders one frame of `in_planar` (one `Vec<f32>` per input channel)
    /// to exactly two output channels (L, R) of `num_samples` each.
    fn render(&mut self, element_id: u64, in_planar: &[Vec<f32>], num_samples: usize) -> Result<[Vec<f32>; 2]>;

    /// Releases any per-element state. Called when an element leaves the
    /// resolved plan (a different mix presentation no longer references
    /// it).
    fn deinit(&mut self, element_id: u64);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// A test double: "renders" by summing the input channels into both
    /// output channels at unity gain, enough to exercise the port contract
    /// without a real HRTF.
    #[derive(Default)]
    struct SummingBinauralPort {
        initialized: HashMap<u64, (usize, usize, u32)>,
    }

    impl BinauralPort for SummingBinauralPort {
        fn init(&mut self, element_id: u64, in_channels: usize, frame_size: usize, sample_rate: u32) -> Result<()> {
            self.initialized.insert(element_id, (in_channels, frame_size, sample_rate));
            Ok(())
        }

        fn render(&mut self, _element_id: u64, in_planar: &[Vec<f32>], num_samples: usize) -> Result<[Vec<f32>; 2]> {
            let mut l = vec![0.0f32; num_samples];
            let mut r = vec![0.0f32; num_samples];
            for channel in in_planar {
                for t in 0..num_samples {
                    l[t] += channel[t];
                    r[t] += channel[t];
                }
            }
            Ok([l, r])
        }

        fn deinit(&mut self, element_id: u64) {
            self.initialized.remove(&element_id);
        }
    }

    #[test]
    fn port_lifecycle_init_render_deinit() {
        let mut port = SummingBinauralPort::default();
        port.init(1, 2, 4, 48_000).unwrap();
        assert!(port.initialized.contains_key(&1));

        let input = vec![vec![0.5f32; 4], vec![0.25f32; 4]];
        let [l, r] = port.render(1, &input, 4).unwrap();
        assert_eq!(l, vec![0.75; 4]);
        assert_eq!(r, vec![0.75; 4]);

        port.deinit(1);
        assert!(!port.initialized.contains_key(&1));
    }
}
