//! Transition blending.
//!
//! Blends the outgoing (previous) edit into the incoming edit's buffer over
//! the transition length. Blend functions run in forward time only; the
//! fragment renderer reverses buffers around the call for reverse playback.

use std::collections::HashMap;

/// One blend algorithm, resolved by name from a [`TransitionRegistry`].
pub trait TransitionBlend: Send + Sync {
    /// Blend `outgoing` into `incoming` in place. `position` is the offset
    /// of `incoming[0]` within the transition, `total_len` the transition
    /// length.
    fn process(&self, outgoing: &[f64], incoming: &mut [f64], position: i64, total_len: i64);
}

/// Linear crossfade.
#[derive(Debug, Default)]
pub struct CrossfadeTransition;

impl TransitionBlend for CrossfadeTransition {
    fn process(&self, outgoing: &[f64], incoming: &mut [f64], position: i64, total_len: i64) {
        let total = total_len.max(1) as f64;
        for (j, (out_sample, in_sample)) in outgoing.iter().zip(incoming.iter_mut()).enumerate() {
            let fraction = ((position + j as i64) as f64 / total).clamp(0.0, 1.0);
            *in_sample = out_sample * (1.0 - fraction) + *in_sample * fraction;
        }
    }
}

/// Name-to-blend table consulted by the fragment renderer.
///
/// An unknown title falls back to the crossfade so a project referencing a
/// missing transition still renders.
pub struct TransitionRegistry {
    blends: HashMap<String, Box<dyn TransitionBlend>>,
    fallback: CrossfadeTransition,
}

impl TransitionRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            blends: HashMap::new(),
            fallback: CrossfadeTransition,
        };
        registry.register("crossfade", Box::new(CrossfadeTransition));
        registry
    }

    pub fn register(&mut self, title: impl Into<String>, blend: Box<dyn TransitionBlend>) {
        self.blends.insert(title.into(), blend);
    }

    pub fn get(&self, title: &str) -> &dyn TransitionBlend {
        match self.blends.get(title) {
            Some(blend) => blend.as_ref(),
            None => &self.fallback,
        }
    }
}

impl Default for TransitionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
