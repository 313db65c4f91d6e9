//! First-order low-pass filter on policy actions.

use quadnav_core::types::JointVector;

/// `filtered = alpha * action + (1 - alpha) * filtered`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ActionFilter {
    alpha: f32,
}

impl ActionFilter {
    pub const fn new(alpha: f32) -> Self {
        Self { alpha }
    }

    pub const fn alpha(&self) -> f32 {
        self.alpha
    }

    /// Blend `action` into `filtered` in place.
    pub fn apply(&self, filtered: &mut JointVector, action: &JointVector) {
        for (f, a) in filtered.iter_mut().zip(action) {
            *f = self.alpha.mul_add(*a, (1.0 - self.alpha) * *f);
        }
    }
}

impl Default for ActionFilter {
    fn default() -> Self {
        Self::new(0.35)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_step_from_rest() {
        let filter = ActionFilter::default();
        let mut filtered = [0.0; 12];
        filter.apply(&mut filtered, &[1.0; 12]);
        assert!(filtered.iter().all(|f| (f - 0.35).abs() < 1e-6));
    }

    #[test]
    fn converges_to_constant_input() {
        let filter = ActionFilter::default();
        let mut filtered = [0.0; 12];
        for _ in 0..100 {
            filter.apply(&mut filtered, &[-0.5; 12]);
        }
        assert!(filtered.iter().all(|f| (f + 0.5).abs() < 1e-4));
    }

    #[test]
    fn alpha_one_passes_through() {
        let filter = ActionFilter::new(1.0);
        let mut filtered = [0.3; 12];
        filter.apply(&mut filtered, &[0.9; 12]);
        assert!(filtered.iter().all(|f| (f - 0.9).abs() < 1e-6));
    }
}
