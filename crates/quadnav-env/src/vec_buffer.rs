//! Structure-of-arrays buffers for batched step output.
//!
//! Observations live in one flat row-major `[num_envs, OBS_DIM]` vector and
//! done flags in two `[num_envs]` vectors, the layout a training harness
//! copies out in one go.

use quadnav_core::types::{Observation, OBS_DIM};

// ---------------------------------------------------------------------------
// VecObsBuffer
// ---------------------------------------------------------------------------

/// Batched observation buffer with shape `[num_envs, OBS_DIM]`.
///
/// # Example
///
/// ```
/// use quadnav_core::types::{Observation, OBS_DIM};
/// use quadnav_env::vec_buffer::VecObsBuffer;
///
/// let mut buf = VecObsBuffer::new(2);
/// buf.set(1, &Observation::new(vec![0.5; OBS_DIM]));
/// assert_eq!(buf.row(1)[0], 0.5);
/// assert_eq!(buf.as_flat().len(), 2 * OBS_DIM);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct VecObsBuffer {
    data: Vec<f32>,
    num_envs: usize,
}

impl VecObsBuffer {
    #[must_use]
    pub fn new(num_envs: usize) -> Self {
        Self {
            data: vec![0.0; num_envs * OBS_DIM],
            num_envs,
        }
    }

    #[must_use]
    pub const fn num_envs(&self) -> usize {
        self.num_envs
    }

    /// Store the observation of `env`.
    ///
    /// # Panics
    ///
    /// Panics if `env >= num_envs` or the observation is not `OBS_DIM` wide.
    pub fn set(&mut self, env: usize, obs: &Observation) {
        assert!(env < self.num_envs, "env index out of bounds");
        assert_eq!(obs.len(), OBS_DIM, "observation width mismatch");
        let start = env * OBS_DIM;
        self.data[start..start + OBS_DIM].copy_from_slice(obs.as_slice());
    }

    /// Observation row of `env`.
    #[must_use]
    pub fn row(&self, env: usize) -> &[f32] {
        let start = env * OBS_DIM;
        &self.data[start..start + OBS_DIM]
    }

    /// Owned copy of `env`'s observation.
    #[must_use]
    pub fn get(&self, env: usize) -> Observation {
        Observation::new(self.row(env).to_vec())
    }

    /// Raw flat buffer `[num_envs * OBS_DIM]`.
    #[must_use]
    pub fn as_flat(&self) -> &[f32] {
        &self.data
    }
}

// ---------------------------------------------------------------------------
// VecRewardBuffer
// ---------------------------------------------------------------------------

/// Batched rewards with shape `[num_envs]`.
#[derive(Debug, Clone, PartialEq)]
pub struct VecRewardBuffer {
    data: Vec<f32>,
}

impl VecRewardBuffer {
    #[must_use]
    pub fn new(num_envs: usize) -> Self {
        Self {
            data: vec![0.0; num_envs],
        }
    }

    pub fn set(&mut self, env: usize, reward: f32) {
        self.data[env] = reward;
    }

    #[must_use]
    pub fn get(&self, env: usize) -> f32 {
        self.data[env]
    }

    #[must_use]
    pub fn as_flat(&self) -> &[f32] {
        &self.data
    }

    /// Mean over environments; zero when empty.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn mean(&self) -> f32 {
        if self.data.is_empty() {
            return 0.0;
        }
        self.data.iter().sum::<f32>() / self.data.len() as f32
    }

    pub fn clear(&mut self) {
        self.data.fill(0.0);
    }
}

// ---------------------------------------------------------------------------
// VecDoneBuffer
// ---------------------------------------------------------------------------

/// Batched terminated/truncated flags with shape `[num_envs]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VecDoneBuffer {
    terminated: Vec<bool>,
    truncated: Vec<bool>,
}

impl VecDoneBuffer {
    #[must_use]
    pub fn new(num_envs: usize) -> Self {
        Self {
            terminated: vec![false; num_envs],
            truncated: vec![false; num_envs],
        }
    }

    pub fn set(&mut self, env: usize, terminated: bool, truncated: bool) {
        self.terminated[env] = terminated;
        self.truncated[env] = truncated;
    }

    #[must_use]
    pub fn terminated(&self, env: usize) -> bool {
        self.terminated[env]
    }

    #[must_use]
    pub fn truncated(&self, env: usize) -> bool {
        self.truncated[env]
    }

    /// Terminated or truncated.
    #[must_use]
    pub fn is_done(&self, env: usize) -> bool {
        self.terminated[env] || self.truncated[env]
    }

    /// Per-env done flags, the mask `reset_done` consumes.
    #[must_use]
    pub fn done_mask(&self) -> Vec<bool> {
        (0..self.terminated.len()).map(|e| self.is_done(e)).collect()
    }

    #[must_use]
    pub fn terminated_flat(&self) -> &[bool] {
        &self.terminated
    }

    #[must_use]
    pub fn truncated_flat(&self) -> &[bool] {
        &self.truncated
    }

    pub fn clear(&mut self) {
        self.terminated.fill(false);
        self.truncated.fill(false);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(v: f32) -> Observation {
        Observation::new(vec![v; OBS_DIM])
    }

    #[test]
    fn obs_rows_are_contiguous() {
        let mut buf = VecObsBuffer::new(3);
        buf.set(0, &obs(1.0));
        buf.set(2, &obs(3.0));
        let flat = buf.as_flat();
        assert!((flat[OBS_DIM - 1] - 1.0).abs() < f32::EPSILON);
        assert!(flat[OBS_DIM].abs() < f32::EPSILON);
        assert!((flat[2 * OBS_DIM] - 3.0).abs() < f32::EPSILON);
        assert_eq!(buf.get(2), obs(3.0));
    }

    #[test]
    #[should_panic(expected = "observation width mismatch")]
    fn obs_width_checked() {
        let mut buf = VecObsBuffer::new(1);
        buf.set(0, &Observation::new(vec![0.0; 3]));
    }

    #[test]
    fn reward_mean() {
        let mut buf = VecRewardBuffer::new(4);
        buf.set(0, 2.0);
        buf.set(3, -1.0);
        assert!((buf.mean() - 0.25).abs() < f32::EPSILON);
        assert!((buf.get(3) + 1.0).abs() < f32::EPSILON);
        buf.clear();
        assert!(buf.as_flat().iter().all(|r| *r == 0.0));
        assert!(VecRewardBuffer::new(0).mean().abs() < f32::EPSILON);
    }

    #[test]
    fn done_mask_combines_flags() {
        let mut buf = VecDoneBuffer::new(3);
        buf.set(0, true, false);
        buf.set(2, false, true);
        assert_eq!(buf.done_mask(), vec![true, false, true]);
        assert_eq!(buf.terminated_flat(), &[true, false, false]);
        assert_eq!(buf.truncated_flat(), &[false, false, true]);
        buf.clear();
        assert_eq!(buf.done_mask(), vec![false; 3]);
    }
}
