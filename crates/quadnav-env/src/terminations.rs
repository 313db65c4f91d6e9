//! Episode-ending conditions.
//!
//! Timeout truncates; base contact and a yaw-rate blow-up terminate. Any of
//! the three ends the episode for that environment.

use quadnav_core::config::TerminationSettings;
use quadnav_core::sim::{SensorId, SimBackend};
use quadnav_core::traits::{CompositeTermination, TerminationCondition};

/// Per-environment inputs of the termination conditions.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TerminationInputs {
    /// Steps taken including this one.
    pub steps: u32,
    /// Base contact sensor above threshold.
    pub base_contact: bool,
    pub yaw_rate: f32,
}

// ---------------------------------------------------------------------------
// TimeoutTermination
// ---------------------------------------------------------------------------

/// Fires once the step count reaches the episode length.
pub struct TimeoutTermination {
    max_steps: u32,
}

impl TimeoutTermination {
    #[must_use]
    pub const fn new(max_steps: u32) -> Self {
        Self { max_steps }
    }
}

impl TerminationCondition<TerminationInputs> for TimeoutTermination {
    fn is_terminated(&self, ctx: &TerminationInputs) -> bool {
        ctx.steps >= self.max_steps
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "TimeoutTermination"
    }
}

// ---------------------------------------------------------------------------
// BaseContactTermination
// ---------------------------------------------------------------------------

/// Fires when the base touches anything.
pub struct BaseContactTermination;

impl TerminationCondition<TerminationInputs> for BaseContactTermination {
    fn is_terminated(&self, ctx: &TerminationInputs) -> bool {
        ctx.base_contact
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "BaseContactTermination"
    }
}

// ---------------------------------------------------------------------------
// YawRateTermination
// ---------------------------------------------------------------------------

/// Fires on a yaw rate no real gait produces, or a non-finite one.
pub struct YawRateTermination {
    max_yaw_rate: f32,
}

impl YawRateTermination {
    #[must_use]
    pub const fn new(max_yaw_rate: f32) -> Self {
        Self { max_yaw_rate }
    }
}

impl TerminationCondition<TerminationInputs> for YawRateTermination {
    fn is_terminated(&self, ctx: &TerminationInputs) -> bool {
        !ctx.yaw_rate.is_finite() || ctx.yaw_rate.abs() > self.max_yaw_rate
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "YawRateTermination"
    }
}

// ---------------------------------------------------------------------------
// TerminationEvaluator
// ---------------------------------------------------------------------------

/// Outcome for one environment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EndFlags {
    pub terminated: bool,
    pub truncated: bool,
}

impl EndFlags {
    pub const fn done(self) -> bool {
        self.terminated || self.truncated
    }
}

/// Timeout plus the failure conditions.
pub struct TerminationEvaluator {
    timeout: TimeoutTermination,
    failures: CompositeTermination<TerminationInputs>,
    base_contact: Option<SensorId>,
    base_contact_threshold: f32,
}

impl TerminationEvaluator {
    pub fn new(
        max_steps: u32,
        settings: &TerminationSettings,
        base_contact: Option<SensorId>,
    ) -> Self {
        Self {
            timeout: TimeoutTermination::new(max_steps),
            failures: CompositeTermination::new()
                .add(Box::new(BaseContactTermination))
                .add(Box::new(YawRateTermination::new(settings.max_yaw_rate))),
            base_contact,
            base_contact_threshold: settings.base_contact_threshold,
        }
    }

    pub fn evaluate(&self, ctx: &TerminationInputs) -> EndFlags {
        EndFlags {
            terminated: self.failures.is_terminated(ctx),
            truncated: self.timeout.is_terminated(ctx),
        }
    }

    /// Names of every condition that fires.
    pub fn triggered(&self, ctx: &TerminationInputs) -> Vec<&str> {
        let mut names = self.failures.triggered(ctx);
        if self.timeout.is_terminated(ctx) {
            names.push(self.timeout.name());
        }
        names
    }

    /// Per-environment base contact flags.
    ///
    /// A reading with one row per environment is checked channel-wise. Any
    /// other shape broadcasts its first value. A missing sensor or failed
    /// read never terminates.
    pub fn base_contact_mask<S: SimBackend + ?Sized>(&self, sim: &S) -> Vec<bool> {
        let num_envs = sim.num_envs();
        let Some(reading) = self.base_contact.and_then(|id| sim.read_sensor(id).ok()) else {
            return vec![false; num_envs];
        };
        if reading.rows() == num_envs {
            return (0..num_envs)
                .map(|env| reading.any_above(env, self.base_contact_threshold))
                .collect();
        }
        let first = reading.row(0).first().copied().unwrap_or(0.0);
        vec![first > self.base_contact_threshold; num_envs]
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
