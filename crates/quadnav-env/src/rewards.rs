//! Navigation reward terms and the two-regime evaluator.
//!
//! Every term is a small struct implementing
//! [`RewardFunction<RewardInputs>`](quadnav_core::traits::RewardFunction).
//! Terms return unweighted values; penalties are positive magnitudes that
//! take a negative weight. The evaluator builds one [`CompositeReward`] per
//! regime from the configured weights and switches on `reached_all`.
//!
//! # Example
//!
//! ```
//! use quadnav_core::traits::{CompositeReward, RewardFunction};
//! use quadnav_env::rewards::{ActionRatePenalty, RewardInputs, VerticalMotion};
//!
//! let reward = CompositeReward::<RewardInputs>::new()
//!     .add(Box::new(VerticalMotion), 0.6)
//!     .add(Box::new(ActionRatePenalty), -8e-5);
//! let inputs = RewardInputs::default();
//! assert!((reward.compute(&inputs) - 0.6).abs() < 1e-6);
//! ```

use std::f32::consts::PI;

use nalgebra::Vector3;
use quadnav_core::config::{ControlSettings, NormalizationSettings, RewardSettings, RewardWeights, ShapingSettings};
use quadnav_core::math::{sign, signed_slope, tilt_angle, wrap_angle};
use quadnav_core::traits::{CompositeReward, RewardFunction};
use quadnav_core::types::{JointVector, NUM_LEGS};
use quadnav_actuator::terrain::TerrainClassifier;
use quadnav_nav::command::{GoalError, VelocityCommand};

use crate::episode::EnvEpisode;
use crate::state::RobotState;

/// Joint speeds beyond this count as a numeric blow-up.
pub const ABSURD_JOINT_SPEED: f32 = 1e6;

// ---------------------------------------------------------------------------
// RewardInputs
// ---------------------------------------------------------------------------

/// Everything a reward term may read for one environment and step.
#[derive(Debug, Clone, PartialEq)]
pub struct RewardInputs {
    /// Body-frame linear velocity, clipped.
    pub lin_vel: Vector3<f32>,
    /// Body angular velocity, clipped.
    pub ang_vel: Vector3<f32>,
    /// Projected gravity from the base quaternion.
    pub gravity: Vector3<f32>,
    /// Signed slope angle (radians), negative nose-down.
    pub slope: f32,
    pub downhill: bool,
    pub heading: f32,
    pub command: VelocityCommand,
    pub error: GoalError,
    /// Closest distance so far, before this step.
    pub min_distance: f32,
    pub feet: [Option<Vector3<f32>>; NUM_LEGS],
    pub torques: JointVector,
    pub joint_vel: JointVector,
    pub action: JointVector,
    pub last_action: JointVector,
    /// `reached_all` holds for the first time this episode.
    pub first_reach: bool,
    /// A termination-penalty condition holds.
    pub failure: bool,
}

impl Default for RewardInputs {
    fn default() -> Self {
        Self {
            lin_vel: Vector3::zeros(),
            ang_vel: Vector3::zeros(),
            gravity: Vector3::new(0.0, 0.0, -1.0),
            slope: 0.0,
            downhill: false,
            heading: 0.0,
            command: VelocityCommand::default(),
            error: GoalError {
                position: nalgebra::Vector2::zeros(),
                distance: 0.0,
                heading: 0.0,
            },
            min_distance: 0.0,
            feet: [None; NUM_LEGS],
            torques: [0.0; 12],
            joint_vel: [0.0; 12],
            action: [0.0; 12],
            last_action: [0.0; 12],
            first_reach: false,
            failure: false,
        }
    }
}

impl RewardInputs {
    /// Heading change needed to face the target, wrapped.
    pub fn heading_to_target(&self) -> f32 {
        let e = &self.error.position;
        wrap_angle(e.y.atan2(e.x + 1e-6) - self.heading)
    }

    fn planar_speed(&self) -> f32 {
        self.lin_vel.xy().norm()
    }

    fn roll_pitch_rate_sq(&self) -> f32 {
        self.ang_vel.xy().norm_squared()
    }

    fn all_feet(&self) -> Option<[Vector3<f32>; NUM_LEGS]> {
        let [fr, fl, rr, rl] = self.feet;
        Some([fr?, fl?, rr?, rl?])
    }
}

// ---------------------------------------------------------------------------
// Tracking and heading terms
// ---------------------------------------------------------------------------

/// `exp(-|cmd_xy - v_xy|^2 / sigma^2)`.
pub struct TrackingLinVel {
    pub sigma_sq: f32,
}

impl TrackingLinVel {
    #[must_use]
    pub const fn new(sigma_sq: f32) -> Self {
        Self { sigma_sq }
    }
}

impl RewardFunction<RewardInputs> for TrackingLinVel {
    fn compute(&self, ctx: &RewardInputs) -> f32 {
        let err = (ctx.command.lin - ctx.lin_vel.xy()).norm_squared();
        (-err / self.sigma_sq).exp()
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "TrackingLinVel"
    }
}

/// `exp(-(cmd_yaw - w_z)^2 / sigma^2)`.
pub struct TrackingAngVel {
    pub sigma_sq: f32,
}

impl TrackingAngVel {
    #[must_use]
    pub const fn new(sigma_sq: f32) -> Self {
        Self { sigma_sq }
    }
}

impl RewardFunction<RewardInputs> for TrackingAngVel {
    fn compute(&self, ctx: &RewardInputs) -> f32 {
        let err = ctx.command.yaw_rate - ctx.ang_vel.z;
        (-err * err / self.sigma_sq).exp()
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "TrackingAngVel"
    }
}

/// Rewards moving the way the body faces; sideways and backward score 0.
pub struct ForwardAlignment;

impl RewardFunction<RewardInputs> for ForwardAlignment {
    fn compute(&self, ctx: &RewardInputs) -> f32 {
        let movement = ctx.lin_vel.y.atan2(ctx.lin_vel.x + 1e-6);
        (movement - ctx.heading).cos().clamp(0.0, 1.0)
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "ForwardAlignment"
    }
}

/// Yaw rate in the direction of a large required turn.
pub struct TurnPreparation {
    threshold: f32,
}

impl TurnPreparation {
    #[must_use]
    pub fn new(threshold_deg: f32) -> Self {
        Self {
            threshold: threshold_deg.to_radians(),
        }
    }
}

impl RewardFunction<RewardInputs> for TurnPreparation {
    fn compute(&self, ctx: &RewardInputs) -> f32 {
        let h = ctx.heading_to_target();
        let w = ctx.ang_vel.z;
        if h.abs() > self.threshold && sign(h) * sign(w + 1e-6) > 0.5 {
            (w.abs() * 2.0).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "TurnPreparation"
    }
}

/// Gaussian on the remaining heading-to-target error, sigma 30 degrees.
pub struct HeadingAlignment;

impl RewardFunction<RewardInputs> for HeadingAlignment {
    fn compute(&self, ctx: &RewardInputs) -> f32 {
        let h = ctx.heading_to_target();
        let sigma = PI / 6.0;
        (-h * h / (sigma * sigma)).exp()
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "HeadingAlignment"
    }
}

/// Flat bonus for turning on the spot near the target.
pub struct TurnInPlace {
    bonus: f32,
    radius: f32,
    min_turn: f32,
    max_speed: f32,
    min_yaw_rate: f32,
}

impl TurnInPlace {
    #[must_use]
    pub fn new(shaping: &ShapingSettings) -> Self {
        Self {
            bonus: shaping.turn_in_place_bonus,
            radius: shaping.turn_in_place_radius,
            min_turn: shaping.turn_in_place_min_turn_deg.to_radians(),
            max_speed: shaping.turn_in_place_max_speed,
            min_yaw_rate: shaping.turn_in_place_min_yaw_rate,
        }
    }
}

impl RewardFunction<RewardInputs> for TurnInPlace {
    fn compute(&self, ctx: &RewardInputs) -> f32 {
        let turning = ctx.error.distance < self.radius
            && ctx.heading_to_target().abs() > self.min_turn
            && ctx.planar_speed() < self.max_speed
            && ctx.ang_vel.z.abs() > self.min_yaw_rate;
        if turning {
            self.bonus
        } else {
            0.0
        }
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "TurnInPlace"
    }
}

/// Clipped credit for beating the closest distance of the episode.
pub struct Approach {
    pub gain: f32,
}

impl Approach {
    #[must_use]
    pub const fn new(gain: f32) -> Self {
        Self { gain }
    }
}

impl RewardFunction<RewardInputs> for Approach {
    fn compute(&self, ctx: &RewardInputs) -> f32 {
        ((ctx.min_distance - ctx.error.distance) * self.gain).clamp(-1.0, 1.0)
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "Approach"
    }
}

// ---------------------------------------------------------------------------
// Gait terms
// ---------------------------------------------------------------------------

/// Rewards lifted feet. Zero unless all four feet resolve.
pub struct FootClearance {
    base: f32,
    gain: f32,
}

impl FootClearance {
    #[must_use]
    pub const fn new(base: f32, gain: f32) -> Self {
        Self { base, gain }
    }
}

impl RewardFunction<RewardInputs> for FootClearance {
    fn compute(&self, ctx: &RewardInputs) -> f32 {
        ctx.all_feet().map_or(0.0, |feet| {
            feet.iter()
                .map(|f| ((f.z - self.base) * self.gain).clamp(0.0, 1.0))
                .sum()
        })
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "FootClearance"
    }
}

/// Height mismatch of the diagonal pairs FL/RR and FR/RL beyond a margin.
pub struct GaitSymmetryPenalty {
    margin: f32,
    gain: f32,
}

impl GaitSymmetryPenalty {
    #[must_use]
    pub const fn new(margin: f32, gain: f32) -> Self {
        Self { margin, gain }
    }
}

impl RewardFunction<RewardInputs> for GaitSymmetryPenalty {
    fn compute(&self, ctx: &RewardInputs) -> f32 {
        let Some([fr, fl, rr, rl]) = ctx.all_feet() else {
            return 0.0;
        };
        [(fl.z, rr.z), (fr.z, rl.z)]
            .iter()
            .map(|(a, b)| (((a - b).abs() - self.margin) * self.gain).clamp(0.0, 1.0))
            .sum()
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "GaitSymmetryPenalty"
    }
}

/// Mean lateral clearance of the feet from a step edge.
///
/// Unresolved feet count as centred.
pub struct EdgeDistance {
    pub margin: f32,
}

impl EdgeDistance {
    #[must_use]
    pub const fn new(margin: f32) -> Self {
        Self { margin }
    }
}

impl RewardFunction<RewardInputs> for EdgeDistance {
    #[allow(clippy::cast_precision_loss)]
    fn compute(&self, ctx: &RewardInputs) -> f32 {
        let total: f32 = ctx
            .feet
            .iter()
            .map(|f| (self.margin - f.map_or(0.0, |p| p.x).abs()).max(0.0))
            .sum();
        (total / NUM_LEGS as f32 / self.margin).clamp(0.0, 1.0)
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "EdgeDistance"
    }
}

// ---------------------------------------------------------------------------
// Terrain terms
// ---------------------------------------------------------------------------

/// Gaussian on the slope angle, sigma 22.5 degrees.
pub struct SlopeAdaptation;

impl RewardFunction<RewardInputs> for SlopeAdaptation {
    fn compute(&self, ctx: &RewardInputs) -> f32 {
        let sigma = PI / 8.0;
        (-ctx.slope * ctx.slope / (sigma * sigma)).exp()
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "SlopeAdaptation"
    }
}

/// Blend of low vertical speed, low roll/pitch rate and a mild slope.
pub struct DynamicStability;

impl RewardFunction<RewardInputs> for DynamicStability {
    fn compute(&self, ctx: &RewardInputs) -> f32 {
        let vz = ctx.lin_vel.z;
        let sigma = PI / 6.0;
        0.4 * (-vz * vz / 0.25).exp()
            + 0.3 * (-ctx.roll_pitch_rate_sq()).exp()
            + 0.3 * (-ctx.slope * ctx.slope / (sigma * sigma)).exp()
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "DynamicStability"
    }
}

/// `exp(-v_z^2)`.
pub struct VerticalMotion;

impl RewardFunction<RewardInputs> for VerticalMotion {
    fn compute(&self, ctx: &RewardInputs) -> f32 {
        (-ctx.lin_vel.z * ctx.lin_vel.z).exp()
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "VerticalMotion"
    }
}

/// Bonus for vertical motion on terrain that is not too steep.
pub struct StairStep {
    pub bonus: f32,
}

impl StairStep {
    #[must_use]
    pub const fn new(bonus: f32) -> Self {
        Self { bonus }
    }
}

impl RewardFunction<RewardInputs> for StairStep {
    fn compute(&self, ctx: &RewardInputs) -> f32 {
        if ctx.lin_vel.z.abs() > 0.1 && ctx.slope.abs() < 45_f32.to_radians() {
            self.bonus
        } else {
            0.0
        }
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "StairStep"
    }
}

/// Bonus while a front foot is raised and the body rises.
pub struct StairClimb {
    pub incentive: f32,
}

impl StairClimb {
    #[must_use]
    pub const fn new(incentive: f32) -> Self {
        Self { incentive }
    }
}

impl RewardFunction<RewardInputs> for StairClimb {
    fn compute(&self, ctx: &RewardInputs) -> f32 {
        let (Some(fr), Some(fl)) = (ctx.feet[0], ctx.feet[1]) else {
            return 0.0;
        };
        if (fr.z > 0.1 || fl.z > 0.1) && ctx.lin_vel.z > 0.05 {
            self.incentive
        } else {
            0.0
        }
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "StairClimb"
    }
}

/// Flat bonus on downhill terrain.
pub struct DownhillIncentive {
    pub incentive: f32,
}

impl DownhillIncentive {
    #[must_use]
    pub const fn new(incentive: f32) -> Self {
        Self { incentive }
    }
}

impl RewardFunction<RewardInputs> for DownhillIncentive {
    fn compute(&self, ctx: &RewardInputs) -> f32 {
        if ctx.downhill {
            self.incentive
        } else {
            0.0
        }
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "DownhillIncentive"
    }
}

/// Steady, moving descent: low roll/pitch rate times a speed ramp.
pub struct DownhillStability;

impl RewardFunction<RewardInputs> for DownhillStability {
    fn compute(&self, ctx: &RewardInputs) -> f32 {
        if !ctx.downhill {
            return 0.0;
        }
        (-ctx.roll_pitch_rate_sq() / 0.09).exp() * (ctx.planar_speed() / 0.8).clamp(0.0, 1.0)
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "DownhillStability"
    }
}

// ---------------------------------------------------------------------------
// Goal terms
// ---------------------------------------------------------------------------

/// Holding still once the course is complete.
pub struct StopBonus {
    speed_scale: f32,
    yaw_scale: f32,
    speed_weight: f32,
    yaw_weight: f32,
    multiplier: f32,
    zero_ang_bonus: f32,
    zero_ang_threshold: f32,
}

impl StopBonus {
    #[must_use]
    pub const fn new(shaping: &ShapingSettings) -> Self {
        Self {
            speed_scale: shaping.stop_speed_scale,
            yaw_scale: shaping.stop_yaw_scale,
            speed_weight: shaping.stop_speed_weight,
            yaw_weight: shaping.stop_yaw_weight,
            multiplier: shaping.stop_multiplier,
            zero_ang_bonus: shaping.zero_ang_bonus,
            zero_ang_threshold: shaping.zero_ang_threshold,
        }
    }
}

impl RewardFunction<RewardInputs> for StopBonus {
    fn compute(&self, ctx: &RewardInputs) -> f32 {
        let speed = (ctx.planar_speed() / self.speed_scale).powi(2).min(100.0);
        let yaw = (ctx.ang_vel.z.abs() / self.yaw_scale).powi(4).min(100.0);
        let base = self.multiplier
            * self
                .speed_weight
                .mul_add((-speed).exp(), self.yaw_weight * (-yaw).exp());
        if ctx.ang_vel.z.abs() < self.zero_ang_threshold {
            base + self.zero_ang_bonus
        } else {
            base
        }
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "StopBonus"
    }
}

/// One-off bonus on the first step the course is complete.
pub struct ArrivalBonus {
    pub bonus: f32,
}

impl ArrivalBonus {
    #[must_use]
    pub const fn new(bonus: f32) -> Self {
        Self { bonus }
    }
}

impl RewardFunction<RewardInputs> for ArrivalBonus {
    fn compute(&self, ctx: &RewardInputs) -> f32 {
        if ctx.first_reach {
            self.bonus
        } else {
            0.0
        }
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "ArrivalBonus"
    }
}

/// Fixed penalty when the robot fell, flipped or blew up.
pub struct TerminationPenalty {
    pub penalty: f32,
}

impl TerminationPenalty {
    #[must_use]
    pub const fn new(penalty: f32) -> Self {
        Self { penalty }
    }
}

impl RewardFunction<RewardInputs> for TerminationPenalty {
    fn compute(&self, ctx: &RewardInputs) -> f32 {
        if ctx.failure {
            self.penalty
        } else {
            0.0
        }
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "TerminationPenalty"
    }
}

// ---------------------------------------------------------------------------
// Regularization penalties
// ---------------------------------------------------------------------------

/// `(v_z * scale)^2`.
pub struct LinVelZPenalty {
    pub scale: f32,
}

impl LinVelZPenalty {
    #[must_use]
    pub const fn new(scale: f32) -> Self {
        Self { scale }
    }
}

impl RewardFunction<RewardInputs> for LinVelZPenalty {
    fn compute(&self, ctx: &RewardInputs) -> f32 {
        (ctx.lin_vel.z * self.scale).powi(2)
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "LinVelZPenalty"
    }
}

/// Squared roll and pitch rate, scaled.
pub struct AngVelXyPenalty {
    pub scale: f32,
}

impl AngVelXyPenalty {
    #[must_use]
    pub const fn new(scale: f32) -> Self {
        Self { scale }
    }
}

impl RewardFunction<RewardInputs> for AngVelXyPenalty {
    fn compute(&self, ctx: &RewardInputs) -> f32 {
        ctx.ang_vel.xy().map(|w| (w * self.scale).powi(2)).sum()
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "AngVelXyPenalty"
    }
}

/// Squared distance of projected gravity from straight down.
pub struct OrientationPenalty;

impl RewardFunction<RewardInputs> for OrientationPenalty {
    fn compute(&self, ctx: &RewardInputs) -> f32 {
        let g = &ctx.gravity;
        (g.z + 1.0).mul_add(g.z + 1.0, g.x.mul_add(g.x, g.y * g.y))
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "OrientationPenalty"
    }
}

/// Sum of squared actuator torques.
pub struct TorquePenalty;

impl RewardFunction<RewardInputs> for TorquePenalty {
    fn compute(&self, ctx: &RewardInputs) -> f32 {
        ctx.torques.iter().map(|t| t * t).sum()
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "TorquePenalty"
    }
}

/// Sum of squared, clipped and scaled joint velocities.
pub struct DofVelPenalty {
    max_vel: f32,
    scale: f32,
}

impl DofVelPenalty {
    #[must_use]
    pub const fn new(max_vel: f32, scale: f32) -> Self {
        Self { max_vel, scale }
    }
}

impl RewardFunction<RewardInputs> for DofVelPenalty {
    fn compute(&self, ctx: &RewardInputs) -> f32 {
        ctx.joint_vel
            .iter()
            .map(|qd| (qd.clamp(-self.max_vel, self.max_vel) * self.scale).powi(2))
            .sum()
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "DofVelPenalty"
    }
}

/// Sum of squared action changes.
pub struct ActionRatePenalty;

impl RewardFunction<RewardInputs> for ActionRatePenalty {
    fn compute(&self, ctx: &RewardInputs) -> f32 {
        ctx.action
            .iter()
            .zip(&ctx.last_action)
            .map(|(a, b)| (a - b) * (a - b))
            .sum()
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "ActionRatePenalty"
    }
}

// ---------------------------------------------------------------------------
// Regimes
// ---------------------------------------------------------------------------

/// Composite for one weight table. Zero-weight terms are left out.
pub fn build_regime(
    weights: &RewardWeights,
    shaping: &ShapingSettings,
    norm: &NormalizationSettings,
    max_dof_vel: f32,
) -> CompositeReward<RewardInputs> {
    let w = weights;
    let s = shaping;
    CompositeReward::new()
        .add_weighted(Box::new(TrackingLinVel::new(s.tracking_sigma_sq)), w.tracking_lin_vel)
        .add_weighted(Box::new(TrackingAngVel::new(s.tracking_sigma_sq)), w.tracking_ang_vel)
        .add_weighted(Box::new(ForwardAlignment), w.forward_alignment)
        .add_weighted(Box::new(TurnPreparation::new(s.turn_prep_threshold_deg)), w.turn_preparation)
        .add_weighted(Box::new(HeadingAlignment), w.heading_alignment)
        .add_weighted(Box::new(TurnInPlace::new(s)), w.turn_in_place)
        .add_weighted(
            Box::new(FootClearance::new(s.foot_clearance_base, s.foot_clearance_gain)),
            w.foot_clearance,
        )
        .add_weighted(Box::new(Approach::new(s.approach_gain)), w.approach)
        .add_weighted(Box::new(SlopeAdaptation), w.slope_adaptation)
        .add_weighted(Box::new(EdgeDistance::new(s.edge_margin)), w.edge_distance)
        .add_weighted(Box::new(DynamicStability), w.dynamic_stability)
        .add_weighted(Box::new(VerticalMotion), w.vertical_motion)
        .add_weighted(Box::new(StairStep::new(s.stair_step_bonus)), w.stair_step)
        .add_weighted(Box::new(StairClimb::new(s.stair_climb_incentive)), w.stair_climb)
        .add_weighted(Box::new(DownhillIncentive::new(s.downhill_incentive)), w.downhill_incentive)
        .add_weighted(Box::new(DownhillStability), w.downhill_stability)
        .add_weighted(Box::new(StopBonus::new(s)), w.stop_bonus)
        .add_weighted(Box::new(ArrivalBonus::new(s.arrival_bonus)), w.arrival_bonus)
        .add_weighted(Box::new(LinVelZPenalty::new(norm.lin_vel)), w.lin_vel_z)
        .add_weighted(Box::new(AngVelXyPenalty::new(norm.ang_vel)), w.ang_vel_xy)
        .add_weighted(Box::new(OrientationPenalty), w.orientation)
        .add_weighted(Box::new(TorquePenalty), w.torques)
        .add_weighted(Box::new(DofVelPenalty::new(max_dof_vel, norm.dof_vel)), w.dof_vel)
        .add_weighted(Box::new(ActionRatePenalty), w.action_rate)
        .add_weighted(
            Box::new(GaitSymmetryPenalty::new(s.gait_asymmetry_margin, s.gait_asymmetry_gain)),
            w.gait_symmetry,
        )
        .add_weighted(Box::new(TerminationPenalty::new(s.termination_penalty)), w.termination)
}

// ---------------------------------------------------------------------------
// RewardEvaluator
// ---------------------------------------------------------------------------

/// Result of one environment's reward evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RewardOutcome {
    pub reward: f32,
    /// The arrival bonus fired this step.
    pub first_reach: bool,
    /// A termination-penalty condition held.
    pub failure: bool,
}

/// Two-regime reward with numeric guards.
pub struct RewardEvaluator {
    unreached: CompositeReward<RewardInputs>,
    reached: CompositeReward<RewardInputs>,
    classifier: TerrainClassifier,
    lin_vel_clip: f32,
    ang_vel_clip: f32,
    side_flip: f32,
    max_dof_vel: f32,
}

impl RewardEvaluator {
    pub fn new(
        rewards: &RewardSettings,
        norm: &NormalizationSettings,
        control: &ControlSettings,
    ) -> Self {
        let s = &rewards.shaping;
        Self {
            unreached: build_regime(&rewards.unreached, s, norm, control.max_dof_vel),
            reached: build_regime(&rewards.reached, s, norm, control.max_dof_vel),
            classifier: TerrainClassifier::from_degrees(control.downhill_band_deg),
            lin_vel_clip: s.lin_vel_clip,
            ang_vel_clip: s.ang_vel_clip,
            side_flip: s.side_flip_deg.to_radians(),
            max_dof_vel: control.max_dof_vel,
        }
    }

    /// Composite of the given regime.
    pub const fn regime(&self, reached_all: bool) -> &CompositeReward<RewardInputs> {
        if reached_all {
            &self.reached
        } else {
            &self.unreached
        }
    }

    /// Joint speeds above the cap, or non-finite, or absurdly large.
    pub fn joint_velocity_blowup(&self, joint_vel: &JointVector) -> bool {
        joint_vel
            .iter()
            .any(|v| !v.is_finite() || v.abs() > self.max_dof_vel || v.abs() > ABSURD_JOINT_SPEED)
    }

    /// Tilt beyond the side-flip limit.
    pub fn flipped(&self, gravity: &Vector3<f32>) -> bool {
        tilt_angle(gravity) > self.side_flip
    }

    /// Gather the inputs for one environment.
    pub fn inputs(
        &self,
        state: &RobotState,
        episode: &EnvEpisode,
        command: &VelocityCommand,
        error: &GoalError,
        reached_all: bool,
        base_ground_contact: bool,
    ) -> RewardInputs {
        let slope = signed_slope(&state.slope_gravity);
        let failure = base_ground_contact
            || self.joint_velocity_blowup(&state.joint_vel)
            || self.flipped(&state.gravity);
        RewardInputs {
            lin_vel: clip_vec(&state.local_lin_vel, self.lin_vel_clip),
            ang_vel: clip_vec(&state.gyro, self.ang_vel_clip),
            gravity: state.gravity,
            slope,
            downhill: self.classifier.classify_slope(slope).is_downhill(),
            heading: state.heading,
            command: *command,
            error: *error,
            min_distance: if episode.min_distance.is_finite() {
                episode.min_distance
            } else {
                error.distance
            },
            feet: state.feet,
            torques: state.torques,
            joint_vel: state.joint_vel,
            action: episode.current_action,
            last_action: episode.last_action,
            first_reach: reached_all && !episode.ever_reached,
            failure,
        }
    }

    /// Reward for one environment; updates `ever_reached` and
    /// `min_distance` on the episode.
    pub fn evaluate(
        &self,
        state: &RobotState,
        episode: &mut EnvEpisode,
        command: &VelocityCommand,
        error: &GoalError,
        reached_all: bool,
        base_ground_contact: bool,
    ) -> RewardOutcome {
        let inputs = self.inputs(state, episode, command, error, reached_all, base_ground_contact);
        let mut reward = self.regime(reached_all).compute(&inputs);
        if !reward.is_finite() {
            reward = 0.0;
        }
        episode.ever_reached |= reached_all;
        episode.min_distance = inputs.min_distance.min(error.distance);
        RewardOutcome {
            reward,
            first_reach: inputs.first_reach,
            failure: inputs.failure,
        }
    }

    /// Weighted per-term values for diagnostics.
    pub fn breakdown(&self, inputs: &RewardInputs, reached_all: bool) -> Vec<(&str, f32)> {
        self.regime(reached_all).breakdown(inputs)
    }
}

fn clip_vec(v: &Vector3<f32>, limit: f32) -> Vector3<f32> {
    v.map(|c| if c.is_nan() { 0.0 } else { c.clamp(-limit, limit) })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::f32::consts::FRAC_PI_2;

    use nalgebra::Vector2;
    use quadnav_core::config::NavConfig;
    use quadnav_core::math::{euler_to_quat, projected_gravity};
    use quadnav_nav::command::PoseCommand;

    use super::*;

    fn inputs() -> RewardInputs {
        RewardInputs::default()
    }

    fn feet(z: [f32; 4]) -> [Option<Vector3<f32>>; 4] {
        z.map(|z| Some(Vector3::new(0.0, 0.0, z)))
    }

    fn evaluator() -> RewardEvaluator {
        let c = NavConfig::default();
        RewardEvaluator::new(&c.rewards, &c.normalization, &c.control)
    }

    fn state() -> RobotState {
        RobotState {
            position: Vector3::new(0.0, 0.0, 0.5),
            orientation: [0.0, 0.0, 0.0, 1.0],
            heading: 0.0,
            world_lin_vel: Vector3::zeros(),
            local_lin_vel: Vector3::zeros(),
            gyro: Vector3::zeros(),
            gravity: Vector3::new(0.0, 0.0, -1.0),
            gravity_reading: None,
            slope_gravity: Vector3::new(0.0, 0.0, -1.0),
            joint_pos: [0.0; 12],
            joint_vel: [0.0; 12],
            torques: [0.0; 12],
            feet: [None; 4],
        }
    }

    // -- Send + Sync --

    #[test]
    fn terms_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<TrackingLinVel>();
        assert_send_sync::<StopBonus>();
        assert_send_sync::<RewardEvaluator>();
        assert_send_sync::<Box<dyn RewardFunction<RewardInputs>>>();
    }

    // -- tracking --

    #[test]
    fn tracking_peaks_when_matched() {
        let mut ctx = inputs();
        ctx.command.lin = Vector2::new(0.5, 0.0);
        ctx.lin_vel = Vector3::new(0.5, 0.0, 0.0);
        assert!((TrackingLinVel::new(0.25).compute(&ctx) - 1.0).abs() < f32::EPSILON);
        ctx.lin_vel.x = 0.0;
        let expected = (-0.25_f32 / 0.25).exp();
        assert!((TrackingLinVel::new(0.25).compute(&ctx) - expected).abs() < 1e-6);
    }

    #[test]
    fn forward_alignment_ignores_backward() {
        let mut ctx = inputs();
        ctx.lin_vel = Vector3::new(1.0, 0.0, 0.0);
        assert!((ForwardAlignment.compute(&ctx) - 1.0).abs() < 1e-5);
        ctx.lin_vel = Vector3::new(-1.0, 0.0, 0.0);
        assert!(ForwardAlignment.compute(&ctx).abs() < f32::EPSILON);
    }

    // -- turning --

    #[test]
    fn turn_preparation_needs_matching_direction() {
        let term = TurnPreparation::new(30.0);
        let mut ctx = inputs();
        ctx.error.position = Vector2::new(0.0, 2.0);
        ctx.ang_vel.z = 0.3;
        assert!((term.compute(&ctx) - 0.6).abs() < 1e-6);
        ctx.ang_vel.z = -0.3;
        assert!(term.compute(&ctx).abs() < f32::EPSILON);
    }

    #[test]
    fn turn_in_place_profile() {
        let term = TurnInPlace::new(&ShapingSettings::default());
        let mut ctx = inputs();
        ctx.error.position = Vector2::new(0.0, 0.8);
        ctx.error.distance = 0.8;
        ctx.ang_vel.z = 1.0;
        assert!((term.compute(&ctx) - 1.5).abs() < f32::EPSILON);
        ctx.lin_vel.x = 0.5;
        assert!(term.compute(&ctx).abs() < f32::EPSILON);
    }

    #[test]
    fn heading_alignment_is_gaussian() {
        let mut ctx = inputs();
        ctx.error.position = Vector2::new(1.0, 0.0);
        assert!((HeadingAlignment.compute(&ctx) - 1.0).abs() < 1e-5);
        ctx.error.position = Vector2::new(0.0, 1.0);
        let h = FRAC_PI_2;
        let expected = (-h * h / (PI / 6.0).powi(2)).exp();
        assert!((HeadingAlignment.compute(&ctx) - expected).abs() < 1e-4);
    }

    // -- approach --

    #[test]
    fn approach_credits_new_minimum() {
        let mut ctx = inputs();
        ctx.min_distance = 2.0;
        ctx.error.distance = 1.9;
        assert!((Approach::new(4.0).compute(&ctx) - 0.4).abs() < 1e-5);
        ctx.error.distance = 3.0;
        assert!((Approach::new(4.0).compute(&ctx) + 1.0).abs() < f32::EPSILON);
    }

    // -- gait --

    #[test]
    fn foot_terms_need_all_feet() {
        let mut ctx = inputs();
        ctx.feet = feet([0.3, 0.3, 0.3, 0.3]);
        assert!((FootClearance::new(0.05, 2.0).compute(&ctx) - 2.0).abs() < 1e-5);
        ctx.feet[2] = None;
        assert!(FootClearance::new(0.05, 2.0).compute(&ctx).abs() < f32::EPSILON);
        assert!(GaitSymmetryPenalty::new(0.03, 5.0).compute(&ctx).abs() < f32::EPSILON);
    }

    #[test]
    fn gait_symmetry_on_diagonals() {
        let mut ctx = inputs();
        // FL/RR differ by 0.23, FR/RL match.
        ctx.feet = feet([0.0, 0.25, 0.02, 0.0]);
        let p = GaitSymmetryPenalty::new(0.03, 5.0).compute(&ctx);
        assert!((p - 1.0).abs() < 1e-5);
    }

    #[test]
    fn edge_distance_means_over_feet() {
        let mut ctx = inputs();
        ctx.feet = [
            Some(Vector3::new(0.0, 0.0, 0.0)),
            Some(Vector3::new(0.15, 0.0, 0.0)),
            Some(Vector3::new(-0.3, 0.0, 0.0)),
            None,
        ];
        // (0.15 + 0 + 0 + 0.15) / 4 / 0.15
        assert!((EdgeDistance::new(0.15).compute(&ctx) - 0.5).abs() < 1e-5);
    }

    #[test]
    fn stair_climb_needs_front_feet() {
        let mut ctx = inputs();
        ctx.lin_vel.z = 0.1;
        ctx.feet = [Some(Vector3::new(0.0, 0.0, 0.2)), Some(Vector3::zeros()), None, None];
        assert!((StairClimb::new(0.8).compute(&ctx) - 0.8).abs() < f32::EPSILON);
        ctx.feet[1] = None;
        assert!(StairClimb::new(0.8).compute(&ctx).abs() < f32::EPSILON);
    }

    // -- terrain --

    #[test]
    fn downhill_terms_gate_on_flag() {
        let mut ctx = inputs();
        ctx.lin_vel = Vector3::new(0.8, 0.0, 0.0);
        assert!(DownhillIncentive::new(0.8).compute(&ctx).abs() < f32::EPSILON);
        assert!(DownhillStability.compute(&ctx).abs() < f32::EPSILON);
        ctx.downhill = true;
        assert!((DownhillIncentive::new(0.8).compute(&ctx) - 0.8).abs() < f32::EPSILON);
        assert!((DownhillStability.compute(&ctx) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn stair_step_requires_vertical_motion() {
        let mut ctx = inputs();
        assert!(StairStep::new(0.5).compute(&ctx).abs() < f32::EPSILON);
        ctx.lin_vel.z = -0.2;
        assert!((StairStep::new(0.5).compute(&ctx) - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn stability_terms_peak_at_rest() {
        let ctx = inputs();
        assert!((DynamicStability.compute(&ctx) - 1.0).abs() < 1e-6);
        assert!((VerticalMotion.compute(&ctx) - 1.0).abs() < f32::EPSILON);
        assert!((SlopeAdaptation.compute(&ctx) - 1.0).abs() < f32::EPSILON);
    }

    // -- goal terms --

    #[test]
    fn stop_bonus_at_rest() {
        let term = StopBonus::new(&ShapingSettings::default());
        let ctx = inputs();
        // 2 * (0.8 + 1.2) + 6
        assert!((term.compute(&ctx) - 10.0).abs() < 1e-5);
    }

    #[test]
    fn stop_bonus_saturates_without_overflow() {
        let term = StopBonus::new(&ShapingSettings::default());
        let mut ctx = inputs();
        ctx.lin_vel = Vector3::new(100.0, 0.0, 0.0);
        ctx.ang_vel.z = 20.0;
        let v = term.compute(&ctx);
        assert!(v.is_finite());
        assert!(v < 1e-3);
    }

    // -- penalties --

    #[test]
    fn penalties_are_magnitudes() {
        let mut ctx = inputs();
        ctx.lin_vel.z = 0.5;
        ctx.ang_vel = Vector3::new(2.0, 0.0, 0.0);
        ctx.torques[0] = 3.0;
        ctx.joint_vel = [200.0; 12];
        ctx.action[0] = 1.0;
        assert!((LinVelZPenalty::new(2.0).compute(&ctx) - 1.0).abs() < 1e-6);
        assert!((AngVelXyPenalty::new(0.25).compute(&ctx) - 0.25).abs() < 1e-6);
        assert!((TorquePenalty.compute(&ctx) - 9.0).abs() < 1e-6);
        // Clipped to 100, scaled by 0.05: 12 * 25.
        assert!((DofVelPenalty::new(100.0, 0.05).compute(&ctx) - 300.0).abs() < 1e-3);
        assert!((ActionRatePenalty.compute(&ctx) - 1.0).abs() < f32::EPSILON);
        assert!(OrientationPenalty.compute(&ctx).abs() < f32::EPSILON);
    }

    // -- regimes --

    #[test]
    fn regimes_skip_zero_weights() {
        let e = evaluator();
        let reached: Vec<&str> = e.regime(true).breakdown(&inputs()).iter().map(|(n, _)| *n).collect();
        assert!(reached.contains(&"StopBonus"));
        assert!(!reached.contains(&"TrackingLinVel"));
        assert!(!reached.contains(&"OrientationPenalty"));
        let unreached: Vec<&str> = e.regime(false).breakdown(&inputs()).iter().map(|(n, _)| *n).collect();
        assert!(unreached.contains(&"Approach"));
        assert!(!unreached.contains(&"StopBonus"));
    }

    // -- evaluator --

    #[test]
    fn arrival_bonus_fires_once() {
        let e = evaluator();
        let mut ep = EnvEpisode::default();
        ep.reset(PoseCommand::default());
        let err = GoalError::between(&Vector2::zeros(), 0.0, &PoseCommand::default());
        let cmd = VelocityCommand::default();
        let first = e.evaluate(&state(), &mut ep, &cmd, &err, true, false);
        assert!(first.first_reach);
        assert!(ep.ever_reached);
        let second = e.evaluate(&state(), &mut ep, &cmd, &err, true, false);
        assert!(!second.first_reach);
        assert!((first.reward - second.reward - 10.0).abs() < 1e-4);
    }

    #[test]
    fn failure_conditions() {
        let e = evaluator();
        let mut ep = EnvEpisode::default();
        ep.reset(PoseCommand::new(5.0, 0.0, 0.0));
        let err = GoalError::between(&Vector2::zeros(), 0.0, &ep.pose_command);
        let cmd = VelocityCommand::default();
        assert!(!e.evaluate(&state(), &mut ep, &cmd, &err, false, false).failure);
        assert!(e.evaluate(&state(), &mut ep, &cmd, &err, false, true).failure);

        let mut fast = state();
        fast.joint_vel[4] = 150.0;
        assert!(e.evaluate(&fast, &mut ep, &cmd, &err, false, false).failure);
        fast.joint_vel[4] = f32::NAN;
        assert!(e.evaluate(&fast, &mut ep, &cmd, &err, false, false).failure);

        let mut flipped = state();
        flipped.gravity = projected_gravity(euler_to_quat(80_f32.to_radians(), 0.0, 0.0));
        assert!(e.evaluate(&flipped, &mut ep, &cmd, &err, false, false).failure);
    }

    #[test]
    fn failure_penalty_applies_in_both_regimes() {
        let e = evaluator();
        let err = GoalError::between(&Vector2::zeros(), 0.0, &PoseCommand::default());
        let cmd = VelocityCommand::default();
        for reached in [false, true] {
            let mut ep = EnvEpisode::default();
            ep.reset(PoseCommand::default());
            ep.ever_reached = true;
            let ok = e.evaluate(&state(), &mut ep, &cmd, &err, reached, false).reward;
            let bad = e.evaluate(&state(), &mut ep, &cmd, &err, reached, true).reward;
            assert!((ok - bad - 20.0).abs() < 1e-3, "reached={reached}");
        }
    }

    #[test]
    fn min_distance_tracks_closest() {
        let e = evaluator();
        let mut ep = EnvEpisode::default();
        ep.reset(PoseCommand::new(3.0, 0.0, 0.0));
        let cmd = VelocityCommand::default();
        for x in [0.0, 1.0, 0.5] {
            let err = GoalError::between(&Vector2::new(x, 0.0), 0.0, &ep.pose_command);
            e.evaluate(&state(), &mut ep, &cmd, &err, false, false);
        }
        assert!((ep.min_distance - 2.0).abs() < 1e-6);
    }

    #[test]
    fn non_finite_reward_is_zeroed() {
        let e = evaluator();
        let mut ep = EnvEpisode::default();
        ep.reset(PoseCommand::default());
        let mut s = state();
        s.torques[0] = f32::INFINITY;
        let err = GoalError::between(&Vector2::new(1.0, 0.0), 0.0, &PoseCommand::default());
        let out = e.evaluate(&s, &mut ep, &VelocityCommand::default(), &err, false, false);
        assert!(out.reward.abs() < f32::EPSILON);
    }

    #[test]
    fn nan_sensor_reads_are_clipped_to_zero() {
        let e = evaluator();
        let mut s = state();
        s.local_lin_vel = Vector3::new(f32::NAN, 500.0, -500.0);
        let ep = EnvEpisode::default();
        let err = GoalError::between(&Vector2::zeros(), 0.0, &PoseCommand::default());
        let ctx = e.inputs(&s, &ep, &VelocityCommand::default(), &err, false, false);
        assert_eq!(ctx.lin_vel, Vector3::new(0.0, 100.0, -100.0));
    }
}
