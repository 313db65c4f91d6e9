use std::collections::BTreeMap;
use std::f32::consts::PI;
use std::path::Path;

use bevy::prelude::Resource;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::JointVector;

// ---------------------------------------------------------------------------
// Serde default functions
// ---------------------------------------------------------------------------

const fn default_max_episode_steps() -> u32 {
    1000
}
const fn default_true() -> bool {
    true
}
fn default_robot_body() -> String {
    "base".into()
}
fn default_goal_body() -> String {
    "goal".into()
}
fn default_base_geoms() -> Vec<String> {
    vec!["base".into()]
}
fn default_ground_prefixes() -> Vec<String> {
    vec!["ground".into()]
}
fn default_ground_name() -> String {
    "ground".into()
}

// ---------------------------------------------------------------------------
// NavConfig
// ---------------------------------------------------------------------------

/// Complete configuration table for the navigation task.
///
/// Every field has a default, so a TOML file only needs to list overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Resource)]
pub struct NavConfig {
    /// Master random seed for resets.
    #[serde(default)]
    pub seed: u64,
    #[serde(default)]
    pub episode: EpisodeSettings,
    #[serde(default)]
    pub control: ControlSettings,
    #[serde(default)]
    pub normalization: NormalizationSettings,
    #[serde(default)]
    pub commands: CommandSettings,
    #[serde(default)]
    pub init_state: InitStateSettings,
    #[serde(default)]
    pub course: CourseSettings,
    #[serde(default)]
    pub sensors: SensorNames,
    #[serde(default)]
    pub detection: DetectionSettings,
    #[serde(default)]
    pub reach: ReachSettings,
    #[serde(default)]
    pub termination: TerminationSettings,
    #[serde(default)]
    pub markers: MarkerSettings,
    #[serde(default)]
    pub celebration: CelebrationSettings,
    #[serde(default)]
    pub rewards: RewardSettings,
}

impl Default for NavConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            episode: EpisodeSettings::default(),
            control: ControlSettings::default(),
            normalization: NormalizationSettings::default(),
            commands: CommandSettings::default(),
            init_state: InitStateSettings::default(),
            course: CourseSettings::default(),
            sensors: SensorNames::default(),
            detection: DetectionSettings::default(),
            reach: ReachSettings::default(),
            termination: TerminationSettings::default(),
            markers: MarkerSettings::default(),
            celebration: CelebrationSettings::default(),
            rewards: RewardSettings::default(),
        }
    }
}

impl NavConfig {
    /// Load and validate a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Parse and validate TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Builder: replace the waypoint list.
    #[must_use]
    pub fn with_waypoints(mut self, waypoints: Vec<WaypointSpec>) -> Self {
        self.course.waypoints = waypoints;
        self
    }

    /// Builder: set the master seed.
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Builder: set the episode length.
    #[must_use]
    pub const fn with_max_episode_steps(mut self, steps: u32) -> Self {
        self.episode.max_episode_steps = steps;
        self
    }

    /// No waypoints configured: navigate to the goal body only.
    pub fn goal_only(&self) -> bool {
        self.course.waypoints.is_empty()
    }

    /// Validate configuration. Returns Err on the first invalid value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.episode.max_episode_steps == 0 {
            return Err(ConfigError::invalid(
                "episode.max_episode_steps",
                "must be > 0",
            ));
        }
        self.control.validate()?;
        self.commands.validate()?;
        self.init_state.validate()?;
        positive("detection.contact_threshold", self.detection.contact_threshold)?;
        positive("detection.fallback_radius", self.detection.fallback_radius)?;
        positive("reach.position_threshold", self.reach.position_threshold)?;
        positive("reach.heading_threshold_deg", self.reach.heading_threshold_deg)?;
        positive(
            "termination.base_contact_threshold",
            self.termination.base_contact_threshold,
        )?;
        positive("termination.max_yaw_rate", self.termination.max_yaw_rate)?;
        if self.celebration.duration == 0 || self.celebration.ramp_steps == 0 {
            return Err(ConfigError::invalid(
                "celebration",
                "duration and ramp_steps must be > 0",
            ));
        }
        positive("rewards.shaping.tracking_sigma_sq", self.rewards.shaping.tracking_sigma_sq)?;
        Ok(())
    }
}

fn positive(field: &str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, format!("{value} must be > 0")))
    }
}

fn non_negative(field: &str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, format!("{value} must be >= 0")))
    }
}

// ---------------------------------------------------------------------------
// Episode
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeSettings {
    /// Step count at which an environment times out.
    #[serde(default = "default_max_episode_steps")]
    pub max_episode_steps: u32,
    /// Reset finished environments at the end of the step that ended them.
    #[serde(default = "default_true")]
    pub auto_reset: bool,
}

impl Default for EpisodeSettings {
    fn default() -> Self {
        Self {
            max_episode_steps: default_max_episode_steps(),
            auto_reset: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Control
// ---------------------------------------------------------------------------

/// Stiffness for front and rear legs plus a shared damping gain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GainSettings {
    pub kp_front: f32,
    pub kp_rear: f32,
    pub kd: f32,
}

/// Symmetric torque limits per joint kind (Nm).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TorqueLimitSettings {
    pub hip: f32,
    pub thigh: f32,
    pub calf: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlSettings {
    /// Radians of joint offset per unit of normalized action.
    pub action_scale: f32,
    /// Low-pass weight on the newest action.
    pub action_filter_alpha: f32,
    pub normal_gains: GainSettings,
    pub downhill_gains: GainSettings,
    /// Open interval of signed slope (degrees) classified as downhill.
    pub downhill_band_deg: [f32; 2],
    pub torque_limits: TorqueLimitSettings,
    /// Joint speed above which the step is penalized as a blow-up (rad/s).
    pub max_dof_vel: f32,
}

impl Default for ControlSettings {
    fn default() -> Self {
        Self {
            action_scale: 0.25,
            action_filter_alpha: 0.35,
            normal_gains: GainSettings {
                kp_front: 85.0,
                kp_rear: 100.0,
                kd: 6.0,
            },
            downhill_gains: GainSettings {
                kp_front: 65.0,
                kp_rear: 80.0,
                kd: 8.5,
            },
            downhill_band_deg: [-45.0, -5.0],
            torque_limits: TorqueLimitSettings {
                hip: 17.0,
                thigh: 17.0,
                calf: 34.0,
            },
            max_dof_vel: 100.0,
        }
    }
}

impl ControlSettings {
    fn validate(&self) -> Result<(), ConfigError> {
        positive("control.action_scale", self.action_scale)?;
        if !(self.action_filter_alpha > 0.0 && self.action_filter_alpha <= 1.0) {
            return Err(ConfigError::invalid(
                "control.action_filter_alpha",
                "must be in (0, 1]",
            ));
        }
        for (name, gains) in [
            ("control.normal_gains", &self.normal_gains),
            ("control.downhill_gains", &self.downhill_gains),
        ] {
            non_negative(name, gains.kp_front)?;
            non_negative(name, gains.kp_rear)?;
            non_negative(name, gains.kd)?;
        }
        if self.downhill_band_deg[0] >= self.downhill_band_deg[1] {
            return Err(ConfigError::invalid(
                "control.downhill_band_deg",
                "lower bound must be below upper bound",
            ));
        }
        positive("control.torque_limits.hip", self.torque_limits.hip)?;
        positive("control.torque_limits.thigh", self.torque_limits.thigh)?;
        positive("control.torque_limits.calf", self.torque_limits.calf)?;
        positive("control.max_dof_vel", self.max_dof_vel)
    }
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Observation scale factors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizationSettings {
    pub lin_vel: f32,
    pub ang_vel: f32,
    pub dof_pos: f32,
    pub dof_vel: f32,
}

impl Default for NormalizationSettings {
    fn default() -> Self {
        Self {
            lin_vel: 2.0,
            ang_vel: 0.25,
            dof_pos: 1.0,
            dof_vel: 0.05,
        }
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandSettings {
    pub position_gain: f32,
    pub max_lin_vel: f32,
    pub yaw_gain: f32,
    pub max_yaw_rate: f32,
    pub large_turn_threshold_deg: f32,
    pub large_turn_speed_scale: f32,
    pub large_turn_yaw_amplification: f32,
    pub yaw_deadband_deg: f32,
    /// Range the target heading is sampled from on reset (radians).
    pub heading_range: [f32; 2],
}

impl Default for CommandSettings {
    fn default() -> Self {
        Self {
            position_gain: 1.0,
            max_lin_vel: 1.0,
            yaw_gain: 1.0,
            max_yaw_rate: 1.5,
            large_turn_threshold_deg: 60.0,
            large_turn_speed_scale: 0.3,
            large_turn_yaw_amplification: 1.5,
            yaw_deadband_deg: 8.0,
            heading_range: [-PI, PI],
        }
    }
}

impl CommandSettings {
    fn validate(&self) -> Result<(), ConfigError> {
        positive("commands.max_lin_vel", self.max_lin_vel)?;
        positive("commands.max_yaw_rate", self.max_yaw_rate)?;
        non_negative("commands.yaw_deadband_deg", self.yaw_deadband_deg)?;
        if !self.heading_range.iter().all(|b| b.is_finite()) {
            return Err(ConfigError::invalid(
                "commands.heading_range",
                "bounds must be finite",
            ));
        }
        if self.heading_range[0] > self.heading_range[1] {
            return Err(ConfigError::invalid(
                "commands.heading_range",
                "lower bound must not exceed upper bound",
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Initial state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InitStateSettings {
    pub spawn_center: [f32; 3],
    /// Half-width of the uniform xy spawn box.
    pub spawn_range: [f32; 2],
    /// Half-width of the uniform xy jitter applied to the first target.
    pub target_pos_range: [f32; 2],
    /// Standing pose, keyed by a substring of the actuator name.
    pub default_joint_angles: BTreeMap<String, f32>,
    /// Target jitter around the origin when neither the first waypoint nor
    /// the goal resolves to a finite position.
    pub fallback_target_range: f32,
}

impl Default for InitStateSettings {
    fn default() -> Self {
        Self {
            spawn_center: [0.0, 0.0, 0.5],
            spawn_range: [0.1, 0.1],
            target_pos_range: [0.1, 0.1],
            default_joint_angles: BTreeMap::from([
                ("hip".to_owned(), 0.0),
                ("thigh".to_owned(), 0.9),
                ("calf".to_owned(), -1.8),
            ]),
            fallback_target_range: 0.2,
        }
    }
}

impl InitStateSettings {
    fn validate(&self) -> Result<(), ConfigError> {
        for v in self.spawn_range.iter().chain(&self.target_pos_range) {
            non_negative("init_state ranges", *v)?;
        }
        if !self.spawn_center.iter().all(|c| c.is_finite()) {
            return Err(ConfigError::invalid(
                "init_state.spawn_center",
                "coordinates must be finite",
            ));
        }
        non_negative("init_state.fallback_target_range", self.fallback_target_range)
    }

    /// Standing angle for each actuator, matched by name substring.
    ///
    /// Actuators that match no key stand at zero.
    pub fn default_pose(&self, actuator_names: &[String]) -> JointVector {
        let mut pose = [0.0; crate::types::NUM_JOINTS];
        for (slot, name) in pose.iter_mut().zip(actuator_names) {
            if let Some(angle) = self
                .default_joint_angles
                .iter()
                .find(|(key, _)| name.contains(key.as_str()))
                .map(|(_, angle)| *angle)
            {
                *slot = angle;
            }
        }
        pose
    }
}

// ---------------------------------------------------------------------------
// Course
// ---------------------------------------------------------------------------

/// One waypoint entry as written in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaypointSpec {
    /// Body name of the waypoint in the scene.
    pub name: String,
    /// Position in the traversal order, contiguous from 0.
    pub order: usize,
    /// Play the celebration pose on arrival.
    #[serde(default)]
    pub requires_action: bool,
}

impl WaypointSpec {
    pub fn new(name: impl Into<String>, order: usize) -> Self {
        Self {
            name: name.into(),
            order,
            requires_action: false,
        }
    }

    #[must_use]
    pub const fn with_action(mut self, requires_action: bool) -> Self {
        self.requires_action = requires_action;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseSettings {
    /// Ordered waypoints; empty means goal-only navigation.
    #[serde(default)]
    pub waypoints: Vec<WaypointSpec>,
    #[serde(default = "default_robot_body")]
    pub robot_body: String,
    #[serde(default = "default_goal_body")]
    pub goal_body: String,
    /// Geoms whose contact with the ground is penalized.
    #[serde(default = "default_base_geoms")]
    pub base_geoms: Vec<String>,
    /// Geom-name prefixes that count as ground.
    #[serde(default = "default_ground_prefixes")]
    pub ground_prefixes: Vec<String>,
    /// Exact ground geom name, matched in addition to the prefixes.
    #[serde(default = "default_ground_name")]
    pub ground_name: String,
    /// Waypoint body suffix replaced to find the trigger geom.
    #[serde(default)]
    pub trigger_suffix: TriggerSuffix,
}

impl Default for CourseSettings {
    fn default() -> Self {
        Self {
            waypoints: Vec::new(),
            robot_body: default_robot_body(),
            goal_body: default_goal_body(),
            base_geoms: default_base_geoms(),
            ground_prefixes: default_ground_prefixes(),
            ground_name: default_ground_name(),
            trigger_suffix: TriggerSuffix::default(),
        }
    }
}

/// `<name>_body` maps to the trigger geom `<name>_trigger`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerSuffix {
    pub body: String,
    pub trigger: String,
}

impl Default for TriggerSuffix {
    fn default() -> Self {
        Self {
            body: "_body".into(),
            trigger: "_trigger".into(),
        }
    }
}

impl TriggerSuffix {
    /// Trigger geom name for a waypoint body, if the body uses the suffix.
    pub fn trigger_name(&self, body_name: &str) -> Option<String> {
        body_name
            .strip_suffix(self.body.as_str())
            .map(|stem| format!("{stem}{}", self.trigger))
    }
}

// ---------------------------------------------------------------------------
// Sensors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorNames {
    pub local_linvel: String,
    pub gyro: String,
    pub projected_gravity: String,
    pub base_contact: String,
    /// Appended to a leg prefix (`FR`, ...) for the foot position sensor.
    pub foot_pos_suffix: String,
    /// Appended to a leg prefix for the foot body fallback.
    pub foot_body_suffix: String,
    /// Appended to a waypoint name for its contact sensor.
    pub waypoint_contact_suffix: String,
}

impl Default for SensorNames {
    fn default() -> Self {
        Self {
            local_linvel: "local_linvel".into(),
            gyro: "gyro".into(),
            projected_gravity: "gravity_projection".into(),
            base_contact: "base_contact".into(),
            foot_pos_suffix: "_foot_pos".into(),
            foot_body_suffix: "_foot".into(),
            waypoint_contact_suffix: "_contact".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Detection, reach, termination
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionSettings {
    /// Contact sensor magnitude that counts as touching a waypoint.
    pub contact_threshold: f32,
    /// Root-to-waypoint distance that counts as reaching it.
    pub fallback_radius: f32,
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            contact_threshold: 0.1,
            fallback_radius: 0.5,
        }
    }
}

/// Final-goal criterion for `reached_all`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReachSettings {
    pub position_threshold: f32,
    pub heading_threshold_deg: f32,
}

impl Default for ReachSettings {
    fn default() -> Self {
        Self {
            position_threshold: 0.3,
            heading_threshold_deg: 15.0,
        }
    }
}

impl ReachSettings {
    pub fn heading_threshold(&self) -> f32 {
        self.heading_threshold_deg.to_radians()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminationSettings {
    pub base_contact_threshold: f32,
    /// Yaw rate magnitude treated as a simulation blow-up (rad/s).
    pub max_yaw_rate: f32,
}

impl Default for TerminationSettings {
    fn default() -> Self {
        Self {
            base_contact_threshold: 0.3,
            max_yaw_rate: 20.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Markers and celebration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerSettings {
    pub robot_arrow_body: String,
    pub desired_arrow_body: String,
    /// Arrow height above the robot base.
    pub arrow_height: f32,
    /// Below this planar speed an arrow points along +x.
    pub min_speed: f32,
}

impl Default for MarkerSettings {
    fn default() -> Self {
        Self {
            robot_arrow_body: "robot_heading_arrow".into(),
            desired_arrow_body: "desired_heading_arrow".into(),
            arrow_height: 0.5,
            min_speed: 1e-3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CelebrationSettings {
    pub duration: u32,
    /// Steps to blend into the pose; the blend out takes the rest.
    pub ramp_steps: u32,
    /// Joint angles of the pose, in joint-vector order.
    pub pose: JointVector,
}

impl Default for CelebrationSettings {
    fn default() -> Self {
        Self {
            duration: 60,
            ramp_steps: 30,
            pose: [
                -0.1, 0.3, -0.8, // FR
                0.1, 0.3, -0.8, // FL
                -0.1, 1.2, -2.0, // RR
                0.1, 1.2, -2.0, // RL
            ],
        }
    }
}

// ---------------------------------------------------------------------------
// Rewards
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardSettings {
    #[serde(default)]
    pub shaping: ShapingSettings,
    /// Weights while the course is still in progress.
    #[serde(default = "RewardWeights::unreached")]
    pub unreached: RewardWeights,
    /// Weights once `reached_all` holds.
    #[serde(default = "RewardWeights::reached")]
    pub reached: RewardWeights,
}

impl Default for RewardSettings {
    fn default() -> Self {
        Self {
            shaping: ShapingSettings::default(),
            unreached: RewardWeights::unreached(),
            reached: RewardWeights::reached(),
        }
    }
}

/// Per-term weights of one reward regime.
///
/// Terms missing from a TOML table are disabled (weight 0).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RewardWeights {
    #[serde(default)]
    pub tracking_lin_vel: f32,
    #[serde(default)]
    pub tracking_ang_vel: f32,
    #[serde(default)]
    pub forward_alignment: f32,
    #[serde(default)]
    pub turn_preparation: f32,
    #[serde(default)]
    pub heading_alignment: f32,
    #[serde(default)]
    pub turn_in_place: f32,
    #[serde(default)]
    pub foot_clearance: f32,
    #[serde(default)]
    pub approach: f32,
    #[serde(default)]
    pub slope_adaptation: f32,
    #[serde(default)]
    pub edge_distance: f32,
    #[serde(default)]
    pub dynamic_stability: f32,
    #[serde(default)]
    pub vertical_motion: f32,
    #[serde(default)]
    pub stair_step: f32,
    #[serde(default)]
    pub stair_climb: f32,
    #[serde(default)]
    pub downhill_incentive: f32,
    #[serde(default)]
    pub downhill_stability: f32,
    #[serde(default)]
    pub stop_bonus: f32,
    #[serde(default)]
    pub arrival_bonus: f32,
    #[serde(default)]
    pub lin_vel_z: f32,
    #[serde(default)]
    pub ang_vel_xy: f32,
    #[serde(default)]
    pub orientation: f32,
    #[serde(default)]
    pub torques: f32,
    #[serde(default)]
    pub dof_vel: f32,
    #[serde(default)]
    pub action_rate: f32,
    #[serde(default)]
    pub gait_symmetry: f32,
    #[serde(default)]
    pub termination: f32,
}

impl RewardWeights {
    /// Weights used while waypoints remain.
    pub fn unreached() -> Self {
        Self {
            tracking_lin_vel: 0.7,
            tracking_ang_vel: 0.3,
            forward_alignment: 1.2,
            turn_preparation: 0.8,
            heading_alignment: 1.0,
            turn_in_place: 1.2,
            foot_clearance: 0.4,
            approach: 1.0,
            slope_adaptation: 0.35,
            edge_distance: 0.55,
            dynamic_stability: 0.35,
            vertical_motion: 0.6,
            stair_step: 0.7,
            stair_climb: 1.0,
            downhill_incentive: 1.0,
            downhill_stability: 1.0,
            lin_vel_z: -0.1,
            ang_vel_xy: -0.01,
            orientation: 0.0,
            torques: -1e-5,
            dof_vel: 0.0,
            action_rate: -8e-5,
            gait_symmetry: -0.5,
            termination: 1.0,
            ..Self::default()
        }
    }

    /// Weights once the course is complete: hold still, keep the bonus.
    pub fn reached() -> Self {
        Self {
            stop_bonus: 1.0,
            arrival_bonus: 1.0,
            lin_vel_z: -0.1,
            ang_vel_xy: -0.01,
            orientation: 0.0,
            torques: -1e-5,
            dof_vel: 0.0,
            action_rate: -2e-4,
            gait_symmetry: -0.3,
            termination: 1.0,
            ..Self::default()
        }
    }
}

/// Constants inside the reward terms.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShapingSettings {
    pub tracking_sigma_sq: f32,
    pub arrival_bonus: f32,
    pub termination_penalty: f32,
    pub side_flip_deg: f32,
    pub lin_vel_clip: f32,
    pub ang_vel_clip: f32,
    pub zero_ang_bonus: f32,
    pub zero_ang_threshold: f32,
    pub stop_speed_scale: f32,
    pub stop_yaw_scale: f32,
    pub stop_speed_weight: f32,
    pub stop_yaw_weight: f32,
    pub stop_multiplier: f32,
    pub gait_asymmetry_margin: f32,
    pub gait_asymmetry_gain: f32,
    pub foot_clearance_base: f32,
    pub foot_clearance_gain: f32,
    pub edge_margin: f32,
    pub turn_prep_threshold_deg: f32,
    pub turn_in_place_bonus: f32,
    pub turn_in_place_radius: f32,
    pub turn_in_place_min_turn_deg: f32,
    pub turn_in_place_max_speed: f32,
    pub turn_in_place_min_yaw_rate: f32,
    pub approach_gain: f32,
    pub stair_step_bonus: f32,
    pub stair_climb_incentive: f32,
    pub downhill_incentive: f32,
}

impl Default for ShapingSettings {
    fn default() -> Self {
        Self {
            tracking_sigma_sq: 0.25,
            arrival_bonus: 10.0,
            termination_penalty: -20.0,
            side_flip_deg: 75.0,
            lin_vel_clip: 100.0,
            ang_vel_clip: 20.0,
            zero_ang_bonus: 6.0,
            zero_ang_threshold: 0.05,
            stop_speed_scale: 0.2,
            stop_yaw_scale: 0.1,
            stop_speed_weight: 0.8,
            stop_yaw_weight: 1.2,
            stop_multiplier: 2.0,
            gait_asymmetry_margin: 0.03,
            gait_asymmetry_gain: 5.0,
            foot_clearance_base: 0.05,
            foot_clearance_gain: 2.0,
            edge_margin: 0.15,
            turn_prep_threshold_deg: 30.0,
            turn_in_place_bonus: 1.5,
            turn_in_place_radius: 1.0,
            turn_in_place_min_turn_deg: 45.0,
            turn_in_place_max_speed: 0.3,
            turn_in_place_min_yaw_rate: 0.8,
            approach_gain: 4.0,
            stair_step_bonus: 0.5,
            stair_climb_incentive: 0.8,
            downhill_incentive: 0.8,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
