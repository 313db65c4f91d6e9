//! `NavigationEnv`: the batched step/reset loop.
//!
//! One call to [`NavigationEnv::step`] runs, for every environment slot:
//!
//! ```text
//! action → low-pass filter → celebration override → adaptive PD → physics
//!        → state extraction → arrival detection → progression / retarget
//!        → velocity command → markers → observation → reward → termination
//! ```
//!
//! Arrivals are applied to the pose command before the observation and
//! reward of the same step are computed.

use bevy::log::{debug, info};
use nalgebra::{Vector2, Vector3};
use quadnav_actuator::control::AdaptivePdController;
use quadnav_actuator::filter::ActionFilter;
use quadnav_actuator::terrain::TerrainClassifier;
use quadnav_core::config::NavConfig;
use quadnav_core::error::{NavError, SimError, ValidationError};
use quadnav_core::sim::{DofLayout, SimBackend};
use quadnav_core::types::{sanitize_action, Action, JointVector, NUM_JOINTS};
use quadnav_nav::command::{CommandGenerator, GoalError, PoseCommand, ReachCriterion, VelocityCommand};
use quadnav_nav::detector::ReachDetector;
use quadnav_nav::progression::ProgressionTracker;
use quadnav_nav::waypoint::WaypointRegistry;

use crate::celebration::CelebrationScript;
use crate::episode::{EpisodeState, EpisodeTable};
use crate::markers::{MarkerPose, MarkerWriter};
use crate::observation::ObservationBuilder;
use crate::reset::{ResetSampler, TargetSource};
use crate::rewards::RewardEvaluator;
use crate::state::{RobotState, SceneHandles};
use crate::terminations::{TerminationEvaluator, TerminationInputs};
use crate::vec_buffer::{VecDoneBuffer, VecObsBuffer, VecRewardBuffer};

// ---------------------------------------------------------------------------
// StepStats
// ---------------------------------------------------------------------------

/// Batch-level summary of one step.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StepStats {
    pub mean_reward: f32,
    /// Waypoint acceptances across all environments.
    pub arrivals: usize,
    /// Running environments with `reached_all` this step.
    pub reached_all: usize,
    pub terminated: usize,
    pub truncated: usize,
}

// ---------------------------------------------------------------------------
// NavigationEnv
// ---------------------------------------------------------------------------

/// Waypoint navigation over a batched simulator.
pub struct NavigationEnv<S: SimBackend> {
    sim: S,
    config: NavConfig,
    registry: WaypointRegistry,
    tracker: ProgressionTracker,
    detector: ReachDetector,
    scene: SceneHandles,
    controller: AdaptivePdController,
    filter: ActionFilter,
    classifier: TerrainClassifier,
    commands: CommandGenerator,
    criterion: ReachCriterion,
    observer: ObservationBuilder,
    rewards: RewardEvaluator,
    terminations: TerminationEvaluator,
    celebration: CelebrationScript,
    markers: MarkerWriter,
    resetter: ResetSampler,
    episodes: EpisodeTable,
    velocity_commands: Vec<VelocityCommand>,
    reached: Vec<bool>,
    obs_buf: VecObsBuffer,
    reward_buf: VecRewardBuffer,
    done_buf: VecDoneBuffer,
}

impl<S: SimBackend> NavigationEnv<S> {
    /// Build the environment and resolve every optional scene capability.
    ///
    /// Fails on invalid configuration, an invalid waypoint list, or DOF
    /// arrays too short for the base and joints. Every environment starts
    /// idle; call [`reset_all`](Self::reset_all) before stepping.
    pub fn new(sim: S, config: NavConfig) -> Result<Self, NavError> {
        config.validate()?;
        let layout = DofLayout::STANDARD;
        check_dof_len(sim.dof_pos_len(), layout.pos_len_without_arrows(), "dof_pos")?;
        check_dof_len(sim.dof_vel_len(), layout.joint_vel + NUM_JOINTS, "dof_vel")?;

        let registry = WaypointRegistry::from_config(&config)?;
        let num_envs = sim.num_envs();
        let detector = ReachDetector::resolve(
            &sim,
            &registry,
            &config.course,
            &config.sensors,
            &config.detection,
        );
        let scene = SceneHandles::resolve(&sim, &config.sensors, &config.course);
        let markers = MarkerWriter::resolve(&sim, &config.markers);
        let default_pose = config.init_state.default_pose(&sim.actuator_names());
        let controller = AdaptivePdController::new(default_pose, &config.control);

        info!(
            "navigation env on {}: {num_envs} envs, {} waypoints{}, {} contact sensors, arrows {}",
            sim.name(),
            registry.len(),
            if config.goal_only() { " (goal only)" } else { "" },
            detector.contact_sensor_count(),
            markers.has_arrows(),
        );

        Ok(Self {
            tracker: ProgressionTracker::new(num_envs, registry.len()),
            filter: ActionFilter::new(config.control.action_filter_alpha),
            classifier: TerrainClassifier::from_degrees(config.control.downhill_band_deg),
            commands: CommandGenerator::new(&config.commands),
            criterion: ReachCriterion::new(&config.reach),
            observer: ObservationBuilder::new(config.normalization, default_pose),
            rewards: RewardEvaluator::new(&config.rewards, &config.normalization, &config.control),
            terminations: TerminationEvaluator::new(
                config.episode.max_episode_steps,
                &config.termination,
                scene.base_contact,
            ),
            celebration: CelebrationScript::new(
                &config.celebration,
                default_pose,
                config.control.action_scale,
            ),
            resetter: ResetSampler::new(config.seed, &config.init_state, &config.commands, default_pose),
            episodes: EpisodeTable::new(num_envs),
            velocity_commands: vec![VelocityCommand::default(); num_envs],
            reached: vec![false; num_envs],
            obs_buf: VecObsBuffer::new(num_envs),
            reward_buf: VecRewardBuffer::new(num_envs),
            done_buf: VecDoneBuffer::new(num_envs),
            sim,
            config,
            registry,
            detector,
            scene,
            controller,
            markers,
        })
    }

    // -- accessors --

    pub fn num_envs(&self) -> usize {
        self.episodes.num_envs()
    }

    pub const fn config(&self) -> &NavConfig {
        &self.config
    }

    pub const fn registry(&self) -> &WaypointRegistry {
        &self.registry
    }

    pub const fn tracker(&self) -> &ProgressionTracker {
        &self.tracker
    }

    pub const fn episodes(&self) -> &EpisodeTable {
        &self.episodes
    }

    pub const fn controller(&self) -> &AdaptivePdController {
        &self.controller
    }

    pub const fn sim(&self) -> &S {
        &self.sim
    }

    /// Mutable simulator access for tests and scripted scenes.
    pub fn sim_mut(&mut self) -> &mut S {
        &mut self.sim
    }

    /// Velocity commands of the last step or reset.
    pub fn velocity_commands(&self) -> &[VelocityCommand] {
        &self.velocity_commands
    }

    /// `reached_all` per environment as of the last step or reset.
    pub fn reached_flags(&self) -> &[bool] {
        &self.reached
    }

    pub const fn obs_buffer(&self) -> &VecObsBuffer {
        &self.obs_buf
    }

    pub const fn reward_buffer(&self) -> &VecRewardBuffer {
        &self.reward_buf
    }

    pub const fn done_buffer(&self) -> &VecDoneBuffer {
        &self.done_buf
    }

    // -- reset --

    /// Reset every environment.
    pub fn reset_all(&mut self) {
        let mask = vec![true; self.num_envs()];
        self.reset_masked(&mask, true);
    }

    /// Reset the environments whose `mask` entry is set; all others are left
    /// untouched. Missing mask entries count as `false`.
    pub fn reset_done(&mut self, mask: &[bool]) {
        self.reset_masked(mask, true);
    }

    fn reset_masked(&mut self, mask: &[bool], clear_flags: bool) {
        let num_envs = self.num_envs();
        let mask: Vec<bool> = (0..num_envs)
            .map(|env| mask.get(env).copied().unwrap_or(false))
            .collect();
        if !mask.contains(&true) {
            return;
        }
        self.tracker.reset(&mask);

        let envs: Vec<usize> = (0..num_envs).filter(|&env| mask[env]).collect();
        for &env in &envs {
            self.reset_env(env);
        }
        self.sim.forward_kinematics();

        let states = self.scene.extract(&self.sim);
        for &env in &envs {
            let state = &states[env];
            let ep = self.episodes.get_mut(env);
            let error = GoalError::between(&state.planar_position(), state.heading, &ep.pose_command);
            ep.min_distance = error.distance;
            let reached_all = self.criterion.reached_all(self.tracker.completed(env), &error);
            let command = self.commands.compute(&error, state.heading, reached_all);
            let obs = self
                .observer
                .build(state, &ep.current_action, &command, &error, reached_all);
            self.obs_buf.set(env, &obs);
            self.velocity_commands[env] = command;
            self.reached[env] = reached_all;
            self.reward_buf.set(env, 0.0);
            if clear_flags {
                self.done_buf.set(env, false, false);
            }
        }
        debug!("reset {} envs", envs.len());
    }

    /// Fresh spawn, target and episode state for one slot.
    fn reset_env(&mut self, env: usize) {
        let goal = self.goal_position(env);
        let primary = if self.registry.is_empty() {
            goal
        } else {
            self.detector.body_position(&self.sim, 0, env)
        };
        let ep = self.episodes.get_mut(env);
        let mut rng = self.resetter.rng(env, ep.episode_number + 1);
        let sample = self.resetter.sample(&mut rng, TargetSource { primary, goal });

        self.resetter.write_spawn(&mut self.sim, env, &sample.spawn);
        self.sim.set_actuator_controls(env, &[0.0; NUM_JOINTS]);
        ep.reset(sample.command);
        self.markers.write(
            &mut self.sim,
            env,
            &MarkerPose {
                command: sample.command,
                robot_position: sample.spawn,
                robot_velocity: Vector2::zeros(),
                desired_velocity: Vector2::zeros(),
            },
        );
    }

    fn goal_position(&self, env: usize) -> Option<Vector2<f32>> {
        let poses = self.sim.body_poses(self.scene.goal?).ok()?;
        poses.get(env).map(|p| p.position.xy())
    }

    // -- step --

    /// Step every environment. Actions are sanitized: non-finite entries
    /// become zero and everything is clipped to `[-1, 1]`. Environments
    /// without an action get a zero action.
    pub fn step(&mut self, actions: &[JointVector]) -> StepStats {
        let actions: Vec<JointVector> = (0..self.num_envs())
            .map(|env| actions.get(env).map_or([0.0; NUM_JOINTS], sanitize_action))
            .collect();
        self.apply_actions(&actions);
        let stats = self.update_state();
        if self.config.episode.auto_reset {
            let done: Vec<bool> = self.episodes.iter().map(|e| e.is_done()).collect();
            self.reset_masked(&done, false);
        }
        stats
    }

    /// Step with validated policy actions, one per environment.
    pub fn step_actions(&mut self, actions: &[Action]) -> Result<StepStats, ValidationError> {
        if actions.len() != self.num_envs() {
            return Err(ValidationError::BatchSizeMismatch {
                expected: self.num_envs(),
                got: actions.len(),
            });
        }
        let joints = actions
            .iter()
            .map(Action::to_joint_vector)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self.step(&joints))
    }

    fn apply_actions(&mut self, actions: &[JointVector]) {
        let states = self.scene.extract(&self.sim);
        for (env, (state, action)) in states.iter().zip(actions).enumerate() {
            let ep = self.episodes.get_mut(env);
            if !ep.state.is_running() {
                self.sim.set_actuator_controls(env, &[0.0; NUM_JOINTS]);
                continue;
            }
            ep.last_dof_vel = state.joint_vel;
            self.filter.apply(&mut ep.filtered_action, action);
            if let Some(pose_action) = self.celebration.advance(&mut ep.celebration) {
                ep.filtered_action = pose_action;
            }
            ep.record_action(ep.filtered_action);

            let terrain = self.classifier.classify(state.gravity_reading.as_ref());
            let torques = self.controller.compute_torques(
                &ep.filtered_action,
                &state.joint_pos,
                &state.joint_vel,
                terrain,
            );
            self.sim.set_actuator_controls(env, &torques);
        }
        self.sim.step();
    }

    fn update_state(&mut self) -> StepStats {
        let states = self.scene.extract(&self.sim);
        let running: Vec<bool> = self.episodes.iter().map(|e| e.state.is_running()).collect();
        let mut stats = StepStats {
            arrivals: self.advance_progression(&states, &running),
            ..StepStats::default()
        };

        let ground_contact = self.sim.colliding_pairs(&self.scene.base_ground_pairs);
        let base_contact = self.terminations.base_contact_mask(&self.sim);

        for (env, state) in states.iter().enumerate() {
            let ep = self.episodes.get_mut(env);
            let error = GoalError::between(&state.planar_position(), state.heading, &ep.pose_command);
            let reached_all = self.criterion.reached_all(self.tracker.completed(env), &error);
            let command = self.commands.compute(&error, state.heading, reached_all);
            self.markers
                .write(&mut self.sim, env, &marker_pose(state, ep.pose_command, &command));
            let obs = self
                .observer
                .build(state, &ep.current_action, &command, &error, reached_all);
            self.obs_buf.set(env, &obs);
            self.velocity_commands[env] = command;
            self.reached[env] = reached_all;

            if !running[env] {
                self.reward_buf.set(env, 0.0);
                self.done_buf.set(
                    env,
                    ep.state == EpisodeState::Done,
                    ep.state == EpisodeState::Truncated,
                );
                continue;
            }

            let outcome = self.rewards.evaluate(
                state,
                ep,
                &command,
                &error,
                reached_all,
                ground_contact.get(env).copied().unwrap_or(false),
            );
            ep.advance(outcome.reward);
            self.reward_buf.set(env, outcome.reward);
            if outcome.first_reach {
                info!("env {env} completed the course in {} steps", ep.steps);
            }
            stats.reached_all += usize::from(reached_all);

            let inputs = TerminationInputs {
                steps: ep.steps,
                base_contact: base_contact.get(env).copied().unwrap_or(false),
                yaw_rate: state.gyro.z,
            };
            let flags = self.terminations.evaluate(&inputs);
            if flags.terminated {
                ep.terminate();
                stats.terminated += 1;
                debug!("env {env} terminated: {:?}", self.terminations.triggered(&inputs));
            } else if flags.truncated {
                ep.truncate();
                stats.truncated += 1;
            }
            self.done_buf
                .set(env, flags.terminated, flags.truncated && !flags.terminated);
        }
        self.sim.forward_kinematics();

        stats.mean_reward = self.reward_buf.mean();
        debug!(
            "step: mean reward {:.3}, {} arrivals, {} reached, {} terminated, {} truncated",
            stats.mean_reward, stats.arrivals, stats.reached_all, stats.terminated, stats.truncated
        );
        stats
    }

    /// Detect and accept arrivals, trigger celebrations and move the pose
    /// command of every advancing environment to its next waypoint.
    fn advance_progression(&mut self, states: &[RobotState], running: &[bool]) -> usize {
        if self.registry.is_empty() {
            return 0;
        }
        let positions: Vec<Vector3<f32>> = states.iter().map(|s| s.position).collect();
        let detector = &self.detector;
        let sim = &self.sim;
        let arrivals = self.tracker.check_arrivals(|waypoint, already| {
            let mut reached = detector.detect(sim, waypoint, &positions, already);
            for (r, &on) in reached.iter_mut().zip(running) {
                *r &= on;
            }
            reached
        });

        let mut advanced = vec![false; states.len()];
        let mut count = 0;
        for arrival in &arrivals {
            let Some(waypoint) = self.registry.get(arrival.waypoint) else {
                continue;
            };
            for env in arrival.envs() {
                count += 1;
                advanced[env] = true;
                info!("env {env} reached waypoint {} (order {})", waypoint.name, waypoint.order);
                if waypoint.requires_action {
                    self.episodes
                        .get_mut(env)
                        .celebration
                        .trigger(states[env].joint_pos);
                }
            }
        }

        for env in (0..states.len()).filter(|&env| advanced[env]) {
            if let Some(goal) = self.detector.next_goal(&self.sim, &self.tracker, env) {
                self.episodes.get_mut(env).pose_command.target = goal;
            }
        }
        count
    }
}

fn marker_pose(state: &RobotState, command: PoseCommand, velocity: &VelocityCommand) -> MarkerPose {
    MarkerPose {
        command,
        robot_position: state.position,
        robot_velocity: state.world_lin_vel.xy(),
        desired_velocity: velocity.lin,
    }
}

fn check_dof_len(got: usize, need: usize, name: &str) -> Result<(), SimError> {
    if got < need {
        return Err(SimError::LookupFailed {
            name: name.to_owned(),
            reason: format!("{got} slots, need at least {need}"),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
