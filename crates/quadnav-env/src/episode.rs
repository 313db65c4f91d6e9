//! Per-environment episode lifecycle and bookkeeping.
//!
//! Each environment slot owns an [`EnvEpisode`]: its lifecycle state, step
//! counter, pose command and the action history the controller, observation
//! and reward all read.

use quadnav_core::types::JointVector;
use quadnav_nav::command::PoseCommand;

use crate::celebration::Celebration;

// ---------------------------------------------------------------------------
// EpisodeState
// ---------------------------------------------------------------------------

/// Lifecycle state of an episode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum EpisodeState {
    /// Before the first reset.
    #[default]
    Idle,
    /// Actively stepping.
    Running,
    /// Ended by a termination condition.
    Done,
    /// Ended by the time limit.
    Truncated,
}

impl EpisodeState {
    /// Returns `true` if the episode is finished (Done or Truncated).
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Truncated)
    }

    pub const fn is_running(self) -> bool {
        matches!(self, Self::Running)
    }
}

// ---------------------------------------------------------------------------
// EnvEpisode
// ---------------------------------------------------------------------------

/// Episode state of one environment slot.
#[derive(Clone, Debug, PartialEq)]
pub struct EnvEpisode {
    pub state: EpisodeState,
    /// Steps taken this episode.
    pub steps: u32,
    pub total_reward: f32,
    /// Completed resets of this slot; feeds the reset seed.
    pub episode_number: u64,
    pub pose_command: PoseCommand,
    /// Sanitized policy action of the current step.
    pub current_action: JointVector,
    /// Action of the previous step, for the action-rate penalty.
    pub last_action: JointVector,
    /// Low-pass filtered action driving the controller.
    pub filtered_action: JointVector,
    /// Joint velocities of the previous step.
    pub last_dof_vel: JointVector,
    /// Closest distance to the target seen this episode; kept across retargets.
    pub min_distance: f32,
    /// `reached_all` has held at least once; gates the arrival bonus.
    pub ever_reached: bool,
    pub celebration: Celebration,
}

impl Default for EnvEpisode {
    fn default() -> Self {
        Self {
            state: EpisodeState::Idle,
            steps: 0,
            total_reward: 0.0,
            episode_number: 0,
            pose_command: PoseCommand::default(),
            current_action: [0.0; 12],
            last_action: [0.0; 12],
            filtered_action: [0.0; 12],
            last_dof_vel: [0.0; 12],
            min_distance: f32::INFINITY,
            ever_reached: false,
            celebration: Celebration::default(),
        }
    }
}

impl EnvEpisode {
    /// Start a new episode with a fresh pose command.
    ///
    /// Clears all per-episode history; the episode counter keeps counting.
    pub fn reset(&mut self, pose_command: PoseCommand) {
        let episode_number = self.episode_number + 1;
        *self = Self {
            state: EpisodeState::Running,
            episode_number,
            pose_command,
            ..Self::default()
        };
    }

    /// Advance one step, accumulating reward. Returns `false` if the
    /// episode is not running.
    pub fn advance(&mut self, reward: f32) -> bool {
        if self.state != EpisodeState::Running {
            return false;
        }
        self.steps += 1;
        self.total_reward += reward;
        true
    }

    pub fn terminate(&mut self) {
        self.state = EpisodeState::Done;
    }

    pub fn truncate(&mut self) {
        self.state = EpisodeState::Truncated;
    }

    pub const fn is_done(&self) -> bool {
        self.state.is_terminal()
    }

    /// Shift the action history after a control step.
    pub fn record_action(&mut self, action: JointVector) {
        self.last_action = self.current_action;
        self.current_action = action;
    }
}

// ---------------------------------------------------------------------------
// EpisodeTable
// ---------------------------------------------------------------------------

/// Episodes of every environment slot.
#[derive(Clone, Debug, Default)]
pub struct EpisodeTable {
    episodes: Vec<EnvEpisode>,
}

impl EpisodeTable {
    pub fn new(num_envs: usize) -> Self {
        Self {
            episodes: vec![EnvEpisode::default(); num_envs],
        }
    }

    pub fn num_envs(&self) -> usize {
        self.episodes.len()
    }

    pub fn get(&self, env: usize) -> &EnvEpisode {
        &self.episodes[env]
    }

    pub fn get_mut(&mut self, env: usize) -> &mut EnvEpisode {
        &mut self.episodes[env]
    }

    pub fn iter(&self) -> impl Iterator<Item = &EnvEpisode> {
        self.episodes.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut EnvEpisode> {
        self.episodes.iter_mut()
    }

    /// Finished or never-started slots; these are what `reset_done` resets.
    pub fn done_mask(&self) -> Vec<bool> {
        self.episodes
            .iter()
            .map(|e| e.is_done() || e.state == EpisodeState::Idle)
            .collect()
    }

    pub fn all_done(&self) -> bool {
        self.episodes.iter().all(EnvEpisode::is_done)
    }

    pub fn any_done(&self) -> bool {
        self.episodes.iter().any(EnvEpisode::is_done)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
