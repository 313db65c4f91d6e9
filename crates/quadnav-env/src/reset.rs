//! Per-environment reset sampling.
//!
//! Each reset of env `e` for its `k`-th episode draws from its own
//! `"reset"` subsystem stream, so resetting one environment never shifts
//! another environment's randomness.

use nalgebra::{Vector2, Vector3};
use quadnav_core::config::{CommandSettings, InitStateSettings};
use quadnav_core::math::IDENTITY_QUAT;
use quadnav_core::seed::SeedHierarchy;
use quadnav_core::sim::{DofLayout, SimBackend};
use quadnav_core::types::{JointVector, NUM_JOINTS};
use quadnav_nav::command::PoseCommand;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Uniform as UniformDist};

/// Seed subsystem key of reset sampling.
pub const RESET_SUBSYSTEM: &str = "reset";

/// Spawn pose and first pose command of one fresh episode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResetSample {
    pub spawn: Vector3<f32>,
    pub command: PoseCommand,
}

/// Where the first target of an episode comes from, best first.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TargetSource {
    /// First waypoint body, or the goal body in goal-only mode.
    pub primary: Option<Vector2<f32>>,
    /// Goal body position.
    pub goal: Option<Vector2<f32>>,
}

/// Draws spawn poses and targets, and writes the spawn state into the sim.
#[derive(Debug, Clone)]
pub struct ResetSampler {
    seeds: SeedHierarchy,
    init: InitStateSettings,
    heading_range: [f32; 2],
    default_pose: JointVector,
    layout: DofLayout,
}

impl ResetSampler {
    pub fn new(
        seed: u64,
        init: &InitStateSettings,
        commands: &CommandSettings,
        default_pose: JointVector,
    ) -> Self {
        Self {
            seeds: SeedHierarchy::new(seed),
            init: init.clone(),
            heading_range: commands.heading_range,
            default_pose,
            layout: DofLayout::STANDARD,
        }
    }

    /// RNG of `env`'s `episode`-th reset.
    pub fn rng(&self, env: usize, episode: u64) -> ChaCha8Rng {
        self.seeds.subsystem_rng(env, episode, RESET_SUBSYSTEM)
    }

    /// Draw spawn, target and heading, in that order.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R, source: TargetSource) -> ResetSample {
        let [cx, cy, cz] = self.init.spawn_center;
        let spawn = Vector3::new(
            cx + symmetric(rng, self.init.spawn_range[0]),
            cy + symmetric(rng, self.init.spawn_range[1]),
            cz,
        );

        let finite = |p: &Vector2<f32>| p.iter().all(|c| c.is_finite());
        let target = match source.primary.filter(finite).or(source.goal.filter(finite)) {
            Some(center) => Vector2::new(
                center.x + symmetric(rng, self.init.target_pos_range[0]),
                center.y + symmetric(rng, self.init.target_pos_range[1]),
            ),
            None => {
                let r = self.init.fallback_target_range;
                Vector2::new(symmetric(rng, r), symmetric(rng, r))
            }
        };

        let [lo, hi] = self.heading_range;
        let heading = UniformDist::new_inclusive(lo.min(hi), lo.max(hi)).sample(rng);
        ResetSample {
            spawn,
            command: PoseCommand::new(target.x, target.y, heading),
        }
    }

    /// Put `env` at its spawn pose, standing, at rest.
    pub fn write_spawn<S: SimBackend + ?Sized>(&self, sim: &mut S, env: usize, spawn: &Vector3<f32>) {
        let l = self.layout;
        let pos = sim.dof_pos_mut(env);
        if let Some(slot) = pos.get_mut(l.base_pos..l.base_pos + 3) {
            slot.copy_from_slice(spawn.as_slice());
        }
        if let Some(slot) = pos.get_mut(l.base_quat..l.base_quat + 4) {
            slot.copy_from_slice(&IDENTITY_QUAT);
        }
        if let Some(slot) = pos.get_mut(l.joint_pos..l.joint_pos + NUM_JOINTS) {
            slot.copy_from_slice(&self.default_pose);
        }
        sim.dof_vel_mut(env).fill(0.0);
    }
}

/// `U[-half, half]`.
fn symmetric<R: Rng + ?Sized>(rng: &mut R, half: f32) -> f32 {
    let half = half.abs();
    UniformDist::new_inclusive(-half, half).sample(rng)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use quadnav_test_utils::MockSim;

    use super::*;

    fn sampler(seed: u64) -> ResetSampler {
        ResetSampler::new(
            seed,
            &InitStateSettings::default(),
            &CommandSettings::default(),
            [0.0, 0.9, -1.8, 0.0, 0.9, -1.8, 0.0, 0.9, -1.8, 0.0, 0.9, -1.8],
        )
    }

    fn first_at(x: f32, y: f32) -> TargetSource {
        TargetSource {
            primary: Some(Vector2::new(x, y)),
            goal: Some(Vector2::new(9.0, 9.0)),
        }
    }

    #[test]
    fn same_env_and_episode_reproduce() {
        let s = sampler(7);
        let a = s.sample(&mut s.rng(2, 5), first_at(3.0, 1.0));
        let b = s.sample(&mut s.rng(2, 5), first_at(3.0, 1.0));
        assert_eq!(a, b);
        let c = s.sample(&mut s.rng(3, 5), first_at(3.0, 1.0));
        assert_ne!(a, c);
    }

    #[test]
    fn spawn_and_target_stay_in_range() {
        let s = sampler(1);
        for episode in 0..50 {
            let r = s.sample(&mut s.rng(0, episode), first_at(3.0, 1.0));
            assert!(r.spawn.x.abs() <= 0.1 && r.spawn.y.abs() <= 0.1);
            assert!((r.spawn.z - 0.5).abs() < f32::EPSILON);
            assert!((r.command.target.x - 3.0).abs() <= 0.1 + 1e-6);
            assert!((r.command.target.y - 1.0).abs() <= 0.1 + 1e-6);
            let [lo, hi] = CommandSettings::default().heading_range;
            assert!(r.command.heading >= lo && r.command.heading <= hi);
        }
    }

    #[test]
    fn unresolved_waypoint_falls_back_to_goal() {
        let s = sampler(3);
        let source = TargetSource {
            primary: None,
            goal: Some(Vector2::new(4.0, -2.0)),
        };
        let [rx, ry] = InitStateSettings::default().target_pos_range;
        for episode in 0..20 {
            let r = s.sample(&mut s.rng(0, episode), source);
            assert!((r.command.target.x - 4.0).abs() <= rx + 1e-6);
            assert!((r.command.target.y + 2.0).abs() <= ry + 1e-6);
        }
    }

    #[test]
    fn non_finite_waypoint_falls_back_to_goal() {
        let s = sampler(4);
        let source = TargetSource {
            primary: Some(Vector2::new(f32::NAN, 1.0)),
            goal: Some(Vector2::new(-3.0, 5.0)),
        };
        let r = s.sample(&mut s.rng(0, 0), source);
        assert!((r.command.target.x + 3.0).abs() <= 0.1 + 1e-6);
        assert!((r.command.target.y - 5.0).abs() <= 0.1 + 1e-6);
    }

    #[test]
    fn non_finite_goal_falls_back_near_origin() {
        let s = sampler(3);
        let source = TargetSource {
            primary: Some(Vector2::new(f32::NAN, 0.0)),
            goal: Some(Vector2::new(f32::INFINITY, 0.0)),
        };
        let r0 = InitStateSettings::default().fallback_target_range;
        for episode in 0..20 {
            let r = s.sample(&mut s.rng(1, episode), source);
            assert!(r.command.target.x.abs() <= r0 + 1e-6);
            assert!(r.command.target.y.abs() <= r0 + 1e-6);
        }
    }

    #[test]
    fn missing_everything_falls_back_near_origin() {
        let s = sampler(5);
        for episode in 0..20 {
            let r = s.sample(&mut s.rng(2, episode), TargetSource::default());
            assert!(r.command.target.x.abs() <= 0.2 + 1e-6);
            assert!(r.command.target.y.abs() <= 0.2 + 1e-6);
        }
    }

    #[test]
    fn write_spawn_stands_robot_at_rest() {
        let s = sampler(0);
        let mut sim = MockSim::new(2);
        sim.set_base_orientation(1, [0.0, 0.0, 1.0, 0.0]);
        sim.set_joint_velocities(1, &[3.0; 12]);
        s.write_spawn(&mut sim, 1, &Vector3::new(0.05, -0.02, 0.5));

        let l = DofLayout::STANDARD;
        let pos = sim.dof_pos(1);
        assert!((pos[l.base_pos] - 0.05).abs() < f32::EPSILON);
        assert_eq!(&pos[l.base_quat..l.base_quat + 4], &IDENTITY_QUAT);
        assert!((pos[l.joint_pos + 1] - 0.9).abs() < f32::EPSILON);
        assert!(sim.dof_vel(1).iter().all(|v| *v == 0.0));
        assert!(pos[0].abs() < f32::EPSILON, "marker slots untouched");
    }
}
