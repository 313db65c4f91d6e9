// ---------------------------------------------------------------------------
// RewardFunction
// ---------------------------------------------------------------------------

/// Computes one scalar reward term from a per-environment context `C`.
pub trait RewardFunction<C>: Send + Sync {
    /// Compute the (unweighted) term value.
    fn compute(&self, ctx: &C) -> f32;

    /// Human-readable name for this term.
    fn name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// TerminationCondition
// ---------------------------------------------------------------------------

/// Decides whether an environment's episode ends, from a context `C`.
pub trait TerminationCondition<C>: Send + Sync {
    /// Returns `true` if the episode should end.
    fn is_terminated(&self, ctx: &C) -> bool;

    /// Human-readable name for this condition.
    fn name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// CompositeReward
// ---------------------------------------------------------------------------

/// A weighted combination of reward terms.
///
/// The total reward is the sum of each term multiplied by its weight. Use
/// [`breakdown`](Self::breakdown) to inspect individual contributions.
pub struct CompositeReward<C> {
    rewards: Vec<(Box<dyn RewardFunction<C>>, f32)>,
}

impl<C> CompositeReward<C> {
    /// Create an empty composite reward.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rewards: Vec::new(),
        }
    }

    /// Add a term with the given weight. Returns `self` for chaining.
    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn add(mut self, reward: Box<dyn RewardFunction<C>>, weight: f32) -> Self {
        self.rewards.push((reward, weight));
        self
    }

    /// Add a term only when its weight is non-zero.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn add_weighted(self, reward: Box<dyn RewardFunction<C>>, weight: f32) -> Self {
        if weight == 0.0 {
            self
        } else {
            self.add(reward, weight)
        }
    }

    /// Number of terms.
    pub fn len(&self) -> usize {
        self.rewards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rewards.is_empty()
    }

    /// Compute each term and return `(name, weighted_value)` pairs.
    pub fn breakdown(&self, ctx: &C) -> Vec<(&str, f32)> {
        self.rewards
            .iter()
            .map(|(reward, weight)| (reward.name(), reward.compute(ctx) * weight))
            .collect()
    }
}

impl<C> Default for CompositeReward<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> RewardFunction<C> for CompositeReward<C> {
    fn compute(&self, ctx: &C) -> f32 {
        self.rewards
            .iter()
            .map(|(reward, weight)| reward.compute(ctx) * weight)
            .sum()
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "CompositeReward"
    }
}

// ---------------------------------------------------------------------------
// CompositeTermination
// ---------------------------------------------------------------------------

/// OR-composition of termination conditions.
///
/// Returns `true` if **any** contained condition is satisfied.
pub struct CompositeTermination<C> {
    conditions: Vec<Box<dyn TerminationCondition<C>>>,
}

impl<C> CompositeTermination<C> {
    /// Create an empty composite termination.
    #[must_use]
    pub fn new() -> Self {
        Self {
            conditions: Vec::new(),
        }
    }

    /// Add a condition. Returns `self` for chaining.
    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn add(mut self, condition: Box<dyn TerminationCondition<C>>) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Names of the conditions that currently fire.
    pub fn triggered(&self, ctx: &C) -> Vec<&str> {
        self.conditions
            .iter()
            .filter(|condition| condition.is_terminated(ctx))
            .map(|condition| condition.name())
            .collect()
    }
}

impl<C> Default for CompositeTermination<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> TerminationCondition<C> for CompositeTermination<C> {
    fn is_terminated(&self, ctx: &C) -> bool {
        self.conditions
            .iter()
            .any(|condition| condition.is_terminated(ctx))
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "CompositeTermination"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    struct Ctx {
        x: f32,
    }

    struct Identity;

    impl RewardFunction<Ctx> for Identity {
        fn compute(&self, ctx: &Ctx) -> f32 {
            ctx.x
        }

        #[allow(clippy::unnecessary_literal_bound)]
        fn name(&self) -> &str {
            "Identity"
        }
    }

    struct Constant(f32);

    impl RewardFunction<Ctx> for Constant {
        fn compute(&self, _ctx: &Ctx) -> f32 {
            self.0
        }

        #[allow(clippy::unnecessary_literal_bound)]
        fn name(&self) -> &str {
            "Constant"
        }
    }

    struct Above(f32);

    impl TerminationCondition<Ctx> for Above {
        fn is_terminated(&self, ctx: &Ctx) -> bool {
            ctx.x > self.0
        }

        #[allow(clippy::unnecessary_literal_bound)]
        fn name(&self) -> &str {
            "Above"
        }
    }

    struct Never;

    impl TerminationCondition<Ctx> for Never {
        fn is_terminated(&self, _ctx: &Ctx) -> bool {
            false
        }

        #[allow(clippy::unnecessary_literal_bound)]
        fn name(&self) -> &str {
            "Never"
        }
    }

    #[test]
    fn composite_reward_weighted_sum() {
        let reward = CompositeReward::<Ctx>::new()
            .add(Box::new(Identity), 2.0)
            .add(Box::new(Constant(1.0)), -0.5);
        let total = reward.compute(&Ctx { x: 3.0 });
        assert!((total - 5.5).abs() < f32::EPSILON);
    }

    #[test]
    fn composite_reward_breakdown() {
        let reward = CompositeReward::<Ctx>::new()
            .add(Box::new(Identity), 2.0)
            .add(Box::new(Constant(4.0)), 0.25);
        let parts = reward.breakdown(&Ctx { x: 1.0 });
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].0, "Identity");
        assert!((parts[0].1 - 2.0).abs() < f32::EPSILON);
        assert!((parts[1].1 - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn zero_weight_terms_skipped() {
        let reward = CompositeReward::<Ctx>::new()
            .add_weighted(Box::new(Identity), 0.0)
            .add_weighted(Box::new(Constant(1.0)), 1.0);
        assert_eq!(reward.len(), 1);
    }

    #[test]
    fn empty_composite_is_zero() {
        let reward = CompositeReward::<Ctx>::default();
        assert!(reward.is_empty());
        assert!(reward.compute(&Ctx { x: 9.0 }).abs() < f32::EPSILON);
    }

    #[test]
    fn composite_termination_is_or() {
        let term = CompositeTermination::<Ctx>::new()
            .add(Box::new(Never))
            .add(Box::new(Above(1.0)));
        assert!(!term.is_terminated(&Ctx { x: 0.5 }));
        assert!(term.is_terminated(&Ctx { x: 1.5 }));
        assert_eq!(term.triggered(&Ctx { x: 1.5 }), vec!["Above"]);
    }

    #[test]
    fn composites_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CompositeReward<Ctx>>();
        assert_send_sync::<CompositeTermination<Ctx>>();
    }
}
