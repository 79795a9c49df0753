//! Deterministic synthetic platform traffic.
//!
//! RULE: The runner never calls a platform RNG. Every random draw flows
//! through a `TrafficRng` derived from the single `--seed`, so two runs
//! with the same seed, user count and day count issue the same actions.
//!
//! Each user gets its own stream, seeded from (seed XOR user_index), so
//! adding users never changes the traffic of existing ones.

use kudos_core::config::ActivityKind;
use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg64Mcg;

/// A seeded RNG stream.
pub struct TrafficRng {
    inner: Pcg64Mcg,
}

impl TrafficRng {
    pub fn new(seed: u64, stream: u64) -> Self {
        let derived = seed ^ stream.wrapping_mul(0x9e37_79b9_7f4a_7c15);
        Self {
            inner: Pcg64Mcg::seed_from_u64(derived),
        }
    }

    /// Roll a float in [0.0, 1.0).
    pub fn next_f64(&mut self) -> f64 {
        let bits = self.inner.next_u64();
        (bits >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Roll a u64 in [0, n). `n` must be non-zero.
    pub fn below(&mut self, n: u64) -> u64 {
        self.inner.next_u64() % n.max(1)
    }

    /// Bernoulli trial.
    pub fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    /// Simplified Pareto draw; most users are light, a few are very active.
    pub fn pareto(&mut self, x_min: f64, alpha: f64) -> f64 {
        let u = self.next_f64().max(1e-10);
        x_min * u.powf(-1.0 / alpha)
    }

    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        &items[self.below(items.len() as u64) as usize]
    }
}

/// One thing a simulated user does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Login,
    Act {
        kind:      ActivityKind,
        reference: Option<String>,
    },
}

/// Relative frequency of each activity in generated traffic.
/// NEWS_COMMENT is kept so configs that omit it exercise the unknown-kind path.
const ACTIVITY_WEIGHTS: [(ActivityKind, u32); 12] = [
    (ActivityKind::BlogLike, 30),
    (ActivityKind::BlogComment, 15),
    (ActivityKind::PollVote, 12),
    (ActivityKind::DiscussionReply, 12),
    (ActivityKind::LessonComplete, 8),
    (ActivityKind::NewsComment, 6),
    (ActivityKind::BlogPost, 5),
    (ActivityKind::DiscussionPost, 4),
    (ActivityKind::SurveyComplete, 3),
    (ActivityKind::GroupJoin, 2),
    (ActivityKind::PollCreate, 2),
    (ActivityKind::CourseComplete, 1),
];

/// Shared content pool size. Likes and votes target this pool, so users
/// revisit content and produce duplicate references.
const CONTENT_POOL: u64 = 40;

/// A simulated member's behaviour profile.
pub struct SimUser {
    pub user_id:      String,
    /// Probability of showing up on a given day.
    pub login_chance: f64,
    /// Mean actions per active day.
    pub intensity:    f64,
    rng:              TrafficRng,
}

impl SimUser {
    pub fn new(seed: u64, index: u64) -> Self {
        let mut rng = TrafficRng::new(seed, index + 1);
        let login_chance = 0.35 + rng.next_f64() * 0.6;
        let intensity = rng.pareto(1.0, 1.6).min(40.0);
        Self {
            user_id: format!("user-{index:04}"),
            login_chance,
            intensity,
            rng,
        }
    }

    /// Actions for one simulated day, in order. Empty when the user stays away.
    pub fn actions_for_day(&mut self, day: u32) -> Vec<Action> {
        if !self.rng.chance(self.login_chance) {
            return Vec::new();
        }
        let mut actions = vec![Action::Login];
        let count = self.rng.below(self.intensity.ceil() as u64 * 2 + 1);
        for n in 0..count {
            let kind = self.weighted_kind();
            let reference = self.reference_for(kind, day, n);
            actions.push(Action::Act { kind, reference });
        }
        // Occasionally log in twice in one day.
        if self.rng.chance(0.1) {
            actions.push(Action::Login);
        }
        actions
    }

    fn weighted_kind(&mut self) -> ActivityKind {
        let total: u32 = ACTIVITY_WEIGHTS.iter().map(|(_, w)| w).sum();
        let mut roll = self.rng.below(u64::from(total)) as u32;
        for (kind, weight) in ACTIVITY_WEIGHTS {
            if roll < weight {
                return kind;
            }
            roll -= weight;
        }
        ActivityKind::BlogLike
    }

    fn reference_for(&mut self, kind: ActivityKind, day: u32, n: u64) -> Option<String> {
        let shared = |rng: &mut TrafficRng, prefix: &str| {
            Some(format!("{prefix}-{}", rng.below(CONTENT_POOL)))
        };
        match kind {
            ActivityKind::BlogLike | ActivityKind::BlogComment => shared(&mut self.rng, "post"),
            ActivityKind::PollVote => shared(&mut self.rng, "poll"),
            ActivityKind::DiscussionReply => shared(&mut self.rng, "thread"),
            ActivityKind::NewsComment => shared(&mut self.rng, "news"),
            ActivityKind::GroupJoin => shared(&mut self.rng, "group"),
            ActivityKind::LessonComplete => shared(&mut self.rng, "lesson"),
            ActivityKind::SurveyComplete => shared(&mut self.rng, "survey"),
            ActivityKind::CourseComplete => {
                let course = *self.rng.pick(&["rust-101", "sql-basics", "writing", "finance"]);
                Some(format!("course-{course}"))
            }
            _ => Some(format!("{}-{day}-{n}", self.user_id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_traffic() {
        let mut a = SimUser::new(42, 3);
        let mut b = SimUser::new(42, 3);
        for day in 0..10 {
            assert_eq!(a.actions_for_day(day), b.actions_for_day(day));
        }
    }

    #[test]
    fn active_days_start_with_login() {
        let mut user = SimUser::new(7, 0);
        for day in 0..30 {
            let actions = user.actions_for_day(day);
            if let Some(first) = actions.first() {
                assert_eq!(first, &Action::Login);
            }
        }
    }

    #[test]
    fn streams_differ_per_user() {
        let a = SimUser::new(42, 0);
        let b = SimUser::new(42, 1);
        assert_ne!(a.login_chance, b.login_chance);
    }
}
