//! Synthetic metrics producer.
//!
//! Stands in for the dashboard extractor when no real counters are
//! available. Agents that already received a plan draw from the improved
//! distribution; everyone else draws from the baseline one.

use crate::metrics::{MetricsRecord, ObservationWindow};
use crate::roster::Agent;
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::ops::RangeInclusive;

#[derive(Debug, Clone)]
struct Profile {
    commits: RangeInclusive<u32>,
    pull_requests: RangeInclusive<u32>,
    code_reviews: RangeInclusive<u32>,
    bugs_introduced: RangeInclusive<u32>,
    tech_debt_index: RangeInclusive<f64>,
    velocity: RangeInclusive<f64>,
}

fn baseline() -> Profile {
    Profile {
        commits: 1..=6,
        pull_requests: 0..=2,
        code_reviews: 0..=2,
        bugs_introduced: 1..=6,
        tech_debt_index: 45.0..=80.0,
        velocity: 1.0..=4.0,
    }
}

fn improved() -> Profile {
    Profile {
        commits: 10..=16,
        pull_requests: 4..=8,
        code_reviews: 4..=8,
        bugs_introduced: 0..=1,
        tech_debt_index: 0.0..=15.0,
        velocity: 8.0..=10.0,
    }
}

pub struct Generator {
    rng: StdRng,
    window_days: i64,
}

impl Generator {
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            window_days: 7,
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
            window_days: 7,
        }
    }

    pub fn with_window_days(mut self, days: i64) -> Self {
        self.window_days = days.max(1);
        self
    }

    pub fn record_for(&mut self, agent: &Agent, window_end: DateTime<Utc>) -> MetricsRecord {
        let p = if agent.is_improved() {
            improved()
        } else {
            baseline()
        };
        let commits = self.rng.gen_range(p.commits);
        MetricsRecord {
            agent: agent.identity(),
            window: ObservationWindow::ending_at(window_end, self.window_days),
            commits,
            pull_requests: self.rng.gen_range(p.pull_requests),
            code_reviews: self.rng.gen_range(p.code_reviews),
            bugs_introduced: self.rng.gen_range(p.bugs_introduced),
            lines_added: commits as u64 * self.rng.gen_range(20..=120),
            lines_removed: commits as u64 * self.rng.gen_range(0..=60),
            tech_debt_index: round1(self.rng.gen_range(p.tech_debt_index)),
            velocity: round1(self.rng.gen_range(p.velocity)),
        }
    }

    pub fn generate(&mut self, agents: &[Agent], window_end: DateTime<Utc>) -> Vec<MetricsRecord> {
        agents
            .iter()
            .map(|a| self.record_for(a, window_end))
            .collect()
    }
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Thresholds;
    use crate::score::score;
    use crate::types::{Role, Status};

    fn agents() -> Vec<Agent> {
        let mut improved = Agent::new("Ops Bot", "ops@agents.dev", Role::DevOpsEngineer);
        improved.last_improved_at = Some(Utc::now());
        vec![
            Agent::new("Backend Bot", "backend@agents.dev", Role::BackendDeveloper),
            improved,
        ]
    }

    #[test]
    fn same_seed_same_records() {
        let end = Utc::now();
        let a = Generator::seeded(7).generate(&agents(), end);
        let b = Generator::seeded(7).generate(&agents(), end);
        assert_eq!(a, b);
    }

    #[test]
    fn generated_records_are_valid() {
        let end = Utc::now();
        let mut generator = Generator::seeded(1).with_window_days(14);
        for _ in 0..50 {
            for record in generator.generate(&agents(), end) {
                record.validate().unwrap();
                assert_eq!(record.window.end - record.window.start, chrono::Duration::days(14));
            }
        }
    }

    #[test]
    fn improved_agents_score_healthy_and_baseline_does_not() {
        let end = Utc::now();
        let t = Thresholds::default();
        let mut generator = Generator::seeded(42);
        for _ in 0..50 {
            let records = generator.generate(&agents(), end);
            assert_ne!(score(&records[0], &t).status, Status::Healthy);
            assert_eq!(score(&records[1], &t).status, Status::Healthy);
        }
    }
}
