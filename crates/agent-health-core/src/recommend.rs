use crate::config::{Policy, Thresholds};
use crate::diagnose::RootCause;
use crate::metrics::MetricsRecord;
use crate::score::ScoredAgent;
use crate::types::{Category, Priority, Role};
use serde::{Deserialize, Serialize};

/// Target debt index as a fraction of the current one.
const DEBT_REDUCTION_FACTOR: f64 = 0.7;

// ---------------------------------------------------------------------------
// Recommendation
// ---------------------------------------------------------------------------

/// A numeric goal attached to an action item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionTarget {
    pub metric: String,
    pub value: f64,
    pub unit: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionItem {
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<ActionTarget>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub category: Category,
    pub priority: Priority,
    pub title: String,
    /// Role whose phrasing was used; differs from the agent's role on fallback.
    pub template_role: Role,
    pub actions: Vec<ActionItem>,
    /// Lines meant for the agent's definition document.
    pub instructions: Vec<String>,
}

// ---------------------------------------------------------------------------
// Template table
// ---------------------------------------------------------------------------

/// Roles with their own phrasing. Anything else reads the backend rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TemplateRole {
    ProductOwner,
    Backend,
    Frontend,
    DevOps,
}

impl TemplateRole {
    fn for_role(role: &Role) -> Self {
        match role {
            Role::ProductOwner => TemplateRole::ProductOwner,
            Role::FrontendDeveloper => TemplateRole::Frontend,
            Role::DevOpsEngineer => TemplateRole::DevOps,
            Role::BackendDeveloper | Role::Other(_) => TemplateRole::Backend,
        }
    }

    fn role(self) -> Role {
        match self {
            TemplateRole::ProductOwner => Role::ProductOwner,
            TemplateRole::Backend => Role::BackendDeveloper,
            TemplateRole::Frontend => Role::FrontendDeveloper,
            TemplateRole::DevOps => Role::DevOpsEngineer,
        }
    }
}

struct TemplateContext<'a> {
    metrics: &'a MetricsRecord,
    thresholds: &'a Thresholds,
    policy: &'a Policy,
}

/// One row keyed by (category, role). `role: None` is the category's
/// fallback row.
struct Template {
    category: Category,
    role: Option<TemplateRole>,
    priority: Priority,
    title: &'static str,
    actions: fn(&TemplateContext) -> Vec<ActionItem>,
    instructions: &'static [&'static str],
}

fn step(description: &str) -> ActionItem {
    ActionItem {
        description: description.to_string(),
        target: None,
    }
}

fn goal(description: &str, metric: &str, value: f64, unit: &str) -> ActionItem {
    ActionItem {
        description: description.to_string(),
        target: Some(ActionTarget {
            metric: metric.to_string(),
            value,
            unit: unit.to_string(),
        }),
    }
}

// ---------------------------------------------------------------------------
// Derived targets
// ---------------------------------------------------------------------------

fn gap(current: u32, target: f64, floor: u32) -> f64 {
    let needed = (target.ceil() - current as f64).max(0.0);
    needed.max(floor as f64)
}

fn commits_needed(ctx: &TemplateContext) -> f64 {
    gap(ctx.metrics.commits, ctx.thresholds.min_commits_per_window, 1)
}

fn prs_needed(ctx: &TemplateContext) -> f64 {
    gap(ctx.metrics.pull_requests, ctx.thresholds.min_prs_per_window, 1)
}

/// `max(review_goal - reviews, review_floor)`
fn reviews_needed(ctx: &TemplateContext) -> f64 {
    ctx.policy
        .review_goal
        .saturating_sub(ctx.metrics.code_reviews)
        .max(ctx.policy.review_floor) as f64
}

fn bug_budget(ctx: &TemplateContext) -> f64 {
    (ctx.metrics.bugs_introduced / 2) as f64
}

fn debt_target(ctx: &TemplateContext) -> f64 {
    (ctx.metrics.tech_debt_index * DEBT_REDUCTION_FACTOR).round()
}

fn velocity_target(ctx: &TemplateContext) -> f64 {
    (ctx.thresholds.sub_score_trigger_threshold / 10.0)
        .ceil()
        .max(ctx.metrics.velocity.ceil())
}

// ---------------------------------------------------------------------------
// Productivity rows
// ---------------------------------------------------------------------------

fn productivity_backend(ctx: &TemplateContext) -> Vec<ActionItem> {
    vec![
        goal(
            "Commit each completed unit of work instead of batching changes",
            "commits",
            commits_needed(ctx),
            "more commits this window",
        ),
        goal(
            "Open focused pull requests for finished work",
            "pull_requests",
            prs_needed(ctx),
            "more pull requests this window",
        ),
        step("Split changes larger than 400 lines into separate pull requests"),
    ]
}

fn productivity_frontend(ctx: &TemplateContext) -> Vec<ActionItem> {
    vec![
        goal(
            "Commit component-level changes as soon as each one works",
            "commits",
            commits_needed(ctx),
            "more commits this window",
        ),
        goal(
            "Open one pull request per screen or component",
            "pull_requests",
            prs_needed(ctx),
            "more pull requests this window",
        ),
        step("Merge unfinished UI behind feature flags instead of holding long-lived branches"),
    ]
}

fn productivity_devops(ctx: &TemplateContext) -> Vec<ActionItem> {
    vec![
        goal(
            "Commit infrastructure-as-code changes instead of editing environments by hand",
            "commits",
            commits_needed(ctx),
            "more commits this window",
        ),
        goal(
            "Open pull requests for pipeline and environment changes",
            "pull_requests",
            prs_needed(ctx),
            "more pull requests this window",
        ),
        step("Automate one recurring manual operation this window"),
    ]
}

fn productivity_product_owner(ctx: &TemplateContext) -> Vec<ActionItem> {
    vec![
        step("Break epics into stories small enough to finish within one window"),
        goal(
            "Commit specification and acceptance-criteria updates to the product docs",
            "commits",
            commits_needed(ctx),
            "more commits this window",
        ),
        goal(
            "Open pull requests for roadmap and requirement changes so the team can review them",
            "pull_requests",
            prs_needed(ctx),
            "more pull requests this window",
        ),
    ]
}

// ---------------------------------------------------------------------------
// Quality rows
// ---------------------------------------------------------------------------

fn quality_backend(ctx: &TemplateContext) -> Vec<ActionItem> {
    vec![
        step("Add a regression test with every bug fix and a unit test with every new endpoint"),
        goal(
            "Keep bugs introduced at or below",
            "bugs_introduced",
            bug_budget(ctx),
            "bugs per window",
        ),
        goal(
            "Pay down debt in touched modules until the debt index is at most",
            "tech_debt_index",
            debt_target(ctx),
            "index points",
        ),
        step("Run static analysis and the full test suite before requesting review"),
    ]
}

fn quality_frontend(ctx: &TemplateContext) -> Vec<ActionItem> {
    vec![
        step("Add component and end-to-end tests for every changed view"),
        goal(
            "Keep UI bugs introduced at or below",
            "bugs_introduced",
            bug_budget(ctx),
            "bugs per window",
        ),
        goal(
            "Remove duplicated components and dead styles until the debt index is at most",
            "tech_debt_index",
            debt_target(ctx),
            "index points",
        ),
        step("Check accessibility and cross-browser behaviour before requesting review"),
    ]
}

fn quality_devops(ctx: &TemplateContext) -> Vec<ActionItem> {
    vec![
        step("Validate pipeline and infrastructure changes in a staging environment first"),
        goal(
            "Keep incidents caused by configuration changes at or below",
            "bugs_introduced",
            bug_budget(ctx),
            "incidents per window",
        ),
        goal(
            "Retire deprecated scripts and pinned workarounds until the debt index is at most",
            "tech_debt_index",
            debt_target(ctx),
            "index points",
        ),
        step("Add a rollback step and a health check to every deployment change"),
    ]
}

fn quality_product_owner(ctx: &TemplateContext) -> Vec<ActionItem> {
    vec![
        step("Write testable acceptance criteria for every story before it enters a sprint"),
        goal(
            "Keep defects traced to unclear requirements at or below",
            "bugs_introduced",
            bug_budget(ctx),
            "defects per window",
        ),
        goal(
            "Reserve capacity for debt work until the debt index is at most",
            "tech_debt_index",
            debt_target(ctx),
            "index points",
        ),
        step("Check delivered stories against their criteria before closing them"),
    ]
}

// ---------------------------------------------------------------------------
// Collaboration rows
// ---------------------------------------------------------------------------

fn collaboration_default(ctx: &TemplateContext) -> Vec<ActionItem> {
    vec![
        goal(
            "Review teammates' pull requests",
            "code_reviews",
            reviews_needed(ctx),
            "reviews this window",
        ),
        step("Leave at least one actionable comment on every review"),
        step("Answer review requests within one working day"),
    ]
}

fn collaboration_product_owner(ctx: &TemplateContext) -> Vec<ActionItem> {
    vec![
        goal(
            "Review pull requests for product impact and acceptance-criteria coverage",
            "code_reviews",
            reviews_needed(ctx),
            "reviews this window",
        ),
        step("Join backlog refinement with the developers who will build each story"),
        step("Publish a short summary of priority changes to the team every window"),
    ]
}

// ---------------------------------------------------------------------------
// Reliability rows
// ---------------------------------------------------------------------------

fn reliability_default(ctx: &TemplateContext) -> Vec<ActionItem> {
    vec![
        step("Commit to a realistic scope at the start of each window"),
        goal(
            "Raise delivery velocity to at least",
            "velocity",
            velocity_target(ctx),
            "points per window",
        ),
        step("Raise blockers within one working day instead of waiting for the next sync"),
    ]
}

fn reliability_devops(ctx: &TemplateContext) -> Vec<ActionItem> {
    vec![
        step("Quarantine or fix flaky pipeline stages"),
        goal(
            "Raise deployment velocity to at least",
            "velocity",
            velocity_target(ctx),
            "points per window",
        ),
        step("Add alerting for failed deployments and stalled pipelines"),
    ]
}

static TEMPLATES: [Template; 12] = [
    Template {
        category: Category::Productivity,
        role: Some(TemplateRole::Backend),
        priority: Priority::High,
        title: "Increase delivery cadence",
        actions: productivity_backend,
        instructions: &[
            "Commit work in small, self-contained increments at least once per working day.",
            "Open a pull request as soon as a change is reviewable; do not batch unrelated work.",
        ],
    },
    Template {
        category: Category::Productivity,
        role: Some(TemplateRole::Frontend),
        priority: Priority::High,
        title: "Ship UI work in smaller increments",
        actions: productivity_frontend,
        instructions: &[
            "Deliver UI changes component by component, each in its own commit.",
            "Prefer feature flags over long-lived branches for unfinished screens.",
        ],
    },
    Template {
        category: Category::Productivity,
        role: Some(TemplateRole::DevOps),
        priority: Priority::High,
        title: "Deliver infrastructure changes through code",
        actions: productivity_devops,
        instructions: &[
            "Express every environment change as reviewed infrastructure code.",
            "Automate any operation you have performed by hand twice.",
        ],
    },
    Template {
        category: Category::Productivity,
        role: Some(TemplateRole::ProductOwner),
        priority: Priority::High,
        title: "Keep the backlog flowing",
        actions: productivity_product_owner,
        instructions: &[
            "Keep at least one window of refined, ready stories in the backlog.",
            "Record product decisions in version-controlled documents, not in chat.",
        ],
    },
    Template {
        category: Category::Quality,
        role: Some(TemplateRole::Backend),
        priority: Priority::Urgent,
        title: "Reduce defects and technical debt",
        actions: quality_backend,
        instructions: &[
            "Never submit a change without tests covering the new or fixed behaviour.",
            "Run linters and the full test suite locally before requesting review.",
            "Leave every module you touch with less debt than you found.",
        ],
    },
    Template {
        category: Category::Quality,
        role: Some(TemplateRole::Frontend),
        priority: Priority::Urgent,
        title: "Harden UI quality",
        actions: quality_frontend,
        instructions: &[
            "Cover every changed view with component or end-to-end tests.",
            "Verify accessibility and supported browsers before requesting review.",
        ],
    },
    Template {
        category: Category::Quality,
        role: Some(TemplateRole::DevOps),
        priority: Priority::Urgent,
        title: "Make infrastructure changes safe",
        actions: quality_devops,
        instructions: &[
            "Roll out configuration changes to staging before production.",
            "Every deployment change must ship with a rollback path and a health check.",
        ],
    },
    Template {
        category: Category::Quality,
        role: Some(TemplateRole::ProductOwner),
        priority: Priority::Urgent,
        title: "Tighten acceptance criteria",
        actions: quality_product_owner,
        instructions: &[
            "Every story needs testable acceptance criteria before work starts.",
            "Reserve part of each window for technical-debt reduction.",
        ],
    },
    Template {
        category: Category::Collaboration,
        role: Some(TemplateRole::ProductOwner),
        priority: Priority::Medium,
        title: "Engage with the delivery team",
        actions: collaboration_product_owner,
        instructions: &[
            "Review pull requests that change user-facing behaviour.",
            "Communicate priority changes to the whole team as soon as they are made.",
        ],
    },
    Template {
        category: Category::Collaboration,
        role: None,
        priority: Priority::Medium,
        title: "Participate in code reviews",
        actions: collaboration_default,
        instructions: &[
            "Review open pull requests from teammates before starting new work each day.",
            "Give specific, actionable feedback in every review.",
        ],
    },
    Template {
        category: Category::Reliability,
        role: Some(TemplateRole::DevOps),
        priority: Priority::Medium,
        title: "Stabilize the delivery pipeline",
        actions: reliability_devops,
        instructions: &[
            "Treat a flaky pipeline stage as a bug and fix it before adding new stages.",
            "Alert on failed deployments instead of waiting for reports.",
        ],
    },
    Template {
        category: Category::Reliability,
        role: None,
        priority: Priority::Medium,
        title: "Stabilize delivery velocity",
        actions: reliability_default,
        instructions: &[
            "Commit only to scope you can finish within the window.",
            "Report blockers as soon as they appear.",
        ],
    },
];

/// Exact (category, role) row, then the backend row, then the category's
/// fallback row.
fn template_for(category: Category, role: TemplateRole) -> Option<&'static Template> {
    let lookup = |wanted: Option<TemplateRole>| {
        TEMPLATES
            .iter()
            .find(|t| t.category == category && t.role == wanted)
    };
    lookup(Some(role))
        .or_else(|| lookup(Some(TemplateRole::Backend)))
        .or_else(|| lookup(None))
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

/// One recommendation per root cause, in the order the causes were given.
pub fn recommend(
    causes: &[RootCause],
    agent: &ScoredAgent,
    thresholds: &Thresholds,
    policy: &Policy,
) -> Vec<Recommendation> {
    let role = TemplateRole::for_role(&agent.identity().role);
    let ctx = TemplateContext {
        metrics: &agent.metrics,
        thresholds,
        policy,
    };

    causes
        .iter()
        .filter_map(|cause| {
            let template = template_for(cause.category, role)?;
            Some(Recommendation {
                category: cause.category,
                priority: template.priority,
                title: template.title.to_string(),
                template_role: template.role.unwrap_or(role).role(),
                actions: (template.actions)(&ctx),
                instructions: template.instructions.iter().map(|s| s.to_string()).collect(),
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnose::diagnose;
    use crate::metrics::tests::record;

    fn plan_for(role: Role, counters: (u32, u32, u32, u32), debt: f64, velocity: f64) -> Vec<Recommendation> {
        let thresholds = Thresholds::default();
        let agent =
            ScoredAgent::evaluate(record("Agent", role, counters, debt, velocity), &thresholds)
                .unwrap();
        let causes = diagnose(&agent, &thresholds);
        recommend(&causes, &agent, &thresholds, &Policy::default())
    }

    fn target(rec: &Recommendation, metric: &str) -> f64 {
        rec.actions
            .iter()
            .filter_map(|a| a.target.as_ref())
            .find(|t| t.metric == metric)
            .map(|t| t.value)
            .unwrap_or_else(|| panic!("no {metric} target in {}", rec.title))
    }

    #[test]
    fn every_category_resolves_for_every_role() {
        for &category in Category::all() {
            for role in [
                TemplateRole::ProductOwner,
                TemplateRole::Backend,
                TemplateRole::Frontend,
                TemplateRole::DevOps,
            ] {
                assert!(
                    template_for(category, role).is_some(),
                    "no template for {category} / {role:?}"
                );
            }
        }
    }

    #[test]
    fn one_recommendation_per_cause_in_order() {
        let recs = plan_for(Role::BackendDeveloper, (3, 1, 0, 4), 70.0, 2.0);
        let categories: Vec<_> = recs.iter().map(|r| r.category).collect();
        assert_eq!(
            categories,
            [
                Category::Productivity,
                Category::Quality,
                Category::Collaboration,
                Category::Reliability
            ]
        );
        assert_eq!(recs[1].priority, Priority::Urgent);
    }

    #[test]
    fn order_follows_input_not_priority() {
        let thresholds = Thresholds::default();
        let agent = ScoredAgent::evaluate(
            record("Agent", Role::BackendDeveloper, (3, 1, 0, 4), 70.0, 2.0),
            &thresholds,
        )
        .unwrap();
        let mut causes = diagnose(&agent, &thresholds);
        causes.reverse();
        let recs = recommend(&causes, &agent, &thresholds, &Policy::default());
        assert_eq!(recs[0].category, Category::Reliability);
        assert_eq!(recs[3].category, Category::Productivity);
    }

    #[test]
    fn no_causes_no_recommendations() {
        assert!(plan_for(Role::BackendDeveloper, (14, 6, 6, 0), 5.0, 9.0).is_empty());
    }

    #[test]
    fn reviews_needed_tracks_the_gap() {
        // 0 reviews: goal 5 - 0 = 5
        let recs = plan_for(Role::FrontendDeveloper, (5, 2, 0, 0), 0.0, 8.0);
        assert_eq!(recs.len(), 1);
        assert_eq!(target(&recs[0], "code_reviews"), 5.0);

        // 1 review: 5 - 1 = 4
        let recs = plan_for(Role::FrontendDeveloper, (5, 2, 1, 0), 0.0, 8.0);
        assert_eq!(target(&recs[0], "code_reviews"), 4.0);
    }

    #[test]
    fn reviews_needed_respects_floor() {
        let thresholds = Thresholds {
            review_target: 10.0,
            ..Thresholds::default()
        };
        let agent = ScoredAgent::evaluate(
            record("Agent", Role::BackendDeveloper, (5, 2, 5, 0), 0.0, 8.0),
            &thresholds,
        )
        .unwrap();
        let causes = diagnose(&agent, &thresholds);
        let recs = recommend(&causes, &agent, &thresholds, &Policy::default());
        assert_eq!(recs[0].category, Category::Collaboration);
        assert_eq!(target(&recs[0], "code_reviews"), 2.0);
    }

    #[test]
    fn derived_targets_for_struggling_backend() {
        let recs = plan_for(Role::BackendDeveloper, (3, 1, 0, 4), 70.0, 2.0);
        assert_eq!(target(&recs[0], "commits"), 2.0);
        assert_eq!(target(&recs[0], "pull_requests"), 1.0);
        assert_eq!(target(&recs[1], "bugs_introduced"), 2.0);
        assert_eq!(target(&recs[1], "tech_debt_index"), 49.0);
        assert_eq!(target(&recs[3], "velocity"), 6.0);
    }

    #[test]
    fn role_specific_phrasing() {
        let po = plan_for(Role::ProductOwner, (3, 1, 0, 4), 70.0, 2.0);
        let devops = plan_for(Role::DevOpsEngineer, (3, 1, 0, 4), 70.0, 2.0);
        assert_eq!(po[0].title, "Keep the backlog flowing");
        assert_eq!(po[2].title, "Engage with the delivery team");
        assert_eq!(devops[1].title, "Make infrastructure changes safe");
        assert_eq!(devops[3].title, "Stabilize the delivery pipeline");
        assert_eq!(devops[3].template_role, Role::DevOpsEngineer);
    }

    #[test]
    fn unrecognized_role_uses_backend_phrasing() {
        let other = plan_for(Role::Other("Data Scientist".to_string()), (3, 1, 0, 4), 70.0, 2.0);
        let backend = plan_for(Role::BackendDeveloper, (3, 1, 0, 4), 70.0, 2.0);
        let other_titles: Vec<_> = other.iter().map(|r| r.title.as_str()).collect();
        let backend_titles: Vec<_> = backend.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(other_titles, backend_titles);
        assert_eq!(other[0].template_role, Role::BackendDeveloper);
    }

    #[test]
    fn generation_is_reproducible() {
        let a = plan_for(Role::FrontendDeveloper, (2, 0, 1, 3), 55.0, 3.5);
        let b = plan_for(Role::FrontendDeveloper, (2, 0, 1, 3), 55.0, 3.5);
        assert_eq!(a, b);
    }
}
