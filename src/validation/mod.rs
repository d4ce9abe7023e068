//! Preflight validation.
//!
//! A pass walks every widget through its kind's checker, adds graph-level
//! and empire-wide findings, then aggregates: per-widget indicators,
//! summary counts and a diffed issue feed. Aggregation always runs after
//! every checker has finished.

pub mod checks;
pub mod debounce;
pub mod feed;

use std::collections::BTreeMap;

use log::debug;
use serde::Serialize;

pub use checks::{CheckContext, CheckFn};
pub use debounce::Debouncer;
pub use feed::{FeedDiff, IssueFeed};

use crate::graph::ConnectionGraph;
use crate::ids::{EDGE_ID_PREFIX, WidgetId};
use crate::registry::Registry;
use crate::schema;
use crate::tech::Empire;

/// Source id of issues that are not tied to a widget.
pub const EMPIRE_SOURCE: &str = "empire";

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Severity {
    #[serde(rename = "alert")]
    Alert,
    #[serde(rename = "warning")]
    Warning,
    #[serde(rename = "error")]
    Error,
    #[serde(rename = "tech")]
    TechRequirement,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Alert => "alert",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::TechRequirement => "tech",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub message: String,
    /// Widget id, edge id, saved design id or [`EMPIRE_SOURCE`].
    pub source_id: String,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tech: Option<String>,
}

impl Issue {
    pub fn key(&self) -> IssueKey {
        IssueKey(format!("{}|{}|{}", self.severity.as_str(), self.message, self.source_id))
    }

    /// Whether this issue belongs on a widget indicator.
    fn widget_source(&self) -> Option<WidgetId> {
        let src = self.source_id.as_str();
        if src.is_empty() || src == EMPIRE_SOURCE || src.starts_with(EDGE_ID_PREFIX) {
            return None;
        }
        Some(WidgetId::from(src))
    }
}

/// Content-derived identity of an issue across passes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct IssueKey(String);

impl IssueKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Issues collected by checkers, in emission order.
#[derive(Debug, Clone, Default)]
pub struct IssueList {
    issues: Vec<Issue>,
}

impl IssueList {
    fn push(&mut self, severity: Severity, message: String, source: &str, tech: Option<&str>) {
        self.issues.push(Issue {
            message,
            source_id: source.to_string(),
            severity,
            tech: tech.map(str::to_string),
        });
    }

    pub fn alert(&mut self, message: String, source: impl AsRef<str>) {
        self.push(Severity::Alert, message, source.as_ref(), None);
    }

    pub fn warning(&mut self, message: String, source: impl AsRef<str>) {
        self.push(Severity::Warning, message, source.as_ref(), None);
    }

    pub fn error(&mut self, message: String, source: impl AsRef<str>) {
        self.push(Severity::Error, message, source.as_ref(), None);
    }

    pub fn tech(&mut self, message: String, tech: &str, source: impl AsRef<str>) {
        self.push(Severity::TechRequirement, message, source.as_ref(), Some(tech));
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn into_vec(self) -> Vec<Issue> {
        self.issues
    }
}

/// What a widget's badge shows after a pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetIndicator {
    pub warnings: usize,
    /// Errors plus tech requirements.
    pub errors: usize,
    pub alerts: usize,
    /// Alerts, errors, warnings, then tech requirements.
    pub issues: Vec<Issue>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    /// Errors plus tech requirements.
    pub errors: usize,
    pub warnings: usize,
    pub alerts: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreflightReport {
    pub alerts: Vec<Issue>,
    pub warnings: Vec<Issue>,
    pub errors: Vec<Issue>,
    pub tech_requirements: Vec<Issue>,
    /// One entry per widget checked this pass, including clean ones.
    pub indicators: BTreeMap<WidgetId, WidgetIndicator>,
    pub summary: Summary,
    /// Errors, tech requirements, warnings, then alerts.
    pub feed: Vec<Issue>,
    pub feed_diff: FeedDiff,
}

/// Presentation sink for widget badges.
pub trait IndicatorSink {
    fn update_widget_indicator(&mut self, widget: &WidgetId, warnings: usize, errors: usize, issues: &[Issue], alerts: usize);
}

impl<F> IndicatorSink for F
where
    F: FnMut(&WidgetId, usize, usize, &[Issue], usize),
{
    fn update_widget_indicator(&mut self, widget: &WidgetId, warnings: usize, errors: usize, issues: &[Issue], alerts: usize) {
        self(widget, warnings, errors, issues, alerts)
    }
}

/// Everything a pass reads.
#[derive(Clone, Copy)]
pub struct PreflightInput<'a> {
    pub registry: &'a Registry,
    pub graph: &'a ConnectionGraph,
    pub empire: &'a Empire,
}

/// The validation engine. Keeps the last report and the feed state.
#[derive(Debug, Default)]
pub struct Preflight {
    report: PreflightReport,
    feed: IssueFeed,
    passes: u64,
}

impl Preflight {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&self) -> &PreflightReport {
        &self.report
    }

    pub fn passes(&self) -> u64 {
        self.passes
    }

    /// Run a full pass and replace the previous report.
    pub fn run(&mut self, input: PreflightInput<'_>, sink: Option<&mut dyn IndicatorSink>) -> &PreflightReport {
        let ctx = CheckContext {
            registry: input.registry,
            tech: input.empire,
        };
        let mut collected = IssueList::default();
        let mut checked = Vec::with_capacity(input.registry.len());
        for widget in input.registry.iter() {
            checked.push(widget.id.clone());
            (schema::of(widget.kind).check)(&ctx, widget, &mut collected);
        }
        check_connections(input, &mut collected);
        check_empire(input.empire, &mut collected);

        self.report = self.aggregate(collected.into_vec(), &checked);
        self.passes += 1;
        debug!(
            "preflight pass {}: {} errors, {} warnings, {} alerts",
            self.passes, self.report.summary.errors, self.report.summary.warnings, self.report.summary.alerts
        );

        if let Some(sink) = sink {
            for id in checked.iter().filter(|id| input.registry.contains(id)) {
                if let Some(ind) = self.report.indicators.get(id) {
                    sink.update_widget_indicator(id, ind.warnings, ind.errors, &ind.issues, ind.alerts);
                }
            }
        }
        &self.report
    }

    fn aggregate(&mut self, issues: Vec<Issue>, checked: &[WidgetId]) -> PreflightReport {
        let mut report = PreflightReport::default();
        for issue in issues {
            match issue.severity {
                Severity::Alert => report.alerts.push(issue),
                Severity::Warning => report.warnings.push(issue),
                Severity::Error => report.errors.push(issue),
                Severity::TechRequirement => report.tech_requirements.push(issue),
            }
        }

        for id in checked {
            report.indicators.insert(id.clone(), WidgetIndicator::default());
        }
        let by_badge_order = [&report.alerts, &report.errors, &report.warnings, &report.tech_requirements];
        for issue in by_badge_order.into_iter().flatten() {
            let Some(id) = issue.widget_source() else { continue };
            let ind = report.indicators.entry(id).or_default();
            match issue.severity {
                Severity::Alert => ind.alerts += 1,
                Severity::Warning => ind.warnings += 1,
                Severity::Error | Severity::TechRequirement => ind.errors += 1,
            }
            ind.issues.push(issue.clone());
        }
        // Only widgets that were checked get a badge.
        report.indicators.retain(|id, _| checked.contains(id));

        report.summary = Summary {
            errors: report.errors.len() + report.tech_requirements.len(),
            warnings: report.warnings.len(),
            alerts: report.alerts.len(),
        };
        report.feed = [&report.errors, &report.tech_requirements, &report.warnings, &report.alerts]
            .into_iter()
            .flatten()
            .cloned()
            .collect();
        report.feed_diff = self.feed.apply(&report.feed);
        report
    }
}

/// Edges whose endpoints no longer resolve.
fn check_connections(input: PreflightInput<'_>, out: &mut IssueList) {
    for finding in input.graph.validate_connections(input.registry) {
        out.error(finding.message.to_string(), finding.edge.as_str());
    }
}

/// Saved designs that depend on unresearched tech.
fn check_empire(empire: &Empire, out: &mut IssueList) {
    for unmet in empire.unmet_requirements() {
        out.tech(
            format!(
                "Saved {} design \"{}\" uses unavailable technology {}",
                unmet.design_type, unmet.design.name, unmet.tech
            ),
            unmet.tech,
            &unmet.design.id,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PortLayoutConfig;
    use crate::factory::WidgetFactory;
    use crate::model::{Component, Direction, WidgetKind};
    use crate::tech::Design;

    struct Setup {
        registry: Registry,
        graph: ConnectionGraph,
        empire: Empire,
    }

    impl Setup {
        fn new() -> Self {
            Self {
                registry: Registry::new(),
                graph: ConnectionGraph::new(PortLayoutConfig::default()),
                empire: Empire::default(),
            }
        }

        fn add(&mut self, kind: WidgetKind) -> WidgetId {
            WidgetFactory::new(PortLayoutConfig::default()).create(kind, None, &mut self.registry)
        }

        fn input(&self) -> PreflightInput<'_> {
            PreflightInput {
                registry: &self.registry,
                graph: &self.graph,
                empire: &self.empire,
            }
        }
    }

    #[test]
    fn test_outfit_without_class_or_core() {
        let mut s = Setup::new();
        let outfit = s.add(WidgetKind::Outfit);
        let mut preflight = Preflight::new();
        let report = preflight.run(s.input(), None).clone();

        let messages: Vec<&str> = report.errors.iter().map(|i| i.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "Outfit \"Outfit\" must connect to a Ship Class",
                "Outfit \"Outfit\" requires at least one Ship Core"
            ]
        );
        let ind = &report.indicators[&outfit];
        assert_eq!(ind.errors, 2);
        assert_eq!(ind.issues[0].severity, Severity::Alert);
        assert_eq!(report.summary.errors, 2);
    }

    #[test]
    fn test_dangling_edge_is_the_only_connection_issue() {
        let mut s = Setup::new();
        let core = s.add(WidgetKind::ShipCore);
        let outfit = s.add(WidgetKind::Outfit);
        let find = |s: &Setup, w: &WidgetId, d| s.registry.get(w).unwrap().find_port("Core", d).unwrap().id.clone();
        let (out, inp) = (find(&s, &core, Direction::Source), find(&s, &outfit, Direction::Sink));
        let edge = s.graph.create_connection(&mut s.registry, &out, &inp).unwrap().created.unwrap();
        s.registry.remove(&outfit);

        let report = Preflight::new().run(s.input(), None).clone();
        let errors: Vec<(&str, &str)> = report
            .errors
            .iter()
            .map(|i| (i.message.as_str(), i.source_id.as_str()))
            .collect();
        assert_eq!(errors, vec![("Invalid connection: missing node", edge.as_str())]);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_indicator_called_with_zeros_for_clean_widget() {
        let mut s = Setup::new();
        let core = s.add(WidgetKind::ShipCore);
        let mut calls = Vec::new();
        let mut sink = |id: &WidgetId, w: usize, e: usize, issues: &[Issue], a: usize| {
            calls.push((id.clone(), w, e, issues.len(), a));
        };
        Preflight::new().run(s.input(), Some(&mut sink));
        assert_eq!(calls, vec![(core, 0, 0, 0, 0)]);
    }

    #[test]
    fn test_empire_issues_stay_off_widget_indicators() {
        let mut s = Setup::new();
        s.empire.add_design(
            "craft",
            Design {
                name: "Wasp".to_string(),
                components: vec![Component {
                    name: "Laser".to_string(),
                    required_tech: vec!["Lasers".to_string()],
                    ..Component::default()
                }],
                ..Design::default()
            },
        );
        let mut preflight = Preflight::new();
        let report = preflight.run(s.input(), None);
        assert_eq!(report.tech_requirements.len(), 1);
        assert_eq!(
            report.tech_requirements[0].message,
            "Saved craft design \"Wasp\" uses unavailable technology Lasers"
        );
        assert_eq!(report.tech_requirements[0].source_id, "craft-1");
        assert_eq!(report.summary.errors, 1);
        assert!(report.indicators.is_empty());
    }

    #[test]
    fn test_unchanged_issues_survive_second_pass() {
        let mut s = Setup::new();
        s.add(WidgetKind::Outfit);
        let mut preflight = Preflight::new();
        let first = preflight.run(s.input(), None).feed_diff.clone();
        assert_eq!(first.added.len(), 3);
        let second = preflight.run(s.input(), None);
        assert!(second.feed_diff.added.is_empty());
        assert!(second.feed_diff.removed.is_empty());
    }

    #[test]
    fn test_feed_orders_by_severity() {
        let mut s = Setup::new();
        s.add(WidgetKind::Outfit);
        let mut preflight = Preflight::new();
        let report = preflight.run(s.input(), None);
        let order: Vec<Severity> = report.feed.iter().map(|i| i.severity).collect();
        assert_eq!(order, vec![Severity::Error, Severity::Error, Severity::Alert]);
    }

    #[test]
    fn test_issue_key_combines_severity_message_source() {
        let issue = Issue {
            message: "m".to_string(),
            source_id: "widget-1".to_string(),
            severity: Severity::Warning,
            tech: None,
        };
        assert_eq!(issue.key().as_str(), "warning|m|widget-1");
    }
}
