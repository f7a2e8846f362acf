//! Validation System - rules produce diagnostics, the validator scores them
//!
//! `DocumentValidator` runs the rules and builds the reports.
//! `Validator` applies the scoring policy on top of that.

mod elements;
mod reports;
mod rules;

use std::collections::BTreeMap;

use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};

use crate::config::Thresholds;
use crate::diagnostics::{Diagnostic, DiagnosticCode, Severity};
use crate::document::{Document, ElementKind};
use crate::references::ReferenceGraph;

pub use elements::ElementReport;
pub use reports::{
    AccessibilityReport, ComplianceProfile, ComplianceReport, ComplianceViolation,
    PerformanceReport,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationPreset {
    Strict,
    #[default]
    Standard,
    Minimal,
    Performance,
    Accessibility,
}

impl ValidationPreset {
    pub fn options(self) -> ValidationOptions {
        let (accessibility, performance, compliance, max_elements, max_depth) = match self {
            Self::Strict => (true, true, Some(ComplianceProfile::Svg20), 5000, 15),
            Self::Standard => (true, true, Some(ComplianceProfile::Svg20), 10_000, 20),
            Self::Minimal => (false, false, None, 50_000, 50),
            Self::Performance => (false, true, None, 1000, 10),
            Self::Accessibility => (true, false, Some(ComplianceProfile::Svg20), 50_000, 50),
        };
        ValidationOptions {
            accessibility,
            performance,
            compliance,
            max_elements,
            max_depth,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ValidationOptions {
    pub accessibility: bool,
    pub performance: bool,
    /// Profile to check compliance against; `None` skips the report
    pub compliance: Option<ComplianceProfile>,
    pub max_elements: usize,
    pub max_depth: usize,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        ValidationPreset::Standard.options()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentStats {
    pub element_count: usize,
    pub max_depth: usize,
    pub kinds: BTreeMap<ElementKind, usize>,
    pub defined_ids: usize,
    pub referenced_ids: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
    pub suggestions: Vec<String>,
    /// One entry per element, depth-first
    pub per_element: Vec<ElementReport>,
    pub stats: DocumentStats,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compliance: Option<ComplianceReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accessibility: Option<AccessibilityReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performance: Option<PerformanceReport>,
}

impl ValidationReport {
    pub fn has_code(&self, code: DiagnosticCode) -> bool {
        self.errors.iter().chain(&self.warnings).any(|d| d.code == code)
    }

    /// Report for a document no rule could walk
    fn rejected(document: &Document, error: Diagnostic) -> Self {
        Self {
            valid: false,
            suggestions: error.remediation.clone(),
            errors: vec![error],
            warnings: vec![],
            per_element: vec![],
            stats: DocumentStats {
                element_count: document.element_count(),
                max_depth: document.max_depth(),
                ..Default::default()
            },
            compliance: None,
            accessibility: None,
            performance: None,
        }
    }
}

/// Error for a tree nested deeper than `max_traversal_depth`.
///
/// Rules and passes walk the tree recursively, so such a document is
/// rejected before any of them runs.
pub fn traversal_limit_error(document: &Document, thresholds: &Thresholds) -> Option<Diagnostic> {
    let depth = document.max_depth();
    let limit = thresholds.max_traversal_depth;
    (depth > limit).then(|| {
        Diagnostic::error(
            DiagnosticCode::MaxDepthExceeded,
            format!("Groups are nested {depth} levels deep, more than the {limit} levels the engine walks"),
        )
        .with_value(depth)
        .remedy("Flatten nested groups")
    })
}

/// Everything a rule may look at. Computed once per run.
pub struct RuleContext<'a> {
    pub document: &'a Document,
    pub options: &'a ValidationOptions,
    pub thresholds: &'a Thresholds,
    pub graph: &'a ReferenceGraph,
    pub element_count: usize,
    pub max_depth: usize,
}

/// Validation rule trait - produces diagnostics
pub trait DocumentRule: Send + Sync {
    fn name(&self) -> &'static str;
    fn check(&self, context: &RuleContext<'_>) -> Vec<Diagnostic>;
}

/// Runs the document rules in order and assembles the report
pub struct DocumentValidator {
    thresholds: Thresholds,
    rules: Vec<Box<dyn DocumentRule>>,
}

impl DocumentValidator {
    pub fn new(thresholds: Thresholds) -> Self {
        Self {
            thresholds,
            rules: vec![
                Box::new(rules::StructureRule),
                Box::new(rules::ViewBoxRule),
                Box::new(elements::ElementRule),
                Box::new(rules::ReferenceRule),
            ],
        }
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    pub fn validate(&self, document: &Document, options: &ValidationOptions) -> ValidationReport {
        if let Some(too_deep) = traversal_limit_error(document, &self.thresholds) {
            warn!(limit = self.thresholds.max_traversal_depth; "Document nested too deep, rules skipped");
            return ValidationReport::rejected(document, too_deep);
        }

        let graph = ReferenceGraph::build(document);
        let context = RuleContext {
            document,
            options,
            thresholds: &self.thresholds,
            graph: &graph,
            element_count: document.element_count(),
            max_depth: document.max_depth(),
        };
        debug!(
            elements = context.element_count,
            depth = context.max_depth;
            "Validating document"
        );

        let mut diagnostics = vec![];
        for rule in &self.rules {
            let found = rule.check(&context);
            trace!(rule = rule.name(), found = found.len(); "Rule finished");
            diagnostics.extend(found);
        }

        let per_element = elements::element_reports(document, &diagnostics);

        let mut errors = vec![];
        let mut warnings = vec![];
        let mut suggestions = vec![];
        for diagnostic in diagnostics {
            for remedy in &diagnostic.remediation {
                push_unique(&mut suggestions, remedy.clone());
            }
            match diagnostic.severity {
                Severity::Error => errors.push(diagnostic),
                Severity::Warning => warnings.push(diagnostic),
                Severity::Info => push_unique(&mut suggestions, diagnostic.message),
            }
        }

        let compliance = options
            .compliance
            .map(|profile| reports::compliance_report(profile, &context));
        let accessibility = options
            .accessibility
            .then(|| reports::accessibility_report(&context));
        let performance = options
            .performance
            .then(|| reports::performance_report(&context));

        for report_suggestion in accessibility
            .iter()
            .flat_map(|r| &r.recommendations)
            .chain(performance.iter().flat_map(|r| &r.suggestions))
        {
            push_unique(&mut suggestions, report_suggestion.clone());
        }

        let stats = DocumentStats {
            element_count: context.element_count,
            max_depth: context.max_depth,
            kinds: count_kinds(document),
            defined_ids: graph.defined_ids.len(),
            referenced_ids: graph.referenced_ids.len(),
        };

        ValidationReport {
            valid: errors.is_empty(),
            errors,
            warnings,
            suggestions,
            per_element,
            stats,
            compliance,
            accessibility,
            performance,
        }
    }
}

impl Default for DocumentValidator {
    fn default() -> Self {
        Self::new(Thresholds::default())
    }
}

fn count_kinds(document: &Document) -> BTreeMap<ElementKind, usize> {
    let mut kinds = BTreeMap::new();
    document.walk(&mut |element, _| *kinds.entry(element.kind()).or_insert(0) += 1);
    kinds
}

fn push_unique(list: &mut Vec<String>, item: String) {
    if !list.contains(&item) {
        list.push(item);
    }
}

/// Result of the scoring validator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredValidation {
    pub valid: bool,
    pub score: f64,
    pub total_errors: usize,
    pub total_warnings: usize,
    pub report: ValidationReport,
}

/// Validator orchestrates the document validator and applies the scoring policy
#[derive(Default)]
pub struct Validator {
    documents: DocumentValidator,
}

impl Validator {
    pub fn new(thresholds: Thresholds) -> Self {
        Self {
            documents: DocumentValidator::new(thresholds),
        }
    }

    pub fn validate(&self, document: &Document, options: &ValidationOptions) -> ScoredValidation {
        let report = self.documents.validate(document, options);
        let score = overall_score(&report);
        let total_errors = report.errors.len();
        let total_warnings = report.warnings.len();
        debug!(score, total_errors, total_warnings; "Scored validation");

        ScoredValidation {
            valid: total_errors == 0,
            score,
            total_errors,
            total_warnings,
            report,
        }
    }
}

/// Overall score in [0, 100].
///
/// Element diagnostics cost 10 per error and 2 per warning, document-level
/// diagnostics 15 and 3. Then 20% of the accessibility shortfall and 10% of
/// the performance shortfall are subtracted.
pub fn overall_score(report: &ValidationReport) -> f64 {
    let weigh = |list: &[Diagnostic], element: f64, document: f64| -> f64 {
        list.iter()
            .map(|d| if d.is_element_level() { element } else { document })
            .sum()
    };

    let mut score = 100.0;
    score -= weigh(&report.errors, 10.0, 15.0);
    score -= weigh(&report.warnings, 2.0, 3.0);
    if let Some(accessibility) = &report.accessibility {
        score -= (100.0 - f64::from(accessibility.score)) * 0.2;
    }
    if let Some(performance) = &report.performance {
        score -= (100.0 - f64::from(performance.score)) * 0.1;
    }
    score.clamp(0.0, 100.0)
}
