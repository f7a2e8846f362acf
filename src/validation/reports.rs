//! Compliance, accessibility and performance reports

use serde::{Deserialize, Serialize};

use crate::diagnostics::Severity;
use crate::document::Element;

use super::elements::visit_positions;
use super::RuleContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComplianceProfile {
    Svg11,
    Svg20,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceViolation {
    pub rule: String,
    pub severity: Severity,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceReport {
    pub profile: ComplianceProfile,
    pub compliant: bool,
    pub violations: Vec<ComplianceViolation>,
    pub recommendations: Vec<String>,
}

impl ComplianceReport {
    fn flag(
        &mut self,
        rule: &str,
        severity: Severity,
        message: impl Into<String>,
        element: Option<&str>,
        recommendation: &str,
    ) {
        self.violations.push(ComplianceViolation {
            rule: rule.to_string(),
            severity,
            message: message.into(),
            element: element.map(str::to_string),
        });
        if !self.recommendations.iter().any(|r| r == recommendation) {
            self.recommendations.push(recommendation.to_string());
        }
    }
}

pub(crate) fn compliance_report(profile: ComplianceProfile, context: &RuleContext<'_>) -> ComplianceReport {
    let document = context.document;
    let mut report = ComplianceReport {
        profile,
        compliant: true,
        violations: vec![],
        recommendations: vec![],
    };

    if document.view_box.is_none() {
        let severity = match profile {
            ComplianceProfile::Svg20 => Severity::Warning,
            ComplianceProfile::Svg11 => Severity::Info,
        };
        report.flag(
            "view_box",
            severity,
            "Document has no viewBox",
            None,
            "Declare a viewBox so the document is resolution independent",
        );
    }

    visit_positions(document, &mut |element, path| {
        if let Element::Group(group) = element {
            if group.children.is_empty() {
                report.flag(
                    "empty_group",
                    Severity::Warning,
                    "Group element has no children",
                    Some(path),
                    "Remove empty group elements",
                );
            }
        }
        if element.coordinates().iter().any(|(_, v)| !v.is_finite()) {
            report.flag(
                "finite_numbers",
                Severity::Error,
                "Element has a non-finite coordinate",
                Some(path),
                "Replace NaN and infinite coordinates with real numbers",
            );
        }
    });

    for id in &context.graph.duplicate_ids {
        report.flag(
            "unique_ids",
            Severity::Error,
            format!("Id '{id}' is not unique"),
            None,
            "Make every id unique within the document",
        );
    }

    if document.width.is_none() && document.height.is_none() {
        report
            .recommendations
            .push("Set an explicit width and height for consistent intrinsic sizing".to_string());
    }

    report.compliant = !report
        .violations
        .iter()
        .any(|v| v.severity == Severity::Error);
    report
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessibilityReport {
    pub score: u32,
    pub has_title: bool,
    pub has_description: bool,
    pub has_aria_labels: bool,
    /// Text elements whose effective font size is below the minimum
    pub small_text_count: usize,
    pub recommendations: Vec<String>,
}

pub(crate) fn accessibility_report(context: &RuleContext<'_>) -> AccessibilityReport {
    let document = context.document;
    let thresholds = context.thresholds;

    let mut has_aria_labels = false;
    let mut small_text_count = 0;
    document.walk(&mut |element, _| {
        has_aria_labels |= element.attrs().has_aria_label();
        if let Element::Text(text) = element {
            let size = text.font_size.unwrap_or(thresholds.default_font_size);
            if size < thresholds.min_font_size {
                small_text_count += 1;
            }
        }
    });

    let mut deduction: u64 = 0;
    let mut recommendations = vec![];
    if !document.has_title() {
        deduction += u64::from(thresholds.missing_title_penalty);
        recommendations.push("Add a title to describe the graphic".to_string());
    }
    if !document.has_description() {
        deduction += u64::from(thresholds.missing_description_penalty);
        recommendations.push("Add a description for screen readers".to_string());
    }
    if !has_aria_labels {
        deduction += u64::from(thresholds.missing_aria_penalty);
        recommendations.push("Label meaningful elements with aria labels".to_string());
    }
    if small_text_count > 0 {
        deduction += u64::from(thresholds.small_text_penalty) * small_text_count as u64;
        recommendations.push(format!(
            "Increase the font size of {small_text_count} text element(s) to at least {}",
            thresholds.min_font_size
        ));
    }

    AccessibilityReport {
        score: 100u64.saturating_sub(deduction) as u32,
        has_title: document.has_title(),
        has_description: document.has_description(),
        has_aria_labels,
        small_text_count,
        recommendations,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceReport {
    pub score: u32,
    pub element_count: usize,
    pub max_depth: usize,
    /// Weighted element sum: shapes 1, paths 3, text 2, groups 0.5
    pub render_complexity: f64,
    /// Estimated serialized size in bytes
    pub estimated_size: usize,
    pub memory_estimate_kb: f64,
    pub suggestions: Vec<String>,
}

pub(crate) fn performance_report(context: &RuleContext<'_>) -> PerformanceReport {
    let document = context.document;
    let thresholds = context.thresholds;

    let mut render_complexity = 0.0;
    document.walk(&mut |element, _| render_complexity += element.kind().render_weight());
    let estimated_size = document.estimated_size();

    let mut deduction: u32 = 0;
    let mut suggestions = vec![];
    if context.element_count > thresholds.performance_element_limit {
        deduction += thresholds.performance_element_penalty;
        suggestions.push(format!(
            "Reduce the element count below {} by merging shapes",
            thresholds.performance_element_limit
        ));
    }
    if context.max_depth > thresholds.performance_depth_limit {
        deduction += thresholds.performance_depth_penalty;
        suggestions.push(format!(
            "Flatten group nesting to at most {} levels",
            thresholds.performance_depth_limit
        ));
    }
    if estimated_size > thresholds.performance_size_limit {
        deduction += thresholds.performance_size_penalty;
        suggestions.push("Optimize the document to reduce its serialized size".to_string());
    }

    PerformanceReport {
        score: 100u32.saturating_sub(deduction),
        element_count: context.element_count,
        max_depth: context.max_depth,
        render_complexity,
        estimated_size,
        memory_estimate_kb: estimated_size as f64 / 1024.0,
        suggestions,
    }
}
