//! Per-element rules, one arm per element kind

use serde::{Deserialize, Serialize};

use crate::config::Thresholds;
use crate::diagnostics::{Diagnostic, DiagnosticCode, Severity};
use crate::document::{Attributes, Document, Element, ElementKind};
use crate::references::is_url_reference;

use super::{DocumentRule, RuleContext};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementReport {
    /// Position path, e.g. `elements[1].children[0]`
    pub path: String,
    pub kind: ElementKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub valid: bool,
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
    pub suggestions: Vec<String>,
}

/// Visit every element with its position path, depth-first
pub(crate) fn visit_positions<'a>(document: &'a Document, visit: &mut impl FnMut(&'a Element, &str)) {
    fn walk<'a>(list: &'a [Element], prefix: &str, visit: &mut impl FnMut(&'a Element, &str)) {
        for (index, element) in list.iter().enumerate() {
            let path = format!("{prefix}[{index}]");
            visit(element, &path);
            walk(element.children(), &format!("{path}.children"), visit);
        }
    }

    for (name, list) in document.roots() {
        walk(list, name, visit);
    }
}

pub struct ElementRule;

impl DocumentRule for ElementRule {
    fn name(&self) -> &'static str { "elements" }

    fn check(&self, context: &RuleContext<'_>) -> Vec<Diagnostic> {
        let mut found = vec![];
        visit_positions(context.document, &mut |element, path| {
            found.extend(
                check_element(element, context.thresholds)
                    .into_iter()
                    .map(|d| d.at(path)),
            );
        });
        found
    }
}

/// Group the element diagnostics back onto their elements
pub(crate) fn element_reports(document: &Document, diagnostics: &[Diagnostic]) -> Vec<ElementReport> {
    let mut reports = vec![];
    visit_positions(document, &mut |element, path| {
        let mut report = ElementReport {
            path: path.to_string(),
            kind: element.kind(),
            id: element.id().map(str::to_string),
            valid: true,
            errors: vec![],
            warnings: vec![],
            suggestions: vec![],
        };
        for diagnostic in diagnostics.iter().filter(|d| d.element.as_deref() == Some(path)) {
            match diagnostic.severity {
                Severity::Error => report.errors.push(diagnostic.clone()),
                Severity::Warning => report.warnings.push(diagnostic.clone()),
                Severity::Info => report.suggestions.push(diagnostic.message.clone()),
            }
            report.suggestions.extend(diagnostic.remediation.iter().cloned());
        }
        report.valid = report.errors.is_empty();
        reports.push(report);
    });
    reports
}

fn check_element(element: &Element, thresholds: &Thresholds) -> Vec<Diagnostic> {
    let mut found = vec![];

    for (field, value) in element.coordinates() {
        if !value.is_finite() {
            found.push(
                Diagnostic::error(
                    DiagnosticCode::NonFiniteValue,
                    format!("{} `{field}` is not a finite number", element.kind()),
                )
                .with_value(value),
            );
        }
    }

    match element {
        Element::Circle(circle) => {
            if circle.r < 0.0 {
                found.push(
                    Diagnostic::error(DiagnosticCode::InvalidRadius, "Circle radius is negative")
                        .with_value(circle.r),
                );
            } else if circle.r == 0.0 {
                found.push(
                    Diagnostic::warning(DiagnosticCode::ZeroRadius, "Circle with zero radius is not rendered")
                        .remedy("Remove circles with a zero radius"),
                );
            }
        }
        Element::Rect(rect) => {
            for (name, value) in [("width", rect.width), ("height", rect.height)] {
                if value < 0.0 {
                    found.push(
                        Diagnostic::error(
                            DiagnosticCode::InvalidDimensions,
                            format!("Rect {name} is negative"),
                        )
                        .with_value(value),
                    );
                }
            }
            if rect.width == 0.0 || rect.height == 0.0 {
                found.push(Diagnostic::warning(
                    DiagnosticCode::ZeroSize,
                    "Rect with zero width or height is not rendered",
                ));
            }
            for (name, value) in [("rx", rect.rx), ("ry", rect.ry)] {
                if value.is_some_and(|v| v < 0.0) {
                    found.push(Diagnostic::error(
                        DiagnosticCode::InvalidCornerRadius,
                        format!("Rect corner radius `{name}` is negative"),
                    ));
                }
            }
        }
        Element::Line(line) => {
            if line.x1 == line.x2 && line.y1 == line.y2 {
                found.push(Diagnostic::warning(
                    DiagnosticCode::ZeroLengthLine,
                    "Line starts and ends at the same point",
                ));
            }
            let stroked = line
                .attrs
                .style
                .as_ref()
                .is_some_and(|s| s.stroke.is_some());
            if !stroked {
                found.push(Diagnostic::info(
                    DiagnosticCode::InvisibleLine,
                    "Give lines a stroke, they are invisible without one",
                ));
            }
        }
        Element::Path(path) => {
            let d = path.d.trim();
            if d.is_empty() {
                found.push(Diagnostic::error(DiagnosticCode::EmptyPathData, "Path has no data"));
            } else if !d.starts_with(['M', 'm']) {
                found.push(
                    Diagnostic::error(
                        DiagnosticCode::InvalidPathData,
                        "Path data must start with a moveto command",
                    )
                    .with_value(d.chars().take(16).collect::<String>()),
                );
            } else if d.len() > thresholds.long_path_data {
                found.push(Diagnostic::info(
                    DiagnosticCode::LongPathData,
                    "Simplify long path data to reduce file size",
                ));
            }
        }
        Element::Text(text) => {
            if text.content.trim().is_empty() {
                found.push(Diagnostic::warning(DiagnosticCode::EmptyText, "Text element has no content"));
            }
            if let Some(size) = text.font_size {
                if !size.is_finite() || size <= 0.0 {
                    found.push(
                        Diagnostic::error(DiagnosticCode::InvalidFontSize, "Font size must be positive")
                            .with_value(size),
                    );
                }
            }
        }
        Element::Group(group) => {
            if group.children.is_empty() {
                found.push(
                    Diagnostic::warning(DiagnosticCode::EmptyGroup, "Group has no children")
                        .remedy("Remove empty groups"),
                );
            }
        }
    }

    check_attributes(element.attrs(), &mut found);
    found
}

fn check_attributes(attrs: &Attributes, found: &mut Vec<Diagnostic>) {
    if let Some(id) = attrs.id.as_deref() {
        if id.is_empty() || id.chars().any(char::is_whitespace) {
            found.push(
                Diagnostic::error(DiagnosticCode::InvalidId, "Ids must be non-empty and contain no whitespace")
                    .with_value(id),
            );
        }
    }

    for (name, value) in attrs.reference_values() {
        if !is_url_reference(value) {
            found.push(
                Diagnostic::warning(
                    DiagnosticCode::MalformedReference,
                    format!("`{name}` should have the form url(#id)"),
                )
                .with_value(value),
            );
        }
    }

    let Some(style) = &attrs.style else {
        return;
    };
    for (name, value) in style.opacities() {
        if !(0.0..=1.0).contains(&value) {
            found.push(
                Diagnostic::error(
                    DiagnosticCode::InvalidOpacity,
                    format!("`{name}` must be between 0 and 1"),
                )
                .with_value(value),
            );
        }
    }
    if let Some(width) = style.stroke_width {
        if !width.is_finite() || width < 0.0 {
            found.push(
                Diagnostic::error(DiagnosticCode::InvalidStrokeWidth, "Stroke width must not be negative")
                    .with_value(width),
            );
        }
    }
}
