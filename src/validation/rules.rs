//! Document-level rules: structure, viewBox sanity and cross references

use crate::diagnostics::{Diagnostic, DiagnosticCode};

use super::{DocumentRule, RuleContext};

pub struct StructureRule;

impl DocumentRule for StructureRule {
    fn name(&self) -> &'static str { "structure" }

    fn check(&self, context: &RuleContext<'_>) -> Vec<Diagnostic> {
        let document = context.document;
        let options = context.options;
        let mut found = vec![];

        if document.view_box.is_none() {
            found.push(
                Diagnostic::error(DiagnosticCode::MissingViewbox, "Document has no viewBox")
                    .remedy("Add a viewBox so the document scales predictably"),
            );
        }

        if document.elements.is_empty() {
            found.push(Diagnostic::warning(
                DiagnosticCode::EmptyDocument,
                "Document contains no elements",
            ));
        }

        if context.element_count > options.max_elements {
            found.push(
                Diagnostic::error(
                    DiagnosticCode::TooManyElements,
                    format!(
                        "Document has {} elements, the limit is {}",
                        context.element_count, options.max_elements
                    ),
                )
                .with_value(context.element_count)
                .remedy("Merge or simplify elements to stay under the element limit"),
            );
        }

        if context.max_depth > options.max_depth {
            found.push(
                Diagnostic::error(
                    DiagnosticCode::MaxDepthExceeded,
                    format!(
                        "Groups are nested {} levels deep, the limit is {}",
                        context.max_depth, options.max_depth
                    ),
                )
                .with_value(context.max_depth)
                .remedy("Flatten nested groups"),
            );
        }

        if !document.has_title() && !document.has_description() {
            found.push(
                Diagnostic::warning(
                    DiagnosticCode::MissingTitleAndDescription,
                    "Document has neither a title nor a description",
                )
                .remedy("Add a title or description for assistive technology"),
            );
        }

        found
    }
}

pub struct ViewBoxRule;

impl DocumentRule for ViewBoxRule {
    fn name(&self) -> &'static str { "view_box" }

    fn check(&self, context: &RuleContext<'_>) -> Vec<Diagnostic> {
        let Some(view_box) = context.document.view_box else {
            return vec![];
        };
        let thresholds = context.thresholds;

        if !view_box.is_finite() {
            return vec![Diagnostic::error(
                DiagnosticCode::InvalidViewboxDimensions,
                "ViewBox contains a non-finite number",
            )];
        }

        let mut found = vec![];
        for (name, value) in [("width", view_box.width), ("height", view_box.height)] {
            if value <= 0.0 {
                found.push(
                    Diagnostic::error(
                        DiagnosticCode::InvalidViewboxDimensions,
                        format!("ViewBox {name} must be positive"),
                    )
                    .with_value(value),
                );
            }
        }
        if !found.is_empty() {
            return found;
        }

        if view_box.width > thresholds.very_large_view_box
            || view_box.height > thresholds.very_large_view_box
        {
            found.push(
                Diagnostic::warning(
                    DiagnosticCode::VeryLargeViewbox,
                    format!(
                        "ViewBox {}x{} is unusually large",
                        view_box.width, view_box.height
                    ),
                )
                .remedy("Scale the coordinate system down"),
            );
        }

        let ratio = view_box.aspect_ratio();
        if ratio < thresholds.min_aspect_ratio || ratio > thresholds.max_aspect_ratio {
            found.push(
                Diagnostic::warning(
                    DiagnosticCode::ExtremeAspectRatio,
                    format!("ViewBox aspect ratio {ratio:.3} is extreme"),
                )
                .with_value(format!("{ratio:.3}")),
            );
        }

        found
    }
}

pub struct ReferenceRule;

impl DocumentRule for ReferenceRule {
    fn name(&self) -> &'static str { "references" }

    fn check(&self, context: &RuleContext<'_>) -> Vec<Diagnostic> {
        let graph = context.graph;
        let mut found = vec![];

        for id in graph.dangling() {
            found.push(
                Diagnostic::error(
                    DiagnosticCode::MissingReference,
                    format!("Reference to undefined id '{id}'"),
                )
                .with_value(id)
                .remedy(format!("Define an element with id '{id}' or remove the reference")),
            );
        }

        for id in graph.unreferenced() {
            found.push(
                Diagnostic::warning(
                    DiagnosticCode::UnreferencedId,
                    format!("Id '{id}' is never referenced"),
                )
                .with_value(id),
            );
        }

        for id in &graph.duplicate_ids {
            found.push(
                Diagnostic::error(
                    DiagnosticCode::DuplicateId,
                    format!("Id '{id}' is defined more than once"),
                )
                .with_value(id)
                .remedy("Give every element a unique id"),
            );
        }

        found
    }
}
