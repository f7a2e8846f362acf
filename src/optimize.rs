//! Optimization passes - shrink a document without changing what it renders
//!
//! Passes run in a fixed order on a copy of the input:
//! empty element removal, redundant attribute removal, coordinate rounding.

use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::document::{Document, Element, Style};
use crate::error::{ConfigurationError, MAX_PRECISION};
use crate::references::ReferenceGraph;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizationPreset {
    Aggressive,
    #[default]
    Balanced,
    Conservative,
}

impl OptimizationPreset {
    pub fn options(self) -> OptimizationOptions {
        let (remove_redundant_attributes, precision) = match self {
            Self::Aggressive => (true, 1),
            Self::Balanced => (true, 2),
            Self::Conservative => (false, 3),
        };
        OptimizationOptions {
            remove_empty_elements: true,
            remove_redundant_attributes,
            round_coordinates: true,
            precision,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OptimizationOptions {
    pub remove_empty_elements: bool,
    pub remove_redundant_attributes: bool,
    pub round_coordinates: bool,
    /// Decimal places kept by coordinate rounding
    pub precision: u8,
}

impl Default for OptimizationOptions {
    fn default() -> Self {
        OptimizationPreset::Balanced.options()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    Low,
    Medium,
    High,
}

impl Impact {
    fn from_count(count: usize) -> Self {
        match count {
            0..=9 => Self::Low,
            10..=49 => Self::Medium,
            _ => Self::High,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedOptimization {
    pub name: String,
    pub description: String,
    pub impact: Impact,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationResult {
    pub document: Document,
    pub original_elements: usize,
    pub optimized_elements: usize,
    pub removed_elements: usize,
    pub removed_attributes: usize,
    pub rounded_values: usize,
    pub applied: Vec<AppliedOptimization>,
    pub warnings: Vec<String>,
    pub original_size: usize,
    pub optimized_size: usize,
    /// Percentage of serialized bytes saved
    pub size_reduction: f64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Optimizer;

impl Optimizer {
    pub fn new() -> Self {
        Self
    }

    pub fn optimize(
        &self,
        document: &Document,
        options: &OptimizationOptions,
    ) -> Result<OptimizationResult, ConfigurationError> {
        if options.precision > MAX_PRECISION {
            return Err(ConfigurationError::InvalidPrecision(options.precision));
        }

        let original_elements = document.element_count();
        debug!(elements = original_elements, options:?; "Optimizing document");

        let mut optimized = document.clone();
        let mut applied = vec![];
        let mut warnings = vec![];

        let mut removed_elements = 0;
        if options.remove_empty_elements {
            let graph = ReferenceGraph::build(&optimized);
            for list in optimized.roots_mut() {
                remove_empty(list, &graph, &mut removed_elements, &mut warnings);
            }
            trace!(removed = removed_elements; "Removed empty elements");
            if removed_elements > 0 {
                applied.push(AppliedOptimization {
                    name: "removeEmptyElements".to_string(),
                    description: format!("Removed {removed_elements} empty element(s)"),
                    impact: Impact::from_count(removed_elements),
                });
            }
        }

        let mut removed_attributes = 0;
        if options.remove_redundant_attributes {
            optimized.walk_mut(&mut |element| {
                let attrs = element.attrs_mut();
                if let Some(style) = attrs.style.as_mut() {
                    removed_attributes += strip_defaults(style);
                    if style.is_empty() {
                        attrs.style = None;
                    }
                }
            });
            trace!(removed = removed_attributes; "Removed redundant attributes");
            if removed_attributes > 0 {
                applied.push(AppliedOptimization {
                    name: "removeRedundantAttributes".to_string(),
                    description: format!("Removed {removed_attributes} redundant attribute(s)"),
                    impact: Impact::from_count(removed_attributes),
                });
            }
        }

        let mut rounded_values = 0;
        if options.round_coordinates {
            if options.precision == 0 {
                warnings.push("Rounding to whole numbers may visibly distort small shapes".to_string());
            }
            let factor = 10f64.powi(i32::from(options.precision));
            if let Some(view_box) = optimized.view_box.as_mut() {
                rounded_values += round_all(view_box.coordinates_mut(), factor);
            }
            optimized.walk_mut(&mut |element| {
                rounded_values += round_all(element.coordinates_mut(), factor);
            });
            trace!(rounded = rounded_values; "Rounded coordinates");
            if rounded_values > 0 {
                applied.push(AppliedOptimization {
                    name: "roundCoordinates".to_string(),
                    description: format!(
                        "Rounded {rounded_values} coordinate(s) to {} decimal place(s)",
                        options.precision
                    ),
                    impact: Impact::from_count(rounded_values),
                });
            }
        }

        let original_size = document.estimated_size();
        let optimized_size = optimized.estimated_size();
        let size_reduction = if original_size == 0 {
            0.0
        } else {
            let percent = (original_size as f64 - optimized_size as f64) / original_size as f64 * 100.0;
            (percent * 100.0).round() / 100.0
        };

        debug!(
            applied = applied.len(),
            size_reduction;
            "Optimization finished"
        );

        Ok(OptimizationResult {
            optimized_elements: optimized.element_count(),
            document: optimized,
            original_elements,
            removed_elements,
            removed_attributes,
            rounded_values,
            applied,
            warnings,
            original_size,
            optimized_size,
            size_reduction,
        })
    }
}

/// Drop groups that are empty once their own children are cleaned.
/// Groups whose id is referenced stay.
fn remove_empty(
    list: &mut Vec<Element>,
    graph: &ReferenceGraph,
    removed: &mut usize,
    warnings: &mut Vec<String>,
) {
    list.retain_mut(|element| {
        let Element::Group(group) = element else {
            return true;
        };
        remove_empty(&mut group.children, graph, removed, warnings);
        if !group.children.is_empty() {
            return true;
        }
        if let Some(id) = group.attrs.id.as_deref().filter(|id| graph.is_referenced(id)) {
            warnings.push(format!("Kept empty group '{id}' because it is referenced"));
            return true;
        }
        *removed += 1;
        false
    });
}

/// Clear style properties that equal their initial values
fn strip_defaults(style: &mut Style) -> usize {
    let mut removed = 0;
    if style.fill.as_deref().is_some_and(|f| f.eq_ignore_ascii_case("black")) {
        style.fill = None;
        removed += 1;
    }
    if style.stroke_width == Some(1.0) {
        style.stroke_width = None;
        removed += 1;
    }
    if style.opacity == Some(1.0) {
        style.opacity = None;
        removed += 1;
    }
    removed
}

/// Round in place, counting only values that actually changed
fn round_all<'a>(values: impl IntoIterator<Item = &'a mut f64>, factor: f64) -> usize {
    let mut changed = 0;
    for value in values {
        let scaled = *value * factor;
        // too large to carry any digits at this precision
        if !scaled.is_finite() {
            continue;
        }
        let rounded = scaled.round() / factor;
        if rounded != *value {
            *value = rounded;
            changed += 1;
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Attributes, ViewBox};

    fn styled(style: Style) -> Element {
        Element::rect(0.0, 0.0, 10.0, 10.0).with_attrs(Attributes {
            style: Some(style),
            ..Default::default()
        })
    }

    #[test]
    fn test_presets() {
        assert_eq!(OptimizationPreset::Aggressive.options().precision, 1);
        assert_eq!(OptimizationPreset::Balanced.options(), OptimizationOptions::default());
        let conservative = OptimizationPreset::Conservative.options();
        assert!(!conservative.remove_redundant_attributes);
        assert!(conservative.remove_empty_elements && conservative.round_coordinates);
        assert_eq!(conservative.precision, 3);
    }

    #[test]
    fn test_nested_empty_groups_are_removed_bottom_up() {
        let doc = Document::new(
            ViewBox::new(0.0, 0.0, 10.0, 10.0),
            vec![
                Element::group(vec![Element::group(vec![]), Element::group(vec![Element::group(vec![])])]),
                Element::group(vec![Element::circle(1.0, 1.0, 1.0), Element::group(vec![])]),
            ],
        );
        let result = Optimizer::new().optimize(&doc, &OptimizationOptions::default()).unwrap();
        assert_eq!(result.removed_elements, 5);
        assert_eq!(result.document.elements.len(), 1);
        assert_eq!(result.document.elements[0].children().len(), 1);
        assert_eq!(result.optimized_elements, 2);
        assert_eq!(result.original_elements, 7);
    }

    #[test]
    fn test_referenced_empty_group_is_kept() {
        let doc = Document::new(
            ViewBox::new(0.0, 0.0, 10.0, 10.0),
            vec![
                Element::group(vec![]).with_attrs(Attributes::with_id("clip")),
                Element::circle(1.0, 1.0, 1.0).with_attrs(Attributes {
                    clip_path: Some("url(#clip)".into()),
                    ..Default::default()
                }),
            ],
        );
        let result = Optimizer::new().optimize(&doc, &OptimizationOptions::default()).unwrap();
        assert_eq!(result.removed_elements, 0);
        assert_eq!(result.document.elements.len(), 2);
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn test_quoted_reference_keeps_group() {
        let doc = Document::new(
            ViewBox::new(0.0, 0.0, 10.0, 10.0),
            vec![
                Element::group(vec![]).with_attrs(Attributes::with_id("fade")),
                Element::circle(1.0, 1.0, 1.0).with_attrs(Attributes {
                    mask: Some("url('#fade')".into()),
                    ..Default::default()
                }),
            ],
        );
        let result = Optimizer::new().optimize(&doc, &OptimizationOptions::default()).unwrap();
        assert_eq!(result.removed_elements, 0);
        assert!(ReferenceGraph::build(&result.document).is_consistent());
    }

    #[test]
    fn test_redundant_style_properties() {
        let doc = Document::new(
            ViewBox::new(0.0, 0.0, 10.0, 10.0),
            vec![
                styled(Style {
                    fill: Some("black".into()),
                    stroke_width: Some(1.0),
                    opacity: Some(1.0),
                    ..Default::default()
                }),
                Element::group(vec![styled(Style {
                    fill: Some("red".into()),
                    opacity: Some(1.0),
                    ..Default::default()
                })]),
            ],
        );
        let result = Optimizer::new().optimize(&doc, &OptimizationOptions::default()).unwrap();
        assert_eq!(result.removed_attributes, 4);
        assert_eq!(result.document.elements[0].attrs().style, None);
        let inner = &result.document.elements[1].children()[0];
        assert_eq!(inner.attrs().style.as_ref().unwrap().fill.as_deref(), Some("red"));
    }

    #[test]
    fn test_rounding_counts_only_changed_values() {
        let doc = Document::new(
            ViewBox::new(0.0, 0.0, 100.0, 100.0),
            vec![Element::line(1.0, 2.556, 3.25, 4.0)],
        );
        let result = Optimizer::new().optimize(&doc, &OptimizationOptions::default()).unwrap();
        assert_eq!(result.rounded_values, 1);
        match &result.document.elements[0] {
            Element::Line(line) => assert_eq!((line.y1, line.x2), (2.56, 3.25)),
            other => panic!("unexpected element {other:?}"),
        }
    }

    #[test]
    fn test_rounding_leaves_huge_values_finite() {
        let doc = Document::new(
            ViewBox::new(0.0, 0.0, 100.0, 100.0),
            vec![Element::circle(1e300, 1.25, 2.0)],
        );
        let options = OptimizationOptions {
            precision: 10,
            ..Default::default()
        };
        let result = Optimizer::new().optimize(&doc, &options).unwrap();
        match &result.document.elements[0] {
            Element::Circle(circle) => assert_eq!((circle.cx, circle.cy), (1e300, 1.25)),
            other => panic!("unexpected element {other:?}"),
        }
        assert_eq!(result.rounded_values, 0);
    }

    #[test]
    fn test_precision_limit() {
        let options = OptimizationOptions {
            precision: 11,
            ..Default::default()
        };
        let err = Optimizer::new().optimize(&Document::default(), &options).unwrap_err();
        assert_eq!(err, ConfigurationError::InvalidPrecision(11));
    }

    #[test]
    fn test_input_is_not_mutated() {
        let doc = Document::new(
            ViewBox::new(0.0, 0.0, 10.0, 10.0),
            vec![Element::group(vec![]), Element::circle(1.234, 1.0, 1.0)],
        );
        let before = doc.clone();
        let result = Optimizer::new().optimize(&doc, &OptimizationOptions::default()).unwrap();
        assert_eq!(doc, before);
        assert!(result.size_reduction > 0.0);
        assert_eq!(result.applied.len(), 2);
        assert!(result.applied.iter().all(|a| a.impact == Impact::Low));
    }
}
