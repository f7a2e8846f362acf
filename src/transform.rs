//! Geometric transformations over the whole tree
//!
//! Every operation rewrites a copy of the document. The fields touched per
//! element kind are the coordinate fields listed on [`Element::coordinates`].
//! Path data is never rewritten. The operation is prepended to the path's
//! `transform` attribute instead.

use std::fmt;

use log::{debug, trace};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document::{Attributes, BoundingBox, Document, Element, ViewBox};
use crate::error::ConfigurationError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Transformation {
    Scale {
        x: f64,
        y: f64,
    },
    Translate {
        x: f64,
        y: f64,
    },
    /// Angle in degrees. The center defaults to the viewBox center.
    Rotate {
        angle: f64,
        #[serde(default, rename = "centerX", skip_serializing_if = "Option::is_none")]
        center_x: Option<f64>,
        #[serde(default, rename = "centerY", skip_serializing_if = "Option::is_none")]
        center_y: Option<f64>,
    },
    /// Mirror across the vertical midline of the viewBox
    FlipHorizontal,
    /// Mirror across the horizontal midline of the viewBox
    FlipVertical,
}

const KNOWN_TYPES: [&str; 5] = ["scale", "translate", "rotate", "flipHorizontal", "flipVertical"];

impl Transformation {
    /// Parse a transformation from JSON, reporting unknown types by name
    pub fn from_value(value: &Value) -> Result<Self, ConfigurationError> {
        match value.get("type").and_then(Value::as_str) {
            Some(kind) if !KNOWN_TYPES.contains(&kind) => {
                Err(ConfigurationError::UnknownTransformation(kind.to_string()))
            }
            None => Err(ConfigurationError::Invalid(
                "transformation is missing its `type`".to_string(),
            )),
            Some(_) => serde_json::from_value(value.clone())
                .map_err(|e| ConfigurationError::Invalid(e.to_string())),
        }
    }

    /// Reject parameters no document could be transformed with
    pub fn check(&self) -> Result<(), ConfigurationError> {
        let finite = |name: &'static str, value: f64| {
            if value.is_finite() {
                Ok(())
            } else {
                Err(ConfigurationError::NonFiniteParameter(name))
            }
        };

        match *self {
            Self::Scale { x, y } => {
                if !(x.is_finite() && y.is_finite() && x > 0.0 && y > 0.0) {
                    return Err(ConfigurationError::InvalidScale(x, y));
                }
            }
            Self::Translate { x, y } => {
                finite("x", x)?;
                finite("y", y)?;
            }
            Self::Rotate { angle, center_x, center_y } => {
                finite("angle", angle)?;
                if let Some(cx) = center_x {
                    finite("centerX", cx)?;
                }
                if let Some(cy) = center_y {
                    finite("centerY", cy)?;
                }
            }
            Self::FlipHorizontal | Self::FlipVertical => {}
        }
        Ok(())
    }
}

impl fmt::Display for Transformation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scale { x, y } => write!(f, "scale({x}, {y})"),
            Self::Translate { x, y } => write!(f, "translate({x}, {y})"),
            Self::Rotate { angle, center_x, center_y } => match (center_x, center_y) {
                (Some(cx), Some(cy)) => write!(f, "rotate({angle} about {cx}, {cy})"),
                _ => write!(f, "rotate({angle})"),
            },
            Self::FlipHorizontal => f.write_str("flipHorizontal"),
            Self::FlipVertical => f.write_str("flipVertical"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformResult {
    pub document: Document,
    pub transformation: Transformation,
    /// What was applied, with any resolved center or midline
    pub description: String,
    pub original_bounds: Option<BoundingBox>,
    pub transformed_bounds: Option<BoundingBox>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiTransformResult {
    pub document: Document,
    /// Descriptions in the order the operations ran
    pub applied: Vec<String>,
    /// Sum of all rotate angles, in degrees
    pub cumulative_rotation: f64,
    /// Sum of all translate vectors
    pub cumulative_translation: Vector,
    /// Final viewBox dimensions over the original ones
    pub net_scale: Vector,
    pub original_bounds: Option<BoundingBox>,
    pub transformed_bounds: Option<BoundingBox>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Transformer;

impl Transformer {
    pub fn new() -> Self {
        Self
    }

    pub fn transform(
        &self,
        document: &Document,
        transformation: &Transformation,
    ) -> Result<TransformResult, ConfigurationError> {
        transformation.check()?;
        let mut transformed = document.clone();
        let description = apply(&mut transformed, transformation)?;
        debug!(operation = description.as_str(); "Applied transformation");

        Ok(TransformResult {
            original_bounds: document.content_bounds(),
            transformed_bounds: transformed.content_bounds(),
            document: transformed,
            transformation: transformation.clone(),
            description,
        })
    }

    /// Apply operations in the order given, each on the previous output
    pub fn transform_multiple(
        &self,
        document: &Document,
        transformations: &[Transformation],
    ) -> Result<MultiTransformResult, ConfigurationError> {
        for transformation in transformations {
            transformation.check()?;
        }

        let mut current = document.clone();
        let mut applied = Vec::with_capacity(transformations.len());
        let mut cumulative_rotation = 0.0;
        let mut cumulative_translation = Vector::default();
        let mut scale_product = Vector { x: 1.0, y: 1.0 };

        for transformation in transformations {
            let description = apply(&mut current, transformation)?;
            trace!(operation = description.as_str(); "Applied transformation step");
            match *transformation {
                Transformation::Rotate { angle, .. } => cumulative_rotation += angle,
                Transformation::Translate { x, y } => {
                    cumulative_translation.x += x;
                    cumulative_translation.y += y;
                }
                Transformation::Scale { x, y } => {
                    scale_product.x *= x;
                    scale_product.y *= y;
                }
                Transformation::FlipHorizontal | Transformation::FlipVertical => {}
            }
            applied.push(description);
        }

        let net_scale = match (document.view_box, current.view_box) {
            (Some(before), Some(after)) if before.has_positive_size() => Vector {
                x: after.width / before.width,
                y: after.height / before.height,
            },
            _ => scale_product,
        };
        debug!(steps = applied.len(), cumulative_rotation; "Applied transformation sequence");

        Ok(MultiTransformResult {
            original_bounds: document.content_bounds(),
            transformed_bounds: current.content_bounds(),
            document: current,
            applied,
            cumulative_rotation,
            cumulative_translation,
            net_scale,
        })
    }
}

fn apply(document: &mut Document, transformation: &Transformation) -> Result<String, ConfigurationError> {
    match *transformation {
        Transformation::Scale { x, y } => {
            scale(document, x, y);
            Ok(transformation.to_string())
        }
        Transformation::Translate { x, y } => {
            translate(document, x, y);
            Ok(transformation.to_string())
        }
        Transformation::Rotate { angle, center_x, center_y } => {
            let fallback = document.view_box.as_ref().map(ViewBox::center);
            let (cx, cy) = match (center_x, center_y, fallback) {
                (Some(cx), Some(cy), _) => (cx, cy),
                (cx, cy, Some((vx, vy))) => (cx.unwrap_or(vx), cy.unwrap_or(vy)),
                _ => return Err(ConfigurationError::MissingViewBox("rotate")),
            };
            rotate(document, angle, cx, cy);
            Ok(format!("rotate({angle} about {cx}, {cy})"))
        }
        Transformation::FlipHorizontal => {
            let view_box = document
                .view_box
                .ok_or(ConfigurationError::MissingViewBox("flipHorizontal"))?;
            let mid = view_box.x + view_box.width / 2.0;
            flip_horizontal(document, mid);
            Ok(format!("flipHorizontal about x={mid}"))
        }
        Transformation::FlipVertical => {
            let view_box = document
                .view_box
                .ok_or(ConfigurationError::MissingViewBox("flipVertical"))?;
            let mid = view_box.y + view_box.height / 2.0;
            flip_vertical(document, mid);
            Ok(format!("flipVertical about y={mid}"))
        }
    }
}

fn prepend_transform(attrs: &mut Attributes, operation: String) {
    attrs.transform = Some(match attrs.transform.take() {
        Some(existing) => format!("{operation} {existing}"),
        None => operation,
    });
}

fn scale(document: &mut Document, sx: f64, sy: f64) {
    if let Some(view_box) = document.view_box.as_mut() {
        view_box.x *= sx;
        view_box.y *= sy;
        view_box.width *= sx;
        view_box.height *= sy;
    }
    if let Some(width) = document.width.as_mut() {
        *width *= sx;
    }
    if let Some(height) = document.height.as_mut() {
        *height *= sy;
    }

    document.walk_mut(&mut |element| match element {
        Element::Circle(c) => {
            c.cx *= sx;
            c.cy *= sy;
            c.r *= sx.min(sy);
        }
        Element::Rect(r) => {
            r.x *= sx;
            r.y *= sy;
            r.width *= sx;
            r.height *= sy;
            if let Some(rx) = r.rx.as_mut() {
                *rx *= sx;
            }
            if let Some(ry) = r.ry.as_mut() {
                *ry *= sy;
            }
        }
        Element::Line(l) => {
            l.x1 *= sx;
            l.y1 *= sy;
            l.x2 *= sx;
            l.y2 *= sy;
        }
        Element::Text(t) => {
            t.x *= sx;
            t.y *= sy;
        }
        Element::Path(p) => prepend_transform(&mut p.attrs, format!("scale({sx} {sy})")),
        Element::Group(_) => {}
    });
}

fn translate(document: &mut Document, tx: f64, ty: f64) {
    document.walk_mut(&mut |element| {
        if let Element::Path(p) = element {
            prepend_transform(&mut p.attrs, format!("translate({tx} {ty})"));
            return;
        }
        for (x, y) in element.points_mut() {
            *x += tx;
            *y += ty;
        }
    });
}

fn rotate(document: &mut Document, angle: f64, cx: f64, cy: f64) {
    let (sin, cos) = angle.to_radians().sin_cos();
    document.walk_mut(&mut |element| {
        if let Element::Path(p) = element {
            prepend_transform(&mut p.attrs, format!("rotate({angle} {cx} {cy})"));
            return;
        }
        for (x, y) in element.points_mut() {
            let (dx, dy) = (*x - cx, *y - cy);
            *x = cx + dx * cos - dy * sin;
            *y = cy + dx * sin + dy * cos;
        }
    });
}

fn flip_horizontal(document: &mut Document, mid: f64) {
    document.walk_mut(&mut |element| match element {
        // mirror the whole rectangle, not just its origin
        Element::Rect(r) => r.x = 2.0 * mid - r.x - r.width,
        Element::Path(p) => {
            prepend_transform(&mut p.attrs, format!("matrix(-1 0 0 1 {} 0)", 2.0 * mid));
        }
        other => {
            for (x, _) in other.points_mut() {
                *x = 2.0 * mid - *x;
            }
        }
    });
}

fn flip_vertical(document: &mut Document, mid: f64) {
    document.walk_mut(&mut |element| match element {
        Element::Rect(r) => r.y = 2.0 * mid - r.y - r.height,
        Element::Path(p) => {
            prepend_transform(&mut p.attrs, format!("matrix(1 0 0 -1 0 {})", 2.0 * mid));
        }
        other => {
            for (_, y) in other.points_mut() {
                *y = 2.0 * mid - *y;
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;
    use serde_json::json;

    fn circle_doc() -> Document {
        Document::new(ViewBox::new(0.0, 0.0, 200.0, 200.0), vec![Element::circle(50.0, 50.0, 25.0)])
    }

    fn circle(document: &Document) -> (f64, f64, f64) {
        match &document.elements[0] {
            Element::Circle(c) => (c.cx, c.cy, c.r),
            other => panic!("expected circle, got {other:?}"),
        }
    }

    #[test]
    fn test_scale_circle_and_viewbox() {
        let result = Transformer::new()
            .transform(&circle_doc(), &Transformation::Scale { x: 2.0, y: 2.0 })
            .unwrap();
        assert_eq!(circle(&result.document), (100.0, 100.0, 50.0));
        assert_eq!(result.document.view_box, Some(ViewBox::new(0.0, 0.0, 400.0, 400.0)));
        assert_eq!(result.description, "scale(2, 2)");
    }

    #[test]
    fn test_uneven_scale_uses_smaller_factor_for_radius() {
        let result = Transformer::new()
            .transform(&circle_doc(), &Transformation::Scale { x: 3.0, y: 0.5 })
            .unwrap();
        assert_eq!(circle(&result.document), (150.0, 25.0, 12.5));
    }

    #[test]
    fn test_flip_horizontal_about_viewbox_midline() {
        let result = Transformer::new()
            .transform(&circle_doc(), &Transformation::FlipHorizontal)
            .unwrap();
        assert_eq!(circle(&result.document), (150.0, 50.0, 25.0));
        assert_eq!(result.description, "flipHorizontal about x=100");
    }

    #[test]
    fn test_flip_vertical_mirrors_rect_extent() {
        let doc = Document::new(
            ViewBox::new(0.0, 0.0, 100.0, 100.0),
            vec![Element::rect(10.0, 10.0, 20.0, 30.0)],
        );
        let result = Transformer::new().transform(&doc, &Transformation::FlipVertical).unwrap();
        assert_eq!(result.transformed_bounds, Some(BoundingBox::new(10.0, 60.0, 30.0, 90.0)));
    }

    #[test]
    fn test_rotate_about_viewbox_center() {
        let rotation = Transformation::Rotate { angle: 90.0, center_x: None, center_y: None };
        let result = Transformer::new().transform(&circle_doc(), &rotation).unwrap();
        let (cx, cy, r) = circle(&result.document);
        assert_approx_eq!(f64, cx, 150.0, epsilon = 1e-9);
        assert_approx_eq!(f64, cy, 50.0, epsilon = 1e-9);
        assert_eq!(r, 25.0);
        assert_eq!(result.description, "rotate(90 about 100, 100)");
    }

    #[test]
    fn test_translate_leaves_viewbox_and_prepends_path_transform() {
        let doc = Document::new(
            ViewBox::new(0.0, 0.0, 10.0, 10.0),
            vec![Element::group(vec![Element::path("M0 0 L1 1").with_attrs(Attributes {
                transform: Some("scale(2 2)".into()),
                ..Default::default()
            })])],
        );
        let result = Transformer::new()
            .transform(&doc, &Transformation::Translate { x: 5.0, y: -1.0 })
            .unwrap();
        assert_eq!(result.document.view_box, doc.view_box);
        let path = &result.document.elements[0].children()[0];
        assert_eq!(path.attrs().transform.as_deref(), Some("translate(5 -1) scale(2 2)"));
    }

    #[test]
    fn test_multiple_composes_metadata_in_order() {
        let steps = vec![
            Transformation::Translate { x: 10.0, y: 0.0 },
            Transformation::Rotate { angle: 30.0, center_x: Some(0.0), center_y: Some(0.0) },
            Transformation::Scale { x: 2.0, y: 4.0 },
            Transformation::Translate { x: -4.0, y: 6.0 },
            Transformation::Rotate { angle: 15.0, center_x: None, center_y: None },
        ];
        let result = Transformer::new().transform_multiple(&circle_doc(), &steps).unwrap();
        assert_eq!(result.applied.len(), 5);
        assert_eq!(result.applied[0], "translate(10, 0)");
        assert_eq!(result.cumulative_rotation, 45.0);
        assert_eq!(result.cumulative_translation, Vector { x: 6.0, y: 6.0 });
        assert_eq!(result.net_scale, Vector { x: 2.0, y: 4.0 });
    }

    #[test]
    fn test_invalid_parameters_are_configuration_errors() {
        let transformer = Transformer::new();
        let doc = circle_doc();
        assert_eq!(
            transformer.transform(&doc, &Transformation::Scale { x: 0.0, y: 1.0 }).unwrap_err(),
            ConfigurationError::InvalidScale(0.0, 1.0)
        );
        assert_eq!(
            transformer
                .transform(&doc, &Transformation::Translate { x: f64::NAN, y: 1.0 })
                .unwrap_err(),
            ConfigurationError::NonFiniteParameter("x")
        );

        let no_view_box = Document { view_box: None, ..doc };
        assert_eq!(
            transformer.transform(&no_view_box, &Transformation::FlipVertical).unwrap_err(),
            ConfigurationError::MissingViewBox("flipVertical")
        );
    }

    #[test]
    fn test_from_value() {
        let parsed = Transformation::from_value(&json!({"type": "rotate", "angle": 45, "centerX": 1, "centerY": 2}))
            .unwrap();
        assert_eq!(
            parsed,
            Transformation::Rotate { angle: 45.0, center_x: Some(1.0), center_y: Some(2.0) }
        );
        assert_eq!(
            Transformation::from_value(&json!({"type": "flipHorizontal"})).unwrap(),
            Transformation::FlipHorizontal
        );
        assert_eq!(
            Transformation::from_value(&json!({"type": "skew", "x": 1})).unwrap_err(),
            ConfigurationError::UnknownTransformation("skew".into())
        );
        assert!(matches!(
            Transformation::from_value(&json!({"type": "scale", "x": 1})).unwrap_err(),
            ConfigurationError::Invalid(_)
        ));
    }
}
