//! Document Model - the element tree every pass works on
//!
//! A group owns its children outright. There are no back references,
//! so the tree cannot contain cycles.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl ViewBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn has_positive_size(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }

    pub fn is_finite(&self) -> bool {
        [self.x, self.y, self.width, self.height]
            .iter()
            .all(|v| v.is_finite())
    }

    /// Width divided by height
    pub fn aspect_ratio(&self) -> f64 {
        self.width / self.height
    }

    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Coordinate fields in the fixed order x, y, width, height
    pub fn coordinates_mut(&mut self) -> [&mut f64; 4] {
        [&mut self.x, &mut self.y, &mut self.width, &mut self.height]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(default)]
    pub view_box: Option<ViewBox>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub elements: Vec<Element>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub defs: Vec<Element>,
    /// Document-level stylesheet text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
}

impl Document {
    pub fn new(view_box: ViewBox, elements: Vec<Element>) -> Self {
        Self {
            view_box: Some(view_box),
            elements,
            ..Default::default()
        }
    }

    pub fn has_title(&self) -> bool {
        self.title.as_deref().is_some_and(|t| !t.trim().is_empty())
    }

    pub fn has_description(&self) -> bool {
        self.description
            .as_deref()
            .is_some_and(|d| !d.trim().is_empty())
    }

    /// Top-level lists in traversal order: `elements` first, then `defs`.
    pub fn roots(&self) -> impl Iterator<Item = (&'static str, &[Element])> {
        [("elements", self.elements.as_slice()), ("defs", self.defs.as_slice())].into_iter()
    }

    pub fn roots_mut(&mut self) -> [&mut Vec<Element>; 2] {
        [&mut self.elements, &mut self.defs]
    }

    /// Depth-first walk over every element, children before the next sibling.
    /// The callback receives the element and its depth (top level is 1).
    ///
    /// Recurses once per nesting level. Callers guard deep trees with
    /// `max_depth` first.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Element, usize)) {
        for (_, list) in self.roots() {
            walk_list(list, 1, visit);
        }
    }

    /// Mutable depth-first walk, a group is visited before its children
    pub fn walk_mut(&mut self, visit: &mut impl FnMut(&mut Element)) {
        for list in self.roots_mut() {
            walk_list_mut(list, visit);
        }
    }

    /// Total number of elements at every depth
    pub fn element_count(&self) -> usize {
        let mut count = 0;
        self.walk_iterative(|_, _| count += 1);
        count
    }

    /// Deepest nesting level; 0 for an empty document
    pub fn max_depth(&self) -> usize {
        let mut deepest = 0;
        self.walk_iterative(|_, depth| deepest = deepest.max(depth));
        deepest
    }

    /// Unordered walk on an explicit stack, safe for any nesting depth
    fn walk_iterative<'a>(&'a self, mut visit: impl FnMut(&'a Element, usize)) {
        let mut stack: Vec<(&Element, usize)> = self
            .roots()
            .flat_map(|(_, list)| list.iter().map(|element| (element, 1)))
            .collect();
        while let Some((element, depth)) = stack.pop() {
            visit(element, depth);
            stack.extend(element.children().iter().map(|child| (child, depth + 1)));
        }
    }

    pub fn element_kinds(&self) -> BTreeSet<ElementKind> {
        let mut kinds = BTreeSet::new();
        self.walk(&mut |el, _| {
            kinds.insert(el.kind());
        });
        kinds
    }

    /// Byte length of the serialized document
    pub fn estimated_size(&self) -> usize {
        serde_json::to_vec(self).map(|bytes| bytes.len()).unwrap_or(0)
    }

    /// Union of the bounds of every element with a measurable extent
    pub fn content_bounds(&self) -> Option<BoundingBox> {
        let mut bounds: Option<BoundingBox> = None;
        self.walk(&mut |el, _| {
            if let Some(b) = el.bounds() {
                bounds = Some(match bounds {
                    Some(acc) => acc.union(&b),
                    None => b,
                });
            }
        });
        bounds
    }
}

fn walk_list<'a>(list: &'a [Element], depth: usize, visit: &mut impl FnMut(&'a Element, usize)) {
    for element in list {
        visit(element, depth);
        walk_list(element.children(), depth + 1, visit);
    }
}

fn walk_list_mut(list: &mut [Element], visit: &mut impl FnMut(&mut Element)) {
    for element in list {
        visit(element);
        if let Element::Group(group) = element {
            walk_list_mut(&mut group.children, visit);
        }
    }
}

/// Attributes every element kind may carry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attributes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<Style>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clip_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mask: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aria_label: Option<String>,
}

impl Attributes {
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Default::default()
        }
    }

    /// Attribute values that may hold `url(#id)` references
    pub fn reference_values(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [("clipPath", self.clip_path.as_deref()), ("mask", self.mask.as_deref())]
            .into_iter()
            .filter_map(|(name, value)| value.map(|v| (name, v)))
    }

    pub fn has_aria_label(&self) -> bool {
        self.aria_label.as_deref().is_some_and(|l| !l.trim().is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Style {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill_opacity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_opacity: Option<f64>,
}

impl Style {
    pub fn is_empty(&self) -> bool {
        self == &Style::default()
    }

    /// Opacity-like properties, each of which must lie in [0, 1]
    pub fn opacities(&self) -> impl Iterator<Item = (&'static str, f64)> {
        [
            ("opacity", self.opacity),
            ("fillOpacity", self.fill_opacity),
            ("strokeOpacity", self.stroke_opacity),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.map(|v| (name, v)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Circle,
    Rect,
    Line,
    Path,
    Text,
    Group,
}

impl ElementKind {
    /// Relative rendering cost used by the performance report
    pub fn render_weight(self) -> f64 {
        match self {
            Self::Circle | Self::Rect | Self::Line => 1.0,
            Self::Path => 3.0,
            Self::Text => 2.0,
            Self::Group => 0.5,
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Circle => "circle",
            Self::Rect => "rect",
            Self::Line => "line",
            Self::Path => "path",
            Self::Text => "text",
            Self::Group => "group",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Element {
    Circle(Circle),
    Rect(Rect),
    Line(Line),
    Path(Path),
    Text(Text),
    Group(Group),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    pub cx: f64,
    pub cy: f64,
    pub r: f64,
    #[serde(flatten)]
    pub attrs: Attributes,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rx: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ry: Option<f64>,
    #[serde(flatten)]
    pub attrs: Attributes,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    #[serde(flatten)]
    pub attrs: Attributes,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Path {
    pub d: String,
    #[serde(flatten)]
    pub attrs: Attributes,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Text {
    pub x: f64,
    pub y: f64,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(flatten)]
    pub attrs: Attributes,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Group {
    #[serde(default)]
    pub children: Vec<Element>,
    #[serde(flatten)]
    pub attrs: Attributes,
}

impl Element {
    pub fn circle(cx: f64, cy: f64, r: f64) -> Self {
        Self::Circle(Circle { cx, cy, r, attrs: Attributes::default() })
    }

    pub fn rect(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::Rect(Rect { x, y, width, height, rx: None, ry: None, attrs: Attributes::default() })
    }

    pub fn line(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self::Line(Line { x1, y1, x2, y2, attrs: Attributes::default() })
    }

    pub fn path(d: impl Into<String>) -> Self {
        Self::Path(Path { d: d.into(), attrs: Attributes::default() })
    }

    pub fn text(x: f64, y: f64, content: impl Into<String>) -> Self {
        Self::Text(Text {
            x,
            y,
            content: content.into(),
            font_size: None,
            font_family: None,
            attrs: Attributes::default(),
        })
    }

    pub fn group(children: Vec<Element>) -> Self {
        Self::Group(Group { children, attrs: Attributes::default() })
    }

    /// Builder-style replacement of the shared attributes
    pub fn with_attrs(mut self, attrs: Attributes) -> Self {
        *self.attrs_mut() = attrs;
        self
    }

    pub fn kind(&self) -> ElementKind {
        match self {
            Self::Circle(_) => ElementKind::Circle,
            Self::Rect(_) => ElementKind::Rect,
            Self::Line(_) => ElementKind::Line,
            Self::Path(_) => ElementKind::Path,
            Self::Text(_) => ElementKind::Text,
            Self::Group(_) => ElementKind::Group,
        }
    }

    pub fn attrs(&self) -> &Attributes {
        match self {
            Self::Circle(e) => &e.attrs,
            Self::Rect(e) => &e.attrs,
            Self::Line(e) => &e.attrs,
            Self::Path(e) => &e.attrs,
            Self::Text(e) => &e.attrs,
            Self::Group(e) => &e.attrs,
        }
    }

    pub fn attrs_mut(&mut self) -> &mut Attributes {
        match self {
            Self::Circle(e) => &mut e.attrs,
            Self::Rect(e) => &mut e.attrs,
            Self::Line(e) => &mut e.attrs,
            Self::Path(e) => &mut e.attrs,
            Self::Text(e) => &mut e.attrs,
            Self::Group(e) => &mut e.attrs,
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.attrs().id.as_deref()
    }

    pub fn children(&self) -> &[Element] {
        match self {
            Self::Group(g) => &g.children,
            _ => &[],
        }
    }

    /// Named coordinate-bearing fields for this kind.
    ///
    /// circle: cx, cy, r. rect: x, y, width, height, rx, ry. line: x1, y1, x2, y2.
    /// text: x, y. Paths and groups have none.
    pub fn coordinates(&self) -> Vec<(&'static str, f64)> {
        match self {
            Self::Circle(c) => vec![("cx", c.cx), ("cy", c.cy), ("r", c.r)],
            Self::Rect(r) => {
                let mut fields = vec![("x", r.x), ("y", r.y), ("width", r.width), ("height", r.height)];
                fields.extend(r.rx.map(|v| ("rx", v)));
                fields.extend(r.ry.map(|v| ("ry", v)));
                fields
            }
            Self::Line(l) => vec![("x1", l.x1), ("y1", l.y1), ("x2", l.x2), ("y2", l.y2)],
            Self::Text(t) => vec![("x", t.x), ("y", t.y)],
            Self::Path(_) | Self::Group(_) => vec![],
        }
    }

    /// Mutable view of the same fields as [`Element::coordinates`], in the same order
    pub fn coordinates_mut(&mut self) -> Vec<&mut f64> {
        match self {
            Self::Circle(Circle { cx, cy, r, .. }) => vec![cx, cy, r],
            Self::Rect(Rect { x, y, width, height, rx, ry, .. }) => {
                let mut fields = vec![x, y, width, height];
                fields.extend(rx.as_mut());
                fields.extend(ry.as_mut());
                fields
            }
            Self::Line(Line { x1, y1, x2, y2, .. }) => vec![x1, y1, x2, y2],
            Self::Text(Text { x, y, .. }) => vec![x, y],
            Self::Path(_) | Self::Group(_) => vec![],
        }
    }

    /// Positional (x, y) pairs: circle center, rect origin, line endpoints, text anchor
    pub fn points_mut(&mut self) -> Vec<(&mut f64, &mut f64)> {
        match self {
            Self::Circle(Circle { cx, cy, .. }) => vec![(cx, cy)],
            Self::Rect(Rect { x, y, .. }) => vec![(x, y)],
            Self::Line(Line { x1, y1, x2, y2, .. }) => vec![(x1, y1), (x2, y2)],
            Self::Text(Text { x, y, .. }) => vec![(x, y)],
            Self::Path(_) | Self::Group(_) => vec![],
        }
    }

    /// Extent of this element alone. Paths and groups report none.
    pub fn bounds(&self) -> Option<BoundingBox> {
        match self {
            Self::Circle(c) => Some(BoundingBox::new(c.cx - c.r, c.cy - c.r, c.cx + c.r, c.cy + c.r)),
            Self::Rect(r) => Some(BoundingBox::new(r.x, r.y, r.x + r.width, r.y + r.height)),
            Self::Line(l) => Some(BoundingBox::new(
                l.x1.min(l.x2),
                l.y1.min(l.y2),
                l.x1.max(l.x2),
                l.y1.max(l.y2),
            )),
            Self::Text(t) => Some(BoundingBox::new(t.x, t.y, t.x, t.y)),
            Self::Path(_) | Self::Group(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self { min_x, min_y, max_x, max_y }
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn nested() -> Document {
        Document::new(
            ViewBox::new(0.0, 0.0, 100.0, 100.0),
            vec![
                Element::circle(10.0, 10.0, 5.0),
                Element::group(vec![Element::group(vec![Element::rect(0.0, 0.0, 4.0, 4.0)])]),
            ],
        )
    }

    #[test]
    fn test_count_and_depth_recurse_into_groups() {
        let doc = nested();
        assert_eq!(doc.element_count(), 4);
        assert_eq!(doc.max_depth(), 3);
        assert_eq!(Document::default().max_depth(), 0);
    }

    #[test]
    fn test_walk_visits_children_before_siblings() {
        let doc = Document::new(
            ViewBox::new(0.0, 0.0, 10.0, 10.0),
            vec![
                Element::group(vec![Element::path("M0 0")]),
                Element::text(1.0, 1.0, "hi"),
            ],
        );
        let mut kinds = vec![];
        doc.walk(&mut |el, _| kinds.push(el.kind()));
        assert_eq!(kinds, vec![ElementKind::Group, ElementKind::Path, ElementKind::Text]);
    }

    #[test]
    fn test_json_shape_is_tagged_and_flat() {
        let value = json!({
            "type": "circle",
            "cx": 50,
            "cy": 50,
            "r": 25,
            "id": "dot",
            "clipPath": "url(#clip)",
            "style": { "fill": "red", "strokeWidth": 2 }
        });
        let element: Element = serde_json::from_value(value).unwrap();
        match &element {
            Element::Circle(c) => {
                assert_eq!(c.cx, 50.0);
                assert_eq!(c.attrs.id.as_deref(), Some("dot"));
                assert_eq!(c.attrs.clip_path.as_deref(), Some("url(#clip)"));
                assert_eq!(c.attrs.style.as_ref().unwrap().stroke_width, Some(2.0));
            }
            other => panic!("unexpected element {other:?}"),
        }
        let back = serde_json::to_value(&element).unwrap();
        assert_eq!(back["type"], "circle");
        assert_eq!(back["clipPath"], "url(#clip)");
    }

    #[test]
    fn test_content_bounds_union() {
        let bounds = nested().content_bounds().unwrap();
        assert_eq!(bounds, BoundingBox::new(0.0, 0.0, 15.0, 15.0));
    }

    #[test]
    fn test_rect_coordinates_include_optional_radii() {
        let mut rect = Element::Rect(Rect {
            x: 1.0,
            y: 2.0,
            width: 3.0,
            height: 4.0,
            rx: Some(0.5),
            ry: None,
            attrs: Attributes::default(),
        });
        assert_eq!(rect.coordinates().len(), 5);
        assert_eq!(rect.coordinates_mut().len(), 5);
    }
}
