use svgforge_core::{
    optimize::OptimizationPreset, Attributes, Document, Element, OptimizationOptions, Optimizer,
    ReferenceGraph, Style, ViewBox,
};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn scenario_optimize_removes_empty_group_and_rounds() {
    init_logger();
    let doc = Document::new(
        ViewBox::new(0.0, 0.0, 100.0, 100.0),
        vec![Element::group(vec![]), Element::circle(50.12345, 50.12345, 25.98765)],
    );

    let result = Optimizer::new()
        .optimize(&doc, &OptimizationOptions { precision: 2, ..Default::default() })
        .unwrap();

    assert_eq!(result.removed_elements, 1);
    assert_eq!(result.document.elements.len(), 1);
    match &result.document.elements[0] {
        Element::Circle(c) => assert_eq!((c.cx, c.cy, c.r), (50.12, 50.12, 25.99)),
        other => panic!("expected circle, got {other:?}"),
    }
}

#[test]
fn invariant_optimization_is_idempotent() {
    let doc = Document::new(
        ViewBox::new(0.0, 0.0, 100.0, 100.0),
        vec![
            Element::group(vec![Element::group(vec![])]),
            Element::line(0.123, 1.987, 10.5555, 3.0),
            Element::rect(1.0, 1.0, 2.0, 2.0).with_attrs(Attributes {
                style: Some(Style {
                    fill: Some("black".into()),
                    opacity: Some(1.0),
                    ..Default::default()
                }),
                ..Default::default()
            }),
        ],
    );
    let optimizer = Optimizer::new();
    for preset in [OptimizationPreset::Aggressive, OptimizationPreset::Balanced, OptimizationPreset::Conservative] {
        let options = preset.options();
        let first = optimizer.optimize(&doc, &options).unwrap();
        assert!(!first.applied.is_empty());
        let second = optimizer.optimize(&first.document, &options).unwrap();
        assert!(second.applied.is_empty(), "{preset:?}: {:?}", second.applied);
        assert_eq!(second.document, first.document);
    }
}

#[test]
fn invariant_optimization_keeps_references_resolvable() {
    let doc = Document {
        defs: vec![Element::group(vec![]).with_attrs(Attributes::with_id("clip"))],
        ..Document::new(
            ViewBox::new(0.0, 0.0, 100.0, 100.0),
            vec![
                Element::group(vec![Element::group(vec![]).with_attrs(Attributes::with_id("fade"))]),
                Element::circle(5.0, 5.0, 5.0).with_attrs(Attributes {
                    clip_path: Some("url(#clip)".into()),
                    mask: Some("url(#fade)".into()),
                    ..Default::default()
                }),
            ],
        )
    };
    assert!(ReferenceGraph::build(&doc).is_consistent());

    for preset in [OptimizationPreset::Aggressive, OptimizationPreset::Balanced, OptimizationPreset::Conservative] {
        let result = Optimizer::new().optimize(&doc, &preset.options()).unwrap();
        let graph = ReferenceGraph::build(&result.document);
        assert!(graph.is_consistent(), "{preset:?} broke references");
        assert_eq!(result.removed_elements, 0);
    }
}
