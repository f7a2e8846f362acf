//! Processing Pipeline - Single Entry Point
//!
//! transform -> optimize -> validate -> render, in that order.
//! A validation failure stops the run before anything is rendered.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::config::{EngineConfig, Thresholds};
use crate::diagnostics::{Diagnostic, DiagnosticCode};
use crate::document::{Document, ElementKind};
use crate::error::{ConfigurationError, RenderError};
use crate::hashing::{compute_content_hash, compute_job_hash};
use crate::optimize::{
    AppliedOptimization, OptimizationOptions, OptimizationPreset, OptimizationResult, Optimizer,
};
use crate::transform::{MultiTransformResult, TransformResult, Transformation, Transformer};
use crate::validation::{
    traversal_limit_error, ScoredValidation, ValidationOptions, ValidationPreset, Validator,
};
use crate::ENGINE_VERSION;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Validation failed: {}", summarize(.errors))]
    ValidationFailed {
        errors: Vec<Diagnostic>,
        warnings: Vec<PipelineWarning>,
    },

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

fn summarize(errors: &[Diagnostic]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.code, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Turns a finished document into markup. Supplied by the caller.
pub trait Renderer: Send + Sync {
    fn render(&self, document: &Document) -> Result<String, RenderError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Transform,
    Optimize,
    Validate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineWarning {
    pub stage: Stage,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<DiagnosticCode>,
}

impl PipelineWarning {
    pub fn new(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
            code: None,
        }
    }

    fn from_diagnostic(diagnostic: &Diagnostic) -> Self {
        Self {
            stage: Stage::Validate,
            message: diagnostic.to_string(),
            code: Some(diagnostic.code),
        }
    }
}

impl fmt::Display for PipelineWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match self.stage {
            Stage::Transform => "transform",
            Stage::Optimize => "optimize",
            Stage::Validate => "validate",
        };
        write!(f, "[{stage}] {}", self.message)
    }
}

/// `optimize` field of a request: a flag, a preset name or explicit options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptimizeSetting {
    Enabled(bool),
    Preset(OptimizationPreset),
    Options(OptimizationOptions),
}

impl OptimizeSetting {
    fn resolve(&self, default: OptimizationPreset) -> Option<OptimizationOptions> {
        match self {
            Self::Enabled(false) => None,
            Self::Enabled(true) => Some(default.options()),
            Self::Preset(preset) => Some(preset.options()),
            Self::Options(options) => Some(options.clone()),
        }
    }
}

/// `validate` field of a request: a flag, a preset name or explicit options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ValidateSetting {
    Enabled(bool),
    Preset(ValidationPreset),
    Options(ValidationOptions),
}

impl ValidateSetting {
    fn resolve(&self, default: ValidationPreset) -> Option<ValidationOptions> {
        match self {
            Self::Enabled(false) => None,
            Self::Enabled(true) => Some(default.options()),
            Self::Preset(preset) => Some(preset.options()),
            Self::Options(options) => Some(options.clone()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessRequest {
    #[serde(flatten)]
    pub document: Document,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optimize: Option<OptimizeSetting>,
    /// Absent means validate with the configured default preset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validate: Option<ValidateSetting>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transform: Vec<Transformation>,
}

impl ProcessRequest {
    pub fn new(document: Document) -> Self {
        Self {
            document,
            ..Default::default()
        }
    }

    /// Parse a request, naming unknown transformation types
    pub fn from_value(value: Value) -> Result<Self, ConfigurationError> {
        if let Some(steps) = value.get("transform").and_then(Value::as_array) {
            for step in steps {
                Transformation::from_value(step)?;
            }
        }
        serde_json::from_value(value).map_err(|e| ConfigurationError::Invalid(e.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    pub element_count: usize,
    pub max_depth: usize,
    pub complexity: Complexity,
    pub element_kinds: BTreeSet<ElementKind>,
    pub has_title: bool,
    pub has_description: bool,
    /// Estimated serialized size in bytes
    pub estimated_size: usize,
    pub content_hash: String,
    pub engine_version: String,
}

/// Summarize a document: size, shape and accessibility flags
pub fn generate_metadata(
    document: &Document,
    thresholds: &Thresholds,
) -> Result<DocumentMetadata, serde_json::Error> {
    let element_count = document.element_count();
    let max_depth = document.max_depth();

    let complexity = if max_depth > thresholds.performance_depth_limit {
        Complexity::High
    } else if element_count < 10 {
        Complexity::Low
    } else if element_count < 100 {
        Complexity::Medium
    } else {
        Complexity::High
    };

    Ok(DocumentMetadata {
        element_count,
        max_depth,
        complexity,
        element_kinds: document.element_kinds(),
        has_title: document.has_title(),
        has_description: document.has_description(),
        estimated_size: document.estimated_size(),
        content_hash: compute_content_hash(document)?,
        engine_version: ENGINE_VERSION.to_string(),
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedDocument {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub engine_version: String,
    pub job_hash: String,
    pub document: Document,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub markup: Option<String>,
    pub errors: Vec<Diagnostic>,
    /// Warnings from every stage that ran, in pipeline order
    pub warnings: Vec<PipelineWarning>,
    pub transformations: Vec<String>,
    pub optimizations: Vec<AppliedOptimization>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_reduction: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<ScoredValidation>,
    pub metadata: DocumentMetadata,
}

/// The processing pipeline - single entry point for all document operations
pub struct Pipeline {
    config: EngineConfig,
    validator: Validator,
    optimizer: Optimizer,
    transformer: Transformer,
    renderer: Option<Box<dyn Renderer>>,
}

impl Pipeline {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            validator: Validator::new(config.thresholds.clone()),
            optimizer: Optimizer::new(),
            transformer: Transformer::new(),
            renderer: None,
            config,
        }
    }

    pub fn with_renderer(mut self, renderer: impl Renderer + 'static) -> Self {
        self.renderer = Some(Box::new(renderer));
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn validate_document(&self, document: &Document, options: &ValidationOptions) -> ScoredValidation {
        self.validator.validate(document, options)
    }

    pub fn optimize_document(
        &self,
        document: &Document,
        options: &OptimizationOptions,
    ) -> Result<OptimizationResult, PipelineError> {
        Ok(self.optimizer.optimize(document, options)?)
    }

    pub fn transform_document(
        &self,
        document: &Document,
        transformation: &Transformation,
    ) -> Result<TransformResult, PipelineError> {
        Ok(self.transformer.transform(document, transformation)?)
    }

    pub fn transform_multiple(
        &self,
        document: &Document,
        transformations: &[Transformation],
    ) -> Result<MultiTransformResult, PipelineError> {
        Ok(self.transformer.transform_multiple(document, transformations)?)
    }

    pub fn generate_metadata(&self, document: &Document) -> Result<DocumentMetadata, PipelineError> {
        Ok(generate_metadata(document, &self.config.thresholds)?)
    }

    /// Run the full pipeline
    ///
    /// Validation runs unless the request sets `validate: false`. If it finds
    /// errors the run is aborted with every warning gathered so far. A tree
    /// nested past `max_traversal_depth` is rejected before any stage runs.
    pub fn process_document(&self, request: &ProcessRequest) -> Result<ProcessedDocument, PipelineError> {
        if let Some(too_deep) = traversal_limit_error(&request.document, &self.config.thresholds) {
            warn!(depth = request.document.max_depth(); "Document nested too deep, aborting pipeline");
            return Err(PipelineError::ValidationFailed {
                errors: vec![too_deep],
                warnings: vec![],
            });
        }

        let job_hash = compute_job_hash(request, ENGINE_VERSION)?;
        debug!(job_hash = job_hash.as_str(); "Processing document");

        let mut document = request.document.clone();
        let mut warnings = vec![];

        let mut transformations = vec![];
        if !request.transform.is_empty() {
            let result = self.transformer.transform_multiple(&document, &request.transform)?;
            warnings.extend(
                result
                    .applied
                    .iter()
                    .map(|d| PipelineWarning::new(Stage::Transform, format!("Applied transformation: {d}"))),
            );
            transformations = result.applied;
            document = result.document;
        }

        let mut optimizations = vec![];
        let mut size_reduction = None;
        let optimize = request
            .optimize
            .as_ref()
            .and_then(|setting| setting.resolve(self.config.optimization));
        if let Some(options) = optimize {
            let result = self.optimizer.optimize(&document, &options)?;
            warnings.extend(
                result
                    .warnings
                    .iter()
                    .map(|w| PipelineWarning::new(Stage::Optimize, w.clone())),
            );
            optimizations = result.applied;
            size_reduction = Some(result.size_reduction);
            document = result.document;
        }

        let validate = match &request.validate {
            Some(setting) => setting.resolve(self.config.validation),
            None => Some(self.config.validation.options()),
        };
        let validation = match validate {
            Some(options) => {
                let scored = self.validator.validate(&document, &options);
                warnings.extend(scored.report.warnings.iter().map(PipelineWarning::from_diagnostic));
                if !scored.valid {
                    warn!(
                        errors = scored.total_errors,
                        score = scored.score;
                        "Validation failed, aborting pipeline"
                    );
                    return Err(PipelineError::ValidationFailed {
                        errors: scored.report.errors,
                        warnings,
                    });
                }
                Some(scored)
            }
            None => None,
        };
        let errors = validation
            .as_ref()
            .map(|v| v.report.errors.clone())
            .unwrap_or_default();

        let markup = match &self.renderer {
            Some(renderer) => Some(renderer.render(&document)?),
            None => None,
        };

        let metadata = generate_metadata(&document, &self.config.thresholds)?;
        info!(
            elements = metadata.element_count,
            warnings = warnings.len();
            "Processed document"
        );

        Ok(ProcessedDocument {
            id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            engine_version: ENGINE_VERSION.to_string(),
            job_hash,
            document,
            markup,
            errors,
            warnings,
            transformations,
            optimizations,
            size_reduction,
            validation,
            metadata,
        })
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Attributes, Element, ViewBox};
    use serde_json::json;

    #[test]
    fn test_settings_deserialize_from_flags_names_and_objects() {
        let request = ProcessRequest::from_value(json!({
            "viewBox": {"x": 0, "y": 0, "width": 10, "height": 10},
            "elements": [],
            "optimize": "aggressive",
            "validate": false
        }))
        .unwrap();
        assert_eq!(request.optimize, Some(OptimizeSetting::Preset(OptimizationPreset::Aggressive)));
        assert_eq!(request.validate, Some(ValidateSetting::Enabled(false)));

        let request = ProcessRequest::from_value(json!({
            "elements": [],
            "optimize": {"precision": 4},
            "validate": "minimal"
        }))
        .unwrap();
        match request.optimize {
            Some(OptimizeSetting::Options(options)) => {
                assert_eq!(options.precision, 4);
                assert!(options.remove_empty_elements);
            }
            other => panic!("unexpected setting {other:?}"),
        }
        assert_eq!(request.validate, Some(ValidateSetting::Preset(ValidationPreset::Minimal)));
    }

    #[test]
    fn test_unknown_transformation_is_rejected_by_name() {
        let err = ProcessRequest::from_value(json!({
            "elements": [],
            "transform": [{"type": "scale", "x": 1, "y": 1}, {"type": "shear", "x": 1}]
        }))
        .unwrap_err();
        assert_eq!(err, ConfigurationError::UnknownTransformation("shear".into()));
    }

    #[test]
    fn test_optimize_true_uses_configured_preset() {
        let setting = OptimizeSetting::Enabled(true);
        assert_eq!(setting.resolve(OptimizationPreset::Balanced), Some(OptimizationPreset::Balanced.options()));
        assert_eq!(OptimizeSetting::Enabled(false).resolve(OptimizationPreset::Balanced), None);
    }

    #[test]
    fn test_complexity_buckets() {
        let thresholds = Thresholds::default();
        let doc = |n: usize| {
            Document::new(
                ViewBox::new(0.0, 0.0, 10.0, 10.0),
                (0..n).map(|_| Element::circle(1.0, 1.0, 1.0)).collect(),
            )
        };
        assert_eq!(generate_metadata(&doc(9), &thresholds).unwrap().complexity, Complexity::Low);
        assert_eq!(generate_metadata(&doc(10), &thresholds).unwrap().complexity, Complexity::Medium);
        assert_eq!(generate_metadata(&doc(100), &thresholds).unwrap().complexity, Complexity::High);

        let mut deep = Element::circle(0.0, 0.0, 1.0);
        for _ in 0..11 {
            deep = Element::group(vec![deep]);
        }
        let deep = Document::new(ViewBox::new(0.0, 0.0, 10.0, 10.0), vec![deep]);
        assert_eq!(generate_metadata(&deep, &thresholds).unwrap().complexity, Complexity::High);
    }

    #[test]
    fn test_metadata_flags_and_kinds() {
        let doc = Document {
            title: Some("Logo".into()),
            ..Document::new(
                ViewBox::new(0.0, 0.0, 10.0, 10.0),
                vec![
                    Element::group(vec![Element::path("M0 0")]),
                    Element::circle(1.0, 1.0, 1.0).with_attrs(Attributes::with_id("c")),
                ],
            )
        };
        let metadata = generate_metadata(&doc, &Thresholds::default()).unwrap();
        assert!(metadata.has_title);
        assert!(!metadata.has_description);
        assert_eq!(
            metadata.element_kinds.into_iter().collect::<Vec<_>>(),
            vec![ElementKind::Circle, ElementKind::Path, ElementKind::Group]
        );
        assert_eq!(metadata.estimated_size, doc.estimated_size());
        assert_eq!(metadata.content_hash.len(), 64);
    }

    #[test]
    fn test_deep_tree_rejected_before_any_stage() {
        let mut nested = Element::circle(0.0, 0.0, 1.0);
        for _ in 0..20 {
            nested = Element::group(vec![nested]);
        }
        let config = EngineConfig {
            thresholds: Thresholds {
                max_traversal_depth: 16,
                ..Default::default()
            },
            ..Default::default()
        };
        let request = ProcessRequest {
            validate: Some(ValidateSetting::Enabled(false)),
            transform: vec![Transformation::Translate { x: 1.0, y: 1.0 }],
            ..ProcessRequest::new(Document::new(ViewBox::new(0.0, 0.0, 10.0, 10.0), vec![nested]))
        };

        match Pipeline::new(config).process_document(&request) {
            Err(PipelineError::ValidationFailed { errors, warnings }) => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].code, DiagnosticCode::MaxDepthExceeded);
                assert_eq!(errors[0].value.as_deref(), Some("21"));
                assert!(warnings.is_empty());
            }
            other => panic!("expected validation failure, got {other:?}"),
        }
    }

    #[test]
    fn test_validation_failed_display() {
        let err = PipelineError::ValidationFailed {
            errors: vec![Diagnostic::error(DiagnosticCode::MissingReference, "Reference to undefined id 'x'")],
            warnings: vec![],
        };
        assert_eq!(
            err.to_string(),
            "Validation failed: MISSING_REFERENCE: Reference to undefined id 'x'"
        );
    }
}
