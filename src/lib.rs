//! SvgForge Core - SVG document engine
//!
//! Documents are built programmatically and pass through three engines:
//! 1. Transformation - scale, translate, rotate, flip
//! 2. Optimization - drop empty groups and default styles, round coordinates
//! 3. Validation - structure, references, per-element rules, scored reports
//!
//! [`Pipeline`] runs them in that order. Every pass works on a copy and
//! returns a new document.

pub mod config;
pub mod diagnostics;
pub mod document;
pub mod error;
pub mod hashing;
pub mod optimize;
pub mod pipeline;
pub mod references;
pub mod transform;
pub mod validation;

pub use config::{EngineConfig, Thresholds};
pub use diagnostics::{Diagnostic, DiagnosticCode, Severity};
pub use document::{Attributes, BoundingBox, Document, Element, ElementKind, Style, ViewBox};
pub use error::{ConfigurationError, RenderError};
pub use hashing::{canonical_json, compute_content_hash, compute_job_hash};
pub use optimize::{OptimizationOptions, OptimizationPreset, OptimizationResult, Optimizer};
pub use pipeline::{
    generate_metadata, DocumentMetadata, Pipeline, PipelineError, ProcessRequest, ProcessedDocument,
    Renderer,
};
pub use references::ReferenceGraph;
pub use transform::{MultiTransformResult, TransformResult, Transformation, Transformer};
pub use validation::{
    DocumentValidator, ScoredValidation, ValidationOptions, ValidationPreset, ValidationReport,
    Validator,
};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
