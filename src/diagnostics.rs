//! Diagnostics - structured findings produced by validation

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticCategory {
    Structural,
    Element,
    Reference,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiagnosticCode {
    // structure and viewBox
    MissingViewbox,
    EmptyDocument,
    TooManyElements,
    MaxDepthExceeded,
    MissingTitleAndDescription,
    InvalidViewboxDimensions,
    VeryLargeViewbox,
    ExtremeAspectRatio,
    // elements
    NonFiniteValue,
    InvalidRadius,
    ZeroRadius,
    InvalidDimensions,
    ZeroSize,
    InvalidCornerRadius,
    ZeroLengthLine,
    EmptyPathData,
    InvalidPathData,
    EmptyText,
    InvalidFontSize,
    EmptyGroup,
    InvalidOpacity,
    InvalidStrokeWidth,
    InvalidId,
    MalformedReference,
    InvisibleLine,
    LongPathData,
    // cross references
    MissingReference,
    UnreferencedId,
    DuplicateId,
}

impl DiagnosticCode {
    pub fn category(self) -> DiagnosticCategory {
        use DiagnosticCode::*;
        match self {
            MissingViewbox | EmptyDocument | TooManyElements | MaxDepthExceeded
            | MissingTitleAndDescription | InvalidViewboxDimensions | VeryLargeViewbox
            | ExtremeAspectRatio => DiagnosticCategory::Structural,
            MissingReference | UnreferencedId | DuplicateId => DiagnosticCategory::Reference,
            _ => DiagnosticCategory::Element,
        }
    }

    pub fn as_str(self) -> &'static str {
        use DiagnosticCode::*;
        match self {
            MissingViewbox => "MISSING_VIEWBOX",
            EmptyDocument => "EMPTY_DOCUMENT",
            TooManyElements => "TOO_MANY_ELEMENTS",
            MaxDepthExceeded => "MAX_DEPTH_EXCEEDED",
            MissingTitleAndDescription => "MISSING_TITLE_AND_DESCRIPTION",
            InvalidViewboxDimensions => "INVALID_VIEWBOX_DIMENSIONS",
            VeryLargeViewbox => "VERY_LARGE_VIEWBOX",
            ExtremeAspectRatio => "EXTREME_ASPECT_RATIO",
            NonFiniteValue => "NON_FINITE_VALUE",
            InvalidRadius => "INVALID_RADIUS",
            ZeroRadius => "ZERO_RADIUS",
            InvalidDimensions => "INVALID_DIMENSIONS",
            ZeroSize => "ZERO_SIZE",
            InvalidCornerRadius => "INVALID_CORNER_RADIUS",
            ZeroLengthLine => "ZERO_LENGTH_LINE",
            EmptyPathData => "EMPTY_PATH_DATA",
            InvalidPathData => "INVALID_PATH_DATA",
            EmptyText => "EMPTY_TEXT",
            InvalidFontSize => "INVALID_FONT_SIZE",
            EmptyGroup => "EMPTY_GROUP",
            InvalidOpacity => "INVALID_OPACITY",
            InvalidStrokeWidth => "INVALID_STROKE_WIDTH",
            InvalidId => "INVALID_ID",
            MalformedReference => "MALFORMED_REFERENCE",
            InvisibleLine => "INVISIBLE_LINE",
            LongPathData => "LONG_PATH_DATA",
            MissingReference => "MISSING_REFERENCE",
            UnreferencedId => "UNREFERENCED_ID",
            DuplicateId => "DUPLICATE_ID",
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Diagnostic {
    pub code: DiagnosticCode,
    pub severity: Severity,
    pub message: String,
    /// The offending value, e.g. the dangling id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Position path of the element, absent for document-level findings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub remediation: Vec<String>,
}

impl Diagnostic {
    pub fn error(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::new(code, Severity::Error, message)
    }

    pub fn warning(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::new(code, Severity::Warning, message)
    }

    pub fn info(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::new(code, Severity::Info, message)
    }

    fn new(code: DiagnosticCode, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            code,
            severity,
            message: message.into(),
            value: None,
            element: None,
            remediation: vec![],
        }
    }

    pub fn with_value(mut self, value: impl ToString) -> Self {
        self.value = Some(value.to_string());
        self
    }

    pub fn at(mut self, element: impl Into<String>) -> Self {
        self.element = Some(element.into());
        self
    }

    pub fn remedy(mut self, remediation: impl Into<String>) -> Self {
        self.remediation.push(remediation.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn is_element_level(&self) -> bool {
        self.element.is_some()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)?;
        if let Some(element) = &self.element {
            write!(f, " (at {element})")?;
        }
        Ok(())
    }
}
