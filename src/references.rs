//! Reference Graph - defined vs. referenced identifiers
//!
//! Rebuilt from the tree on every run. Nothing here is cached.

use std::collections::BTreeSet;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::document::Document;

lazy_static! {
    /// Matches `url(#id)` references in clip-path and mask values, quoted or not
    static ref URL_REFERENCE: Regex =
        Regex::new(r#"url\(\s*['"]?#([^)'"\s]+)['"]?\s*\)"#).unwrap();
}

/// Identifiers referenced by an attribute value, in order of appearance
pub fn extract_references(value: &str) -> Vec<String> {
    URL_REFERENCE
        .captures_iter(value)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// True when the whole value is a single `url(#id)` reference
pub fn is_url_reference(value: &str) -> bool {
    URL_REFERENCE
        .find(value.trim())
        .is_some_and(|m| m.start() == 0 && m.end() == value.trim().len())
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceGraph {
    pub defined_ids: BTreeSet<String>,
    pub referenced_ids: BTreeSet<String>,
    /// Ids defined more than once
    pub duplicate_ids: BTreeSet<String>,
}

impl ReferenceGraph {
    pub fn build(document: &Document) -> Self {
        let mut graph = Self::default();

        document.walk(&mut |element, _| {
            let attrs = element.attrs();
            if let Some(id) = attrs.id.as_deref() {
                if !graph.defined_ids.insert(id.to_string()) {
                    graph.duplicate_ids.insert(id.to_string());
                }
            }
            for (_, value) in attrs.reference_values() {
                graph.referenced_ids.extend(extract_references(value));
            }
        });

        graph
    }

    /// Referenced ids that nothing defines
    pub fn dangling(&self) -> impl Iterator<Item = &String> {
        self.referenced_ids.difference(&self.defined_ids)
    }

    /// Defined ids that nothing references
    pub fn unreferenced(&self) -> impl Iterator<Item = &String> {
        self.defined_ids.difference(&self.referenced_ids)
    }

    pub fn is_referenced(&self, id: &str) -> bool {
        self.referenced_ids.contains(id)
    }

    /// Every reference resolves and no id is defined twice
    pub fn is_consistent(&self) -> bool {
        self.duplicate_ids.is_empty() && self.dangling().next().is_none()
    }
}
