//! Analyzer-side building blocks.
//!
//! The device parameter table models the named analyzer parameters exposed
//! over the protocol; [`spectrum`] validates spectrum definitions and
//! [`acquisition`] simulates a running acquisition.

pub mod acquisition;
pub mod spectrum;

use serde::Deserialize;
use std::collections::BTreeMap;

/// One named device parameter with its declared value type.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ParameterEntry {
    /// Declared type tag, e.g. `double` or `string`.
    pub value_type: String,
    /// Current value, kept in wire spelling.
    pub value: String,
}

/// Named analyzer parameters, ordered by name.
///
/// Each session works on its own copy, so writes through
/// `SetAnalyzerParameterValue` never leak across connections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct ParameterTable(BTreeMap<String, ParameterEntry>);

impl ParameterTable {
    /// Built-in parameter set used when none is configured.
    pub fn builtin() -> Self {
        let entries = [
            ("Bias Voltage", "double", "90.0"),
            ("Detector Voltage", "double", "1200.0"),
            ("Extractor Voltage", "double", "6000.0"),
            ("Screen Voltage", "double", "3000.0"),
            ("Work Function", "double", "4.5"),
        ];
        Self(
            entries
                .into_iter()
                .map(|(name, value_type, value)| {
                    (
                        name.to_string(),
                        ParameterEntry {
                            value_type: value_type.to_string(),
                            value: value.to_string(),
                        },
                    )
                })
                .collect(),
        )
    }

    /// Parameter names in table order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Looks up a parameter by name.
    pub fn get(&self, name: &str) -> Option<&ParameterEntry> {
        self.0.get(name)
    }

    /// Updates an existing parameter. Unknown names are rejected.
    pub fn set(&mut self, name: &str, value: &str) -> bool {
        match self.0.get_mut(name) {
            Some(entry) => {
                entry.value = value.to_string();
                true
            }
            None => false,
        }
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when the table has no parameters.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
