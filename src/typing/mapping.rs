//! Ordered keyword → family label mapping

use once_cell::sync::Lazy;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::Path;
use tracing::{debug, info, warn};

/// Built-in mapping keyed on fragments of model names.
///
/// Order matters: the first matching fragment wins, so `cas12` shadows the
/// `cas12a`..`cas12c` subtypes and `cas10` must come before `cas1`.
const DEFAULT_ENTRIES: &[(&str, &str)] = &[
    // Type I
    ("cas3", "Type I (Cas3)"),
    ("cas8", "Type I"),
    ("cas5", "Type I"),
    ("cas6", "Type I"),
    ("cas7", "Type I"),
    ("cse1", "Type I-E"),
    ("cse2", "Type I-E"),
    ("csy1", "Type I-F"),
    ("csy2", "Type I-F"),
    ("csy3", "Type I-F"),
    ("csa5", "Type I-A"),
    ("csm", "Type III-A"),
    // Type II
    ("cas9", "Type II (Cas9)"),
    ("csn2", "Type II-A"),
    // Type III
    ("cas10", "Type III (Cas10)"),
    ("cmr", "Type III-B"),
    ("csx", "Type III"),
    // Type IV
    ("csf", "Type IV"),
    // Type V
    ("cas12", "Type V (Cas12)"),
    ("cas12a", "Type V-A"),
    ("cas12b", "Type V-B"),
    ("cas12c", "Type V-C"),
    // Type VI
    ("cas13", "Type VI (Cas13)"),
    ("cas13a", "Type VI-A"),
    ("cas13b", "Type VI-B"),
    ("cas13c", "Type VI-C"),
    ("cas13d", "Type VI-D"),
    // Adaptation module
    ("cas1", "Adaptation"),
    ("cas2", "Adaptation"),
    ("cas4", "Adaptation"),
    ("dinG", "Adaptation"),
];

static DEFAULT_MAPPING: Lazy<TypeMapping> =
    Lazy::new(|| TypeMapping::from_pairs(DEFAULT_ENTRIES.iter().copied()));

/// Label used when no keyword matches
pub const UNKNOWN_LABEL: &str = "Unknown";

#[derive(Debug, Clone, PartialEq)]
struct Entry {
    keyword: String,
    needle: String,
    label: String,
}

/// Keyword fragments mapped to family labels, in insertion order
#[derive(Debug, Clone, PartialEq)]
pub struct TypeMapping {
    entries: Vec<Entry>,
}

impl TypeMapping {
    /// Build a mapping from ordered pairs. A repeated keyword replaces the
    /// earlier label but keeps its original position.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut mapping = Self {
            entries: Vec::new(),
        };
        for (keyword, label) in pairs {
            mapping.insert(keyword, label);
        }
        mapping
    }

    /// Append a keyword, or relabel it if already present
    pub fn insert(&mut self, keyword: impl Into<String>, label: impl Into<String>) {
        let keyword = keyword.into();
        let label = label.into();
        if let Some(existing) = self.entries.iter_mut().find(|e| e.keyword == keyword) {
            existing.label = label;
            return;
        }
        self.entries.push(Entry {
            needle: keyword.to_lowercase(),
            keyword,
            label,
        });
    }

    /// Load a mapping from a JSON or YAML file, falling back to the built-in
    /// default when the file is absent, unreadable or malformed.
    pub fn load(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            debug!("No type mapping file configured, using built-in mapping");
            return Self::default();
        };

        if !path.exists() {
            info!(
                "Type mapping file {} not found, using built-in mapping",
                path.display()
            );
            return Self::default();
        }

        match Self::from_file(path) {
            Ok(mapping) => {
                if mapping.is_empty() {
                    warn!("Type mapping file {} has no entries", path.display());
                }
                info!(
                    "Loaded {} type mapping entries from {}",
                    mapping.len(),
                    path.display()
                );
                mapping
            }
            Err(e) => {
                warn!(
                    "Could not load type mapping from {}: {}, using built-in mapping",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Strictly parse a mapping file
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let is_yaml = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("yml") || e.eq_ignore_ascii_case("yaml"))
            .unwrap_or(false);

        let mapping = if is_yaml {
            serde_yaml::from_str(&content)?
        } else {
            serde_json::from_str(&content)?
        };
        Ok(mapping)
    }

    /// Label of the first keyword contained in `name`, case-insensitively
    pub fn lookup(&self, name: &str) -> Option<&str> {
        let name = name.to_lowercase();
        self.entries
            .iter()
            .find(|e| name.contains(&e.needle))
            .map(|e| e.label.as_str())
    }

    /// Label for `name`, or [`UNKNOWN_LABEL`]
    pub fn label_for(&self, name: &str) -> &str {
        self.lookup(name).unwrap_or(UNKNOWN_LABEL)
    }

    /// Iterate `(keyword, label)` pairs in match order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|e| (e.keyword.as_str(), e.label.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for TypeMapping {
    fn default() -> Self {
        DEFAULT_MAPPING.clone()
    }
}

impl Serialize for TypeMapping {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (keyword, label) in self.iter() {
            map.serialize_entry(keyword, label)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for TypeMapping {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct MappingVisitor;

        impl<'de> Visitor<'de> for MappingVisitor {
            type Value = TypeMapping;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of keyword fragments to family labels")
            }

            // Entries arrive in document order
            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut mapping = TypeMapping {
                    entries: Vec::new(),
                };
                while let Some((keyword, label)) = access.next_entry::<String, String>()? {
                    mapping.insert(keyword, label);
                }
                Ok(mapping)
            }
        }

        deserializer.deserialize_map(MappingVisitor)
    }
}
