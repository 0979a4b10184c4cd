//! Anatomical region table - maps sub-mesh names to display names and colors
//!
//! Two matching schemes are supported:
//! - Explicit tags: a sub-mesh named `frontal:left_03` (or just `frontal`)
//!   resolves to the region whose tag is `frontal`. Unambiguous.
//! - Legacy substring keys: the lower-cased sub-mesh name is searched for each
//!   region key in table order and the first hit wins. Kept for assets exported
//!   before tagging, where names look like `Frontal1_mesh003`.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use crate::color::Rgb;

/// Display name used when a sub-mesh has no name at all
pub const UNKNOWN_NAME: &str = "unknown";

#[derive(Error, Debug)]
pub enum TableError {
    #[error("Failed to parse region table: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Failed to serialize region table: {0}")]
    SerializeError(#[from] toml::ser::Error),
    #[error("Duplicate region key: {0}")]
    DuplicateKey(String),
    #[error("Duplicate region tag: {0}")]
    DuplicateTag(String),
    #[error("Region entry has an empty {0}")]
    EmptyField(&'static str),
}

/// Built-in color scheme. The hover view historically used a darker frontal lobe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Palette {
    #[default]
    Menu,
    Hover,
}

/// A single region in the table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionEntry {
    /// Legacy substring key (e.g., "frontal1")
    pub key: String,
    /// Canonical tag for explicit naming (e.g., "frontal")
    pub tag: String,
    /// Human-readable label shown in the menu
    pub name: String,
    pub color: Rgb,
}

impl RegionEntry {
    fn new(key: &str, tag: &str, name: &str, color: u32) -> Self {
        Self {
            key: key.to_string(),
            tag: tag.to_string(),
            name: name.to_string(),
            color: Rgb::from_hex(color),
        }
    }
}

/// How a classification was reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    Tagged,
    Legacy,
    Unclassified,
}

/// Result of classifying a raw sub-mesh name
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub display_name: String,
    pub color: Rgb,
    /// Tag of the matched region, None when unclassified
    pub tag: Option<String>,
    pub kind: MatchKind,
}

impl Classification {
    fn from_entry(entry: &RegionEntry, kind: MatchKind) -> Self {
        Self {
            display_name: entry.name.clone(),
            color: entry.color,
            tag: Some(entry.tag.clone()),
            kind,
        }
    }

    fn fallback(lowered: String) -> Self {
        let display_name = if lowered.is_empty() {
            UNKNOWN_NAME.to_string()
        } else {
            lowered
        };
        Self {
            display_name,
            color: Rgb::FALLBACK,
            tag: None,
            kind: MatchKind::Unclassified,
        }
    }
}

/// Ordered region table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionTable {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub region: Vec<RegionEntry>,
}

fn default_version() -> String {
    "1.0".to_string()
}

impl Default for RegionTable {
    fn default() -> Self {
        Self::builtin(Palette::Menu)
    }
}

impl RegionTable {
    /// The eight brain regions shipped with the viewer
    pub fn builtin(palette: Palette) -> Self {
        let frontal = match palette {
            Palette::Menu => 0xf66386,
            Palette::Hover => 0x4b6584,
        };

        Self {
            version: default_version(),
            region: vec![
                RegionEntry::new("pitua1", "pituitary", "Pituitary", 0xfc5c65),
                RegionEntry::new("temp1", "temporal", "Temporal Lobe", 0xfed330),
                RegionEntry::new("pariet1", "parietal", "Parietal Lobe", 0x45aaf2),
                RegionEntry::new("occipit1", "occipital", "Occipital Lobe", 0x0a84ff),
                RegionEntry::new("frontal1", "frontal", "Frontal Lobe", frontal),
                RegionEntry::new("stem1", "brainstem", "Brainstem", 0x8854d0),
                RegionEntry::new("corpus1", "corpus_callosum", "Corpus Callosum", 0xffffff),
                RegionEntry::new("cereb1", "cerebellum", "Cerebellum", 0x26de81),
            ],
        }
    }

    /// Parse and validate a region table from a TOML string
    pub fn from_toml(content: &str) -> Result<Self, TableError> {
        let mut table: RegionTable = toml::from_str(content)?;
        table.normalize();
        table.validate()?;
        Ok(table)
    }

    pub fn to_toml(&self) -> Result<String, TableError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Lower-case keys and tags so matching against lower-cased names works
    fn normalize(&mut self) {
        for entry in &mut self.region {
            entry.key = entry.key.trim().to_lowercase();
            entry.tag = entry.tag.trim().to_lowercase();
        }
    }

    /// Reject tables that would make classification ambiguous
    pub fn validate(&self) -> Result<(), TableError> {
        let mut keys = HashSet::new();
        let mut tags = HashSet::new();

        for entry in &self.region {
            if entry.key.is_empty() {
                return Err(TableError::EmptyField("key"));
            }
            if entry.tag.is_empty() {
                return Err(TableError::EmptyField("tag"));
            }
            if entry.name.trim().is_empty() {
                return Err(TableError::EmptyField("name"));
            }
            if !keys.insert(entry.key.as_str()) {
                return Err(TableError::DuplicateKey(entry.key.clone()));
            }
            if !tags.insert(entry.tag.as_str()) {
                return Err(TableError::DuplicateTag(entry.tag.clone()));
            }
        }

        Ok(())
    }

    pub fn entries(&self) -> &[RegionEntry] {
        &self.region
    }

    pub fn len(&self) -> usize {
        self.region.len()
    }

    pub fn is_empty(&self) -> bool {
        self.region.is_empty()
    }

    /// Find a region by its canonical tag
    pub fn find_by_tag(&self, tag: &str) -> Option<&RegionEntry> {
        self.region.iter().find(|e| e.tag.eq_ignore_ascii_case(tag))
    }

    /// First region whose legacy key occurs in the (already lower-cased) name
    pub fn find_legacy(&self, lowered_name: &str) -> Option<&RegionEntry> {
        self.region
            .iter()
            .find(|e| lowered_name.contains(e.key.as_str()))
    }

    /// Classify a raw sub-mesh name
    ///
    /// An explicit `tag:` prefix takes precedence, even over a legacy key in
    /// the rest of the name. Without a recognized prefix the legacy substring
    /// match applies. Unmatched names keep their lower-cased raw name as
    /// display name and get the fallback gray.
    pub fn classify(&self, raw_name: &str) -> Classification {
        let lowered = raw_name.trim().to_lowercase();

        if let Some(entry) = lowered
            .split_once(':')
            .and_then(|(tag, _)| self.find_by_tag(tag.trim()))
        {
            return Classification::from_entry(entry, MatchKind::Tagged);
        }

        if let Some(entry) = self.find_legacy(&lowered) {
            return Classification::from_entry(entry, MatchKind::Legacy);
        }

        Classification::fallback(lowered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frontal_example() {
        let table = RegionTable::builtin(Palette::Menu);
        let c = table.classify("Frontal1_mesh003");
        assert_eq!(c.display_name, "Frontal Lobe");
        assert_eq!(c.color, Rgb::from_hex(0xf66386));
        assert_eq!(c.tag.as_deref(), Some("frontal"));
        assert_eq!(c.kind, MatchKind::Legacy);
    }

    #[test]
    fn test_every_key_classifies() {
        let table = RegionTable::builtin(Palette::Menu);
        for entry in table.entries() {
            for raw in [
                entry.key.clone(),
                format!("{}_mesh", entry.key.to_uppercase()),
                format!("group.{}.part7", entry.key),
            ] {
                let c = table.classify(&raw);
                assert_eq!(c.display_name, entry.name, "raw name {}", raw);
                assert_eq!(c.color, entry.color, "raw name {}", raw);
            }
        }
    }

    #[test]
    fn test_fallback() {
        let table = RegionTable::builtin(Palette::Menu);
        let c = table.classify("Hippocampus_mesh");
        assert_eq!(c.display_name, "hippocampus_mesh");
        assert_eq!(c.color, Rgb::FALLBACK);
        assert_eq!(c.tag, None);
        assert_eq!(c.kind, MatchKind::Unclassified);

        let c = table.classify("");
        assert_eq!(c.display_name, UNKNOWN_NAME);
        assert_eq!(c.color, Rgb::FALLBACK);
    }

    #[test]
    fn test_explicit_tag_wins_over_substring() {
        let table = RegionTable::builtin(Palette::Menu);

        // Contains the legacy key "temp1" but is explicitly tagged cerebellum
        let c = table.classify("cerebellum:temp1_copy");
        assert_eq!(c.display_name, "Cerebellum");
        assert_eq!(c.kind, MatchKind::Tagged);

        let c = table.classify("Corpus_Callosum:part2");
        assert_eq!(c.display_name, "Corpus Callosum");
        assert_eq!(c.kind, MatchKind::Tagged);
    }

    #[test]
    fn test_bare_tag_without_separator_is_not_explicit() {
        let table = RegionTable::builtin(Palette::Menu);

        for raw in ["Frontal", "brainstem", "corpus_callosum"] {
            let c = table.classify(raw);
            assert_eq!(c.kind, MatchKind::Unclassified, "raw name {}", raw);
            assert_eq!(c.display_name, raw.to_lowercase());
            assert_eq!(c.color, Rgb::FALLBACK);
        }

        // Unknown prefix falls through to the legacy match
        let c = table.classify("left:stem1_a");
        assert_eq!(c.display_name, "Brainstem");
        assert_eq!(c.kind, MatchKind::Legacy);
    }

    #[test]
    fn test_first_key_in_table_order_wins() {
        let table = RegionTable::builtin(Palette::Menu);
        // Both "temp1" and "cereb1" occur; temp1 is earlier in the table
        let c = table.classify("cereb1_temp1");
        assert_eq!(c.display_name, "Temporal Lobe");
    }

    #[test]
    fn test_hover_palette() {
        let table = RegionTable::builtin(Palette::Hover);
        let c = table.classify("frontal1");
        assert_eq!(c.color, Rgb::from_hex(0x4b6584));
        // Other regions share the same colors
        let c = table.classify("stem1");
        assert_eq!(c.color, Rgb::from_hex(0x8854d0));
    }

    #[test]
    fn test_from_toml() {
        let toml = r##"
version = "1.0"

[[region]]
key = "HIPPO1"
tag = "Hippocampus"
name = "Hippocampus"
color = "#123456"

[[region]]
key = "amyg1"
tag = "amygdala"
name = "Amygdala"
color = "0xabcdef"
"##;

        let table = RegionTable::from_toml(toml).unwrap();
        assert_eq!(table.len(), 2);

        let c = table.classify("Hippo1_left");
        assert_eq!(c.display_name, "Hippocampus");
        assert_eq!(c.color, Rgb::from_hex(0x123456));

        let c = table.classify("amygdala:right");
        assert_eq!(c.display_name, "Amygdala");
        assert_eq!(c.kind, MatchKind::Tagged);
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let toml = r##"
[[region]]
key = "a1"
tag = "a"
name = "A"
color = "#000000"

[[region]]
key = "A1"
tag = "b"
name = "B"
color = "#000000"
"##;

        assert!(matches!(
            RegionTable::from_toml(toml),
            Err(TableError::DuplicateKey(k)) if k == "a1"
        ));
    }

    #[test]
    fn test_bad_color_rejected() {
        let toml = r##"
[[region]]
key = "a1"
tag = "a"
name = "A"
color = "red"
"##;

        assert!(matches!(
            RegionTable::from_toml(toml),
            Err(TableError::ParseError(_))
        ));
    }

    #[test]
    fn test_builtin_roundtrips_through_toml() {
        let table = RegionTable::builtin(Palette::Hover);
        let text = table.to_toml().unwrap();
        let parsed = RegionTable::from_toml(&text).unwrap();
        assert_eq!(parsed, table);
    }
}
