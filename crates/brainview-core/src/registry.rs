//! Part registry - tracks every loaded sub-mesh and its display state
//!
//! Parts are grouped by display name in first-registration order, which is
//! also the order the menu lists them in. The registry owns visibility flags
//! only; the rendering layer mirrors them onto whatever handles it stored.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use crate::color::Rgb;
use crate::region::{Classification, MatchKind};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("No part group named '{0}'")]
    UnknownGroup(String),
    #[error("No part with id {0}")]
    UnknownPart(PartId),
}

/// Index of a part in registration order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PartId(pub usize);

impl std::fmt::Display for PartId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A registered sub-mesh with its two render handles
#[derive(Debug, Clone)]
pub struct PartEntry<H> {
    pub id: PartId,
    pub raw_name: String,
    pub display_name: String,
    pub color: Rgb,
    pub tag: Option<String>,
    pub kind: MatchKind,
    /// Point-cloud representation
    pub points: H,
    /// Solid representation
    pub solid: H,
    pub points_visible: bool,
    pub solid_visible: bool,
}

/// Parts sharing one display name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartGroup {
    pub name: String,
    pub members: Vec<PartId>,
}

/// Serializable overview of the registry, for logging and the debug panel
#[derive(Debug, Clone, Serialize)]
pub struct RegistrySummary {
    pub part_count: usize,
    pub groups: Vec<GroupSummary>,
    pub selected_group: Option<String>,
    pub hovered_part: Option<PartId>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupSummary {
    pub name: String,
    pub color: Rgb,
    pub tag: Option<String>,
    pub parts: Vec<String>,
}

/// Registry of parts keyed by display name
#[derive(Debug, Clone)]
pub struct PartRegistry<H> {
    parts: Vec<PartEntry<H>>,
    groups: Vec<PartGroup>,
    group_index: HashMap<String, usize>,
    selected: Option<usize>,
    hovered: Option<PartId>,
}

impl<H> Default for PartRegistry<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> PartRegistry<H> {
    pub fn new() -> Self {
        Self {
            parts: Vec::new(),
            groups: Vec::new(),
            group_index: HashMap::new(),
            selected: None,
            hovered: None,
        }
    }

    /// Add a part to its display name's group, creating the group if absent.
    /// New parts start with points shown and the solid hidden.
    pub fn register(
        &mut self,
        raw_name: impl Into<String>,
        classification: Classification,
        points: H,
        solid: H,
    ) -> PartId {
        let id = PartId(self.parts.len());
        let display_name = classification.display_name;

        let group = match self.group_index.get(&display_name) {
            Some(&idx) => idx,
            None => {
                let idx = self.groups.len();
                self.groups.push(PartGroup {
                    name: display_name.clone(),
                    members: Vec::new(),
                });
                self.group_index.insert(display_name.clone(), idx);
                idx
            }
        };
        self.groups[group].members.push(id);

        // A part joining the selected group follows the group's state
        let selected = self.selected == Some(group);

        self.parts.push(PartEntry {
            id,
            raw_name: raw_name.into(),
            display_name,
            color: classification.color,
            tag: classification.tag,
            kind: classification.kind,
            points,
            solid,
            points_visible: !selected,
            solid_visible: selected,
        });

        id
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn parts(&self) -> &[PartEntry<H>] {
        &self.parts
    }

    pub fn get(&self, id: PartId) -> Option<&PartEntry<H>> {
        self.parts.get(id.0)
    }

    pub fn groups(&self) -> &[PartGroup] {
        &self.groups
    }

    pub fn group(&self, name: &str) -> Option<&PartGroup> {
        self.group_index.get(name).map(|&idx| &self.groups[idx])
    }

    /// Display names in menu order
    pub fn group_names(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|g| g.name.as_str())
    }

    /// Members of a group
    pub fn group_parts(&self, name: &str) -> impl Iterator<Item = &PartEntry<H>> {
        self.group(name)
            .into_iter()
            .flat_map(|g| g.members.iter())
            .filter_map(|id| self.parts.get(id.0))
    }

    /// Currently highlighted menu group
    pub fn selected_group(&self) -> Option<&str> {
        self.selected.map(|idx| self.groups[idx].name.as_str())
    }

    /// Part whose solid is shown in hover mode
    pub fn hovered_part(&self) -> Option<PartId> {
        self.hovered
    }

    /// Show the solids of exactly one group and revert every other group to
    /// point display. Unknown names leave the state untouched.
    pub fn toggle(&mut self, display_name: &str) -> Result<(), RegistryError> {
        let Some(&idx) = self.group_index.get(display_name) else {
            return Err(RegistryError::UnknownGroup(display_name.to_string()));
        };

        for (g, group) in self.groups.iter().enumerate() {
            let on = g == idx;
            for id in &group.members {
                let part = &mut self.parts[id.0];
                part.solid_visible = on;
                part.points_visible = !on;
            }
        }

        self.selected = Some(idx);
        self.hovered = None;
        Ok(())
    }

    /// Back to the baseline: every point cloud shown, every solid hidden
    pub fn reset(&mut self) {
        for part in &mut self.parts {
            part.points_visible = true;
            part.solid_visible = false;
        }
        self.selected = None;
        self.hovered = None;
    }

    /// Hide all solids, then show the solid of the first part with this raw
    /// name. Point clouds stay visible.
    pub fn hover_select(&mut self, raw_name: Option<&str>) -> Option<PartId> {
        let id = raw_name.and_then(|name| {
            self.parts
                .iter()
                .find(|p| p.raw_name == name)
                .map(|p| p.id)
        });
        self.apply_hover(id);
        id
    }

    /// Like [`Self::hover_select`] but addressed by id, which stays exact when
    /// several sub-meshes share a raw name.
    pub fn hover_select_part(&mut self, id: Option<PartId>) -> Result<(), RegistryError> {
        if let Some(id) = id {
            if id.0 >= self.parts.len() {
                self.apply_hover(None);
                return Err(RegistryError::UnknownPart(id));
            }
        }
        self.apply_hover(id);
        Ok(())
    }

    fn apply_hover(&mut self, id: Option<PartId>) {
        for part in &mut self.parts {
            part.points_visible = true;
            part.solid_visible = Some(part.id) == id;
        }
        self.selected = None;
        self.hovered = id;
    }

    pub fn visible_solid_count(&self) -> usize {
        self.parts.iter().filter(|p| p.solid_visible).count()
    }

    /// Remove every part, handing back the render handles for cleanup
    pub fn clear(&mut self) -> Vec<H> {
        self.groups.clear();
        self.group_index.clear();
        self.selected = None;
        self.hovered = None;
        self.parts
            .drain(..)
            .flat_map(|p| [p.points, p.solid])
            .collect()
    }

    pub fn summary(&self) -> RegistrySummary {
        let groups = self
            .groups
            .iter()
            .map(|g| {
                let first = g.members.first().and_then(|id| self.parts.get(id.0));
                GroupSummary {
                    name: g.name.clone(),
                    color: first.map(|p| p.color).unwrap_or(Rgb::FALLBACK),
                    tag: first.and_then(|p| p.tag.clone()),
                    parts: g
                        .members
                        .iter()
                        .filter_map(|id| self.parts.get(id.0))
                        .map(|p| p.raw_name.clone())
                        .collect(),
                }
            })
            .collect();

        RegistrySummary {
            part_count: self.parts.len(),
            groups,
            selected_group: self.selected_group().map(str::to_string),
            hovered_part: self.hovered,
        }
    }

    pub fn summary_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.summary())
    }
}
