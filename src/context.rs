//! Session context — the snapshot of CAD state the host add-in sends with
//! every question, and its compact, prompt-safe form.
//!
//! The host serializes the snapshot as JSON (camelCase keys):
//! ```text
//! {
//!   "document":  {"name": "Bracket v3"},
//!   "workspace": {"id": "FusionSolidEnvironment", "name": "Design"},
//!   "selection": {"count": 2, "types": {"Fusion::BRepEdge": 2}, "items": [...]},
//!   "design":    {"rootComponent": "Bracket", "bodies": 1, ...} | {"available": false},
//!   "screenshot": {"path": "/tmp/viewport.png", "base64": "iVBOR..."}   // optional
//! }
//! ```
//! Nothing here mutates the snapshot.

use std::{fs, path::PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

/// At most this many selected entities are described individually; the
/// rest only contribute to the type histogram.
pub const MAX_SELECTION_ITEMS: usize = 10;

pub const NOTHING_SELECTED: &str = "You don’t have anything selected yet.";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionContext {
    #[serde(default, deserialize_with = "null_as_default")]
    pub document: DocumentInfo,
    #[serde(default, deserialize_with = "null_as_default")]
    pub workspace: WorkspaceInfo,
    #[serde(default, deserialize_with = "null_as_default")]
    pub selection: SelectionSummary,
    #[serde(default, deserialize_with = "null_as_default")]
    pub design: DesignSummary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<Screenshot>,
}

impl SessionContext {
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

/// The host writes `null` for sections it could not read; treat those like
/// a missing key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentInfo {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceInfo {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

// ── Selection ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectionSummary {
    #[serde(default, deserialize_with = "null_as_default")]
    pub count: usize,
    #[serde(default, deserialize_with = "null_as_default")]
    pub types: TypeHistogram,
    #[serde(default, deserialize_with = "null_as_default")]
    pub items: Vec<SelectedItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedItem {
    #[serde(rename = "objectType")]
    pub object_type: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl SelectionSummary {
    /// Summarise a selection the way the host capture does: every entity is
    /// tallied by type, only the first [`MAX_SELECTION_ITEMS`] get a stub.
    pub fn from_entities<I, S>(entities: I) -> Self
    where
        I: IntoIterator<Item = (S, Option<String>)>,
        S: Into<String>,
    {
        let mut summary = SelectionSummary::default();
        for (object_type, name) in entities {
            let object_type = object_type.into();
            summary.types.add(&object_type);
            if summary.items.len() < MAX_SELECTION_ITEMS {
                summary.items.push(SelectedItem { object_type, name });
            }
            summary.count += 1;
        }
        summary
    }
}

/// Selected-entity counts keyed by namespaced type id (`Fusion::BRepEdge`),
/// in first-seen order. Serialized as a JSON object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct TypeHistogram(Vec<(String, usize)>);

impl TypeHistogram {
    pub fn add(&mut self, object_type: &str) {
        match self.0.iter_mut().find(|(t, _)| t == object_type) {
            Some((_, n)) => *n += 1,
            None => self.0.push((object_type.to_string(), 1)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.0.iter().map(|(t, n)| (t.as_str(), *n))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, usize)> for TypeHistogram {
    fn from_iter<I: IntoIterator<Item = (S, usize)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(t, n)| (t.into(), n)).collect())
    }
}

impl TryFrom<Map<String, Value>> for TypeHistogram {
    type Error = String;

    fn try_from(map: Map<String, Value>) -> Result<Self, Self::Error> {
        map.into_iter()
            .map(|(t, v)| match v.as_u64() {
                Some(n) => Ok((t, n as usize)),
                None => Err(format!("type count for '{t}' must be a non-negative integer, got {v}")),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(TypeHistogram)
    }
}

impl From<TypeHistogram> for Map<String, Value> {
    fn from(histogram: TypeHistogram) -> Self {
        histogram.0.into_iter().map(|(t, n)| (t, Value::from(n))).collect()
    }
}

/// Last `::` segment of a namespaced type id: `Fusion::BRepEdge` → `BRepEdge`.
pub fn short_type_name(object_type: &str) -> &str {
    object_type.rsplit("::").next().unwrap_or(object_type)
}

/// One human-readable line about the selection.
pub fn summarise_selection(selection: &SelectionSummary) -> String {
    if selection.count == 0 {
        return NOTHING_SELECTED.to_string();
    }

    let mut summary = format!("You have {} item(s) selected.", selection.count);
    if !selection.types.is_empty() {
        let bits: Vec<String> = selection
            .types
            .iter()
            .map(|(t, n)| format!("{n}× {}", short_type_name(t)))
            .collect();
        summary.push_str(" Types: ");
        summary.push_str(&bits.join(", "));
    }
    summary
}

// ── Design ────────────────────────────────────────────────────────────────────

/// Root-component counts, or `Unavailable` when the active product is not a
/// design (drawing, CAM setup…). Unavailable serializes as `{"available": false}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawDesign", into = "RawDesign")]
pub enum DesignSummary {
    Available(DesignCounts),
    #[default]
    Unavailable,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DesignCounts {
    pub root_component: Option<String>,
    pub bodies: usize,
    pub sketches: usize,
    pub occurrences: usize,
    pub components: usize,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDesign {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    available: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    root_component: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    bodies: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sketches: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    occurrences: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    components: Option<usize>,
}

impl From<RawDesign> for DesignSummary {
    fn from(raw: RawDesign) -> Self {
        let has_counts = raw.root_component.is_some()
            || raw.bodies.is_some()
            || raw.sketches.is_some()
            || raw.occurrences.is_some()
            || raw.components.is_some();
        if raw.available == Some(false) || !has_counts {
            return DesignSummary::Unavailable;
        }
        DesignSummary::Available(DesignCounts {
            root_component: raw.root_component,
            bodies: raw.bodies.unwrap_or(0),
            sketches: raw.sketches.unwrap_or(0),
            occurrences: raw.occurrences.unwrap_or(0),
            components: raw.components.unwrap_or(0),
        })
    }
}

impl From<DesignSummary> for RawDesign {
    fn from(design: DesignSummary) -> Self {
        match design {
            DesignSummary::Unavailable => RawDesign {
                available: Some(false),
                root_component: None,
                bodies: None,
                sketches: None,
                occurrences: None,
                components: None,
            },
            DesignSummary::Available(c) => RawDesign {
                available: None,
                root_component: c.root_component,
                bodies: Some(c.bodies),
                sketches: Some(c.sketches),
                occurrences: Some(c.occurrences),
                components: Some(c.components),
            },
        }
    }
}

// ── Screenshot ────────────────────────────────────────────────────────────────

/// Viewport capture descriptor. The image itself never goes into the text
/// payload; it is attached to the request separately.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Screenshot {
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base64: Option<String>,
}

impl Screenshot {
    /// PNG bytes from the embedded base64, else from the file at `path`.
    /// Any failure means no image; the question still goes out as text.
    pub fn image_bytes(&self) -> Option<Vec<u8>> {
        if let Some(encoded) = self.base64.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            return match BASE64_STANDARD.decode(encoded) {
                Ok(bytes) => Some(bytes),
                Err(e) => {
                    warn!(error = %e, "screenshot base64 is invalid — sending without image");
                    None
                }
            };
        }

        let path = self.path.as_ref()?;
        match fs::read(path) {
            Ok(bytes) if !bytes.is_empty() => Some(bytes),
            Ok(_) => None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot read screenshot — sending without image");
                None
            }
        }
    }
}

// ── Compact payload ───────────────────────────────────────────────────────────

/// The four fields of the session that are safe to embed in a prompt.
#[derive(Debug, Clone, Serialize)]
pub struct CompactContext<'a> {
    pub document: &'a DocumentInfo,
    pub workspace: &'a WorkspaceInfo,
    pub selection: &'a SelectionSummary,
    pub design: &'a DesignSummary,
}

impl CompactContext<'_> {
    /// Indented JSON for the prompt body.
    pub fn to_prompt_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| {
            warn!(error = %e, "context serialization failed");
            "{}".to_string()
        })
    }
}

/// Keep document, workspace, selection and design; drop everything else.
pub fn normalize(ctx: &SessionContext) -> CompactContext<'_> {
    CompactContext {
        document: &ctx.document,
        workspace: &ctx.workspace,
        selection: &ctx.selection,
        design: &ctx.design,
    }
}
