//! # Edit Requests
//!
//! Serializable description of what the canvas wants changed on one
//! element, keyed by the element's identity.
//!
//! ```json
//! {
//!   "oid": "a1b2c3d",
//!   "attributes": { "className": "p-4" },
//!   "overrideClasses": false,
//!   "textContent": "Hello",
//!   "structureChanges": [
//!     { "type": "move", "originalIndex": 0, "targetIndex": 2 }
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::errors::TransformError;

/// Requested changes for the element carrying `oid`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditRequest {
    pub oid: String,

    #[serde(default)]
    pub attributes: Option<AttributeEdits>,

    /// Replace the class list instead of merging into it
    #[serde(default)]
    pub override_classes: bool,

    /// `None` (or JSON `null`) leaves the text untouched
    #[serde(default)]
    pub text_content: Option<String>,

    #[serde(default)]
    pub structure_changes: Vec<StructureAction>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeEdits {
    #[serde(default)]
    pub class_name: Option<String>,
}

/// Structural operators on the target element's child list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum StructureAction {
    Move(MoveAction),
    Insert(InsertAction),
    Remove(RemoveAction),
    Group(GroupAction),
    Ungroup(UngroupAction),
    InsertImage(ImageAction),
    RemoveImage,
}

impl StructureAction {
    pub fn name(&self) -> &'static str {
        match self {
            StructureAction::Move(_) => "move",
            StructureAction::Insert(_) => "insert",
            StructureAction::Remove(_) => "remove",
            StructureAction::Group(_) => "group",
            StructureAction::Ungroup(_) => "ungroup",
            StructureAction::InsertImage(_) => "insert-image",
            StructureAction::RemoveImage => "remove-image",
        }
    }
}

/// Position in the filtered (element and fragment only) child list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TargetPosition {
    Append,
    Prepend,
    Index { index: i64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveAction {
    pub original_index: usize,
    /// Final index of the moved element among its siblings
    pub target_index: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertAction {
    #[serde(default)]
    pub target_position: Option<TargetPosition>,
    #[serde(default)]
    pub element: ActionElement,
    /// Literal markup to insert instead of synthesizing from `element`
    #[serde(default)]
    pub code_fragment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveAction {
    #[serde(default)]
    pub target_position: Option<TargetPosition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupTarget {
    pub index: usize,
    pub uuid: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupAction {
    pub targets: Vec<GroupTarget>,
    pub container: ActionElement,
    #[serde(default)]
    pub target_position: Option<TargetPosition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UngroupAction {
    pub container_position: TargetPosition,
    pub targets: Vec<GroupTarget>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageAction {
    pub url: String,
}

/// Element to synthesize for inserts and group containers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionElement {
    #[serde(default)]
    pub tag_name: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub children: Vec<ActionElement>,
    #[serde(default)]
    pub text_content: Option<String>,
    /// Identity to use when it is not already taken in the file
    #[serde(default)]
    pub oid: Option<String>,
}

impl ActionElement {
    pub fn new(tag_name: impl Into<String>) -> Self {
        Self {
            tag_name: tag_name.into(),
            ..Default::default()
        }
    }
}

/// Parse a JSON array of edit requests
pub fn parse_requests(json: &str) -> Result<Vec<EditRequest>, TransformError> {
    Ok(serde_json::from_str(json)?)
}
