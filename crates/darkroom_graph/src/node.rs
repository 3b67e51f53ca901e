use serde::{Deserialize, Serialize};
use std::fmt;

/// Operator-chosen node identity. Unique within a pipeline, opaque to the
/// engine beyond equality and display.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(s: impl Into<String>) -> Self {
        NodeId(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for NodeId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(NodeId::new(s))
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        NodeId::new(s)
    }
}

/// The six semantic roles a pipeline node can play, as a closed enum.
///
/// `Branching.condition` and `Termination.classification` are deliberately
/// stored as plain strings: a half-edited draft with a wrong value must
/// still decode and be storable. Conformance against the closed legal sets
/// ([`BranchCondition`], [`Classification`]) is the validator's job and
/// surfaces as an `invalid_property` error, not a decode failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeKind {
    /// Starting point: the camera capture event that produces the base
    /// filename from its two patterns.
    Capture {
        camera_id_pattern: String,
        counter_pattern: String,
    },
    /// An expected file on disk, named by the base filename plus the
    /// suffixes accumulated along the path reaching it.
    File {
        extension: String,
        #[serde(default)]
        optional: bool,
    },
    /// Editing/conversion step that appends a suffix to filenames
    /// downstream of it. An empty suffix is legal (selection only).
    Process { suffix: String },
    /// Multi-image merge (HDR, panorama, focus stack). Continues
    /// downstream only once every listed input path has arrived.
    Pairing { inputs: Vec<NodeId> },
    /// Conditional path selection. `condition` must be one of the
    /// [`BranchCondition`] names.
    Branching { condition: String, value: String },
    /// End of a path: an archival state with a consistency
    /// classification. `classification` must be one of the
    /// [`Classification`] names.
    Termination {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        classification: String,
    },
}

impl NodeKind {
    /// The wire tag for this kind, matching the serde representation.
    pub fn type_name(&self) -> &'static str {
        match self {
            NodeKind::Capture { .. } => "capture",
            NodeKind::File { .. } => "file",
            NodeKind::Process { .. } => "process",
            NodeKind::Pairing { .. } => "pairing",
            NodeKind::Branching { .. } => "branching",
            NodeKind::Termination { .. } => "termination",
        }
    }

    pub fn is_capture(&self) -> bool {
        matches!(self, NodeKind::Capture { .. })
    }

    pub fn is_termination(&self) -> bool {
        matches!(self, NodeKind::Termination { .. })
    }
}

/// Legal values for `Branching.condition`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchCondition {
    HasSuffix,
    HasExtension,
}

impl BranchCondition {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "has_suffix" => Some(BranchCondition::HasSuffix),
            "has_extension" => Some(BranchCondition::HasExtension),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BranchCondition::HasSuffix => "has_suffix",
            BranchCondition::HasExtension => "has_extension",
        }
    }
}

/// Legal values for `Termination.classification`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Classification {
    Consistent,
    Partial,
    Inconsistent,
}

impl Classification {
    pub const ALL: [Classification; 3] = [
        Classification::Consistent,
        Classification::Partial,
        Classification::Inconsistent,
    ];

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "CONSISTENT" => Some(Classification::Consistent),
            "PARTIAL" => Some(Classification::Partial),
            "INCONSISTENT" => Some(Classification::Inconsistent),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Consistent => "CONSISTENT",
            Classification::Partial => "PARTIAL",
            Classification::Inconsistent => "INCONSISTENT",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A node in a pipeline graph: identity plus kind-specific properties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineNode {
    pub id: NodeId,
    #[serde(flatten)]
    pub kind: NodeKind,
}

impl PipelineNode {
    pub fn new(id: impl Into<NodeId>, kind: NodeKind) -> Self {
        PipelineNode {
            id: id.into(),
            kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_parses_exact_names_only() {
        assert_eq!(
            Classification::parse("CONSISTENT"),
            Some(Classification::Consistent)
        );
        assert_eq!(Classification::parse("PARTIAL"), Some(Classification::Partial));
        assert_eq!(
            Classification::parse("INCONSISTENT"),
            Some(Classification::Inconsistent)
        );
        assert_eq!(Classification::parse("MAYBE"), None);
        assert_eq!(Classification::parse("consistent"), None);
    }

    #[test]
    fn branch_condition_parses() {
        assert_eq!(
            BranchCondition::parse("has_suffix"),
            Some(BranchCondition::HasSuffix)
        );
        assert_eq!(
            BranchCondition::parse("has_extension"),
            Some(BranchCondition::HasExtension)
        );
        assert_eq!(BranchCondition::parse("has_name"), None);
    }

    #[test]
    fn node_kind_serde_uses_type_tag() {
        let node = PipelineNode::new(
            "raw",
            NodeKind::File {
                extension: ".dng".to_string(),
                optional: false,
            },
        );
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["id"], "raw");
        assert_eq!(json["type"], "file");
        assert_eq!(json["extension"], ".dng");
    }

    #[test]
    fn file_node_optional_defaults_to_false() {
        let node: PipelineNode =
            serde_json::from_value(serde_json::json!({
                "id": "raw",
                "type": "file",
                "extension": ".cr3"
            }))
            .unwrap();
        assert_eq!(
            node.kind,
            NodeKind::File {
                extension: ".cr3".to_string(),
                optional: false
            }
        );
    }

    #[test]
    fn bad_classification_still_decodes() {
        // Drafts with a wrong classification must be storable; the
        // validator flags them later.
        let node: PipelineNode = serde_json::from_value(serde_json::json!({
            "id": "done",
            "type": "termination",
            "classification": "MAYBE"
        }))
        .unwrap();
        assert_eq!(node.kind.type_name(), "termination");
    }
}
