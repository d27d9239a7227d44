//! Story graph
//!
//! A story is a validated set of nodes. Every node plays one piece of media
//! and may offer choices once its decision window elapses. Choice targets
//! must name another node or the `end` sentinel.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::time::Duration;

use crate::constants::{END_SENTINEL, START_NODE_ID};
use crate::source::SourceReference;

/// Problems found while loading or validating a story
#[derive(Debug, thiserror::Error)]
pub enum StoryError {
    #[error("story has no '{}' node", START_NODE_ID)]
    MissingStart,

    #[error("node id '{0}' is defined more than once")]
    DuplicateNode(String),

    #[error("node '{node}' has a choice targeting unknown node '{target}'")]
    DanglingTarget { node: String, target: String },

    #[error("node '{0}' has a choice with an empty label")]
    EmptyLabel(String),

    #[error("node '{node}' offers label '{label}' more than once")]
    DuplicateLabel { node: String, label: String },

    #[error("node '{0}' has no media")]
    MissingMedia(String),

    #[error("node id cannot be '{}' or empty", END_SENTINEL)]
    ReservedId,

    #[error("failed to parse story: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("failed to read story file: {0}")]
    Io(#[from] std::io::Error),
}

/// One branch offered at a decision point
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub label: String,
    pub target: String,
}

impl Choice {
    pub fn new(label: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            target: target.into(),
        }
    }

    pub fn ends_story(&self) -> bool {
        self.target == END_SENTINEL
    }
}

/// One segment of the story
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NarrativeNode {
    pub id: String,
    pub media: SourceReference,
    /// 0 means the node never forces a decision
    pub decision_window_ms: u64,
    pub choices: Vec<Choice>,
}

impl NarrativeNode {
    pub fn new(id: impl Into<String>, media: SourceReference) -> Self {
        Self {
            id: id.into(),
            media,
            decision_window_ms: 0,
            choices: Vec::new(),
        }
    }

    pub fn with_decision(mut self, window: Duration, choices: Vec<Choice>) -> Self {
        self.decision_window_ms = window.as_millis() as u64;
        self.choices = choices;
        self
    }

    pub fn decision_window(&self) -> Option<Duration> {
        (self.decision_window_ms > 0).then(|| Duration::from_millis(self.decision_window_ms))
    }

    pub fn has_choices(&self) -> bool {
        !self.choices.is_empty()
    }

    /// A node with a window that can actually produce a decision
    pub fn has_decision(&self) -> bool {
        self.decision_window().is_some() && self.has_choices()
    }

    pub fn choice(&self, label: &str) -> Option<&Choice> {
        self.choices.iter().find(|c| c.label == label)
    }
}

/// On-disk shape of a node; media is a plain string
#[derive(Debug, Deserialize)]
struct NodeDoc {
    id: String,
    media: String,
    #[serde(default)]
    decision_window_ms: u64,
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct StoryDoc {
    nodes: Vec<NodeDoc>,
}

/// Validated story graph
#[derive(Debug, Clone)]
pub struct Story {
    nodes: HashMap<String, NarrativeNode>,
}

impl Story {
    /// Build and validate a story from its nodes
    pub fn new(nodes: Vec<NarrativeNode>) -> Result<Self, StoryError> {
        let mut by_id = HashMap::with_capacity(nodes.len());
        for node in nodes {
            if node.id.is_empty() || node.id == END_SENTINEL {
                return Err(StoryError::ReservedId);
            }
            if by_id.contains_key(&node.id) {
                return Err(StoryError::DuplicateNode(node.id));
            }
            by_id.insert(node.id.clone(), node);
        }

        if !by_id.contains_key(START_NODE_ID) {
            return Err(StoryError::MissingStart);
        }

        for node in by_id.values() {
            let mut labels = HashSet::new();
            for choice in &node.choices {
                if choice.label.trim().is_empty() {
                    return Err(StoryError::EmptyLabel(node.id.clone()));
                }
                if !labels.insert(choice.label.as_str()) {
                    return Err(StoryError::DuplicateLabel {
                        node: node.id.clone(),
                        label: choice.label.clone(),
                    });
                }
                if !choice.ends_story() && !by_id.contains_key(&choice.target) {
                    return Err(StoryError::DanglingTarget {
                        node: node.id.clone(),
                        target: choice.target.clone(),
                    });
                }
            }
        }

        Ok(Self { nodes: by_id })
    }

    /// Parse a story from YAML
    ///
    /// ```yaml
    /// nodes:
    ///   - id: start
    ///     media: https://cdn.example.com/start.mp4
    ///     decision_window_ms: 10000
    ///     choices:
    ///       - { label: left, target: forest }
    ///       - { label: right, target: end }
    ///   - id: forest
    ///     media: /media/forest.mp4
    /// ```
    pub fn from_yaml(yaml: &str) -> Result<Self, StoryError> {
        let doc: StoryDoc = serde_yaml::from_str(yaml)?;
        let nodes = doc
            .nodes
            .into_iter()
            .map(|node| {
                let media = node
                    .media
                    .parse()
                    .map_err(|_| StoryError::MissingMedia(node.id.clone()))?;
                Ok(NarrativeNode {
                    id: node.id,
                    media,
                    decision_window_ms: node.decision_window_ms,
                    choices: node.choices,
                })
            })
            .collect::<Result<Vec<_>, StoryError>>()?;
        Self::new(nodes)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, StoryError> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml(&yaml)
    }

    /// Built-in three-node story: start, then forest or castle
    pub fn default_story() -> Self {
        let base = "https://commondatastorage.googleapis.com/gtv-videos-bucket/sample";
        let nodes = vec![
            NarrativeNode::new(
                START_NODE_ID,
                SourceReference::remote(format!("{}/ForBiggerBlazes.mp4", base)),
            )
            .with_decision(
                Duration::from_secs(10),
                vec![Choice::new("left", "forest"), Choice::new("right", "castle")],
            ),
            NarrativeNode::new(
                "forest",
                SourceReference::remote(format!("{}/ForBiggerEscapes.mp4", base)),
            ),
            NarrativeNode::new(
                "castle",
                SourceReference::remote(format!("{}/ForBiggerJoyrides.mp4", base)),
            ),
        ];

        Self {
            nodes: nodes.into_iter().map(|n| (n.id.clone(), n)).collect(),
        }
    }

    pub fn node(&self, id: &str) -> Option<&NarrativeNode> {
        self.nodes.get(id)
    }

    pub fn start(&self) -> &NarrativeNode {
        // Presence of the start node is checked at construction
        &self.nodes[START_NODE_ID]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Every media reference in the story, for prefetching
    pub fn media(&self) -> impl Iterator<Item = &SourceReference> {
        self.nodes.values().map(|n| &n.media)
    }
}
