use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ids::ObjectId;

/// Free-form property bag carried by graph nodes and edges.
pub type Properties = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NodeLabel {
    User,
    Course,
    Class,
    Comment,
}

impl NodeLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeLabel::User => "User",
            NodeLabel::Course => "Course",
            NodeLabel::Class => "Class",
            NodeLabel::Comment => "Comment",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EdgeType {
    /// User -> Course, carries the rating value.
    Rated,
    /// User -> Comment
    Commented,
    /// Comment -> Course
    BelongsTo,
    /// Course -> Class
    Contains,
    /// User -> Course, carries a free text review.
    Reviewed,
}

impl EdgeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeType::Rated => "Rated",
            EdgeType::Commented => "Commented",
            EdgeType::BelongsTo => "BelongsTo",
            EdgeType::Contains => "Contains",
            EdgeType::Reviewed => "Reviewed",
        }
    }
}

/// Natural-key reference to a node: its label plus the key it is unique by.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeRef {
    pub label: NodeLabel,
    pub key: String,
}

impl NodeRef {
    pub fn new(label: NodeLabel, key: impl Into<String>) -> Self {
        Self {
            label,
            key: key.into(),
        }
    }

    pub fn user(email: &str) -> Self {
        Self::new(NodeLabel::User, email)
    }

    pub fn course(id: ObjectId) -> Self {
        Self::new(NodeLabel::Course, id.to_hex())
    }

    pub fn class(id: ObjectId) -> Self {
        Self::new(NodeLabel::Class, id.to_hex())
    }

    pub fn comment(id: Uuid) -> Self {
        Self::new(NodeLabel::Comment, id.to_string())
    }
}

impl std::fmt::Display for NodeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}:{})", self.label.as_str(), self.key)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeRef,
    pub props: Properties,
}

/// A typed edge. At most one edge exists per (from, to, edge_type).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub edge_type: EdgeType,
    pub from: NodeRef,
    pub to: NodeRef,
    pub props: Properties,
}

/// Aggregate functions over a numeric edge property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
    Average,
    Sum,
    Count,
}

impl Aggregation {
    /// Apply to the collected values. Average of nothing is `None`.
    pub fn apply(&self, values: &[f64]) -> Option<f64> {
        match self {
            Aggregation::Count => Some(values.len() as f64),
            Aggregation::Sum => Some(values.iter().sum()),
            Aggregation::Average if values.is_empty() => None,
            Aggregation::Average => Some(values.iter().sum::<f64>() / values.len() as f64),
        }
    }
}

/// Convert a serializable record into node/edge properties.
pub fn to_properties<T: Serialize>(value: &T) -> Result<Properties, serde_json::Error> {
    match serde_json::to_value(value)? {
        serde_json::Value::Object(map) => Ok(map),
        other => {
            let mut map = Properties::new();
            map.insert("value".to_string(), other);
            Ok(map)
        }
    }
}

/// Decode node/edge properties back into a record.
pub fn from_properties<T: serde::de::DeserializeOwned>(
    props: &Properties,
) -> Result<T, serde_json::Error> {
    serde_json::from_value(serde_json::Value::Object(props.clone()))
}

/// Properties of a `Rated` edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub value: f64,
    pub rated_at: DateTime<Utc>,
    /// Denormalized rater name.
    pub name: String,
}

/// A comment node attached to a class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub class_id: ObjectId,
    /// Author email.
    pub author: String,
    pub posted_at: DateTime<Utc>,
    pub title: String,
    pub body: String,
    pub likes: u32,
    pub dislikes: u32,
}

/// Properties of a `Reviewed` edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewEdge {
    pub text: String,
    pub reviewed_at: DateTime<Utc>,
}

/// A course review as listed for its author.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseReview {
    pub course_id: ObjectId,
    pub course_name: String,
    pub text: String,
    pub reviewed_at: DateTime<Utc>,
}
