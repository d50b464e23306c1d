use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::ids::ObjectId;

/// Field on a course document holding the denormalized rating average.
pub const COURSE_RATING_FIELD: &str = "rating";

/// Catalog collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Courses,
    Units,
    Classes,
}

impl Collection {
    pub fn name(&self) -> &'static str {
        match self {
            Collection::Courses => "courses",
            Collection::Units => "units",
            Collection::Classes => "classes",
        }
    }
}

/// A document type living in one catalog collection.
pub trait CatalogDocument: Serialize + DeserializeOwned {
    const COLLECTION: Collection;

    fn id(&self) -> ObjectId;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: ObjectId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub units: Vec<ObjectId>,
}

impl Course {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: ObjectId::generate(),
            name: name.into(),
            description: description.into(),
            image_url: String::new(),
            rating: 0.0,
            units: Vec::new(),
        }
    }
}

impl CatalogDocument for Course {
    const COLLECTION: Collection = Collection::Courses;

    fn id(&self) -> ObjectId {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    pub id: ObjectId,
    pub course_id: ObjectId,
    pub name: String,
    #[serde(default)]
    pub classes: Vec<ObjectId>,
}

impl Unit {
    pub fn new(course_id: ObjectId, name: impl Into<String>) -> Self {
        Self {
            id: ObjectId::generate(),
            course_id,
            name: name.into(),
            classes: Vec::new(),
        }
    }
}

impl CatalogDocument for Unit {
    const COLLECTION: Collection = Collection::Units;

    fn id(&self) -> ObjectId {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Class {
    pub id: ObjectId,
    pub unit_id: ObjectId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub video_url: String,
    #[serde(default)]
    pub attachment_urls: Vec<String>,
}

impl Class {
    pub fn new(unit_id: ObjectId, name: impl Into<String>) -> Self {
        Self {
            id: ObjectId::generate(),
            unit_id,
            name: name.into(),
            description: String::new(),
            video_url: String::new(),
            attachment_urls: Vec::new(),
        }
    }
}

impl CatalogDocument for Class {
    const COLLECTION: Collection = Collection::Classes;

    fn id(&self) -> ObjectId {
        self.id
    }
}
