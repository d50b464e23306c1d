//! Graph node shapes shared by the coordinators and the migration.

use serde_json::json;

use lectern_core::{Class, Course, NodeRef, Properties, UserProfile};

fn object(value: serde_json::Value) -> Properties {
    match value {
        serde_json::Value::Object(map) => map,
        _ => Properties::new(),
    }
}

/// User node. Carries name and email only, never credentials.
pub(crate) fn user_node(profile: &UserProfile) -> (NodeRef, Properties) {
    (
        NodeRef::user(&profile.email),
        object(json!({ "email": profile.email, "name": profile.name })),
    )
}

pub(crate) fn course_node(course: &Course) -> (NodeRef, Properties) {
    (
        NodeRef::course(course.id),
        object(json!({ "name": course.name, "description": course.description })),
    )
}

pub(crate) fn class_node(class: &Class) -> (NodeRef, Properties) {
    (
        NodeRef::class(class.id),
        object(json!({ "name": class.name })),
    )
}
