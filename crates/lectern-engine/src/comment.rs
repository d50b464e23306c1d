use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use lectern_core::graph::{from_properties, to_properties};
use lectern_core::{
    CatalogStore, Class, Comment, CoreError, Course, CourseReview, Credentials, EdgeType,
    EntityKind, GraphStore, NodeRef, ObjectId, ProfileStore, Properties, ReviewEdge,
    StorageError, Unit, Validator,
};

use crate::nodes::{course_node, user_node};
use crate::session::authenticate_strict;

/// Comments on classes and free-text course reviews, both kept in the graph.
pub struct CommentCoordinator<P, C, G>
where
    P: ProfileStore,
    C: CatalogStore,
    G: GraphStore,
{
    profiles: Arc<P>,
    catalog: Arc<C>,
    graph: Arc<G>,
}

impl<P, C, G> CommentCoordinator<P, C, G>
where
    P: ProfileStore,
    C: CatalogStore,
    G: GraphStore,
{
    pub fn new(profiles: Arc<P>, catalog: Arc<C>, graph: Arc<G>) -> Self {
        Self {
            profiles,
            catalog,
            graph,
        }
    }

    /// Post a comment on a class.
    ///
    /// The Class node must already exist in the graph. The owning Course node
    /// and its `Contains` edge are created alongside the comment if missing.
    pub fn create_comment(
        &self,
        class_id: &str,
        credentials: &Credentials,
        title: &str,
        body: &str,
    ) -> Result<Comment, CoreError> {
        Validator::validate_non_empty("title", title)?;
        Validator::validate_non_empty("body", body)?;
        let class_id = Validator::validate_id(class_id)?;

        let profile = authenticate_strict(&*self.profiles, credentials)?;
        let course = self.owning_course(class_id)?;

        let comment = Comment {
            id: Uuid::new_v4(),
            class_id,
            author: profile.email.clone(),
            posted_at: Utc::now(),
            title: title.to_string(),
            body: body.to_string(),
            likes: 0,
            dislikes: 0,
        };
        let class_ref = NodeRef::class(class_id);
        let comment_ref = NodeRef::comment(comment.id);
        let (course_ref, course_props) = course_node(&course);
        let (user_ref, user_props) = user_node(&profile);

        self.graph.write(|g| {
            if !g.node_exists(&class_ref)? {
                return Err(CoreError::not_found(EntityKind::Class, class_id));
            }
            g.create_node(&course_ref, course_props)?;
            g.merge_edge(&course_ref, &class_ref, EdgeType::Contains, Properties::new())?;
            g.create_node(&user_ref, user_props)?;

            let props = to_properties(&comment).map_err(StorageError::from)?;
            g.create_node(&comment_ref, props)?;
            g.merge_edge(&user_ref, &comment_ref, EdgeType::Commented, Properties::new())?;
            g.merge_edge(&comment_ref, &course_ref, EdgeType::BelongsTo, Properties::new())?;
            Ok::<_, CoreError>(())
        })?;

        tracing::info!(
            "{} commented on class {} ({})",
            comment.author,
            class_id,
            comment.id
        );
        Ok(comment)
    }

    /// Comments on a class, newest first. An unknown class has none.
    pub fn list_comments(&self, class_id: &str) -> Result<Vec<Comment>, CoreError> {
        let class_id = Validator::validate_id(class_id)?;
        let class_ref = NodeRef::class(class_id);

        let mut comments = self.graph.read(|g| {
            let mut found = Vec::new();
            for contains in g.edges_into(EdgeType::Contains, &class_ref)? {
                for belongs in g.edges_into(EdgeType::BelongsTo, &contains.from)? {
                    let Some(props) = g.node(&belongs.from)? else {
                        continue;
                    };
                    let comment: Comment = from_properties(&props).map_err(StorageError::from)?;
                    // A course holds many classes; keep only this one's comments.
                    if comment.class_id == class_id {
                        found.push(comment);
                    }
                }
            }
            Ok::<_, CoreError>(found)
        })?;

        comments.sort_by(|a, b| b.posted_at.cmp(&a.posted_at));
        Ok(comments)
    }

    /// Attach a free-text review to a course. A second review replaces the first.
    pub fn create_course_review(
        &self,
        course_id: &str,
        credentials: &Credentials,
        text: &str,
    ) -> Result<CourseReview, CoreError> {
        Validator::validate_review(text)?;
        let course_id = Validator::validate_id(course_id)?;

        let profile = authenticate_strict(&*self.profiles, credentials)?;
        let course: Course = self
            .catalog
            .find_by_id(course_id)?
            .ok_or_else(|| CoreError::not_found(EntityKind::Course, course_id))?;

        let review = ReviewEdge {
            text: text.trim().to_string(),
            reviewed_at: Utc::now(),
        };
        let (course_ref, course_props) = course_node(&course);
        let (user_ref, user_props) = user_node(&profile);

        self.graph.write(|g| {
            g.create_node(&course_ref, course_props)?;
            g.create_node(&user_ref, user_props)?;
            let props = to_properties(&review).map_err(StorageError::from)?;
            g.merge_edge(&user_ref, &course_ref, EdgeType::Reviewed, props)?;
            Ok::<_, CoreError>(())
        })?;

        tracing::info!("{} reviewed course {}", profile.email, course_id);
        Ok(CourseReview {
            course_id,
            course_name: course.name,
            text: review.text,
            reviewed_at: review.reviewed_at,
        })
    }

    /// Every review written by a user, newest first.
    pub fn reviews_by_user(&self, email: &str) -> Result<Vec<CourseReview>, CoreError> {
        Validator::validate_email(email)?;
        let user_ref = NodeRef::user(email);

        let mut reviews = self.graph.read(|g| {
            let mut found = Vec::new();
            for edge in g.edges_from(&user_ref, EdgeType::Reviewed)? {
                let review: ReviewEdge =
                    from_properties(&edge.props).map_err(StorageError::from)?;
                let course_id = ObjectId::parse(&edge.to.key)?;
                let course_name = g
                    .node(&edge.to)?
                    .and_then(|props| props.get("name")?.as_str().map(String::from))
                    .unwrap_or_default();
                found.push(CourseReview {
                    course_id,
                    course_name,
                    text: review.text,
                    reviewed_at: review.reviewed_at,
                });
            }
            Ok::<_, CoreError>(found)
        })?;

        reviews.sort_by(|a, b| b.reviewed_at.cmp(&a.reviewed_at));
        Ok(reviews)
    }

    /// Resolve class -> unit -> course through the catalog.
    fn owning_course(&self, class_id: ObjectId) -> Result<Course, CoreError> {
        let class: Class = self
            .catalog
            .find_by_id(class_id)?
            .ok_or_else(|| CoreError::not_found(EntityKind::Class, class_id))?;
        let unit: Unit = self
            .catalog
            .find_by_id(class.unit_id)?
            .ok_or_else(|| CoreError::not_found(EntityKind::Unit, class.unit_id))?;
        self.catalog
            .find_by_id(unit.course_id)?
            .ok_or_else(|| CoreError::not_found(EntityKind::Course, unit.course_id))
    }
}
