use chrono::Utc;
use log::info;

use crate::{
    util::require, CollabContext, CollabError, CollabEvent, CollabResult, Course, Enrollment,
    Lesson, LessonKind, NewCourse, NewLesson, PrimaryKey, Progress, Query, Role, Status,
    UserProfile, ValidationError,
};

/// Used when a course is created without a thumbnail
pub const PLACEHOLDER_THUMBNAIL: &str = "https://via.placeholder.com/400x250?text=Course+Thumbnail";

/// Embedded thumbnails can't be larger than this once decoded
pub const MAX_THUMBNAIL_BYTES: usize = 5 * 1024 * 1024;

/// Browsing, authoring, and moderation of courses and their lessons
pub struct Catalog {
    context: CollabContext,
}

/// Narrows down the course catalog
#[derive(Debug, Clone, Default)]
pub struct CatalogFilter {
    /// Matched against title and description, ignoring case
    pub search: Option<String>,
    /// `All` or [None] matches any category
    pub category: Option<String>,
}

/// Everything the course details page shows
#[derive(Debug, Clone)]
pub struct CourseDetails {
    pub course: Course,
    /// Sorted by their order
    pub lessons: Vec<Lesson>,
    /// Only known when a student is looking
    pub enrolled: bool,
    pub progress: Option<Progress>,
}

#[derive(Debug, Clone)]
pub struct CourseInput {
    pub title: String,
    pub description: String,
    pub category: String,
    pub duration: String,
    pub thumbnail: Option<String>,
}

/// A full edit of a course, status included
#[derive(Debug, Clone)]
pub struct CourseChanges {
    pub title: String,
    pub description: String,
    pub category: String,
    pub duration: String,
    pub thumbnail: String,
    pub status: Status,
}

#[derive(Debug, Clone)]
pub struct LessonInput {
    pub title: String,
    pub kind: LessonKind,
    pub content: String,
    pub duration: Option<String>,
}

impl CourseInput {
    fn validate(&self) -> Result<(), ValidationError> {
        require("title", &self.title)?;
        require("description", &self.description)?;
        require("category", &self.category)?;
        require("duration", &self.duration)?;

        match &self.thumbnail {
            Some(thumbnail) => validate_thumbnail(thumbnail),
            None => Ok(()),
        }
    }
}

impl CatalogFilter {
    fn matches(&self, course: &Course) -> bool {
        let search_matches = match &self.search {
            Some(search) => {
                let search = search.to_lowercase();

                course.title.to_lowercase().contains(&search)
                    || course.description.to_lowercase().contains(&search)
            }
            None => true,
        };

        let category_matches = match self.category.as_deref() {
            None | Some("All") => true,
            Some(category) => course.category == category,
        };

        search_matches && category_matches
    }
}

/// Embedded `data:` thumbnails must be images no larger than [MAX_THUMBNAIL_BYTES]
pub fn validate_thumbnail(thumbnail: &str) -> Result<(), ValidationError> {
    let Some(embedded) = thumbnail.strip_prefix("data:") else {
        return Ok(());
    };

    let (header, payload) = embedded.split_once(',').unwrap_or((embedded, ""));

    if !header.starts_with("image/") {
        return Err(ValidationError::ThumbnailNotImage);
    }

    let decoded_size = if header.ends_with(";base64") {
        payload.trim_end_matches('=').len() * 3 / 4
    } else {
        payload.len()
    };

    if decoded_size > MAX_THUMBNAIL_BYTES {
        return Err(ValidationError::ThumbnailTooLarge {
            max_bytes: MAX_THUMBNAIL_BYTES,
        });
    }

    Ok(())
}

/// Only the instructor of a course and admins may change it
pub(crate) fn ensure_can_manage(
    actor: &UserProfile,
    course: &Course,
    action: &'static str,
) -> CollabResult<()> {
    let is_owner = actor.role == Role::Instructor && course.instructor_id == actor.id;

    if is_owner || actor.role == Role::Admin {
        return Ok(());
    }

    Err(CollabError::NotPermitted { action })
}

impl Catalog {
    pub fn new(context: &CollabContext) -> Self {
        Self {
            context: context.clone(),
        }
    }

    /// Active courses matching the filter
    pub async fn browse(&self, filter: &CatalogFilter) -> CollabResult<Vec<Course>> {
        let courses = self
            .context
            .table::<Course>()
            .find(&Query::new().eq("status", "active"))
            .await?
            .into_iter()
            .filter(|c| filter.matches(c))
            .collect();

        Ok(courses)
    }

    /// Categories of active courses, in the order they first appear
    pub async fn categories(&self) -> CollabResult<Vec<String>> {
        let mut categories: Vec<String> = vec![];

        for course in self.browse(&CatalogFilter::default()).await? {
            if !categories.contains(&course.category) {
                categories.push(course.category);
            }
        }

        Ok(categories)
    }

    pub async fn course(&self, course_id: PrimaryKey) -> CollabResult<Course> {
        Ok(self.context.table::<Course>().get(course_id).await?)
    }

    /// The course, its lessons, and the viewer's enrollment if they are a student
    pub async fn details(
        &self,
        course_id: PrimaryKey,
        viewer: Option<&UserProfile>,
    ) -> CollabResult<CourseDetails> {
        let course = self.course(course_id).await?;
        let lessons = self.lessons(course_id).await?;

        let student = viewer.filter(|v| v.role == Role::Student);

        let (enrolled, progress) = match student {
            Some(student) => {
                let pair = Query::new()
                    .eq("studentId", student.id)
                    .eq("courseId", course_id);

                let enrollment = self.context.table::<Enrollment>().first(&pair).await?;
                let progress = self.context.table::<Progress>().first(&pair).await?;

                (enrollment.is_some(), progress)
            }
            None => (false, None),
        };

        Ok(CourseDetails {
            course,
            lessons,
            enrolled,
            progress,
        })
    }

    /// Lessons of a course, sorted by their order
    pub async fn lessons(&self, course_id: PrimaryKey) -> CollabResult<Vec<Lesson>> {
        let mut lessons = self
            .context
            .table::<Lesson>()
            .find(&Query::new().eq("courseId", course_id))
            .await?;

        lessons.sort_by_key(|l| (l.order, l.id));
        Ok(lessons)
    }

    /// Courses taught by the given instructor, in any status
    pub async fn courses_by(&self, instructor_id: PrimaryKey) -> CollabResult<Vec<Course>> {
        Ok(self
            .context
            .table::<Course>()
            .find(&Query::new().eq("instructorId", instructor_id))
            .await?)
    }

    /// Every course, in any status
    pub async fn all(&self) -> CollabResult<Vec<Course>> {
        Ok(self.context.table::<Course>().all().await?)
    }

    pub async fn create_course(
        &self,
        author: &UserProfile,
        input: CourseInput,
    ) -> CollabResult<Course> {
        if author.role == Role::Student {
            return Err(CollabError::NotPermitted {
                action: "create courses",
            });
        }

        input.validate()?;

        let thumbnail = input
            .thumbnail
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| PLACEHOLDER_THUMBNAIL.to_string());

        let course = self
            .context
            .table::<Course>()
            .create(&NewCourse {
                title: input.title,
                description: input.description,
                category: input.category,
                instructor_id: author.id,
                instructor_name: author.name.clone(),
                duration: input.duration,
                thumbnail,
                status: Status::Active,
                created_at: Utc::now(),
            })
            .await?;

        info!("{} created course {}", author.email, course.title);
        Ok(course)
    }

    pub async fn update_course(
        &self,
        actor: &UserProfile,
        course_id: PrimaryKey,
        changes: CourseChanges,
    ) -> CollabResult<Course> {
        let course = self.course(course_id).await?;
        ensure_can_manage(actor, &course, "edit this course")?;

        require("title", &changes.title)?;
        require("description", &changes.description)?;
        require("category", &changes.category)?;
        require("duration", &changes.duration)?;
        validate_thumbnail(&changes.thumbnail)?;

        let status_changed = course.status != changes.status;

        let updated = self
            .context
            .table::<Course>()
            .replace(&Course {
                title: changes.title,
                description: changes.description,
                category: changes.category,
                duration: changes.duration,
                thumbnail: changes.thumbnail,
                status: changes.status,
                ..course
            })
            .await?;

        if status_changed {
            self.context.emit(CollabEvent::CourseStatusChanged {
                course_id,
                status: updated.status,
            });
        }

        Ok(updated)
    }

    /// Flips a course between active and inactive
    pub async fn toggle_status(
        &self,
        actor: &UserProfile,
        course_id: PrimaryKey,
    ) -> CollabResult<Course> {
        let course = self.course(course_id).await?;
        ensure_can_manage(actor, &course, "change the status of this course")?;

        let status = course.status.toggled();
        let updated = self
            .context
            .table::<Course>()
            .replace(&Course { status, ..course })
            .await?;

        self.context
            .emit(CollabEvent::CourseStatusChanged { course_id, status });

        Ok(updated)
    }

    /// Deletes the course record. Lessons, enrollments, and assignments are left as they are.
    pub async fn delete_course(
        &self,
        actor: &UserProfile,
        course_id: PrimaryKey,
    ) -> CollabResult<()> {
        let course = self.course(course_id).await?;
        ensure_can_manage(actor, &course, "delete this course")?;

        self.context.table::<Course>().delete(course_id).await?;
        self.context.emit(CollabEvent::CourseDeleted { course_id });

        info!("{} deleted course {}", actor.email, course.title);
        Ok(())
    }

    /// Adds a lesson after the last one of the course
    pub async fn create_lesson(
        &self,
        actor: &UserProfile,
        course_id: PrimaryKey,
        input: LessonInput,
    ) -> CollabResult<Lesson> {
        let course = self.course(course_id).await?;
        ensure_can_manage(actor, &course, "add lessons to this course")?;

        require("title", &input.title)?;
        require("content", &input.content)?;

        let order = self
            .lessons(course_id)
            .await?
            .iter()
            .map(|l| l.order)
            .max()
            .unwrap_or(0)
            + 1;

        let duration = input
            .duration
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| "N/A".to_string());

        let lesson = self
            .context
            .table::<Lesson>()
            .create(&NewLesson {
                course_id,
                title: input.title,
                kind: input.kind,
                content: input.content,
                order,
                duration,
            })
            .await?;

        Ok(lesson)
    }
}

#[cfg(test)]
mod test {
    use super::{
        validate_thumbnail, CatalogFilter, CourseChanges, LessonInput, MAX_THUMBNAIL_BYTES,
        PLACEHOLDER_THUMBNAIL,
    };
    use crate::{
        test_util::{collab, course_input, user},
        CollabError, LessonKind, Role, Status, ValidationError,
    };

    #[tokio::test]
    async fn browse_only_shows_active_matches() {
        let collab = collab();
        let grace = user(&collab, "Grace", Role::Instructor).await;

        let rust = collab
            .catalog
            .create_course(&grace, course_input("Intro to Rust", "Programming"))
            .await
            .unwrap();
        collab
            .catalog
            .create_course(&grace, course_input("Watercolor", "Art"))
            .await
            .unwrap();
        let hidden = collab
            .catalog
            .create_course(&grace, course_input("Advanced Rust", "Programming"))
            .await
            .unwrap();
        collab.catalog.toggle_status(&grace, hidden.id).await.unwrap();

        let found = collab
            .catalog
            .browse(&CatalogFilter {
                search: Some("RUST".to_string()),
                category: Some("All".to_string()),
            })
            .await
            .unwrap();

        assert_eq!(found, vec![rust]);
        assert_eq!(found[0].thumbnail, PLACEHOLDER_THUMBNAIL);

        let categories = collab.catalog.categories().await.unwrap();
        assert_eq!(categories, vec!["Programming", "Art"]);
    }

    #[tokio::test]
    async fn students_cannot_author() {
        let collab = collab();
        let ada = user(&collab, "Ada", Role::Student).await;

        let result = collab
            .catalog
            .create_course(&ada, course_input("Sneaky", "Nope"))
            .await;

        assert!(matches!(result, Err(CollabError::NotPermitted { .. })));
    }

    #[tokio::test]
    async fn only_owner_or_admin_may_edit() {
        let collab = collab();
        let grace = user(&collab, "Grace", Role::Instructor).await;
        let alan = user(&collab, "Alan", Role::Instructor).await;
        let root = user(&collab, "Root", Role::Admin).await;

        let course = collab
            .catalog
            .create_course(&grace, course_input("Compilers", "Programming"))
            .await
            .unwrap();

        let changes = CourseChanges {
            title: "Compilers II".to_string(),
            description: course.description.clone(),
            category: course.category.clone(),
            duration: course.duration.clone(),
            thumbnail: course.thumbnail.clone(),
            status: Status::Inactive,
        };

        let denied = collab
            .catalog
            .update_course(&alan, course.id, changes.clone())
            .await;
        assert!(matches!(denied, Err(CollabError::NotPermitted { .. })));

        let updated = collab
            .catalog
            .update_course(&root, course.id, changes)
            .await
            .unwrap();
        assert_eq!(updated.title, "Compilers II");
        assert_eq!(updated.status, Status::Inactive);
        assert_eq!(updated.instructor_id, grace.id);
        assert_eq!(updated.created_at, course.created_at);
    }

    #[tokio::test]
    async fn lessons_are_appended_in_order() {
        let collab = collab();
        let grace = user(&collab, "Grace", Role::Instructor).await;
        let course = collab
            .catalog
            .create_course(&grace, course_input("Compilers", "Programming"))
            .await
            .unwrap();

        for title in ["Lexing", "Parsing"] {
            collab
                .catalog
                .create_lesson(
                    &grace,
                    course.id,
                    LessonInput {
                        title: title.to_string(),
                        kind: LessonKind::Text,
                        content: "...".to_string(),
                        duration: None,
                    },
                )
                .await
                .unwrap();
        }

        let lessons = collab.catalog.lessons(course.id).await.unwrap();
        let orders: Vec<_> = lessons.iter().map(|l| (l.title.as_str(), l.order)).collect();

        assert_eq!(orders, vec![("Lexing", 1), ("Parsing", 2)]);
        assert_eq!(lessons[0].duration, "N/A");
    }

    #[test]
    fn thumbnails() {
        assert!(validate_thumbnail("https://example.com/a.png").is_ok());
        assert!(validate_thumbnail("data:image/png;base64,aGVsbG8=").is_ok());
        assert_eq!(
            validate_thumbnail("data:text/html;base64,aGVsbG8="),
            Err(ValidationError::ThumbnailNotImage)
        );

        let huge = format!(
            "data:image/png;base64,{}",
            "A".repeat(MAX_THUMBNAIL_BYTES / 3 * 4 + 8)
        );
        assert_eq!(
            validate_thumbnail(&huge),
            Err(ValidationError::ThumbnailTooLarge {
                max_bytes: MAX_THUMBNAIL_BYTES
            })
        );
    }
}
