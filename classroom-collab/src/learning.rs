use chrono::Utc;
use futures_util::future::try_join_all;
use log::{error, info, warn};

use crate::{
    CollabContext, CollabError, CollabEvent, CollabResult, Course, DatabaseResult, Enrollment,
    Lesson, NewEnrollment, NewProgress, PrimaryKey, Progress, Query, Role, Status, UserProfile,
};

/// Enrollment, lesson viewing and progress tracking for students
pub struct Learning {
    context: CollabContext,
}

/// A course the student is enrolled in
#[derive(Debug, Clone)]
pub struct EnrolledCourse {
    pub course: Course,
    pub enrollment: Enrollment,
    pub progress: Option<Progress>,
}

/// Everything the lesson page shows
#[derive(Debug, Clone)]
pub struct LessonView {
    pub course: Course,
    pub lesson: Lesson,
    /// Every lesson of the course, sorted by their order
    pub lessons: Vec<Lesson>,
    pub progress: Option<Progress>,
    pub completed: bool,
    pub previous: Option<PrimaryKey>,
    pub next: Option<PrimaryKey>,
}

/// Percentage of `completed` out of `total` lessons, clamped to 0..=100
pub fn progress_percentage(completed: usize, total: u32) -> f64 {
    if total == 0 {
        return 0.;
    }

    (completed as f64 / total as f64 * 100.).min(100.)
}

fn pair(student_id: PrimaryKey, course_id: PrimaryKey) -> Query {
    Query::new()
        .eq("studentId", student_id)
        .eq("courseId", course_id)
}

impl Learning {
    pub fn new(context: &CollabContext) -> Self {
        Self {
            context: context.clone(),
        }
    }

    /// Enrolls a student and creates their progress record
    pub async fn enroll(
        &self,
        student: &UserProfile,
        course_id: PrimaryKey,
    ) -> CollabResult<Enrollment> {
        if student.role != Role::Student {
            return Err(CollabError::NotPermitted {
                action: "enroll in courses",
            });
        }

        let course = self.context.table::<Course>().get(course_id).await?;

        self.context
            .table::<Enrollment>()
            .first(&pair(student.id, course_id))
            .await
            .conflict_or_ok("enrollment", "courseId", &course_id.to_string())?;

        let total_lessons = self
            .context
            .table::<Lesson>()
            .find(&Query::new().eq("courseId", course_id))
            .await?
            .len() as u32;

        let now = Utc::now();
        let enrollment = self
            .context
            .table::<Enrollment>()
            .create(&NewEnrollment {
                student_id: student.id,
                course_id,
                enrolled_at: now,
                status: Status::Active,
            })
            .await?;

        let progress = self
            .context
            .table::<Progress>()
            .create(&NewProgress {
                student_id: student.id,
                course_id,
                completed_lessons: vec![],
                total_lessons,
                progress_percentage: 0.,
                last_accessed: now,
            })
            .await;

        if let Err(e) = progress {
            if let Err(undo) = self.context.table::<Enrollment>().delete(enrollment.id).await {
                error!(
                    "Could not undo enrollment {} after a failed progress write: {}",
                    enrollment.id, undo
                );
            }

            return Err(e.into());
        }

        info!("{} enrolled in {}", student.email, course.title);
        self.context.emit(CollabEvent::Enrolled {
            student_id: student.id,
            course_id,
        });

        Ok(enrollment)
    }

    pub async fn is_enrolled(
        &self,
        student_id: PrimaryKey,
        course_id: PrimaryKey,
    ) -> CollabResult<bool> {
        let enrollment = self
            .context
            .table::<Enrollment>()
            .first(&pair(student_id, course_id))
            .await?;

        Ok(enrollment.is_some())
    }

    /// Active enrollments of the student, with their progress.
    /// Enrollments whose course has been deleted are skipped.
    pub async fn my_courses(&self, student_id: PrimaryKey) -> CollabResult<Vec<EnrolledCourse>> {
        let enrollments = self
            .context
            .table::<Enrollment>()
            .find(
                &Query::new()
                    .eq("studentId", student_id)
                    .eq("status", "active"),
            )
            .await?;

        let courses = enrollments.into_iter().map(|enrollment| async move {
            let courses = self.context.table::<Course>();
            let progress = self.context.table::<Progress>();
            let query = pair(student_id, enrollment.course_id);

            let (course, progress) = futures_util::try_join!(
                courses.get_optional(enrollment.course_id),
                progress.first(&query)
            )?;

            let Some(course) = course else {
                warn!(
                    "Enrollment {} points at missing course {}",
                    enrollment.id, enrollment.course_id
                );
                return Ok(None);
            };

            Ok::<_, CollabError>(Some(EnrolledCourse {
                course,
                enrollment,
                progress,
            }))
        });

        Ok(try_join_all(courses).await?.into_iter().flatten().collect())
    }

    pub async fn lesson_view(
        &self,
        student_id: PrimaryKey,
        course_id: PrimaryKey,
        lesson_id: PrimaryKey,
    ) -> CollabResult<LessonView> {
        let lesson = self.context.table::<Lesson>().get(lesson_id).await?;

        if lesson.course_id != course_id {
            return Err(CollabError::LessonNotInCourse {
                lesson_id,
                course_id,
            });
        }

        let course = self.context.table::<Course>().get(course_id).await?;

        let mut lessons = self
            .context
            .table::<Lesson>()
            .find(&Query::new().eq("courseId", course_id))
            .await?;
        lessons.sort_by_key(|l| (l.order, l.id));

        let progress = self
            .context
            .table::<Progress>()
            .first(&pair(student_id, course_id))
            .await?;

        let completed = progress
            .as_ref()
            .is_some_and(|p| p.completed_lessons.contains(&lesson_id));

        let index = lessons.iter().position(|l| l.id == lesson_id).unwrap_or(0);
        let previous = index
            .checked_sub(1)
            .and_then(|i| lessons.get(i))
            .map(|l| l.id);
        let next = lessons.get(index + 1).map(|l| l.id);

        Ok(LessonView {
            course,
            lesson,
            lessons,
            progress,
            completed,
            previous,
            next,
        })
    }

    /// Adds the lesson to the student's completed lessons and recomputes the percentage
    pub async fn complete_lesson(
        &self,
        student: &UserProfile,
        course_id: PrimaryKey,
        lesson_id: PrimaryKey,
    ) -> CollabResult<Progress> {
        if !self.is_enrolled(student.id, course_id).await? {
            return Err(CollabError::NotEnrolled { course_id });
        }

        let lesson = self.context.table::<Lesson>().get(lesson_id).await?;

        if lesson.course_id != course_id {
            return Err(CollabError::LessonNotInCourse {
                lesson_id,
                course_id,
            });
        }

        let table = self.context.table::<Progress>();
        let existing = table.first(&pair(student.id, course_id)).await?;

        let progress = match existing {
            Some(mut progress) => {
                if !progress.completed_lessons.contains(&lesson_id) {
                    progress.completed_lessons.push(lesson_id);
                }

                progress.progress_percentage = progress_percentage(
                    progress.completed_lessons.len(),
                    progress.total_lessons,
                );
                progress.last_accessed = Utc::now();

                table.replace(&progress).await?
            }
            None => {
                let total_lessons = self
                    .context
                    .table::<Lesson>()
                    .find(&Query::new().eq("courseId", course_id))
                    .await?
                    .len() as u32;

                table
                    .create(&NewProgress {
                        student_id: student.id,
                        course_id,
                        completed_lessons: vec![lesson_id],
                        total_lessons,
                        progress_percentage: progress_percentage(1, total_lessons),
                        last_accessed: Utc::now(),
                    })
                    .await?
            }
        };

        self.context.emit(CollabEvent::LessonCompleted {
            student_id: student.id,
            course_id,
            lesson_id,
            progress_percentage: progress.progress_percentage,
        });

        Ok(progress)
    }
}

#[cfg(test)]
mod test {
    use async_trait::async_trait;
    use serde_json::Value;

    use super::progress_percentage;
    use crate::{
        test_util::{collab, course_input, lesson_input, user},
        Collab, CollabConfig, CollabError, Collection, Database, DatabaseError, Enrollment,
        MemoryDatabase, MemorySessionStore, PrimaryKey, Progress, Query, Role, Status,
    };

    #[test]
    fn percentages() {
        assert_eq!(progress_percentage(0, 0), 0.);
        assert_eq!(progress_percentage(3, 0), 0.);
        assert_eq!(progress_percentage(1, 4), 25.);
        assert_eq!(progress_percentage(4, 4), 100.);
        assert_eq!(progress_percentage(5, 4), 100.);
    }

    async fn course_with_lessons(collab: &Collab, lessons: usize) -> PrimaryKey {
        let grace = user(collab, "Grace", Role::Instructor).await;
        let course = collab
            .catalog
            .create_course(&grace, course_input("Compilers", "Programming"))
            .await
            .unwrap();

        for i in 0..lessons {
            collab
                .catalog
                .create_lesson(&grace, course.id, lesson_input(&format!("Lesson {i}")))
                .await
                .unwrap();
        }

        course.id
    }

    #[tokio::test]
    async fn enrolling_twice_conflicts() {
        let collab = collab();
        let course_id = course_with_lessons(&collab, 2).await;
        let ada = user(&collab, "Ada", Role::Student).await;

        collab.learning.enroll(&ada, course_id).await.unwrap();
        let again = collab.learning.enroll(&ada, course_id).await;

        assert!(matches!(
            again,
            Err(CollabError::Db(DatabaseError::Conflict { .. }))
        ));

        let mine = collab.learning.my_courses(ada.id).await.unwrap();
        assert_eq!(mine.len(), 1);

        let progress = mine[0].progress.as_ref().unwrap();
        assert_eq!(progress.total_lessons, 2);
        assert_eq!(progress.progress_percentage, 0.);
    }

    #[tokio::test]
    async fn only_students_enroll() {
        let collab = collab();
        let course_id = course_with_lessons(&collab, 0).await;
        let root = user(&collab, "Root", Role::Admin).await;

        let result = collab.learning.enroll(&root, course_id).await;
        assert!(matches!(result, Err(CollabError::NotPermitted { .. })));
    }

    #[tokio::test]
    async fn completing_lessons() {
        let collab = collab();
        let course_id = course_with_lessons(&collab, 4).await;
        let ada = user(&collab, "Ada", Role::Student).await;

        let not_enrolled = collab.learning.complete_lesson(&ada, course_id, 1).await;
        assert!(matches!(not_enrolled, Err(CollabError::NotEnrolled { .. })));

        collab.learning.enroll(&ada, course_id).await.unwrap();

        collab.learning.complete_lesson(&ada, course_id, 1).await.unwrap();
        let progress = collab
            .learning
            .complete_lesson(&ada, course_id, 1)
            .await
            .unwrap();

        assert_eq!(progress.completed_lessons, vec![1]);
        assert_eq!(progress.progress_percentage, 25.);

        let view = collab.learning.lesson_view(ada.id, course_id, 2).await.unwrap();
        assert!(!view.completed);
        assert_eq!(view.previous, Some(1));
        assert_eq!(view.next, Some(3));

        let first = collab.learning.lesson_view(ada.id, course_id, 1).await.unwrap();
        assert!(first.completed);
        assert_eq!(first.previous, None);
    }

    #[tokio::test]
    async fn percentage_uses_lesson_count_at_enrollment() {
        let collab = collab();
        let course_id = course_with_lessons(&collab, 4).await;
        let root = user(&collab, "Root", Role::Admin).await;
        let ada = user(&collab, "Ada", Role::Student).await;

        collab.learning.enroll(&ada, course_id).await.unwrap();
        collab
            .catalog
            .create_lesson(&root, course_id, lesson_input("Bonus"))
            .await
            .unwrap();

        let progress = collab
            .learning
            .complete_lesson(&ada, course_id, 1)
            .await
            .unwrap();

        assert_eq!(progress.total_lessons, 4);
        assert_eq!(progress.progress_percentage, 25.);
    }

    #[tokio::test]
    async fn completing_recreates_missing_progress() {
        let collab = collab();
        let course_id = course_with_lessons(&collab, 4).await;
        let ada = user(&collab, "Ada", Role::Student).await;

        collab.learning.enroll(&ada, course_id).await.unwrap();

        let table = collab.context().table::<Progress>();
        let existing = table
            .first(&Query::new().eq("studentId", ada.id))
            .await
            .unwrap()
            .unwrap();
        table.delete(existing.id).await.unwrap();

        let progress = collab
            .learning
            .complete_lesson(&ada, course_id, 2)
            .await
            .unwrap();

        assert_eq!(progress.completed_lessons, vec![2]);
        assert_eq!(progress.total_lessons, 4);
        assert_eq!(progress.progress_percentage, 25.);
        assert_eq!(table.all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn my_courses_skips_deleted_courses() {
        let collab = collab();
        let kept = course_with_lessons(&collab, 1).await;
        let gone = course_with_lessons(&collab, 1).await;
        let root = user(&collab, "Root", Role::Admin).await;
        let ada = user(&collab, "Ada", Role::Student).await;

        collab.learning.enroll(&ada, kept).await.unwrap();
        collab.learning.enroll(&ada, gone).await.unwrap();
        collab.catalog.delete_course(&root, gone).await.unwrap();

        let mine = collab.learning.my_courses(ada.id).await.unwrap();

        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].course.id, kept);
    }

    #[tokio::test]
    async fn my_courses_lists_active_enrollments() {
        let collab = collab();
        let first = course_with_lessons(&collab, 1).await;
        let second = course_with_lessons(&collab, 1).await;
        let ada = user(&collab, "Ada", Role::Student).await;

        collab.learning.enroll(&ada, first).await.unwrap();
        let dropped = collab.learning.enroll(&ada, second).await.unwrap();

        collab
            .context()
            .table::<Enrollment>()
            .replace(&Enrollment {
                status: Status::Inactive,
                ..dropped
            })
            .await
            .unwrap();

        let mine = collab.learning.my_courses(ada.id).await.unwrap();

        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].course.id, first);
    }

    #[tokio::test]
    async fn lessons_must_belong_to_the_course() {
        let collab = collab();
        let first = course_with_lessons(&collab, 1).await;
        let second = course_with_lessons(&collab, 1).await;
        let ada = user(&collab, "Ada", Role::Student).await;

        let result = collab.learning.lesson_view(ada.id, second, 1).await;

        assert!(matches!(
            result,
            Err(CollabError::LessonNotInCourse { lesson_id: 1, course_id }) if course_id == second
        ));
        assert_ne!(first, second);
    }

    /// Fails every write to the progress collection
    struct NoProgress(MemoryDatabase);

    #[async_trait]
    impl Database for NoProgress {
        async fn list(&self, collection: Collection, query: &Query) -> crate::Result<Vec<Value>> {
            self.0.list(collection, query).await
        }

        async fn get(&self, collection: Collection, id: PrimaryKey) -> crate::Result<Value> {
            self.0.get(collection, id).await
        }

        async fn create(&self, collection: Collection, record: Value) -> crate::Result<Value> {
            if collection == Collection::Progress {
                return Err(DatabaseError::Malformed {
                    resource: "progress",
                    reason: "store is read-only".to_string(),
                });
            }

            self.0.create(collection, record).await
        }

        async fn replace(
            &self,
            collection: Collection,
            id: PrimaryKey,
            record: Value,
        ) -> crate::Result<Value> {
            self.0.replace(collection, id, record).await
        }

        async fn delete(&self, collection: Collection, id: PrimaryKey) -> crate::Result<()> {
            self.0.delete(collection, id).await
        }
    }

    #[tokio::test]
    async fn failed_progress_write_undoes_enrollment() {
        let collab = Collab::new(
            NoProgress(MemoryDatabase::new()),
            MemorySessionStore::new(),
            CollabConfig::default(),
        );
        let course_id = course_with_lessons(&collab, 1).await;
        let ada = user(&collab, "Ada", Role::Student).await;

        let result = collab.learning.enroll(&ada, course_id).await;

        assert!(result.is_err());
        assert!(!collab.learning.is_enrolled(ada.id, course_id).await.unwrap());
    }
}
