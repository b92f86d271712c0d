use std::collections::HashMap;

use chrono::{DateTime, Utc};
use log::{info, warn};

use crate::{
    catalog::ensure_can_manage, util::require, Assignment, CollabContext, CollabError,
    CollabEvent, CollabResult, Course, Enrollment, NewAssignment, NewSubmission, PrimaryKey,
    Query, Submission, SubmissionStatus, User, UserProfile,
};

/// Assignments, submissions, and grading
pub struct Coursework {
    context: CollabContext,
}

#[derive(Debug, Clone)]
pub struct AssignmentInput {
    pub course_id: PrimaryKey,
    pub title: String,
    pub description: String,
    pub due_date: DateTime<Utc>,
}

/// An assignment as the instructor sees it
#[derive(Debug, Clone)]
pub struct InstructorAssignment {
    pub assignment: Assignment,
    pub course_title: String,
    pub submission_count: usize,
}

/// An assignment as the student sees it, with their own submission
#[derive(Debug, Clone)]
pub struct StudentAssignment {
    pub assignment: Assignment,
    pub course_title: String,
    pub submission: Option<Submission>,
}

#[derive(Debug, Clone)]
pub struct SubmissionEntry {
    pub submission: Submission,
    /// Empty if the student no longer exists
    pub student_name: String,
    pub student_email: String,
}

#[derive(Debug, Clone)]
pub struct Grade {
    pub grade: String,
    pub feedback: Option<String>,
}

impl Coursework {
    pub fn new(context: &CollabContext) -> Self {
        Self {
            context: context.clone(),
        }
    }

    pub async fn create_assignment(
        &self,
        actor: &UserProfile,
        input: AssignmentInput,
    ) -> CollabResult<Assignment> {
        let course = self.context.table::<Course>().get(input.course_id).await?;
        ensure_can_manage(actor, &course, "add assignments to this course")?;

        require("title", &input.title)?;
        require("description", &input.description)?;

        let assignment = self
            .context
            .table::<Assignment>()
            .create(&NewAssignment {
                course_id: input.course_id,
                title: input.title,
                description: input.description,
                due_date: input.due_date,
                created_at: Utc::now(),
            })
            .await?;

        info!("Assignment {} added to {}", assignment.title, course.title);
        Ok(assignment)
    }

    /// Assignments of every course the instructor teaches
    pub async fn instructor_assignments(
        &self,
        instructor_id: PrimaryKey,
    ) -> CollabResult<Vec<InstructorAssignment>> {
        let courses = self
            .context
            .table::<Course>()
            .find(&Query::new().eq("instructorId", instructor_id))
            .await?;

        let mut result = vec![];

        for course in courses {
            let assignments = self
                .context
                .table::<Assignment>()
                .find(&Query::new().eq("courseId", course.id))
                .await?;

            for assignment in assignments {
                let submission_count = self
                    .context
                    .table::<Submission>()
                    .find(&Query::new().eq("assignmentId", assignment.id))
                    .await?
                    .len();

                result.push(InstructorAssignment {
                    assignment,
                    course_title: course.title.clone(),
                    submission_count,
                });
            }
        }

        Ok(result)
    }

    pub async fn delete_assignment(
        &self,
        actor: &UserProfile,
        assignment_id: PrimaryKey,
    ) -> CollabResult<()> {
        let (assignment, course) = self.assignment_with_course(assignment_id).await?;
        ensure_can_manage(actor, &course, "delete this assignment")?;

        self.context
            .table::<Assignment>()
            .delete(assignment.id)
            .await?;

        Ok(())
    }

    /// Assignments of every course the student is enrolled in
    pub async fn student_assignments(
        &self,
        student_id: PrimaryKey,
    ) -> CollabResult<Vec<StudentAssignment>> {
        let enrollments = self
            .context
            .table::<Enrollment>()
            .find(&Query::new().eq("studentId", student_id))
            .await?;

        let submissions = self
            .context
            .table::<Submission>()
            .find(&Query::new().eq("studentId", student_id))
            .await?;

        let mut result = vec![];

        for enrollment in enrollments {
            let course = self
                .context
                .table::<Course>()
                .get_optional(enrollment.course_id)
                .await?;

            let Some(course) = course else {
                warn!(
                    "Enrollment {} points at missing course {}",
                    enrollment.id, enrollment.course_id
                );
                continue;
            };

            let assignments = self
                .context
                .table::<Assignment>()
                .find(&Query::new().eq("courseId", course.id))
                .await?;

            for assignment in assignments {
                let submission = submissions
                    .iter()
                    .find(|s| s.assignment_id == assignment.id)
                    .cloned();

                result.push(StudentAssignment {
                    assignment,
                    course_title: course.title.clone(),
                    submission,
                });
            }
        }

        Ok(result)
    }

    /// Creates the student's submission, or replaces the response of an earlier one
    pub async fn submit(
        &self,
        student: &UserProfile,
        assignment_id: PrimaryKey,
        response: String,
    ) -> CollabResult<Submission> {
        require("response", &response)?;

        let assignment = self
            .context
            .table::<Assignment>()
            .get(assignment_id)
            .await?;

        let enrolled = self
            .context
            .table::<Enrollment>()
            .first(
                &Query::new()
                    .eq("studentId", student.id)
                    .eq("courseId", assignment.course_id),
            )
            .await?
            .is_some();

        if !enrolled {
            return Err(CollabError::NotEnrolled {
                course_id: assignment.course_id,
            });
        }

        let table = self.context.table::<Submission>();
        let existing = table
            .first(
                &Query::new()
                    .eq("assignmentId", assignment_id)
                    .eq("studentId", student.id),
            )
            .await?;

        let submission = match existing {
            Some(submission) => {
                table
                    .replace(&Submission {
                        response,
                        status: SubmissionStatus::Submitted,
                        submitted_at: Utc::now(),
                        ..submission
                    })
                    .await?
            }
            None => {
                table
                    .create(&NewSubmission {
                        assignment_id,
                        student_id: student.id,
                        response,
                        status: SubmissionStatus::Submitted,
                        submitted_at: Utc::now(),
                        grade: None,
                        feedback: None,
                    })
                    .await?
            }
        };

        self.context.emit(CollabEvent::SubmissionReceived {
            assignment_id,
            student_id: student.id,
        });

        Ok(submission)
    }

    /// Submissions of an assignment, with who submitted them
    pub async fn submissions(
        &self,
        actor: &UserProfile,
        assignment_id: PrimaryKey,
    ) -> CollabResult<(Assignment, Vec<SubmissionEntry>)> {
        let (assignment, course) = self.assignment_with_course(assignment_id).await?;
        ensure_can_manage(actor, &course, "view submissions of this assignment")?;

        let submissions = self
            .context
            .table::<Submission>()
            .find(&Query::new().eq("assignmentId", assignment_id))
            .await?;

        let users: HashMap<PrimaryKey, User> = self
            .context
            .table::<User>()
            .all()
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();

        let entries = submissions
            .into_iter()
            .map(|submission| {
                let student = users.get(&submission.student_id);

                SubmissionEntry {
                    student_name: student.map(|u| u.name.clone()).unwrap_or_default(),
                    student_email: student.map(|u| u.email.clone()).unwrap_or_default(),
                    submission,
                }
            })
            .collect();

        Ok((assignment, entries))
    }

    pub async fn grade(
        &self,
        actor: &UserProfile,
        submission_id: PrimaryKey,
        grade: Grade,
    ) -> CollabResult<Submission> {
        require("grade", &grade.grade)?;

        let table = self.context.table::<Submission>();
        let submission = table.get(submission_id).await?;

        let (_, course) = self
            .assignment_with_course(submission.assignment_id)
            .await?;
        ensure_can_manage(actor, &course, "grade this submission")?;

        let graded = table
            .replace(&Submission {
                grade: Some(grade.grade),
                feedback: grade.feedback.filter(|f| !f.trim().is_empty()),
                status: SubmissionStatus::Reviewed,
                ..submission
            })
            .await?;

        self.context.emit(CollabEvent::SubmissionGraded {
            submission_id,
            student_id: graded.student_id,
        });

        Ok(graded)
    }

    async fn assignment_with_course(
        &self,
        assignment_id: PrimaryKey,
    ) -> CollabResult<(Assignment, Course)> {
        let assignment = self
            .context
            .table::<Assignment>()
            .get(assignment_id)
            .await?;

        let course = self
            .context
            .table::<Course>()
            .get(assignment.course_id)
            .await?;

        Ok((assignment, course))
    }
}
