//! Maps application paths to pages and decides what a session gets to see there.

use crate::{
    gate::{self, Access},
    PrimaryKey, Role, SessionData,
};

pub const STUDENTS: &[Role] = &[Role::Student];
pub const STAFF: &[Role] = &[Role::Instructor, Role::Admin];
pub const ADMINS: &[Role] = &[Role::Admin];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Home,
    Login,
    Register,
    Courses,
    CourseDetails {
        course_id: PrimaryKey,
    },
    MyCourses,
    MyAssignments,
    LessonView {
        course_id: PrimaryKey,
        lesson_id: PrimaryKey,
    },
    InstructorCourses,
    CreateCourse,
    EditCourse {
        course_id: PrimaryKey,
    },
    CreateLesson {
        course_id: PrimaryKey,
    },
    InstructorAssignments,
    CreateAssignment,
    ViewSubmissions {
        assignment_id: PrimaryKey,
    },
    AdminDashboard,
    AdminUsers,
    AdminCourses,
}

/// What happens when a path is visited
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Render(Page),
    Redirect(&'static str),
}

impl Page {
    /// Finds the page for a path. Query strings and trailing slashes are ignored.
    pub fn resolve(path: &str) -> Option<Self> {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let segments: Vec<_> = path.split('/').filter(|s| !s.is_empty()).collect();

        let page = match segments.as_slice() {
            [] => Self::Home,
            ["login"] => Self::Login,
            ["register"] => Self::Register,
            ["courses"] => Self::Courses,
            ["courses", id] => Self::CourseDetails {
                course_id: id.parse().ok()?,
            },
            ["courses", course_id, "lessons", lesson_id] => Self::LessonView {
                course_id: course_id.parse().ok()?,
                lesson_id: lesson_id.parse().ok()?,
            },
            ["my-courses"] => Self::MyCourses,
            ["my-assignments"] => Self::MyAssignments,
            ["instructor", "courses"] => Self::InstructorCourses,
            ["instructor", "courses", "create"] => Self::CreateCourse,
            ["instructor", "courses", "edit", id] => Self::EditCourse {
                course_id: id.parse().ok()?,
            },
            ["instructor", "courses", id, "lessons", "create"] => Self::CreateLesson {
                course_id: id.parse().ok()?,
            },
            ["instructor", "assignments"] => Self::InstructorAssignments,
            ["instructor", "assignments", "create"] => Self::CreateAssignment,
            ["instructor", "assignments", id, "submissions"] => Self::ViewSubmissions {
                assignment_id: id.parse().ok()?,
            },
            ["admin", "dashboard"] => Self::AdminDashboard,
            ["admin", "users"] => Self::AdminUsers,
            ["admin", "courses"] => Self::AdminCourses,
            _ => return None,
        };

        Some(page)
    }

    /// The roles that may see this page, or [None] if it is public
    pub fn required_roles(&self) -> Option<&'static [Role]> {
        match self {
            Self::Home
            | Self::Login
            | Self::Register
            | Self::Courses
            | Self::CourseDetails { .. } => None,
            Self::MyCourses | Self::MyAssignments | Self::LessonView { .. } => Some(STUDENTS),
            Self::InstructorCourses
            | Self::CreateCourse
            | Self::EditCourse { .. }
            | Self::CreateLesson { .. }
            | Self::InstructorAssignments
            | Self::CreateAssignment
            | Self::ViewSubmissions { .. } => Some(STAFF),
            Self::AdminDashboard | Self::AdminUsers | Self::AdminCourses => Some(ADMINS),
        }
    }

    /// Pages that make no sense once logged in
    fn is_guest_only(&self) -> bool {
        matches!(self, Self::Login | Self::Register)
    }
}

/// Decides what visiting `path` with the given session results in
pub fn navigate(path: &str, session: Option<&SessionData>) -> Navigation {
    let Some(page) = Page::resolve(path) else {
        return Navigation::Redirect(Access::HOME_PATH);
    };

    if page.is_guest_only() && session.is_some() {
        return Navigation::Redirect(Access::HOME_PATH);
    }

    let Some(required) = page.required_roles() else {
        return Navigation::Render(page);
    };

    match gate::check(required, session).redirect() {
        Some(target) => Navigation::Redirect(target),
        None => Navigation::Render(page),
    }
}

#[cfg(test)]
mod test {
    use chrono::{Duration, Utc};

    use super::{navigate, Navigation, Page};
    use crate::{Role, SessionData, Status, UserProfile};

    fn session(role: Role) -> SessionData {
        SessionData::issue(
            UserProfile {
                id: 7,
                name: "Grace".to_string(),
                email: "grace@example.com".to_string(),
                role,
                status: Status::Active,
                created_at: Utc::now(),
            },
            Duration::hours(1),
        )
    }

    #[test]
    fn resolves_parameterized_paths() {
        assert_eq!(
            Page::resolve("/courses/3/lessons/12"),
            Some(Page::LessonView {
                course_id: 3,
                lesson_id: 12
            })
        );
        assert_eq!(
            Page::resolve("/instructor/courses/4/lessons/create/"),
            Some(Page::CreateLesson { course_id: 4 })
        );
        assert_eq!(
            Page::resolve("/instructor/courses/edit/9?tab=lessons"),
            Some(Page::EditCourse { course_id: 9 })
        );
        assert_eq!(Page::resolve("/courses/abc"), None);
        assert_eq!(Page::resolve("/nowhere"), None);
    }

    #[test]
    fn unknown_paths_go_home() {
        assert_eq!(navigate("/nowhere", None), Navigation::Redirect("/"));
        assert_eq!(
            navigate("/admin/secrets", Some(&session(Role::Admin))),
            Navigation::Redirect("/")
        );
    }

    #[test]
    fn public_pages_render_for_everyone() {
        assert_eq!(navigate("/courses", None), Navigation::Render(Page::Courses));
        assert_eq!(
            navigate("/courses/2", Some(&session(Role::Student))),
            Navigation::Render(Page::CourseDetails { course_id: 2 })
        );
    }

    #[test]
    fn login_redirects_when_logged_in() {
        assert_eq!(navigate("/login", None), Navigation::Render(Page::Login));
        assert_eq!(
            navigate("/register", Some(&session(Role::Student))),
            Navigation::Redirect("/")
        );
    }

    #[test]
    fn gated_pages() {
        assert_eq!(navigate("/my-courses", None), Navigation::Redirect("/login"));
        assert_eq!(
            navigate("/admin/users", Some(&session(Role::Instructor))),
            Navigation::Redirect("/")
        );
        assert_eq!(
            navigate("/instructor/assignments", Some(&session(Role::Admin))),
            Navigation::Render(Page::InstructorAssignments)
        );
        assert_eq!(
            navigate("/my-assignments", Some(&session(Role::Instructor))),
            Navigation::Redirect("/")
        );
    }
}
