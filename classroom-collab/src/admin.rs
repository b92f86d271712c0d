use log::info;

use crate::{
    CollabContext, CollabError, CollabEvent, CollabResult, Course, Enrollment, PrimaryKey, Role,
    Status, User, UserProfile,
};

/// User and course moderation for admins
pub struct Admin {
    context: CollabContext,
}

/// Totals shown on the admin dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DashboardStats {
    pub total_users: usize,
    pub active_users: usize,
    pub total_courses: usize,
    pub active_courses: usize,
    pub total_enrollments: usize,
}

impl Admin {
    pub fn new(context: &CollabContext) -> Self {
        Self {
            context: context.clone(),
        }
    }

    pub async fn dashboard(&self, actor: &UserProfile) -> CollabResult<DashboardStats> {
        ensure_admin(actor, "view the dashboard")?;

        let users = self.context.table::<User>();
        let courses = self.context.table::<Course>();
        let enrollments = self.context.table::<Enrollment>();

        let (users, courses, enrollments) =
            futures_util::try_join!(users.all(), courses.all(), enrollments.all())?;

        Ok(DashboardStats {
            total_users: users.len(),
            active_users: users.iter().filter(|u| u.status.is_active()).count(),
            total_courses: courses.len(),
            active_courses: courses.iter().filter(|c| c.status.is_active()).count(),
            total_enrollments: enrollments.len(),
        })
    }

    pub async fn users(&self, actor: &UserProfile) -> CollabResult<Vec<UserProfile>> {
        ensure_admin(actor, "list users")?;

        let users = self.context.table::<User>().all().await?;
        Ok(users.iter().map(UserProfile::from).collect())
    }

    /// Activates or deactivates a user. Deactivated users are logged out everywhere.
    pub async fn toggle_user_status(
        &self,
        actor: &UserProfile,
        user_id: PrimaryKey,
    ) -> CollabResult<UserProfile> {
        ensure_admin(actor, "change user status")?;

        if actor.id == user_id {
            return Err(CollabError::NotPermitted {
                action: "deactivate yourself",
            });
        }

        let table = self.context.table::<User>();
        let user = table.get(user_id).await?;

        let status = user.status.toggled();
        let updated = table.replace(&User { status, ..user }).await?;

        if status == Status::Inactive {
            self.context.sessions.clear_user(user_id)?;
        }

        info!("{} set {} to {:?}", actor.email, updated.email, status);
        self.context
            .emit(CollabEvent::UserStatusChanged { user_id, status });

        Ok(UserProfile::from(&updated))
    }

    pub async fn delete_user(&self, actor: &UserProfile, user_id: PrimaryKey) -> CollabResult<()> {
        ensure_admin(actor, "delete users")?;

        if actor.id == user_id {
            return Err(CollabError::NotPermitted {
                action: "delete yourself",
            });
        }

        self.context.table::<User>().delete(user_id).await?;
        self.context.sessions.clear_user(user_id)?;

        info!("{} deleted user {}", actor.email, user_id);
        self.context.emit(CollabEvent::UserDeleted { user_id });

        Ok(())
    }

    /// Every course, in any status
    pub async fn courses(&self, actor: &UserProfile) -> CollabResult<Vec<Course>> {
        ensure_admin(actor, "list all courses")?;

        Ok(self.context.table::<Course>().all().await?)
    }
}

fn ensure_admin(actor: &UserProfile, action: &'static str) -> CollabResult<()> {
    if actor.role != Role::Admin {
        return Err(CollabError::NotPermitted { action });
    }

    Ok(())
}
