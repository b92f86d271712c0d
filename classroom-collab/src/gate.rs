//! The role gate decides whether a session may see something that requires a role.

use crate::{Role, SessionData};

/// The outcome of checking a session against a set of required roles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Render,
    /// There is no session at all
    RedirectToLogin,
    /// There is a session, but its role isn't one of the required ones
    RedirectToHome,
}

impl Access {
    pub const LOGIN_PATH: &'static str = "/login";
    pub const HOME_PATH: &'static str = "/";

    /// Where to send the user instead, if anywhere
    pub fn redirect(&self) -> Option<&'static str> {
        match self {
            Self::Render => None,
            Self::RedirectToLogin => Some(Self::LOGIN_PATH),
            Self::RedirectToHome => Some(Self::HOME_PATH),
        }
    }
}

/// An empty set of required roles allows every role
pub fn allowed(required: &[Role], role: Role) -> bool {
    required.is_empty() || required.contains(&role)
}

pub fn check(required: &[Role], session: Option<&SessionData>) -> Access {
    match session {
        None => Access::RedirectToLogin,
        Some(session) if allowed(required, session.role()) => Access::Render,
        Some(_) => Access::RedirectToHome,
    }
}
