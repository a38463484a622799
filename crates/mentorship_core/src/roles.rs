//! crates/mentorship_core/src/roles.rs
//!
//! Role derivation and profile completeness rules.

use crate::domain::Profile;

/// Exactly one role holds for a resolved principal; precedence is
/// admin > mentor > student.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Mentor,
    Student,
}

impl Role {
    /// Derives the role from the two membership lookups.
    ///
    /// Mentor status is ignored when the admin lookup succeeded.
    pub fn derive(is_admin: bool, is_approved_mentor: bool) -> Self {
        if is_admin {
            Role::Admin
        } else if is_approved_mentor {
            Role::Mentor
        } else {
            Role::Student
        }
    }

    pub fn flags(self) -> RoleFlags {
        RoleFlags::from(self)
    }
}

/// The boolean projection of [`Role`] read by guards and views.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoleFlags {
    pub is_admin: bool,
    pub is_mentor: bool,
    pub is_student: bool,
}

impl RoleFlags {
    /// All false: no principal is resolved.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn role(&self) -> Option<Role> {
        match (self.is_admin, self.is_mentor, self.is_student) {
            (true, _, _) => Some(Role::Admin),
            (false, true, _) => Some(Role::Mentor),
            (false, false, true) => Some(Role::Student),
            _ => None,
        }
    }
}

impl From<Role> for RoleFlags {
    fn from(role: Role) -> Self {
        RoleFlags {
            is_admin: role == Role::Admin,
            is_mentor: role == Role::Mentor,
            is_student: role == Role::Student,
        }
    }
}

fn filled(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

/// Names are required for everyone; students also need their education
/// level, English level and at least one interest.
pub fn is_profile_complete(profile: &Profile, role: Role) -> bool {
    let names = filled(&profile.first_name) && filled(&profile.last_name);
    if role != Role::Student {
        return names;
    }
    names
        && filled(&profile.education_level)
        && filled(&profile.english_level)
        && profile.interests.iter().any(|i| !i.trim().is_empty())
}
