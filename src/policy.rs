use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub const UNKNOWN_ROLE_NAME: &str = "Usuario";

/// Fixed role enumeration. The numeric ids are what the remote API and the
/// stored identity blob carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum Role {
    Administrator,
    Teacher,
    Student,
    Development,
    Coordinator,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::Administrator,
        Role::Teacher,
        Role::Student,
        Role::Development,
        Role::Coordinator,
    ];

    pub fn id(self) -> i64 {
        match self {
            Role::Administrator => 1,
            Role::Teacher => 2,
            Role::Student => 3,
            Role::Development => 4,
            Role::Coordinator => 5,
        }
    }

    pub fn from_id(id: i64) -> Option<Self> {
        match id {
            1 => Some(Role::Administrator),
            2 => Some(Role::Teacher),
            3 => Some(Role::Student),
            4 => Some(Role::Development),
            5 => Some(Role::Coordinator),
            _ => None,
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Role::Administrator => "Administrador",
            Role::Teacher => "Profesor",
            Role::Student => "Alumno",
            Role::Development => "Personal de Desarrollo",
            Role::Coordinator => "Coordinador",
        }
    }

    /// Maps a role label from the remote API. Unrecognized labels fall back
    /// to Student; downstream capability checks rely on that default.
    pub fn from_label(label: &str) -> Self {
        match Self::parse_label(label) {
            Some(role) => role,
            None => {
                tracing::warn!(label, "unrecognized role label, defaulting to student");
                Role::Student
            }
        }
    }

    fn parse_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "administrador" => Some(Role::Administrator),
            "profesor" | "docente" => Some(Role::Teacher),
            "alumno" | "estudiante" => Some(Role::Student),
            "personal de desarrollo" | "desarrollo" => Some(Role::Development),
            "coordinador" => Some(Role::Coordinator),
            _ => None,
        }
    }
}

impl From<Role> for i64 {
    fn from(role: Role) -> Self {
        role.id()
    }
}

impl TryFrom<i64> for Role {
    type Error = String;

    fn try_from(id: i64) -> Result<Self, Self::Error> {
        Role::from_id(id).ok_or_else(|| format!("unknown role id {}", id))
    }
}

pub fn role_name(role_id: i64) -> &'static str {
    Role::from_id(role_id)
        .map(Role::display_name)
        .unwrap_or(UNKNOWN_ROLE_NAME)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    ManageUsers,
    ManageCourses,
    ManageTasks,
    Grade,
    ViewReports,
    SendMassNotices,
    ManageSystem,
    ViewOwnGrades,
    SubmitTasks,
}

impl Capability {
    pub const ALL: [Capability; 9] = [
        Capability::ManageUsers,
        Capability::ManageCourses,
        Capability::ManageTasks,
        Capability::Grade,
        Capability::ViewReports,
        Capability::SendMassNotices,
        Capability::ManageSystem,
        Capability::ViewOwnGrades,
        Capability::SubmitTasks,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Capability::ManageUsers => "canManageUsers",
            Capability::ManageCourses => "canManageCourses",
            Capability::ManageTasks => "canManageTasks",
            Capability::Grade => "canGrade",
            Capability::ViewReports => "canViewReports",
            Capability::SendMassNotices => "canSendMassNotices",
            Capability::ManageSystem => "canManageSystem",
            Capability::ViewOwnGrades => "canViewOwnGrades",
            Capability::SubmitTasks => "canSubmitTasks",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.key() == s)
    }

    fn granted_to(self) -> &'static [Role] {
        use Role::*;
        match self {
            Capability::ManageUsers => &[Administrator],
            Capability::ManageCourses => &[Administrator, Coordinator],
            Capability::ManageTasks => &[Administrator, Teacher, Coordinator],
            Capability::Grade => &[Administrator, Teacher],
            Capability::ViewReports => &[Administrator, Teacher, Development, Coordinator],
            Capability::SendMassNotices => &[Administrator, Coordinator],
            Capability::ManageSystem => &[Administrator, Development],
            Capability::ViewOwnGrades => &[Student],
            Capability::SubmitTasks => &[Student],
        }
    }
}

pub fn has_capability(role_id: i64, capability: Capability) -> bool {
    match Role::from_id(role_id) {
        Some(role) => capability.granted_to().contains(&role),
        None => false,
    }
}

/// Capability flags for one role id. Built on demand from the role; callers
/// must not hold on to it across identity changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilitySet {
    pub can_manage_users: bool,
    pub can_manage_courses: bool,
    pub can_manage_tasks: bool,
    pub can_grade: bool,
    pub can_view_reports: bool,
    pub can_send_mass_notices: bool,
    pub can_manage_system: bool,
    pub can_view_own_grades: bool,
    pub can_submit_tasks: bool,
}

impl CapabilitySet {
    pub fn none() -> Self {
        Self::for_role_id(0)
    }

    pub fn for_role_id(role_id: i64) -> Self {
        let has = |c| has_capability(role_id, c);
        Self {
            can_manage_users: has(Capability::ManageUsers),
            can_manage_courses: has(Capability::ManageCourses),
            can_manage_tasks: has(Capability::ManageTasks),
            can_grade: has(Capability::Grade),
            can_view_reports: has(Capability::ViewReports),
            can_send_mass_notices: has(Capability::SendMassNotices),
            can_manage_system: has(Capability::ManageSystem),
            can_view_own_grades: has(Capability::ViewOwnGrades),
            can_submit_tasks: has(Capability::SubmitTasks),
        }
    }
}

/// Role set attached to a destination or nav entry. Empty means any
/// authenticated identity.
pub type RoleSet = BTreeSet<Role>;

pub fn allows(allowed: &RoleSet, role: Role) -> bool {
    allowed.is_empty() || allowed.contains(&role)
}

/// Parses a list of role ids, rejecting ids outside the enumeration so a
/// typo in a declared table cannot silently open a page.
pub fn parse_role_ids(ids: &[i64]) -> Result<RoleSet, String> {
    ids.iter()
        .map(|id| Role::from_id(*id).ok_or_else(|| format!("unknown role id {}", id)))
        .collect()
}
