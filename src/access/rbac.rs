use serde::{Deserialize, Serialize};

/// Role a user holds across the whole installation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GlobalRole {
    Member,
    SuperAdmin,
}

impl GlobalRole {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "member" | "user" => Some(Self::Member),
            "super-admin" => Some(Self::SuperAdmin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Member => "member",
            Self::SuperAdmin => "super-admin",
        }
    }
}

/// Role a user holds inside one organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    Member,
    Admin,
    Owner,
}

impl MemberRole {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "member" => Some(Self::Member),
            "admin" => Some(Self::Admin),
            "owner" => Some(Self::Owner),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Member => "member",
            Self::Admin => "admin",
            Self::Owner => "owner",
        }
    }

    pub fn is_manager(&self) -> bool {
        matches!(self, Self::Admin | Self::Owner)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Organization,
    Member,
    Invitation,
    Classroom,
    Student,
    Teacher,
    Parent,
    Attendance,
    Grade,
    Quiz,
    QuizResponse,
    Dashboard,
}

impl Resource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Organization => "organization",
            Self::Member => "member",
            Self::Invitation => "invitation",
            Self::Classroom => "classroom",
            Self::Student => "student",
            Self::Teacher => "teacher",
            Self::Parent => "parent",
            Self::Attendance => "attendance",
            Self::Grade => "grade",
            Self::Quiz => "quiz",
            Self::QuizResponse => "quiz_response",
            Self::Dashboard => "dashboard",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Read,
    Create,
    Update,
    Delete,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

/// Decides whether a caller may perform `action` on `resource` in an
/// organization where they hold `membership` (None when not a member).
pub fn is_allowed(
    global: GlobalRole,
    membership: Option<MemberRole>,
    resource: Resource,
    action: Action,
) -> bool {
    if global == GlobalRole::SuperAdmin {
        return true;
    }
    let Some(role) = membership else {
        return false;
    };
    match (resource, action) {
        (_, Action::Read) => true,
        (Resource::QuizResponse, Action::Create) => true,
        (Resource::Organization, Action::Delete) => role == MemberRole::Owner,
        _ => role.is_manager(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_RESOURCES: [Resource; 12] = [
        Resource::Organization,
        Resource::Member,
        Resource::Invitation,
        Resource::Classroom,
        Resource::Student,
        Resource::Teacher,
        Resource::Parent,
        Resource::Attendance,
        Resource::Grade,
        Resource::Quiz,
        Resource::QuizResponse,
        Resource::Dashboard,
    ];
    const ALL_ACTIONS: [Action; 4] = [Action::Read, Action::Create, Action::Update, Action::Delete];

    #[test]
    fn super_admin_is_allowed_everything_without_membership() {
        for r in ALL_RESOURCES {
            for a in ALL_ACTIONS {
                assert!(is_allowed(GlobalRole::SuperAdmin, None, r, a));
            }
        }
    }

    #[test]
    fn non_member_is_denied_everything() {
        for r in ALL_RESOURCES {
            for a in ALL_ACTIONS {
                assert!(!is_allowed(GlobalRole::Member, None, r, a), "{:?} {:?}", r, a);
            }
        }
    }

    #[test]
    fn any_member_may_read() {
        for role in [MemberRole::Member, MemberRole::Admin, MemberRole::Owner] {
            for r in ALL_RESOURCES {
                assert!(is_allowed(GlobalRole::Member, Some(role), r, Action::Read));
            }
        }
    }

    #[test]
    fn plain_member_cannot_write_classrooms() {
        let m = Some(MemberRole::Member);
        assert!(!is_allowed(GlobalRole::Member, m, Resource::Classroom, Action::Create));
        assert!(!is_allowed(GlobalRole::Member, m, Resource::Classroom, Action::Update));
        assert!(!is_allowed(GlobalRole::Member, m, Resource::Classroom, Action::Delete));
    }

    #[test]
    fn plain_member_can_submit_quiz_response() {
        assert!(is_allowed(
            GlobalRole::Member,
            Some(MemberRole::Member),
            Resource::QuizResponse,
            Action::Create
        ));
    }

    #[test]
    fn only_owner_deletes_organization() {
        let g = GlobalRole::Member;
        assert!(is_allowed(g, Some(MemberRole::Owner), Resource::Organization, Action::Delete));
        assert!(!is_allowed(g, Some(MemberRole::Admin), Resource::Organization, Action::Delete));
        assert!(is_allowed(g, Some(MemberRole::Admin), Resource::Organization, Action::Update));
    }

    #[test]
    fn role_parsing() {
        assert_eq!(MemberRole::parse("Admin"), Some(MemberRole::Admin));
        assert_eq!(MemberRole::parse("teacher"), None);
        assert_eq!(GlobalRole::parse("super-admin"), Some(GlobalRole::SuperAdmin));
        assert_eq!(GlobalRole::SuperAdmin.as_str(), "super-admin");
        assert!(MemberRole::Owner > MemberRole::Admin);
    }
}
