use crate::access::{Grant, MemberRole};
use crate::error::{AppError, AppResult};

/// Owner role changes need an owner (or super-admin), and an organization
/// always keeps one owner.
pub fn check_role_change(
    grant: &Grant,
    current: MemberRole,
    requested: MemberRole,
    owner_count: usize,
) -> AppResult<()> {
    let touches_owner = current == MemberRole::Owner || requested == MemberRole::Owner;
    if touches_owner && !grant.is_owner() {
        return Err(AppError::PermissionDenied(
            "Only owners can grant or revoke the owner role".into(),
        ));
    }
    if current == MemberRole::Owner && requested != MemberRole::Owner && owner_count <= 1 {
        return Err(AppError::validation("Organization must keep at least one owner"));
    }
    Ok(())
}

pub fn check_removal(grant: &Grant, current: MemberRole, owner_count: usize) -> AppResult<()> {
    if current == MemberRole::Owner {
        if !grant.is_owner() {
            return Err(AppError::PermissionDenied("Only owners can remove an owner".into()));
        }
        if owner_count <= 1 {
            return Err(AppError::validation("Organization must keep at least one owner"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::GlobalRole;

    fn grant(role: MemberRole) -> Grant {
        Grant { global: GlobalRole::Member, membership: Some(role) }
    }

    #[test]
    fn admin_cannot_promote_to_owner() {
        let res = check_role_change(&grant(MemberRole::Admin), MemberRole::Member, MemberRole::Owner, 1);
        assert!(matches!(res, Err(AppError::PermissionDenied(_))));
    }

    #[test]
    fn admin_can_promote_member_to_admin() {
        assert!(check_role_change(&grant(MemberRole::Admin), MemberRole::Member, MemberRole::Admin, 1).is_ok());
    }

    #[test]
    fn last_owner_cannot_be_demoted_or_removed() {
        let owner = grant(MemberRole::Owner);
        assert!(matches!(
            check_role_change(&owner, MemberRole::Owner, MemberRole::Admin, 1),
            Err(AppError::Validation(_))
        ));
        assert!(check_role_change(&owner, MemberRole::Owner, MemberRole::Admin, 2).is_ok());
        assert!(matches!(check_removal(&owner, MemberRole::Owner, 1), Err(AppError::Validation(_))));
        assert!(check_removal(&owner, MemberRole::Owner, 2).is_ok());
    }

    #[test]
    fn super_admin_acts_as_owner() {
        let root = Grant { global: GlobalRole::SuperAdmin, membership: None };
        assert!(check_role_change(&root, MemberRole::Admin, MemberRole::Owner, 1).is_ok());
        assert!(check_removal(&root, MemberRole::Owner, 3).is_ok());
    }

    #[test]
    fn admin_removes_plain_members_only() {
        let admin = grant(MemberRole::Admin);
        assert!(check_removal(&admin, MemberRole::Member, 1).is_ok());
        assert!(matches!(check_removal(&admin, MemberRole::Owner, 2), Err(AppError::PermissionDenied(_))));
    }
}
