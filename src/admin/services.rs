use uuid::Uuid;

use crate::access::GlobalRole;
use crate::error::{AppError, AppResult};

pub fn check_ban(actor: Uuid, target: Uuid) -> AppResult<()> {
    if actor == target {
        return Err(AppError::validation("You cannot ban yourself"));
    }
    Ok(())
}

/// A super-admin may not demote themself and leave the installation
/// without an administrator.
pub fn check_role_change(actor: Uuid, target: Uuid, role: GlobalRole) -> AppResult<()> {
    if actor == target && role != GlobalRole::SuperAdmin {
        return Err(AppError::validation("You cannot remove your own super-admin role"));
    }
    Ok(())
}

pub fn ban_reason(reason: Option<&str>) -> Option<String> {
    reason.map(str::trim).filter(|r| !r.is_empty()).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn self_ban_is_rejected() {
        let me = Uuid::new_v4();
        assert!(matches!(check_ban(me, me), Err(AppError::Validation(_))));
        assert!(check_ban(me, Uuid::new_v4()).is_ok());
    }

    #[test]
    fn self_demotion_is_rejected() {
        let me = Uuid::new_v4();
        assert!(check_role_change(me, me, GlobalRole::Member).is_err());
        assert!(check_role_change(me, me, GlobalRole::SuperAdmin).is_ok());
        assert!(check_role_change(me, Uuid::new_v4(), GlobalRole::Member).is_ok());
    }

    #[test]
    fn blank_reason_is_dropped() {
        assert_eq!(ban_reason(Some("  ")), None);
        assert_eq!(ban_reason(Some(" spam ")).as_deref(), Some("spam"));
    }
}
