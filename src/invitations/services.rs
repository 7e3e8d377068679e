use serde::Serialize;
use time::{Duration, OffsetDateTime};
use tracing::{info, warn};
use uuid::Uuid;

use super::dto::{AcceptInvitationResponse, InviteResponse};
use super::repo;
use super::repo_types::Invitation;
use crate::access::MemberRole;
use crate::auth::services::{is_valid_email, normalize_email, random_token};
use crate::auth::Session;
use crate::error::{AppError, AppResult};
use crate::members::repo as members_repo;
use crate::state::AppState;

pub const TOKEN_LEN: usize = 40;

/// Lifecycle state; `Expired` is derived from `expires_at`, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InvitationState {
    Pending,
    Expired,
    Accepted,
}

impl InvitationState {
    pub fn derive(status: &str, expires_at: OffsetDateTime, now: OffsetDateTime) -> Self {
        match status {
            "accepted" => Self::Accepted,
            _ if expires_at <= now => Self::Expired,
            _ => Self::Pending,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InviteOutcome {
    AlreadyMember,
    AlreadyPending,
    Renew(Uuid),
    Create,
}

pub fn plan_invite(is_member: bool, pending: Option<&Invitation>, now: OffsetDateTime) -> InviteOutcome {
    if is_member {
        return InviteOutcome::AlreadyMember;
    }
    match pending {
        Some(inv) if inv.expires_at > now => InviteOutcome::AlreadyPending,
        Some(inv) => InviteOutcome::Renew(inv.id),
        None => InviteOutcome::Create,
    }
}

/// Trims, lowercases, validates and de-duplicates, keeping first-seen order.
pub fn normalize_emails(raw: &[String]) -> AppResult<Vec<String>> {
    let mut out: Vec<String> = Vec::with_capacity(raw.len());
    for e in raw {
        let email = normalize_email(e);
        if email.is_empty() {
            continue;
        }
        if !is_valid_email(&email) {
            return Err(AppError::validation(format!("Invalid email: {}", email)));
        }
        if !out.contains(&email) {
            out.push(email);
        }
    }
    if out.is_empty() {
        return Err(AppError::validation("At least one email is required"));
    }
    Ok(out)
}

pub fn check_acceptable(inv: &Invitation, session_email: &str, now: OffsetDateTime) -> AppResult<()> {
    if !inv.email.eq_ignore_ascii_case(session_email) {
        return Err(AppError::PermissionDenied("This invitation is not for you".into()));
    }
    match InvitationState::derive(&inv.status, inv.expires_at, now) {
        InvitationState::Accepted => Err(AppError::conflict("Invitation already accepted")),
        InvitationState::Expired => Err(AppError::validation("Invitation has expired")),
        InvitationState::Pending => Ok(()),
    }
}

pub async fn invite_many(
    st: &AppState,
    inviter_id: Uuid,
    organization_id: Uuid,
    emails: Vec<String>,
    role: MemberRole,
) -> AppResult<InviteResponse> {
    let now = OffsetDateTime::now_utc();
    let expires_at = now + Duration::days(st.config.invitation_ttl_days);

    let mut tx = st.db.begin().await?;
    let mut invitations = Vec::new();
    let mut existing = 0;

    for email in emails {
        let is_member = members_repo::is_member_by_email_tx(&mut tx, organization_id, &email).await?;
        let pending = repo::find_pending_tx(&mut tx, organization_id, &email).await?;
        let token = random_token(TOKEN_LEN);

        let inv = match plan_invite(is_member, pending.as_ref(), now) {
            InviteOutcome::AlreadyMember | InviteOutcome::AlreadyPending => None,
            InviteOutcome::Renew(id) => {
                Some(repo::renew_tx(&mut tx, id, role.as_str(), inviter_id, &token, expires_at).await?)
            }
            InviteOutcome::Create => {
                repo::insert_tx(&mut tx, organization_id, &email, role.as_str(), inviter_id, &token, expires_at)
                    .await?
            }
        };
        match inv {
            Some(inv) => invitations.push(inv),
            None => {
                existing += 1;
            }
        }
    }
    tx.commit().await?;

    info!(%organization_id, invited = invitations.len(), existing, "invitations issued");
    Ok(InviteResponse {
        invited: invitations.len(),
        existing,
        invitations,
    })
}

/// Creates the membership and marks the invitation accepted atomically.
pub async fn accept(st: &AppState, session: &Session, token: &str) -> AppResult<AcceptInvitationResponse> {
    let now = OffsetDateTime::now_utc();
    let mut tx = st.db.begin().await?;

    let inv = repo::find_by_token_tx(&mut tx, token)
        .await?
        .ok_or_else(|| AppError::not_found("Invitation"))?;

    if let Err(e) = check_acceptable(&inv, &session.email, now) {
        warn!(invitation_id = %inv.id, user_id = %session.user_id, error = %e, "invitation not acceptable");
        return Err(e);
    }

    let role = MemberRole::parse(&inv.role).unwrap_or(MemberRole::Member);
    let created = members_repo::upsert_tx(&mut tx, inv.organization_id, session.user_id, role).await?;
    repo::mark_accepted_tx(&mut tx, inv.id).await?;
    tx.commit().await?;

    info!(invitation_id = %inv.id, organization_id = %inv.organization_id, user_id = %session.user_id, "invitation accepted");
    Ok(AcceptInvitationResponse {
        organization_id: inv.organization_id,
        role: role.as_str().to_string(),
        already_member: !created,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invitation(status: &str, expires_in: Duration) -> Invitation {
        let now = OffsetDateTime::now_utc();
        Invitation {
            id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            email: "kid@school.edu".into(),
            role: "member".into(),
            inviter_id: Uuid::new_v4(),
            token: "t".into(),
            status: status.into(),
            expires_at: now + expires_in,
            created_at: now,
        }
    }

    #[test]
    fn state_is_derived_from_expiry() {
        let now = OffsetDateTime::now_utc();
        assert_eq!(InvitationState::derive("pending", now + Duration::days(1), now), InvitationState::Pending);
        assert_eq!(InvitationState::derive("pending", now - Duration::seconds(1), now), InvitationState::Expired);
        assert_eq!(InvitationState::derive("accepted", now - Duration::days(30), now), InvitationState::Accepted);
    }

    #[test]
    fn reinviting_pending_email_counts_as_existing() {
        let now = OffsetDateTime::now_utc();
        let pending = invitation("pending", Duration::days(3));
        assert_eq!(plan_invite(false, Some(&pending), now), InviteOutcome::AlreadyPending);
    }

    #[test]
    fn members_are_existing_and_expired_invites_renew() {
        let now = OffsetDateTime::now_utc();
        assert_eq!(plan_invite(true, None, now), InviteOutcome::AlreadyMember);
        let stale = invitation("pending", Duration::days(-1));
        assert_eq!(plan_invite(false, Some(&stale), now), InviteOutcome::Renew(stale.id));
        assert_eq!(plan_invite(false, None, now), InviteOutcome::Create);
    }

    #[test]
    fn emails_are_normalized_and_deduplicated() {
        let raw = vec![
            " A@School.edu ".to_string(),
            "a@school.edu".to_string(),
            "".to_string(),
            "b@school.edu".to_string(),
        ];
        assert_eq!(normalize_emails(&raw).unwrap(), vec!["a@school.edu", "b@school.edu"]);
        assert!(normalize_emails(&["nope".to_string()]).is_err());
        assert!(normalize_emails(&[]).is_err());
    }

    #[test]
    fn acceptance_requires_matching_email() {
        let now = OffsetDateTime::now_utc();
        let inv = invitation("pending", Duration::days(7));
        assert!(check_acceptable(&inv, "KID@school.edu", now).is_ok());
        assert!(matches!(
            check_acceptable(&inv, "other@school.edu", now),
            Err(AppError::PermissionDenied(_))
        ));
    }

    #[test]
    fn acceptance_happens_once_and_before_expiry() {
        let now = OffsetDateTime::now_utc();
        let accepted = invitation("accepted", Duration::days(7));
        assert!(matches!(check_acceptable(&accepted, "kid@school.edu", now), Err(AppError::Conflict(_))));
        let expired = invitation("pending", Duration::days(-8));
        assert!(matches!(check_acceptable(&expired, "kid@school.edu", now), Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn concurrent_reinvites_count_as_existing() {
        let Some(st) = crate::testing::pg_state().await else { return };
        let org = crate::testing::organization(&st.db).await;
        let inviter = crate::testing::admin(&st.db, org).await;

        let (a, b) = tokio::join!(
            invite_many(&st, inviter.user_id, org, vec!["kid@school.edu".into()], MemberRole::Member),
            invite_many(&st, inviter.user_id, org, vec!["kid@school.edu".into()], MemberRole::Member),
        );
        let (a, b) = (a.unwrap(), b.unwrap());

        assert_eq!(a.invited + b.invited, 1);
        assert_eq!(a.existing + b.existing, 1);
    }
}
