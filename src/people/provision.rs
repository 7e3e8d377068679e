use sqlx::{Postgres, Transaction};
use tracing::{info, warn};
use uuid::Uuid;

use super::NewPerson;
use crate::access::{GlobalRole, MemberRole};
use crate::auth::password::{check_strength, hash_password, unusable_password_hash};
use crate::auth::repo_types::User;
use crate::auth::services::{is_valid_email, normalize_email};
use crate::error::{AppError, AppResult};
use crate::members::repo as members_repo;

pub fn validate(person: &NewPerson) -> AppResult<(String, String)> {
    let email = normalize_email(&person.email);
    if !is_valid_email(&email) {
        return Err(AppError::validation("Invalid email"));
    }
    if let Some(pw) = &person.password {
        check_strength(pw)?;
    }
    Ok((email, person.name.trim().to_string()))
}

/// Finds or creates the user behind a profile and makes sure they are a
/// member of `organization_id`. Runs inside the caller's transaction.
pub async fn provision_tx(
    tx: &mut Transaction<'_, Postgres>,
    organization_id: Uuid,
    person: &NewPerson,
) -> AppResult<Uuid> {
    let (email, name) = validate(person)?;

    let user = match User::find_by_email(&mut **tx, &email).await? {
        Some(u) => u,
        None => {
            if name.is_empty() {
                return Err(AppError::validation("Name is required for new accounts"));
            }
            let hash = match &person.password {
                Some(pw) => hash_password(pw)?,
                None => unusable_password_hash()?,
            };
            let u = User::create(&mut **tx, &email, &name, &hash).await?;
            info!(user_id = %u.id, "account provisioned");
            u
        }
    };

    members_repo::upsert_tx(tx, organization_id, user.id, MemberRole::Member).await?;
    Ok(user.id)
}

/// An organization may only rename accounts it alone manages: never a
/// super-admin, never someone who is also a member elsewhere.
pub fn check_rename(global_role: &str, member_elsewhere: bool) -> AppResult<()> {
    if GlobalRole::parse(global_role) == Some(GlobalRole::SuperAdmin) || member_elsewhere {
        return Err(AppError::PermissionDenied(
            "Account is shared with other organizations and cannot be renamed here".into(),
        ));
    }
    Ok(())
}

/// Renames the account behind a profile owned by `organization_id`.
pub async fn rename_tx(
    tx: &mut Transaction<'_, Postgres>,
    organization_id: Uuid,
    user_id: Uuid,
    name: &str,
) -> AppResult<()> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::validation("Name cannot be empty"));
    }

    let (role, elsewhere) = sqlx::query_as::<_, (String, bool)>(
        r#"
        SELECT u.role,
               EXISTS (
                   SELECT 1 FROM members m
                    WHERE m.user_id = u.id AND m.organization_id <> $2
               )
          FROM users u
         WHERE u.id = $1
           FOR UPDATE OF u
        "#,
    )
    .bind(user_id)
    .bind(organization_id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or_else(|| AppError::not_found("User"))?;

    if let Err(e) = check_rename(&role, elsewhere) {
        warn!(%user_id, %organization_id, "rename of shared account refused");
        return Err(e);
    }

    sqlx::query(r#"UPDATE users SET name = $2 WHERE id = $1"#)
        .bind(user_id)
        .bind(name)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person(email: &str, password: Option<&str>) -> NewPerson {
        NewPerson {
            email: email.into(),
            name: "  Ada Lovelace ".into(),
            password: password.map(Into::into),
        }
    }

    #[test]
    fn validate_normalizes_email_and_name() {
        let (email, name) = validate(&person(" Ada@School.EDU", None)).unwrap();
        assert_eq!(email, "ada@school.edu");
        assert_eq!(name, "Ada Lovelace");
    }

    #[test]
    fn validate_rejects_bad_email_and_weak_password() {
        assert!(validate(&person("ada", None)).is_err());
        assert!(validate(&person("ada@school.edu", Some("123"))).is_err());
        assert!(validate(&person("ada@school.edu", Some("long-enough-pw"))).is_ok());
    }

    #[test]
    fn rename_is_limited_to_accounts_owned_by_one_organization() {
        assert!(check_rename("member", false).is_ok());
        assert!(matches!(check_rename("member", true), Err(AppError::PermissionDenied(_))));
        assert!(matches!(check_rename("super-admin", false), Err(AppError::PermissionDenied(_))));
    }
}
