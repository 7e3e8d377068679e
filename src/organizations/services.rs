use tracing::info;
use uuid::Uuid;

use super::{repo, repo_types::Organization};
use crate::access::MemberRole;
use crate::error::{AppError, AppResult};
use crate::members::repo as members_repo;
use crate::state::AppState;

/// Lowercase ASCII words joined by single dashes.
pub fn slugify(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut pending_dash = false;
    for ch in input.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    out
}

pub fn validate_slug(slug: &str) -> AppResult<()> {
    if slug.is_empty() || slugify(slug) != slug {
        return Err(AppError::validation(
            "Slug must contain lowercase letters, digits and single dashes",
        ));
    }
    Ok(())
}

/// Creates the organization and the creator's owner membership together.
pub async fn create_with_owner(
    st: &AppState,
    owner_id: Uuid,
    name: &str,
    slug: &str,
) -> AppResult<Organization> {
    let mut tx = st.db.begin().await?;
    let org = repo::insert_tx(&mut tx, name, slug).await?;
    members_repo::upsert_tx(&mut tx, org.id, owner_id, MemberRole::Owner).await?;
    tx.commit().await?;

    info!(organization_id = %org.id, %owner_id, "organization created");
    Ok(org)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("North Campus"), "north-campus");
        assert_eq!(slugify("  St. Mary's -- High School!  "), "st-mary-s-high-school");
        assert_eq!(slugify("***"), "");
    }

    #[test]
    fn validate_slug_rejects_non_canonical() {
        assert!(validate_slug("north-campus").is_ok());
        assert!(validate_slug("North Campus").is_err());
        assert!(validate_slug("a--b").is_err());
        assert!(validate_slug("").is_err());
    }
}
