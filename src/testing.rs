//! Postgres fixtures for tests that exercise row locks and upserts. They
//! need a reachable `DATABASE_URL`; without one `pg_state` returns `None`
//! and the test returns early.

use sqlx::PgPool;
use uuid::Uuid;

use crate::access::{GlobalRole, MemberRole};
use crate::auth::Session;
use crate::state::AppState;

pub async fn pg_state() -> Option<AppState> {
    let url = std::env::var("DATABASE_URL").ok()?;
    let db = sqlx::postgres::PgPoolOptions::new()
        .max_connections(8)
        .connect(&url)
        .await
        .ok()?;
    sqlx::migrate!("./migrations").run(&db).await.expect("run migrations");
    Some(AppState::from_parts(db, AppState::test_config()))
}

pub async fn user(db: &PgPool, name: &str) -> Session {
    let email = format!("{}@campusdesk.test", Uuid::new_v4());
    let user_id = sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO users (email, name, password_hash) VALUES ($1, $2, 'x') RETURNING id",
    )
    .bind(&email)
    .bind(name)
    .fetch_one(db)
    .await
    .expect("insert user");
    Session { user_id, email, role: GlobalRole::Member }
}

pub async fn organization(db: &PgPool) -> Uuid {
    let slug = format!("school-{}", Uuid::new_v4().simple());
    sqlx::query_scalar::<_, Uuid>("INSERT INTO organizations (name, slug) VALUES ('School', $1) RETURNING id")
        .bind(slug)
        .fetch_one(db)
        .await
        .expect("insert organization")
}

pub async fn member(db: &PgPool, organization_id: Uuid, user_id: Uuid, role: MemberRole) -> Uuid {
    sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO members (organization_id, user_id, role) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(organization_id)
    .bind(user_id)
    .bind(role.as_str())
    .fetch_one(db)
    .await
    .expect("insert member")
}

/// A manager account of `organization_id`.
pub async fn admin(db: &PgPool, organization_id: Uuid) -> Session {
    let session = user(db, "Admin").await;
    member(db, organization_id, session.user_id, MemberRole::Admin).await;
    session
}

pub async fn owner_count(db: &PgPool, organization_id: Uuid) -> i64 {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM members WHERE organization_id = $1 AND role = 'owner'")
        .bind(organization_id)
        .fetch_one(db)
        .await
        .expect("count owners")
}

/// Student profile for an existing account; adds the membership too.
pub async fn student_for(db: &PgPool, organization_id: Uuid, user_id: Uuid) -> Uuid {
    member(db, organization_id, user_id, MemberRole::Member).await;
    sqlx::query_scalar::<_, Uuid>("INSERT INTO students (organization_id, user_id) VALUES ($1, $2) RETURNING id")
        .bind(organization_id)
        .bind(user_id)
        .fetch_one(db)
        .await
        .expect("insert student")
}

pub async fn student(db: &PgPool, organization_id: Uuid) -> Uuid {
    let account = user(db, "Pupil").await;
    student_for(db, organization_id, account.user_id).await
}

pub async fn enrolled_classroom(db: &PgPool, organization_id: Uuid, students: &[Uuid]) -> Uuid {
    let classroom_id = sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO classrooms (organization_id, name) VALUES ($1, '7B') RETURNING id",
    )
    .bind(organization_id)
    .fetch_one(db)
    .await
    .expect("insert classroom");
    sqlx::query("INSERT INTO classroom_students (classroom_id, student_id) SELECT $1, unnest($2::uuid[])")
        .bind(classroom_id)
        .bind(students)
        .execute(db)
        .await
        .expect("enroll students");
    classroom_id
}
