use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::dto::UpdateClassroomRequest;
use super::repo_types::{CapacityRow, Classroom};
use crate::error::AppResult;
use crate::query::{fetch_page, Filter, ListParams, ListSpec, Page, SortDirection};

const CLASSROOM_COLUMNS: &str = "c.id, c.organization_id, c.teacher_id, u.name AS teacher_name, \
     c.name, c.grade_level, c.subject, c.capacity, c.room, \
     (SELECT COUNT(*) FROM classroom_students cs WHERE cs.classroom_id = c.id) AS student_count, \
     c.created_at";

const CLASSROOM_FROM: &str = "classrooms c \
     LEFT JOIN teachers t ON t.id = c.teacher_id \
     LEFT JOIN users u ON u.id = t.user_id";

static CLASSROOMS: ListSpec = ListSpec {
    columns: CLASSROOM_COLUMNS,
    from: CLASSROOM_FROM,
    search_columns: &["c.name", "c.subject"],
    sort_columns: &[
        ("name", "c.name"),
        ("subject", "c.subject"),
        ("gradeLevel", "c.grade_level"),
        ("createdAt", "c.created_at"),
    ],
    default_sort: ("c.created_at", SortDirection::Desc),
    tie_breaker: "c.id",
};

pub async fn list(db: &PgPool, organization_id: Uuid, params: &ListParams) -> AppResult<Page<Classroom>> {
    fetch_page(db, &CLASSROOMS, &[Filter::Id("c.organization_id", organization_id)], params).await
}

pub async fn get(db: &PgPool, id: Uuid) -> sqlx::Result<Option<Classroom>> {
    sqlx::query_as::<_, Classroom>(&format!(
        "SELECT {CLASSROOM_COLUMNS} FROM {CLASSROOM_FROM} WHERE c.id = $1"
    ))
    .bind(id)
    .fetch_optional(db)
    .await
}

pub struct NewClassroom<'a> {
    pub organization_id: Uuid,
    pub teacher_id: Option<Uuid>,
    pub name: &'a str,
    pub grade_level: &'a str,
    pub subject: &'a str,
    pub capacity: Option<i32>,
    pub room: Option<&'a str>,
}

pub async fn insert(db: &PgPool, new: NewClassroom<'_>) -> sqlx::Result<Uuid> {
    sqlx::query_scalar::<_, Uuid>(
        r#"
        INSERT INTO classrooms (organization_id, teacher_id, name, grade_level, subject, capacity, room)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id
        "#,
    )
    .bind(new.organization_id)
    .bind(new.teacher_id)
    .bind(new.name)
    .bind(new.grade_level)
    .bind(new.subject)
    .bind(new.capacity)
    .bind(new.room)
    .fetch_one(db)
    .await
}

pub async fn update(db: &PgPool, id: Uuid, name: Option<&str>, patch: &UpdateClassroomRequest) -> sqlx::Result<bool> {
    let res = sqlx::query(
        r#"
        UPDATE classrooms
           SET name = COALESCE($2, name),
               grade_level = COALESCE($3, grade_level),
               subject = COALESCE($4, subject),
               capacity = COALESCE($5, capacity),
               room = COALESCE($6, room),
               teacher_id = CASE WHEN $7 THEN $8 ELSE teacher_id END
         WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(name)
    .bind(patch.grade_level.as_deref().map(str::trim))
    .bind(patch.subject.as_deref().map(str::trim))
    .bind(patch.capacity)
    .bind(patch.room.as_deref().map(str::trim))
    .bind(patch.teacher_id.is_some())
    .bind(patch.teacher_id.flatten())
    .execute(db)
    .await?;
    Ok(res.rows_affected() > 0)
}

pub async fn delete(db: &PgPool, id: Uuid) -> sqlx::Result<bool> {
    let res = sqlx::query(r#"DELETE FROM classrooms WHERE id = $1"#)
        .bind(id)
        .execute(db)
        .await?;
    Ok(res.rows_affected() > 0)
}

pub async fn count(db: &PgPool, organization_id: Uuid) -> sqlx::Result<i64> {
    sqlx::query_scalar::<_, i64>(r#"SELECT COUNT(*) FROM classrooms WHERE organization_id = $1"#)
        .bind(organization_id)
        .fetch_one(db)
        .await
}

pub async fn enrolled_count(db: &PgPool, classroom_id: Uuid) -> sqlx::Result<i64> {
    sqlx::query_scalar::<_, i64>(r#"SELECT COUNT(*) FROM classroom_students WHERE classroom_id = $1"#)
        .bind(classroom_id)
        .fetch_one(db)
        .await
}

pub async fn is_enrolled(db: &PgPool, classroom_id: Uuid, student_id: Uuid) -> sqlx::Result<bool> {
    sqlx::query_scalar::<_, bool>(
        r#"SELECT EXISTS (SELECT 1 FROM classroom_students WHERE classroom_id = $1 AND student_id = $2)"#,
    )
    .bind(classroom_id)
    .bind(student_id)
    .fetch_one(db)
    .await
}

pub async fn lock_for_enrollment_tx(
    tx: &mut Transaction<'_, Postgres>,
    classroom_id: Uuid,
) -> sqlx::Result<Option<CapacityRow>> {
    sqlx::query_as::<_, CapacityRow>(
        r#"SELECT organization_id, capacity FROM classrooms WHERE id = $1 FOR UPDATE"#,
    )
    .bind(classroom_id)
    .fetch_optional(&mut **tx)
    .await
}

/// Number of `student_ids` that are students of `organization_id`.
pub async fn count_students_in_org_tx(
    tx: &mut Transaction<'_, Postgres>,
    organization_id: Uuid,
    student_ids: &[Uuid],
) -> sqlx::Result<i64> {
    sqlx::query_scalar::<_, i64>(
        r#"SELECT COUNT(*) FROM students WHERE organization_id = $1 AND id = ANY($2)"#,
    )
    .bind(organization_id)
    .bind(student_ids)
    .fetch_one(&mut **tx)
    .await
}

/// Returns (already enrolled among `student_ids`, total enrolled).
pub async fn enrollment_counts_tx(
    tx: &mut Transaction<'_, Postgres>,
    classroom_id: Uuid,
    student_ids: &[Uuid],
) -> sqlx::Result<(i64, i64)> {
    sqlx::query_as::<_, (i64, i64)>(
        r#"
        SELECT COUNT(*) FILTER (WHERE student_id = ANY($2)),
               COUNT(*)
          FROM classroom_students
         WHERE classroom_id = $1
        "#,
    )
    .bind(classroom_id)
    .bind(student_ids)
    .fetch_one(&mut **tx)
    .await
}

pub async fn enroll_tx(
    tx: &mut Transaction<'_, Postgres>,
    classroom_id: Uuid,
    student_ids: &[Uuid],
) -> sqlx::Result<u64> {
    let res = sqlx::query(
        r#"
        INSERT INTO classroom_students (classroom_id, student_id)
        SELECT $1, unnest($2::uuid[])
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(classroom_id)
    .bind(student_ids)
    .execute(&mut **tx)
    .await?;
    Ok(res.rows_affected())
}

pub async fn unenroll(db: &PgPool, classroom_id: Uuid, student_id: Uuid) -> sqlx::Result<bool> {
    let res = sqlx::query(r#"DELETE FROM classroom_students WHERE classroom_id = $1 AND student_id = $2"#)
        .bind(classroom_id)
        .bind(student_id)
        .execute(db)
        .await?;
    Ok(res.rows_affected() > 0)
}
