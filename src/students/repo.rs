use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::repo_types::Student;
use crate::error::AppResult;
use crate::query::{fetch_page, Filter, ListParams, ListSpec, Page, SortDirection};

const STUDENT_COLUMNS: &str = "s.id, s.user_id, s.organization_id, u.name, u.email, \
                               s.grade_level, s.medical_info, s.created_at";

static STUDENTS: ListSpec = ListSpec {
    columns: STUDENT_COLUMNS,
    from: "students s JOIN users u ON u.id = s.user_id",
    search_columns: &["u.name", "u.email"],
    sort_columns: &[
        ("name", "u.name"),
        ("email", "u.email"),
        ("gradeLevel", "s.grade_level"),
        ("createdAt", "s.created_at"),
    ],
    default_sort: ("s.created_at", SortDirection::Desc),
    tie_breaker: "s.id",
};

pub async fn list(db: &PgPool, organization_id: Uuid, params: &ListParams) -> AppResult<Page<Student>> {
    fetch_page(db, &STUDENTS, &[Filter::Id("s.organization_id", organization_id)], params).await
}

pub async fn get(db: &PgPool, id: Uuid) -> sqlx::Result<Option<Student>> {
    sqlx::query_as::<_, Student>(&format!(
        "SELECT {STUDENT_COLUMNS} FROM students s JOIN users u ON u.id = s.user_id WHERE s.id = $1"
    ))
    .bind(id)
    .fetch_optional(db)
    .await
}

pub async fn list_for_classroom(db: &PgPool, classroom_id: Uuid) -> sqlx::Result<Vec<Student>> {
    sqlx::query_as::<_, Student>(&format!(
        "SELECT {STUDENT_COLUMNS} \
           FROM classroom_students cs \
           JOIN students s ON s.id = cs.student_id \
           JOIN users u ON u.id = s.user_id \
          WHERE cs.classroom_id = $1 \
          ORDER BY u.name ASC, s.id ASC"
    ))
    .bind(classroom_id)
    .fetch_all(db)
    .await
}

pub async fn list_for_parent(db: &PgPool, parent_id: Uuid) -> sqlx::Result<Vec<Student>> {
    sqlx::query_as::<_, Student>(&format!(
        "SELECT {STUDENT_COLUMNS} \
           FROM student_parents sp \
           JOIN students s ON s.id = sp.student_id \
           JOIN users u ON u.id = s.user_id \
          WHERE sp.parent_id = $1 \
          ORDER BY u.name ASC, s.id ASC"
    ))
    .bind(parent_id)
    .fetch_all(db)
    .await
}

pub async fn insert_tx(
    tx: &mut Transaction<'_, Postgres>,
    organization_id: Uuid,
    user_id: Uuid,
    grade_level: &str,
    medical_info: Option<&str>,
) -> sqlx::Result<Uuid> {
    sqlx::query_scalar::<_, Uuid>(
        r#"
        INSERT INTO students (organization_id, user_id, grade_level, medical_info)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(organization_id)
    .bind(user_id)
    .bind(grade_level)
    .bind(medical_info)
    .fetch_one(&mut **tx)
    .await
}

pub async fn update_tx(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
    grade_level: Option<&str>,
    medical_info: Option<&str>,
) -> sqlx::Result<Option<Uuid>> {
    sqlx::query_scalar::<_, Uuid>(
        r#"
        UPDATE students
           SET grade_level = COALESCE($2, grade_level),
               medical_info = COALESCE($3, medical_info)
         WHERE id = $1
        RETURNING user_id
        "#,
    )
    .bind(id)
    .bind(grade_level)
    .bind(medical_info)
    .fetch_optional(&mut **tx)
    .await
}

pub async fn delete(db: &PgPool, id: Uuid) -> sqlx::Result<bool> {
    let res = sqlx::query(r#"DELETE FROM students WHERE id = $1"#)
        .bind(id)
        .execute(db)
        .await?;
    Ok(res.rows_affected() > 0)
}

pub async fn count(db: &PgPool, organization_id: Uuid) -> sqlx::Result<i64> {
    sqlx::query_scalar::<_, i64>(r#"SELECT COUNT(*) FROM students WHERE organization_id = $1"#)
        .bind(organization_id)
        .fetch_one(db)
        .await
}

/// Returns whether a new link was created.
pub async fn link_parent(db: &PgPool, student_id: Uuid, parent_id: Uuid) -> sqlx::Result<bool> {
    let res = sqlx::query(
        r#"
        INSERT INTO student_parents (student_id, parent_id)
        VALUES ($1, $2)
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(student_id)
    .bind(parent_id)
    .execute(db)
    .await?;
    Ok(res.rows_affected() > 0)
}

pub async fn unlink_parent(db: &PgPool, student_id: Uuid, parent_id: Uuid) -> sqlx::Result<bool> {
    let res = sqlx::query(r#"DELETE FROM student_parents WHERE student_id = $1 AND parent_id = $2"#)
        .bind(student_id)
        .bind(parent_id)
        .execute(db)
        .await?;
    Ok(res.rows_affected() > 0)
}
