use sqlx::{PgPool, Postgres, Transaction};
use time::Date;
use uuid::Uuid;

use super::dto::MarkEntry;
use super::repo_types::{AttendanceRecord, AttendanceSession, SessionSummary, StatusCounts};

/// Returns the (classroom, date) session, creating it on first use.
pub async fn get_or_create_session(db: &PgPool, classroom_id: Uuid, date: Date) -> sqlx::Result<AttendanceSession> {
    sqlx::query_as::<_, AttendanceSession>(
        r#"
        INSERT INTO attendance_sessions (classroom_id, date)
        VALUES ($1, $2)
        ON CONFLICT (classroom_id, date) DO UPDATE SET date = EXCLUDED.date
        RETURNING id, classroom_id, date, created_at
        "#,
    )
    .bind(classroom_id)
    .bind(date)
    .fetch_one(db)
    .await
}

pub async fn get_session(db: &PgPool, id: Uuid) -> sqlx::Result<Option<AttendanceSession>> {
    sqlx::query_as::<_, AttendanceSession>(
        r#"SELECT id, classroom_id, date, created_at FROM attendance_sessions WHERE id = $1"#,
    )
    .bind(id)
    .fetch_optional(db)
    .await
}

pub async fn list_sessions(db: &PgPool, classroom_id: Uuid) -> sqlx::Result<Vec<SessionSummary>> {
    sqlx::query_as::<_, SessionSummary>(
        r#"
        SELECT s.id, s.classroom_id, s.date,
               COUNT(r.id) FILTER (WHERE r.status = 'Present') AS present,
               COUNT(r.id) FILTER (WHERE r.status = 'Absent')  AS absent,
               COUNT(r.id) FILTER (WHERE r.status = 'Late')    AS late,
               s.created_at
          FROM attendance_sessions s
          LEFT JOIN attendance_records r ON r.session_id = s.id
         WHERE s.classroom_id = $1
         GROUP BY s.id
         ORDER BY s.date DESC
        "#,
    )
    .bind(classroom_id)
    .fetch_all(db)
    .await
}

pub async fn list_records(db: &PgPool, session_id: Uuid) -> sqlx::Result<Vec<AttendanceRecord>> {
    sqlx::query_as::<_, AttendanceRecord>(
        r#"
        SELECT r.id, r.session_id, r.student_id, u.name AS student_name,
               r.status, r.notes, r.updated_at
          FROM attendance_records r
          JOIN students s ON s.id = r.student_id
          JOIN users u ON u.id = s.user_id
         WHERE r.session_id = $1
         ORDER BY u.name ASC, r.id ASC
        "#,
    )
    .bind(session_id)
    .fetch_all(db)
    .await
}

/// How many of `student_ids` are enrolled in `classroom_id`.
pub async fn count_enrolled_tx(
    tx: &mut Transaction<'_, Postgres>,
    classroom_id: Uuid,
    student_ids: &[Uuid],
) -> sqlx::Result<i64> {
    sqlx::query_scalar::<_, i64>(
        r#"SELECT COUNT(*) FROM classroom_students WHERE classroom_id = $1 AND student_id = ANY($2)"#,
    )
    .bind(classroom_id)
    .bind(student_ids)
    .fetch_one(&mut **tx)
    .await
}

pub async fn upsert_record_tx(
    tx: &mut Transaction<'_, Postgres>,
    session_id: Uuid,
    entry: &MarkEntry,
) -> sqlx::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO attendance_records (session_id, student_id, status, notes)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (session_id, student_id)
        DO UPDATE SET status = EXCLUDED.status,
                      notes = EXCLUDED.notes,
                      updated_at = now()
        "#,
    )
    .bind(session_id)
    .bind(entry.student_id)
    .bind(entry.status.as_str())
    .bind(entry.notes.as_deref())
    .execute(&mut **tx)
    .await?;
    Ok(())
}

pub async fn student_counts(db: &PgPool, student_id: Uuid) -> sqlx::Result<StatusCounts> {
    sqlx::query_as::<_, StatusCounts>(
        r#"
        SELECT COUNT(*) FILTER (WHERE status = 'Present') AS present,
               COUNT(*) FILTER (WHERE status = 'Absent')  AS absent,
               COUNT(*) FILTER (WHERE status = 'Late')    AS late
          FROM attendance_records
         WHERE student_id = $1
        "#,
    )
    .bind(student_id)
    .fetch_one(db)
    .await
}

pub async fn organization_counts(db: &PgPool, organization_id: Uuid) -> sqlx::Result<StatusCounts> {
    sqlx::query_as::<_, StatusCounts>(
        r#"
        SELECT COUNT(*) FILTER (WHERE r.status = 'Present') AS present,
               COUNT(*) FILTER (WHERE r.status = 'Absent')  AS absent,
               COUNT(*) FILTER (WHERE r.status = 'Late')    AS late
          FROM attendance_records r
          JOIN attendance_sessions s ON s.id = r.session_id
          JOIN classrooms c ON c.id = s.classroom_id
         WHERE c.organization_id = $1
        "#,
    )
    .bind(organization_id)
    .fetch_one(db)
    .await
}
