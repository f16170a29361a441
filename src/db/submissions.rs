use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sqlx::postgres::PgArguments;
use sqlx::query::QueryAs;
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool, Postgres};
use uuid::Uuid;

use crate::models::{Source, Submission, SubmissionFields, SubmissionFilter, SubmissionPatch};

const COLUMNS: &str = "id, name, email, user_type, school, grade, major, company, position, \
     experience, skills, business_name, industry, employees, revenue, interests, newsletter, \
     submitted_at, source, csv_data, extra";

const ORDER: &str = "ORDER BY submitted_at DESC, seq ASC";

#[derive(Debug, sqlx::FromRow)]
pub struct SubmissionRow {
    pub id: Uuid,
    pub name: Option<String>,
    pub email: Option<String>,
    pub user_type: Option<String>,
    pub school: Option<String>,
    pub grade: Option<String>,
    pub major: Option<String>,
    pub company: Option<String>,
    pub position: Option<String>,
    pub experience: Option<String>,
    pub skills: Option<String>,
    pub business_name: Option<String>,
    pub industry: Option<String>,
    pub employees: Option<String>,
    pub revenue: Option<String>,
    pub interests: Option<String>,
    pub newsletter: Option<bool>,
    pub submitted_at: DateTime<Utc>,
    pub source: String,
    pub csv_data: Option<Json<Map<String, Value>>>,
    pub extra: Json<Map<String, Value>>,
}

impl TryFrom<SubmissionRow> for Submission {
    type Error = sqlx::Error;

    fn try_from(row: SubmissionRow) -> Result<Self, Self::Error> {
        let source = Source::parse(&row.source)
            .ok_or_else(|| sqlx::Error::Decode(format!("invalid source '{}'", row.source).into()))?;

        Ok(Submission {
            id: row.id,
            fields: SubmissionFields {
                name: row.name,
                email: row.email,
                user_type: row.user_type,
                school: row.school,
                grade: row.grade,
                major: row.major,
                company: row.company,
                position: row.position,
                experience: row.experience,
                skills: row.skills,
                business_name: row.business_name,
                industry: row.industry,
                employees: row.employees,
                revenue: row.revenue,
                interests: row.interests,
                newsletter: row.newsletter,
            },
            extra: row.extra.0,
            submitted_at: row.submitted_at,
            source,
            csv_data: row.csv_data.map(|j| j.0),
        })
    }
}

fn into_submissions(rows: Vec<SubmissionRow>) -> Result<Vec<Submission>, sqlx::Error> {
    rows.into_iter().map(Submission::try_from).collect()
}

type RowQuery<'q> = QueryAs<'q, Postgres, SubmissionRow, PgArguments>;

/// Binds the declared fields in column order (`name` .. `newsletter`).
fn bind_fields<'q>(query: RowQuery<'q>, f: &'q SubmissionFields) -> RowQuery<'q> {
    query
        .bind(&f.name)
        .bind(&f.email)
        .bind(&f.user_type)
        .bind(&f.school)
        .bind(&f.grade)
        .bind(&f.major)
        .bind(&f.company)
        .bind(&f.position)
        .bind(&f.experience)
        .bind(&f.skills)
        .bind(&f.business_name)
        .bind(&f.industry)
        .bind(&f.employees)
        .bind(&f.revenue)
        .bind(&f.interests)
        .bind(f.newsletter)
}

pub async fn insert(conn: &mut PgConnection, s: &Submission) -> Result<Submission, sqlx::Error> {
    let sql = format!(
        "INSERT INTO submissions ({COLUMNS})
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17,
                 $18, $19, $20, $21)
         RETURNING {COLUMNS}"
    );
    let query = sqlx::query_as::<_, SubmissionRow>(&sql).bind(s.id);
    let row = bind_fields(query, &s.fields)
        .bind(s.submitted_at)
        .bind(s.source.as_str())
        .bind(s.csv_data.as_ref().map(Json))
        .bind(Json(&s.extra))
        .fetch_one(conn)
        .await?;
    Submission::try_from(row)
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Submission>, sqlx::Error> {
    sqlx::query_as::<_, SubmissionRow>(&format!("SELECT {COLUMNS} FROM submissions WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .map(Submission::try_from)
        .transpose()
}

pub async fn list(
    pool: &PgPool,
    filter: &SubmissionFilter,
    limit: i64,
    offset: i64,
) -> Result<Vec<Submission>, sqlx::Error> {
    let rows = sqlx::query_as::<_, SubmissionRow>(&format!(
        "SELECT {COLUMNS} FROM submissions
         WHERE ($1::text IS NULL OR source = $1) AND ($2::text IS NULL OR user_type = $2)
         {ORDER} LIMIT $3 OFFSET $4"
    ))
    .bind(filter.source.map(|s| s.as_str()))
    .bind(filter.user_type.as_deref())
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;
    into_submissions(rows)
}

pub async fn count(pool: &PgPool, filter: &SubmissionFilter) -> Result<i64, sqlx::Error> {
    let row: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM submissions
         WHERE ($1::text IS NULL OR source = $1) AND ($2::text IS NULL OR user_type = $2)",
    )
    .bind(filter.source.map(|s| s.as_str()))
    .bind(filter.user_type.as_deref())
    .fetch_one(pool)
    .await?;
    Ok(row.0)
}

pub async fn count_by_user_type(pool: &PgPool) -> Result<Vec<(String, i64)>, sqlx::Error> {
    sqlx::query_as(
        "SELECT user_type, COUNT(*) AS count FROM submissions
         WHERE user_type IS NOT NULL
         GROUP BY user_type
         ORDER BY count DESC, user_type ASC",
    )
    .fetch_all(pool)
    .await
}

pub async fn search(pool: &PgPool, text: &str) -> Result<Vec<Submission>, sqlx::Error> {
    let pattern = format!("%{}%", escape_like(text));
    let rows = sqlx::query_as::<_, SubmissionRow>(&format!(
        "SELECT {COLUMNS} FROM submissions
         WHERE name ILIKE $1 OR email ILIKE $1 OR company ILIKE $1
            OR business_name ILIKE $1 OR school ILIKE $1
         {ORDER}"
    ))
    .bind(pattern)
    .fetch_all(pool)
    .await?;
    into_submissions(rows)
}

pub async fn recent(pool: &PgPool, limit: i64) -> Result<Vec<Submission>, sqlx::Error> {
    let rows = sqlx::query_as::<_, SubmissionRow>(&format!(
        "SELECT {COLUMNS} FROM submissions {ORDER} LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;
    into_submissions(rows)
}

/// Merge `patch` into the stored row. The row is locked for the duration of
/// the read-modify-write so concurrent patches don't drop each other's keys.
pub async fn update(
    pool: &PgPool,
    id: Uuid,
    patch: &SubmissionPatch,
) -> Result<Option<Submission>, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let Some(row) = sqlx::query_as::<_, SubmissionRow>(&format!(
        "SELECT {COLUMNS} FROM submissions WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?
    else {
        return Ok(None);
    };

    let mut submission = Submission::try_from(row)?;
    submission.apply(patch);

    let sql = format!(
        "UPDATE submissions SET
            name = $2, email = $3, user_type = $4, school = $5, grade = $6, major = $7,
            company = $8, position = $9, experience = $10, skills = $11, business_name = $12,
            industry = $13, employees = $14, revenue = $15, interests = $16, newsletter = $17,
            extra = $18
         WHERE id = $1
         RETURNING {COLUMNS}"
    );
    let query = sqlx::query_as::<_, SubmissionRow>(&sql).bind(id);
    let row = bind_fields(query, &submission.fields)
        .bind(Json(&submission.extra))
        .fetch_one(&mut *tx)
        .await?;

    tx.commit().await?;
    Submission::try_from(row).map(Some)
}

pub async fn delete(pool: &PgPool, id: Uuid) -> Result<Option<Submission>, sqlx::Error> {
    sqlx::query_as::<_, SubmissionRow>(&format!(
        "DELETE FROM submissions WHERE id = $1 RETURNING {COLUMNS}"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .map(Submission::try_from)
    .transpose()
}

pub async fn ping(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Escape LIKE wildcards so user text matches literally.
fn escape_like(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
