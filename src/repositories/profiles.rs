use sqlx::{PgPool, Postgres, QueryBuilder};
use time::PrimitiveDateTime;

use crate::db::models::Profile;
use crate::db::types::{Gender, UserRole};

const COLUMNS: &str = "id, email, full_name, role, gender, department, reg_number, created_at";

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Profile>, sqlx::Error> {
    sqlx::query_as::<_, Profile>(&format!("SELECT {COLUMNS} FROM profiles WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn exists_by_email(pool: &PgPool, email: &str) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM profiles WHERE lower(email) = lower($1))")
        .bind(email)
        .fetch_one(pool)
        .await
}

pub(crate) async fn list_names_by_ids(
    pool: &PgPool,
    ids: &[String],
) -> Result<Vec<(String, String, Option<String>)>, sqlx::Error> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    sqlx::query_as::<_, (String, String, Option<String>)>(
        "SELECT id, full_name, reg_number FROM profiles WHERE id = ANY($1)",
    )
    .bind(ids)
    .fetch_all(pool)
    .await
}

pub(crate) struct CreateProfile<'a> {
    pub id: &'a str,
    pub email: &'a str,
    pub full_name: &'a str,
    pub role: UserRole,
    pub gender: Gender,
    pub department: Option<&'a str>,
    pub reg_number: Option<&'a str>,
    pub created_at: PrimitiveDateTime,
}

pub(crate) async fn create(pool: &PgPool, params: CreateProfile<'_>) -> Result<Profile, sqlx::Error> {
    sqlx::query_as::<_, Profile>(&format!(
        "INSERT INTO profiles (id, email, full_name, role, gender, department, reg_number, created_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.email)
    .bind(params.full_name)
    .bind(params.role)
    .bind(params.gender)
    .bind(params.department)
    .bind(params.reg_number)
    .bind(params.created_at)
    .fetch_one(pool)
    .await
}

pub(crate) async fn list(
    pool: &PgPool,
    role: Option<UserRole>,
) -> Result<Vec<Profile>, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM profiles"));
    if let Some(role) = role {
        builder.push(" WHERE role = ");
        builder.push_bind(role);
    }
    builder.push(" ORDER BY created_at DESC");

    builder.build_query_as::<Profile>().fetch_all(pool).await
}

pub(crate) async fn count(pool: &PgPool, role: Option<UserRole>) -> Result<i64, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM profiles");
    if let Some(role) = role {
        builder.push(" WHERE role = ");
        builder.push_bind(role);
    }

    builder.build_query_scalar::<i64>().fetch_one(pool).await
}

#[derive(Default)]
pub(crate) struct UpdateProfile<'a> {
    pub full_name: Option<&'a str>,
    pub role: Option<UserRole>,
    pub gender: Option<Gender>,
    pub department: Option<&'a str>,
    pub reg_number: Option<&'a str>,
}

pub(crate) async fn update(
    pool: &PgPool,
    id: &str,
    params: UpdateProfile<'_>,
) -> Result<Option<Profile>, sqlx::Error> {
    sqlx::query_as::<_, Profile>(&format!(
        "UPDATE profiles SET
            full_name = COALESCE($1, full_name),
            role = COALESCE($2, role),
            gender = COALESCE($3, gender),
            department = COALESCE($4, department),
            reg_number = COALESCE($5, reg_number)
         WHERE id = $6
         RETURNING {COLUMNS}"
    ))
    .bind(params.full_name)
    .bind(params.role)
    .bind(params.gender)
    .bind(params.department)
    .bind(params.reg_number)
    .bind(id)
    .fetch_optional(pool)
    .await
}
