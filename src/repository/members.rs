//! Members repository for database operations

use chrono::Utc;
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::member::{CreateMember, Member, MemberQuery, MemberShort, UpdateMember},
};

#[derive(Clone)]
pub struct MembersRepository {
    pool: Pool<Postgres>,
}

impl MembersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get member by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Member> {
        sqlx::query_as::<_, Member>("SELECT * FROM members WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Member with id {} not found", id)))
    }

    /// Check if email already exists
    pub async fn email_exists(&self, email: &str, exclude_id: Option<i32>) -> AppResult<bool> {
        let exists: bool = if let Some(id) = exclude_id {
            sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM members WHERE LOWER(email) = LOWER($1) AND id != $2)",
            )
            .bind(email)
            .bind(id)
            .fetch_one(&self.pool)
            .await?
        } else {
            sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM members WHERE LOWER(email) = LOWER($1))",
            )
            .bind(email)
            .fetch_one(&self.pool)
            .await?
        };
        Ok(exists)
    }

    /// Search members with pagination, including loan counters
    pub async fn search(&self, query: &MemberQuery) -> AppResult<(Vec<MemberShort>, i64)> {
        let (per_page, offset) = super::page_bounds(query.page, query.per_page);

        let mut conditions = Vec::new();
        let mut params: Vec<String> = Vec::new();

        if let Some(ref search) = query.search {
            params.push(format!("%{}%", search.to_lowercase()));
            conditions.push(format!(
                "(LOWER(name) LIKE ${} OR LOWER(email) LIKE ${})",
                params.len(),
                params.len()
            ));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let count_query = format!("SELECT COUNT(*) FROM members {}", where_clause);
        let mut count_builder = sqlx::query_scalar::<_, i64>(&count_query);
        for param in &params {
            count_builder = count_builder.bind(param);
        }
        let total = count_builder.fetch_one(&self.pool).await?;

        let select_query = format!(
            r#"
            SELECT m.id, m.name, m.email, m.is_active,
                   (SELECT COUNT(*) FROM transactions t WHERE t.member_id = m.id AND t.returned_date IS NULL) as nb_loans,
                   (SELECT COUNT(*) FROM transactions t WHERE t.member_id = m.id AND t.returned_date IS NULL AND t.due_date < NOW()) as nb_overdue
            FROM members m
            {}
            ORDER BY m.name
            LIMIT {} OFFSET {}
            "#,
            where_clause, per_page, offset
        );

        let mut select_builder = sqlx::query_as::<_, MemberShort>(&select_query);
        for param in &params {
            select_builder = select_builder.bind(param);
        }
        let members = select_builder.fetch_all(&self.pool).await?;

        Ok((members, total))
    }

    /// Fetch all members ordered by name (for exports)
    pub async fn list_all(&self) -> AppResult<Vec<Member>> {
        let members = sqlx::query_as::<_, Member>("SELECT * FROM members ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(members)
    }

    /// Create a new member
    pub async fn create(&self, member: &CreateMember) -> AppResult<Member> {
        let id = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO members (name, email, phone, address, joined_date)
            VALUES ($1, $2, $3, $4, COALESCE($5, CURRENT_DATE))
            RETURNING id
            "#,
        )
        .bind(&member.name)
        .bind(&member.email)
        .bind(&member.phone)
        .bind(&member.address)
        .bind(member.joined_date)
        .fetch_one(&self.pool)
        .await?;

        self.get_by_id(id).await
    }

    /// Update an existing member
    pub async fn update(&self, id: i32, member: &UpdateMember) -> AppResult<Member> {
        let now = Utc::now();

        let mut sets = vec!["updated_at = $1".to_string()];
        let mut param_idx = 2;

        macro_rules! add_field {
            ($field:expr, $name:expr) => {
                if $field.is_some() {
                    sets.push(format!("{} = ${}", $name, param_idx));
                    param_idx += 1;
                }
            };
        }

        add_field!(member.name, "name");
        add_field!(member.email, "email");
        add_field!(member.phone, "phone");
        add_field!(member.address, "address");
        add_field!(member.is_active, "is_active");

        let query = format!("UPDATE members SET {} WHERE id = {}", sets.join(", "), id);

        let mut builder = sqlx::query(&query).bind(now);

        macro_rules! bind_field {
            ($field:expr) => {
                if let Some(ref val) = $field {
                    builder = builder.bind(val);
                }
            };
        }

        bind_field!(member.name);
        bind_field!(member.email);
        bind_field!(member.phone);
        bind_field!(member.address);
        bind_field!(member.is_active);

        builder.execute(&self.pool).await?;

        self.get_by_id(id).await
    }

    /// Delete a member along with their loan history and reservations.
    /// Fails if the member has outstanding loans, unless forced; forcing
    /// puts the borrowed copies back on the shelf first.
    pub async fn delete(&self, id: i32, force: bool) -> AppResult<()> {
        let outstanding: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM transactions WHERE member_id = $1 AND returned_date IS NULL",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        if outstanding > 0 && !force {
            return Err(AppError::BusinessRule(
                "Member has outstanding loans. Use force=true to delete anyway.".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await?;

        if outstanding > 0 {
            sqlx::query(
                r#"
                UPDATE books b
                SET available_copies = LEAST(b.total_copies, b.available_copies + sub.cnt)
                FROM (
                    SELECT book_id, COUNT(*) AS cnt
                    FROM transactions
                    WHERE member_id = $1 AND returned_date IS NULL
                    GROUP BY book_id
                ) sub
                WHERE b.id = sub.book_id
                "#,
            )
            .bind(id)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("DELETE FROM reservations WHERE member_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM transactions WHERE member_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM members WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Member with id {} not found",
                id
            )));
        }

        tx.commit().await?;

        Ok(())
    }

    /// Count all members
    pub async fn count(&self) -> AppResult<i64> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM members")
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }
}
