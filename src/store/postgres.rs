// src/store/postgres.rs

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder, types::Json};

use super::{QuestionSource, RecordStore, StoreError};
use crate::models::{
    question::{NewQuestion, Question},
    submission::{PhotoRef, ResponseRow},
    user::UserDetails,
};

/// Postgres implementation of the question source and the record store.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QuestionSource for PgStore {
    async fn list_questions(&self) -> Result<Vec<Question>, StoreError> {
        let questions = sqlx::query_as::<_, Question>(
            r#"
            SELECT id, question_text, category, options, question_type, created_at
            FROM questions
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(questions)
    }

    async fn count_questions(&self) -> Result<i64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM questions")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn insert_questions(&self, questions: &[NewQuestion]) -> Result<usize, StoreError> {
        if questions.is_empty() {
            return Ok(0);
        }

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO questions (question_text, category, options, question_type) ",
        );
        builder.push_values(questions, |mut row, q| {
            row.push_bind(&q.question_text)
                .push_bind(&q.category)
                .push_bind(q.options.clone().map(Json))
                .push_bind(q.question_type.as_str());
        });

        let result = builder.build().execute(&self.pool).await?;
        Ok(result.rows_affected() as usize)
    }
}

#[async_trait]
impl RecordStore for PgStore {
    async fn create_user(&self, details: &UserDetails) -> Result<i64, StoreError> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO users (full_name, email, gender, age)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(&details.full_name)
        .bind(&details.email)
        .bind(details.gender.as_str())
        .bind(details.age)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    async fn insert_photo_refs(&self, rows: &[PhotoRef]) -> Result<(), StoreError> {
        if rows.is_empty() {
            return Ok(());
        }

        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("INSERT INTO user_photos (user_id, storage_path, display_order) ");
        builder.push_values(rows, |mut row, r| {
            row.push_bind(r.user_id)
                .push_bind(&r.storage_path)
                .push_bind(r.display_order);
        });
        builder.build().execute(&self.pool).await?;

        Ok(())
    }

    async fn insert_responses(&self, rows: &[ResponseRow]) -> Result<(), StoreError> {
        if rows.is_empty() {
            return Ok(());
        }

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO assessment_responses (user_id, question_id, question_text, answer, category) ",
        );
        builder.push_values(rows, |mut row, r| {
            row.push_bind(r.user_id)
                .push_bind(r.question_id)
                .push_bind(&r.question_text)
                .push_bind(&r.answer)
                .push_bind(&r.category);
        });
        builder.build().execute(&self.pool).await?;

        Ok(())
    }

    async fn delete_user(&self, user_id: i64) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
