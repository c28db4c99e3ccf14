use sqlx::PgPool;

/// Connect, migrate, verify both tables exist and start empty.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_full_bootstrap(pool: PgPool) {
    chaincast_db::health_check(&pool).await.unwrap();

    for table in ["dispatch_state", "published_posts"] {
        let count: (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&pool)
            .await
            .unwrap_or_else(|e| panic!("{table} query failed: {e}"));
        assert_eq!(count.0, 0, "{table} should start empty");
    }
}

/// A half-set lease is rejected by the table constraint.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_lease_columns_are_paired(pool: PgPool) {
    let result = sqlx::query(
        "INSERT INTO dispatch_state (bot_id, last_index, window_start, lease_token) \
         VALUES ('bot', 0, NOW(), gen_random_uuid())",
    )
    .execute(&pool)
    .await;
    assert!(result.is_err());
}
