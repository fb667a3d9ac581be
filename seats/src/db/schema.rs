use sqlx::AnyPool;

pub async fn migrate(pool: &AnyPool) -> anyhow::Result<()> {
    sqlx::query(
        r#"
CREATE TABLE IF NOT EXISTS seats (
  seat_id BIGINT PRIMARY KEY,
  status TEXT NOT NULL DEFAULT 'available' CHECK (status IN ('available', 'reserved')),
  owner_id BIGINT,
  CHECK ((status = 'available' AND owner_id IS NULL) OR (status = 'reserved' AND owner_id IS NOT NULL))
);
"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(r#"CREATE INDEX IF NOT EXISTS idx_seats_status ON seats(status, seat_id);"#)
        .execute(pool)
        .await?;

    Ok(())
}
