use super::*;

pub(super) fn configure_connection(connection: &Connection) -> Result<()> {
    connection
        .pragma_update(None, "journal_mode", "WAL")
        .context("failed to set journal_mode=WAL")?;
    connection
        .pragma_update(None, "synchronous", "NORMAL")
        .context("failed to set synchronous=NORMAL")?;
    Ok(())
}

pub(super) fn ensure_schema(connection: &Connection) -> Result<()> {
    connection
        .execute_batch(
            "
            CREATE TABLE IF NOT EXISTS metadata (
              key TEXT PRIMARY KEY,
              value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS ar_sources (
              id INTEGER PRIMARY KEY AUTOINCREMENT,
              source_type TEXT NOT NULL,
              title TEXT NOT NULL,
              identifier TEXT NOT NULL,
              notes TEXT
            );

            CREATE TABLE IF NOT EXISTS ar_grammar_units (
              id TEXT PRIMARY KEY,
              parent_id TEXT,
              unit_type TEXT NOT NULL,
              order_index INTEGER,
              title TEXT NOT NULL,
              title_ar TEXT,
              source_id INTEGER,
              start_page INTEGER,
              end_page INTEGER,
              meta_json TEXT,
              FOREIGN KEY(parent_id) REFERENCES ar_grammar_units(id),
              FOREIGN KEY(source_id) REFERENCES ar_sources(id)
            );

            CREATE TABLE IF NOT EXISTS ar_grammar_unit_items (
              id TEXT PRIMARY KEY,
              unit_id TEXT NOT NULL,
              item_type TEXT NOT NULL,
              title TEXT,
              content TEXT,
              content_ar TEXT,
              order_index INTEGER DEFAULT 0,
              meta_json TEXT,
              FOREIGN KEY(unit_id) REFERENCES ar_grammar_units(id)
            );

            CREATE INDEX IF NOT EXISTS idx_ar_sources_identifier ON ar_sources(identifier);
            CREATE INDEX IF NOT EXISTS idx_ar_grammar_units_parent ON ar_grammar_units(parent_id, order_index);
            CREATE INDEX IF NOT EXISTS idx_ar_grammar_units_type ON ar_grammar_units(unit_type);
            CREATE INDEX IF NOT EXISTS idx_ar_grammar_unit_items_unit ON ar_grammar_unit_items(unit_id, order_index);
            ",
        )
        .context("failed to initialize grammar unit schema")?;

    let now = now_utc_string();
    connection.execute(
        "INSERT INTO metadata(key, value) VALUES('db_schema_version', ?1)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        [DB_SCHEMA_VERSION],
    )?;
    connection.execute(
        "INSERT INTO metadata(key, value) VALUES('db_updated_at', ?1)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        [now],
    )?;

    Ok(())
}

pub(super) fn count_rows(connection: &Connection, sql: &str) -> Result<i64> {
    let count = connection.query_row(sql, [], |row| row.get(0))?;
    Ok(count)
}
