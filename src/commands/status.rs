use anyhow::{Context, Result, bail};
use rusqlite::Connection;
use tracing::{info, warn};

use crate::cli::StatusArgs;
use crate::model::UnitType;

pub fn run(args: StatusArgs) -> Result<()> {
    let db_path = &args.db_path;
    info!(path = %db_path.display(), "status requested");

    if !db_path.exists() {
        bail!("database file missing: {}", db_path.display());
    }

    let conn = Connection::open(db_path)
        .with_context(|| format!("failed to open {}", db_path.display()))?;

    let schema_version = conn
        .query_row(
            "SELECT value FROM metadata WHERE key = 'db_schema_version'",
            [],
            |row| row.get::<_, String>(0),
        )
        .unwrap_or_default();
    let updated_at = conn
        .query_row(
            "SELECT value FROM metadata WHERE key = 'db_updated_at'",
            [],
            |row| row.get::<_, String>(0),
        )
        .unwrap_or_default();

    let sources = query_count(&conn, "SELECT COUNT(*) FROM ar_sources").unwrap_or(0);
    let items = query_count(&conn, "SELECT COUNT(*) FROM ar_grammar_unit_items").unwrap_or(0);

    let mut per_type = Vec::new();
    for unit_type in [UnitType::Book, UnitType::Chapter, UnitType::Section] {
        let count = conn
            .query_row(
                "SELECT COUNT(*) FROM ar_grammar_units WHERE unit_type = ?1",
                [unit_type.as_str()],
                |row| row.get::<_, i64>(0),
            )
            .unwrap_or(0);
        per_type.push(count);
    }

    let orphans = query_count(
        &conn,
        "SELECT COUNT(*) FROM ar_grammar_units u
         WHERE u.parent_id IS NOT NULL
           AND NOT EXISTS (SELECT 1 FROM ar_grammar_units p WHERE p.id = u.parent_id)",
    )
    .unwrap_or(0);

    info!(
        schema_version = %schema_version,
        updated_at = %updated_at,
        sources,
        books = per_type[0],
        chapters = per_type[1],
        sections = per_type[2],
        items,
        "database status"
    );

    if orphans > 0 {
        warn!(orphans, "units reference a missing parent");
    }

    Ok(())
}

fn query_count(conn: &Connection, sql: &str) -> Result<i64> {
    let count = conn.query_row(sql, [], |row| row.get(0))?;
    Ok(count)
}
