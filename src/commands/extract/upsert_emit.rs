use super::*;

/// Destination for the three idempotent upserts of a run. Every operation is
/// keyed so that replaying it leaves the store unchanged.
pub(super) trait UpsertStore {
    fn upsert_source(&mut self, source: &Source) -> Result<()>;

    fn upsert_unit(&mut self, unit: &Unit) -> Result<()>;

    fn upsert_item(&mut self, item: &Item) -> Result<()>;
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(super) struct EmitCounts {
    pub(super) sources: usize,
    pub(super) units: usize,
    pub(super) items: usize,
}

/// Source first, then units in assembly order (parents precede children),
/// then items.
pub(super) fn emit_run(
    store: &mut dyn UpsertStore,
    source: &Source,
    run: &AssembledRun,
) -> Result<EmitCounts> {
    let mut counts = EmitCounts::default();

    store
        .upsert_source(source)
        .with_context(|| format!("failed to upsert source {}", source.identifier))?;
    counts.sources += 1;

    for unit in &run.units {
        store
            .upsert_unit(unit)
            .with_context(|| format!("failed to upsert {} unit {}", unit.unit_type.as_str(), unit.id))?;
        counts.units += 1;
    }

    for item in &run.items {
        store
            .upsert_item(item)
            .with_context(|| format!("failed to upsert item {}", item.id))?;
        counts.items += 1;
    }

    Ok(counts)
}

fn meta_json(meta: Option<&serde_json::Value>) -> Option<String> {
    meta.filter(|value| !value.is_null()).map(|value| value.to_string())
}

fn sql_text(value: Option<&str>) -> String {
    match value {
        Some(value) => format!("'{}'", value.replace('\'', "''")),
        None => "NULL".to_string(),
    }
}

fn sql_int(value: Option<u32>) -> String {
    value
        .map(|value| value.to_string())
        .unwrap_or_else(|| "NULL".to_string())
}

fn latest_source_id_sql(identifier: &str) -> String {
    format!(
        "(SELECT id FROM ar_sources WHERE identifier = {} ORDER BY id DESC LIMIT 1)",
        sql_text(Some(identifier))
    )
}

/// Renders upserts as a replayable SQL script.
#[derive(Debug, Default)]
pub(super) struct SqlScriptStore {
    statements: Vec<String>,
}

impl SqlScriptStore {
    pub(super) fn new() -> Self {
        Self::default()
    }

    pub(super) fn statement_count(&self) -> usize {
        self.statements.len()
    }

    pub(super) fn render(&self) -> String {
        let mut script = self.statements.join("\n");
        script.push('\n');
        script
    }
}

impl UpsertStore for SqlScriptStore {
    fn upsert_source(&mut self, source: &Source) -> Result<()> {
        let identifier = sql_text(Some(&source.identifier));
        self.statements.push(format!(
            "INSERT INTO ar_sources (source_type, title, identifier, notes) SELECT {}, {}, {}, {} \
             WHERE NOT EXISTS (SELECT 1 FROM ar_sources WHERE identifier = {});",
            sql_text(Some(&source.source_type)),
            sql_text(Some(&source.title)),
            identifier,
            sql_text(source.notes.as_deref()),
            identifier,
        ));
        self.statements.push(format!(
            "UPDATE ar_sources SET source_type = {}, title = {}, notes = {} WHERE id = {};",
            sql_text(Some(&source.source_type)),
            sql_text(Some(&source.title)),
            sql_text(source.notes.as_deref()),
            latest_source_id_sql(&source.identifier),
        ));
        Ok(())
    }

    fn upsert_unit(&mut self, unit: &Unit) -> Result<()> {
        self.statements.push(format!(
            "INSERT INTO ar_grammar_units \
             (id, parent_id, unit_type, order_index, title, title_ar, source_id, start_page, end_page, meta_json) \
             VALUES ({}, {}, {}, {}, {}, {}, {}, {}, {}, {}) \
             ON CONFLICT(id) DO UPDATE SET parent_id=excluded.parent_id, unit_type=excluded.unit_type, \
             order_index=excluded.order_index, title=excluded.title, title_ar=excluded.title_ar, \
             source_id=excluded.source_id, start_page=excluded.start_page, end_page=excluded.end_page, \
             meta_json=excluded.meta_json;",
            sql_text(Some(&unit.id)),
            sql_text(unit.parent_id.as_deref()),
            sql_text(Some(unit.unit_type.as_str())),
            sql_int(unit.order_index),
            sql_text(Some(&unit.title)),
            sql_text(unit.title_ar.as_deref()),
            latest_source_id_sql(&unit.source_identifier),
            sql_int(Some(unit.start_page)),
            sql_int(Some(unit.end_page)),
            sql_text(meta_json(unit.meta.as_ref()).as_deref()),
        ));
        Ok(())
    }

    fn upsert_item(&mut self, item: &Item) -> Result<()> {
        self.statements.push(format!(
            "INSERT INTO ar_grammar_unit_items \
             (id, unit_id, item_type, title, content, content_ar, order_index, meta_json) \
             VALUES ({}, {}, {}, {}, {}, {}, {}, {}) \
             ON CONFLICT(id) DO UPDATE SET unit_id=excluded.unit_id, item_type=excluded.item_type, \
             title=excluded.title, content=excluded.content, content_ar=excluded.content_ar, \
             order_index=excluded.order_index, meta_json=excluded.meta_json;",
            sql_text(Some(&item.id)),
            sql_text(Some(&item.unit_id)),
            sql_text(Some(item.item_type.as_str())),
            sql_text(Some(&item.title)),
            sql_text(item.content.as_deref()),
            sql_text(item.content_ar.as_deref()),
            sql_int(Some(item.order_index)),
            sql_text(meta_json(item.meta.as_ref()).as_deref()),
        ));
        Ok(())
    }
}

/// Applies upserts to SQLite through bound parameters. Callers wrap the run
/// in a transaction and pass it here (`Transaction` derefs to `Connection`).
pub(super) struct SqliteStore<'conn> {
    connection: &'conn Connection,
}

impl<'conn> SqliteStore<'conn> {
    pub(super) fn new(connection: &'conn Connection) -> Self {
        Self { connection }
    }

    fn latest_source_id(&self, identifier: &str) -> Result<Option<i64>> {
        let id = self
            .connection
            .query_row(
                "SELECT id FROM ar_sources WHERE identifier = ?1 ORDER BY id DESC LIMIT 1",
                [identifier],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }
}

impl UpsertStore for SqliteStore<'_> {
    fn upsert_source(&mut self, source: &Source) -> Result<()> {
        match self.latest_source_id(&source.identifier)? {
            Some(id) => {
                self.connection.execute(
                    "UPDATE ar_sources SET source_type = ?1, title = ?2, notes = ?3 WHERE id = ?4",
                    params![source.source_type, source.title, source.notes, id],
                )?;
            }
            None => {
                self.connection.execute(
                    "INSERT INTO ar_sources (source_type, title, identifier, notes) VALUES (?1, ?2, ?3, ?4)",
                    params![source.source_type, source.title, source.identifier, source.notes],
                )?;
            }
        }
        Ok(())
    }

    fn upsert_unit(&mut self, unit: &Unit) -> Result<()> {
        let mut statement = self.connection.prepare_cached(
            "
            INSERT INTO ar_grammar_units(
              id, parent_id, unit_type, order_index, title, title_ar,
              source_id, start_page, end_page, meta_json
            )
            VALUES(
              ?1, ?2, ?3, ?4, ?5, ?6,
              (SELECT id FROM ar_sources WHERE identifier = ?7 ORDER BY id DESC LIMIT 1),
              ?8, ?9, ?10
            )
            ON CONFLICT(id) DO UPDATE SET
              parent_id=excluded.parent_id,
              unit_type=excluded.unit_type,
              order_index=excluded.order_index,
              title=excluded.title,
              title_ar=excluded.title_ar,
              source_id=excluded.source_id,
              start_page=excluded.start_page,
              end_page=excluded.end_page,
              meta_json=excluded.meta_json
            ",
        )?;

        statement.execute(params![
            unit.id,
            unit.parent_id,
            unit.unit_type.as_str(),
            unit.order_index,
            unit.title,
            unit.title_ar,
            unit.source_identifier,
            unit.start_page,
            unit.end_page,
            meta_json(unit.meta.as_ref()),
        ])?;
        Ok(())
    }

    fn upsert_item(&mut self, item: &Item) -> Result<()> {
        let mut statement = self.connection.prepare_cached(
            "
            INSERT INTO ar_grammar_unit_items(
              id, unit_id, item_type, title, content, content_ar, order_index, meta_json
            )
            VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(id) DO UPDATE SET
              unit_id=excluded.unit_id,
              item_type=excluded.item_type,
              title=excluded.title,
              content=excluded.content,
              content_ar=excluded.content_ar,
              order_index=excluded.order_index,
              meta_json=excluded.meta_json
            ",
        )?;

        statement.execute(params![
            item.id,
            item.unit_id,
            item.item_type.as_str(),
            item.title,
            item.content,
            item.content_ar,
            item.order_index,
            meta_json(item.meta.as_ref()),
        ])?;
        Ok(())
    }
}
