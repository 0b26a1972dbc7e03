//! SQLite-backed dictionary

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Row};
use tracing::{debug, info};

use crate::*;

/// Encoded values shown inline with a field explanation
const INLINE_ENCODING_VALUES: u32 = 20;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS category (
    category_id INTEGER PRIMARY KEY,
    title TEXT NOT NULL,
    descript TEXT
);
CREATE TABLE IF NOT EXISTS encoding (
    encoding_id INTEGER PRIMARY KEY,
    title TEXT,
    descript TEXT
);
CREATE TABLE IF NOT EXISTS field (
    field_id INTEGER PRIMARY KEY,
    title TEXT NOT NULL,
    value_type TEXT,
    units TEXT,
    main_category INTEGER REFERENCES category(category_id),
    encoding_id INTEGER,
    notes TEXT,
    num_participants INTEGER,
    item_count INTEGER
);
CREATE TABLE IF NOT EXISTS esimpint (
    encoding_id INTEGER NOT NULL,
    value INTEGER NOT NULL,
    meaning TEXT NOT NULL,
    showcase_order INTEGER
);
CREATE TABLE IF NOT EXISTS esimpstring (
    encoding_id INTEGER NOT NULL,
    value TEXT NOT NULL,
    meaning TEXT NOT NULL,
    showcase_order INTEGER
);
CREATE TABLE IF NOT EXISTS recommended (
    field_id INTEGER PRIMARY KEY REFERENCES field(field_id),
    reason TEXT
);
CREATE INDEX IF NOT EXISTS idx_field_category ON field(main_category);
CREATE INDEX IF NOT EXISTS idx_esimpint_encoding ON esimpint(encoding_id);
CREATE INDEX IF NOT EXISTS idx_esimpstring_encoding ON esimpstring(encoding_id);
"#;

const SUMMARY_COLUMNS: &str = "f.field_id, f.title, f.value_type, f.units, c.title, f.num_participants";

const CODED_VALUES: &str = r#"
SELECT value, meaning FROM (
    SELECT CAST(value AS TEXT) AS value, value AS code, meaning, showcase_order
    FROM esimpint WHERE encoding_id = ?1
    UNION ALL
    SELECT value, NULL AS code, meaning, showcase_order
    FROM esimpstring WHERE encoding_id = ?1
)
ORDER BY showcase_order, code, value
LIMIT ?2
"#;

/// Make `%`, `_` and `\` match literally inside a `LIKE ... ESCAPE '\'` pattern
fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Dictionary served from a SQLite file
pub struct SqliteDictionary {
    conn: Mutex<Connection>,
}

impl SqliteDictionary {
    /// Open an existing dictionary database read-only
    pub fn open(path: impl AsRef<Path>, busy_timeout: Duration) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(DictionaryError::Database {
                message: format!("database file not found: {}", path.display()),
                query: None,
            });
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        conn.busy_timeout(busy_timeout)?;
        info!("Dictionary opened at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create (or open for writing) a database and ensure the schema exists
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.create_schema()?;
        Ok(store)
    }

    /// In-memory database with the schema applied
    pub fn open_in_memory() -> Result<Self> {
        let store = Self {
            conn: Mutex::new(Connection::open_in_memory()?),
        };
        store.create_schema()?;
        Ok(store)
    }

    pub fn create_schema(&self) -> Result<()> {
        self.execute_batch(SCHEMA)
    }

    /// Apply a SQL script, e.g. a dictionary dump
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch(sql)?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| DictionaryError::Database {
            message: "connection lock poisoned".to_string(),
            query: None,
        })
    }

    fn find_category(conn: &Connection, name: &str) -> Result<Option<(i64, String, Option<String>)>> {
        let name = name.trim();
        let exact = conn
            .query_row(
                "SELECT category_id, title, descript FROM category WHERE lower(title) = lower(?1)",
                params![name],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;
        if exact.is_some() {
            return Ok(exact);
        }

        let partial = conn
            .query_row(
                "SELECT category_id, title, descript FROM category \
                 WHERE title LIKE '%' || ?1 || '%' ESCAPE '\\' \
                 ORDER BY length(title), category_id LIMIT 1",
                params![escape_like(name)],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;
        Ok(partial)
    }

    fn coded_values(conn: &Connection, encoding_id: i64, limit: u32) -> Result<Vec<EncodingValue>> {
        let mut stmt = conn.prepare(CODED_VALUES)?;
        let rows = stmt.query_map(params![encoding_id, limit], |row| {
            Ok(EncodingValue {
                value: row.get(0)?,
                meaning: row.get(1)?,
            })
        })?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }
}

fn summary_from_row(row: &Row<'_>) -> rusqlite::Result<FieldSummary> {
    Ok(FieldSummary {
        field_id: row.get(0)?,
        title: row.get(1)?,
        value_type: row.get(2)?,
        units: row.get(3)?,
        category: row.get(4)?,
        participants: row.get(5)?,
    })
}

fn require_text(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(DictionaryError::InvalidArgument {
            field: field.to_string(),
            message: "must not be empty".to_string(),
        });
    }
    Ok(())
}

impl DictionaryStore for SqliteDictionary {
    fn explain_field(&self, field_id: i64) -> Result<FieldDetail> {
        debug!("explain_field({})", field_id);
        let conn = self.lock()?;

        let row = conn
            .query_row(
                "SELECT f.field_id, f.title, f.value_type, f.units, f.main_category, c.title, \
                        f.encoding_id, f.notes, f.num_participants, f.item_count \
                 FROM field f LEFT JOIN category c ON c.category_id = f.main_category \
                 WHERE f.field_id = ?1",
                params![field_id],
                |row| {
                    let category_id: Option<i64> = row.get(4)?;
                    let category_title: Option<String> = row.get(5)?;
                    Ok(FieldDetail {
                        field_id: row.get(0)?,
                        title: row.get(1)?,
                        value_type: row.get(2)?,
                        units: row.get(3)?,
                        category: category_id.zip(category_title).map(|(id, title)| {
                            CategoryRef {
                                category_id: id,
                                title,
                            }
                        }),
                        encoding_id: row.get(6)?,
                        notes: row.get(7)?,
                        participants: row.get(8)?,
                        item_count: row.get(9)?,
                        encoding_values: Vec::new(),
                        showcase_url: showcase_url(field_id),
                    })
                },
            )
            .optional()?;

        let mut detail = row.ok_or(DictionaryError::FieldNotFound(field_id))?;
        if let Some(encoding_id) = detail.encoding_id.filter(|id| *id > 0) {
            detail.encoding_values =
                Self::coded_values(&conn, encoding_id, INLINE_ENCODING_VALUES)?;
        }
        Ok(detail)
    }

    fn search_fields(&self, keyword: &str, limit: u32) -> Result<Vec<FieldSummary>> {
        require_text("keyword", keyword)?;
        debug!("search_fields({:?}, {})", keyword, limit);
        let conn = self.lock()?;

        let sql = format!(
            "SELECT {} FROM field f LEFT JOIN category c ON c.category_id = f.main_category \
             WHERE f.title LIKE '%' || ?1 || '%' ESCAPE '\\' \
                OR f.notes LIKE '%' || ?1 || '%' ESCAPE '\\' \
             ORDER BY (f.title LIKE '%' || ?1 || '%' ESCAPE '\\') DESC, \
                      COALESCE(f.num_participants, 0) DESC, f.field_id \
             LIMIT ?2",
            SUMMARY_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params![escape_like(keyword.trim()), clamp_limit(limit)],
            summary_from_row,
        )?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    fn category_fields(&self, category_name: &str, limit: u32) -> Result<CategoryFields> {
        require_text("category_name", category_name)?;
        let conn = self.lock()?;

        let (category_id, title, description) = Self::find_category(&conn, category_name)?
            .ok_or_else(|| DictionaryError::CategoryNotFound(category_name.to_string()))?;

        let sql = format!(
            "SELECT {} FROM field f LEFT JOIN category c ON c.category_id = f.main_category \
             WHERE f.main_category = ?1 ORDER BY f.field_id LIMIT ?2",
            SUMMARY_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let fields = stmt
            .query_map(params![category_id, clamp_limit(limit)], summary_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(CategoryFields {
            category_id,
            title,
            description,
            fields,
        })
    }

    fn encoding_values(&self, encoding_id: i64, limit: u32) -> Result<EncodingValues> {
        let conn = self.lock()?;

        let header: Option<(Option<String>, Option<String>)> = conn
            .query_row(
                "SELECT title, descript FROM encoding WHERE encoding_id = ?1",
                params![encoding_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let total: i64 = conn.query_row(
            "SELECT (SELECT COUNT(*) FROM esimpint WHERE encoding_id = ?1) + \
                    (SELECT COUNT(*) FROM esimpstring WHERE encoding_id = ?1)",
            params![encoding_id],
            |row| row.get(0),
        )?;

        if header.is_none() && total == 0 {
            return Err(DictionaryError::EncodingNotFound(encoding_id));
        }

        let (title, description) = header.unwrap_or((None, None));
        let values = Self::coded_values(&conn, encoding_id, clamp_limit(limit))?;

        Ok(EncodingValues {
            encoding_id,
            title,
            description,
            total,
            values,
        })
    }

    fn related_fields(&self, field_id: i64, limit: u32) -> Result<RelatedFields> {
        let conn = self.lock()?;

        let (title, category_id, category_title): (String, Option<i64>, Option<String>) = conn
            .query_row(
                "SELECT f.title, f.main_category, c.title FROM field f \
                 LEFT JOIN category c ON c.category_id = f.main_category WHERE f.field_id = ?1",
                params![field_id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?
            .ok_or(DictionaryError::FieldNotFound(field_id))?;

        let related = match category_id {
            Some(category_id) => {
                let sql = format!(
                    "SELECT {} FROM field f LEFT JOIN category c ON c.category_id = f.main_category \
                     WHERE f.main_category = ?1 AND f.field_id != ?2 \
                     ORDER BY abs(f.field_id - ?2), f.field_id LIMIT ?3",
                    SUMMARY_COLUMNS
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(
                    params![category_id, field_id, clamp_limit(limit)],
                    summary_from_row,
                )?;
                rows.collect::<std::result::Result<Vec<_>, _>>()?
            }
            None => Vec::new(),
        };

        Ok(RelatedFields {
            field_id,
            title,
            category: category_id
                .zip(category_title)
                .map(|(category_id, title)| CategoryRef { category_id, title }),
            related,
        })
    }

    fn all_categories(&self) -> Result<Vec<CategorySummary>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT c.category_id, c.title, COUNT(f.field_id) FROM category c \
             LEFT JOIN field f ON f.main_category = c.category_id \
             GROUP BY c.category_id, c.title ORDER BY c.title",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(CategorySummary {
                category_id: row.get(0)?,
                title: row.get(1)?,
                field_count: row.get(2)?,
            })
        })?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    fn recommended_fields(
        &self,
        category_name: Option<&str>,
        limit: u32,
    ) -> Result<Vec<RecommendedField>> {
        let conn = self.lock()?;

        let category_id = match category_name.map(str::trim).filter(|n| !n.is_empty()) {
            Some(name) => Some(
                Self::find_category(&conn, name)?
                    .ok_or_else(|| DictionaryError::CategoryNotFound(name.to_string()))?
                    .0,
            ),
            None => None,
        };

        let sql = format!(
            "SELECT {}, r.reason FROM recommended r \
             JOIN field f ON f.field_id = r.field_id \
             LEFT JOIN category c ON c.category_id = f.main_category \
             WHERE (?1 IS NULL OR f.main_category = ?1) \
             ORDER BY f.field_id LIMIT ?2",
            SUMMARY_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![category_id, clamp_limit(limit)], |row| {
            Ok(RecommendedField {
                field: summary_from_row(row)?,
                reason: row.get(6)?,
            })
        })?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }
}
