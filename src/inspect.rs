//! Catalog introspection.
//!
//! [`SchemaInspector`] is the engine's only view of the live database state:
//! pure reads against `information_schema` and the `pg_catalog` tables, no
//! side effects. Every existence check is case-exact and tolerates missing
//! dependencies (asking for a column on a table that does not exist returns
//! `false`, not an error), so the same discipline guards every step.

use std::collections::BTreeMap;

use postgres::Client;
use serde::{Deserialize, Serialize};

use crate::core::ObjectKind;
use crate::error::Error;

/// Read-only view over a live connection's catalog.
pub struct SchemaInspector<'a> {
    client: &'a mut Client,
}

impl<'a> SchemaInspector<'a> {
    pub fn new(client: &'a mut Client) -> Self {
        Self { client }
    }

    /// Generic existence check, dispatching on object kind. `table` is
    /// ignored for kinds that are not table-scoped (indexes, sequences,
    /// functions).
    pub fn exists(&mut self, kind: ObjectKind, table: &str, name: &str) -> Result<bool, Error> {
        match kind {
            ObjectKind::Table => self.table_exists(name),
            ObjectKind::Column => self.column_exists(table, name),
            ObjectKind::Constraint => self.constraint_exists(table, name),
            ObjectKind::Index => self.index_exists(name),
            ObjectKind::Trigger => self.trigger_exists(table, name),
            ObjectKind::Sequence => self.sequence_exists(name),
            ObjectKind::Function => self.function_exists(name),
        }
    }

    pub fn table_exists(&mut self, table: &str) -> Result<bool, Error> {
        let row = self.client.query_one(
            "SELECT EXISTS (SELECT FROM information_schema.tables
             WHERE table_schema = 'public' AND table_name = $1)",
            &[&table],
        )?;
        Ok(row.get(0))
    }

    pub fn column_exists(&mut self, table: &str, column: &str) -> Result<bool, Error> {
        let row = self.client.query_one(
            "SELECT EXISTS (SELECT FROM information_schema.columns
             WHERE table_schema = 'public' AND table_name = $1 AND column_name = $2)",
            &[&table, &column],
        )?;
        Ok(row.get(0))
    }

    /// `to_regclass` yields NULL for a missing table, so the lookup is false
    /// rather than an error when the table does not exist yet.
    pub fn constraint_exists(&mut self, table: &str, constraint: &str) -> Result<bool, Error> {
        let row = self.client.query_one(
            "SELECT EXISTS (SELECT 1 FROM pg_constraint
             WHERE conname = $1 AND conrelid = to_regclass($2))",
            &[&constraint, &table],
        )?;
        Ok(row.get(0))
    }

    pub fn index_exists(&mut self, index: &str) -> Result<bool, Error> {
        let row = self.client.query_one(
            "SELECT EXISTS (SELECT FROM pg_indexes
             WHERE schemaname = 'public' AND indexname = $1)",
            &[&index],
        )?;
        Ok(row.get(0))
    }

    pub fn trigger_exists(&mut self, table: &str, trigger: &str) -> Result<bool, Error> {
        let row = self.client.query_one(
            "SELECT EXISTS (SELECT 1 FROM pg_trigger
             WHERE tgname = $1 AND tgrelid = to_regclass($2) AND NOT tgisinternal)",
            &[&trigger, &table],
        )?;
        Ok(row.get(0))
    }

    pub fn sequence_exists(&mut self, sequence: &str) -> Result<bool, Error> {
        let row = self.client.query_one(
            "SELECT EXISTS (SELECT 1 FROM pg_class c
             JOIN pg_namespace n ON n.oid = c.relnamespace
             WHERE c.relkind = 'S' AND n.nspname = 'public' AND c.relname = $1)",
            &[&sequence],
        )?;
        Ok(row.get(0))
    }

    pub fn function_exists(&mut self, function: &str) -> Result<bool, Error> {
        let row = self.client.query_one(
            "SELECT EXISTS (SELECT 1 FROM pg_proc p
             JOIN pg_namespace n ON n.oid = p.pronamespace
             WHERE n.nspname = 'public' AND p.proname = $1)",
            &[&function],
        )?;
        Ok(row.get(0))
    }

    pub fn extension_exists(&mut self, extension: &str) -> Result<bool, Error> {
        let row = self.client.query_one(
            "SELECT EXISTS (SELECT 1 FROM pg_extension WHERE extname = $1)",
            &[&extension],
        )?;
        Ok(row.get(0))
    }

    /// Whether the table currently contains at least one row. False for a
    /// table that does not exist.
    pub fn table_has_rows(&mut self, table: &str) -> Result<bool, Error> {
        if !self.table_exists(table)? {
            return Ok(false);
        }
        let row = self
            .client
            .query_one(&format!("SELECT EXISTS (SELECT 1 FROM {})", table), &[])?;
        Ok(row.get(0))
    }

    /// Whether any row of `table` has a NULL in `column`. False when the
    /// table or the column does not exist.
    pub fn column_has_nulls(&mut self, table: &str, column: &str) -> Result<bool, Error> {
        if !self.column_exists(table, column)? {
            return Ok(false);
        }
        let row = self.client.query_one(
            &format!(
                "SELECT EXISTS (SELECT 1 FROM {} WHERE {} IS NULL)",
                table, column
            ),
            &[],
        )?;
        Ok(row.get(0))
    }

    /// Maximum value of a bigint column, or None when the table or column is
    /// missing or the table is empty.
    pub fn max_bigint(&mut self, table: &str, column: &str) -> Result<Option<i64>, Error> {
        if !self.column_exists(table, column)? {
            return Ok(None);
        }
        let row = self
            .client
            .query_one(&format!("SELECT MAX({}) FROM {}", column, table), &[])?;
        Ok(row.get(0))
    }

    /// Capture the full structural state of the public schema.
    pub fn snapshot(&mut self) -> Result<SchemaSnapshot, Error> {
        let table_rows = self.client.query(
            "SELECT table_name FROM information_schema.tables
             WHERE table_schema = 'public' AND table_type = 'BASE TABLE'
             ORDER BY table_name",
            &[],
        )?;

        let mut tables = BTreeMap::new();
        for row in table_rows {
            let table: String = row.get(0);
            let columns = self.columns(&table)?;
            let constraints = self.constraints(&table)?;
            let indexes = self.indexes(&table)?;
            let triggers = self.triggers(&table)?;
            tables.insert(
                table,
                TableSchema {
                    columns,
                    constraints,
                    indexes,
                    triggers,
                },
            );
        }

        Ok(SchemaSnapshot { tables })
    }

    fn columns(&mut self, table: &str) -> Result<Vec<ColumnInfo>, Error> {
        let rows = self.client.query(
            "SELECT column_name, data_type, is_nullable, column_default
             FROM information_schema.columns
             WHERE table_schema = 'public' AND table_name = $1
             ORDER BY ordinal_position",
            &[&table],
        )?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let is_nullable: String = row.get(2);
                ColumnInfo {
                    name: row.get(0),
                    type_name: row.get(1),
                    not_null: is_nullable == "NO",
                    default_value: row.get(3),
                }
            })
            .collect())
    }

    fn constraints(&mut self, table: &str) -> Result<Vec<ConstraintInfo>, Error> {
        let rows = self.client.query(
            "SELECT c.conname,
                    c.contype::text,
                    ARRAY(SELECT a.attname::text
                          FROM unnest(c.conkey) WITH ORDINALITY AS k(attnum, ord)
                          JOIN pg_attribute a
                            ON a.attrelid = c.conrelid AND a.attnum = k.attnum
                          ORDER BY k.ord)
             FROM pg_constraint c
             WHERE c.conrelid = to_regclass($1)
             ORDER BY c.conname",
            &[&table],
        )?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let kind_code: String = row.get(1);
                ConstraintInfo {
                    name: row.get(0),
                    kind: ConstraintKind::from_catalog_code(&kind_code),
                    columns: row.get(2),
                }
            })
            .collect())
    }

    fn indexes(&mut self, table: &str) -> Result<Vec<IndexInfo>, Error> {
        let rows = self.client.query(
            "SELECT i.relname,
                    ix.indisunique,
                    array_agg(a.attname::text ORDER BY array_position(ix.indkey, a.attnum))
             FROM pg_class t
             JOIN pg_index ix ON t.oid = ix.indrelid
             JOIN pg_class i ON i.oid = ix.indexrelid
             JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = ANY(ix.indkey)
             WHERE t.relkind = 'r'
               AND t.relname = $1
               AND NOT ix.indisprimary
             GROUP BY i.relname, ix.indisunique
             ORDER BY i.relname",
            &[&table],
        )?;

        Ok(rows
            .into_iter()
            .map(|row| IndexInfo {
                name: row.get(0),
                unique: row.get(1),
                columns: row.get(2),
            })
            .collect())
    }

    fn triggers(&mut self, table: &str) -> Result<Vec<String>, Error> {
        let rows = self.client.query(
            "SELECT tgname FROM pg_trigger
             WHERE tgrelid = to_regclass($1) AND NOT tgisinternal
             ORDER BY tgname",
            &[&table],
        )?;
        Ok(rows.into_iter().map(|row| row.get(0)).collect())
    }
}

/// The observed structural state of the database at a point in time.
///
/// Read fresh at the start of an inspection; never mutated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaSnapshot {
    pub tables: BTreeMap<String, TableSchema>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    pub columns: Vec<ColumnInfo>,
    pub constraints: Vec<ConstraintInfo>,
    pub indexes: Vec<IndexInfo>,
    pub triggers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub type_name: String,
    pub not_null: bool,
    pub default_value: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConstraintKind {
    PrimaryKey,
    Unique,
    ForeignKey,
    Check,
    Other,
}

impl ConstraintKind {
    fn from_catalog_code(code: &str) -> Self {
        match code {
            "p" => Self::PrimaryKey,
            "u" => Self::Unique,
            "f" => Self::ForeignKey,
            "c" => Self::Check,
            _ => Self::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintInfo {
    pub name: String,
    pub kind: ConstraintKind,
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexInfo {
    pub name: String,
    pub unique: bool,
    pub columns: Vec<String>,
}

impl SchemaSnapshot {
    /// Convenience lookup used by tests and reporting.
    pub fn has_constraint(&self, table: &str, constraint: &str) -> bool {
        self.tables
            .get(table)
            .map(|t| t.constraints.iter().any(|c| c.name == constraint))
            .unwrap_or(false)
    }

    pub fn has_column(&self, table: &str, column: &str) -> bool {
        self.tables
            .get(table)
            .map(|t| t.columns.iter().any(|c| c.name == column))
            .unwrap_or(false)
    }
}
