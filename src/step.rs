//! Concrete schema steps.
//!
//! Every step follows the same check-then-act protocol: its predicate is a
//! catalog existence check through [`SchemaInspector`], and its definition is
//! a single DDL statement (or a drop-then-recreate pair for triggers). Steps
//! are stateless templates; nothing here assumes it is the sole writer of the
//! schema's history.

use postgres::Client;

use crate::core::{Phase, SchemaStep, StepOutcome};
use crate::error::{is_unique_violation, Error};
use crate::inspect::SchemaInspector;

/// Reserved all-zero identifier used as the placeholder default when a
/// required foreign-key column is added to an empty table.
pub const ZERO_UUID: &str = "00000000-0000-0000-0000-000000000000";

/// Enable a server extension (`CREATE EXTENSION IF NOT EXISTS`).
pub struct EnableExtension {
    extension: String,
}

impl EnableExtension {
    pub fn new(extension: impl Into<String>) -> Self {
        Self {
            extension: extension.into(),
        }
    }
}

impl SchemaStep for EnableExtension {
    fn name(&self) -> String {
        format!("enable_extension {}", self.extension)
    }

    fn phase(&self) -> Phase {
        Phase::Extensions
    }

    fn is_satisfied(&self, inspector: &mut SchemaInspector<'_>) -> Result<bool, Error> {
        inspector.extension_exists(&self.extension)
    }

    fn apply(&self, client: &mut Client) -> Result<StepOutcome, Error> {
        client.execute(
            &format!("CREATE EXTENSION IF NOT EXISTS \"{}\"", self.extension),
            &[],
        )?;
        Ok(StepOutcome::Applied)
    }
}

/// Create a generator sequence if absent.
pub struct CreateSequence {
    sequence: String,
    start: i64,
}

impl CreateSequence {
    pub fn new(sequence: impl Into<String>, start: i64) -> Self {
        Self {
            sequence: sequence.into(),
            start,
        }
    }
}

impl SchemaStep for CreateSequence {
    fn name(&self) -> String {
        format!("create_sequence {}", self.sequence)
    }

    fn phase(&self) -> Phase {
        Phase::Sequences
    }

    fn is_satisfied(&self, inspector: &mut SchemaInspector<'_>) -> Result<bool, Error> {
        inspector.sequence_exists(&self.sequence)
    }

    fn apply(&self, client: &mut Client) -> Result<StepOutcome, Error> {
        client.execute(
            &format!(
                "CREATE SEQUENCE IF NOT EXISTS {} START {}",
                self.sequence, self.start
            ),
            &[],
        )?;
        Ok(StepOutcome::Applied)
    }
}

/// Create a table if absent. Column definitions are raw SQL fragments; the
/// table's full column set is normally grown afterwards by [`AddColumn`]
/// steps so that existing databases converge column by column.
pub struct CreateTable {
    table: String,
    columns: Vec<String>,
    references: Vec<String>,
}

impl CreateTable {
    pub fn new(table: impl Into<String>, columns: &[&str]) -> Self {
        Self {
            table: table.into(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            references: Vec::new(),
        }
    }

    /// Declare a foreign-key target among the inline column definitions, so
    /// plan ordering places this step after the referenced table's creation.
    pub fn with_reference(mut self, table: impl Into<String>) -> Self {
        self.references.push(table.into());
        self
    }
}

impl SchemaStep for CreateTable {
    fn name(&self) -> String {
        format!("create_table {}", self.table)
    }

    fn phase(&self) -> Phase {
        Phase::Tables
    }

    fn creates_table(&self) -> Option<&str> {
        Some(&self.table)
    }

    fn references(&self) -> Vec<String> {
        self.references.clone()
    }

    fn is_satisfied(&self, inspector: &mut SchemaInspector<'_>) -> Result<bool, Error> {
        inspector.table_exists(&self.table)
    }

    fn apply(&self, client: &mut Client) -> Result<StepOutcome, Error> {
        client.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS {} ({})",
                self.table,
                self.columns.join(", ")
            ),
            &[],
        )?;
        Ok(StepOutcome::Applied)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnDelete {
    NoAction,
    Cascade,
    SetNull,
}

impl OnDelete {
    fn sql(self) -> &'static str {
        match self {
            Self::NoAction => "",
            Self::Cascade => " ON DELETE CASCADE",
            Self::SetNull => " ON DELETE SET NULL",
        }
    }
}

enum ColumnKind {
    Plain {
        sql_type: String,
        not_null: bool,
        unique: bool,
        default: Option<String>,
        check: Option<String>,
    },
    /// UUID column referencing the parent table's `id`. When `required`, the
    /// column's final shape is resolved at execution time from the table's
    /// current row count (see [`AddColumn::apply`]).
    ForeignKey {
        parent: String,
        required: bool,
        on_delete: OnDelete,
    },
}

/// Add a column to an existing table if absent.
pub struct AddColumn {
    table: String,
    column: String,
    kind: ColumnKind,
}

impl AddColumn {
    pub fn plain(
        table: impl Into<String>,
        column: impl Into<String>,
        sql_type: impl Into<String>,
    ) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
            kind: ColumnKind::Plain {
                sql_type: sql_type.into(),
                not_null: false,
                unique: false,
                default: None,
                check: None,
            },
        }
    }

    pub fn foreign_key(
        table: impl Into<String>,
        column: impl Into<String>,
        parent: impl Into<String>,
    ) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
            kind: ColumnKind::ForeignKey {
                parent: parent.into(),
                required: false,
                on_delete: OnDelete::NoAction,
            },
        }
    }

    pub fn not_null(mut self) -> Self {
        if let ColumnKind::Plain { not_null, .. } = &mut self.kind {
            *not_null = true;
        }
        self
    }

    pub fn unique(mut self) -> Self {
        if let ColumnKind::Plain { unique, .. } = &mut self.kind {
            *unique = true;
        }
        self
    }

    /// Raw SQL default expression.
    pub fn default_sql(mut self, expression: impl Into<String>) -> Self {
        if let ColumnKind::Plain { default, .. } = &mut self.kind {
            *default = Some(expression.into());
        }
        self
    }

    /// Raw SQL check expression (without the surrounding `CHECK (...)`).
    pub fn check(mut self, expression: impl Into<String>) -> Self {
        if let ColumnKind::Plain { check, .. } = &mut self.kind {
            *check = Some(expression.into());
        }
        self
    }

    /// Mark a foreign-key column as logically required. The NOT NULL shape is
    /// only achievable when the table is still empty; on a populated table
    /// the column is added nullable instead.
    pub fn required(mut self) -> Self {
        if let ColumnKind::ForeignKey { required, .. } = &mut self.kind {
            *required = true;
        }
        self
    }

    pub fn on_delete_cascade(mut self) -> Self {
        if let ColumnKind::ForeignKey { on_delete, .. } = &mut self.kind {
            *on_delete = OnDelete::Cascade;
        }
        self
    }

    pub fn on_delete_set_null(mut self) -> Self {
        if let ColumnKind::ForeignKey { on_delete, .. } = &mut self.kind {
            *on_delete = OnDelete::SetNull;
        }
        self
    }
}

impl SchemaStep for AddColumn {
    fn name(&self) -> String {
        format!("add_column {}.{}", self.table, self.column)
    }

    fn phase(&self) -> Phase {
        Phase::Columns
    }

    fn references(&self) -> Vec<String> {
        match &self.kind {
            ColumnKind::ForeignKey { parent, .. } => vec![parent.clone()],
            ColumnKind::Plain { .. } => Vec::new(),
        }
    }

    fn is_satisfied(&self, inspector: &mut SchemaInspector<'_>) -> Result<bool, Error> {
        inspector.column_exists(&self.table, &self.column)
    }

    fn apply(&self, client: &mut Client) -> Result<StepOutcome, Error> {
        let statement = match &self.kind {
            ColumnKind::Plain {
                sql_type,
                not_null,
                unique,
                default,
                check,
            } => {
                let mut sql = format!(
                    "ALTER TABLE {} ADD COLUMN {} {}",
                    self.table, self.column, sql_type
                );
                if *unique {
                    sql.push_str(" UNIQUE");
                }
                if *not_null {
                    sql.push_str(" NOT NULL");
                }
                if let Some(default) = default {
                    sql.push_str(&format!(" DEFAULT {}", default));
                }
                if let Some(check) = check {
                    sql.push_str(&format!(" CHECK ({})", check));
                }
                sql
            }
            ColumnKind::ForeignKey {
                parent,
                required,
                on_delete,
            } => {
                // Resolved per execution, not per construction: the same step
                // takes a different shape depending on whether the table
                // currently holds rows.
                let empty = !SchemaInspector::new(&mut *client).table_has_rows(&self.table)?;
                if *required && empty {
                    // No rows to satisfy, so NOT NULL with a placeholder
                    // default is safe; future inserts supply real values.
                    format!(
                        "ALTER TABLE {} ADD COLUMN {} UUID NOT NULL REFERENCES {}(id){} DEFAULT '{}'",
                        self.table,
                        self.column,
                        parent,
                        on_delete.sql(),
                        ZERO_UUID
                    )
                } else {
                    // Populated rows cannot be given real per-row values here,
                    // so the column goes in nullable with no default.
                    format!(
                        "ALTER TABLE {} ADD COLUMN {} UUID REFERENCES {}(id){}",
                        self.table,
                        self.column,
                        parent,
                        on_delete.sql()
                    )
                }
            }
        };

        client.execute(&statement, &[])?;
        Ok(StepOutcome::Applied)
    }
}

enum RetrofitKind {
    Unique,
    PrimaryKey,
}

/// Retrofit a uniqueness or primary-key constraint onto a table that may
/// already contain duplicate data.
///
/// If the server rejects the constraint with a unique violation, the step
/// resolves to [`StepOutcome::ToleratedConflict`] and the plan continues with
/// the constraint absent. Any other failure is fatal.
pub struct AddConstraint {
    table: String,
    constraint: Option<String>,
    kind: RetrofitKind,
    columns: Vec<String>,
}

impl AddConstraint {
    pub fn unique(table: impl Into<String>, constraint: impl Into<String>, columns: &[&str]) -> Self {
        Self {
            table: table.into(),
            constraint: Some(constraint.into()),
            kind: RetrofitKind::Unique,
            columns: columns.iter().map(|c| c.to_string()).collect(),
        }
    }

    /// Primary keys take the server's default `{table}_pkey` name.
    pub fn primary_key(table: impl Into<String>, columns: &[&str]) -> Self {
        Self {
            table: table.into(),
            constraint: None,
            kind: RetrofitKind::PrimaryKey,
            columns: columns.iter().map(|c| c.to_string()).collect(),
        }
    }

    fn constraint_name(&self) -> String {
        match &self.constraint {
            Some(name) => name.clone(),
            None => format!("{}_pkey", self.table),
        }
    }
}

impl SchemaStep for AddConstraint {
    fn name(&self) -> String {
        format!("add_constraint {}", self.constraint_name())
    }

    fn phase(&self) -> Phase {
        Phase::Constraints
    }

    fn is_satisfied(&self, inspector: &mut SchemaInspector<'_>) -> Result<bool, Error> {
        inspector.constraint_exists(&self.table, &self.constraint_name())
    }

    fn apply(&self, client: &mut Client) -> Result<StepOutcome, Error> {
        let columns = self.columns.join(", ");
        let statement = match self.kind {
            RetrofitKind::Unique => format!(
                "ALTER TABLE {} ADD CONSTRAINT {} UNIQUE ({})",
                self.table,
                self.constraint_name(),
                columns
            ),
            RetrofitKind::PrimaryKey => {
                format!("ALTER TABLE {} ADD PRIMARY KEY ({})", self.table, columns)
            }
        };

        match client.execute(&statement, &[]) {
            Ok(_) => Ok(StepOutcome::Applied),
            Err(error) if is_unique_violation(&error) => Ok(StepOutcome::ToleratedConflict {
                message: format!(
                    "cannot add constraint {} on {}({}): existing rows violate uniqueness",
                    self.constraint_name(),
                    self.table,
                    columns
                ),
            }),
            Err(error) => Err(error.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexMethod {
    BTree,
    Gin,
}

/// Create an index if absent. Column entries are raw SQL fragments so
/// ordering qualifiers like `created_at DESC` pass through unchanged.
pub struct CreateIndex {
    index: String,
    table: String,
    columns: Vec<String>,
    method: IndexMethod,
}

impl CreateIndex {
    pub fn new(index: impl Into<String>, table: impl Into<String>, columns: &[&str]) -> Self {
        Self {
            index: index.into(),
            table: table.into(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            method: IndexMethod::BTree,
        }
    }

    /// GIN index, for semi-structured columns such as JSONB.
    pub fn gin(mut self) -> Self {
        self.method = IndexMethod::Gin;
        self
    }
}

impl SchemaStep for CreateIndex {
    fn name(&self) -> String {
        format!("create_index {}", self.index)
    }

    fn phase(&self) -> Phase {
        Phase::Indexes
    }

    fn is_satisfied(&self, inspector: &mut SchemaInspector<'_>) -> Result<bool, Error> {
        inspector.index_exists(&self.index)
    }

    fn apply(&self, client: &mut Client) -> Result<StepOutcome, Error> {
        let columns = self.columns.join(", ");
        let statement = match self.method {
            IndexMethod::BTree => format!(
                "CREATE INDEX IF NOT EXISTS {} ON {}({})",
                self.index, self.table, columns
            ),
            IndexMethod::Gin => format!(
                "CREATE INDEX IF NOT EXISTS {} ON {} USING GIN({})",
                self.index, self.table, columns
            ),
        };
        client.execute(&statement, &[])?;
        Ok(StepOutcome::Applied)
    }
}

/// Install (define-or-replace) the shared touch-timestamp trigger function:
/// a BEFORE UPDATE hook body that overwrites `column` with the current time.
pub struct InstallTouchFunction {
    function: String,
    column: String,
}

impl InstallTouchFunction {
    pub fn new(function: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            function: function.into(),
            column: column.into(),
        }
    }
}

impl SchemaStep for InstallTouchFunction {
    fn name(&self) -> String {
        format!("install_function {}", self.function)
    }

    fn phase(&self) -> Phase {
        Phase::Triggers
    }

    fn is_satisfied(&self, inspector: &mut SchemaInspector<'_>) -> Result<bool, Error> {
        inspector.function_exists(&self.function)
    }

    fn apply(&self, client: &mut Client) -> Result<StepOutcome, Error> {
        // CREATE OR REPLACE: redefining an existing function of the same name
        // is always safe.
        client.batch_execute(&format!(
            "CREATE OR REPLACE FUNCTION {}() RETURNS trigger AS $$
             BEGIN
                 NEW.{} = CURRENT_TIMESTAMP;
                 RETURN NEW;
             END;
             $$ LANGUAGE plpgsql",
            self.function, self.column
        ))?;
        Ok(StepOutcome::Applied)
    }
}

/// Attach a BEFORE UPDATE trigger to one table. Attachment is
/// drop-then-recreate to avoid duplicate-attachment errors.
pub struct AttachTrigger {
    trigger: String,
    table: String,
    function: String,
}

impl AttachTrigger {
    pub fn new(
        trigger: impl Into<String>,
        table: impl Into<String>,
        function: impl Into<String>,
    ) -> Self {
        Self {
            trigger: trigger.into(),
            table: table.into(),
            function: function.into(),
        }
    }
}

impl SchemaStep for AttachTrigger {
    fn name(&self) -> String {
        format!("attach_trigger {}", self.trigger)
    }

    fn phase(&self) -> Phase {
        Phase::Triggers
    }

    fn is_satisfied(&self, inspector: &mut SchemaInspector<'_>) -> Result<bool, Error> {
        inspector.trigger_exists(&self.table, &self.trigger)
    }

    fn apply(&self, client: &mut Client) -> Result<StepOutcome, Error> {
        client.batch_execute(&format!(
            "DROP TRIGGER IF EXISTS {trigger} ON {table};
             CREATE TRIGGER {trigger}
                 BEFORE UPDATE ON {table}
                 FOR EACH ROW
                 EXECUTE FUNCTION {function}()",
            trigger = self.trigger,
            table = self.table,
            function = self.function
        ))?;
        Ok(StepOutcome::Applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::fresh_client;

    fn run_step(client: &mut Client, step: &dyn SchemaStep) -> StepOutcome {
        let satisfied = step
            .is_satisfied(&mut SchemaInspector::new(client))
            .unwrap();
        if satisfied {
            StepOutcome::AlreadyPresent
        } else {
            step.apply(client).unwrap()
        }
    }

    #[test]
    fn create_table_is_idempotent() {
        let mut client = fresh_client();
        let step = CreateTable::new("posts", &["id BIGINT PRIMARY KEY", "created_at TIMESTAMP"]);

        assert_eq!(run_step(&mut client, &step), StepOutcome::Applied);
        assert_eq!(run_step(&mut client, &step), StepOutcome::AlreadyPresent);
        assert!(SchemaInspector::new(&mut client)
            .table_exists("posts")
            .unwrap());
    }

    #[test]
    fn add_plain_column_with_modifiers() {
        let mut client = fresh_client();
        client
            .batch_execute("CREATE TABLE posts (id BIGINT PRIMARY KEY)")
            .unwrap();

        let step = AddColumn::plain("posts", "status", "VARCHAR(20)")
            .not_null()
            .default_sql("'pending'");
        assert_eq!(run_step(&mut client, &step), StepOutcome::Applied);
        assert_eq!(run_step(&mut client, &step), StepOutcome::AlreadyPresent);

        let snapshot = SchemaInspector::new(&mut client).snapshot().unwrap();
        let column = snapshot.tables["posts"]
            .columns
            .iter()
            .find(|c| c.name == "status")
            .unwrap();
        assert!(column.not_null);
        assert!(column.default_value.as_deref().unwrap().contains("pending"));
    }

    #[test]
    fn required_foreign_key_on_empty_table_gets_placeholder_default() {
        let mut client = fresh_client();
        client
            .batch_execute(
                "CREATE TABLE accounts (id UUID PRIMARY KEY);
                 CREATE TABLE posts (id UUID PRIMARY KEY)",
            )
            .unwrap();

        let step = AddColumn::foreign_key("posts", "owner_id", "accounts").required();
        assert_eq!(run_step(&mut client, &step), StepOutcome::Applied);

        let snapshot = SchemaInspector::new(&mut client).snapshot().unwrap();
        let column = snapshot.tables["posts"]
            .columns
            .iter()
            .find(|c| c.name == "owner_id")
            .unwrap();
        assert!(column.not_null);
        assert!(column
            .default_value
            .as_deref()
            .unwrap()
            .contains(ZERO_UUID));
    }

    #[test]
    fn required_foreign_key_on_populated_table_is_nullable() {
        let mut client = fresh_client();
        client
            .batch_execute(
                "CREATE TABLE accounts (id UUID PRIMARY KEY);
                 CREATE TABLE posts (id UUID PRIMARY KEY);
                 INSERT INTO posts (id) VALUES (gen_random_uuid())",
            )
            .unwrap();

        let step = AddColumn::foreign_key("posts", "owner_id", "accounts").required();
        assert_eq!(run_step(&mut client, &step), StepOutcome::Applied);

        let snapshot = SchemaInspector::new(&mut client).snapshot().unwrap();
        let column = snapshot.tables["posts"]
            .columns
            .iter()
            .find(|c| c.name == "owner_id")
            .unwrap();
        assert!(!column.not_null);
        assert_eq!(column.default_value, None);
    }

    #[test]
    fn constraint_retrofit_tolerates_duplicate_data() {
        let mut client = fresh_client();
        client
            .batch_execute(
                "CREATE TABLE votes (post_id BIGINT, account_id BIGINT);
                 INSERT INTO votes VALUES (1, 1), (1, 1)",
            )
            .unwrap();

        let step = AddConstraint::unique("votes", "votes_post_id_account_id_key", &["post_id", "account_id"]);
        match run_step(&mut client, &step) {
            StepOutcome::ToleratedConflict { message } => {
                assert!(message.contains("votes_post_id_account_id_key"));
                assert!(message.contains("post_id, account_id"));
            }
            other => panic!("expected tolerated conflict, got {:?}", other),
        }

        // The constraint is absent, and cleaning the data lets it apply.
        let snapshot = SchemaInspector::new(&mut client).snapshot().unwrap();
        assert!(!snapshot.has_constraint("votes", "votes_post_id_account_id_key"));

        client.execute("DELETE FROM votes", &[]).unwrap();
        assert_eq!(run_step(&mut client, &step), StepOutcome::Applied);
        assert_eq!(run_step(&mut client, &step), StepOutcome::AlreadyPresent);
    }

    #[test]
    fn primary_key_retrofit_tolerates_duplicate_data() {
        let mut client = fresh_client();
        client
            .batch_execute(
                "CREATE TABLE votes (post_id BIGINT NOT NULL, account_id BIGINT NOT NULL);
                 INSERT INTO votes VALUES (1, 1), (1, 1)",
            )
            .unwrap();

        let step = AddConstraint::primary_key("votes", &["post_id", "account_id"]);
        assert!(matches!(
            run_step(&mut client, &step),
            StepOutcome::ToleratedConflict { .. }
        ));
        assert!(!SchemaInspector::new(&mut client)
            .constraint_exists("votes", "votes_pkey")
            .unwrap());
    }

    #[test]
    fn constraint_retrofit_propagates_unrelated_failures() {
        let mut client = fresh_client();
        client
            .batch_execute("CREATE TABLE votes (post_id BIGINT)")
            .unwrap();

        // Undefined column is not a uniqueness conflict; it must stay fatal.
        let step = AddConstraint::unique("votes", "votes_bogus_key", &["no_such_column"]);
        assert!(step.apply(&mut client).is_err());
    }

    #[test]
    fn index_steps_cover_btree_and_gin() {
        let mut client = fresh_client();
        client
            .batch_execute(
                "CREATE TABLE posts (id BIGINT PRIMARY KEY, tags JSONB, created_at TIMESTAMP)",
            )
            .unwrap();

        let gin = CreateIndex::new("idx_posts_tags", "posts", &["tags"]).gin();
        let desc = CreateIndex::new("idx_posts_created_at", "posts", &["created_at DESC"]);

        assert_eq!(run_step(&mut client, &gin), StepOutcome::Applied);
        assert_eq!(run_step(&mut client, &desc), StepOutcome::Applied);
        assert_eq!(run_step(&mut client, &gin), StepOutcome::AlreadyPresent);
        assert_eq!(run_step(&mut client, &desc), StepOutcome::AlreadyPresent);

        let mut inspector = SchemaInspector::new(&mut client);
        assert!(inspector.index_exists("idx_posts_tags").unwrap());
        assert!(inspector.index_exists("idx_posts_created_at").unwrap());
    }

    #[test]
    fn touch_trigger_updates_modification_timestamp() {
        let mut client = fresh_client();
        client
            .batch_execute(
                "CREATE TABLE posts (
                     id BIGINT PRIMARY KEY,
                     title TEXT,
                     updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
                 );
                 INSERT INTO posts (id, title) VALUES (1, 'first')",
            )
            .unwrap();

        let function = InstallTouchFunction::new("touch_updated_at", "updated_at");
        let trigger = AttachTrigger::new("touch_posts_updated_at", "posts", "touch_updated_at");

        assert_eq!(run_step(&mut client, &function), StepOutcome::Applied);
        assert_eq!(run_step(&mut client, &trigger), StepOutcome::Applied);
        assert_eq!(run_step(&mut client, &function), StepOutcome::AlreadyPresent);
        assert_eq!(run_step(&mut client, &trigger), StepOutcome::AlreadyPresent);

        let before: std::time::SystemTime = client
            .query_one("SELECT updated_at FROM posts WHERE id = 1", &[])
            .unwrap()
            .get(0);
        std::thread::sleep(std::time::Duration::from_millis(20));
        client
            .execute("UPDATE posts SET title = 'second' WHERE id = 1", &[])
            .unwrap();
        let after: std::time::SystemTime = client
            .query_one("SELECT updated_at FROM posts WHERE id = 1", &[])
            .unwrap()
            .get(0);
        assert!(after > before);
    }

    #[test]
    fn sequence_and_extension_steps_are_idempotent() {
        let mut client = fresh_client();

        let sequence = CreateSequence::new("post_sn_seq", 1);
        assert_eq!(run_step(&mut client, &sequence), StepOutcome::Applied);
        assert_eq!(run_step(&mut client, &sequence), StepOutcome::AlreadyPresent);

        let extension = EnableExtension::new("pgcrypto");
        match run_step(&mut client, &extension) {
            StepOutcome::Applied | StepOutcome::AlreadyPresent => {}
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(run_step(&mut client, &extension), StepOutcome::AlreadyPresent);
    }
}
