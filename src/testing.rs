//! Testing utilities for convergence-plan development.
//!
//! This module provides a test harness for schema-plan testing:
//! [`PostgresTestHarness`]. Enabled under `cfg(test)` and behind the
//! `testing` cargo feature for downstream crates.

use postgres::types::FromSql;
use postgres::Client;

use crate::error::Error;
use crate::inspect::{SchemaInspector, SchemaSnapshot};
use crate::runner::MigrationRunner;

/// A test harness wrapping a live client and a runner, with assertion
/// helpers phrased in terms of the schema objects plans create.
///
/// # Example
///
/// ```ignore
/// use pg_converge::testing::PostgresTestHarness;
/// use pg_converge::{MigrationPlan, MigrationRunner};
/// use pg_converge::step::CreateTable;
///
/// let client = get_test_client(); // however you connect in your tests
/// let plan = MigrationPlan::new(vec![Box::new(CreateTable::new(
///     "users",
///     &["id UUID PRIMARY KEY"],
/// ))])?;
/// let mut harness = PostgresTestHarness::new(client, MigrationRunner::new(plan));
///
/// harness.converge()?;
/// harness.assert_table_exists("users")?;
/// harness.execute("INSERT INTO users (id) VALUES (gen_random_uuid())")?;
/// ```
pub struct PostgresTestHarness {
    client: Client,
    runner: MigrationRunner,
}

impl PostgresTestHarness {
    /// Create a new test harness with the given PostgreSQL client and runner.
    pub fn new(client: Client, runner: MigrationRunner) -> Self {
        Self { client, runner }
    }

    /// Run the plan to convergence and return the report.
    pub fn converge(&mut self) -> Result<crate::core::RunReport, Error> {
        self.runner.run(&mut self.client)
    }

    /// Names of the steps that would apply, without applying them.
    pub fn pending_steps(&mut self) -> Result<Vec<String>, Error> {
        Ok(self
            .runner
            .preview(&mut self.client)?
            .iter()
            .map(|s| s.name())
            .collect())
    }

    /// Execute a SQL statement, e.g. to seed fixture data.
    pub fn execute(&mut self, sql: &str) -> Result<(), Error> {
        self.client.batch_execute(sql)?;
        Ok(())
    }

    /// Query a single value from the first column of the first row.
    pub fn query_one<T>(&mut self, sql: &str) -> Result<T, Error>
    where
        T: for<'a> FromSql<'a>,
    {
        let row = self.client.query_one(sql, &[])?;
        Ok(row.get(0))
    }

    /// Query a single column from all rows.
    pub fn query_all<T>(&mut self, sql: &str) -> Result<Vec<T>, Error>
    where
        T: for<'a> FromSql<'a>,
    {
        let rows = self.client.query(sql, &[])?;
        Ok(rows.into_iter().map(|row| row.get(0)).collect())
    }

    pub fn assert_table_exists(&mut self, table: &str) -> Result<(), Error> {
        if !SchemaInspector::new(&mut self.client).table_exists(table)? {
            return Err(Error::Generic(format!(
                "Expected table '{}' to exist, but it does not",
                table
            )));
        }
        Ok(())
    }

    pub fn assert_table_not_exists(&mut self, table: &str) -> Result<(), Error> {
        if SchemaInspector::new(&mut self.client).table_exists(table)? {
            return Err(Error::Generic(format!(
                "Expected table '{}' to not exist, but it does",
                table
            )));
        }
        Ok(())
    }

    pub fn assert_column_exists(&mut self, table: &str, column: &str) -> Result<(), Error> {
        if !SchemaInspector::new(&mut self.client).column_exists(table, column)? {
            return Err(Error::Generic(format!(
                "Expected column '{}' to exist in table '{}', but it does not",
                column, table
            )));
        }
        Ok(())
    }

    pub fn assert_constraint_exists(&mut self, table: &str, constraint: &str) -> Result<(), Error> {
        if !SchemaInspector::new(&mut self.client).constraint_exists(table, constraint)? {
            return Err(Error::Generic(format!(
                "Expected constraint '{}' to exist on table '{}', but it does not",
                constraint, table
            )));
        }
        Ok(())
    }

    pub fn assert_index_exists(&mut self, index: &str) -> Result<(), Error> {
        if !SchemaInspector::new(&mut self.client).index_exists(index)? {
            return Err(Error::Generic(format!(
                "Expected index '{}' to exist, but it does not",
                index
            )));
        }
        Ok(())
    }

    pub fn assert_trigger_exists(&mut self, table: &str, trigger: &str) -> Result<(), Error> {
        if !SchemaInspector::new(&mut self.client).trigger_exists(table, trigger)? {
            return Err(Error::Generic(format!(
                "Expected trigger '{}' to exist on table '{}', but it does not",
                trigger, table
            )));
        }
        Ok(())
    }

    /// Capture the current structural state of the schema.
    pub fn capture_schema(&mut self) -> Result<SchemaSnapshot, Error> {
        SchemaInspector::new(&mut self.client).snapshot()
    }

    /// Assert the live schema structurally matches a previously captured
    /// snapshot.
    pub fn assert_schema_matches(&mut self, expected: &SchemaSnapshot) -> Result<(), Error> {
        let actual = self.capture_schema()?;
        if &actual != expected {
            return Err(Error::Generic(format!(
                "Schema does not match expected snapshot.\nExpected: {:#?}\nActual: {:#?}",
                expected, actual
            )));
        }
        Ok(())
    }

    /// Direct access to the underlying client.
    pub fn client(&mut self) -> &mut Client {
        &mut self.client
    }
}
