//! Ordinal backfill for retrofitted serial-number columns.

use postgres::Client;

use crate::core::{Phase, SchemaStep, StepOutcome};
use crate::error::Error;
use crate::inspect::SchemaInspector;

/// Assigns dense sequence ordinals to rows that predate the ordinal column.
///
/// Rows with a NULL ordinal receive consecutive values in creation order
/// (oldest first, key as tiebreaker), continuing from the current maximum.
/// The backing sequence is then advanced past the high-water mark so new
/// rows never collide with backfilled ones.
///
/// The step is satisfied when there is nothing to number: the table or the
/// ordinal column does not exist yet, or no row has a NULL ordinal. This is
/// an existence decision, not a suppressed error.
pub struct SequenceBackfill {
    table: String,
    ordinal_column: String,
    sequence: String,
    key_column: String,
    created_column: String,
}

impl SequenceBackfill {
    pub fn new(
        table: impl Into<String>,
        ordinal_column: impl Into<String>,
        sequence: impl Into<String>,
    ) -> Self {
        Self {
            table: table.into(),
            ordinal_column: ordinal_column.into(),
            sequence: sequence.into(),
            key_column: "id".to_string(),
            created_column: "created_at".to_string(),
        }
    }

    /// Override the primary-key column used as the creation-order tiebreaker.
    pub fn key_column(mut self, column: impl Into<String>) -> Self {
        self.key_column = column.into();
        self
    }

    /// Override the timestamp column that defines creation order.
    pub fn created_column(mut self, column: impl Into<String>) -> Self {
        self.created_column = column.into();
        self
    }
}

impl SchemaStep for SequenceBackfill {
    fn name(&self) -> String {
        format!("backfill {}.{}", self.table, self.ordinal_column)
    }

    fn phase(&self) -> Phase {
        Phase::Backfill
    }

    fn is_satisfied(&self, inspector: &mut SchemaInspector<'_>) -> Result<bool, Error> {
        Ok(!inspector.column_has_nulls(&self.table, &self.ordinal_column)?)
    }

    fn apply(&self, client: &mut Client) -> Result<StepOutcome, Error> {
        let start = SchemaInspector::new(&mut *client)
            .max_bigint(&self.table, &self.ordinal_column)?
            .unwrap_or(0);

        // Single statement: row_number() over creation order produces dense
        // ordinals, offset by the existing maximum.
        let assigned = client.execute(
            &format!(
                "WITH missing AS (
                     SELECT {key},
                            row_number() OVER (ORDER BY {created} ASC, {key} ASC) AS rn
                     FROM {table}
                     WHERE {ordinal} IS NULL
                 )
                 UPDATE {table}
                 SET {ordinal} = missing.rn + $1
                 FROM missing
                 WHERE {table}.{key} = missing.{key}",
                table = self.table,
                ordinal = self.ordinal_column,
                key = self.key_column,
                created = self.created_column,
            ),
            &[&start],
        )?;

        if assigned > 0 {
            // setval takes a regclass, so the name goes into the statement
            // text rather than a parameter.
            client.execute(
                &format!(
                    "SELECT setval('{}', {}, true)",
                    self.sequence,
                    start + assigned as i64
                ),
                &[],
            )?;
        }

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

    fn setup(client: &mut Client) {
        client
            .batch_execute(
                "CREATE SEQUENCE member_sn_seq START 1;
                 CREATE TABLE members (
                     id BIGINT PRIMARY KEY,
                     sn BIGINT,
                     created_at TIMESTAMP NOT NULL
                 )",
            )
            .unwrap();
    }

    #[test]
    fn assigns_dense_ordinals_in_creation_order() {
        let mut client = fresh_client();
        setup(&mut client);
        client
            .batch_execute(
                "INSERT INTO members (id, sn, created_at) VALUES
                     (30, NULL, '2024-03-01'),
                     (10, NULL, '2024-01-01'),
                     (20, NULL, '2024-02-01')",
            )
            .unwrap();

        let step = SequenceBackfill::new("members", "sn", "member_sn_seq");
        assert_eq!(run_step(&mut client, &step), StepOutcome::Applied);

        let rows = client
            .query("SELECT id, sn FROM members ORDER BY sn", &[])
            .unwrap();
        let pairs: Vec<(i64, i64)> = rows.iter().map(|r| (r.get(0), r.get(1))).collect();
        assert_eq!(pairs, vec![(10, 1), (20, 2), (30, 3)]);

        // The sequence continues past the backfilled high-water mark.
        let next: i64 = client
            .query_one("SELECT nextval('member_sn_seq')", &[])
            .unwrap()
            .get(0);
        assert_eq!(next, 4);
    }

    #[test]
    fn continues_from_existing_maximum() {
        let mut client = fresh_client();
        setup(&mut client);
        client
            .batch_execute(
                "INSERT INTO members (id, sn, created_at) VALUES
                     (1, 41, '2024-01-01'),
                     (2, NULL, '2024-02-01'),
                     (3, NULL, '2024-03-01')",
            )
            .unwrap();

        let step = SequenceBackfill::new("members", "sn", "member_sn_seq");
        assert_eq!(run_step(&mut client, &step), StepOutcome::Applied);

        let rows = client
            .query("SELECT id, sn FROM members ORDER BY id", &[])
            .unwrap();
        let pairs: Vec<(i64, i64)> = rows.iter().map(|r| (r.get(0), r.get(1))).collect();
        assert_eq!(pairs, vec![(1, 41), (2, 42), (3, 43)]);
    }

    #[test]
    fn satisfied_when_nothing_to_number() {
        let mut client = fresh_client();
        let step = SequenceBackfill::new("members", "sn", "member_sn_seq");

        // Table absent entirely.
        assert_eq!(run_step(&mut client, &step), StepOutcome::AlreadyPresent);

        // Table present, empty.
        setup(&mut client);
        assert_eq!(run_step(&mut client, &step), StepOutcome::AlreadyPresent);

        // All rows already numbered.
        client
            .execute(
                "INSERT INTO members (id, sn, created_at) VALUES (1, 1, '2024-01-01')",
                &[],
            )
            .unwrap();
        assert_eq!(run_step(&mut client, &step), StepOutcome::AlreadyPresent);
    }

    #[test]
    fn rerun_is_a_no_op() {
        let mut client = fresh_client();
        setup(&mut client);
        client
            .execute(
                "INSERT INTO members (id, sn, created_at) VALUES (1, NULL, '2024-01-01')",
                &[],
            )
            .unwrap();

        let step = SequenceBackfill::new("members", "sn", "member_sn_seq");
        assert_eq!(run_step(&mut client, &step), StepOutcome::Applied);
        assert_eq!(run_step(&mut client, &step), StepOutcome::AlreadyPresent);

        let sn: i64 = client
            .query_one("SELECT sn FROM members WHERE id = 1", &[])
            .unwrap()
            .get(0);
        assert_eq!(sn, 1);
    }
}
