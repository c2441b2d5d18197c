//! Plan construction and dependency ordering.
//!
//! A [`MigrationPlan`] accepts steps in any order and normalizes them into a
//! safe execution order: steps are bucketed by [`Phase`](crate::Phase), and
//! within the table-creation phase a stable topological sort guarantees that
//! a table is created before any table that references it via foreign key.

use std::collections::HashSet;

use crate::core::{Phase, SchemaStep};
use crate::error::Error;

/// An ordered sequence of schema steps.
pub struct MigrationPlan {
    steps: Vec<Box<dyn SchemaStep>>,
}

impl MigrationPlan {
    /// Build a plan from steps supplied in arbitrary order.
    ///
    /// Returns an error when the foreign-key references among the plan's
    /// table-creation steps form a cycle.
    pub fn new(steps: Vec<Box<dyn SchemaStep>>) -> Result<Self, Error> {
        let mut steps = steps;
        // Stable sort: input order is preserved within each phase.
        steps.sort_by_key(|s| s.phase());

        let tables_start = steps.partition_point(|s| s.phase() < Phase::Tables);
        let tables_end = steps.partition_point(|s| s.phase() <= Phase::Tables);
        let tables: Vec<Box<dyn SchemaStep>> = steps.drain(tables_start..tables_end).collect();
        let ordered_tables = order_by_references(tables)?;
        for (offset, step) in ordered_tables.into_iter().enumerate() {
            steps.insert(tables_start + offset, step);
        }

        Ok(Self { steps })
    }

    pub fn steps(&self) -> &[Box<dyn SchemaStep>] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl std::fmt::Debug for MigrationPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MigrationPlan")
            .field(
                "steps",
                &self.steps.iter().map(|s| s.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Stable topological order over table-creation steps. References to tables
/// not created by this plan are assumed to already exist and impose no edge;
/// self-references are allowed.
fn order_by_references(
    steps: Vec<Box<dyn SchemaStep>>,
) -> Result<Vec<Box<dyn SchemaStep>>, Error> {
    let created: HashSet<String> = steps
        .iter()
        .filter_map(|s| s.creates_table().map(str::to_string))
        .collect();

    let total = steps.len();
    let mut pending: Vec<Option<Box<dyn SchemaStep>>> = steps.into_iter().map(Some).collect();
    let mut done: HashSet<String> = HashSet::new();
    let mut ordered = Vec::with_capacity(total);

    while ordered.len() < total {
        let mut progressed = false;
        for slot in pending.iter_mut() {
            let ready = match slot.as_ref() {
                Some(step) => step.references().iter().all(|r| {
                    !created.contains(r)
                        || done.contains(r)
                        || step.creates_table() == Some(r.as_str())
                }),
                None => false,
            };
            if !ready {
                continue;
            }
            if let Some(step) = slot.take() {
                if let Some(table) = step.creates_table() {
                    done.insert(table.to_string());
                }
                ordered.push(step);
                progressed = true;
            }
        }
        if !progressed {
            let stuck: Vec<String> = pending
                .iter()
                .flatten()
                .map(|s| s.name())
                .collect();
            return Err(Error::Generic(format!(
                "circular foreign-key references among table-creation steps: {}",
                stuck.join(", ")
            )));
        }
    }

    Ok(ordered)
}
