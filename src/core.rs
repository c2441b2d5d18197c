use crate::error::Error;
use crate::inspect::SchemaInspector;
use postgres::Client;
use serde::{Deserialize, Serialize};

/// The kinds of schema objects the engine can check for and create.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Table,
    Column,
    Constraint,
    Index,
    Trigger,
    Sequence,
    Function,
}

/// Execution phases of a convergence run. Steps are bucketed by phase and
/// phases execute in declaration order: a column addition can rely on every
/// table already existing, a backfill can rely on every column existing, and
/// so on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Extensions,
    Sequences,
    Tables,
    Columns,
    Constraints,
    Backfill,
    Indexes,
    Triggers,
}

/// The result of applying a single step.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// The step's definition was applied to the database.
    Applied,
    /// The target object turned out to already exist; nothing was done.
    AlreadyPresent,
    /// The operation failed for an expected, tolerable reason (existing rows
    /// violate the constraint being added). The plan continues.
    ToleratedConflict { message: String },
}

/// A single idempotent unit of schema change.
///
/// Each step carries a predicate ([`SchemaStep::is_satisfied`]) and a
/// definition ([`SchemaStep::apply`]). The runner executes a check-then-act
/// protocol: if the predicate holds the step is recorded as a no-op, otherwise
/// the definition runs. Applying the same step twice with no intervening
/// external change must leave the database unchanged on the second pass.
pub trait SchemaStep {
    /// A stable, human-readable identity for this step, used in reports.
    fn name(&self) -> String;

    /// The phase this step executes in.
    fn phase(&self) -> Phase;

    /// The table this step creates, if any. Used for dependency ordering
    /// within the table-creation phase.
    fn creates_table(&self) -> Option<&str> {
        None
    }

    /// Tables this step references via foreign keys. A step referencing table
    /// T is never ordered before the step that creates T.
    fn references(&self) -> Vec<String> {
        Vec::new()
    }

    /// Whether the step's target object already exists in the live schema.
    /// Must be a pure catalog read with no side effects, and must not assume
    /// the object's dependencies exist.
    fn is_satisfied(&self, inspector: &mut SchemaInspector<'_>) -> Result<bool, Error>;

    /// Apply the step's definition. Only called when [`Self::is_satisfied`]
    /// returned false.
    fn apply(&self, client: &mut Client) -> Result<StepOutcome, Error>;
}

impl std::fmt::Debug for dyn SchemaStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaStep")
            .field("name", &self.name())
            .field("phase", &self.phase())
            .finish()
    }
}

/// A tolerated constraint conflict recorded during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Warning {
    pub step: String,
    pub message: String,
}

/// The step that aborted a run, with the underlying failure message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepFailure {
    pub step: String,
    pub message: String,
}

/// Terminal status of a convergence run.
#[derive(Debug, Clone, PartialEq)]
pub enum RunStatus {
    /// Every step is applied or already present.
    Converged,
    /// Converged, but one or more uniqueness constraints were skipped because
    /// existing rows violate them.
    ConvergedWithWarnings,
    /// A step failed fatally; steps after it were not attempted.
    Aborted { step: String },
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Converged => write!(f, "converged"),
            Self::ConvergedWithWarnings => write!(f, "converged with skipped constraints"),
            Self::Aborted { step } => write!(f, "aborted at step `{}`", step),
        }
    }
}

/// A structured report of one convergence run.
///
/// There is no migration-history record: the live schema is the persisted
/// state, and this report describes only what the run just did.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RunReport {
    /// Steps whose definition was applied this run.
    pub applied: Vec<String>,
    /// Steps skipped because their target object already existed.
    pub already_present: Vec<String>,
    /// Steps skipped with a warning (tolerated constraint conflicts).
    pub warnings: Vec<Warning>,
    /// The fatally failing step, if the run aborted.
    pub failure: Option<StepFailure>,
}

impl RunReport {
    pub fn applied_count(&self) -> usize {
        self.applied.len()
    }

    pub fn already_present_count(&self) -> usize {
        self.already_present.len()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    pub fn status(&self) -> RunStatus {
        if let Some(failure) = &self.failure {
            RunStatus::Aborted {
                step: failure.step.clone(),
            }
        } else if self.warnings.is_empty() {
            RunStatus::Converged
        } else {
            RunStatus::ConvergedWithWarnings
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_reflects_failure_over_warnings() {
        let mut report = RunReport::default();
        assert_eq!(report.status(), RunStatus::Converged);

        report.warnings.push(Warning {
            step: "add_constraint likes_pkey".to_string(),
            message: "duplicate rows".to_string(),
        });
        assert_eq!(report.status(), RunStatus::ConvergedWithWarnings);

        report.failure = Some(StepFailure {
            step: "add_column resources.tags".to_string(),
            message: "boom".to_string(),
        });
        assert_eq!(
            report.status(),
            RunStatus::Aborted {
                step: "add_column resources.tags".to_string()
            }
        );
    }

    #[test]
    fn status_display() {
        assert_eq!(RunStatus::Converged.to_string(), "converged");
        assert_eq!(
            RunStatus::Aborted {
                step: "create_table users".to_string()
            }
            .to_string(),
            "aborted at step `create_table users`"
        );
    }

    #[test]
    fn report_serializes_to_json() {
        let report = RunReport {
            applied: vec!["create_table users".to_string()],
            already_present: vec![],
            warnings: vec![Warning {
                step: "add_constraint likes_pkey".to_string(),
                message: "duplicate rows".to_string(),
            }],
            failure: None,
        };

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["applied"][0], "create_table users");
        assert_eq!(json["warnings"][0]["step"], "add_constraint likes_pkey");
        assert!(json["failure"].is_null());

        let back: RunReport = serde_json::from_value(json).unwrap();
        assert_eq!(back, report);
    }

    #[test]
    fn phases_execute_in_declaration_order() {
        assert!(Phase::Extensions < Phase::Sequences);
        assert!(Phase::Tables < Phase::Columns);
        assert!(Phase::Columns < Phase::Constraints);
        assert!(Phase::Constraints < Phase::Backfill);
        assert!(Phase::Backfill < Phase::Indexes);
        assert!(Phase::Indexes < Phase::Triggers);
    }
}
