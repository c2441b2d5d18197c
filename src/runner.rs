//! Plan execution.

use std::time::Instant;

use postgres::Client;

use crate::core::{RunReport, SchemaStep, StepFailure, StepOutcome, Warning};
use crate::error::Error;
use crate::inspect::SchemaInspector;
use crate::plan::MigrationPlan;

/// Executes a [`MigrationPlan`] against a live database.
///
/// For each step the runner asks the step's predicate whether the live schema
/// already satisfies it; only unsatisfied steps have their definition applied.
/// Running the same plan twice in a row leaves the second [`RunReport`] with
/// zero applied steps. A fatal step error aborts the run; tolerated constraint
/// conflicts are recorded as warnings and execution continues.
pub struct MigrationRunner {
    plan: MigrationPlan,
    on_step_start: Option<Box<dyn Fn(&str) + Send + Sync>>,
    on_step_applied: Option<Box<dyn Fn(&str, std::time::Duration) + Send + Sync>>,
    on_step_skipped: Option<Box<dyn Fn(&str) + Send + Sync>>,
    on_step_conflict: Option<Box<dyn Fn(&str, &str) + Send + Sync>>,
    on_step_error: Option<Box<dyn Fn(&str, &Error) + Send + Sync>>,
}

// Manual Debug impl since closures don't implement Debug
impl std::fmt::Debug for MigrationRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MigrationRunner")
            .field("plan", &self.plan)
            .field("on_step_start", &self.on_step_start.is_some())
            .field("on_step_applied", &self.on_step_applied.is_some())
            .field("on_step_skipped", &self.on_step_skipped.is_some())
            .field("on_step_conflict", &self.on_step_conflict.is_some())
            .field("on_step_error", &self.on_step_error.is_some())
            .finish()
    }
}

impl MigrationRunner {
    pub fn new(plan: MigrationPlan) -> Self {
        Self {
            plan,
            on_step_start: None,
            on_step_applied: None,
            on_step_skipped: None,
            on_step_conflict: None,
            on_step_error: None,
        }
    }

    pub fn plan(&self) -> &MigrationPlan {
        &self.plan
    }

    /// Called with the step name before each unsatisfied step is applied.
    pub fn on_step_start<F>(mut self, callback: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.on_step_start = Some(Box::new(callback));
        self
    }

    /// Called with the step name and elapsed time after a step applies.
    pub fn on_step_applied<F>(mut self, callback: F) -> Self
    where
        F: Fn(&str, std::time::Duration) + Send + Sync + 'static,
    {
        self.on_step_applied = Some(Box::new(callback));
        self
    }

    /// Called with the step name when a step's target already exists.
    pub fn on_step_skipped<F>(mut self, callback: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.on_step_skipped = Some(Box::new(callback));
        self
    }

    /// Called with the step name and conflict message when a constraint is
    /// skipped over existing duplicate rows.
    pub fn on_step_conflict<F>(mut self, callback: F) -> Self
    where
        F: Fn(&str, &str) + Send + Sync + 'static,
    {
        self.on_step_conflict = Some(Box::new(callback));
        self
    }

    /// Called with the step name and error when a step fails fatally.
    pub fn on_step_error<F>(mut self, callback: F) -> Self
    where
        F: Fn(&str, &Error) + Send + Sync + 'static,
    {
        self.on_step_error = Some(Box::new(callback));
        self
    }

    /// Report which steps would apply, without changing the database. Each
    /// step's predicate runs against the live catalog; the returned steps are
    /// the unsatisfied ones in execution order.
    pub fn preview(&self, client: &mut Client) -> Result<Vec<&dyn SchemaStep>, Error> {
        let mut pending = Vec::new();
        for step in self.plan.steps() {
            if !step.is_satisfied(&mut SchemaInspector::new(client))? {
                pending.push(step.as_ref());
            }
        }
        Ok(pending)
    }

    /// Drive the plan to convergence.
    ///
    /// Returns `Ok` with a report even when a step fails; the failure is in
    /// [`RunReport::failure`] and later steps were not attempted. `Err` is
    /// reserved for the connection itself breaking down.
    pub fn run(&self, client: &mut Client) -> Result<RunReport, Error> {
        let mut report = RunReport::default();

        #[cfg(feature = "tracing")]
        tracing::debug!(steps = self.plan.len(), "Starting convergence run");

        for step in self.plan.steps() {
            let name = step.name();

            #[cfg(feature = "tracing")]
            let _span = tracing::info_span!("schema_step", step = %name).entered();

            let satisfied = match step.is_satisfied(&mut SchemaInspector::new(client)) {
                Ok(satisfied) => satisfied,
                Err(error) => {
                    #[cfg(feature = "tracing")]
                    tracing::error!(error = %error, "Existence check failed");

                    if let Some(ref callback) = self.on_step_error {
                        callback(&name, &error);
                    }
                    report.failure = Some(StepFailure {
                        step: name,
                        message: error.to_string(),
                    });
                    break;
                }
            };

            if satisfied {
                #[cfg(feature = "tracing")]
                tracing::debug!("Already present, skipping");

                if let Some(ref callback) = self.on_step_skipped {
                    callback(&name);
                }
                report.already_present.push(name);
                continue;
            }

            if let Some(ref callback) = self.on_step_start {
                callback(&name);
            }
            let step_start = Instant::now();

            match step.apply(client) {
                Ok(StepOutcome::Applied) => {
                    let duration = step_start.elapsed();

                    #[cfg(feature = "tracing")]
                    tracing::info!(duration_ms = duration.as_millis(), "Step applied");

                    if let Some(ref callback) = self.on_step_applied {
                        callback(&name, duration);
                    }
                    report.applied.push(name);
                }
                Ok(StepOutcome::AlreadyPresent) => {
                    if let Some(ref callback) = self.on_step_skipped {
                        callback(&name);
                    }
                    report.already_present.push(name);
                }
                Ok(StepOutcome::ToleratedConflict { message }) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(message = %message, "Constraint skipped over existing rows");

                    if let Some(ref callback) = self.on_step_conflict {
                        callback(&name, &message);
                    }
                    report.warnings.push(Warning {
                        step: name,
                        message,
                    });
                }
                Err(error) => {
                    #[cfg(feature = "tracing")]
                    tracing::error!(error = %error, "Step failed");

                    if let Some(ref callback) = self.on_step_error {
                        callback(&name, &error);
                    }
                    report.failure = Some(StepFailure {
                        step: name,
                        message: error.to_string(),
                    });
                    break;
                }
            }
        }

        #[cfg(feature = "tracing")]
        tracing::info!(
            applied = report.applied_count(),
            already_present = report.already_present_count(),
            warnings = report.warning_count(),
            status = %report.status(),
            "Convergence run finished"
        );

        Ok(report)
    }
}
