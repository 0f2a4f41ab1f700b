use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Instant;

use gtfs_graph_model::EntityKind;
use tracing::{debug, info};

use crate::{rules, Dataset, GraphError, Severity, Violation, ViolationReport};

/// Checks the invariants of one collection.
pub trait Validator {
    fn name(&self) -> &'static str;
    fn kind(&self) -> EntityKind;
    fn validate(&self, dataset: &Dataset, report: &mut ViolationReport);
}

#[derive(Default)]
pub struct ValidatorRunner {
    validators: Vec<Box<dyn Validator>>,
}

impl ValidatorRunner {
    pub fn new() -> Self {
        Self {
            validators: Vec::new(),
        }
    }

    /// A runner holding every built-in collection rule.
    pub fn with_default_rules() -> Self {
        let mut runner = Self::new();
        rules::register_default_rules(&mut runner);
        runner
    }

    pub fn register<V>(&mut self, validator: V)
    where
        V: Validator + 'static,
    {
        self.validators.push(Box::new(validator));
    }

    pub fn run(&self, dataset: &Dataset) -> ViolationReport {
        let mut report = ViolationReport::new();
        self.run_with(dataset, &mut report);
        report
    }

    pub fn run_with(&self, dataset: &Dataset, report: &mut ViolationReport) {
        for validator in &self.validators {
            run_one(validator.as_ref(), dataset, report);
        }
    }

    /// Runs only the validators checking `kind`.
    pub fn run_kind(&self, dataset: &Dataset, kind: EntityKind) -> ViolationReport {
        let mut report = ViolationReport::new();
        for validator in self.validators.iter().filter(|v| v.kind() == kind) {
            run_one(validator.as_ref(), dataset, &mut report);
        }
        report
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }
}

fn run_one(validator: &dyn Validator, dataset: &Dataset, report: &mut ViolationReport) {
    let mut local = ViolationReport::new();
    let result = catch_unwind(AssertUnwindSafe(|| validator.validate(dataset, &mut local)));
    if let Err(panic) = result {
        local.push(runtime_exception_in_validator(
            validator,
            panic_payload_message(&*panic),
        ));
    }
    if !local.is_empty() {
        debug!(
            validator = validator.name(),
            violations = local.len(),
            "validator reported violations"
        );
    }
    report.merge(local);
}

fn runtime_exception_in_validator(validator: &dyn Validator, message: String) -> Violation {
    Violation::new(
        "runtime_exception_in_validator",
        Severity::Error,
        validator.kind(),
        validator.name(),
        "validator panicked",
    )
    .with_context_field("validator", validator.name())
    .with_context_field("message", message)
}

fn panic_payload_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic".to_string()
    }
}

impl Dataset {
    /// Runs every rule and returns all violations, warnings included,
    /// without touching the validation state.
    pub fn check(&self) -> ViolationReport {
        ValidatorRunner::with_default_rules().run(self)
    }

    /// Checks every invariant. Returns at once when the dataset is already
    /// validated, unless `force` is set. Warnings never fail.
    pub fn validate(&mut self, force: bool) -> Result<(), GraphError> {
        if self.is_validated() && !force {
            return Ok(());
        }
        let started = Instant::now();
        let report = self.check();
        info!(
            violations = report.len(),
            errors = report.errors().count(),
            "validation took {:?}",
            started.elapsed()
        );
        if report.has_errors() {
            return Err(GraphError::InvariantViolation(report));
        }
        self.mark_validated();
        Ok(())
    }

    /// Runs the rules of a single collection. The validation state is left
    /// alone since other collections were not looked at.
    pub fn validate_collection(&self, kind: EntityKind) -> Result<(), GraphError> {
        let report = ValidatorRunner::with_default_rules().run_kind(self, kind);
        if report.has_errors() {
            return Err(GraphError::InvariantViolation(report));
        }
        Ok(())
    }
}
