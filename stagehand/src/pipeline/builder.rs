//! Pipeline builder with validation.

use super::{
    Environment, NotificationRule, PipelineConfig, StageConfig, StageGraph, Trigger,
};
use crate::errors::{PipelineValidationError, ValidationErrorInfo};
use std::collections::HashSet;

/// Builder for validated [`PipelineConfig`]s.
///
/// The registry accepts any definition; this builder is the place where
/// definitions get checked before they are handed over.
#[derive(Debug, Clone)]
pub struct PipelineBuilder {
    config: PipelineConfig,
}

impl PipelineBuilder {
    /// Creates a new builder.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            config: PipelineConfig::new(id, name),
        }
    }

    /// Sets the trigger.
    #[must_use]
    pub fn trigger(mut self, trigger: Trigger) -> Self {
        self.config.trigger = trigger;
        self
    }

    /// Sets the branch filter.
    #[must_use]
    pub fn branch(mut self, branch: impl Into<String>) -> Self {
        self.config.branch = Some(branch.into());
        self
    }

    /// Sets the environment.
    #[must_use]
    pub fn environment(mut self, environment: Environment) -> Self {
        self.config.environment = environment;
        self
    }

    /// Appends a stage.
    #[must_use]
    pub fn stage(mut self, stage: StageConfig) -> Self {
        self.config.stages.push(stage);
        self
    }

    /// Appends a notification rule.
    #[must_use]
    pub fn notify(mut self, rule: NotificationRule) -> Self {
        self.config.notifications.push(rule);
        self
    }

    /// Marks the pipeline as auto-approved.
    #[must_use]
    pub fn auto_approval(mut self) -> Self {
        self.config.auto_approval = true;
        self
    }

    /// Logs a rollback when a production run fails.
    #[must_use]
    pub fn rollback_on_failure(mut self) -> Self {
        self.config.rollback_on_failure = true;
        self
    }

    /// Returns the number of stages added so far.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.config.stages.len()
    }

    /// Validates and returns the pipeline.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty id, no stages, duplicate stage names,
    /// self or unknown dependencies, dependency cycles, or a stage declared
    /// before one of its dependencies.
    pub fn build(self) -> Result<PipelineConfig, PipelineValidationError> {
        validate(&self.config)?;
        Ok(self.config)
    }
}

/// Validates a pipeline definition.
///
/// # Errors
///
/// See [`PipelineBuilder::build`].
pub fn validate(config: &PipelineConfig) -> Result<(), PipelineValidationError> {
    if config.id.trim().is_empty() {
        return Err(PipelineValidationError::new(
            "Pipeline id cannot be empty or whitespace-only",
        )
        .with_error_info(ValidationErrorInfo::new("PIPELINE-EMPTY-ID", "Missing pipeline id")));
    }

    if config.stages.is_empty() {
        return Err(PipelineValidationError::new(format!(
            "Pipeline '{}' has no stages",
            config.id
        ))
        .with_error_info(
            ValidationErrorInfo::new("PIPELINE-EMPTY", "Cannot build an empty pipeline")
                .with_fix_hint("Add at least one stage to the pipeline before building."),
        ));
    }

    let mut names = HashSet::new();
    for stage in &config.stages {
        if !names.insert(stage.name.as_str()) {
            return Err(PipelineValidationError::new(format!(
                "Duplicate stage name '{}'",
                stage.name
            ))
            .with_stages(vec![stage.name.clone()])
            .with_error_info(ValidationErrorInfo::new(
                "PIPELINE-DUPLICATE-STAGE",
                "Stage names must be unique within a pipeline",
            )));
        }
    }

    for stage in &config.stages {
        for dep in &stage.dependencies {
            if dep == &stage.name {
                return Err(PipelineValidationError::new(format!(
                    "Stage '{}' cannot depend on itself",
                    stage.name
                ))
                .with_stages(vec![stage.name.clone()])
                .with_error_info(ValidationErrorInfo::new(
                    "PIPELINE-SELF-DEP",
                    "Self dependency",
                )));
            }
            if !names.contains(dep.as_str()) {
                return Err(PipelineValidationError::new(format!(
                    "Stage '{}' depends on unknown stage '{}'",
                    stage.name, dep
                ))
                .with_stages(vec![stage.name.clone(), dep.clone()])
                .with_error_info(
                    ValidationErrorInfo::new(
                        "PIPELINE-MISSING-DEP",
                        format!("Dependency '{dep}' not found"),
                    )
                    .with_context_entry("pipeline", config.id.clone())
                    .with_fix_hint("Declare the dependency as a stage of the same pipeline."),
                ));
            }
        }
    }

    let graph = StageGraph::from_config(config);
    graph.topological_order()?;

    if !graph.is_declaration_order_valid() {
        return Err(PipelineValidationError::new(format!(
            "Pipeline '{}' declares a stage before one of its dependencies",
            config.id
        ))
        .with_error_info(
            ValidationErrorInfo::new(
                "PIPELINE-ORDER",
                "Stages run in declaration order; a dependent declared first is always skipped",
            )
            .with_fix_hint("Move each stage below the stages it depends on."),
        ));
    }

    Ok(())
}
