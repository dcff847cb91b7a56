//! Core domain types shared by every layer:
//! - Execution, stage and approval status enums
//! - Execution identifiers

mod ids;
mod status;

pub use ids::ExecutionId;
pub use status::{ApprovalStatus, ExecutionStatus, JobStatus, StageStatus, StepStatus};
