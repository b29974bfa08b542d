//! Workflow schema loading, instance lifecycle, transition validation, and
//! enforcement-mode decisions for multi-triad workflows.

pub mod enforce;
pub mod error;
pub mod instance;
pub mod schema;
pub mod validate;

pub use enforce::{DeviationType, Enforcer, EnforcementResult};
pub use error::{Result, WorkflowError};
pub use instance::{
    CompletedTriad, Deviation, InstanceManager, InstanceMetadata, InstanceStatus, InstanceSummary,
    SkippedTriad, WorkflowInstance, WorkflowProgress,
};
pub use schema::{
    ComplexityLevel, Condition, ConditionMetrics, ContentCreatedThreshold, EnforcementConfig,
    EnforcementMode, TriadDefinition, WorkflowRule, WorkflowSchema, load_schema_str,
};
pub use validate::{ContentCreated, Metrics, ValidationResult, Validator};
