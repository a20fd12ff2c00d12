//! Application services for task lifecycle orchestration.

mod lifecycle;
mod policy;

pub use lifecycle::{
    CompleteTaskRequest, OverrideReviewRequest, ReviewResult, ReviewTaskRequest,
    TaskLifecycleError, TaskLifecycleResult, TaskLifecycleService,
};
pub use policy::{DEFAULT_PASS_THRESHOLD, ReviewPolicy};
