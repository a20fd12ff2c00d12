//! Unit tests for the task bounded context.

mod value_tests;

use crate::task::domain::{
    Artifacts, Completion, EmailAddress, NewTask, ReviewScore, ScoredReview, Task,
    TaskDomainError,
};
use crate::testing::ManualClock;
use crate::transfer::domain::ContainerRef;

pub(super) const AGENT: &str = "a@x.com";
pub(super) const REVIEWER: &str = "r@x.com";

pub(super) fn email(value: &str) -> EmailAddress {
    EmailAddress::new(value).expect("test email should be valid")
}

pub(super) fn open_task(clock: &ManualClock) -> Task {
    let fields = NewTask::new(
        "import_1",
        "group-a",
        "task_001",
        ContainerRef::new("sources/task_001").expect("container ref should be valid"),
    )
    .expect("new task fields should be valid");
    Task::new(fields, clock)
}

pub(super) fn full_artifacts() -> Artifacts {
    Artifacts::new()
        .with_object("object.glb")
        .with_alignment("alignment.json")
        .with_video_list("videos.txt")
}

pub(super) fn completed_task(clock: &ManualClock) -> Result<Task, TaskDomainError> {
    let mut task = open_task(clock);
    task.assign(email(AGENT), clock)?;
    task.complete(Completion::new(full_artifacts()), email(AGENT), clock)?;
    Ok(task)
}

pub(super) fn scored(score: u16, reviewer: &str) -> ScoredReview {
    ScoredReview {
        score: ReviewScore::new(score).expect("test score should be in range"),
        reviewer: email(reviewer),
        threshold: ReviewScore::saturating(80),
        feedback: None,
    }
}
