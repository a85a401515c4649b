//! The task pipeline: a restricted state machine over named tasks.
//!
//! Tasks execute in registration order. The only allowed deviation is a
//! jump to a registered identifier, requested through [`TaskFlow`] and
//! honored by the pipeline after the requesting task returns. A jump to an
//! unregistered identifier is a fatal defect, not a recoverable condition.

mod checks;
mod steps;

pub use checks::{
    CheckAbsoluteGapTask, CheckConstraintToleranceTask, CheckIterationErrorTask,
    CheckIterationLimitTask, CheckPrimalStagnationTask, CheckRelativeGapTask, CheckTimeLimitTask,
};
pub use steps::{
    CreateDualProblemTask, ExecuteRelaxationStrategyTask, ExecuteSolutionLimitStrategyTask,
    FindInteriorPointTask, GenerateCutsTask, InitIterationTask, PresolveTask,
    SelectPrimalCandidatesTask, SolveDualTask, UpdateInteriorPointTask,
};

use std::fmt;

use hyperforge_core::{HyperforgeError, Result};
use tracing::debug;

use crate::scope::SolveScope;

/// One pipeline step. Tasks own their parameters; everything shared lives
/// in the [`SolveScope`].
pub trait Task {
    fn run(&mut self, scope: &mut SolveScope, flow: &mut TaskFlow) -> Result<()>;

    /// Stable name used in trace output.
    fn type_name(&self) -> &'static str;
}

/// Control-flow request a task hands back to the pipeline.
#[derive(Debug, Default)]
pub struct TaskFlow {
    jump: Option<String>,
}

impl TaskFlow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests that the pipeline continue at the first registration of
    /// `target` instead of the next task.
    pub fn jump_to(&mut self, target: impl Into<String>) {
        self.jump = Some(target.into());
    }

    fn take_jump(&mut self) -> Option<String> {
        self.jump.take()
    }
}

/// Handle to an added task, usable to register it again under another
/// position in the order.
#[derive(Debug, Clone, Copy)]
pub struct TaskHandle(usize);

/// Ordered task registry plus the execution loop.
#[derive(Default)]
pub struct TaskPipeline {
    /// Execution order as `(identifier, task index)`; the same task may
    /// appear more than once.
    order: Vec<(String, usize)>,
    tasks: Vec<Box<dyn Task>>,
}

impl fmt::Debug for TaskPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskPipeline")
            .field("order", &self.order)
            .finish_non_exhaustive()
    }
}

impl TaskPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `task` under `id` at the end of the current order.
    pub fn add_task(&mut self, id: impl Into<String>, task: Box<dyn Task>) -> TaskHandle {
        let index = self.tasks.len();
        self.tasks.push(task);
        self.order.push((id.into(), index));
        TaskHandle(index)
    }

    /// Registers an already-added task again at the end of the order, under
    /// a new identifier.
    pub fn add_existing(&mut self, id: impl Into<String>, handle: TaskHandle) {
        self.order.push((id.into(), handle.0));
    }

    fn position_of(&self, id: &str) -> Option<usize> {
        self.order.iter().position(|(name, _)| name == id)
    }

    /// Executes the order from the beginning until it runs off the end.
    pub fn run(&mut self, scope: &mut SolveScope) -> Result<()> {
        let mut flow = TaskFlow::new();
        let mut cursor = 0;

        while cursor < self.order.len() {
            let (id, index) = &self.order[cursor];
            let task = &mut self.tasks[*index];
            debug!(id = %id, task = task.type_name(), "running task");
            task.run(scope, &mut flow)?;

            match flow.take_jump() {
                Some(target) => {
                    let position = self
                        .position_of(&target)
                        .ok_or_else(|| HyperforgeError::TaskNotFound(target.clone()))?;
                    debug!(from = %self.order[cursor].0, to = %target, "pipeline jump");
                    cursor = position;
                }
                None => cursor += 1,
            }
        }

        Ok(())
    }
}

/// A task grouping sub-tasks that always run as one unit, in order. A jump
/// requested by a sub-task takes effect after the whole group finishes.
#[derive(Default)]
pub struct SequentialTask {
    tasks: Vec<Box<dyn Task>>,
}

impl SequentialTask {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, task: Box<dyn Task>) {
        self.tasks.push(task);
    }
}

impl Task for SequentialTask {
    fn run(&mut self, scope: &mut SolveScope, flow: &mut TaskFlow) -> Result<()> {
        for task in &mut self.tasks {
            task.run(scope, flow)?;
        }
        Ok(())
    }

    fn type_name(&self) -> &'static str {
        "SequentialTask"
    }
}

/// Unconditional jump, used to close the main iteration loop.
pub struct JumpTask {
    target: String,
}

impl JumpTask {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
        }
    }
}

impl Task for JumpTask {
    fn run(&mut self, _scope: &mut SolveScope, flow: &mut TaskFlow) -> Result<()> {
        flow.jump_to(self.target.clone());
        Ok(())
    }

    fn type_name(&self) -> &'static str {
        "JumpTask"
    }
}
