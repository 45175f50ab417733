// Pipeline: stage plan, stage implementations and the orchestrator that runs them

pub mod orchestrator;
pub mod processing;
pub mod stages;
pub mod steps;

pub use orchestrator::{PipelineExecutionResult, PipelineOrchestrator};
pub use stages::{Stage, StageDescriptor, StagePlan};
pub use steps::{PipelineStep, StageContext, StepResult};
