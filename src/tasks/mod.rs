//! Task domain: model, intake fan-out, and the lifecycle engine

pub mod engine;
pub mod intake;
pub mod model;
pub mod prompt;

pub use engine::{LifecycleEngine, MISSING_RESULT_REASON, TaskError, TaskProgress};
pub use intake::{
    ColorChoice, HairstyleOrder, IntakeError, IntakeReceipt, StyleChoice, TaskIntake,
    UPLOAD_NAMESPACE,
};
pub use model::{
    Gpt4oRequest, KontextRequest, Provider, ProviderRequest, Task, TaskExt, TaskPatch, TaskStatus,
};
