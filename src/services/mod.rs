pub mod prompt_audit;
pub mod prompt_builder;
pub mod submission_walker;

pub use prompt_audit::PromptAudit;
pub use prompt_builder::PromptBuilder;
pub use submission_walker::SubmissionWalker;
