pub mod documents;
pub mod extraction;
pub mod outcome_recorder;
pub mod submission;
pub mod verification;

pub use documents::{DocumentResolver, DownloadedDocument};
pub use extraction::ExtractionChain;
pub use outcome_recorder::{JsonlOutcomeRecorder, OutcomeRecorder, OutcomeStatus};
pub use submission::SubmissionController;
pub use verification::VerificationResolver;
