pub mod case_record;
pub mod criteria;
pub mod outcome;
pub mod verification;

pub use case_record::{CaseFields, CaseRecord, DocumentLink, FieldValue, NOT_AVAILABLE};
pub use criteria::{site_code_for, CaseType, SearchCriteria};
pub use outcome::{AttemptOutcome, RetryReason, SearchResult};
pub use verification::{VerificationChallenge, VerifiedCode};
