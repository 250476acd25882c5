pub mod enrollment;
pub mod verification;

pub use enrollment::{EnrollmentOutcome, EnrollmentService};
pub use verification::{VerificationOutcome, VerificationService};
