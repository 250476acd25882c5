pub mod extractor;
pub mod matcher;
pub mod remote;
pub mod template;
pub mod types;

pub use extractor::{DescriptorExtractor, ExtractionError};
pub use matcher::{MatchOutcome, Matcher};
pub use remote::HttpExtractor;
pub use template::{mean_descriptor, ImagePolicy, TemplateBuilder};
pub use types::{FaceDescriptor, StoredTemplate};
