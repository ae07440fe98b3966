pub mod classifier;
pub mod formatter;
pub mod summarizer;
pub mod topics;

pub use classifier::{ClassificationResult, classify};
pub use formatter::{
    EntityRecord, EntityStats, FormattedReport, ReportInput, ReportMetadata, build_report,
    format_entities,
};
pub use summarizer::{DocumentSummarizer, SummaryMethod, SummaryResult};
pub use topics::{DEFAULT_MAX_TOPICS, Topic, TopicMethod, TopicModeller, TopicResult};
