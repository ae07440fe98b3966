use chrono::{SecondsFormat, Utc};
use extract::{EntityMap, ExtractionMethod};
use indexmap::IndexMap;
use ingest::FileType;
use serde::{Deserialize, Serialize};

use crate::classifier::ClassificationResult;
use crate::summarizer::SummaryResult;
use crate::topics::TopicResult;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRecord {
    #[serde(rename = "type")]
    pub entity_type: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityStats {
    pub total_entities: usize,
    pub entity_types: IndexMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub filename: String,
    pub file_type: FileType,
    pub extraction_method: ExtractionMethod,
    pub processed_at: String,
    pub entity_count: usize,
}

/// The response shape of a processed upload, the same for every extractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormattedReport {
    pub success: bool,
    pub metadata: ReportMetadata,
    pub classification: ClassificationResult,
    pub summary: SummaryResult,
    pub topics: TopicResult,
    pub entities: Vec<EntityRecord>,
    pub statistics: EntityStats,
}

/// Flatten a map into `{type, value}` records plus per-type counts.
pub fn format_entities(entities: &EntityMap) -> (Vec<EntityRecord>, EntityStats) {
    let mut records = Vec::with_capacity(entities.total_values());
    let mut stats = EntityStats::default();

    for (entity_type, values) in entities.iter() {
        for value in values {
            records.push(EntityRecord {
                entity_type: entity_type.to_string(),
                value: value.trim().to_string(),
            });
            *stats.entity_types.entry(entity_type.to_string()).or_default() += 1;
        }
    }

    stats.total_entities = records.len();
    (records, stats)
}

pub struct ReportInput<'a> {
    pub filename: &'a str,
    pub file_type: FileType,
    pub method: ExtractionMethod,
    pub entities: &'a EntityMap,
    pub classification: ClassificationResult,
    pub summary: SummaryResult,
    pub topics: TopicResult,
}

pub fn build_report(input: ReportInput<'_>) -> FormattedReport {
    let (entities, statistics) = format_entities(input.entities);

    FormattedReport {
        success: true,
        metadata: ReportMetadata {
            filename: input.filename.to_string(),
            file_type: input.file_type,
            extraction_method: input.method,
            processed_at: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            entity_count: statistics.total_entities,
        },
        classification: input.classification,
        summary: input.summary,
        topics: input.topics,
        entities,
        statistics,
    }
}
