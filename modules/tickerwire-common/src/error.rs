use ai_client::AiError;
use thiserror::Error;

/// Every named rejection the pipeline can produce. The wire string (what the
/// feed adapter sees) comes from `as_str`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    NoContent,
    InsufficientContent,
    DuplicateContent,
    DuplicateDataContent,
    MissingCategory,
    HallucinatedSymbol,
    HallucinatedLocation,
    RegulatoryDiscussionNoAction,
    PolicyHallucination,
    PolicyWithoutAction,
    WhiteHouseHallucination,
    LowImpact,
    LowRelevanceRegulatory,
    SevereHallucination,
    IgnoredCategory,
    ExtractionFailed,
    ServiceError,
    SaveError,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::NoContent => "no_content",
            RejectReason::InsufficientContent => "insufficient_content",
            RejectReason::DuplicateContent => "duplicate_content",
            RejectReason::DuplicateDataContent => "duplicate_data_content",
            RejectReason::MissingCategory => "missing_category",
            RejectReason::HallucinatedSymbol => "hallucinated_symbol",
            RejectReason::HallucinatedLocation => "hallucinated_location",
            RejectReason::RegulatoryDiscussionNoAction => "regulatory_discussion_no_action",
            RejectReason::PolicyHallucination => "policy_hallucination",
            RejectReason::PolicyWithoutAction => "policy_without_action",
            RejectReason::WhiteHouseHallucination => "white_house_hallucination",
            RejectReason::LowImpact => "low_impact",
            RejectReason::LowRelevanceRegulatory => "low_relevance_regulatory",
            RejectReason::SevereHallucination => "severe_hallucination",
            RejectReason::IgnoredCategory => "ignored_category",
            RejectReason::ExtractionFailed => "extraction_failed",
            RejectReason::ServiceError => "service_error",
            RejectReason::SaveError => "save_error",
        }
    }
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Internal pipeline failure kinds. None of these cross the subsystem
/// boundary; the driver converts each into a skip outcome.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("rejected: {0}")]
    Rejected(RejectReason),

    #[error("extraction failed: {0}")]
    Extraction(String),

    #[error("service error: {0}")]
    Service(#[from] AiError),

    #[error("persistence failed: {0}")]
    Persistence(String),
}

impl PipelineError {
    /// The reason string the feed adapter observes for this failure.
    pub fn reject_reason(&self) -> RejectReason {
        match self {
            PipelineError::Rejected(reason) => *reason,
            PipelineError::Extraction(_) => RejectReason::ExtractionFailed,
            PipelineError::Service(_) => RejectReason::ServiceError,
            PipelineError::Persistence(_) => RejectReason::SaveError,
        }
    }
}
