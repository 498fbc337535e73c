pub mod client;
pub mod error;
pub mod normalize;
pub mod prompt;
pub mod session;

pub use client::{
    AnalysisClient, ClientConfig, GenerateTransport, HttpTransport, TransportResponse,
    ANALYSIS_TEMPERATURE, DEFAULT_API_BASE, DEFAULT_MODEL,
};
pub use error::AnalysisError;
pub use normalize::{normalize_upload, NormalizeOutcome, NormalizedPayload, MAX_EDGE};
pub use session::AnalysisSession;
