pub mod fallback;
pub mod pipeline;
pub mod prompts;

pub use pipeline::{
    AnalysisRequest, AnalysisResponse, AnalysisResult, AnalysisStatus, AnalyzerConfig,
    ImageAnalyzer, InputError,
};
