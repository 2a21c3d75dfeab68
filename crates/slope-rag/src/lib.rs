//! slope-rag
//!
//! Grounded question answering over slope-stability documents: tool
//! enrichment, hybrid retrieval and reranking, prompt construction,
//! generation, lenient answer parsing and citation validation. Also hosts the
//! ingest service and the retrieval evaluation harness.

pub mod answer;
pub mod bootstrap;
pub mod citations;
pub mod eval;
pub mod generator;
pub mod ingest;
pub mod pipeline;
pub mod prompt;
pub mod tools;

pub use answer::{parse_answer, AnswerPayload, Citation, ParseOutcome};
pub use bootstrap::App;
pub use generator::{build_generator, Generator, ScriptedGenerator};
pub use ingest::{IngestReport, IngestService};
pub use pipeline::{Evidence, PipelineConfig, QueryResponse, RagPipeline};
