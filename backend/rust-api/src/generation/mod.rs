//! Course generation building blocks: prompt text, the upstream client and
//! the JSON extraction/repair pipeline.

pub mod client;
pub mod extract;
pub mod prompt;

pub use client::{classify, GeminiClient, GenerationError, TextGenerator, UnconfiguredGenerator};
pub use extract::{extract_json, ExtractError, RepairPass};
pub use prompt::build_course_prompt;
