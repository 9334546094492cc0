// Shared prompt constants for the text-generation collaborator.
// Feature-specific templates live next to the feature (see matching/prompts.rs).

/// System prompt used for every `TextGenerator::generate` call.
pub const CONCISE_TEXT_SYSTEM: &str = "You are a precise, concise assistant. \
    Follow the output format requested in the user message exactly. \
    Do NOT include preambles, apologies, or markdown unless asked.";
