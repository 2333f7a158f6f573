// Shared prompt constants used by every OpenRouter call.

/// System prompt for all SEO generation and correction calls.
pub const SEO_WRITER_SYSTEM: &str = "You are an expert SEO copywriter who produces \
    high-quality, search-optimised articles. You follow keyword frequency and \
    internal link requirements 100% strictly, with no exceptions.";

/// Instruction on link syntax, embedded in generation prompts.
pub const LINK_FORMAT_INSTRUCTION: &str = "Internal link format: use [text](path) only. \
    Paths are site-relative and start with /. Never include a domain or full URL.";

/// Prompt used to check that an API key and model respond at all.
pub const CONNECTION_TEST_PROMPT: &str =
    "Connection test. Reply with exactly: \"Connection successful\"";
