// SEO content generation core.
// Implements: rule extraction, validation, issue reporting, prompt building and the retry loop.
// All LLM calls go through llm_client; delivery happens after this module is done.

pub mod handlers;
pub mod issues;
pub mod orchestrator;
pub mod prompt_builder;
pub mod prompts;
pub mod rules;
pub mod validator;
