// All LLM prompt templates for the Generation module.
// Reuses cross-cutting fragments from llm_client::prompts.

/// Attempt-1 prompt template.
/// Replace: {website_name}, {website_description}, {page_title}, {rules_list},
///          {total_usage}, {keyword_list}, {link_count}, {length_description},
///          {word_range}, {additional_prompt}, {usage_rules}, {link_rules},
///          {example_link}, {link_format_instruction}
pub const GENERATION_PROMPT_TEMPLATE: &str = r#"Write SEO on-page content for the website: {website_name}

Website details: {website_description}

Topic: {page_title}

KEYWORDS AND INTERNAL LINKS THAT MUST ALL BE USED:
{rules_list}

MANDATORY REQUIREMENTS:
Total keyword usage: exactly {total_usage} uses across the keywords {keyword_list}
Internal links: exactly {link_count} links

Content length: {length_description}
The article MUST really contain {word_range} words.

Additional instructions: {additional_prompt}

STRICT RULES:

1. Keyword usage (exact counts, no more and no fewer):
{usage_rules}

2. Internal links (every one is required):
{link_rules}

3. {link_format_instruction}
   Correct example: {example_link}

REQUIRED STRUCTURE:
1. Meta Title (50-60 characters) containing the main keyword
2. Meta Description (150-160 characters) containing the main keyword
3. H1 heading: "{page_title}"
4. Main body with H2/H3 subheadings, keywords distributed exactly as specified, and every internal link
5. FAQ section using the keywords in questions and answers
6. Summary using the keywords and internal links

BEFORE ANSWERING, CHECK:
- Every keyword appears exactly as many times as specified
- All {link_count} internal links are present
- The length is {word_range} words
- The Markdown is well formed

PROHIBITED:
- Using any keyword more or fewer times than specified, even by one
- Skipping any internal link
- Using absolute URLs or domains in links
- Writing shorter content than requested"#;

/// Correction prompt template for attempts 2..N.
/// Replace: {issues}, {rules_list}, {previous_content}, {targets}
pub const CORRECTION_PROMPT_TEMPLATE: &str = r#"Revise the content below so it meets the keyword and internal link requirements exactly.

PROBLEMS FOUND IN THE PREVIOUS VERSION:
{issues}

REQUIREMENTS:
{rules_list}

PREVIOUS CONTENT TO REVISE:
{previous_content}

HOW TO REVISE:
1. Adjust each keyword count to exactly the required number
2. Add or fix internal links so every one is present
3. Keep the length and quality of the content
4. Keep valid Markdown

TARGETS:
{targets}

Fix only the problems listed above. Do NOT change the main heading or the overall structure."#;
