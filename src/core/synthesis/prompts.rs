//! Generator Prompts
//!
//! Constrained prompts for the two synthesis paths. The prompts steer the
//! model toward the validator's grammar; nothing downstream relies on the
//! model obeying them.

use super::fuzzy::ReferenceVocabulary;
use super::generator::GenerationKind;
use super::schema::schema_description;

/// Genres listed when the catalog has none yet.
const FALLBACK_GENRES: &[&str] = &[
    "Fiction", "Non-Fiction", "Mystery", "Romance", "Sci-Fi", "Fantasy", "Thriller",
    "Biography", "Historical", "Science", "Self-Help", "Horror", "Adventure", "Poetry",
];

/// Cap on vocabulary entries quoted into a prompt.
const MAX_PROMPT_GENRES: usize = 60;

fn quoted(query: &str) -> String {
    serde_json::to_string(query.trim()).unwrap_or_else(|_| format!("\"{}\"", query.trim()))
}

fn genre_list(vocabulary: &ReferenceVocabulary) -> String {
    if vocabulary.genres().is_empty() {
        FALLBACK_GENRES.join(", ")
    } else {
        vocabulary
            .genres()
            .iter()
            .take(MAX_PROMPT_GENRES)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Standing instructions sent on the provider's system channel.
pub fn system_prompt(kind: GenerationKind) -> &'static str {
    match kind {
        GenerationKind::SqlFragment => {
            "You translate library search requests into SQL WHERE conditions over a single \
             books table. Reply with the condition only."
        }
        GenerationKind::FilterSet => {
            "You extract structured search filters from library search requests. \
             Reply with a single JSON object only."
        }
    }
}

/// Prompt asking for a bare WHERE-clause fragment.
pub fn sql_fragment_prompt(query: &str) -> String {
    format!(
        r#"Convert a library search request into the condition of a SQL WHERE clause.

REQUEST: {query}

{schema}
RULES:
- Output only the boolean condition. Do not write WHERE, SELECT, comments or semicolons.
- Use only the columns listed above.
- Match text with ILIKE and '%' wildcards, e.g. author ILIKE '%king%'.
- Ignore filler words such as book, books, novel, show, find, about, looking, for.
- Use the user's own keywords; do not invent genre names.
- For a topic keyword, search title, description, genre and author:
  (title ILIKE '%kw%' OR description ILIKE '%kw%' OR genre ILIKE '%kw%' OR author ILIKE '%kw%')
- Combine separate topics with OR; combine a topic with an author or year with AND.
- Years: EXTRACT(YEAR FROM published_date) = 2020. Months: EXTRACT(MONTH FROM published_date) <= 6.
- A two-digit year like "25" means 2025.

EXAMPLES:
"thriller by king" -> (title ILIKE '%thriller%' OR description ILIKE '%thriller%' OR genre ILIKE '%thriller%' OR author ILIKE '%thriller%') AND (author ILIKE '%king%')
"fiction from 2020" -> (genre ILIKE '%fiction%') AND EXTRACT(YEAR FROM published_date) = 2020
"published in the second half of 2025" -> EXTRACT(YEAR FROM published_date) = 2025 AND EXTRACT(MONTH FROM published_date) > 6

Return only the condition for: {query}"#,
        query = quoted(query),
        schema = schema_description(),
    )
}

/// Prompt asking for a JSON filter object.
pub fn filter_set_prompt(query: &str, vocabulary: &ReferenceVocabulary) -> String {
    format!(
        r#"Extract structured book search filters from a library search request.

REQUEST: {query}

Return a JSON object with exactly these keys, each a scalar or null:
- "author": author name if one is mentioned
- "genre": one of these catalog genres if one applies: {genres}
- "published_year": four-digit year as an integer if one is mentioned
- "search_query": 2-5 core subject keywords for title/description search, without filler such as "find me" or "I want"

Return only the JSON object, no Markdown and no explanation.

EXAMPLES:
"books by J.K. Rowling" -> {{"author": "J.K. Rowling", "genre": null, "published_year": null, "search_query": null}}
"science fiction from 2020" -> {{"author": null, "genre": "Sci-Fi", "published_year": 2020, "search_query": null}}
"mystery novels about a detective" -> {{"author": null, "genre": "Mystery", "published_year": null, "search_query": "detective"}}
"#,
        query = quoted(query),
        genres = genre_list(vocabulary),
    )
}
