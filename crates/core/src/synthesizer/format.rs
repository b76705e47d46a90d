//! Pure text helpers: word-budget truncation, the deterministic fallback
//! formatter, and prompt construction.

use std::fmt::Write;

use crate::enhancement::EnhancementRequest;
use crate::gatherer::{DocumentItem, GatheredContext, HistoryItem};

const MAX_FALLBACK_DOCUMENTS: usize = 3;
const MAX_FALLBACK_ASSETS: usize = 3;
const MAX_PROMPT_ITEMS: usize = 5;

/// Appended when text is cut at the word budget.
pub const TRUNCATION_MARKER: &str = "...";

/// Cut `text` to at most `max_words` whitespace-separated words.
///
/// Returns the (trimmed) text and its word count. Formatting inside the kept
/// prefix is preserved; truncated text ends with [`TRUNCATION_MARKER`]
/// attached to the last kept word.
pub fn truncate_words(text: &str, max_words: usize) -> (String, usize) {
    let text = text.trim();
    if max_words == 0 {
        return (String::new(), 0);
    }

    let mut count = 0;
    let mut in_word = false;

    for (idx, ch) in text.char_indices() {
        if ch.is_whitespace() {
            in_word = false;
            continue;
        }
        if !in_word {
            in_word = true;
            count += 1;
            if count > max_words {
                let mut truncated = text[..idx].trim_end().to_string();
                truncated.push_str(TRUNCATION_MARKER);
                return (truncated, max_words);
            }
        }
    }

    (text.to_string(), count)
}

/// Build enhancement text from the gathered context without any external call.
///
/// Output depends only on `context`: the same context always yields the same
/// text, and the text is never empty.
pub fn fallback_text(context: &GatheredContext) -> String {
    let mut out = String::new();

    if let Some(item) = top_resolved_history(context) {
        let resolution = item.resolution.as_deref().unwrap_or_default().trim();
        let _ = writeln!(
            out,
            "Similar past resolution: {} (ticket {}: {})",
            resolution, item.ticket_id, item.subject
        );
    }

    let documents = top_documents(context);
    if !documents.is_empty() {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str("Relevant documents:\n");
        for doc in documents {
            match doc.url {
                Some(ref url) => {
                    let _ = writeln!(out, "- {} ({})", doc.title, url);
                }
                None => {
                    let _ = writeln!(out, "- {}", doc.title);
                }
            }
        }
    }

    let mut assets = context.assets();
    assets.sort_by(|a, b| a.asset_id.cmp(&b.asset_id));
    if !assets.is_empty() {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str("Related assets:\n");
        for asset in assets.into_iter().take(MAX_FALLBACK_ASSETS) {
            let details: Vec<&str> = [asset.kind.as_deref(), asset.status.as_deref()]
                .into_iter()
                .flatten()
                .collect();
            if details.is_empty() {
                let _ = writeln!(out, "- {}", asset.name);
            } else {
                let _ = writeln!(out, "- {} ({})", asset.name, details.join(", "));
            }
        }
    }

    if out.is_empty() {
        out.push_str("No additional context was found for this ticket.\n");
    }

    let unavailable = context.unavailable();
    if !unavailable.is_empty() {
        let _ = writeln!(out, "\nContext unavailable from: {}.", unavailable.join(", "));
    }

    out.trim_end().to_string()
}

/// Build the model prompt for one ticket.
pub fn build_prompt(
    request: &EnhancementRequest,
    context: &GatheredContext,
    max_words: usize,
) -> (String, String) {
    let system = format!(
        "You are a senior support engineer. Write a concise internal note that helps \
         the assignee resolve the ticket. Use only the context provided. Do not invent \
         facts. Reply in plain text, at most {} words.",
        max_words
    );

    let mut prompt = String::new();
    let _ = writeln!(prompt, "Ticket {}: {}", request.ticket_id, request.subject);
    if let Some(ref priority) = request.priority {
        let _ = writeln!(prompt, "Priority: {}", priority);
    }
    if !request.tags.is_empty() {
        let _ = writeln!(prompt, "Tags: {}", request.tags.join(", "));
    }
    if !request.description.trim().is_empty() {
        let _ = writeln!(prompt, "\n{}", request.description.trim());
    }

    let mut history = context.history();
    history.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
    if !history.is_empty() {
        prompt.push_str("\nSimilar resolved tickets:\n");
        for item in history.into_iter().take(MAX_PROMPT_ITEMS) {
            let _ = writeln!(
                prompt,
                "- [{}] {} -> {}",
                item.ticket_id,
                item.subject,
                item.resolution.as_deref().unwrap_or("unresolved")
            );
        }
    }

    let documents = context.documents();
    if !documents.is_empty() {
        prompt.push_str("\nKnowledge base:\n");
        for doc in documents.into_iter().take(MAX_PROMPT_ITEMS) {
            let _ = writeln!(
                prompt,
                "- {}: {}",
                doc.title,
                doc.snippet.as_deref().unwrap_or("")
            );
        }
    }

    let assets = context.assets();
    if !assets.is_empty() {
        prompt.push_str("\nRelated assets:\n");
        for asset in assets.into_iter().take(MAX_PROMPT_ITEMS) {
            let _ = writeln!(
                prompt,
                "- {} ({})",
                asset.name,
                asset.kind.as_deref().unwrap_or("asset")
            );
        }
    }

    (system, prompt)
}

fn top_resolved_history(context: &GatheredContext) -> Option<&HistoryItem> {
    context
        .history()
        .into_iter()
        .filter(|item| {
            item.resolution
                .as_deref()
                .is_some_and(|r| !r.trim().is_empty())
        })
        .max_by(|a, b| {
            a.similarity
                .total_cmp(&b.similarity)
                // Equal similarity: lowest ticket id wins.
                .then_with(|| b.ticket_id.cmp(&a.ticket_id))
        })
}

fn top_documents(context: &GatheredContext) -> Vec<&DocumentItem> {
    let mut documents = context.documents();
    documents.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.title.cmp(&b.title))
    });
    documents.truncate(MAX_FALLBACK_DOCUMENTS);
    documents
}
