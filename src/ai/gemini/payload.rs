use super::types::{Content, RequestPayload, ROLE_MODEL, ROLE_USER};
use crate::history::ConversationHistory;

/// Placed between a non-empty modifier and the current query.
pub const MODIFIER_SEPARATOR: &str = "\n\n";

/// Assemble the `contents` of a `generateContent` request.
///
/// History turns become alternating user/model entries, oldest first, followed
/// by one user entry holding the modifier (if any) and the query. Turns with a
/// blank side are skipped. Generation config is left unset; callers attach it
/// with [`RequestPayload::with_generation_config`].
pub fn build(query: &str, history: &ConversationHistory, modifier: &str) -> RequestPayload {
    let mut contents = Vec::with_capacity(history.len() * 2 + 1);

    for (index, turn) in history.iter().enumerate() {
        if !turn.is_well_formed() {
            tracing::warn!("Skipping malformed history turn {}: blank query or response", index);
            continue;
        }
        contents.push(Content::text(ROLE_USER, turn.query.as_str()));
        contents.push(Content::text(ROLE_MODEL, turn.response.as_str()));
    }

    let final_text = if modifier.is_empty() {
        query.to_string()
    } else {
        format!("{}{}{}", modifier, MODIFIER_SEPARATOR, query)
    };
    contents.push(Content::text(ROLE_USER, final_text));

    RequestPayload {
        contents,
        generation_config: None,
    }
}
