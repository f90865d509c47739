//! Pure history reduction
//!
//! `fold` is the only way history changes shape: given the current entries
//! and one update, it returns the next history. No IO, no clocks beyond the
//! timestamps already on the messages, no knowledge of streams.

#[cfg(test)]
mod proptests;

use crate::types::{Delta, Message, Role};

/// Builds the assistant update message for one stream delta.
pub fn message_for_delta(delta: Delta) -> Message {
    match delta {
        Delta::Text { content, model } => {
            let mut message = Message::new(Role::Assistant, content);
            message.model = model;
            message.fill_parts();
            message
        }
        Delta::Sources { sources, model } => {
            let mut message = Message::new(Role::Assistant, "");
            message.model = model;
            message.search_sources = Some(sources);
            message.used_web_search = Some(true);
            message.fill_parts();
            message
        }
    }
}

fn has_sources(message: &Message) -> bool {
    message
        .search_sources
        .as_ref()
        .is_some_and(|sources| !sources.is_empty())
}

/// Folds one update into the history, returning the next history.
///
/// Consecutive trailing assistant entries merge by content concatenation,
/// with two carve-outs: a sources-bearing update never merges into an entry
/// that already has visible text (source bundles get their own display
/// entry), and a merge keeps the existing entry's metadata, taking the
/// update's model/sources/search flag only where the entry has none.
pub fn fold(history: &[Message], update: Message) -> Vec<Message> {
    let mut next: Vec<Message> = history.to_vec();

    let merges = match next.last() {
        Some(last) if last.role == Role::Assistant && update.role == Role::Assistant => {
            !(has_sources(&update) && !last.content.is_empty())
        }
        _ => false,
    };

    if let (true, Some(last)) = (merges, next.last_mut()) {
        last.content.push_str(&update.content);
        if last.model.is_none() {
            last.model = update.model;
        }
        if !has_sources(last) {
            last.search_sources = update.search_sources;
        }
        if last.used_web_search.is_none() {
            last.used_web_search = update.used_web_search;
        }
        last.fill_parts();
    } else {
        next.push(update);
    }

    next
}
