//! Thread aggregation.
//!
//! Pure functions that fold a flat, chronologically unordered message
//! sequence into conversation threads. Nothing here mutates the repository;
//! the aggregator is run on the result of a repository read.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::{Message, SenderRole};

/// Thread grouping policy.
///
/// Subject-string grouping is fragile by construction ("Re: X" vs "X" split
/// into separate threads), so the key choice is a caller decision rather
/// than hard-coded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupingKey {
    /// One thread per application: the admin global inbox view.
    ByApplication,
    /// One thread per distinct subject within an application: the detail view.
    BySubject,
}

/// A derived, non-persisted conversation view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thread {
    pub application_id: i64,
    /// The grouping subject, or the latest message's subject when grouping
    /// by application.
    pub subject: String,
    /// Chronologically ascending by `(created_at, id)`.
    pub messages: Vec<Message>,
    /// `created_at` of the most recent message.
    pub latest_ts: i64,
    /// Unread messages authored by the viewer's counterpart. A viewer never
    /// counts their own unread sends.
    pub unread_count: usize,
    /// Any message still awaiting its requested action.
    pub has_action_required: bool,
}

impl Thread {
    /// The most recent message. Threads are never empty by construction.
    #[must_use]
    pub fn latest_message(&self) -> Option<&Message> {
        self.messages.last()
    }
}

/// Group `messages` into threads for `viewer`.
///
/// Threads are returned ordered by latest activity descending; ties keep the
/// groups' first-appearance order from the input. An empty input yields an
/// empty list. A group with a single message is still a valid thread.
#[must_use]
pub fn aggregate(messages: Vec<Message>, key: GroupingKey, viewer: SenderRole) -> Vec<Thread> {
    // Group preserving first-seen order so the descending sort below has a
    // deterministic tie order.
    let mut groups: Vec<Vec<Message>> = Vec::new();
    let mut index: HashMap<(i64, Option<String>), usize> = HashMap::new();

    for message in messages {
        let group_key = match key {
            GroupingKey::ByApplication => (message.application_id, None),
            GroupingKey::BySubject => (message.application_id, Some(message.subject.clone())),
        };
        match index.get(&group_key) {
            Some(&i) => groups[i].push(message),
            None => {
                index.insert(group_key, groups.len());
                groups.push(vec![message]);
            }
        }
    }

    let counterpart = viewer.counterpart();
    let mut threads: Vec<Thread> = groups
        .into_iter()
        .map(|mut group| {
            group.sort_by_key(|m| (m.created_at, m.id));
            let unread_count = group
                .iter()
                .filter(|m| !m.is_read && m.sender_role == counterpart)
                .count();
            let has_action_required = group.iter().any(Message::has_pending_action);
            // Safe: every group was created with at least one message.
            let latest = group.last();
            let latest_ts = latest.map_or(0, |m| m.created_at);
            let subject = match key {
                GroupingKey::BySubject => {
                    group.first().map(|m| m.subject.clone()).unwrap_or_default()
                }
                GroupingKey::ByApplication => {
                    latest.map(|m| m.subject.clone()).unwrap_or_default()
                }
            };
            let application_id = group.first().map_or(0, |m| m.application_id);
            Thread {
                application_id,
                subject,
                messages: group,
                latest_ts,
                unread_count,
                has_action_required,
            }
        })
        .collect();

    // Most recently active conversation first; stable sort keeps input order
    // for equal timestamps.
    threads.sort_by(|a, b| b.latest_ts.cmp(&a.latest_ts));
    threads
}
