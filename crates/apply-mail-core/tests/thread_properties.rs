//! Property-based tests for thread aggregation.
//!
//! Checks the structural guarantees of `aggregate` over arbitrary message
//! logs: completeness (no message duplicated or dropped), ordering inside
//! and across threads, and counterpart-only unread counting.

use proptest::prelude::*;

use apply_mail_core::{aggregate, GroupingKey, Message, MessageType, SenderRole};

fn arb_role() -> impl Strategy<Value = SenderRole> {
    prop_oneof![Just(SenderRole::Admin), Just(SenderRole::Student)]
}

fn arb_subject() -> impl Strategy<Value = String> {
    proptest::sample::select(vec!["Visa", "Payment", "Re: Visa", "Interview"])
        .prop_map(str::to_string)
}

fn arb_message_log() -> impl Strategy<Value = Vec<Message>> {
    proptest::collection::vec(
        (
            1..=3i64,
            arb_role(),
            arb_subject(),
            0..=10_000i64,
            any::<bool>(),
        ),
        0..40,
    )
    .prop_map(|fields| {
        fields
            .into_iter()
            .enumerate()
            .map(|(i, (application_id, role, subject, created_at, is_read))| {
                let id = i64::try_from(i).expect("small index") + 1;
                Message {
                    id,
                    application_id,
                    sender_role: role,
                    sender_id: format!("sender-{id}"),
                    message_type: MessageType::General,
                    subject,
                    body: format!("body of {id}"),
                    created_at,
                    is_read,
                    read_at: is_read.then_some(created_at + 1),
                    action: None,
                    parent_message_id: None,
                    email_sent: false,
                    email_sent_at: None,
                    attachments: vec![],
                }
            })
            .collect()
    })
}

proptest! {
    /// The union of all threads' messages equals the input set, with no
    /// duplicates and no omissions.
    #[test]
    fn thread_completeness(messages in arb_message_log(), viewer in arb_role()) {
        for key in [GroupingKey::ByApplication, GroupingKey::BySubject] {
            let threads = aggregate(messages.clone(), key, viewer);

            let mut input_ids: Vec<i64> = messages.iter().map(|m| m.id).collect();
            let mut output_ids: Vec<i64> = threads
                .iter()
                .flat_map(|t| t.messages.iter().map(|m| m.id))
                .collect();
            input_ids.sort_unstable();
            output_ids.sort_unstable();
            prop_assert_eq!(input_ids, output_ids);
        }
    }

    /// Messages inside each thread ascend by (created_at, id); threads
    /// descend by latest activity.
    #[test]
    fn thread_ordering(messages in arb_message_log(), viewer in arb_role()) {
        for key in [GroupingKey::ByApplication, GroupingKey::BySubject] {
            let threads = aggregate(messages.clone(), key, viewer);

            for thread in &threads {
                for pair in thread.messages.windows(2) {
                    prop_assert!(
                        (pair[0].created_at, pair[0].id) < (pair[1].created_at, pair[1].id)
                    );
                }
                prop_assert_eq!(
                    thread.latest_ts,
                    thread.messages.last().map_or(0, |m| m.created_at)
                );
            }
            for pair in threads.windows(2) {
                prop_assert!(pair[0].latest_ts >= pair[1].latest_ts);
            }
        }
    }

    /// A viewer's unread count never includes their own sends, and the two
    /// viewers' counts sum to the total unread messages of the thread.
    #[test]
    fn unread_counts_partition(messages in arb_message_log()) {
        let admin = aggregate(messages.clone(), GroupingKey::BySubject, SenderRole::Admin);
        let student = aggregate(messages, GroupingKey::BySubject, SenderRole::Student);

        for (a, s) in admin.iter().zip(student.iter()) {
            let total_unread = a.messages.iter().filter(|m| !m.is_read).count();
            prop_assert_eq!(a.unread_count + s.unread_count, total_unread);

            let own_unread = a
                .messages
                .iter()
                .filter(|m| !m.is_read && m.sender_role == SenderRole::Admin)
                .count();
            prop_assert_eq!(s.unread_count, own_unread);
        }
    }

    /// Grouping by application never yields more threads than grouping by
    /// subject, and each is bounded by the distinct key count.
    #[test]
    fn grouping_cardinality(messages in arb_message_log(), viewer in arb_role()) {
        let by_app = aggregate(messages.clone(), GroupingKey::ByApplication, viewer);
        let by_subject = aggregate(messages.clone(), GroupingKey::BySubject, viewer);
        prop_assert!(by_app.len() <= by_subject.len() || by_subject.is_empty());

        let distinct_apps: std::collections::HashSet<i64> =
            messages.iter().map(|m| m.application_id).collect();
        prop_assert_eq!(by_app.len(), distinct_apps.len());
    }
}
