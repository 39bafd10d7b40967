//! Unit tests for SupportHandler routing, rule management and correlation.

use super::fixtures::*;
use crate::{Route, SingleSlotTracker};
use dbot_core::{Handler, HandlerResponse};
use std::sync::Arc;
use storage::{KeywordGroup, NewInquiry};

/// **Test: Keyword hit is replied in place and not logged.**
///
/// **Setup:** Rule `{"help"} -> "What do you need help with?"`.
/// **Action:** Alice sends "need some help" in the lobby.
/// **Expected:** `Reply(canned)`; the reply went to the lobby; message log empty.
#[tokio::test]
async fn test_exact_match_reply() {
    let h = Harness::new().await;
    h.keywords
        .add_rule(&KeywordGroup::parse("help"), "What do you need help with?")
        .await
        .unwrap();

    let response = h
        .handler
        .handle(&message(alice(), lobby(), "need some help"))
        .await
        .unwrap();

    assert_eq!(
        response,
        HandlerResponse::Reply("What do you need help with?".to_string())
    );
    assert_eq!(
        h.bot.to_chat(lobby().id),
        vec!["What do you need help with?".to_string()]
    );
    assert_eq!(h.log_count().await, 0);
}

/// **Test: Similarity hit is replied and escalation does not run.**
///
/// **Setup:** Answered record "where is the office" -> "123 Main St"; score 0.7.
/// **Action:** Alice sends "office location?".
/// **Expected:** Reply "123 Main St"; no forward; still one log entry.
#[tokio::test]
async fn test_similarity_match_reply() {
    let h = Harness::new().await;
    let e = small(0.5);
    h.messages
        .log_inquiry(
            NewInquiry::new("where is the office", "bob", "Lobby")
                .with_embedding(Some(&e))
                .with_response("123 Main St"),
        )
        .await
        .unwrap();
    h.embeddings.embeds("office location?", small(0.9));
    h.embeddings.scores(0.5, 0.7);

    let response = h
        .handler
        .handle(&message(alice(), lobby(), "office location?"))
        .await
        .unwrap();

    assert_eq!(response, HandlerResponse::Reply("123 Main St".to_string()));
    assert!(h.bot.to_room(ESCALATION_ROOM).is_empty());
    assert_eq!(h.log_count().await, 1);
}

/// **Test: Escalation then administrator reply, end to end.**
///
/// **Setup:** Empty store.
/// **Action:** Alice asks "why is the service down?"; the admin sends
/// "!respond it's a planned outage" in the response room.
/// **Expected:** Record created unanswered and pending; escalation room gets
/// "Alice Smith: why is the service down?"; after the reply the record holds the response, the
/// lobby receives the annotated relay and nothing is pending.
#[tokio::test]
async fn test_escalation_and_correlation() {
    let h = Harness::new().await;

    let response = h
        .handler
        .handle(&message(alice(), lobby(), "why is the service down?"))
        .await
        .unwrap();
    assert_eq!(response, HandlerResponse::Stop);

    let records = h.messages.list_recent(10, false).await.unwrap();
    assert_eq!(records.len(), 1);
    let id = records[0].id;
    assert_eq!(records[0].response, None);
    assert_eq!(h.tracker.pending_ids(), vec![id]);
    assert_eq!(
        h.bot.to_room(ESCALATION_ROOM),
        vec!["Alice Smith: why is the service down?".to_string()]
    );

    let response = h
        .handler
        .handle(&h.admin_reply("!respond it's a planned outage"))
        .await
        .unwrap();
    assert_eq!(response, HandlerResponse::Stop);

    let record = h.messages.get(id).await.unwrap().unwrap();
    assert_eq!(record.response.as_deref(), Some("it's a planned outage"));
    assert_eq!(
        h.bot.to_chat(lobby().id),
        vec!["Responding to 'why is the service down?': it's a planned outage".to_string()]
    );
    assert!(h.tracker.pending_ids().is_empty());
}

/// **Test: A second reply with nothing pending changes nothing.**
#[tokio::test]
async fn test_second_reply_is_noop() {
    let h = Harness::new().await;
    h.handler
        .handle(&message(alice(), lobby(), "why is the service down?"))
        .await
        .unwrap();
    h.handler
        .handle(&h.admin_reply("!respond it's a planned outage"))
        .await
        .unwrap();
    let sent_before = h.bot.sent().len();

    h.handler
        .handle(&h.admin_reply("!respond actually it is fixed"))
        .await
        .unwrap();

    let records = h.messages.list_recent(10, false).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].response.as_deref(), Some("it's a planned outage"));
    assert_eq!(h.bot.sent().len(), sent_before);
}

/// **Test: Single-slot mode orphans the first of two inquiries.**
///
/// **Setup:** `SingleSlotTracker`; two unanswered inquiries before any reply.
/// **Action:** One uncited respond command.
/// **Expected:** Only the second inquiry gets the response; the first stays null forever.
#[tokio::test]
async fn test_single_slot_race_orphans_first() {
    let h = Harness::with(Arc::new(SingleSlotTracker::new()), false).await;
    h.handler
        .handle(&message(alice(), lobby(), "first question?"))
        .await
        .unwrap();
    h.handler
        .handle(&message(alice(), room(-3003, "Cafe"), "second question?"))
        .await
        .unwrap();

    h.handler
        .handle(&h.admin_reply("!respond answer"))
        .await
        .unwrap();

    let mut records = h.messages.list_recent(10, false).await.unwrap();
    records.reverse();
    assert_eq!(records[0].text, "first question?");
    assert_eq!(records[0].response, None);
    assert_eq!(records[1].text, "second question?");
    assert_eq!(records[1].response.as_deref(), Some("answer"));
    assert!(h.tracker.pending_ids().is_empty());

    assert!(h.bot.to_chat(lobby().id).is_empty());
    assert_eq!(h.bot.to_chat(-3003).len(), 1);
}

/// **Test: Queue mode answers both inquiries in order.**
#[tokio::test]
async fn test_room_queue_answers_in_order() {
    let h = Harness::new().await;
    h.handler
        .handle(&message(alice(), lobby(), "first question?"))
        .await
        .unwrap();
    h.handler
        .handle(&message(alice(), room(-3003, "Cafe"), "second question?"))
        .await
        .unwrap();

    h.handler.handle(&h.admin_reply("!respond one")).await.unwrap();
    h.handler.handle(&h.admin_reply("!respond two")).await.unwrap();

    let mut records = h.messages.list_recent(10, false).await.unwrap();
    records.reverse();
    assert_eq!(records[0].response.as_deref(), Some("one"));
    assert_eq!(records[1].response.as_deref(), Some("two"));
    assert_eq!(
        h.bot.to_chat(lobby().id),
        vec!["Responding to 'first question?': one".to_string()]
    );
    assert_eq!(
        h.bot.to_chat(-3003),
        vec!["Responding to 'second question?': two".to_string()]
    );
}

/// **Test: A cited reply resolves exactly the cited inquiry.**
#[tokio::test]
async fn test_cited_reply() {
    let h = Harness::new().await;
    h.handler
        .handle(&message(alice(), lobby(), "first question?"))
        .await
        .unwrap();
    h.handler
        .handle(&message(alice(), lobby(), "second question?"))
        .await
        .unwrap();
    let ids = h.tracker.pending_ids();

    h.handler
        .handle(&h.admin_reply(&format!("!respond #{} second answer", ids[1])))
        .await
        .unwrap();

    assert_eq!(h.tracker.pending_ids(), vec![ids[0]]);
    let record = h.messages.get(ids[1]).await.unwrap().unwrap();
    assert_eq!(record.response.as_deref(), Some("second answer"));
}

/// **Test: Respond commands from non-admins or outside the response room are ignored.**
///
/// **Expected:** `Ignore`; nothing logged, forwarded or resolved.
#[tokio::test]
async fn test_unauthorized_respond_ignored() {
    let h = Harness::new().await;
    h.handler
        .handle(&message(alice(), lobby(), "why?"))
        .await
        .unwrap();
    let sent_before = h.bot.sent().len();

    let by_alice = message(alice(), room(-2002, RESPONSE_ROOM), "!respond fake answer?");
    let admin_elsewhere = message(admin(), lobby(), "!respond wrong room");
    for msg in [by_alice, admin_elsewhere] {
        assert_eq!(
            h.handler.handle(&msg).await.unwrap(),
            HandlerResponse::Ignore
        );
    }

    assert_eq!(h.log_count().await, 1);
    assert_eq!(h.tracker.pending_ids().len(), 1);
    assert_eq!(h.bot.sent().len(), sent_before);
}

/// **Test: Bot-issued respond outside the response room records without relaying.**
#[tokio::test]
async fn test_self_respond_records_only() {
    let h = Harness::new().await;
    h.handler
        .handle(&message(alice(), lobby(), "why?"))
        .await
        .unwrap();
    let id = h.tracker.pending_ids()[0];
    let sent_before = h.bot.sent().len();

    h.handler
        .handle(&self_message(lobby(), "!respond noted"))
        .await
        .unwrap();

    assert_eq!(
        h.messages.get(id).await.unwrap().unwrap().response.as_deref(),
        Some("noted")
    );
    assert!(h.tracker.pending_ids().is_empty());
    assert_eq!(h.bot.sent().len(), sent_before);
}

/// **Test: Admin and bot manage keyword rules through chat commands.**
#[tokio::test]
async fn test_rule_management_commands() {
    let h = Harness::new().await;

    h.handler
        .handle(&message(admin(), lobby(), "!add wifi The network is guest"))
        .await
        .unwrap();
    let rules = h.keywords.list_rules().await.unwrap();
    assert_eq!(rules.len(), 1);
    let id = rules[0].id;

    h.handler
        .handle(&self_message(lobby(), &format!("!editKeyword {id} password")))
        .await
        .unwrap();
    h.handler
        .handle(&self_message(
            lobby(),
            &format!("!editResponse {id} Network guest, password hunter2"),
        ))
        .await
        .unwrap();
    let rule = h.keywords.get_rule(id).await.unwrap().unwrap();
    assert_eq!(rule.group.to_column(), "wifi,password");
    assert_eq!(rule.response, "Network guest, password hunter2");

    h.handler
        .handle(&self_message(lobby(), &format!("!remove {id} wifi")))
        .await
        .unwrap();
    assert_eq!(
        h.keywords.get_rule(id).await.unwrap().unwrap().group.to_column(),
        "password"
    );

    h.handler
        .handle(&self_message(lobby(), &format!("!remove {id}")))
        .await
        .unwrap();
    assert!(h.keywords.list_rules().await.unwrap().is_empty());
}

/// **Test: Malformed management commands leave the store unchanged.**
#[tokio::test]
async fn test_malformed_command_rejected() {
    let h = Harness::new().await;

    for text in ["!add wifi", "!editResponse abc x", "!remove"] {
        let msg = message(admin(), lobby(), text);
        assert!(matches!(h.handler.classify(&msg), Route::Malformed(_)));
        assert_eq!(h.handler.handle(&msg).await.unwrap(), HandlerResponse::Stop);
    }
    assert!(h.keywords.list_rules().await.unwrap().is_empty());
}

/// **Test: Management words from ordinary users are plain inquiries.**
#[tokio::test]
async fn test_non_admin_command_is_inquiry() {
    let h = Harness::new().await;
    let msg = message(alice(), lobby(), "!add free stuff");

    assert_eq!(h.handler.classify(&msg), Route::Inquiry);
    h.handler.handle(&msg).await.unwrap();
    assert!(h.keywords.list_rules().await.unwrap().is_empty());
}

/// **Test: The bot never treats its own chatter as an inquiry.**
#[tokio::test]
async fn test_own_messages_ignored() {
    let h = Harness::new().await;
    let msg = self_message(lobby(), "why is this here?");

    assert_eq!(h.handler.handle(&msg).await.unwrap(), HandlerResponse::Ignore);
    assert_eq!(h.log_count().await, 0);
    assert!(h.bot.sent().is_empty());
}

/// **Test: Logging room keeps answered and dropped inquiries.**
///
/// **Setup:** Rule `{"menu"}`.
/// **Action:** In the logging room: "menu please" (answered), "thanks all" (dropped).
/// **Expected:** Two records: first with the canned response, second unanswered and pending
/// and forwarded.
#[tokio::test]
async fn test_logging_room_record_keeping() {
    let h = Harness::new().await;
    h.keywords
        .add_rule(&KeywordGroup::parse("menu"), "Pasta today")
        .await
        .unwrap();
    let front_desk = room(-4004, LOGGING_ROOM);

    h.handler
        .handle(&message(alice(), front_desk.clone(), "menu please"))
        .await
        .unwrap();
    h.handler
        .handle(&message(alice(), front_desk, "thanks all"))
        .await
        .unwrap();

    let mut records = h.messages.list_recent(10, false).await.unwrap();
    records.reverse();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].response.as_deref(), Some("Pasta today"));
    assert_eq!(records[0].room_topic, LOGGING_ROOM);
    assert_eq!(records[1].response, None);
    assert_eq!(h.tracker.pending_ids(), vec![records[1].id]);
    assert_eq!(
        h.bot.to_room(ESCALATION_ROOM),
        vec!["Alice Smith: thanks all".to_string()]
    );
}

/// **Test: An escalated inquiry in the logging room is logged once.**
#[tokio::test]
async fn test_logging_room_escalation_logged_once() {
    let h = Harness::new().await;

    h.handler
        .handle(&message(alice(), room(-4004, LOGGING_ROOM), "is parking free?"))
        .await
        .unwrap();

    assert_eq!(h.log_count().await, 1);
}

/// **Test: Escalation acknowledgement in the requester's language.**
#[tokio::test]
async fn test_escalation_ack() {
    let h = Harness::with(Arc::new(crate::RoomQueueTracker::new()), true).await;

    h.handler
        .handle(&message(alice(), lobby(), "why is the service down?"))
        .await
        .unwrap();
    h.handler
        .handle(&message(alice(), lobby(), "服务为什么停了？"))
        .await
        .unwrap();

    assert_eq!(
        h.bot.to_chat(lobby().id),
        vec![
            "Sorry Alice Smith, I can't answer that yet; I've forwarded it to an administrator."
                .to_string(),
            "抱歉 Alice Smith，我回答不了这个问题，已转发给行政人员。".to_string(),
        ]
    );
}

fn bob() -> dbot_core::User {
    user(101, "bob", "Bob", None)
}

fn cafe() -> dbot_core::Chat {
    room(-1003, "Cafe")
}

/// **Test: Overlapping administrator replies resolve different inquiries.**
///
/// **Setup:** Queue tracker; Alice asks in the lobby, then Bob asks in the cafe.
/// **Action:** Two uncited `!respond` commands are handled concurrently.
/// **Expected:** Each record holds exactly one of the answers, nothing is pending, and each chat
/// receives exactly one relay.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_replies_answer_distinct_inquiries() {
    let h = Harness::new().await;
    h.handler
        .handle(&message(alice(), lobby(), "first question?"))
        .await
        .unwrap();
    h.handler
        .handle(&message(bob(), cafe(), "second question?"))
        .await
        .unwrap();
    assert_eq!(h.tracker.pending_ids().len(), 2);

    let one = h.admin_reply("!respond answer one");
    let two = h.admin_reply("!respond answer two");
    let (a, b) = tokio::join!(h.handler.handle(&one), h.handler.handle(&two));
    a.unwrap();
    b.unwrap();

    let records = h.messages.list_recent(10, false).await.unwrap();
    let mut answers: Vec<String> = records
        .iter()
        .map(|r| r.response.clone().expect("every inquiry answered"))
        .collect();
    answers.sort();
    assert_eq!(answers, vec!["answer one".to_string(), "answer two".to_string()]);
    assert!(h.tracker.pending_ids().is_empty());
    assert_eq!(h.bot.to_chat(lobby().id).len(), 1);
    assert_eq!(h.bot.to_chat(cafe().id).len(), 1);
    assert!(h.bot.to_chat(lobby().id)[0].starts_with("Responding to 'first question?'"));
    assert!(h.bot.to_chat(cafe().id)[0].starts_with("Responding to 'second question?'"));
}

/// **Test: Concurrent escalations each get exactly one response.**
///
/// **Setup:** Queue tracker, empty store.
/// **Action:** Four inquiries are handled concurrently, then four `!respond` commands concurrently.
/// **Expected:** Four forwards; every record answered exactly once with a distinct reply; no
/// inquiry left pending; one relay per inquiry.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_escalations_each_answered_once() {
    let h = Harness::new().await;
    let inquiries = [
        message(alice(), lobby(), "is the lift working?"),
        message(bob(), cafe(), "is the cafe open?"),
        message(alice(), lobby(), "where is parking?"),
        message(bob(), cafe(), "any vegan options?"),
    ];
    let (r1, r2, r3, r4) = tokio::join!(
        h.handler.handle(&inquiries[0]),
        h.handler.handle(&inquiries[1]),
        h.handler.handle(&inquiries[2]),
        h.handler.handle(&inquiries[3]),
    );
    for r in [r1, r2, r3, r4] {
        assert_eq!(r.unwrap(), HandlerResponse::Stop);
    }
    assert_eq!(h.bot.to_room(ESCALATION_ROOM).len(), 4);
    assert_eq!(h.tracker.pending_ids().len(), 4);

    let replies: Vec<_> = (1..=4)
        .map(|n| h.admin_reply(&format!("!respond reply {n}")))
        .collect();
    let (a, b, c, d) = tokio::join!(
        h.handler.handle(&replies[0]),
        h.handler.handle(&replies[1]),
        h.handler.handle(&replies[2]),
        h.handler.handle(&replies[3]),
    );
    for r in [a, b, c, d] {
        r.unwrap();
    }

    let records = h.messages.list_recent(10, false).await.unwrap();
    assert_eq!(records.len(), 4);
    let mut answers: Vec<String> = records
        .iter()
        .map(|r| r.response.clone().expect("every inquiry answered"))
        .collect();
    answers.sort();
    answers.dedup();
    assert_eq!(answers.len(), 4);
    assert!(h.tracker.pending_ids().is_empty());
    assert_eq!(h.bot.to_chat(lobby().id).len(), 2);
    assert_eq!(h.bot.to_chat(cafe().id).len(), 2);
}
