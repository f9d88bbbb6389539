mod common;

use common::*;
use std::sync::Arc;
use tg_dualpost::db::PostStore;
use tg_dualpost::error::{BotError, LengthScope};
use tg_dualpost::gateway::{Controls, Decision, UNBOUND_POST_ID};
use tg_dualpost::model::{ChatRef, Content, Lang, MediaKind, MessageHandle};
use tg_dualpost::presenter::{CANCELLED_NOTICE, EDIT_PROMPT, PUBLISHED_NOTICE};
use tg_dualpost::session::{DraftState, Outcome};

fn hello_dictionary() -> DictionaryTranslator {
    DictionaryTranslator::new(&[("Hello", "Hi"), ("world", "earth")])
}

fn preview_handle(message_id: i32) -> MessageHandle {
    MessageHandle {
        chat: operator_chat(),
        message_id,
    }
}

#[tokio::test]
async fn text_draft_is_translated_previewed_and_published() {
    let gateway = RecordingGateway::new();
    let translator = hello_dictionary();
    let store = setup_store().await;
    let service = build_service(&gateway, &translator, store.clone());

    let outcome = service
        .submit(OPERATOR, operator_chat(), Content::Text("<b>Hello</b> world".into()))
        .await
        .unwrap();
    let preview = match outcome {
        Outcome::Previewed(handle) => handle,
        other => panic!("unexpected outcome {:?}", other),
    };
    assert_eq!(preview, preview_handle(100));
    assert_eq!(
        gateway.calls().await,
        vec![Call::Send {
            chat: operator_chat(),
            content: Content::Text("<b>Hi</b> earth".into()),
            controls: Controls::Decision,
        }]
    );
    assert_eq!(service.draft_state(OPERATOR).await, DraftState::AwaitingDecision);

    let report = match service.decide(OPERATOR, Decision::Publish).await.unwrap() {
        Outcome::Published(report) => report,
        other => panic!("unexpected outcome {:?}", other),
    };
    assert!(report.controls_bound);
    let post = &report.post;
    assert_eq!(post.current_lang, Lang::Source);
    assert_eq!(post.source, Content::Text("<b>Hello</b> world".into()));
    assert_eq!(post.target, Content::Text("<b>Hi</b> earth".into()));

    let channel_message = MessageHandle {
        chat: channel(),
        message_id: 101,
    };
    assert_eq!(post.channel_message, channel_message);

    let calls = gateway.calls().await;
    assert_eq!(calls.len(), 4);
    // The channel sees the source language first.
    assert_eq!(
        calls[1],
        Call::Send {
            chat: channel(),
            content: Content::Text("<b>Hello</b> world".into()),
            controls: Controls::Toggle {
                post_id: UNBOUND_POST_ID,
                show: Lang::Target,
            },
        }
    );
    assert_eq!(
        calls[2],
        Call::EditControls {
            handle: channel_message,
            controls: Controls::Toggle {
                post_id: post.id,
                show: Lang::Target,
            },
        }
    );
    assert_eq!(
        calls[3],
        Call::EditText {
            handle: preview,
            text: PUBLISHED_NOTICE.into(),
            controls: Controls::None,
        }
    );

    let stored = store.get(post.id).await.unwrap().unwrap();
    assert_eq!(&stored, post);
    assert_eq!(service.draft_state(OPERATOR).await, DraftState::Idle);
}

#[tokio::test]
async fn oversized_caption_fails_before_translation() {
    let gateway = RecordingGateway::new();
    let translator = hello_dictionary();
    let service = build_service(&gateway, &translator, setup_store().await);

    let photo = Content::Photo {
        file_id: "PHOTO".into(),
        caption: "x".repeat(1025),
    };
    let err = service
        .submit(OPERATOR, operator_chat(), photo)
        .await
        .unwrap_err();
    match err {
        BotError::ContentTooLong {
            scope,
            kind,
            len,
            limit,
            ..
        } => {
            assert_eq!(scope, LengthScope::Source);
            assert_eq!(kind, MediaKind::Photo);
            assert_eq!(len, 1025);
            assert_eq!(limit, 1024);
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert_eq!(translator.calls(), 0);
    assert!(gateway.calls().await.is_empty());
    assert_eq!(service.draft_state(OPERATOR).await, DraftState::Idle);
}

#[tokio::test]
async fn untranslatable_leaf_keeps_source_text() {
    let gateway = RecordingGateway::new();
    let translator = DictionaryTranslator::new(&[("Hello", "Hi")]);
    let service = build_service(&gateway, &translator, setup_store().await);

    service
        .submit(OPERATOR, operator_chat(), Content::Text("<b>Hello</b> world".into()))
        .await
        .unwrap();
    assert_eq!(translator.calls(), 2);
    assert_eq!(
        gateway.last_call().await,
        Some(Call::Send {
            chat: operator_chat(),
            content: Content::Text("<b>Hi</b> world".into()),
            controls: Controls::Decision,
        })
    );
}

#[tokio::test]
async fn translation_over_limit_keeps_session_idle() {
    let gateway = RecordingGateway::new();
    let long = "y".repeat(5000);
    let translator = DictionaryTranslator::new(&[("short", long.as_str())]);
    let service = build_service(&gateway, &translator, setup_store().await);

    let err = service
        .submit(OPERATOR, operator_chat(), Content::Text("short".into()))
        .await
        .unwrap_err();
    match &err {
        BotError::ContentTooLong { scope, snippet, .. } => {
            assert_eq!(*scope, LengthScope::Translated);
            assert_eq!(snippet.chars().count(), 1500);
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert!(err.operator_message().contains("<code>yyy"));
    assert!(gateway.calls().await.is_empty());
    assert_eq!(service.draft_state(OPERATOR).await, DraftState::Idle);
}

#[tokio::test]
async fn edit_replaces_target_with_manual_submission() {
    let gateway = RecordingGateway::new();
    let translator = DictionaryTranslator::new(&[("Привет", "Hello")]);
    let service = build_service(&gateway, &translator, setup_store().await);

    let source = Content::Photo {
        file_id: "F1".into(),
        caption: "Привет".into(),
    };
    service
        .submit(OPERATOR, operator_chat(), source.clone())
        .await
        .unwrap();

    let outcome = service.decide(OPERATOR, Decision::Edit).await.unwrap();
    assert!(matches!(outcome, Outcome::AwaitingManualTarget));
    assert_eq!(
        gateway.last_call().await,
        Some(Call::EditCaption {
            handle: preview_handle(100),
            caption: EDIT_PROMPT.into(),
            controls: Controls::None,
        })
    );

    // Decisions wait for the replacement.
    assert!(matches!(
        service.decide(OPERATOR, Decision::Publish).await,
        Err(BotError::ManualTargetPending)
    ));

    let err = service
        .submit(OPERATOR, operator_chat(), Content::Text("Hi".into()))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        BotError::ContentKindMismatch {
            expected: MediaKind::Photo,
            got: MediaKind::Text,
        }
    ));
    assert_eq!(
        service.draft_state(OPERATOR).await,
        DraftState::AwaitingManualTarget
    );

    let manual = Content::Photo {
        file_id: "F2".into(),
        caption: "Hi <i>there</i>".into(),
    };
    let outcome = service
        .submit(OPERATOR, operator_chat(), manual.clone())
        .await
        .unwrap();
    assert!(matches!(outcome, Outcome::Previewed(_)));
    assert_eq!(
        gateway.last_call().await,
        Some(Call::Send {
            chat: operator_chat(),
            content: manual.clone(),
            controls: Controls::Decision,
        })
    );
    // Only the automatic translation went through the translator.
    assert_eq!(translator.calls(), 1);

    let report = match service.decide(OPERATOR, Decision::Publish).await.unwrap() {
        Outcome::Published(report) => report,
        other => panic!("unexpected outcome {:?}", other),
    };
    assert_eq!(report.post.source, source);
    assert_eq!(report.post.target, manual);
}

#[tokio::test]
async fn cancel_discards_draft() {
    let gateway = RecordingGateway::new();
    let translator = hello_dictionary();
    let store = setup_store().await;
    let service = build_service(&gateway, &translator, store.clone());

    service
        .submit(OPERATOR, operator_chat(), Content::Text("Hello".into()))
        .await
        .unwrap();
    let outcome = service.decide(OPERATOR, Decision::Cancel).await.unwrap();
    assert!(matches!(outcome, Outcome::Cancelled));
    assert_eq!(
        gateway.last_call().await,
        Some(Call::EditText {
            handle: preview_handle(100),
            text: CANCELLED_NOTICE.into(),
            controls: Controls::None,
        })
    );
    assert_eq!(service.draft_state(OPERATOR).await, DraftState::Idle);
    assert!(matches!(
        service.decide(OPERATOR, Decision::Publish).await,
        Err(BotError::NoActiveDraft)
    ));
    assert!(store.get(1).await.unwrap().is_none());
}

#[tokio::test]
async fn second_submission_waits_for_decision() {
    let gateway = RecordingGateway::new();
    let translator = hello_dictionary();
    let service = build_service(&gateway, &translator, setup_store().await);

    service
        .submit(OPERATOR, operator_chat(), Content::Text("<b>Hello</b> world".into()))
        .await
        .unwrap();
    let err = service
        .submit(OPERATOR, operator_chat(), Content::Text("world".into()))
        .await
        .unwrap_err();
    assert!(matches!(err, BotError::DecisionPending));
    assert_eq!(translator.calls(), 2);
    assert_eq!(gateway.calls().await.len(), 1);
    assert_eq!(service.draft_state(OPERATOR).await, DraftState::AwaitingDecision);
}

#[tokio::test]
async fn decision_without_draft_is_rejected() {
    let gateway = RecordingGateway::new();
    let service = build_service(&gateway, &hello_dictionary(), setup_store().await);

    for decision in [Decision::Publish, Decision::Edit, Decision::Cancel] {
        assert!(matches!(
            service.decide(OPERATOR, decision).await,
            Err(BotError::NoActiveDraft)
        ));
    }
    assert!(gateway.calls().await.is_empty());
}

#[tokio::test]
async fn drafts_are_kept_per_operator() {
    let gateway = RecordingGateway::new();
    let service = build_service(&gateway, &hello_dictionary(), setup_store().await);

    service
        .submit(OPERATOR, operator_chat(), Content::Text("Hello".into()))
        .await
        .unwrap();
    service
        .submit(8, ChatRef::Id(8), Content::Text("world".into()))
        .await
        .unwrap();
    service.decide(8, Decision::Cancel).await.unwrap();

    assert_eq!(service.draft_state(8).await, DraftState::Idle);
    assert_eq!(service.draft_state(OPERATOR).await, DraftState::AwaitingDecision);
}

#[tokio::test]
async fn rejected_channel_send_discards_draft() {
    // Preview succeeds, channel send fails.
    let gateway = RecordingGateway::with_script(vec![Ok(()), Err("chat not found".into())]);
    let store = setup_store().await;
    let service = build_service(&gateway, &hello_dictionary(), store.clone());

    service
        .submit(OPERATOR, operator_chat(), Content::Text("Hello".into()))
        .await
        .unwrap();
    let err = service.decide(OPERATOR, Decision::Publish).await.unwrap_err();
    assert!(matches!(err, BotError::PublishRejected { .. }));
    assert!(!err.is_fatal());

    assert_eq!(gateway.calls().await.len(), 2);
    assert!(store.get(1).await.unwrap().is_none());
    assert_eq!(service.draft_state(OPERATOR).await, DraftState::Idle);
}

#[tokio::test]
async fn rejected_channel_send_reports_draft_text() {
    let gateway = RecordingGateway::with_script(vec![Ok(()), Err("chat not found".into())]);
    let service = build_service(&gateway, &hello_dictionary(), setup_store().await);

    service
        .submit(OPERATOR, operator_chat(), Content::Text("<b>Hello</b> world".into()))
        .await
        .unwrap();
    let err = service.decide(OPERATOR, Decision::Publish).await.unwrap_err();
    match &err {
        BotError::PublishRejected {
            source_snippet,
            target_snippet,
            ..
        } => {
            assert_eq!(source_snippet, "<b>Hello</b> world");
            assert_eq!(target_snippet, "<b>Hi</b> earth");
        }
        other => panic!("unexpected error {:?}", other),
    }
    let message = err.operator_message();
    assert!(message.contains("chat not found"));
    assert!(message.contains("<code>&lt;b&gt;Hello&lt;/b&gt; world</code>"));
    assert!(message.contains("<code>&lt;b&gt;Hi&lt;/b&gt; earth</code>"));
    assert_eq!(service.draft_state(OPERATOR).await, DraftState::Idle);
}

#[tokio::test]
async fn unrecorded_publish_is_fatal() {
    let gateway = RecordingGateway::new();
    let service = build_service(&gateway, &hello_dictionary(), Arc::new(FailingStore));

    service
        .submit(OPERATOR, operator_chat(), Content::Text("Hello".into()))
        .await
        .unwrap();
    let err = service.decide(OPERATOR, Decision::Publish).await.unwrap_err();
    assert!(err.is_fatal());
    match &err {
        BotError::PublishedButUnpersisted { message, .. } => {
            assert_eq!(message.chat, channel());
            assert_eq!(message.message_id, 101);
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert!(err.operator_message().contains("message 101"));
    // Nothing after the channel send.
    assert_eq!(gateway.calls().await.len(), 2);
    assert_eq!(service.draft_state(OPERATOR).await, DraftState::Idle);
}

#[tokio::test]
async fn unbound_controls_still_publish() {
    // Preview, channel send, then the control rebind fails.
    let gateway =
        RecordingGateway::with_script(vec![Ok(()), Ok(()), Err("message not modified".into())]);
    let store = setup_store().await;
    let service = build_service(&gateway, &hello_dictionary(), store.clone());

    service
        .submit(OPERATOR, operator_chat(), Content::Text("Hello".into()))
        .await
        .unwrap();
    let report = match service.decide(OPERATOR, Decision::Publish).await.unwrap() {
        Outcome::Published(report) => report,
        other => panic!("unexpected outcome {:?}", other),
    };
    assert!(!report.controls_bound);
    assert!(store.get(report.post.id).await.unwrap().is_some());
}

#[tokio::test]
async fn start_sends_greeting_and_keeps_draft() {
    let gateway = RecordingGateway::new();
    let service = build_service(&gateway, &hello_dictionary(), setup_store().await);

    service
        .submit(OPERATOR, operator_chat(), Content::Text("Hello".into()))
        .await
        .unwrap();
    service.start(&operator_chat()).await.unwrap();

    match gateway.last_call().await {
        Some(Call::Send {
            content: Content::Text(text),
            controls: Controls::None,
            ..
        }) => assert!(text.contains("<b>ru</b>") && text.contains("<b>en</b>")),
        other => panic!("unexpected call {:?}", other),
    }
    assert_eq!(service.draft_state(OPERATOR).await, DraftState::AwaitingDecision);
}

#[tokio::test]
async fn edit_prompt_falls_back_to_new_message() {
    // Preview, failed in-place edit, then the fallback notice.
    let gateway = RecordingGateway::with_script(vec![Ok(()), Err("message can't be edited".into())]);
    let service = build_service(&gateway, &hello_dictionary(), setup_store().await);

    service
        .submit(OPERATOR, operator_chat(), Content::Text("Hello".into()))
        .await
        .unwrap();
    let outcome = service.decide(OPERATOR, Decision::Edit).await.unwrap();
    assert!(matches!(outcome, Outcome::AwaitingManualTarget));
    assert_eq!(
        gateway.last_call().await,
        Some(Call::Send {
            chat: operator_chat(),
            content: Content::Text(EDIT_PROMPT.into()),
            controls: Controls::None,
        })
    );
}

#[tokio::test]
async fn edit_survives_failed_prompt_delivery() {
    let gateway = RecordingGateway::with_script(vec![
        Ok(()),
        Err("message can't be edited".into()),
        Err("bot was blocked by the user".into()),
    ]);
    let service = build_service(&gateway, &hello_dictionary(), setup_store().await);

    service
        .submit(OPERATOR, operator_chat(), Content::Text("Hello".into()))
        .await
        .unwrap();
    let outcome = service.decide(OPERATOR, Decision::Edit).await.unwrap();
    assert!(matches!(outcome, Outcome::AwaitingManualTarget));
    assert_eq!(gateway.calls().await.len(), 3);
    assert_eq!(
        service.draft_state(OPERATOR).await,
        DraftState::AwaitingManualTarget
    );
}
