use std::sync::Arc;

use atelier_core::config::AtelierConfig;
use atelier_core::hooks::{
    Hook, HookContext, HookHandler, WebhookConfig, WebhookHandler, DEFAULT_PENDING_VIEWS,
    MESSAGES_VIEW_PATH,
};
use atelier_core::models::{Identity, Thread, ThreadType};
use atelier_core::repo::MemoryInboxStore;
use atelier_core::services::MessagingService;
use chrono::Utc;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod webhook_tests {
    use super::*;

    #[tokio::test]
    async fn test_webhook_posts_event_payload() {
        let server = MockServer::start().await;
        let thread = Thread::new("Pedicure", ThreadType::Inquiry, Utc::now());

        Mock::given(method("POST"))
            .and(path("/hooks"))
            .and(header("x-studio-key", "secret"))
            .and(body_partial_json(serde_json::json!({
                "hook": "thread_created",
                "thread_id": thread.id,
            })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let mut config = WebhookConfig::new(format!("{}/hooks", server.uri()));
        config
            .headers
            .insert("x-studio-key".to_string(), "secret".to_string());
        let handler = WebhookHandler::new(config);

        let result = handler
            .handle(&HookContext::thread_created(thread))
            .await
            .unwrap();
        assert!(result.is_continue());
    }

    #[tokio::test]
    async fn test_webhook_server_error_does_not_fail_handler() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let handler = WebhookHandler::new(WebhookConfig::new(server.uri()));
        let ctx = HookContext::thread_read(uuid::Uuid::new_v4(), uuid::Uuid::new_v4(), 1);

        assert!(handler.handle(&ctx).await.unwrap().is_continue());
    }

    #[tokio::test]
    async fn test_webhook_respects_event_selection() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(body_partial_json(serde_json::json!({ "hook": "message_appended" })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let config = WebhookConfig {
            events: vec![Hook::MessageAppended],
            ..WebhookConfig::new(server.uri())
        };
        let handler = WebhookHandler::new(config);

        let thread = Thread::new("Wax", ThreadType::General, Utc::now());
        let message =
            atelier_core::models::Message::new(thread.id, uuid::Uuid::new_v4(), "hi", Utc::now());

        assert!(handler
            .handle(&HookContext::thread_updated(thread))
            .await
            .unwrap()
            .is_skip());
        assert!(handler
            .handle(&HookContext::message_appended(message))
            .await
            .unwrap()
            .is_continue());
    }
}

mod configured_service_tests {
    use super::*;

    #[tokio::test]
    async fn test_service_from_config_forwards_events() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/events"))
            .respond_with(ResponseTemplate::new(200))
            .expect(2)
            .mount(&server)
            .await;

        let mut config = AtelierConfig::default();
        config.hooks.webhook_url = format!("{}/events", server.uri());

        let store = MemoryInboxStore::new();
        let service = MessagingService::from_config(Arc::new(store), &config)
            .await
            .unwrap();
        assert_eq!(service.hooks().handler_count().await, 8);

        let owner = Identity::owner();
        let client = Identity::client();
        let thread = service
            .create_thread(Some(&owner), "Webhooks", vec![client], "hi")
            .await
            .unwrap();
        service
            .set_starred(Some(&owner), thread.id, true)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_unreachable_webhook_never_fails_mutation() {
        let mut config = AtelierConfig::default();
        config.hooks.webhook_url = "http://127.0.0.1:9/unreachable".to_string();
        config.hooks.timeout_ms = 200;

        let service = MessagingService::from_config(Arc::new(MemoryInboxStore::new()), &config)
            .await
            .unwrap();

        let owner = Identity::owner();
        let thread = service
            .create_thread(Some(&owner), "Offline", vec![Identity::client()], "hi")
            .await
            .unwrap();
        let message = service
            .append(Some(&owner), thread.id, "still works")
            .await
            .unwrap();
        assert_eq!(message.thread_id, thread.id);
    }

    #[tokio::test]
    async fn test_disabled_hooks_skip_handlers() {
        let mut config = AtelierConfig::default();
        config.hooks.enabled = false;

        let service = MessagingService::from_config(Arc::new(MemoryInboxStore::new()), &config)
            .await
            .unwrap();
        service
            .create_thread(
                Some(&Identity::owner()),
                "Quiet",
                vec![Identity::client()],
                "hi",
            )
            .await
            .unwrap();

        assert!(service.hooks().get_recent_executions(10).await.is_empty());
    }

    #[tokio::test]
    async fn test_audit_log_records_each_mutation() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("audit.log");

        let mut config = AtelierConfig::default();
        config.hooks.audit_log_path = Some(log_path.clone());

        let service = MessagingService::from_config(Arc::new(MemoryInboxStore::new()), &config)
            .await
            .unwrap();
        assert_eq!(service.hooks().handler_count().await, 8);

        let owner = Identity::owner();
        let client = Identity::client();
        let thread = service
            .create_thread(Some(&owner), "Audited", vec![client], "hello")
            .await
            .unwrap();
        service
            .append(Some(&owner), thread.id, "reply")
            .await
            .unwrap();

        let contents = tokio::fs::read_to_string(&log_path).await.unwrap();
        let events: Vec<String> = contents
            .lines()
            .map(|line| {
                let entry: serde_json::Value = serde_json::from_str(line).unwrap();
                entry["event"].as_str().unwrap().to_string()
            })
            .collect();

        assert_eq!(
            events,
            vec!["thread_created", "message_appended", "thread_updated"]
        );
    }

    #[tokio::test]
    async fn test_configured_views_are_drained_and_bounded() {
        let service = MessagingService::from_config(
            Arc::new(MemoryInboxStore::new()),
            &AtelierConfig::default(),
        )
        .await
        .unwrap();
        let views = service.views().unwrap().clone();
        assert_eq!(views.capacity(), DEFAULT_PENDING_VIEWS);

        let owner = Identity::owner();
        let thread = service
            .create_thread(Some(&owner), "Drained", vec![Identity::client()], "hi")
            .await
            .unwrap();
        assert_eq!(
            service.take_invalidated().await,
            vec![
                MESSAGES_VIEW_PATH.to_string(),
                format!("{}/{}", MESSAGES_VIEW_PATH, thread.id),
            ]
        );
        assert_eq!(views.pending_len().await, 0);

        for i in 0..DEFAULT_PENDING_VIEWS + 50 {
            service
                .create_thread(
                    Some(&owner),
                    &format!("Thread {}", i),
                    vec![Identity::client()],
                    "hi",
                )
                .await
                .unwrap();
        }
        assert_eq!(views.pending_len().await, DEFAULT_PENDING_VIEWS + 1);
    }
}
