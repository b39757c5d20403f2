//! Integration tests for the SQLite conversation log.

mod common;

use common::test_pool;
use sidekick::memory::{ConversationMemory, SqliteMemory};
use tempfile::TempDir;

#[tokio::test]
async fn get_context_returns_bounded_tail_in_order() {
    let tmp = TempDir::new().unwrap();
    let memory = SqliteMemory::new(test_pool(&tmp).await);

    for i in 1..=5 {
        memory
            .add_message("s1", "user", &format!("message {}", i))
            .await
            .unwrap();
    }

    let context = memory.get_context("s1", 3).await.unwrap();
    let lines: Vec<&str> = context.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], "user: message 3");
    assert_eq!(lines[2], "user: message 5");
}

#[tokio::test]
async fn get_context_is_empty_for_unknown_session() {
    let tmp = TempDir::new().unwrap();
    let memory = SqliteMemory::new(test_pool(&tmp).await);

    let context = memory.get_context("nobody", 10).await.unwrap();
    assert!(context.is_empty());
}

#[tokio::test]
async fn search_scopes_to_a_session_when_asked() {
    let tmp = TempDir::new().unwrap();
    let memory = SqliteMemory::new(test_pool(&tmp).await);

    memory
        .add_message("s1", "user", "remember the budget meeting")
        .await
        .unwrap();
    memory
        .add_message("s2", "user", "budget numbers look fine")
        .await
        .unwrap();
    memory
        .add_message("s1", "assistant", "noted")
        .await
        .unwrap();

    let all = memory.search("budget", None).await.unwrap();
    assert_eq!(all.len(), 2);

    let scoped = memory.search("budget", Some("s1")).await.unwrap();
    assert_eq!(scoped.len(), 1);
    assert_eq!(scoped[0].session_id, "s1");
    assert_eq!(scoped[0].role, "user");
}

#[tokio::test]
async fn cleanup_removes_only_the_target_session() {
    let tmp = TempDir::new().unwrap();
    let memory = SqliteMemory::new(test_pool(&tmp).await);

    memory.add_message("s1", "user", "one").await.unwrap();
    memory.add_message("s1", "assistant", "two").await.unwrap();
    memory.add_message("s2", "user", "three").await.unwrap();

    let removed = memory.cleanup("s1").await.unwrap();
    assert_eq!(removed, 2);
    assert!(memory.get_context("s1", 10).await.unwrap().is_empty());
    assert!(!memory.get_context("s2", 10).await.unwrap().is_empty());

    // Second cleanup is a no-op.
    assert_eq!(memory.cleanup("s1").await.unwrap(), 0);
}
