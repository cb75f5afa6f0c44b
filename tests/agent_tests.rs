//! Integration tests for the agent loop
//!
//! The hosted model is replaced by a scripted one so the full flow of
//! prompt → tool calls → store → final answer runs offline.

mod common;

use std::sync::Arc;

use serde_json::json;

use common::{agent_with, call, text_turn, tool_turn, ScriptedModel};
use todo_agent::agent::{ActionRecord, AgentError, AgentRequest, HistoryMessage, SessionContext};
use todo_agent::llm::{ChatError, Role};
use todo_agent::store::{NewTodo, TodoStore};
use todo_agent::tools::{DELETE_NOT_FOUND, UPDATE_NOT_FOUND};

#[tokio::test]
async fn test_add_then_list() {
    let model = Arc::new(ScriptedModel::new(vec![
        tool_turn(vec![call("c1", "add_todo", json!({"title": "Buy milk"}))]),
        tool_turn(vec![call("c2", "fetch_todos", json!({}))]),
        text_turn("Added 'Buy milk'."),
    ]));
    let (agent, store) = agent_with(model.clone(), 10);

    let result = agent
        .run(&AgentRequest::new("add buy milk", "u1"))
        .await
        .unwrap();

    assert_eq!(result.final_response, "Added 'Buy milk'.");
    assert_eq!(result.iterations, 3);
    assert_eq!(result.invocations.len(), 2);
    assert!(result.invocations.iter().all(|i| i.ok));
    assert!(!result.trace_id.is_empty());

    let todos = store.list("u1").await.unwrap();
    assert_eq!(todos.len(), 1);
    assert_eq!(todos[0].title, "Buy milk");
    assert!(!todos[0].completed);

    let results = model.tool_results();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["ok"]["title"], "Buy milk");
    assert_eq!(results[1]["ok"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_first_turn_carries_prompt_and_context() {
    let model = Arc::new(ScriptedModel::new(vec![text_turn("You have no todos.")]));
    let (agent, _store) = agent_with(model.clone(), 10);

    let session = SessionContext::new(
        vec![
            HistoryMessage::user("hi"),
            HistoryMessage::assistant("hello"),
        ],
        vec![ActionRecord {
            kind: "CREATE".into(),
            details: "Buy milk".into(),
            timestamp: "2026-01-01T00:00:00Z".into(),
        }],
    );
    let request = AgentRequest::new("show my todos", "u1").with_session(session);
    agent.run(&request).await.unwrap();

    let requests = model.requests();
    assert_eq!(requests.len(), 1);
    let first = &requests[0];
    assert_eq!(first[0].role, Role::System);
    assert!(first[0].content.as_deref().unwrap().contains("u1"));

    let input = first[1].content.as_deref().unwrap();
    assert!(input.starts_with("[CONTEXT: user_id='u1']"));
    assert!(input.contains("Conversation History:"));
    assert!(input.contains("Recent Actions in Session:"));
    assert!(input.ends_with("New User Message: show my todos"));
}

#[tokio::test]
async fn test_users_are_isolated() {
    let model = Arc::new(ScriptedModel::new(vec![
        tool_turn(vec![call("c1", "fetch_todos", json!({"user_id": "u2"}))]),
        text_turn("You have no todos."),
    ]));
    let (agent, store) = agent_with(model.clone(), 10);
    let secret = store.create("u2", NewTodo::new("Secret")).await.unwrap();

    agent
        .run(&AgentRequest::new("show my todos", "u1"))
        .await
        .unwrap();

    let results = model.tool_results();
    assert_eq!(results[0], json!({"ok": []}));

    // u1 cannot touch u2's row by id either
    let model = Arc::new(ScriptedModel::new(vec![
        tool_turn(vec![
            call("c1", "update_todo", json!({"todo_id": secret.id, "completed": true})),
            call("c2", "delete_todo", json!({"todo_id": secret.id})),
        ]),
        text_turn("Done."),
    ]));
    let agent = todo_agent::AgentController::new(
        model.clone(),
        todo_agent::ToolBox::new(store.clone()),
        Default::default(),
    );
    let result = agent
        .run(&AgentRequest::new("finish and remove Secret", "u1"))
        .await
        .unwrap();

    assert!(result.invocations.iter().all(|i| !i.ok));
    let results = model.tool_results();
    assert_eq!(results[0], json!({"error": UPDATE_NOT_FOUND}));
    assert_eq!(results[1], json!({"error": DELETE_NOT_FOUND}));

    let theirs = store.list("u2").await.unwrap();
    assert_eq!(theirs.len(), 1);
    assert!(!theirs[0].completed);
}

#[tokio::test]
async fn test_update_missing_id_does_not_create() {
    let model = Arc::new(ScriptedModel::new(vec![
        tool_turn(vec![call(
            "c1",
            "update_todo",
            json!({"todo_id": 999, "title": "Renamed"}),
        )]),
        text_turn("I couldn't find that todo."),
    ]));
    let (agent, store) = agent_with(model.clone(), 10);

    let result = agent
        .run(&AgentRequest::new("rename todo 999", "u1"))
        .await
        .unwrap();

    assert!(!result.invocations[0].ok);
    assert_eq!(model.tool_results()[0], json!({"error": UPDATE_NOT_FOUND}));
    assert!(store.list("u1").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_update_without_fields_returns_row_unchanged() {
    let model = Arc::new(ScriptedModel::new(vec![]));
    let (_, store) = agent_with(model, 10);
    let todo = store.create("u1", NewTodo::new("Walk dog")).await.unwrap();

    let model = Arc::new(ScriptedModel::new(vec![
        tool_turn(vec![call("c1", "update_todo", json!({"todo_id": todo.id}))]),
        text_turn("Nothing to change."),
    ]));
    let agent = todo_agent::AgentController::new(
        model.clone(),
        todo_agent::ToolBox::new(store.clone()),
        Default::default(),
    );
    agent
        .run(&AgentRequest::new("update walk dog", "u1"))
        .await
        .unwrap();

    let result = &model.tool_results()[0]["ok"];
    assert_eq!(result["title"], "Walk dog");
    assert_eq!(result["completed"], false);

    let stored = store.list("u1").await.unwrap();
    assert_eq!(stored[0].updated_at, todo.updated_at);
}

#[tokio::test]
async fn test_complete_by_title_then_delete() {
    let model = Arc::new(ScriptedModel::new(vec![
        tool_turn(vec![call("c1", "add_todo", json!({"title": "Buy milk"}))]),
        tool_turn(vec![call(
            "c2",
            "update_todo",
            json!({"current_title": "Buy milk", "completed": true}),
        )]),
        tool_turn(vec![call("c3", "delete_todo", json!({"title": "buy MILK"}))]),
        tool_turn(vec![call("c4", "fetch_todos", json!({}))]),
        text_turn("Done."),
    ]));
    let (agent, store) = agent_with(model.clone(), 10);

    let result = agent
        .run(&AgentRequest::new("add, finish and remove buy milk", "u1"))
        .await
        .unwrap();

    assert_eq!(result.invocations.len(), 4);
    let results = model.tool_results();
    assert_eq!(results[1]["ok"]["completed"], true);
    assert_eq!(results[2], json!({"ok": {"message": "Todo deleted successfully"}}));
    assert_eq!(results[3], json!({"ok": []}));
    assert!(store.list("u1").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_and_delete_all_differ_on_empty() {
    let model = Arc::new(ScriptedModel::new(vec![
        tool_turn(vec![
            call("c1", "delete_todo", json!({"title": "nothing here"})),
            call("c2", "delete_all_todos", json!({})),
        ]),
        text_turn("Nothing to delete."),
    ]));
    let (agent, _store) = agent_with(model.clone(), 10);

    let result = agent
        .run(&AgentRequest::new("delete everything", "u1"))
        .await
        .unwrap();

    assert!(!result.invocations[0].ok);
    assert!(result.invocations[1].ok);
    let results = model.tool_results();
    assert_eq!(results[0], json!({"error": DELETE_NOT_FOUND}));
    assert_eq!(
        results[1],
        json!({"ok": {"message": "All todos deleted successfully"}})
    );
}

#[tokio::test]
async fn test_bad_tool_calls_are_reported_to_model() {
    let model = Arc::new(ScriptedModel::new(vec![
        tool_turn(vec![
            call("c1", "rename_everything", json!({})),
            call("c2", "add_todo", json!({"title": "   "})),
        ]),
        text_turn("Sorry, that didn't work."),
    ]));
    let (agent, store) = agent_with(model.clone(), 10);

    let result = agent
        .run(&AgentRequest::new("do something odd", "u1"))
        .await
        .unwrap();

    assert_eq!(result.final_response, "Sorry, that didn't work.");
    let results = model.tool_results();
    assert!(results[0]["error"].as_str().unwrap().contains("rename_everything"));
    assert!(results[1]["error"].is_string());
    assert!(store.list("u1").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_tool_results_answer_their_calls() {
    let model = Arc::new(ScriptedModel::new(vec![
        tool_turn(vec![
            call("first", "fetch_todos", json!({})),
            call("second", "fetch_todos", json!({})),
        ]),
        text_turn("ok"),
    ]));
    let (agent, _store) = agent_with(model.clone(), 10);
    agent.run(&AgentRequest::new("list", "u1")).await.unwrap();

    let second_turn = &model.requests()[1];
    let ids: Vec<_> = second_turn
        .iter()
        .filter(|m| m.role == Role::Tool)
        .map(|m| m.tool_call_id.clone().unwrap())
        .collect();
    assert_eq!(ids, vec!["first", "second"]);
    assert_eq!(second_turn[2].role, Role::Assistant);
}

#[tokio::test]
async fn test_max_iterations() {
    let model = Arc::new(ScriptedModel::looping(tool_turn(vec![call(
        "c1",
        "fetch_todos",
        json!({}),
    )])));
    let (agent, _store) = agent_with(model.clone(), 3);

    let err = agent
        .run(&AgentRequest::new("loop forever", "u1"))
        .await
        .unwrap_err();

    assert!(matches!(err, AgentError::MaxIterationsReached(3)));
    assert_eq!(model.requests().len(), 3);
}

#[tokio::test]
async fn test_model_failure_aborts_run() {
    let model = Arc::new(ScriptedModel::new(vec![]));
    let (agent, _store) = agent_with(model, 10);

    let err = agent
        .run(&AgentRequest::new("hello", "u1"))
        .await
        .unwrap_err();

    assert!(matches!(err, AgentError::Chat(ChatError::EmptyResponse)));
}

#[tokio::test]
async fn test_update_to_blank_title_is_rejected() {
    let model = Arc::new(ScriptedModel::new(vec![]));
    let (_, store) = agent_with(model, 10);
    let todo = store.create("u1", NewTodo::new("Buy milk")).await.unwrap();

    let model = Arc::new(ScriptedModel::new(vec![
        tool_turn(vec![call(
            "c1",
            "update_todo",
            json!({"todo_id": todo.id, "title": "   "}),
        )]),
        text_turn("A todo needs a title."),
    ]));
    let agent = todo_agent::AgentController::new(
        model.clone(),
        todo_agent::ToolBox::new(store.clone()),
        Default::default(),
    );
    let result = agent
        .run(&AgentRequest::new("clear the title of buy milk", "u1"))
        .await
        .unwrap();

    assert!(!result.invocations[0].ok);
    assert!(model.tool_results()[0]["error"].is_string());
    assert_eq!(store.list("u1").await.unwrap()[0].title, "Buy milk");
}
