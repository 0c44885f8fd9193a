//! Session loop behaviour with scripted input, model, and surface.

mod common;

use pretty_assertions::assert_eq;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use common::{
    failing_identity_tool, handle, slow_tool, text_step, tool_step, RecordingSurface,
    ScriptedInput, ScriptedProvider, Step, SurfaceEvent,
};
use voicegit::agent_loop::{AgentLoop, OutputChunk, StreamVariant};
use voicegit::backend::{BackendSelector, ConfiguredBackend};
use voicegit::config::{GatewayConfig, UserProfile};
use voicegit::error::VoiceGitError;
use voicegit::session::{Session, SessionExit, Turn, TurnRole};
use voicegit::tools::ToolRegistry;
use voicegit::types::TextStreamDelta;

#[tokio::test]
async fn who_am_i_with_failing_identity_tool() {
    let apology = "I'm sorry, I couldn't retrieve your GitHub identity. Please check your token.";
    let provider = ScriptedProvider::new(vec![
        tool_step("call_1", "get_me", json!({})),
        text_step(&[apology]),
    ]);
    let backend = handle(
        provider,
        StreamVariant::SegmentStreaming,
        ToolRegistry::new(vec![failing_identity_tool()]),
    );
    let mut session = Session::new(backend, None);
    let mut input = ScriptedInput::new(&["who am I?", "quit"]);
    let mut surface = RecordingSurface::default();

    let exit = session
        .run(&mut input, &mut surface, &CancellationToken::new())
        .await
        .expect("session");

    assert_eq!(exit, SessionExit::Quit);
    assert_eq!(
        session.history(),
        &[Turn::user("who am I?"), Turn::assistant(format!(
            "\n🔧 Tool executed: Error: Tool get_me failed: 401 Bad credentials\n{apology}"
        ))]
    );
    assert_eq!(surface.events.first(), Some(&SurfaceEvent::Banner));
    assert_eq!(surface.events.last(), Some(&SurfaceEvent::Farewell));
    assert_eq!(surface.chunks().len(), 2);
    assert!(surface.errors().is_empty());
}

#[tokio::test]
async fn exit_phrases_end_without_a_turn() {
    for phrase in ["quit", "Q", "  Stop ", "QUIT"] {
        let provider = ScriptedProvider::new(vec![]);
        let backend = handle(provider.clone(), StreamVariant::MessageBuffered, ToolRegistry::empty());
        let mut session = Session::new(backend, None);
        let mut input = ScriptedInput::new(&[phrase]);
        let mut surface = RecordingSurface::default();

        let exit = session
            .run(&mut input, &mut surface, &CancellationToken::new())
            .await
            .expect("session");

        assert_eq!(exit, SessionExit::Quit, "{phrase:?}");
        assert!(session.history().is_empty());
        assert!(provider.requests().is_empty());
        assert_eq!(surface.events, vec![SurfaceEvent::Banner, SurfaceEvent::Farewell]);
    }
}

#[tokio::test]
async fn end_of_input_ends_cleanly() {
    let provider = ScriptedProvider::new(vec![text_step(&["Hi!"])]);
    let backend = handle(provider, StreamVariant::MessageBuffered, ToolRegistry::empty());
    let mut session = Session::new(backend, None);
    let mut input = ScriptedInput::new(&["hello"]);
    let mut surface = RecordingSurface::default();

    let exit = session
        .run(&mut input, &mut surface, &CancellationToken::new())
        .await
        .expect("session");

    assert_eq!(exit, SessionExit::EndOfInput);
    assert_eq!(session.history().len(), 2);
    assert_eq!(
        surface.events,
        vec![
            SurfaceEvent::Banner,
            SurfaceEvent::Begin,
            SurfaceEvent::Chunk(OutputChunk::text("Hi!")),
            SurfaceEvent::End,
            SurfaceEvent::Farewell,
        ]
    );
}

#[tokio::test]
async fn only_the_last_five_turns_reach_the_model() {
    let provider = ScriptedProvider::new(vec![text_step(&["seventh answer"])]);
    let backend = handle(provider.clone(), StreamVariant::MessageBuffered, ToolRegistry::empty());
    let earlier = vec![
        Turn::user("turn 1"),
        Turn::assistant("turn 2"),
        Turn::user("turn 3"),
        Turn::assistant("turn 4"),
        Turn::user("turn 5"),
        Turn::assistant("turn 6"),
    ];
    let mut session = Session::new(backend, None).with_history(earlier);
    let mut input = ScriptedInput::new(&["turn 7", "q"]);
    let mut surface = RecordingSurface::default();

    session
        .run(&mut input, &mut surface, &CancellationToken::new())
        .await
        .expect("session");

    let sent: Vec<String> = provider.requests()[0]
        .messages
        .iter()
        .skip(1)
        .map(|m| m.text_content())
        .collect();
    assert_eq!(sent, vec!["turn 3", "turn 4", "turn 5", "turn 6", "turn 7"]);
    assert_eq!(session.history().len(), 8);
    assert_eq!(session.history()[7], Turn::assistant("seventh answer"));
}

#[tokio::test]
async fn failed_turn_keeps_only_the_user_turn_and_continues() {
    let provider = ScriptedProvider::new(vec![
        Step::OpenError(VoiceGitError::api(500, "internal error")),
        text_step(&["Back online."]),
    ]);
    let backend = handle(provider, StreamVariant::MessageBuffered, ToolRegistry::empty());
    let mut session = Session::new(backend, None);
    let mut input = ScriptedInput::new(&["first", "second", "stop"]);
    let mut surface = RecordingSurface::default();

    let exit = session
        .run(&mut input, &mut surface, &CancellationToken::new())
        .await
        .expect("session");

    assert_eq!(exit, SessionExit::Quit);
    assert_eq!(
        session.history(),
        &[
            Turn::user("first"),
            Turn::user("second"),
            Turn::assistant("Back online."),
        ]
    );
    let errors = surface.errors();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].starts_with("❌ Error: "));
    assert!(errors[0].contains("internal error"));
}

#[tokio::test]
async fn partial_stream_failure_discards_the_partial_answer() {
    let provider = ScriptedProvider::new(vec![Step::Deltas(vec![
        Ok(TextStreamDelta::text("Half an ans")),
        Err(VoiceGitError::Stream("connection reset".into())),
    ])]);
    let backend = handle(provider, StreamVariant::SegmentStreaming, ToolRegistry::empty());
    let mut session = Session::new(backend, None);
    let mut input = ScriptedInput::new(&["explain"]);
    let mut surface = RecordingSurface::default();

    session
        .run(&mut input, &mut surface, &CancellationToken::new())
        .await
        .expect("session");

    assert_eq!(session.history(), &[Turn::user("explain")]);
    assert_eq!(surface.errors().len(), 1);
}

#[tokio::test]
async fn unknown_backend_is_reported_and_the_loop_continues() {
    let selector = BackendSelector::new(GatewayConfig::default(), ToolRegistry::empty());
    let mut session = Session::new(ConfiguredBackend::new(selector, "gemini"), None);
    let mut input = ScriptedInput::new(&["hi", "quit"]);
    let mut surface = RecordingSurface::default();

    let exit = session
        .run(&mut input, &mut surface, &CancellationToken::new())
        .await
        .expect("session");

    assert_eq!(exit, SessionExit::Quit);
    assert_eq!(session.history(), &[Turn::user("hi")]);
    let errors = surface.errors();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("unknown backend 'gemini'"));
}

#[tokio::test]
async fn missing_credentials_fail_each_turn_but_not_the_session() {
    let selector = BackendSelector::new(GatewayConfig::default(), ToolRegistry::empty());
    let mut session = Session::new(ConfiguredBackend::new(selector, "anthropic"), None);
    let mut input = ScriptedInput::new(&["one", "two"]);
    let mut surface = RecordingSurface::default();

    let exit = session
        .run(&mut input, &mut surface, &CancellationToken::new())
        .await
        .expect("session");

    assert_eq!(exit, SessionExit::EndOfInput);
    assert_eq!(surface.errors().len(), 2);
    assert!(session.history().iter().all(|t| t.role == TurnRole::User));
}

#[tokio::test]
async fn interruption_while_reading_appends_nothing() {
    let provider = ScriptedProvider::new(vec![]);
    let backend = handle(provider, StreamVariant::MessageBuffered, ToolRegistry::empty());
    let mut session = Session::new(backend, None);
    let mut input = ScriptedInput::new(&[]).then_wait();
    let mut surface = RecordingSurface::default();
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        trigger.cancel();
    });

    let exit = session
        .run(&mut input, &mut surface, &cancel)
        .await
        .expect("session");

    assert_eq!(exit, SessionExit::Interrupted);
    assert!(session.history().is_empty());
    assert_eq!(surface.events.last(), Some(&SurfaceEvent::Interrupted));
}

#[tokio::test]
async fn interruption_during_a_turn_discards_it() {
    let provider = ScriptedProvider::new(vec![Step::Hang(vec![TextStreamDelta::text("Let me")])]);
    let backend = handle(provider, StreamVariant::SegmentStreaming, ToolRegistry::empty());
    let mut session = Session::new(backend, None);
    let mut input = ScriptedInput::new(&["who am I?"]).then_wait();
    let cancel = CancellationToken::new();
    let mut surface = RecordingSurface {
        cancel_on_chunk: Some(cancel.clone()),
        ..RecordingSurface::default()
    };

    let exit = session
        .run(&mut input, &mut surface, &cancel)
        .await
        .expect("session");

    assert_eq!(exit, SessionExit::Interrupted);
    assert!(session.history().is_empty());
    assert!(!surface.events.contains(&SurfaceEvent::End));
    assert_eq!(surface.events.last(), Some(&SurfaceEvent::Interrupted));
}

fn cancel_after(cancel: &CancellationToken, delay: Duration) {
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        trigger.cancel();
    });
}

#[tokio::test(start_paused = true)]
async fn interruption_waits_for_a_running_tool_within_grace() {
    let finished = Arc::new(AtomicBool::new(false));
    let provider = ScriptedProvider::new(vec![
        tool_step("c1", "slow", json!({})),
        text_step(&["never shown"]),
    ]);
    let backend = handle(
        provider.clone(),
        StreamVariant::SegmentStreaming,
        ToolRegistry::new(vec![slow_tool("slow", Duration::from_millis(300), finished.clone())]),
    );
    let mut session = Session::new(backend, None);
    let mut input = ScriptedInput::new(&["who am I?"]).then_wait();
    let mut surface = RecordingSurface::default();
    let cancel = CancellationToken::new();
    cancel_after(&cancel, Duration::from_millis(50));

    let started = tokio::time::Instant::now();
    let exit = session
        .run(&mut input, &mut surface, &cancel)
        .await
        .expect("session");

    assert_eq!(exit, SessionExit::Interrupted);
    assert!(finished.load(Ordering::SeqCst));
    assert!(started.elapsed() >= Duration::from_millis(300));
    assert!(session.history().is_empty());
    assert_eq!(provider.requests().len(), 1);
    assert!(surface.chunks().is_empty());
}

#[tokio::test(start_paused = true)]
async fn interruption_abandons_a_tool_past_grace() {
    let finished = Arc::new(AtomicBool::new(false));
    let provider = ScriptedProvider::new(vec![tool_step("c1", "slow", json!({}))]);
    let backend = handle(
        provider,
        StreamVariant::SegmentStreaming,
        ToolRegistry::new(vec![slow_tool("slow", Duration::from_secs(60), finished.clone())]),
    );
    let mut session = Session::new(backend, None)
        .with_agent_loop(AgentLoop::default().with_tool_grace_period(Duration::from_millis(100)));
    let mut input = ScriptedInput::new(&["who am I?"]).then_wait();
    let mut surface = RecordingSurface::default();
    let cancel = CancellationToken::new();
    cancel_after(&cancel, Duration::from_millis(50));

    let started = tokio::time::Instant::now();
    let exit = session
        .run(&mut input, &mut surface, &cancel)
        .await
        .expect("session");

    assert_eq!(exit, SessionExit::Interrupted);
    assert!(!finished.load(Ordering::SeqCst));
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(surface.events.last(), Some(&SurfaceEvent::Interrupted));
}

#[tokio::test]
async fn prompt_label_comes_from_the_profile() {
    let provider = ScriptedProvider::new(vec![]);
    let anonymous = Session::new(
        handle(provider.clone(), StreamVariant::MessageBuffered, ToolRegistry::empty()),
        None,
    );
    assert_eq!(anonymous.prompt_label(), "User: ");

    let profile = UserProfile {
        name: "Ada".into(),
        ..UserProfile::default()
    };
    let mut named = Session::new(
        handle(provider, StreamVariant::MessageBuffered, ToolRegistry::empty()),
        Some(&profile),
    );
    let mut input = ScriptedInput::new(&["q"]);
    let mut surface = RecordingSurface::default();
    named
        .run(&mut input, &mut surface, &CancellationToken::new())
        .await
        .expect("session");
    assert_eq!(input.prompts, vec!["Ada: "]);
}
