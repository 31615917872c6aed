use async_trait::async_trait;
use azure_toolkit::error::{Result, ToolkitError};
use azure_toolkit::livy::{
    poll_interval, BatchLog, BatchState, JobLogTailer, KillSwitch, LivyApi, TailEvent, TailOutcome,
    TailState,
};
use azure_toolkit::Logger;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

const BATCH_ID: i64 = 42;

/// Replays scripted log and state responses; the last one repeats once the script runs out.
#[derive(Default)]
struct ScriptedLivy {
    logs: Mutex<VecDeque<Result<BatchLog>>>,
    states: Mutex<VecDeque<Result<BatchState>>>,
    last_log: Mutex<Option<Result<BatchLog>>>,
    last_state: Mutex<Option<Result<BatchState>>>,
    log_fetches: Mutex<usize>,
    state_fetches: Mutex<usize>,
    kill_on_log_fetch: Mutex<Option<(usize, KillSwitch)>>,
    kill_on_state_fetch: Mutex<Option<(usize, KillSwitch)>>,
}

impl ScriptedLivy {
    fn new(logs: Vec<Result<BatchLog>>, states: Vec<Result<BatchState>>) -> Arc<Self> {
        Arc::new(Self {
            logs: Mutex::new(logs.into()),
            states: Mutex::new(states.into()),
            ..Default::default()
        })
    }

    /// Trip `kill` while serving log fetch number `fetch` (1-based)
    fn kill_during_log_fetch(&self, fetch: usize, kill: KillSwitch) {
        *self.kill_on_log_fetch.lock().unwrap() = Some((fetch, kill));
    }

    /// Trip `kill` while serving state fetch number `fetch` (1-based)
    fn kill_during_state_fetch(&self, fetch: usize, kill: KillSwitch) {
        *self.kill_on_state_fetch.lock().unwrap() = Some((fetch, kill));
    }

    fn log_fetches(&self) -> usize {
        *self.log_fetches.lock().unwrap()
    }

    fn state_fetches(&self) -> usize {
        *self.state_fetches.lock().unwrap()
    }
}

fn next_scripted<T: Clone>(queue: &Mutex<VecDeque<Result<T>>>, last: &Mutex<Option<Result<T>>>) -> Result<T> {
    let mut last = last.lock().unwrap();
    if let Some(item) = queue.lock().unwrap().pop_front() {
        *last = Some(item.clone());
        return item;
    }
    last.clone()
        .unwrap_or_else(|| Err(ToolkitError::transport("scripted", "script is empty")))
}

#[async_trait]
impl LivyApi for ScriptedLivy {
    async fn fetch_log(&self, batch_id: i64) -> Result<BatchLog> {
        assert_eq!(batch_id, BATCH_ID);
        let fetch = {
            let mut count = self.log_fetches.lock().unwrap();
            *count += 1;
            *count
        };
        if let Some((at, kill)) = &*self.kill_on_log_fetch.lock().unwrap() {
            if *at == fetch {
                kill.kill();
            }
        }
        next_scripted(&self.logs, &self.last_log)
    }

    async fn fetch_state(&self, batch_id: i64) -> Result<BatchState> {
        assert_eq!(batch_id, BATCH_ID);
        let fetch = {
            let mut count = self.state_fetches.lock().unwrap();
            *count += 1;
            *count
        };
        if let Some((at, kill)) = &*self.kill_on_state_fetch.lock().unwrap() {
            if *at == fetch {
                kill.kill();
            }
        }
        next_scripted(&self.states, &self.last_state)
    }
}

fn lines(count: usize) -> Vec<String> {
    (1..=count).map(|i| format!("line {}", i)).collect()
}

fn log(lines: Vec<String>) -> Result<BatchLog> {
    Ok(BatchLog {
        id: Some(BATCH_ID),
        from: Some(0),
        total: lines.len(),
        log: lines,
    })
}

fn state(state: &str) -> Result<BatchState> {
    Ok(BatchState {
        id: Some(BATCH_ID),
        state: state.to_string(),
        app_id: None,
    })
}

fn tailer(api: Arc<ScriptedLivy>, kill: KillSwitch) -> JobLogTailer<Arc<ScriptedLivy>> {
    JobLogTailer::new(api, BATCH_ID, kill, Logger::new_quiet())
}

fn log_lines(events: &[TailEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            TailEvent::LogLine(line) => Some(line.clone()),
            _ => None,
        })
        .collect()
}

#[tokio::test(start_paused = true)]
async fn emits_each_line_once_and_stops_after_flat_terminal_poll() {
    let api = ScriptedLivy::new(
        vec![log(lines(3)), log(lines(3)), log(lines(5))],
        vec![state("running"), state("running"), state("success")],
    );
    let mut tailer = tailer(api.clone(), KillSwitch::new());
    let mut events: Vec<TailEvent> = Vec::new();

    let outcome = tailer.run(&mut events).await.unwrap();

    assert_eq!(outcome, TailOutcome::Succeeded);
    assert_eq!(tailer.state(), TailState::Terminal);
    assert_eq!(log_lines(&events), lines(5));
    assert_eq!(events.last(), Some(&TailEvent::Terminal { succeeded: true }));
    assert_eq!(
        events.iter().filter(|e| matches!(e, TailEvent::Terminal { .. })).count(),
        1
    );

    // The third poll grew the log, so termination is only confirmed by the fourth.
    assert_eq!(api.state_fetches(), 4);
    // Four polls plus the closing fetch
    assert_eq!(api.log_fetches(), 5);
    assert_eq!(tailer.progress().next_line_index, 5);
    assert_eq!(tailer.progress().total_lines_available, 5);
    assert_eq!(tailer.progress().polls, 4);
}

#[tokio::test(start_paused = true)]
async fn flat_log_while_running_keeps_polling() {
    let api = ScriptedLivy::new(
        vec![log(lines(2)), log(lines(2)), log(lines(2))],
        vec![state("starting"), state("running"), state("dead")],
    );
    let mut tailer = tailer(api.clone(), KillSwitch::new());
    let mut events: Vec<TailEvent> = Vec::new();

    let outcome = tailer.run(&mut events).await.unwrap();

    assert_eq!(outcome, TailOutcome::Failed);
    assert_eq!(api.state_fetches(), 3);
    assert_eq!(log_lines(&events), lines(2));
    assert_eq!(events.last(), Some(&TailEvent::Terminal { succeeded: false }));
}

#[tokio::test(start_paused = true)]
async fn error_state_is_a_failure_and_case_does_not_matter() {
    let api = ScriptedLivy::new(vec![log(vec![])], vec![state("ERROR")]);
    let mut tailer = tailer(api.clone(), KillSwitch::new());
    let mut events: Vec<TailEvent> = Vec::new();

    let outcome = tailer.run(&mut events).await.unwrap();

    assert_eq!(outcome, TailOutcome::Failed);
    assert_eq!(events, vec![TailEvent::Terminal { succeeded: false }]);
    // Nothing to wait for: the empty log is already flat on the first poll.
    assert_eq!(tailer.progress().polls, 1);
}

#[tokio::test(start_paused = true)]
async fn lines_landing_at_termination_are_still_emitted() {
    let api = ScriptedLivy::new(
        vec![log(lines(2)), log(lines(2)), log(lines(4))],
        vec![state("running"), state("success")],
    );
    let mut tailer = tailer(api.clone(), KillSwitch::new());
    let mut events: Vec<TailEvent> = Vec::new();

    let outcome = tailer.run(&mut events).await.unwrap();

    assert_eq!(outcome, TailOutcome::Succeeded);
    assert_eq!(log_lines(&events), lines(4));
    assert_eq!(events.last(), Some(&TailEvent::Terminal { succeeded: true }));
}

#[tokio::test(start_paused = true)]
async fn blank_lines_are_skipped_but_counted() {
    let body = vec![
        "starting".to_string(),
        String::new(),
        "   ".to_string(),
        "done".to_string(),
    ];
    let api = ScriptedLivy::new(vec![log(body)], vec![state("running"), state("success")]);
    let mut tailer = tailer(api.clone(), KillSwitch::new());
    let mut events: Vec<TailEvent> = Vec::new();

    tailer.run(&mut events).await.unwrap();

    assert_eq!(log_lines(&events), vec!["starting".to_string(), "done".to_string()]);
    assert_eq!(tailer.progress().next_line_index, 4);
}

#[tokio::test(start_paused = true)]
async fn application_id_is_reported_once_with_the_first_match() {
    let first = "INFO Client: Application report for application_1_0001 (state: ACCEPTED)";
    let second = "INFO Client: Application report for application_1_0002 (state: ACCEPTED)";
    let api = ScriptedLivy::new(
        vec![
            log(vec![first.to_string()]),
            log(vec![first.to_string(), second.to_string()]),
            log(vec![first.to_string(), second.to_string()]),
        ],
        vec![state("running"), state("running"), state("success")],
    );
    let mut tailer = tailer(api.clone(), KillSwitch::new());
    let mut events: Vec<TailEvent> = Vec::new();

    tailer.run(&mut events).await.unwrap();

    let ids: Vec<&TailEvent> = events
        .iter()
        .filter(|e| matches!(e, TailEvent::ApplicationId(_)))
        .collect();
    assert_eq!(ids, vec![&TailEvent::ApplicationId("application_1_0001".to_string())]);
    assert_eq!(
        tailer.progress().application_id.as_deref(),
        Some("application_1_0001")
    );
    // Announced right after the line that carried it
    assert_eq!(events[0], TailEvent::LogLine(first.to_string()));
    assert_eq!(events[1], TailEvent::ApplicationId("application_1_0001".to_string()));
}

#[tokio::test(start_paused = true)]
async fn kill_before_start_fetches_nothing() {
    let api = ScriptedLivy::new(vec![log(lines(3))], vec![state("running")]);
    let kill = KillSwitch::new();
    kill.kill();
    let mut tailer = tailer(api.clone(), kill);
    let mut events: Vec<TailEvent> = Vec::new();

    let outcome = tailer.run(&mut events).await.unwrap();

    assert_eq!(outcome, TailOutcome::Killed);
    assert_eq!(tailer.state(), TailState::Killed);
    assert_eq!(api.log_fetches(), 0);
    assert_eq!(api.state_fetches(), 0);
    assert!(events.is_empty());
}

#[tokio::test(start_paused = true)]
async fn kill_during_polling_stops_before_the_next_request() {
    let api = ScriptedLivy::new(vec![log(lines(1)), log(lines(2))], vec![state("running")]);
    let kill = KillSwitch::new();
    api.kill_during_log_fetch(2, kill.clone());
    let mut tailer = tailer(api.clone(), kill);
    let mut events: Vec<TailEvent> = Vec::new();

    let outcome = tailer.run(&mut events).await.unwrap();

    assert_eq!(outcome, TailOutcome::Killed);
    // The fetch in flight is still delivered, the state request after it is not sent.
    assert_eq!(log_lines(&events), lines(2));
    assert_eq!(api.state_fetches(), 1);
    assert!(!events.iter().any(|e| matches!(e, TailEvent::Terminal { .. })));
}

#[tokio::test(start_paused = true)]
async fn kill_on_the_terminal_poll_skips_the_closing_fetch() {
    let api = ScriptedLivy::new(
        vec![log(lines(2))],
        vec![state("running"), state("success")],
    );
    let kill = KillSwitch::new();
    api.kill_during_state_fetch(2, kill.clone());
    let mut tailer = tailer(api.clone(), kill);
    let mut events: Vec<TailEvent> = Vec::new();

    let outcome = tailer.run(&mut events).await.unwrap();

    assert_eq!(outcome, TailOutcome::Killed);
    assert_eq!(tailer.state(), TailState::Killed);
    assert_eq!(log_lines(&events), lines(2));
    assert!(!events.iter().any(|e| matches!(e, TailEvent::Terminal { .. })));
    // Two polls, and no closing log fetch once the kill is seen
    assert_eq!(api.state_fetches(), 2);
    assert_eq!(api.log_fetches(), 2);
}

#[tokio::test(start_paused = true)]
async fn fetch_failure_ends_the_tail_with_batch_context() {
    let api = ScriptedLivy::new(
        vec![
            log(lines(1)),
            Err(ToolkitError::transport("log fetch of batch 42", "connection refused")),
        ],
        vec![state("running")],
    );
    let mut tailer = tailer(api.clone(), KillSwitch::new());
    let mut events: Vec<TailEvent> = Vec::new();

    let err = tailer.run(&mut events).await.unwrap_err();

    assert!(err.is_transport());
    assert!(err.to_string().contains("tailing batch 42"));
    assert_eq!(api.log_fetches(), 2);
    assert_eq!(log_lines(&events), lines(1));
}

#[tokio::test(start_paused = true)]
async fn fetch_failure_after_kill_is_a_kill() {
    let api = ScriptedLivy::new(
        vec![Err(ToolkitError::transport("log fetch of batch 42", "connection reset"))],
        vec![],
    );
    let kill = KillSwitch::new();
    api.kill_during_log_fetch(1, kill.clone());
    let mut tailer = tailer(api.clone(), kill);
    let mut events: Vec<TailEvent> = Vec::new();

    let outcome = tailer.run(&mut events).await.unwrap();

    assert_eq!(outcome, TailOutcome::Killed);
    assert!(events.is_empty());
}

#[tokio::test(start_paused = true)]
async fn polls_are_spaced_by_the_backoff() {
    let api = ScriptedLivy::new(
        vec![log(lines(1)), log(lines(2)), log(lines(3)), log(lines(3))],
        vec![state("running"), state("running"), state("running"), state("success")],
    );
    let mut tailer = tailer(api.clone(), KillSwitch::new());
    let mut events: Vec<TailEvent> = Vec::new();

    let started = tokio::time::Instant::now();
    tailer.run(&mut events).await.unwrap();

    // Three sleeps before the fourth, terminal poll
    let expected = poll_interval(0) + poll_interval(1) + poll_interval(2);
    assert_eq!(expected, Duration::from_millis(3_300));
    let elapsed = started.elapsed();
    assert!(elapsed >= expected, "slept {:?}", elapsed);
    assert!(elapsed < expected + Duration::from_millis(10), "slept {:?}", elapsed);
}

#[tokio::test(start_paused = true)]
async fn events_can_be_forwarded_to_another_task() {
    let api = ScriptedLivy::new(vec![log(lines(2))], vec![state("running"), state("success")]);
    let mut tailer = tailer(api.clone(), KillSwitch::new());
    let (mut tx, mut rx) = mpsc::unbounded_channel::<TailEvent>();

    let outcome = tailer.run(&mut tx).await.unwrap();
    drop(tx);

    let mut received = Vec::new();
    while let Some(event) = rx.recv().await {
        received.push(event);
    }

    assert_eq!(outcome, TailOutcome::Succeeded);
    assert_eq!(
        received,
        vec![
            TailEvent::LogLine("line 1".to_string()),
            TailEvent::LogLine("line 2".to_string()),
            TailEvent::Terminal { succeeded: true },
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn finished_tailer_does_not_poll_again() {
    let api = ScriptedLivy::new(vec![log(vec![])], vec![state("success")]);
    let mut tailer = tailer(api.clone(), KillSwitch::new());
    let mut events: Vec<TailEvent> = Vec::new();

    assert_eq!(tailer.run(&mut events).await.unwrap(), TailOutcome::Succeeded);
    let fetches = api.log_fetches();
    assert_eq!(tailer.run(&mut events).await.unwrap(), TailOutcome::Succeeded);
    assert_eq!(api.log_fetches(), fetches);
}
