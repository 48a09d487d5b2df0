//! Long-poll search client protocol tests
//!
//! Exercises the submit retry policy and the poll loop's circuit breaker
//! with a scripted transport, no real timers or sockets involved.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use cardforge::services::search::{
    LongPollClient, Reply, ResearchTransport, SearchError, MAX_CONSECUTIVE_NET_ERRORS,
};

struct ScriptedTransport {
    submit_replies: Mutex<VecDeque<Reply>>,
    poll_replies: Mutex<VecDeque<Reply>>,
    submits_made: AtomicU32,
    polls_made: AtomicU32,
}

impl ScriptedTransport {
    fn new(submits: Vec<Reply>, polls: Vec<Reply>) -> Self {
        Self {
            submit_replies: Mutex::new(submits.into()),
            poll_replies: Mutex::new(polls.into()),
            submits_made: AtomicU32::new(0),
            polls_made: AtomicU32::new(0),
        }
    }

    fn remaining_polls(&self) -> usize {
        self.poll_replies.lock().unwrap().len()
    }
}

#[async_trait]
impl ResearchTransport for ScriptedTransport {
    async fn submit(&self, _query: &str) -> Reply {
        self.submits_made.fetch_add(1, Ordering::SeqCst);
        self.submit_replies
            .lock()
            .unwrap()
            .pop_front()
            .expect("submit script exhausted")
    }

    async fn poll(&self, _job_id: &str) -> Reply {
        self.polls_made.fetch_add(1, Ordering::SeqCst);
        self.poll_replies
            .lock()
            .unwrap()
            .pop_front()
            .expect("poll script exhausted")
    }
}

fn http(status: u16, body: Value) -> Reply {
    Reply::Http {
        status,
        body: Some(body),
    }
}

fn malformed(status: u16) -> Reply {
    Reply::Http { status, body: None }
}

fn net(msg: &str) -> Reply {
    Reply::Transport(msg.to_string())
}

fn submitted() -> Reply {
    http(200, json!({"id": "job-1"}))
}

fn running() -> Reply {
    http(200, json!({"status": "running"}))
}

fn completed(text: &str) -> Reply {
    http(200, json!({"status": "completed", "outputs": [{"text": "draft"}, {"text": text}]}))
}

fn client(transport: ScriptedTransport, timeout_minutes: u64) -> LongPollClient<ScriptedTransport> {
    LongPollClient::new(transport, timeout_minutes)
        .with_timing(Duration::from_millis(0), Duration::from_millis(0))
}

#[tokio::test]
async fn transient_net_errors_are_masked_and_counter_resets() {
    // [net-error, net-error, "running", "completed"] succeeds with content
    let c = client(
        ScriptedTransport::new(
            vec![submitted()],
            vec![net("reset"), net("reset"), running(), completed("X")],
        ),
        30,
    );
    assert_eq!(c.run("query").await.unwrap(), "X");
}

#[tokio::test]
async fn any_completed_poll_request_resets_the_breaker() {
    // Two bursts of ceiling-1 net errors separated by one successful poll
    // never trip the breaker
    let burst = (MAX_CONSECUTIVE_NET_ERRORS - 1) as usize;
    let mut polls: Vec<Reply> = Vec::new();
    polls.extend(std::iter::repeat_with(|| net("flap")).take(burst));
    polls.push(running());
    polls.extend(std::iter::repeat_with(|| net("flap")).take(burst));
    polls.push(completed("X"));

    let c = client(ScriptedTransport::new(vec![submitted()], polls), 30);
    assert_eq!(c.run("query").await.unwrap(), "X");
}

#[tokio::test]
async fn consecutive_net_error_ceiling_stops_polling() {
    let mut polls: Vec<Reply> = std::iter::repeat_with(|| net("down"))
        .take(MAX_CONSECUTIVE_NET_ERRORS as usize)
        .collect();
    // Anything past the ceiling must never be requested
    polls.push(completed("late"));
    polls.push(completed("late"));

    let transport = ScriptedTransport::new(vec![submitted()], polls);
    let c = LongPollClient::new(transport, 30)
        .with_timing(Duration::from_millis(0), Duration::from_millis(0));

    match c.run("query").await {
        Err(SearchError::NetworkUnstable(_)) => {}
        other => panic!("expected NetworkUnstable, got {:?}", other.map(|_| ())),
    }
    assert_eq!(
        c.transport().polls_made.load(Ordering::SeqCst),
        MAX_CONSECUTIVE_NET_ERRORS
    );
    assert_eq!(c.transport().remaining_polls(), 2);
}

#[tokio::test]
async fn non_2xx_and_malformed_bodies_are_skipped_without_counting() {
    let c = client(
        ScriptedTransport::new(
            vec![submitted()],
            vec![http(502, json!({})), malformed(200), running(), completed("X")],
        ),
        30,
    );
    assert_eq!(c.run("query").await.unwrap(), "X");
}

#[tokio::test]
async fn poll_budget_exhaustion_is_a_timeout() {
    // timeout of 1 minute = 6 polls at the fixed interval
    let polls: Vec<Reply> = std::iter::repeat_with(running).take(6).collect();
    let c = client(ScriptedTransport::new(vec![submitted()], polls), 1);
    assert!(matches!(c.run("query").await, Err(SearchError::Timeout)));
}

#[tokio::test]
async fn completed_output_without_text_is_an_empty_result() {
    let c = client(
        ScriptedTransport::new(
            vec![submitted()],
            vec![http(200, json!({"status": "completed", "outputs": [{"kind": "reasoning"}]}))],
        ),
        30,
    );
    assert_eq!(c.run("query").await.unwrap(), "");
}

#[tokio::test]
async fn completed_with_empty_outputs_is_an_error() {
    let c = client(
        ScriptedTransport::new(
            vec![submitted()],
            vec![http(200, json!({"status": "completed", "outputs": []}))],
        ),
        30,
    );
    assert!(matches!(c.run("query").await, Err(SearchError::EmptyOutput)));
}

#[tokio::test]
async fn provider_failure_surfaces_its_message() {
    let c = client(
        ScriptedTransport::new(
            vec![submitted()],
            vec![http(200, json!({"status": "failed", "error": "quota exceeded"}))],
        ),
        30,
    );
    match c.run("query").await {
        Err(SearchError::ProviderFailed(msg)) => assert_eq!(msg, "quota exceeded"),
        other => panic!("expected ProviderFailed, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn submit_retries_server_errors_with_backoff() {
    let c = client(
        ScriptedTransport::new(
            vec![malformed(503), malformed(503), submitted()],
            vec![completed("X")],
        ),
        30,
    );
    assert_eq!(c.run("query").await.unwrap(), "X");
}

#[tokio::test]
async fn submit_retries_transport_failures() {
    let c = client(
        ScriptedTransport::new(vec![net("refused"), submitted()], vec![completed("X")]),
        30,
    );
    assert_eq!(c.run("query").await.unwrap(), "X");
}

#[tokio::test]
async fn submit_retry_budget_is_bounded() {
    // 1 attempt + 3 retries, all 503, then give up
    let transport = ScriptedTransport::new(
        vec![malformed(503), malformed(503), malformed(503), malformed(503)],
        vec![],
    );
    let c = LongPollClient::new(transport, 30)
        .with_timing(Duration::from_millis(0), Duration::from_millis(0));
    assert!(matches!(c.run("query").await, Err(SearchError::SubmitStatus(503))));
}

#[tokio::test]
async fn submit_client_errors_fail_immediately() {
    let transport = ScriptedTransport::new(
        vec![malformed(400), submitted()],
        vec![completed("never")],
    );
    let c = LongPollClient::new(transport, 30)
        .with_timing(Duration::from_millis(0), Duration::from_millis(0));

    match c.run("query").await {
        Err(SearchError::SubmitStatus(400)) => {}
        other => panic!("expected SubmitStatus(400), got {:?}", other.map(|_| ())),
    }
    assert_eq!(c.transport().submits_made.load(Ordering::SeqCst), 1);
    assert_eq!(c.transport().remaining_polls(), 1);
}

#[tokio::test]
async fn missing_job_id_is_an_error() {
    let c = client(
        ScriptedTransport::new(vec![http(200, json!({"agent": "x"}))], vec![]),
        30,
    );
    assert!(matches!(c.run("query").await, Err(SearchError::MissingJobId)));
}

#[tokio::test]
async fn job_id_from_resource_name() {
    let c = client(
        ScriptedTransport::new(
            vec![http(200, json!({"name": "v1beta/interactions/job-9"}))],
            vec![completed("X")],
        ),
        30,
    );
    assert_eq!(c.run("query").await.unwrap(), "X");
}
