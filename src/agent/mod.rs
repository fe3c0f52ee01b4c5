//! Agent loop - drives one session from user request to terminal state
//!
//! PROMPT → LLM → PARSE → EXECUTE → (append to transcript) → PROMPT ...
//! until a final answer, an error, or the step ceiling.

use crate::config::AgentConfig;
use crate::error::AgentError;
use crate::execution::ActionExecutor;
use crate::gemini::LlmTransport;
use crate::models::{
    AgentStepOutcome, LogEntry, LogKind, ParsedInstruction, SessionId, SessionOutcome,
    SessionReport,
};
use crate::parser::parse_response;
use crate::prompt::{build_prompt, SYSTEM_PROMPT};
use crate::state::{append_logs, StateStore};
use crate::Result;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

pub mod validation;

pub use validation::{derive_lookup_query, validate_request};

/// Owns the mutable state of one in-flight session
struct Session<'a> {
    id: SessionId,
    input: &'a str,
    transcript: Vec<LogEntry>,
    fallback_used: bool,
}

impl<'a> Session<'a> {
    fn new(input: &'a str) -> Self {
        let id = SessionId::new();
        Self {
            id,
            input,
            transcript: vec![LogEntry::text(id, LogKind::Input, input)],
            fallback_used: false,
        }
    }

    fn log(&mut self, kind: LogKind, text: impl Into<String>) {
        self.transcript.push(LogEntry::text(self.id, kind, text));
    }
}

pub struct AgentLoop {
    transport: Arc<dyn LlmTransport>,
    executor: ActionExecutor,
    store: Arc<dyn StateStore>,
    config: AgentConfig,
    system_prompt: String,
    /// One session at a time; later submissions wait
    session_lock: Mutex<()>,
}

impl AgentLoop {
    pub fn new(
        transport: Arc<dyn LlmTransport>,
        executor: ActionExecutor,
        store: Arc<dyn StateStore>,
        config: AgentConfig,
    ) -> Self {
        Self {
            transport,
            executor,
            store,
            config,
            system_prompt: SYSTEM_PROMPT.to_string(),
            session_lock: Mutex::new(()),
        }
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = system_prompt.into();
        self
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Run one session for a user request
    pub async fn run(&self, input: &str) -> Result<SessionReport> {
        let input = input.trim();
        validate_request(input)?;

        let _guard = self.session_lock.lock().await;

        let settings = self.store.load_settings().await?;
        if settings.credential.trim().is_empty() {
            return Err(AgentError::Validation(
                "API key is not configured".to_string(),
            ));
        }
        self.transport.set_credential(settings.credential.trim());

        let mut session = Session::new(input);
        let max_steps = self.config.max_steps;

        info!(session_id = %session.id, max_steps, request = %input, "Agent session started");

        let mut steps = 0;
        let outcome = 'session: {
            while steps < max_steps {
                steps += 1;
                debug!(session_id = %session.id, step = steps, "Agent step");

                match self.step(&mut session).await {
                    AgentStepOutcome::Continue => {}
                    AgentStepOutcome::Done { message } => {
                        break 'session SessionOutcome::Succeeded { message };
                    }
                    AgentStepOutcome::Failed { reason } => {
                        break 'session SessionOutcome::Failed { reason };
                    }
                }
            }
            SessionOutcome::BudgetExhausted { steps }
        };

        match &outcome {
            SessionOutcome::Succeeded { message } => {
                info!(session_id = %session.id, steps, "Agent session succeeded");
                session.log(LogKind::Final, message.clone());
            }
            SessionOutcome::Failed { reason } => {
                error!(session_id = %session.id, steps, reason = %reason, "Agent session failed");
                session.log(LogKind::Error, reason.clone());
            }
            SessionOutcome::BudgetExhausted { .. } => {
                warn!(session_id = %session.id, steps, "Agent session hit the step ceiling");
                session.log(LogKind::Error, outcome.summary());
            }
        }

        if let Err(e) = append_logs(self.store.as_ref(), &session.transcript).await {
            warn!(session_id = %session.id, error = %e, "Failed to persist agent logs");
        }

        Ok(SessionReport {
            session_id: session.id,
            outcome,
            steps,
            transcript: session.transcript,
        })
    }

    /// One PROMPT → LLM → PARSE → EXECUTE iteration
    async fn step(&self, session: &mut Session<'_>) -> AgentStepOutcome {
        let prompt = build_prompt(
            &self.system_prompt,
            session.input,
            &session.transcript,
            session.id,
        );

        let raw = match self.transport.send(&prompt).await {
            Ok(raw) => raw,
            Err(e) => {
                return AgentStepOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        };
        session.log(LogKind::LlmResponse, raw.clone());

        match parse_response(&raw) {
            ParsedInstruction::FunctionCall { name, args } => {
                self.run_action(session, &name, &args).await
            }
            ParsedInstruction::FinalAnswer { message } => AgentStepOutcome::Done { message },
            ParsedInstruction::ErrorSignal {
                message,
                inferred: false,
            } => AgentStepOutcome::Failed { reason: message },
            ParsedInstruction::ErrorSignal {
                message,
                inferred: true,
            } => {
                // Model ignored the protocol; note it and give it another step
                warn!(session_id = %session.id, message = %message, "Response without directive");
                session.log(LogKind::Error, message);
                AgentStepOutcome::Continue
            }
            ParsedInstruction::Unparseable => self.fallback(session).await,
        }
    }

    async fn run_action(
        &self,
        session: &mut Session<'_>,
        name: &str,
        args: &[String],
    ) -> AgentStepOutcome {
        session
            .transcript
            .push(LogEntry::call(session.id, name, args));

        match self.executor.execute(name, args).await {
            Ok(result) => {
                session.log(LogKind::Result, result);
                AgentStepOutcome::Continue
            }
            Err(e) => AgentStepOutcome::Failed {
                reason: e.to_string(),
            },
        }
    }

    /// One-shot recovery: look up whatever the request names once the
    /// command words are stripped
    async fn fallback(&self, session: &mut Session<'_>) -> AgentStepOutcome {
        if session.fallback_used {
            return AgentStepOutcome::Failed {
                reason: "Could not parse the model response".to_string(),
            };
        }
        session.fallback_used = true;

        let Some(query) = derive_lookup_query(session.input) else {
            return AgentStepOutcome::Failed {
                reason: "Could not parse the model response".to_string(),
            };
        };

        info!(session_id = %session.id, query = %query, "Falling back to implicit symbol lookup");
        self.run_action(session, "lookup_symbol", &[query]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::models::Settings;
    use crate::state::InMemoryStateStore;
    use crate::tools::create_default_registry;
    use crate::tools::test_support::FixedQuotes;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Replays scripted replies, then repeats `fallback` forever
    struct ScriptedTransport {
        replies: std::sync::Mutex<VecDeque<std::result::Result<String, TransportError>>>,
        fallback: String,
        calls: AtomicUsize,
        prompts: std::sync::Mutex<Vec<String>>,
        credentials: std::sync::Mutex<Vec<String>>,
    }

    impl ScriptedTransport {
        fn new(replies: &[&str]) -> Self {
            Self {
                replies: std::sync::Mutex::new(
                    replies.iter().map(|r| Ok(r.to_string())).collect(),
                ),
                fallback: "I am not sure what to do".to_string(),
                calls: AtomicUsize::new(0),
                prompts: std::sync::Mutex::new(Vec::new()),
                credentials: std::sync::Mutex::new(Vec::new()),
            }
        }

        fn failing(message: &str) -> Self {
            let transport = Self::new(&[]);
            transport.replies.lock().unwrap().push_back(Err(TransportError {
                attempts: 3,
                message: message.to_string(),
            }));
            transport
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LlmTransport for ScriptedTransport {
        async fn send(&self, prompt: &str) -> std::result::Result<String, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(self.fallback.clone()))
        }

        fn set_credential(&self, credential: &str) {
            self.credentials.lock().unwrap().push(credential.to_string());
        }
    }

    fn store() -> Arc<InMemoryStateStore> {
        Arc::new(InMemoryStateStore::with_settings(Settings {
            credential: "test-key".to_string(),
            ..Settings::default()
        }))
    }

    fn agent(transport: Arc<ScriptedTransport>, store: Arc<InMemoryStateStore>) -> AgentLoop {
        let quotes = Arc::new(
            FixedQuotes::default()
                .with_price("TSLA", 250.0)
                .with_search("tesla", "TSLA"),
        );
        let config = AgentConfig::default();
        let registry = create_default_registry(quotes, store.clone(), &config);
        AgentLoop::new(transport, ActionExecutor::new(registry), store, config)
    }

    #[tokio::test]
    async fn test_function_calls_then_final_answer() {
        let transport = Arc::new(ScriptedTransport::new(&[
            "FUNCTION_CALL: suggest_threshold_percentage|TSLA",
            "Let me compute.\nFUNCTION_CALL: calculate_thresholds|250|5",
            "FUNCTION_CALL: validate_thresholds|250|237.5|262.5",
            "FINAL_ANSWER: Thresholds ready",
        ]));
        let report = agent(transport.clone(), store())
            .run("watch Tesla with 5% threshold")
            .await
            .unwrap();

        assert_eq!(
            report.outcome,
            SessionOutcome::Succeeded {
                message: "Thresholds ready".to_string()
            }
        );
        assert_eq!(report.steps, 4);
        assert_eq!(transport.calls(), 4);
        assert_eq!(report.count(LogKind::FunctionCall), 3);
        assert_eq!(report.count(LogKind::Result), 3);
        assert_eq!(report.count(LogKind::Final), 1);
        assert!(report.transcript.iter().all(|e| e.iteration == report.session_id));
    }

    #[tokio::test]
    async fn test_prompts_carry_previous_results() {
        let transport = Arc::new(ScriptedTransport::new(&[
            "FUNCTION_CALL: calculate_thresholds|100|5",
            "FINAL_ANSWER: done",
        ]));
        agent(transport.clone(), store())
            .run("watch TSLA at 5%")
            .await
            .unwrap();

        let prompts = transport.prompts.lock().unwrap();
        assert!(!prompts[0].contains("Steps completed so far"));
        assert!(prompts[1].contains("Called: calculate_thresholds(100, 5)"));
        assert!(prompts[1].contains("low=95.00, high=105.00"));
    }

    #[tokio::test]
    async fn test_non_conforming_model_exhausts_budget() {
        let transport = Arc::new(ScriptedTransport::new(&[]));
        let agent = agent(transport.clone(), store());

        let report = agent.run("watch Tesla with 3% threshold").await.unwrap();

        let max_steps = agent.config().max_steps;
        assert_eq!(report.outcome, SessionOutcome::BudgetExhausted { steps: max_steps });
        assert_eq!(report.steps, max_steps);
        assert_eq!(transport.calls(), max_steps as usize);
    }

    #[tokio::test]
    async fn test_error_directive_fails_session() {
        let transport = Arc::new(ScriptedTransport::new(&["ERROR: Unknown company"]));
        let report = agent(transport.clone(), store())
            .run("watch Foo stock")
            .await
            .unwrap();

        assert_eq!(
            report.outcome,
            SessionOutcome::Failed {
                reason: "Unknown company".to_string()
            }
        );
        assert_eq!(transport.calls(), 1);
        assert_eq!(report.transcript.last().unwrap().kind, LogKind::Error);
    }

    #[tokio::test]
    async fn test_unparseable_uses_lookup_fallback_once() {
        let transport = Arc::new(ScriptedTransport::new(&[
            "FUNCTION_CALL: FUNCTION_CALL|Tesla",
            "FUNCTION_CALL: function_call",
        ]));
        let report = agent(transport, store())
            .run("watch Tesla with 3% threshold")
            .await
            .unwrap();

        assert_eq!(
            report.outcome,
            SessionOutcome::Failed {
                reason: "Could not parse the model response".to_string()
            }
        );
        let results: Vec<String> = report
            .transcript
            .iter()
            .filter(|e| e.kind == LogKind::Result)
            .map(|e| e.payload.to_string())
            .collect();
        assert_eq!(results, vec!["Symbol for Tesla: TSLA".to_string()]);
    }

    #[tokio::test]
    async fn test_repeated_marker_reaches_lookup_fallback() {
        let transport = Arc::new(ScriptedTransport::new(&[
            "FUNCTION_CALL: FUNCTION_CALL: lookup_symbol|Tesla",
            "FINAL_ANSWER: Found TSLA",
        ]));
        let report = agent(transport, store())
            .run("watch Tesla with 3% threshold")
            .await
            .unwrap();

        assert!(matches!(report.outcome, SessionOutcome::Succeeded { .. }));
        let calls: Vec<String> = report
            .transcript
            .iter()
            .filter(|e| e.kind == LogKind::FunctionCall)
            .map(|e| e.payload.to_string())
            .collect();
        assert_eq!(calls, vec!["lookup_symbol(Tesla)".to_string()]);
    }

    #[tokio::test]
    async fn test_credential_is_read_once_the_session_lock_is_held() {
        let store = store();
        let transport = Arc::new(ScriptedTransport::new(&["FINAL_ANSWER: done"]));
        let agent = agent(transport.clone(), store.clone());

        let guard = agent.session_lock.lock().await;
        let pending = agent.run("watch TSLA");
        tokio::pin!(pending);

        // Blocked on the lock: no credential pushed yet
        let blocked = tokio::time::timeout(Duration::from_millis(20), pending.as_mut()).await;
        assert!(blocked.is_err());
        assert!(transport.credentials.lock().unwrap().is_empty());

        store
            .save_settings(&Settings {
                credential: "rotated-key".to_string(),
                ..Settings::default()
            })
            .await
            .unwrap();
        drop(guard);

        pending.await.unwrap();
        assert_eq!(
            transport.credentials.lock().unwrap().as_slice(),
            ["rotated-key".to_string()]
        );
    }

    #[tokio::test]
    async fn test_transport_failure_fails_session() {
        let transport = Arc::new(ScriptedTransport::failing("503 Service Unavailable"));
        let report = agent(transport, store()).run("watch AAPL").await.unwrap();

        let SessionOutcome::Failed { reason } = report.outcome else {
            panic!("expected failure");
        };
        assert!(reason.contains("503 Service Unavailable"));
    }

    #[tokio::test]
    async fn test_action_error_fails_session() {
        let transport = Arc::new(ScriptedTransport::new(&["FUNCTION_CALL: buy_stock|TSLA|10"]));
        let report = agent(transport, store()).run("watch TSLA").await.unwrap();

        assert_eq!(
            report.outcome,
            SessionOutcome::Failed {
                reason: "Unknown action: buy_stock".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_full_watch_flow_persists_entry_and_logs() {
        let store = store();
        let transport = Arc::new(ScriptedTransport::new(&[
            "FUNCTION_CALL: lookup_symbol|Tesla",
            "FUNCTION_CALL: get_price|TSLA",
            "FUNCTION_CALL: calculate_thresholds|250|3",
            "FUNCTION_CALL: add_to_watchlist|TSLA|242.50|257.50",
            "FINAL_ANSWER: Watching TSLA between 242.50 and 257.50",
        ]));
        let report = agent(transport, store.clone())
            .run("watch Tesla with 3% threshold")
            .await
            .unwrap();

        assert!(matches!(report.outcome, SessionOutcome::Succeeded { .. }));

        let watchlist = store.load_watchlist().await.unwrap();
        assert_eq!(watchlist["TSLA"].low, 242.5);
        assert_eq!(watchlist["TSLA"].high, 257.5);
        assert_eq!(watchlist["TSLA"].current_price, Some(250.0));

        let logs = store.load_logs().await.unwrap();
        assert_eq!(logs.len(), report.transcript.len());
        assert_eq!(logs[0].kind, LogKind::Input);
    }

    #[tokio::test]
    async fn test_invalid_requests_never_reach_the_model() {
        let transport = Arc::new(ScriptedTransport::new(&["FINAL_ANSWER: hi"]));
        let agent = agent(transport.clone(), store());

        let err = agent.run("hi").await.unwrap_err();
        assert!(matches!(err, AgentError::Validation(_)));

        let err = agent.run("what is the weather like today").await.unwrap_err();
        assert!(matches!(err, AgentError::Validation(_)));

        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_credential_is_rejected() {
        let transport = Arc::new(ScriptedTransport::new(&["FINAL_ANSWER: hi"]));
        let agent = agent(transport.clone(), Arc::new(InMemoryStateStore::new()));

        let err = agent.run("watch Tesla with 3% threshold").await.unwrap_err();
        assert!(err.to_string().contains("API key"));
        assert_eq!(transport.calls(), 0);
    }
}
