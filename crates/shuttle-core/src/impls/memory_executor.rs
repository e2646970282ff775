//! InMemoryStatementExecutor - 開発用・テスト用の実行器
//!
//! Responses are scripted per query substring. Every call is logged so tests
//! can assert on exactly what was sent and how often.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{ResultSet, Statement};
use crate::ports::{RawFailure, StatementExecutor};

type Response = Result<ResultSet, RawFailure>;

/// One scripting rule: statements whose query contains `needle` get the next
/// queued response, then `fallback` once the queue is drained.
#[derive(Debug)]
struct Rule {
    needle: String,
    queued: VecDeque<Response>,
    fallback: Option<Response>,
}

impl Rule {
    fn take(&mut self) -> Option<Response> {
        self.queued.pop_front().or_else(|| self.fallback.clone())
    }
}

#[derive(Debug)]
struct State {
    rules: Vec<Rule>,
    calls: Vec<Statement>,
}

/// Scripted [`StatementExecutor`].
///
/// Rules are matched in the order they were added. A statement that matches
/// no rule (or only drained ones) gets the default response, which is an
/// empty successful result set unless overridden.
#[derive(Debug)]
pub struct InMemoryStatementExecutor {
    state: Mutex<State>,
    default: Response,
    latency: Duration,
}

impl InMemoryStatementExecutor {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                rules: Vec::new(),
                calls: Vec::new(),
            }),
            default: Ok(ResultSet::empty()),
            latency: Duration::ZERO,
        }
    }

    pub fn with_default(mut self, response: Response) -> Self {
        self.default = response;
        self
    }

    /// Simulated round trip applied to every call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Queues a one-shot response for queries containing `needle`.
    pub fn once(mut self, needle: impl Into<String>, response: Response) -> Self {
        self.rule_mut(needle.into()).queued.push_back(response);
        self
    }

    /// Response for queries containing `needle` once its queue is drained.
    pub fn always(mut self, needle: impl Into<String>, response: Response) -> Self {
        self.rule_mut(needle.into()).fallback = Some(response);
        self
    }

    fn rule_mut(&mut self, needle: String) -> &mut Rule {
        let rules = &mut self.state.get_mut().rules;
        let index = match rules.iter().position(|r| r.needle == needle) {
            Some(index) => index,
            None => {
                rules.push(Rule {
                    needle,
                    queued: VecDeque::new(),
                    fallback: None,
                });
                rules.len() - 1
            }
        };
        &mut rules[index]
    }

    /// Statements executed so far, in call order.
    pub async fn calls(&self) -> Vec<Statement> {
        self.state.lock().await.calls.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.state.lock().await.calls.len()
    }
}

impl Default for InMemoryStatementExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StatementExecutor for InMemoryStatementExecutor {
    async fn execute(&self, statement: &Statement) -> Result<ResultSet, RawFailure> {
        let response = {
            let mut state = self.state.lock().await;
            state.calls.push(statement.clone());
            state
                .rules
                .iter_mut()
                .filter(|rule| statement.query().contains(&rule.needle))
                .find_map(Rule::take)
                .unwrap_or_else(|| self.default.clone())
        };

        // lock is released before sleeping so parallel callers overlap
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        response
    }
}
