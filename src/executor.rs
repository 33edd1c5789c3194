use std::cell::Cell;
use std::time::Duration;

use serde_json::{Value, json};
use tracing::warn;

use crate::error::QueryError;
use crate::graphql::{GraphqlTransport, Query};

const DEFAULT_FIRST_DELAY: Duration = Duration::from_secs(1);
const DEFAULT_STEADY_DELAY: Duration = Duration::from_secs(10);
const DEFAULT_MAX_ATTEMPTS: u32 = 20;

/// How long to back off between attempts of one call, and when to give up.
///
/// The first retry waits `first_delay`, every later one waits `steady_delay`.
/// `max_attempts == 0` retries forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub first_delay: Duration,
    pub steady_delay: Duration,
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            first_delay: DEFAULT_FIRST_DELAY,
            steady_delay: DEFAULT_STEADY_DELAY,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl RetryPolicy {
    pub fn unbounded() -> Self {
        Self {
            max_attempts: 0,
            ..Self::default()
        }
    }

    /// Delay to sleep after the `failures`-th failed attempt (1-based).
    pub fn delay_after_failure(&self, failures: u32) -> Duration {
        if failures <= 1 {
            self.first_delay
        } else {
            self.steady_delay
        }
    }

    fn exhausted(&self, attempts: u32) -> bool {
        self.max_attempts != 0 && attempts >= self.max_attempts
    }
}

type Sleeper = Box<dyn Fn(Duration)>;

/// Runs queries over a transport, retrying every failure according to a
/// [`RetryPolicy`] and counting each attempt.
pub struct Executor<T> {
    transport: T,
    policy: RetryPolicy,
    calls: Cell<u64>,
    sleeper: Sleeper,
}

impl<T: GraphqlTransport> Executor<T> {
    pub fn new(transport: T, policy: RetryPolicy) -> Self {
        Self {
            transport,
            policy,
            calls: Cell::new(0),
            sleeper: Box::new(std::thread::sleep),
        }
    }

    pub fn with_sleeper(mut self, sleeper: impl Fn(Duration) + 'static) -> Self {
        self.sleeper = Box::new(sleeper);
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Attempts made so far, successful or not.
    pub fn calls(&self) -> u64 {
        self.calls.get()
    }

    /// Blocks for `delay` through the same sleeper the retries use.
    pub fn pause(&self, delay: Duration) {
        (self.sleeper)(delay);
    }

    pub fn execute(&self, query: &Query, variables: Option<Value>) -> Result<Value, QueryError> {
        let variables = variables.unwrap_or_else(|| json!({}));
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            self.calls.set(self.calls.get() + 1);
            let err = match self.transport.send(query, &variables) {
                Ok(data) => return Ok(data),
                Err(err) => err,
            };
            if self.policy.exhausted(attempts) {
                return Err(QueryError::RetriesExhausted {
                    operation: query.operation,
                    attempts,
                    last_error: err.to_string(),
                });
            }
            let delay = self.policy.delay_after_failure(attempts);
            warn!(
                operation = query.operation,
                attempt = attempts,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "query failed, retrying"
            );
            (self.sleeper)(delay);
        }
    }
}
