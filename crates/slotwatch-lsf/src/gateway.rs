//! Queue command gateway.
//!
//! The audit only needs two pieces of raw scheduler text per queue. The trait
//! keeps process invocation out of the parsers so they can be fed fixtures.

use crate::bjobs::bjobs_args;
use crate::blimits::blimits_args;
use crate::env::SchedulerEnv;
use slotwatch_parsers::{run_command, CommandError};
use std::future::Future;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error(transparent)]
    Command(#[from] CommandError),
    #[error("Queue {0} is not known to the scheduler")]
    UnknownQueue(String),
}

/// Source of raw scheduler output for one queue.
pub trait QueueGateway {
    /// Raw job listing: one header line, then one line per job.
    fn list_active_users(
        &self,
        queue: &str,
    ) -> impl Future<Output = Result<String, GatewayError>> + Send;

    /// Raw limit configuration containing `Begin Limit ... End Limit` blocks.
    fn list_consume_limits(
        &self,
        queue: &str,
    ) -> impl Future<Output = Result<String, GatewayError>> + Send;
}

/// bjobs reports an empty queue on stderr with a non-zero exit.
fn is_empty_listing(stderr: &str) -> bool {
    stderr.contains("No unfinished job found") || stderr.contains("No job found")
}

fn is_unknown_queue(stderr: &str) -> bool {
    stderr.contains("No such queue")
}

/// Gateway that shells out to the LSF command line tools.
#[derive(Debug, Clone, Default)]
pub struct LsfGateway {
    env: SchedulerEnv,
}

impl LsfGateway {
    pub fn new(env: SchedulerEnv) -> Self {
        Self { env }
    }

    fn classify(queue: &str, err: CommandError) -> GatewayError {
        if err.stderr().is_some_and(is_unknown_queue) {
            return GatewayError::UnknownQueue(queue.to_string());
        }
        GatewayError::Command(err)
    }
}

impl QueueGateway for LsfGateway {
    async fn list_active_users(&self, queue: &str) -> Result<String, GatewayError> {
        let mut cmd = self.env.command("bjobs");
        cmd.args(bjobs_args(queue));

        match run_command(&mut cmd, "bjobs").await {
            Ok(stdout) => Ok(stdout),
            Err(e) if e.stderr().is_some_and(is_empty_listing) => {
                tracing::debug!("Queue {} has no jobs", queue);
                Ok(String::new())
            }
            Err(e) => Err(Self::classify(queue, e)),
        }
    }

    async fn list_consume_limits(&self, queue: &str) -> Result<String, GatewayError> {
        let mut cmd = self.env.command("blimits");
        cmd.args(blimits_args(queue));

        run_command(&mut cmd, "blimits")
            .await
            .map_err(|e| Self::classify(queue, e))
    }
}
