//! DAG executor for resolved invocations.
//!
//! Invocations run as soon as all of their upstreams have finished
//! successfully, up to `max_concurrency` at a time. Ready invocations are
//! started in topological order.

use super::PipelineRunResult;
use crate::config::ExecutionConfig;
use crate::context::{ExecutionContext, OpContext, PipelineContext, RunIdentity};
use crate::core::{OpOutput, OpStatus};
use crate::errors::OpflowError;
use crate::events::{
    OP_CANCELLED, OP_COMPLETED, OP_FAILED, OP_SKIPPED, OP_STARTED, PIPELINE_COMPLETED,
    PIPELINE_FAILED, PIPELINE_STARTED,
};
use crate::invocation::ResolvedInvocation;
use crate::observability::{op_span, pipeline_span, OpSpanAttributes, SpanTimer};
use crate::utils::now_utc;
use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::{HashMap, HashSet, VecDeque};
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinError;
use tracing::{debug, info, warn, Instrument};

/// A validated pipeline of resolved invocations.
#[derive(Debug, Clone)]
pub struct Pipeline {
    /// The pipeline name.
    name: String,
    /// Invocations in authoring order.
    invocations: Vec<Arc<ResolvedInvocation>>,
    /// Identity to position in `invocations`.
    index: HashMap<String, usize>,
    /// Identities in topological order.
    execution_order: Vec<String>,
    /// Executor settings.
    config: ExecutionConfig,
}

/// Why scheduling stopped before every invocation ran.
enum Halt {
    Failed,
    Cancelled(String),
}

impl Pipeline {
    pub(crate) fn new(
        name: String,
        invocations: Vec<Arc<ResolvedInvocation>>,
        execution_order: Vec<String>,
        config: ExecutionConfig,
    ) -> Self {
        let index = invocations
            .iter()
            .enumerate()
            .map(|(i, inv)| (inv.identity().to_string(), i))
            .collect();

        Self {
            name,
            invocations,
            index,
            execution_order,
            config,
        }
    }

    /// Returns the pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the invocations in authoring order.
    #[must_use]
    pub fn invocations(&self) -> &[Arc<ResolvedInvocation>] {
        &self.invocations
    }

    /// Looks up an invocation by identity.
    #[must_use]
    pub fn invocation(&self, identity: &str) -> Option<&ResolvedInvocation> {
        self.index.get(identity).map(|&i| self.invocations[i].as_ref())
    }

    /// Returns the topological execution order.
    #[must_use]
    pub fn execution_order(&self) -> &[String] {
        &self.execution_order
    }

    /// Returns the executor settings.
    #[must_use]
    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    /// Runs the pipeline with a fresh context that discards events.
    ///
    /// # Errors
    ///
    /// See [`execute`](Self::execute).
    pub async fn run(&self) -> Result<PipelineRunResult, OpflowError> {
        let ctx = PipelineContext::new(RunIdentity::new())
            .with_pipeline_name(self.name.clone())
            .with_execution_mode(self.config.execution_mode.clone());
        self.execute(Arc::new(ctx)).await
    }

    /// Runs every invocation under `ctx`.
    ///
    /// Op failures are reported in the returned result, not as errors.
    ///
    /// # Errors
    ///
    /// Returns [`OpflowError::Internal`] if scheduling stalls with
    /// invocations left, which a validated pipeline never does.
    pub async fn execute(&self, ctx: Arc<PipelineContext>) -> Result<PipelineRunResult, OpflowError> {
        let span = pipeline_span(&self.name, ctx.run_id());
        self.execute_inner(ctx).instrument(span).await
    }

    async fn execute_inner(&self, ctx: Arc<PipelineContext>) -> Result<PipelineRunResult, OpflowError> {
        let started_at = now_utc();
        let timer = SpanTimer::start();
        let total = self.invocations.len();

        ctx.try_emit_event(
            PIPELINE_STARTED,
            Some(serde_json::json!({ "invocations": total })),
        );
        info!(invocations = total, "Pipeline started");

        let order_pos: HashMap<&str, usize> = self
            .execution_order
            .iter()
            .enumerate()
            .map(|(pos, id)| (id.as_str(), pos))
            .collect();

        let mut remaining: Vec<usize> = Vec::with_capacity(total);
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); total];
        for (i, invocation) in self.invocations.iter().enumerate() {
            let unique: HashSet<&str> = invocation.depends_on().iter().map(String::as_str).collect();
            remaining.push(unique.len());
            for dep in unique {
                if let Some(&j) = self.index.get(dep) {
                    dependents[j].push(i);
                }
            }
        }

        let mut ready: VecDeque<usize> = self
            .execution_order
            .iter()
            .filter_map(|id| self.index.get(id).copied())
            .filter(|&i| remaining[i] == 0)
            .collect();

        let mut outputs: HashMap<String, OpOutput> = HashMap::with_capacity(total);
        let mut running = FuturesUnordered::new();
        let mut halt: Option<Halt> = None;
        let mut first_error: Option<String> = None;
        let max_concurrency = self.config.max_concurrency.max(1);

        loop {
            if halt.is_none() && ctx.is_cancelled() {
                let reason = ctx
                    .cancel_reason()
                    .unwrap_or_else(|| "no reason given".to_string());
                warn!(reason = %reason, "Pipeline cancelled; no further ops will start");
                halt = Some(Halt::Cancelled(reason));
            }

            while halt.is_none() && running.len() < max_concurrency {
                let Some(i) = ready.pop_front() else { break };
                running.push(self.spawn_invocation(i, &ctx, &outputs));
            }

            let Some((i, joined)) = running.next().await else {
                break;
            };

            let identity = self.invocations[i].identity().to_string();
            let output = joined.unwrap_or_else(|e| {
                let output = join_failure(&e);
                self.emit_for(
                    &ctx,
                    i,
                    OP_FAILED,
                    serde_json::json!({ "error": output.error }),
                );
                warn!(op = %identity, error = %e, "Op task did not complete");
                output
            });

            if output.is_failure() {
                if first_error.is_none() {
                    first_error = Some(describe_failure(&identity, &output));
                }
                if self.config.fail_fast {
                    if halt.is_none() {
                        halt = Some(Halt::Failed);
                    }
                } else {
                    self.skip_dependents(i, &dependents, &ctx, &mut outputs);
                }
            } else {
                let mut released: Vec<usize> = Vec::new();
                for &child in &dependents[i] {
                    remaining[child] -= 1;
                    if remaining[child] == 0 {
                        released.push(child);
                    }
                }
                released.sort_by_key(|&c| order_pos.get(self.invocations[c].identity()).copied());
                ready.extend(released);
            }

            outputs.insert(identity, output);
        }

        if outputs.len() < total {
            let Some(ref halt) = halt else {
                let pending: Vec<&str> = self
                    .invocations
                    .iter()
                    .map(|inv| inv.identity())
                    .filter(|id| !outputs.contains_key(*id))
                    .collect();
                return Err(OpflowError::Internal(format!(
                    "Scheduling stalled; remaining invocations: {pending:?}"
                )));
            };
            self.settle_leftovers(halt, &ctx, &mut outputs);
        }

        let cancelled = matches!(halt, Some(Halt::Cancelled(_)));
        let error = match halt {
            Some(Halt::Cancelled(reason)) => Some(format!("Pipeline cancelled: {reason}")),
            _ => first_error,
        };
        let success = error.is_none();
        let duration_ms = timer.elapsed_ms();

        if success {
            ctx.try_emit_event(
                PIPELINE_COMPLETED,
                Some(serde_json::json!({ "duration_ms": duration_ms })),
            );
            info!(duration_ms, "Pipeline completed");
        } else {
            ctx.try_emit_event(
                PIPELINE_FAILED,
                Some(serde_json::json!({
                    "error": &error,
                    "cancelled": cancelled,
                    "duration_ms": duration_ms,
                })),
            );
            warn!(error = ?error, duration_ms, "Pipeline failed");
        }

        Ok(PipelineRunResult {
            pipeline_name: self.name.clone(),
            run_id: ctx.run_id(),
            outputs,
            success,
            error,
            started_at,
            finished_at: now_utc(),
            duration_ms,
        })
    }

    /// Spawns one invocation; the returned future yields its position and
    /// the join result.
    fn spawn_invocation(
        &self,
        i: usize,
        ctx: &Arc<PipelineContext>,
        outputs: &HashMap<String, OpOutput>,
    ) -> impl Future<Output = (usize, Result<OpOutput, JoinError>)> + Send + 'static {
        let invocation = Arc::clone(&self.invocations[i]);
        let upstream: HashMap<String, OpOutput> = invocation
            .depends_on()
            .iter()
            .filter_map(|dep| outputs.get(dep).map(|out| (dep.clone(), out.clone())))
            .collect();

        let span = op_span(&invocation);
        let op_ctx = OpContext::new(Arc::clone(ctx), invocation, upstream);

        let handle = tokio::spawn(
            async move {
                op_ctx.try_emit_event(
                    OP_STARTED,
                    Some(serde_json::json!({ "tags": op_ctx.tags().to_json() })),
                );
                debug!(tags = ?op_ctx.tags(), "Op started");

                let timer = SpanTimer::start();
                let output = op_ctx.invocation().definition().op().execute(&op_ctx).await;
                let duration_ms = timer.elapsed_ms();

                let mut attributes = OpSpanAttributes::for_invocation(op_ctx.invocation())
                    .with_status(output.status)
                    .with_duration_ms(duration_ms);
                if let Some(ref error) = output.error {
                    attributes = attributes.with_error(error.clone());
                }

                emit_finished(&op_ctx, &output, &attributes);
                output
            }
            .instrument(span),
        );

        async move { (i, handle.await) }
    }

    /// Emits an op event on behalf of an invocation whose op is not running.
    fn emit_for(
        &self,
        ctx: &PipelineContext,
        i: usize,
        event_type: &str,
        mut data: serde_json::Value,
    ) {
        let invocation = &self.invocations[i];
        if let serde_json::Value::Object(ref mut map) = data {
            map.insert("op".to_string(), serde_json::json!(invocation.identity()));
            map.insert(
                "definition".to_string(),
                serde_json::json!(invocation.definition_name()),
            );
        }
        ctx.try_emit_event(event_type, Some(data));
    }

    /// Records a skip output for every transitive dependent of a failed
    /// invocation.
    fn skip_dependents(
        &self,
        failed: usize,
        dependents: &[Vec<usize>],
        ctx: &PipelineContext,
        outputs: &mut HashMap<String, OpOutput>,
    ) {
        let failed_id = self.invocations[failed].identity();
        let mut stack: Vec<usize> = dependents[failed].clone();

        while let Some(i) = stack.pop() {
            let identity = self.invocations[i].identity();
            if outputs.contains_key(identity) {
                continue;
            }
            let reason = format!("Upstream invocation '{failed_id}' failed");
            self.emit_for(ctx, i, OP_SKIPPED, serde_json::json!({ "reason": &reason }));
            outputs.insert(identity.to_string(), OpOutput::skip(reason));
            stack.extend(dependents[i].iter().copied());
        }
    }

    /// Gives every invocation that never started a skip or cancel output.
    fn settle_leftovers(
        &self,
        halt: &Halt,
        ctx: &PipelineContext,
        outputs: &mut HashMap<String, OpOutput>,
    ) {
        for identity in &self.execution_order {
            if outputs.contains_key(identity) {
                continue;
            }
            let Some(&i) = self.index.get(identity) else {
                continue;
            };
            let output = match halt {
                Halt::Failed => {
                    let reason = "Pipeline stopped after a failure".to_string();
                    self.emit_for(ctx, i, OP_SKIPPED, serde_json::json!({ "reason": &reason }));
                    OpOutput::skip(reason)
                }
                Halt::Cancelled(reason) => {
                    self.emit_for(ctx, i, OP_CANCELLED, serde_json::json!({ "reason": reason }));
                    OpOutput::cancel(reason.clone())
                }
            };
            outputs.insert(identity.clone(), output);
        }
    }
}

fn emit_finished(op_ctx: &OpContext, output: &OpOutput, attributes: &OpSpanAttributes) {
    let duration_ms = attributes.duration_ms.unwrap_or_default();
    debug!(attributes = ?attributes.to_otel_attributes(), "Op finished");

    match output.status {
        OpStatus::Fail => {
            op_ctx.try_emit_event(
                OP_FAILED,
                Some(serde_json::json!({ "error": output.error, "duration_ms": duration_ms })),
            );
            warn!(error = ?output.error, duration_ms, "Op failed");
        }
        OpStatus::Skip => {
            op_ctx.try_emit_event(
                OP_SKIPPED,
                Some(serde_json::json!({ "reason": output.skip_reason })),
            );
            debug!(reason = ?output.skip_reason, "Op skipped");
        }
        OpStatus::Cancel => {
            op_ctx.try_emit_event(
                OP_CANCELLED,
                Some(serde_json::json!({ "reason": output.cancel_reason })),
            );
            debug!(reason = ?output.cancel_reason, "Op cancelled");
        }
        _ => {
            op_ctx.try_emit_event(
                OP_COMPLETED,
                Some(serde_json::json!({ "duration_ms": duration_ms })),
            );
            debug!(duration_ms, "Op completed");
        }
    }
}

fn join_failure(err: &JoinError) -> OpOutput {
    if err.is_panic() {
        OpOutput::fail("Op panicked")
    } else {
        OpOutput::fail(format!("Op task did not complete: {err}"))
    }
}

fn describe_failure(identity: &str, output: &OpOutput) -> String {
    match output.status {
        OpStatus::Cancel => format!(
            "Invocation '{identity}' cancelled: {}",
            output.cancel_reason.as_deref().unwrap_or("no reason given")
        ),
        _ => format!(
            "Invocation '{identity}' failed: {}",
            output.error.as_deref().unwrap_or("unknown error")
        ),
    }
}
