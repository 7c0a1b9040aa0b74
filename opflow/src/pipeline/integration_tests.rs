//! Integration tests for building and running pipelines.

#[cfg(test)]
mod tests {
    use crate::config::{ExecutionConfig, OpflowConfig};
    use crate::context::{ExecutionContext, OpContext, PipelineContext, RunIdentity};
    use crate::core::{OpOutput, OpStatus, Tags};
    use crate::definitions::OpDefinition;
    use crate::events::CollectingEventSink;
    use crate::invocation::InvocationSpec;
    use crate::ops::{NoOp, Op};
    use crate::pipeline::{Pipeline, PipelineBuilder};
    use crate::testing::{
        assert_invocation_status, assert_run_failed, assert_run_succeeded, assert_tags_eq,
        FailingOp, RecordingOp, SlowOp,
    };
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    /// Tracks how many executions overlap.
    #[derive(Debug, Default)]
    struct ConcurrencyProbe {
        current: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl Op for ConcurrencyProbe {
        async fn execute(&self, _ctx: &OpContext) -> OpOutput {
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.current.fetch_sub(1, Ordering::SeqCst);
            OpOutput::ok_empty()
        }
    }

    fn metadata_solid(op: Arc<dyn Op>) -> OpDefinition {
        OpDefinition::new("metadata_solid", op).with_tags([("foo", "bar"), ("baz", "quux")])
    }

    fn aliased_invocation() -> InvocationSpec {
        InvocationSpec::new("metadata_solid")
            .with_alias("aliased_metadata_solid")
            .with_tags([("foo", "oof"), ("bip", "bop")])
    }

    fn sequential() -> ExecutionConfig {
        ExecutionConfig::new().with_max_concurrency(1)
    }

    fn collecting_context(pipeline: &Pipeline) -> (Arc<PipelineContext>, Arc<CollectingEventSink>) {
        let sink = Arc::new(CollectingEventSink::new());
        let ctx = PipelineContext::new(RunIdentity::new())
            .with_pipeline_name(pipeline.name())
            .with_event_sink(sink.clone());
        (Arc::new(ctx), sink)
    }

    #[tokio::test]
    async fn test_aliased_invocation_sees_merged_tags() {
        let called = Arc::new(AtomicBool::new(false));
        let seen = Arc::clone(&called);

        let definition = OpDefinition::from_fn("metadata_solid", move |ctx: &OpContext| {
            seen.store(true, Ordering::SeqCst);
            let expected = Tags::from([("foo", "oof"), ("baz", "quux"), ("bip", "bop")]);
            if ctx.tags() == &expected {
                OpOutput::ok_empty()
            } else {
                OpOutput::fail(format!("unexpected tags: {:?}", ctx.tags()))
            }
        })
        .with_tags([("foo", "bar"), ("baz", "quux")]);

        let pipeline = PipelineBuilder::new("metadata_pipeline")
            .definition(definition)
            .unwrap()
            .invoke(aliased_invocation())
            .build()
            .unwrap();

        let result = pipeline.run().await.unwrap();

        assert_run_succeeded(&result);
        assert!(called.load(Ordering::SeqCst));
        assert_invocation_status(&result, "aliased_metadata_solid", OpStatus::Ok);
        assert!(result.output("metadata_solid").is_none());
    }

    #[tokio::test]
    async fn test_declared_tags_survive_aliasing() {
        let op = Arc::new(RecordingOp::new());
        let definition = metadata_solid(op.clone());
        let declared_before = definition.tags().clone();

        let pipeline = PipelineBuilder::new("metadata_pipeline")
            .definition(definition)
            .unwrap()
            .invoke(aliased_invocation())
            .invoke(InvocationSpec::new("metadata_solid"))
            .build()
            .unwrap();

        let result = pipeline.run().await.unwrap();
        assert_run_succeeded(&result);

        let aliased = op.execution_for("aliased_metadata_solid").unwrap();
        assert_tags_eq(&aliased.tags, [("foo", "oof"), ("baz", "quux"), ("bip", "bop")]);

        let plain = op.execution_for("metadata_solid").unwrap();
        assert_tags_eq(&plain.tags, [("foo", "bar"), ("baz", "quux")]);

        let definition = pipeline.invocation("metadata_solid").unwrap().definition();
        assert_eq!(definition.tags(), &declared_before);
    }

    #[tokio::test]
    async fn test_same_definition_with_different_overlays() {
        let op = Arc::new(RecordingOp::new());
        let pipeline = PipelineBuilder::new("fanout")
            .definition(OpDefinition::new("extract", op.clone()).with_tag("region", "us"))
            .unwrap()
            .invoke(InvocationSpec::new("extract").with_alias("extract_eu").with_tag("region", "eu"))
            .invoke(InvocationSpec::new("extract").with_alias("extract_ap").with_tag("region", "ap"))
            .invoke(InvocationSpec::new("extract").with_alias("extract_us"))
            .build()
            .unwrap();

        let result = pipeline.run().await.unwrap();

        assert_run_succeeded(&result);
        assert_eq!(op.execution_count(), 3);
        for (identity, region) in [("extract_eu", "eu"), ("extract_ap", "ap"), ("extract_us", "us")] {
            let recorded = op.execution_for(identity).unwrap();
            assert_eq!(recorded.definition, "extract");
            assert_eq!(recorded.tags.get("region"), Some(region));
        }
    }

    #[tokio::test]
    async fn test_upstream_outputs_are_visible() {
        let pipeline = PipelineBuilder::new("chain")
            .definition(OpDefinition::from_fn("produce", |_ctx: &OpContext| {
                OpOutput::ok_value("n", serde_json::json!(41))
            }))
            .unwrap()
            .definition(OpDefinition::from_fn("consume", |ctx: &OpContext| {
                let n = ctx
                    .upstream_output("producer")
                    .and_then(|out| out.get("n"))
                    .and_then(serde_json::Value::as_i64);
                match n {
                    Some(n) => OpOutput::ok_value("n", serde_json::json!(n + 1)),
                    None => OpOutput::fail("missing upstream value"),
                }
            }))
            .unwrap()
            .invoke(InvocationSpec::new("consume").depends_on("producer"))
            .invoke(InvocationSpec::new("produce").with_alias("producer"))
            .build()
            .unwrap();

        assert_eq!(pipeline.execution_order(), &["producer", "consume"]);

        let result = pipeline.run().await.unwrap();
        assert_run_succeeded(&result);
        assert_eq!(
            result.output("consume").unwrap().get("n"),
            Some(&serde_json::json!(42))
        );
    }

    fn failure_pipeline(config: ExecutionConfig) -> (Pipeline, Arc<RecordingOp>) {
        let op = Arc::new(RecordingOp::new());
        let pipeline = PipelineBuilder::new("failing")
            .with_config(config)
            .definition(OpDefinition::new("boom", Arc::new(FailingOp::new("exploded"))))
            .unwrap()
            .definition(OpDefinition::new("work", op.clone()))
            .unwrap()
            .invoke(InvocationSpec::new("boom"))
            .invoke(InvocationSpec::new("work").with_alias("after_boom").depends_on("boom"))
            .invoke(InvocationSpec::new("work").with_alias("downstream").depends_on("after_boom"))
            .invoke(InvocationSpec::new("work").with_alias("independent"))
            .build()
            .unwrap();
        (pipeline, op)
    }

    #[tokio::test]
    async fn test_fail_fast_stops_scheduling() {
        let (pipeline, op) = failure_pipeline(sequential());

        let (ctx, sink) = collecting_context(&pipeline);
        let result = pipeline.execute(ctx).await.unwrap();

        assert_run_failed(&result);
        assert_eq!(op.execution_count(), 0);
        assert_eq!(result.failed_invocations(), vec!["boom"]);
        assert_eq!(result.error.as_deref(), Some("Invocation 'boom' failed: exploded"));
        for identity in ["after_boom", "downstream", "independent"] {
            assert_invocation_status(&result, identity, OpStatus::Skip);
        }

        assert_eq!(
            sink.event_types(),
            vec![
                "pipeline.started",
                "op.started",
                "op.failed",
                "op.skipped",
                "op.skipped",
                "op.skipped",
                "pipeline.failed",
            ]
        );
        let failed = sink.events_of_type("op.failed");
        let failed = failed[0].1.as_ref().unwrap();
        assert_eq!(failed["op"], "boom");
        assert_eq!(failed["definition"], "boom");
        assert_eq!(failed["error"], "exploded");

        let skipped: Vec<serde_json::Value> = sink
            .events_of_type("op.skipped")
            .into_iter()
            .filter_map(|(_, data)| data)
            .collect();
        let skipped_ops: Vec<&str> = skipped.iter().filter_map(|d| d["op"].as_str()).collect();
        assert_eq!(skipped_ops, vec!["independent", "after_boom", "downstream"]);
        for payload in &skipped {
            assert_eq!(payload["definition"], "work");
            assert_eq!(payload["reason"], "Pipeline stopped after a failure");
            assert_eq!(payload["pipeline"], "failing");
        }
    }

    #[tokio::test]
    async fn test_failure_skips_only_dependents_without_fail_fast() {
        let (pipeline, op) = failure_pipeline(sequential().with_fail_fast(false));

        let (ctx, sink) = collecting_context(&pipeline);
        let result = pipeline.execute(ctx).await.unwrap();

        assert_run_failed(&result);
        assert_eq!(op.execution_count(), 1);
        assert!(op.execution_for("independent").is_some());
        assert_invocation_status(&result, "independent", OpStatus::Ok);
        assert_invocation_status(&result, "after_boom", OpStatus::Skip);
        assert_invocation_status(&result, "downstream", OpStatus::Skip);
        assert_eq!(
            result.output("after_boom").unwrap().skip_reason.as_deref(),
            Some("Upstream invocation 'boom' failed")
        );

        assert_eq!(sink.events_of_type("op.failed").len(), 1);
        assert_eq!(sink.events_of_type("op.completed").len(), 1);
        let mut skipped: Vec<(String, String)> = sink
            .events_of_type("op.skipped")
            .into_iter()
            .filter_map(|(_, data)| data)
            .map(|d| {
                assert_eq!(d["reason"], "Upstream invocation 'boom' failed");
                (
                    d["op"].as_str().unwrap_or_default().to_string(),
                    d["definition"].as_str().unwrap_or_default().to_string(),
                )
            })
            .collect();
        skipped.sort();
        assert_eq!(
            skipped,
            vec![
                ("after_boom".to_string(), "work".to_string()),
                ("downstream".to_string(), "work".to_string()),
            ]
        );
        assert_eq!(
            sink.event_types().last().map(String::as_str),
            Some("pipeline.failed")
        );
    }

    #[tokio::test]
    async fn test_op_skip_does_not_block_dependents() {
        let op = Arc::new(RecordingOp::new());
        let pipeline = PipelineBuilder::new("skipping")
            .definition(OpDefinition::from_fn("maybe", |_ctx: &OpContext| {
                OpOutput::skip("nothing to do")
            }))
            .unwrap()
            .definition(OpDefinition::new("after", op.clone()))
            .unwrap()
            .invoke(InvocationSpec::new("maybe"))
            .invoke(InvocationSpec::new("after").depends_on("maybe"))
            .build()
            .unwrap();

        let result = pipeline.run().await.unwrap();

        assert_run_succeeded(&result);
        assert_invocation_status(&result, "maybe", OpStatus::Skip);
        assert_eq!(op.execution_for("after").unwrap().upstream, vec!["maybe"]);
    }

    #[tokio::test]
    async fn test_cancellation_stops_remaining_invocations() {
        let op = Arc::new(RecordingOp::new());
        let pipeline = PipelineBuilder::new("cancelled")
            .with_config(sequential())
            .definition(OpDefinition::from_fn("stop", |ctx: &OpContext| {
                ctx.pipeline_ctx().mark_cancelled_with_reason("operator request");
                OpOutput::ok_empty()
            }))
            .unwrap()
            .definition(OpDefinition::new("work", op.clone()))
            .unwrap()
            .invoke(InvocationSpec::new("stop"))
            .invoke(InvocationSpec::new("work").depends_on("stop"))
            .build()
            .unwrap();

        let (ctx, sink) = collecting_context(&pipeline);
        let result = pipeline.execute(ctx).await.unwrap();

        assert_run_failed(&result);
        assert_eq!(op.execution_count(), 0);
        assert_invocation_status(&result, "stop", OpStatus::Ok);
        assert_invocation_status(&result, "work", OpStatus::Cancel);
        assert_eq!(result.error.as_deref(), Some("Pipeline cancelled: operator request"));
        let cancelled = sink.events_of_type("op.cancelled");
        assert_eq!(cancelled.len(), 1);
        let cancelled = cancelled[0].1.as_ref().unwrap();
        assert_eq!(cancelled["op"], "work");
        assert_eq!(cancelled["definition"], "work");
        assert_eq!(cancelled["reason"], "operator request");
        assert_eq!(sink.events_of_type("pipeline.failed").len(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let op = Arc::new(RecordingOp::new());
        let pipeline = PipelineBuilder::new("never")
            .definition(OpDefinition::new("work", op.clone()))
            .unwrap()
            .invoke(InvocationSpec::new("work"))
            .build()
            .unwrap();

        let ctx = Arc::new(PipelineContext::new(RunIdentity::new()));
        ctx.mark_cancelled();

        let result = pipeline.execute(ctx).await.unwrap();

        assert_run_failed(&result);
        assert_eq!(op.execution_count(), 0);
        assert_invocation_status(&result, "work", OpStatus::Cancel);
        assert_eq!(result.error.as_deref(), Some("Pipeline cancelled: no reason given"));
        assert_eq!(
            result.output("work").unwrap().cancel_reason.as_deref(),
            Some("no reason given")
        );
    }

    #[tokio::test]
    async fn test_panicking_op_fails_invocation() {
        let pipeline = PipelineBuilder::new("panics")
            .definition(OpDefinition::from_fn("bad", |_ctx: &OpContext| -> OpOutput {
                panic!("op bug")
            }))
            .unwrap()
            .invoke(InvocationSpec::new("bad"))
            .build()
            .unwrap();

        let (ctx, sink) = collecting_context(&pipeline);
        let result = pipeline.execute(ctx).await.unwrap();

        assert_run_failed(&result);
        assert_eq!(
            result.output("bad").unwrap().error.as_deref(),
            Some("Op panicked")
        );
        assert_eq!(
            sink.event_types(),
            vec!["pipeline.started", "op.started", "op.failed", "pipeline.failed"]
        );
        let failed = sink.events_of_type("op.failed");
        let failed = failed[0].1.as_ref().unwrap();
        assert_eq!(failed["op"], "bad");
        assert_eq!(failed["definition"], "bad");
        assert_eq!(failed["error"], "Op panicked");
    }

    #[tokio::test]
    async fn test_max_concurrency_is_respected() {
        let probe = Arc::new(ConcurrencyProbe::default());
        let mut builder = PipelineBuilder::new("wide")
            .with_config(ExecutionConfig::new().with_max_concurrency(2))
            .definition(OpDefinition::new("probe", probe.clone()))
            .unwrap();
        for i in 0..5 {
            builder = builder.invoke(InvocationSpec::new("probe").with_alias(format!("probe_{i}")));
        }

        let result = builder.build().unwrap().run().await.unwrap();

        assert_run_succeeded(&result);
        assert_eq!(result.outputs.len(), 5);
        let peak = probe.peak.load(Ordering::SeqCst);
        assert!((1..=2).contains(&peak), "peak concurrency was {peak}");
    }

    #[tokio::test]
    async fn test_independent_invocations_run_in_parallel() {
        let mut builder = PipelineBuilder::new("parallel")
            .definition(OpDefinition::new("slow", Arc::new(SlowOp::with_delay_ms(50))))
            .unwrap();
        for i in 0..4 {
            builder = builder.invoke(InvocationSpec::new("slow").with_alias(format!("slow_{i}")));
        }

        let result = builder.build().unwrap().run().await.unwrap();

        assert_run_succeeded(&result);
        assert!(result.duration_ms < 180.0, "took {}ms", result.duration_ms);
    }

    #[tokio::test]
    async fn test_lifecycle_events() {
        let pipeline = PipelineBuilder::new("metadata_pipeline")
            .definition(metadata_solid(Arc::new(NoOp)))
            .unwrap()
            .invoke(aliased_invocation())
            .build()
            .unwrap();

        let (ctx, sink) = collecting_context(&pipeline);
        let run_id = ctx.run_id();
        let result = pipeline.execute(ctx).await.unwrap();

        assert_run_succeeded(&result);
        assert_eq!(result.run_id, run_id);
        assert_eq!(
            sink.event_types(),
            vec!["pipeline.started", "op.started", "op.completed", "pipeline.completed"]
        );

        let started_events = sink.events_of_type("op.started");
        let started = started_events[0].1.as_ref().unwrap();
        assert_eq!(started["op"], "aliased_metadata_solid");
        assert_eq!(started["definition"], "metadata_solid");
        assert_eq!(started["pipeline"], "metadata_pipeline");
        assert_eq!(
            started["tags"],
            serde_json::json!({"foo": "oof", "baz": "quux", "bip": "bop"})
        );
    }

    #[tokio::test]
    async fn test_pipeline_from_config_document() {
        let config = OpflowConfig::from_json_str(
            r#"{"execution": {"max_concurrency": 1, "fail_fast": false, "execution_mode": "test"}}"#,
        )
        .unwrap();

        let pipeline = PipelineBuilder::new("configured")
            .with_config(config.execution)
            .definition(OpDefinition::from_fn("mode", |ctx: &OpContext| {
                OpOutput::ok_value("mode", serde_json::json!(ctx.execution_mode()))
            }))
            .unwrap()
            .invoke(InvocationSpec::new("mode"))
            .build()
            .unwrap();

        let result = pipeline.run().await.unwrap();
        assert_eq!(
            result.output("mode").unwrap().get("mode"),
            Some(&serde_json::json!("test"))
        );
    }

    #[tokio::test]
    async fn test_invocations_from_json() {
        let specs: Vec<InvocationSpec> = serde_json::from_value(serde_json::json!([
            {"definition": "metadata_solid", "alias": "aliased_metadata_solid", "tags": {"foo": "oof", "bip": "bop"}},
            {"definition": "metadata_solid", "depends_on": ["aliased_metadata_solid"]}
        ]))
        .unwrap();

        let op = Arc::new(RecordingOp::new());
        let mut builder = PipelineBuilder::new("from_json")
            .definition(metadata_solid(op.clone()))
            .unwrap();
        for spec in specs {
            builder.add_invocation(spec);
        }

        let result = builder.build().unwrap().run().await.unwrap();

        assert_run_succeeded(&result);
        assert_tags_eq(
            &op.execution_for("aliased_metadata_solid").unwrap().tags,
            [("foo", "oof"), ("baz", "quux"), ("bip", "bop")],
        );
        assert_eq!(
            op.execution_for("metadata_solid").unwrap().upstream,
            vec!["aliased_metadata_solid"]
        );
    }
}
