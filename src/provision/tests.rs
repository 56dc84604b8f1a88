//! Unit tests for the provisioning orchestrator.

use std::time::{Duration, UNIX_EPOCH};

use crate::backend::{ResourceKind, ResourceStatus, TableAttributes};
use crate::plan::{ProvisionPlan, RunContext};
use crate::run_id::RunId;
use crate::test_support::{
    MemoryRegistry, RecordingProgress, ScriptedBackend, ScriptedBackendError, ScriptedOp,
};

use super::{ProvisionError, ProvisionOrchestrator};

fn context(target_regions: &[&str]) -> RunContext {
    RunContext {
        project: String::from("demo"),
        run_id: RunId::from_clock(UNIX_EPOCH + Duration::from_secs(1_695_020_400)),
        source_region: String::from("us-east-1"),
        target_regions: target_regions.iter().map(|region| (*region).to_owned()).collect(),
    }
}

fn plan(target_regions: &[&str]) -> ProvisionPlan {
    ProvisionPlan::resolve(&context(target_regions), &TableAttributes::default())
        .unwrap_or_else(|err| panic!("resolve plan: {err}"))
}

fn orchestrator(
    backend: ScriptedBackend,
    writer: MemoryRegistry,
) -> ProvisionOrchestrator<ScriptedBackend, MemoryRegistry, RecordingProgress> {
    ProvisionOrchestrator::new(backend, writer, RecordingProgress::new())
}

#[tokio::test]
async fn happy_path_creates_every_resource_in_order() {
    let backend = ScriptedBackend::new();
    let writer = MemoryRegistry::new();
    let target = plan(&["us-west-2", "eu-west-1"]);

    let outcome = orchestrator(backend.clone(), writer.clone())
        .execute(&target)
        .await
        .unwrap_or_else(|err| panic!("run should succeed: {err}"));

    assert_eq!(outcome.resources.len(), 6);
    assert!(
        outcome
            .resources
            .iter()
            .all(|resource| resource.status == ResourceStatus::Active)
    );
    let regions: Vec<&str> = outcome
        .resources
        .iter()
        .map(|resource| resource.resource.region.as_str())
        .collect();
    assert_eq!(
        regions,
        ["us-east-1", "us-east-1", "us-west-2", "us-west-2", "eu-west-1", "eu-west-1"]
    );
    // One save per resource keeps partial progress on disk at all times.
    assert_eq!(writer.save_count(), 6);
    let ops = backend.operations();
    assert_eq!(ops.len(), 12, "create+wait per resource: {ops:?}");
}

#[tokio::test]
async fn source_conflict_aborts_before_any_target_attempt() {
    let ctx = context(&["us-west-2"]);
    let source_bucket = ctx.source_bucket_name();
    let backend = ScriptedBackend::new();
    backend.fail(
        &source_bucket,
        ScriptedOp::Create,
        ScriptedBackendError::Conflict(source_bucket.clone()),
    );
    let writer = MemoryRegistry::new();

    let aborted = orchestrator(backend.clone(), writer.clone())
        .execute(&plan(&["us-west-2"]))
        .await
        .err()
        .unwrap_or_else(|| panic!("run should abort"));

    assert!(aborted.created.is_empty());
    assert!(matches!(aborted.error, ProvisionError::Create { .. }));
    assert_eq!(writer.save_count(), 0);
    let ops = backend.operations();
    assert_eq!(ops, [format!("create-bucket {source_bucket}")]);
}

#[tokio::test]
async fn partial_target_failure_keeps_earlier_entries_and_reports_ledger() {
    let ctx = context(&["us-west-2", "eu-west-1"]);
    let failing = ctx.target_bucket_name("eu-west-1");
    let backend = ScriptedBackend::new();
    backend.fail(
        &failing,
        ScriptedOp::Create,
        ScriptedBackendError::Provider(failing.clone()),
    );
    let writer = MemoryRegistry::new();

    let aborted = orchestrator(backend, writer.clone())
        .execute(&plan(&["us-west-2", "eu-west-1"]))
        .await
        .err()
        .unwrap_or_else(|| panic!("run should abort"));

    // Source bucket+table and the full us-west-2 pair made it.
    assert_eq!(aborted.created.len(), 4);
    let last_region = aborted
        .created
        .last()
        .map(|resource| resource.resource.region.clone());
    assert_eq!(last_region.as_deref(), Some("us-west-2"));

    let registry = writer
        .latest()
        .unwrap_or_else(|| panic!("registry should have been saved"));
    assert_eq!(registry.targets.len(), 1);
    assert_eq!(
        registry
            .targets
            .first()
            .and_then(|entry| entry.bucket.as_deref()),
        Some(ctx.target_bucket_name("us-west-2").as_str())
    );
}

#[tokio::test]
async fn wait_timeout_is_reported_distinctly_from_conflicts() {
    let ctx = context(&["us-west-2"]);
    let source_table = ctx.source_table_name();
    let backend = ScriptedBackend::new();
    backend.fail(
        &source_table,
        ScriptedOp::Wait,
        ScriptedBackendError::Timeout(source_table.clone()),
    );

    let aborted = orchestrator(backend, MemoryRegistry::new())
        .execute(&plan(&["us-west-2"]))
        .await
        .err()
        .unwrap_or_else(|| panic!("run should abort"));

    let ProvisionError::Wait { source, .. } = &aborted.error else {
        panic!("expected a wait failure, got {:?}", aborted.error);
    };
    assert!(matches!(source, ScriptedBackendError::Timeout(_)));
    // The source bucket activated; the table was created but never became
    // active, so the ledger carries both, the table marked failed.
    assert_eq!(aborted.created.len(), 2);
    let statuses: Vec<ResourceStatus> = aborted
        .created
        .iter()
        .map(|resource| resource.status)
        .collect();
    assert_eq!(statuses, [ResourceStatus::Active, ResourceStatus::Failed]);
}

#[tokio::test]
async fn cancelled_wait_aborts_with_the_ledger() {
    let ctx = context(&["us-west-2"]);
    let target_bucket = ctx.target_bucket_name("us-west-2");
    let backend = ScriptedBackend::new();
    backend.fail(
        &target_bucket,
        ScriptedOp::Wait,
        ScriptedBackendError::Cancelled(target_bucket.clone()),
    );

    let aborted = orchestrator(backend, MemoryRegistry::new())
        .execute(&plan(&["us-west-2"]))
        .await
        .err()
        .unwrap_or_else(|| panic!("run should abort"));

    let ProvisionError::Wait { source, .. } = &aborted.error else {
        panic!("expected a wait failure, got {:?}", aborted.error);
    };
    assert!(matches!(source, ScriptedBackendError::Cancelled(_)));
    // Both source resources activated; the interrupted bucket is still in
    // the ledger so the operator knows it exists remotely.
    assert_eq!(aborted.created.len(), 3);
    assert_eq!(
        aborted.created.last().map(|resource| resource.status),
        Some(ResourceStatus::Failed)
    );
}

#[tokio::test]
async fn registry_write_failure_is_fatal() {
    let backend = ScriptedBackend::new();
    let writer = MemoryRegistry::new();
    writer.fail_after(1);

    let aborted = orchestrator(backend, writer)
        .execute(&plan(&["us-west-2"]))
        .await
        .err()
        .unwrap_or_else(|| panic!("run should abort"));

    assert!(matches!(aborted.error, ProvisionError::Registry { .. }));
    // The second resource had activated before its registry save failed.
    assert_eq!(aborted.created.len(), 2);
    assert_eq!(
        aborted.created.last().map(|resource| resource.status),
        Some(ResourceStatus::Active)
    );
}

#[tokio::test]
async fn end_to_end_names_match_the_templates() {
    let ctx = context(&["us-west-2", "eu-west-1"]);
    let suffix = ctx.run_id.to_string();
    let outcome = orchestrator(ScriptedBackend::new(), MemoryRegistry::new())
        .execute(&plan(&["us-west-2", "eu-west-1"]))
        .await
        .unwrap_or_else(|err| panic!("run should succeed: {err}"));

    let buckets: Vec<String> = outcome
        .resources
        .iter()
        .filter(|resource| resource.resource.kind == ResourceKind::Bucket)
        .map(|resource| resource.resource.name.clone())
        .collect();
    assert_eq!(
        buckets,
        [
            format!("demo-source-{suffix}"),
            format!("demo-target-us-west-2-{suffix}"),
            format!("demo-target-eu-west-1-{suffix}"),
        ]
    );
    assert_eq!(
        outcome.registry.source_bucket.as_deref(),
        Some(format!("demo-source-{suffix}").as_str())
    );
}
