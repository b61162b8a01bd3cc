//! Experiment orchestration
//!
//! One sequential pass, no retries: per synthetic namespace, snapshot the
//! standard kinds from WDS and WEC, then the custom kinds from ITS and WEC,
//! persisting every collection; afterwards reconstruct the timeline once
//! over the first namespace and emit the latency report.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::cli::{Cli, ExperimentMode};
use crate::collector::Collector;
use crate::latency::{self, LatencyReport};
use crate::record_store;
use crate::snapshot::StandardKind;
use crate::work::{APPLIED_MANIFEST_WORKS, MANIFEST_WORKS, WORK_STATUSES};

/// Label stamped by the transport layer onto custom resources, keyed by the
/// binding policy that owns them. The binding key equals the synthetic
/// namespace name.
const BINDING_LABEL_KEY: &str = "transport.kubestellar.io/originOwnerReferenceBindingKey";

/// Synthetic namespaces are perf-test-0 .. perf-test-{N-1}
pub fn namespace_name(index: usize) -> String {
    format!("perf-test-{index}")
}

/// Resolved run parameters; every value is explicit, nothing is read from
/// ambient process state.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub kubeconfig: PathBuf,
    pub wds_context: String,
    pub its_context: String,
    pub wec_context: String,
    pub num_namespaces: usize,
    pub output_dir: PathBuf,
    pub mode: ExperimentMode,
}

impl From<Cli> for RunConfig {
    fn from(cli: Cli) -> Self {
        Self {
            kubeconfig: cli.kubeconfig,
            wds_context: cli.wds_context,
            its_context: cli.its_context,
            wec_context: cli.wec_context,
            num_namespaces: cli.num_namespaces,
            output_dir: cli.output_dir,
            mode: cli.exp_type,
        }
    }
}

/// Connect to all three planes and run the requested experiment
pub async fn run(config: &RunConfig) -> Result<()> {
    let wds = Collector::connect(&config.kubeconfig, &config.wds_context).await?;
    let its = Collector::connect(&config.kubeconfig, &config.its_context).await?;
    let wec = Collector::connect(&config.kubeconfig, &config.wec_context).await?;

    match config.mode {
        ExperimentMode::Short => run_short(&wds, &its, &wec, config).await,
        ExperimentMode::Long => {
            // Placeholder; multi-sample collection over time is not built yet.
            warn!("long experiment collection not implemented yet");
            Ok(())
        }
    }
}

async fn run_short(
    wds: &Collector,
    its: &Collector,
    wec: &Collector,
    config: &RunConfig,
) -> Result<()> {
    fs::create_dir_all(&config.output_dir).with_context(|| {
        format!("failed to create output dir {}", config.output_dir.display())
    })?;

    for index in 0..config.num_namespaces {
        let namespace = namespace_name(index);
        let ns_dir = config.output_dir.join(&namespace);
        info!(%namespace, "collecting namespace snapshots");

        for kind in StandardKind::ALL {
            let kind = kind.as_str();
            let wds_records = wds.list_standard(kind, &namespace).await?;
            record_store::write_objects(&ns_dir, kind, "wds", &wds_records)?;

            let wec_records = wec.list_standard(kind, &namespace).await?;
            record_store::write_objects(&ns_dir, kind, "wec", &wec_records)?;
        }

        collect_custom_resources(its, wec, config, &namespace, &ns_dir).await?;
    }

    info!("gathering latency data");
    let stamps = latency::reconstruct(&config.output_dir, wds).await?;
    let report = LatencyReport::compute(stamps);

    print!("{}", report.console_text());
    let report_path = report
        .write_to(&config.output_dir)
        .with_context(|| "failed to write latency results")?;
    info!(path = %report_path.display(), "metrics written");

    Ok(())
}

/// Custom resources carry the cross-plane provenance: manifest works and the
/// relayed work statuses sit on the ITS, applied manifest works on the WEC.
async fn collect_custom_resources(
    its: &Collector,
    wec: &Collector,
    config: &RunConfig,
    namespace: &str,
    ns_dir: &std::path::Path,
) -> Result<()> {
    let selector = format!("{BINDING_LABEL_KEY}={namespace}");
    // On the ITS, the transport keeps these objects in the inventory
    // namespace named for the execution cluster.
    let its_namespace = config.wec_context.as_str();

    let manifests = its
        .list_custom(&MANIFEST_WORKS, Some(its_namespace), Some(&selector))
        .await?;
    record_store::write_works(ns_dir, MANIFEST_WORKS.plural, &manifests)?;

    let statuses = its
        .list_custom(&WORK_STATUSES, Some(its_namespace), Some(&selector))
        .await?;
    record_store::write_works(ns_dir, WORK_STATUSES.plural, &statuses)?;

    // Applied manifest works are cluster-wide on the WEC and carry no
    // binding label.
    let applied = wec.list_custom(&APPLIED_MANIFEST_WORKS, None, None).await?;
    record_store::write_works(ns_dir, APPLIED_MANIFEST_WORKS.plural, &applied)?;

    Ok(())
}
