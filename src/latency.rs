//! Lifecycle timeline reconstruction and latency interval computation
//!
//! The eight lifecycle instants are assembled from one live binding-policy
//! lookup plus the first data row of each snapshot file written for the
//! sampled namespace. Every latency interval is `later - earlier` for a
//! fixed named pair of instants; the pairs live in one const table so the
//! console and report renderings cannot disagree. A negative interval means
//! the observed event ordering violated the expected causal order (clock
//! skew, or a genuinely out-of-order run) and is surfaced as a sentinel,
//! never silently corrected.

use std::fs;
use std::path::Path;

use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::collector::{CollectError, Collector};
use crate::record_store::{self, StoreError, CREATED_COLUMN, STATUS_UPDATE_COLUMN};
use crate::snapshot::StandardKind;
use crate::work::{APPLIED_MANIFEST_WORKS, MANIFEST_WORKS, WORK_STATUSES};

/// Namespace whose snapshot files feed the reconstruction. The driver
/// synthesizes namespaces `perf-test-0..N-1`; the first one is the
/// measurement sample.
pub const SAMPLE_NAMESPACE: &str = "perf-test-0";

/// Well-known name of the singleton binding policy, the timeline's origin
pub const BINDING_POLICY_NAME: &str = "nginx-bpolicy";

/// Name of the durable report written next to the snapshot directories
pub const REPORT_FILE_NAME: &str = "latency_results.txt";

/// The eight named instants of one workload's propagation lifecycle.
/// `None` is the absent instant: its source record was unobtainable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LifecycleTimestamps {
    pub binding_create: Option<DateTime<Utc>>,
    pub wds_deploy_create: Option<DateTime<Utc>>,
    pub wds_deploy_status: Option<DateTime<Utc>>,
    pub manifest_work_create: Option<DateTime<Utc>>,
    pub applied_manifest_create: Option<DateTime<Utc>>,
    pub wec_deploy_create: Option<DateTime<Utc>>,
    pub wec_deploy_status: Option<DateTime<Utc>>,
    pub work_status_update: Option<DateTime<Utc>>,
}

/// Names the eight instants so interval pairs can be table data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stamp {
    BindingCreate,
    WdsDeployCreate,
    WdsDeployStatus,
    ManifestWorkCreate,
    AppliedManifestCreate,
    WecDeployCreate,
    WecDeployStatus,
    WorkStatusUpdate,
}

impl Stamp {
    pub fn label(self) -> &'static str {
        match self {
            Stamp::BindingCreate => "Binding Create",
            Stamp::WdsDeployCreate => "WDS Deploy Create",
            Stamp::WdsDeployStatus => "WDS Deploy Status",
            Stamp::ManifestWorkCreate => "Manifest Work Create",
            Stamp::AppliedManifestCreate => "Applied Manifest Create",
            Stamp::WecDeployCreate => "WEC Deploy Create",
            Stamp::WecDeployStatus => "WEC Deploy Status",
            Stamp::WorkStatusUpdate => "Work Status Update",
        }
    }

    /// Rendering order of the raw timestamp section of the report
    pub const ALL: [Stamp; 8] = [
        Stamp::BindingCreate,
        Stamp::WdsDeployCreate,
        Stamp::WdsDeployStatus,
        Stamp::ManifestWorkCreate,
        Stamp::AppliedManifestCreate,
        Stamp::WecDeployCreate,
        Stamp::WecDeployStatus,
        Stamp::WorkStatusUpdate,
    ];
}

impl LifecycleTimestamps {
    pub fn get(&self, stamp: Stamp) -> Option<DateTime<Utc>> {
        match stamp {
            Stamp::BindingCreate => self.binding_create,
            Stamp::WdsDeployCreate => self.wds_deploy_create,
            Stamp::WdsDeployStatus => self.wds_deploy_status,
            Stamp::ManifestWorkCreate => self.manifest_work_create,
            Stamp::AppliedManifestCreate => self.applied_manifest_create,
            Stamp::WecDeployCreate => self.wec_deploy_create,
            Stamp::WecDeployStatus => self.wec_deploy_status,
            Stamp::WorkStatusUpdate => self.work_status_update,
        }
    }
}

/// Reconstruction failures, one variant per assembly step so the failing
/// source is named in the error chain
#[derive(Error, Debug)]
pub enum ReconstructError {
    #[error("failed to get binding policy creation time: {0}")]
    BindingPolicy(#[source] CollectError),

    #[error("error reading WDS deployment timestamps: {0}")]
    WdsDeployment(#[source] StoreError),

    #[error("error reading WEC deployment timestamps: {0}")]
    WecDeployment(#[source] StoreError),

    #[error("error reading manifest work timestamps: {0}")]
    ManifestWork(#[source] StoreError),

    #[error("error reading applied manifest work timestamps: {0}")]
    AppliedManifestWork(#[source] StoreError),
}

impl LifecycleTimestamps {
    /// Assemble the timeline from the sampled namespace's snapshot files.
    ///
    /// Every step is fatal except the work-status read: a status that has
    /// not been reported yet is an expected state, so that instant falls
    /// back to absent and reconstruction continues.
    pub fn from_run_dir(
        output_dir: &Path,
        binding_create: DateTime<Utc>,
    ) -> Result<Self, ReconstructError> {
        let ns_dir = output_dir.join(SAMPLE_NAMESPACE);
        let deployments = StandardKind::Deployments.as_str();

        let wds_path = record_store::standard_file(&ns_dir, deployments, "wds");
        info!(path = %wds_path.display(), "reading WDS deployment timestamps");
        let (wds_deploy_create, wds_deploy_status) =
            record_store::read_timestamp_pair(&wds_path, CREATED_COLUMN, STATUS_UPDATE_COLUMN)
                .map_err(ReconstructError::WdsDeployment)?;

        let wec_path = record_store::standard_file(&ns_dir, deployments, "wec");
        info!(path = %wec_path.display(), "reading WEC deployment timestamps");
        let (wec_deploy_create, wec_deploy_status) =
            record_store::read_timestamp_pair(&wec_path, CREATED_COLUMN, STATUS_UPDATE_COLUMN)
                .map_err(ReconstructError::WecDeployment)?;

        let mw_path = record_store::custom_file(&ns_dir, MANIFEST_WORKS.plural);
        info!(path = %mw_path.display(), "reading manifest work timestamps");
        let manifest_work_create = record_store::read_first_timestamp(&mw_path, CREATED_COLUMN)
            .map_err(ReconstructError::ManifestWork)?;

        let amw_path = record_store::custom_file(&ns_dir, APPLIED_MANIFEST_WORKS.plural);
        info!(path = %amw_path.display(), "reading applied manifest work timestamps");
        let applied_manifest_create = record_store::read_first_timestamp(&amw_path, CREATED_COLUMN)
            .map_err(ReconstructError::AppliedManifestWork)?;

        let ws_path = record_store::custom_file(&ns_dir, WORK_STATUSES.plural);
        info!(path = %ws_path.display(), "reading work status timestamps");
        let work_status_update = match record_store::read_first_timestamp(&ws_path, CREATED_COLUMN)
        {
            Ok(instant) => Some(instant),
            Err(err) => {
                warn!(%err, "work status update time unavailable (normal if status has not been reported yet)");
                None
            }
        };

        Ok(Self {
            binding_create: Some(binding_create),
            wds_deploy_create: Some(wds_deploy_create),
            wds_deploy_status: Some(wds_deploy_status),
            manifest_work_create: Some(manifest_work_create),
            applied_manifest_create: Some(applied_manifest_create),
            wec_deploy_create: Some(wec_deploy_create),
            wec_deploy_status: Some(wec_deploy_status),
            work_status_update,
        })
    }
}

/// Reconstruct the timeline for a finished run: fetch the binding policy's
/// creation instant live from the origin plane, then read the snapshot files.
pub async fn reconstruct(
    output_dir: &Path,
    origin: &Collector,
) -> Result<LifecycleTimestamps, ReconstructError> {
    let binding_create = origin
        .binding_policy_created_at(BINDING_POLICY_NAME)
        .await
        .map_err(ReconstructError::BindingPolicy)?;
    info!(%binding_create, "binding policy created");

    LifecycleTimestamps::from_run_dir(output_dir, binding_create)
}

/// Report section an interval belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Section {
    Downsync,
    Upsync,
    EndToEnd,
}

impl Section {
    fn heading(self) -> &'static str {
        match self {
            Section::Downsync => "Downsync Metrics",
            Section::Upsync => "Upsync Metrics",
            Section::EndToEnd => "End-to-End Latency",
        }
    }

    const ALL: [Section; 3] = [Section::Downsync, Section::Upsync, Section::EndToEnd];
}

/// One row of the interval table: a name and its fixed (later, earlier) pair
pub struct IntervalSpec {
    pub name: &'static str,
    pub section: Section,
    pub later: Stamp,
    pub earlier: Stamp,
}

/// The nine named intervals. Order is the rendering order.
pub const INTERVALS: [IntervalSpec; 9] = [
    IntervalSpec {
        name: "Binding→WDS deploy",
        section: Section::Downsync,
        later: Stamp::WdsDeployCreate,
        earlier: Stamp::BindingCreate,
    },
    IntervalSpec {
        name: "Binding→Manifest pkg",
        section: Section::Downsync,
        later: Stamp::ManifestWorkCreate,
        earlier: Stamp::WdsDeployCreate,
    },
    IntervalSpec {
        name: "Manifest→Applied MW",
        section: Section::Downsync,
        later: Stamp::ManifestWorkCreate,
        earlier: Stamp::AppliedManifestCreate,
    },
    IntervalSpec {
        name: "Applied MW→WEC deploy",
        section: Section::Downsync,
        later: Stamp::WecDeployCreate,
        earlier: Stamp::AppliedManifestCreate,
    },
    IntervalSpec {
        name: "Total Downsync",
        section: Section::Downsync,
        later: Stamp::WecDeployCreate,
        earlier: Stamp::WdsDeployCreate,
    },
    IntervalSpec {
        name: "WEC status→WDS status",
        section: Section::Upsync,
        later: Stamp::WdsDeployStatus,
        earlier: Stamp::WorkStatusUpdate,
    },
    IntervalSpec {
        name: "WEC status→WDS final",
        section: Section::Upsync,
        later: Stamp::WdsDeployStatus,
        earlier: Stamp::WecDeployStatus,
    },
    IntervalSpec {
        name: "Total Upsync",
        section: Section::Upsync,
        later: Stamp::WdsDeployStatus,
        earlier: Stamp::WecDeployStatus,
    },
    IntervalSpec {
        name: "End-to-End",
        section: Section::EndToEnd,
        later: Stamp::WdsDeployStatus,
        earlier: Stamp::WdsDeployCreate,
    },
];

/// A computed interval. `None` means one of the source instants was absent;
/// negative values are kept as data and rendered as a sentinel.
#[derive(Debug, Clone, PartialEq)]
pub struct Interval {
    pub name: &'static str,
    pub section: Section,
    pub value: Option<TimeDelta>,
}

/// The computed latency breakdown plus the raw instants it derives from
#[derive(Debug, Clone)]
pub struct LatencyReport {
    pub stamps: LifecycleTimestamps,
    pub intervals: Vec<Interval>,
}

impl LatencyReport {
    /// Compute all nine intervals from the reconstructed timeline
    pub fn compute(stamps: LifecycleTimestamps) -> Self {
        let intervals = INTERVALS
            .iter()
            .map(|spec| Interval {
                name: spec.name,
                section: spec.section,
                value: match (stamps.get(spec.later), stamps.get(spec.earlier)) {
                    (Some(later), Some(earlier)) => Some(later - earlier),
                    _ => None,
                },
            })
            .collect();

        Self { stamps, intervals }
    }

    pub fn interval(&self, name: &str) -> Option<&Interval> {
        self.intervals.iter().find(|i| i.name == name)
    }

    fn intervals_block(&self) -> String {
        let mut block = String::new();
        for section in Section::ALL {
            block.push('\n');
            block.push_str(section.heading());
            block.push('\n');
            block.push_str(&"-".repeat(section.heading().len()));
            block.push('\n');
            for interval in self.intervals.iter().filter(|i| i.section == section) {
                block.push_str(&format!(
                    "{:<24} {}\n",
                    format!("{}:", interval.name),
                    render_duration(interval.value)
                ));
            }
        }
        block
    }

    fn timestamps_block(&self) -> String {
        let mut block = String::new();
        for stamp in Stamp::ALL {
            let rendered = match self.stamps.get(stamp) {
                Some(instant) => instant.to_rfc3339_opts(SecondsFormat::Secs, true),
                None => "unavailable".to_string(),
            };
            block.push_str(&format!("{:<24} {rendered}\n", format!("{}:", stamp.label())));
        }
        block
    }

    /// Console summary: the interval sections under a banner
    pub fn console_text(&self) -> String {
        format!(
            "\n====== Multi-Cluster Propagation Latency ======\n{}\n===============================================\n",
            self.intervals_block()
        )
    }

    /// Durable report: raw timestamps for audit, then the interval sections
    pub fn file_text(&self) -> String {
        format!(
            "Multi-Cluster Propagation Latency Report\n\nTimestamps\n----------\n{}{}",
            self.timestamps_block(),
            self.intervals_block()
        )
    }

    /// Write the durable report under the run's output directory
    pub fn write_to(&self, output_dir: &Path) -> std::io::Result<std::path::PathBuf> {
        let path = output_dir.join(REPORT_FILE_NAME);
        fs::write(&path, self.file_text())?;
        Ok(path)
    }
}

/// Millisecond-resolution rendering with explicit sentinels for intervals
/// that cannot be trusted
pub fn render_duration(value: Option<TimeDelta>) -> String {
    match value {
        None => "N/A (timestamp unavailable)".to_string(),
        Some(d) if d < TimeDelta::zero() => "N/A (invalid timestamp order)".to_string(),
        Some(d) => {
            let ms = d.num_milliseconds();
            let minutes = ms / 60_000;
            let rest = ms % 60_000;
            if minutes > 0 {
                format!("{minutes}m{}.{:03}s", rest / 1_000, rest % 1_000)
            } else {
                format!("{}.{:03}s", rest / 1_000, rest % 1_000)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    fn plus(secs: i64) -> Option<DateTime<Utc>> {
        Some(t0() + TimeDelta::seconds(secs))
    }

    /// The causally-ordered reference run: binding at T0, downsync through
    /// T0+4s, upsync through T0+7s.
    fn ordered_stamps() -> LifecycleTimestamps {
        LifecycleTimestamps {
            binding_create: plus(0),
            wds_deploy_create: plus(1),
            manifest_work_create: plus(2),
            applied_manifest_create: plus(3),
            wec_deploy_create: plus(4),
            wec_deploy_status: plus(5),
            work_status_update: plus(6),
            wds_deploy_status: plus(7),
        }
    }

    #[test]
    fn test_intervals_match_fixed_pairs() {
        let report = LatencyReport::compute(ordered_stamps());

        let expect = [
            ("Binding→WDS deploy", 1),
            ("Binding→Manifest pkg", 1),
            ("Manifest→Applied MW", -1),
            ("Applied MW→WEC deploy", 1),
            ("Total Downsync", 3),
            ("WEC status→WDS status", 1),
            ("WEC status→WDS final", 2),
            ("Total Upsync", 2),
            ("End-to-End", 6),
        ];
        for (name, secs) in expect {
            let interval = report.interval(name).unwrap();
            assert_eq!(
                interval.value,
                Some(TimeDelta::seconds(secs)),
                "interval {name}"
            );
        }
    }

    #[test]
    fn test_reference_run_totals() {
        let report = LatencyReport::compute(ordered_stamps());
        assert_eq!(
            report.interval("Total Downsync").unwrap().value,
            Some(TimeDelta::seconds(3))
        );
        assert_eq!(
            report.interval("Total Upsync").unwrap().value,
            Some(TimeDelta::seconds(2))
        );
        assert_eq!(
            report.interval("End-to-End").unwrap().value,
            Some(TimeDelta::seconds(6))
        );
    }

    #[test]
    fn test_absent_work_status_yields_unavailable_sentinel() {
        let mut stamps = ordered_stamps();
        stamps.work_status_update = None;
        let report = LatencyReport::compute(stamps);

        let interval = report.interval("WEC status→WDS status").unwrap();
        assert_eq!(interval.value, None);
        assert_eq!(
            render_duration(interval.value),
            "N/A (timestamp unavailable)"
        );

        // Every other interval is unaffected by the missing status report.
        for interval in &report.intervals {
            if interval.name != "WEC status→WDS status" {
                assert!(interval.value.is_some(), "interval {}", interval.name);
            }
        }
    }

    #[test]
    fn test_negative_interval_renders_invalid_order_sentinel() {
        let mut stamps = ordered_stamps();
        // Status relayed after the WDS already recorded it: skewed clocks.
        stamps.work_status_update = plus(9);
        let report = LatencyReport::compute(stamps);

        let interval = report.interval("WEC status→WDS status").unwrap();
        assert_eq!(interval.value, Some(TimeDelta::seconds(-2)));
        assert_eq!(
            render_duration(interval.value),
            "N/A (invalid timestamp order)"
        );
    }

    #[test]
    fn test_render_duration_millisecond_resolution() {
        assert_eq!(render_duration(Some(TimeDelta::zero())), "0.000s");
        assert_eq!(
            render_duration(Some(TimeDelta::milliseconds(1_500))),
            "1.500s"
        );
        assert_eq!(
            render_duration(Some(TimeDelta::milliseconds(61_002))),
            "1m1.002s"
        );
    }

    #[test]
    fn test_console_and_file_render_from_one_computation() {
        let report = LatencyReport::compute(ordered_stamps());
        let console = report.console_text();
        let file = report.file_text();

        for interval in &report.intervals {
            let line = format!(
                "{:<24} {}",
                format!("{}:", interval.name),
                render_duration(interval.value)
            );
            assert!(console.contains(&line), "console missing {}", interval.name);
            assert!(file.contains(&line), "file missing {}", interval.name);
        }
        // Raw instants only appear in the durable form.
        assert!(file.contains("Binding Create:"));
        assert!(!console.contains("Binding Create:"));
    }

    #[test]
    fn test_file_text_renders_absent_stamp() {
        let mut stamps = ordered_stamps();
        stamps.work_status_update = None;
        let report = LatencyReport::compute(stamps);
        assert!(report.file_text().contains("Work Status Update:      unavailable"));
    }
}
