//! CLI argument parsing for Syncmeter

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Experiment mode selecting how collection is scheduled
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExperimentMode {
    /// One-shot collection pass followed by latency reconstruction
    #[value(name = "s")]
    Short,
    /// Multi-sample collection over time (not implemented yet)
    #[value(name = "l")]
    Long,
}

#[derive(Parser, Debug)]
#[command(name = "syncmeter")]
#[command(version)]
#[command(
    about = "Collect workload propagation latency across WDS/ITS/WEC planes",
    long_about = None
)]
pub struct Cli {
    /// Path to the kubeconfig holding all three plane contexts
    pub kubeconfig: PathBuf,

    /// Kubeconfig context of the workload definition space
    pub wds_context: String,

    /// Kubeconfig context of the inventory/transport space
    pub its_context: String,

    /// Kubeconfig context of the workload execution cluster
    pub wec_context: String,

    /// Number of perf-test namespaces to collect
    pub num_namespaces: usize,

    /// Directory receiving the snapshot records and the latency report
    pub output_dir: PathBuf,

    /// Experiment type: s = short (one-shot), l = long-running
    #[arg(value_enum, default_value = "s")]
    pub exp_type: ExperimentMode,
}
