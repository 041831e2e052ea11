use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use tracing::info_span;
use uuid::Uuid;

use bpflock::config::{DEFAULT_BPFFS, DEFAULT_OBJECT_PATH, DEFAULT_PIN_PREFIX};
use bpflock::deploy::{self, DeployError, DeploymentReport, Step};
use bpflock::ebpf::AyaLoader;
use bpflock::{logging, metrics, policy, security, Settings};

const EXAMPLES: &str = "\
EXAMPLES:
  # Allow profile: BPF is allowed.
  bpfrestrict --profile=allow

  # Baseline profile: restrict BPF system call to tasks in initial pid namespace.
  bpfrestrict --profile=baseline

  # Baseline profile: restrict BPF to tasks in initial pid namespace and
  # block the BPF load program command.
  bpfrestrict --profile=baseline --block=prog_load

  # Restricted profile: deny BPF system call for all.
  bpfrestrict --profile=restricted";

/// Exit status when the hooks are already deployed (EALREADY)
const EXIT_ALREADY_ACTIVE: u8 = 114;

/// Exit status for invalid arguments (EX_USAGE)
const EXIT_USAGE: u8 = 64;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

/// bpflock bpfrestrict - restrict access to BPF system call.
#[derive(Debug, Parser)]
#[command(name = "bpfrestrict", version, after_help = EXAMPLES)]
struct Cli {
    /// Profile to apply: allow, baseline or restricted [default: allow]
    #[arg(short, long, value_name = "PROFILE")]
    profile: Option<String>,

    /// Block BPF commands: map_create, prog_load, btf_load, bpf_write
    #[arg(short, long, value_name = "CMD")]
    block: Option<String>,

    /// Mount point of the BPF filesystem
    #[arg(long, env = "BPFLOCK_BPFFS", default_value = DEFAULT_BPFFS)]
    bpffs: PathBuf,

    /// Directory under the bpffs shared by bpflock tools
    #[arg(long, env = "BPFLOCK_PREFIX", default_value = DEFAULT_PIN_PREFIX)]
    prefix: String,

    /// Pre-built bpfrestrict BPF object
    #[arg(long, env = "BPFLOCK_OBJECT", default_value = DEFAULT_OBJECT_PATH)]
    object: PathBuf,

    /// Write Prometheus metrics to this textfile on exit
    #[arg(long, env = "BPFLOCK_METRICS_FILE")]
    metrics_file: Option<PathBuf>,

    /// Log filter (e.g. "debug", "bpflock=trace"); RUST_LOG when unset
    #[arg(long, env = "BPFLOCK_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: text or json
    #[arg(long, env = "BPFLOCK_LOG_FORMAT", default_value = "text")]
    log_format: String,

    /// Report format on stdout
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,

    /// Skip the BPF LSM, capability and memlock checks
    #[arg(long)]
    skip_preflight: bool,
}

impl Cli {
    fn settings(&self) -> Settings {
        Settings {
            bpffs: self.bpffs.clone(),
            prefix: self.prefix.clone(),
            object: self.object.clone(),
            metrics_file: self.metrics_file.clone(),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = logging::init_logging(cli.log_level.as_deref(), &cli.log_format) {
        eprintln!("bpflock: failed to initialize logging: {}", e);
    }

    let settings = cli.settings();
    if let Err(e) = settings.validate() {
        eprintln!("bpflock: error: {}", e);
        return ExitCode::from(EXIT_USAGE);
    }

    let run_id = Uuid::now_v7();
    let span = info_span!("bpfrestrict", run_id = %run_id);
    let _guard = span.enter();

    let layout = settings.layout();
    let (report, code) = conclude(run(&cli, &settings), layout.root());

    if let Some(path) = &settings.metrics_file {
        if let Err(e) = metrics::write_textfile(path) {
            tracing::warn!(path = %path.display(), error = %e, "failed to write metrics");
        }
    }

    print_report(&report, cli.output);
    code
}

fn run(cli: &Cli, settings: &Settings) -> Result<bpflock::Deployment, DeployError> {
    let config = policy::resolve(cli.profile.as_deref(), cli.block.as_deref())
        .map_err(DeployError::from);
    metrics::record_step(Step::Resolve, config.is_ok());
    let config = config?;
    tracing::info!(
        profile = %config.profile,
        blocked = ?config.blocked.names(),
        "policy resolved"
    );

    if cli.skip_preflight {
        tracing::warn!("preflight checks skipped");
    } else {
        let checked = security::run_preflight();
        metrics::record_step(Step::Preflight, checked.is_ok());
        checked?;
    }

    let mut loader = AyaLoader::new(settings.object.clone());
    deploy::deploy(&mut loader, &settings.layout(), config)
}

/// Set the gauges for the run's outcome and build its report.
fn conclude(
    result: Result<bpflock::Deployment, DeployError>,
    root: &Path,
) -> (DeploymentReport, ExitCode) {
    match result {
        Ok(deployment) => {
            metrics::set_active(Some(deployment.config.profile));
            (DeploymentReport::active(&deployment), ExitCode::SUCCESS)
        }
        Err(e) => {
            if e.is_already_active() {
                tracing::info!(root = %root.display(), "deployment already active");
                metrics::set_found_active();
            } else {
                metrics::set_active(None);
            }
            let code = ExitCode::from(exit_status(&e));
            (DeploymentReport::failed(&e, root), code)
        }
    }
}

fn exit_status(e: &DeployError) -> u8 {
    match e {
        DeployError::AlreadyActive { .. } => EXIT_ALREADY_ACTIVE,
        DeployError::InputTooLong(_) => EXIT_USAGE,
        _ => 1,
    }
}

fn print_report(report: &DeploymentReport, format: OutputFormat) {
    match format {
        OutputFormat::Json => match serde_json::to_string_pretty(report) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("bpflock: failed to encode report: {}", e),
        },
        OutputFormat::Text => match report.outcome {
            deploy::Outcome::Failed => eprintln!("bpflock: error: {}", report.message),
            _ => println!("bpflock: {}", report.message),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bpflock::metrics::{RESTRICT_ACTIVE, RESTRICT_PROFILE};

    #[test]
    fn test_exit_status_mapping() {
        let root = PathBuf::from("/sys/fs/bpf/bpflock/bpfrestrict");
        assert_eq!(exit_status(&DeployError::AlreadyActive { root: root.clone() }), 114);
        assert_eq!(exit_status(&DeployError::PartialDeployment { root }), 1);

        let long = "a".repeat(64);
        let err: DeployError = policy::resolve(Some(&long), None).unwrap_err().into();
        assert_eq!(exit_status(&err), 64);
    }

    #[test]
    fn test_already_active_sets_gauge() {
        let root = Path::new("/sys/fs/bpf/bpflock/bpfrestrict");
        let err = DeployError::AlreadyActive {
            root: root.to_path_buf(),
        };
        let (report, _) = conclude(Err(err), root);

        assert_eq!(report.outcome, deploy::Outcome::AlreadyActive);
        assert_eq!(RESTRICT_ACTIVE.get(), 1);
        assert_eq!(RESTRICT_PROFILE.get(), 0);
    }

    #[test]
    fn test_cli_parses_profile_and_block() {
        let cli = Cli::try_parse_from(["bpfrestrict", "-p", "baseline", "--block", "prog_load"])
            .unwrap();
        assert_eq!(cli.profile.as_deref(), Some("baseline"));
        assert_eq!(cli.block.as_deref(), Some("prog_load"));
        assert!(!cli.skip_preflight);
    }
}
