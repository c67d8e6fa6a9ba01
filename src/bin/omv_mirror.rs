use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::Parser;
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use omv_mirror::app::App;
use omv_mirror::client::OmvHttpClient;
use omv_mirror::config::ConfigLoader;
use omv_mirror::domain::CaseId;
use omv_mirror::error::MirrorError;
use omv_mirror::store::Store;

#[derive(Parser)]
#[command(name = "omv-mirror")]
#[command(about = "Mirror every attachment of an Omgevingsloket case into ./<OMV number>")]
#[command(version, author)]
struct Cli {
    /// Case number, with or without the OMV_ prefix (e.g. OMV_2023123456)
    case_id: String,

    #[arg(long)]
    config: Option<String>,

    /// Directory the case directory is created in
    #[arg(long)]
    output: Option<Utf8PathBuf>,

    /// Maximum number of requests and file syncs in flight
    #[arg(long)]
    concurrency: Option<usize>,

    #[arg(long)]
    no_report: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<MirrorError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &MirrorError) -> u8 {
    match error {
        MirrorError::InvalidCaseId(_)
        | MirrorError::ConfigRead(_)
        | MirrorError::ConfigParse(_)
        | MirrorError::InvalidConfig(_) => 2,
        MirrorError::Http { .. } | MirrorError::Status { .. } | MirrorError::Decode { .. } => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let case: CaseId = cli.case_id.parse()?;

    let mut config = ConfigLoader::resolve(cli.config.as_deref())?;
    if let Some(output) = cli.output {
        config.output_dir = output;
    }
    if let Some(concurrency) = cli.concurrency {
        config.sync.concurrency = concurrency;
    }
    if cli.no_report {
        config.sync.report = false;
    }

    let client = OmvHttpClient::new(&config.api_root, config.request_timeout)?;
    let app = App::new(Store::new(config.output_dir.clone()), client);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .into_diagnostic()?;
    let result = runtime.block_on(app.sync(&case, &config.sync, chrono::Utc::now()))?;

    println!(
        "{}: {} files ({} downloaded, {} up to date) -> {}",
        result.case_id, result.files, result.downloaded, result.up_to_date, result.manifest_path
    );
    if result.mismatched > 0 {
        println!(
            "{} downloaded files did not match their recorded hash; run again to re-fetch them",
            result.mismatched
        );
    }
    Ok(())
}
