mod cmd;
mod locate;
mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "pipesynth",
    about = "Synthesize the workshop delivery pipeline (source, code quality, deploy) into a CloudFormation template",
    version,
    propagate_version = true
)]
struct Cli {
    /// Context file (default: nearest cdk.json walking up from the current directory)
    #[arg(long, global = true, env = "PIPESYNTH_CONTEXT")]
    context: Option<PathBuf>,

    /// Environment to synthesize (default: the context's environmentType)
    #[arg(long = "env", global = true, env = "PIPESYNTH_ENV")]
    environment: Option<String>,

    /// Target AWS account (overrides the environment's 'account')
    #[arg(long, global = true, env = "CDK_DEFAULT_ACCOUNT")]
    account: Option<String>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Assemble the pipeline and write its template
    Synth {
        /// Directory the template is written to
        #[arg(long, default_value = pipesynth_core::paths::DEFAULT_OUT_DIR)]
        out: PathBuf,

        /// Source checkout; when set, the deploy build spec must exist in it
        #[arg(long)]
        source_dir: Option<PathBuf>,

        /// Print the template instead of writing it
        #[arg(long)]
        stdout: bool,
    },

    /// Validate the selected environment's context
    Validate,

    /// Show stages, actions and artifacts
    Topology,

    /// Print the deploy job's permission policy
    Policy,

    /// Print the build spec of a code-quality job
    Buildspec {
        /// linter, unit-testing, cfn-nag, dependencies-audit or git-secrets
        job: String,
    },

    /// List environments defined in the context
    Envs,
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let context_path = locate::resolve_context(cli.context.as_deref());
    let target = cmd::Target {
        context: &context_path,
        environment: cli.environment.as_deref(),
        account: cli.account.as_deref(),
    };

    let result = match cli.command {
        Commands::Synth {
            out,
            source_dir,
            stdout,
        } => cmd::synth::run(&target, &out, source_dir.as_deref(), stdout, cli.json),
        Commands::Validate => cmd::validate::run(&target, cli.json),
        Commands::Topology => cmd::topology::run(&target, cli.json),
        Commands::Policy => cmd::policy::run(&target),
        Commands::Buildspec { job } => cmd::buildspec::run(&target, &job, cli.json),
        Commands::Envs => cmd::envs::run(&target, cli.json),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
