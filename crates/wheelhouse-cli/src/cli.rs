use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

pub const WHEELHOUSE_HELP_TEMPLATE: &str =
    "{before-help}\nUsage:\n    {usage}\n\nGlobal options:\n{options}\n";

pub const WHEELHOUSE_BEFORE_HELP: &str = concat!(
    "wheelhouse ",
    env!("CARGO_PKG_VERSION"),
    " – offline wheel mirror builder\n\n",
    "\x1b[1;36mCommands\x1b[0m\n",
    "  resolve          Print the wheel URLs the wishlist needs for one target.\n",
    "  mirror           Download those wheels into a local PEP 503 index for pip.\n",
);

#[derive(Parser, Debug)]
#[command(
    name = "wheelhouse",
    author,
    version,
    propagate_version = false,
    disable_help_subcommand = true,
    before_help = WHEELHOUSE_BEFORE_HELP,
    help_template = WHEELHOUSE_HELP_TEMPLATE
)]
#[allow(clippy::struct_excessive_bools)]
pub struct WheelhouseCli {
    #[arg(
        short,
        long,
        help = "Suppress human output (errors still print to stderr)",
        global = true
    )]
    pub quiet: bool,
    #[arg(
        short,
        long,
        action = ArgAction::Count,
        help = "Increase logging (-vv reaches trace)",
        global = true
    )]
    pub verbose: u8,
    #[arg(long, help = "Force trace logging regardless of -v/-q", global = true)]
    pub trace: bool,
    #[arg(
        long,
        help = "Emit {status,code,message,details} JSON envelopes",
        global = true
    )]
    pub json: bool,
    #[arg(long, help = "Disable colored human output", global = true)]
    pub no_color: bool,
    #[command(subcommand)]
    pub command: CommandGroupCli,
}

#[derive(Subcommand, Debug)]
pub enum CommandGroupCli {
    #[command(
        about = "Resolve the wishlist and print every wheel URL it needs.",
        override_usage = "wheelhouse resolve [--platform TAG] [--python DIGITS] [PACKAGE ...]",
        after_help = "Examples:\n  wheelhouse resolve --platform win_amd64 --python 312 requests\n  wheelhouse resolve --wishlist ops/wishlist.txt --json"
    )]
    Resolve(ResolveArgs),
    #[command(
        about = "Resolve the wishlist and download the wheels into an offline mirror.",
        override_usage = "wheelhouse mirror [--output DIR] [--dry-run] [PACKAGE ...]",
        after_help = "Examples:\n  wheelhouse mirror --output ./offline_mirror\n  wheelhouse mirror --platform macosx_11_0_arm64 --python 311 --dry-run numpy\n\nInstall from the mirror with:\n  pip install --index-url file://$PWD/offline_mirror/ <package>"
    )]
    Mirror(MirrorArgs),
}

#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    #[arg(
        long,
        env = "WHEELHOUSE_PLATFORM",
        default_value = "manylinux_2_17_x86_64",
        value_name = "TAG",
        help = "Platform tag of the target machine"
    )]
    pub platform: String,
    #[arg(
        long,
        env = "WHEELHOUSE_PYTHON",
        default_value = "311",
        value_name = "DIGITS",
        help = "Interpreter version as bare digits, e.g. 311 for 3.11"
    )]
    pub python: String,
    #[arg(
        long,
        env = "WHEELHOUSE_IMPLEMENTATION",
        default_value = "cp",
        value_name = "ABBR",
        help = "Interpreter implementation (cp or pp)"
    )]
    pub implementation: String,
    #[arg(
        long,
        env = "WHEELHOUSE_WISHLIST",
        default_value = "wishlist.txt",
        value_name = "FILE",
        help = "Newline-delimited package list; created with defaults when missing"
    )]
    pub wishlist: PathBuf,
    #[arg(
        value_name = "PACKAGE",
        help = "Packages to resolve instead of the wishlist file"
    )]
    pub packages: Vec<String>,
}

#[derive(Args, Debug)]
pub struct ResolveArgs {
    #[command(flatten)]
    pub target: TargetArgs,
}

#[derive(Args, Debug)]
pub struct MirrorArgs {
    #[command(flatten)]
    pub target: TargetArgs,
    #[arg(
        short,
        long,
        env = "WHEELHOUSE_OUTPUT",
        default_value = "offline_mirror",
        value_name = "DIR",
        help = "Mirror root directory"
    )]
    pub output: PathBuf,
    #[arg(long, help = "Report what would be downloaded without writing anything")]
    pub dry_run: bool,
}
