use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "revdiff",
    about = "revdiff: compare versions of a versioned tree",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Repository fixture to load (TOML, or JSON with a .json extension)
    #[arg(long, global = true, default_value = "revdiff.toml")]
    pub repo: PathBuf,

    /// Path inside the working copy that relative targets start from
    #[arg(long, global = true, default_value = "")]
    pub cwd: String,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show the differences between two versions of a tree
    Diff(DiffArgs),
    /// List the nodes of a tree at a revision
    Ls(LsArgs),
}

#[derive(Args, Debug, Default)]
pub struct DiffArgs {
    /// Working-copy paths or ^/repository paths
    pub targets: Vec<String>,

    /// Revision range N[:M]; keywords HEAD, BASE, COMMITTED, PREV, WORKING
    #[arg(short = 'r', long = "revision")]
    pub revision: Option<String>,

    /// The change made in revision N (-N reverses it)
    #[arg(short = 'c', long = "change", allow_hyphen_values = true)]
    pub change: Option<String>,

    /// Old side as PATH[@REV]
    #[arg(long)]
    pub old: Option<String>,

    /// New side as PATH[@REV]
    #[arg(long)]
    pub new: Option<String>,

    /// TOML file with a [diff] table of default options
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub summarize: bool,
    #[arg(long)]
    pub xml: bool,
    #[arg(long)]
    pub git: bool,
    #[arg(long)]
    pub notice_ancestry: bool,
    #[arg(long)]
    pub show_copies_as_adds: bool,
    #[arg(long)]
    pub force: bool,
    #[arg(long)]
    pub ignore_content_type: bool,
    #[arg(long)]
    pub ignore_properties: bool,
    #[arg(long)]
    pub properties_only: bool,
    #[arg(long)]
    pub no_diff_added: bool,
    #[arg(long)]
    pub no_diff_deleted: bool,

    /// Diff extension options, e.g. "-b", "-w", "--ignore-eol-style", "-U 5"
    #[arg(short = 'x', long = "extensions", allow_hyphen_values = true)]
    pub extensions: Option<String>,

    /// empty, files, immediates or infinity
    #[arg(long)]
    pub depth: Option<String>,
}

#[derive(Args, Debug)]
pub struct LsArgs {
    /// Working-copy path or ^/repository path
    #[arg(default_value = ".")]
    pub target: String,

    #[arg(short = 'r', long = "revision", default_value = "WORKING")]
    pub revision: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diff_args(args: &[&str]) -> DiffArgs {
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Command::Diff(args) => args,
            Command::Ls(_) => panic!("wrong command"),
        }
    }

    #[test]
    fn parse_plain_diff() {
        let args = diff_args(&["revdiff", "diff"]);
        assert!(args.targets.is_empty());
        assert!(args.revision.is_none());
        assert!(!args.summarize);
    }

    #[test]
    fn parse_revision_range_and_targets() {
        let args = diff_args(&["revdiff", "diff", "-r", "1:2", "iota", "A/mu"]);
        assert_eq!(args.revision.as_deref(), Some("1:2"));
        assert_eq!(args.targets, vec!["iota", "A/mu"]);
    }

    #[test]
    fn parse_reverse_change() {
        let args = diff_args(&["revdiff", "diff", "-c", "-3", "Q/R", "--summarize"]);
        assert_eq!(args.change.as_deref(), Some("-3"));
        assert!(args.summarize);
    }

    #[test]
    fn parse_flags_and_extensions() {
        let args = diff_args(&[
            "revdiff",
            "diff",
            "--git",
            "--notice-ancestry",
            "--no-diff-deleted",
            "-x",
            "-w --ignore-eol-style",
            "--depth",
            "files",
        ]);
        assert!(args.git);
        assert!(args.notice_ancestry);
        assert!(args.no_diff_deleted);
        assert_eq!(args.extensions.as_deref(), Some("-w --ignore-eol-style"));
        assert_eq!(args.depth.as_deref(), Some("files"));
    }

    #[test]
    fn parse_old_new() {
        let args = diff_args(&["revdiff", "diff", "--old", "iota", "--new", "iota@1"]);
        assert_eq!(args.old.as_deref(), Some("iota"));
        assert_eq!(args.new.as_deref(), Some("iota@1"));
    }

    #[test]
    fn parse_global_options() {
        let cli = Cli::try_parse_from(["revdiff", "--repo", "fx.json", "--cwd", "A/B", "diff", "-v", ".."]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.repo, PathBuf::from("fx.json"));
        assert_eq!(cli.cwd, "A/B");
    }

    #[test]
    fn parse_ls() {
        let cli = Cli::try_parse_from(["revdiff", "ls", "^/A", "-r", "1"]).unwrap();
        if let Command::Ls(args) = cli.command {
            assert_eq!(args.target, "^/A");
            assert_eq!(args.revision, "1");
        } else {
            panic!("wrong command");
        }
    }
}
