use std::io::{self, Write};
use std::path::Path;

use anyhow::Context;
use colored::Colorize;
use tracing::debug;

use revdiff_diff::{resolve, write_diff, ComparisonSpec, DiffError, DiffOptions, Endpoint, Target};
use revdiff_store::{InMemoryNodeStore, RepositoryFixture};
use revdiff_types::{NodeKind, RelPath, RevisionSpec};

use crate::cli::*;
use crate::config::CliConfig;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let cwd = RelPath::parse(&cli.cwd).context("invalid --cwd")?;
    let store = load_store(&cli.repo)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match cli.command {
        Command::Diff(args) => cmd_diff(&store, &cwd, &args, &mut out),
        Command::Ls(args) => cmd_ls(&store, &cwd, &args, &mut out),
    }
}

fn load_store(path: &Path) -> anyhow::Result<InMemoryNodeStore> {
    let fixture = RepositoryFixture::load(path)
        .with_context(|| format!("cannot load repository {}", path.display()))?;
    let store = fixture.into_store().context("cannot build repository")?;
    debug!(repo = %path.display(), youngest = store.youngest(), "repository loaded");
    Ok(store)
}

fn usage(message: impl Into<String>) -> anyhow::Error {
    DiffError::Usage(message.into()).into()
}

pub fn cmd_diff(
    store: &InMemoryNodeStore,
    cwd: &RelPath,
    args: &DiffArgs,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    let options = build_options(args)?;
    let specs = build_specs(args, cwd, options)?;
    debug!(targets = specs.len(), "running diff");
    write_diff(store, &specs, out)?;
    Ok(())
}

/// Config file values, then flags on top.
fn build_options(args: &DiffArgs) -> anyhow::Result<DiffOptions> {
    let config = match &args.config {
        Some(path) => CliConfig::load(path)?,
        None => CliConfig::default(),
    };
    let mut options = config.diff;
    options.summarize_only |= args.summarize;
    options.xml |= args.xml;
    options.git_style |= args.git;
    options.notice_ancestry |= args.notice_ancestry;
    options.show_copies_as_adds |= args.show_copies_as_adds;
    options.force |= args.force;
    options.ignore_content_type |= args.ignore_content_type;
    options.ignore_properties |= args.ignore_properties;
    options.properties_only |= args.properties_only;
    options.no_diff_added |= args.no_diff_added;
    options.no_diff_deleted |= args.no_diff_deleted;
    for extensions in [&config.extensions, &args.extensions].into_iter().flatten() {
        options.apply_extensions(extensions)?;
    }
    if let Some(depth) = &args.depth {
        options.depth = depth.parse()?;
    }
    Ok(options)
}

/// Split `PATH[@REV]`. Without a revision, working-copy paths mean the
/// working copy and repository paths mean `HEAD`.
fn parse_peg(text: &str, cwd: &RelPath) -> anyhow::Result<(String, Target, RevisionSpec)> {
    let (path, rev) = match text.rsplit_once('@') {
        Some((path, rev)) => (path, Some(rev.parse::<RevisionSpec>()?)),
        None => (text, None),
    };
    let target = Target::parse(path, cwd)?;
    let rev = rev.unwrap_or(match target {
        Target::WorkingCopy(_) => RevisionSpec::Working,
        Target::Url(_) => RevisionSpec::Head,
    });
    Ok((path.to_string(), target, rev))
}

/// `-c N` is `N-1:N`; `-c -N` is `N:N-1`.
fn change_range(text: &str) -> anyhow::Result<(RevisionSpec, RevisionSpec)> {
    let n: i64 = text
        .trim()
        .trim_start_matches(['r', 'R'])
        .parse()
        .map_err(|_| usage(format!("'{text}' is not a revision number")))?;
    let rev = n.unsigned_abs();
    if rev == 0 {
        return Err(usage("there is no change to revision 0"));
    }
    let (before, after) = (RevisionSpec::Number(rev - 1), RevisionSpec::Number(rev));
    Ok(if n > 0 { (before, after) } else { (after, before) })
}

fn revision_range(args: &DiffArgs) -> anyhow::Result<(Option<RevisionSpec>, Option<RevisionSpec>)> {
    match (&args.revision, &args.change) {
        (Some(_), Some(_)) => Err(usage("'-r' and '-c' cannot be combined")),
        (Some(range), None) => match range.split_once(':') {
            Some((old, new)) => Ok((Some(old.parse()?), Some(new.parse()?))),
            None => Ok((Some(range.parse()?), None)),
        },
        (None, Some(change)) => {
            let (old, new) = change_range(change)?;
            Ok((Some(old), Some(new)))
        }
        (None, None) => Ok((None, None)),
    }
}

/// One comparison per target.
fn build_specs(args: &DiffArgs, cwd: &RelPath, options: DiffOptions) -> anyhow::Result<Vec<ComparisonSpec>> {
    if args.old.is_some() || args.new.is_some() {
        if args.revision.is_some() || args.change.is_some() || !args.targets.is_empty() {
            return Err(usage("'--old'/'--new' cannot be combined with revisions or targets"));
        }
        let Some(old_text) = args.old.as_deref() else {
            return Err(usage("'--new' requires '--old'"));
        };
        let new_text = args.new.as_deref().unwrap_or(old_text);
        let (_, old_target, old_rev) = parse_peg(old_text, cwd)?;
        let (new_path, new_target, new_rev) = parse_peg(new_text, cwd)?;
        let mut spec = ComparisonSpec::new(
            Endpoint::new(old_target, old_rev),
            Endpoint::new(new_target.clone(), new_rev),
        )
        .with_options(options);
        if new_target.is_working_copy() {
            spec = spec.with_display_root(new_path);
        }
        return Ok(vec![spec]);
    }

    let (old_rev, new_rev) = revision_range(args)?;
    let defaults = [".".to_string()];
    let targets = if args.targets.is_empty() { &defaults[..] } else { &args.targets[..] };

    let mut specs = Vec::with_capacity(targets.len());
    for text in targets {
        let target = Target::parse(text, cwd)?;
        let (old, new) = match &target {
            Target::WorkingCopy(_) => (
                old_rev.unwrap_or(RevisionSpec::Base),
                new_rev.unwrap_or(RevisionSpec::Working),
            ),
            Target::Url(_) => {
                let old = old_rev
                    .ok_or_else(|| usage(format!("'{text}': repository targets need a revision")))?;
                (old, new_rev.unwrap_or(RevisionSpec::Head))
            }
        };
        let mut spec = ComparisonSpec::new(Endpoint::new(target.clone(), old), Endpoint::new(target.clone(), new))
            .with_options(options);
        if target.is_working_copy() {
            spec = spec.with_display_root(text.clone());
        }
        specs.push(spec);
    }
    Ok(specs)
}

pub fn cmd_ls(store: &InMemoryNodeStore, cwd: &RelPath, args: &LsArgs, out: &mut dyn Write) -> anyhow::Result<()> {
    let target = Target::parse(&args.target, cwd)?;
    let revision: RevisionSpec = args.revision.parse()?;
    let tree = resolve(store, &Endpoint::new(target, revision), &DiffOptions::default())?;
    writeln!(out, "{} ({})", args.target.bold(), tree.origin.to_string().dimmed())?;
    for (path, node) in &tree.nodes {
        let shown = if path.is_root() { ".".to_string() } else { path.to_string() };
        let shown = match node.kind {
            NodeKind::Directory => format!("{}/", shown).blue().bold().to_string(),
            _ => shown,
        };
        writeln!(out, "  {:<4} {}", node.kind.to_string(), shown)?;
    }
    Ok(())
}
