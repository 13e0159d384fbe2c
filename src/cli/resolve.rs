use std::path::PathBuf;

use action_locator::{Diagnostic, ElementResolver, Locator, MatchMode, Resolution};
use anyhow::{Context, Result};
use clap::Args;
use perceiver_structural::{ElementHandle, TreeProvider};
use serde::Serialize;
use tracing::info;

use crate::cli::context::CliContext;

#[derive(Args, Clone, Debug)]
pub struct MatchArgs {
    /// Tree fixture (JSON or YAML)
    #[arg(short, long, value_name = "FILE")]
    pub tree: PathBuf,

    /// Return every match
    #[arg(long, conflicts_with = "first")]
    pub all: bool,

    /// Return only the first match
    #[arg(long)]
    pub first: bool,
}

#[derive(Args, Clone, Debug)]
pub struct ResolveArgs {
    #[command(flatten)]
    pub target: MatchArgs,

    /// Locator string, e.g. `class-chain=**/Button`
    pub locator: String,
}

#[derive(Args, Clone, Debug)]
pub struct ParentArgs {
    #[command(flatten)]
    pub target: MatchArgs,

    /// Locator the parents must match
    #[arg(long)]
    pub parent: String,

    /// Identifier, name or predicate locator of the contained child
    #[arg(long)]
    pub child: String,
}

#[derive(Args, Clone, Debug)]
pub struct SiblingArgs {
    #[command(flatten)]
    pub target: MatchArgs,

    /// Identifier, name or predicate locator of the anchor element
    #[arg(long)]
    pub child: String,

    /// Locator the siblings must match
    #[arg(long)]
    pub sibling: String,
}

/// One resolved element as printed
#[derive(Debug, Serialize)]
pub struct MatchRow {
    pub handle: String,
    #[serde(rename = "type")]
    pub element_type: String,
    pub name: Option<String>,
    pub label: String,
}

#[derive(Debug, Serialize)]
pub struct MatchReport {
    pub locator: String,
    pub matches: Vec<MatchRow>,
    pub diagnostics: Vec<Diagnostic>,
}

pub fn cmd_resolve(args: ResolveArgs, ctx: &CliContext) -> Result<()> {
    let tree = ctx.load_tree(&args.target.tree)?;
    let resolver = ctx.resolver(tree.clone());
    let locator = Locator::parse(&args.locator);
    let mode = mode(ctx, &args.target);
    let root = tree.root()?;

    let resolution = resolver
        .resolve_detailed(&locator, &root, mode)
        .with_context(|| format!("Failed to resolve {}", locator))?;
    print_report(ctx, tree.as_ref(), locator.to_string(), resolution)
}

pub fn cmd_parent(args: ParentArgs, ctx: &CliContext) -> Result<()> {
    let tree = ctx.load_tree(&args.target.tree)?;
    let resolver = ctx.resolver(tree.clone());
    let parent = Locator::parse(&args.parent);
    let child = Locator::parse(&args.child);
    let root = tree.root()?;

    let resolution = resolver
        .find_parent(&parent, &child, &root, mode(ctx, &args.target))
        .with_context(|| format!("Failed to find parent {} of {}", parent, child))?;
    print_report(ctx, tree.as_ref(), format!("{} containing {}", parent, child), resolution)
}

pub fn cmd_sibling(args: SiblingArgs, ctx: &CliContext) -> Result<()> {
    let tree = ctx.load_tree(&args.target.tree)?;
    let resolver = ctx.resolver(tree.clone());
    let child = Locator::parse(&args.child);
    let sibling = Locator::parse(&args.sibling);
    let root = tree.root()?;

    let resolution = resolver
        .find_sibling(&child, &sibling, &root, mode(ctx, &args.target))
        .with_context(|| format!("Failed to find sibling {} of {}", sibling, child))?;
    print_report(ctx, tree.as_ref(), format!("{} near {}", sibling, child), resolution)
}

fn mode(ctx: &CliContext, target: &MatchArgs) -> MatchMode {
    MatchMode::from_first_only(ctx.first_only(target.all, target.first))
}

fn describe(provider: &dyn TreeProvider, element: &ElementHandle) -> Result<MatchRow> {
    let attributes = provider.capture_attributes(element)?;
    Ok(MatchRow {
        handle: element.to_string(),
        element_type: attributes.element_type.name().to_string(),
        name: attributes.derived_name().map(str::to_string),
        label: attributes.label,
    })
}

fn print_report(
    ctx: &CliContext,
    provider: &dyn TreeProvider,
    locator: String,
    resolution: Resolution,
) -> Result<()> {
    let matches = resolution
        .elements
        .iter()
        .map(|element| describe(provider, element))
        .collect::<Result<Vec<_>>>()?;
    info!("{} matched {} element(s)", locator, matches.len());

    let report = MatchReport {
        locator,
        matches,
        diagnostics: resolution.diagnostics,
    };
    ctx.output().emit(&report, |report| {
        if report.matches.is_empty() {
            println!("No elements match {}", report.locator);
        }
        for row in &report.matches {
            println!(
                "{}\t{}\tname={}\tlabel={}",
                row.handle,
                row.element_type,
                row.name.as_deref().unwrap_or(""),
                row.label
            );
        }
        for diagnostic in &report.diagnostics {
            eprintln!("warning: {}", diagnostic);
        }
    })
}
