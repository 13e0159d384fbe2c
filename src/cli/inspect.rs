use std::path::PathBuf;

use action_locator::{parse_chain, XmlProjection};
use anyhow::Result;
use clap::Args;
use perceiver_structural::TreeProvider;
use serde::Serialize;
use uiloc_core_types::ElementType;

use crate::cli::context::CliContext;

#[derive(Args, Clone, Debug)]
pub struct ParseChainArgs {
    /// Class chain, e.g. `**/Cell[2]/Button`
    pub chain: String,
}

#[derive(Args, Clone, Debug)]
pub struct XmlArgs {
    /// Tree fixture (JSON or YAML)
    #[arg(short, long, value_name = "FILE")]
    pub tree: PathBuf,
}

#[derive(Args, Clone, Debug)]
pub struct PageSourceArgs {
    /// Tree fixture (JSON or YAML)
    #[arg(short, long, value_name = "FILE")]
    pub tree: PathBuf,

    /// Print only accessible elements
    #[arg(long)]
    pub accessibility: bool,
}

pub fn cmd_parse_chain(args: ParseChainArgs, ctx: &CliContext) -> Result<()> {
    let parsed = parse_chain(&args.chain);
    ctx.output().emit(&parsed, |parsed| {
        for (index, step) in parsed.query.steps.iter().enumerate() {
            let axis = if step.is_descendant_marker() {
                "descendants"
            } else {
                "children"
            };
            println!("{:>2}. {:<40} {}", index + 1, step.to_string(), axis);
        }
        for diagnostic in &parsed.diagnostics {
            eprintln!("warning: {}", diagnostic);
        }
    })
}

pub fn cmd_xml(args: XmlArgs, ctx: &CliContext) -> Result<()> {
    let tree = ctx.load_tree(&args.tree)?;
    let snapshot = tree.snapshot(&tree.root()?)?;
    let projection = XmlProjection::project(&snapshot, &ctx.config().resolver.index_path_root);
    println!("{}", projection.to_xml_string()?);
    Ok(())
}

pub fn cmd_page_source(args: PageSourceArgs, ctx: &CliContext) -> Result<()> {
    let tree = ctx.load_tree(&args.tree)?;
    let snapshot = tree.snapshot(&tree.root()?)?;
    if args.accessibility {
        print_structured(ctx, &snapshot.to_accessibility_tree())
    } else {
        print_structured(ctx, &snapshot.to_page_source())
    }
}

/// Page sources are nested documents; human output is pretty JSON.
fn print_structured<T: Serialize>(ctx: &CliContext, value: &T) -> Result<()> {
    let mut rendered = Ok(());
    ctx.output().emit(value, |value| {
        rendered = serde_json::to_string_pretty(value).map(|json| println!("{}", json));
    })?;
    Ok(rendered?)
}

#[derive(Serialize)]
struct TypeRow {
    code: u16,
    name: &'static str,
}

pub fn cmd_types(ctx: &CliContext) -> Result<()> {
    let rows: Vec<TypeRow> = ElementType::all()
        .map(|element_type| TypeRow {
            code: element_type.code(),
            name: element_type.name(),
        })
        .collect();
    ctx.output().emit(&rows, |rows| {
        for row in rows {
            println!("{:>3}  {}", row.code, row.name);
        }
    })
}
