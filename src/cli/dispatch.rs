use super::config::cmd_config;
use super::env::CliArgs;
use super::info::cmd_version;
use super::inspect::{cmd_page_source, cmd_parse_chain, cmd_types, cmd_xml};
use super::resolve::{cmd_parent, cmd_resolve, cmd_sibling};
use crate::cli::commands::Commands;
use crate::cli::context::CliContext;
use anyhow::Result;

pub fn dispatch(cli: &CliArgs, ctx: &CliContext) -> Result<()> {
    match cli.command.clone() {
        Commands::Resolve(args) => cmd_resolve(args, ctx),
        Commands::Parent(args) => cmd_parent(args, ctx),
        Commands::Sibling(args) => cmd_sibling(args, ctx),
        Commands::ParseChain(args) => cmd_parse_chain(args, ctx),
        Commands::Xml(args) => cmd_xml(args, ctx),
        Commands::PageSource(args) => cmd_page_source(args, ctx),
        Commands::Types => cmd_types(ctx),
        Commands::Config(args) => cmd_config(args, ctx),
        Commands::Version => cmd_version(ctx),
    }
}
