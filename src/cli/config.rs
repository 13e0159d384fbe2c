use anyhow::Result;
use clap::{Args, Subcommand};

use crate::cli::context::CliContext;

#[derive(Args, Clone, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Clone, Debug)]
pub enum ConfigAction {
    /// Show effective configuration
    Show,

    /// Print the configuration file path
    Path,
}

pub fn cmd_config(args: ConfigArgs, ctx: &CliContext) -> Result<()> {
    match args.action {
        ConfigAction::Show => {
            println!("# Effective configuration ({})", ctx.config_path().display());
            print!("{}", ctx.config().to_yaml_string()?);
        }
        ConfigAction::Path => println!("{}", ctx.config_path().display()),
    }
    Ok(())
}
