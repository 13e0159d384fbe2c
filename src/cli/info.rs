use anyhow::Result;
use serde::Serialize;

use crate::cli::context::CliContext;

#[derive(Serialize)]
struct VersionInfo {
    version: &'static str,
    git_hash: &'static str,
    build_date: &'static str,
}

pub fn cmd_version(ctx: &CliContext) -> Result<()> {
    let info = VersionInfo {
        version: env!("CARGO_PKG_VERSION"),
        git_hash: env!("GIT_HASH"),
        build_date: env!("BUILD_DATE"),
    };
    ctx.output().emit(&info, |info| {
        println!("uiloc {}", info.version);
        println!("Git Commit: {}", info.git_hash);
        println!("Build Date: {}", info.build_date);
    })
}
