use anyhow::Result;

fn main() -> Result<()> {
    uiloc_cli::cli::run()
}
