use anyhow::Result;
use log::LevelFilter;
use tree2md::{GitCli, cli::parse_args, run_export};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let config = parse_args()?;
    init_logger(config.verbosity);

    let runner = GitCli::new(&config.work_dir);
    let report = run_export(&config, &runner).await?;
    print!("{}", report.render()?);
    Ok(())
}

/// Maps `-v` occurrences to a level; `RUST_LOG` still takes precedence.
fn init_logger(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}
