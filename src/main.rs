use clap::Parser;
use showarr::cli::{Cli, Commands};
use showarr::{Config, run};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match (&cli.command, cli.config.as_deref()) {
        (Some(Commands::Init), _) => Config::default(),
        (_, Some(path)) => Config::load_from_path(path)?,
        (_, None) => Config::load()?,
    };
    let worker_threads = config.general.worker_threads;

    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all();

    if worker_threads > 0 {
        builder.worker_threads(worker_threads);
    }

    let runtime = builder.build()?;
    runtime.block_on(run(cli, config))
}
