use clap::Parser;
use layout_repair::cli::commands::{
    cmd_batch_repair, cmd_diff_layout, cmd_dump, cmd_repair, cmd_show,
};
use layout_repair::cli::config::{build_engine_config, load_config, Cli, Commands};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref());

    // Resolve classifier settings: CLI > config > defaults
    let engine_config = build_engine_config(
        &config,
        cli.ollama_endpoint.as_deref(),
        cli.ollama_model.as_deref(),
    );

    match cli.command {
        Commands::Repair {
            script,
            live,
            output,
        } => {
            let all_resolved = cmd_repair(
                &script,
                live.as_deref(),
                output.as_deref(),
                cli.verbose,
                engine_config,
            )?;
            if !all_resolved {
                std::process::exit(1);
            }
        }
        Commands::BatchRepair { root, slots } => {
            let all_ok = cmd_batch_repair(&root, slots, cli.verbose, engine_config)?;
            if !all_ok {
                std::process::exit(1);
            }
        }
        Commands::DiffLayout { before, after } => {
            cmd_diff_layout(&before, &after, cli.verbose, &engine_config)?;
        }
        Commands::Dump { input, output } => {
            cmd_dump(&input, output.as_deref())?;
        }
        Commands::Show { backtrace } => {
            cmd_show(&backtrace)?;
        }
    }

    Ok(())
}
