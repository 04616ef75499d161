mod cli;

use dirconf::value::Value;
use dirconf::{Document, MissingVariable, ProcessOptions};

fn main() {
    use clap::Parser;
    let cli = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_env("DIRCONF_LOG"))
        .with_writer(std::io::stderr)
        .init();

    for new_path in cli.directory.iter() {
        match new_path.canonicalize() {
            Err(e) => {
                eprintln!(
                    "Failed to resolve path for -C/--directory {}\n{}",
                    new_path.display(),
                    e
                );
                std::process::exit(1);
            }
            Ok(cwd) => {
                if let Err(err) = std::env::set_current_dir(&cwd) {
                    eprintln!("Failed to set work directory to {}\n{}", cwd.display(), err,);
                    std::process::exit(1);
                }

                tracing::info!(directory=%cwd.display(), "Changed working directory");
            }
        }
    }

    let command_result = match cli.command {
        cli::Command::Process(process_cli) => process(process_cli),
        cli::Command::Inspect(inspect_cli) => inspect(inspect_cli),
        cli::Command::Walk(walk_cli) => walk(walk_cli),
        cli::Command::Dev(dev_cli) => dev(dev_cli),
    };

    if let Err(e) = command_result {
        for error in e.chain() {
            eprintln!("{error}")
        }
        std::process::exit(1);
    }
}

pub fn process(cli: cli::ProcessCommand) -> anyhow::Result<()> {
    let document = Document::from_file(&cli.file)?;
    let context = match &cli.context {
        Some(path) => dirconf::io::load(path)?,
        None => Value::object(),
    };

    let mut options = ProcessOptions::default()
        .context(context)
        .allow_branching(cli.all)
        .max_branches(cli.max_branches);
    if cli.strict {
        options = options.missing_variable(MissingVariable::Error);
    }
    let outcomes = document.process_with(&options)?;

    tracing::info!(outcomes = outcomes.len(), "document processed");

    match &cli.output_dir {
        Some(output_dir) => {
            std::fs::create_dir_all(output_dir)?;
            for (index, outcome) in outcomes.iter().enumerate() {
                let file_name = format!("output_{index:04}.{}", cli.output.format.extension());
                outcome.save_to(&output_dir.join(file_name))?;
            }
        }
        None if cli.all => {
            let values = outcomes
                .iter()
                .map(Document::to_value)
                .collect::<Result<Vec<_>, _>>()?;
            output(&cli.output, &Value::Array(values))?;
        }
        None => {
            for outcome in &outcomes {
                output(&cli.output, &outcome.to_value()?)?;
            }
        }
    }

    Ok(())
}

pub fn inspect(cli: cli::InspectCommand) -> anyhow::Result<()> {
    let document = Document::from_file(&cli.file)?;
    let inspection = document.inspect()?;
    output(&cli.output, &inspection.to_value())
}

pub fn walk(cli: cli::WalkCommand) -> anyhow::Result<()> {
    let document = Document::from_file(&cli.file)?;
    for (path, value) in document.walk()? {
        let path = path
            .iter()
            .map(|segment| match segment {
                dirconf::value::PathSegment::Key(key) => key.to_string(),
                dirconf::value::PathSegment::Index(index) => index.to_string(),
            })
            .collect::<Vec<_>>()
            .join(".");
        println!("{path} = {value}");
    }
    Ok(())
}

fn output(output: &cli::OutputArgs, value: &Value) -> anyhow::Result<()> {
    match output.format {
        cli::OutputFormat::Yaml => serde_yaml::to_writer(std::io::stdout(), value)?,
        cli::OutputFormat::Json => {
            serde_json::to_writer_pretty(std::io::stdout(), value)?;
            println!();
        }
    };

    Ok(())
}

/// (dirconf-)developer utilities
///
/// A quick way to expose internal structures for debugging purposes
pub fn dev(cli: cli::DevCommand) -> anyhow::Result<()> {
    use cli::DevSubCommand::*;

    match cli.command {
        Ast { file } => {
            let document = Document::from_file(&file)?;
            println!("{:#?}", document.parse()?);
        }
        Scan { text } => {
            for token in dirconf::scanner::scan(&text)? {
                println!("{token:?}");
            }
        }
    }

    Ok(())
}
