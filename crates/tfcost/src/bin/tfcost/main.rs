mod cli;

use tfcost::attributes::ResourceData;
use tfcost::hcl_documents::HclDocuments;
use tfcost::registry::Registry;
use tfcost::usage::UsageFile;

fn main() {
    use clap::Parser;
    let cli = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_env("TFCOST_LOG"))
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
        cli::Command::Breakdown(breakdown_cli) => breakdown(breakdown_cli),
        cli::Command::Dev(dev_cli) => dev(dev_cli),
    };

    if let Err(e) = command_result {
        for error in e.chain() {
            eprintln!("{error}")
        }
        std::process::exit(1);
    }
}

pub fn breakdown(cli: cli::BreakdownCommand) -> anyhow::Result<()> {
    let registry = Registry::new()?;
    let resources = load(&cli.input)?;

    let usage = match &cli.usage_file {
        Some(path) => UsageFile::load(path)?,
        None => UsageFile::default(),
    };

    let breakdown = tfcost::registry::breakdown(&registry, &resources, &usage);
    tracing::info!(
        resources = breakdown.resources.len(),
        unsupported = breakdown.unsupported.len(),
        failed = breakdown.failed.len(),
        "breakdown finished"
    );

    output(&cli.output, &breakdown)?;
    Ok(())
}

fn load(input: &cli::InputArgs) -> anyhow::Result<Vec<ResourceData>> {
    let mut resources = vec![];
    for plan_path in &input.plans {
        resources.extend(tfcost::plan_json::load_plan(plan_path)?);
    }

    let documents = load_documents(input)?;
    if documents.source_count() > 0 {
        resources.extend(documents.resources());
    }

    Ok(resources)
}

fn load_documents(input: &cli::InputArgs) -> anyhow::Result<HclDocuments> {
    if !input.workdir && input.files.is_empty() && input.directories.is_empty() {
        if !input.plans.is_empty() {
            return Ok(HclDocuments::default());
        }

        let stdin = std::io::read_to_string(std::io::stdin())?;
        let body = hcl_edit::parser::parse_body(&stdin)?;
        return Ok(body.into());
    }

    let mut documents = HclDocuments::default();

    if input.workdir {
        documents.load_directory(&std::env::current_dir()?)?;
    }

    for file_path in &input.files {
        documents.load_file(file_path)?;
    }

    for dir_path in &input.directories {
        documents.load_directory(dir_path)?;
    }

    anyhow::ensure!(documents.source_count() > 0, "No files loaded");

    Ok(documents)
}

fn output<T: serde::Serialize>(output: &cli::OutputArgs, value: &T) -> anyhow::Result<()> {
    match output.format {
        cli::OutputFormat::Yaml => serde_yaml::to_writer(std::io::stdout(), value)?,
        cli::OutputFormat::Json => serde_json::to_writer_pretty(std::io::stdout(), value)?,
    };

    Ok(())
}

/// (tfcost-)developer utilities
///
/// A quick way to expose internal structures for debugging purposes
pub fn dev(cli: cli::DevCommand) -> anyhow::Result<()> {
    use cli::DevSubCommand::*;

    match cli.command {
        Documents => println!("{:#?}", load_documents(&cli.input)?),
        Resources => {
            for resource in load(&cli.input)? {
                println!("# {} ({})", resource.address, resource.resource_type);
                println!("{}", serde_json::to_string_pretty(&resource.values)?);
            }
        }
    }

    Ok(())
}
