use clap::{Arg, Command};
use log::LevelFilter;
use phish_triage::config::RulesConfig;
use phish_triage::pipeline::TriagePipeline;
use phish_triage::report;
use std::process;

fn main() {
    let matches = Command::new("phish-triage")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Explainable phishing triage for raw email messages")
        .arg(
            Arg::new("eml")
                .long("eml")
                .value_name("FILE")
                .help("Path to the .eml file to analyze")
                .required_unless_present("generate-config"),
        )
        .arg(
            Arg::new("report")
                .long("report")
                .value_name("FILE")
                .help("Write the Markdown report to FILE")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .value_name("FILE")
                .help("Write the machine-readable result to FILE")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Scoring rules configuration file"),
        )
        .arg(
            Arg::new("generate-config")
                .long("generate-config")
                .value_name("FILE")
                .help("Write the default rules configuration and exit")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let log_level = if matches.get_flag("verbose") {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    if let Some(path) = matches.get_one::<String>("generate-config") {
        generate_default_config(path);
        return;
    }

    let config = match load_config(matches.get_one::<String>("config")) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            process::exit(1);
        }
    };

    let eml_path = matches.get_one::<String>("eml").unwrap();
    let report_path = matches.get_one::<String>("report");
    let json_path = matches.get_one::<String>("json");

    if let Err(e) = run(config, eml_path, report_path, json_path) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn load_config(path: Option<&String>) -> anyhow::Result<RulesConfig> {
    match path {
        Some(path) => RulesConfig::from_file(path),
        None => Ok(RulesConfig::default()),
    }
}

fn generate_default_config(path: &str) {
    match RulesConfig::default().to_file(path) {
        Ok(()) => println!("Default rules configuration written to {path}"),
        Err(e) => {
            eprintln!("Error writing configuration: {e}");
            process::exit(1);
        }
    }
}

fn run(
    config: RulesConfig,
    eml_path: &str,
    report_path: Option<&String>,
    json_path: Option<&String>,
) -> anyhow::Result<()> {
    use anyhow::Context;

    let raw = std::fs::read(eml_path).with_context(|| format!("failed to read {eml_path}"))?;
    let pipeline = TriagePipeline::new(config);
    let result = pipeline
        .run(&raw)
        .with_context(|| format!("failed to analyze {eml_path}"))?;

    if let Some(path) = json_path {
        let json = report::render_json(&result)?;
        std::fs::write(path, json).with_context(|| format!("failed to write {path}"))?;
        log::info!("JSON result written to {path}");
    }

    if let Some(path) = report_path {
        let markdown = report::render_markdown(&result);
        std::fs::write(path, markdown).with_context(|| format!("failed to write {path}"))?;
        log::info!("Markdown report written to {path}");
    }

    if report_path.is_none() && json_path.is_none() {
        println!("{}", report::render_markdown(&result));
    }

    Ok(())
}
