mod cli;

use clap::Parser;
use cli::{Args, Commands, GenerateArgs, ParseArgs};
use eyre::Result;
use std::process::ExitCode;
use voice_archive::azure::AzureSource;
use voice_archive::consts::DEFAULT_OUTPUT_FILE;
use voice_archive::{
    BlobSource, Dialect, InvalidOptions, LocalDirSource, ScriptOptions, SourceError,
    generate_script, parse_file_name,
};

fn main() -> ExitCode {
    if let Err(e) = color_eyre::install() {
        eprintln!("failed to install error reporting: {e}");
    }

    let args = Args::parse();

    let env_filter = if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::EnvFilter::from_default_env()
    } else {
        let level = match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        };
        tracing_subscriber::EnvFilter::new(level)
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match args.command {
        Commands::Generate(a) => generate(a),
        Commands::Parse(a) => parse(a),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(report) => ExitCode::from(report_failure(&report)),
    }
}

fn generate(args: GenerateArgs) -> Result<()> {
    let positional = [args.connection, args.container, args.prefix]
        .into_iter()
        .map(Option::unwrap_or_default)
        .collect::<Vec<_>>();
    let options = ScriptOptions::from_env(&positional);
    options.validate(args.dir.is_none())?;

    let source: Box<dyn BlobSource> = match args.dir {
        Some(dir) => Box::new(LocalDirSource::new(dir)),
        None => {
            let connection = options.connection_string.as_deref().unwrap_or_default();
            Box::new(AzureSource::new(connection, &options.container_name)?)
        }
    };

    let dialect = Dialect::from(args.dialect);
    let mut script = generate_script(source.as_ref(), &options, dialect)?;
    if args.with_schema {
        script = script.with_schema(dialect);
    }

    let output = match args.output {
        Some(path) => path,
        None => std::env::current_dir()?.join(DEFAULT_OUTPUT_FILE),
    };
    std::fs::write(&output, &script.sql)?;
    tracing::debug!(path = %output.display(), bytes = script.sql.len(), "wrote script");

    println!(
        "SQL script generated: {} rows ({} without an inferred speaker)",
        script.rows, script.default_speaker_rows
    );
    println!("Location: {}", output.display());
    Ok(())
}

fn parse(args: ParseArgs) -> Result<()> {
    let speaker = args
        .speaker
        .unwrap_or_else(|| ScriptOptions::from_env(&[]).speaker);

    for name in &args.names {
        let parsed = parse_file_name(name, &speaker);
        if args.json {
            println!("{}", serde_json::to_string(&parsed)?);
        } else {
            println!("{}\t{}", parsed.speaker, parsed.title);
        }
    }
    Ok(())
}

/// Print the failure and pick the exit code: 1 for unusable options,
/// 2 for storage failures, 99 for anything else.
fn report_failure(report: &eyre::Report) -> u8 {
    if let Some(invalid) = report.downcast_ref::<InvalidOptions>() {
        eprintln!("{invalid}");
        return 1;
    }
    match report.downcast_ref::<SourceError>() {
        Some(SourceError::InvalidConnectionString(_)) => {
            eprintln!("{report}");
            1
        }
        Some(_) => {
            eprintln!("Azure request failed: {report}");
            2
        }
        None => {
            eprintln!("Unexpected error: {report:?}");
            99
        }
    }
}
