use annotask::application::{AnnotationSession, ValidateService};
use annotask::cli::{format_reports, format_schema, format_tags, Cli, Commands};
use annotask::error::AnnotaskError;
use annotask::infrastructure::{AnnotationStore, Config, TaskFiles};
use clap::Parser;

fn main() {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = run(cli);

    match result {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {}", e.display_with_suggestions());
            std::process::exit(e.exit_code());
        }
    }
}

/// Warnings by default, RUST_LOG to tune, --verbose for everything down to debug
fn init_logging(verbose: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.init();
}

fn run(cli: Cli) -> Result<i32, AnnotaskError> {
    let config = Config::discover(cli.config.as_deref())?;
    let files = TaskFiles::current_dir()?;

    match cli.command {
        Commands::Schema { path } => {
            let schema = files.read_schema(&path)?;
            print!("{}", format_schema(&schema));
            Ok(0)
        }
        Commands::Inspect { schema, document } => {
            let mut session =
                AnnotationSession::from_schema_file(&files, &schema)?.with_config(&config);
            let report = session.open_document(&files, &document)?;

            if report.plain_text {
                println!(
                    "{} is not annotated for task '{}'; read as plain text",
                    document.display(),
                    session.schema().task_name()
                );
            }
            let tags = session.store().all_tags();
            println!("{}", format_tags(session.schema(), &tags).trim_end());
            for warning in &report.warnings {
                println!("warning: {}", warning);
            }
            Ok(0)
        }
        Commands::Check { schema, paths } => {
            let schema = files.read_schema(&schema)?;
            let service = ValidateService::new(files, &config.document_extension);
            let reports = service.execute(&schema, &paths)?;

            print!("{}", format_reports(&reports));
            if reports.is_empty() || !reports.iter().all(|r| r.is_valid()) {
                Ok(1)
            } else {
                Ok(0)
            }
        }
        Commands::Normalize {
            schema,
            document,
            output,
        } => {
            let mut session =
                AnnotationSession::from_schema_file(&files, &schema)?.with_config(&config);
            session.open_document(&files, &document)?;

            match output {
                Some(path) => {
                    session.save_document(&files, &path)?;
                    println!("Wrote {}", path.display());
                }
                None => print!("{}", session.encode()),
            }
            Ok(0)
        }
    }
}
