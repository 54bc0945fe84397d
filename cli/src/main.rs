use clap::{Parser, ValueEnum};
use pdf_annots::{AnnotationExtractor, FieldPayload, RenderIntent};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// One line per annotation
    Plain,
    /// Full decoded records
    Debug,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Intent {
    /// Keep annotations shown on screen
    Display,
    /// Keep annotations shown when printing
    Print,
}

impl From<Intent> for RenderIntent {
    fn from(intent: Intent) -> Self {
        match intent {
            Intent::Display => RenderIntent::Display,
            Intent::Print => RenderIntent::Print,
        }
    }
}

#[derive(Parser)]
#[command(name = "pdf-annots")]
#[command(about = "Dump the annotations and form fields of PDF files", long_about = None)]
struct Args {
    /// PDF file to read annotations from
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Password for encrypted PDFs
    #[arg(short, long)]
    password: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Plain)]
    format: OutputFormat,

    /// Only keep annotations visible for this intent
    #[arg(short, long, value_enum)]
    intent: Option<Intent>,

    /// Log decoding diagnostics at debug level
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(verbose)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    let mut builder = AnnotationExtractor::builder();
    if let Some(password) = args.password {
        builder = builder.password(password);
    }
    if let Some(intent) = args.intent {
        builder = builder.intent(intent.into());
    }
    let extractor = builder.build();

    let output = match extractor.from_path(&args.file) {
        Ok(output) => output,
        Err(e) => {
            eprintln!("Error reading annotations from {:?}: {}", args.file, e);
            std::process::exit(1);
        }
    };

    match args.format {
        OutputFormat::Plain => {
            for page in &output.pages {
                if page.annotations.is_empty() {
                    continue;
                }
                println!("Page {}:", page.page_number);
                for annotation in &page.annotations {
                    println!("  {}", annotation);
                    if let Some(FieldPayload::Toggle { options, selected }) =
                        annotation.field().map(|f| &f.payload)
                    {
                        println!("    options: {:?} selected: {}", options, selected);
                    }
                    for entry in output.scripts.for_annotation(&annotation.id) {
                        println!("    {}: {}", entry.trigger, entry.script);
                    }
                }
            }
        }
        OutputFormat::Debug => {
            for page in &output.pages {
                println!("Page {} ({:?}):", page.page_number, page.page_id);
                for annotation in &page.annotations {
                    println!("{:#?}", annotation);
                }
            }
        }
    }
}
