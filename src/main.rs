use std::path::PathBuf;

use anyhow::Context;
use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use letterfill::config::{find_config_path, init_default_config, load_config, AppConfig};
use letterfill::letter::fill_docx_file;
use letterfill::{FieldValues, TemplateContract};

#[derive(Parser, Debug)]
#[command(name = "letterfill")]
#[command(about = "Fill a medical letter .docx template from a fields file", long_about = None)]
struct Args {
    /// Write a default letterfill.toml, then exit
    #[arg(long)]
    init_config: bool,

    /// Directory to write the config file to (default: current directory)
    #[arg(long, value_name = "DIR")]
    init_config_dir: Option<PathBuf>,

    /// Overwrite an existing config file when used with --init-config
    #[arg(long)]
    force: bool,

    /// Letter template (.docx)
    #[arg(value_name = "DOCX")]
    template: Option<PathBuf>,

    /// Field values (.toml, or .json)
    #[arg(long, value_name = "FILE")]
    fields: Option<PathBuf>,

    /// Output .docx (default: <template_stem>_filled.docx)
    #[arg(short, long, value_name = "DOCX")]
    output: Option<PathBuf>,

    /// Date text to place after the date label (default: fields file, then today)
    #[arg(long, value_name = "TEXT")]
    date: Option<String>,

    /// Config file path (default: search for letterfill.toml upwards)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Archive part to fill (overrides config)
    #[arg(long, value_name = "NAME")]
    part: Option<String>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("letterfill=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if args.init_config {
        let dir = args
            .init_config_dir
            .clone()
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
        let cfg_path = init_default_config(&dir, args.force).context("init default config")?;
        eprintln!("Wrote config: {}", cfg_path.display());
        return Ok(());
    }

    let template = match args.template {
        Some(p) => p,
        None => {
            let mut cmd = Args::command();
            cmd.print_help().context("print help")?;
            eprintln!("\n\nUSAGE:\n  letterfill <template.docx> --fields <fields.toml> [-o <out.docx>]\n");
            return Ok(());
        }
    };
    let fields_path = args
        .fields
        .clone()
        .context("missing --fields <FILE> with the letter's field values")?;
    let output = match args.output {
        Some(p) => p,
        None => {
            let stem = template
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("letter")
                .to_string();
            template.with_file_name(format!("{stem}_filled.docx"))
        }
    };

    let template_dir = template
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."));
    let file_cfg = match find_config_path(args.config.clone(), &template_dir) {
        Some(p) if p.exists() => {
            tracing::debug!(config = %p.display(), "using config");
            load_config(&p)?
        }
        Some(p) if args.config.is_some() => {
            return Err(anyhow::anyhow!("config not found: {}", p.display()));
        }
        _ => AppConfig::default(),
    };
    let mut contract = TemplateContract::from_config(&file_cfg);
    if let Some(part) = args.part.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()) {
        contract.document_part = part;
    }

    let mut fields = FieldValues::from_path(&fields_path)?;
    if let Some(date) = args.date {
        fields.formatted_date = date;
    } else if fields.formatted_date.trim().is_empty() {
        fields.formatted_date = chrono::Local::now().format("%-d %B %Y").to_string();
    }

    fill_docx_file(&template, &output, &fields, &contract)?;
    tracing::info!(
        template = %template.display(),
        part = %contract.document_part,
        output = %output.display(),
        "letter written"
    );
    Ok(())
}
