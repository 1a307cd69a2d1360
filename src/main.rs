use clap::{Parser, Subcommand};
use oniontree_html::config::{self, GeneratorConfig, Overrides, Target};
use oniontree_html::render::{Renderer, TemplateHelpers};
use oniontree_html::writer::OutputWriter;
use oniontree_html::{alerts, generate, index, output, source};
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once; called a single time at startup
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "oniontree-html")]
#[command(about = "Static site generator for OnionTree repositories")]
#[command(long_about = "\
Static site generator for OnionTree repositories

Reads every service record and tag of an OnionTree repository, from a local
checkout or from the hosted repository, and renders the publishable site.

Repository structure:

  oniontree/
  ├── unsorted/
  │   ├── abc.yaml            # one record per service
  │   └── dread.yaml
  └── tagged/
      ├── forum/
      │   └── dread.yaml      # membership marker
      └── news/
          └── abc.yaml

Generated tree:

  index.html  search.html  api.html  download.html
  services/{id}.html  services/{id}.json
  tags/index.html  tags/{tag}.html
  keys/{key}.txt

Run 'oniontree-html gen-config' to generate a documented config.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Config file (TOML); flags override its values
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Template directory
    #[arg(long, global = true)]
    templates: Option<PathBuf>,

    /// Local OnionTree checkout
    #[arg(long, global = true)]
    oniontree: Option<PathBuf>,

    /// Read the hosted repository instead of a local checkout
    #[arg(long, global = true)]
    remote: bool,

    /// Base URL of the hosted repository contents API
    #[arg(long, global = true)]
    remote_url: Option<String>,

    /// Output directory
    #[arg(long, global = true)]
    output: Option<PathBuf>,

    /// Comma-separated tags whose services are left off the frontpage
    #[arg(long, global = true)]
    frontpage_omit_tags: Option<String>,

    /// Alerts file (YAML)
    #[arg(long, global = true)]
    alerts: Option<PathBuf>,

    /// Output flavor
    #[arg(long, value_enum, global = true)]
    target: Option<Target>,

    /// Bookmarks version label shown in pages
    #[arg(long, global = true)]
    otb_version: Option<String>,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render the full site into the output directory
    Build,
    /// Load and validate every record and tag without rendering
    Check,
    /// Print a stock config.toml with all options documented
    GenConfig,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            templates: self.templates.clone(),
            oniontree: self.oniontree.clone(),
            output: self.output.clone(),
            remote: self.remote,
            remote_url: self.remote_url.clone(),
            frontpage_omit_tags: self.frontpage_omit_tags.clone(),
            alerts: self.alerts.clone(),
            target: self.target,
            otb_version: self.otb_version.clone(),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    oniontree_html::init_tracing(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", error_chain(err.as_ref()));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), Box<dyn Error>> {
    match cli.command {
        Command::Build => build(&resolve_config(cli)?),
        Command::Check => check(&resolve_config(cli)?),
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
            Ok(())
        }
    }
}

fn build(config: &GeneratorConfig) -> Result<(), Box<dyn Error>> {
    let templates = config.templates_dir()?;
    let location = config.content_location()?;
    let ctx = config.context(alerts::load_alerts(config.alerts.as_deref())?);

    println!("==> Indexing repository");
    let source = source::open_source(&location)?;
    let site = index::build_index(source.as_ref())?;

    println!("==> Loading templates from {}", templates.display());
    let helpers = TemplateHelpers {
        target: ctx.target,
        version: ctx.version.clone(),
        last_updates: site.last_updates(source.as_ref()),
    };
    let renderer = Renderer::load(templates, helpers)?;

    println!("==> Generating site → {}", config.output.display());
    let mut writer = OutputWriter::new(&config.output);
    let report = generate::generate(&site, &renderer, &ctx, &mut writer)?;
    output::print_generate_output(&report);

    println!("==> Build complete: {}", config.output.display());
    Ok(())
}

fn check(config: &GeneratorConfig) -> Result<(), Box<dyn Error>> {
    let location = config.content_location()?;

    println!("==> Checking repository");
    let source = source::open_source(&location)?;
    let site = index::build_index(source.as_ref())?;
    output::print_index_output(&site);

    println!("==> Repository is valid");
    Ok(())
}

/// Config file (or stock defaults) with command-line values on top.
fn resolve_config(cli: &Cli) -> Result<GeneratorConfig, config::ConfigError> {
    let mut config = config::load_config(cli.config.as_deref())?;
    config.apply(cli.overrides());
    config.validate()?;
    Ok(config)
}

/// `outer: inner: innermost`, on one line.
fn error_chain(err: &dyn Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}
