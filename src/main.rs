use anyhow::Context;
use clap::{Args, Parser, Subcommand};

mod config;
mod diagnostics;
mod error;
mod model;
mod render;
mod report;
mod view;

use config::ReportConfig;
use view::ChartKind;

pub type Result<T> = anyhow::Result<T>;

#[derive(Parser)]
#[command(name = "hier-power")]
#[command(about = "Hierarchical power report parser", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Flatten every hierarchy record into one table.
    Table {
        #[command(flatten)]
        common: CommonArgs,

        /// Instead of one column per hierarchy level, write one dot-separated
        /// hierarchy column.
        #[arg(short = 'p', long)]
        path_combine: bool,

        #[arg(short = 'o', long)]
        out: Option<String>,
    },

    /// Filter records by hierarchy regex, sort, and roll the tail into "Other".
    Top {
        #[command(flatten)]
        common: CommonArgs,

        /// Regex searched in the dot-separated hierarchy; anchored under the
        /// top instance unless it already names it. Repeat to OR filters.
        #[arg(short = 'f', long = "filter")]
        filters: Vec<String>,

        /// Top-level instance filters are anchored to (default: the only root).
        #[arg(long)]
        top: Option<String>,

        /// Column to sort and aggregate by (header text or key such as total_power).
        #[arg(short = 'c', long)]
        column: Option<String>,

        /// Chart the table is meant for.
        #[arg(short = 'k', long, value_enum)]
        kind: Option<ChartKind>,

        /// Maximum rows, including the "Other" row.
        #[arg(short = 'e', long)]
        entries: Option<usize>,

        #[arg(short = 'o', long)]
        out: Option<String>,
    },
}

#[derive(Args)]
struct CommonArgs {
    /// Power report to parse.
    #[arg(long)]
    log: String,

    /// JSON settings file; flags take precedence.
    #[arg(long)]
    config: Option<String>,

    /// Maximum hierarchy depth; 0 is the top level.
    #[arg(short = 'd', long)]
    max_depth: Option<usize>,

    /// Report unparsed lines and projection details.
    #[arg(short = 'v', long)]
    verbose: bool,
}

impl CommonArgs {
    fn settings(&self, flags: ReportConfig) -> Result<ReportConfig> {
        let flags = ReportConfig {
            max_depth: self.max_depth,
            verbose: self.verbose,
            ..flags
        };
        let base = match &self.config {
            Some(path) => ReportConfig::load(path)?,
            None => ReportConfig::default(),
        };
        Ok(base.merge(flags))
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.cmd {
        Commands::Table {
            common,
            path_combine,
            out,
        } => {
            let settings = common
                .settings(ReportConfig {
                    path_combine,
                    ..ReportConfig::default()
                })?
                .validate()?;
            diagnostics::init_logging(settings.verbose)?;

            // 1) Parse.
            let parsed = report::parse_report_file(&common.log, &settings.parse)
                .with_context(|| format!("parse power report {}", common.log))?;
            log::info!(
                "parsed {} {} records from {}",
                parsed.stats.records,
                parsed.tree.dialect,
                common.log
            );

            // 2) Flatten.
            let table = view::to_rows(&parsed.tree, settings.path_combine);

            // 3) Render.
            let json = render::render_table_json(&table)?;
            write_output(out.as_deref(), &json)?;
        }
        Commands::Top {
            common,
            filters,
            top,
            column,
            kind,
            entries,
            out,
        } => {
            let settings = common
                .settings(ReportConfig {
                    top,
                    filters,
                    column,
                    kind,
                    max_entries: entries,
                    ..ReportConfig::default()
                })?
                .validate()?;
            diagnostics::init_logging(settings.verbose)?;

            // 1) Parse.
            let parsed = report::parse_report_file(&common.log, &settings.parse)
                .with_context(|| format!("parse power report {}", common.log))?;

            // 2) Filter + aggregate.
            let table = view::filtered(&parsed.tree, &settings.filter)
                .with_context(|| format!("filter power report {}", common.log))?;
            if table.collapsed > 0 {
                log::info!(
                    "condensed {} rows into {:?}",
                    table.collapsed,
                    view::OTHER_LABEL
                );
            }
            if settings.verbose || out.is_some() {
                print!("{}", render::render_filtered_text(&table));
            }

            // 3) Render.
            let json = render::render_filtered_json(&table)?;
            write_output(out.as_deref(), &json)?;
        }
    }

    Ok(())
}

fn write_output(out: Option<&str>, body: &str) -> Result<()> {
    match out {
        Some(path) => {
            std::fs::write(path, body).with_context(|| format!("write {}", path))?;
            println!("Wrote {}", path);
        }
        None => println!("{}", body),
    }
    Ok(())
}
