use clap::{Parser, Subcommand, ValueEnum};
use sp_app::{AppResult, RunResponse, Session, TableView, query};
use sp_results::{ComputedTable, load_run, save_run, to_json_string, write_csv};
use sp_solver::NewtonSpeciationSolver;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sp-cli")]
#[command(about = "Speciation CLI - chemical equilibrium distribution and titration tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Table,
    Csv,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a problem file
    Validate {
        /// Path to the problem JSON file
        problem_path: PathBuf,
    },
    /// Show the soluble and solid species tables
    Species {
        /// Path to the problem JSON file
        problem_path: PathBuf,
    },
    /// Show the concentration settings visible in a work mode
    Settings {
        /// Path to the problem JSON file
        problem_path: PathBuf,
        /// Work mode: distribution or titration
        #[arg(long, default_value = "distribution")]
        mode: String,
    },
    /// Run a speciation calculation
    Calculate {
        /// Path to the problem JSON file
        problem_path: PathBuf,
        /// Work mode: distribution or titration
        #[arg(long, default_value = "distribution")]
        mode: String,
        /// First pX of the scan (distribution mode)
        #[arg(long)]
        initial_log: Option<f64>,
        /// Last pX of the scan (distribution mode)
        #[arg(long)]
        final_log: Option<f64>,
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
        /// Output file path (optional, defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show a saved calculation
    ShowRun {
        /// Path to a run saved with `calculate --format json --output`
        run_path: PathBuf,
    },
    /// Export one concentration column of a saved calculation
    ExportSeries {
        /// Path to the saved run JSON file
        run_path: PathBuf,
        /// Column label (component or species name)
        column: String,
        /// Output CSV file path (optional, defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> AppResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { problem_path } => cmd_validate(&problem_path),
        Commands::Species { problem_path } => cmd_species(&problem_path),
        Commands::Settings { problem_path, mode } => cmd_settings(&problem_path, &mode),
        Commands::Calculate {
            problem_path,
            mode,
            initial_log,
            final_log,
            format,
            output,
        } => cmd_calculate(
            &problem_path,
            &mode,
            initial_log,
            final_log,
            format,
            output.as_deref(),
        ),
        Commands::ShowRun { run_path } => cmd_show_run(&run_path),
        Commands::ExportSeries {
            run_path,
            column,
            output,
        } => cmd_export_series(&run_path, &column, output.as_deref()),
    }
}

fn cmd_validate(problem_path: &Path) -> AppResult<()> {
    println!("Validating problem: {}", problem_path.display());
    let descriptor = sp_app::load_problem(problem_path)?;
    let summary = sp_app::summarize(&descriptor);
    println!("✓ Problem is valid");
    println!("  Components: {} ({})", summary.nc(), summary.components.join(", "));
    println!(
        "  Species: {} ({} ignored)",
        summary.species, summary.ignored_species
    );
    println!(
        "  Solid species: {} ({} ignored)",
        summary.solids, summary.ignored_solids
    );
    Ok(())
}

fn cmd_species(problem_path: &Path) -> AppResult<()> {
    let mut session = Session::new();
    session.load_file(problem_path)?;

    println!("Species:");
    if let Some(view) = session.species_view() {
        print_view(&view);
    }
    if let Some(view) = session.solid_species_view().filter(|v| !v.rows.is_empty()) {
        println!("\nSolid species:");
        print_view(&view);
    }
    Ok(())
}

fn cmd_settings(problem_path: &Path, mode: &str) -> AppResult<()> {
    let mut session = Session::new();
    session.load_file(problem_path)?;
    let mode = session.select_mode(mode)?;

    println!("Mode: {}", mode.label());
    if let Some(view) = session.concentration_view() {
        print_view(&view);
    }

    let descriptor = session.descriptor();
    if let Some(d) = descriptor.filter(|_| session.policy().shows_scan_bounds()) {
        let dist = &d.distribution;
        println!(
            "\nScan: pX {} to {} step {} (independent component: {})",
            dist.initial_log,
            dist.final_log,
            dist.log_increment,
            d.component_names()
                .get(dist.independent_component)
                .map(String::as_str)
                .unwrap_or("?")
        );
    }
    Ok(())
}

fn cmd_calculate(
    problem_path: &Path,
    mode: &str,
    initial_log: Option<f64>,
    final_log: Option<f64>,
    format: OutputFormat,
    output: Option<&Path>,
) -> AppResult<()> {
    let mut session = Session::new();
    session.load_file(problem_path)?;
    session.select_mode(mode)?;
    session.set_scan_bounds(initial_log, final_log);

    let solver = NewtonSpeciationSolver::default();
    let response = session.calculate(&solver)?;

    match (format, output) {
        (OutputFormat::Table, None) => {
            print_summary(response);
            println!();
            print_computed(response.table());
            if let Some(solids) = &response.solids {
                println!();
                print_computed(solids);
            }
        }
        (OutputFormat::Table, Some(path)) | (OutputFormat::Csv, Some(path)) => {
            write_csv(path, response.table())?;
            println!("✓ Exported {} points to {}", response.table().rows(), path.display());
        }
        (OutputFormat::Csv, None) => print!("{}", response.table().to_csv()),
        (OutputFormat::Json, Some(path)) => {
            save_run(path, &response.record)?;
            println!("✓ Saved run {} to {}", response.run_id(), path.display());
        }
        (OutputFormat::Json, None) => {
            println!("{}", to_json_string(&response.record)?);
        }
    }
    Ok(())
}

fn cmd_show_run(run_path: &Path) -> AppResult<()> {
    println!("Loading run: {}", run_path.display());
    let record = load_run(run_path)?;
    let summary = query::get_run_summary(&record.table)?;

    println!("\nRun Summary:");
    println!("  Run ID: {}", record.run_id);
    println!("  Mode: {}", record.mode);
    println!("  Solver version: {}", record.solver_version);
    println!("  Fingerprint: {}", record.fingerprint);
    println!("  Points: {}", summary.points);
    println!(
        "  {} range: {} - {}",
        summary.axis_label, summary.axis_range.0, summary.axis_range.1
    );

    println!("\nColumns:");
    for name in &record.table.columns {
        println!("  {}", name);
    }
    Ok(())
}

fn cmd_export_series(run_path: &Path, column: &str, output: Option<&Path>) -> AppResult<()> {
    let record = load_run(run_path)?;
    let series = query::extract_series(&record.table, column)?;

    let mut csv = format!("{},{}\n", record.table.axis_label, column);
    for (x, val) in &series {
        csv.push_str(&format!("{},{:e}\n", x, val));
    }

    if let Some(path) = output {
        std::fs::write(path, csv)?;
        println!(
            "✓ Exported {} data points to {}",
            series.len(),
            path.display()
        );
    } else {
        print!("{}", csv);
    }
    Ok(())
}

fn print_summary(response: &RunResponse) {
    let timing = &response.timing;
    let total = timing.total_time_s.max(1.0e-12);
    println!("✓ Calculation completed: {}", response.run_id());
    println!("  Fingerprint: {}", response.record.fingerprint);
    println!("\nTiming summary:");
    println!(
        "  Build:   {:.3}s ({:.1}%)",
        timing.build_time_s,
        100.0 * timing.build_time_s / total
    );
    println!(
        "  Solve:   {:.3}s ({:.1}%)",
        timing.solve_time_s,
        100.0 * timing.solve_time_s / total
    );
    println!(
        "  Project: {:.3}s ({:.1}%)",
        timing.project_time_s,
        100.0 * timing.project_time_s / total
    );
    println!("  Total:   {:.3}s", timing.total_time_s);
}

fn print_rows(headers: &[String], rows: &[Vec<String>]) {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }
    let line = |cells: &[String]| {
        cells
            .iter()
            .zip(&widths)
            .map(|(c, w)| format!("{:>w$}", c, w = w))
            .collect::<Vec<_>>()
            .join("  ")
    };
    println!("{}", line(headers));
    for row in rows {
        println!("{}", line(row));
    }
}

fn print_view(view: &TableView) {
    print_rows(&view.headers, &view.rows);
}

fn print_computed(table: &ComputedTable) {
    let headers: Vec<String> = std::iter::once(table.axis_label.clone())
        .chain(table.columns.iter().cloned())
        .collect();
    let rows: Vec<Vec<String>> = table
        .axis
        .iter()
        .zip(&table.data)
        .map(|(x, row)| {
            std::iter::once(format!("{x:.3}"))
                .chain(row.iter().map(|v| format!("{v:.4e}")))
                .collect()
        })
        .collect();
    print_rows(&headers, &rows);
}
