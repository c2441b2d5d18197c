//! Converge a PostgreSQL database onto the stock platform schema.

use clap::Parser;
use postgres::{Client, NoTls};

use pg_converge::config::ConnectOptions;
use pg_converge::schema::stock_plan;
use pg_converge::{Error, MigrationRunner, RunStatus};

#[derive(Parser)]
#[command(name = "pg-converge", version, about = "Idempotent schema convergence for PostgreSQL")]
struct Args {
    /// Connection URL; falls back to DB_HOST / DB_PORT / DB_USER /
    /// DB_PASSWORD / DB_NAME when omitted.
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Show which steps would apply, without applying them.
    #[arg(long)]
    dry_run: bool,

    /// Emit the report as JSON.
    #[arg(long)]
    json: bool,
}

fn connect(args: &Args) -> Result<Client, Error> {
    match &args.database_url {
        Some(url) => Ok(Client::connect(url, NoTls)?),
        None => ConnectOptions::from_env()?.connect(),
    }
}

fn run(args: &Args) -> Result<RunStatus, Error> {
    let mut client = connect(args)?;
    let runner = MigrationRunner::new(stock_plan()?);

    if args.dry_run {
        let pending: Vec<String> = runner
            .preview(&mut client)?
            .iter()
            .map(|s| s.name())
            .collect();
        if args.json {
            println!("{}", serde_json::json!({ "pending": pending }));
        } else if pending.is_empty() {
            println!("nothing to apply");
        } else {
            println!("{} step(s) would apply:", pending.len());
            for name in &pending {
                println!("  {}", name);
            }
        }
        return Ok(RunStatus::Converged);
    }

    let report = runner.run(&mut client)?;
    let status = report.status();

    if args.json {
        let mut value = serde_json::to_value(&report)
            .map_err(|e| Error::Generic(format!("failed to serialize report: {}", e)))?;
        value["status"] = serde_json::Value::String(status.to_string());
        println!("{}", value);
    } else {
        println!(
            "{}: {} applied, {} already present, {} warning(s)",
            status,
            report.applied_count(),
            report.already_present_count(),
            report.warning_count()
        );
        for warning in &report.warnings {
            println!("  warning [{}]: {}", warning.step, warning.message);
        }
        if let Some(failure) = &report.failure {
            println!("  failed [{}]: {}", failure.step, failure.message);
        }
    }

    Ok(status)
}

fn main() {
    let args = Args::parse();
    match run(&args) {
        Ok(RunStatus::Aborted { .. }) => std::process::exit(1),
        Ok(_) => {}
        Err(error) => {
            eprintln!("error: {}", error);
            std::process::exit(1);
        }
    }
}
