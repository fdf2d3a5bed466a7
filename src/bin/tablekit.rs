use std::io::Write;
use std::process::ExitCode;
use tablekit::config::{load_config, Config};
use tablekit::{Database, Params, StatementType, Value};
use tracing::info;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "Usage: tablekit <config.toml> <sql> [param ...]";

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 {
        eprintln!("{}", USAGE);
        return ExitCode::from(2);
    }

    let config = match load_config(&args[1]) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration {}: {}", args[1], e);
            return ExitCode::FAILURE;
        }
    };
    init_logging(&config);

    match run(&config, &args[2], &args[3..]) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

/// `RUST_LOG` wins over the config file's `[logging] filter`
fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let directive = config
            .logging
            .as_ref()
            .and_then(|logging| logging.filter.as_deref())
            .unwrap_or("warn");
        EnvFilter::new(directive)
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(config: &Config, sql: &str, raw_params: &[String]) -> tablekit::Result<()> {
    let database = Database::open(&config.database)?;
    info!("Running statement against {}", database.dsn());

    let params = Params::positional(raw_params.iter().map(|raw| parse_param(raw)));
    let mut query = database.query(sql)?;
    let changed = query.execute(params)?;

    if StatementType::from_sql(sql).returns_rows() || !query.column_names()?.is_empty() {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        for record in query.fetch_all_records()? {
            serde_json::to_writer(&mut out, &record)?;
            writeln!(out)?;
        }
    } else {
        println!("{} row(s) affected", changed);
    }
    Ok(())
}

/// Integers and reals are bound as numbers, `NULL` as null, anything else as text
fn parse_param(raw: &str) -> Value {
    if raw.eq_ignore_ascii_case("null") {
        Value::Null
    } else if let Ok(i) = raw.parse::<i64>() {
        Value::Integer(i)
    } else if let Some(f) = parse_real(raw) {
        Value::Real(f)
    } else {
        Value::Text(raw.to_string())
    }
}

/// Plain decimal notation only, so words like `nan` or `inf` stay text
fn parse_real(raw: &str) -> Option<f64> {
    if raw.chars().all(|c| c.is_ascii_digit() || "+-.eE".contains(c)) {
        raw.parse().ok()
    } else {
        None
    }
}
