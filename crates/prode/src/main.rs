// prode: command-line front end for the knockout-stage prediction pool.

use std::path::Path;
use std::process::ExitCode;

use anyhow::Context;
use prode::app::Pool;
use prode::config;
use prode::report;
use tracing::info;

const USAGE: &str = "\
usage: prode <command> [args]

commands:
  check                          validate config and bracket template
  rank [--json]                  leaderboard for every user
  bracket [--user <id>] [--json] official bracket, or one user's bracket
  points <user_id> [--json]      score breakdown for one user
  import-results <csv>           load official results
  import-predictions <csv>       load user predictions";

fn main() -> anyhow::Result<ExitCode> {
    init_tracing()?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let json = args.iter().any(|a| a == "--json");
    let positional: Vec<&str> = args
        .iter()
        .map(String::as_str)
        .filter(|a| *a != "--json")
        .collect();

    let Some((&command, rest)) = positional.split_first() else {
        eprintln!("{USAGE}");
        return Ok(ExitCode::FAILURE);
    };

    let config = config::load_config().context("failed to load configuration")?;
    info!("Config loaded: pool={}", config.pool.name);

    match (command, rest) {
        ("check", []) => {
            let mut pool = Pool::open(config)?;
            let ties = pool.template().ties()?;
            let fixture = pool.official_fixture()?;
            println!(
                "{}: {} matches, {} ties, {} results entered",
                pool.template().edition,
                pool.template().matches.len(),
                ties.len(),
                fixture.matches.iter().filter(|m| m.score.is_some()).count()
            );
            let overdue = pool.overdue_matches(chrono::Utc::now())?;
            if !overdue.is_empty() {
                let ids: Vec<String> = overdue.iter().map(|id| id.to_string()).collect();
                println!("past kickoff without a result: {}", ids.join(", "));
            }
        }
        ("rank", []) => {
            let mut pool = Pool::open(config)?;
            let ranking = pool.rank()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&ranking)?);
            } else {
                print!("{}", report::ranking_table(&ranking));
            }
        }
        ("bracket", []) => {
            let mut pool = Pool::open(config)?;
            let fixture = pool.official_fixture()?;
            print_fixture(&fixture, json)?;
        }
        ("bracket", ["--user", user_id]) => {
            let pool = Pool::open(config)?;
            let fixture = pool.user_fixture(user_id)?;
            print_fixture(&fixture, json)?;
        }
        ("points", [user_id]) => {
            let mut pool = Pool::open(config)?;
            let (display_name, score) = pool.points(user_id)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&score)?);
            } else {
                print!("{}", report::points_view(&display_name, &score));
            }
        }
        ("import-results", [path]) => {
            let mut pool = Pool::open(config)?;
            let count = pool.import_results(Path::new(path))?;
            println!("imported {count} results");
        }
        ("import-predictions", [path]) => {
            let mut pool = Pool::open(config)?;
            let count = pool.import_predictions(Path::new(path))?;
            println!("imported {count} predictions");
        }
        _ => {
            eprintln!("unknown command or arguments: {}\n\n{USAGE}", positional.join(" "));
            return Ok(ExitCode::FAILURE);
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn print_fixture(fixture: &prode_core::resolver::VirtualFixture, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(fixture)?);
    } else {
        print!("{}", report::bracket_view(fixture));
    }
    Ok(())
}

/// Logs go to stderr so command output on stdout stays clean for piping.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("prode=info,prode_core=info,warn")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
