use std::{io::stdin, path::PathBuf, thread, time::Duration};

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use student_stresscheck::{
    assess, history_view, percentage, timer::DEFAULT_MINUTES, AnswerStore, CsvStore, Error,
    InvalidInput, ResultStore, StudyTimer, TestResult, DEFAULT_HISTORY_LIMIT, QUESTIONS,
};

/// Offline stress check. Results are kept in a local CSV file.
#[derive(Parser)]
struct Args {
    /// Result file shared with the server
    #[arg(long, env = "STRESSCHECK_DATA", default_value = "data/results.csv")]
    data: PathBuf,
    /// Whose results to record and show; anonymous when omitted
    #[arg(long)]
    owner: Option<String>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Take the test (default)
    Test,
    /// Show past results with their trend
    History {
        #[arg(long, default_value_t = DEFAULT_HISTORY_LIMIT)]
        limit: usize,
    },
    /// Run a study countdown in the terminal
    Timer {
        #[arg(long, default_value_t = DEFAULT_MINUTES)]
        minutes: u32,
    },
}

fn main() -> Result<(), Error> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let owner = args.owner.as_deref();

    match args.command.unwrap_or(Command::Test) {
        Command::Test => {
            let store = CsvStore::open(&args.data)?;
            let result = take_test(&store, owner)?;
            print_result(&result);
            print_history(&store.list_by_owner(owner)?, DEFAULT_HISTORY_LIMIT);
        }
        Command::History { limit } => {
            let store = CsvStore::open(&args.data)?;
            print_history(&store.list_by_owner(owner)?, limit);
        }
        Command::Timer { minutes } => run_timer(minutes),
    }
    Ok(())
}

fn take_test(store: &dyn ResultStore, owner: Option<&str>) -> Result<TestResult, Error> {
    let mut buffer = String::new();
    let mut answers = AnswerStore::default();

    println!("{}", QUESTIONS.theme);
    for (index, question) in QUESTIONS.questions().iter().enumerate() {
        println!();
        println!("{}. {}", index + 1, question.text);
        for choice in &question.choices {
            print!("  {} => {}", choice.value, choice.text);
        }
        loop {
            println!();
            if stdin().read_line(&mut buffer)? == 0 {
                return Err(InvalidInput::NotFullfilled.into());
            }
            if store_answer(buffer.trim(), &mut answers).is_err() {
                println!("Please answer with a number from 1 to 5.");
                buffer.clear();
            } else {
                buffer.clear();
                break;
            }
        }
    }

    let assessment = assess(&answers.to_answer_set()?);
    store.create(owner, &assessment)
}

fn store_answer(value: &str, answers: &mut AnswerStore) -> Result<(), InvalidInput> {
    let value = value.parse::<u8>().map_err(|_| InvalidInput::IllegalAnswer)?;
    answers.push(value)
}

fn print_result(result: &TestResult) {
    println!();
    println!("Score: {}/35 ({}%)", result.score, percentage(result.score));
    println!("{} - {}", result.level, result.level.comparison());
    println!("{}", result.level.description());
    println!();
    println!("Recommendations:");
    for recommendation in &result.recommendations {
        println!("  * {recommendation}");
    }
}

fn print_history(results: &[TestResult], limit: usize) {
    let rows = history_view(results, limit);
    if rows.is_empty() {
        println!("No test history available");
        return;
    }
    println!();
    println!("{:<17} {:>5}  {:<14} Trend", "Date", "Score", "Level");
    for row in rows {
        println!(
            "{:<17} {:>5}  {:<14} {}",
            row.date.format("%Y-%m-%d %H:%M").to_string(),
            row.score,
            row.level.label(),
            row.trend.map(|trend| trend.arrow()).unwrap_or("")
        );
    }
}

fn run_timer(minutes: u32) {
    let mut timer = StudyTimer::with_minutes(minutes);
    timer.start();
    println!("{}", timer.display());
    loop {
        thread::sleep(Duration::from_secs(1));
        let expired = timer.tick();
        println!("{}", timer.display());
        if expired {
            println!("Time is up. Take a break!");
            break;
        }
    }
}
