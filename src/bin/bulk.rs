use clap::Parser;
use student_stresscheck::{assess, read_bulk, Error};
use std::fs::File;
use std::io::BufReader;

/// Scores every row of a CSV file of answers (id,q1..q7).
#[derive(Parser)]
struct Args {
    path: String,
}

fn main() -> Result<(), Error> {
    let args = Args::parse();
    let reader = BufReader::new(File::open(&args.path)?);
    for row in read_bulk(reader) {
        match row {
            Ok((id, answers)) => {
                let assessment = assess(&answers);
                println!(
                    "id = {}, score = {}, level = {}",
                    id, assessment.score, assessment.level
                );
            }
            Err(e) => {
                eprintln!("skipped row: {}", e);
            }
        }
    }
    Ok(())
}
