#![forbid(unsafe_code)]

use std::env;
use std::fs;
use std::io::{self, IsTerminal, Read};

use expunge_engines::statute_match::{
    EmbeddingStatuteMatcher, MatcherProviderConfig, StaticStatuteMatcher, StatuteMatcher,
};
use expunge_os::screening::ScreeningRun;
use expunge_tools::case_file::{parse_case_file, render_json_report, render_report};

const USAGE: &str = "usage: expunge screen <cases.json> [--live] [--json]";

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(2);
    }
}

fn run() -> Result<(), String> {
    let args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() || args[0] != "screen" {
        return Err(USAGE.to_string());
    }
    let path = args.get(1).ok_or_else(|| USAGE.to_string())?;
    let live = args.iter().any(|a| a == "--live");
    let json = args.iter().any(|a| a == "--json");

    let text = fs::read_to_string(path).map_err(|e| format!("cannot read {path}: {e}"))?;
    let docket = parse_case_file(&text)?;

    let matcher: Box<dyn StatuteMatcher> = if live {
        let mut config = MatcherProviderConfig::from_env();
        if config.api_key.is_none() {
            config.api_key = Some(read_api_key()?);
        }
        Box::new(EmbeddingStatuteMatcher::new(config, &docket.statute_lists))
    } else {
        Box::new(StaticStatuteMatcher::from_lists(&docket.statute_lists))
    };

    let today = docket
        .today
        .unwrap_or_else(|| chrono::Local::now().date_naive());
    let outcome = ScreeningRun::new(today)
        .run(
            &docket.arrests,
            &docket.misdemeanors,
            &docket.felonies,
            matcher.as_ref(),
        )
        .map_err(|e| e.to_string())?;

    let report = if json {
        render_json_report(&outcome)?
    } else {
        render_report(&outcome)
    };
    print!("{report}");
    Ok(())
}

fn read_api_key() -> Result<String, String> {
    if io::stdin().is_terminal() {
        let value = rpassword::prompt_password("Enter provider API key:")
            .map_err(|e| e.to_string())?;
        if value.trim().is_empty() {
            return Err("API key must not be empty".to_string());
        }
        Ok(value)
    } else {
        let mut input = String::new();
        io::stdin()
            .read_to_string(&mut input)
            .map_err(|e| e.to_string())?;
        let trimmed = input.trim().to_string();
        if trimmed.is_empty() {
            return Err("API key must not be empty".to_string());
        }
        Ok(trimmed)
    }
}
