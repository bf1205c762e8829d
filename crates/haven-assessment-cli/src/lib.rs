//! Command surface for the Haven assessment history.
//!
//! Hosts can embed the same behavior through:
//! - [`run_cli`] for full parsed CLI execution against a `SQLite` file.
//! - [`run_command`] for a parsed [`Command`] against an existing
//!   [`HistoryAggregator`], with any store and clock.

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use haven_assessment_core::{
    chart_series, classify, compute_statistics, entry_trends, format_rfc3339, parse_rfc3339_utc,
    AnswerOption, AssessmentResponse, AssessmentResult, ChartPoint, Classification, Clock,
    FixedClock, HistoryConfig, HistoryPeriod, HistoryStatistics, ResultId, SystemClock, Trend,
    CRISIS_CONTACTS, QUESTIONS,
};
use haven_assessment_store_sqlite::{HistoryAggregator, KeyValueStore, SqliteKeyValueStore};

#[derive(Debug, Parser)]
#[command(name = "haven")]
#[command(about = "Haven depression self-assessment history")]
pub struct Cli {
    #[arg(long, default_value = "./haven.sqlite3")]
    db: PathBuf,

    /// Pin "now" to an RFC3339 UTC instant instead of the system clock.
    #[arg(long)]
    as_of: Option<String>,

    /// Maximum number of results kept in history.
    #[arg(long)]
    capacity: Option<usize>,

    #[arg(long)]
    storage_key: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    Assessment {
        #[command(subcommand)]
        command: AssessmentCommand,
    },
    History {
        #[command(subcommand)]
        command: HistoryCommand,
    },
}

#[derive(Debug, Subcommand)]
pub enum AssessmentCommand {
    /// Lists the nine questions and the answer scale.
    Questions,
    Submit(SubmitArgs),
    Classify(ClassifyArgs),
}

#[derive(Debug, Args)]
pub struct SubmitArgs {
    /// Nine comma-separated answers in 0..=3; -1 marks an unanswered question.
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    answers: Vec<i8>,
}

#[derive(Debug, Args)]
pub struct ClassifyArgs {
    #[arg(long)]
    score: u8,
}

#[derive(Debug, Subcommand)]
pub enum HistoryCommand {
    List(HistoryViewArgs),
    Stats(HistoryViewArgs),
    Trends(HistoryViewArgs),
    Chart(ChartArgs),
    Remove(RemoveArgs),
    Clear,
}

#[derive(Debug, Args)]
pub struct HistoryViewArgs {
    #[arg(long, value_enum, default_value_t = PeriodArg::All)]
    period: PeriodArg,
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
pub struct ChartArgs {
    #[arg(long, value_enum, default_value_t = PeriodArg::All)]
    period: PeriodArg,
    #[arg(long, default_value_t = 10)]
    limit: usize,
}

#[derive(Debug, Args)]
pub struct RemoveArgs {
    #[arg(long)]
    id: String,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum PeriodArg {
    All,
    #[value(name = "30days")]
    Days30,
    #[value(name = "90days")]
    Days90,
    #[value(name = "1year")]
    Year1,
}

/// Executes the parsed top-level CLI against the configured `SQLite` file.
///
/// # Errors
/// Returns an error when option parsing, store open/migrate, or command
/// execution fails.
pub fn run_cli(cli: Cli) -> Result<()> {
    let config = build_config(cli.capacity, cli.storage_key)?;

    match cli.command {
        Command::Assessment {
            command: AssessmentCommand::Questions,
        } => print_json(&questions_payload()),
        Command::Assessment {
            command: AssessmentCommand::Classify(args),
        } => run_classify(&args),
        command => {
            let store = SqliteKeyValueStore::open(&cli.db)?;
            store.migrate()?;
            tracing::debug!(db = %cli.db.display(), "opened history store");

            match cli.as_of {
                Some(raw) => {
                    let now = parse_rfc3339_utc(&raw)
                        .map_err(|err| anyhow!("invalid --as-of value: {err}"))?;
                    let mut aggregator = HistoryAggregator::open(store, FixedClock(now), config)?;
                    run_command(command, &mut aggregator)
                }
                None => {
                    let mut aggregator = HistoryAggregator::open(store, SystemClock, config)?;
                    run_command(command, &mut aggregator)
                }
            }
        }
    }
}

/// Executes a parsed command against an existing aggregator.
///
/// # Errors
/// Returns an error when validation, scoring, or persistence fails.
pub fn run_command<S: KeyValueStore, C: Clock>(
    command: Command,
    aggregator: &mut HistoryAggregator<S, C>,
) -> Result<()> {
    match command {
        Command::Assessment { command } => run_assessment(command, aggregator),
        Command::History { command } => run_history(command, aggregator),
    }
}

fn run_assessment<S: KeyValueStore, C: Clock>(
    command: AssessmentCommand,
    aggregator: &mut HistoryAggregator<S, C>,
) -> Result<()> {
    match command {
        AssessmentCommand::Questions => print_json(&questions_payload()),
        AssessmentCommand::Classify(args) => run_classify(&args),
        AssessmentCommand::Submit(args) => {
            let response = AssessmentResponse::from_raw(&args.answers)
                .map_err(|err| anyhow!("invalid --answers: {err}"))?;
            let submission = aggregator
                .record_assessment(&response)
                .map_err(|err| anyhow!("{err}"))?;

            print_json(&submission)?;
            if !submission.saved {
                return Err(anyhow!(
                    "result scored but not saved: {}",
                    submission.save_error.as_deref().unwrap_or("unknown error")
                ));
            }
            Ok(())
        }
    }
}

fn run_classify(args: &ClassifyArgs) -> Result<()> {
    let classification = classify(args.score).map_err(|err| anyhow!("invalid --score: {err}"))?;
    print_json(&ClassifyPayload {
        crisis_contacts: crisis_contacts_for(&classification),
        classification,
    })
}

fn run_history<S: KeyValueStore, C: Clock>(
    command: HistoryCommand,
    aggregator: &mut HistoryAggregator<S, C>,
) -> Result<()> {
    match command {
        HistoryCommand::List(args) => {
            let period = map_period(args.period);
            let entries = aggregator.filter_by_period(period);
            if args.json {
                print_json(&entries)
            } else {
                print_history_table(&entries);
                Ok(())
            }
        }
        HistoryCommand::Stats(args) => {
            let period = map_period(args.period);
            let statistics = compute_statistics(&aggregator.filter_by_period(period));
            if args.json {
                print_json(&StatsPayload {
                    contract_version: "history_stats.v1".to_string(),
                    period,
                    statistics,
                })
            } else {
                print_statistics(period, statistics);
                Ok(())
            }
        }
        HistoryCommand::Trends(args) => {
            let entries = aggregator.filter_by_period(map_period(args.period));
            let rows = entries
                .iter()
                .zip(entry_trends(&entries))
                .map(|(entry, trend)| TrendRow {
                    id: entry.id.clone(),
                    score: entry.score,
                    trend,
                })
                .collect::<Vec<_>>();
            if args.json {
                print_json(&rows)
            } else {
                print_trend_rows(&rows);
                Ok(())
            }
        }
        HistoryCommand::Chart(args) => {
            let entries = aggregator.filter_by_period(map_period(args.period));
            let points: Vec<ChartPoint> = chart_series(&entries, args.limit);
            print_json(&points)
        }
        HistoryCommand::Remove(args) => {
            let id: ResultId = args
                .id
                .parse()
                .map_err(|err| anyhow!("invalid --id: {err}"))?;
            let removed = aggregator.remove(&id)?;
            print_json(&serde_json::json!({ "id": id, "removed": removed }))
        }
        HistoryCommand::Clear => {
            aggregator.clear()?;
            print_json(&serde_json::json!({ "cleared": true }))
        }
    }
}

fn build_config(capacity: Option<usize>, storage_key: Option<String>) -> Result<HistoryConfig> {
    let mut config = HistoryConfig::v1();
    if let Some(value) = capacity {
        config.capacity = value;
    }
    if let Some(value) = storage_key {
        config.storage_key = value;
    }
    config
        .validate()
        .map_err(|err| anyhow!("invalid history options: {err}"))?;
    Ok(config)
}

fn map_period(value: PeriodArg) -> HistoryPeriod {
    match value {
        PeriodArg::All => HistoryPeriod::All,
        PeriodArg::Days30 => HistoryPeriod::Last30Days,
        PeriodArg::Days90 => HistoryPeriod::Last90Days,
        PeriodArg::Year1 => HistoryPeriod::LastYear,
    }
}

fn crisis_contacts_for(classification: &Classification) -> Vec<String> {
    if classification.requires_urgent_resources {
        CRISIS_CONTACTS.iter().map(ToString::to_string).collect()
    } else {
        Vec::new()
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("failed to render JSON output")?;
    println!("{rendered}");
    Ok(())
}

#[derive(Debug, serde::Serialize, PartialEq)]
struct QuestionsPayload {
    questions: Vec<QuestionItem>,
    options: Vec<OptionItem>,
}

#[derive(Debug, serde::Serialize, PartialEq)]
struct QuestionItem {
    number: usize,
    prompt: &'static str,
}

#[derive(Debug, serde::Serialize, PartialEq)]
struct OptionItem {
    value: u8,
    key: &'static str,
    label: &'static str,
}

fn questions_payload() -> QuestionsPayload {
    QuestionsPayload {
        questions: QUESTIONS
            .iter()
            .enumerate()
            .map(|(index, prompt)| QuestionItem {
                number: index + 1,
                prompt: *prompt,
            })
            .collect(),
        options: AnswerOption::ALL
            .iter()
            .map(|option| OptionItem {
                value: option.value(),
                key: option.as_str(),
                label: option.label(),
            })
            .collect(),
    }
}

#[derive(Debug, serde::Serialize, PartialEq)]
struct ClassifyPayload {
    classification: Classification,
    crisis_contacts: Vec<String>,
}

#[derive(Debug, serde::Serialize, PartialEq)]
struct StatsPayload {
    contract_version: String,
    period: HistoryPeriod,
    statistics: HistoryStatistics,
}

#[derive(Debug, serde::Serialize, PartialEq)]
struct TrendRow {
    id: ResultId,
    score: u8,
    trend: Option<Trend>,
}

fn print_history_table(entries: &[AssessmentResult]) {
    println!(
        "{:<26} {:<20} {:<6} {:<13} label",
        "id", "completed_at", "score", "urgency"
    );
    println!("{}", "-".repeat(100));
    for entry in entries {
        println!("{}", history_row(entry));
    }
}

fn history_row(entry: &AssessmentResult) -> String {
    let completed_at = format_rfc3339(entry.timestamp).unwrap_or_else(|_| "invalid".to_string());
    let score = format!("{}/27", entry.score);
    match entry.severity() {
        Ok(band) => format!(
            "{:<26} {completed_at:<20} {score:<6} {:<13} {} {}",
            entry.id,
            band.urgency().as_str(),
            band.emoji(),
            band.label()
        ),
        Err(_) => format!(
            "{:<26} {completed_at:<20} {score:<6} {:<13} {}",
            entry.id, "-", entry.severity_label
        ),
    }
}

fn print_statistics(period: HistoryPeriod, statistics: HistoryStatistics) {
    println!(
        "period={} total_tests={} average_score={} lowest_score={} highest_score={}",
        period.as_str(),
        statistics.total_tests,
        statistics.average_score,
        statistics.lowest_score,
        statistics.highest_score
    );
    println!(
        "improvement_count={} trend={}",
        statistics.improvement_count,
        statistics.trend.as_str()
    );
}

fn print_trend_rows(rows: &[TrendRow]) {
    println!("{:<26} {:<6} trend", "id", "score");
    println!("{}", "-".repeat(50));
    for row in rows {
        println!(
            "{:<26} {:<6} {}",
            row.id,
            row.score,
            row.trend.map_or("-", Trend::as_str)
        );
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::manual_let_else)]

    use super::*;
    use haven_assessment_store_sqlite::MemoryKeyValueStore;
    use serde_json::json;

    fn must<T>(result: Result<T>) -> T {
        match result {
            Ok(value) => value,
            Err(err) => panic!("test failure: {err}"),
        }
    }

    fn fixture_aggregator() -> HistoryAggregator<MemoryKeyValueStore, FixedClock> {
        let now = must(parse_rfc3339_utc("2026-03-31T12:00:00Z").map_err(|err| anyhow!(err)));
        must(HistoryAggregator::open(
            MemoryKeyValueStore::new(),
            FixedClock(now),
            HistoryConfig::v1(),
        ))
    }

    fn parse_command(args: &[&str]) -> Command {
        let mut argv = vec!["haven"];
        argv.extend_from_slice(args);
        match Cli::try_parse_from(argv) {
            Ok(cli) => cli.command,
            Err(err) => panic!("failed to parse {args:?}: {err}"),
        }
    }

    #[test]
    fn submit_records_into_the_aggregator() {
        let mut aggregator = fixture_aggregator();
        let command = parse_command(&[
            "assessment",
            "submit",
            "--answers",
            "3,3,3,3,3,3,3,3,3",
        ]);
        must(run_command(command, &mut aggregator));

        assert_eq!(aggregator.entries().len(), 1);
        assert_eq!(aggregator.entries()[0].score, 27);
        assert_eq!(aggregator.entries()[0].severity_label, "Severe depression");
    }

    #[test]
    fn submit_rejects_unanswered_questions() {
        let mut aggregator = fixture_aggregator();
        let command = parse_command(&[
            "assessment",
            "submit",
            "--answers",
            "1,1,1,1,-1,1,1,1,1",
        ]);
        assert!(run_command(command, &mut aggregator).is_err());
        assert!(aggregator.entries().is_empty());
    }

    #[test]
    fn remove_rejects_blank_ids_and_ignores_unknown_ones() {
        let mut aggregator = fixture_aggregator();
        let command = parse_command(&["history", "remove", "--id", "   "]);
        assert!(run_command(command, &mut aggregator).is_err());

        let command = parse_command(&["history", "remove", "--id", "depression_1767225600000"]);
        must(run_command(command, &mut aggregator));
        assert_eq!(must(aggregator.store().get("depressionTestHistory")), None);
    }

    #[test]
    fn zero_capacity_option_is_rejected() {
        assert!(build_config(Some(0), None).is_err());
        assert!(build_config(None, Some(" ".to_string())).is_err());
        let config = must(build_config(Some(5), None));
        assert_eq!(config.capacity, 5);
    }

    #[test]
    fn period_flags_map_to_history_periods() {
        let command = parse_command(&["history", "stats", "--period", "30days"]);
        match command {
            Command::History {
                command: HistoryCommand::Stats(args),
            } => assert_eq!(map_period(args.period), HistoryPeriod::Last30Days),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn stats_json_contract_is_stable_v1() {
        let payload = StatsPayload {
            contract_version: "history_stats.v1".to_string(),
            period: HistoryPeriod::Last90Days,
            statistics: HistoryStatistics {
                total_tests: 3,
                average_score: 10,
                lowest_score: 5,
                highest_score: 15,
                improvement_count: 1,
                trend: Trend::Improving,
            },
        };
        let value = must(serde_json::to_value(payload).map_err(Into::into));
        assert_eq!(
            value,
            json!({
                "contract_version": "history_stats.v1",
                "period": "90days",
                "statistics": {
                    "total_tests": 3,
                    "average_score": 10,
                    "lowest_score": 5,
                    "highest_score": 15,
                    "improvement_count": 1,
                    "trend": "improving"
                }
            })
        );
    }

    #[test]
    fn questions_payload_lists_nine_questions_and_four_options() {
        let payload = questions_payload();
        assert_eq!(payload.questions.len(), 9);
        assert_eq!(payload.questions[0].number, 1);
        assert_eq!(payload.options.len(), 4);
        assert_eq!(payload.options[3].label, "Nearly every day");
    }

    #[test]
    fn history_rows_show_band_derived_from_score() {
        let now = must(parse_rfc3339_utc("2026-03-01T09:00:00Z").map_err(|err| anyhow!(err)));
        let response = must(AssessmentResponse::from_raw(&[3; 9]).map_err(|err| anyhow!(err)));
        let mut entry = must(AssessmentResult::from_response(&response, now).map_err(|err| anyhow!(err)));
        entry.severity_label = "Mild depression".to_string();

        let row = history_row(&entry);
        assert!(row.starts_with(entry.id.as_str()));
        assert!(row.contains("2026-03-01T09:00:00Z"));
        assert!(row.contains("27/27"));
        assert!(row.contains("critical"));
        assert!(row.contains("\u{1F622} Severe depression"));
        assert!(!row.contains("Mild depression"));
    }

    #[test]
    fn crisis_contacts_only_for_urgent_scores() {
        let urgent = must(classify(15).map_err(|err| anyhow!(err)));
        let calm = must(classify(14).map_err(|err| anyhow!(err)));
        assert_eq!(crisis_contacts_for(&urgent).len(), CRISIS_CONTACTS.len());
        assert!(crisis_contacts_for(&calm).is_empty());
    }
}
