//! Terminal front ends: the interactive wizard, one-shot assessment from an
//! answers file, and catalog listings.

use crate::infra::{apply_calculator_override, read_answers, runtime_dependencies, write_artifacts};
use clap::{Args, ValueEnum};
use noise_wizard::calculation::{CalculationClient, HttpCalculationClient};
use noise_wizard::config::AppConfig;
use noise_wizard::error::AppError;
use noise_wizard::reference::{group_plants, group_scenarios, ReferenceData};
use noise_wizard::report::{render_text, DownloadKind, ResultSummary};
use noise_wizard::telemetry::{self, LogTarget};
use noise_wizard::wizard::content::StepContent;
use noise_wizard::wizard::domain::{OutputPack, NOISE_CATEGORIES};
use noise_wizard::wizard::{
    FieldUpdate, Navigation, SessionError, SessionPhase, SubmissionOutcome, WizardSession,
};
use serde_json::json;
use std::fmt::Write as _;
use std::path::PathBuf;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{info, warn};

#[derive(Args, Debug, Default)]
pub(crate) struct WizardArgs {
    /// Override the calculation service endpoint
    #[arg(long)]
    pub(crate) calculator_url: Option<String>,
}

#[derive(Args, Debug)]
pub(crate) struct AssessArgs {
    /// JSON file holding the wizard answers
    pub(crate) answers: PathBuf,
    /// Override the calculation service endpoint
    #[arg(long)]
    pub(crate) calculator_url: Option<String>,
    /// Write every available download into this directory
    #[arg(long)]
    pub(crate) output_dir: Option<PathBuf>,
    /// Print the result as JSON instead of the text report
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum CatalogTable {
    Scenarios,
    Plants,
    Locations,
}

#[derive(Args, Debug)]
pub(crate) struct CatalogArgs {
    /// Which table to list
    #[arg(value_enum)]
    pub(crate) table: CatalogTable,
}

const HELP: &str = "\
Commands:
  <number>          choose an option on the current step
  n / b             next step / previous step
  distance <m>      set the receiver distance in metres
  background <dB>   set the measured background level
  trace on|off      request the calculation trace
  pack <kind>       attach packs: none, step2, ref, both
  s                 calculate (review step only)
  save <dir>        write the result downloads into a directory
  r                 start a new assessment after a result
  ?                 show this help
  q                 quit
";

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TerminalCommand {
    Next,
    Back,
    Submit,
    Restart,
    Quit,
    Help,
    Pick(usize),
    Distance(String),
    Background(String),
    Trace(bool),
    Pack(OutputPack),
    Save(PathBuf),
}

pub(crate) fn parse_command(line: &str) -> Result<TerminalCommand, String> {
    let line = line.trim();
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    match (verb.to_ascii_lowercase().as_str(), rest) {
        ("n" | "next", "") => Ok(TerminalCommand::Next),
        ("b" | "back", "") => Ok(TerminalCommand::Back),
        ("s" | "submit", "") => Ok(TerminalCommand::Submit),
        ("r" | "restart", "") => Ok(TerminalCommand::Restart),
        ("q" | "quit", "") => Ok(TerminalCommand::Quit),
        ("?" | "help", "") => Ok(TerminalCommand::Help),
        ("distance", value) if !value.is_empty() => Ok(TerminalCommand::Distance(value.to_string())),
        ("background", value) if !value.is_empty() => {
            Ok(TerminalCommand::Background(value.to_string()))
        }
        ("trace", "on") => Ok(TerminalCommand::Trace(true)),
        ("trace", "off") => Ok(TerminalCommand::Trace(false)),
        ("pack", kind) => serde_json::from_value(json!(kind))
            .map(TerminalCommand::Pack)
            .map_err(|_| format!("unknown pack '{kind}'; use none, step2, ref or both")),
        ("save", dir) if !dir.is_empty() => Ok(TerminalCommand::Save(PathBuf::from(dir))),
        (number, "") => number
            .parse::<usize>()
            .ok()
            .filter(|choice| *choice > 0)
            .map(TerminalCommand::Pick)
            .ok_or_else(|| format!("unrecognised command '{line}'; type ? for help")),
        _ => Err(format!("unrecognised command '{line}'; type ? for help")),
    }
}

/// Map a 1-based menu number on the current step to the edit it stands for.
/// Catalog entries are numbered continuously across their groups.
pub(crate) fn pick_update(content: &StepContent, choice: usize) -> Result<FieldUpdate, String> {
    let index = choice.checked_sub(1).ok_or("options start at 1")?;
    let out_of_range = || format!("there is no option {choice} on this step");

    match content {
        StepContent::Choice { field, options, .. } => {
            let option = options.get(index).ok_or_else(out_of_range)?;
            serde_json::from_value(json!({ "field": field, "value": option.key }))
                .map_err(|err| err.to_string())
        }
        StepContent::Location { options } => options
            .get(index)
            .map(|option| FieldUpdate::NoiseCategoryId(Some(option.id.to_string())))
            .ok_or_else(out_of_range),
        StepContent::ScenarioCatalog { groups, .. } | StepContent::PlantCatalog { groups, .. } => {
            groups
                .iter()
                .flat_map(|group| group.entries.iter())
                .nth(index)
                .map(|entry| FieldUpdate::ScenarioId(Some(entry.id.clone())))
                .ok_or_else(out_of_range)
        }
        StepContent::NoSelection { .. } | StepContent::Distance { .. } | StepContent::Review { .. } => {
            Err("nothing to choose on this step".to_string())
        }
    }
}

pub(crate) fn render_screen(session: &WizardSession, reference: &ReferenceData) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = write_screen(&mut out, session, reference);
    out
}

fn write_screen(
    out: &mut String,
    session: &WizardSession,
    reference: &ReferenceData,
) -> std::fmt::Result {
    if let (SessionPhase::ShowingResult, Some(result)) = (session.phase(), session.last_result()) {
        out.push_str(&render_text(result));
        let downloads: Vec<&str> = ResultSummary::from_result(result)
            .downloads
            .into_iter()
            .map(DownloadKind::label)
            .collect();
        if !downloads.is_empty() {
            writeln!(out, "\nDownloads available: {}", downloads.join(", "))?;
        }
        return writeln!(out, "\n[save <dir>] write downloads  [r] new assessment  [q] quit");
    }

    let view = session.view(reference);
    writeln!(
        out,
        "\nStep {} of {}: {}",
        view.current_step + 1,
        view.step_count,
        view.step.title
    )?;
    write_content(out, &view.content)?;
    if let Some(error) = &view.error {
        writeln!(out, "! {error}")?;
    }

    let mut hints = Vec::new();
    if view.can_retreat {
        hints.push("[b] back");
    }
    if view.can_advance {
        hints.push("[n] next");
    }
    if view.can_submit {
        hints.push("[s] calculate");
    }
    hints.push("[?] help");
    writeln!(out, "{}", hints.join("  "))
}

fn write_content(out: &mut String, content: &StepContent) -> std::fmt::Result {
    match content {
        StepContent::Choice {
            options, degraded, ..
        } => {
            if *degraded {
                writeln!(out, "  (guidance unavailable; showing built-in labels)")?;
            }
            for (index, option) in options.iter().enumerate() {
                writeln!(out, "  {}. {}{}", index + 1, option.title, marker(option.selected))?;
                if !option.description.is_empty() {
                    writeln!(out, "       {}", option.description)?;
                }
            }
        }
        StepContent::Location { options } => {
            for (index, option) in options.iter().enumerate() {
                writeln!(
                    out,
                    "  {}. {} {} (NML day/evening/night {:.0}/{:.0}/{:.0} dB){}",
                    index + 1,
                    option.id,
                    option.name,
                    option.day_nml_db,
                    option.evening_nml_db,
                    option.night_nml_db,
                    marker(option.selected)
                )?;
            }
        }
        StepContent::ScenarioCatalog { groups, degraded }
        | StepContent::PlantCatalog { groups, degraded } => {
            if *degraded {
                writeln!(out, "  (catalog unavailable)")?;
            }
            let mut number = 0;
            for group in groups {
                writeln!(out, "  {}", group.label)?;
                for entry in &group.entries {
                    number += 1;
                    writeln!(
                        out,
                        "    {}. {} [{}] {}{}",
                        number,
                        entry.name,
                        entry.id,
                        entry.detail,
                        marker(entry.selected)
                    )?;
                }
            }
        }
        StepContent::NoSelection { reason } => {
            writeln!(out, "  {reason}")?;
        }
        StepContent::Distance {
            receiver_distance,
            distance_used,
            asks_background_level,
            user_background_level,
            guidelines,
        } => {
            let usage = if *distance_used {
                "used in the calculation"
            } else {
                "recorded for reference"
            };
            writeln!(
                out,
                "  Receiver distance: {} m ({usage})",
                receiver_distance.as_deref().unwrap_or("not set")
            )?;
            if *asks_background_level {
                writeln!(
                    out,
                    "  Background level: {} dB(A)",
                    user_background_level.as_deref().unwrap_or("not set")
                )?;
            }
            for guideline in guidelines.iter() {
                writeln!(out, "  - {guideline}")?;
            }
        }
        StepContent::Review { summary } => {
            for line in summary {
                writeln!(out, "  {}: {}", line.label, line.value)?;
            }
        }
    }
    Ok(())
}

/// Command help followed by any tips shipped with the guidance data.
pub(crate) fn help_text(reference: &ReferenceData) -> String {
    let mut out = HELP.to_string();
    let tips = reference
        .guidance()
        .map(|guidance| guidance.tips.as_slice())
        .unwrap_or_default();
    if !tips.is_empty() {
        out.push_str("\nTips:\n");
        for tip in tips {
            out.push_str("  - ");
            out.push_str(tip);
            out.push('\n');
        }
    }
    out
}

fn marker(selected: bool) -> &'static str {
    if selected {
        "  *"
    } else {
        ""
    }
}

async fn execute(
    command: TerminalCommand,
    session: &mut WizardSession,
    reference: &ReferenceData,
    calculator: &dyn CalculationClient,
) -> Result<String, SessionError> {
    let message = match command {
        TerminalCommand::Next => match session.advance()? {
            Navigation::Moved { .. } => String::new(),
            Navigation::Blocked { .. } => "Answer this step before continuing.".to_string(),
            Navigation::AtBoundary { .. } => "Already on the last step.".to_string(),
        },
        TerminalCommand::Back => match session.retreat()? {
            Navigation::AtBoundary { .. } => "Already on the first step.".to_string(),
            _ => String::new(),
        },
        TerminalCommand::Submit => match session.submit(calculator).await? {
            SubmissionOutcome::Completed => "Calculation complete.".to_string(),
            SubmissionOutcome::Failed => format!(
                "Calculation failed: {}",
                session.last_error().unwrap_or_default()
            ),
            SubmissionOutcome::Discarded => "Answers changed; result discarded.".to_string(),
        },
        TerminalCommand::Restart => {
            session.restart()?;
            "Starting a new assessment.".to_string()
        }
        TerminalCommand::Pick(choice) => {
            let content = session.view(reference).content;
            match pick_update(&content, choice) {
                Ok(update) => {
                    session.apply(update)?;
                    String::new()
                }
                Err(message) => message,
            }
        }
        TerminalCommand::Distance(value) => {
            session.apply(FieldUpdate::ReceiverDistance(Some(value)))?;
            String::new()
        }
        TerminalCommand::Background(value) => {
            session.apply(FieldUpdate::UserBackgroundLevel(Some(value)))?;
            String::new()
        }
        TerminalCommand::Trace(enabled) => {
            session.apply(FieldUpdate::IncludeTrace(enabled))?;
            format!("Calculation trace {}.", if enabled { "on" } else { "off" })
        }
        TerminalCommand::Pack(pack) => {
            session.apply(FieldUpdate::OutputPack(Some(pack)))?;
            format!("Output packs: {}.", pack.label())
        }
        TerminalCommand::Save(dir) => match session.last_result() {
            Some(result) => match write_artifacts(result, &dir).await {
                Ok(paths) if paths.is_empty() => "This result has no downloads.".to_string(),
                Ok(paths) => paths
                    .iter()
                    .map(|path| format!("wrote {}", path.display()))
                    .collect::<Vec<_>>()
                    .join("\n"),
                Err(err) => {
                    warn!(error = %err, dir = %dir.display(), "saving downloads failed");
                    format!("Could not save downloads: {err}")
                }
            },
            None => "There is no result to save yet.".to_string(),
        },
        TerminalCommand::Help => help_text(reference),
        TerminalCommand::Quit => String::new(),
    };
    Ok(message)
}

/// Read commands line by line until `q` or end of input, redrawing after each.
pub(crate) async fn drive<R, W>(
    session: &mut WizardSession,
    reference: &ReferenceData,
    calculator: &dyn CalculationClient,
    input: R,
    output: &mut W,
) -> Result<(), AppError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    emit(output, &render_screen(session, reference)).await?;

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let command = match parse_command(&line) {
            Ok(TerminalCommand::Quit) => break,
            Ok(command) => command,
            Err(message) => {
                emit(output, &format!("{message}\n")).await?;
                continue;
            }
        };

        let message = match execute(command, session, reference, calculator).await {
            Ok(message) => message,
            Err(err) => err.to_string(),
        };
        if !message.is_empty() {
            emit(output, &format!("{}\n", message.trim_end())).await?;
        }
        emit(output, &render_screen(session, reference)).await?;
    }
    Ok(())
}

async fn emit<W: AsyncWrite + Unpin>(output: &mut W, text: &str) -> Result<(), AppError> {
    output.write_all(text.as_bytes()).await?;
    output.flush().await?;
    Ok(())
}

async fn prepare(
    calculator_url: Option<String>,
) -> Result<(ReferenceData, HttpCalculationClient), AppError> {
    let mut config = AppConfig::load()?;
    apply_calculator_override(&mut config, calculator_url)?;
    telemetry::init(&config.telemetry, LogTarget::Stderr)?;
    runtime_dependencies(&config).await
}

pub(crate) async fn run_wizard(args: WizardArgs) -> Result<(), AppError> {
    let (reference, calculator) = prepare(args.calculator_url).await?;
    let mut session = WizardSession::default();
    let input = BufReader::new(tokio::io::stdin());
    let mut output = tokio::io::stdout();
    drive(&mut session, &reference, &calculator, input, &mut output).await
}

pub(crate) async fn run_assess(args: AssessArgs) -> Result<(), AppError> {
    let AssessArgs {
        answers,
        calculator_url,
        output_dir,
        json,
    } = args;

    let (reference, calculator) = prepare(calculator_url).await?;
    let mut session = WizardSession::default();
    session.load_answers(read_answers(&answers).await?)?;
    session.advance_to_review()?;

    let pending = session.begin_submission()?;
    let result = calculator.calculate(&pending.request).await?;
    session.complete_submission(pending.ticket, Ok(result));
    let result = session.last_result().ok_or(SessionError::NoResult)?;
    info!(request_id = %result.request_id, "assessment complete");

    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
    } else {
        for line in noise_wizard::wizard::content::review_summary(session.form(), &reference) {
            println!("{}: {}", line.label, line.value);
        }
        println!();
        print!("{}", render_text(result));
    }

    if let Some(dir) = output_dir {
        for path in write_artifacts(result, &dir).await? {
            eprintln!("wrote {}", path.display());
        }
    }
    Ok(())
}

pub(crate) fn catalog_text(table: CatalogTable, reference: &ReferenceData) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = write_catalog(&mut out, table, reference);
    if out.is_empty() {
        out.push_str("(no entries loaded)\n");
    }
    out
}

fn write_catalog(
    out: &mut String,
    table: CatalogTable,
    reference: &ReferenceData,
) -> std::fmt::Result {
    match table {
        CatalogTable::Scenarios => {
            for group in group_scenarios(reference.scenarios()) {
                writeln!(out, "{}", group.label)?;
                for scenario in group.entries {
                    let loudest = scenario
                        .loudest_equipment()
                        .map(|(name, level)| format!(" (loudest: {name} {level:.0} dB)"))
                        .unwrap_or_default();
                    writeln!(out, "  {:<24} {}{}", scenario.id, scenario.name, loudest)?;
                }
            }
        }
        CatalogTable::Plants => {
            for group in group_plants(reference.plants()) {
                writeln!(out, "{}", group.label)?;
                for plant in group.entries {
                    writeln!(
                        out,
                        "  {:<24} {} {:.0} dB(A), duty {:.0}%, usage {:.0}%",
                        plant.id,
                        plant.name,
                        plant.sound_power_level,
                        plant.duty_cycle * 100.0,
                        plant.usage_factor * 100.0
                    )?;
                }
            }
        }
        CatalogTable::Locations => {
            for category in NOISE_CATEGORIES.iter() {
                writeln!(
                    out,
                    "{:<4} {} (NML day/evening/night {:.0}/{:.0}/{:.0} dB)",
                    category.id,
                    category.name,
                    category.day_nml_db,
                    category.evening_nml_db,
                    category.night_nml_db
                )?;
            }
        }
    }
    Ok(())
}

pub(crate) async fn run_catalog(args: CatalogArgs) -> Result<(), AppError> {
    let (reference, _) = prepare(None).await?;
    print!("{}", catalog_text(args.table, &reference));
    Ok(())
}
