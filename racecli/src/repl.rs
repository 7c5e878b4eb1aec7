// the interactive race-office prompt

use crate::edit::edit_json;
use anyhow::Result;
use app_core::{
    Competitor, Core, DbpCard, DbpCompetitor, DbpRun, PunchReadout, ReceiptSink,
    competitor_record,
    timing::{fmt_clock_opt, fmt_duration_opt},
};
use dialoguer::{Confirm, Input, Select};
use printer_escpos::MuxSink;
use serde_json::json;

struct CommandDef {
    name: &'static str,
    synopsis: &'static str,
    description: &'static str,
}

const COMMANDS: &[CommandDef] = &[
    CommandDef { name: "help", synopsis: "help", description: "List commands" },
    CommandDef { name: "day", synopsis: "day <day>", description: "Set current stage day" },
    CommandDef { name: "ls", synopsis: "ls [query]", description: "List competitors matching query" },
    CommandDef { name: "edit", synopsis: "edit <id|query>", description: "Edit a competitor record" },
    CommandDef { name: "add", synopsis: "add", description: "Add a new competitor" },
    CommandDef { name: "assign", synopsis: "assign", description: "Assign a stored card to a run" },
    CommandDef { name: "modify", synopsis: "modify", description: "Edit a card payload and reprocess it" },
    CommandDef { name: "register", synopsis: "register [query]", description: "Register competitors for start" },
    CommandDef { name: "summary", synopsis: "summary [max_place]", description: "Print the multi-day summary" },
    CommandDef { name: "quit", synopsis: "quit", description: "Quit the CLI" },
];

/// Resolve a possibly abbreviated command. An ambiguous prefix resolves only
/// on an exact match.
fn resolve_command(input: &str) -> Option<&'static str> {
    let matches: Vec<&CommandDef> = COMMANDS
        .iter()
        .filter(|c| c.name.starts_with(input))
        .collect();
    if matches.len() == 1 {
        return Some(matches[0].name);
    }
    COMMANDS.iter().find(|c| c.name == input).map(|c| c.name)
}

pub async fn run(core: &Core, printer: Option<&str>) -> Result<()> {
    println!("Orienteering CLI (type 'help' for commands)");
    loop {
        let day = core
            .current_day()
            .await
            .map(|d| d.to_string())
            .unwrap_or_else(|_| "?".to_string());
        let line: String = match Input::new()
            .with_prompt(format!("E{day}>"))
            .allow_empty(true)
            .interact_text()
        {
            Ok(line) => line,
            Err(_) => break, // EOF or closed terminal
        };

        let mut parts = line.split_whitespace();
        let Some(word) = parts.next() else { continue };
        let args: Vec<&str> = parts.collect();

        let outcome = match resolve_command(&word.to_lowercase()) {
            Some("quit") => break,
            Some("help") => {
                for command in COMMANDS {
                    println!("{:<22} {}", command.synopsis, command.description);
                }
                Ok(())
            }
            Some("day") => set_day(core, &args).await,
            Some("ls") => ls(core, &args.join(" ")).await,
            Some("edit") => edit(core, &args.join(" ")).await,
            Some("add") => add(core).await,
            Some("assign") => assign(core, printer).await,
            Some("modify") => modify(core, printer).await,
            Some("register") => register(core, printer, &args.join(" ")).await,
            Some("summary") => summary(core, printer, &args).await,
            _ => {
                println!("Unknown command, type 'help'");
                Ok(())
            }
        };
        // report and keep the prompt alive
        if let Err(e) = outcome {
            println!("error: {e}");
        }
    }
    Ok(())
}

async fn set_day(core: &Core, args: &[&str]) -> Result<()> {
    match args.first().and_then(|d| d.parse().ok()) {
        Some(day) => core.set_current_day(day).await?,
        None => println!("usage: day <n>"),
    }
    Ok(())
}

/// Case-insensitive substring match over name, group, notes and club code.
async fn find_competitors(core: &Core, query: &str) -> Result<Vec<Competitor>> {
    let competitors = core.database.list_competitors().await?;
    if query.is_empty() {
        return Ok(competitors);
    }
    let query = query.to_lowercase();
    Ok(competitors
        .into_iter()
        .filter(|c| {
            c.full_name().to_lowercase().contains(&query)
                || c.group.to_lowercase().contains(&query)
                || c.reg.to_lowercase().contains(&query)
                || c.notes
                    .as_deref()
                    .is_some_and(|n| n.to_lowercase().contains(&query))
        })
        .collect())
}

fn competitor_line(c: &Competitor) -> String {
    format!(
        "{:>4} | {:<6} | {:<22} | {:<6} | {:?} | {}",
        c.sid,
        c.reg,
        c.full_name(),
        c.group,
        c.declared_days,
        c.notes.as_deref().unwrap_or_default()
    )
}

async fn ls(core: &Core, query: &str) -> Result<()> {
    for competitor in find_competitors(core, query).await? {
        println!("{}", competitor_line(&competitor));
    }
    Ok(())
}

/// Pick one competitor, by id argument or interactively.
async fn pick_competitor(core: &Core, query: &str) -> Result<Option<i64>> {
    if let Ok(id) = query.parse::<i64>() {
        return Ok(Some(id));
    }
    let candidates = find_competitors(core, query).await?;
    if candidates.is_empty() {
        println!("no competitor matches '{query}'");
        return Ok(None);
    }
    if candidates.len() == 1 {
        return Ok(Some(candidates[0].id));
    }
    let lines: Vec<String> = candidates.iter().map(competitor_line).collect();
    match Select::new().items(&lines).default(0).interact_opt()? {
        Some(index) => Ok(Some(candidates[index].id)),
        None => Ok(None),
    }
}

async fn edit(core: &Core, query: &str) -> Result<()> {
    let Some(id) = pick_competitor(core, query).await? else {
        return Ok(());
    };
    let Some(competitor) = core.database.get_competitor(id).await? else {
        println!("No competitor with ID {id}");
        return Ok(());
    };
    let runs = core.database.list_runs_of_competitor(id).await?;
    let (edited, changed) = edit_json(&competitor_record(&competitor, &runs))?;
    if !changed {
        println!("No changes made. Aborted.");
        return Ok(());
    }
    let competitor = core.edit_competitor(&edited).await?;
    println!("Competitor {} updated.", competitor.id);
    Ok(())
}

async fn add(core: &Core) -> Result<()> {
    let skeleton = json!({
        "id": null,
        "reg": "",
        "group": "",
        "sid": 0,
        "first_name": "",
        "last_name": "",
        "notes": null,
        "declared_days": [],
        "fee_due": 0,
        "fee_paid": null,
        "runs": [],
    });
    let (edited, changed) = edit_json(&skeleton)?;
    if !changed {
        println!("No changes made. Aborted.");
        return Ok(());
    }
    let competitor = core.edit_competitor(&edited).await?;
    println!("Added new competitor {}.", competitor.id);
    Ok(())
}

async fn pick_card(core: &Core) -> Result<Option<i64>> {
    let cards = core.database.list_cards().await?;
    if cards.is_empty() {
        println!("no cards read out yet");
        return Ok(None);
    }
    let lines: Vec<String> = cards
        .iter()
        .rev()
        .map(|c| {
            format!(
                "{:>4} | card={:<5} | readout={} | start={:<8} | finish={:<8}",
                c.id,
                c.card_number,
                c.readout_at.format("%H:%M:%S"),
                fmt_clock_opt(Some(c.start_time)),
                fmt_clock_opt(Some(c.finish_time))
            )
        })
        .collect();
    match Select::new().items(&lines).default(0).interact_opt()? {
        Some(index) => Ok(Some(cards[cards.len() - 1 - index].id)),
        None => Ok(None),
    }
}

async fn pick_run(core: &Core) -> Result<Option<i64>> {
    let day = core.current_day().await?;
    let runs = core.database.list_runs_by_day(day).await?;
    if runs.is_empty() {
        println!("no runs on day {day}");
        return Ok(None);
    }
    let mut lines = Vec::with_capacity(runs.len());
    for run in &runs {
        let competitor = core.database.get_competitor(run.competitor_id).await?;
        let (name, group, sid) = competitor
            .map(|c| (c.full_name(), c.group, c.sid))
            .unwrap_or_default();
        lines.push(format!(
            "{:>4} | slot={:<4} | {:<6} | {:<4} | {:<22} | {:<3} | {}",
            run.id,
            run.start_slot.map(|s| s.to_string()).unwrap_or_default(),
            group,
            sid,
            name,
            run.status,
            fmt_duration_opt(run.result)
        ));
    }
    match Select::new().items(&lines).default(0).interact_opt()? {
        Some(index) => Ok(Some(runs[index].id)),
        None => Ok(None),
    }
}

async fn assign(core: &Core, printer: Option<&str>) -> Result<()> {
    let Some(card_id) = pick_card(core).await? else {
        return Ok(());
    };
    let Some(run_id) = pick_run(core).await? else {
        return Ok(());
    };
    let mut sink = MuxSink::open(printer);
    let outcome = core.assign_card(card_id, run_id, &mut sink).await?;
    println!("{}", sink.lines().join("\n"));
    println!("status: {}", outcome.status);
    Ok(())
}

async fn modify(core: &Core, printer: Option<&str>) -> Result<()> {
    let Some(card_id) = pick_card(core).await? else {
        return Ok(());
    };
    let Some(card) = core.database.get_card(card_id).await? else {
        println!("No such card");
        return Ok(());
    };
    let (edited, changed) = edit_json(&card.raw)?;
    if !changed {
        println!("No changes made. Aborted.");
        return Ok(());
    }
    let readout: PunchReadout = serde_json::from_value(edited)?;
    let mut sink = MuxSink::open(printer);
    let outcome = core.process_readout(&readout, &mut sink).await?;
    println!("{}", sink.lines().join("\n"));
    println!("status: {}", outcome.status);
    Ok(())
}

async fn register(core: &Core, printer: Option<&str>, query: &str) -> Result<()> {
    let subset = find_competitors(core, query).await?;
    if subset.is_empty() {
        println!("nothing to register");
        return Ok(());
    }

    let mut payments: Vec<(Competitor, i64)> = Vec::with_capacity(subset.len());
    for competitor in subset {
        if let Some(paid) = competitor.fee_paid {
            println!(
                "{} {} {} already paid {paid}!",
                competitor.sid,
                competitor.group,
                competitor.full_name()
            );
        }
        let amount: i64 = Input::new()
            .with_prompt(format!(
                "{:<22} {:<6} due",
                competitor.full_name(),
                competitor.group
            ))
            .default(competitor.fee_due)
            .interact_text()?;
        payments.push((competitor, amount));
    }

    let total: i64 = payments.iter().map(|(_, amount)| amount).sum();
    for (competitor, amount) in &payments {
        println!(
            "{:>4} {:<8} {:<22} {:>5}",
            competitor.sid,
            competitor.group,
            competitor.full_name(),
            amount
        );
    }
    println!("Total: {total}");

    if !Confirm::new()
        .with_prompt("Accept and print?")
        .default(true)
        .interact()?
    {
        return Ok(());
    }

    let mut sink = MuxSink::open(printer);
    for (competitor, amount) in &payments {
        sink.bold_on()?;
        sink.text(&format!("{:>3}", competitor.sid))?;
        sink.bold_off()?;
        sink.text(&format!(" {:<8}", competitor.group))?;
        sink.text(&format!(" {:<21}", competitor.full_name()))?;
        sink.text(&format!(" {amount:>5}"))?;
        sink.text("\n")?;
    }
    sink.text("\n")?;
    sink.bold_on()?;
    sink.text(&format!("{:>40}", format!("Total: {total}")))?;
    sink.bold_off()?;
    sink.feed(3)?;
    sink.cut()?;

    for (mut competitor, amount) in payments {
        competitor.fee_paid = Some(amount);
        core.database.save_competitor(&competitor).await?;
    }
    Ok(())
}

async fn summary(core: &Core, printer: Option<&str>, args: &[&str]) -> Result<()> {
    let max_place: usize = args.first().and_then(|a| a.parse().ok()).unwrap_or(99);
    let day = core.current_day().await?;
    let groups = core.summary(day).await?;

    let mut printable: Vec<(String, Vec<[String; 6]>)> = Vec::new();
    for (group, results) in groups {
        let mut rows = Vec::new();
        for result in results {
            let Some(place) = result.place else { break };
            if place > max_place {
                break;
            }
            rows.push([
                place.to_string(),
                result.competitor.full_name(),
                result.competitor.reg.clone(),
                result.best_count.to_string(),
                fmt_duration_opt(result.total_time),
                result.total_score.to_string(),
            ]);
        }
        if rows.is_empty() {
            continue;
        }

        println!("{group}");
        for row in &rows {
            println!(
                "{:>2} {:<23} {:>5} {:>2} {:>7} {:>4}",
                row[0], row[1], row[2], row[3], row[4], row[5]
            );
        }
        printable.push((group, rows));
    }

    if printable.is_empty()
        || !Confirm::new().with_prompt("Print?").default(true).interact()?
    {
        return Ok(());
    }

    let mut sink = MuxSink::open(printer);
    for (group, rows) in &printable {
        sink.bold_on()?;
        sink.underline(app_core::Underline::Double)?;
        sink.text(&format!("{group}\n"))?;
        sink.bold_off()?;
        sink.underline(app_core::Underline::Off)?;
        for row in rows {
            sink.text(&format!(
                "{:>2} {:<23} {:>5} {:>2} {:>7} {:>4}\n",
                row[0], row[1], row[2], row[3], row[4], row[5]
            ))?;
        }
        sink.text("\n")?;
    }
    sink.feed(3)?;
    sink.cut()?;
    Ok(())
}
