use super::Runtime;
use crate::cli::CycleArgs;
use anyhow::{Context, Result};
use planner_core::{CycleOutcome, OpenAiGateway, Scheduler, SqliteStore};
use std::time::Duration;

pub fn run(runtime: &Runtime, args: &CycleArgs) -> Result<()> {
    let config = runtime
        .settings
        .gateway
        .openai_config()
        .context("configuring the chat service")?;
    let gateway = OpenAiGateway::new(config).context("creating the gateway client")?;
    let store = SqliteStore::new(&runtime.conn);
    let scheduler = Scheduler::new(&store, &gateway, runtime.settings.processor);

    if args.all {
        let done = scheduler.drain(None)?;
        println!("processed {done} unit(s) of work");
    } else if args.continuous {
        println!("polling every {}s, ctrl-c to stop", args.interval_secs);
        scheduler.run_polling(Duration::from_secs(args.interval_secs), || false)?;
    } else if let Some(iterations) = args.iterations {
        let done = scheduler.run_iterations(iterations)?;
        println!("{iterations} cycle(s), {done} did work");
    } else {
        print_outcome(&scheduler.cycle()?);
    }
    Ok(())
}

fn print_outcome(outcome: &CycleOutcome) {
    match outcome {
        CycleOutcome::Idle => println!("nothing to process"),
        CycleOutcome::Processed(report) | CycleOutcome::Reprocessed(report) => println!(
            "note {} -> {} (applied {}, skipped {}, failed {})",
            report.note_id,
            report.category.map_or("unannotated", |category| category.name()),
            report.applied,
            report.skipped,
            report.failed
        ),
        CycleOutcome::Failed { note_id, error } => println!("note {note_id} failed: {error}"),
    }
}
