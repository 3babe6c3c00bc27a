use super::Runtime;
use anyhow::Result;
use planner_core::SqliteStore;
use std::io::{BufRead, Write};

pub fn run(runtime: &Runtime, yes: bool) -> Result<()> {
    if !yes && !confirm()? {
        println!("aborted");
        return Ok(());
    }
    let reset = SqliteStore::new(&runtime.conn).strip_processing()?;
    println!("{reset} note(s) returned to the queue");
    Ok(())
}

fn confirm() -> Result<bool> {
    print!("Delete every annotation, action, todo, curiosity and command? [y/N] ");
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}
