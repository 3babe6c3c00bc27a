use super::Runtime;
use anyhow::{bail, Result};
use planner_core::model::timestamp::{format_timestamp, now_ms};
use planner_core::repo::NoteRepository;
use planner_core::SqliteStore;

pub fn run(runtime: &Runtime, words: &[String]) -> Result<()> {
    let text = words.join(" ");
    if text.trim().is_empty() {
        bail!("note text is empty");
    }
    let store = SqliteStore::new(&runtime.conn);
    let note = store.create_note(text.trim(), now_ms())?;
    println!("note {} written at {}", note.id, format_timestamp(note.timestamp));
    Ok(())
}
