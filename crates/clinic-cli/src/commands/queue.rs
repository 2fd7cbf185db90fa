use clinic_core::queue::QueueService;
use clinic_core::util::local_today;
use clinic_core::QueueItem;

use crate::commands::common::{
    format_queue_lines, parse_day, parse_id, patient_label, print_json, Context,
};
use crate::error::CliError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueueAction {
    Start,
    Complete,
    Cancel,
}

pub fn run_queue_add(patient_id: &str, ctx: &Context) -> Result<QueueItem, CliError> {
    let patient_id = parse_id(patient_id)?;
    let item = QueueService::new(ctx.open_store()?).enqueue(&patient_id)?;
    println!("Token #{} ({})", item.token_number, item.id);
    Ok(item)
}

pub fn run_queue_list(date: Option<&str>, as_json: bool, ctx: &Context) -> Result<(), CliError> {
    let day = date.map_or_else(|| Ok(local_today()), parse_day)?;
    let store = ctx.open_store()?;
    let items = QueueService::new(store.clone()).list_for_day(day)?;

    if as_json {
        return print_json(&items);
    }
    if items.is_empty() {
        println!("Queue for {day} is empty.");
        return Ok(());
    }
    for line in format_queue_lines(&items, &|id| patient_label(&store, id)) {
        println!("{line}");
    }
    Ok(())
}

pub fn run_queue_transition(
    id: &str,
    action: QueueAction,
    ctx: &Context,
) -> Result<QueueItem, CliError> {
    let id = parse_id(id)?;
    let queue = QueueService::new(ctx.open_store()?);
    let item = match action {
        QueueAction::Start => queue.start(&id)?,
        QueueAction::Complete => queue.complete(&id)?,
        QueueAction::Cancel => queue.cancel(&id)?,
    };
    println!("Token #{} is now {}", item.token_number, item.status);
    Ok(item)
}
