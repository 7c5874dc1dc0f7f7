use crate::transfer::{Phase, ProgressUpdate};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::collections::HashMap;
use tokio::{sync::mpsc::UnboundedReceiver, task::JoinHandle};

// "█▉▊▋▌▍▎▏  ·"
const PROGRES_CHARS: &str =
    "\u{2588}\u{2589}\u{258a}\u{258b}\u{258c}\u{258d}\u{258e}\u{258f}  \u{b7}";

/// Render the core's progress events, one bar per transfer.
///
/// The task ends when the event channel closes; in quiet mode events are
/// drained without drawing anything.
#[must_use]
pub fn spawn_renderer(
    mut events: UnboundedReceiver<ProgressUpdate>,
    quiet: bool,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        if quiet {
            while events.recv().await.is_some() {}
            return;
        }

        let multi = MultiProgress::new();
        let mut bars: HashMap<String, ProgressBar> = HashMap::new();

        while let Some(update) = events.recv().await {
            let bar = bars
                .entry(update.transfer_id.clone())
                .or_insert_with(|| new_bar(&multi, &update.name, update.total_bytes));

            bar.set_position(u64::from(update.percentage));

            match update.phase {
                Phase::Completed => bar.finish_with_message(format!("{} \u{2713}", update.name)),
                Phase::Failed => bar.abandon_with_message(format!("{} failed", update.name)),
                Phase::Processing => bar.set_message(format!("{} (processing)", update.name)),
                _ => {}
            }
        }
    })
}

fn new_bar(multi: &MultiProgress, name: &str, total_bytes: u64) -> ProgressBar {
    let pb = multi.add(ProgressBar::new(100));

    let style_result = ProgressStyle::default_bar()
        .template("{msg:<32} [{bar:40.green/blue}] {pos:>3}% ({prefix})");

    match style_result {
        Ok(style) => pb.set_style(style.progress_chars(PROGRES_CHARS)),
        Err(err) => eprintln!("Error creating progress bar style: {err}"),
    }

    pb.set_prefix(bytesize::ByteSize(total_bytes).display().iec().to_string());
    pb.set_message(name.to_string());
    pb
}
