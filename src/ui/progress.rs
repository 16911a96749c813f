use crate::ingest::IngestEvent;
use crate::ui::theme;
use crate::ui::Icons;
use crossbeam::channel::Receiver;
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use std::thread;
use std::time::Duration;

/// Debtors that finished or failed while the bar was running
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressTally {
    pub finished: usize,
    pub failed: usize,
}

/// Progress bar driven by ingestion events.
///
/// The listener thread runs until every sender of the event channel is
/// dropped, so drop the pipeline (or facade) before calling [`finish`].
///
/// [`finish`]: IngestProgress::finish
pub struct IngestProgress {
    bar: ProgressBar,
    handle: thread::JoinHandle<ProgressTally>,
}

impl IngestProgress {
    pub fn spawn(total_debtors: usize, events: Receiver<IngestEvent>) -> Self {
        let bar = if console::Term::stdout().is_term() {
            let bar = ProgressBar::new(total_debtors as u64);
            if let Ok(style) =
                ProgressStyle::with_template("{spinner} [{bar:30}] {pos}/{len} debtors {wide_msg}")
            {
                bar.set_style(style.progress_chars("=> "));
            }
            bar.enable_steady_tick(Duration::from_millis(100));
            bar
        } else {
            ProgressBar::hidden()
        };

        let listener = bar.clone();
        let handle = thread::spawn(move || {
            let mut tally = ProgressTally::default();
            for event in events {
                match event {
                    IngestEvent::Started { debtor_id, name } => {
                        listener.set_message(format!("{} #{}", name, debtor_id));
                    }
                    IngestEvent::Finished { .. } => {
                        tally.finished += 1;
                        listener.inc(1);
                    }
                    IngestEvent::Failed { debtor_id, reason } => {
                        tally.failed += 1;
                        listener.inc(1);
                        listener.println(format!(
                            "{} debtor {}: {}",
                            Icons::CROSS,
                            debtor_id,
                            reason.style(theme().error.clone())
                        ));
                    }
                }
            }
            tally
        });

        Self { bar, handle }
    }

    /// Wait for the listener to drain the channel and close the bar
    pub fn finish(self) -> ProgressTally {
        let tally = self.handle.join().unwrap_or_default();
        self.bar.finish_and_clear();
        tally
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::DebtorStats;

    #[test]
    fn test_tally_counts_terminal_events() {
        let (tx, rx) = crossbeam::channel::unbounded();
        let progress = IngestProgress::spawn(3, rx);

        tx.send(IngestEvent::Started { debtor_id: 1, name: "Debtor 1".into() }).unwrap();
        tx.send(IngestEvent::Finished { debtor_id: 1, stats: DebtorStats::default() }).unwrap();
        tx.send(IngestEvent::Failed { debtor_id: 2, reason: "timeout".into() }).unwrap();
        tx.send(IngestEvent::Finished { debtor_id: 3, stats: DebtorStats::default() }).unwrap();
        drop(tx);

        assert_eq!(
            progress.finish(),
            ProgressTally {
                finished: 2,
                failed: 1
            }
        );
    }
}
