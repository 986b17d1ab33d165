use super::ui;
use crate::core::config::AppConfig;
use crate::core::sync::{CurrencyOutcome, SyncReport, sync_with_progress};
use crate::core::{RateFetcher, RateStore};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::warn;

impl SyncReport {
    pub fn display_as_table(&self) -> String {
        let mut table = ui::new_styled_table();

        table.set_header(vec![
            ui::header_cell("Currency"),
            ui::header_cell("Fetched"),
            ui::header_cell("Inserted"),
            ui::header_cell("Duplicates"),
            ui::header_cell("Failed"),
            ui::header_cell("Status"),
        ]);

        let mut outcomes: Vec<&CurrencyOutcome> = self.outcomes.iter().collect();
        outcomes.sort_by(|a, b| a.code.cmp(&b.code));

        for outcome in outcomes {
            let status = match (&outcome.error, outcome.cancelled) {
                (Some(err), _) => ui::status_cell(err, false, false),
                (None, true) => ui::status_cell("cancelled", false, true),
                (None, false) if outcome.failed > 0 => ui::status_cell("store errors", false, false),
                (None, false) => ui::status_cell("ok", true, false),
            };
            table.add_row(vec![
                comfy_table::Cell::new(&outcome.code),
                ui::count_cell(outcome.fetched),
                ui::count_cell(outcome.inserted),
                ui::count_cell(outcome.duplicates),
                ui::count_cell(outcome.failed),
                status,
            ]);
        }

        let mut output = format!("{}\n\n", ui::style_text("Rate sync", ui::StyleType::Title));
        output.push_str(&table.to_string());
        output.push_str(&format!(
            "\n\n{} {} new, {} already stored",
            ui::style_text("Total:", ui::StyleType::TotalLabel),
            self.inserted(),
            self.duplicates()
        ));

        let failed = self.failed_currencies();
        if !failed.is_empty() {
            output.push_str(&format!(
                "\n{}",
                ui::style_text(
                    &format!("Incomplete: {}", failed.join(", ")),
                    ui::StyleType::Error
                )
            ));
        }

        output
    }
}

/// Cancels `cancel` on Ctrl-C or once `deadline` elapses.
fn spawn_cancel_watcher(cancel: CancellationToken, deadline: Option<Duration>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let deadline = async {
            match deadline {
                Some(duration) => tokio::time::sleep(duration).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            _ = tokio::signal::ctrl_c() => warn!("Received Ctrl-C, cancelling sync"),
            () = deadline => warn!("Sync deadline reached, cancelling"),
        }
        cancel.cancel();
    })
}

pub async fn run(
    store: &dyn RateStore,
    fetcher: &dyn RateFetcher,
    config: &AppConfig,
) -> SyncReport {
    let cancel = CancellationToken::new();
    let watcher = spawn_cancel_watcher(cancel.clone(), config.sync_timeout());

    let pb = ui::new_progress_bar(config.currencies.len() as u64, true);
    pb.set_message("Syncing rates...");

    let report = sync_with_progress(
        store,
        fetcher,
        &config.currencies,
        &cancel,
        &|_: &CurrencyOutcome| pb.inc(1),
    )
    .await;
    pb.finish_and_clear();
    watcher.abort();

    println!("{}", report.display_as_table());
    report
}
