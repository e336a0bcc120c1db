//! Startup replay of source history through the live dispatch path.

use tokio::time::sleep;
use tracing::{info, warn};

use crate::{
    dispatch::{Outcome, Relay},
    domain::{ChatId, MessageId},
    errors::Error,
    Result,
};

/// Messages requested per history call.
pub const HISTORY_PAGE: usize = 100;

/// Tally of one backfill run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BackfillReport {
    pub dispatched: usize,
    pub delivered: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Sources whose history could not be read.
    pub unavailable_sources: usize,
}

impl BackfillReport {
    fn record(&mut self, outcome: Outcome) {
        self.dispatched += 1;
        match outcome {
            Outcome::Delivered(_) => self.delivered += 1,
            Outcome::Skipped(_) => self.skipped += 1,
            Outcome::WriteForbidden | Outcome::Dropped => self.failed += 1,
        }
    }
}

/// Reject a backfill request the port cannot serve, so it fails at startup
/// instead of silently replaying nothing.
pub fn ensure_supported(relay: &Relay) -> Result<()> {
    if relay.settings().backfill.limit > 0 && !relay.port().capabilities().reads_history {
        return Err(Error::Config(
            "BACKFILL_LAST is set but this connection cannot read chat history; \
             set BACKFILL_LAST=0"
                .to_string(),
        ));
    }
    Ok(())
}

/// Replay the first `limit` non-service messages of every source, oldest
/// first, pausing between messages. Not resumable: every start replays the
/// same window.
pub async fn run(relay: &Relay) -> BackfillReport {
    let settings = relay.settings();
    let mut report = BackfillReport::default();
    if settings.backfill.limit == 0 {
        return report;
    }

    info!(
        limit = settings.backfill.limit,
        sources = settings.sources.len(),
        "backfilling history"
    );

    for &source in &settings.sources {
        if let Err(e) = backfill_source(relay, source, &mut report).await {
            warn!(source = %source, error = %e, "history unavailable, skipping backfill for source");
            report.unavailable_sources += 1;
        }
    }

    info!(
        dispatched = report.dispatched,
        delivered = report.delivered,
        skipped = report.skipped,
        failed = report.failed,
        "backfill complete"
    );
    report
}

async fn backfill_source(relay: &Relay, source: ChatId, report: &mut BackfillReport) -> Result<()> {
    let backfill = relay.settings().backfill;
    let mut after: Option<MessageId> = None;
    let mut replayed = 0usize;

    while replayed < backfill.limit {
        let page = relay
            .port()
            .history_page(source, after, HISTORY_PAGE)
            .await?;

        let Some(last) = page.last().map(|m| m.id) else {
            break;
        };
        if after.is_some_and(|a| last <= a) {
            // The platform is not advancing; stop instead of looping.
            break;
        }
        after = Some(last);

        for msg in page {
            if replayed == backfill.limit {
                break;
            }
            if msg.is_service {
                continue;
            }
            report.record(relay.dispatch(&msg).await);
            replayed += 1;
            sleep(backfill.delay).await;
        }
    }

    Ok(())
}
