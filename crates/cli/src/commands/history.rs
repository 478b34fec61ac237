use serde::Serialize;

use supportflow_core::config::LoadOptions;
use supportflow_core::domain::history::HistoricalTicket;
use supportflow_db::{HistoricalTicketRepository, SqlHistoricalTicketRepository};

use crate::commands::{connect_and_migrate, prepare, CommandResult};

#[derive(Debug, Serialize)]
struct HistoryListing {
    command: &'static str,
    status: &'static str,
    issue_type: String,
    tickets: Vec<HistoricalTicket>,
}

pub fn run(options: LoadOptions, issue_type: String, limit: u32) -> CommandResult {
    let (config, runtime) = match prepare("history", options) {
        Ok(prepared) => prepared,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = connect_and_migrate(&config).await?;
        let tickets = SqlHistoricalTicketRepository::new(pool.clone())
            .find_by_issue_type(&issue_type, limit)
            .await
            .map_err(|error| ("persistence_failure", error.to_string(), 4u8));
        pool.close().await;
        tickets
    });

    match result {
        Ok(tickets) => {
            let listing = HistoryListing { command: "history", status: "ok", issue_type, tickets };
            match serde_json::to_string(&listing) {
                Ok(json) => CommandResult::raw(0, json),
                Err(error) => CommandResult::failure("history", "serialization", error.to_string(), 8),
            }
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("history", error_class, message, exit_code)
        }
    }
}
