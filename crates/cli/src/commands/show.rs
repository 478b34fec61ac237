use supportflow_core::config::LoadOptions;
use supportflow_core::domain::conversation::ConversationId;
use supportflow_db::{RecordStore, SqlRecordStore};

use crate::commands::{connect_and_migrate, prepare, CommandResult};

/// Prints the stored record as pretty JSON; failures still use the outcome object.
pub fn run(options: LoadOptions, conversation_id: String) -> CommandResult {
    let (config, runtime) = match prepare("show", options) {
        Ok(prepared) => prepared,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = connect_and_migrate(&config).await?;
        let store = SqlRecordStore::new(pool.clone());
        let found = store
            .find_record(&ConversationId(conversation_id.clone()))
            .await
            .map_err(|error| ("persistence_failure", error.to_string(), 4u8));
        pool.close().await;

        let record = found?.ok_or_else(|| {
            ("not_found", format!("no processed record for conversation `{conversation_id}`"), 6u8)
        })?;
        serde_json::to_string_pretty(&record)
            .map_err(|error| ("serialization", error.to_string(), 8u8))
    });

    match result {
        Ok(json) => CommandResult::raw(0, json),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("show", error_class, message, exit_code)
        }
    }
}
