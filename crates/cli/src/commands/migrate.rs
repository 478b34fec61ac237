use supportflow_core::config::LoadOptions;

use crate::commands::{connect_and_migrate, into_result, prepare, CommandResult, StepError};

pub fn run(options: LoadOptions) -> CommandResult {
    let (config, runtime) = match prepare("migrate", options) {
        Ok(prepared) => prepared,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = connect_and_migrate(&config).await?;
        pool.close().await;
        Ok::<String, StepError>("applied pending migrations".to_string())
    });

    into_result("migrate", result)
}
