use supportflow_agent::client_from_config;
use supportflow_agent::seed::{seed_reference_data, SeedError};
use supportflow_core::config::LoadOptions;
use supportflow_db::{SeedDataset, SqlEmbeddingRepository, SqlHistoricalTicketRepository};

use crate::commands::{connect_and_migrate, into_result, prepare, CommandResult, StepError};

pub fn run(options: LoadOptions) -> CommandResult {
    let (config, runtime) = match prepare("seed", options) {
        Ok(prepared) => prepared,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = connect_and_migrate(&config).await?;
        let llm = client_from_config(&config.llm)
            .map_err(|error| (error.class(), error.to_string(), 2u8))?;

        let dataset = SeedDataset::default();
        let tickets = SqlHistoricalTicketRepository::new(pool.clone());
        let embeddings = SqlEmbeddingRepository::new(pool.clone());

        let seeded = seed_reference_data(llm.as_ref(), &dataset, &tickets, &embeddings)
            .await
            .map_err(|error| (seed_error_class(&error), error.to_string(), 6u8))?;

        let verification = dataset
            .verify(&tickets, &embeddings)
            .await
            .map_err(|error| ("seed_verification", error.to_string(), 6u8))?;

        let run_result: Result<String, StepError> = if verification.all_present {
            Ok(format!(
                "seeded {} historical tickets and {} sample embeddings ({} backend)",
                seeded.tickets_seeded,
                seeded.embeddings_seeded,
                llm.backend()
            ))
        } else {
            let failed_checks = verification
                .checks
                .iter()
                .filter_map(|(check, passed)| (!passed).then_some(*check))
                .collect::<Vec<_>>();
            Err(("seed_verification", verification_message(&failed_checks), 6u8))
        };

        pool.close().await;
        run_result
    });

    into_result("seed", result)
}

fn seed_error_class(error: &SeedError) -> &'static str {
    match error {
        SeedError::Model(error) => error.class(),
        SeedError::Repository(_) => "seed_execution",
    }
}

fn verification_message(failed_checks: &[&str]) -> String {
    if failed_checks.is_empty() {
        "some seed data failed to load".to_string()
    } else {
        format!("seed verification failed for checks: {}", failed_checks.join(", "))
    }
}
