use leadflow_db::{DemoDataset, SqlLeadStore};

use crate::commands::{run_with_pool, to_data, CommandResult, Failure, EXIT_OPERATION};

pub fn run() -> CommandResult {
    run_with_pool("seed", |_config, pool| async move {
        let store = SqlLeadStore::new(pool);

        let already_loaded = DemoDataset::is_loaded(&store)
            .await
            .map_err(|error| Failure::new("seed_verification", error.to_string(), 6))?;
        if already_loaded {
            return Ok(("demo dataset already present; nothing to do".to_string(), None));
        }

        let seeded = DemoDataset::load(&store)
            .await
            .map_err(|error| Failure::new("seed_execution", error.to_string(), EXIT_OPERATION))?;
        let message = format!(
            "demo dataset loaded: {} campaigns, {} groups, {} workers, {} leads, {} queue entries",
            seeded.campaigns, seeded.groups, seeded.workers, seeded.leads, seeded.queue_entries
        );
        Ok((message, to_data(&seeded)?))
    })
}
