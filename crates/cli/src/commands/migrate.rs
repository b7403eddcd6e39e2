use crate::commands::{run_with_pool, CommandResult};

pub fn run() -> CommandResult {
    run_with_pool("migrate", |_config, _pool| async {
        Ok(("applied pending migrations".to_string(), None))
    })
}
