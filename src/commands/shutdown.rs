use async_trait::async_trait;

use super::{Command, CommandResult, SessionInfo};

pub struct ShutdownCommand;

#[async_trait]
impl Command for ShutdownCommand {
    fn name(&self) -> &str {
        "/shutdown"
    }

    fn description(&self) -> &str {
        "remove and release the cached engine"
    }

    async fn execute(&self, info: &SessionInfo<'_>) -> CommandResult {
        let Some(bootstrapper) = info.bootstrapper else {
            println!("  no startup hook in this session");
            return CommandResult::Handled;
        };
        match bootstrapper.shutdown() {
            Ok(Some(engine)) => println!("  released engine #{}", engine.instance()),
            Ok(None) => println!("  no engine cached"),
            Err(e) => println!("  shutdown failed: {e}"),
        }
        CommandResult::Handled
    }
}
