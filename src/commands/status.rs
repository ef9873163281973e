use async_trait::async_trait;

use super::{Command, CommandResult, SessionInfo};
use crate::consts::format_number;

pub struct StatusCommand;

#[async_trait]
impl Command for StatusCommand {
    fn name(&self) -> &str {
        "/status"
    }

    fn description(&self) -> &str {
        "show the cached engine and registry contents"
    }

    async fn execute(&self, info: &SessionInfo<'_>) -> CommandResult {
        match info.registry.get(info.engine_id) {
            Ok(Some(engine)) => {
                println!("  engine    {} (#{})", info.engine_id, engine.instance());
                println!("  entry     {}", engine.entry_point());
                println!("  timeout   {:?}", engine.config().dispatch_timeout);
                println!(
                    "  runs      {}",
                    format_number(engine.dispatch_count())
                );
            }
            Ok(None) => println!("  engine    {} (not cached)", info.engine_id),
            Err(e) => println!("  engine    error: {e}"),
        }
        println!("  registry  [{}]", info.registry.ids().join(", "));
        println!("  settings  {}", info.db_path);
        CommandResult::Handled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::test_info;
    use crate::registry::EngineRegistry;

    #[tokio::test]
    async fn returns_handled_when_empty() {
        let registry = EngineRegistry::new();
        assert!(matches!(
            StatusCommand.execute(&test_info(&registry)).await,
            CommandResult::Handled
        ));
    }

    #[test]
    fn metadata() {
        assert_eq!(StatusCommand.name(), "/status");
        assert!(StatusCommand.aliases().is_empty());
    }
}
