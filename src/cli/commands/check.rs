//! Check command: is AnkiConnect up and ready for imports?

use crate::config::SyncConfig;
use crate::error::Result;
use crate::format::OutputContext;
use crate::model::ItemType;
use crate::remote::{AnkiConnect, CardStore, require_item_types};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct CheckReport {
    endpoint: String,
    reachable: bool,
    item_types: Vec<ItemTypeStatus>,
}

#[derive(Debug, Serialize)]
struct ItemTypeStatus {
    name: &'static str,
    available: bool,
}

/// Execute the check command.
///
/// # Errors
///
/// Returns [`crate::SyncError::Unreachable`] if the health check fails and
/// [`crate::SyncError::MissingItemType`] if a note type is absent.
pub fn execute(config: &SyncConfig, ctx: &OutputContext) -> Result<()> {
    let client = AnkiConnect::new(config)?;
    let reachable = client.health_check();
    let mut report = CheckReport {
        endpoint: client.endpoint().to_string(),
        reachable,
        item_types: Vec::new(),
    };

    if !reachable {
        ctx.json_pretty(&report);
        return client.ensure_reachable();
    }
    ctx.say(format!("AnkiConnect is reachable at {}.", client.endpoint()));

    let names = client.item_type_names()?;
    for item_type in ItemType::ALL {
        let name = item_type.model_name();
        let available = names.iter().any(|known| known == name);
        ctx.say(format!(
            "  {name}: {}",
            if available { "available" } else { "missing" }
        ));
        report.item_types.push(ItemTypeStatus { name, available });
    }
    ctx.json_pretty(&report);

    require_item_types(&client)
}
