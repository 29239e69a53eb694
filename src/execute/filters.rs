//! `filters list|enable <name>|disable <name>`

use std::collections::BTreeMap;

use crate::config::FilterConfig;
use crate::message::Message;

use super::{ConfigPersistenceManager, ExecContext, ExecError};

pub struct FiltersExecutor<'a> {
    pub filters: &'a BTreeMap<String, FilterConfig>,
    pub persistence: &'a dyn ConfigPersistenceManager,
}

impl FiltersExecutor<'_> {
    pub fn execute(&self, ctx: &ExecContext, rest: &[String]) -> Result<Message, ExecError> {
        let sub = rest.first().map(|s| s.to_lowercase()).unwrap_or_default();
        match (sub.as_str(), rest.get(1)) {
            ("list", _) => Ok(self.list()),
            ("enable", Some(name)) => self.set_enabled(ctx, name, true),
            ("disable", Some(name)) => self.set_enabled(ctx, name, false),
            _ => Err(ExecError::UnrecognizedCommand(
                format!("filters {}", rest.join(" ")).trim_end().to_string(),
            )),
        }
    }

    fn list(&self) -> Message {
        if self.filters.is_empty() {
            return Message::plaintext("No filters are configured.");
        }
        let width = self.filters.keys().map(String::len).max().unwrap_or(0).max(4);
        let mut table = format!("{:<width$}  ENABLED  DESCRIPTION\n", "FILTER");
        for (name, filter) in self.filters {
            table.push_str(&format!(
                "{name:<width$}  {:<7}  {}\n",
                filter.enabled, filter.description
            ));
        }
        Message::code_block("Configured filters", table.trim_end())
    }

    fn set_enabled(&self, ctx: &ExecContext, name: &str, enabled: bool) -> Result<Message, ExecError> {
        if !self.filters.contains_key(name) {
            return Ok(Message::plaintext(format!(
                "Filter {name:?} does not exist. Run `filters list` to see the configured filters."
            )));
        }
        ctx.check()?;
        self.persistence
            .persist_filter_enabled(name, enabled)
            .map_err(|source| ExecError::PersistenceFailure {
                what: "filter state",
                source,
            })?;
        let state = if enabled { "enabled" } else { "disabled" };
        log::info!("filter {name} {state}");
        Ok(Message::plaintext(format!("Filter {name:?} {state}.")))
    }
}
