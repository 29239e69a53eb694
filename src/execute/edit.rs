//! `edit SourceBindings [names...]`

use std::collections::BTreeMap;

use crate::config::{Platform, SourceConfig};
use crate::message::{Base, ButtonBuilder, ButtonStyle, Message, Section};

use super::{ConfigPersistenceManager, Conversation, ExecContext, ExecError};

pub const EDIT_SOURCE_BINDINGS: &str = "edit SourceBindings";

/// Split `a, b c,d` into `[a, b, c, d]`, keeping first occurrences.
pub fn parse_names(rest: &[String]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for name in rest.iter().flat_map(|w| w.split(',')) {
        let name = name.trim();
        if !name.is_empty() && !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

pub struct SourceBindingsEditor<'a> {
    pub sources: &'a BTreeMap<String, SourceConfig>,
    pub persistence: &'a dyn ConfigPersistenceManager,
    pub comm_group: &'a str,
    pub platform: Platform,
    pub conversation: &'a Conversation,
    pub bot_name: &'a str,
}

impl SourceBindingsEditor<'_> {
    pub fn execute(&self, ctx: &ExecContext, rest: &[String]) -> Result<Message, ExecError> {
        let names = parse_names(rest);
        if names.is_empty() {
            return Ok(self.selector());
        }

        let unknown: Vec<&str> = names
            .iter()
            .filter(|n| !self.sources.contains_key(n.as_str()))
            .map(String::as_str)
            .collect();
        if !unknown.is_empty() {
            let available: Vec<&str> = self.sources.keys().map(String::as_str).collect();
            return Ok(Message::plaintext(format!(
                "Unknown source(s): {}. Available sources: {}.",
                unknown.join(", "),
                available.join(", ")
            )));
        }

        ctx.check()?;
        self.persistence
            .persist_source_bindings(
                self.comm_group,
                self.platform,
                &self.conversation.alias,
                &names,
            )
            .map_err(|source| ExecError::PersistenceFailure {
                what: "source bindings",
                source,
            })?;
        log::info!(
            "source bindings of {}/{} set to {names:?}",
            self.comm_group,
            self.conversation.alias
        );

        let display: Vec<&str> = names
            .iter()
            .filter_map(|n| self.sources.get(n))
            .map(|s| s.display_name.as_str())
            .collect();
        Ok(Message::plaintext(format!(
            "Notification sources for this channel are now: {}.",
            display.join(", ")
        )))
    }

    /// One toggle button per configured source. Each payload is the full
    /// binding list with that source added or removed.
    fn selector(&self) -> Message {
        let btn = ButtonBuilder::new(self.bot_name);
        let current = &self.conversation.source_bindings;
        let buttons = self
            .sources
            .iter()
            .map(|(name, source)| {
                let bound = current.contains(name);
                let mut next: Vec<&str> = current
                    .iter()
                    .map(String::as_str)
                    .filter(|n| *n != name.as_str() && self.sources.contains_key(*n))
                    .collect();
                if !bound || next.is_empty() {
                    next.push(name);
                }
                let mut button = btn.for_command(
                    &source.display_name,
                    &format!("{EDIT_SOURCE_BINDINGS} {}", next.join(",")),
                    &source.description,
                );
                if bound {
                    button.style = ButtonStyle::Primary;
                }
                button
            })
            .collect();

        Message {
            base: Base {
                header: "Adjust notifications".into(),
                description: "Select the sources this channel should receive notifications from."
                    .into(),
                ..Base::default()
            },
            sections: vec![Section {
                buttons,
                ..Section::default()
            }],
            only_visible_for_you: true,
            ..Message::default()
        }
    }
}
