//! Platform-agnostic response tree.
//!
//! Every handler renders into a [`Message`]; chat adapters translate sections,
//! bodies and buttons into their native constructs. Buttons carry the full
//! command to resubmit, which is what lets multi-step flows live entirely in
//! the chat history.

pub mod help;

use serde::{Deserialize, Serialize};

pub use help::HelpMessage;

/// Label used for buttons that execute a finished command.
pub const RUN_COMMAND_NAME: &str = "Run command";

/// A complete response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub base: Base,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sections: Vec<Section>,
    /// Hint for platforms that support ephemeral replies.
    #[serde(default)]
    pub only_visible_for_you: bool,
    /// Hint for platforms that can update the message a button belonged to.
    #[serde(default)]
    pub replace_original: bool,
}

/// Header, description and body shared by messages and sections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Base {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub header: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default)]
    pub body: Body,
}

/// Message body: either plain text or a code block, never both.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Body {
    #[default]
    Empty,
    Plaintext(String),
    CodeBlock(String),
}

impl Body {
    pub fn is_empty(&self) -> bool {
        matches!(self, Body::Empty)
    }
}

/// A block of content with an ordered row of buttons.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    #[serde(default)]
    pub base: Base,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub buttons: Vec<Button>,
    /// Small-print lines rendered under the section.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub context: Vec<String>,
}

/// Visual emphasis hint for a button.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonStyle {
    #[default]
    Default,
    Primary,
    Danger,
}

/// Either a command to resubmit on click or a link to open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonAction {
    Command(String),
    Url(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    pub name: String,
    pub action: ButtonAction,
    /// Text shown next to the button, usually the command it sends.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default)]
    pub style: ButtonStyle,
}

impl Button {
    /// The command this button resubmits, if it is not a link.
    pub fn command(&self) -> Option<&str> {
        match &self.action {
            ButtonAction::Command(cmd) => Some(cmd),
            ButtonAction::Url(_) => None,
        }
    }
}

impl Message {
    /// Message with nothing to render. Adapters skip sending it.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.base.header.is_empty()
            && self.base.description.is_empty()
            && self.base.body.is_empty()
            && self.sections.is_empty()
    }

    /// Plain-text reply.
    pub fn plaintext(text: impl Into<String>) -> Self {
        Self {
            base: Base {
                body: Body::Plaintext(text.into()),
                ..Base::default()
            },
            ..Self::default()
        }
    }

    /// Reply whose body is a code block, with a short description above it.
    pub fn code_block(description: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            base: Base {
                description: description.into(),
                body: Body::CodeBlock(code.into()),
                ..Base::default()
            },
            ..Self::default()
        }
    }

    /// Iterate over every button of every section, in order.
    pub fn buttons(&self) -> impl Iterator<Item = &Button> {
        self.sections.iter().flat_map(|s| s.buttons.iter())
    }
}

/// Builds buttons whose commands are addressed to the bot.
///
/// Clicking a command button makes the platform resubmit `"<bot> <cmd>"`,
/// which goes through mention extraction like a typed message.
#[derive(Debug, Clone)]
pub struct ButtonBuilder {
    bot_name: String,
}

impl ButtonBuilder {
    pub fn new(bot_name: impl Into<String>) -> Self {
        Self {
            bot_name: bot_name.into(),
        }
    }

    fn addressed(&self, cmd: &str) -> String {
        format!("{} {}", self.bot_name, cmd)
    }

    /// Command button that shows the command it sends as its description.
    pub fn for_command_with_desc_cmd(&self, name: &str, cmd: &str, style: ButtonStyle) -> Button {
        let command = self.addressed(cmd);
        Button {
            name: name.to_string(),
            description: command.clone(),
            action: ButtonAction::Command(command),
            style,
        }
    }

    /// Command button without any description.
    pub fn for_command_without_desc(&self, name: &str, cmd: &str) -> Button {
        Button {
            name: name.to_string(),
            action: ButtonAction::Command(self.addressed(cmd)),
            description: String::new(),
            style: ButtonStyle::Default,
        }
    }

    /// Command button with a free-form description.
    pub fn for_command(&self, name: &str, cmd: &str, desc: &str) -> Button {
        Button {
            name: name.to_string(),
            action: ButtonAction::Command(self.addressed(cmd)),
            description: desc.to_string(),
            style: ButtonStyle::Default,
        }
    }

    pub fn for_url(&self, name: &str, url: &str) -> Button {
        Button {
            name: name.to_string(),
            action: ButtonAction::Url(url.to_string()),
            description: String::new(),
            style: ButtonStyle::Default,
        }
    }
}
