//! Help message shown for `help` and for anything the bot does not understand.

use super::{Base, Body, ButtonBuilder, ButtonStyle, Message, RUN_COMMAND_NAME, Section};
use crate::config::Platform;

pub struct HelpMessage {
    btn: ButtonBuilder,
    bot_name: String,
    platform: Platform,
    cluster_name: String,
}

impl HelpMessage {
    pub fn new(platform: Platform, cluster_name: &str, bot_name: &str) -> Self {
        Self {
            btn: ButtonBuilder::new(bot_name),
            bot_name: bot_name.to_string(),
            platform,
            cluster_name: cluster_name.to_string(),
        }
    }

    pub fn build(&self) -> Message {
        let mut sections = Vec::new();
        sections.extend(self.cluster());
        sections.extend(self.notifications());
        sections.extend(self.kubectl());
        sections.extend(self.filters());
        sections.extend(self.footer());

        Message {
            base: Base {
                description: format!(
                    "The bot is active for the {:?} cluster.",
                    self.cluster_name
                ),
                ..Base::default()
            },
            sections,
            ..Message::default()
        }
    }

    fn cluster(&self) -> Vec<Section> {
        vec![
            Section {
                base: Base {
                    header: "Using multiple instances".into(),
                    description: format!(
                        "If several bot instances share this channel, add the cluster name to commands meant for {}.",
                        self.cluster_name
                    ),
                    body: Body::CodeBlock(format!("--cluster-name={}\n", self.cluster_name)),
                },
                ..Section::default()
            },
            Section {
                base: Base {
                    header: "Ping your cluster".into(),
                    description: "Check the status of the connected cluster.".into(),
                    ..Base::default()
                },
                buttons: vec![self.btn.for_command_with_desc_cmd(
                    "Check status",
                    "ping",
                    ButtonStyle::Default,
                )],
                ..Section::default()
            },
        ]
    }

    fn notifications(&self) -> Vec<Section> {
        vec![
            Section {
                base: Base {
                    header: "Manage incoming notifications".into(),
                    body: Body::CodeBlock(format!(
                        "{} notifier [start|stop|status]\n",
                        self.bot_name
                    )),
                    ..Base::default()
                },
                buttons: vec![
                    self.btn
                        .for_command_without_desc("Start notifications", "notifier start"),
                    self.btn
                        .for_command_without_desc("Stop notifications", "notifier stop"),
                    self.btn.for_command_without_desc("Get status", "notifier status"),
                ],
                ..Section::default()
            },
            Section {
                base: Base {
                    header: "Notification settings for this channel".into(),
                    description: "Choose which event sources post to this channel.".into(),
                    ..Base::default()
                },
                buttons: vec![self.btn.for_command_with_desc_cmd(
                    "Adjust notifications",
                    "edit SourceBindings",
                    ButtonStyle::Primary,
                )],
                ..Section::default()
            },
        ]
    }

    fn kubectl(&self) -> Vec<Section> {
        if self.platform.is_interactive() {
            return vec![
                Section {
                    base: Base {
                        header: "Interactive kubectl - no typing!".into(),
                        ..Base::default()
                    },
                    buttons: vec![self.btn.for_command_with_desc_cmd(
                        "kubectl",
                        "kubectl",
                        ButtonStyle::Primary,
                    )],
                    ..Section::default()
                },
                Section {
                    base: Base {
                        description: "Alternatively use kubectl as usual with all supported commands".into(),
                        ..Base::default()
                    },
                    buttons: vec![self.btn.for_command(
                        "List commands",
                        "commands list",
                        "k | kc | kubectl [command] [options] [flags]",
                    )],
                    ..Section::default()
                },
            ];
        }

        vec![
            Section {
                base: Base {
                    header: "Run kubectl commands (if enabled)".into(),
                    description: format!(
                        "You can run kubectl commands directly from {}!",
                        self.platform.display_name()
                    ),
                    ..Base::default()
                },
                buttons: ["services", "pods", "deployments"]
                    .iter()
                    .map(|res| {
                        self.btn.for_command_with_desc_cmd(
                            RUN_COMMAND_NAME,
                            &format!("kubectl get {res}"),
                            ButtonStyle::Default,
                        )
                    })
                    .collect(),
                ..Section::default()
            },
            Section {
                base: Base {
                    description: "To list all supported kubectl commands".into(),
                    ..Base::default()
                },
                buttons: vec![self.btn.for_command_with_desc_cmd(
                    "List commands",
                    "commands list",
                    ButtonStyle::Default,
                )],
                ..Section::default()
            },
        ]
    }

    fn filters(&self) -> Vec<Section> {
        vec![Section {
            base: Base {
                header: "Filters".into(),
                body: Body::CodeBlock(format!(
                    "{} filters [list|enable <name>|disable <name>]\n",
                    self.bot_name
                )),
                ..Base::default()
            },
            buttons: vec![self.btn.for_command_without_desc("List filters", "filters list")],
            ..Section::default()
        }]
    }

    fn footer(&self) -> Vec<Section> {
        vec![Section {
            buttons: vec![self.btn.for_url(
                "Read the kubectl reference",
                "https://kubernetes.io/docs/reference/kubectl/",
            )],
            ..Section::default()
        }]
    }
}
