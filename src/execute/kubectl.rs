//! Runs checked kubectl commands.

use crate::message::Message;
use crate::parse::{ensure_single_command, kubectl_args};
use crate::policy::{Checker, CommandGuard, EffectivePolicy, GuardError};

use super::{CommandRunner, ExecContext, ExecError};

pub const KUBECTL_BINARY: &str = "kubectl";

/// Keep only output lines containing `filter`.
pub fn filter_output(output: &str, filter: &str) -> String {
    output
        .lines()
        .filter(|line| line.contains(filter))
        .collect::<Vec<_>>()
        .join("\n")
}

pub struct KubectlExecutor<'a> {
    checker: &'a Checker,
    guard: &'a dyn CommandGuard,
    runner: &'a dyn CommandRunner,
    cluster_name: &'a str,
}

impl<'a> KubectlExecutor<'a> {
    pub fn new(
        checker: &'a Checker,
        guard: &'a dyn CommandGuard,
        runner: &'a dyn CommandRunner,
        cluster_name: &'a str,
    ) -> Self {
        Self {
            checker,
            guard,
            runner,
            cluster_name,
        }
    }

    /// Check and run one kubectl command.
    ///
    /// `raw` is the command as the user sent it; it must be a single plain
    /// command. `args` are the words after the kubectl keyword.
    pub fn execute(
        &self,
        ctx: &ExecContext,
        raw: &str,
        args: &[String],
        policy: &EffectivePolicy,
        authenticated: bool,
        filter: Option<&str>,
    ) -> Result<Message, ExecError> {
        let parsed = kubectl_args(args);
        if !self.checker.is_known_verb(&parsed.verb) {
            return Err(GuardError::UnsupportedVerb(parsed.verb).into());
        }
        ensure_single_command(raw)?;
        let checked = self
            .checker
            .check(&parsed, policy, authenticated, self.guard)?;

        let mut argv = parsed.args;
        if let Some(ns) = checked.default_namespace {
            argv.push("-n".into());
            argv.push(ns);
        }
        let display = format!("{KUBECTL_BINARY} {}", argv.join(" "));

        ctx.check()?;
        log::info!("running {display:?}");
        let output = self
            .runner
            .run(ctx, KUBECTL_BINARY, &argv)
            .map_err(ExecError::CommandExecutionFailure)?;

        let output = match filter {
            Some(f) => filter_output(&output, f),
            None => output,
        };
        if output.trim().is_empty() {
            return Ok(Message::plaintext(format!(
                "`{display}` on `{}` returned no output.",
                self.cluster_name
            )));
        }
        Ok(Message::code_block(
            format!("`{display}` on `{}`", self.cluster_name),
            output.trim_end(),
        ))
    }
}
