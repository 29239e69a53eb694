//! Structural shell check for command lines headed for execution.
//!
//! Commands are executed as an argv, never through a shell, but a message
//! that only makes sense to a shell (`;`, `|`, `$(...)`, `> file`, ...) is
//! still rejected up front so the user learns it was not run as written.

use thiserror::Error;
use tree_sitter::{Node, Parser};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShellViolation {
    #[error("command could not be parsed")]
    Unparseable,
    #[error("only a single command is allowed")]
    NotSingleCommand,
    #[error("{0} is not allowed")]
    Construct(&'static str),
}

/// Node kinds that change what a shell would run, with a user-facing name.
const FORBIDDEN: &[(&str, &str)] = &[
    ("command_substitution", "command substitution"),
    ("process_substitution", "process substitution"),
    ("file_redirect", "output redirection"),
    ("heredoc_redirect", "here-document"),
    ("herestring_redirect", "here-string"),
    ("simple_expansion", "variable expansion"),
    ("expansion", "variable expansion"),
    ("arithmetic_expansion", "arithmetic expansion"),
    ("variable_assignment", "variable assignment"),
];

fn find_forbidden(node: Node<'_>) -> Option<&'static str> {
    if let Some(&(_, label)) = FORBIDDEN.iter().find(|(kind, _)| *kind == node.kind()) {
        return Some(label);
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if let Some(label) = find_forbidden(child) {
            return Some(label);
        }
    }
    None
}

/// Accept only a single plain command: no operators, pipes, substitutions,
/// expansions or redirections.
pub fn ensure_single_command(command: &str) -> Result<(), ShellViolation> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_bash::LANGUAGE.into())
        .map_err(|_| ShellViolation::Unparseable)?;
    let tree = parser
        .parse(command, None)
        .ok_or(ShellViolation::Unparseable)?;
    let root = tree.root_node();
    if root.has_error() {
        return Err(ShellViolation::Unparseable);
    }

    let mut cursor = root.walk();
    let top: Vec<Node<'_>> = root.named_children(&mut cursor).collect();
    let [only] = top.as_slice() else {
        return Err(ShellViolation::NotSingleCommand);
    };

    if let Some(label) = find_forbidden(*only) {
        return Err(ShellViolation::Construct(label));
    }
    if only.kind() != "command" {
        return Err(ShellViolation::NotSingleCommand);
    }
    Ok(())
}
