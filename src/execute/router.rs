//! Maps the leading words of a command to its handler.

/// Handler a command is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Notifier,
    EditSourceBindings,
    /// `edit` with a key the bot cannot edit.
    Edit,
    Filters,
    CommandsList,
    Ping,
    Help,
    Builder,
    Kubectl,
    Unknown,
}

/// Word used to re-enter the interactive builder.
pub const BUILDER_TRIGGER: &str = "kc-cmd-builder";

/// Aliases of the kubectl keyword.
pub const KUBECTL_ALIASES: &[&str] = &["kubectl", "kc", "k"];

/// Prefixes in no particular order; the longest match wins.
const ROUTES: &[(&[&str], Route)] = &[
    (&["notifier"], Route::Notifier),
    (&["edit"], Route::Edit),
    (&["edit", "sourcebindings"], Route::EditSourceBindings),
    (&["filters"], Route::Filters),
    (&["commands", "list"], Route::CommandsList),
    (&["ping"], Route::Ping),
    (&["help"], Route::Help),
    (&[BUILDER_TRIGGER], Route::Builder),
    (&["kubectl"], Route::Kubectl),
    (&["kc"], Route::Kubectl),
    (&["k"], Route::Kubectl),
];

/// A routed command and the words after the matched prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved<'a> {
    pub route: Route,
    pub rest: &'a [String],
}

fn prefix_matches(prefix: &[&str], tokens: &[String]) -> bool {
    prefix.len() <= tokens.len()
        && prefix
            .iter()
            .zip(tokens)
            .all(|(p, t)| t.eq_ignore_ascii_case(p))
}

/// Resolve a tokenized command.
///
/// `kubectl` with nothing after it opens the builder. A bare known kubectl
/// verb (`get pods`) is treated as a kubectl command.
pub fn resolve<'a>(tokens: &'a [String], is_known_verb: impl Fn(&str) -> bool) -> Resolved<'a> {
    let best = ROUTES
        .iter()
        .filter(|(prefix, _)| prefix_matches(prefix, tokens))
        .max_by_key(|(prefix, _)| prefix.len());

    match best {
        Some((prefix, Route::Kubectl)) if tokens.len() == prefix.len() => Resolved {
            route: Route::Builder,
            rest: &[],
        },
        Some((prefix, route)) => Resolved {
            route: *route,
            rest: &tokens[prefix.len()..],
        },
        None => match tokens.first() {
            Some(first) if is_known_verb(first) => Resolved {
                route: Route::Kubectl,
                rest: tokens,
            },
            _ => Resolved {
                route: Route::Unknown,
                rest: tokens,
            },
        },
    }
}
