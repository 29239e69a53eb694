//! Types produced by the command parser and consumed by the execute layer.

/// A kubectl invocation split into the parts policy checks care about.
///
/// `positionals` excludes flags and flag values; `args` keeps every token
/// after the `kubectl` keyword, in order, for execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KubectlArgs {
    pub verb: String,
    /// Positional words after the verb (resource spec, name, ...).
    pub positionals: Vec<String>,
    pub namespace: Option<String>,
    pub all_namespaces: bool,
    /// Every flag name used, without values (e.g. `--output`, `-n`).
    pub flags: Vec<String>,
    pub args: Vec<String>,
}

impl KubectlArgs {
    /// First positional after the verb, split into resource types and an
    /// optional name: `pods/nginx` and `pods,svc` are both accepted.
    pub fn resource_spec(&self) -> Option<(Vec<String>, Option<String>)> {
        let spec = self.positionals.first()?;
        let (types, name) = match spec.split_once('/') {
            Some((t, n)) => (t, Some(n.to_string())),
            None => (spec.as_str(), self.positionals.get(1).cloned()),
        };
        let types = types
            .split(',')
            .filter(|t| !t.is_empty())
            .map(|t| t.to_lowercase())
            .collect();
        Some((types, name))
    }
}
