use super::types::KubectlArgs;

/// kubectl flags that consume the following word as their value.
const VALUE_FLAGS: &[&str] = &[
    "-n",
    "--namespace",
    "-l",
    "--selector",
    "-o",
    "--output",
    "-c",
    "--container",
    "-f",
    "--filename",
    "--field-selector",
    "--sort-by",
    "--tail",
    "--since",
    "--since-time",
    "--template",
    "--replicas",
    "--context",
    "--kubeconfig",
    "--cluster",
    "--user",
    "-s",
    "--server",
    "--token",
    "--as",
    "--as-group",
];

/// Tokenize a command into words using shlex (POSIX word splitting).
pub fn tokenize(command: &str) -> Vec<String> {
    shlex::split(command).unwrap_or_else(|| {
        // Fallback: simple whitespace splitting if shlex can't parse
        command.split_whitespace().map(String::from).collect()
    })
}

/// Remove the first `--flag value` or `--flag=value` occurrence and return
/// its value. A trailing flag without a value is removed and yields `""`.
pub fn take_flag(tokens: &mut Vec<String>, names: &[&str]) -> Option<String> {
    for i in 0..tokens.len() {
        let token = &tokens[i];
        if names.contains(&token.as_str()) {
            tokens.remove(i);
            return Some(if i < tokens.len() {
                tokens.remove(i)
            } else {
                String::new()
            });
        }
        if let Some((name, value)) = token.split_once('=')
            && names.contains(&name)
        {
            let value = value.to_string();
            tokens.remove(i);
            return Some(value);
        }
    }
    None
}

fn flag_name(token: &str) -> &str {
    token.split_once('=').map_or(token, |(name, _)| name)
}

/// Expand a single-dash cluster the way kubectl's flag parser reads it:
/// `-Ao` is `-A -o`, and `-nkube-system` or `-n=kube-system` is
/// `-n kube-system`. The value is `None` when it must come from the next word.
fn short_flags(token: &str) -> Vec<(String, Option<String>)> {
    let mut out = Vec::new();
    let cluster = &token[1..];
    for (i, c) in cluster.char_indices() {
        let name = format!("-{c}");
        let rest = &cluster[i + c.len_utf8()..];
        if VALUE_FLAGS.contains(&name.as_str()) {
            let value = rest.strip_prefix('=').unwrap_or(rest);
            out.push((name, Some(value.to_string()).filter(|_| !rest.is_empty())));
            return out;
        }
        if let Some(value) = rest.strip_prefix('=') {
            out.push((name, Some(value.to_string())));
            return out;
        }
        out.push((name, None));
    }
    out
}

/// Split kubectl arguments (everything after the `kubectl` keyword).
pub fn kubectl_args(args: &[String]) -> KubectlArgs {
    let mut out = KubectlArgs {
        args: args.to_vec(),
        ..KubectlArgs::default()
    };
    let mut words = Vec::new();
    let mut iter = args.iter().peekable();

    while let Some(token) = iter.next() {
        if !token.starts_with('-') || token == "-" {
            words.push(token.clone());
            continue;
        }
        let flags = if token.starts_with("--") {
            let name = flag_name(token).to_string();
            let inline = token.split_once('=').map(|(_, v)| v.to_string());
            vec![(name, inline)]
        } else {
            short_flags(token)
        };
        for (name, inline) in flags {
            let value = if inline.is_some() {
                inline
            } else if VALUE_FLAGS.contains(&name.as_str()) {
                iter.next().cloned()
            } else {
                None
            };
            match name.as_str() {
                "-n" | "--namespace" => out.namespace = value,
                "-A" | "--all-namespaces" => out.all_namespaces = true,
                _ => {}
            }
            out.flags.push(name);
        }
    }

    let mut words = words.into_iter();
    out.verb = words.next().unwrap_or_default();
    out.positionals = words.collect();
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(s: &str) -> Vec<String> {
        tokenize(s)
    }

    #[test]
    fn tokenize_simple() {
        assert_eq!(tokenize("kubectl get pods"), vec!["kubectl", "get", "pods"]);
    }

    #[test]
    fn tokenize_quoted() {
        assert_eq!(
            tokenize("kubectl logs -l 'app=my app'"),
            vec!["kubectl", "logs", "-l", "app=my app"]
        );
    }

    #[test]
    fn take_flag_separate_value() {
        let mut t = toks("get pods --cluster-name prod -n x");
        assert_eq!(take_flag(&mut t, &["--cluster-name"]), Some("prod".into()));
        assert_eq!(t, vec!["get", "pods", "-n", "x"]);
    }

    #[test]
    fn take_flag_inline_value() {
        let mut t = toks("get pods --cluster-name=prod");
        assert_eq!(take_flag(&mut t, &["--cluster-name"]), Some("prod".into()));
        assert_eq!(t, vec!["get", "pods"]);
    }

    #[test]
    fn take_flag_missing() {
        let mut t = toks("get pods");
        assert_eq!(take_flag(&mut t, &["--filter"]), None);
        assert_eq!(t.len(), 2);
    }

    #[test]
    fn take_flag_trailing_without_value() {
        let mut t = toks("get pods --filter");
        assert_eq!(take_flag(&mut t, &["--filter"]), Some(String::new()));
        assert_eq!(t, vec!["get", "pods"]);
    }

    #[test]
    fn kubectl_args_basic() {
        let a = kubectl_args(&toks("get pods -n kube-system -o wide"));
        assert_eq!(a.verb, "get");
        assert_eq!(a.positionals, vec!["pods"]);
        assert_eq!(a.namespace.as_deref(), Some("kube-system"));
        assert_eq!(a.flags, vec!["-n", "-o"]);
    }

    #[test]
    fn kubectl_args_flags_before_verb() {
        let a = kubectl_args(&toks("--namespace=dev describe deploy api"));
        assert_eq!(a.verb, "describe");
        assert_eq!(a.positionals, vec!["deploy", "api"]);
        assert_eq!(a.namespace.as_deref(), Some("dev"));
    }

    #[test]
    fn kubectl_args_all_namespaces() {
        let a = kubectl_args(&toks("get pods -A"));
        assert!(a.all_namespaces);
        assert_eq!(a.namespace, None);
    }

    #[test]
    fn short_flag_clusters_are_expanded() {
        let a = kubectl_args(&toks("get pods -Ao wide"));
        assert!(a.all_namespaces);
        assert_eq!(a.flags, vec!["-A", "-o"]);
        assert_eq!(a.positionals, vec!["pods"]);

        let a = kubectl_args(&toks("get pods -nkube-system"));
        assert_eq!(a.namespace.as_deref(), Some("kube-system"));

        let a = kubectl_args(&toks("get pods -n=kube-system"));
        assert_eq!(a.namespace.as_deref(), Some("kube-system"));

        let a = kubectl_args(&toks("get pods -shttps://evil.example"));
        assert_eq!(a.flags, vec!["-s"]);
        assert_eq!(a.positionals, vec!["pods"]);
    }

    #[test]
    fn value_flag_at_end_of_cluster_takes_next_word() {
        let a = kubectl_args(&toks("get -wn web pods"));
        assert_eq!(a.flags, vec!["-w", "-n"]);
        assert_eq!(a.namespace.as_deref(), Some("web"));
        assert_eq!(a.positionals, vec!["pods"]);
    }

    #[test]
    fn resource_spec_forms() {
        let a = kubectl_args(&toks("get pods/nginx"));
        assert_eq!(
            a.resource_spec(),
            Some((vec!["pods".to_string()], Some("nginx".to_string())))
        );
        let a = kubectl_args(&toks("get Pods,svc"));
        assert_eq!(
            a.resource_spec(),
            Some((vec!["pods".to_string(), "svc".to_string()], None))
        );
        let a = kubectl_args(&toks("describe deploy api"));
        assert_eq!(
            a.resource_spec(),
            Some((vec!["deploy".to_string()], Some("api".to_string())))
        );
        assert_eq!(kubectl_args(&toks("cluster-info")).resource_spec(), None);
    }
}
