pub mod shell;
pub mod tokenize;
pub mod types;

pub use shell::{ShellViolation, ensure_single_command};
pub use tokenize::{kubectl_args, take_flag, tokenize};
pub use types::KubectlArgs;
