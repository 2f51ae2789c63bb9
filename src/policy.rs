/// Which of the standard flags a terraform subcommand accepts.
///
/// The rows reflect what the terraform CLI rejects in practice, e.g.
/// `workspace`, `output`, `state` and `force-unlock` fail when given
/// `-var=aws_region=...`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandPolicy {
    /// `terraform init` must run before the subcommand.
    pub needs_init: bool,
    /// Accepts `-var=aws_region=<region>`.
    pub accepts_region: bool,
    /// Accepts `-input=false`.
    pub accepts_input: bool,
    /// Accepts `-var-file <path>`.
    pub accepts_var_file: bool,
}

impl CommandPolicy {
    /// Policy of every subcommand not listed in [`POLICIES`].
    pub const DEFAULT: Self = Self::new(true, true, true, true);

    const fn new(
        needs_init: bool,
        accepts_region: bool,
        accepts_input: bool,
        accepts_var_file: bool,
    ) -> Self {
        Self {
            needs_init,
            accepts_region,
            accepts_input,
            accepts_var_file,
        }
    }

    pub fn of(subcmd: &str) -> Self {
        POLICIES
            .iter()
            .find(|(name, _)| *name == subcmd)
            .map(|(_, policy)| *policy)
            .unwrap_or(Self::DEFAULT)
    }
}

#[rustfmt::skip]
const POLICIES: &[(&str, CommandPolicy)] = &[
    //                                   init   region input  var-file
    ("fmt",          CommandPolicy::new(false, true,  true,  false)),
    ("force-unlock", CommandPolicy::new(false, false, false, false)),
    ("init",         CommandPolicy::new(true,  true,  true,  false)),
    ("output",       CommandPolicy::new(true,  false, false, false)),
    ("show",         CommandPolicy::new(false, true,  false, false)),
    ("state",        CommandPolicy::new(true,  false, false, false)),
    ("taint",        CommandPolicy::new(false, true,  true,  true)),
    ("untaint",      CommandPolicy::new(false, true,  true,  true)),
    ("validate",     CommandPolicy::new(false, true,  true,  true)),
    ("version",      CommandPolicy::new(false, true,  false, false)),
    ("workspace",    CommandPolicy::new(true,  false, false, false)),
];
