use std::{
    borrow::Cow,
    fmt::{Debug, Display},
    str::FromStr,
    sync::LazyLock,
};

use {
    anyhow::Context,
    lexopt::{Arg, Parser, ValueExt},
    regex::Regex,
};

pub mod flags;
pub mod positional;

/// Something that consumes some of a command's arguments.
///
/// Every command builds a list of configurables and hands it to `configure`,
/// which offers each argument to them in order until one accepts it.
pub trait Configurable: Debug {
    /// Returns `true` when `arg` was consumed.
    ///
    /// Implementations that want a flag's value should pull it out of `p`
    /// (usually via `parse`).
    fn configure(
        &mut self,
        p: &mut Parser,
        arg: &mut Arg,
    ) -> anyhow::Result<bool>;

    /// The docs for the flags and arguments consumed by this
    /// implementation.
    fn usage(&self) -> &[Usage] {
        &[]
    }
}

/// Feeds every remaining argument in `p` to `targets`.
///
/// `-h` and `--help` render `usage` (with its `%args%` and `%flags%`
/// placeholders filled in from `targets`) and return it as a `Help` error.
/// `--version` returns a `Version` error. Any argument that no target
/// accepts is an error.
pub fn configure(
    p: &mut Parser,
    usage: &str,
    targets: &mut [&mut dyn Configurable],
) -> anyhow::Result<()> {
    while let Some(arg) = p.next()? {
        match arg {
            Arg::Short('h') => {
                return Err(Help(render(usage, targets, false)).into());
            }
            Arg::Long("help") => {
                return Err(Help(render(usage, targets, true)).into());
            }
            Arg::Long("version") => return Err(Version.into()),
            _ => {}
        }
        // The long flag name borrows from `p`, which the targets need
        // mutably. So give it a home of its own first.
        let mut long = String::new();
        let mut arg = match arg {
            Arg::Long(name) => {
                long.push_str(name);
                Arg::Long(&long)
            }
            Arg::Short(c) => Arg::Short(c),
            Arg::Value(value) => Arg::Value(value),
        };
        let mut consumed = false;
        for target in targets.iter_mut() {
            consumed = target.configure(p, &mut arg)?;
            if consumed {
                break;
            }
        }
        if !consumed {
            return Err(arg.unexpected().into());
        }
    }
    Ok(())
}

/// Renders the help output of a command.
///
/// The short form drops everything between `%snip-start%` and `%snip-end%`
/// and lists a single line per argument and flag. The long form keeps the
/// snipped content and the full docs of each argument and flag.
fn render(
    usage: &str,
    targets: &[&mut dyn Configurable],
    long: bool,
) -> String {
    static SNIPPED: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?m)^\s*%snip-start%\p{any}*?%snip-end%\s*$").unwrap()
    });
    static MARKERS: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?m)^\s*%snip-(start|end)%\s*$").unwrap()
    });

    let args = usages(targets, false);
    let mut flags = usages(targets, true);
    flags.extend([Help::USAGE, Version::USAGE]);
    // Sort by long name, so that `-d, --direction` sorts under `direction`.
    flags.sort_by_key(|u| {
        u.format.split_once(", ").map_or(u.format, |(_, long)| long)
    });

    let (text, args, flags): (Cow<str>, String, String) = if long {
        (
            MARKERS.replace_all(usage, ""),
            Usage::long(&args),
            Usage::long(&flags),
        )
    } else {
        (
            SNIPPED.replace_all(usage, ""),
            Usage::short(&args),
            Usage::short(&flags),
        )
    };
    text.replace("%args%", &args)
        .replace("%flags%", &flags)
        .trim()
        .to_string()
}

/// Returns the docs of either the flags or the positional arguments of
/// `targets`.
///
/// Positional arguments keep the order in which they're consumed.
fn usages(targets: &[&mut dyn Configurable], flag: bool) -> Vec<Usage> {
    targets
        .iter()
        .flat_map(|t| t.usage())
        .filter(|u| u.flag == flag)
        .copied()
        .collect()
}

/// Returns the name of the command to run, taken from the next argument.
///
/// With no arguments at all, the error returned is the top-level `usage`,
/// which `main` prints to stderr. `-h/--help` and `--version` are turned
/// into `Help` and `Version` errors.
pub fn next_as_command(usage: &str, p: &mut Parser) -> anyhow::Result<String> {
    let usage = usage.trim();
    match p.next()? {
        None => anyhow::bail!("{usage}"),
        Some(Arg::Value(name)) => Ok(name.string()?),
        Some(Arg::Short('h') | Arg::Long("help")) => {
            Err(Help(usage.to_string()).into())
        }
        Some(Arg::Long("version")) => Err(Version.into()),
        Some(arg) => Err(arg.unexpected().into()),
    }
}

/// Parses the value of the flag that `p` just returned.
///
/// Errors are prefixed with `flag_name`, e.g., `-t/--timeout`.
pub fn parse<T>(p: &mut Parser, flag_name: &'static str) -> anyhow::Result<T>
where
    T: FromStr,
    <T as FromStr>::Err: Display + Debug + Send + Sync + 'static,
{
    // Our `FromStr` errors are `anyhow::Error`, which doesn't implement
    // `std::error::Error`. Hence the `Error::msg` below.
    let value = p
        .value()
        .context(flag_name)?
        .into_string()
        .map_err(lexopt::Error::NonUnicodeValue)
        .context(flag_name)?;
    value.parse().map_err(|err| anyhow::Error::msg(err).context(flag_name))
}

/// The docs for a single flag or positional argument.
///
/// `Usage::short` and `Usage::long` lay out a list of these as they appear
/// in `-h` and `--help` output, respectively.
#[derive(Clone, Copy, Debug)]
pub struct Usage {
    /// `true` for an optional flag and `false` for a required argument.
    pub flag: bool,
    /// How the flag or argument is written, e.g., `-t, --timeout <duration>`.
    pub format: &'static str,
    /// A one line description.
    pub short: &'static str,
    /// The complete description. Paragraphs are separated by blank lines and
    /// get rewrapped when rendered.
    pub long: &'static str,
}

impl Usage {
    pub const fn flag(
        format: &'static str,
        short: &'static str,
        long: &'static str,
    ) -> Usage {
        Usage { flag: true, format, short, long }
    }

    pub const fn arg(
        format: &'static str,
        short: &'static str,
        long: &'static str,
    ) -> Usage {
        Usage { flag: false, format, short, long }
    }

    /// Lays out `usages` as a table of formats and short descriptions.
    pub fn short(usages: &[Usage]) -> String {
        let width = usages.iter().map(|u| u.format.len()).max().unwrap_or(0);
        usages
            .iter()
            .map(|u| format!("    {:width$}  {}\n", u.format, u.short))
            .collect()
    }

    /// Lays out `usages` as a list of formats, each followed by its long
    /// description wrapped and indented beneath it.
    pub fn long(usages: &[Usage]) -> String {
        let opts = textwrap::Options::new(79)
            .initial_indent("        ")
            .subsequent_indent("        ");
        let mut entries = vec![];
        for usage in usages.iter() {
            let paragraphs: Vec<String> = usage
                .long
                .trim()
                .split("\n\n")
                .map(|p| {
                    let mut text = String::new();
                    for line in textwrap::wrap(&p.replace('\n', " "), &opts) {
                        text.push_str(&line);
                        text.push('\n');
                    }
                    text
                })
                .collect();
            entries.push(format!(
                "    {}\n{}",
                usage.format,
                paragraphs.join("\n"),
            ));
        }
        entries.join("\n")
    }
}

/// The rendered help output of a command.
///
/// It's returned as an error so that parsing stops right away. `main`
/// recognizes it and prints it to stdout with a successful exit code.
#[derive(Debug)]
pub struct Help(String);

impl Help {
    const USAGE: Usage = Usage::flag(
        "-h/--help",
        "This flag prints the help output for timetable.",
        r#"
This flag prints the help output for timetable.

The short flag, -h, prints condensed docs with a single line for every
argument and flag. The long flag, --help, prints complete docs, including
additional examples.
"#,
    );
}

impl std::fmt::Display for Help {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for Help {}

/// A request for the version of timetable.
///
/// Like `Help`, this is returned as an error and printed to stdout by
/// `main`.
#[derive(Debug)]
pub struct Version;

impl Version {
    const USAGE: Usage = Usage::flag(
        "--version",
        "This flag prints the version of timetable.",
        r#"
This flag prints the version of timetable. When built from a git checkout,
the revision is included too.
"#,
    );
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let semver = option_env!("CARGO_PKG_VERSION").unwrap_or("N/A");
        write!(f, "timetable {semver}")?;
        if let Some(hash) = option_env!("TIMETABLE_BUILD_GIT_HASH") {
            write!(f, " (rev {hash})")?;
        }
        Ok(())
    }
}

impl std::error::Error for Version {}

#[cfg(test)]
mod tests {
    use super::*;

    const FLAGS: &[Usage] = &[
        Usage::flag("-x", "Short x.", "Long x.\n\nSecond paragraph."),
        Usage::flag("--wide <value>", "Short wide.", "Long wide."),
    ];

    #[test]
    fn short_table() {
        assert_eq!(
            Usage::short(FLAGS),
            "    -x              Short x.\n    \
             --wide <value>  Short wide.\n",
        );
        assert_eq!(Usage::short(&[]), "");
    }

    #[test]
    fn long_list() {
        assert_eq!(
            Usage::long(FLAGS),
            "    -x\n        Long x.\n\n        Second paragraph.\n\n    \
             --wide <value>\n        Long wide.\n",
        );
    }
}
