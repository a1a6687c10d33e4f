use {
    anyhow::Context,
    bstr::{BStr, BString, ByteSlice, ByteVec},
    lexopt::ValueExt,
};

use crate::{
    args::{Configurable, Usage, flags::ScheduleValues},
    datetime::DateTime,
    kind::Kind,
    parse::{BufReadExt, BytesExt, Line},
    timetable::Timetable,
};

/// The CLI parsing configuration for the timetable every command operates on.
///
/// This consumes the first two positional arguments: a kind and the values of
/// that kind that are on schedule. Any positional arguments after that are
/// left for other targets.
#[derive(Clone, Debug, Default)]
pub struct TimetableArgs {
    kind: Option<Kind>,
    values: Option<ScheduleValues>,
}

impl TimetableArgs {
    /// Build the timetable described by the arguments parsed.
    ///
    /// This returns an error if either argument is missing or if the values
    /// aren't legal for the kind given.
    pub fn timetable(&self) -> anyhow::Result<Timetable> {
        let kind = self.kind.context("a timetable kind is required")?;
        let values = self
            .values
            .as_ref()
            .context("a schedule of values is required")?;
        let set = values.to_set(kind).context("invalid schedule")?;
        log::debug!("building {kind} timetable with {} value(s)", set.len());
        Timetable::new(kind, set).context("invalid schedule")
    }
}

impl Configurable for TimetableArgs {
    fn configure(
        &mut self,
        _: &mut lexopt::Parser,
        arg: &mut lexopt::Arg,
    ) -> anyhow::Result<bool> {
        match *arg {
            lexopt::Arg::Value(ref mut v) => {
                if self.kind.is_none() {
                    self.kind = Some(v.parse()?);
                } else if self.values.is_none() {
                    self.values = Some(v.parse()?);
                } else {
                    return Ok(false);
                }
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn usage(&self) -> &[Usage] {
        &[Kind::ARG, ScheduleValues::ARG]
    }
}

/// The CLI parsing configuration for reading datetimes.
///
/// This will greedily consume all remaining positional arguments as datetimes.
///
/// When there are no positional arguments to consume, then this will read
/// datetimes from `stdin` in a line delimited fashion.
#[derive(Clone, Debug, Default)]
pub struct DateTimes(Arguments);

impl DateTimes {
    /// Run the given function over each datetime read from the CLI.
    ///
    /// If there were no positional datetimes, then this tries to read them
    /// from stdin, one per line.
    ///
    /// Iteration stops when the closure returns false or returns an error.
    pub fn try_map(
        self,
        mut f: impl FnMut(DateTime) -> anyhow::Result<bool>,
    ) -> anyhow::Result<()> {
        self.0.try_map(|arg| f(arg.to_datetime()?))
    }
}

impl Configurable for DateTimes {
    fn configure(
        &mut self,
        p: &mut lexopt::Parser,
        arg: &mut lexopt::Arg,
    ) -> anyhow::Result<bool> {
        self.0.configure(p, arg)
    }

    fn usage(&self) -> &[Usage] {
        &[DateTime::ARG_OR_STDIN]
    }
}

/// The parsing configuration for reading arguments either as positional
/// arguments on the CLI, or as line-delimited data on `stdin`.
///
/// This will greedily consume all remaining positional arguments. That is,
/// this is generally intended for use cases where a variable number of
/// arguments can be given.
///
/// When there are _zero_ positional arguments, then this will read lines from
/// stdin instead.
#[derive(Clone, Debug, Default)]
pub struct Arguments {
    positional: Vec<BString>,
}

impl Arguments {
    /// Run the given function over each argument read from the CLI.
    ///
    /// If there were no positional arguments, then this tries to read them
    /// from stdin, one per line. Stated differently, the argument given
    /// to the closure is either always `Positional` or always `StdinLine`.
    /// You can never get a mix.
    ///
    /// Iteration stops when the closure returns false or returns an error.
    pub fn try_map(
        self,
        mut f: impl FnMut(Argument<'_>) -> anyhow::Result<bool>,
    ) -> anyhow::Result<()> {
        if !self.positional.is_empty() {
            for arg in self.positional {
                if !f(Argument::Positional(arg))? {
                    return Ok(());
                }
            }
            return Ok(());
        }
        std::io::stdin().lock().for_byte_line(|line| {
            f(Argument::StdinLine(line))
                .with_context(|| format!("line {} of <stdin>", line.number()))
        })
    }
}

impl Configurable for Arguments {
    fn configure(
        &mut self,
        _: &mut lexopt::Parser,
        arg: &mut lexopt::Arg,
    ) -> anyhow::Result<bool> {
        match *arg {
            lexopt::Arg::Value(ref mut v) => {
                let v = std::mem::take(v);
                let bytes = Vec::from_os_string(v).map_err(|arg| {
                    anyhow::anyhow!(
                        "timetable requires that positional arguments \
                         be valid UTF-8 in non-Unix environments, \
                         but `{arg:?}` is not valid UTF-8",
                    )
                })?;
                self.positional.push(BString::from(bytes));
            }
            _ => return Ok(false),
        }
        Ok(true)
    }
}

/// A generic argument parsed from either positional args on the CLI, or
/// as a single line from stdin.
#[derive(Clone, Debug)]
pub enum Argument<'a> {
    /// Just arbitrary bytes.
    ///
    /// On Windows, we require that this is valid UTF-8.
    Positional(BString),
    /// A line containing arbitrary ASCII compatible bytes.
    StdinLine(Line<'a>),
}

impl<'a> Argument<'a> {
    /// Parse this argument into a datetime.
    pub fn to_datetime(&self) -> anyhow::Result<DateTime> {
        self.raw().parse::<DateTime>().context("invalid datetime")
    }

    /// Return the raw argument value.
    ///
    /// For lines read from stdin, this excludes the line terminator.
    pub fn raw(&self) -> &BStr {
        match *self {
            Argument::Positional(ref arg) => arg.as_bstr(),
            Argument::StdinLine(line) => line.content(),
        }
    }
}
