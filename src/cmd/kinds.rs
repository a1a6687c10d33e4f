use std::io::Write;

use crate::{args, kind::Kind, style::Theme};

const USAGE: &'static str = r#"
List the kinds of timetables.

For each kind, this prints the calendar field it matches on, how long a single
occurrence lasts and the values it accepts.

USAGE:
    timetable kinds

TIP:
    use -h for short docs and --help for long docs

EXAMPLES:
    List every kind:

        $ timetable kinds
        kind      matches  lasts  values
        hours     hour     hour   0..=23
        weekdays  weekday  day    1..=7
        days      day      day    1..=31
        months    month    month  1..=12

OPTIONS:
%flags%
"#;

pub fn run(p: &mut lexopt::Parser) -> anyhow::Result<()> {
    args::configure(p, USAGE, &mut [])?;

    let theme = Theme::stdout();
    let mut wtr = std::io::stdout().lock();
    let rows: Vec<[String; 4]> = Kind::ALL
        .iter()
        .map(|&kind| {
            let range = kind.valid_range();
            [
                kind.name().to_string(),
                kind.match_field().name().to_string(),
                kind.duration_field().name().to_string(),
                format!("{}..={}", range.start, range.end - 1),
            ]
        })
        .collect();
    let header = ["kind", "matches", "lasts", "values"];
    let mut widths = header.map(str::len);
    for row in rows.iter() {
        for (width, cell) in widths.iter_mut().zip(row.iter()) {
            *width = (*width).max(cell.len());
        }
    }

    for (i, name) in header.iter().enumerate() {
        if i > 0 {
            write!(wtr, "  ")?;
        }
        let padding = widths[i] - name.len();
        write!(wtr, "{}", theme.header(name))?;
        if i + 1 < header.len() {
            write!(wtr, "{:padding$}", "")?;
        }
    }
    writeln!(wtr)?;
    for row in rows.iter() {
        for (i, cell) in row.iter().enumerate() {
            if i > 0 {
                write!(wtr, "  ")?;
            }
            if i + 1 < row.len() {
                write!(wtr, "{cell:width$}", width = widths[i])?;
            } else {
                write!(wtr, "{cell}")?;
            }
        }
        writeln!(wtr)?;
    }
    Ok(())
}
