use crate::command::assert_cmd_snapshot;

fn kinds() -> crate::command::Command {
    crate::timetable(["kinds"])
}

#[test]
fn table() {
    assert_cmd_snapshot!(
        kinds(),
        @r"
    success: true
    exit_code: 0
    ----- stdout -----
    kind      matches  lasts  values
    hours     hour     hour   0..=23
    weekdays  weekday  day    1..=7
    days      day      day    1..=31
    months    month    month  1..=12

    ----- stderr -----
    ",
    );
}

#[test]
fn no_positional_arguments() {
    assert_cmd_snapshot!(
        kinds().arg("hours"),
        @r#"
    success: false
    exit_code: 1
    ----- stdout -----

    ----- stderr -----
    unexpected argument "hours"
    "#,
    );
}

#[test]
fn short_help() {
    assert_cmd_snapshot!(
        kinds().arg("-h"),
        @r"
    success: true
    exit_code: 0
    ----- stdout -----
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
        --version  This flag prints the version of timetable.
        -h/--help  This flag prints the help output for timetable.

    ----- stderr -----
    ",
    );
}
