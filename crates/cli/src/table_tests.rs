use super::*;

fn render_to_string(table: &Table) -> String {
    let mut buf = Vec::new();
    table.render(&mut buf);
    String::from_utf8(buf).unwrap()
}

#[test]
fn empty_table_prints_nothing() {
    let table = Table::plain(vec![Column::left("NAME"), Column::left("STATUS")]);
    let out = render_to_string(&table);
    assert_eq!(out, "");
}

#[test]
fn single_row_single_column() {
    let mut table = Table::plain(vec![Column::left("NAME")]);
    table.row(vec!["hello".into()]);
    let out = render_to_string(&table);
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], "NAME");
    assert_eq!(lines[1], "hello");
}

#[test]
fn multi_column_left_alignment() {
    let mut table = Table::plain(vec![Column::left("NAME"), Column::left("STATUS")]);
    table.row(vec!["alpha".into(), "running".into()]);
    table.row(vec!["b".into(), "done".into()]);
    let out = render_to_string(&table);
    let lines: Vec<&str> = out.lines().collect();

    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], "NAME   STATUS");
    assert_eq!(lines[1], "alpha  running");
    assert_eq!(lines[2], "b      done");
}

#[test]
fn right_alignment() {
    let mut table = Table::plain(vec![Column::left("NAME"), Column::right("ATTEMPT")]);
    table.row(vec!["alpha".into(), "5".into()]);
    table.row(vec!["beta".into(), "123".into()]);
    let out = render_to_string(&table);
    let lines: Vec<&str> = out.lines().collect();

    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], "NAME   ATTEMPT");
    assert_eq!(lines[1], "alpha        5");
    assert_eq!(lines[2], "beta       123");
}

#[test]
fn truncates_values_exceeding_max_width() {
    let mut table = Table::plain(vec![Column::left("ID"), Column::left("DESCRIPTION").with_max(6)]);
    table.row(vec!["bg_1".into(), "a very long description".into()]);
    let out = render_to_string(&table);
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines[1], "bg_1  a very");
}
