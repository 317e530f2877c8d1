//! Format-level tests: lexical quirks, alias coverage and canonical-writer
//! behavior that cut across parser modules.

use assertables::{assert_all, assert_any};
use trackmap::{
    Direction, MapIssue, MapIssueKind, parse_str, write_tsm,
    math::{CellPoint, WorldPoint},
};

#[test]
fn crlf_line_endings_parse_identically() {
    let unix = "[meta]\nname = \"CRLF\"\ncell_size = 2\n[cell]\nx = 1\nz = 2\n";
    let windows = unix.replace('\n', "\r\n");

    let a = parse_str(unix);
    let b = parse_str(&windows);
    assert_eq!(a.map, b.map);
    assert_eq!(a.issues, b.issues);
}

#[test]
fn comments_and_blank_lines_do_not_shift_line_numbers() {
    let text = "\n# full line comment\n; another\n[meta]\nname = x\n\nbogus line\n";
    let outcome = parse_str(text);
    let syntax: Vec<_> =
        outcome.issues.iter().filter(|i| i.kind == MapIssueKind::Syntax).collect();
    assert_eq!(syntax.len(), 1);
    assert_eq!(syntax[0].line, Some(7));
}

#[test]
fn values_keep_interior_spacing_and_lose_quotes() {
    let outcome = parse_str("[meta]\nname = \"  Spaced  Name  \"\n");
    assert_eq!(outcome.map.metadata().name, "  Spaced  Name  ");

    let outcome = parse_str("[meta]\nname =    bare words   \n");
    assert_eq!(outcome.map.metadata().name, "bare words");
}

#[test]
fn meta_aliases_all_feed_cell_size() {
    for key in ["cell_size", "cellsize", "cell_size_m"] {
        let outcome = parse_str(&format!("[meta]\n{key} = 3.5\n"));
        assert_eq!(outcome.map.cell_size_m(), 3.5, "alias {key}");
    }
}

#[test]
fn heading_aliases_accept_cardinals_and_degrees() {
    for (key, value) in [
        ("entry_heading", "E"),
        ("entry_dir", "east"),
        ("entry_direction", "90"),
        ("entry_heading", "90.0"),
    ] {
        let outcome = parse_str(&format!("[portal: p]\nsector = s\nx = 0\nz = 0\n{key} = {value}\n"));
        let portal = outcome.map.portal("p").expect("portal parses");
        assert_eq!(portal.entry_heading_deg, Some(90.0), "{key} = {value}");
    }
}

#[test]
fn width_aliases_agree() {
    for key in ["width", "lane_width", "road_width"] {
        let outcome = parse_str(&format!("[cell]\nx = 0\nz = 0\n{key} = 6.5\n"));
        assert_eq!(outcome.map.cell_at(0, 0).unwrap().width_m, Some(6.5), "alias {key}");
    }
}

#[test]
fn repeated_keys_take_the_last_value() {
    let outcome = parse_str("[cell]\nx = 0\nz = 0\nwidth = 4\nwidth = 5\nlane_width = 6\n");
    assert_eq!(outcome.map.cell_at(0, 0).unwrap().width_m, Some(6.0));
}

#[test]
fn bad_meta_values_warn_and_keep_defaults() {
    let outcome = parse_str("[meta]\nweather = molten\nnoise = kazoo\nstart_x = much\n");
    let defaults = trackmap::model::Metadata::default();
    assert_eq!(outcome.map.metadata().weather, defaults.weather);
    assert_eq!(outcome.map.metadata().default_noise, defaults.default_noise);
    assert_eq!(outcome.map.metadata().start.cell, defaults.start.cell);

    let warnings =
        outcome.issues.iter().filter(|i| i.kind == MapIssueKind::Syntax && !i.is_error()).count();
    assert_eq!(warnings, 3);
}

#[test]
fn unknown_sections_warn_and_are_skipped() {
    let outcome = parse_str("[hovercraft]\nx = 1\n[cell]\nx = 0\nz = 0\n");
    assert_any!(outcome.issues.iter(), |i: &MapIssue| i.kind == MapIssueKind::Syntax
        && i.line == Some(1));
    assert_eq!(outcome.map.cells().len(), 1);
}

#[test]
fn point_lists_accept_both_separators_and_spellings() {
    for list in ["0,0; 4,0; 2,3", "0 0 | 4 0 | 2 3", "0,0;4 0;2,3"] {
        let outcome = parse_str(&format!("[shape: tri]\ntype = polygon\npoints = {list}\n"));
        let shape = outcome.map.shape("tri").expect("polygon parses");
        assert!(shape.geometry.contains(WorldPoint::new(2.0, 1.0)), "list `{list}`");
    }
}

#[test]
fn point_lists_accumulate_across_repeated_keys() {
    let outcome = parse_str("[shape: tri]\ntype = polygon\npoint = 0,0\npoint = 4,0\npoint = 2,3\n");
    assert!(outcome.map.shape("tri").is_some());
}

#[test]
fn line_blocks_in_each_direction_land_where_expected() {
    for (dir, last) in
        [("N", (0, 3)), ("S", (0, -3)), ("E", (3, 0)), ("W", (-3, 0))]
    {
        let outcome = parse_str(&format!("[line]\nx = 0\nz = 0\nlength = 4\ndir = {dir}\n"));
        assert_eq!(outcome.map.cells().len(), 4, "dir {dir}");
        let (x, z) = last;
        assert!(outcome.map.cell_at(x, z).is_some(), "dir {dir} should reach ({x}, {z})");
    }
}

#[test]
fn merges_compose_across_block_kinds() {
    let outcome = parse_str(
        "[rect]\nx = 0\nz = 0\nwidth = 2\nheight = 2\nsurface = sand\n\
         [line]\nx = 0\nz = 0\nlength = 2\ndir = N\n\
         [cell]\nx = 0\nz = 0\nsafe = true\n",
    );
    let map = outcome.map;
    let corner = map.cell_at(0, 0).unwrap();
    assert_eq!(corner.surface, Some(trackmap::model::Surface::Sand));
    assert!(corner.exits.contains(Direction::North));
    assert!(corner.is_safe_zone);
    // The rect-only cell keeps its surface but gained nothing else
    let plain = map.cell_at(1, 1).unwrap();
    assert!(plain.exits.is_empty());
    assert!(!plain.is_safe_zone);
}

#[test]
fn canonical_writer_output_is_reparse_stable() {
    let tricky = "[meta]\nname = \"A \\ B\"\ncell_size = 0.25\nstart_heading = w\n\
                  [cell]\nx = -3\nz = 7\nexits = ew\nzone = \"west side\"\n\
                  [cell]\nx = -4\nz = 7\nexits = EW\n\
                  [shape: sliver]\ntype = rectangle\nx = -0.125\nz = 0.5\nwidth = 0.75\nheight = 2.25\n\
                  [area: a]\ntype = safezone\nshape = sliver\n";
    let first = parse_str(tricky);
    assert_all!(first.issues.iter(), |i: &MapIssue| !i.is_error());

    let text_a = write_tsm(&first.map);
    let second = parse_str(&text_a);
    assert_eq!(first.map, second.map);
    let text_b = write_tsm(&second.map);
    assert_eq!(text_a, text_b);
}

#[test]
fn world_cell_round_trip_through_the_model() {
    let outcome = parse_str("[meta]\ncell_size = 2.5\n[cell]\nx = 0\nz = 0\n");
    let map = outcome.map;
    for x in -15..15 {
        for z in -15..15 {
            let at = CellPoint::new(x, z);
            assert_eq!(map.world_to_cell(map.cell_to_world(at)), at);
        }
    }
}

#[test]
fn exits_letters_are_order_and_case_insensitive() {
    let a = parse_str("[cell]\nx = 0\nz = 0\nexits = NESW\n");
    let b = parse_str("[cell]\nx = 0\nz = 0\nexits = wsen\n");
    assert_eq!(a.map.cell_at(0, 0).unwrap().exits, b.map.cell_at(0, 0).unwrap().exits);
}
