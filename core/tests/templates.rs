use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use textfsm_core::{
    Error, Field, FsmConfig, ListItem, ParseError, TemplateError, ValueOption, compile,
    compile_with,
};

fn fixture(name: &str) -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    fs::read_to_string(path).expect("fixture file must be readable")
}

fn text_rows(rows: &[Vec<Field>]) -> Vec<Vec<String>> {
    rows.iter()
        .map(|row| row.iter().map(ToString::to_string).collect())
        .collect()
}

#[test]
fn test_interfaces_fixture_end_to_end() {
    let template = compile(&fixture("interfaces.textfsm")).expect("template should compile");
    let result = template
        .parse(&fixture("interfaces.txt"), true)
        .expect("input should parse");

    assert_eq!(result.header, vec!["Interface", "IP"]);
    assert_eq!(
        text_rows(&result.rows),
        vec![vec!["eth0", "10.0.0.1"], vec!["eth1", "10.0.0.2"]]
    );
}

#[test]
fn test_one_row_per_matching_line() {
    let template = compile("Value Word (\\S+)\n\nStart\n  ^${Word} -> Record\n").unwrap();
    let input: String = (0..25).map(|i| format!("w{i}\n")).collect();
    let result = template.parse(&input, true).unwrap();

    assert_eq!(result.len(), 25);
    assert_eq!(result.rows[24], vec![Field::from("w24")]);
}

#[test]
fn test_filldown_and_required_fixture() {
    let template = compile(&fixture("routes.textfsm")).unwrap();
    let result = template.parse(&fixture("routes.txt"), true).unwrap();

    // The trailing EOF record only holds the filled-down Protocol and is
    // rejected by Required.
    assert_eq!(
        text_rows(&result.rows),
        vec![
            vec!["ospf", "10.0.0.0/8", "192.168.1.1"],
            vec!["ospf", "10.1.0.0/16", "192.168.1.2"],
            vec!["bgp", "172.16.0.0/12", "192.168.1.3"],
        ]
    );
}

#[test]
fn test_key_and_fillup_fixture() {
    let template = compile(&fixture("sessions.textfsm")).unwrap();
    assert_eq!(template.values_with_option(ValueOption::Key), vec!["Peer"]);
    assert_eq!(template.values_with_option(ValueOption::Fillup), vec!["Router"]);

    let result = template.parse(&fixture("sessions.txt"), true).unwrap();
    assert_eq!(
        text_rows(&result.rows),
        vec![
            vec!["10.0.0.1", "up", "core1"],
            vec!["10.0.0.2", "down", "core1"],
            vec!["10.0.0.3", "up", "core1"],
        ]
    );
}

#[test]
fn test_fillup_stops_at_first_filled_row() {
    let template = compile(
        "Value Fillup Chassis (\\S+)\nValue Slot (\\d+)\n\nStart\n  ^slot ${Slot} -> Record\n  ^chassis ${Chassis} -> Record\n",
    )
    .unwrap();
    let input = "slot 1\nchassis A\nslot 2\nslot 3\nchassis B\n";
    let result = template.parse(input, true).unwrap();

    assert_eq!(
        result.column("Chassis").unwrap(),
        vec![
            &Field::from("A"),
            &Field::from("A"),
            &Field::from("B"),
            &Field::from("B"),
            &Field::from("B"),
        ]
    );
}

#[test]
fn test_error_rule_in_fixture() {
    let template = compile(&fixture("sessions.textfsm")).unwrap();
    let err = template
        .parse("Peer 10.0.0.1 is up\nInvalid block\n", true)
        .unwrap_err();

    assert_eq!(
        err,
        ParseError::RuleError {
            rule_line: 8,
            input: "Invalid block".to_string(),
            message: Some("unexpected peer block".to_string()),
        }
    );
    assert_eq!(
        err.to_string(),
        "Error: unexpected peer block. Rule Line: 8. Input Line: Invalid block."
    );
}

#[test]
fn test_list_with_subgroups_fixture() {
    let template = compile(&fixture("groups.textfsm")).unwrap();
    let result = template.parse(&fixture("groups.txt"), true).unwrap();

    let member = |user: &str, host: &str| {
        ListItem::Groups(BTreeMap::from([
            ("host".to_string(), host.to_string()),
            ("user".to_string(), user.to_string()),
        ]))
    };

    assert_eq!(result.len(), 2);
    assert_eq!(result.rows[0][0], Field::from("admins"));
    assert_eq!(
        result.rows[0][1],
        Field::List(vec![member("alice", "web"), member("bob", "db")])
    );
    assert_eq!(result.rows[1][0], Field::from("ops"));
    assert_eq!(result.rows[1][1], Field::List(vec![member("carol", "web")]));
}

#[test]
fn test_records_view() {
    let template = compile(&fixture("interfaces.textfsm")).unwrap();
    let result = template.parse(&fixture("interfaces.txt"), true).unwrap();
    let records = result.records();

    assert_eq!(records.len(), 2);
    assert_eq!(records[1]["Interface"], Field::from("eth1"));
    assert_eq!(records[1]["IP"], Field::from("10.0.0.2"));
}

#[test]
fn test_fixture_templates_round_trip() {
    for name in [
        "interfaces.textfsm",
        "routes.textfsm",
        "groups.textfsm",
        "sessions.textfsm",
    ] {
        let template = compile(&fixture(name)).unwrap();
        let rendered = template.to_string();
        let recompiled = compile(&rendered)
            .unwrap_or_else(|e| panic!("{name} did not recompile: {e}\n{rendered}"));

        assert_eq!(template, recompiled, "{name} changed after round trip");
        assert_eq!(rendered, recompiled.to_string());
    }
}

#[test]
fn test_incremental_parse_matches_single_pass() {
    let template = compile(&fixture("routes.textfsm")).unwrap();
    let input = fixture("routes.txt");
    let (first, second) = input.split_at(input.find("Protocol bgp").unwrap());

    let mut ctx = template.new_context();
    template.parse_into(&mut ctx, first, false).unwrap();
    assert_eq!(ctx.rows().len(), 2);
    template.parse_into(&mut ctx, second, true).unwrap();

    let single = template.parse(&input, true).unwrap();
    assert_eq!(ctx.rows(), single.rows.as_slice());

    ctx.reset(&template);
    assert!(ctx.rows().is_empty());
    assert_eq!(ctx.state_name(), "Start");
}

#[test]
fn test_template_shared_across_threads() {
    let template = compile(&fixture("interfaces.textfsm")).unwrap();
    let inputs: Vec<String> = (0..8)
        .map(|i| format!("eth{i} 10.0.0.{i}\nlo{i} 127.0.0.{i}\n"))
        .collect();

    let results: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = inputs
            .iter()
            .map(|input| scope.spawn(|| template.parse(input, true).unwrap()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for (i, result) in results.iter().enumerate() {
        assert_eq!(result.len(), 2);
        assert_eq!(result.rows[0][0], Field::from(format!("eth{i}")));
        assert_eq!(result.rows[1][1], Field::from(format!("127.0.0.{i}")));
    }
}

#[test]
fn test_compile_errors() {
    assert_eq!(compile(""), Err(TemplateError::EmptyTemplate));
    assert!(matches!(
        compile("Value Bad (\\S+\n\nStart\n  ^${Bad}\n"),
        Err(TemplateError::UnparenthesizedRegex { line: 1, .. })
    ));
    assert!(matches!(
        compile("Value A (\\S+)\n\nStart\n  ^${Missing} -> Record\n"),
        Err(TemplateError::UndefinedVariable { line: 4, .. })
    ));
    assert!(matches!(
        compile("Value Key,List A (\\S+)\n\nStart\n  ^${A}\n"),
        Err(TemplateError::ConflictingOptions { .. })
    ));
}

#[test]
fn test_compile_with_name_limit() {
    let config = FsmConfig {
        max_name_len: 4,
        ..FsmConfig::default()
    };
    let text = fixture("interfaces.textfsm");

    assert!(matches!(
        compile_with(&text, &config),
        Err(TemplateError::InvalidValueName { line: 1, .. })
    ));
    assert!(compile_with(&text, &FsmConfig::default()).is_ok());
}

#[test]
fn test_one_step_parse() {
    let result = textfsm_core::parse(
        &fixture("interfaces.textfsm"),
        &fixture("interfaces.txt"),
        true,
    )
    .unwrap();
    assert_eq!(result.len(), 2);

    let err = textfsm_core::parse("Value A (\\S+)\n", "x\n", true).unwrap_err();
    assert!(matches!(err, Error::Template(_)));
}
