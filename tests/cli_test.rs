//! Tests of the CLI subcommand entry points, writing into an in-memory
//! buffer the way the `--output` plumbing does.

use std::io::Write;

use s7sim::cli::{check_script, export, fields, run, validate};

const CONFIG: &str = r#"
dbs:
  - db_number: 1
    name: Motor
    fields:
      - { name: Running, type: BOOL, offset: 0, bit: 0, value: false }
      - { name: Speed, type: INT, offset: 4, value: 1500 }
  - db_number: 2
    fields:
      - { name: Label, type: "STRING[8]", offset: 0, value: BELT }
"#;

const BAD_CONFIG: &str = r#"
dbs:
  - db_number: 1
    fields:
      - { name: Speed, type: LWORD, offset: 4 }
"#;

fn config_file(text: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(text.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn path_of(file: &tempfile::NamedTempFile) -> String {
    file.path().to_str().unwrap().to_string()
}

#[test]
fn validate_reports_ok() {
    let file = config_file(CONFIG);
    let mut out = Vec::new();
    validate::execute(
        &validate::ValidateOptions {
            config: path_of(&file),
            json: false,
        },
        &mut out,
    )
    .unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("OK"));
    assert!(text.contains("DB 1 (2 fields, 6 bytes)"));
    assert!(text.contains("DB 2 (1 fields, 10 bytes)"));
}

#[test]
fn validate_reports_first_violation() {
    let file = config_file(BAD_CONFIG);
    let mut out = Vec::new();
    validate::execute(
        &validate::ValidateOptions {
            config: path_of(&file),
            json: true,
        },
        &mut out,
    )
    .unwrap();
    let report: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(report["valid"], false);
    assert_eq!(report["path"], "dbs[0].fields[0].type");
    assert!(report["reason"].as_str().unwrap().contains("unsupported"));
}

#[test]
fn fields_json_layout() {
    let file = config_file(CONFIG);
    let mut out = Vec::new();
    fields::execute(
        &fields::FieldsOptions {
            config: path_of(&file),
            json: true,
        },
        &mut out,
    )
    .unwrap();
    let report: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(report[0]["db_number"], 1);
    assert_eq!(report[0]["name"], "Motor");
    assert_eq!(report[0]["size"], 6);
    assert_eq!(report[0]["fields"][1]["type"], "INT");
    assert_eq!(report[0]["fields"][1]["value"], "1500");
    assert_eq!(report[1]["fields"][0]["type"], "STRING[8]");
}

#[test]
fn export_writes_flat_rows() {
    let file = config_file(CONFIG);
    let mut out = Vec::new();
    export::execute(
        &export::ExportOptions {
            config: path_of(&file),
        },
        &mut out,
    )
    .unwrap();
    let text = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "db_number,name,type,offset,bit,value");
    assert_eq!(lines[1], "1,Running,BOOL,0,0,false");
    assert_eq!(lines[2], "1,Speed,INT,4,,1500");
    assert_eq!(lines[3], "2,Label,STRING[8],0,,BELT");
}

#[test]
fn check_script_summarizes_commands() {
    let script = config_file("SET 1.Speed = 10\nLOOP 2\nWAIT 100\nEND_LOOP\n");
    let mut out = Vec::new();
    check_script::execute(
        &check_script::CheckScriptOptions {
            script: path_of(&script),
            json: false,
        },
        &mut out,
    )
    .unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("OK"));
    assert!(text.contains("(4 commands)"));
    assert!(text.contains("LOOP 2"));
}

#[test]
fn check_script_reports_parse_error() {
    let script = config_file("SET 1.Speed = 10\nBOGUS\n");
    let mut out = Vec::new();
    check_script::execute(
        &check_script::CheckScriptOptions {
            script: path_of(&script),
            json: true,
        },
        &mut out,
    )
    .unwrap();
    let report: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(report["valid"], false);
    assert_eq!(report["line"], 2);
}

#[test]
fn run_with_script_and_duration() {
    let config = config_file(CONFIG);
    let script = config_file("SET 1.Speed = 77\nSET 1.Running = true\n");
    let mut out = Vec::new();
    run::execute(
        &run::RunOptions {
            config: path_of(&config),
            port: 102,
            sync_interval_ms: 10,
            script: Some(path_of(&script)),
            duration_ms: Some(300),
        },
        &mut out,
    )
    .unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("Serving on port 102"));
    assert!(text.contains("loaded (2 commands)"));
    assert!(text.contains("Script completed"));
    assert!(text.contains("Simulator stopped"));
}
