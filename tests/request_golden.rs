use std::fs;
use std::io::Write;
use textpatch::{load_from_str, Document, EditSession, EditSpec};

fn load_fixture(name: &str) -> String {
    fs::read_to_string(format!("tests/fixtures/{name}"))
        .unwrap_or_else(|err| panic!("failed to load fixture {name}: {err}"))
}

fn write_temp(contents: &str) -> tempfile::NamedTempFile {
    let mut temp = tempfile::NamedTempFile::new().expect("tempfile");
    temp.write_all(contents.as_bytes()).expect("write temp");
    temp.flush().expect("flush temp");
    temp
}

#[test]
fn settings_cleanup_fixture() {
    let input = load_fixture("settings.conf.input");
    let expected = load_fixture("settings.conf.expected");
    let config = load_from_str(&load_fixture("settings.request.toml")).expect("request config");

    assert_eq!(config.meta.name, "settings-cleanup");
    assert_eq!(config.requests.len(), 1);

    let report = EditSession::new(Document::new(input)).run(&config.requests[0].edits);

    assert!(report.succeeded(), "outcomes: {:?}", report.outcomes());
    assert_eq!(report.text(), expected);
}

#[test]
fn settings_cleanup_roundtrips_through_disk() {
    let input = load_fixture("settings.conf.input");
    let expected = load_fixture("settings.conf.expected");
    let config = load_from_str(&load_fixture("settings.request.toml")).expect("request config");
    let temp = write_temp(&input);

    let document = Document::from_path(temp.path()).expect("read temp");
    let report = EditSession::new(document).run(&config.requests[0].edits);
    assert!(report.succeeded());

    report.document().write_to(temp.path()).expect("write back");

    let output = fs::read_to_string(temp.path()).expect("read output");
    assert_eq!(output, expected);

    // A second application must not silently re-edit: the replace target is
    // gone, so the session reports failure and the file stays as-is.
    let document = Document::from_path(temp.path()).expect("re-read temp");
    let report = EditSession::new(document).run(&config.requests[0].edits);
    assert!(!report.succeeded());

    let untouched = fs::read_to_string(temp.path()).expect("re-read output");
    assert_eq!(untouched, expected);
}

#[test]
fn crlf_fixture_preserves_separator_convention() {
    let input = load_fixture("notes_crlf.txt.input");
    let expected = load_fixture("notes_crlf.txt.expected");

    let edits = [
        EditSpec::replace("status: draft", vec!["status: final".to_string()])
            .with_expected_content("status: draft"),
        EditSpec::insert_after("title: notes\r\n", vec!["reviewed: yes".to_string()]),
    ];

    let document = Document::new(input);
    assert_eq!(document.separator().as_str(), "\r\n");

    let report = EditSession::new(document).run(&edits);
    assert!(report.succeeded(), "outcomes: {:?}", report.outcomes());
    assert_eq!(report.text(), expected);
}

#[test]
fn json_request_behaves_like_toml() {
    let input = load_fixture("settings.conf.input");
    let expected = load_fixture("settings.conf.expected");

    let config = textpatch::load_from_json_str(
        r##"{
            "meta": {"name": "settings-cleanup"},
            "requests": [{
                "file": "settings.conf",
                "edits": [
                    {
                        "kind": "replace",
                        "start_pattern": "log_level = debug",
                        "expected_content": "log_level = debug",
                        "content": ["log_level = info"]
                    },
                    {
                        "kind": "delete",
                        "start_pattern": "# legacy block start\n",
                        "end_pattern": "# legacy block end\n"
                    },
                    {
                        "kind": "insert",
                        "after_pattern": "listen_port = 8080\n",
                        "content": ["worker_threads = 4"]
                    }
                ]
            }]
        }"##,
    )
    .expect("json config");

    let report = EditSession::new(Document::new(input)).run(&config.requests[0].edits);
    assert!(report.succeeded());
    assert_eq!(report.text(), expected);
}
