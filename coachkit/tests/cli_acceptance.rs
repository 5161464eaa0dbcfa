use coachkit_core::Database;
use std::ffi::OsString;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

struct CliTestEnv {
    _temp_dir: TempDir,
    home: PathBuf,
    xdg_data: PathBuf,
    xdg_config: PathBuf,
    xdg_state: PathBuf,
}

impl CliTestEnv {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let base = temp_dir.path().to_path_buf();
        let home = base.join("home");
        let xdg_data = base.join("xdg-data");
        let xdg_config = base.join("xdg-config");
        let xdg_state = base.join("xdg-state");

        fs::create_dir_all(&home).expect("failed to create HOME");
        fs::create_dir_all(&xdg_data).expect("failed to create XDG_DATA_HOME");
        fs::create_dir_all(&xdg_config).expect("failed to create XDG_CONFIG_HOME");
        fs::create_dir_all(&xdg_state).expect("failed to create XDG_STATE_HOME");

        Self {
            _temp_dir: temp_dir,
            home,
            xdg_data,
            xdg_config,
            xdg_state,
        }
    }

    fn db_path(&self) -> PathBuf {
        self.xdg_data.join("coachkit/data.db")
    }

    fn write_config(&self, content: &str) {
        let path = self.xdg_config.join("coachkit/config.toml");
        fs::create_dir_all(path.parent().expect("missing config parent"))
            .expect("failed to create config dir");
        fs::write(path, content).expect("failed to write config");
    }

    fn write_replies(&self, replies: &[&str]) -> PathBuf {
        let path = self.home.join("replies.json");
        fs::write(
            &path,
            serde_json::to_string(replies).expect("failed to encode replies"),
        )
        .expect("failed to write replies");
        path
    }
}

fn run_bin(env: &CliTestEnv, args: &[&str], stdin: &str) -> Output {
    let bin_path = PathBuf::from(assert_cmd::cargo::cargo_bin!("coachkit"));

    let mut child = Command::new(bin_path)
        .args(args)
        .env("HOME", &env.home)
        .env("XDG_DATA_HOME", &env.xdg_data)
        .env("XDG_CONFIG_HOME", &env.xdg_config)
        .env("XDG_STATE_HOME", &env.xdg_state)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap_or_else(|e| panic!("failed to execute coachkit: {e}"));

    child
        .stdin
        .take()
        .expect("stdin is piped")
        .write_all(stdin.as_bytes())
        .expect("failed to write stdin");

    child
        .wait_with_output()
        .expect("failed to wait for coachkit")
}

fn assert_success(args: &[&str], output: &Output) {
    if output.status.success() {
        return;
    }

    let rendered_args = args
        .iter()
        .map(|arg| OsString::from(arg).to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ");
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    panic!(
        "coachkit {rendered_args} failed\nstatus: {}\nstdout:\n{}\nstderr:\n{}",
        output.status, stdout, stderr
    );
}

#[test]
fn parse_splits_reply_into_text_and_card() {
    let env = CliTestEnv::new();
    let reply = "Here's your plan.\n```json\n{\"tool\": \"dayplan\", \"params\": {\"blocks\": [{\"time\": \"09:00\", \"task\": \"Email\", \"duration\": 30}]}}\n```";
    let args = ["parse", "--date", "2025-06-02"];

    let output = run_bin(&env, &args, reply);
    assert_success(&args, &output);

    let parsed: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("parse output is JSON");
    assert_eq!(parsed["display_text"], "Here's your plan.");
    assert_eq!(parsed["tool_card"]["type"], "dayplan");
    assert_eq!(parsed["tool_card"]["data"]["date"], "2025-06-02");
    assert_eq!(parsed["tool_card"]["data"]["blocks"][0]["task"], "Email");
}

#[test]
fn parse_keeps_malformed_directive_as_text() {
    let env = CliTestEnv::new();
    let reply = "Hmm.\n```json\n{\"tool\": \"countdown\", \"params\": {\"duration\": -5}}\n```";

    let output = run_bin(&env, &["parse"], reply);
    assert_success(&["parse"], &output);

    let parsed: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("parse output is JSON");
    assert_eq!(parsed["display_text"], reply);
    assert!(parsed["tool_card"].is_null());
}

#[test]
fn triggers_lists_builtins_and_marks_disabled() {
    let env = CliTestEnv::new();
    env.write_config("[nudges]\ndisabled_triggers = [\"end_of_day\"]\n");

    let output = run_bin(&env, &["triggers"], "");
    assert_success(&["triggers"], &output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 5, "expected five triggers, got:\n{stdout}");
    assert!(lines[0].starts_with("idle_5min"));
    assert!(lines[0].contains("cooldown 15m"));
    assert!(lines[1].contains("cooldown 24h"));
    assert!(lines[2].starts_with("end_of_day") && lines[2].ends_with("[disabled]"));
    assert!(lines[4].starts_with("task_stuck") && !lines[4].ends_with("[disabled]"));
}

#[test]
fn invalid_config_is_rejected() {
    let env = CliTestEnv::new();
    env.write_config("[nudges]\ndisabled_triggers = [\"idle_forever\"]\n");

    let output = run_bin(&env, &["triggers"], "");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("idle_forever"), "stderr:\n{stderr}");
}

#[test]
fn submit_stores_valid_submissions_and_rejects_invalid() {
    let env = CliTestEnv::new();

    let signup = r#"{"kind": "waitlist", "email": "ada@example.com", "source": "landing"}"#;
    let output = run_bin(&env, &["submit"], signup);
    assert_success(&["submit"], &output);
    assert!(String::from_utf8_lossy(&output.stdout).contains("Stored waitlist_signups #1"));

    let duplicate = run_bin(&env, &["submit"], signup);
    assert!(!duplicate.status.success());

    let bad_email = r#"{"kind": "contact", "name": "Ada", "email": "nope", "message": "hi"}"#;
    let rejected = run_bin(&env, &["submit"], bad_email);
    assert!(!rejected.status.success());
    assert!(String::from_utf8_lossy(&rejected.stderr).contains("email"));

    let db = Database::open(&env.db_path()).expect("failed to open db");
    db.migrate().expect("failed to migrate db");
    let counts = db.submission_counts().expect("failed to count submissions");
    assert_eq!(counts.waitlist_signups, 1);
    assert_eq!(counts.contact_messages, 0);
}

#[test]
fn chat_with_scripted_replies_creates_tool_cards() {
    let env = CliTestEnv::new();
    let replies = env.write_replies(&[
        "Let's focus.\n```json\n{\"tool\": \"countdown\", \"params\": {\"duration\": 25, \"task\": \"write report\"}}\n```",
    ]);
    let replies = replies.to_string_lossy().into_owned();
    let args = ["chat", "--replies", replies.as_str()];

    let output = run_bin(&env, &args, "I need to write my report\n/tools\n/stats\n/quit\n");
    assert_success(&args, &output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("[you] I need to write my report"), "stdout:\n{stdout}");
    assert!(stdout.contains("[coach] Let's focus."), "stdout:\n{stdout}");
    assert!(stdout.contains("Focus timer: write report"), "stdout:\n{stdout}");
    assert!(stdout.contains("0 task(s) completed"), "stdout:\n{stdout}");

    let db = Database::open(&env.db_path()).expect("failed to open db");
    db.migrate().expect("failed to migrate db");
    assert!(db.has_any_visit().expect("failed to read visits"));
}

#[test]
fn chat_reports_backend_failure_as_notice() {
    let env = CliTestEnv::new();
    let replies = env.write_replies(&[]);
    let replies = replies.to_string_lossy().into_owned();
    let args = ["chat", "--replies", replies.as_str()];

    let output = run_bin(&env, &args, "hello\n/start countdown-missing\n");
    assert_success(&args, &output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stdout.contains("[notice]"), "stdout:\n{stdout}");
    assert!(stderr.contains("countdown-missing"), "stderr:\n{stderr}");
}
