mod support;

use std::fs;

use predicates::str::contains;
use serde_json::Value;

use support::TestHome;

fn read_events(path: &std::path::Path) -> Vec<Value> {
    fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .map(|line| serde_json::from_str(line).expect("event line"))
        .collect()
}

#[test]
fn mutations_publish_once_per_command() -> Result<(), Box<dyn std::error::Error>> {
    let home = TestHome::init()?;
    let events = home.path().join("bus").join("upcoming.jsonl");
    home.write_config(&format!(
        "[publish]\ndestination = \"{}\"\ndebounce_ms = 5\n",
        events.display()
    ))?;

    let id = home.add_task(&["Feed cat", "--due", "2024-01-11"]);
    home.add_task(&["Renew passport", "--due", "2099-06-01"]);
    home.json(&[
        "task", "edit", &id, "--title", "Feed cats", "--priority", "P0", "--notes", "both",
    ]);

    let published = read_events(&events);
    assert_eq!(published.len(), 3);
    let last = &published[2];
    assert_eq!(last["event"], "upcoming_tasks");
    assert_eq!(last["schema_version"], "homedo.event.v1");
    assert_eq!(last["count"], 1);
    assert_eq!(last["tasks"][0]["title"], "Feed cats");
    assert_eq!(last["tasks"][0]["overdue"], true);

    home.json(&["task", "list"]);
    assert_eq!(read_events(&events).len(), 3);

    Ok(())
}

#[test]
fn publish_to_stdout_emits_only_the_event() -> Result<(), Box<dyn std::error::Error>> {
    let home = TestHome::init()?;
    home.add_task(&["Mow lawn", "--due", "2024-01-12", "--repeat", "weekly"]);
    home.add_task(&["Sweep porch", "--due", "2024-01-09"]);
    home.add_task(&["Paint fence", "--due", "2024-03-01"]);

    let output = home
        .cmd()
        .args(["publish", "--today", "2024-01-10", "--events", "-", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8(output)?;
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 1);

    let event: Value = serde_json::from_str(lines[0])?;
    assert_eq!(event["count"], 2);
    assert_eq!(event["tasks"][0]["title"], "Sweep porch");
    assert_eq!(event["tasks"][0]["overdue"], true);
    assert_eq!(event["tasks"][1]["title"], "Mow lawn");
    assert_eq!(event["tasks"][1]["repeats"], "every week");

    Ok(())
}

#[test]
fn publish_requires_a_destination() -> Result<(), Box<dyn std::error::Error>> {
    let home = TestHome::init()?;

    home.cmd()
        .args(["publish"])
        .assert()
        .code(2)
        .stderr(contains("no publish destination"));

    Ok(())
}

#[test]
fn invalid_config_is_reported() -> Result<(), Box<dyn std::error::Error>> {
    let home = TestHome::init()?;
    home.write_config("[publish]\nupcoming_days = 0\n")?;

    home.cmd()
        .args(["task", "list"])
        .assert()
        .code(2)
        .stderr(contains("publish.upcoming_days must be >= 1"));

    Ok(())
}
