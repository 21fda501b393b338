use assert_cmd::Command;
use predicates::str::contains;

#[test]
fn homedo_help_works() {
    Command::cargo_bin("homedo")
        .expect("binary")
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("undo"));
}

#[test]
fn subcommand_help_works() {
    let subcommands = [
        vec!["task"],
        vec!["task", "add"],
        vec!["task", "edit"],
        vec!["repeat"],
        vec!["repeat", "set"],
        vec!["repeat", "next"],
        vec!["history"],
        vec!["undo"],
        vec!["redo"],
        vec!["publish"],
    ];

    for cmd in subcommands {
        Command::cargo_bin("homedo")
            .expect("binary")
            .args(&cmd)
            .arg("--help")
            .assert()
            .success();
    }
}

#[test]
fn unknown_subcommand_fails() {
    Command::cargo_bin("homedo")
        .expect("binary")
        .arg("vacuum")
        .assert()
        .failure();
}
