//! Tests for concrete command construction.

use openclaw_bridge::bridge::{CommandBuilder, HostPlatform, LogicalCommand};

fn json_flags(argv: &[String]) -> usize {
    argv.iter()
        .flat_map(|arg| arg.split_whitespace())
        .filter(|word| *word == "--json")
        .count()
}

const QUERIES: &[&[&str]] = &[
    &["status"],
    &["health"],
    &["agents", "list"],
    &["sessions"],
    &["models", "list"],
    &["models", "status"],
    &["skills", "list"],
    &["channels", "list"],
    &["gateway", "health"],
    &["logs", "--limit", "200"],
];

#[test]
fn native_commands_are_discrete_argv() {
    let builder = CommandBuilder::new("openclaw", HostPlatform::Native).token("tok");

    for args in QUERIES {
        let command = LogicalCommand::new(args.iter().copied());
        let argv = builder.build(&command);

        assert!(argv.iter().all(|arg| !arg.contains(' ')), "argv: {argv:?}");
        assert_eq!(argv.len(), args.len() + 4);
        assert_eq!(&argv[argv.len() - 3..], ["--json", "--token", "tok"]);
    }
}

#[test]
fn foreign_commands_are_one_shell_string() {
    let builder = CommandBuilder::new("openclaw", HostPlatform::wsl());

    for args in QUERIES {
        let argv = builder.build(&LogicalCommand::new(args.iter().copied()));

        assert_eq!(argv.len(), 5, "argv: {argv:?}");
        assert_eq!(&argv[..4], ["wsl", "--", "bash", "-lc"]);
        assert!(argv[4].starts_with("openclaw "));
        assert!(argv[4].ends_with(" --json"));
    }
}

#[test]
fn every_command_has_exactly_one_json_flag() {
    for platform in [HostPlatform::Native, HostPlatform::wsl()] {
        let builder = CommandBuilder::new("openclaw", platform);
        for args in QUERIES {
            let argv = builder.build(&LogicalCommand::new(args.iter().copied()));
            assert_eq!(json_flags(&argv), 1, "argv: {argv:?}");
        }
        assert_eq!(json_flags(&builder.build_follow_logs()), 1);
    }
}

#[test]
fn token_flag_only_when_configured() {
    let without = CommandBuilder::new("openclaw", HostPlatform::Native);
    let with = without.clone().token("tok");
    let command = LogicalCommand::new(["status"]);

    assert!(!without.build(&command).contains(&"--token".to_string()));
    assert!(with.build(&command).contains(&"--token".to_string()));
}

#[test]
fn follow_logs_flag_order() {
    let builder = CommandBuilder::new("openclaw", HostPlatform::wsl()).token("tok");
    let argv = builder.build_follow_logs();
    assert_eq!(argv[4], "openclaw logs --follow --json --token tok");
}
