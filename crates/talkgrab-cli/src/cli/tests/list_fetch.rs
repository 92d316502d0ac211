//! Tests for the list and fetch subcommands.

use super::parse;
use crate::cli::CliCommand;

#[test]
fn cli_parse_list() {
    match parse(&["talkgrab", "list"]) {
        CliCommand::List => {}
        _ => panic!("expected List"),
    }
}

#[test]
fn cli_parse_fetch_defaults() {
    match parse(&["talkgrab", "fetch"]) {
        CliCommand::Fetch {
            talks,
            discard_metadata,
            download_dir,
            quiet,
        } => {
            assert!(talks.is_empty());
            assert!(!discard_metadata);
            assert!(download_dir.is_none());
            assert!(!quiet);
        }
        _ => panic!("expected Fetch"),
    }
}

#[test]
fn cli_parse_fetch_talk_ids() {
    match parse(&["talkgrab", "fetch", "--talks", "3", "17", "42"]) {
        CliCommand::Fetch { talks, .. } => assert_eq!(talks, vec![3, 17, 42]),
        _ => panic!("expected Fetch with talk ids"),
    }
}

#[test]
fn cli_parse_fetch_discard_metadata() {
    match parse(&["talkgrab", "fetch", "--discard-metadata"]) {
        CliCommand::Fetch {
            discard_metadata, ..
        } => assert!(discard_metadata),
        _ => panic!("expected Fetch with --discard-metadata"),
    }
}

#[test]
fn cli_parse_fetch_download_dir() {
    match parse(&["talkgrab", "fetch", "--download-dir", "/tmp/talks"]) {
        CliCommand::Fetch { download_dir, .. } => {
            assert_eq!(
                download_dir.as_deref(),
                Some(std::path::Path::new("/tmp/talks"))
            );
        }
        _ => panic!("expected Fetch with --download-dir"),
    }
}

#[test]
fn cli_parse_fetch_quiet() {
    match parse(&["talkgrab", "fetch", "--quiet"]) {
        CliCommand::Fetch { quiet, .. } => assert!(quiet),
        _ => panic!("expected Fetch with --quiet"),
    }
}

#[test]
fn cli_parse_fetch_combined_flags() {
    match parse(&[
        "talkgrab",
        "fetch",
        "--talks",
        "5",
        "--discard-metadata",
        "--quiet",
    ]) {
        CliCommand::Fetch {
            talks,
            discard_metadata,
            quiet,
            ..
        } => {
            assert_eq!(talks, vec![5]);
            assert!(discard_metadata);
            assert!(quiet);
        }
        _ => panic!("expected Fetch"),
    }
}
