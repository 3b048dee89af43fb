use clap::Parser;

use super::*;

#[test]
fn defaults_describe_a_hugo_site_in_the_working_directory() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.site.root, PathBuf::from("."));
    assert_eq!(settings.site.output_path(), PathBuf::from("./public"));
    assert_eq!(settings.site.content_path(), PathBuf::from("./content"));
    assert_eq!(
        settings.site.theme_path(),
        PathBuf::from("./themes/blowfish")
    );
    assert_eq!(settings.hugo.binary, PathBuf::from("hugo"));
    assert_eq!(settings.serve.port, 1313);
    assert!(settings.serve.live_reload);
    assert_eq!(settings.publish.branch, "main");
    assert!(settings.publish.project_name.is_none());
    assert_eq!(
        settings.publish.api_base_url.as_str(),
        "https://api.cloudflare.com/client/v4"
    );
    assert_eq!(settings.lint.binary, PathBuf::from("pre-commit"));
    assert_eq!(settings.logging.level, LevelFilter::INFO);
    assert!(matches!(settings.logging.format, LogFormat::Compact));
}

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.serve.port = Some(4000);
    raw.logging.level = Some("info".to_string());

    let cli = CliArgs::parse_from([
        "sitepipe",
        "--log-level",
        "debug",
        "serve",
        "--port",
        "4321",
        "--no-live-reload",
    ]);
    raw.apply_global_overrides(&cli);
    match &cli.command {
        Command::Serve(args) => raw.apply_serve_overrides(args),
        other => panic!("wrong command parsed: {other:?}"),
    }
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.serve.port, 4321);
    assert!(!settings.serve.live_reload);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
}

#[test]
fn build_output_override_replaces_output_dir() {
    let mut raw = RawSettings::default();
    raw.apply_build_overrides(&BuildArgs {
        output: Some(PathBuf::from("/tmp/out")),
        base_url: Some("https://example.org/".into()),
        ..Default::default()
    });
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.site.output_path(), PathBuf::from("/tmp/out"));
    assert_eq!(
        settings.hugo.base_url.as_deref(),
        Some("https://example.org/")
    );
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let cli = CliArgs::parse_from(["sitepipe", "--log-json", "true", "clean"]);

    raw.apply_global_overrides(&cli);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn zero_port_is_rejected() {
    let mut raw = RawSettings::default();
    raw.serve.port = Some(0);

    let err = Settings::from_raw(raw).expect_err("invalid port");
    assert!(matches!(err, LoadError::Invalid { key: "serve.port", .. }));
}

#[test]
fn empty_binary_is_rejected() {
    let mut raw = RawSettings::default();
    raw.hugo.binary = Some(PathBuf::new());

    let err = Settings::from_raw(raw).expect_err("invalid binary");
    assert!(matches!(err, LoadError::Invalid { key: "hugo.binary", .. }));
}

#[test]
fn unparsable_level_names_the_key() {
    let mut raw = RawSettings::default();
    raw.logging.level = Some("loud".into());

    let err = Settings::from_raw(raw).expect_err("invalid level");
    assert!(err.to_string().contains("`logging.level`"));
}

#[test]
fn unparsable_api_url_is_rejected() {
    let mut raw = RawSettings::default();
    raw.publish.api_base_url = Some("not a url".into());

    let err = Settings::from_raw(raw).expect_err("invalid url");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "publish.api_base_url",
            ..
        }
    ));
}

#[test]
fn blank_project_name_counts_as_unset() {
    let mut raw = RawSettings::default();
    raw.publish.project_name = Some("   ".into());

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert!(settings.publish.project_name.is_none());
}

#[test]
fn parse_new_arguments() {
    let args = CliArgs::parse_from([
        "sitepipe",
        "new",
        "posts/hello.md",
        "--title",
        "Hello",
        "--tag",
        "rust",
        "--tag",
        "hugo",
    ]);

    match args.command {
        Command::New(new) => {
            assert_eq!(
                new.path.as_deref(),
                Some(std::path::Path::new("posts/hello.md"))
            );
            assert_eq!(new.title.as_deref(), Some("Hello"));
            assert_eq!(new.tags, vec!["rust".to_string(), "hugo".to_string()]);
            assert!(!new.force);
        }
        other => panic!("wrong command parsed: {other:?}"),
    }
}

#[test]
fn new_without_path_still_parses() {
    let args = CliArgs::parse_from(["sitepipe", "new"]);
    match args.command {
        Command::New(new) => assert!(new.path.is_none()),
        other => panic!("wrong command parsed: {other:?}"),
    }
}

#[test]
fn parse_publish_arguments() {
    let args = CliArgs::parse_from([
        "sitepipe",
        "publish",
        "--event",
        "push",
        "--ref",
        "refs/heads/main",
        "--sha",
        "abc123",
        "--skip-checkout",
        "--account-id",
        "acct",
        "--project-name",
        "blog",
    ]);

    match args.command {
        Command::Publish(publish) => {
            assert_eq!(publish.event, TriggerKind::Push);
            assert_eq!(publish.git_ref.as_deref(), Some("refs/heads/main"));
            assert_eq!(publish.sha.as_deref(), Some("abc123"));
            assert!(publish.skip_checkout);
            assert_eq!(publish.account_id.as_deref(), Some("acct"));
            assert_eq!(publish.project_name.as_deref(), Some("blog"));
        }
        other => panic!("wrong command parsed: {other:?}"),
    }
}

#[test]
fn workflow_dispatch_is_a_manual_trigger() {
    let args = CliArgs::parse_from(["sitepipe", "publish", "--event", "workflow_dispatch"]);
    match args.command {
        Command::Publish(publish) => assert_eq!(publish.event, TriggerKind::Manual),
        other => panic!("wrong command parsed: {other:?}"),
    }
}

#[test]
fn api_token_has_no_command_line_form() {
    let flag = CliArgs::try_parse_from(["sitepipe", "publish", "--api-token", "secret"]);
    assert!(flag.is_err());

    let positional = CliArgs::try_parse_from(["sitepipe", "publish", "secret"]);
    assert!(positional.is_err());
}

#[test]
fn parse_qr_arguments() {
    let args = CliArgs::parse_from(["sitepipe", "qr", "--url", "https://example.org/"]);
    match args.command {
        Command::Qr(qr) => {
            assert_eq!(qr.url.as_deref(), Some("https://example.org/"));
            assert_eq!(qr.output, PathBuf::from("website_qr.png"));
        }
        other => panic!("wrong command parsed: {other:?}"),
    }
}

#[test]
#[serial_test::serial]
fn environment_overrides_config_file() {
    use std::io::Write;

    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("config file");
    writeln!(
        file,
        "[site]\ntheme = \"papermod\"\n\n[serve]\nport = 4000\n\n[publish]\nproject_name = \"from-file\""
    )
    .expect("write config");

    // SAFETY: env-mutating tests are serialized.
    unsafe {
        std::env::set_var("SITEPIPE__SERVE__PORT", "8080");
    }
    let cli = CliArgs::parse_from([
        "sitepipe",
        "--config-file",
        file.path().to_str().expect("utf-8 path"),
        "serve",
    ]);
    let loaded = load(&cli);
    unsafe {
        std::env::remove_var("SITEPIPE__SERVE__PORT");
    }

    let settings = loaded.expect("valid settings");
    assert_eq!(settings.site.theme, "papermod");
    assert_eq!(settings.serve.port, 8080);
    assert_eq!(settings.publish.project_name.as_deref(), Some("from-file"));
}

#[test]
#[serial_test::serial]
fn missing_explicit_config_file_is_an_error() {
    let cli = CliArgs::parse_from([
        "sitepipe",
        "--config-file",
        "/nonexistent/sitepipe.toml",
        "clean",
    ]);
    assert!(matches!(load(&cli), Err(LoadError::Build(_))));
}
