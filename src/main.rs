use std::process;

use serde_json::json;
use sitepipe::{
    application::{
        build::{BuildOptions, SiteBuilder},
        clean::clean_output,
        content::check_content,
        error::AppError,
        preview::{PreviewOptions, PreviewServer},
        publish::{PublishOutcome, PublishPipeline, PublishRequest, PublishTarget},
        qr::write_site_qr,
        scaffold::{NewContent, Scaffolder},
        tooling::Tooling,
    },
    config::{
        self, BuildArgs, CheckArgs, NewArgs, PublishArgs, QrArgs, ServeArgs, Settings, TriggerKind,
    },
    domain::{content::PublishPolicy, deployment::TriggerEvent},
    infra::{
        cloudflare::{ACCOUNT_ID_ENV, API_TOKEN_ENV, CloudflareClient, CloudflareCredentials},
        error::InfraError,
        git::GitCli,
        hugo::HugoCli,
        telemetry,
        wrangler::WranglerDeployer,
    },
    util::output::print_json,
};
use time::OffsetDateTime;
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(error.exit_code());
    }
}

fn report_application_error(error: &AppError) {
    let category = error.category().as_str();
    let chain = error.messages().join(": caused by: ");

    if dispatcher::has_been_set() {
        error!(
            error_code = category,
            exit_code = error.exit_code(),
            error = %chain,
            "application error"
        );
        return;
    }

    let subscriber = tracing_fmt()
        .with_writer(std::io::stderr)
        .with_max_level(Level::ERROR)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(
            error_code = category,
            exit_code = error.exit_code(),
            error = %chain,
            "application error"
        );
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, mut settings) = config::load_with_cli()
        .map_err(|err| AppError::configuration(format!("failed to load configuration: {err}")))?;

    telemetry::init(&settings.logging).map_err(AppError::from)?;
    settings.site.root = std::path::absolute(&settings.site.root)?;

    match cli_args.command {
        config::Command::Build(args) => run_build(&settings, &args),
        config::Command::Serve(args) => run_serve(&settings, &args),
        config::Command::Clean => run_clean(&settings),
        config::Command::New(args) => run_new(&settings, args),
        config::Command::Check(args) => run_check(&settings, &args),
        config::Command::Lint => tooling(&settings).lint(),
        config::Command::DockerBuild => run_docker_build(&settings),
        config::Command::DockerUp => tooling(&settings).docker_up(),
        config::Command::Publish(args) => run_publish(&settings, &args).await,
        config::Command::Qr(args) => run_qr(&settings, &args),
    }
}

fn hugo(settings: &Settings) -> HugoCli {
    HugoCli::new(&settings.hugo.binary, &settings.site.root)
}

fn site_builder(settings: &Settings) -> SiteBuilder {
    SiteBuilder::new(
        hugo(settings),
        settings.site.content_path(),
        settings.site.theme_path(),
    )
}

fn production_options(settings: &Settings) -> BuildOptions {
    BuildOptions {
        base_url: settings.hugo.base_url.clone(),
        environment: settings.hugo.environment.clone(),
        ..BuildOptions::production(settings.site.output_path())
    }
}

fn tooling(settings: &Settings) -> Tooling {
    Tooling::new(
        &settings.site.root,
        settings.lint.clone(),
        settings.docker.clone(),
    )
}

fn run_build(settings: &Settings, args: &BuildArgs) -> Result<(), AppError> {
    let options = BuildOptions {
        include_drafts: args.drafts,
        minify: !args.no_minify,
        ..production_options(settings)
    };
    let builder = site_builder(settings);

    let report = if args.check_reproducible {
        builder.build_reproducible(&options)?
    } else {
        builder.build(&options)?
    };

    info!(
        target = "sitepipe::build",
        output = %report.output_dir.display(),
        artifacts = report.artifacts.len(),
        digest = %report.digest(),
        "Build finished"
    );
    Ok(())
}

fn run_serve(settings: &Settings, args: &ServeArgs) -> Result<(), AppError> {
    let options = PreviewOptions::from_settings(&settings.serve, args.drafts, args.debug);
    PreviewServer::new(hugo(settings)).run(&options)
}

fn run_clean(settings: &Settings) -> Result<(), AppError> {
    clean_output(&settings.site.root, &settings.site.output_path())?;
    Ok(())
}

fn run_new(settings: &Settings, args: NewArgs) -> Result<(), AppError> {
    let request = NewContent {
        path: args.path,
        title: args.title,
        tags: args.tags,
        force: args.force,
    };
    let created = Scaffolder::new(hugo(settings), settings.site.content_path())
        .create(&request)?;
    println!("{}", created.display());
    Ok(())
}

fn run_qr(settings: &Settings, args: &QrArgs) -> Result<(), AppError> {
    let url = non_blank(args.url.as_deref())
        .or_else(|| non_blank(settings.hugo.base_url.as_deref()))
        .ok_or_else(|| {
            AppError::configuration(
                "no site URL; pass --url or set hugo.base_url (SITEPIPE__HUGO__BASE_URL)",
            )
        })?;
    let output = settings.site.root.join(&args.output);
    let written = write_site_qr(&url, &output)?;
    println!("{}", written.path.display());
    Ok(())
}

fn run_check(settings: &Settings, args: &CheckArgs) -> Result<(), AppError> {
    let policy = PublishPolicy::production()
        .with_drafts(args.drafts)
        .with_future(args.future);
    let report = check_content(
        &settings.site.content_path(),
        policy,
        OffsetDateTime::now_utc(),
    )?;
    print_json(&report)
}

fn run_docker_build(settings: &Settings) -> Result<(), AppError> {
    tooling(settings).docker_build(&site_builder(settings), &production_options(settings))?;
    Ok(())
}

async fn run_publish(settings: &Settings, args: &PublishArgs) -> Result<(), AppError> {
    let branch = settings.publish.branch.clone();
    let event = match args.event {
        TriggerKind::Manual => TriggerEvent::Manual,
        TriggerKind::Push => TriggerEvent::Push {
            git_ref: args.git_ref.clone().ok_or_else(|| {
                AppError::validation("push events require --ref (or GITHUB_REF)")
            })?,
        },
    };

    if !event.targets_branch(&branch) {
        info!(
            target = "sitepipe::publish",
            result = "skipped",
            branch = %branch,
            "Push does not target the publish branch; nothing to do"
        );
        return print_json(&json!({ "status": "skipped", "branch": branch }));
    }

    let project_name = settings.publish.project_name.clone().ok_or_else(|| {
        AppError::configuration(
            "publish.project_name is not set (SITEPIPE__PUBLISH__PROJECT_NAME or --project-name)",
        )
    })?;
    let credentials = credentials(args)?;

    let api = CloudflareClient::new(&settings.publish.api_base_url, credentials.clone())
        .map_err(InfraError::from)?;
    let deployer = WranglerDeployer::new(
        &settings.publish.wrangler_binary,
        &settings.site.root,
        credentials,
    );
    let pipeline = PublishPipeline::new(
        GitCli::new(&settings.publish.git_binary, &settings.site.root),
        site_builder(settings),
        production_options(settings),
        &api,
        &deployer,
        PublishTarget {
            branch,
            project_name,
        },
    );

    let request = PublishRequest {
        event,
        commit_sha: args.sha.clone(),
        skip_checkout: args.skip_checkout,
    };

    match pipeline.run(&request).await? {
        PublishOutcome::Deployed(record) => print_json(&record),
        PublishOutcome::Skipped { reason } => {
            print_json(&json!({ "status": "skipped", "reason": reason }))
        }
    }
}

fn credentials(args: &PublishArgs) -> Result<CloudflareCredentials, AppError> {
    let api_token = non_blank(std::env::var(API_TOKEN_ENV).ok().as_deref())
        .ok_or_else(|| AppError::credential(format!("{API_TOKEN_ENV} is not set")))?;
    let account_id = non_blank(args.account_id.as_deref()).ok_or_else(|| {
        AppError::credential(format!("{ACCOUNT_ID_ENV} is not set (or pass --account-id)"))
    })?;
    Ok(CloudflareCredentials {
        api_token,
        account_id,
    })
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
