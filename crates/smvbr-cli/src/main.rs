// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod runtime;
mod session;

use anyhow::{Context, Result, anyhow, bail};
use config::Config;
use runtime::{
    ApiRuntime, SIGN_IN_MESSAGE, render_comparison, render_detail, render_listing,
    render_vehicle_line,
};
use session::SessionStore;
use smvbr_api::Client;
use smvbr_app::{
    ChangeEmailForm, ChangeNameForm, ChangePasswordForm, ComparisonReport, FavoriteSelection,
    FilterEdit, FormKind, FormPayload, ListingCommand, ListingState, LoginForm, Normalizer,
    RegistrationForm, SessionContext, VehicleId,
};
use std::env;
use std::fmt::Write as _;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    print_config_path: bool,
    print_example_config: bool,
    check_only: bool,
    help: bool,
    command: Option<Command>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    List(ListArgs),
    Show(ShowTarget),
    Favorites,
    Favorite { code: String },
    Compare(VehicleId, VehicleId),
    Submit(FormPayload),
    DeleteAccount,
    Logout,
    Whoami,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ListArgs {
    search: Option<String>,
    remote: bool,
    filters: Vec<FilterEdit>,
    pages: usize,
}

impl Default for ListArgs {
    fn default() -> Self {
        Self {
            search: None,
            remote: false,
            filters: Vec::new(),
            pages: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ShowTarget {
    Id(VehicleId),
    Record(String),
}

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;

    if options.help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example_config {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `smvbr --print-example-config` for a valid template",
            options.config_path.display()
        )
    })?;
    init_tracing(config.log_level());

    if options.check_only {
        tracing::info!(path = %options.config_path.display(), "config ok");
        return Ok(());
    }

    let Some(command) = options.command else {
        print_help();
        return Ok(());
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("start async runtime")?;
    runtime.block_on(execute(command, &config))
}

fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_env("SMVBR_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default_level.trim().to_lowercase()));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

async fn execute(command: Command, config: &Config) -> Result<()> {
    let client = Client::new(config.api_base_url(), config.api_timeout()?)?;
    let normalizer =
        Normalizer::new(config.api_base_url()).with_fallback_image(config.fallback_image());
    let store = SessionStore::new(SessionStore::default_path()?);
    tracing::info!(base_url = client.base_url(), "using API");

    match command {
        Command::List(args) => {
            let session = store.load_or_signed_out();
            list(&client, normalizer, session, args, config.page_step()).await
        }
        Command::Show(ShowTarget::Id(id)) => {
            let raw = client
                .vehicle(id)
                .await
                .with_context(|| format!("fetch vehicle {id}"))?;
            let vehicle = normalizer.normalize(&raw)?;
            print!("{}", render_detail(&vehicle));
            Ok(())
        }
        Command::Show(ShowTarget::Record(raw)) => {
            let vehicle = normalizer.decode_record_param(&raw).ok_or_else(|| {
                anyhow!("cannot decode vehicle record; pass JSON or percent-encoded JSON with an id")
            })?;
            print!("{}", render_detail(&vehicle));
            Ok(())
        }
        Command::Favorites => {
            let session = require_session(&store)?;
            let raw = client.favorites(&session).await.context("fetch favorites")?;
            let batch = normalizer.normalize_all(&raw);
            if batch.vehicles.is_empty() {
                println!("no favorites yet; add one with `smvbr favorite <code>`");
            }
            for vehicle in &batch.vehicles {
                println!("{}", render_vehicle_line(vehicle, true));
            }
            Ok(())
        }
        Command::Favorite { code } => {
            let session = require_session(&store)?;
            let mut state = ListingState::new(normalizer, config.page_step());
            let mut runtime = ApiRuntime::new(&client, Some(session));
            let message = runtime
                .toggle_favorite_code(&mut state, &code)
                .await
                .with_context(|| format!("toggle favorite {}", code.trim()))?;
            println!("{message}");
            Ok(())
        }
        Command::Compare(left, right) => {
            let mut selection = FavoriteSelection::new();
            selection.toggle(left)?;
            selection.toggle(right)?;
            let (left, right) = selection
                .pair()
                .ok_or_else(|| anyhow!("pick two different vehicles to compare"))?;
            let payload = client
                .compare(left, right)
                .await
                .with_context(|| format!("compare vehicles {left} and {right}"))?;
            let report = ComparisonReport::from_payload(&normalizer, &payload)?;
            print!("{}", render_comparison(&report));
            Ok(())
        }
        Command::Submit(payload) => {
            let session = match payload.kind() {
                FormKind::Login | FormKind::Registration => None,
                FormKind::ChangeName | FormKind::ChangeEmail | FormKind::ChangePassword => {
                    Some(require_session(&store)?)
                }
            };
            let submitted = ApiRuntime::new(&client, session)
                .submit_form(&payload)
                .await?;
            if let Some(session) = &submitted.session {
                store.save(session)?;
            }
            println!("{}", submitted.message);
            Ok(())
        }
        Command::DeleteAccount => {
            let session = require_session(&store)?;
            let note = client
                .delete_account(&session)
                .await
                .context("delete account")?;
            store.clear()?;
            println!("{}", note.unwrap_or_else(|| "account deleted".to_owned()));
            Ok(())
        }
        Command::Logout => {
            if store.clear()? {
                println!("signed out");
            } else {
                println!("not signed in");
            }
            Ok(())
        }
        Command::Whoami => {
            match store.load()? {
                Some(session) => println!(
                    "user #{} {} <{}>",
                    session.user_id,
                    session.greeting_name(),
                    session.email.as_deref().unwrap_or("no email")
                ),
                None => println!("not signed in"),
            }
            Ok(())
        }
    }
}

async fn list(
    client: &Client,
    normalizer: Normalizer,
    session: Option<SessionContext>,
    args: ListArgs,
    page_step: usize,
) -> Result<()> {
    let signed_in = session.is_some();
    let mut state = ListingState::new(normalizer, page_step);
    let mut runtime = ApiRuntime::new(client, session);

    let local_search = match args.search {
        Some(search) if args.remote => {
            runtime = runtime.with_remote_search(&search);
            None
        }
        other => other,
    };

    if args.filters.is_empty() {
        runtime.run(&mut state, ListingCommand::Reload).await;
    } else {
        runtime.run(&mut state, ListingCommand::OpenFilters).await;
        for edit in args.filters {
            runtime
                .run(&mut state, ListingCommand::EditFilter(edit))
                .await;
        }
        runtime.run(&mut state, ListingCommand::ApplyFilters).await;
    }

    if let Some(error) = state.error.clone() {
        bail!(error);
    }

    if signed_in {
        runtime
            .run(&mut state, ListingCommand::RefreshFavorites)
            .await;
    }
    if let Some(search) = local_search {
        runtime.run(&mut state, ListingCommand::SetQuery(search)).await;
    }
    for _ in 1..args.pages {
        runtime.run(&mut state, ListingCommand::LoadMore).await;
    }

    print!("{}", render_listing(&state, runtime.server_note()));
    Ok(())
}

fn require_session(store: &SessionStore) -> Result<SessionContext> {
    store.load()?.ok_or_else(|| anyhow!(SIGN_IN_MESSAGE))
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        print_config_path: false,
        print_example_config: false,
        check_only: false,
        help: false,
        command: None,
    };

    let mut iter = args.into_iter().map(|arg| arg.as_ref().to_owned());
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                let Some(path) = iter.next() else {
                    bail!("--config requires a file path");
                };
                options.config_path = PathBuf::from(path);
            }
            "--print-config-path" => options.print_config_path = true,
            "--print-example-config" => options.print_example_config = true,
            "--check" => options.check_only = true,
            "-h" | "--help" => options.help = true,
            flag if flag.starts_with('-') => {
                bail!("unknown argument {flag:?}; run with --help to see supported options")
            }
            name => {
                let rest: Vec<String> = iter.by_ref().collect();
                options.command = Some(parse_command(name, rest)?);
            }
        }
    }

    Ok(options)
}

fn parse_command(name: &str, args: Vec<String>) -> Result<Command> {
    match name {
        "list" => parse_list_args(args).map(Command::List),
        "show" => match args.as_slice() {
            [flag, raw] if flag == "--record" => Ok(Command::Show(ShowTarget::Record(raw.clone()))),
            [id] => Ok(Command::Show(ShowTarget::Id(parse_vehicle_id(id)?))),
            _ => bail!("usage: smvbr show <id> | smvbr show --record <json>"),
        },
        "favorites" => {
            expect_arity(name, &args, &[])?;
            Ok(Command::Favorites)
        }
        "favorite" => {
            let [code] = expect_arity(name, &args, &["code"])?;
            Ok(Command::Favorite { code })
        }
        "compare" => {
            let [left, right] = expect_arity(name, &args, &["id1", "id2"])?;
            Ok(Command::Compare(
                parse_vehicle_id(&left)?,
                parse_vehicle_id(&right)?,
            ))
        }
        "login" => {
            let [email, password] = expect_arity(name, &args, &["email", "password"])?;
            Ok(Command::Submit(FormPayload::Login(LoginForm { email, password })))
        }
        "register" => {
            let [name, email, password] =
                expect_arity("register", &args, &["name", "email", "password"])?;
            Ok(Command::Submit(FormPayload::Registration(
                RegistrationForm {
                    name,
                    email,
                    password,
                },
            )))
        }
        "logout" => {
            expect_arity(name, &args, &[])?;
            Ok(Command::Logout)
        }
        "whoami" => {
            expect_arity(name, &args, &[])?;
            Ok(Command::Whoami)
        }
        "account" => parse_account_args(args),
        unknown => {
            bail!("unknown command {unknown:?}; run with --help to see supported commands")
        }
    }
}

fn parse_list_args(args: Vec<String>) -> Result<ListArgs> {
    let mut list = ListArgs::default();
    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        let mut value = || {
            iter.next()
                .ok_or_else(|| anyhow!("{arg} requires a value"))
        };
        match arg.as_str() {
            "--search" => list.search = Some(value()?),
            "--remote" => list.remote = true,
            "--year" => list.filters.push(FilterEdit::Year(Some(value()?))),
            "--group" => list.filters.push(FilterEdit::Group(Some(value()?))),
            "--brand" => list.filters.push(FilterEdit::Brand(Some(value()?))),
            "--engine" => list.filters.push(FilterEdit::Engine(Some(value()?))),
            "--transmission" => list
                .filters
                .push(FilterEdit::Transmission(Some(value()?))),
            "--steering" => list
                .filters
                .push(FilterEdit::PowerSteering(Some(value()?))),
            "--fuel" => list.filters.push(FilterEdit::FuelType(Some(value()?))),
            "--ac" => {
                let raw = value()?;
                let flag = match raw.trim().to_lowercase().as_str() {
                    "yes" | "true" | "sim" => true,
                    "no" | "false" | "nao" | "não" => false,
                    _ => bail!("--ac expects yes or no, got {raw:?}"),
                };
                list.filters.push(FilterEdit::AirConditioning(Some(flag)));
            }
            "--pages" => {
                let raw = value()?;
                list.pages = raw
                    .parse()
                    .ok()
                    .filter(|pages| *pages > 0)
                    .ok_or_else(|| anyhow!("--pages expects a positive number, got {raw:?}"))?;
            }
            unknown => {
                bail!("unknown list option {unknown:?}; run with --help to see supported options")
            }
        }
    }

    if list.remote && !list.filters.is_empty() {
        bail!("--remote cannot be combined with filter flags; the filter endpoint does not search");
    }
    Ok(list)
}

fn parse_account_args(args: Vec<String>) -> Result<Command> {
    let Some((action, rest)) = args.split_first() else {
        bail!("usage: smvbr account <name|email|password|delete> ...");
    };
    let rest = rest.to_vec();
    match action.as_str() {
        "name" => {
            let [name] = expect_arity("account name", &rest, &["new-name"])?;
            Ok(Command::Submit(FormPayload::ChangeName(ChangeNameForm { name })))
        }
        "email" => {
            let [email] = expect_arity("account email", &rest, &["new-email"])?;
            Ok(Command::Submit(FormPayload::ChangeEmail(ChangeEmailForm {
                email,
            })))
        }
        "password" => {
            let [current, new, confirmation] = expect_arity(
                "account password",
                &rest,
                &["current", "new", "confirmation"],
            )?;
            Ok(Command::Submit(FormPayload::ChangePassword(
                ChangePasswordForm {
                    current,
                    new,
                    confirmation,
                },
            )))
        }
        "delete" => {
            expect_arity("account delete", &rest, &[])?;
            Ok(Command::DeleteAccount)
        }
        unknown => bail!("unknown account action {unknown:?}; use name, email, password, or delete"),
    }
}

fn expect_arity<const N: usize>(
    command: &str,
    args: &[String],
    names: &[&str; N],
) -> Result<[String; N]> {
    <[String; N]>::try_from(args.to_vec()).map_err(|_| {
        let usage = names
            .iter()
            .map(|name| format!("<{name}>"))
            .collect::<Vec<_>>()
            .join(" ");
        anyhow!(
            "{command} takes {N} argument(s), got {}; usage: smvbr {command} {usage}",
            args.len()
        )
    })
}

fn parse_vehicle_id(raw: &str) -> Result<VehicleId> {
    raw.parse::<VehicleId>()
        .map_err(|_| anyhow!("invalid vehicle id {raw:?}; ids are whole numbers"))
}

fn print_help() {
    print!("{}", help_text());
}

fn help_text() -> String {
    let mut out = String::new();
    let _ = writeln!(out, "smvbr");
    out.push('\n');
    let _ = writeln!(out, "Usage:");
    let _ = writeln!(out, "  smvbr [--config <path>] [--check] <command> [args]");
    let _ = writeln!(out, "  smvbr --print-config-path");
    let _ = writeln!(out, "  smvbr --print-example-config");
    out.push('\n');
    let _ = writeln!(out, "Commands:");
    let _ = writeln!(out, "  list [options]                      Browse the vehicle catalog");
    let _ = writeln!(out, "    --search <text>                   Match brand, model, display name, or year");
    let _ = writeln!(out, "    --remote                          Send --search to the server (fuzzy matching)");
    let _ = writeln!(out, "    --year, --group, --brand, --engine, --transmission <value>");
    let _ = writeln!(out, "    --ac <yes|no>  --steering <code>  --fuel <code>");
    let _ = writeln!(out, "    --pages <n>                       Reveal n pages of results");
    let _ = writeln!(out, "  show <id> | show --record <json>    Vehicle details");
    let _ = writeln!(out, "  favorites                           List your favorite vehicles");
    let _ = writeln!(out, "  favorite <code>                     Add or remove a favorite");
    let _ = writeln!(out, "  compare <id1> <id2>                 Compare emissions and efficiency");
    let _ = writeln!(out, "  login <email> <password>            Sign in");
    let _ = writeln!(out, "  register <name> <email> <password>  Create an account and sign in");
    let _ = writeln!(out, "  account name <new-name>             Change your display name");
    let _ = writeln!(out, "  account email <new-email>           Change your email");
    let _ = writeln!(out, "  account password <current> <new> <confirmation>");
    let _ = writeln!(out, "  account delete                      Delete your account");
    let _ = writeln!(out, "  logout | whoami                     Manage the saved session");
    out.push('\n');
    let _ = writeln!(out, "Options:");
    let _ = writeln!(out, "  --config <path>         Override config path");
    let _ = writeln!(out, "  --print-config-path     Print resolved config path");
    let _ = writeln!(out, "  --print-example-config  Print a complete example config");
    let _ = writeln!(out, "  --check                 Validate config and exit");
    let _ = writeln!(out, "  -h, --help              Show help");
    out.push('\n');
    let _ = writeln!(out, "Environment:");
    let _ = writeln!(out, "  SMVBR_CONFIG_PATH   Config file location");
    let _ = writeln!(out, "  SMVBR_SESSION_PATH  Session file location");
    let _ = writeln!(out, "  SMVBR_LOG           Log filter, for example debug or smvbr_api=trace");
    out
}
