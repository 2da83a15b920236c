//! Command-line front end for the study log store.
//!
//! # Responsibility
//! - Map flags onto `studylog_core` calls and print results as JSON.
//! - Keep scheduling and presentation out of the core crate.

use clap::{Args, Parser, Subcommand, ValueEnum};
use log::info;
use serde_json::json;
use std::error::Error;
use std::path::PathBuf;
use std::str::FromStr;
use studylog_core::{
    core_version, default_log_level, init_logging, open_db, CategoryId, DemoKind, PostId,
    ReferenceFilter, SqliteAdminService, SqliteDemoService, SqlitePostService, StatsAggregator,
};

type CliResult = Result<(), Box<dyn Error>>;

#[derive(Parser, Debug)]
#[command(name = "studylog", about = "Study time log and statistics", version)]
struct Cli {
    /// SQLite database file (created when missing)
    #[arg(long, global = true, default_value = "studylog.db")]
    db: PathBuf,

    /// trace|debug|info|warn|error; only valid together with `--log-dir`
    #[arg(long, global = true, requires = "log_dir")]
    log_level: Option<String>,

    /// Absolute directory for rolling log files; logging is off when omitted
    #[arg(long, global = true)]
    log_dir: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Apply migrations and create the default admin user
    Init,
    /// Print aggregated study time for one user
    Stats {
        #[arg(long)]
        user: String,
        /// `year` for monthly buckets over 365 days; anything else means month
        #[arg(long, default_value = "month")]
        window: String,
    },
    /// Manage users
    #[command(subcommand)]
    User(NameCommands),
    /// Manage study categories
    #[command(subcommand)]
    Category(CategoryCommands),
    /// Browse posts
    #[command(subcommand)]
    Post(PostCommands),
    /// List references for the dashboard
    References {
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        min_rating: Option<u8>,
    },
    /// Generate demo history for a user
    Demo {
        #[arg(long)]
        user: String,
        #[arg(long, value_enum, default_value = "graph")]
        kind: DemoKindArg,
    },
    /// Manage the daily auto-generated post
    #[command(subcommand)]
    AutoPost(AutoPostCommands),
}

#[derive(Subcommand, Debug)]
enum NameCommands {
    Add { name: String },
    Remove { name: String },
    List,
}

#[derive(Subcommand, Debug)]
enum CategoryCommands {
    Add { name: String },
    /// Remove a category by id
    Remove { id: String },
    List,
}

#[derive(Subcommand, Debug)]
enum PostCommands {
    /// Newest first, optionally for one user
    List {
        #[arg(long)]
        user: Option<String>,
    },
    Show { id: String },
}

#[derive(Subcommand, Debug)]
enum AutoPostCommands {
    Enable(UserArg),
    Disable(UserArg),
    Status,
    /// Post for one user, or for every enabled user when `--user` is omitted
    Run {
        #[arg(long)]
        user: Option<String>,
    },
}

#[derive(Args, Debug)]
struct UserArg {
    #[arg(long)]
    user: String,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum DemoKindArg {
    Graph,
    References,
}

impl From<DemoKindArg> for DemoKind {
    fn from(value: DemoKindArg) -> Self {
        match value {
            DemoKindArg::Graph => DemoKind::Graph,
            DemoKindArg::References => DemoKind::References,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> CliResult {
    if let Some(log_dir) = cli.log_dir.as_deref() {
        let level = cli.log_level.as_deref().unwrap_or(default_log_level());
        init_logging(level, log_dir)?;
    }
    info!(
        "event=cli_start module=cli status=ok version={}",
        core_version()
    );

    let conn = open_db(&cli.db)?;
    let admin = SqliteAdminService::sqlite(&conn);

    match cli.command {
        Commands::Init => {
            let (user, created) = admin.ensure_default_admin()?;
            print_json(&json!({ "admin": user.name, "created": created }))
        }
        Commands::Stats { user, window } => {
            let user = admin.require_user(&user)?;
            let stats = StatsAggregator::sqlite(&conn).compute_stats(user.id, &window)?;
            print_json(&json!({
                "stats": stats,
                "chart": stats.chart_data(),
            }))
        }
        Commands::User(command) => match command {
            NameCommands::Add { name } => print_json(&admin.create_user(&name)?),
            NameCommands::Remove { name } => {
                admin.delete_user(&name)?;
                print_json(&json!({ "removed": name.trim() }))
            }
            NameCommands::List => print_json(&admin.list_users()?),
        },
        Commands::Category(command) => match command {
            CategoryCommands::Add { name } => print_json(&admin.create_category(&name)?),
            CategoryCommands::Remove { id } => {
                let id = CategoryId::from_str(id.trim())?;
                admin.delete_category(id)?;
                print_json(&json!({ "removed": id }))
            }
            CategoryCommands::List => print_json(&admin.list_categories()?),
        },
        Commands::Post(command) => {
            let posts = SqlitePostService::sqlite(&conn);
            match command {
                PostCommands::List { user: Some(name) } => {
                    print_json(&posts.list_posts_by_user(&name)?)
                }
                PostCommands::List { user: None } => print_json(&posts.list_posts()?),
                PostCommands::Show { id } => {
                    let id = PostId::from_str(id.trim())?;
                    print_json(&posts.get_post(id)?)
                }
            }
        }
        Commands::References {
            category,
            min_rating,
        } => {
            let filter = ReferenceFilter {
                category_id: category
                    .as_deref()
                    .map(|value| CategoryId::from_str(value.trim()))
                    .transpose()?,
                min_rating,
            };
            print_json(&SqlitePostService::sqlite(&conn).list_references(&filter)?)
        }
        Commands::Demo { user, kind } => {
            let posts = SqliteDemoService::sqlite(&conn).generate(&user, kind.into())?;
            print_json(&json!({ "user": user.trim(), "posts": posts }))
        }
        Commands::AutoPost(command) => match command {
            AutoPostCommands::Enable(arg) => {
                admin.set_auto_post(&arg.user, true)?;
                print_json(&json!({ "user": arg.user.trim(), "enabled": true }))
            }
            AutoPostCommands::Disable(arg) => {
                admin.set_auto_post(&arg.user, false)?;
                print_json(&json!({ "user": arg.user.trim(), "enabled": false }))
            }
            AutoPostCommands::Status => print_json(&admin.auto_post_statuses()?),
            AutoPostCommands::Run { user } => {
                let demo = SqliteDemoService::sqlite(&conn);
                let created = match user {
                    Some(name) => vec![demo.run_auto_post(&name)?],
                    None => demo.run_enabled_auto_posts()?,
                };
                print_json(&json!({ "created": created }))
            }
        },
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{AutoPostCommands, Cli, Commands, DemoKindArg};
    use clap::Parser;

    #[test]
    fn parses_stats_with_global_db_flag() {
        let cli = Cli::try_parse_from([
            "studylog", "stats", "--user", "alice", "--window", "year", "--db", "/tmp/x.db",
        ])
        .unwrap();
        assert_eq!(cli.db.to_str(), Some("/tmp/x.db"));
        match cli.command {
            Commands::Stats { user, window } => {
                assert_eq!(user, "alice");
                assert_eq!(window, "year");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn stats_window_defaults_to_month() {
        let cli = Cli::try_parse_from(["studylog", "stats", "--user", "bob"]).unwrap();
        assert!(matches!(cli.command, Commands::Stats { ref window, .. } if window == "month"));
    }

    #[test]
    fn parses_demo_kind_and_auto_post_run() {
        let cli = Cli::try_parse_from(["studylog", "demo", "--user", "a", "--kind", "references"])
            .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Demo {
                kind: DemoKindArg::References,
                ..
            }
        ));

        let cli = Cli::try_parse_from(["studylog", "auto-post", "run"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::AutoPost(AutoPostCommands::Run { user: None })
        ));
    }

    #[test]
    fn log_level_requires_log_dir() {
        assert!(Cli::try_parse_from(["studylog", "--log-level", "debug", "init"]).is_err());

        let cli = Cli::try_parse_from([
            "studylog",
            "--log-level",
            "debug",
            "--log-dir",
            "/tmp/studylog-logs",
            "init",
        ])
        .unwrap();
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert_eq!(cli.log_dir.as_deref(), Some("/tmp/studylog-logs"));
    }

    #[test]
    fn rejects_unknown_demo_kind() {
        assert!(Cli::try_parse_from(["studylog", "demo", "--user", "a", "--kind", "x"]).is_err());
    }
}
