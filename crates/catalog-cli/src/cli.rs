//! Argument parsing and command dispatch.

use std::path::PathBuf;
use std::time::Duration;

use catalog_client::Console;
use catalog_config::AppConfig;
use catalog_core::categories::CategoryStatus;
use catalog_core::query::QuerySort;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::debug;
use url::Url;

use crate::client::{AppContext, CliError, CliResult, parse_url};
use crate::commands::auth::{handle_login, handle_logout, handle_whoami};
use crate::commands::catalogs::handle_catalogs;
use crate::commands::categories::{
    handle_category_create, handle_category_delete, handle_category_list, handle_category_report,
    handle_category_restore, handle_category_show, handle_category_update,
};

/// Parses CLI arguments and executes the requested command. Returns the process exit code.
pub async fn run() -> i32 {
    let cli = Cli::parse();
    let result = match build_context(&cli) {
        Ok(ctx) => dispatch(cli.command, &ctx).await,
        Err(err) => Err(err),
    };

    match result {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("error: {}", err.display_message());
            err.exit_code()
        }
    }
}

fn build_context(cli: &Cli) -> CliResult<AppContext> {
    let config = resolve_config(cli, AppConfig::from_env())?;
    debug!(base_url = %config.api_base_url, "configuration resolved");
    let console = Console::from_config(config)?;
    Ok(AppContext {
        console,
        output: cli.output,
    })
}

/// Overlay command-line flags onto the environment configuration.
pub(crate) fn resolve_config(
    cli: &Cli,
    loaded: catalog_config::ConfigResult<AppConfig>,
) -> CliResult<AppConfig> {
    let mut config = loaded.map_err(|err| CliError::validation(err.to_string()))?;
    if let Some(url) = &cli.api_url {
        config.api_base_url = url.clone();
    }
    if let Some(secs) = cli.timeout {
        if secs == 0 {
            return Err(CliError::validation("timeout must be at least one second"));
        }
        config.http_timeout = Duration::from_secs(secs);
    }
    if let Some(limit) = cli.page_size.filter(|limit| *limit > 0) {
        config.page_size = limit;
    }
    if let Some(path) = &cli.session_file {
        config.session_file.clone_from(path);
    }
    Ok(config)
}

async fn dispatch(command: Command, ctx: &AppContext) -> CliResult<()> {
    match command {
        Command::Login(args) => handle_login(ctx, args).await,
        Command::Logout => {
            handle_logout(ctx);
            Ok(())
        }
        Command::Whoami => handle_whoami(ctx).await,
        Command::Category(category) => match category {
            CategoryCommand::List(args) => handle_category_list(ctx, args).await,
            CategoryCommand::Show(args) => handle_category_show(ctx, args).await,
            CategoryCommand::Create(args) => handle_category_create(ctx, args).await,
            CategoryCommand::Update(args) => handle_category_update(ctx, args).await,
            CategoryCommand::Delete(args) => handle_category_delete(ctx, args).await,
            CategoryCommand::Restore(args) => handle_category_restore(ctx, args).await,
            CategoryCommand::Report(args) => handle_category_report(ctx, args).await,
        },
        Command::Catalogs(args) => handle_catalogs(ctx, args).await,
    }
}

#[derive(Parser)]
#[command(name = "catalog", about = "Administrative CLI for the catalog console")]
pub(crate) struct Cli {
    #[arg(long, global = true, env = "CATALOG_API_BASE_URL", value_parser = parse_url)]
    pub(crate) api_url: Option<Url>,
    #[arg(long, global = true, env = "CATALOG_HTTP_TIMEOUT_SECS")]
    pub(crate) timeout: Option<u64>,
    #[arg(long, global = true, env = "CATALOG_PAGE_SIZE")]
    pub(crate) page_size: Option<u32>,
    #[arg(long, global = true, env = "CATALOG_SESSION_FILE")]
    pub(crate) session_file: Option<PathBuf>,
    #[arg(
        long = "output",
        alias = "format",
        global = true,
        value_enum,
        default_value_t = OutputFormat::Table,
        help = "Select output format for commands that render structured data"
    )]
    pub(crate) output: OutputFormat,
    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Sign in and store the session.
    Login(LoginArgs),
    /// Forget the stored session.
    Logout,
    /// Show the signed-in user.
    Whoami,
    /// Manage categories.
    #[command(subcommand)]
    Category(CategoryCommand),
    /// Fetch lookup lists.
    Catalogs(CatalogArgs),
}

#[derive(Subcommand)]
pub(crate) enum CategoryCommand {
    /// List one page of categories.
    List(CategoryListArgs),
    /// Show one category.
    Show(CategoryIdArgs),
    /// Create a category.
    Create(CategoryCreateArgs),
    /// Update a category; omitted fields keep their value.
    Update(CategoryUpdateArgs),
    /// Delete a category.
    Delete(CategoryIdArgs),
    /// Restore a deleted category.
    Restore(CategoryIdArgs),
    /// Download the category report.
    Report(CategoryReportArgs),
}

#[derive(Args, Debug, Clone)]
pub(crate) struct LoginArgs {
    #[arg(long)]
    pub(crate) email: String,
    #[arg(long, env = "CATALOG_PASSWORD", hide_env_values = true)]
    pub(crate) password: Option<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub(crate) struct CategoryListArgs {
    #[arg(long)]
    pub(crate) page: Option<u32>,
    #[arg(long)]
    pub(crate) limit: Option<u32>,
    #[arg(long)]
    pub(crate) search: Option<String>,
    /// `field,direction` or `field:direction`.
    #[arg(long, value_parser = QuerySort::parse)]
    pub(crate) sort: Option<QuerySort>,
    #[arg(long, value_enum)]
    pub(crate) status: Option<StatusArg>,
}

#[derive(Args, Debug, Clone)]
pub(crate) struct CategoryIdArgs {
    pub(crate) id: String,
}

#[derive(Args, Debug, Clone, Default)]
pub(crate) struct CategoryCreateArgs {
    #[arg(long)]
    pub(crate) name: String,
    #[arg(long, default_value = "")]
    pub(crate) description: String,
    #[arg(long, value_enum, default_value_t = StatusArg::Active)]
    pub(crate) status: StatusArg,
    #[arg(long, default_value = "")]
    pub(crate) color: String,
    #[arg(long, default_value = "0")]
    pub(crate) display_order: String,
}

#[derive(Args, Debug, Clone, Default)]
pub(crate) struct CategoryUpdateArgs {
    pub(crate) id: String,
    #[arg(long)]
    pub(crate) name: Option<String>,
    #[arg(long)]
    pub(crate) description: Option<String>,
    #[arg(long, value_enum)]
    pub(crate) status: Option<StatusArg>,
    #[arg(long)]
    pub(crate) color: Option<String>,
    #[arg(long)]
    pub(crate) display_order: Option<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub(crate) struct CategoryReportArgs {
    #[arg(long)]
    pub(crate) title: Option<String>,
    /// Directory the report is written into.
    #[arg(long, default_value = ".")]
    pub(crate) dir: PathBuf,
}

#[derive(Args, Debug, Clone, Default)]
pub(crate) struct CatalogArgs {
    /// Catalog types to fetch, e.g. `category`.
    #[arg(required = true)]
    pub(crate) types: Vec<String>,
    #[arg(long)]
    pub(crate) limit: Option<u32>,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum StatusArg {
    #[default]
    Active,
    Inactive,
}

impl From<StatusArg> for CategoryStatus {
    fn from(value: StatusArg) -> Self {
        match value {
            StatusArg::Active => Self::Active,
            StatusArg::Inactive => Self::Inactive,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Table,
    Json,
}
