use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use log::{error, info, warn};

use erp_views_client::{ClientSettings, HttpTableApi};
use erp_views_core::models::value::string_form;
use erp_views_core::{TableView, TableViewEngine, ViewSelection};

#[derive(Parser, Debug)]
#[clap(author, version, about = "ERP logical table views from the command line")]
struct Args {
    /// Settings file path
    #[clap(short, long, env = "ERP_VIEWS_CONFIG")]
    config: Option<PathBuf>,

    /// Backend base URL
    #[clap(long, env = "ERP_VIEWS_BASE_URL")]
    base_url: Option<String>,

    /// Bearer token for the backend
    #[clap(long, env = "ERP_VIEWS_TOKEN")]
    token: Option<String>,

    /// Request timeout in seconds
    #[clap(long, env = "ERP_VIEWS_TIMEOUT")]
    timeout: Option<u64>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the rows of a table through one of its views
    Show {
        /// Logical table id
        #[clap(long)]
        table: i64,

        /// View id, defaults to the first view of the table
        #[clap(long)]
        view: Option<i64>,

        /// Page number, starting at 1
        #[clap(long, default_value_t = 1)]
        page: u32,

        /// Records per page
        #[clap(long)]
        page_size: Option<u32>,
    },

    /// List the views of a table
    Views {
        /// Logical table id
        #[clap(long)]
        table: i64,
    },

    /// List the users assigned to a record
    Assignees {
        /// Logical table id
        #[clap(long)]
        table: i64,

        /// Record id
        #[clap(long)]
        record: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load settings, then let command-line arguments win
    let mut settings = ClientSettings::load(args.config.as_deref())?;

    // Initialize logging, RUST_LOG overrides the configured level
    env_logger::init_from_env(
        env_logger::Env::default()
            .filter_or(env_logger::DEFAULT_FILTER_ENV, settings.engine.log_level.as_str()),
    );

    if let Some(base_url) = args.base_url {
        settings.base_url = base_url;
    }
    if let Some(token) = args.token {
        settings.auth_token = Some(token);
    }
    if let Some(timeout) = args.timeout {
        settings.request_timeout_secs = timeout;
    }
    settings.validate()?;

    let api = Arc::new(HttpTableApi::from_settings(&settings));
    info!("Backend: {}", api.base_url());

    match args.command {
        Command::Show {
            table,
            view,
            page,
            page_size,
        } => {
            let engine = TableViewEngine::new(api, table, settings.engine.clone());
            report_load(&engine).await;

            if let Some(view_id) = view {
                if let ViewSelection::Degraded(e) = engine.select_view(view_id).await? {
                    warn!("View {} shown without its configuration: {}", view_id, e);
                }
            }
            if page != 1 || page_size.is_some() {
                let size = page_size.unwrap_or(settings.engine.page_size);
                engine.set_page(page, size).await?;
            }

            match engine.render().await {
                Some(table_view) => print_table(&table_view),
                None => bail!("table {} could not be loaded", table),
            }
        }
        Command::Views { table } => {
            let engine = TableViewEngine::new(api, table, settings.engine.clone());
            report_load(&engine).await;

            for view in engine.list_views().await {
                println!("{}\t{}\t{}", view.id, view.position, view.name);
            }
        }
        Command::Assignees { table, record } => {
            let engine = TableViewEngine::new(api, table, settings.engine.clone());
            for user in engine.assigned_users(record).await? {
                println!("{}\t{}", user.id, user.label());
            }
        }
    }

    Ok(())
}

async fn report_load(engine: &TableViewEngine) {
    let report = engine.load().await;
    for e in &report.errors {
        if e.is_degraded_read() {
            warn!("{}", e);
        } else {
            error!("{}", e);
        }
    }
}

fn print_table(table_view: &TableView) {
    if let Some(view) = &table_view.view {
        println!("# {} ({} of {} records)", view.name, table_view.rows.len(), table_view.total);
    }

    let names: Vec<&str> = table_view
        .columns
        .iter()
        .map(|c| c.column.name.as_str())
        .collect();
    println!("{}", names.join("\t"));

    for row in &table_view.rows {
        let cells: Vec<String> = names
            .iter()
            .map(|name| row.record_data.get(*name).map(string_form).unwrap_or_default())
            .collect();
        println!("{}", cells.join("\t"));
    }
}
