mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use hrdesk::config::ServerConfig;

#[derive(Parser)]
#[command(
    name = "hrd",
    version,
    about = "HR dashboard backend: people, tasks, meetings and a weekly calendar"
)]
struct Cli {
    /// Path to the database file (default: .hrdesk/hrdesk.db in current dir)
    #[arg(long, env = "HRDESK_DB", global = true)]
    db: Option<PathBuf>,

    /// Output as JSON instead of table
    #[arg(long, global = true)]
    json: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database and schema
    Init,
    /// Run the REST API
    Serve {
        /// Interface to bind
        #[arg(long, env = "HOST", default_value = "0.0.0.0")]
        host: String,
        /// Port to listen on
        #[arg(long, env = "PORT", default_value_t = 3000)]
        port: u16,
        /// Secret used to sign session tokens
        #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
        jwt_secret: String,
        /// Session token lifetime in days
        #[arg(long, env = "TOKEN_DAYS", default_value_t = 30)]
        token_days: i64,
        /// ImageKit private key; without it uploads are kept on local disk
        #[arg(long, env = "IMAGEKIT_PRIVATE_KEY", hide_env_values = true)]
        imagekit_private_key: Option<String>,
        /// Override the ImageKit upload endpoint
        #[arg(long, env = "IMAGEKIT_UPLOAD_URL")]
        imagekit_upload_url: Option<String>,
        /// Override the ImageKit management API base URL
        #[arg(long, env = "IMAGEKIT_API_URL")]
        imagekit_api_url: Option<String>,
        /// Directory for locally stored uploads, served under /uploads
        #[arg(long, env = "UPLOAD_DIR", default_value = "./upload")]
        upload_dir: PathBuf,
    },
    /// List registered users
    Users,
    /// Show counts of users, tasks and meetings
    Stats,
    /// Print a user's meetings on the week grid
    Calendar {
        /// Email of the user whose week to show
        #[arg(long)]
        email: String,
        /// Any day in the week to show (YYYY-MM-DD, default: today)
        #[arg(long)]
        date: Option<String>,
    },
}

fn init_tracing(log_json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let db_path = cli
        .db
        .unwrap_or_else(|| PathBuf::from(".hrdesk").join("hrdesk.db"));

    let result = match cli.command {
        Commands::Init => commands::init::run(&db_path),
        Commands::Serve {
            host,
            port,
            jwt_secret,
            token_days,
            imagekit_private_key,
            imagekit_upload_url,
            imagekit_api_url,
            upload_dir,
        } => commands::serve::run(
            &db_path,
            ServerConfig {
                host,
                port,
                jwt_secret,
                token_days,
                imagekit_private_key,
                imagekit_upload_url,
                imagekit_api_url,
                upload_dir,
            },
        ),
        Commands::Users => commands::users::run(&db_path, cli.json),
        Commands::Stats => commands::stats::run(&db_path, cli.json),
        Commands::Calendar { email, date } => {
            commands::calendar::run(&db_path, &email, date.as_deref(), cli.json)
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
