mod commands;
mod config;
mod openfoodfacts;
mod remote;
mod scheduler;
mod server;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::process;

use crate::commands::{
    cmd_activity_delete, cmd_activity_list, cmd_activity_log, cmd_auth_guest, cmd_auth_login,
    cmd_auth_logout, cmd_auth_status, cmd_barcode, cmd_food_add, cmd_food_delete,
    cmd_food_favorite, cmd_food_list, cmd_food_today, cmd_goals_set, cmd_goals_show, cmd_log,
    cmd_profile_set, cmd_profile_show, cmd_remote_set, cmd_remote_show, cmd_search,
    cmd_summary, cmd_sync_daemon, cmd_sync_now, cmd_sync_pull, cmd_sync_push, cmd_sync_status,
};
use crate::config::Config;
use crate::openfoodfacts::OpenFoodFactsClient;
use stride_core::db::Database;

#[derive(Parser)]
#[command(
    name = "stride",
    version,
    about = "A local-first nutrition & activity tracker with cloud sync",
    long_about = "\nstride — log what you eat, track how you move,\nand keep every device on the same page.\n"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log a food by searching local history and `OpenFoodFacts`
    Log {
        /// Food name to search for
        query: String,
        /// Meal type: breakfast, lunch, dinner, snack
        #[arg(short, long, default_value = "snack")]
        meal: String,
        /// Date to log for (YYYY-MM-DD, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Serving size in grams (default: the product's serving)
        #[arg(long)]
        serving: Option<f64>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Look up a product by barcode, optionally logging it
    Barcode {
        /// Barcode number
        code: String,
        /// Meal type: breakfast, lunch, dinner, snack
        #[arg(short, long, default_value = "snack")]
        meal: String,
        /// Date to log for (YYYY-MM-DD, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Serving size in grams (default: the product's serving)
        #[arg(long)]
        serving: Option<f64>,
        /// Log the product after looking it up
        #[arg(long)]
        log: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Search `OpenFoodFacts` for a food
    Search {
        /// Search query
        query: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the daily dashboard (defaults to today)
    Summary {
        /// Date to show (YYYY-MM-DD, default: today)
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage food entries
    Food {
        #[command(subcommand)]
        command: FoodCommands,
    },
    /// Track exercise sessions
    Activity {
        #[command(subcommand)]
        command: ActivityCommands,
    },
    /// Daily and weekly targets
    Goals {
        #[command(subcommand)]
        command: GoalsCommands,
    },
    /// User profile
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },
    /// Manage the device session
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },
    /// Configure the cloud document-store endpoint
    Remote {
        #[command(subcommand)]
        command: RemoteCommands,
    },
    /// Synchronize the local store with the cloud
    Sync {
        #[command(subcommand)]
        command: SyncCommands,
    },
    /// Serve the cloud document-store REST API
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
        /// Address to bind to (default: 127.0.0.1, use 0.0.0.0 to expose to network)
        #[arg(short, long, default_value = "127.0.0.1")]
        bind: String,
        /// Disable API key authentication (for development/testing)
        #[arg(long)]
        no_auth: bool,
    },
}

#[derive(Subcommand)]
enum FoodCommands {
    /// Log a food entry by hand
    Add {
        /// Food name
        name: String,
        /// Calories per serving
        #[arg(long)]
        calories: i64,
        /// Protein in grams
        #[arg(long)]
        protein: Option<f64>,
        /// Carbs in grams
        #[arg(long)]
        carbs: Option<f64>,
        /// Fat in grams
        #[arg(long)]
        fat: Option<f64>,
        /// Serving size in grams (default: 100)
        #[arg(long)]
        serving: Option<f64>,
        /// Brand name
        #[arg(long)]
        brand: Option<String>,
        /// Meal type: breakfast, lunch, dinner, snack
        #[arg(short, long, default_value = "snack")]
        meal: String,
        /// Date to log for (YYYY-MM-DD, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Mark as favorite
        #[arg(long)]
        favorite: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List food entries
    List {
        /// Filter by name or brand
        #[arg(short, long)]
        search: Option<String>,
        /// Only favorites
        #[arg(long)]
        favorites: bool,
        /// Filter by meal type (with --date, default: today)
        #[arg(long)]
        meal: Option<String>,
        /// Filter by date (YYYY-MM-DD or today/yesterday)
        #[arg(long)]
        date: Option<String>,
        /// Read from the cloud store instead of the local cache
        #[arg(long)]
        cloud: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show today's entries and calorie total
    Today {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Toggle a food entry's favorite flag
    Favorite {
        /// Entry id (prefix is enough)
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a food entry from one store (never mirrored to the other)
    Delete {
        /// Entry id (prefix is enough)
        id: String,
        /// Delete the cloud copy instead of the local one
        #[arg(long)]
        cloud: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum ActivityCommands {
    /// Log an exercise session
    Log {
        /// Session name (e.g. "Morning run")
        name: String,
        /// Activity type: walking, running, cycling, swimming, weight_training, yoga, other
        #[arg(short = 't', long = "type")]
        activity: String,
        /// Duration in minutes
        #[arg(long)]
        minutes: i64,
        /// Calories burned
        #[arg(long)]
        calories: i64,
        /// Date to log for (YYYY-MM-DD, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Distance in kilometers
        #[arg(long)]
        distance: Option<f64>,
        /// Step count
        #[arg(long)]
        steps: Option<i64>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List exercise sessions
    List {
        /// Filter by activity type
        #[arg(short = 't', long = "type")]
        activity: Option<String>,
        /// Filter by date (YYYY-MM-DD or today/yesterday)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete an exercise session from one store (never mirrored)
    Delete {
        /// Record id (prefix is enough)
        id: String,
        /// Delete the cloud copy instead of the local one
        #[arg(long)]
        cloud: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum GoalsCommands {
    /// Update targets (only the flags you pass change)
    Set {
        /// Daily calorie target
        #[arg(long)]
        calories: Option<i64>,
        /// Daily steps target
        #[arg(long)]
        steps: Option<i64>,
        /// Daily water target in ml
        #[arg(long)]
        water: Option<i64>,
        /// Weekly workout target
        #[arg(long)]
        workouts: Option<i64>,
        /// Protein percentage of calories
        #[arg(long)]
        protein: Option<i64>,
        /// Carbs percentage of calories
        #[arg(long)]
        carbs: Option<i64>,
        /// Fat percentage of calories
        #[arg(long)]
        fat: Option<i64>,
        /// Current weight in kg
        #[arg(long)]
        current_weight: Option<f64>,
        /// Target weight in kg
        #[arg(long)]
        target_weight: Option<f64>,
        /// Weight goal: lose, maintain, gain
        #[arg(long)]
        goal: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show current targets
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum ProfileCommands {
    /// Update the profile (only the flags you pass change)
    Set {
        /// Display name
        #[arg(long)]
        name: Option<String>,
        /// Email address
        #[arg(long)]
        email: Option<String>,
        /// Age in years
        #[arg(long)]
        age: Option<i64>,
        /// Gender: male, female, other
        #[arg(long)]
        gender: Option<String>,
        /// Height in cm
        #[arg(long)]
        height: Option<f64>,
        /// Activity level: sedentary, light, moderate, very_active, extremely_active
        #[arg(long)]
        activity_level: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the profile
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum AuthCommands {
    /// Sign in with an account id from the identity provider
    Login {
        /// User id
        user_id: String,
        /// Email address to remember
        #[arg(long)]
        email: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Start an anonymous local-only session (excluded from sync)
    Guest {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Sign out
    Logout {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the current session
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum RemoteCommands {
    /// Set the cloud endpoint URL and optional bearer token
    Set {
        /// Endpoint URL (e.g. https://stride.example.com:8080)
        url: String,
        /// Bearer token for the endpoint
        #[arg(long)]
        token: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the configured endpoint
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum SyncCommands {
    /// Push then pull everything for the signed-in user
    Now {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Push local data to the cloud
    Push {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Pull cloud data into the local store
    Pull {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show session, endpoint, and reachability
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run the periodic sync job in the foreground
    Daemon {
        /// Minutes between passes
        #[arg(long, default_value = "15")]
        interval: u64,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

#[allow(clippy::too_many_lines)]
fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    let handle = rt.handle().clone();

    let db = Database::open(&config.db_path)?;
    let off = OpenFoodFactsClient::new(handle.clone());

    match cli.command {
        Commands::Log {
            query,
            meal,
            date,
            serving,
            json,
        } => cmd_log(&config, &db, &off, &handle, &query, &meal, date, serving, json),
        Commands::Barcode {
            code,
            meal,
            date,
            serving,
            log,
            json,
        } => cmd_barcode(
            &config, &db, &off, &handle, &code, &meal, date, serving, log, json,
        ),
        Commands::Search { query, json } => cmd_search(&off, &query, json),
        Commands::Summary { date, json } => cmd_summary(&config, &db, date, json),
        Commands::Food { command } => match command {
            FoodCommands::Add {
                name,
                calories,
                protein,
                carbs,
                fat,
                serving,
                brand,
                meal,
                date,
                favorite,
                json,
            } => cmd_food_add(
                &config, &db, &handle, &name, calories, protein, carbs, fat, serving, brand,
                &meal, date, favorite, json,
            ),
            FoodCommands::List {
                search,
                favorites,
                meal,
                date,
                cloud,
                json,
            } => cmd_food_list(
                &config,
                &db,
                &handle,
                search.as_deref(),
                favorites,
                meal.as_deref(),
                date,
                cloud,
                json,
            ),
            FoodCommands::Today { json } => cmd_food_today(&config, &db, json),
            FoodCommands::Favorite { id, json } => {
                cmd_food_favorite(&config, &db, &handle, &id, json)
            }
            FoodCommands::Delete { id, cloud, json } => {
                cmd_food_delete(&config, &db, &handle, &id, cloud, json)
            }
        },
        Commands::Activity { command } => match command {
            ActivityCommands::Log {
                name,
                activity,
                minutes,
                calories,
                date,
                distance,
                steps,
                json,
            } => cmd_activity_log(
                &config, &db, &handle, &name, &activity, minutes, calories, date, distance,
                steps, json,
            ),
            ActivityCommands::List {
                activity,
                date,
                json,
            } => cmd_activity_list(&config, &db, activity.as_deref(), date, json),
            ActivityCommands::Delete { id, cloud, json } => {
                cmd_activity_delete(&config, &db, &handle, &id, cloud, json)
            }
        },
        Commands::Goals { command } => match command {
            GoalsCommands::Set {
                calories,
                steps,
                water,
                workouts,
                protein,
                carbs,
                fat,
                current_weight,
                target_weight,
                goal,
                json,
            } => cmd_goals_set(
                &config,
                &db,
                &handle,
                calories,
                steps,
                water,
                workouts,
                protein,
                carbs,
                fat,
                current_weight,
                target_weight,
                goal,
                json,
            ),
            GoalsCommands::Show { json } => cmd_goals_show(&config, &db, json),
        },
        Commands::Profile { command } => match command {
            ProfileCommands::Set {
                name,
                email,
                age,
                gender,
                height,
                activity_level,
                json,
            } => cmd_profile_set(
                &config,
                &db,
                &handle,
                name,
                email,
                age,
                gender,
                height,
                activity_level,
                json,
            ),
            ProfileCommands::Show { json } => cmd_profile_show(&config, &db, json),
        },
        Commands::Auth { command } => match command {
            AuthCommands::Login {
                user_id,
                email,
                json,
            } => cmd_auth_login(&config, &user_id, email, json),
            AuthCommands::Guest { json } => cmd_auth_guest(&config, json),
            AuthCommands::Logout { json } => cmd_auth_logout(&config, json),
            AuthCommands::Status { json } => cmd_auth_status(&config, json),
        },
        Commands::Remote { command } => match command {
            RemoteCommands::Set { url, token, json } => {
                cmd_remote_set(&config, &url, token, json)
            }
            RemoteCommands::Show { json } => cmd_remote_show(&config, json),
        },
        Commands::Sync { command } => match command {
            SyncCommands::Now { json } => cmd_sync_now(&config, &db, &handle, json),
            SyncCommands::Push { json } => cmd_sync_push(&config, &db, &handle, json),
            SyncCommands::Pull { json } => cmd_sync_pull(&config, &db, &handle, json),
            SyncCommands::Status { json } => cmd_sync_status(&config, json),
            SyncCommands::Daemon { interval } => {
                rt.block_on(cmd_sync_daemon(config.clone(), interval))
            }
        },
        Commands::Serve {
            port,
            bind,
            no_auth,
        } => {
            let api_key = if no_auth {
                None
            } else {
                let (key, _new) = config.load_or_create_api_key()?;
                Some(key)
            };
            // The served store is its own database: this instance IS the
            // cloud side, distinct from the device cache.
            let server_db = Database::open(&config.data_dir.join("server.db"))?;
            rt.block_on(server::start_server(server_db, port, &bind, api_key))
        }
    }
}
