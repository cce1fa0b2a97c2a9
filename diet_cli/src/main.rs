use chrono::{Local, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use diet_core::*;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "dietctl")]
#[command(about = "Personal diet and weight tracking", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage user profiles
    User {
        #[command(subcommand)]
        command: UserCommands,
    },

    /// Manage the food catalog
    Food {
        #[command(subcommand)]
        command: FoodCommands,
    },

    /// Log and review meals
    Meal {
        #[command(subcommand)]
        command: MealCommands,
    },

    /// Log and review body weight
    Weight {
        #[command(subcommand)]
        command: WeightCommands,
    },

    /// Show the daily dashboard
    Summary {
        /// Date to summarize (defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Print the weight trend series
    Chart {
        /// Aggregation mode: daily or monthly
        #[arg(long, default_value = "daily")]
        mode: String,
    },

    /// Export all data to a backup file
    Export {
        /// Directory to write the backup into
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Restore from a backup file, overwriting all existing data
    Import {
        file: PathBuf,

        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },

    /// Delete all data
    Reset {
        /// Skip the confirmation prompts
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum UserCommands {
    /// Create a user profile and make it active
    Add {
        name: String,

        /// Height in centimeters
        #[arg(long)]
        height: f64,

        /// Target weight in kilograms
        #[arg(long)]
        target_weight: f64,

        /// Target daily calories
        #[arg(long)]
        target_calories: Option<i64>,

        /// Gender tag (male, female, other)
        #[arg(long)]
        gender: Option<String>,
    },

    /// List all user profiles
    List,

    /// Switch the active user
    Switch {
        /// User name or id
        user: String,
    },

    /// Update the active user's profile
    Set {
        #[arg(long)]
        name: Option<String>,

        /// Height in centimeters
        #[arg(long)]
        height: Option<f64>,

        /// Target weight in kilograms
        #[arg(long)]
        target_weight: Option<f64>,

        /// Target daily calories
        #[arg(long)]
        target_calories: Option<i64>,

        /// Gender tag (male, female, other)
        #[arg(long)]
        gender: Option<String>,
    },
}

#[derive(Subcommand)]
enum FoodCommands {
    /// Add a food to the catalog
    Add {
        name: String,

        /// Calories per unit
        #[arg(long)]
        calories: f64,

        /// Quantity label the calorie value applies to (e.g. "100g")
        #[arg(long)]
        unit: String,
    },

    /// Edit a food
    Edit {
        /// Food name or id
        food: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        calories: Option<f64>,

        #[arg(long)]
        unit: Option<String>,
    },

    /// Delete a food (existing meal logs keep their entry)
    Delete {
        /// Food name or id
        food: String,

        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },

    /// List the active user's foods
    List,
}

#[derive(Subcommand)]
enum MealCommands {
    /// Log an eating event
    Add {
        /// Meal slot (breakfast, lunch, dinner, snack)
        meal_type: String,

        /// Food name or id
        food: String,

        /// Multiplier applied to the food's calorie value
        #[arg(long, default_value_t = 1.0)]
        quantity: f64,

        /// Date of the meal (defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Show one day's meals
    List {
        /// Date to show (defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Delete a meal log entry
    Delete {
        id: Uuid,

        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum WeightCommands {
    /// Record a weight measurement (one per day, updated in place)
    Log {
        /// Weight in kilograms
        weight: f64,

        /// Date of the measurement (defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// List weight history, newest first
    List,

    /// Delete a weight log entry
    Delete {
        id: Uuid,

        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

fn main() -> Result<()> {
    diet_core::logging::init();

    let cli = Cli::parse();

    let config = Config::load()?;
    let data_dir = cli.data_dir.unwrap_or_else(|| config.data.data_dir.clone());

    match cli.command {
        Commands::User { command } => match command {
            UserCommands::Add {
                name,
                height,
                target_weight,
                target_calories,
                gender,
            } => cmd_user_add(
                &data_dir,
                &config,
                name,
                height,
                target_weight,
                target_calories,
                gender,
            ),
            UserCommands::List => cmd_user_list(&data_dir),
            UserCommands::Switch { user } => cmd_user_switch(&data_dir, &user),
            UserCommands::Set {
                name,
                height,
                target_weight,
                target_calories,
                gender,
            } => cmd_user_set(&data_dir, name, height, target_weight, target_calories, gender),
        },
        Commands::Food { command } => match command {
            FoodCommands::Add {
                name,
                calories,
                unit,
            } => cmd_food_add(&data_dir, name, calories, unit),
            FoodCommands::Edit {
                food,
                name,
                calories,
                unit,
            } => cmd_food_edit(&data_dir, &food, name, calories, unit),
            FoodCommands::Delete { food, yes } => cmd_food_delete(&data_dir, &food, yes),
            FoodCommands::List => cmd_food_list(&data_dir),
        },
        Commands::Meal { command } => match command {
            MealCommands::Add {
                meal_type,
                food,
                quantity,
                date,
            } => cmd_meal_add(&data_dir, &meal_type, &food, quantity, date),
            MealCommands::List { date } => cmd_meal_list(&data_dir, date),
            MealCommands::Delete { id, yes } => cmd_meal_delete(&data_dir, id, yes),
        },
        Commands::Weight { command } => match command {
            WeightCommands::Log { weight, date } => cmd_weight_log(&data_dir, weight, date),
            WeightCommands::List => cmd_weight_list(&data_dir),
            WeightCommands::Delete { id, yes } => cmd_weight_delete(&data_dir, id, yes),
        },
        Commands::Summary { date } => cmd_summary(&data_dir, date),
        Commands::Chart { mode } => cmd_chart(&data_dir, &mode),
        Commands::Export { out } => cmd_export(&data_dir, out),
        Commands::Import { file, yes } => cmd_import(&data_dir, &file, yes),
        Commands::Reset { yes } => cmd_reset(&data_dir, yes),
    }
}

fn open_store(data_dir: &Path) -> Result<DietStore> {
    std::fs::create_dir_all(data_dir)?;
    DietStore::open(Config::database_path(data_dir))
}

/// Resolve the active user from session state, erroring with a hint when
/// there is none
fn active_user(store: &DietStore, data_dir: &Path) -> Result<User> {
    let session = SessionState::load(&Config::session_path(data_dir))?;
    let id = session.active_user_id.ok_or_else(|| {
        Error::Other("no active user - create one with `dietctl user add`".into())
    })?;
    store.find_user(id).cloned().ok_or_else(|| {
        Error::Other("active user no longer exists - pick one with `dietctl user switch`".into())
    })
}

fn set_active_user(data_dir: &Path, id: Uuid) -> Result<()> {
    SessionState::update(&Config::session_path(data_dir), |state| {
        state.active_user_id = Some(id);
        Ok(())
    })?;
    Ok(())
}

/// Resolve a food by id or (case-insensitive) name within the user's catalog
fn resolve_food(store: &DietStore, user_id: Uuid, needle: &str) -> Result<Food> {
    if let Ok(id) = Uuid::parse_str(needle) {
        if let Some(food) = store.find_food(id) {
            if food.user_id == user_id {
                return Ok(food.clone());
            }
        }
    }

    let matches: Vec<&Food> = store
        .foods_for(user_id)
        .iter()
        .filter(|f| f.name.eq_ignore_ascii_case(needle))
        .collect();
    match matches.len() {
        0 => Err(Error::Other(format!("no food named '{}'", needle))),
        1 => Ok(matches[0].clone()),
        _ => Err(Error::Other(format!(
            "multiple foods named '{}' - use the id instead",
            needle
        ))),
    }
}

/// Resolve a user by id or (case-insensitive) name
fn resolve_user(store: &DietStore, needle: &str) -> Result<User> {
    if let Ok(id) = Uuid::parse_str(needle) {
        if let Some(user) = store.find_user(id) {
            return Ok(user.clone());
        }
    }

    let matches: Vec<&User> = store
        .list_users()
        .iter()
        .filter(|u| u.name.eq_ignore_ascii_case(needle))
        .collect();
    match matches.len() {
        0 => Err(Error::Other(format!("no user named '{}'", needle))),
        1 => Ok(matches[0].clone()),
        _ => Err(Error::Other(format!(
            "multiple users named '{}' - use the id instead",
            needle
        ))),
    }
}

/// Ask for confirmation on stdin; `--yes` skips the prompt
fn confirm(prompt: &str, yes: bool) -> Result<bool> {
    if yes {
        return Ok(true);
    }
    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(matches!(input.trim().to_lowercase().as_str(), "y" | "yes"))
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

// ============================================================================
// User commands
// ============================================================================

fn cmd_user_add(
    data_dir: &Path,
    config: &Config,
    name: String,
    height: f64,
    target_weight: f64,
    target_calories: Option<i64>,
    gender: Option<String>,
) -> Result<()> {
    let mut store = open_store(data_dir)?;

    let gender = match gender {
        Some(g) => g.parse()?,
        None => Gender::default(),
    };
    let target_calories =
        target_calories.unwrap_or(config.profile.default_target_calories);

    let user = User::new(name, height, target_weight, target_calories, gender);
    let id = user.id;
    let name = user.name.clone();
    store.add_user(user)?;
    set_active_user(data_dir, id)?;

    println!("✓ Created user {} ({})", name, id);
    println!("  Now active.");
    Ok(())
}

fn cmd_user_list(data_dir: &Path) -> Result<()> {
    let store = open_store(data_dir)?;
    let session = SessionState::load(&Config::session_path(data_dir))?;

    if store.list_users().is_empty() {
        println!("No users. Create one with `dietctl user add`.");
        return Ok(());
    }

    for user in store.list_users() {
        let marker = if session.active_user_id == Some(user.id) {
            "*"
        } else {
            " "
        };
        println!(
            "{} {}  {}  height {:.1} cm, target {:.1} kg, {} kcal/day",
            marker, user.id, user.name, user.height_cm, user.target_weight_kg, user.target_calories
        );
    }
    Ok(())
}

fn cmd_user_switch(data_dir: &Path, needle: &str) -> Result<()> {
    let store = open_store(data_dir)?;
    let user = resolve_user(&store, needle)?;
    set_active_user(data_dir, user.id)?;
    println!("✓ Active user: {}", user.name);
    Ok(())
}

fn cmd_user_set(
    data_dir: &Path,
    name: Option<String>,
    height: Option<f64>,
    target_weight: Option<f64>,
    target_calories: Option<i64>,
    gender: Option<String>,
) -> Result<()> {
    let mut store = open_store(data_dir)?;
    let user = active_user(&store, data_dir)?;

    let gender = match gender {
        Some(g) => Some(g.parse()?),
        None => None,
    };
    let patch = UserPatch {
        name,
        height_cm: height,
        target_weight_kg: target_weight,
        target_calories,
        gender,
    };
    let updated = store.update_user(user.id, patch)?;

    println!(
        "✓ Updated {}: height {:.1} cm, target {:.1} kg, {} kcal/day",
        updated.name, updated.height_cm, updated.target_weight_kg, updated.target_calories
    );
    Ok(())
}

// ============================================================================
// Food commands
// ============================================================================

fn cmd_food_add(data_dir: &Path, name: String, calories: f64, unit: String) -> Result<()> {
    let mut store = open_store(data_dir)?;
    let user = active_user(&store, data_dir)?;

    let food = Food::new(user.id, name, calories, unit);
    let label = format!("{} ({:.0} kcal / {})", food.name, food.calories, food.unit);
    store.add_food(food)?;

    println!("✓ Added {}", label);
    Ok(())
}

fn cmd_food_edit(
    data_dir: &Path,
    needle: &str,
    name: Option<String>,
    calories: Option<f64>,
    unit: Option<String>,
) -> Result<()> {
    let mut store = open_store(data_dir)?;
    let user = active_user(&store, data_dir)?;
    let food = resolve_food(&store, user.id, needle)?;

    let patch = FoodPatch {
        name,
        calories,
        unit,
    };
    let updated = store.update_food(food.id, patch)?;

    println!(
        "✓ Updated {} ({:.0} kcal / {})",
        updated.name, updated.calories, updated.unit
    );
    Ok(())
}

fn cmd_food_delete(data_dir: &Path, needle: &str, yes: bool) -> Result<()> {
    let mut store = open_store(data_dir)?;
    let user = active_user(&store, data_dir)?;
    let food = resolve_food(&store, user.id, needle)?;

    if !confirm(&format!("Delete food '{}'?", food.name), yes)? {
        println!("Aborted.");
        return Ok(());
    }

    store.delete_food(food.id)?;
    println!("✓ Deleted {}", food.name);
    Ok(())
}

fn cmd_food_list(data_dir: &Path) -> Result<()> {
    let store = open_store(data_dir)?;
    let user = active_user(&store, data_dir)?;

    let foods = store.foods_for(user.id);
    if foods.is_empty() {
        println!("No foods. Add one with `dietctl food add`.");
        return Ok(());
    }

    for food in foods {
        println!(
            "{}  {}  {:.0} kcal / {}",
            food.id, food.name, food.calories, food.unit
        );
    }
    Ok(())
}

// ============================================================================
// Meal commands
// ============================================================================

fn cmd_meal_add(
    data_dir: &Path,
    meal_type: &str,
    food_needle: &str,
    quantity: f64,
    date: Option<NaiveDate>,
) -> Result<()> {
    let mut store = open_store(data_dir)?;
    let user = active_user(&store, data_dir)?;
    let meal_type: MealType = meal_type.parse()?;
    let food = resolve_food(&store, user.id, food_needle)?;
    let date = date.unwrap_or_else(today);

    let log = MealLog::new(user.id, date, meal_type, food.id, quantity);
    store.add_meal_log(log)?;

    println!(
        "✓ Logged {} x{} for {} on {} ({:.0} kcal)",
        food.name,
        quantity,
        meal_type,
        date,
        food.calories * quantity
    );
    Ok(())
}

fn cmd_meal_list(data_dir: &Path, date: Option<NaiveDate>) -> Result<()> {
    let store = open_store(data_dir)?;
    let user = active_user(&store, data_dir)?;
    let date = date.unwrap_or_else(today);

    let logs = store.meal_logs_on(user.id, date);
    let foods = store.foods_for(user.id);

    println!("Meals on {}", date);
    for meal_type in MealType::ALL {
        let entries: Vec<&MealLog> = logs.iter().filter(|l| l.meal_type == meal_type).collect();
        println!("\n  {}:", meal_type);
        if entries.is_empty() {
            println!("    (nothing logged)");
            continue;
        }
        for log in entries {
            match foods.iter().find(|f| f.id == log.food_id) {
                Some(food) => println!(
                    "    {}  {} x{}  {:.0} kcal",
                    log.id,
                    food.name,
                    log.quantity,
                    food.calories * log.quantity
                ),
                // The food was deleted; the entry stays but counts nothing
                None => println!("    {}  (deleted food) x{}", log.id, log.quantity),
            }
        }
    }

    let total = metrics::daily_calorie_total(logs, foods);
    println!("\n  Total: {:.0} kcal", total);
    Ok(())
}

fn cmd_meal_delete(data_dir: &Path, id: Uuid, yes: bool) -> Result<()> {
    let mut store = open_store(data_dir)?;

    if !confirm("Delete this meal log entry?", yes)? {
        println!("Aborted.");
        return Ok(());
    }

    store.delete_meal_log(id)?;
    println!("✓ Deleted.");
    Ok(())
}

// ============================================================================
// Weight commands
// ============================================================================

fn cmd_weight_log(data_dir: &Path, weight: f64, date: Option<NaiveDate>) -> Result<()> {
    let mut store = open_store(data_dir)?;
    let user = active_user(&store, data_dir)?;
    let date = date.unwrap_or_else(today);

    let log = store.log_weight(user.id, date, weight)?;
    println!("✓ Recorded {:.1} kg on {}", log.weight_kg, log.date);
    Ok(())
}

fn cmd_weight_list(data_dir: &Path) -> Result<()> {
    let store = open_store(data_dir)?;
    let user = active_user(&store, data_dir)?;

    let logs = store.weight_logs_for(user.id);
    if logs.is_empty() {
        println!("No weight logs. Record one with `dietctl weight log`.");
        return Ok(());
    }

    // Newest first, matching the history view
    for log in logs.iter().rev() {
        println!("{}  {:.1} kg  ({})", log.date, log.weight_kg, log.id);
    }
    Ok(())
}

fn cmd_weight_delete(data_dir: &Path, id: Uuid, yes: bool) -> Result<()> {
    let mut store = open_store(data_dir)?;

    if !confirm("Delete this weight log entry?", yes)? {
        println!("Aborted.");
        return Ok(());
    }

    store.delete_weight_log(id)?;
    println!("✓ Deleted.");
    Ok(())
}

// ============================================================================
// Dashboard, chart, backup
// ============================================================================

fn cmd_summary(data_dir: &Path, date: Option<NaiveDate>) -> Result<()> {
    let store = open_store(data_dir)?;
    let user = active_user(&store, data_dir)?;
    let date = date.unwrap_or_else(today);

    let weight_logs = store.weight_logs_for(user.id);
    let current = weight_logs.last().map(|l| l.weight_kg);
    let delta = metrics::weight_delta(weight_logs);
    let meal_logs = store.meal_logs_on(user.id, date);
    let calories = metrics::daily_calorie_total(meal_logs, store.foods_for(user.id));

    println!("╭─────────────────────────────────────────╮");
    println!("│  DAILY SUMMARY  {}", date);
    println!("╰─────────────────────────────────────────╯");
    println!();
    println!("  User:            {}", user.name);

    match current {
        Some(weight) => {
            match delta {
                Some(d) => println!(
                    "  Current weight:  {:.1} kg ({:+.1} kg vs previous)",
                    weight, d
                ),
                None => println!("  Current weight:  {:.1} kg", weight),
            }
            println!(
                "  To target:       {:.1} kg (target {:.1} kg)",
                metrics::target_remaining(weight, user.target_weight_kg),
                user.target_weight_kg
            );
            match metrics::bmi(weight, user.height_cm) {
                Some(bmi) => println!("  BMI:             {:.1}", bmi),
                None => println!("  BMI:             --"),
            }
        }
        None => {
            println!("  Current weight:  --");
            println!("  To target:       -- (target {:.1} kg)", user.target_weight_kg);
            println!("  BMI:             --");
        }
    }

    println!(
        "  Calories:        {:.0} kcal / {} kcal",
        calories, user.target_calories
    );
    Ok(())
}

fn cmd_chart(data_dir: &Path, mode: &str) -> Result<()> {
    let mode = match mode.to_lowercase().as_str() {
        "daily" => ChartMode::Daily,
        "monthly" => ChartMode::Monthly,
        other => {
            return Err(Error::Other(format!(
                "unknown chart mode: {} (expected daily or monthly)",
                other
            )))
        }
    };

    let store = open_store(data_dir)?;
    let user = active_user(&store, data_dir)?;

    let series = metrics::weight_series(store.weight_logs_for(user.id), mode, today());
    if series.is_empty() {
        println!("No weight data to chart.");
        return Ok(());
    }

    for point in &series {
        println!("  {}  {:.1} kg", point.label, point.weight);
    }
    if let AxisBounds::Fixed { min, max } = metrics::axis_bounds(&series) {
        println!("\n  Axis: {:.1} kg to {:.1} kg", min, max);
    }
    Ok(())
}

fn cmd_export(data_dir: &Path, out: Option<PathBuf>) -> Result<()> {
    let store = open_store(data_dir)?;
    let out_dir = out.unwrap_or_else(|| data_dir.join("backups"));

    let path = backup::write_backup(&store, &out_dir, Utc::now())?;
    println!("✓ Exported backup to {}", path.display());
    Ok(())
}

fn cmd_import(data_dir: &Path, file: &Path, yes: bool) -> Result<()> {
    if !confirm(
        "Importing overwrites ALL existing data. Continue?",
        yes,
    )? {
        println!("Aborted.");
        return Ok(());
    }

    let mut store = open_store(data_dir)?;
    let raw = std::fs::read_to_string(file)?;
    let doc = backup::import(&mut store, &raw)?;

    // The previously active user may not exist in the imported data
    SessionState::update(&Config::session_path(data_dir), |state| {
        let still_exists = state
            .active_user_id
            .map(|id| store.find_user(id).is_some())
            .unwrap_or(false);
        if !still_exists {
            state.active_user_id = store.list_users().first().map(|u| u.id);
        }
        Ok(())
    })?;

    println!(
        "✓ Restored {} users, {} foods, {} meal logs, {} weight logs",
        doc.users.len(),
        doc.foods.len(),
        doc.meal_logs.len(),
        doc.weight_logs.len()
    );
    Ok(())
}

fn cmd_reset(data_dir: &Path, yes: bool) -> Result<()> {
    if !confirm("Delete ALL data? This cannot be undone.", yes)? {
        println!("Aborted.");
        return Ok(());
    }
    if !confirm("Final confirmation: really delete everything?", yes)? {
        println!("Aborted.");
        return Ok(());
    }

    let mut store = open_store(data_dir)?;
    store.clear_all()?;
    SessionState::clear(&Config::session_path(data_dir))?;

    println!("✓ All data deleted.");
    Ok(())
}
