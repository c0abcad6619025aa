use anyhow::{Context, Result};
use citycast_core::{Config, PreferencesPatch, SearchStore};
use clap::{Parser, Subcommand, ValueEnum};
use std::time::Duration;

use crate::{
    app::{App, tolerate_storage},
    render,
};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "citycast", version, about = "City weather lookup with history and favorites")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ForecastView {
    /// Next 24 hours in 3-hour steps.
    #[default]
    Hourly,
    /// One line per day.
    Daily,
    /// Current conditions only.
    Current,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Set the OpenWeather API key and description language.
    Configure,

    /// Search a city: remember it and show its weather.
    Search {
        city: String,

        #[arg(long, value_enum, default_value_t)]
        forecast: ForecastView,
    },

    /// Show weather without recording a search. Defaults to the current city.
    Show {
        city: Option<String>,

        #[arg(long, value_enum, default_value_t)]
        forecast: ForecastView,
    },

    /// Keep refreshing the weather on the preferred refresh interval.
    Watch {
        city: Option<String>,

        /// Stop after this many refreshes.
        #[arg(long)]
        count: Option<u32>,
    },

    /// Inspect or edit the search history.
    History {
        #[command(subcommand)]
        action: Option<HistoryAction>,
    },

    /// Inspect or edit favorite cities.
    Favorites {
        #[command(subcommand)]
        action: Option<FavoritesAction>,
    },

    /// Inspect or edit preferences.
    Prefs {
        #[command(subcommand)]
        action: Option<PrefsAction>,
    },
}

#[derive(Debug, Subcommand)]
pub enum HistoryAction {
    List,
    Remove { city: String },
    Clear,
}

#[derive(Debug, Subcommand)]
pub enum FavoritesAction {
    List,
    /// Add the city, or remove it if it already is a favorite.
    Toggle { city: String },
    Remove { city: String },
    /// Current conditions for every favorite.
    Overview,
}

#[derive(Debug, Subcommand)]
pub enum PrefsAction {
    Show,
    Set {
        /// Also selects the city.
        #[arg(long)]
        default_city: Option<String>,

        #[arg(long)]
        metric: Option<bool>,

        #[arg(long)]
        notifications: Option<bool>,

        /// Minutes between refreshes.
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        refresh_interval: Option<u32>,
    },
}

const HOURLY_STEPS: usize = 8;
const LANGUAGES: [&str; 6] = ["pl", "en", "de", "fr", "es", "it"];

impl Cli {
    pub async fn run(self) -> Result<()> {
        let config = Config::load()?;
        if let Command::Configure = self.command {
            return configure(config);
        }

        let app = App::open(&config).await?;
        app.dispatch(self.command).await
    }
}

impl App {
    async fn dispatch(&self, command: Command) -> Result<()> {
        let store = &self.store;

        match command {
            // Needs no store; handled before opening it.
            Command::Configure => {}
            Command::Search { city, forecast } => {
                tolerate_storage(store.save_search(&city).await)?;
                print_weather(store, &store.city(), forecast).await?;
            }
            Command::Show { city, forecast } => {
                let city = city.unwrap_or_else(|| store.city());
                print_weather(store, &city, forecast).await?;
            }
            Command::Watch { city, count } => {
                let city = city.unwrap_or_else(|| store.city());
                watch(store, &city, count).await?;
            }
            Command::History { action } => match action.unwrap_or(HistoryAction::List) {
                HistoryAction::List => {
                    print!("{}", render::history(&store.search_history(), &store.city()));
                }
                HistoryAction::Remove { city } => {
                    tolerate_storage(store.remove_from_history(&city).await)?;
                    print!("{}", render::history(&store.search_history(), &store.city()));
                }
                HistoryAction::Clear => {
                    tolerate_storage(store.clear_history().await)?;
                    println!("Search history cleared.");
                }
            },
            Command::Favorites { action } => match action.unwrap_or(FavoritesAction::List) {
                FavoritesAction::List => print!("{}", render::favorites(&store.favorites())),
                FavoritesAction::Toggle { city } => {
                    tolerate_storage(store.toggle_favorite(&city).await)?;
                    let city = city.trim();
                    if store.is_favorite(city) {
                        println!("Added {city} to favorites.");
                    } else {
                        println!("Removed {city} from favorites.");
                    }
                }
                FavoritesAction::Remove { city } => {
                    tolerate_storage(store.remove_favorite(&city).await)?;
                    print!("{}", render::favorites(&store.favorites()));
                }
                FavoritesAction::Overview => {
                    let metric = store.preferences().use_metric_system;
                    print!("{}", render::overview(&store.favorites_overview().await, metric));
                }
            },
            Command::Prefs { action } => match action.unwrap_or(PrefsAction::Show) {
                PrefsAction::Show => print!("{}", render::preferences(&store.preferences())),
                PrefsAction::Set {
                    default_city,
                    metric,
                    notifications,
                    refresh_interval,
                } => {
                    if let Some(city) = default_city {
                        tolerate_storage(store.set_default_city(&city).await)?;
                    }
                    let patch = PreferencesPatch {
                        default_city: None,
                        use_metric_system: metric,
                        show_notifications: notifications,
                        refresh_interval,
                    };
                    if !patch.is_empty() {
                        tolerate_storage(store.update_preferences(patch).await)?;
                    }
                    print!("{}", render::preferences(&store.preferences()));
                }
            },
        }

        Ok(())
    }
}

fn configure(mut config: Config) -> Result<()> {
    let api_key = inquire::Password::new("OpenWeather API key:")
        .without_confirmation()
        .with_help_message("Leave empty to keep the current key")
        .prompt()
        .context("Failed to read API key")?;
    if !api_key.trim().is_empty() {
        config.set_api_key(api_key);
    }

    let start = LANGUAGES
        .iter()
        .position(|l| *l == config.language)
        .unwrap_or(0);
    let language = inquire::Select::new("Description language:", LANGUAGES.to_vec())
        .with_starting_cursor(start)
        .prompt()
        .context("Failed to read language")?;
    config.language = language.to_string();

    config.save()?;
    println!("Configuration saved to {}", Config::config_file_path()?.display());
    Ok(())
}

async fn print_weather(store: &SearchStore, city: &str, view: ForecastView) -> Result<()> {
    let weather = store
        .weather_for(city)
        .await
        .with_context(|| format!("Could not get weather for {city}"))?;
    let metric = store.preferences().use_metric_system;

    print!("{}", render::current(&weather, metric));
    match view {
        ForecastView::Hourly => {
            println!("Next hours:");
            print!(
                "{}",
                render::hourly(
                    weather.forecast.hourly(HOURLY_STEPS),
                    weather.forecast.timezone_offset_secs,
                    metric
                )
            );
        }
        ForecastView::Daily => {
            println!("Coming days:");
            print!("{}", render::daily(&weather.forecast.daily(), metric));
        }
        ForecastView::Current => {}
    }
    Ok(())
}

async fn watch(store: &SearchStore, city: &str, count: Option<u32>) -> Result<()> {
    let mut done = 0u32;
    loop {
        // Served from the cache while the last fetch is still fresh.
        print_weather(store, city, ForecastView::Current).await?;
        done += 1;
        if count.is_some_and(|limit| done >= limit) {
            return Ok(());
        }

        let minutes = u64::from(store.preferences().refresh_interval.max(1));
        tracing::info!(city, minutes, "waiting for next refresh");
        tokio::time::sleep(Duration::from_secs(minutes * 60)).await;
    }
}
