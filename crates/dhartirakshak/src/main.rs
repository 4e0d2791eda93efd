use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use dhartirakshak::client::DhartiClient;
use dhartirakshak::config::Config;
use dhartirakshak::controller::{ListController, ToggleController};
use dhartirakshak::notify::{Level, Notification, Notifier};
use dhartirakshak::resource::drafts::{EpaperDraft, NewsDraft, ResearchSubmission, TrendingDraft};
use dhartirakshak::resource::settings::SettingKey;
use dhartirakshak::resource::{
    CATEGORIES, EPAPERS, NEWS, RESEARCH, Resource, ResourceSpec, TRENDING_NEWS,
};
use dhartirakshak::session::{AuthOutcome, AuthSession, Realm};
use dhartirakshak::weather::{SEARCH_LIMIT, SavedLocation, WeatherClient};
use dhartirakshak_common::normalize::RecordExt;
use dhartirakshak_common::session::FileSessionStore;
use dhartirakshak_common::{FilePart, ItemId, Record};
use miette::{IntoDiagnostic, miette};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "DhartiRakshak publishing API client")]
struct Cli {
    /// KDL config file (default: <config dir>/dhartirakshak/config.kdl)
    #[arg(long, global = true, env = "DHARTI_CONFIG")]
    config: Option<PathBuf>,

    /// API base URL, overriding the config file
    #[arg(long, global = true, env = "DHARTI_BASE_URL")]
    base_url: Option<url::Url>,

    /// Session file, overriding the config file
    #[arg(long, global = true)]
    session_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Admin sign in and out
    #[command(subcommand)]
    Admin(AuthCommand),
    /// Public account sign in, out and profile
    #[command(subcommand)]
    User(UserCommand),
    /// Trending news (admin)
    #[command(subcommand)]
    Trending(TrendingCommand),
    /// Agriculture news (admin)
    #[command(subcommand)]
    News(NewsCommand),
    /// E-paper uploads (admin)
    #[command(subcommand)]
    Epaper(EpaperCommand),
    /// Categories (admin)
    #[command(subcommand)]
    Category(CategoryCommand),
    /// Research moderation (admin) and submission
    #[command(subcommand)]
    Research(ResearchCommand),
    /// Business settings (admin)
    #[command(subcommand)]
    Settings(SettingsCommand),
    /// Public read endpoints
    #[command(subcommand)]
    Public(PublicCommand),
    /// Weather lookups
    #[command(subcommand)]
    Weather(WeatherCommand),
}

#[derive(Subcommand, Debug)]
enum AuthCommand {
    /// Sign in and store the token
    Login {
        email: String,
        #[arg(short, long, env = "DHARTI_PASSWORD")]
        password: String,
    },
    /// Sign out and forget the token
    Logout,
}

#[derive(Subcommand, Debug)]
enum UserCommand {
    /// Sign in and store the token
    Login {
        email: String,
        #[arg(short, long, env = "DHARTI_PASSWORD")]
        password: String,
    },
    /// Forget the stored token
    Logout,
    /// Refresh and print the profile
    Profile,
}

#[derive(Args, Debug)]
struct IdArg {
    /// Record id
    id: ItemId,
}

#[derive(Subcommand, Debug)]
enum TrendingCommand {
    /// List items
    List,
    /// Flip the trending flag
    Toggle(IdArg),
    /// Create an item
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        image: PathBuf,
    },
    /// Make an item visible
    Activate(IdArg),
    /// Hide an item
    Deactivate(IdArg),
    /// Delete an item
    Delete(IdArg),
}

#[derive(Subcommand, Debug)]
enum NewsCommand {
    /// List items
    List,
    /// Create an item
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        image: PathBuf,
        /// Also mark as trending
        #[arg(long)]
        trending: bool,
    },
    /// Make an item visible
    Activate(IdArg),
    /// Hide an item
    Deactivate(IdArg),
    /// Delete an item
    Delete(IdArg),
}

#[derive(Subcommand, Debug)]
enum EpaperCommand {
    /// Upload an issue
    Upload {
        #[arg(long)]
        pdf: PathBuf,
        /// Issue date, YYYY-MM-DD
        #[arg(long)]
        date: NaiveDate,
    },
    /// Delete an issue
    Delete(IdArg),
}

#[derive(Subcommand, Debug)]
enum CategoryCommand {
    /// List categories
    List,
    /// Add a category
    Add { name: String },
}

#[derive(Subcommand, Debug)]
enum ResearchCommand {
    /// Approved submissions
    Approved,
    /// Submissions awaiting moderation
    Pending,
    /// Approve a submission
    Approve(IdArg),
    /// Reject a submission
    Reject(IdArg),
    /// Submit research as the signed-in user
    Submit {
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long = "type", default_value = "")]
        kind: String,
        #[arg(long)]
        image: Option<PathBuf>,
        /// Extra pictures
        #[arg(long = "images", num_args = 1..)]
        images: Vec<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
enum SettingsCommand {
    /// Print the known settings
    Show,
    /// Store a raw JSON value under a key
    Set { key: String, value: String },
}

#[derive(Subcommand, Debug)]
enum PublicCommand {
    News,
    Trending,
    /// Trending headlines only
    Ticker,
    /// Home page carousel banners
    Banners,
    Ads,
    Categories,
    Epapers,
    Research,
}

#[derive(Subcommand, Debug)]
enum WeatherCommand {
    /// Conditions for a city
    City { name: String },
    /// Conditions at a point
    Coords {
        #[arg(allow_hyphen_values = true)]
        lat: f64,
        #[arg(allow_hyphen_values = true)]
        lon: f64,
    },
    /// Find cities and optionally save the first match
    Search {
        query: String,
        #[arg(long, default_value_t = SEARCH_LIMIT)]
        limit: u32,
        #[arg(long)]
        save: bool,
    },
    /// Conditions for the saved location
    Saved,
}

/// Prints notifications to stderr.
struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notification: Notification) {
        match notification.level {
            Level::Success => eprintln!("ok: {}", notification.message),
            Level::Error => eprintln!("error: {}", notification.message),
        }
    }
}

type Http = reqwest::Client;
type Session = AuthSession<FileSessionStore, Http>;
type Controller = ListController<Resource<Http>, Arc<Session>, ConsoleNotifier>;

struct App {
    config: Config,
    client: DhartiClient<Http>,
    store: Arc<FileSessionStore>,
}

impl App {
    fn new(cli: &Cli) -> miette::Result<Self> {
        let mut config = Config::load(cli.config.as_deref())?;
        if let Some(base) = &cli.base_url {
            config.api.base_url = base.clone();
        }
        if let Some(path) = &cli.session_file {
            config.session.path = path.clone();
        }
        let client = DhartiClient::new(config.http_client()?, config.api.base_url.clone());
        let store = Arc::new(FileSessionStore::new(&config.session.path));
        Ok(Self {
            config,
            client,
            store,
        })
    }

    async fn session(&self, realm: Realm) -> Arc<Session> {
        let session = Arc::new(AuthSession::new(realm, self.store.clone(), self.client.clone()));
        session.restore().await;
        session
    }

    async fn admin_list(&self, spec: &'static ResourceSpec) -> miette::Result<Arc<Controller>> {
        let session = self.session(Realm::Admin).await;
        if !session.is_authenticated().await {
            return Err(miette!(
                help = "run `dhartirakshak admin login <email>` first",
                "Not authenticated"
            ));
        }
        Ok(Arc::new(ListController::new(
            self.client.resource(spec),
            session,
            ConsoleNotifier,
        )))
    }

    async fn admin_token(&self) -> miette::Result<String> {
        self.session(Realm::Admin)
            .await
            .token()
            .await
            .map(|t| t.to_string())
            .ok_or_else(|| miette!("Not authenticated"))
    }

    async fn weather(&self) -> miette::Result<WeatherClient<Http>> {
        let key = match &self.config.weather.api_key {
            Some(key) => Some(key.clone()),
            None => self.client.settings().public_weather_key().await?,
        };
        Ok(WeatherClient::new(self.client.http().clone(), key)
            .with_country(self.config.weather.country.as_str()))
    }
}

fn print_records(items: &[Record]) {
    for item in items {
        let id = item.item_id().map(|i| i.to_string()).unwrap_or_else(|| "-".into());
        let label = match item.display_name() {
            "" => item.headline().unwrap_or(""),
            name => name,
        };
        let mut flags = Vec::new();
        for field in ["is_active", "is_trending"] {
            if item.contains_key(field) {
                flags.push(format!("{field}={}", item.flag(field)));
            }
        }
        println!("{id:>6}  {label}  {}", flags.join(" "));
    }
}

fn report(outcome: &AuthOutcome) -> miette::Result<()> {
    if outcome.success {
        println!("{}", outcome.message);
        Ok(())
    } else {
        Err(miette!("{}", outcome.message))
    }
}

async fn list_and_print(list: &Controller) -> miette::Result<()> {
    if let Err(err) = list.fetch().await {
        let message = list.error().unwrap_or_default();
        return Err(miette::Report::new(err).wrap_err(message));
    }
    print_records(&list.items());
    Ok(())
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .with_env_filter(EnvFilter::from_env("DHARTI_LOG"))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let app = App::new(&cli)?;

    match cli.command {
        Command::Admin(cmd) => {
            let session = app.session(Realm::Admin).await;
            match cmd {
                AuthCommand::Login { email, password } => {
                    report(&session.login(&email, &password).await?)?
                }
                AuthCommand::Logout => report(&session.logout().await?)?,
            }
        }
        Command::User(cmd) => {
            let session = app.session(Realm::User).await;
            match cmd {
                UserCommand::Login { email, password } => {
                    report(&session.login(&email, &password).await?)?
                }
                UserCommand::Logout => report(&session.logout().await?)?,
                UserCommand::Profile => {
                    let outcome = session.load_profile().await?;
                    report(&outcome)?;
                    if let Some(user) = outcome.user {
                        println!("{}", serde_json::to_string_pretty(&user).into_diagnostic()?);
                    }
                }
            }
        }
        Command::Trending(cmd) => {
            let list = app.admin_list(&TRENDING_NEWS).await?;
            match cmd {
                TrendingCommand::List => list_and_print(&list).await?,
                TrendingCommand::Toggle(IdArg { id }) => {
                    list.fetch().await?;
                    let toggles = ToggleController::new(list.clone()).refetch_on_success(false);
                    let now = toggles.toggle(&id).await?;
                    println!("{id}: is_trending={now}");
                }
                TrendingCommand::Create {
                    title,
                    description,
                    image,
                } => {
                    let image = FilePart::read(&image).await.into_diagnostic()?;
                    let draft = TrendingDraft::new()
                        .title(title)
                        .maybe_description(description)
                        .image(image)
                        .build();
                    list.create(draft).await?;
                }
                TrendingCommand::Activate(IdArg { id }) => {
                    list.activate(&id).await?;
                }
                TrendingCommand::Deactivate(IdArg { id }) => {
                    list.deactivate(&id).await?;
                }
                TrendingCommand::Delete(IdArg { id }) => {
                    list.delete(&id).await?;
                }
            }
        }
        Command::News(cmd) => {
            let list = app.admin_list(&NEWS).await?;
            match cmd {
                NewsCommand::List => list_and_print(&list).await?,
                NewsCommand::Create {
                    title,
                    description,
                    image,
                    trending,
                } => {
                    let image = FilePart::read(&image).await.into_diagnostic()?;
                    let draft = NewsDraft::new()
                        .title(title)
                        .maybe_description(description)
                        .image(image)
                        .is_trending(trending)
                        .build();
                    list.create(draft).await?;
                }
                NewsCommand::Activate(IdArg { id }) => {
                    list.activate(&id).await?;
                }
                NewsCommand::Deactivate(IdArg { id }) => {
                    list.deactivate(&id).await?;
                }
                NewsCommand::Delete(IdArg { id }) => {
                    list.delete(&id).await?;
                }
            }
        }
        Command::Epaper(cmd) => {
            let list = app.admin_list(&EPAPERS).await?;
            match cmd {
                EpaperCommand::Upload { pdf, date } => {
                    let pdf = FilePart::read(&pdf).await.into_diagnostic()?;
                    let draft = EpaperDraft::new().pdf(pdf).publish_date(date).build();
                    list.create(draft).await?;
                }
                EpaperCommand::Delete(IdArg { id }) => {
                    list.delete(&id).await?;
                }
            }
        }
        Command::Category(cmd) => {
            let list = app.admin_list(&CATEGORIES).await?;
            match cmd {
                CategoryCommand::List => list_and_print(&list).await?,
                CategoryCommand::Add { name } => {
                    list.create_named(&name).await?;
                }
            }
        }
        Command::Research(cmd) => match cmd {
            ResearchCommand::Approved => {
                let list = app.admin_list(&RESEARCH).await?;
                list_and_print(&list).await?
            }
            ResearchCommand::Pending => {
                let session = app.session(Realm::Admin).await;
                let pending = app.client.research().pending()?;
                let list = ListController::new(pending, session, ConsoleNotifier);
                list_and_print(&list).await?
            }
            ResearchCommand::Approve(IdArg { id }) => {
                app.admin_list(&RESEARCH).await?.approve(&id).await?;
            }
            ResearchCommand::Reject(IdArg { id }) => {
                app.admin_list(&RESEARCH).await?.reject(&id).await?;
            }
            ResearchCommand::Submit {
                title,
                description,
                kind,
                image,
                images,
            } => {
                let session = app.session(Realm::User).await;
                let image = match image {
                    Some(path) => Some(FilePart::read(&path).await.into_diagnostic()?),
                    None => None,
                };
                let mut extra = Vec::with_capacity(images.len());
                for path in &images {
                    extra.push(FilePart::read(path).await.into_diagnostic()?);
                }
                let submission = ResearchSubmission::new()
                    .title(title)
                    .description(description)
                    .kind(kind)
                    .maybe_image(image)
                    .images(extra)
                    .build();
                let token = session.token().await;
                app.client
                    .public()
                    .submit_research(token.as_deref(), submission)
                    .await?;
                println!("Research submitted");
            }
        },
        Command::Settings(cmd) => {
            let token = app.admin_token().await?;
            let settings = app.client.settings();
            match cmd {
                SettingsCommand::Show => {
                    let current = settings.load(&token).await?;
                    for key in SettingKey::ALL {
                        println!("{key}: {}", current.value_for(key));
                    }
                }
                SettingsCommand::Set { key, value } => {
                    let value: serde_json::Value = serde_json::from_str(&value)
                        .into_diagnostic()
                        .map_err(|e| e.wrap_err("value must be JSON"))?;
                    settings.save(&token, &key, value).await?;
                    match key.parse::<SettingKey>() {
                        Ok(known) => println!("{}", known.saved_message()),
                        Err(_) => println!("Saved {key}"),
                    }
                }
            }
        }
        Command::Public(cmd) => {
            let public = app.client.public();
            match cmd {
                PublicCommand::News => {
                    let items = public.news().await?;
                    print_records(&items)
                }
                PublicCommand::Trending => {
                    let items = public.trending().await?;
                    print_records(&items)
                }
                PublicCommand::Ticker => {
                    for line in public.ticker().await? {
                        println!("{line}");
                    }
                }
                PublicCommand::Banners => {
                    let items = public.banners().await?;
                    print_records(&items)
                }
                PublicCommand::Ads => {
                    let items = public.advertisements().await?;
                    print_records(&items)
                }
                PublicCommand::Categories => {
                    for name in public.category_names().await? {
                        println!("{name}");
                    }
                }
                PublicCommand::Epapers => {
                    let items = public.epapers().await?;
                    print_records(&items)
                }
                PublicCommand::Research => {
                    let items = public.research().await?;
                    print_records(&items)
                }
            }
        }
        Command::Weather(cmd) => {
            let weather = app.weather().await?;
            let now = match cmd {
                WeatherCommand::City { name } => weather.current_by_city(&name).await?,
                WeatherCommand::Coords { lat, lon } => weather.current_by_coords(lat, lon).await?,
                WeatherCommand::Search { query, limit, save } => {
                    let found = weather.search_cities(&query, limit).await?;
                    for place in &found {
                        let state = place.state.as_deref().unwrap_or("");
                        println!(
                            "{} {} {} ({:.4}, {:.4})",
                            place.name, state, place.country, place.lat, place.lon
                        );
                    }
                    if let (true, Some(first)) = (save, found.first()) {
                        SavedLocation::from_geo(first).save(&app.store).await?;
                        println!("Saved {}", first.name);
                    }
                    return Ok(());
                }
                WeatherCommand::Saved => {
                    let saved = SavedLocation::load(&app.store).await;
                    println!("{}", saved.city);
                    weather.current_for(&saved).await?
                }
            };
            println!(
                "{}: {:.1}°C (feels {:.1}°C), humidity {}%, wind {} m/s, {}",
                now.name,
                now.main.temp,
                now.main.feels_like,
                now.main.humidity,
                now.wind.speed,
                now.summary().unwrap_or("")
            );
        }
    }

    Ok(())
}
