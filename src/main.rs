use clap::{Args, Parser, Subcommand, ValueEnum};
use resort_content::api::{self, Api};
use resort_content::config::{self, AppConfig};
use resort_content::imaging::Quality;
use resort_content::materialize::Materializer;
use resort_content::registry::{self, Model};
use resort_content::resolver::{RequestContext, Resolver};
use resort_content::storage::MediaStorage;
use resort_content::store::{ActivityCategory, GalleryPosition, LodgeFilter, Season, Store};
use resort_content::{import, maintenance};
use std::path::PathBuf;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "resort-content")]
#[command(version)]
#[command(about = "Content backend for a resort marketing site")]
#[command(long_about = "\
Content backend for a resort marketing site

Content lives in a SQLite database; uploaded originals and their WebP
variants live under the media root:

  media/
  ├── gallery/pool.jpg                      # Original upload
  ├── lodges/types/cabins.jpg
  └── CACHE/images/                         # Derived variants
      ├── .variant-manifest.json
      ├── gallery/pool.jpg/large.webp
      └── lodges/types/cabins.jpg/webp.webp

Variants are rendered lazily the first time a payload asks for them.
'process-images' renders them ahead of time; 'prune-cache' removes the
ones no stored image maps to anymore.

Log verbosity follows RUST_LOG (default: info). Logs go to stderr,
payloads to stdout.

Run 'resort-content gen-config' to generate a documented resort.toml.")]
struct Cli {
    /// Config file
    #[arg(long, default_value = config::CONFIG_FILE, global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

/// Which models a batch command touches.
#[derive(Args, Clone)]
#[group(required = true, multiple = false)]
struct ModelSelection {
    /// One model, e.g. GalleryImage or lodge_type
    #[arg(long)]
    model: Option<Model>,
    /// Every image-holding model
    #[arg(long)]
    all: bool,
}

impl ModelSelection {
    fn models(&self) -> Vec<Model> {
        match self.model {
            Some(m) => vec![m],
            None => Model::ALL.to_vec(),
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Create the database and the singleton rows
    Init,
    /// Print a stock resort.toml with all options documented
    GenConfig,
    /// Attach a local file to a model's image or video field
    Upload {
        model: Model,
        id: i64,
        field: String,
        file: PathBuf,
    },
    /// Add the content of a JSON bundle
    Import { bundle: PathBuf },
    /// Render every missing or stale variant
    ProcessImages(ModelSelection),
    /// Delete and re-render variants
    RegenerateVariants {
        #[command(flatten)]
        models: ModelSelection,
        /// Only the variant with this name
        #[arg(long)]
        variant: Option<String>,
    },
    /// Delete cached variants no stored image maps to
    PruneCache,
    /// Make one of the given hero sections the active one
    ActivateHero {
        #[arg(required = true)]
        ids: Vec<i64>,
    },
    /// Deactivate the given hero sections
    DeactivateHero {
        #[arg(required = true)]
        ids: Vec<i64>,
    },
    /// Print a resource payload as JSON
    Show(ShowArgs),
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Resource {
    Root,
    Settings,
    Statistics,
    Gallery,
    Hero,
    LodgeTypes,
    LodgeType,
    Lodges,
    Lodge,
    Activities,
    Events,
    Event,
    News,
    NewsItem,
    Restaurant,
    RestaurantImages,
    MealTypes,
    Benefits,
}

#[derive(Args)]
struct ShowArgs {
    resource: Resource,
    /// Slug of the item, for detail resources
    #[arg(long)]
    slug: Option<String>,
    /// Make URLs absolute, e.g. https://resort.example
    #[arg(long)]
    base_url: Option<String>,
    /// Gallery position filter
    #[arg(long)]
    position: Option<GalleryPosition>,
    /// Activity category filter
    #[arg(long)]
    category: Option<ActivityCategory>,
    /// Activity season filter
    #[arg(long)]
    season: Option<Season>,
    /// Lodge filters
    #[arg(long)]
    lodge_type: Option<i64>,
    #[arg(long)]
    price_min: Option<f64>,
    #[arg(long)]
    price_max: Option<f64>,
    #[arg(long)]
    capacity_min: Option<i64>,
    #[arg(long)]
    capacity_max: Option<i64>,
    #[arg(long)]
    search: Option<String>,
}

impl ShowArgs {
    fn slug(&self) -> Result<&str, Box<dyn std::error::Error>> {
        self.slug
            .as_deref()
            .ok_or_else(|| format!("--slug is required for {:?}", self.resource).into())
    }

    fn lodge_filter(&self) -> LodgeFilter {
        LodgeFilter {
            lodge_type_id: self.lodge_type,
            price_from_min: self.price_min,
            price_from_max: self.price_max,
            capacity_min: self.capacity_min,
            capacity_max: self.capacity_max,
            search: self.search.clone(),
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing();
    registry::validate()?;

    if let Command::GenConfig = cli.command {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    let config = config::load_config(&cli.config)?;
    init_thread_pool(&config.processing);
    let mut store = Store::open(&config.database.path)?;
    let materializer = open_materializer(&config);

    match cli.command {
        Command::GenConfig => {}
        Command::Init => {
            let created = store.ensure_singletons()?;
            println!("Database ready: {} ({created} rows created)", config.database.path.display());
        }
        Command::Upload {
            model,
            id,
            field,
            file,
        } => {
            let rel = import::store_upload(materializer.storage(), model, &field, &file)?;
            if let Err(e) = store.set_file(model, id, &field, Some(&rel), &materializer) {
                if let Err(cleanup) = materializer.storage().delete(&rel) {
                    warn!(path = %rel, error = %cleanup, "could not remove orphaned upload");
                }
                return Err(e.into());
            }
            println!("{model}.{field} #{id} -> {}", materializer.storage().url(&rel));
        }
        Command::Import { bundle } => {
            let report = import::import_file(&mut store, materializer.storage(), &materializer, &bundle)?;
            println!("{report}");
        }
        Command::ProcessImages(selection) => {
            let report =
                maintenance::process_images(&store, &materializer, &selection.models(), None)?;
            println!("{report}");
        }
        Command::RegenerateVariants { models, variant } => {
            let report = maintenance::regenerate_variants(
                &store,
                &materializer,
                &models.models(),
                variant.as_deref(),
            )?;
            println!("{report}");
        }
        Command::PruneCache => {
            let report = maintenance::prune_cache(&store, &materializer)?;
            println!("Cache: {report}");
        }
        Command::ActivateHero { ids } => match store.activate_hero_sections(&ids)? {
            Some(id) => println!("Active hero section: {id}"),
            None => println!("None of the given hero sections exist"),
        },
        Command::DeactivateHero { ids } => {
            let n = store.deactivate_hero_sections(&ids)?;
            println!("Deactivated {n} hero sections");
        }
        Command::Show(args) => {
            let resolver = Resolver::new(&materializer, Quality::new(config.images.placeholder_quality));
            let api = Api::new(&store, resolver);
            let payload = show(&api, &args)?;
            materializer.save()?;
            println!("{}", serde_json::to_string_pretty(&payload)?);
        }
    }

    Ok(())
}

fn show(api: &Api<'_>, args: &ShowArgs) -> Result<serde_json::Value, Box<dyn std::error::Error>> {
    let ctx = match &args.base_url {
        Some(url) => RequestContext::with_base_url(url.as_str()),
        None => RequestContext::relative(),
    };
    let payload = match args.resource {
        Resource::Root => api::api_root(&ctx),
        Resource::Settings => api.site_settings(&ctx)?,
        Resource::Statistics => api.statistics(&ctx)?,
        Resource::Gallery => api.gallery(&ctx, args.position)?,
        Resource::Hero => api.hero(&ctx)?,
        Resource::LodgeTypes => api.lodge_types(&ctx)?,
        Resource::LodgeType => api.lodge_type(&ctx, args.slug()?)?,
        Resource::Lodges => api.lodges(&ctx, &args.lodge_filter())?,
        Resource::Lodge => api.lodge(&ctx, args.slug()?)?,
        Resource::Activities => api.activities(&ctx, args.category, args.season)?,
        Resource::Events => api.events(&ctx)?,
        Resource::Event => api.event(&ctx, args.slug()?)?,
        Resource::News => api.news(&ctx)?,
        Resource::NewsItem => api.news_item(&ctx, args.slug()?)?,
        Resource::Restaurant => api.restaurant(&ctx)?,
        Resource::RestaurantImages => api.restaurant_images(&ctx)?,
        Resource::MealTypes => api.meal_types(&ctx)?,
        Resource::Benefits => api.restaurant_benefits(&ctx)?,
    };
    Ok(payload)
}

fn open_materializer(config: &AppConfig) -> Materializer {
    let storage = MediaStorage::new(&config.storage.media_root, &config.storage.media_url);
    Materializer::new(storage, &config.storage.cache_dir)
}

/// Logs to stderr so payloads on stdout stay machine-readable.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; config can lower it, not raise it.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
