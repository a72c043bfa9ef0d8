use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

#[cfg(not(feature = "redis"))]
use repokit::cache::MemoryCache;
#[cfg(feature = "redis")]
use repokit::cache::RedisCache;
use repokit::config::Config;
use repokit::mock_data::{generate_mock_orders, generate_mock_products};
use repokit::models::{Order, Product};
use repokit::repository::GenericRepository;
use repokit::storage::InMemoryStore;
use repokit_core::cache::Cache;
use repokit_core::context::{FixedIdentity, RequestContext, TenantContext};
use repokit_core::entity::Entity;
use repokit_core::query::{
    Condition, ConditionOperator, Criteria, Pagination, ReadOptions, Sort, SortDirection,
};

/// Repokit - Query a demo catalogue through the generic repository
#[derive(Parser, Debug)]
#[command(name = "repokit")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Entity type to query
    #[arg(long, short, value_enum, default_value_t = Target::Products)]
    entity: Target,

    /// Tenant to act as. Without it only untenanted rows are visible
    #[arg(long, short, env = "REPOKIT_TENANT", conflicts_with = "all_tenants")]
    tenant: Option<Uuid>,

    /// Read across every tenant
    #[arg(long)]
    all_tenants: bool,

    /// Include inactive rows
    #[arg(long)]
    include_inactive: bool,

    /// Include soft-deleted rows
    #[arg(long)]
    include_deleted: bool,

    /// Load related data (order lines)
    #[arg(long)]
    include_children: bool,

    /// Filter as `property:operator[:value,...]`, e.g. `price:gt:50`
    #[arg(long = "where", short = 'w', value_parser = parse_condition)]
    conditions: Vec<Condition>,

    /// Sort as `property[:asc|desc]`
    #[arg(long = "sort", short = 's', value_parser = parse_sort)]
    sorts: Vec<Sort>,

    /// Zero-based page index
    #[arg(long, requires = "page_size")]
    page: Option<usize>,

    /// Page size, clamped to the max select count
    #[arg(long)]
    page_size: Option<usize>,

    /// Row ceiling for unpaginated reads. Overrides MAX_SELECT_COUNT
    #[arg(long)]
    max_select: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Target {
    Products,
    Orders,
}

impl Cli {
    fn context(&self) -> RequestContext {
        let tenant = if self.all_tenants {
            TenantContext::ignoring_tenancy()
        } else {
            TenantContext {
                tenant_id: self.tenant,
                ignore_tenancy: false,
            }
        };
        RequestContext::new(tenant, Arc::new(FixedIdentity::default()))
    }

    fn read_options(&self) -> ReadOptions {
        let mut options = ReadOptions::default();
        if self.include_inactive {
            options = options.with_inactive();
        }
        if self.include_deleted {
            options = options.with_deleted();
        }
        if self.include_children {
            options = options.with_children();
        }
        options
    }

    fn pagination(&self) -> Option<Pagination> {
        self.page_size
            .map(|size| Pagination::new(self.page.unwrap_or(0), size))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays valid JSON
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "repokit=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::from_env();
    let store = Arc::new(InMemoryStore::new());
    let products = generate_mock_products();
    let orders = generate_mock_orders(&products);
    store.seed(&products).await?;
    store.seed(&orders).await?;
    tracing::info!(
        products = products.len(),
        orders = orders.len(),
        "Seeded demo catalogue"
    );

    let cache = build_cache(&config).await?;
    let max_select = match cli.max_select {
        Some(count) => count,
        None => i64::try_from(config.max_select_count)
            .context("MAX_SELECT_COUNT is too large")?,
    };

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_ctrl_c(cancel.clone()));

    let output = match cli.entity {
        Target::Products => {
            let repo = GenericRepository::<Product, _>::new(store, Some(cache), cli.context())?;
            run_query(repo, &cli, max_select, &cancel).await?
        }
        Target::Orders => {
            let repo = GenericRepository::<Order, _>::new(store, Some(cache), cli.context())?;
            run_query(repo, &cli, max_select, &cancel).await?
        }
    };

    println!("{output}");
    Ok(())
}

/// Runs the query described by the command line and renders the page as JSON.
async fn run_query<E: Entity>(
    repo: GenericRepository<E, InMemoryStore>,
    cli: &Cli,
    max_select: i64,
    cancel: &CancellationToken,
) -> Result<String> {
    repo.set_max_select_count(max_select)?;

    let page = repo
        .find_where(
            Criteria::conditions(cli.conditions.clone()),
            cli.pagination(),
            cli.sorts.clone(),
            cli.read_options(),
            cancel,
        )
        .await?;

    tracing::info!(
        entity = E::NAME,
        total = page.total_count,
        returned = page.items.len(),
        "Query finished"
    );
    Ok(serde_json::to_string_pretty(&page)?)
}

#[cfg(feature = "redis")]
async fn build_cache(config: &Config) -> Result<Arc<dyn Cache>> {
    let cache = RedisCache::new(&config.redis_url)
        .await
        .with_context(|| format!("Failed to connect to Redis at {}", config.redis_url))?;
    tracing::info!(url = %config.redis_url, "Using Redis cache");
    Ok(Arc::new(cache))
}

#[cfg(not(feature = "redis"))]
async fn build_cache(config: &Config) -> Result<Arc<dyn Cache>> {
    tracing::debug!(max_entries = config.cache_max_entries, "Using in-memory cache");
    Ok(Arc::new(MemoryCache::new(config.cache_max_entries)))
}

async fn cancel_on_ctrl_c(cancel: CancellationToken) {
    if signal::ctrl_c().await.is_ok() {
        tracing::info!("Received Ctrl+C, cancelling...");
        cancel.cancel();
    }
}

/// Parses `property:operator[:value,...]`.
fn parse_condition(raw: &str) -> Result<Condition, String> {
    let mut parts = raw.splitn(3, ':');
    let property = parts.next().filter(|p| !p.is_empty());
    let operator = parts.next();
    let (Some(property), Some(operator)) = (property, operator) else {
        return Err(format!("expected property:operator[:value], got '{raw}'"));
    };

    let operator = match operator.to_ascii_lowercase().as_str() {
        "eq" => ConditionOperator::Equal,
        "ne" => ConditionOperator::NotEqual,
        "gt" => ConditionOperator::GreaterThan,
        "ge" | "gte" => ConditionOperator::GreaterThanOrEqual,
        "lt" => ConditionOperator::LessThan,
        "le" | "lte" => ConditionOperator::LessThanOrEqual,
        "contains" => ConditionOperator::Contains,
        "starts" => ConditionOperator::StartsWith,
        "ends" => ConditionOperator::EndsWith,
        "in" => ConditionOperator::In,
        "nin" => ConditionOperator::NotIn,
        "null" => ConditionOperator::IsNull,
        "notnull" => ConditionOperator::IsNotNull,
        other => return Err(format!("unknown operator '{other}'")),
    };

    let values: Vec<&str> = match (parts.next(), operator) {
        (Some(values), ConditionOperator::In | ConditionOperator::NotIn) => {
            values.split(',').collect()
        }
        (Some(value), _) => vec![value],
        (None, _) => Vec::new(),
    };

    let condition = Condition::new(property, operator, values);
    condition.validate().map_err(|e| e.to_string())?;
    Ok(condition)
}

/// Parses `property[:asc|desc]`.
fn parse_sort(raw: &str) -> Result<Sort, String> {
    let (property, direction) = match raw.split_once(':') {
        Some((property, direction)) => (property, Some(direction)),
        None => (raw, None),
    };
    if property.is_empty() {
        return Err(format!("expected property[:asc|desc], got '{raw}'"));
    }

    let direction = match direction.map(str::to_ascii_lowercase).as_deref() {
        None | Some("asc") => SortDirection::Ascending,
        Some("desc") => SortDirection::Descending,
        Some(other) => return Err(format!("unknown sort direction '{other}'")),
    };

    Ok(Sort {
        property_name: property.to_string(),
        direction,
    })
}
