use chrono::{DateTime, Duration, NaiveDate, Utc};
use clap::Parser;
use pricewise::cli::commands::{Cli, Commands};
use pricewise::config::Settings;
use pricewise::domain::entities::comparison_config::{ComparisonConfig, SecondaryStrategy, SortDirection, StrategyOptions};
use pricewise::domain::entities::inventory_item::InventoryItem;
use pricewise::domain::entities::offer::Offer;
use pricewise::domain::ports::find_options::FindOptions;
use pricewise::domain::ports::offer_repository::{OfferFilter, Page};
use pricewise::domain::values::source_type::SourceType;
use pricewise::domain::values::unit::Dimension;
use pricewise::Pricewise;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    init_logging();
    let cli = Cli::parse();
    let settings = Settings::from_env();

    let pw = match Pricewise::from_settings(&settings) {
        Ok(pw) => pw,
        Err(e) => {
            eprintln!("Error initializing pricewise: {e}");
            std::process::exit(1);
        }
    };

    let result = run_command(pw, cli.command).await;
    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

/// Log filter from `PRICEWISE_LOG`, then `RUST_LOG`, else warnings only.
fn init_logging() {
    let filter = EnvFilter::try_from_env("PRICEWISE_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

async fn run_command(pw: Pricewise, cmd: Commands) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        Commands::ItemAdd {
            name,
            dimension,
            unit,
            equivalence_factor,
            shelf_life_days,
            notes,
        } => {
            let dimension: Dimension = dimension.parse().map_err(|e: String| e)?;
            let mut item = InventoryItem::new(name, dimension, &unit)?.with_shelf_life(shelf_life_days);
            if let Some(factor) = equivalence_factor {
                item = item.with_equivalence_factor(factor)?;
            }
            item.notes = notes;
            let item = pw.add_item(item).await?;
            print_json(&item)?;
        }
        Commands::SupplierAdd { name, website } => {
            let supplier = pw.add_supplier(name, website).await?;
            print_json(&supplier)?;
        }
        Commands::OfferAdd { json } => {
            let data: serde_json::Value = serde_json::from_str(&json)?;
            let offer = parse_offer(&data)?;
            let offer = pw.add_offer(offer).await?;
            print_json(&offer)?;
        }
        Commands::OfferDelete { id } => {
            let offer = pw.delete_offer(&id).await?;
            println!("Deleted offer {} ({} @ {})", offer.id, offer.supplier_name, offer.total_price);
        }
        Commands::Items { include_deleted } => {
            let items = pw.items(include_deleted).await?;
            print_json(&items)?;
        }
        Commands::Offers {
            item,
            supplier,
            from,
            to,
            limit,
            include_deleted,
        } => {
            let filter = OfferFilter {
                item_ids: item.into_iter().collect(),
                supplier_ids: supplier.into_iter().collect(),
                observed_from: parse_date(&from)?,
                observed_to: parse_date(&to)?,
                ..Default::default()
            };
            let options = FindOptions {
                limit: Some(limit),
                ..FindOptions::including_deleted(include_deleted)
            };
            let offers = pw.offers(&filter, &options).await?;
            print_json(&offers)?;
        }
        Commands::Compare {
            item_id,
            strategy,
            options,
            config,
            secondary,
            sort,
            max_results,
            min_confidence,
            include_deleted,
        } => {
            let config = match config {
                Some(raw) => serde_json::from_str::<ComparisonConfig>(&raw)?,
                None => {
                    let mut config = pw.default_config(&strategy);
                    config.options = parse_options(options.as_deref())?;
                    config.secondary = secondary
                        .iter()
                        .map(|s| parse_secondary(s.as_str()))
                        .collect::<Result<Vec<_>, _>>()?;
                    config.global.sort_direction = sort.parse::<SortDirection>().map_err(|e: String| e)?;
                    config.global.max_results = max_results;
                    config.global.min_confidence = min_confidence.unwrap_or(0.0);
                    config.global.include_deleted = include_deleted;
                    config
                }
            };
            let results = pw.compare(&item_id, &config).await?;
            print_json(&results)?;
        }
        Commands::CompareAll {
            item_ids,
            strategy,
            options,
        } => {
            let mut config = pw.default_config(&strategy);
            config.options = parse_options(options.as_deref())?;
            let results = pw.compare_all(&item_ids, &config).await?;
            print_json(&results)?;
        }
        Commands::Best {
            strategy,
            items,
            last,
            limit,
            sort,
        } => {
            let filter = OfferFilter {
                item_ids: items,
                observed_from: last.as_deref().map(parse_window).transpose()?.map(|d| Utc::now() - d),
                ..Default::default()
            };
            let direction = sort.parse::<SortDirection>().map_err(|e: String| e)?;
            let page = Page { limit, offset: None };
            let best = pw.best_offers(&strategy, filter, direction, page).await?;
            print_json(&best)?;
        }
        Commands::Strategies => {
            for descriptor in pw.strategies() {
                let defaults = pw.strategy_defaults(descriptor.id.as_str())?;
                println!("{} (v{}) - {}", descriptor.id, descriptor.version, descriptor.name);
                println!("  {}", descriptor.description);
                println!("  defaults: {}", serde_json::Value::Object(defaults));
            }
        }
        Commands::Convert { amount, from, to } => {
            let converted = pw.convert(amount, &from, &to)?;
            println!("{amount} {from} = {converted} {to}");
        }
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn parse_offer(data: &serde_json::Value) -> Result<Offer, Box<dyn std::error::Error>> {
    let item_id = data["item_id"].as_str().ok_or("item_id required")?.to_string();
    let supplier_id = data["supplier_id"].as_str().map(String::from);
    let supplier_name = data["supplier_name"].as_str().map(String::from);
    if supplier_id.is_none() && supplier_name.is_none() {
        return Err("supplier_id or supplier_name required".into());
    }
    let total_price = data["total_price"].as_f64().ok_or("total_price required")?;
    let currency = data["currency"].as_str().unwrap_or("USD");
    let amount = data["amount"].as_f64().ok_or("amount required")?;
    let amount_unit = data["amount_unit"].as_str().ok_or("amount_unit required")?;

    let quality = data["quality_rating"]
        .as_u64()
        .map(|r| u8::try_from(r).map_err(|_| format!("quality_rating out of range: {r}")))
        .transpose()?;
    let source_type: SourceType = match data["source_type"].as_str() {
        Some(s) => s.parse().map_err(|e: String| e)?,
        None => SourceType::default(),
    };

    let mut offer = Offer::new(
        item_id,
        supplier_id.clone().unwrap_or_default(),
        supplier_name.unwrap_or_default(),
        total_price,
        currency,
        amount,
        amount_unit,
    )?
    .with_shipping(
        data["shipping_cost"].as_f64(),
        data["shipping_included"].as_bool().unwrap_or(false),
    )
    .with_tax(
        data["is_tax_included"].as_bool().unwrap_or(false),
        data["tax_rate"].as_f64(),
    )
    .with_quality(quality)
    .with_source(data["source_url"].as_str().map(String::from), source_type);
    if supplier_id.is_none() {
        offer.supplier_id = format!("name:{}", offer.supplier_name.to_lowercase());
    }
    if let Some(at) = parse_date(&data["observed_at"].as_str().map(String::from))? {
        offer = offer.observed_at(at);
    }
    offer.notes = data["notes"].as_str().map(String::from);
    offer.validate()?;
    Ok(offer)
}

fn parse_options(raw: Option<&str>) -> Result<StrategyOptions, Box<dyn std::error::Error>> {
    match raw {
        None => Ok(StrategyOptions::new()),
        Some(raw) => match serde_json::from_str::<serde_json::Value>(raw)? {
            serde_json::Value::Object(map) => Ok(map),
            _ => Err("--options must be a JSON object".into()),
        },
    }
}

/// `id:weight`, weight defaulting to 0.5.
fn parse_secondary(raw: &str) -> Result<SecondaryStrategy, String> {
    let (id, weight) = match raw.split_once(':') {
        Some((id, w)) => (id, w.parse::<f64>().map_err(|_| format!("Invalid weight in '{raw}'"))?),
        None => (raw, 0.5),
    };
    Ok(SecondaryStrategy {
        strategy_id: id.to_string(),
        weight,
        options: StrategyOptions::new(),
    })
}

/// Relative window such as `24h`, `7d` or `30m`.
fn parse_window(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    let split = s.char_indices().last().map(|(i, _)| i).unwrap_or(0);
    let (num, unit) = s.split_at(split);
    let n: i64 = num.parse().map_err(|_| format!("Invalid window: {s}. Use e.g. 24h, 7d, 30m"))?;
    match unit {
        "m" => Ok(Duration::minutes(n)),
        "h" => Ok(Duration::hours(n)),
        "d" => Ok(Duration::days(n)),
        "w" => Ok(Duration::weeks(n)),
        _ => Err(format!("Invalid window unit in {s}. Use m, h, d or w")),
    }
}

fn parse_date(s: &Option<String>) -> Result<Option<DateTime<Utc>>, String> {
    match s {
        None => Ok(None),
        Some(s) => {
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Ok(Some(dt.with_timezone(&Utc)));
            }
            if let Some(dt) = NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
            {
                return Ok(Some(DateTime::from_naive_utc_and_offset(dt, Utc)));
            }
            Err(format!("Invalid date format: {s}. Use YYYY-MM-DD or RFC3339"))
        }
    }
}
