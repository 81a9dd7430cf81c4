use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "pricewise", about = "Compare supplier offers by normalized price")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Add an inventory item
    ItemAdd {
        name: String,
        /// Canonical dimension (mass, volume, count, length, area)
        dimension: String,
        /// Canonical unit symbol within the dimension (e.g. kg, l, ea)
        unit: String,
        /// Divides the price per canonical unit (2.0 counts one unit as two)
        #[arg(long)]
        equivalence_factor: Option<f64>,
        #[arg(long)]
        shelf_life_days: Option<u32>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Add a supplier
    SupplierAdd {
        name: String,
        #[arg(long)]
        website: Option<String>,
    },
    /// Record an offer
    OfferAdd {
        /// JSON with item_id, supplier_id or supplier_name, total_price, currency, amount,
        /// amount_unit, shipping_cost, shipping_included, tax_rate, is_tax_included,
        /// quality_rating, source_url, source_type, notes, observed_at
        json: String,
    },
    /// Soft-delete an offer
    OfferDelete {
        /// Offer ID
        id: String,
    },
    /// List items
    Items {
        #[arg(long)]
        include_deleted: bool,
    },
    /// List offers
    Offers {
        /// Restrict to one item
        #[arg(long)]
        item: Option<String>,
        #[arg(long)]
        supplier: Option<String>,
        /// Start of observation range (YYYY-MM-DD or RFC3339)
        #[arg(long)]
        from: Option<String>,
        /// End of observation range (YYYY-MM-DD or RFC3339)
        #[arg(long)]
        to: Option<String>,
        #[arg(long, default_value = "50")]
        limit: usize,
        #[arg(long)]
        include_deleted: bool,
    },
    /// Rank the offers of one item
    Compare {
        /// Item ID
        item_id: String,
        /// Strategy ID (see `strategies`)
        #[arg(long, default_value = "price-per-canonical")]
        strategy: String,
        /// Strategy options as a JSON object
        #[arg(long)]
        options: Option<String>,
        /// Full comparison config as JSON (overrides the other flags)
        #[arg(long)]
        config: Option<String>,
        /// Secondary strategy as `id:weight`, repeatable
        #[arg(long = "secondary")]
        secondary: Vec<String>,
        /// asc or desc
        #[arg(long, default_value = "asc")]
        sort: String,
        #[arg(long)]
        max_results: Option<usize>,
        #[arg(long)]
        min_confidence: Option<f64>,
        #[arg(long)]
        include_deleted: bool,
    },
    /// Rank the offers of several items (all items when none given)
    CompareAll {
        item_ids: Vec<String>,
        #[arg(long, default_value = "price-per-canonical")]
        strategy: String,
        #[arg(long)]
        options: Option<String>,
    },
    /// Best offer per item, ranked in SQL
    Best {
        #[arg(long, default_value = "price-per-canonical")]
        strategy: String,
        /// Restrict to these items (repeatable)
        #[arg(long = "item")]
        items: Vec<String>,
        /// Only offers observed within this window (e.g. 7d, 30d)
        #[arg(long)]
        last: Option<String>,
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long, default_value = "asc")]
        sort: String,
    },
    /// List strategies and their default options
    Strategies,
    /// Convert an amount between units
    Convert {
        amount: f64,
        from: String,
        to: String,
    },
}
