use clap::{Args, Parser, Subcommand, ValueEnum};
use std::io::IsTerminal;
use std::path::PathBuf;

use crate::journey::track::CartItem;

/// Output format for commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// JSON format
    Json,
    /// YAML format
    Yaml,
}

impl OutputFormat {
    /// Resolve the effective output format.
    /// If user specified a format, use it.
    /// Otherwise: TTY → Text, non-TTY (pipe) → Json
    pub fn resolve(user_choice: Option<OutputFormat>) -> OutputFormat {
        match user_choice {
            Some(fmt) => fmt,
            None => {
                if std::io::stdout().is_terminal() {
                    OutputFormat::Text
                } else {
                    OutputFormat::Json
                }
            }
        }
    }
}

#[derive(Parser)]
#[command(
    name = "journey",
    about = "Storefront journey tracking - session-aware analytics events for the shop backend",
    version = env!("GIT_DESCRIBE"),
    after_help = "Logs are written to: ~/.local/share/journey/logs/journey.log"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to journey.yaml config file")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true, help = "Suppress non-error output")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Page context the event is emitted from
#[derive(Args, Debug, Clone)]
pub struct PageArgs {
    /// Current page path
    #[arg(long, default_value = "/")]
    pub page: String,

    /// Page the visitor came from
    #[arg(long)]
    pub referrer: Option<String>,

    /// Viewport width in pixels (defaults to tracking.viewport_width)
    #[arg(long)]
    pub viewport: Option<u32>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Emit a single journey event
    Emit {
        /// Event type (page_view, add_to_cart, click, ...)
        event_type: String,

        /// Human-readable event name
        name: String,

        /// Metadata as a JSON object
        #[arg(long, short = 'm')]
        metadata: Option<String>,

        #[command(flatten)]
        page: PageArgs,
    },

    /// Emit a storefront action with its typed metadata
    Track {
        #[command(subcommand)]
        action: TrackAction,

        #[command(flatten)]
        page: PageArgs,
    },

    /// Run live instrumentation driven by stdin (paths navigate, JSON lines click)
    Watch {
        #[command(flatten)]
        page: PageArgs,

        /// Route poll interval in milliseconds (defaults to tracking.poll_interval_ms)
        #[arg(long)]
        interval_ms: Option<u64>,
    },

    /// Inspect or end the tracking session
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },

    /// Manage the locally stored visitor identity
    Identity {
        #[command(subcommand)]
        action: IdentityAction,
    },

    /// Check that the backend is reachable
    Ping {
        /// Give up after this many seconds (defaults to tracking.ping_timeout_secs)
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Tail the local event journal
    Observe {
        /// Only show events whose type contains this text
        #[arg(long, short)]
        filter: Option<String>,

        /// Show this many recent events before tailing
        #[arg(long, short, default_value = "10")]
        last: usize,

        /// Print event metadata under each line
        #[arg(long)]
        metadata: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Diagnose setup issues
    Doctor,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

/// Parse `id:name:price:quantity`
pub fn parse_cart_item(s: &str) -> Result<CartItem, String> {
    let parts: Vec<&str> = s.split(':').collect();
    if parts.len() != 4 {
        return Err(format!("expected id:name:price:quantity, got '{}'", s));
    }
    let price = parts[2]
        .parse::<f64>()
        .map_err(|e| format!("invalid price '{}': {}", parts[2], e))?;
    let quantity = parts[3]
        .parse::<u32>()
        .map_err(|e| format!("invalid quantity '{}': {}", parts[3], e))?;

    Ok(CartItem {
        product_id: parts[0].to_string(),
        product_name: parts[1].to_string(),
        price,
        quantity,
    })
}

#[derive(Subcommand)]
pub enum TrackAction {
    /// A page was viewed
    PageView { page_name: String },

    /// A button was pressed
    ButtonClick { button_name: String, location: String },

    /// A form was submitted
    FormSubmit {
        form_name: String,
        /// Mark the submission as failed
        #[arg(long)]
        failed: bool,
    },

    /// A product detail page was opened
    ProductView {
        product_id: String,
        product_name: String,
        price: f64,
    },

    /// A product was added to the cart
    AddToCart {
        product_id: String,
        product_name: String,
        price: f64,
        #[arg(default_value = "1")]
        quantity: u32,
    },

    /// A product was removed from the cart
    RemoveFromCart {
        product_id: String,
        product_name: String,
        price: f64,
        #[arg(default_value = "1")]
        quantity: u32,
    },

    /// The cart was emptied
    CartCleared { item_count: u32, cart_total: f64 },

    /// The visitor left with items in the cart
    CartAbandoned {
        /// Cart line as id:name:price:quantity (repeatable)
        #[arg(long = "item", value_parser = parse_cart_item, required = true)]
        items: Vec<CartItem>,
    },

    /// Checkout was started
    CheckoutStart { cart_total: f64, item_count: u32 },

    /// An order was placed
    CheckoutComplete {
        order_id: String,
        total: f64,
        item_count: u32,
    },

    /// A catalog search was run
    Search {
        query: String,
        #[arg(default_value = "0")]
        results: usize,
    },

    /// A catalog filter was applied
    Filter { filter_type: String, value: String },

    /// A visitor created an account
    Signup {
        #[arg(default_value = "email")]
        method: String,
    },

    /// A visitor signed in
    Login {
        #[arg(default_value = "email")]
        method: String,
    },

    /// A visitor signed out
    Logout,

    /// Anything else
    Custom {
        name: String,
        /// Metadata as a JSON object
        #[arg(long, short = 'm')]
        metadata: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum SessionAction {
    /// Show the current session id (creating one if needed)
    Show,

    /// End the session; the next event starts a new one
    Reset,
}

#[derive(Subcommand)]
pub enum IdentityAction {
    /// Show the stored visitor identity
    Show,

    /// Store a signed-in visitor id
    Set {
        /// User identifier
        user_id: String,
    },

    /// Forget the stored visitor (anonymous tracking)
    Clear,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration
    Show {
        /// Output format (default: text for TTY, json for pipes)
        #[arg(long, short = 'o', value_enum)]
        format: Option<OutputFormat>,
    },

    /// Get a configuration value
    Get {
        /// Configuration key (dot notation)
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Configuration key
        key: String,

        /// New value
        value: String,
    },
}
