pub mod deals;
pub mod import;
pub mod init;
pub mod simulate;
pub mod status;
pub mod vendors;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "subline", about = "Spreadsheet import and reconciliation CLI for a telecom reseller CRM.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Set up Subline: choose a data directory and initialize the database.
    Init {
        /// Path for Subline data (default: ~/Documents/subline)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
        /// Company name shown in `status`
        #[arg(long)]
        company: Option<String>,
    },
    /// Import a mapped CSV/XLSX file into clients, BANs and subscriber lines.
    Import {
        /// Path to CSV or XLSX file to import
        file: String,
        /// Path to the column mapping file (JSON: "Entity.field" -> "Source Column")
        #[arg(long)]
        mapping: String,
        /// Rows per transaction (default from settings)
        #[arg(long = "chunk-size")]
        chunk_size: Option<usize>,
        /// Cap on rows processed in this invocation; resume with a later call
        #[arg(long = "max-rows")]
        max_rows: Option<usize>,
        /// Re-import a file whose checksum was already recorded
        #[arg(long)]
        force: bool,
    },
    /// Preview an import without writing anything.
    Simulate {
        /// Path to CSV or XLSX file to classify
        file: String,
        /// Path to the column mapping file
        #[arg(long)]
        mapping: String,
    },
    /// Manage salespeople used for commission attribution.
    Vendors {
        #[command(subcommand)]
        command: VendorsCommands,
    },
    /// Show the closed-deal ledger.
    Deals {
        /// Only deals for this calendar day: YYYY-MM-DD
        #[arg(long)]
        date: Option<String>,
    },
    /// Show current database and summary statistics.
    Status,
}

#[derive(Subcommand)]
pub enum VendorsCommands {
    /// Add a salesperson.
    Add {
        /// Vendor name as it appears in spreadsheets
        name: String,
    },
    /// List all salespeople.
    List,
}
