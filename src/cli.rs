use clap::{Args, Parser, Subcommand};
use uuid::Uuid;

use petsync::models::results::MethodPreference;
use petsync::petfinder::SearchCriteria;

/// petsync: keep shelter dog records in sync with Petfinder
#[derive(Parser)]
#[command(name = "petsync", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server
    Serve {
        /// Port to bind (defaults to PETSYNC_PORT or 8080)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Import adoptable dogs from Petfinder
    Import {
        #[command(subcommand)]
        command: ImportCommands,
    },

    /// Upload one dog to Petfinder
    Upload {
        dog_id: Uuid,
        /// auto, ftp, object_store or api
        #[arg(short, long, default_value = "auto")]
        method: MethodPreference,
    },

    /// Bulk-upload every dog that is not synced or failed last time
    UploadPending,

    /// Probe every configured upload method
    TestConnection,

    /// Show record counts per sync status
    Status,
}

#[derive(Subcommand)]
pub enum ImportCommands {
    /// Import all adoptable dogs of one organization
    Org {
        /// Defaults to PETFINDER_ORGANIZATION_ID
        org_id: Option<String>,
    },
    /// Import dogs matching a search
    Search(SearchArgs),
    /// Import a single animal by Petfinder id
    Animal { id: u64 },
}

#[derive(Args)]
pub struct SearchArgs {
    /// City, state; latitude,longitude; or postal code
    #[arg(long)]
    pub location: Option<String>,
    #[arg(long)]
    pub breed: Option<String>,
    /// baby, young, adult or senior
    #[arg(long)]
    pub age: Option<String>,
    /// small, medium, large or xlarge
    #[arg(long)]
    pub size: Option<String>,
    #[arg(long)]
    pub gender: Option<String>,
    /// Miles from location
    #[arg(long)]
    pub distance: Option<u32>,
}

impl From<SearchArgs> for SearchCriteria {
    fn from(a: SearchArgs) -> Self {
        SearchCriteria {
            location: a.location,
            breed: a.breed,
            age: a.age,
            size: a.size,
            gender: a.gender,
            distance: a.distance,
        }
    }
}
