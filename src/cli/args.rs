use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "hundred-days", version, author, about = "Progress tracker for a 100-day coding challenge")]
pub struct Cli {
    /// Use this config file instead of the platform default
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// SAP ID of the student whose dashboard to open
    #[arg(long)]
    pub student: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a config file with every default filled in
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
    /// Run the HTTP API
    Serve {
        /// Address to listen on, overriding server.bind
        #[arg(long)]
        bind: Option<String>,
    },
    /// Show how many days are open and when the next one unlocks
    Status,
    /// Show a student's completed days and stats
    Progress {
        /// 8-digit SAP ID
        sap_id: String,
    },
    /// Complete or reopen a day for a student
    Toggle {
        /// 8-digit SAP ID
        sap_id: String,
        /// Challenge day (1-100)
        #[arg(value_parser = clap::value_parser!(u32).range(1..))]
        day: u32,
        /// Skip the typed confirmation when completing
        #[arg(long, short)]
        yes: bool,
    },
    /// Look up a student with their practice profile
    Search {
        /// 8-digit SAP ID
        sap_id: String,
    },
    /// Print an activity heatmap for the trailing year
    Calendar {
        /// 8-digit SAP ID
        sap_id: String,
        /// Use practice-site submissions instead of challenge completions
        #[arg(long)]
        practice: bool,
    },
    /// Validate and summarize the challenge dataset
    Dataset,
}
