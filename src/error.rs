use thiserror::Error;

#[derive(Error, Debug)]
pub enum BpError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Ledger source could not be read: {0}")]
    LedgerSource(String),

    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("Margin ratio undefined for {year}: simulated revenue is zero")]
    DivisionUndefined { year: i32 },

    #[error("{field} must be between -50 and 200 (got {value})")]
    PercentOutOfRange { field: String, value: i32 },

    #[error("Unknown preset: {0}")]
    UnknownPreset(String),

    #[error("Invalid override '{0}' (expected YEAR:REVENUE_PCT:CHARGES_PCT)")]
    InvalidOverride(String),

    #[error("Settings error: {0}")]
    Settings(String),
}

pub type Result<T> = std::result::Result<T, BpError>;
