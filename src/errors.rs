use snafu::prelude::*;

/// Error taxonomy of the ingestion and statistics core.
///
/// Unparseable lap text, drivers without usable laps, and invalid
/// optional filters are not errors: they degrade into reduced data and
/// only show up as warn logs.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("{entity} not found: {id}"))]
    NotFoundError { entity: &'static str, id: String },

    #[snafu(display("{message}"))]
    ValidationError { message: String },

    #[snafu(display("extraction service failed: {message}"))]
    ExtractionError { message: String },

    #[snafu(display("database error: {source}"))]
    DatabaseError { source: diesel::result::Error },
}

pub type CustomResult<T> = Result<T, Error>;
