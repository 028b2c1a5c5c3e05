/// L0 processing chain: raw text files to Parquet (L0A), Parquet to
/// netCDF (L0B), and per-station netCDF concatenation.

pub mod concat;
pub mod l0a;
pub mod l0b;
