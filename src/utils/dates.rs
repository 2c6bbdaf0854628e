//! Date parameter formatting shared by the sources.
//!
//! Range boundaries are always January 1st and December 31st of the given
//! years. Years are written unpadded, as the providers expect.

/// `YYYY0101`
pub fn compact_start(year: i32) -> String {
    format!("{}0101", year)
}

/// `YYYY1231`
pub fn compact_end(year: i32) -> String {
    format!("{}1231", year)
}

/// `YYYY-01-01`
pub fn iso_start(year: i32) -> String {
    format!("{}-01-01", year)
}

/// `YYYY-12-31`
pub fn iso_end(year: i32) -> String {
    format!("{}-12-31", year)
}

/// `YYYYMMDD` with zero-padded month and day. Values are not range checked.
pub fn day_stamp(year: i32, month: u32, day: u32) -> String {
    format!("{}{:02}{:02}", year, month, day)
}
