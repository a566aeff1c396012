use std::time::SystemTime;

use time::{error::Format, macros::format_description, OffsetDateTime};

/// Formats `date` as an RFC 1123 date in GMT, as used by `Set-Cookie` expiry.
pub fn format_cookie_date(date: SystemTime) -> Result<String, Format> {
    let date = OffsetDateTime::from(date);
    date.format(format_description!(
        "[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT"
    ))
}
