//! The lookup contract shared by every geolocation source.

use crate::record::{Coordinates, FullInfo, Record};

/// GeoLookup answers point lookups for dotted-decimal IPv4 strings.
///
/// Every method returns `None` for reserved first octets (0, 10, 127),
/// unparseable input and addresses the database does not cover. Misses are
/// never reported as errors.
pub trait GeoLookup: Send + Sync {
    /// Numeric country id.
    fn country_id(&self, ip: &str) -> Option<u32>;

    /// ISO 3166-1 alpha-2 country code.
    fn country_iso(&self, ip: &str) -> Option<String>;

    /// Country record.
    fn country(&self, ip: &str) -> Option<Record> {
        self.full_info(ip).map(|info| info.country)
    }

    /// Region record. `None` for country-only databases.
    fn region(&self, ip: &str) -> Option<Record> {
        self.full_info(ip).and_then(|info| info.region)
    }

    /// City record. `None` for country-only databases.
    fn city(&self, ip: &str) -> Option<Record> {
        self.full_info(ip).and_then(|info| info.city)
    }

    /// Combined city, region and country records.
    fn full_info(&self, ip: &str) -> Option<FullInfo>;

    /// Coordinates of the most specific granularity available.
    fn coordinates(&self, ip: &str) -> Option<Coordinates> {
        self.full_info(ip)?.coordinates()
    }
}
